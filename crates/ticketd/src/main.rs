//! Command-line entry point for the ticketed-event server.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let outcome = ticketd::run_server();
    ticketd::exit_status(outcome, &mut io::stderr().lock())
}
