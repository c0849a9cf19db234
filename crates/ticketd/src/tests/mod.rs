//! Test suites for the ticketed-event server.

mod behaviour;
mod support;
