//! Socket binding and the readiness-multiplexed session loop.

mod errors;
mod listener;
mod session;

pub use errors::ListenerError;
pub use listener::BoundSockets;
pub use session::{SessionLoop, ShutdownPipe, ShutdownTrigger};

pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
