//! Process lifecycle: launch, serve and shut down.

mod errors;
mod launch;
mod reload;
mod shutdown;

pub use self::errors::LaunchError;
pub use self::launch::run_daemon;
pub use self::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

#[cfg(test)]
pub(crate) use self::launch::serve_until;

const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
