use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::transport::ListenerError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or running the daemon.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrap failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The host bridge could not be bound or stopped cleanly.
    #[error("host bridge failed: {source}")]
    Listener {
        /// Underlying listener error.
        #[from]
        source: ListenerError,
    },
    /// Waiting for a shutdown signal failed.
    #[error("shutdown handling failed: {source}")]
    Shutdown {
        /// Underlying signal error.
        #[from]
        source: ShutdownError,
    },
}
