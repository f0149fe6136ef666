//! SIGHUP-driven template reloads.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use camino::Utf8PathBuf;
use signal_hook::consts::signal::SIGHUP;
use signal_hook::iterator::{Handle, Signals};
use tracing::{info, warn};

use crate::services::SharedServiceContext;

use super::PROCESS_TARGET;
use super::shutdown::ShutdownError;

/// Reloads templates into the shared service context whenever the process
/// receives SIGHUP.
pub(crate) struct TemplateReloader {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl TemplateReloader {
    /// Installs the SIGHUP handler and starts the reload thread.
    pub(crate) fn spawn(
        services: Arc<SharedServiceContext>,
        templates_dir: Option<Utf8PathBuf>,
    ) -> Result<Self, ShutdownError> {
        let mut signals =
            Signals::new([SIGHUP]).map_err(|source| ShutdownError::Install { source })?;
        let handle = signals.handle();
        let thread = thread::spawn(move || {
            for _ in signals.forever() {
                match services.reload_templates(templates_dir.as_deref()) {
                    Ok(()) => info!(target: PROCESS_TARGET, "templates reloaded"),
                    Err(error) => warn!(target: PROCESS_TARGET, %error, "template reload failed"),
                }
            }
        });
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    /// Stops listening for SIGHUP and waits for the reload thread.
    pub(crate) fn stop(mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!(target: PROCESS_TARGET, "template reload thread panicked");
        }
    }
}
