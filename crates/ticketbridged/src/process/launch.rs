use std::sync::Arc;

use tracing::info;

use crate::bootstrap::{Daemon, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::services::Services;
use crate::transport::SocketListener;

use ticketbridge_config::SocketEndpoint;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::reload::TemplateReloader;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Bootstraps the daemon from the process environment and serves the host
/// bridge until a termination signal arrives. SIGHUP reloads templates.
pub fn run_daemon() -> Result<(), LaunchError> {
    let reporter: Arc<dyn HealthReporter> = Arc::new(StructuredHealthReporter::new());
    let daemon = bootstrap_with(&SystemConfigLoader, reporter, Services::in_memory())?;
    let reloader = TemplateReloader::spawn(
        Arc::clone(daemon.services()),
        daemon.config().templates_dir.clone(),
    )?;
    let served = serve_until(&daemon, &SystemShutdownSignal::new());
    reloader.stop();
    served
}

/// Serves `daemon` on its configured socket until `shutdown` returns.
///
/// The listener is stopped and joined even when waiting for the signal
/// fails.
pub(crate) fn serve_until(
    daemon: &Daemon,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), LaunchError> {
    let configured = daemon.config().listen_socket();
    let listener = SocketListener::bind(configured)?;
    let bound = bound_endpoint(configured, &listener);
    let handle = listener.start(Arc::new(daemon.bridge_handler()))?;
    daemon.reporter().listener_started(&bound);

    let waited = shutdown.wait();
    daemon.reporter().shutdown_requested();
    handle.shutdown();
    handle.join()?;
    waited?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}

/// Endpoint actually bound; differs from the configured one when a TCP port
/// of `0` was requested.
fn bound_endpoint(configured: &SocketEndpoint, listener: &SocketListener) -> SocketEndpoint {
    match listener.local_addr() {
        Some(addr) => SocketEndpoint::tcp(addr.ip().to_string(), addr.port()),
        None => configured.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_tcp_ports_are_reported_as_bound() {
        let configured = SocketEndpoint::tcp("127.0.0.1", 0);
        let listener = SocketListener::bind(&configured).expect("bind");
        let SocketEndpoint::Tcp { host, port } = bound_endpoint(&configured, &listener) else {
            panic!("expected a TCP endpoint");
        };
        assert_eq!(host, "127.0.0.1");
        assert_ne!(port, 0);
    }
}
