//! Structured health reporting for daemon lifecycle events.

use std::sync::Arc;

use ticketbridge_config::{Config, SocketEndpoint};

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer for lifecycle events.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the host bridge is accepting connections.
    fn listener_started(&self, endpoint: &SocketEndpoint);

    /// Invoked when a shutdown signal has been received.
    fn shutdown_requested(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn listener_started(&self, endpoint: &SocketEndpoint) {
        (**self).listener_started(endpoint);
    }

    fn shutdown_requested(&self) {
        (**self).shutdown_requested();
    }
}

/// Reporter that records lifecycle events with `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(target: HEALTH_TARGET, event = "bootstrap_starting", "starting daemon bootstrap");
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            socket = %config.listen_socket(),
            plugin_url = %config.plugin_url(),
            trigger = config.command_trigger(),
            log_format = ?config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            %error,
            "daemon bootstrap failed"
        );
    }

    fn listener_started(&self, endpoint: &SocketEndpoint) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_started",
            socket = %endpoint,
            "host bridge ready"
        );
    }

    fn shutdown_requested(&self) {
        tracing::info!(target: HEALTH_TARGET, event = "shutdown_requested", "shutting down");
    }
}
