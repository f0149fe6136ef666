//! Daemon bootstrap orchestration.

use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use ticketbridge_config::{Config, SocketPreparationError};

use crate::bridge::BridgeConnectionHandler;
use crate::health::HealthReporter;
use crate::routes::{command_router, http_router};
use crate::services::{ServiceContext, Services, SharedServiceContext, TemplateError, TemplateRegistry};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::command::CommandSurface;
use crate::transport::http::HttpSurface;

/// Source of the daemon configuration.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a configuration resolved earlier.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The listen socket's directory could not be prepared.
    #[error("failed to prepare listen socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
    /// The configured templates could not be loaded.
    #[error("failed to load templates: {source}")]
    Templates {
        /// Underlying template error.
        #[source]
        source: TemplateError,
    },
}

/// A bootstrapped daemon, ready to serve the host bridge.
pub struct Daemon {
    config: Config,
    services: Arc<SharedServiceContext>,
    http: HttpSurface,
    command: CommandSurface,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Hot-swappable service context shared by both surfaces.
    #[must_use]
    pub fn services(&self) -> &Arc<SharedServiceContext> {
        &self.services
    }

    /// Surface serving plugin HTTP requests.
    #[must_use]
    pub fn http(&self) -> &HttpSurface {
        &self.http
    }

    /// Surface serving slash commands.
    #[must_use]
    pub fn command(&self) -> &CommandSurface {
        &self.command
    }

    /// Telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Lifecycle reporter the daemon was built with.
    #[must_use]
    pub fn reporter(&self) -> &Arc<dyn HealthReporter> {
        &self.reporter
    }

    /// Connection handler serving both surfaces over the host bridge.
    #[must_use]
    pub fn bridge_handler(&self) -> BridgeConnectionHandler {
        BridgeConnectionHandler::new(self.http.clone(), self.command.clone())
    }
}

/// Bootstraps the daemon with the supplied collaborators.
///
/// Configuration is loaded, telemetry installed, the socket directory
/// prepared and templates loaded, in that order. The first failure is
/// reported to `reporter` and returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    services: Services,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    match assemble(loader, services) {
        Ok((config, telemetry, context)) => {
            reporter.bootstrap_succeeded(&config);
            let shared = Arc::new(SharedServiceContext::new(context));
            Ok(Daemon {
                http: HttpSurface::new(Arc::new(http_router()), Arc::clone(&shared)),
                command: CommandSurface::new(Arc::new(command_router()), Arc::clone(&shared)),
                services: shared,
                config,
                telemetry,
                reporter,
            })
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn assemble(
    loader: &dyn ConfigLoader,
    services: Services,
) -> Result<(Config, TelemetryHandle, ServiceContext), BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    config
        .listen_socket()
        .prepare_filesystem()
        .map_err(|source| BootstrapError::Socket { source })?;
    let templates = TemplateRegistry::load(config.templates_dir.as_deref())
        .map_err(|source| BootstrapError::Templates { source })?;
    let context = ServiceContext::new(config.clone(), services, Arc::new(templates));
    Ok((config, telemetry, context))
}
