//! Shared fixtures for unit and behavioural tests.

mod config_loader;
mod contexts;
mod registry;
mod reporter;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use contexts::{
    SECRET, UPSTREAM_URL, bridge_handler, command_with_registry, context_with_registry,
    http_action, seeded_command, seeded_context, seeded_http, seeded_registry, service_context,
    services_with_registry, sign_token,
};
pub use registry::MockRegistry;
pub use reporter::{HealthEvent, RecordingHealthReporter};
