//! Request-dispatch core of the ticketbridge chat plugin.
//!
//! The chat platform host forwards two kinds of traffic to the daemon over a
//! local socket: plugin HTTP requests and slash commands. Each request becomes
//! an [`Action`](dispatch::Action) that a [`Router`](dispatch::Router) maps to
//! a pipeline of steps. Steps declare the capabilities they need (the caller,
//! the current upstream, the caller's linked account, a verified signed
//! token) by listing resolvers from [`capability`] ahead of themselves;
//! resolvers populate the request context on demand and never repeat work.
//!
//! [`bootstrap_with`] loads configuration, installs telemetry and assembles
//! both routers; [`run_daemon`] serves them over the host bridge until the
//! process receives a termination signal.

pub mod bridge;
pub mod capability;
pub mod dispatch;
pub mod routes;
pub mod services;
pub mod transport;

mod bootstrap;
mod health;
mod process;
mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
