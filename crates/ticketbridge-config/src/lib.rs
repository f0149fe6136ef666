//! Layered configuration for the ticketbridge daemon.
//!
//! Values are merged from built-in defaults, an optional TOML file
//! (`--config-path` or `TICKETBRIDGE_CONFIG_PATH`), `TICKETBRIDGE_*`
//! environment variables and command-line flags, in increasing order of
//! precedence. The merged [`Config`] describes where the host bridge listens,
//! how the plugin presents itself to the chat platform and how the daemon
//! logs.

mod defaults;
mod logging;
mod socket;

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_ADMIN_ROLE, DEFAULT_BOT_USER_NAME, DEFAULT_COMMAND_TRIGGER, DEFAULT_LOG_FILTER,
    DEFAULT_PLUGIN_ID, DEFAULT_SITE_URL, DEFAULT_TCP_PORT, default_log_filter,
    default_log_filter_string, default_log_format, default_socket_endpoint,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Merged daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "TICKETBRIDGE")]
pub struct Config {
    /// Socket the host bridge listens on.
    #[ortho_config(default = defaults::default_socket_endpoint())]
    pub listen_socket: SocketEndpoint,
    /// Public URL of the chat site.
    #[ortho_config(default = defaults::default_site_url())]
    pub site_url: String,
    /// Identifier the plugin is installed under.
    #[ortho_config(default = defaults::default_plugin_id())]
    pub plugin_id: String,
    /// Slash-command trigger token, including the leading slash.
    #[ortho_config(default = defaults::default_command_trigger())]
    pub command_trigger: String,
    /// Bot account name attached to command responses.
    #[ortho_config(default = defaults::default_bot_user_name())]
    pub bot_user_name: String,
    /// Optional bot avatar URL attached to command responses.
    pub bot_icon_url: Option<String>,
    /// Role granting access to administrative commands.
    #[ortho_config(default = defaults::default_admin_role())]
    pub admin_role: String,
    /// Directory holding handlebars templates.
    pub templates_dir: Option<Utf8PathBuf>,
    /// Tracing filter expression.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_socket: default_socket_endpoint(),
            site_url: defaults::default_site_url(),
            plugin_id: defaults::default_plugin_id(),
            command_trigger: defaults::default_command_trigger(),
            bot_user_name: defaults::default_bot_user_name(),
            bot_icon_url: None,
            admin_role: defaults::default_admin_role(),
            templates_dir: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads configuration from an explicit argument iterator.
    ///
    /// The first item is treated as the binary name, as with
    /// [`std::env::args_os`].
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Socket the host bridge listens on.
    #[must_use]
    pub fn listen_socket(&self) -> &SocketEndpoint {
        &self.listen_socket
    }

    /// Slash-command trigger token.
    #[must_use]
    pub fn command_trigger(&self) -> &str {
        &self.command_trigger
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Path component under which the platform serves this plugin.
    #[must_use]
    pub fn plugin_url_path(&self) -> String {
        format!("/plugins/{}", self.plugin_id)
    }

    /// Absolute public URL of the plugin.
    #[must_use]
    pub fn plugin_url(&self) -> String {
        format!(
            "{}{}",
            self.site_url.trim_end_matches('/'),
            self.plugin_url_path()
        )
    }
}
