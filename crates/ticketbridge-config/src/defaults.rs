use camino::Utf8PathBuf;
use std::env;

#[cfg(unix)]
use libc::geteuid;

#[cfg(unix)]
use dirs::runtime_dir;

use crate::socket::SocketEndpoint;

/// Default TCP port used when Unix domain sockets are not available.
pub const DEFAULT_TCP_PORT: u16 = 9787;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default chat site URL, matching a local development server.
pub const DEFAULT_SITE_URL: &str = "http://localhost:8065";

/// Default plugin identifier used to derive the plugin's public URL.
pub const DEFAULT_PLUGIN_ID: &str = "ticketbridge";

/// Default slash-command trigger token.
pub const DEFAULT_COMMAND_TRIGGER: &str = "/jira";

/// Default bot account used for command responses.
pub const DEFAULT_BOT_USER_NAME: &str = "jira";

/// Role that grants access to administrative commands.
pub const DEFAULT_ADMIN_ROLE: &str = "system_admin";

/// Default log filter expression used by the daemon.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the daemon.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

pub(crate) fn default_site_url() -> String {
    DEFAULT_SITE_URL.to_owned()
}

pub(crate) fn default_plugin_id() -> String {
    DEFAULT_PLUGIN_ID.to_owned()
}

pub(crate) fn default_command_trigger() -> String {
    DEFAULT_COMMAND_TRIGGER.to_owned()
}

pub(crate) fn default_bot_user_name() -> String {
    DEFAULT_BOT_USER_NAME.to_owned()
}

pub(crate) fn default_admin_role() -> String {
    DEFAULT_ADMIN_ROLE.to_owned()
}

/// Computes the default host-bridge socket endpoint.
pub fn default_socket_endpoint() -> SocketEndpoint {
    default_socket_endpoint_inner()
}

#[cfg(unix)]
fn default_socket_endpoint_inner() -> SocketEndpoint {
    let (mut base, apply_namespace) = match runtime_base_directory() {
        Some(dir) => (dir, false),
        None => (fallback_base_directory(), true),
    };

    base.push("ticketbridge");
    if apply_namespace {
        base.push(user_namespace());
    }

    SocketEndpoint::unix(base.join("ticketbridged.sock"))
}

#[cfg(unix)]
fn runtime_base_directory() -> Option<Utf8PathBuf> {
    runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
}

#[cfg(unix)]
fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}

#[cfg(unix)]
fn user_namespace() -> String {
    // SAFETY: `geteuid` has no preconditions and cannot fail.
    let uid = unsafe { geteuid() };
    format!("uid-{uid}")
}

#[cfg(not(unix))]
fn default_socket_endpoint_inner() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", DEFAULT_TCP_PORT)
}
