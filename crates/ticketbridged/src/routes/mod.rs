//! Route tables served by the daemon.
//!
//! Each table is an explicit [`Router`] value built at bootstrap; handlers
//! list the capabilities they need as resolver steps ahead of themselves.
//!
//! [`Router`]: crate::dispatch::Router

mod command;
mod web;

pub use self::command::{
    ROUTE_CONNECT, ROUTE_DISCONNECT, ROUTE_INSTALL_CLOUD, ROUTE_INSTALL_SERVER,
    ROUTE_NOTIFICATIONS, ROUTE_UNINSTALL, ROUTE_UPSTREAM_LIST, ROUTE_UPSTREAM_SELECT,
    command_router,
};
pub use self::web::{
    ROUTE_CONNECT_PAGES, ROUTE_USER_CONNECT, ROUTE_USER_DISCONNECT, ROUTE_USER_INFO, http_router,
};

use http::StatusCode;
use url::Url;

use crate::dispatch::ActionError;
use crate::services::{Upstream, UpstreamKind};
use ticketbridge_config::Config;

/// URL a caller visits to link their account on `upstream`.
pub(crate) fn connect_url(
    settings: &Config,
    upstream: &Upstream,
    caller_id: &str,
) -> Result<Url, ActionError> {
    let base = match upstream.kind {
        UpstreamKind::Cloud => format!(
            "{}/plugins/servlet/ac/{}/user-config",
            upstream.url.trim_end_matches('/'),
            settings.plugin_id
        ),
        UpstreamKind::Server => format!("{}/oauth1/connect", settings.plugin_url()),
    };
    Url::parse_with_params(&base, [("mm_user_id", caller_id)]).map_err(|error| {
        ActionError::from_source(StatusCode::INTERNAL_SERVER_ERROR, error)
            .context("failed to build connect URL")
    })
}

/// Canonical form of an instance URL typed by an administrator.
///
/// A missing scheme defaults to `https` and the trailing slash is dropped.
pub(crate) fn normalize_url(input: &str) -> Result<String, ActionError> {
    let candidate = if input.contains("://") {
        input.to_owned()
    } else {
        format!("https://{input}")
    };
    let url = Url::parse(&candidate).map_err(|error| {
        ActionError::from_source(StatusCode::BAD_REQUEST, error)
            .context(format!("invalid instance URL {input:?}"))
    })?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ActionError::bad_request(format!(
            "invalid instance URL {input:?}: no hostname"
        )));
    }
    Ok(url.as_str().trim_end_matches('/').to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("jira.acme.test", "https://jira.acme.test")]
    #[case("https://Jira.Acme.test/", "https://jira.acme.test")]
    #[case("http://jira.acme.test/tickets/", "http://jira.acme.test/tickets")]
    #[case("jira.acme.test:8080/tickets", "https://jira.acme.test:8080/tickets")]
    fn normalizes_instance_urls(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_url(input).expect("valid url"), expected);
    }

    #[rstest]
    #[case("")]
    #[case("file:///tmp/jira")]
    #[case("https://")]
    fn rejects_urls_without_a_host(#[case] input: &str) {
        let error = normalize_url(input).expect_err("invalid url");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn cloud_connect_url_points_at_the_upstream() {
        let url = connect_url(
            &Config::default(),
            &Upstream::cloud("https://acme.atlassian.net/", "secret"),
            "u 1",
        )
        .expect("url");
        assert_eq!(
            url.as_str(),
            "https://acme.atlassian.net/plugins/servlet/ac/ticketbridge/user-config?mm_user_id=u+1"
        );
    }

    #[test]
    fn server_connect_url_points_at_the_plugin() {
        let url = connect_url(
            &Config::default(),
            &Upstream::server("https://jira.acme.test"),
            "u1",
        )
        .expect("url");
        assert_eq!(
            url.as_str(),
            "http://localhost:8065/plugins/ticketbridge/oauth1/connect?mm_user_id=u1"
        );
    }
}
