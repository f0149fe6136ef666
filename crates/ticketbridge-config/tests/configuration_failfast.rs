//! Configuration loading must fail fast on malformed input.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;
use ortho_config::OrthoError;
use rstest::rstest;
use tempfile::TempDir;
use ticketbridge_config::Config;

const CONFIG_PATH_VAR: &str = "TICKETBRIDGE_CONFIG_PATH";

static ENVIRONMENT: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Runs `body` with `CONFIG_PATH_VAR` pointing at `path`, restoring the old
/// value afterwards.
fn with_config_path_var<R>(path: &Path, body: impl FnOnce() -> R) -> R {
    let _lock = ENVIRONMENT.lock().unwrap_or_else(PoisonError::into_inner);
    let previous = std::env::var_os(CONFIG_PATH_VAR);
    // SAFETY: environment access is serialised by `ENVIRONMENT`.
    unsafe { std::env::set_var(CONFIG_PATH_VAR, path) };
    let result = body();
    match previous {
        // SAFETY: as above.
        Some(value) => unsafe { std::env::set_var(CONFIG_PATH_VAR, value) },
        // SAFETY: as above.
        None => unsafe { std::env::remove_var(CONFIG_PATH_VAR) },
    }
    result
}

fn write_config(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write config file");
    path
}

fn cli(extra: &[&str]) -> Vec<OsString> {
    std::iter::once("ticketbridged")
        .chain(extra.iter().copied())
        .map(OsString::from)
        .collect()
}

#[rstest]
#[case::bad_port(r#"listen_socket = { transport = "tcp", port = not_a_number }"#)]
#[case::wrong_type(r#"command_trigger = ["/jira", "/ticket"]"#)]
#[case::unknown_format(r#"log_format = "yaml""#)]
fn malformed_files_fail_loading(#[case] contents: &str) {
    let dir = TempDir::new().expect("temp dir");
    let path = write_config(&dir, "ticketbridge.toml", contents);
    let path = path.to_str().expect("utf-8 temp path");

    assert!(Config::load_from_iter(cli(&["--config-path", path])).is_err());
}

#[rstest]
#[case::unknown_scheme("invalid://socket")]
#[case::missing_port("tcp://127.0.0.1")]
fn malformed_socket_flags_fail_loading(#[case] socket: &str) {
    assert!(Config::load_from_iter(cli(&["--listen-socket", socket])).is_err());
}

#[test]
fn file_errors_from_cli_and_environment_are_aggregated() {
    let dir = TempDir::new().expect("temp dir");
    let cli_path = write_config(&dir, "cli.toml", r#"site_url = "unterminated"#);
    let env_path = write_config(&dir, "env.toml", "admin_role = [oops");
    let cli_arg = cli_path.to_str().expect("utf-8 temp path");

    let error = with_config_path_var(&env_path, || {
        Config::load_from_iter(cli(&["--config-path", cli_arg]))
    })
    .expect_err("both files are malformed");

    let OrthoError::Aggregate(aggregate) = error.as_ref() else {
        panic!("expected an aggregated error, got {error:?}");
    };
    let paths: Vec<_> = aggregate
        .iter()
        .filter_map(|error| match error {
            OrthoError::File { path, .. } => Some(path.clone()),
            _ => None,
        })
        .collect();
    assert!(paths.contains(&cli_path), "CLI file missing from {paths:?}");
    assert!(paths.contains(&env_path), "env file missing from {paths:?}");
}
