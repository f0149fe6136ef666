//! Configuration loaders covering the success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::OrthoError;
use tempfile::TempDir;

use ticketbridge_config::{Config, SocketEndpoint};

use crate::bootstrap::ConfigLoader;

/// Loader placing a Unix socket, and optionally templates, under a temporary
/// directory.
pub struct TestConfigLoader {
    dir: TempDir,
    templates_dir: Option<Utf8PathBuf>,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temporary directory"),
            templates_dir: None,
        }
    }

    /// Path of the socket the loaded configuration listens on.
    pub fn socket_path(&self) -> Utf8PathBuf {
        self.root().join("run").join("ticketbridged.sock")
    }

    /// Points the configuration at a template directory below the
    /// temporary directory, creating it.
    pub fn with_templates(mut self, files: &[(&str, &str)]) -> Self {
        let dir = self.root().join("templates");
        std::fs::create_dir_all(&dir).expect("template directory");
        for (relative, source) in files {
            let path = dir.join(relative.trim_start_matches('/'));
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("template directory");
            }
            std::fs::write(&path, source).expect("template file");
        }
        self.templates_dir = Some(dir);
        self
    }

    fn root(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().to_path_buf())
            .expect("temporary directory path should be UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            listen_socket: SocketEndpoint::unix(self.socket_path()),
            templates_dir: self.templates_dir.clone(),
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an invalid socket on the command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("ticketbridged"),
            OsString::from("--listen-socket"),
            OsString::from("invalid://socket"),
        ])
    }
}
