//! Named templates rendered by responders.
//!
//! Templates are keyed by the request path that renders them, for example
//! `/ac/user_confirm.html`. A small built-in set covers the pages the daemon
//! serves itself; a configured directory adds to or replaces it, with each
//! file's key being its path relative to the directory.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use handlebars::Handlebars;
use serde_json::Value;
use thiserror::Error;

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        "/ac/user_confirm.html",
        "<html><body><p>Connect {{caller_display_name}} to the ticketing account \
         {{backend_display_name}}?</p>\
         <form method=\"post\" action=\"{{connect_submit_url}}\">\
         <input type=\"hidden\" name=\"jwt\" value=\"{{jwt}}\"/>\
         <button type=\"submit\">Connect</button></form></body></html>",
    ),
    (
        "/ac/user_connected.html",
        "<html><body><p>{{caller_display_name}} is now connected to \
         {{backend_display_name}}.</p></body></html>",
    ),
    (
        "/ac/user_disconnected.html",
        "<html><body><p>{{caller_display_name}} has been disconnected.</p>\
         </body></html>",
    ),
    (
        "/other/message.html",
        "<html><body><h2>{{header}}</h2><p>{{message}}</p></body></html>",
    ),
];

/// Errors raised while loading or rendering templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// No template is registered under the key.
    #[error("no template found for {key:?}")]
    Missing {
        /// Requested key.
        key: String,
    },
    /// The template source did not parse.
    #[error("invalid template {key:?}: {source}")]
    Parse {
        /// Template key.
        key: String,
        /// Parser error.
        #[source]
        source: Box<handlebars::TemplateError>,
    },
    /// Rendering failed.
    #[error("failed to render template {key:?}: {source}")]
    Render {
        /// Template key.
        key: String,
        /// Renderer error.
        #[source]
        source: Box<handlebars::RenderError>,
    },
    /// The template directory could not be read.
    #[error("failed to read templates from '{path}': {source}")]
    Io {
        /// Path that failed.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A template file name was not valid UTF-8.
    #[error("template path '{path}' is not valid UTF-8")]
    NonUtf8Path {
        /// Lossy rendering of the offending path.
        path: String,
    },
}

/// Handlebars-backed template store.
pub struct TemplateRegistry {
    engine: Handlebars<'static>,
}

impl TemplateRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            engine: Handlebars::new(),
        }
    }

    /// Creates a registry holding the built-in pages.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (key, source) in BUILTIN_TEMPLATES {
            // Exercised by `builtin_templates_parse`.
            if registry.register(key, source).is_err() {
                tracing::warn!(
                    target: concat!(env!("CARGO_PKG_NAME"), "::templates"),
                    key,
                    "built-in template failed to parse"
                );
            }
        }
        registry
    }

    /// Loads the built-in pages plus every file under `dir`.
    pub fn load(dir: Option<&Utf8Path>) -> Result<Self, TemplateError> {
        let mut registry = Self::builtin();
        if let Some(dir) = dir {
            registry.register_dir(dir, dir)?;
        }
        Ok(registry)
    }

    /// Registers `source` under `key`, replacing any existing template.
    pub fn register(&mut self, key: &str, source: &str) -> Result<(), TemplateError> {
        self.engine
            .register_template_string(key, source)
            .map_err(|source| TemplateError::Parse {
                key: key.to_owned(),
                source: Box::new(source),
            })
    }

    /// Reports whether a template is registered under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.engine.has_template(key)
    }

    /// Renders the template registered under `key`.
    pub fn render(&self, key: &str, values: &Value) -> Result<String, TemplateError> {
        if !self.contains(key) {
            return Err(TemplateError::Missing {
                key: key.to_owned(),
            });
        }
        self.engine
            .render(key, values)
            .map_err(|source| TemplateError::Render {
                key: key.to_owned(),
                source: Box::new(source),
            })
    }

    fn register_dir(&mut self, root: &Utf8Path, dir: &Utf8Path) -> Result<(), TemplateError> {
        let io_error = |source| TemplateError::Io {
            path: dir.to_path_buf(),
            source,
        };
        for entry in fs::read_dir(dir.as_std_path()).map_err(io_error)? {
            let entry = entry.map_err(io_error)?;
            let path = Utf8PathBuf::from_path_buf(entry.path()).map_err(|path| {
                TemplateError::NonUtf8Path {
                    path: path.display().to_string(),
                }
            })?;
            let file_type = entry.file_type().map_err(io_error)?;
            if file_type.is_dir() {
                self.register_dir(root, &path)?;
            } else if file_type.is_file() {
                let source = fs::read_to_string(path.as_std_path()).map_err(|source| {
                    TemplateError::Io {
                        path: path.clone(),
                        source,
                    }
                })?;
                self.register(&template_key(root, &path), &source)?;
            }
        }
        Ok(())
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn template_key(root: &Utf8Path, path: &Utf8Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let joined = relative
        .components()
        .map(|component| component.as_str())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{joined}")
}
