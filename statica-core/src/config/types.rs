//! Configuration type definitions
//!
//! These types represent the runtime configuration for Statica.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;

use crate::error::{Error, Result};

/// Root configuration for Statica
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticaConfig {
    /// Debug mode
    #[serde(default)]
    pub debug: bool,

    /// Listen address (`host:port`, or `:port` for all interfaces)
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Static directories, dispatched in order
    #[serde(default)]
    pub mounts: Vec<MountConfig>,
}

impl Default for StaticaConfig {
    fn default() -> Self {
        Self {
            debug: false,
            listen: default_listen(),
            mounts: Vec::new(),
        }
    }
}

/// One served directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountConfig {
    /// Directory on disk
    pub root: String,

    /// URL prefix (defaults to the web form of `root`)
    #[serde(default)]
    pub path: Option<String>,

    /// Gzip responses for clients that accept it
    #[serde(default)]
    pub gzip: bool,

    /// Gzip level: `fast`, `default` or `best`
    #[serde(default = "default_gzip_level")]
    pub gzip_level: String,

    /// Show directory contents
    #[serde(default)]
    pub listing: bool,

    /// Remove `path` from the request path before resolving files
    #[serde(default = "default_bool_true")]
    pub strip_path: bool,

    /// Routes that take priority over the files, highest priority first
    #[serde(default)]
    pub except: Vec<ExceptionConfig>,
}

/// Route answered instead of the static files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionConfig {
    /// Path pattern to match
    pub path: String,

    /// Allowed method (None = all)
    #[serde(default)]
    pub method: Option<String>,

    /// Handler for this route
    pub handler: HandlerConfig,
}

/// Handler configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HandlerConfig {
    /// Respond with static content
    Respond {
        #[serde(default = "default_status_code")]
        status: u16,
        body: Option<String>,
        #[serde(default)]
        headers: HashMap<String, String>,
    },

    /// Redirect
    Redirect {
        to: String,
        #[serde(default = "default_redirect_code")]
        code: u16,
    },
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

/// Accepted values of [`MountConfig::gzip_level`]
pub const GZIP_LEVELS: [&str; 3] = ["fast", "default", "best"];

fn default_gzip_level() -> String {
    "default".to_string()
}

fn default_bool_true() -> bool {
    true
}

fn default_redirect_code() -> u16 {
    302
}

fn default_status_code() -> u16 {
    200
}

/// Expand `:port` shorthand into an all-interfaces address
pub fn normalize_listen(listen: &str) -> String {
    if listen.starts_with(':') {
        format!("0.0.0.0{}", listen)
    } else {
        listen.to_string()
    }
}

impl StaticaConfig {
    /// Parsed listen address
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        normalize_listen(&self.listen)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid listen address '{}': {}", self.listen, e)))
    }

    /// Check the configuration for values that cannot be served
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;

        if self.mounts.is_empty() {
            return Err(Error::Config("At least one mount is required".to_string()));
        }

        for mount in &self.mounts {
            if mount.root.trim().is_empty() {
                return Err(Error::Config("Mount root must not be empty".to_string()));
            }

            if !GZIP_LEVELS
                .iter()
                .any(|level| level.eq_ignore_ascii_case(&mount.gzip_level))
            {
                return Err(Error::Config(format!(
                    "Invalid gzip level '{}' for {}",
                    mount.gzip_level, mount.root
                )));
            }

            for exception in &mount.except {
                if let Some(method) = &exception.method {
                    http::Method::from_bytes(method.as_bytes()).map_err(|_| {
                        Error::Config(format!("Invalid method '{}' for {}", method, exception.path))
                    })?;
                }

                let code = match &exception.handler {
                    HandlerConfig::Respond { status, .. } => *status,
                    HandlerConfig::Redirect { code, .. } => *code,
                };
                if http::StatusCode::from_u16(code).is_err() {
                    return Err(Error::Config(format!(
                        "Invalid status code {} for {}",
                        code, exception.path
                    )));
                }
            }
        }

        Ok(())
    }
}
