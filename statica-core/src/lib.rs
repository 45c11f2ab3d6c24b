//! Statica Core Library
//!
//! This crate provides the pieces shared by the Statica crates: the
//! [`Handler`](handler::Handler) abstraction, exception routes and the
//! priority chain, configuration loading, and the HTTP connection loop.

pub mod config;
pub mod error;
pub mod handler;
pub mod route;
pub mod server;

pub use error::{Error, Result};
pub use handler::{Handler, HttpRequest, HttpResponse, SharedHandler, handler_fn};
pub use route::{Chain, RouteInfo};

/// Statica version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
