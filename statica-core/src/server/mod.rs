//! HTTP Server implementation

mod handlers;
mod listener;

pub use self::handlers::{build_handler, build_route};
pub use self::listener::{bind, serve};
