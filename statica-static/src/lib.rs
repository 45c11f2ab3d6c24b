//! Statica Static File Module
//!
//! Builds request handlers that serve a directory:
//! - URL prefix stripping
//! - Directory listing suppression
//! - MIME type detection
//! - Gzip compression with pooled buffers
//! - Exception routes answered before the files

pub mod builder;
pub mod compress;
pub mod file_server;
pub mod fs;
pub mod mime;
pub mod path;
pub mod strip;

pub use builder::{StaticHandler, StaticHandlerBuilder, StaticHandlerConfig};
pub use compress::{CompressionLevel, GzipPool};
pub use file_server::FileServer;
pub use fs::{DirFileSystem, File, FileInfo, FileSystem, ListingFileSystem, ServedFile};
pub use mime::type_by_extension;
pub use path::{abs, directory_exists, to_web_path};
pub use strip::{StripPrefix, strip_prefix};
