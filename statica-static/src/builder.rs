//! Static handler builder
//!
//! [`StaticHandlerBuilder`] collects the settings of one static mount and
//! compiles them into a single [`SharedHandler`] the first time
//! [`build`](StaticHandlerBuilder::build) is called:
//!
//! ```text
//! Chain(exceptions...) -> StaticHandler(gzip) -> StripPrefix -> FileServer -> ListingFileSystem
//! ```
//!
//! The compiled handler is frozen. Later configuration calls are logged and
//! ignored.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use http::header::{ACCEPT_RANGES, CONTENT_ENCODING, CONTENT_LENGTH, VARY};
use http::{HeaderValue, Method, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use statica_core::handler::{Handler, HttpRequest, HttpResponse, SharedHandler, internal_error};
use statica_core::route::{Chain, RouteInfo};

use crate::compress::{CompressionLevel, GzipPool, GzipWriter, client_accepts_gzip};
use crate::file_server::FileServer;
use crate::fs::{DirFileSystem, FileSystem, ListingFileSystem};
use crate::path::{abs, to_web_path};
use crate::strip::strip_prefix;

/// Settings of a static mount
#[derive(Debug, Clone)]
pub struct StaticHandlerConfig {
    /// Absolute directory the files are served from
    pub root_directory: PathBuf,
    /// URL prefix of the mount
    pub request_path: String,
    pub strip_path: bool,
    pub gzip: bool,
    pub gzip_level: CompressionLevel,
    pub list_directories: bool,
    /// Routes answered before the files, in priority order
    pub exceptions: Vec<RouteInfo>,
}

/// Fluent builder for a static file handler
pub struct StaticHandlerBuilder {
    config: StaticHandlerConfig,
    fs: Arc<dyn FileSystem>,
    handler: OnceLock<SharedHandler>,
}

impl StaticHandlerBuilder {
    /// Serve the directory `dir` from disk.
    ///
    /// The URL prefix defaults to `dir` converted with [`to_web_path`].
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let root = abs(dir.as_ref());
        let fs: Arc<dyn FileSystem> = Arc::new(DirFileSystem::new(root.clone()));
        Self::with_root(dir.as_ref(), root, fs)
    }

    /// Like [`new`](Self::new) but reads files through `fs`
    pub fn with_file_system(dir: impl AsRef<Path>, fs: Arc<dyn FileSystem>) -> Self {
        let root = abs(dir.as_ref());
        Self::with_root(dir.as_ref(), root, fs)
    }

    fn with_root(dir: &Path, root: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            config: StaticHandlerConfig {
                root_directory: root,
                request_path: to_web_path(&dir.to_string_lossy()),
                strip_path: true,
                gzip: false,
                gzip_level: CompressionLevel::default(),
                list_directories: false,
                exceptions: Vec::new(),
            },
            fs,
            handler: OnceLock::new(),
        }
    }

    /// Override the URL prefix; normalized with [`to_web_path`]
    pub fn path(mut self, request_path: impl AsRef<str>) -> Self {
        if self.accepts_changes("path") {
            self.config.request_path = to_web_path(request_path.as_ref());
        }
        self
    }

    /// Compress responses for clients that accept gzip
    pub fn gzip(mut self, enable: bool) -> Self {
        if self.accepts_changes("gzip") {
            self.config.gzip = enable;
        }
        self
    }

    /// Trade compression speed for size
    pub fn gzip_level(mut self, level: CompressionLevel) -> Self {
        if self.accepts_changes("gzip_level") {
            self.config.gzip_level = level;
        }
        self
    }

    /// Allow directory contents to be listed
    pub fn listing(mut self, enable: bool) -> Self {
        if self.accepts_changes("listing") {
            self.config.list_directories = enable;
        }
        self
    }

    /// Remove the URL prefix before resolving files
    pub fn strip_path(mut self, enable: bool) -> Self {
        if self.accepts_changes("strip_path") {
            self.config.strip_path = enable;
        }
        self
    }

    /// Append routes that are answered before the files
    pub fn except(mut self, routes: impl IntoIterator<Item = RouteInfo>) -> Self {
        if self.accepts_changes("except") {
            self.config.exceptions.extend(routes);
        }
        self
    }

    pub fn config(&self) -> &StaticHandlerConfig {
        &self.config
    }

    pub fn is_built(&self) -> bool {
        self.handler.get().is_some()
    }

    /// Compile the handler, once.
    ///
    /// Every call, from any thread, returns the same handler.
    pub fn build(&self) -> SharedHandler {
        Arc::clone(self.handler.get_or_init(|| self.compose()))
    }

    fn accepts_changes(&self, setting: &str) -> bool {
        if self.is_built() {
            tracing::warn!(
                "Ignoring {} change for {}: handler already built",
                setting,
                self.config.request_path
            );
            return false;
        }
        true
    }

    fn compose(&self) -> SharedHandler {
        let config = &self.config;
        tracing::info!(
            "📂 Static mount {} -> {} (gzip: {}, listing: {}, strip: {}, exceptions: {})",
            config.request_path,
            config.root_directory.display(),
            config.gzip,
            config.list_directories,
            config.strip_path,
            config.exceptions.len()
        );

        let fs = ListingFileSystem::new(Arc::clone(&self.fs), config.list_directories);
        let mut handler: SharedHandler = Arc::new(FileServer::new(fs));

        if config.strip_path {
            handler = strip_prefix(&config.request_path, handler);
        }

        let pool = config.gzip.then(|| GzipPool::new(config.gzip_level));
        let handler: SharedHandler = Arc::new(StaticHandler::new(handler, pool));

        if config.exceptions.is_empty() {
            handler
        } else {
            Arc::new(Chain::new(config.exceptions.clone(), handler))
        }
    }
}

/// Outermost layer of a static mount, compressing responses when enabled
pub struct StaticHandler {
    inner: SharedHandler,
    gzip: Option<GzipPool>,
}

impl StaticHandler {
    pub fn new(inner: SharedHandler, gzip: Option<GzipPool>) -> Self {
        Self { inner, gzip }
    }

    pub fn gzip_pool(&self) -> Option<&GzipPool> {
        self.gzip.as_ref()
    }
}

#[async_trait]
impl Handler for StaticHandler {
    async fn handle(&self, req: HttpRequest) -> HttpResponse {
        let pool = match &self.gzip {
            Some(pool) if client_accepts_gzip(req.headers()) => pool,
            _ => return self.inner.handle(req).await,
        };

        let is_head = req.method() == Method::HEAD;
        let mut writer = pool.acquire();
        let response = self.inner.handle(req).await;
        gzip_response(response, &mut writer, is_head).await
    }
}

async fn gzip_response(response: HttpResponse, writer: &mut GzipWriter<'_>, is_head: bool) -> HttpResponse {
    let (mut parts, body) = response.into_parts();

    parts
        .headers
        .append(VARY, HeaderValue::from_static("Accept-Encoding"));
    parts
        .headers
        .insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    parts.headers.remove(ACCEPT_RANGES);

    let bodiless = is_head
        || parts.status == StatusCode::NOT_MODIFIED
        || parts.status == StatusCode::NO_CONTENT;
    if bodiless {
        parts.headers.remove(CONTENT_LENGTH);
        return Response::from_parts(parts, Full::default());
    }

    let data = body
        .collect()
        .await
        .unwrap_or_else(|never| match never {})
        .to_bytes();

    match writer.compress(&data).await {
        Ok(compressed) => {
            parts
                .headers
                .insert(CONTENT_LENGTH, HeaderValue::from(compressed.len()));
            Response::from_parts(parts, Full::new(compressed))
        }
        Err(e) => {
            tracing::error!("Gzip compression failed: {}", e);
            internal_error()
        }
    }
}
