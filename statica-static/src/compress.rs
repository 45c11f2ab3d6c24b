//! Compression support
//!
//! Gzip output goes through [`GzipWriter`]s handed out by a [`GzipPool`]. A
//! writer owns one reusable output buffer for the duration of a response and
//! gives it back to the pool when dropped, so the buffer returns even when the
//! request future is cancelled or panics.

use std::io;
use std::str::FromStr;

use async_compression::Level;
use async_compression::tokio::write::GzipEncoder;
use bytes::Bytes;
use http::HeaderMap;
use http::header::ACCEPT_ENCODING;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;

/// Idle buffers kept by a pool
const DEFAULT_MAX_IDLE: usize = 64;

/// Buffers that grew beyond this are not pooled
const MAX_POOLED_CAPACITY: usize = 1024 * 1024;

/// Compression level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompressionLevel {
    /// Fast compression
    Fast,
    /// Default compression
    #[default]
    Default,
    /// Best compression (slower)
    Best,
}

impl CompressionLevel {
    fn quality(self) -> Level {
        match self {
            CompressionLevel::Fast => Level::Fastest,
            CompressionLevel::Default => Level::Default,
            CompressionLevel::Best => Level::Best,
        }
    }
}

impl FromStr for CompressionLevel {
    type Err = statica_core::Error;

    fn from_str(s: &str) -> statica_core::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(CompressionLevel::Fast),
            "default" => Ok(CompressionLevel::Default),
            "best" => Ok(CompressionLevel::Best),
            _ => Err(statica_core::Error::Config(format!(
                "unknown gzip level '{}' (expected fast, default or best)",
                s
            ))),
        }
    }
}

/// Whether the client declared gzip support in `Accept-Encoding`
pub fn client_accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("gzip"))
}

/// Pool of gzip output buffers
#[derive(Debug)]
pub struct GzipPool {
    buffers: Mutex<Vec<Vec<u8>>>,
    level: CompressionLevel,
    max_idle: usize,
}

impl GzipPool {
    pub fn new(level: CompressionLevel) -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
            level,
            max_idle: DEFAULT_MAX_IDLE,
        }
    }

    pub fn level(&self) -> CompressionLevel {
        self.level
    }

    /// Take a writer; allocates a fresh buffer when the pool is empty
    pub fn acquire(&self) -> GzipWriter<'_> {
        let buf = self.buffers.lock().pop().unwrap_or_default();
        GzipWriter { pool: self, buf }
    }

    /// Number of idle buffers
    pub fn idle(&self) -> usize {
        self.buffers.lock().len()
    }

    fn release(&self, mut buf: Vec<u8>) {
        if buf.capacity() > MAX_POOLED_CAPACITY {
            return;
        }
        buf.clear();

        let mut buffers = self.buffers.lock();
        if buffers.len() < self.max_idle {
            buffers.push(buf);
        }
    }
}

impl Default for GzipPool {
    fn default() -> Self {
        Self::new(CompressionLevel::default())
    }
}

/// Response body compressor borrowed from a [`GzipPool`]
pub struct GzipWriter<'a> {
    pool: &'a GzipPool,
    buf: Vec<u8>,
}

impl GzipWriter<'_> {
    /// Gzip `data` into a complete gzip member
    pub async fn compress(&mut self, data: &[u8]) -> io::Result<Bytes> {
        self.buf.clear();
        let mut encoder =
            GzipEncoder::with_quality(std::mem::take(&mut self.buf), self.pool.level.quality());
        encoder.write_all(data).await?;
        encoder.shutdown().await?;
        self.buf = encoder.into_inner();

        Ok(Bytes::copy_from_slice(&self.buf))
    }
}

impl Drop for GzipWriter<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}
