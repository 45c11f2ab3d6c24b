//! File system access
//!
//! The file server reads through the [`FileSystem`] trait so the directory on
//! disk ([`DirFileSystem`]) can be swapped for other sources. The
//! [`ListingFileSystem`] wrapper decides at open time whether the returned
//! handle may enumerate its directory.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Metadata of an opened file or directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub is_dir: bool,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

/// An opened file or directory
#[async_trait]
pub trait File: Send + Sync {
    fn info(&self) -> &FileInfo;

    /// Entries of a directory, sorted by name
    async fn read_dir(&mut self) -> io::Result<Vec<FileInfo>>;

    /// Read `len` bytes starting at `offset`
    async fn read_range(&mut self, offset: u64, len: u64) -> io::Result<Bytes>;
}

/// Source of files addressed by slash-separated paths
#[async_trait]
pub trait FileSystem: Send + Sync + 'static {
    async fn open(&self, name: &str) -> io::Result<Box<dyn File>>;
}

/// Files below a root directory on disk
#[derive(Debug, Clone)]
pub struct DirFileSystem {
    root: PathBuf,
}

impl DirFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a request path onto the root.
    ///
    /// `..` segments are resolved lexically and can never climb above the
    /// root; segments carrying separators or NUL bytes are rejected.
    fn resolve(&self, name: &str) -> io::Result<PathBuf> {
        let mut segments: Vec<&str> = Vec::new();
        for segment in name.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s if s.contains(['\\', '\0']) => {
                    return Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        "invalid character in file path",
                    ));
                }
                s => segments.push(s),
            }
        }

        let mut path = self.root.clone();
        for segment in segments {
            // A segment such as "C:" would be a prefix component on Windows
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => path.push(part),
                _ => {
                    return Err(io::Error::new(io::ErrorKind::NotFound, "invalid path segment"));
                }
            }
        }
        Ok(path)
    }
}

#[async_trait]
impl FileSystem for DirFileSystem {
    async fn open(&self, name: &str) -> io::Result<Box<dyn File>> {
        let path = self.resolve(name)?;
        let file = tokio::fs::File::open(&path).await?;
        let metadata = file.metadata().await?;

        let info = FileInfo {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "/".to_string()),
            is_dir: metadata.is_dir(),
            len: metadata.len(),
            modified: metadata.modified().ok(),
        };

        Ok(Box::new(OsFile { info, path, file }))
    }
}

/// Handle returned by [`DirFileSystem`]
struct OsFile {
    info: FileInfo,
    path: PathBuf,
    file: tokio::fs::File,
}

#[async_trait]
impl File for OsFile {
    fn info(&self) -> &FileInfo {
        &self.info
    }

    async fn read_dir(&mut self) -> io::Result<Vec<FileInfo>> {
        if !self.info.is_dir {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a directory"));
        }

        let mut entries = tokio::fs::read_dir(&self.path).await?;
        let mut listing = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            // Follow symlinks; entries that vanish or cannot be read are skipped
            let Ok(metadata) = tokio::fs::metadata(entry.path()).await else {
                continue;
            };
            listing.push(FileInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: metadata.is_dir(),
                len: metadata.len(),
                modified: metadata.modified().ok(),
            });
        }

        listing.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    async fn read_range(&mut self, offset: u64, len: u64) -> io::Result<Bytes> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "range too large"))?;

        if offset > 0 {
            self.file.seek(io::SeekFrom::Start(offset)).await?;
        }

        let mut content = vec![0u8; len];
        self.file.read_exact(&mut content).await?;
        Ok(Bytes::from(content))
    }
}

/// File handle as handed to the file server
pub enum ServedFile {
    /// Handle used unchanged
    Passthrough(Box<dyn File>),
    /// Handle whose directory listing is always empty
    NonListing(Box<dyn File>),
}

#[async_trait]
impl File for ServedFile {
    fn info(&self) -> &FileInfo {
        match self {
            ServedFile::Passthrough(f) | ServedFile::NonListing(f) => f.info(),
        }
    }

    async fn read_dir(&mut self) -> io::Result<Vec<FileInfo>> {
        match self {
            ServedFile::Passthrough(f) => f.read_dir().await,
            ServedFile::NonListing(_) => Ok(Vec::new()),
        }
    }

    async fn read_range(&mut self, offset: u64, len: u64) -> io::Result<Bytes> {
        match self {
            ServedFile::Passthrough(f) | ServedFile::NonListing(f) => {
                f.read_range(offset, len).await
            }
        }
    }
}

/// Wrapper that optionally suppresses directory enumeration
#[derive(Clone)]
pub struct ListingFileSystem {
    inner: Arc<dyn FileSystem>,
    list_directories: bool,
}

impl ListingFileSystem {
    pub fn new(inner: Arc<dyn FileSystem>, list_directories: bool) -> Self {
        Self {
            inner,
            list_directories,
        }
    }

    pub async fn open(&self, name: &str) -> io::Result<ServedFile> {
        let file = self.inner.open(name).await?;

        if self.list_directories {
            Ok(ServedFile::Passthrough(file))
        } else {
            Ok(ServedFile::NonListing(file))
        }
    }
}
