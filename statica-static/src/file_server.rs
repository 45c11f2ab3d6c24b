//! File server implementation
//!
//! Resolves request paths against a [`ListingFileSystem`] and builds the
//! response: index pages, directory listings, conditional and range requests.

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{
    ACCEPT_RANGES, ALLOW, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, HeaderName,
    IF_MODIFIED_SINCE, LAST_MODIFIED, RANGE,
};
use http::{HeaderMap, HeaderValue, Method, Response, StatusCode};
use http_body_util::Full;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use statica_core::handler::{
    Handler, HttpRequest, HttpResponse, empty_response, forbidden, internal_error, not_found,
    redirect, text_response,
};
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::fs::{File, ListingFileSystem, ServedFile};
use crate::mime::type_by_extension;

const INDEX_PAGE: &str = "index.html";

/// Characters escaped in listing links
const HREF: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Static file server over a [`ListingFileSystem`]
pub struct FileServer {
    fs: ListingFileSystem,
}

/// Parsed `Range` header (single range, bytes unit)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteRange {
    /// No usable range, send everything
    Full,
    /// Inclusive byte positions
    Partial { start: u64, end: u64 },
    Unsatisfiable,
}

impl FileServer {
    pub fn new(fs: ListingFileSystem) -> Self {
        Self { fs }
    }

    /// Serve a file request
    pub async fn serve(&self, req: &HttpRequest) -> HttpResponse {
        let method = req.method();
        if method != Method::GET && method != Method::HEAD {
            let mut response = text_response(StatusCode::METHOD_NOT_ALLOWED, "405 Method Not Allowed\n");
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
            return response;
        }
        let is_head = method == Method::HEAD;

        let Ok(decoded) = percent_decode_str(req.uri().path()).decode_utf8() else {
            return text_response(StatusCode::BAD_REQUEST, "400 Bad Request\n");
        };
        let mut path = decoded.into_owned();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        if path.ends_with(&format!("/{INDEX_PAGE}")) {
            return local_redirect(req, "./");
        }

        tracing::debug!("📁 Serving request: {}", path);

        let mut file = match self.fs.open(&path).await {
            Ok(f) => f,
            Err(e) => return error_response(&path, &e),
        };

        if file.info().is_dir {
            if !path.ends_with('/') {
                return local_redirect(req, &format!("{}/", base(&path)));
            }

            let index_path = format!("{path}{INDEX_PAGE}");
            if let Ok(mut index) = self.fs.open(&index_path).await {
                if !index.info().is_dir {
                    return serve_file(req, &mut index, is_head).await;
                }
            }

            return dir_list(&mut file, is_head).await;
        }

        if path.ends_with('/') {
            return local_redirect(req, &format!("../{}", base(&path)));
        }

        serve_file(req, &mut file, is_head).await
    }
}

#[async_trait]
impl Handler for FileServer {
    async fn handle(&self, req: HttpRequest) -> HttpResponse {
        self.serve(&req).await
    }
}

async fn serve_file(req: &HttpRequest, file: &mut ServedFile, is_head: bool) -> HttpResponse {
    let info = file.info().clone();
    let last_modified = info.modified.map(httpdate::fmt_http_date);

    if not_modified(req.headers(), info.modified) {
        let mut response = empty_response(StatusCode::NOT_MODIFIED);
        if let Some(date) = &last_modified {
            insert_header(&mut response, LAST_MODIFIED, date);
        }
        return response;
    }

    let size = info.len;
    let range_header = req.headers().get(RANGE).and_then(|v| v.to_str().ok());
    let (status, start, length, content_range) = match parse_range(range_header, size) {
        ByteRange::Full => (StatusCode::OK, 0, size, None),
        ByteRange::Partial { start, end } => (
            StatusCode::PARTIAL_CONTENT,
            start,
            end - start + 1,
            Some(format!("bytes {start}-{end}/{size}")),
        ),
        ByteRange::Unsatisfiable => {
            let mut response =
                text_response(StatusCode::RANGE_NOT_SATISFIABLE, "416 Range Not Satisfiable\n");
            insert_header(&mut response, CONTENT_RANGE, &format!("bytes */{size}"));
            return response;
        }
    };

    let body = if is_head {
        Bytes::new()
    } else {
        match file.read_range(start, length).await {
            Ok(b) => b,
            Err(e) => return error_response(&info.name, &e),
        }
    };

    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    insert_header(&mut response, CONTENT_TYPE, &type_by_extension(&info.name));
    response
        .headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(length));
    response
        .headers_mut()
        .insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Some(date) = &last_modified {
        insert_header(&mut response, LAST_MODIFIED, date);
    }
    if let Some(range) = &content_range {
        insert_header(&mut response, CONTENT_RANGE, range);
    }
    response
}

/// Render the entries of a directory as links
async fn dir_list(dir: &mut ServedFile, is_head: bool) -> HttpResponse {
    let entries = match dir.read_dir().await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("Failed to read directory {}: {}", dir.info().name, e);
            return internal_error();
        }
    };

    let mut html = String::from("<pre>\n");
    for entry in entries {
        let mut name = entry.name;
        if entry.is_dir {
            name.push('/');
        }
        let href = utf8_percent_encode(&name, HREF).to_string();
        html.push_str(&format!(
            "<a href=\"{}\">{}</a>\n",
            html_escape::encode_double_quoted_attribute(&href),
            html_escape::encode_text(&name)
        ));
    }
    html.push_str("</pre>\n");

    let length = html.len() as u64;
    let body = if is_head { Bytes::new() } else { Bytes::from(html) };

    let mut response = Response::new(Full::new(body));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
        .headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(length));
    response
}

/// Map a file system error onto a status code
fn error_response(path: &str, err: &io::Error) -> HttpResponse {
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => not_found(),
        io::ErrorKind::PermissionDenied => forbidden(),
        _ => {
            tracing::error!("Failed to serve {}: {}", path, err);
            internal_error()
        }
    }
}

/// Redirect relative to the request path, keeping the query string
fn local_redirect(req: &HttpRequest, target: &str) -> HttpResponse {
    let location = match req.uri().query() {
        Some(query) => format!("{target}?{query}"),
        None => target.to_string(),
    };
    redirect(&location, StatusCode::MOVED_PERMANENTLY)
}

/// Last element of a slash-separated path
fn base(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return ".";
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// `If-Modified-Since` check at one-second resolution
fn not_modified(headers: &HeaderMap, modified: Option<SystemTime>) -> bool {
    let Some(modified) = modified else {
        return false;
    };
    let Some(since) = headers
        .get(IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| httpdate::parse_http_date(v).ok())
    else {
        return false;
    };

    let secs = |t: SystemTime| t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    secs(modified) <= secs(since)
}

/// Parse Range header (`bytes=start-end`, `bytes=start-`, `bytes=-suffix`)
fn parse_range(header: Option<&str>, size: u64) -> ByteRange {
    let Some(ranges) = header.and_then(|h| h.strip_prefix("bytes=")) else {
        return ByteRange::Full;
    };
    // Multiple ranges are answered with the whole file
    if ranges.contains(',') {
        return ByteRange::Full;
    }
    let Some((start, end)) = ranges.split_once('-') else {
        return ByteRange::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        let Ok(suffix) = end.parse::<u64>() else {
            return ByteRange::Full;
        };
        if suffix == 0 || size == 0 {
            return ByteRange::Unsatisfiable;
        }
        return ByteRange::Partial {
            start: size - suffix.min(size),
            end: size - 1,
        };
    }

    let Ok(start) = start.parse::<u64>() else {
        return ByteRange::Full;
    };
    if start >= size {
        return ByteRange::Unsatisfiable;
    }

    let end = if end.is_empty() {
        size - 1
    } else {
        match end.parse::<u64>() {
            Ok(e) if e < start => return ByteRange::Unsatisfiable,
            Ok(e) => e.min(size - 1),
            Err(_) => return ByteRange::Full,
        }
    };

    ByteRange::Partial { start, end }
}

fn insert_header(response: &mut HttpResponse, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            response.headers_mut().insert(name, v);
        }
        Err(e) => tracing::warn!("Skipping invalid {} header {:?}: {}", name, value, e),
    }
}
