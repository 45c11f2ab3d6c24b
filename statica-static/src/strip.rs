//! Request path prefix stripping

use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use http::uri::{PathAndQuery, Uri};
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use statica_core::handler::{
    Handler, HttpRequest, HttpResponse, SharedHandler, not_found, text_response,
};

/// Characters re-encoded in the rewritten path
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Removes a fixed prefix from the request path before calling `inner`.
///
/// The prefix is matched against the percent-decoded path. Requests whose
/// path does not start with the prefix get a 404 and never reach `inner`.
pub struct StripPrefix {
    prefix: String,
    inner: SharedHandler,
}

impl StripPrefix {
    pub fn new(prefix: impl Into<String>, inner: SharedHandler) -> Self {
        Self {
            prefix: prefix.into(),
            inner,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// Wrap `inner` with prefix stripping; an empty prefix returns `inner` as is
pub fn strip_prefix(prefix: &str, inner: SharedHandler) -> SharedHandler {
    if prefix.is_empty() {
        return inner;
    }
    Arc::new(StripPrefix::new(prefix, inner))
}

#[async_trait]
impl Handler for StripPrefix {
    async fn handle(&self, req: HttpRequest) -> HttpResponse {
        let rest = {
            let Ok(path) = percent_decode_str(req.uri().path()).decode_utf8() else {
                return text_response(StatusCode::BAD_REQUEST, "400 Bad Request\n");
            };
            let Some(rest) = path.strip_prefix(self.prefix.as_str()) else {
                tracing::debug!("{} does not start with {}", path, self.prefix);
                return not_found();
            };
            utf8_percent_encode(rest, PATH).to_string()
        };

        match rewrite_path(req, &rest) {
            Some(req) => self.inner.handle(req).await,
            None => text_response(StatusCode::BAD_REQUEST, "400 Bad Request\n"),
        }
    }
}

/// Replace the path of `req`, keeping its query string.
///
/// The new path always starts with a slash.
fn rewrite_path(req: HttpRequest, path: &str) -> Option<HttpRequest> {
    let (mut parts, body) = req.into_parts();

    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path,
    };

    let mut uri_parts = std::mem::take(&mut parts.uri).into_parts();
    uri_parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    parts.uri = Uri::from_parts(uri_parts).ok()?;

    Some(HttpRequest::from_parts(parts, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Request;
    use http_body_util::BodyExt;
    use statica_core::handler::handler_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the path and query it was called with
    fn echo(calls: Arc<AtomicUsize>) -> SharedHandler {
        handler_fn(move |req: HttpRequest| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                let seen = req
                    .uri()
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_default();
                text_response(StatusCode::OK, seen)
            }
        })
    }

    fn get(uri: &str) -> HttpRequest {
        Request::get(uri).body(Bytes::new()).unwrap()
    }

    async fn body_of(response: HttpResponse) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_strips_matching_prefix() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = strip_prefix("/static", echo(Arc::clone(&calls)));

        let response = handler.handle(get("/static/x")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, "/x");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mismatch_is_not_found_without_calling_inner() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = strip_prefix("/static", echo(Arc::clone(&calls)));

        let response = handler.handle(get("/other/x")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_keeps_query_and_absolute_uri() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = strip_prefix("/static", echo(calls));

        let response = handler.handle(get("http://example.com/static/app.js?v=3")).await;
        assert_eq!(body_of(response).await, "/app.js?v=3");
    }

    #[tokio::test]
    async fn test_bare_prefix_becomes_root() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = strip_prefix("/static", echo(calls));

        assert_eq!(body_of(handler.handle(get("/static")).await).await, "/");
        assert_eq!(body_of(handler.handle(get("/staticfoo")).await).await, "/foo");
    }

    #[tokio::test]
    async fn test_prefix_matches_decoded_path() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = strip_prefix("/my site", echo(Arc::clone(&calls)));

        let response = handler.handle(get("/my%20site/a%20b.txt?q=1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, "/a%20b.txt?q=1");

        // A literal percent sign survives the round trip
        let response = handler.handle(get("/my%20site/100%25.txt")).await;
        assert_eq!(body_of(response).await, "/100%25.txt");

        let response = handler.handle(get("/my%2Dsite/a.txt")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_bad_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = strip_prefix("/static", echo(Arc::clone(&calls)));

        let response = handler.handle(get("/static/%FF.txt")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_prefix_is_identity() {
        let calls = Arc::new(AtomicUsize::new(0));
        let inner = echo(Arc::clone(&calls));
        let handler = strip_prefix("", Arc::clone(&inner));

        assert!(Arc::ptr_eq(&handler, &inner));
        assert_eq!(body_of(handler.handle(get("/any/path")).await).await, "/any/path");
    }
}
