//! Request handler abstraction
//!
//! Every piece that answers requests (the static file handler, exception
//! routes, configured responders) implements [`Handler`]. Handlers are shared
//! behind an `Arc` so the compiled handler can be cloned into every
//! connection task.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderValue, Request, Response, StatusCode};
use http_body_util::Full;
use percent_encoding::percent_decode_str;

/// Incoming request with its body already collected
pub type HttpRequest = Request<Bytes>;

/// Outgoing response
pub type HttpResponse = Response<Full<Bytes>>;

/// Shared, type-erased handler
pub type SharedHandler = Arc<dyn Handler>;

/// Something that turns a request into a response.
///
/// Handlers never fail: every error is translated into a status code by the
/// handler that hit it.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, req: HttpRequest) -> HttpResponse;
}

/// Handler backed by an async closure
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    async fn handle(&self, req: HttpRequest) -> HttpResponse {
        (self.0)(req).await
    }
}

/// Wrap an async closure into a [`SharedHandler`]
pub fn handler_fn<F, Fut>(f: F) -> SharedHandler
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Percent-decoded form of a request path.
///
/// Invalid UTF-8 sequences are replaced rather than rejected.
pub fn decoded_path(path: &str) -> Cow<'_, str> {
    percent_decode_str(path).decode_utf8_lossy()
}

/// Create a plain-text response
pub fn text_response(status: StatusCode, body: impl Into<Bytes>) -> HttpResponse {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Create a response with status code and no body
pub fn empty_response(status: StatusCode) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// 404 Not Found
pub fn not_found() -> HttpResponse {
    text_response(StatusCode::NOT_FOUND, "404 page not found\n")
}

/// 403 Forbidden
pub fn forbidden() -> HttpResponse {
    text_response(StatusCode::FORBIDDEN, "403 Forbidden\n")
}

/// 500 Internal Server Error
pub fn internal_error() -> HttpResponse {
    text_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "500 Internal Server Error\n",
    )
}

/// Create redirect response.
///
/// Falls back to a 500 when `to` is not a valid header value.
pub fn redirect(to: &str, status: StatusCode) -> HttpResponse {
    let Ok(location) = HeaderValue::try_from(to) else {
        tracing::error!("Invalid redirect target: {:?}", to);
        return internal_error();
    };
    let mut response = empty_response(status);
    response.headers_mut().insert(LOCATION, location);
    response
}
