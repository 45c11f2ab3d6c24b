//! Exception routes
//!
//! A [`RouteInfo`] is a route that takes priority over a fallback handler.
//! [`Chain`] evaluates routes in insertion order and hands the request to the
//! fallback when none of them match.

use std::fmt;

use async_trait::async_trait;
use http::Method;
use matchit::Router as RadixRouter;

use crate::error::{Error, Result};
use crate::handler::{Handler, HttpRequest, HttpResponse, SharedHandler, decoded_path};

/// A route registered ahead of a fallback handler
#[derive(Clone)]
pub struct RouteInfo {
    /// Allowed method (None = all)
    method: Option<Method>,
    /// Pattern as given by the caller
    pattern: String,
    /// Single-entry radix tree used as the path predicate
    matcher: RadixRouter<()>,
    handler: SharedHandler,
}

impl RouteInfo {
    /// Create a route.
    ///
    /// `pattern` accepts exact paths (`/health`), trailing globs (`/api/*`)
    /// and matchit syntax (`/users/{id}`, `/files/{*rest}`).
    pub fn new(method: Option<Method>, pattern: &str, handler: SharedHandler) -> Result<Self> {
        let mut matcher = RadixRouter::new();
        matcher
            .insert(glob_to_matchit(pattern), ())
            .map_err(|e| Error::Route {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            method,
            pattern: pattern.to_string(),
            matcher,
            handler,
        })
    }

    /// Route answering GET (and HEAD) requests
    pub fn get(pattern: &str, handler: SharedHandler) -> Result<Self> {
        Self::new(Some(Method::GET), pattern, handler)
    }

    /// Route answering every method
    pub fn any(pattern: &str, handler: SharedHandler) -> Result<Self> {
        Self::new(None, pattern, handler)
    }

    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn handler(&self) -> &SharedHandler {
        &self.handler
    }

    /// Check whether this route claims the request
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        let method_ok = match &self.method {
            None => true,
            Some(m) if m == method => true,
            Some(m) => *m == Method::GET && *method == Method::HEAD,
        };
        method_ok && self.matcher.at(path).is_ok()
    }
}

impl fmt::Debug for RouteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteInfo")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Convert glob pattern to matchit format
fn glob_to_matchit(path: &str) -> String {
    if let Some(prefix) = path.strip_suffix("/*") {
        format!("{prefix}/{{*rest}}")
    } else if let Some(prefix) = path.strip_suffix('*') {
        format!("{prefix}{{*rest}}")
    } else {
        path.to_string()
    }
}

/// Ordered exception routes followed by a fallback handler
pub struct Chain {
    routes: Vec<RouteInfo>,
    fallback: SharedHandler,
}

impl Chain {
    pub fn new(routes: Vec<RouteInfo>, fallback: SharedHandler) -> Self {
        Self { routes, fallback }
    }

    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }
}

#[async_trait]
impl Handler for Chain {
    async fn handle(&self, req: HttpRequest) -> HttpResponse {
        let claimed = {
            let path = decoded_path(req.uri().path());
            self.routes
                .iter()
                .find(|route| route.matches(req.method(), &path))
        };

        match claimed {
            Some(route) => {
                tracing::debug!("Exception route {} claimed {}", route.pattern, req.uri().path());
                route.handler.handle(req).await
            }
            None => self.fallback.handle(req).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler_fn, text_response};
    use bytes::Bytes;
    use http::{Request, StatusCode};
    use http_body_util::BodyExt;

    fn respond(body: &'static str) -> SharedHandler {
        handler_fn(move |_req: HttpRequest| async move { text_response(StatusCode::OK, body) })
    }

    fn get(path: &str) -> HttpRequest {
        Request::get(path).body(Bytes::new()).unwrap()
    }

    async fn body_of(response: HttpResponse) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[test]
    fn test_exact_match() {
        let route = RouteInfo::get("/api/users", respond("users")).unwrap();
        assert!(route.matches(&Method::GET, "/api/users"));
        assert!(route.matches(&Method::HEAD, "/api/users"));
        assert!(!route.matches(&Method::POST, "/api/users"));
        assert!(!route.matches(&Method::GET, "/api/posts"));
    }

    #[test]
    fn test_wildcard_match() {
        let route = RouteInfo::any("/api/*", respond("api")).unwrap();
        assert!(route.matches(&Method::DELETE, "/api/users/123"));
        assert!(!route.matches(&Method::GET, "/static/app.js"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = RouteInfo::any("/files/{*a}/{*b}", respond("x")).unwrap_err();
        assert!(matches!(err, Error::Route { .. }));
    }

    #[tokio::test]
    async fn test_chain_priority_is_insertion_order() {
        let chain = Chain::new(
            vec![
                RouteInfo::any("/api/*", respond("first")).unwrap(),
                RouteInfo::any("/api/users", respond("second")).unwrap(),
            ],
            respond("fallback"),
        );

        assert_eq!(body_of(chain.handle(get("/api/users")).await).await, "first");
        assert_eq!(body_of(chain.handle(get("/index.html")).await).await, "fallback");
    }

    #[tokio::test]
    async fn test_chain_matches_decoded_path() {
        let chain = Chain::new(
            vec![RouteInfo::get("/my files/*", respond("files")).unwrap()],
            respond("fallback"),
        );

        assert_eq!(body_of(chain.handle(get("/my%20files/a.txt")).await).await, "files");
        assert_eq!(body_of(chain.handle(get("/my%2Dfiles/a.txt")).await).await, "fallback");
    }
}
