//! Configured handlers
//!
//! Turns [`HandlerConfig`] entries from the configuration file into
//! [`SharedHandler`]s and [`RouteInfo`] exception routes.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{Method, StatusCode};

use crate::config::{ExceptionConfig, HandlerConfig};
use crate::error::{Error, Result};
use crate::handler::{
    Handler, HttpRequest, HttpResponse, SharedHandler, empty_response, redirect, text_response,
};
use crate::route::RouteInfo;

/// Fixed response with pre-validated headers
struct Respond {
    status: StatusCode,
    body: Option<Bytes>,
    headers: Vec<(HeaderName, HeaderValue)>,
}

#[async_trait]
impl Handler for Respond {
    async fn handle(&self, _req: HttpRequest) -> HttpResponse {
        let mut response = match &self.body {
            Some(body) => text_response(self.status, body.clone()),
            None => empty_response(self.status),
        };
        for (name, value) in &self.headers {
            response.headers_mut().insert(name.clone(), value.clone());
        }
        response
    }
}

struct Redirect {
    to: String,
    status: StatusCode,
}

#[async_trait]
impl Handler for Redirect {
    async fn handle(&self, _req: HttpRequest) -> HttpResponse {
        redirect(&self.to, self.status)
    }
}

fn status_code(code: u16) -> Result<StatusCode> {
    StatusCode::from_u16(code).map_err(|e| Error::Config(format!("Invalid status {}: {}", code, e)))
}

/// Build a handler from its configuration
pub fn build_handler(config: &HandlerConfig) -> Result<SharedHandler> {
    match config {
        HandlerConfig::Respond {
            status,
            body,
            headers,
        } => {
            let mut parsed = Vec::with_capacity(headers.len());
            for (name, value) in headers {
                let name = HeaderName::try_from(name.as_str())
                    .map_err(|e| Error::Config(format!("Invalid header name '{}': {}", name, e)))?;
                let value = HeaderValue::try_from(value.as_str())
                    .map_err(|e| Error::Config(format!("Invalid header value for {}: {}", name, e)))?;
                parsed.push((name, value));
            }

            Ok(Arc::new(Respond {
                status: status_code(*status)?,
                body: body.clone().map(Bytes::from),
                headers: parsed,
            }))
        }

        HandlerConfig::Redirect { to, code } => Ok(Arc::new(Redirect {
            to: to.clone(),
            status: status_code(*code)?,
        })),
    }
}

/// Build an exception route from its configuration
pub fn build_route(config: &ExceptionConfig) -> Result<RouteInfo> {
    let method = config
        .method
        .as_deref()
        .map(|m| {
            Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                .map_err(|e| Error::Config(format!("Invalid method '{}': {}", m, e)))
        })
        .transpose()?;

    RouteInfo::new(method, &config.path, build_handler(&config.handler)?)
}
