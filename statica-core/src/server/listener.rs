//! Connection loop
//!
//! Accepts TCP connections and drives each one with hyper's HTTP/1 server,
//! handing every request to a [`SharedHandler`].

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use http_body_util::BodyExt;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, body::Incoming};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::error::{Error, Result};
use crate::handler::{HttpResponse, SharedHandler, text_response};

/// Pause after a failed accept (e.g. out of file descriptors)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Bind a listener, mapping failures to a server error
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Server(format!("Failed to bind {}: {}", addr, e)))
}

/// Serve connections until `shutdown` resolves.
///
/// Accept errors are logged and retried after a short pause. Connections already in flight keep
/// running on their own tasks after shutdown.
pub async fn serve<S>(listener: TcpListener, handler: SharedHandler, shutdown: S) -> Result<()>
where
    S: Future<Output = ()>,
{
    let local = listener.local_addr()?;
    tracing::info!("🚀 Listening on http://{}", local);

    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(s) => s,
                Err(e) => {
                    accept_failed(&e).await;
                    continue;
                }
            },
            () = &mut shutdown => {
                tracing::info!("Shutting down listener on {}", local);
                return Ok(());
            }
        };

        let io = TokioIo::new(stream);
        let handler = Arc::clone(&handler);

        tokio::task::spawn(async move {
            let service = service_fn(move |req| dispatch(Arc::clone(&handler), req));
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                tracing::debug!("Error serving connection from {}: {:?}", peer, err);
            }
        });
    }
}

async fn accept_failed(err: &std::io::Error) {
    tracing::warn!("Accept error: {}", err);
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

async fn dispatch(
    handler: SharedHandler,
    req: Request<Incoming>,
) -> std::result::Result<HttpResponse, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::warn!("Failed to read request body: {}", e);
            return Ok(text_response(StatusCode::BAD_REQUEST, "400 Bad Request\n"));
        }
    };

    Ok(handler.handle(Request::from_parts(parts, body)).await)
}
