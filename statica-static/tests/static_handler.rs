use std::io::Read;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use statica_core::handler::{
    Handler, HttpRequest, HttpResponse, SharedHandler, handler_fn, text_response,
};
use statica_core::route::RouteInfo;
use statica_static::StaticHandlerBuilder;

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>Home</h1>").unwrap();
    std::fs::write(dir.path().join("app.js"), "export const answer = 42;\n".repeat(40)).unwrap();
    std::fs::create_dir(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("assets/logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
    std::fs::write(dir.path().join("assets/data.json"), "{}").unwrap();
    dir
}

fn get(uri: &str) -> HttpRequest {
    Request::get(uri).body(Bytes::new()).unwrap()
}

fn get_gzip(uri: &str) -> HttpRequest {
    Request::get(uri)
        .header("accept-encoding", "gzip")
        .body(Bytes::new())
        .unwrap()
}

async fn body_of(response: HttpResponse) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn content_type(response: &HttpResponse) -> &str {
    response.headers()["content-type"].to_str().unwrap()
}

#[tokio::test]
async fn test_serves_site() {
    let dir = site();
    let handler = StaticHandlerBuilder::new(dir.path()).path("/static").build();

    let response = handler.handle(get("/static/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(content_type(&response).starts_with("text/html"));
    assert_eq!(body_of(response).await, "<h1>Home</h1>");

    let response = handler.handle(get("/static/app.js")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "application/javascript");

    let response = handler.handle(get("/static/assets/logo.png")).await;
    assert_eq!(content_type(&response), "image/png");

    let response = handler.handle(get("/static/assets/data.json")).await;
    assert_eq!(content_type(&response), "application/json");

    let response = handler.handle(get("/static/missing.html")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_listing_toggle() {
    let dir = site();

    let hidden = StaticHandlerBuilder::new(dir.path()).path("/static").build();
    let response = hidden.handle(get("/static/assets/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_of(response).await;
    assert!(!String::from_utf8_lossy(&body).contains("<a "));

    let shown = StaticHandlerBuilder::new(dir.path())
        .path("/static")
        .listing(true)
        .build();
    let body = body_of(shown.handle(get("/static/assets/")).await).await;
    let body = String::from_utf8_lossy(&body);
    assert!(body.contains("<a href=\"data.json\">data.json</a>"));
    assert!(body.contains("<a href=\"logo.png\">logo.png</a>"));
}

#[tokio::test]
async fn test_gzip_end_to_end() {
    let dir = site();
    let handler = StaticHandlerBuilder::new(dir.path())
        .path("/static")
        .gzip(true)
        .build();

    let response = handler.handle(get_gzip("/static/app.js")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["vary"], "Accept-Encoding");
    assert_eq!(response.headers()["content-encoding"], "gzip");
    assert_eq!(content_type(&response), "application/javascript");

    let body = body_of(response).await;
    let mut decoded = String::new();
    flate2::read::GzDecoder::new(&body[..])
        .read_to_string(&mut decoded)
        .unwrap();
    assert_eq!(decoded, "export const answer = 42;\n".repeat(40));
}

#[tokio::test]
async fn test_exceptions_before_files() {
    let dir = site();
    let version: SharedHandler =
        handler_fn(|_req| async { text_response(StatusCode::OK, "v1") });
    let override_index: SharedHandler =
        handler_fn(|_req| async { text_response(StatusCode::OK, "maintenance") });

    let handler = StaticHandlerBuilder::new(dir.path())
        .path("/static")
        .except([
            RouteInfo::get("/static/version", Arc::clone(&version)).unwrap(),
            RouteInfo::get("/static/", override_index).unwrap(),
        ])
        .build();

    assert_eq!(body_of(handler.handle(get("/static/version")).await).await, "v1");
    assert_eq!(body_of(handler.handle(get("/static/")).await).await, "maintenance");

    // GET routes do not claim other methods
    let post = Request::builder()
        .method(Method::POST)
        .uri("/static/version")
        .body(Bytes::new())
        .unwrap();
    assert_eq!(
        handler.handle(post).await.status(),
        StatusCode::METHOD_NOT_ALLOWED
    );

    let response = handler.handle(get("/static/app.js")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_handler() {
    let dir = site();
    let builder = Arc::new(
        StaticHandlerBuilder::new(dir.path())
            .path("/static")
            .gzip(true),
    );

    let mut tasks = Vec::new();
    for i in 0..16 {
        let builder = Arc::clone(&builder);
        tasks.push(tokio::spawn(async move {
            let handler = builder.build();
            let request = if i % 2 == 0 { get_gzip("/static/app.js") } else { get("/static/app.js") };
            let response = handler.handle(request).await;
            (handler, response.status())
        }));
    }

    let mut handlers = Vec::new();
    for task in tasks {
        let (handler, status) = task.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        handlers.push(handler);
    }
    for handler in &handlers {
        assert!(Arc::ptr_eq(handler, &handlers[0]));
    }
}
