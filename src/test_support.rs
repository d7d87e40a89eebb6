//! Local HTTP stand-ins for image hosts, article pages and APIs.

use axum::{
    Router,
    http::{StatusCode, header},
    routing::{MethodRouter, get},
};
use std::time::Duration;

/// Serve `router` on an ephemeral localhost port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    format!("http://{addr}")
}

/// GET/HEAD route answering 200 with the given content type.
pub fn with_content_type(content_type: &'static str) -> MethodRouter {
    get(move || async move { ([(header::CONTENT_TYPE, content_type)], vec![0u8; 16]) })
}

pub fn status_only(code: u16) -> MethodRouter {
    get(move || async move { StatusCode::from_u16(code).expect("status code") })
}

/// An image host that takes far longer than any probe timeout used in tests.
pub fn slow_image() -> MethodRouter {
    get(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        ([(header::CONTENT_TYPE, "image/jpeg")], vec![0u8; 16])
    })
}
