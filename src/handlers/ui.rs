//! Serves the single-page UI. The page is embedded into the binary at
//! compile time so deployment is one file.

use actix_web::HttpResponse;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// ## Endpoint: `GET /`
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}
