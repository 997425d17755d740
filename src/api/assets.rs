//! Embedded static assets
//!
//! Debug builds read `ui/` from disk at request time; release builds carry
//! the files in the binary.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "ui"]
struct Assets;

/// Serve an embedded static file by request path
pub async fn serve_static(req: Request<Body>) -> Response {
    let path = req.uri().path().trim_start_matches('/');

    match Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Get the index.html content
pub fn get_index_html() -> Option<String> {
    let content = Assets::get("index.html")?;
    String::from_utf8(content.data.into_owned()).ok()
}
