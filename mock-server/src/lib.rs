//! Local HTTP server used to exercise the forum HTTP utilities end to end.
//!
//! Routes:
//! - `ANY /echo` describes the request it received as JSON.
//! - `GET /status/{code}` answers with that status.
//! - `GET /text`, `/latin1`, `/lines`, `/bytes` serve fixed bodies.
//! - `POST|PUT /upload` accepts `multipart/form-data` and lists the parts.
//! - `GET /files/{name}` serves a deterministic file body.

use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{Multipart, Path},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const TEXT_BODY: &str = "hello from the forum";
pub const LINES_BODY: &str = "first topic\nsecond topic\nthird topic\n";
pub const BYTES_BODY: &[u8] = &[0x00, 0x01, 0xfe, 0xff, 0x42];

/// What `/echo` saw. Header names are lower-case; repeated headers keep every
/// value in arrival order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EchoResponse {
    pub method: String,
    pub path: String,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

impl EchoResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
    pub body: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub id: Uuid,
    pub method: String,
    pub parts: Vec<UploadedPart>,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/status/{code}", get(status))
        .route("/text", get(text))
        .route("/latin1", get(latin1))
        .route("/lines", get(lines))
        .route("/bytes", get(bytes))
        .route("/upload", post(upload).put(upload))
        .route("/files/{name}", get(file))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Deterministic content served by `/files/{name}`.
pub fn file_contents(name: &str) -> String {
    format!("contents of {name}\n").repeat(64)
}

async fn echo(method: Method, uri: axum::http::Uri, headers: HeaderMap, body: Bytes) -> Json<EchoResponse> {
    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        seen.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    Json(EchoResponse {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        headers: seen,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

async fn text() -> &'static str {
    TEXT_BODY
}

/// `café` encoded as ISO-8859-1 with a matching charset.
async fn latin1() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=iso-8859-1")],
        vec![b'c', b'a', b'f', 0xe9],
    )
}

async fn lines() -> &'static str {
    LINES_BODY
}

async fn bytes() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/octet-stream")], BYTES_BODY)
}

async fn upload(method: Method, mut multipart: Multipart) -> Result<(StatusCode, Json<UploadReceipt>), StatusCode> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        parts.push(UploadedPart {
            name,
            file_name,
            content_type,
            size: data.len(),
            body: String::from_utf8_lossy(&data).into_owned(),
        });
    }
    let receipt = UploadReceipt {
        id: Uuid::new_v4(),
        method: method.as_str().to_string(),
        parts,
    };
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn file(Path(name): Path<String>) -> Result<String, StatusCode> {
    if name.starts_with("missing") {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(file_contents(&name))
}
