//! Fluent HTTP utilities for the forum application.
//!
//! # Overview
//! Builds outbound requests as plain data (`HttpRequest`), runs optional
//! before-send and after-receive filters around the transport call, rejects
//! non-2xx responses with `HttpError::Status`, and materializes the body as a
//! string, bytes, or a live stream. Every operation exists in an async form on
//! `HttpClient` and a blocking form on `HttpClient::blocking()`.
//!
//! # Design
//! - `HttpClient` is the shared transport handle: it builds its `reqwest`
//!   clients lazily, once, and `HttpClient::shared()` gives a process-wide
//!   instance.
//! - Structured headers (`Authorization`, `Content-Type`, `User-Agent`) are
//!   kept typed on the request and rendered only at send time.
//! - Validation (URL, headers, upload file name and MIME type, download
//!   destination) fails before any network I/O.
//! - No retries: every failure reaches the caller exactly once.

pub mod blocking;
pub mod cancel;
pub mod client;
pub mod config;
mod download;
pub mod error;
pub mod filters;
pub mod form;
pub mod headers;
pub mod http;
pub mod mime;
pub mod response;
pub mod upload;

pub use blocking::BlockingClient;
pub use cancel::{with_cancellation, CancellationToken};
pub use client::HttpClient;
pub use config::ClientConfig;
pub use error::HttpError;
pub use filters::Filters;
pub use headers::{Authorization, ProductToken, RequestConfig};
pub use http::{Body, Content, FilePart, HttpMethod, HttpRequest, ResponseHead};
pub use response::{BodyStream, HttpResponse};
pub use upload::UploadOptions;

pub use reqwest::StatusCode;
