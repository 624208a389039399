//! The shared transport handle and the async request API.
//!
//! # Design
//! `HttpClient` owns a `ClientConfig` and lazily builds one async and one
//! blocking `reqwest` client from it, each exactly once, on first use. The
//! connection pools behind them serve any number of concurrent requests.
//! `HttpClient::shared()` is the process-wide instance; callers that need a
//! different configuration build their own and pass it by reference.
//!
//! Every operation funnels through `send`: run the before-send filter,
//! convert the request, execute it, run the after-receive filter, then reject
//! non-2xx statuses. Nothing is retried.

use std::path::Path;

use bytes::Bytes;
use once_cell::sync::{Lazy, OnceCell};
use reqwest::multipart;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::blocking::BlockingClient;
use crate::config::ClientConfig;
use crate::download;
use crate::error::HttpError;
use crate::filters::Filters;
use crate::headers::RequestConfig;
use crate::http::{check_status, Body, FilePart, HttpMethod, HttpRequest};
use crate::mime;
use crate::response::{BodyStream, HttpResponse};
use crate::upload::{self, UploadOptions};

static SHARED: Lazy<HttpClient> = Lazy::new(HttpClient::default);

/// HTTP client with lazily created async and blocking transports.
#[derive(Debug, Default)]
pub struct HttpClient {
    config: ClientConfig,
    async_transport: OnceCell<reqwest::Client>,
    blocking_transport: OnceCell<reqwest::blocking::Client>,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            async_transport: OnceCell::new(),
            blocking_transport: OnceCell::new(),
        }
    }

    /// Process-wide client with the default configuration. Created on first
    /// access and kept for the life of the process.
    pub fn shared() -> &'static HttpClient {
        &SHARED
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Blocking view of this client. Must not be used from inside an async
    /// runtime.
    pub fn blocking(&self) -> BlockingClient<'_> {
        BlockingClient::new(self)
    }

    pub(crate) fn async_transport(&self) -> Result<&reqwest::Client, HttpError> {
        self.async_transport.get_or_try_init(|| {
            debug!("building async transport");
            let config = &self.config;
            let mut builder = reqwest::Client::builder()
                .gzip(config.gzip)
                .deflate(config.deflate)
                .brotli(config.brotli);
            if let Some(user_agent) = &config.user_agent {
                builder = builder.user_agent(user_agent.clone());
            }
            if let Some(timeout) = config.timeout() {
                builder = builder.timeout(timeout);
            }
            if let Some(timeout) = config.connect_timeout() {
                builder = builder.connect_timeout(timeout);
            }
            if let Some(timeout) = config.pool_idle_timeout() {
                builder = builder.pool_idle_timeout(timeout);
            }
            Ok(builder.build()?)
        })
    }

    pub(crate) fn blocking_transport(&self) -> Result<&reqwest::blocking::Client, HttpError> {
        self.blocking_transport.get_or_try_init(|| {
            debug!("building blocking transport");
            let config = &self.config;
            let mut builder = reqwest::blocking::Client::builder()
                .gzip(config.gzip)
                .deflate(config.deflate)
                .brotli(config.brotli)
                .timeout(config.timeout())
                .connect_timeout(config.connect_timeout());
            if let Some(user_agent) = &config.user_agent {
                builder = builder.user_agent(user_agent.clone());
            }
            if let Some(timeout) = config.pool_idle_timeout() {
                builder = builder.pool_idle_timeout(timeout);
            }
            Ok(builder.build()?)
        })
    }

    /// Convert a request into a transport request without sending it.
    pub fn build_request(&self, request: HttpRequest) -> Result<reqwest::Request, HttpError> {
        let headers = request.header_map()?;
        let mut builder = self
            .async_transport()?
            .request(request.method.into(), request.url)
            .headers(headers);
        if let Some(content) = request.content {
            builder = match content.body {
                Body::Text(text) => builder.body(text),
                Body::Bytes(bytes) => builder.body(bytes),
                Body::Stream(reader) => builder.body(reqwest::Body::wrap_stream(ReaderStream::new(reader))),
                Body::Multipart(part) => builder.multipart(multipart_form(part)?),
                Body::Reader(_) => {
                    return Err(HttpError::Unsupported(
                        "blocking reader bodies can only be sent in blocking mode".into(),
                    ))
                }
            };
        }
        Ok(builder.build()?)
    }

    async fn dispatch(&self, mut request: HttpRequest, filters: &Filters<'_>) -> Result<HttpResponse, HttpError> {
        filters.apply_before_send(&mut request)?;
        let method = request.method;
        let prepared = self.build_request(request)?;
        debug!(%method, url = %prepared.url(), "sending request");
        let response = self.async_transport()?.execute(prepared).await?;
        let response = HttpResponse::new(response, &self.config.text_encoding);
        let head = response.head();
        debug!(status = head.status.as_u16(), url = %head.url, "received response");
        filters.apply_after_receive(&head);
        Ok(response)
    }

    /// Send `request` and return the response if its status is 2xx.
    pub async fn send(&self, request: HttpRequest, filters: &Filters<'_>) -> Result<HttpResponse, HttpError> {
        let response = self.dispatch(request, filters).await?;
        if let Err(err) = check_status(response.status(), response.url()) {
            warn!(status = response.status().as_u16(), url = %response.url(), "request failed");
            return Err(err);
        }
        Ok(response)
    }

    pub async fn send_string(&self, request: HttpRequest, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send(request, filters).await?.text().await
    }

    pub async fn send_bytes(&self, request: HttpRequest, filters: &Filters<'_>) -> Result<Bytes, HttpError> {
        self.send(request, filters).await?.bytes().await
    }

    pub async fn send_stream(&self, request: HttpRequest, filters: &Filters<'_>) -> Result<BodyStream, HttpError> {
        Ok(self.send(request, filters).await?.into_stream())
    }

    pub async fn get_string(&self, url: &str, accept: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::get(url)?.with_accept(accept), filters).await
    }

    pub async fn get_json(&self, url: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.get_string(url, mime::JSON, filters).await
    }

    pub async fn get_json_as<T: DeserializeOwned>(&self, url: &str, filters: &Filters<'_>) -> Result<T, HttpError> {
        let request = HttpRequest::get(url)?.with_accept(mime::JSON);
        self.send(request, filters).await?.json().await
    }

    pub async fn get_xml(&self, url: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.get_string(url, mime::XML, filters).await
    }

    pub async fn get_csv(&self, url: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.get_string(url, mime::CSV, filters).await
    }

    pub async fn get_bytes(&self, url: &str, accept: &str, filters: &Filters<'_>) -> Result<Bytes, HttpError> {
        self.send_bytes(HttpRequest::get(url)?.with_accept(accept), filters).await
    }

    pub async fn get_stream(&self, url: &str, accept: &str, filters: &Filters<'_>) -> Result<BodyStream, HttpError> {
        self.send_stream(HttpRequest::get(url)?.with_accept(accept), filters).await
    }

    pub async fn post_string(
        &self,
        url: &str,
        body: Option<&str>,
        content_type: Option<&str>,
        accept: &str,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        let request = HttpRequest::text(HttpMethod::Post, url, body, content_type)?.with_accept(accept);
        self.send_string(request, filters).await
    }

    pub async fn put_string(
        &self,
        url: &str,
        body: Option<&str>,
        content_type: Option<&str>,
        accept: &str,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        let request = HttpRequest::text(HttpMethod::Put, url, body, content_type)?.with_accept(accept);
        self.send_string(request, filters).await
    }

    pub async fn patch_string(
        &self,
        url: &str,
        body: Option<&str>,
        content_type: Option<&str>,
        accept: &str,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        let request = HttpRequest::text(HttpMethod::Patch, url, body, content_type)?.with_accept(accept);
        self.send_string(request, filters).await
    }

    pub async fn post_form(&self, url: &str, form_data: Option<&str>, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::form(HttpMethod::Post, url, form_data)?, filters).await
    }

    pub async fn put_form(&self, url: &str, form_data: Option<&str>, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::form(HttpMethod::Put, url, form_data)?, filters).await
    }

    pub async fn patch_form(&self, url: &str, form_data: Option<&str>, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::form(HttpMethod::Patch, url, form_data)?, filters).await
    }

    pub async fn post_form_object<T: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &T,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        self.send_string(HttpRequest::form_object(HttpMethod::Post, url, data)?, filters).await
    }

    pub async fn put_form_object<T: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &T,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        self.send_string(HttpRequest::form_object(HttpMethod::Put, url, data)?, filters).await
    }

    pub async fn patch_form_object<T: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &T,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        self.send_string(HttpRequest::form_object(HttpMethod::Patch, url, data)?, filters).await
    }

    pub async fn post_json_string(&self, url: &str, json: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::json_string(HttpMethod::Post, url, json)?, filters).await
    }

    pub async fn post_json_object<T: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &T,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        self.send_string(HttpRequest::json_object(HttpMethod::Post, url, data)?, filters).await
    }

    pub async fn put_json_string(&self, url: &str, json: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::json_string(HttpMethod::Put, url, json)?, filters).await
    }

    pub async fn put_json_object<T: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &T,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        self.send_string(HttpRequest::json_object(HttpMethod::Put, url, data)?, filters).await
    }

    pub async fn patch_json_string(&self, url: &str, json: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::json_string(HttpMethod::Patch, url, json)?, filters).await
    }

    pub async fn patch_json_object<T: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &T,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        self.send_string(HttpRequest::json_object(HttpMethod::Patch, url, data)?, filters).await
    }

    pub async fn post_xml_string(&self, url: &str, xml: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::xml_string(HttpMethod::Post, url, xml)?, filters).await
    }

    pub async fn put_xml_string(&self, url: &str, xml: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::xml_string(HttpMethod::Put, url, xml)?, filters).await
    }

    pub async fn post_csv_string(&self, url: &str, csv: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::csv_string(HttpMethod::Post, url, csv)?, filters).await
    }

    pub async fn put_csv_string(&self, url: &str, csv: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::csv_string(HttpMethod::Put, url, csv)?, filters).await
    }

    pub async fn post_bytes(
        &self,
        url: &str,
        body: Option<Bytes>,
        content_type: Option<&str>,
        accept: &str,
        filters: &Filters<'_>,
    ) -> Result<Bytes, HttpError> {
        let request = HttpRequest::bytes(HttpMethod::Post, url, body, content_type)?.with_accept(accept);
        self.send_bytes(request, filters).await
    }

    pub async fn put_bytes(
        &self,
        url: &str,
        body: Option<Bytes>,
        content_type: Option<&str>,
        accept: &str,
        filters: &Filters<'_>,
    ) -> Result<Bytes, HttpError> {
        let request = HttpRequest::bytes(HttpMethod::Put, url, body, content_type)?.with_accept(accept);
        self.send_bytes(request, filters).await
    }

    /// Stream `body` up and hand back the response body un-buffered.
    pub async fn post_stream<R>(
        &self,
        url: &str,
        body: Option<R>,
        content_type: Option<&str>,
        accept: &str,
        filters: &Filters<'_>,
    ) -> Result<BodyStream, HttpError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let request = HttpRequest::stream(HttpMethod::Post, url, body, content_type)?.with_accept(accept);
        self.send_stream(request, filters).await
    }

    pub async fn put_stream<R>(
        &self,
        url: &str,
        body: Option<R>,
        content_type: Option<&str>,
        accept: &str,
        filters: &Filters<'_>,
    ) -> Result<BodyStream, HttpError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let request = HttpRequest::stream(HttpMethod::Put, url, body, content_type)?.with_accept(accept);
        self.send_stream(request, filters).await
    }

    pub async fn delete(&self, url: &str, accept: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::delete(url)?.with_accept(accept), filters).await
    }

    pub async fn head(&self, url: &str, accept: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::head(url)?.with_accept(accept), filters).await
    }

    pub async fn options(&self, url: &str, accept: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::options(url)?.with_accept(accept), filters).await
    }

    /// Status of a GET to `url`, whatever it is. A transport failure yields
    /// the status it carries, if any.
    pub async fn get_response_status(&self, url: &str) -> Option<StatusCode> {
        let request = match HttpRequest::get(url) {
            Ok(request) => request,
            Err(_) => return None,
        };
        match self.dispatch(request, &Filters::none()).await {
            Ok(response) => Some(response.status()),
            Err(HttpError::Transport(err)) => err.status(),
            Err(_) => None,
        }
    }

    /// The response of a GET to `url` if it failed, `None` on 2xx.
    pub async fn get_error_response(&self, url: &str) -> Result<Option<HttpResponse>, HttpError> {
        let response = self.dispatch(HttpRequest::get(url)?, &Filters::none()).await?;
        Ok((!response.status().is_success()).then_some(response))
    }

    /// Upload `source` as the single file part of a multipart body.
    ///
    /// The file name and MIME type are validated before `source` is read.
    pub async fn upload_file<R>(
        &self,
        request: HttpRequest,
        mut source: R,
        file_name: &str,
        options: &UploadOptions,
        filters: &Filters<'_>,
    ) -> Result<HttpResponse, HttpError>
    where
        R: AsyncRead + Unpin,
    {
        let mime_type = upload::resolve_mime_type(file_name, options)?;
        let mut data = Vec::new();
        source.read_to_end(&mut data).await?;
        let request = upload::attach(request, file_name, mime_type, options, Bytes::from(data));
        self.send(request, filters).await
    }

    pub async fn post_file(
        &self,
        url: &str,
        path: impl AsRef<Path>,
        mime_type: Option<&str>,
        filters: &Filters<'_>,
    ) -> Result<HttpResponse, HttpError> {
        self.upload_path(url, path.as_ref(), mime_type, HttpMethod::Post, filters).await
    }

    pub async fn put_file(
        &self,
        url: &str,
        path: impl AsRef<Path>,
        mime_type: Option<&str>,
        filters: &Filters<'_>,
    ) -> Result<HttpResponse, HttpError> {
        self.upload_path(url, path.as_ref(), mime_type, HttpMethod::Put, filters).await
    }

    async fn upload_path(
        &self,
        url: &str,
        path: &Path,
        mime_type: Option<&str>,
        method: HttpMethod,
        filters: &Filters<'_>,
    ) -> Result<HttpResponse, HttpError> {
        let request = HttpRequest::new(method, url)?;
        let file_name = upload::file_name_of(path)?;
        let mut options = UploadOptions::default().method(method);
        options.mime_type = mime_type.map(str::to_string);
        upload::resolve_mime_type(&file_name, &options)?;
        let file = tokio::fs::File::open(path).await?;
        self.upload_file(request, file, &file_name, &options, filters).await
    }

    /// GET `url` and stream the body into a new file at `path`.
    ///
    /// Fails with `AlreadyExists` without sending anything if `path` exists.
    pub async fn download_to(
        &self,
        url: &str,
        path: impl AsRef<Path>,
        config: Option<&RequestConfig>,
    ) -> Result<u64, HttpError> {
        let path = path.as_ref();
        download::ensure_absent(path)?;
        let mut request = HttpRequest::get(url)?;
        if let Some(config) = config {
            config.apply(&mut request)?;
        }
        let stream = self.send_stream(request, &Filters::none()).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|err| download::create_error(path, err))?;
        match stream.copy_to(&mut file).await {
            Ok(written) => {
                info!(url, path = %path.display(), bytes = written, "download complete");
                Ok(written)
            }
            Err(err) => {
                drop(file);
                download::discard_partial_async(path).await;
                Err(err)
            }
        }
    }
}

fn multipart_form(part: FilePart) -> Result<multipart::Form, HttpError> {
    let FilePart {
        field,
        file_name,
        mime_type,
        data,
    } = part;
    let length = data.len() as u64;
    let part = multipart::Part::stream_with_length(data, length)
        .file_name(file_name)
        .mime_str(&mime_type)
        .map_err(|e| HttpError::header("Content-Type", e))?;
    Ok(multipart::Form::new().part(field, part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};

    const URL: &str = "http://localhost:3000/echo";

    #[test]
    fn built_request_preserves_every_verb() {
        let client = HttpClient::default();
        for method in HttpMethod::ALL {
            let req = client.build_request(HttpRequest::new(method, URL).unwrap()).unwrap();
            assert_eq!(req.method().as_str(), method.as_str());
            assert_eq!(req.url().as_str(), URL);
        }
    }

    #[test]
    fn built_request_carries_headers_and_body() {
        let client = HttpClient::default();
        let request = HttpRequest::json_string(HttpMethod::Post, URL, r#"{"a":1}"#)
            .unwrap()
            .with_header("Authorization", "Bearer abc123")
            .unwrap()
            .with_header("User-Agent", "custom-agent")
            .unwrap();
        let req = client.build_request(request).unwrap();

        assert_eq!(req.headers().get(ACCEPT).unwrap(), "application/json");
        assert_eq!(req.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(req.headers().get(AUTHORIZATION).unwrap(), "Bearer abc123");
        assert_eq!(req.headers().get(USER_AGENT).unwrap(), "(custom-agent)");
        assert_eq!(req.body().and_then(|b| b.as_bytes()), Some(&br#"{"a":1}"#[..]));
    }

    #[test]
    fn reader_body_is_rejected_in_async_mode() {
        let client = HttpClient::default();
        let request = HttpRequest::post(URL)
            .unwrap()
            .with_body(Body::Reader(Box::new(std::io::Cursor::new(vec![1, 2, 3]))));
        let err = client.build_request(request).unwrap_err();
        assert!(matches!(err, HttpError::Unsupported(_)));
    }

    #[test]
    fn multipart_body_sets_form_content_type() {
        let client = HttpClient::default();
        let request = upload::attach(
            HttpRequest::post(URL).unwrap(),
            "avatar.png",
            "image/png".into(),
            &UploadOptions::default(),
            Bytes::from_static(b"\x89PNG"),
        );
        let req = client.build_request(request).unwrap();
        let content_type = req.headers().get(CONTENT_TYPE).unwrap().to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
    }

    #[test]
    fn multipart_body_sends_a_single_content_type() {
        let client = HttpClient::default();
        let mut request = upload::attach(
            HttpRequest::post(URL).unwrap(),
            "notes.txt",
            "text/plain".into(),
            &UploadOptions::default(),
            Bytes::from_static(b"hello"),
        );
        request.set_header("Content-Type", "multipart/mixed").unwrap();
        let req = client.build_request(request).unwrap();
        let values: Vec<_> = req.headers().get_all(CONTENT_TYPE).iter().collect();
        assert_eq!(values.len(), 1);
        assert!(values[0].to_str().unwrap().starts_with("multipart/form-data; boundary="));
    }

    #[test]
    fn stream_request_carries_content_type() {
        let client = HttpClient::default();
        let request = HttpRequest::stream(HttpMethod::Put, URL, Some(&b"abc"[..]), Some(mime::OCTET_STREAM))
            .unwrap();
        let req = client.build_request(request).unwrap();
        assert_eq!(req.method().as_str(), "PUT");
        assert_eq!(req.headers().get(CONTENT_TYPE).unwrap(), "application/octet-stream");
        assert!(req.body().is_some());
    }

    #[test]
    fn shared_client_is_a_singleton() {
        assert!(std::ptr::eq(HttpClient::shared(), HttpClient::shared()));
    }

    #[test]
    fn transports_are_created_once() {
        let client = HttpClient::default();
        let first = client.async_transport().unwrap() as *const reqwest::Client;
        let second = client.async_transport().unwrap() as *const reqwest::Client;
        assert_eq!(first, second);
    }
}
