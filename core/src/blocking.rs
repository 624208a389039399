//! Blocking calling mode.
//!
//! Mirrors the async API of `HttpClient` method for method, on top of the
//! blocking transport held by the same client. Must not be used from inside
//! an async runtime.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use bytes::Bytes;
use reqwest::blocking::multipart;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::HttpClient;
use crate::download;
use crate::error::HttpError;
use crate::filters::Filters;
use crate::headers::RequestConfig;
use crate::http::{check_status, Body, FilePart, HttpMethod, HttpRequest, ResponseHead};
use crate::mime;
use crate::upload::{self, UploadOptions};

/// Blocking view over an `HttpClient`.
#[derive(Debug, Clone, Copy)]
pub struct BlockingClient<'a> {
    client: &'a HttpClient,
}

impl<'a> BlockingClient<'a> {
    pub(crate) fn new(client: &'a HttpClient) -> Self {
        Self { client }
    }

    /// Convert a request into a blocking transport request without sending it.
    pub fn build_request(&self, request: HttpRequest) -> Result<reqwest::blocking::Request, HttpError> {
        let headers = request.header_map()?;
        let mut builder = self
            .client
            .blocking_transport()?
            .request(request.method.into(), request.url)
            .headers(headers);
        if let Some(content) = request.content {
            builder = match content.body {
                Body::Text(text) => builder.body(text),
                Body::Bytes(bytes) => builder.body(Vec::from(bytes)),
                Body::Reader(reader) => builder.body(reqwest::blocking::Body::new(reader)),
                Body::Multipart(part) => builder.multipart(multipart_form(part)?),
                Body::Stream(_) => {
                    return Err(HttpError::Unsupported(
                        "async stream bodies can only be sent in async mode".into(),
                    ))
                }
            };
        }
        Ok(builder.build()?)
    }

    fn dispatch(&self, mut request: HttpRequest, filters: &Filters<'_>) -> Result<HttpResponse, HttpError> {
        filters.apply_before_send(&mut request)?;
        let method = request.method;
        let prepared = self.build_request(request)?;
        debug!(%method, url = %prepared.url(), "sending blocking request");
        let response = self.client.blocking_transport()?.execute(prepared)?;
        let response = HttpResponse::new(response, &self.client.config().text_encoding);
        let head = response.head();
        debug!(status = head.status.as_u16(), url = %head.url, "received response");
        filters.apply_after_receive(&head);
        Ok(response)
    }

    pub fn send(&self, request: HttpRequest, filters: &Filters<'_>) -> Result<HttpResponse, HttpError> {
        let response = self.dispatch(request, filters)?;
        if let Err(err) = check_status(response.status(), response.url()) {
            warn!(status = response.status().as_u16(), url = %response.url(), "request failed");
            return Err(err);
        }
        Ok(response)
    }

    pub fn send_string(&self, request: HttpRequest, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send(request, filters)?.text()
    }

    pub fn send_bytes(&self, request: HttpRequest, filters: &Filters<'_>) -> Result<Bytes, HttpError> {
        self.send(request, filters)?.bytes()
    }

    pub fn send_stream(&self, request: HttpRequest, filters: &Filters<'_>) -> Result<BodyReader, HttpError> {
        Ok(self.send(request, filters)?.into_reader())
    }

    pub fn get_string(&self, url: &str, accept: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::get(url)?.with_accept(accept), filters)
    }

    pub fn get_json(&self, url: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.get_string(url, mime::JSON, filters)
    }

    pub fn get_json_as<T: DeserializeOwned>(&self, url: &str, filters: &Filters<'_>) -> Result<T, HttpError> {
        self.send(HttpRequest::get(url)?.with_accept(mime::JSON), filters)?.json()
    }

    pub fn get_xml(&self, url: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.get_string(url, mime::XML, filters)
    }

    pub fn get_csv(&self, url: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.get_string(url, mime::CSV, filters)
    }

    pub fn get_bytes(&self, url: &str, accept: &str, filters: &Filters<'_>) -> Result<Bytes, HttpError> {
        self.send_bytes(HttpRequest::get(url)?.with_accept(accept), filters)
    }

    pub fn get_stream(&self, url: &str, accept: &str, filters: &Filters<'_>) -> Result<BodyReader, HttpError> {
        self.send_stream(HttpRequest::get(url)?.with_accept(accept), filters)
    }

    pub fn post_string(
        &self,
        url: &str,
        body: Option<&str>,
        content_type: Option<&str>,
        accept: &str,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        let request = HttpRequest::text(HttpMethod::Post, url, body, content_type)?.with_accept(accept);
        self.send_string(request, filters)
    }

    pub fn put_string(
        &self,
        url: &str,
        body: Option<&str>,
        content_type: Option<&str>,
        accept: &str,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        let request = HttpRequest::text(HttpMethod::Put, url, body, content_type)?.with_accept(accept);
        self.send_string(request, filters)
    }

    pub fn patch_string(
        &self,
        url: &str,
        body: Option<&str>,
        content_type: Option<&str>,
        accept: &str,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        let request = HttpRequest::text(HttpMethod::Patch, url, body, content_type)?.with_accept(accept);
        self.send_string(request, filters)
    }

    pub fn post_form(&self, url: &str, form_data: Option<&str>, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::form(HttpMethod::Post, url, form_data)?, filters)
    }

    pub fn put_form(&self, url: &str, form_data: Option<&str>, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::form(HttpMethod::Put, url, form_data)?, filters)
    }

    pub fn patch_form(&self, url: &str, form_data: Option<&str>, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::form(HttpMethod::Patch, url, form_data)?, filters)
    }

    pub fn post_form_object<T: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &T,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        self.send_string(HttpRequest::form_object(HttpMethod::Post, url, data)?, filters)
    }

    pub fn put_form_object<T: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &T,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        self.send_string(HttpRequest::form_object(HttpMethod::Put, url, data)?, filters)
    }

    pub fn patch_form_object<T: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &T,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        self.send_string(HttpRequest::form_object(HttpMethod::Patch, url, data)?, filters)
    }

    pub fn post_json_string(&self, url: &str, json: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::json_string(HttpMethod::Post, url, json)?, filters)
    }

    pub fn post_json_object<T: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &T,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        self.send_string(HttpRequest::json_object(HttpMethod::Post, url, data)?, filters)
    }

    pub fn put_json_string(&self, url: &str, json: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::json_string(HttpMethod::Put, url, json)?, filters)
    }

    pub fn put_json_object<T: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &T,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        self.send_string(HttpRequest::json_object(HttpMethod::Put, url, data)?, filters)
    }

    pub fn patch_json_string(&self, url: &str, json: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::json_string(HttpMethod::Patch, url, json)?, filters)
    }

    pub fn patch_json_object<T: Serialize + ?Sized>(
        &self,
        url: &str,
        data: &T,
        filters: &Filters<'_>,
    ) -> Result<String, HttpError> {
        self.send_string(HttpRequest::json_object(HttpMethod::Patch, url, data)?, filters)
    }

    pub fn post_xml_string(&self, url: &str, xml: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::xml_string(HttpMethod::Post, url, xml)?, filters)
    }

    pub fn put_xml_string(&self, url: &str, xml: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::xml_string(HttpMethod::Put, url, xml)?, filters)
    }

    pub fn post_csv_string(&self, url: &str, csv: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::csv_string(HttpMethod::Post, url, csv)?, filters)
    }

    pub fn put_csv_string(&self, url: &str, csv: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::csv_string(HttpMethod::Put, url, csv)?, filters)
    }

    pub fn post_bytes(
        &self,
        url: &str,
        body: Option<Bytes>,
        content_type: Option<&str>,
        accept: &str,
        filters: &Filters<'_>,
    ) -> Result<Bytes, HttpError> {
        let request = HttpRequest::bytes(HttpMethod::Post, url, body, content_type)?.with_accept(accept);
        self.send_bytes(request, filters)
    }

    pub fn put_bytes(
        &self,
        url: &str,
        body: Option<Bytes>,
        content_type: Option<&str>,
        accept: &str,
        filters: &Filters<'_>,
    ) -> Result<Bytes, HttpError> {
        let request = HttpRequest::bytes(HttpMethod::Put, url, body, content_type)?.with_accept(accept);
        self.send_bytes(request, filters)
    }

    pub fn post_stream<R: Read + Send + 'static>(
        &self,
        url: &str,
        body: Option<R>,
        content_type: Option<&str>,
        accept: &str,
        filters: &Filters<'_>,
    ) -> Result<BodyReader, HttpError> {
        let request = HttpRequest::reader(HttpMethod::Post, url, body, content_type)?.with_accept(accept);
        self.send_stream(request, filters)
    }

    pub fn put_stream<R: Read + Send + 'static>(
        &self,
        url: &str,
        body: Option<R>,
        content_type: Option<&str>,
        accept: &str,
        filters: &Filters<'_>,
    ) -> Result<BodyReader, HttpError> {
        let request = HttpRequest::reader(HttpMethod::Put, url, body, content_type)?.with_accept(accept);
        self.send_stream(request, filters)
    }

    pub fn delete(&self, url: &str, accept: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::delete(url)?.with_accept(accept), filters)
    }

    pub fn head(&self, url: &str, accept: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::head(url)?.with_accept(accept), filters)
    }

    pub fn options(&self, url: &str, accept: &str, filters: &Filters<'_>) -> Result<String, HttpError> {
        self.send_string(HttpRequest::options(url)?.with_accept(accept), filters)
    }

    pub fn get_response_status(&self, url: &str) -> Option<StatusCode> {
        let request = HttpRequest::get(url).ok()?;
        match self.dispatch(request, &Filters::none()) {
            Ok(response) => Some(response.status()),
            Err(HttpError::Transport(err)) => err.status(),
            Err(_) => None,
        }
    }

    pub fn get_error_response(&self, url: &str) -> Result<Option<HttpResponse>, HttpError> {
        let response = self.dispatch(HttpRequest::get(url)?, &Filters::none())?;
        Ok((!response.status().is_success()).then_some(response))
    }

    pub fn upload_file<R: Read>(
        &self,
        request: HttpRequest,
        mut source: R,
        file_name: &str,
        options: &UploadOptions,
        filters: &Filters<'_>,
    ) -> Result<HttpResponse, HttpError> {
        let mime_type = upload::resolve_mime_type(file_name, options)?;
        let mut data = Vec::new();
        source.read_to_end(&mut data)?;
        let request = upload::attach(request, file_name, mime_type, options, Bytes::from(data));
        self.send(request, filters)
    }

    pub fn post_file(
        &self,
        url: &str,
        path: impl AsRef<Path>,
        mime_type: Option<&str>,
        filters: &Filters<'_>,
    ) -> Result<HttpResponse, HttpError> {
        self.upload_path(url, path.as_ref(), mime_type, HttpMethod::Post, filters)
    }

    pub fn put_file(
        &self,
        url: &str,
        path: impl AsRef<Path>,
        mime_type: Option<&str>,
        filters: &Filters<'_>,
    ) -> Result<HttpResponse, HttpError> {
        self.upload_path(url, path.as_ref(), mime_type, HttpMethod::Put, filters)
    }

    fn upload_path(
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
        let file = File::open(path)?;
        self.upload_file(request, file, &file_name, &options, filters)
    }

    pub fn download_to(
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
        let mut response = self.send(request, &Filters::none())?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|err| download::create_error(path, err))?;
        match response.inner.copy_to(&mut file) {
            Ok(written) => {
                info!(url, path = %path.display(), bytes = written, "download complete");
                Ok(written)
            }
            Err(err) => {
                drop(file);
                download::discard_partial(path);
                Err(err.into())
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
    let part = multipart::Part::reader_with_length(io::Cursor::new(data), length)
        .file_name(file_name)
        .mime_str(&mime_type)
        .map_err(|e| HttpError::header("Content-Type", e))?;
    Ok(multipart::Form::new().part(field, part))
}

/// A received response in blocking mode; body methods consume it.
#[derive(Debug)]
pub struct HttpResponse {
    inner: reqwest::blocking::Response,
    encoding: String,
}

impl HttpResponse {
    fn new(inner: reqwest::blocking::Response, encoding: &str) -> Self {
        Self {
            inner,
            encoding: encoding.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name).and_then(|v| v.to_str().ok())
    }

    pub fn url(&self) -> &Url {
        self.inner.url()
    }

    pub fn head(&self) -> ResponseHead {
        ResponseHead {
            status: self.inner.status(),
            headers: self.inner.headers().clone(),
            url: self.inner.url().clone(),
        }
    }

    pub fn text(self) -> Result<String, HttpError> {
        Ok(self.inner.text_with_charset(&self.encoding)?)
    }

    pub fn bytes(self) -> Result<Bytes, HttpError> {
        Ok(self.inner.bytes()?)
    }

    pub fn json<T: DeserializeOwned>(self) -> Result<T, HttpError> {
        let bytes = self.bytes()?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn into_reader(self) -> BodyReader {
        BodyReader { inner: self.inner }
    }

    /// Lines of the body, read lazily.
    pub fn read_lines(self) -> io::Lines<BufReader<BodyReader>> {
        BufReader::new(self.into_reader()).lines()
    }
}

/// Live response body; dropping it releases the connection.
#[derive(Debug)]
pub struct BodyReader {
    inner: reqwest::blocking::Response,
}

impl Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
