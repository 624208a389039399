//! Request and response descriptors.
//!
//! # Design
//! `HttpRequest` is plain data with public fields so a before-send filter can
//! rewrite the method, headers or body. Typed constructors cover the common
//! body shapes (text, JSON, form, XML, CSV, bytes); builder methods take and
//! return the request by value. Nothing here touches the network: the
//! transports in `client` and `blocking` convert a request at send time.

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use tokio::io::AsyncRead;

use crate::error::HttpError;
use crate::form;
use crate::headers::{join_user_agent, Authorization, ProductToken};
use crate::mime;

/// HTTP verb of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = HttpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| HttpError::InvalidArgument(format!("unsupported HTTP method: {s}")))
    }
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
        }
    }
}

/// A single file part of a `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

/// Request body. Exactly one representation per request.
pub enum Body {
    Text(String),
    Bytes(Bytes),
    /// Streamed by the blocking transport.
    Reader(Box<dyn Read + Send>),
    /// Streamed by the async transport.
    Stream(Box<dyn AsyncRead + Send + Unpin>),
    Multipart(FilePart),
}

impl Body {
    pub fn kind(&self) -> &'static str {
        match self {
            Body::Text(_) => "text",
            Body::Bytes(_) => "bytes",
            Body::Reader(_) => "reader",
            Body::Stream(_) => "stream",
            Body::Multipart(_) => "multipart",
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Body::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Body::Reader(_) => f.write_str("Reader(..)"),
            Body::Stream(_) => f.write_str("Stream(..)"),
            Body::Multipart(part) => f.debug_tuple("Multipart").field(part).finish(),
        }
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(bytes))
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

/// Body plus its content type.
#[derive(Debug)]
pub struct Content {
    pub body: Body,
    pub content_type: Option<String>,
}

/// An outbound request described as plain data.
#[derive(Debug)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub accept: String,
    pub headers: HeaderMap,
    pub authorization: Option<Authorization>,
    pub user_agent: Vec<ProductToken>,
    pub content: Option<Content>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: &str) -> Result<Self, HttpError> {
        let url = Url::parse(url).map_err(|source| HttpError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        Ok(Self {
            method,
            url,
            accept: mime::ANY.to_string(),
            headers: HeaderMap::new(),
            authorization: None,
            user_agent: Vec::new(),
            content: None,
        })
    }

    pub fn get(url: &str) -> Result<Self, HttpError> {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: &str) -> Result<Self, HttpError> {
        Self::new(HttpMethod::Post, url)
    }

    pub fn put(url: &str) -> Result<Self, HttpError> {
        Self::new(HttpMethod::Put, url)
    }

    pub fn patch(url: &str) -> Result<Self, HttpError> {
        Self::new(HttpMethod::Patch, url)
    }

    pub fn delete(url: &str) -> Result<Self, HttpError> {
        Self::new(HttpMethod::Delete, url)
    }

    pub fn head(url: &str) -> Result<Self, HttpError> {
        Self::new(HttpMethod::Head, url)
    }

    pub fn options(url: &str) -> Result<Self, HttpError> {
        Self::new(HttpMethod::Options, url)
    }

    /// Text body with an optional content type; `None` body sends nothing.
    pub fn text(
        method: HttpMethod,
        url: &str,
        body: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<Self, HttpError> {
        let request = Self::new(method, url)?;
        Ok(match body {
            Some(body) => request.with_body(Body::from(body)).with_content_type(content_type),
            None => request,
        })
    }

    pub fn bytes(
        method: HttpMethod,
        url: &str,
        body: Option<Bytes>,
        content_type: Option<&str>,
    ) -> Result<Self, HttpError> {
        let request = Self::new(method, url)?;
        Ok(match body {
            Some(body) => request.with_body(Body::Bytes(body)).with_content_type(content_type),
            None => request,
        })
    }

    /// Body streamed from an async reader; sendable in async mode only.
    pub fn stream<R>(method: HttpMethod, url: &str, body: Option<R>, content_type: Option<&str>) -> Result<Self, HttpError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let request = Self::new(method, url)?;
        Ok(match body {
            Some(body) => request.with_body(Body::Stream(Box::new(body))).with_content_type(content_type),
            None => request,
        })
    }

    /// Body streamed from a blocking reader; sendable in blocking mode only.
    pub fn reader<R>(method: HttpMethod, url: &str, body: Option<R>, content_type: Option<&str>) -> Result<Self, HttpError>
    where
        R: Read + Send + 'static,
    {
        let request = Self::new(method, url)?;
        Ok(match body {
            Some(body) => request.with_body(Body::Reader(Box::new(body))).with_content_type(content_type),
            None => request,
        })
    }

    pub fn json_string(method: HttpMethod, url: &str, json: &str) -> Result<Self, HttpError> {
        Self::typed(method, url, json.to_string(), mime::JSON)
    }

    pub fn json_object<T: Serialize + ?Sized>(
        method: HttpMethod,
        url: &str,
        data: &T,
    ) -> Result<Self, HttpError> {
        let json = serde_json::to_string(data).map_err(|e| HttpError::Serialization(e.to_string()))?;
        Self::typed(method, url, json, mime::JSON)
    }

    pub fn xml_string(method: HttpMethod, url: &str, xml: &str) -> Result<Self, HttpError> {
        Self::typed(method, url, xml.to_string(), mime::XML)
    }

    pub fn csv_string(method: HttpMethod, url: &str, csv: &str) -> Result<Self, HttpError> {
        Self::typed(method, url, csv.to_string(), mime::CSV)
    }

    /// Pre-encoded `application/x-www-form-urlencoded` body.
    pub fn form(method: HttpMethod, url: &str, form_data: Option<&str>) -> Result<Self, HttpError> {
        Self::text(method, url, form_data, Some(mime::FORM_URL_ENCODED))
    }

    pub fn form_object<T: Serialize + ?Sized>(
        method: HttpMethod,
        url: &str,
        data: &T,
    ) -> Result<Self, HttpError> {
        let encoded = form::encode(data)?;
        Self::form(method, url, Some(&encoded))
    }

    fn typed(method: HttpMethod, url: &str, body: String, mime_type: &str) -> Result<Self, HttpError> {
        Ok(Self::new(method, url)?
            .with_accept(mime_type)
            .with_body(Body::Text(body))
            .with_content_type(Some(mime_type)))
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = accept.into();
        self
    }

    /// Replace the body; any previous content type is dropped.
    pub fn with_body(mut self, body: Body) -> Self {
        self.content = Some(Content {
            body,
            content_type: None,
        });
        self
    }

    /// Set the content type of the current body. No-op without a body.
    pub fn with_content_type(mut self, content_type: Option<&str>) -> Self {
        if let (Some(content), Some(content_type)) = (self.content.as_mut(), content_type) {
            content.content_type = Some(content_type.to_string());
        }
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content.as_ref()?.content_type.as_deref()
    }

    pub fn body(&self) -> Option<&Body> {
        self.content.as_ref().map(|c| &c.body)
    }

    /// All headers the transport will send, in order: accept, raw headers,
    /// authorization, user agent and content type. Multipart bodies get their
    /// content type from the transport, so none is rendered for them here.
    pub fn header_map(&self) -> Result<HeaderMap, HttpError> {
        let mut map = HeaderMap::new();
        map.append(
            ACCEPT,
            HeaderValue::from_str(&self.accept).map_err(|e| HttpError::header("Accept", e))?,
        );
        for (name, value) in &self.headers {
            map.append(name.clone(), value.clone());
        }
        if let Some(auth) = &self.authorization {
            let value = HeaderValue::from_str(&auth.to_string())
                .map_err(|e| HttpError::header("Authorization", e))?;
            map.insert(AUTHORIZATION, value);
        }
        if !self.user_agent.is_empty() {
            let value = HeaderValue::from_str(&join_user_agent(&self.user_agent))
                .map_err(|e| HttpError::header("User-Agent", e))?;
            map.insert(USER_AGENT, value);
        }
        if let Some(content) = &self.content {
            // The multipart encoder writes its own content type with the boundary.
            let content_type = match (&content.content_type, &content.body) {
                (_, Body::Multipart(_)) => None,
                (Some(content_type), _) => Some(content_type.as_str()),
                (None, Body::Text(_)) => Some(mime::PLAIN_TEXT_UTF8),
                (None, _) => None,
            };
            if let Some(content_type) = content_type {
                let value = HeaderValue::from_str(content_type)
                    .map_err(|e| HttpError::header("Content-Type", e))?;
                map.insert(CONTENT_TYPE, value);
            }
        }
        Ok(map)
    }
}

/// Status line and headers of a received response.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub url: Url,
}

impl ResponseHead {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Map a non-2xx status to `HttpError::Status`.
pub(crate) fn check_status(status: StatusCode, url: &Url) -> Result<(), HttpError> {
    if status.is_success() {
        return Ok(());
    }
    Err(HttpError::Status {
        status,
        url: url.clone(),
    })
}
