//! Async response materializers.

use std::io;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::HttpError;
use crate::http::ResponseHead;

/// A received response whose body has not been read yet.
///
/// The body-reading methods take `self`, so it is consumed at most once.
/// Dropping the response releases the connection.
#[derive(Debug)]
pub struct HttpResponse {
    inner: reqwest::Response,
    encoding: String,
}

impl HttpResponse {
    pub(crate) fn new(inner: reqwest::Response, encoding: &str) -> Self {
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

    pub fn content_length(&self) -> Option<u64> {
        self.inner.content_length()
    }

    pub fn head(&self) -> ResponseHead {
        ResponseHead {
            status: self.inner.status(),
            headers: self.inner.headers().clone(),
            url: self.inner.url().clone(),
        }
    }

    /// Decode the body, preferring the charset declared by the response.
    pub async fn text(self) -> Result<String, HttpError> {
        Ok(self.inner.text_with_charset(&self.encoding).await?)
    }

    pub async fn bytes(self) -> Result<Bytes, HttpError> {
        Ok(self.inner.bytes().await?)
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T, HttpError> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn into_stream(self) -> BodyStream {
        BodyStream { inner: self.inner }
    }
}

/// Live, un-buffered response body.
#[derive(Debug)]
pub struct BodyStream {
    inner: reqwest::Response,
}

impl BodyStream {
    /// Next chunk of the body, `None` once it is drained.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, HttpError> {
        Ok(self.inner.chunk().await?)
    }

    /// Drain the body into `writer`, returning the number of bytes written.
    pub async fn copy_to<W>(mut self, writer: &mut W) -> Result<u64, HttpError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut written = 0u64;
        while let Some(chunk) = self.chunk().await? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;
        Ok(written)
    }

    pub async fn read_to_end(mut self) -> Result<Vec<u8>, HttpError> {
        let mut buffer = Vec::new();
        while let Some(chunk) = self.chunk().await? {
            buffer.extend_from_slice(&chunk);
        }
        Ok(buffer)
    }

    /// Drain the body as UTF-8 text.
    pub async fn read_to_string(self) -> Result<String, HttpError> {
        let bytes = self.read_to_end().await?;
        String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err).into())
    }
}
