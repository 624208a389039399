//! Typed headers and the name-based header dispatch.
//!
//! # Design
//! `Authorization`, `Content-Type` and `User-Agent` cannot go through the raw
//! header path: authorization is kept as a `(scheme, credential)` pair, the
//! content type lives on the request content, and user agents are a list of
//! product tokens. `set_header` routes by name (case-insensitively) and
//! everything else is appended verbatim.

use std::collections::BTreeMap;
use std::fmt;

use reqwest::header::{HeaderName, HeaderValue};

use crate::error::HttpError;
use crate::http::HttpRequest;

/// Parsed `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub scheme: String,
    pub credential: Option<String>,
}

impl Authorization {
    pub fn new(scheme: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            credential: Some(credential.into()),
        }
    }

    /// Split `value` at the first space into scheme and credential.
    pub fn parse(value: &str) -> Self {
        match value.split_once(' ') {
            Some((scheme, credential)) => Self::new(scheme, credential),
            None => Self {
                scheme: value.to_string(),
                credential: None,
            },
        }
    }
}

impl fmt::Display for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.credential {
            Some(credential) => write!(f, "{} {credential}", self.scheme),
            None => f.write_str(&self.scheme),
        }
    }
}

/// One token of a `User-Agent` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductToken {
    Product { name: String, version: String },
    /// Stored with its surrounding parentheses.
    Comment(String),
}

impl ProductToken {
    /// `MyApp/1.0` becomes a product split at the last `/`; anything without a
    /// `/` becomes a comment, parenthesized unless it already is.
    pub fn parse(value: &str) -> Self {
        if let Some((name, version)) = value.rsplit_once('/') {
            return ProductToken::Product {
                name: name.to_string(),
                version: version.to_string(),
            };
        }
        if value.starts_with('(') && value.ends_with(')') && value.len() >= 2 {
            ProductToken::Comment(value.to_string())
        } else {
            ProductToken::Comment(format!("({value})"))
        }
    }
}

impl fmt::Display for ProductToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductToken::Product { name, version } => write!(f, "{name}/{version}"),
            ProductToken::Comment(comment) => f.write_str(comment),
        }
    }
}

pub(crate) fn join_user_agent(tokens: &[ProductToken]) -> String {
    tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

impl HttpRequest {
    /// Set a header by name, routing the three structured headers to their
    /// typed slots and appending everything else.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<&mut Self, HttpError> {
        if name.eq_ignore_ascii_case("authorization") {
            self.authorization = Some(Authorization::parse(value));
        } else if name.eq_ignore_ascii_case("content-type") {
            let content = self.content.as_mut().ok_or_else(|| {
                HttpError::Unsupported("can't set Content-Type before content is populated".into())
            })?;
            content.content_type = Some(value.to_string());
        } else if name.eq_ignore_ascii_case("user-agent") {
            self.user_agent.push(ProductToken::parse(value));
        } else {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| HttpError::header(name, e))?;
            let header_value = HeaderValue::from_str(value).map_err(|e| HttpError::header(name, e))?;
            self.headers.append(header_name, header_value);
        }
        Ok(self)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, HttpError> {
        self.set_header(name, value)?;
        Ok(self)
    }

    /// First raw header value stored under `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn with_config(mut self, config: &RequestConfig) -> Result<Self, HttpError> {
        config.apply(&mut self)?;
        Ok(self)
    }
}

/// Bulk header configuration applied to a request in one go.
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    pub accept: Option<String>,
    pub user_agent: Option<String>,
    pub content_type: Option<String>,
    pub authorization: Option<(String, String)>,
    headers: BTreeMap<String, (String, String)>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn authorization(mut self, scheme: impl Into<String>, credential: impl Into<String>) -> Self {
        self.authorization = Some((scheme.into(), credential.into()));
        self
    }

    /// Add a header; names compare case-insensitively and the last write wins.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.insert(name.to_ascii_lowercase(), (name, value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn apply(&self, request: &mut HttpRequest) -> Result<(), HttpError> {
        let mut headers = self.headers.clone();
        if let Some(accept) = &self.accept {
            request.accept = accept.clone();
        }
        if let Some(user_agent) = &self.user_agent {
            headers.insert("user-agent".into(), ("User-Agent".into(), user_agent.clone()));
        }
        if let Some(content_type) = &self.content_type {
            headers.insert("content-type".into(), ("Content-Type".into(), content_type.clone()));
        }
        if let Some((scheme, credential)) = &self.authorization {
            request.authorization = Some(Authorization::new(scheme.clone(), credential.clone()));
        }
        for (key, (name, value)) in &headers {
            if key == "accept" {
                request.accept = value.clone();
            } else {
                request.set_header(name, value)?;
            }
        }
        Ok(())
    }
}
