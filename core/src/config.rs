//! Transport configuration shared by both calling modes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings applied when `HttpClient` builds its transports.
///
/// Every field has a default, so a partial document deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Sent when a request carries no `User-Agent` of its own.
    pub user_agent: Option<String>,
    pub timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub pool_idle_timeout_secs: Option<u64>,
    /// Charset used to decode text responses that do not declare one.
    pub text_encoding: String,
    pub gzip: bool,
    pub deflate: bool,
    pub brotli: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: Some(concat!("forum-http/", env!("CARGO_PKG_VERSION")).to_string()),
            timeout_secs: None,
            connect_timeout_secs: None,
            pool_idle_timeout_secs: None,
            text_encoding: "utf-8".to_string(),
            gzip: true,
            deflate: true,
            brotli: true,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    pub fn pool_idle_timeout(&self) -> Option<Duration> {
        self.pool_idle_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_decompression() {
        let config = ClientConfig::default();
        assert!(config.gzip && config.deflate && config.brotli);
        assert_eq!(config.text_encoding, "utf-8");
        assert!(config.user_agent.unwrap().starts_with("forum-http/"));
        assert!(config.timeout_secs.is_none());
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"timeout_secs":30,"brotli":false}"#).unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert!(!config.brotli);
        assert!(config.gzip);
        assert_eq!(config.text_encoding, "utf-8");
    }
}
