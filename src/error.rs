// file: src/error.rs
// description: error taxonomy shared by the client, transports and binary

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignalError {
    #[error("Failed to parse signal message: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        raw: String,
    },

    #[error("Connection error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    TlsError(#[from] rustls::Error),

    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(#[from] fastwebsockets::WebSocketError),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Unexpected HTTP status {status}")]
    HttpStatus { status: u16 },

    #[error("Unexpected content type: {0}")]
    UnexpectedContentType(String),

    #[error("Malformed HTTP response: {0}")]
    MalformedResponse(String),

    #[error("Connection not established within {}ms", .after.as_millis())]
    ConnectTimeout { after: Duration },

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("No message received for {}ms", .silent_for.as_millis())]
    HeartbeatTimeout { silent_for: Duration },

    #[error("Maximum reconnection attempts ({max}) exceeded")]
    MaxReconnectsExceeded { max: u32 },

    #[error("connect() called outside a tokio runtime")]
    NoRuntime,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Metrics server error: {0}")]
    MetricsError(String),
}

impl SignalError {
    pub fn parse(source: serde_json::Error, raw: impl Into<String>) -> Self {
        Self::Parse {
            source,
            raw: raw.into(),
        }
    }

    /// Parse failures are recovered locally and never tear the connection down.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    pub fn is_heartbeat_timeout(&self) -> bool {
        matches!(self, Self::HeartbeatTimeout { .. })
    }
}
