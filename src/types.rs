// file: src/types.rs
// description: signal message model decoded from each event-stream payload

use crate::error::SignalError;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One inbound event. Every message carries `timestamp` and `message_id`;
/// anything else depends on [`SignalBody`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMessage {
    #[serde(flatten)]
    pub body: SignalBody,
    pub timestamp: DateTime<Utc>,
    #[serde(alias = "messageId")]
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalBody {
    Connected {
        #[serde(alias = "userId")]
        user_id: String,
    },
    EntityUpdate {
        domain: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action: Option<String>,
        #[serde(default)]
        record: serde_json::Value,
    },
    PriceUpdate {
        symbol: String,
        price: f64,
    },
    Heartbeat,
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Connected,
    EntityUpdate,
    PriceUpdate,
    Heartbeat,
    Error,
}

impl SignalKind {
    pub const ALL: [SignalKind; 5] = [
        SignalKind::Connected,
        SignalKind::EntityUpdate,
        SignalKind::PriceUpdate,
        SignalKind::Heartbeat,
        SignalKind::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Connected => "connected",
            SignalKind::EntityUpdate => "entity_update",
            SignalKind::PriceUpdate => "price_update",
            SignalKind::Heartbeat => "heartbeat",
            SignalKind::Error => "error",
        }
    }

    /// Accepts the wire tag, case-insensitively.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SignalMessage {
    /// Decode one raw event payload.
    pub fn parse(raw: &str) -> Result<Self, SignalError> {
        serde_json::from_str(raw).map_err(|e| SignalError::parse(e, raw))
    }

    pub fn kind(&self) -> SignalKind {
        match self.body {
            SignalBody::Connected { .. } => SignalKind::Connected,
            SignalBody::EntityUpdate { .. } => SignalKind::EntityUpdate,
            SignalBody::PriceUpdate { .. } => SignalKind::PriceUpdate,
            SignalBody::Heartbeat => SignalKind::Heartbeat,
            SignalBody::Error { .. } => SignalKind::Error,
        }
    }

    pub fn is_heartbeat(&self) -> bool {
        matches!(self.body, SignalBody::Heartbeat)
    }

    /// `(symbol, price)` for price updates.
    pub fn price(&self) -> Option<(&str, f64)> {
        match &self.body {
            SignalBody::PriceUpdate { symbol, price } => Some((symbol.as_str(), *price)),
            _ => None,
        }
    }

    /// Domain name for entity updates, e.g. `todos` or `files`.
    pub fn domain(&self) -> Option<&str> {
        match &self.body {
            SignalBody::EntityUpdate { domain, .. } => Some(domain.as_str()),
            _ => None,
        }
    }

    pub fn datetime_local(&self) -> DateTime<Local> {
        self.timestamp.with_timezone(&Local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_price_update() {
        let raw = r#"{"type":"price_update","symbol":"AAPL","price":189.42,
            "timestamp":"2026-10-17T09:30:00Z","message_id":"m-1"}"#;
        let msg = SignalMessage::parse(raw).unwrap();
        assert_eq!(msg.kind(), SignalKind::PriceUpdate);
        assert_eq!(msg.price(), Some(("AAPL", 189.42)));
        assert_eq!(msg.message_id, "m-1");
    }

    #[test]
    fn parses_camel_case_aliases() {
        let raw = r#"{"type":"connected","userId":"u-42",
            "timestamp":"2026-10-17T09:30:00+02:00","messageId":"m-2"}"#;
        let msg = SignalMessage::parse(raw).unwrap();
        assert_eq!(
            msg.body,
            SignalBody::Connected {
                user_id: "u-42".into()
            }
        );
        assert_eq!(msg.timestamp.to_rfc3339(), "2026-10-17T07:30:00+00:00");
    }

    #[test]
    fn entity_update_keeps_opaque_record() {
        let raw = json!({
            "type": "entity_update",
            "domain": "todos",
            "action": "insert",
            "record": {"id": 7, "title": "buy milk", "done": false},
            "timestamp": "2026-10-17T09:30:00Z",
            "message_id": "m-3",
            "extra": "ignored"
        })
        .to_string();
        let msg = SignalMessage::parse(&raw).unwrap();
        assert_eq!(msg.domain(), Some("todos"));
        match msg.body {
            SignalBody::EntityUpdate { action, record, .. } => {
                assert_eq!(action.as_deref(), Some("insert"));
                assert_eq!(record["title"], "buy milk");
            }
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn heartbeat_has_no_payload() {
        let raw = r#"{"type":"heartbeat","timestamp":"2026-10-17T09:30:00Z","message_id":"hb"}"#;
        let msg = SignalMessage::parse(raw).unwrap();
        assert!(msg.is_heartbeat());
        assert_eq!(msg.price(), None);
        assert_eq!(msg.domain(), None);
    }

    #[test]
    fn missing_envelope_fields_are_rejected() {
        let no_id = r#"{"type":"heartbeat","timestamp":"2026-10-17T09:30:00Z"}"#;
        let no_time = r#"{"type":"heartbeat","message_id":"x"}"#;
        let unknown = r#"{"type":"gossip","timestamp":"2026-10-17T09:30:00Z","message_id":"x"}"#;
        for raw in [no_id, no_time, unknown, "not json"] {
            let err = SignalMessage::parse(raw).unwrap_err();
            assert!(err.is_parse(), "{raw} should be a parse error");
        }
    }

    #[test]
    fn serialized_message_uses_wire_tag() {
        let msg = SignalMessage {
            body: SignalBody::Error {
                message: "quota exceeded".into(),
            },
            timestamp: "2026-10-17T09:30:00Z".parse().unwrap(),
            message_id: "m-9".into(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["message"], "quota exceeded");
        assert_eq!(SignalMessage::parse(&value.to_string()).unwrap(), msg);
    }

    #[test]
    fn kind_tags_round_trip() {
        for kind in SignalKind::ALL {
            assert_eq!(SignalKind::from_tag(kind.as_str()), Some(kind));
        }
        assert_eq!(SignalKind::from_tag(" Price_Update "), Some(SignalKind::PriceUpdate));
        assert_eq!(SignalKind::from_tag("nope"), None);
    }
}
