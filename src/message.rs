//! Incoming message value types.
//!
//! An [`IncomingMessage`] is created once per request by the transport layer
//! and never mutated. [`NormalizedText`] is the lower-cased, trimmed
//! derivative every lexical component works on; it is recomputed per request
//! and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single inbound customer message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Raw message text as received from the channel.
    pub text: String,
    /// Opaque conversation identifier supplied by the transport.
    pub session_id: String,
    /// When the message entered the system.
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    /// Create a message stamped with the current time.
    pub fn new(text: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            session_id: session_id.into(),
            received_at: Utc::now(),
        }
    }

    /// Override the receive timestamp (used by tests and replay tooling).
    pub fn with_received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = received_at;
        self
    }
}

/// Lower-cased, trimmed view of a message used for all keyword matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText(String);

impl NormalizedText {
    /// Normalize raw text: trim, lower-case, fold typographic apostrophes
    /// so phrase sets only need the ASCII variant.
    pub fn new(raw: &str) -> Self {
        let mut text = raw.trim().to_lowercase();
        if text.contains('\u{2019}') {
            text = text.replace('\u{2019}', "'");
        }
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First `max_chars` characters, respecting char boundaries.
    pub fn prefix(&self, max_chars: usize) -> String {
        self.0.chars().take(max_chars).collect()
    }
}

impl std::fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
