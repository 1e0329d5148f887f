//! Inbound interaction-observer messages.
//!
//! Page observers send best-effort messages to whichever context is
//! listening. Only one type is recognised:
//!
//! ```json
//! {
//!   "type": "TAB_ANALYTICS",
//!   "data": { "timeSpent": 5400, "interactions": 3, "scrollDepth": 70, "url": "https://a.com" }
//! }
//! ```
//!
//! Anything else is ignored.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::TabId;

use super::log::{AnalyticsEvent, AnalyticsLog};

// ============================================================================
// Constants
// ============================================================================

/// Message and event type for page interaction reports.
pub const TAB_ANALYTICS: &str = "TAB_ANALYTICS";

// ============================================================================
// TabAnalytics
// ============================================================================

/// Payload of a [`TAB_ANALYTICS`] message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabAnalytics {
    /// Milliseconds since the page observer started.
    pub time_spent: f64,
    /// Click count.
    pub interactions: u64,
    /// Viewport bottom as a percentage of document height.
    pub scroll_depth: f64,
    /// Page url.
    pub url: String,
}

// ============================================================================
// InboundMessage
// ============================================================================

/// Parsed message from a page observer.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Interaction report. `data` is the message payload as received.
    TabAnalytics {
        /// Typed view of the payload.
        analytics: TabAnalytics,
        /// Raw payload, stored verbatim.
        data: Map<String, Value>,
    },

    /// Any other message type.
    Unknown {
        /// Message type tag.
        message_type: String,
    },
}

/// Wire envelope shared by every message type.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    message_type: String,
    #[serde(default)]
    data: Value,
}

impl InboundMessage {
    /// Parses a message from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the text is not a message envelope, or
    /// if a `TAB_ANALYTICS` payload is missing fields.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| Error::parse(format!("message: {e}")))?;
        Self::from_value(value)
    }

    /// Parses a message from a JSON value.
    ///
    /// # Errors
    ///
    /// Same as [`InboundMessage::parse`].
    pub fn from_value(value: Value) -> Result<Self> {
        let envelope: Envelope = serde_json::from_value(value)
            .map_err(|e| Error::parse(format!("message envelope: {e}")))?;

        match envelope.message_type.as_str() {
            TAB_ANALYTICS => {
                let Value::Object(data) = envelope.data else {
                    return Err(Error::parse("TAB_ANALYTICS data must be an object"));
                };
                let analytics = TabAnalytics::deserialize(&Value::Object(data.clone()))
                    .map_err(|e| Error::parse(format!("TAB_ANALYTICS data: {e}")))?;
                Ok(Self::TabAnalytics { analytics, data })
            }
            _ => Ok(Self::Unknown {
                message_type: envelope.message_type,
            }),
        }
    }
}

// ============================================================================
// AnalyticsLog - Message Handling
// ============================================================================

impl AnalyticsLog {
    /// Records an inbound observer message.
    ///
    /// `TAB_ANALYTICS` messages are appended with their payload; `sender`,
    /// when known, is added to the payload as `tabId`. Other message types
    /// are ignored and return `None`.
    ///
    /// # Errors
    ///
    /// - [`Error::Parse`] if the message is malformed
    /// - [`Error::Storage`] if the append fails
    pub async fn handle_message(
        &self,
        text: &str,
        sender: Option<TabId>,
    ) -> Result<Option<AnalyticsEvent>> {
        match InboundMessage::parse(text)? {
            InboundMessage::TabAnalytics { analytics, mut data } => {
                debug!(
                    url = %analytics.url,
                    interactions = analytics.interactions,
                    scroll_depth = analytics.scroll_depth,
                    "Tab analytics received"
                );
                if let Some(tab_id) = sender {
                    data.insert("tabId".into(), Value::from(tab_id.as_u32()));
                }
                self.append(TAB_ANALYTICS, data).await.map(Some)
            }
            InboundMessage::Unknown { message_type } => {
                debug!(message_type = %message_type, "Ignoring unknown message");
                Ok(None)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
