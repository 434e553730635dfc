//! Inbound message from a transport: delivered to the dispatcher for routing.

use chrono::{DateTime, Utc};

/// A driver message received on a channel.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Channel the message arrived on (e.g. "whatsapp"); replies go back through it.
    pub channel_id: String,
    /// Transport-level sender id, used as the driver id.
    pub sender_id: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(
        channel_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            sender_id: sender_id.into(),
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}
