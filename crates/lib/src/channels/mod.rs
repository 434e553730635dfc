//! Messaging transport contract.
//!
//! A transport delivers [`InboundMessage`]s (sender id + text) to the dispatcher and
//! registers a [`ChannelHandle`] that the dispatcher uses to send replies back.

mod inbound;
mod registry;

pub use inbound::InboundMessage;
pub use registry::{ChannelHandle, ChannelRegistry};
