//! Inbound processing loop: transport → router → transport.

use crate::channels::{ChannelRegistry, InboundMessage};
use crate::envelope::Envelope;
use crate::routing::IntentRouter;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

/// Route one inbound message and send the reply back on its channel. Returns the envelope.
pub async fn process_inbound_message(
    router: &IntentRouter,
    registry: &ChannelRegistry,
    msg: InboundMessage,
) -> Envelope {
    log::debug!(
        "inbound: {} message from {} received at {}",
        msg.channel_id,
        msg.sender_id,
        msg.received_at
    );
    let envelope = router.route(&msg.text, &msg.sender_id).await;
    match registry.get(&msg.channel_id).await {
        Some(handle) => {
            if let Err(e) = handle.send_message(&msg.sender_id, &envelope.response).await {
                log::warn!(
                    "inbound: send_message on {} to {} failed: {}",
                    msg.channel_id,
                    msg.sender_id,
                    e
                );
            }
        }
        None => log::warn!("inbound: no channel registered for {}", msg.channel_id),
    }
    envelope
}

/// Consume inbound messages until every sender is dropped. Each message runs on its own task;
/// the returned handle resolves once every reply has been sent.
pub fn spawn_inbound_processor(
    router: Arc<IntentRouter>,
    registry: ChannelRegistry,
    mut rx: mpsc::Receiver<InboundMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut in_flight = JoinSet::new();
        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Some(msg) => {
                        let router = router.clone();
                        let registry = registry.clone();
                        in_flight.spawn(async move {
                            process_inbound_message(&router, &registry, msg).await;
                        });
                    }
                    None => break,
                },
                Some(done) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = done {
                        log::warn!("inbound: message task failed: {}", e);
                    }
                }
            }
        }
        log::debug!(
            "inbound: channel closed, waiting on {} message(s)",
            in_flight.len()
        );
        while let Some(done) = in_flight.join_next().await {
            if let Err(e) = done {
                log::warn!("inbound: message task failed: {}", e);
            }
        }
        log::debug!("inbound: processor exiting");
    })
}
