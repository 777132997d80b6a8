#![allow(dead_code)]

use etp_session::etp::transport::TransportEvent;
use etp_session::etp::types::EtpMessage;
use tokio::sync::mpsc::UnboundedReceiver;

/// Receives the next framed message, skipping transport lifecycle events.
pub async fn next_message(events: &mut UnboundedReceiver<TransportEvent>) -> EtpMessage {
    loop {
        match events.recv().await.expect("transport event stream ended") {
            TransportEvent::Message(message) => return message,
            _ => continue,
        }
    }
}

/// Drains every message currently queued, without waiting.
pub fn drain_messages(events: &mut UnboundedReceiver<TransportEvent>) -> Vec<EtpMessage> {
    let mut messages = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let TransportEvent::Message(message) = event {
            messages.push(message);
        }
    }
    messages
}
