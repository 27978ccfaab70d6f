/// file: src/events.rs
/// description: event bus between client callbacks and the terminal ui
use crate::{config::ConnectionConfig, types::SignalMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

// Arc so fan-out to the ui never clones the message body
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Connecting { url: String },
    Connected,
    MessageReceived(Arc<SignalMessage>),
    Error(String),
    Disconnected,
}

// Bounded so a stalled terminal cannot grow memory without limit; callbacks
// drop events rather than block the client
const EVENT_CHANNEL_CAPACITY: usize = 10_000;

pub type EventSender = mpsc::Sender<ClientEvent>;
pub type EventReceiver = mpsc::Receiver<ClientEvent>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}

fn forward(sender: &EventSender, event: ClientEvent) {
    if let Err(e) = sender.try_send(event) {
        warn!("dropping ui event: {}", e);
    }
}

/// Attach callbacks that forward every client notification onto `sender`.
pub fn forward_events(config: ConnectionConfig, sender: EventSender) -> ConnectionConfig {
    let on_message = sender.clone();
    let on_error = sender.clone();
    let on_connected = sender.clone();
    config
        .on_message(move |message| {
            forward(
                &on_message,
                ClientEvent::MessageReceived(Arc::new(message.clone())),
            )
        })
        .on_error(move |err| forward(&on_error, ClientEvent::Error(err.to_string())))
        .on_connected(move || forward(&on_connected, ClientEvent::Connected))
        .on_disconnected(move || forward(&sender, ClientEvent::Disconnected))
}
