use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::inbox::NotificationRecord;

pub type EventSender = Sender<ClientEvent>;
pub type EventReceiver = Receiver<ClientEvent>;

/// Events emitted by the client session layer, for the UI to consume.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A realtime notification arrived and was added to the inbox.
    NotificationReceived { notification: NotificationRecord },
    /// The realtime channel established its connection and subscription.
    ChannelConnected,
    /// The realtime channel lost its connection. It reconnects on its own.
    ChannelDisconnected,
    /// The authenticated identity changed, via login, logout, or restore.
    SessionChanged { authenticated: bool },
}

pub fn event_channel() -> (EventSender, EventReceiver) {
    unbounded()
}
