use std::sync::Arc;

use parking_lot::Mutex;
use quickbite_core::{get_or_create_handle, Storage};
use tokio::task::JoinHandle;

use crate::{ClientContext, ClientEvent, EventSender, NotificationInbox, NotificationRecord};

mod transport;
pub use transport::*;

/// Connection state of the realtime channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

struct ChannelInner {
    state: ChannelState,
    /// Bumped on every connect and disconnect. A driver only acts while its
    /// own generation is current, which is what makes teardown final.
    generation: u64,
    topic: Option<String>,
    driver: Option<JoinHandle<()>>,
}

/// Manages the one push connection of an authenticated session: connect,
/// per-user topic subscription, reconnection, and delivery of inbound
/// notifications into the inbox and onto the event bus.
///
/// Connection trouble never touches the rest of the session state. It only
/// shows up as [ClientEvent::ChannelDisconnected] and a paused inbox.
pub struct RealtimeChannel<T> {
    transport: Arc<T>,
    inbox: Arc<NotificationInbox>,
    emitter: EventSender,
    inner: Arc<Mutex<ChannelInner>>,
}

impl<T> RealtimeChannel<T>
where
    T: PushTransport,
{
    pub fn new<S: Storage>(transport: T, context: &ClientContext<S>) -> Self {
        Self {
            transport: Arc::new(transport),
            inbox: context.inbox.clone(),
            emitter: context.emitter.clone(),
            inner: Arc::new(Mutex::new(ChannelInner {
                state: ChannelState::Disconnected,
                generation: 0,
                topic: None,
                driver: None,
            })),
        }
    }

    /// Starts the connection for the given identity, subscribing to its
    /// notification topic. A no-op unless currently disconnected, so there is
    /// never more than one attempt in flight.
    pub fn connect(&self, identity_key: &str) {
        let mut inner = self.inner.lock();

        if inner.state != ChannelState::Disconnected {
            return;
        }

        let topic = format!("notifications/{identity_key}");

        inner.generation += 1;
        inner.state = ChannelState::Connecting;
        inner.topic = Some(topic.clone());

        let driver = Driver {
            transport: self.transport.clone(),
            inbox: self.inbox.clone(),
            emitter: self.emitter.clone(),
            channel: self.inner.clone(),
            generation: inner.generation,
            topic,
        };

        inner.driver = Some(get_or_create_handle().spawn(driver.run()));
    }

    /// Tears the connection down and cancels any pending reconnect. Safe to
    /// call when already disconnected.
    ///
    /// Deliveries are gated on the generation counter under the channel lock,
    /// so once this returns no message can reach the inbox or event bus.
    pub fn disconnect(&self) {
        let driver = {
            let mut inner = self.inner.lock();

            inner.generation += 1;
            inner.state = ChannelState::Disconnected;
            inner.topic = None;
            inner.driver.take()
        };

        // Aborting drops the transport connection, which closes it and
        // removes its subscriptions
        if let Some(driver) = driver {
            driver.abort();
        }
    }

    pub fn state(&self) -> ChannelState {
        self.inner.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }
}

/// The task behind an active channel: connects, subscribes, pumps messages,
/// and loops through the transport's retry delay when the connection drops.
struct Driver<T: PushTransport> {
    transport: Arc<T>,
    inbox: Arc<NotificationInbox>,
    emitter: EventSender,
    channel: Arc<Mutex<ChannelInner>>,
    generation: u64,
    topic: String,
}

impl<T> Driver<T>
where
    T: PushTransport,
{
    async fn run(self) {
        loop {
            match self.transport.connect().await {
                Ok(mut connection) => match connection.subscribe(&self.topic).await {
                    Ok(()) => {
                        if !self.transition(ChannelState::Connected, Some(ClientEvent::ChannelConnected)) {
                            return;
                        }

                        self.pump(&mut connection).await;
                    }
                    Err(e) => log::warn!("failed to subscribe to {}: {e}", self.topic),
                },
                Err(e) => log::warn!("realtime connection failed: {e}"),
            }

            if !self.transition(
                ChannelState::Disconnected,
                Some(ClientEvent::ChannelDisconnected),
            ) {
                return;
            }

            tokio::time::sleep(self.transport.retry_delay()).await;

            if !self.transition(ChannelState::Connecting, None) {
                return;
            }
        }
    }

    /// Reads messages until the connection closes or errors.
    async fn pump(&self, connection: &mut T::Connection) {
        while let Some(message) = connection.recv().await {
            match message {
                Ok(payload) => self.deliver(&payload),
                Err(e) => {
                    log::warn!("realtime connection lost: {e}");
                    return;
                }
            }
        }
    }

    /// Parses an inbound payload and applies it. Parse failures are dropped,
    /// never fatal to the channel.
    fn deliver(&self, payload: &str) {
        let record: NotificationRecord = match serde_json::from_str(payload) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("dropping malformed notification payload: {e}");
                return;
            }
        };

        let inner = self.channel.lock();

        if inner.generation != self.generation {
            return;
        }

        self.inbox.push_one(record.clone());
        let _ = self.emitter.send(ClientEvent::NotificationReceived {
            notification: record,
        });
    }

    /// Applies a state change and emits its event, unless a disconnect has
    /// superseded this driver. Returns false when it has.
    fn transition(&self, state: ChannelState, event: Option<ClientEvent>) -> bool {
        let mut inner = self.channel.lock();

        if inner.generation != self.generation {
            return false;
        }

        inner.state = state;

        if let Some(event) = event {
            let _ = self.emitter.send(event);
        }

        true
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use quickbite_core::MemoryStorage;
    use tokio::time::sleep;

    use super::*;
    use crate::testing::{payload, LocalTransport};
    use crate::{event_channel, ClientContext, EventReceiver};

    fn channel_with(
        transport: LocalTransport,
    ) -> (RealtimeChannel<LocalTransport>, Arc<NotificationInbox>, EventReceiver) {
        let (emitter, receiver) = event_channel();
        let inbox = Arc::new(NotificationInbox::new());

        let context = ClientContext {
            storage: Arc::new(MemoryStorage::new()),
            inbox: inbox.clone(),
            emitter,
        };

        (RealtimeChannel::new(transport, &context), inbox, receiver)
    }

    async fn settle() {
        sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn delivers_pushed_notifications_into_the_inbox() {
        let transport = LocalTransport::new();
        let (channel, inbox, events) = channel_with(transport.clone());

        channel.connect("ada@example.com");
        settle().await;

        assert!(channel.is_connected());
        assert_eq!(
            transport.subscribed_topics(),
            vec!["notifications/ada@example.com".to_string()]
        );

        transport.push(&payload(1, false));
        settle().await;

        assert_eq!(inbox.unread_count(), 1);

        let received: Vec<_> = events.try_iter().collect();
        assert!(received
            .iter()
            .any(|e| matches!(e, ClientEvent::ChannelConnected)));
        assert!(received
            .iter()
            .any(|e| matches!(e, ClientEvent::NotificationReceived { .. })));
    }

    #[tokio::test]
    async fn malformed_payloads_are_dropped() {
        let transport = LocalTransport::new();
        let (channel, inbox, events) = channel_with(transport.clone());

        channel.connect("ada@example.com");
        settle().await;

        transport.push("{definitely not json");
        settle().await;

        assert_eq!(inbox.unread_count(), 0);
        assert!(inbox.notifications().is_empty());
        assert!(channel.is_connected());

        // Still alive: a well-formed payload right after goes through
        transport.push(&payload(2, false));
        settle().await;

        assert_eq!(inbox.unread_count(), 1);
        drop(events);
    }

    #[tokio::test]
    async fn reconnects_with_a_fresh_subscription_after_a_drop() {
        let transport = LocalTransport::new();
        let (channel, inbox, events) = channel_with(transport.clone());

        channel.connect("ada@example.com");
        settle().await;
        assert!(channel.is_connected());

        transport.drop_connections();
        settle().await;

        assert!(channel.is_connected());
        assert_eq!(transport.subscribe_count(), 2);

        transport.push(&payload(3, false));
        settle().await;
        assert_eq!(inbox.unread_count(), 1);

        let received: Vec<_> = events.try_iter().collect();
        let disconnects = received
            .iter()
            .filter(|e| matches!(e, ClientEvent::ChannelDisconnected))
            .count();
        let connects = received
            .iter()
            .filter(|e| matches!(e, ClientEvent::ChannelConnected))
            .count();

        assert_eq!(disconnects, 1);
        assert_eq!(connects, 2);
    }

    #[tokio::test]
    async fn connecting_twice_is_a_no_op() {
        let transport = LocalTransport::new();
        let (channel, _inbox, _events) = channel_with(transport.clone());

        channel.connect("ada@example.com");
        channel.connect("ada@example.com");
        settle().await;

        assert_eq!(transport.connect_count(), 1);
        assert_eq!(transport.subscribe_count(), 1);
    }

    #[tokio::test]
    async fn disconnecting_while_connecting_suppresses_all_delivery() {
        let transport = LocalTransport::new();
        let gate = transport.hold_connections();
        let (channel, inbox, events) = channel_with(transport.clone());

        channel.connect("ada@example.com");
        settle().await;
        assert_eq!(channel.state(), ChannelState::Connecting);

        channel.disconnect();
        assert_eq!(channel.state(), ChannelState::Disconnected);

        // Even if the held connection attempt is released afterwards, nothing
        // from the old subscription may come through
        gate.notify_one();
        transport.push(&payload(4, false));
        settle().await;

        assert_eq!(inbox.unread_count(), 0);
        assert!(inbox.notifications().is_empty());
        assert!(events
            .try_iter()
            .all(|e| !matches!(e, ClientEvent::NotificationReceived { .. })));
        assert_eq!(channel.state(), ChannelState::Disconnected);
    }

    #[tokio::test]
    async fn disconnect_is_safe_when_already_disconnected() {
        let transport = LocalTransport::new();
        let (channel, _inbox, _events) = channel_with(transport);

        channel.disconnect();
        assert_eq!(channel.state(), ChannelState::Disconnected);
    }

    #[tokio::test]
    async fn reconnecting_after_disconnect_uses_the_new_identity() {
        let transport = LocalTransport::new();
        let (channel, inbox, _events) = channel_with(transport.clone());

        channel.connect("ada@example.com");
        settle().await;

        channel.disconnect();

        channel.connect("grace@example.com");
        settle().await;

        assert!(channel.is_connected());
        assert_eq!(
            transport.subscribed_topics().last().map(String::as_str),
            Some("notifications/grace@example.com")
        );

        transport.push(&payload(5, false));
        settle().await;
        assert_eq!(inbox.unread_count(), 1);
    }
}
