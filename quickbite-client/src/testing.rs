//! Test doubles for the transport and remote-procedure seams.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    Notify,
};

use crate::{
    Api, ApiError, AuthData, Identity, MenuItemData, NewOrder, NewProfile, NotificationKind,
    NotificationPriority, NotificationRecord, OrderData, PushTransport, RestaurantData,
    TransportConnection, TransportError, UserRole,
};

/// An in-memory [PushTransport] the tests script directly.
#[derive(Clone)]
pub struct LocalTransport {
    shared: Arc<Shared>,
}

struct Shared {
    connections: Mutex<Vec<UnboundedSender<String>>>,
    topics: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
    connect_count: AtomicUsize,
    subscribe_count: AtomicUsize,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                connections: Mutex::new(Vec::new()),
                topics: Mutex::new(Vec::new()),
                gate: Mutex::new(None),
                connect_count: AtomicUsize::new(0),
                subscribe_count: AtomicUsize::new(0),
            }),
        }
    }

    /// Makes every connection attempt wait on the returned [Notify], so a
    /// test can keep the channel stuck in the connecting state.
    pub fn hold_connections(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.shared.gate.lock() = Some(gate.clone());

        gate
    }

    /// Sends a payload to every live connection.
    pub fn push(&self, payload: &str) {
        for connection in self.shared.connections.lock().iter() {
            // A closed connection just misses the message
            let _ = connection.send(payload.to_string());
        }
    }

    /// Severs every live connection, as a transport-level drop would.
    pub fn drop_connections(&self) {
        self.shared.connections.lock().clear();
    }

    pub fn subscribed_topics(&self) -> Vec<String> {
        self.shared.topics.lock().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.shared.connect_count.load(Ordering::SeqCst)
    }

    pub fn subscribe_count(&self) -> usize {
        self.shared.subscribe_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushTransport for LocalTransport {
    type Connection = LocalConnection;

    async fn connect(&self) -> Result<LocalConnection, TransportError> {
        self.shared.connect_count.fetch_add(1, Ordering::SeqCst);

        let gate = self.shared.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let (sender, receiver) = unbounded_channel();
        self.shared.connections.lock().push(sender);

        Ok(LocalConnection {
            receiver,
            shared: self.shared.clone(),
        })
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_millis(10)
    }
}

pub struct LocalConnection {
    receiver: UnboundedReceiver<String>,
    shared: Arc<Shared>,
}

#[async_trait]
impl TransportConnection for LocalConnection {
    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        self.shared.topics.lock().push(topic.to_string());
        self.shared.subscribe_count.fetch_add(1, Ordering::SeqCst);

        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.receiver.recv().await.map(Ok)
    }
}

/// A scriptable [Api] that records what the client sends it.
pub struct FakeApi {
    pub orders: Mutex<Vec<NewOrder>>,
    pub notifications: Mutex<Vec<NotificationRecord>>,
    pub marked_read: Mutex<Vec<i64>>,
    pub token: Mutex<Option<String>>,
    fail_order: AtomicBool,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            orders: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
            marked_read: Mutex::new(Vec::new()),
            token: Mutex::new(None),
            fail_order: AtomicBool::new(false),
        }
    }

    /// Makes the next `create_order` fail with a remote error.
    pub fn fail_next_order(&self) {
        self.fail_order.store(true, Ordering::SeqCst);
    }

    fn identity(email: &str) -> Identity {
        Identity {
            id: 1,
            email: email.to_string(),
            display_name: "Ada".to_string(),
            role: UserRole::Customer,
        }
    }
}

#[async_trait]
impl Api for FakeApi {
    async fn authenticate(&self, email: &str, _password: &str) -> Result<AuthData, ApiError> {
        Ok(AuthData {
            identity: Self::identity(email),
            token: "token-1".to_string(),
        })
    }

    async fn register(&self, profile: NewProfile) -> Result<AuthData, ApiError> {
        Ok(AuthData {
            identity: Self::identity(&profile.email),
            token: "token-1".to_string(),
        })
    }

    async fn list_notifications(&self) -> Result<Vec<NotificationRecord>, ApiError> {
        Ok(self.notifications.lock().clone())
    }

    async fn mark_notification_read(&self, id: i64) -> Result<(), ApiError> {
        self.marked_read.lock().push(id);
        Ok(())
    }

    async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
        Ok(())
    }

    async fn list_restaurants(&self) -> Result<Vec<RestaurantData>, ApiError> {
        Ok(Vec::new())
    }

    async fn restaurant(&self, id: i64) -> Result<RestaurantData, ApiError> {
        Err(ApiError::Remote(format!("no restaurant {id}")))
    }

    async fn menu_items(&self, _restaurant_id: i64) -> Result<Vec<MenuItemData>, ApiError> {
        Ok(Vec::new())
    }

    async fn create_order(&self, order: NewOrder) -> Result<OrderData, ApiError> {
        if self.fail_order.swap(false, Ordering::SeqCst) {
            return Err(ApiError::Remote("order service unavailable".to_string()));
        }

        self.orders.lock().push(order);

        Ok(OrderData {
            id: 42,
            status: "CREATED".to_string(),
            total_price: None,
        })
    }

    fn set_credential(&self, token: Option<String>) {
        *self.token.lock() = token;
    }
}

/// A notification in its wire shape, as the push transport would deliver it.
pub fn payload(id: i64, is_read: bool) -> String {
    serde_json::json!({
        "id": id,
        "type": "ORDER_CREATED",
        "priority": "NORMAL",
        "title": "Order update",
        "message": "Your order moved along",
        "isRead": is_read,
        "createdAt": "2024-05-01T12:30:00"
    })
    .to_string()
}

/// An already-parsed notification record for direct inbox manipulation.
pub fn record(id: i64, is_read: bool) -> NotificationRecord {
    NotificationRecord {
        id,
        kind: NotificationKind::OrderCreated,
        priority: NotificationPriority::Normal,
        title: "Order update".to_string(),
        message: "Your order moved along".to_string(),
        is_read,
        created_at: chrono::DateTime::from_timestamp(1_700_000_000 + id, 0)
            .unwrap()
            .naive_utc(),
    }
}
