use std::collections::VecDeque;

use chrono::NaiveDateTime;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// The kind of event a notification describes, mirroring the wire enumeration.
/// Unknown kinds fold into [NotificationKind::Other] so a new server-side
/// variant never breaks parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    OrderCreated,
    OrderConfirmed,
    OrderPreparing,
    OrderReady,
    OrderPickedUp,
    OrderInTransit,
    OrderDelivered,
    OrderCancelled,
    DeliveryAssigned,
    DeliveryAccepted,
    DeliveryRejected,
    DeliveryNear,
    PaymentSuccess,
    PaymentFailed,
    RefundProcessed,
    Promotion,
    SystemMessage,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// A single notification. Created by bulk load or realtime push, and only
/// ever mutated to flip `is_read`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub priority: NotificationPriority,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Default)]
struct InboxInner {
    notifications: VecDeque<NotificationRecord>,
    unread_count: usize,
}

/// The ordered collection of notifications visible to the user, newest first,
/// with unread-count accounting.
///
/// Invariant, after every operation: `unread_count` equals the number of
/// records with `is_read == false`.
#[derive(Debug, Default)]
pub struct NotificationInbox {
    inner: Mutex<InboxInner>,
}

impl NotificationInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the full sequence, recomputing the unread count from scratch.
    /// Used on cold load from the remote inbox.
    pub fn replace_all(&self, records: Vec<NotificationRecord>) {
        let mut inner = self.inner.lock();

        inner.unread_count = records.iter().filter(|r| !r.is_read).count();
        inner.notifications = records.into();
    }

    /// Inserts a realtime-delivered record at the head. Push delivery is
    /// near-real-time, so arrival order stands in for timestamp order.
    pub fn push_one(&self, record: NotificationRecord) {
        let mut inner = self.inner.lock();

        if !record.is_read {
            inner.unread_count += 1;
        }

        inner.notifications.push_front(record);
    }

    /// Marks one record read. Idempotent: only a real unread-to-read flip
    /// moves the counter, and the counter never goes below zero.
    pub fn mark_read(&self, id: i64) {
        let mut inner = self.inner.lock();

        let was_unread = inner
            .notifications
            .iter_mut()
            .find(|r| r.id == id)
            .map(|record| {
                let was_unread = !record.is_read;
                record.is_read = true;
                was_unread
            })
            .unwrap_or(false);

        if was_unread {
            inner.unread_count = inner.unread_count.saturating_sub(1);
        }
    }

    pub fn mark_all_read(&self) {
        let mut inner = self.inner.lock();

        for record in inner.notifications.iter_mut() {
            record.is_read = true;
        }

        inner.unread_count = 0;
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();

        inner.notifications.clear();
        inner.unread_count = 0;
    }

    /// A snapshot of the sequence, newest first.
    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.inner.lock().notifications.iter().cloned().collect()
    }

    pub fn unread_count(&self) -> usize {
        self.inner.lock().unread_count
    }
}
