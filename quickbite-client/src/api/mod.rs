use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

mod data;
mod http;

pub use data::*;
pub use http::*;

use crate::inbox::NotificationRecord;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The call failed at the network or HTTP level. Human-readable, non-fatal:
    /// in-memory state stays in its last-good configuration.
    #[error("remote call failed: {0}")]
    Remote(String),
    /// The server rejected the request, with a field-to-message map
    #[error("the server rejected the request as invalid")]
    Validation(HashMap<String, String>),
}

/// The remote procedure surface of the ordering service.
///
/// Every method is an opaque remote call: it returns a data object or fails
/// with an [ApiError], and never touches client-side state itself.
#[async_trait]
pub trait Api: Send + Sync + 'static {
    async fn authenticate(&self, email: &str, password: &str) -> Result<AuthData>;
    async fn register(&self, profile: NewProfile) -> Result<AuthData>;

    async fn list_notifications(&self) -> Result<Vec<NotificationRecord>>;
    async fn mark_notification_read(&self, id: i64) -> Result<()>;
    async fn mark_all_notifications_read(&self) -> Result<()>;

    async fn list_restaurants(&self) -> Result<Vec<RestaurantData>>;
    async fn restaurant(&self, id: i64) -> Result<RestaurantData>;
    async fn menu_items(&self, restaurant_id: i64) -> Result<Vec<MenuItemData>>;

    async fn create_order(&self, order: NewOrder) -> Result<OrderData>;

    /// Installs or clears the credential token used for subsequent calls.
    fn set_credential(&self, _token: Option<String>) {}
}
