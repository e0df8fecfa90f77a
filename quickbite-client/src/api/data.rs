use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::Identity;

/// The result of a successful authentication or registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    pub identity: Identity,
    pub token: String,
}

/// A new account to register.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantData {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub image_url: Option<String>,
    pub rating: Option<f32>,
    #[serde(default)]
    pub is_open: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemData {
    pub id: i64,
    pub restaurant_id: i64,
    pub restaurant_name: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: f64,
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub is_vegetarian: bool,
    #[serde(default)]
    pub is_vegan: bool,
    #[serde(default)]
    pub spicy_level: u8,
}

/// Where an order should be delivered. Validated before any remote call is
/// made, so an incomplete address never leaves the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    #[validate(length(min = 1, message = "street address is required"))]
    pub street_address: String,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "state is required"))]
    pub state: String,
    #[validate(length(min = 1, message = "zip code is required"))]
    pub zip_code: String,
    pub delivery_instructions: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    CreditCard,
    Cash,
}

/// One item of a new order, by menu item id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderLine {
    pub item_id: i64,
    pub quantity: u32,
}

/// A new order to create remotely.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub vendor_id: i64,
    pub lines: Vec<NewOrderLine>,
    pub delivery_address: DeliveryAddress,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    pub id: i64,
    pub status: String,
    pub total_price: Option<f64>,
}
