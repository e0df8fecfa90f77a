use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use quickbite_core::{read_json, write_json, Storage};

use crate::ClientContext;

/// Storage key holding the serialized [Cart].
pub const CART_KEY: &str = "cart-storage";

/// The vendor a cart's items are sourced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorRef {
    pub vendor_id: i64,
    pub vendor_name: String,
}

/// Attributes of a menu item that matter for display and dietary choices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineAttributes {
    pub description: Option<String>,
    pub is_vegetarian: bool,
    pub is_vegan: bool,
    pub spicy_level: u8,
}

/// One distinct menu item and its quantity within a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub item_id: i64,
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
    #[serde(default)]
    pub attributes: LineAttributes,
}

/// A menu item about to be added to the cart.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLine {
    pub item_id: i64,
    pub name: String,
    pub unit_price: f64,
    pub attributes: LineAttributes,
}

impl NewLine {
    fn into_line(self) -> CartLine {
        CartLine {
            item_id: self.item_id,
            name: self.name,
            unit_price: self.unit_price,
            quantity: 1,
            attributes: self.attributes,
        }
    }
}

/// A single-vendor cart. Invariant: `vendor` is [None] exactly when `lines`
/// is empty, and every line belongs to that one vendor.
///
/// These are the pure state transitions. Durability is layered on top by
/// [CartState], so they stay unit-testable without a storage backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub vendor: Option<VendorRef>,
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// Returns true when adding an item from this vendor would throw away the
    /// current cart. The confirmation gate belongs to the caller.
    pub fn would_replace_vendor(&self, vendor_id: i64) -> bool {
        self.vendor
            .as_ref()
            .is_some_and(|v| v.vendor_id != vendor_id)
    }

    /// Adds an item from the given vendor.
    ///
    /// A differing vendor replaces the cart wholesale with a new single-line
    /// cart. An existing line increments its quantity, otherwise a quantity-1
    /// line is appended and the vendor is set if the cart was empty.
    pub fn add_item(&mut self, item: NewLine, vendor: VendorRef) {
        if self.would_replace_vendor(vendor.vendor_id) {
            self.lines.clear();
            self.lines.push(item.into_line());
            self.vendor = Some(vendor);
            return;
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.item_id == item.item_id) {
            line.quantity += 1;
            return;
        }

        if self.lines.is_empty() {
            self.vendor = Some(vendor);
        }

        self.lines.push(item.into_line());
    }

    /// Decrements a line's quantity, removing the line at quantity 1.
    pub fn decrease_item(&mut self, item_id: i64) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.item_id == item_id) {
            if line.quantity > 1 {
                line.quantity -= 1;
                return;
            }
        }

        self.remove_item(item_id);
    }

    /// Deletes a line. Emptying the cart clears the vendor as well.
    pub fn remove_item(&mut self, item_id: i64) {
        self.lines.retain(|l| l.item_id != item_id);

        if self.lines.is_empty() {
            self.vendor = None;
        }
    }

    /// Sets a line's quantity directly. Zero or below removes the line.
    pub fn update_quantity(&mut self, item_id: i64, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(item_id);
            return;
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.item_id == item_id) {
            line.quantity = quantity as u32;
        }
    }

    /// Empties lines and vendor unconditionally.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.vendor = None;
    }

    pub fn item_quantity(&self, item_id: i64) -> u32 {
        self.lines
            .iter()
            .find(|l| l.item_id == item_id)
            .map(|l| l.quantity)
            .unwrap_or_default()
    }

    pub fn total_price(&self) -> f64 {
        self.lines
            .iter()
            .map(|l| l.unit_price * l.quantity as f64)
            .sum()
    }

    pub fn total_item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// The durable shopping cart of a session.
///
/// Wraps the pure [Cart] transitions, committing the new state to storage
/// after every mutation so the cart survives restarts.
pub struct CartState<S> {
    storage: Arc<S>,
    cart: Mutex<Cart>,
}

impl<S> CartState<S>
where
    S: Storage,
{
    pub fn new(context: &ClientContext<S>) -> Self {
        Self {
            storage: context.storage.clone(),
            cart: Mutex::new(Cart::default()),
        }
    }

    /// Reloads the cart from storage on process start. Malformed data
    /// degrades to the empty cart.
    pub fn restore(&self) {
        let restored: Cart = read_json(&*self.storage, CART_KEY).unwrap_or_default();
        *self.cart.lock() = restored;
    }

    pub fn would_replace_vendor(&self, vendor_id: i64) -> bool {
        self.cart.lock().would_replace_vendor(vendor_id)
    }

    pub fn add_item(&self, item: NewLine, vendor: VendorRef) {
        self.mutate(|cart| cart.add_item(item, vendor))
    }

    pub fn decrease_item(&self, item_id: i64) {
        self.mutate(|cart| cart.decrease_item(item_id))
    }

    pub fn remove_item(&self, item_id: i64) {
        self.mutate(|cart| cart.remove_item(item_id))
    }

    pub fn update_quantity(&self, item_id: i64, quantity: i64) {
        self.mutate(|cart| cart.update_quantity(item_id, quantity))
    }

    pub fn clear(&self) {
        self.mutate(|cart| cart.clear())
    }

    pub fn snapshot(&self) -> Cart {
        self.cart.lock().clone()
    }

    pub fn vendor(&self) -> Option<VendorRef> {
        self.cart.lock().vendor.clone()
    }

    pub fn lines(&self) -> Vec<CartLine> {
        self.cart.lock().lines.clone()
    }

    pub fn item_quantity(&self, item_id: i64) -> u32 {
        self.cart.lock().item_quantity(item_id)
    }

    pub fn total_price(&self) -> f64 {
        self.cart.lock().total_price()
    }

    pub fn total_item_count(&self) -> u32 {
        self.cart.lock().total_item_count()
    }

    pub fn is_empty(&self) -> bool {
        self.cart.lock().is_empty()
    }

    /// Applies a pure transition, then commits the result to storage.
    fn mutate(&self, operation: impl FnOnce(&mut Cart)) {
        let mut cart = self.cart.lock();

        operation(&mut cart);
        write_json(&*self.storage, CART_KEY, &*cart);
    }
}
