//! Shared embeddable value types for the read-model entities.
//!
//! These are denormalized copies of write-side values, embedded verbatim
//! in entities so queries never join at read time. Monetary amounts are
//! integer cents.

use serde::{Deserialize, Serialize};

/// A line item of a placed order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    /// Id of the menu item being ordered.
    pub menu_item_id: String,
    /// Display name at order time.
    pub name: String,
    /// Unit price in cents at order time.
    pub price_cents: u64,
    /// Ordered quantity.
    pub quantity: u32,
}

/// A line item as seen by the restaurant (no price).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantOrderLineItem {
    /// Id of the menu item being prepared.
    pub menu_item_id: String,
    /// Display name at order time.
    pub name: String,
    /// Quantity to prepare.
    pub quantity: u32,
}

/// A single item of a restaurant menu.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    /// Menu item id, unique within the restaurant.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Price in cents.
    pub price_cents: u64,
}

/// A restaurant menu embedded in the restaurant entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantMenu {
    /// The menu items.
    pub items: Vec<MenuItem>,
    /// Menu version label assigned by the write side.
    pub version: String,
}
