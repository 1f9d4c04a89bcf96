//! Restaurant-delivery read models built on `readflow-engine`.
//!
//! Six processing groups project the delivery domain's event streams into
//! queryable entities:
//!
//! - [`customer`]: customer profiles with their ordering limits
//! - [`courier`]: courier profiles with their delivery capacity
//! - [`restaurant`]: restaurants and their menus
//! - [`order`]: the customer-facing order lifecycle, joined against the
//!   customer and restaurant read models
//! - [`restaurant_order`]: kitchen tickets, joined against restaurants
//! - [`courier_order`]: delivery tasks, joined against couriers
//!
//! [`ReadSide`] assembles all of them, wires the outbound update
//! broadcasters, and fronts the replay coordinator.

pub mod broadcast;
pub mod courier;
pub mod courier_order;
pub mod customer;
mod handler;
pub mod model;
pub mod order;
pub mod read_side;
pub mod restaurant;
pub mod restaurant_order;

pub use broadcast::UpdateBroadcaster;
pub use courier::{CourierEntity, CourierEvent, CourierProjection};
pub use courier_order::{
    CourierOrderEntity, CourierOrderEvent, CourierOrderProjection, CourierOrderState,
};
pub use customer::{CustomerEntity, CustomerEvent, CustomerProjection};
pub use model::{MenuItem, OrderLineItem, RestaurantMenu, RestaurantOrderLineItem};
pub use order::{OrderEntity, OrderEvent, OrderProjection, OrderState};
pub use read_side::ReadSide;
pub use restaurant::{RestaurantEntity, RestaurantEvent, RestaurantProjection};
pub use restaurant_order::{
    RestaurantOrderEntity, RestaurantOrderEvent, RestaurantOrderProjection, RestaurantOrderState,
};
