//! The purchase order under test.
//!
//! These types are laid out the way `prost-build` would emit them for
//!
//! ```proto
//! message Order {
//!   message OrderItem {
//!     string code = 1;
//!     string name = 2;
//!     float unit_price = 3;
//!     int32 quantity = 4;
//!   }
//!   string id = 1;
//!   string status = 2;
//!   int64 created_on = 3;
//!   repeated OrderItem order_items = 4;
//! }
//! ```
//!
//! with serde derives added so the generic JSON codec can work on the same
//! values without a schema of its own.

use prost::Message;
use serde::{Deserialize, Serialize};

use self::json_fields::{null_as_default, price};

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    #[prost(string, tag = "1")]
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[prost(string, tag = "2")]
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[prost(int64, tag = "3")]
    #[serde(deserialize_with = "null_as_default")]
    pub created_on: i64,
    #[prost(message, repeated, tag = "4")]
    #[serde(deserialize_with = "null_as_default")]
    pub order_items: Vec<OrderItem>,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderItem {
    #[prost(string, tag = "1")]
    #[serde(deserialize_with = "null_as_default")]
    pub code: String,
    #[prost(string, tag = "2")]
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[prost(float, tag = "3")]
    #[serde(deserialize_with = "price")]
    pub unit_price: f32,
    #[prost(int32, tag = "4")]
    #[serde(deserialize_with = "null_as_default")]
    pub quantity: i32,
}

pub mod order_tags {
    pub const ID: u32 = 1;
    pub const STATUS: u32 = 2;
    pub const CREATED_ON: u32 = 3;
    pub const ORDER_ITEMS: u32 = 4;
}

pub mod order_item_tags {
    pub const CODE: u32 = 1;
    pub const NAME: u32 = 2;
    pub const UNIT_PRICE: u32 = 3;
    pub const QUANTITY: u32 = 4;
}

/// Field readers for the serde shape of the order, shared with the strict
/// twins in the generic JSON codec. `null` reads as the field's zero value.
pub(crate) mod json_fields {
    use serde::{Deserialize, Deserializer, de::Error as _};

    pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    /// serde narrows f64 to f32 with `as`, which turns out-of-range values
    /// into infinity.
    pub(crate) fn price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        let wide = Option::<f64>::deserialize(deserializer)?.unwrap_or_default();
        if wide.abs() > f64::from(f32::MAX) {
            return Err(D::Error::custom(format_args!("value {wide} overflows f32")));
        }
        Ok(wide as f32)
    }
}

impl Order {
    #[must_use]
    pub fn total_quantity(&self) -> i64 {
        self.order_items
            .iter()
            .map(|item| i64::from(item.quantity))
            .sum()
    }
}
