use serde::Deserialize;
use serde_json::Value;

use super::{Codec, CodecOptions, DecodeError, EncodeError};
use crate::data::{
    Order, OrderItem,
    order::json_fields::{null_as_default, price},
};

/// Plain serde JSON over the derived shape of [`Order`], with no field
/// mapping of its own.
///
/// Omitting default values mirrors `omitempty`: the order is lowered to a
/// [`Value`] and zero-valued members are dropped. Strict decoding goes
/// through a `deny_unknown_fields` twin of the order types.
#[derive(Debug, Clone)]
pub struct GenericStructCodec {
    options: CodecOptions,
}

impl GenericStructCodec {
    #[must_use]
    pub const fn new(options: CodecOptions) -> Self {
        Self { options }
    }
}

impl Codec for GenericStructCodec {
    fn name(&self) -> &'static str {
        "JSON"
    }

    fn options(&self) -> CodecOptions {
        self.options
    }

    fn encode(&self, order: &Order) -> Result<Vec<u8>, EncodeError> {
        // serde_json would quietly write non-finite floats as `null`
        if let Some(item) = order.order_items.iter().find(|i| !i.unit_price.is_finite()) {
            return Err(EncodeError::Unrepresentable {
                field: "order_items.unit_price",
                reason: format!("{} is not a finite JSON number", item.unit_price),
            });
        }

        if self.options.emit_default_valued_fields {
            return Ok(serde_json::to_vec(order)?);
        }

        let mut value = serde_json::to_value(order)?;
        strip_defaults(&mut value);
        Ok(serde_json::to_vec(&value)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Order, DecodeError> {
        if self.options.discard_unknown_fields_on_decode {
            return Ok(serde_json::from_slice(bytes)?);
        }

        let strict: StrictOrder = serde_json::from_slice(bytes).map_err(|e| {
            unknown_field(&e).map_or(DecodeError::Json(e), |(message, field)| {
                DecodeError::UnknownField { message, field }
            })
        })?;
        Ok(strict.into())
    }
}

fn strip_defaults(value: &mut Value) {
    match value {
        Value::Object(map) => map.retain(|_, member| {
            strip_defaults(member);
            !is_default(member)
        }),
        Value::Array(elements) => elements.iter_mut().for_each(strip_defaults),
        _ => {}
    }
}

fn is_default(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(_) => false,
    }
}

// serde_json reports `unknown field `x`, expected one of `a`, `b`, ...` with
// no path, so the expected list tells which message was being read.
fn unknown_field(error: &serde_json::Error) -> Option<(&'static str, String)> {
    let text = error.to_string();
    let rest = text.strip_prefix("unknown field `")?;
    let end = rest.find('`')?;
    let message = if rest[end..].contains("`unit_price`") {
        "Order.OrderItem"
    } else {
        "Order"
    };
    Some((message, rest[..end].to_owned()))
}

#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StrictOrder {
    #[serde(deserialize_with = "null_as_default")]
    id: String,
    #[serde(deserialize_with = "null_as_default")]
    status: String,
    #[serde(deserialize_with = "null_as_default")]
    created_on: i64,
    #[serde(deserialize_with = "null_as_default")]
    order_items: Vec<StrictOrderItem>,
}

#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct StrictOrderItem {
    #[serde(deserialize_with = "null_as_default")]
    code: String,
    #[serde(deserialize_with = "null_as_default")]
    name: String,
    #[serde(deserialize_with = "price")]
    unit_price: f32,
    #[serde(deserialize_with = "null_as_default")]
    quantity: i32,
}

impl From<StrictOrder> for Order {
    fn from(strict: StrictOrder) -> Self {
        Self {
            id: strict.id,
            status: strict.status,
            created_on: strict.created_on,
            order_items: strict.order_items.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<StrictOrderItem> for OrderItem {
    fn from(strict: StrictOrderItem) -> Self {
        Self {
            code: strict.code,
            name: strict.name,
            unit_price: strict.unit_price,
            quantity: strict.quantity,
        }
    }
}
