use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, MapAccess, SeqAccess, Visitor},
    ser::{SerializeMap as _, SerializeSeq as _},
};
use serde_json::Value;

use super::{Codec, CodecOptions, DecodeError, EncodeError};
use crate::data::{Order, OrderItem, order_item_tags, order_tags};

/// The proto3 JSON mapping of the order.
///
/// Keys are the lowerCamelCase JSON names, `int64` travels as a string and
/// non-finite floats as `"NaN"`, `"Infinity"` or `"-Infinity"`. Decoding also
/// accepts the `.proto` field names, numbers given as strings and `null` for
/// "not set", the way protobuf JSON parsers do. A field given twice, under
/// either name, is rejected.
#[derive(Debug, Clone)]
pub struct TextCodec {
    options: CodecOptions,
}

impl TextCodec {
    #[must_use]
    pub const fn new(options: CodecOptions) -> Self {
        Self { options }
    }
}

impl Codec for TextCodec {
    fn name(&self) -> &'static str {
        "ProtoJSON"
    }

    fn options(&self) -> CodecOptions {
        self.options
    }

    fn encode(&self, order: &Order) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(&ProtoJsonOrder {
            order,
            emit_unpopulated: self.options.emit_default_valued_fields,
        })?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Order, DecodeError> {
        let node: Node = serde_json::from_slice(bytes)?;
        let discard_unknown = self.options.discard_unknown_fields_on_decode;

        let mut order = Order::default();
        let mut seen = SeenFields::new("Order");
        for (key, value) in node.into_members("Order")? {
            match key.as_str() {
                "id" => {
                    seen.mark(order_tags::ID, "id")?;
                    order.id = parse_string("id", value)?;
                }
                "status" => {
                    seen.mark(order_tags::STATUS, "status")?;
                    order.status = parse_string("status", value)?;
                }
                "createdOn" | "created_on" => {
                    seen.mark(order_tags::CREATED_ON, "createdOn")?;
                    order.created_on = parse_int64("createdOn", value)?;
                }
                "orderItems" | "order_items" => {
                    seen.mark(order_tags::ORDER_ITEMS, "orderItems")?;
                    order.order_items = parse_items(value, discard_unknown)?;
                }
                _ if discard_unknown => {}
                _ => {
                    return Err(DecodeError::UnknownField {
                        message: "Order",
                        field: key,
                    });
                }
            }
        }

        Ok(order)
    }
}

struct ProtoJsonOrder<'a> {
    order: &'a Order,
    emit_unpopulated: bool,
}

impl Serialize for ProtoJsonOrder<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let order = self.order;
        let emit = self.emit_unpopulated;

        let mut map = serializer.serialize_map(None)?;
        if emit || !order.id.is_empty() {
            map.serialize_entry("id", &order.id)?;
        }
        if emit || !order.status.is_empty() {
            map.serialize_entry("status", &order.status)?;
        }
        if emit || order.created_on != 0 {
            map.serialize_entry("createdOn", &order.created_on.to_string())?;
        }
        if emit || !order.order_items.is_empty() {
            map.serialize_entry(
                "orderItems",
                &ProtoJsonItems {
                    items: &order.order_items,
                    emit_unpopulated: emit,
                },
            )?;
        }
        map.end()
    }
}

struct ProtoJsonItems<'a> {
    items: &'a [OrderItem],
    emit_unpopulated: bool,
}

impl Serialize for ProtoJsonItems<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let emit = self.emit_unpopulated;

        let mut seq = serializer.serialize_seq(Some(self.items.len()))?;
        for item in self.items {
            seq.serialize_element(&ProtoJsonItem { item, emit })?;
        }
        seq.end()
    }
}

struct ProtoJsonItem<'a> {
    item: &'a OrderItem,
    emit: bool,
}

impl Serialize for ProtoJsonItem<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let item = self.item;
        let emit = self.emit;

        let mut map = serializer.serialize_map(None)?;
        if emit || !item.code.is_empty() {
            map.serialize_entry("code", &item.code)?;
        }
        if emit || !item.name.is_empty() {
            map.serialize_entry("name", &item.name)?;
        }
        if emit || item.unit_price != 0.0 {
            map.serialize_entry("unitPrice", &ProtoJsonFloat(item.unit_price))?;
        }
        if emit || item.quantity != 0 {
            map.serialize_entry("quantity", &item.quantity)?;
        }
        map.end()
    }
}

struct ProtoJsonFloat(f32);

impl Serialize for ProtoJsonFloat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.0;
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value == f32::INFINITY {
            serializer.serialize_str("Infinity")
        } else if value == f32::NEG_INFINITY {
            serializer.serialize_str("-Infinity")
        } else {
            serializer.serialize_f32(value)
        }
    }
}

/// Parsed JSON that keeps every object member in input order, repeats
/// included. `serde_json::Value` keeps only the last of a repeated key.
enum Node {
    Scalar(Value),
    Array(Vec<Node>),
    Object(Vec<(String, Node)>),
}

impl Node {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(value) => kind(value),
            Self::Array(_) => "an array",
            Self::Object(_) => "an object",
        }
    }

    fn into_members(self, message: &'static str) -> Result<Vec<(String, Node)>, DecodeError> {
        match self {
            Self::Object(members) => Ok(members),
            other => Err(DecodeError::invalid(message, "an object", other.kind())),
        }
    }

    fn into_scalar(self, field: &str, expected: &'static str) -> Result<Value, DecodeError> {
        match self {
            Self::Scalar(value) => Ok(value),
            other => Err(DecodeError::invalid(field, expected, other.kind())),
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("any JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Scalar(Value::Null))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Node, E> {
        Ok(Node::Scalar(Value::Bool(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Node, E> {
        Ok(Node::Scalar(Value::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Node, E> {
        Ok(Node::Scalar(Value::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Node, E> {
        Ok(Node::Scalar(Value::from(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Node, E> {
        Ok(Node::Scalar(Value::String(v.to_owned())))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Node, E> {
        Ok(Node::Scalar(Value::String(v)))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Node, A::Error> {
        let mut elements = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(element) = seq.next_element()? {
            elements.push(element);
        }
        Ok(Node::Array(elements))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Node, A::Error> {
        let mut members = Vec::new();
        while let Some(member) = map.next_entry()? {
            members.push(member);
        }
        Ok(Node::Object(members))
    }
}

/// Field numbers already read within one message.
struct SeenFields {
    message: &'static str,
    tags: u32,
}

impl SeenFields {
    const fn new(message: &'static str) -> Self {
        Self { message, tags: 0 }
    }

    fn mark(&mut self, tag: u32, field: &str) -> Result<(), DecodeError> {
        let bit = 1 << tag;
        if self.tags & bit != 0 {
            return Err(DecodeError::DuplicateField {
                message: self.message,
                field: field.to_owned(),
            });
        }
        self.tags |= bit;
        Ok(())
    }
}

fn parse_items(node: Node, discard_unknown: bool) -> Result<Vec<OrderItem>, DecodeError> {
    let nodes = match node {
        Node::Scalar(Value::Null) => return Ok(Vec::new()),
        Node::Array(nodes) => nodes,
        other => return Err(DecodeError::invalid("orderItems", "an array", other.kind())),
    };

    let mut items = Vec::with_capacity(nodes.len());
    for node in nodes {
        let mut item = OrderItem::default();
        let mut seen = SeenFields::new("Order.OrderItem");
        for (key, value) in node.into_members("Order.OrderItem")? {
            match key.as_str() {
                "code" => {
                    seen.mark(order_item_tags::CODE, "code")?;
                    item.code = parse_string("code", value)?;
                }
                "name" => {
                    seen.mark(order_item_tags::NAME, "name")?;
                    item.name = parse_string("name", value)?;
                }
                "unitPrice" | "unit_price" => {
                    seen.mark(order_item_tags::UNIT_PRICE, "unitPrice")?;
                    item.unit_price = parse_float("unitPrice", value)?;
                }
                "quantity" => {
                    seen.mark(order_item_tags::QUANTITY, "quantity")?;
                    item.quantity = parse_int32("quantity", value)?;
                }
                _ if discard_unknown => {}
                _ => {
                    return Err(DecodeError::UnknownField {
                        message: "Order.OrderItem",
                        field: key,
                    });
                }
            }
        }
        items.push(item);
    }

    Ok(items)
}

fn parse_string(field: &str, node: Node) -> Result<String, DecodeError> {
    match node.into_scalar(field, "a string")? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        other => Err(DecodeError::invalid(field, "a string", kind(&other))),
    }
}

fn parse_int64(field: &str, node: Node) -> Result<i64, DecodeError> {
    match node.into_scalar(field, "a 64-bit integer")? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(integral_f64))
            .ok_or_else(|| DecodeError::invalid(field, "a 64-bit integer", n)),
        Value::String(s) => s
            .parse()
            .map_err(|_| DecodeError::invalid(field, "a 64-bit integer", s)),
        other => Err(DecodeError::invalid(field, "a 64-bit integer", kind(&other))),
    }
}

fn parse_int32(field: &str, node: Node) -> Result<i32, DecodeError> {
    let wide = parse_int64(field, node)?;
    i32::try_from(wide).map_err(|_| DecodeError::invalid(field, "a 32-bit integer", wide))
}

fn parse_float(field: &str, node: Node) -> Result<f32, DecodeError> {
    let wide = match node.into_scalar(field, "a float")? {
        Value::Null => return Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| DecodeError::invalid(field, "a float", &n))?,
        Value::String(s) => match s.as_str() {
            "NaN" => return Ok(f32::NAN),
            "Infinity" => return Ok(f32::INFINITY),
            "-Infinity" => return Ok(f32::NEG_INFINITY),
            _ => s
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| DecodeError::invalid(field, "a float", &s))?,
        },
        other => return Err(DecodeError::invalid(field, "a float", kind(&other))),
    };

    if wide.abs() > f64::from(f32::MAX) {
        return Err(DecodeError::invalid(field, "a float within f32 range", wide));
    }
    Ok(wide as f32)
}

fn integral_f64(v: f64) -> Option<i64> {
    // i64::MAX is not exactly representable, so the upper bound is exclusive
    (v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64).then_some(v as i64)
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::data::build;

    const STRICT: CodecOptions = CodecOptions::new(true, false);
    const LENIENT: CodecOptions = CodecOptions::new(true, true);

    fn encode_value(codec: &TextCodec, order: &Order) -> Value {
        serde_json::from_slice(&codec.encode(order).unwrap()).unwrap()
    }

    #[test]
    fn test_uses_json_names_and_string_int64() {
        let value = encode_value(&TextCodec::new(LENIENT), &build());

        assert_eq!(value["id"], "101");
        assert_eq!(value["createdOn"], "1600000000");
        assert_eq!(value["orderItems"][0]["unitPrice"], 220.0);
        assert_eq!(value["orderItems"][1]["quantity"], 2);
        assert!(value.get("created_on").is_none());
    }

    #[test]
    fn test_emit_unpopulated_writes_empty_status() {
        let mut order = build();
        order.status.clear();

        let emitted = encode_value(&TextCodec::new(LENIENT), &order);
        let omitted = encode_value(&TextCodec::new(CodecOptions::new(false, true)), &order);

        assert_eq!(emitted["status"], "");
        assert!(omitted.get("status").is_none());
    }

    #[test]
    fn test_unknown_field_policy() {
        let bytes = serde_json::to_vec(&json!({ "id": "101", "coupon": "SAVE10" })).unwrap();

        assert_eq!(TextCodec::new(LENIENT).decode(&bytes).unwrap().id, "101");
        assert!(matches!(
            TextCodec::new(STRICT).decode(&bytes),
            Err(DecodeError::UnknownField { field, .. }) if field == "coupon"
        ));
    }

    #[test]
    fn test_unknown_nested_field_policy() {
        let bytes =
            serde_json::to_vec(&json!({ "orderItems": [{ "code": "x", "colour": "red" }] }))
                .unwrap();

        assert_eq!(TextCodec::new(LENIENT).decode(&bytes).unwrap().order_items[0].code, "x");
        assert!(TextCodec::new(STRICT).decode(&bytes).is_err());
    }

    #[test]
    fn test_accepts_proto_names_numbers_and_nulls() {
        let bytes = serde_json::to_vec(&json!({
            "id": "7",
            "status": null,
            "created_on": 1_600_000_000,
            "order_items": [{ "unit_price": "12.5", "quantity": "3" }]
        }))
        .unwrap();

        let order = TextCodec::new(STRICT).decode(&bytes).unwrap();

        assert_eq!(order.status, "");
        assert_eq!(order.created_on, 1_600_000_000);
        assert_eq!(order.order_items[0].unit_price, 12.5);
        assert_eq!(order.order_items[0].quantity, 3);
    }

    #[test]
    fn test_non_finite_price_round_trips() {
        let mut order = build();
        order.order_items[0].unit_price = f32::INFINITY;
        let codec = TextCodec::new(LENIENT);

        let decoded = codec.decode(&codec.encode(&order).unwrap()).unwrap();

        assert_eq!(decoded.order_items[0].unit_price, f32::INFINITY);
    }

    #[test]
    fn test_type_violations_fail() {
        let codec = TextCodec::new(LENIENT);

        for body in [
            json!({ "id": 101 }),
            json!({ "createdOn": "yesterday" }),
            json!({ "orderItems": [{ "quantity": 4_294_967_296_i64 }] }),
            json!({ "orderItems": {} }),
            json!([]),
        ] {
            let bytes = serde_json::to_vec(&body).unwrap();
            assert!(
                matches!(codec.decode(&bytes), Err(DecodeError::InvalidValue { .. })),
                "{body}"
            );
        }
    }

    #[test]
    fn test_repeated_field_fails() {
        let codec = TextCodec::new(LENIENT);

        for (body, message, name) in [
            (r#"{"id":"1","id":"2"}"#, "Order", "id"),
            (r#"{"created_on":"5","createdOn":"7"}"#, "Order", "createdOn"),
            (r#"{"status":null,"status":"Created"}"#, "Order", "status"),
            (
                r#"{"orderItems":[{"quantity":1,"unit_price":2,"unitPrice":3}]}"#,
                "Order.OrderItem",
                "unitPrice",
            ),
        ] {
            match codec.decode(body.as_bytes()) {
                Err(DecodeError::DuplicateField { message: m, field }) => {
                    assert_eq!((m, field.as_str()), (message, name), "{body}");
                }
                other => panic!("{body}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_repeats_outside_one_message_are_allowed() {
        let body = r#"{"orderItems":[{"code":"a"},{"code":"b"}],"unknown":1,"unknown":2}"#;

        let order = TextCodec::new(LENIENT).decode(body.as_bytes()).unwrap();

        assert_eq!(order.order_items[1].code, "b");
    }

    #[test]
    fn test_truncated_input_fails() {
        let codec = TextCodec::new(LENIENT);
        let bytes = codec.encode(&build()).unwrap();

        assert!(matches!(
            codec.decode(&bytes[..bytes.len() / 2]),
            Err(DecodeError::Json(_))
        ));
    }
}
