use prost::{
    Message as _,
    bytes::Buf as _,
    encoding::{self, DecodeContext, WireType},
};

use super::{Codec, CodecOptions, DecodeError, EncodeError};
use crate::data::{Order, OrderItem, order_item_tags, order_tags};

/// Protobuf wire format through the prost-derived message types.
///
/// proto3 scalars carry no presence, so the derived encoder drops every
/// zero value. With `emit_default_valued_fields` the order is written field
/// by field instead, zero values included; any proto3 reader accepts that.
/// prost skips unknown tags on decode, so the strict mode walks the input
/// once beforehand and rejects tags the schema does not declare.
#[derive(Debug, Clone)]
pub struct BinaryCodec {
    options: CodecOptions,
}

impl BinaryCodec {
    #[must_use]
    pub const fn new(options: CodecOptions) -> Self {
        Self { options }
    }
}

impl Codec for BinaryCodec {
    fn name(&self) -> &'static str {
        "Protobuf"
    }

    fn options(&self) -> CodecOptions {
        self.options
    }

    fn encode(&self, order: &Order) -> Result<Vec<u8>, EncodeError> {
        if self.options.emit_default_valued_fields {
            return Ok(encode_populated(order));
        }

        let mut buf = Vec::with_capacity(order.encoded_len());
        order.encode(&mut buf)?;
        Ok(buf)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Order, DecodeError> {
        if !self.options.discard_unknown_fields_on_decode {
            reject_unknown_order_fields(bytes)?;
        }

        Ok(Order::decode(bytes)?)
    }
}

fn encode_populated(order: &Order) -> Vec<u8> {
    let items_len: usize = order
        .order_items
        .iter()
        .map(|item| {
            let len = populated_item_len(item);
            encoding::key_len(order_tags::ORDER_ITEMS)
                + encoding::encoded_len_varint(len as u64)
                + len
        })
        .sum();

    let mut buf = Vec::with_capacity(
        encoding::string::encoded_len(order_tags::ID, &order.id)
            + encoding::string::encoded_len(order_tags::STATUS, &order.status)
            + encoding::int64::encoded_len(order_tags::CREATED_ON, &order.created_on)
            + items_len,
    );

    encoding::string::encode(order_tags::ID, &order.id, &mut buf);
    encoding::string::encode(order_tags::STATUS, &order.status, &mut buf);
    encoding::int64::encode(order_tags::CREATED_ON, &order.created_on, &mut buf);
    for item in &order.order_items {
        encoding::encode_key(order_tags::ORDER_ITEMS, WireType::LengthDelimited, &mut buf);
        encoding::encode_varint(populated_item_len(item) as u64, &mut buf);
        encoding::string::encode(order_item_tags::CODE, &item.code, &mut buf);
        encoding::string::encode(order_item_tags::NAME, &item.name, &mut buf);
        encoding::float::encode(order_item_tags::UNIT_PRICE, &item.unit_price, &mut buf);
        encoding::int32::encode(order_item_tags::QUANTITY, &item.quantity, &mut buf);
    }

    buf
}

fn populated_item_len(item: &OrderItem) -> usize {
    encoding::string::encoded_len(order_item_tags::CODE, &item.code)
        + encoding::string::encoded_len(order_item_tags::NAME, &item.name)
        + encoding::float::encoded_len(order_item_tags::UNIT_PRICE, &item.unit_price)
        + encoding::int32::encoded_len(order_item_tags::QUANTITY, &item.quantity)
}

fn reject_unknown_order_fields(mut buf: &[u8]) -> Result<(), DecodeError> {
    while buf.has_remaining() {
        let (tag, wire_type) = encoding::decode_key(&mut buf)?;
        match tag {
            order_tags::ORDER_ITEMS if wire_type == WireType::LengthDelimited => {
                let len = encoding::decode_varint(&mut buf)?;
                let len = usize::try_from(len)
                    .ok()
                    .filter(|&len| len <= buf.remaining())
                    .ok_or_else(|| {
                        DecodeError::invalid("order_items", "a length within the buffer", len)
                    })?;
                reject_unknown_item_fields(&buf[..len])?;
                buf.advance(len);
            }
            order_tags::ID..=order_tags::ORDER_ITEMS => {
                encoding::skip_field(wire_type, tag, &mut buf, DecodeContext::default())?;
            }
            unknown => {
                return Err(DecodeError::UnknownField {
                    message: "Order",
                    field: format!("#{unknown}"),
                });
            }
        }
    }

    Ok(())
}

fn reject_unknown_item_fields(mut buf: &[u8]) -> Result<(), DecodeError> {
    while buf.has_remaining() {
        let (tag, wire_type) = encoding::decode_key(&mut buf)?;
        if !(order_item_tags::CODE..=order_item_tags::QUANTITY).contains(&tag) {
            return Err(DecodeError::UnknownField {
                message: "Order.OrderItem",
                field: format!("#{tag}"),
            });
        }
        encoding::skip_field(wire_type, tag, &mut buf, DecodeContext::default())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use prost::Message as _;

    use super::*;
    use crate::data::build;

    const STRICT: CodecOptions = CodecOptions::new(false, false);
    const LENIENT: CodecOptions = CodecOptions::new(false, true);

    fn with_unknown_field(mut bytes: Vec<u8>) -> Vec<u8> {
        encoding::string::encode(9, &"gift wrap".to_owned(), &mut bytes);
        bytes
    }

    #[test]
    fn test_unknown_top_level_field_policy() {
        let order = build();
        let bytes = with_unknown_field(BinaryCodec::new(LENIENT).encode(&order).unwrap());

        assert_eq!(BinaryCodec::new(LENIENT).decode(&bytes).unwrap(), order);
        assert!(matches!(
            BinaryCodec::new(STRICT).decode(&bytes),
            Err(DecodeError::UnknownField { message: "Order", .. })
        ));
    }

    #[test]
    fn test_unknown_nested_field_is_rejected_when_strict() {
        let mut item = Vec::new();
        encoding::string::encode(order_item_tags::CODE, &"knd100".to_owned(), &mut item);
        encoding::int32::encode(7, &5, &mut item);

        let mut bytes = Vec::new();
        encoding::encode_key(order_tags::ORDER_ITEMS, WireType::LengthDelimited, &mut bytes);
        encoding::encode_varint(item.len() as u64, &mut bytes);
        bytes.extend_from_slice(&item);

        let lenient = BinaryCodec::new(LENIENT).decode(&bytes).unwrap();
        assert_eq!(lenient.order_items[0].code, "knd100");

        assert!(matches!(
            BinaryCodec::new(STRICT).decode(&bytes),
            Err(DecodeError::UnknownField { message: "Order.OrderItem", .. })
        ));
    }

    #[test]
    fn test_truncated_input_fails() {
        let bytes = BinaryCodec::new(LENIENT).encode(&build()).unwrap();
        let truncated = &bytes[..bytes.len() - 3];

        assert!(BinaryCodec::new(LENIENT).decode(truncated).is_err());
        assert!(BinaryCodec::new(STRICT).decode(truncated).is_err());
    }

    #[test]
    fn test_populated_encoding_matches_derived_length_plus_defaults() {
        let mut order = build();
        order.status.clear();

        let derived = BinaryCodec::new(LENIENT).encode(&order).unwrap();
        let populated = BinaryCodec::new(CodecOptions::new(true, true))
            .encode(&order)
            .unwrap();

        // tag byte + zero length byte for the empty status
        assert_eq!(populated.len(), derived.len() + 2);
        assert_eq!(Order::decode(populated.as_slice()).unwrap(), order);
    }

    #[test]
    fn test_populated_encoding_of_full_fixture_is_byte_identical() {
        let order = build();

        assert_eq!(
            BinaryCodec::new(CodecOptions::new(true, true))
                .encode(&order)
                .unwrap(),
            order.encode_to_vec()
        );
    }
}
