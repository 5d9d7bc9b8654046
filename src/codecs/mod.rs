pub mod binary_codec;
pub mod error;
pub mod generic_codec;
pub mod text_codec;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub use binary_codec::BinaryCodec;
pub use error::{DecodeError, EncodeError};
pub use generic_codec::GenericStructCodec;
pub use text_codec::TextCodec;

use crate::data::Order;

/// One competing encoding. Implementations hold only the options they were
/// built with; both operations take `&self` and never touch the input.
pub trait Codec {
    fn name(&self) -> &'static str;
    fn options(&self) -> CodecOptions;
    fn encode(&self, order: &Order) -> Result<Vec<u8>, EncodeError>;
    fn decode(&self, bytes: &[u8]) -> Result<Order, DecodeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodecOptions {
    pub emit_default_valued_fields: bool,
    pub discard_unknown_fields_on_decode: bool,
}

impl CodecOptions {
    #[must_use]
    pub const fn new(
        emit_default_valued_fields: bool,
        discard_unknown_fields_on_decode: bool,
    ) -> Self {
        Self {
            emit_default_valued_fields,
            discard_unknown_fields_on_decode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[non_exhaustive]
pub enum CodecKind {
    Binary,

    ProtoJson,

    Json,
}

impl CodecKind {
    pub const ALL: [Self; 3] = [Self::Binary, Self::ProtoJson, Self::Json];

    /// Options each encoding is benchmarked with unless overridden: the
    /// proto JSON marshaler emits unpopulated fields, the other two omit
    /// them, and every decoder skips fields it does not know.
    #[must_use]
    pub const fn default_options(self) -> CodecOptions {
        match self {
            Self::Binary | Self::Json => CodecOptions::new(false, true),
            Self::ProtoJson => CodecOptions::new(true, true),
        }
    }

    #[must_use]
    pub fn build(self, options: CodecOptions) -> Box<dyn Codec> {
        match self {
            Self::Binary => Box::new(BinaryCodec::new(options)),
            Self::ProtoJson => Box::new(TextCodec::new(options)),
            Self::Json => Box::new(GenericStructCodec::new(options)),
        }
    }
}

impl std::fmt::Display for CodecKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binary => write!(f, "binary"),
            Self::ProtoJson => write!(f, "proto-json"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::build;

    #[test]
    fn test_every_codec_round_trips_the_fixture() {
        let order = build();

        for kind in CodecKind::ALL {
            for emit in [false, true] {
                for discard in [false, true] {
                    let codec = kind.build(CodecOptions::new(emit, discard));
                    let bytes = codec.encode(&order).unwrap();
                    let decoded = codec.decode(&bytes).unwrap();

                    assert_eq!(decoded, order, "{kind} emit={emit} discard={discard}");
                }
            }
        }
    }

    #[test]
    fn test_encode_leaves_input_untouched() {
        let order = build();
        let snapshot = order.clone();

        for kind in CodecKind::ALL {
            let codec = kind.build(kind.default_options());
            codec.encode(&order).unwrap();
        }

        assert_eq!(order, snapshot);
    }

    #[test]
    fn test_empty_status_follows_emit_option() {
        let mut order = build();
        order.status.clear();

        for kind in CodecKind::ALL {
            let silent = kind.build(CodecOptions::new(false, true));
            let loud = kind.build(CodecOptions::new(true, true));

            let omitted = silent.encode(&order).unwrap();
            let emitted = loud.encode(&order).unwrap();

            assert!(emitted.len() > omitted.len(), "{kind}");
            assert_eq!(loud.decode(&emitted).unwrap(), order, "{kind}");
            assert_eq!(silent.decode(&omitted).unwrap(), order, "{kind}");
        }
    }

    #[test]
    fn test_built_codec_reports_its_options() {
        let options = CodecOptions::new(true, false);
        for kind in CodecKind::ALL {
            assert_eq!(kind.build(options).options(), options);
        }
    }
}
