pub mod benchmark;
pub mod codecs;
pub mod config;
pub mod data;
pub mod metrics;

pub use benchmark::*;
pub use codecs::{
    BinaryCodec, Codec, CodecKind, CodecOptions, DecodeError, EncodeError, GenericStructCodec,
    TextCodec,
};
pub use config::{ConfigValidationError, OrderBenchConfig};
pub use data::*;
pub use metrics::*;
