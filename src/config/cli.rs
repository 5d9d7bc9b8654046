use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::{
    benchmark::{IterationPolicy, Operation},
    codecs::CodecKind,
};

#[derive(Debug, Clone, Parser)]
#[command(name = "order_bench_runner")]
#[command(about = "Order encode/decode throughput across wire encodings")]
#[command(
    long_about = "Measures protobuf binary, protobuf JSON and plain JSON marshal/unmarshal cost for a fixed purchase order"
)]
#[non_exhaustive]
pub struct OrderBenchConfig {
    #[arg(long, value_delimiter = ',', default_values_t = CodecKind::ALL)]
    pub codec: Vec<CodecKind>,

    #[arg(long, value_delimiter = ',', default_values_t = Operation::ALL)]
    pub operation: Vec<Operation>,

    /// Fixed iteration count per sample; adaptive when omitted.
    #[arg(long)]
    pub iterations: Option<u64>,

    #[arg(long, default_value = "1000")]
    pub min_time_ms: u64,

    #[arg(long, default_value = "1000000000")]
    pub max_iterations: u64,

    #[arg(long, default_value = "5")]
    pub samples: usize,

    #[arg(long)]
    pub emit_defaults: Option<bool>,

    #[arg(long)]
    pub discard_unknown: Option<bool>,

    /// Stamp the fixture with the current time instead of the frozen one.
    #[arg(long)]
    pub live_timestamp: bool,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Iterations must be at least 1, got {0}")]
    InvalidIterations(u64),

    #[error("Minimum sample time must be between 1-600000ms, got {0}ms")]
    InvalidMinTime(u64),

    #[error("Max iterations must be at least 1, got {0}")]
    InvalidMaxIterations(u64),

    #[error("Samples must be between 1-1000, got {0}")]
    InvalidSamples(usize),

    #[error("At least one {0} must be selected")]
    EmptySelection(&'static str),
}

impl OrderBenchConfig {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if let Some(iterations) = self.iterations {
            if iterations == 0 {
                return Err(ConfigValidationError::InvalidIterations(iterations));
            }
        }

        if !(1..=600_000).contains(&self.min_time_ms) {
            return Err(ConfigValidationError::InvalidMinTime(self.min_time_ms));
        }

        if self.max_iterations == 0 {
            return Err(ConfigValidationError::InvalidMaxIterations(
                self.max_iterations,
            ));
        }

        if !(1..=1000).contains(&self.samples) {
            return Err(ConfigValidationError::InvalidSamples(self.samples));
        }

        if self.codec.is_empty() {
            return Err(ConfigValidationError::EmptySelection("codec"));
        }

        if self.operation.is_empty() {
            return Err(ConfigValidationError::EmptySelection("operation"));
        }

        Ok(())
    }

    #[must_use]
    pub fn iteration_policy(&self) -> IterationPolicy {
        self.iterations.map_or(
            IterationPolicy::Adaptive {
                target: Duration::from_millis(self.min_time_ms),
                max_iterations: self.max_iterations,
            },
            IterationPolicy::Fixed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> OrderBenchConfig {
        let argv = std::iter::once("order_bench_runner").chain(args.iter().copied());
        OrderBenchConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_select_every_case_adaptively() {
        let config = parse(&[]);

        assert!(config.validate().is_ok());
        assert_eq!(config.codec, CodecKind::ALL);
        assert_eq!(config.operation, Operation::ALL);
        assert_eq!(
            config.iteration_policy(),
            IterationPolicy::Adaptive {
                target: Duration::from_secs(1),
                max_iterations: 1_000_000_000,
            }
        );
    }

    #[test]
    fn test_comma_separated_selection_and_overrides() {
        let config = parse(&[
            "--codec",
            "binary,proto-json",
            "--operation",
            "decode",
            "--iterations",
            "500",
            "--discard-unknown",
            "false",
        ]);

        assert_eq!(config.codec, [CodecKind::Binary, CodecKind::ProtoJson]);
        assert_eq!(config.operation, [Operation::Decode]);
        assert_eq!(config.iteration_policy(), IterationPolicy::Fixed(500));
        assert_eq!(config.discard_unknown, Some(false));
        assert_eq!(config.emit_defaults, None);
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        assert!(matches!(
            parse(&["--iterations", "0"]).validate(),
            Err(ConfigValidationError::InvalidIterations(0))
        ));
        assert!(matches!(
            parse(&["--samples", "0"]).validate(),
            Err(ConfigValidationError::InvalidSamples(0))
        ));
        assert!(matches!(
            parse(&["--min-time-ms", "0"]).validate(),
            Err(ConfigValidationError::InvalidMinTime(0))
        ));
    }
}
