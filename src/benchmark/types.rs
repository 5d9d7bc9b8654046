use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    codecs::{CodecKind, CodecOptions, DecodeError, EncodeError},
    metrics::LatencyPercentiles,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[non_exhaustive]
pub enum Operation {
    Encode,

    Decode,
}

impl Operation {
    pub const ALL: [Self; 2] = [Self::Encode, Self::Decode];
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode => write!(f, "encode"),
            Self::Decode => write!(f, "decode"),
        }
    }
}

/// How many times a case's operation is repeated inside one timed loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationPolicy {
    Fixed(u64),

    /// Start at one iteration and double until a single loop runs for at
    /// least `target`, or `max_iterations` is reached.
    Adaptive {
        target: Duration,
        max_iterations: u64,
    },
}

impl Default for IterationPolicy {
    fn default() -> Self {
        Self::Adaptive {
            target: Duration::from_secs(1),
            max_iterations: 1_000_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub codec: &'static str,

    pub operation: Operation,

    pub iterations: u64,

    pub total_elapsed: Duration,

    pub per_op_latency: Duration,

    pub encoded_bytes: usize,
}

impl BenchmarkResult {
    #[must_use]
    pub fn new(
        codec: &'static str,
        operation: Operation,
        iterations: u64,
        total_elapsed: Duration,
        encoded_bytes: usize,
    ) -> Self {
        let per_op_nanos = total_elapsed.as_nanos() / u128::from(iterations.max(1));
        Self {
            codec,
            operation,
            iterations,
            total_elapsed,
            per_op_latency: Duration::from_nanos(u64::try_from(per_op_nanos).unwrap_or(u64::MAX)),
            encoded_bytes,
        }
    }

    #[must_use]
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.total_elapsed.as_secs_f64();
        if secs > 0.0 {
            self.iterations as f64 / secs
        } else {
            0.0
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BenchmarkError {
    #[error("iteration count must be at least 1")]
    ZeroIterations,

    #[error("{codec} could not produce decode input: {source}")]
    Setup {
        codec: &'static str,
        #[source]
        source: EncodeError,
    },

    #[error("{codec} encode failed at iteration {iteration}: {source}")]
    Encode {
        codec: &'static str,
        iteration: u64,
        #[source]
        source: EncodeError,
    },

    #[error("{codec} decode failed at iteration {iteration}: {source}")]
    Decode {
        codec: &'static str,
        iteration: u64,
        #[source]
        source: DecodeError,
    },

    #[error("benchmark run was never executed")]
    NotExecuted,
}

/// Lifecycle of one timed run. `Completed` and `Failed` are terminal.
#[derive(Debug)]
pub enum RunState {
    NotStarted,

    Running,

    Completed(BenchmarkResult),

    Failed(BenchmarkError),
}

impl RunState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BenchmarkCase {
    pub codec: CodecKind,
    pub operation: Operation,
}

impl std::fmt::Display for BenchmarkCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.codec, self.operation)
    }
}

#[derive(Debug)]
pub struct CaseReport {
    pub case: BenchmarkCase,
    pub options: CodecOptions,
    pub outcome: Result<CaseMeasurement, BenchmarkError>,
}

/// Aggregate over the timed samples of a passing case.
#[derive(Debug, Clone)]
pub struct CaseMeasurement {
    pub samples: Vec<BenchmarkResult>,
    pub latency: LatencyPercentiles,
}

impl CaseMeasurement {
    #[must_use]
    pub fn mean_ops_per_sec(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(BenchmarkResult::ops_per_sec).sum::<f64>()
            / self.samples.len() as f64
    }

    #[must_use]
    pub fn variability_percent(&self) -> f64 {
        let mean = self.mean_ops_per_sec();
        let min = self
            .samples
            .iter()
            .map(BenchmarkResult::ops_per_sec)
            .fold(f64::INFINITY, f64::min);
        let max = self
            .samples
            .iter()
            .map(BenchmarkResult::ops_per_sec)
            .fold(f64::NEG_INFINITY, f64::max);
        if mean > 0.0 {
            (max - min) / mean * 100.0
        } else {
            0.0
        }
    }

    #[must_use]
    pub fn encoded_bytes(&self) -> usize {
        self.samples.first().map_or(0, |s| s.encoded_bytes)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuiteReport {
    pub config_summary: BenchConfigSummary,
    pub cases: Vec<CaseSummary>,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BenchConfigSummary {
    pub iteration_policy: String,
    pub samples: usize,
    pub fixture_created_on: i64,
    pub fixture_items: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CaseSummary {
    pub codec: CodecKind,
    pub operation: Operation,
    pub options: CodecOptions,
    pub passed: bool,
    pub error: Option<String>,
    pub iterations: Option<u64>,
    pub encoded_bytes: Option<usize>,
    pub mean_ops_sec: Option<f64>,
    pub variability_percent: Option<f64>,
    pub latency: Option<LatencyPercentiles>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub tool_version: String,
}

impl From<&CaseReport> for CaseSummary {
    fn from(report: &CaseReport) -> Self {
        let base = Self {
            codec: report.case.codec,
            operation: report.case.operation,
            options: report.options,
            passed: report.outcome.is_ok(),
            error: None,
            iterations: None,
            encoded_bytes: None,
            mean_ops_sec: None,
            variability_percent: None,
            latency: None,
        };

        match &report.outcome {
            Ok(measurement) => Self {
                iterations: measurement.samples.last().map(|s| s.iterations),
                encoded_bytes: Some(measurement.encoded_bytes()),
                mean_ops_sec: Some(measurement.mean_ops_per_sec()),
                variability_percent: Some(measurement.variability_percent()),
                latency: Some(measurement.latency.clone()),
                ..base
            },
            Err(e) => Self {
                error: Some(e.to_string()),
                ..base
            },
        }
    }
}
