use log::{error, info};

use super::{
    BenchmarkCase, BenchmarkError, BenchmarkResult, CaseMeasurement, CaseReport, IterationPolicy,
    Operation, run_with_policy,
};
use crate::{
    codecs::{Codec, CodecKind, CodecOptions},
    data::Order,
    metrics::LatencyTracker,
};

/// Runs every `(codec, operation)` case against one fixture, each case on
/// its own freshly built codec. A failing case is reported and the rest
/// still run.
pub struct BenchmarkSuite<'a> {
    fixture: &'a Order,
    policy: IterationPolicy,
    samples: usize,
    emit_default_valued_fields: Option<bool>,
    discard_unknown_fields_on_decode: Option<bool>,
}

impl<'a> BenchmarkSuite<'a> {
    #[must_use]
    pub const fn new(fixture: &'a Order, policy: IterationPolicy, samples: usize) -> Self {
        Self {
            fixture,
            policy,
            samples,
            emit_default_valued_fields: None,
            discard_unknown_fields_on_decode: None,
        }
    }

    /// Overrides the per-codec defaults from [`CodecKind::default_options`].
    #[must_use]
    pub fn with_option_overrides(
        mut self,
        emit_default_valued_fields: Option<bool>,
        discard_unknown_fields_on_decode: Option<bool>,
    ) -> Self {
        self.emit_default_valued_fields = emit_default_valued_fields;
        self.discard_unknown_fields_on_decode = discard_unknown_fields_on_decode;
        self
    }

    #[must_use]
    pub fn options_for(&self, codec: CodecKind) -> CodecOptions {
        let defaults = codec.default_options();
        CodecOptions::new(
            self.emit_default_valued_fields
                .unwrap_or(defaults.emit_default_valued_fields),
            self.discard_unknown_fields_on_decode
                .unwrap_or(defaults.discard_unknown_fields_on_decode),
        )
    }

    #[must_use]
    pub fn cases(codecs: &[CodecKind], operations: &[Operation]) -> Vec<BenchmarkCase> {
        codecs
            .iter()
            .flat_map(|&codec| {
                operations
                    .iter()
                    .map(move |&operation| BenchmarkCase { codec, operation })
            })
            .collect()
    }

    #[must_use]
    pub fn run_all(&self, cases: &[BenchmarkCase]) -> Vec<CaseReport> {
        cases
            .iter()
            .enumerate()
            .map(|(i, &case)| {
                info!("Case {}/{}: {case}", i + 1, cases.len());
                self.run_case(case)
            })
            .collect()
    }

    #[must_use]
    pub fn run_case(&self, case: BenchmarkCase) -> CaseReport {
        let options = self.options_for(case.codec);
        let codec = case.codec.build(options);

        let outcome = self.measure(codec.as_ref(), case.operation);
        match &outcome {
            Ok(measurement) => info!(
                "{case}: {:.1} ops/sec, {} bytes, variability {:.1}%",
                measurement.mean_ops_per_sec(),
                measurement.encoded_bytes(),
                measurement.variability_percent()
            ),
            Err(e) => error!("{case} aborted: {e}"),
        }

        CaseReport {
            case,
            options,
            outcome,
        }
    }

    fn measure(
        &self,
        codec: &dyn Codec,
        operation: Operation,
    ) -> Result<CaseMeasurement, BenchmarkError> {
        let first = run_with_policy(codec, self.fixture, operation, self.policy)?;
        // later samples reuse the calibrated count so they stay comparable
        let repeat = IterationPolicy::Fixed(first.iterations);

        let mut samples: Vec<BenchmarkResult> = Vec::with_capacity(self.samples.max(1));
        samples.push(first);
        for _ in 1..self.samples {
            samples.push(run_with_policy(codec, self.fixture, operation, repeat)?);
        }

        let mut tracker = LatencyTracker::new();
        for sample in &samples {
            tracker.record(sample.per_op_latency);
        }

        Ok(CaseMeasurement {
            latency: tracker.get_percentiles(),
            samples,
        })
    }
}
