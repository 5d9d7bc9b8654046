use std::{hint::black_box, time::Instant};

use super::{BenchmarkError, BenchmarkResult, IterationPolicy, Operation, RunState};
use crate::{codecs::Codec, data::Order};

/// One timed loop of a single codec operation over the fixture.
///
/// The run moves `NotStarted -> Running -> Completed | Failed` on the first
/// [`execute`](Self::execute); later calls leave the terminal state alone.
/// The first codec error ends the loop.
pub struct BenchmarkRun<'a> {
    codec: &'a dyn Codec,
    fixture: &'a Order,
    operation: Operation,
    iterations: u64,
    state: RunState,
}

impl<'a> BenchmarkRun<'a> {
    #[must_use]
    pub const fn new(
        codec: &'a dyn Codec,
        fixture: &'a Order,
        operation: Operation,
        iterations: u64,
    ) -> Self {
        Self {
            codec,
            fixture,
            operation,
            iterations,
            state: RunState::NotStarted,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &RunState {
        &self.state
    }

    pub fn execute(&mut self) -> &RunState {
        if !matches!(self.state, RunState::NotStarted) {
            return &self.state;
        }

        self.state = RunState::Running;
        self.state = match self.measure() {
            Ok(result) => RunState::Completed(result),
            Err(e) => RunState::Failed(e),
        };
        &self.state
    }

    pub fn into_result(self) -> Result<BenchmarkResult, BenchmarkError> {
        match self.state {
            RunState::Completed(result) => Ok(result),
            RunState::Failed(e) => Err(e),
            RunState::NotStarted | RunState::Running => Err(BenchmarkError::NotExecuted),
        }
    }

    fn measure(&self) -> Result<BenchmarkResult, BenchmarkError> {
        if self.iterations == 0 {
            return Err(BenchmarkError::ZeroIterations);
        }

        let codec = self.codec.name();
        match self.operation {
            Operation::Encode => {
                let mut encoded_bytes = 0;
                let start = Instant::now();
                for iteration in 0..self.iterations {
                    let bytes = self
                        .codec
                        .encode(black_box(self.fixture))
                        .map_err(|source| BenchmarkError::Encode {
                            codec,
                            iteration,
                            source,
                        })?;
                    encoded_bytes = bytes.len();
                    black_box(bytes);
                }
                let elapsed = start.elapsed();

                Ok(BenchmarkResult::new(
                    codec,
                    self.operation,
                    self.iterations,
                    elapsed,
                    encoded_bytes,
                ))
            }
            Operation::Decode => {
                let input = self
                    .codec
                    .encode(self.fixture)
                    .map_err(|source| BenchmarkError::Setup { codec, source })?;

                let start = Instant::now();
                for iteration in 0..self.iterations {
                    let order = self
                        .codec
                        .decode(black_box(input.as_slice()))
                        .map_err(|source| BenchmarkError::Decode {
                            codec,
                            iteration,
                            source,
                        })?;
                    black_box(order);
                }
                let elapsed = start.elapsed();

                Ok(BenchmarkResult::new(
                    codec,
                    self.operation,
                    self.iterations,
                    elapsed,
                    input.len(),
                ))
            }
        }
    }
}

pub fn run(
    codec: &dyn Codec,
    fixture: &Order,
    operation: Operation,
    iterations: u64,
) -> Result<BenchmarkResult, BenchmarkError> {
    let mut run = BenchmarkRun::new(codec, fixture, operation, iterations);
    run.execute();
    run.into_result()
}

pub fn run_with_policy(
    codec: &dyn Codec,
    fixture: &Order,
    operation: Operation,
    policy: IterationPolicy,
) -> Result<BenchmarkResult, BenchmarkError> {
    let (target, max_iterations) = match policy {
        IterationPolicy::Fixed(iterations) => return run(codec, fixture, operation, iterations),
        IterationPolicy::Adaptive {
            target,
            max_iterations,
        } => (target, max_iterations),
    };

    let mut iterations = 1;
    loop {
        let result = run(codec, fixture, operation, iterations)?;
        if result.total_elapsed >= target || iterations >= max_iterations {
            return Ok(result);
        }

        log::debug!(
            "{} {}: {} iterations took {:?}, doubling",
            codec.name(),
            operation,
            iterations,
            result.total_elapsed
        );
        iterations = iterations.saturating_mul(2).min(max_iterations);
    }
}
