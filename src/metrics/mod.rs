pub mod latency_stats;

pub use latency_stats::*;
