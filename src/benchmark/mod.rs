pub mod runner;
pub mod suite;
pub mod types;

pub use runner::*;
pub use suite::*;
pub use types::*;
