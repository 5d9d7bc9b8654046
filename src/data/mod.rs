pub mod fixture;
pub mod order;

pub use fixture::*;
pub use order::*;
