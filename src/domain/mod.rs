pub mod frame;
pub mod prediction;

pub use frame::*;
pub use prediction::*;
