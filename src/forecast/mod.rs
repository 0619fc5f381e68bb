pub mod engine;
pub mod features;
pub mod window;

pub use engine::*;
pub use features::*;
pub use window::*;
