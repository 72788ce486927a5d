pub mod resilience;
pub mod tileset;

pub use resilience::*;
pub use tileset::*;
