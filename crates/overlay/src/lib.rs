pub mod controller;
pub mod drag;
pub mod offset;
pub mod transform;

pub use controller::*;
pub use drag::*;
pub use offset::*;
pub use transform::*;
