pub mod feature;
pub mod picking;
pub mod ring;
pub mod store;

pub use feature::*;
pub use ring::*;
pub use store::*;
