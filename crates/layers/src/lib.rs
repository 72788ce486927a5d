pub mod attribution;
pub mod buildings;
pub mod client_index;
pub mod tenure;
pub mod viewport;

pub use attribution::*;
pub use buildings::*;
pub use client_index::*;
pub use tenure::*;
pub use viewport::*;
