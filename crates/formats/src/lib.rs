pub mod geojson;
pub mod ingest;

pub use geojson::*;
pub use ingest::*;
