//! Streaming GeoJSON ingestion
//!
//! Turns raw tile payload bytes into typed [`Feature`]s in a single forward
//! pass. The [`scanner`] produces flat JSON token events; the [`parser`]
//! drives an explicit mode machine over them to reconstruct features without
//! building a document tree.

mod feature;
mod parser;
mod scanner;

pub use feature::{Feature, Geometry, Ring, Value};
pub use parser::parse;
pub use scanner::ParseError;
