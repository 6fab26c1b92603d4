//! Error types shared by the butterfly-osm graph crates

pub mod error;

pub use error::{ElementKind, Error, Result};
