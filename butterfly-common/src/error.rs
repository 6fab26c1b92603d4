//! Error types shared by the butterfly-osm graph reader
//!
//! Everything in here is fatal for a read: the graph under construction is
//! left in an undefined state and must be discarded. Recoverable problems
//! (a single malformed turn restriction, an unknown tag value) are reported
//! through their own types in the crates that produce them.

use std::path::PathBuf;
use thiserror::Error;

/// Kind of element carried by an input stream, used in ordering diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Header,
    Node,
    Way,
    Relation,
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Header => "header",
            ElementKind::Node => "node",
            ElementKind::Way => "way",
            ElementKind::Relation => "relation",
        }
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Main error type for butterfly-osm graph reading
#[derive(Debug, Error)]
pub enum Error {
    /// Elements arrived out of the header, node, way, relation order
    #[error("invalid OSM input: {found} after {after}")]
    InvalidOrdering { found: ElementKind, after: String },

    /// The producer still had queued elements after the stream ended
    #[error("there were {0} remaining elements in the reader queue")]
    UnprocessedElements(usize),

    /// A mandatory collaborator or input was not configured
    #[error("missing input: {0}")]
    MissingInput(&'static str),

    /// Input file does not exist
    #[error("input file does not exist: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid parameters or graph state
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The reader instance was already used
    #[error("the graph can only be read once per reader")]
    AlreadyRead,

    /// Reading finished without a single graph node
    #[error("graph after reading OSM must not be empty")]
    EmptyGraph,

    /// Failure inside the PBF decoder
    #[error("PBF decoding failed: {0}")]
    Pbf(String),

    /// Configuration file could not be parsed
    #[error("invalid configuration: {0}")]
    Config(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for butterfly-osm operations
pub type Result<T> = std::result::Result<T, Error>;
