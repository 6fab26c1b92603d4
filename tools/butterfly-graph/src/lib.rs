//! butterfly-graph: OSM street network reader
//!
//! Reads an OSM extract in several passes over the same input and builds a
//! routable graph: tower nodes become vertices, way segments between them
//! become edges, and turn restriction relations (via a node or via one or
//! more ways) become turn costs.
//!
//! ```no_run
//! use butterfly_graph::{BaseGraph, CarEncoder, OsmReader, ReaderConfig};
//!
//! let mut reader = OsmReader::new(BaseGraph::new(), ReaderConfig::default())
//!     .with_encoder(CarEncoder)
//!     .with_pbf_file("monaco-latest.osm.pbf");
//! let report = reader.read_graph()?;
//! println!("{} nodes, {} edges", report.nodes, report.edges);
//! # Ok::<(), butterfly_graph::Error>(())
//! ```

pub mod area;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod element;
pub mod elevation;
pub mod encoder;
pub mod geometry;
pub mod graph;
pub mod header;
pub mod node_handler;
pub mod node_roles;
pub mod pbf;
pub mod reader;
pub mod relation_preprocessor;
pub mod restriction;
pub mod segmenter;
pub mod source;
pub mod way_preprocessor;

pub use area::{AreaIndex, BoxAreas, NoAreas};
pub use butterfly_common::{Error, Result};
pub use config::ReaderConfig;
pub use element::{
    Element, ElementKind, Member, MemberKind, ReaderNode, ReaderRelation, ReaderWay, Tags,
};
pub use elevation::{ElevationProvider, FixedElevation, NoElevation};
pub use encoder::{CarEncoder, EdgeFlags, TagEncoder};
pub use geometry::GeoPoint;
pub use graph::{BaseGraph, EdgeId, EdgeRecord, GraphStorage, NodeId, TurnCostTable};
pub use pbf::PbfSource;
pub use reader::{OsmReader, ReadReport};
pub use restriction::{RestrictionStats, RestrictionType};
pub use source::{ElementSource, MemorySource};
