//! Shared state threaded through every handler of a read

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::area::AreaIndex;
use crate::config::ReaderConfig;
use crate::elevation::ElevationProvider;
use crate::encoder::{RelationFlags, TagEncoder};
use crate::graph::GraphStorage;
use crate::node_roles::NodeRoleStore;
use crate::restriction::setter::RestrictionSetter;
use crate::restriction::RestrictionData;

/// Counters collected over all passes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReadStats {
    /// Node references of accepted ways, used to size the role store
    pub way_node_refs: u64,
    pub route_relations: u64,
    pub ways_processed: u64,
    pub ways_accepted: u64,
    pub closed_ways: u64,
    /// Distinct nodes used by accepted ways
    pub way_nodes: u64,
    pub nodes_read: u64,
    pub nodes_accepted: u64,
    pub tower_nodes: u64,
    pub barriers_split: u64,
    pub barriers_ignored_at_junction: u64,
    pub missing_coordinates: u64,
    pub edges_created: u64,
}

pub struct ReadContext<'a, G: GraphStorage> {
    pub graph: &'a mut G,
    pub config: &'a ReaderConfig,
    pub encoder: &'a dyn TagEncoder,
    pub elevation: &'a dyn ElevationProvider,
    pub areas: &'a dyn AreaIndex,
    pub nodes: NodeRoleStore,
    pub restrictions: RestrictionData,
    pub relation_flags: FxHashMap<i64, RelationFlags>,
    pub setter: RestrictionSetter,
    pub timestamp: Option<String>,
    pub stats: ReadStats,
}

impl<'a, G: GraphStorage> ReadContext<'a, G> {
    pub fn new(
        graph: &'a mut G,
        config: &'a ReaderConfig,
        encoder: &'a dyn TagEncoder,
        elevation: &'a dyn ElevationProvider,
        areas: &'a dyn AreaIndex,
    ) -> Self {
        Self {
            graph,
            config,
            encoder,
            elevation,
            areas,
            nodes: NodeRoleStore::new(),
            restrictions: RestrictionData::new(),
            relation_flags: FxHashMap::default(),
            setter: RestrictionSetter::new(),
            timestamp: None,
            stats: ReadStats::default(),
        }
    }
}
