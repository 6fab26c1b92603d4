//! Turn restrictions
//!
//! A restriction relation goes through three representations:
//!
//! 1. [`OsmTurnRestriction`]: member roles decoded into from/via/to way and
//!    node ids (pass 0).
//! 2. [`NodeRestriction`] hops: a via-way chain rewritten as node-local
//!    from/via/to triples over real and artificial way copies (between
//!    pass 1 and pass 2, see [`builder`]).
//! 3. [`GraphRestriction`]: the same restriction expressed with graph edge
//!    and node ids (pass 2, see [`finalizer`]), written into the turn cost
//!    table by the [`setter`].

pub mod builder;
pub mod finalizer;
pub mod setter;

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::warn;

use crate::element::{MemberKind, ReaderRelation, ReaderWay};
use crate::encoder::TagRejection;
use crate::graph::{EdgeId, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RestrictionType {
    No,
    Only,
}

/// Why a single restriction was dropped; never fatal for the read
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RestrictionError {
    #[error("relation has no {0} member")]
    MissingMember(&'static str),

    #[error("via members mix nodes and ways")]
    MixedVia,

    #[error("more than one via node")]
    MultipleViaNodes,

    #[error("via-way restriction needs at least 3 ways, got {0}")]
    TooFewWays(usize),

    #[error("via-way restriction with several from or to ways")]
    MultipleFromOrTo,

    #[error("way {0} of the restriction was never seen")]
    MissingWayBody(i64),

    #[error("via way {way} has {towers} tower nodes, expected 2")]
    TowerEndpoints { way: i64, towers: usize },

    #[error("ways {from} and {to} share no end node")]
    NoSharedViaNode { from: i64, to: i64 },

    #[error("via ways do not form a chain")]
    BrokenChain,

    #[error(transparent)]
    Tags(#[from] TagRejection),

    #[error("via node {0} is not a graph node")]
    UnknownViaNode(i64),

    #[error("no edge of way {way} touches via node {node}")]
    UnresolvedEdges { way: i64, node: i64 },

    #[error("via way {way} was split into {edges} edges")]
    MultiSegmentVia { way: i64, edges: usize },
}

impl RestrictionError {
    /// Short stable key used in the counters
    pub fn reason(&self) -> &'static str {
        match self {
            RestrictionError::MissingMember(_) => "missing_member",
            RestrictionError::MixedVia => "mixed_via",
            RestrictionError::MultipleViaNodes => "multiple_via_nodes",
            RestrictionError::TooFewWays(_) => "too_few_ways",
            RestrictionError::MultipleFromOrTo => "multiple_from_or_to",
            RestrictionError::MissingWayBody(_) => "missing_way",
            RestrictionError::TowerEndpoints { .. } => "tower_endpoints",
            RestrictionError::NoSharedViaNode { .. } => "no_shared_via_node",
            RestrictionError::BrokenChain => "broken_chain",
            RestrictionError::Tags(_) => "tag_rejection",
            RestrictionError::UnknownViaNode(_) => "unknown_via_node",
            RestrictionError::UnresolvedEdges { .. } => "unresolved_edges",
            RestrictionError::MultiSegmentVia { .. } => "multi_segment_via",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Via {
    Node(i64),
    /// Via ways in member order, not necessarily chained
    Ways(Vec<i64>),
}

/// Member roles of a `type=restriction` relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsmTurnRestriction {
    pub relation_id: i64,
    pub from: Vec<i64>,
    pub via: Via,
    pub to: Vec<i64>,
}

impl OsmTurnRestriction {
    pub fn from_relation(relation: &ReaderRelation) -> Result<Self, RestrictionError> {
        let mut from = Vec::new();
        let mut to = Vec::new();
        let mut via_nodes = Vec::new();
        let mut via_ways = Vec::new();

        for member in &relation.members {
            match (member.role.as_str(), member.kind) {
                ("from", MemberKind::Way) => from.push(member.ref_id),
                ("to", MemberKind::Way) => to.push(member.ref_id),
                ("via", MemberKind::Node) => via_nodes.push(member.ref_id),
                ("via", MemberKind::Way) => via_ways.push(member.ref_id),
                // location_hint and friends
                _ => {}
            }
        }

        if from.is_empty() {
            return Err(RestrictionError::MissingMember("from"));
        }
        if to.is_empty() {
            return Err(RestrictionError::MissingMember("to"));
        }

        let via = match (via_nodes.len(), via_ways.is_empty()) {
            (0, true) => return Err(RestrictionError::MissingMember("via")),
            (1, true) => Via::Node(via_nodes[0]),
            (0, false) => Via::Ways(via_ways),
            (_, true) => return Err(RestrictionError::MultipleViaNodes),
            (_, false) => return Err(RestrictionError::MixedVia),
        };

        Ok(Self {
            relation_id: relation.id,
            from,
            via,
            to,
        })
    }

    pub fn is_via_way(&self) -> bool {
        matches!(self.via, Via::Ways(_))
    }

    /// Every way id the restriction references
    pub fn way_ids(&self) -> impl Iterator<Item = i64> + '_ {
        let via: &[i64] = match &self.via {
            Via::Ways(ways) => ways,
            Via::Node(_) => &[],
        };
        self.from.iter().chain(via).chain(&self.to).copied()
    }
}

/// Way reference in a hop; artificial copies live in their own namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WayRef {
    Osm(i64),
    Artificial(u32),
}

/// One node-local hop: turning from `from` onto `to` at OSM node `via`.
/// Every hop carries the type of its relation, see [`setter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRestriction {
    pub from: WayRef,
    pub via: i64,
    pub to: WayRef,
}

/// A via-way restriction: from way, one or more via ways, to way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WayRestriction {
    pub relation_id: i64,
    pub from: i64,
    pub via: Vec<i64>,
    pub to: i64,
    pub kind: RestrictionType,
}

impl WayRestriction {
    pub fn new(
        restriction: &OsmTurnRestriction,
        kind: RestrictionType,
    ) -> Result<Self, RestrictionError> {
        let Via::Ways(via) = &restriction.via else {
            return Err(RestrictionError::MixedVia);
        };
        let count = restriction.from.len() + via.len() + restriction.to.len();
        if count < 3 {
            return Err(RestrictionError::TooFewWays(count));
        }
        if restriction.from.len() != 1 || restriction.to.len() != 1 {
            return Err(RestrictionError::MultipleFromOrTo);
        }
        Ok(Self {
            relation_id: restriction.relation_id,
            from: restriction.from[0],
            via: via.clone(),
            to: restriction.to[0],
            kind,
        })
    }

    pub fn ways(&self) -> impl Iterator<Item = i64> + '_ {
        std::iter::once(self.from)
            .chain(self.via.iter().copied())
            .chain(std::iter::once(self.to))
    }
}

/// A restriction waiting for its edges
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRestriction {
    pub restriction: OsmTurnRestriction,
    pub kind: RestrictionType,
}

/// A restriction in graph ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRestriction {
    pub relation_id: i64,
    pub kind: RestrictionType,
    pub from_edges: Vec<EdgeId>,
    /// One node for via-node restrictions, k+1 nodes for k via edges
    pub via_nodes: Vec<NodeId>,
    pub via_edges: Vec<EdgeId>,
    pub to_edges: Vec<EdgeId>,
}

impl GraphRestriction {
    pub fn is_via_way(&self) -> bool {
        !self.via_edges.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RestrictionStats {
    pub restriction_relations: u64,
    pub via_node: u64,
    pub via_way: u64,
    /// Restrictions that do not apply to the vehicle
    pub not_applicable: u64,
    pub invalid: BTreeMap<&'static str, u64>,
    pub hops: u64,
    pub applied: u64,
    pub artificial_edges: u64,
    pub turn_cost_entries: u64,
}

impl RestrictionStats {
    pub fn invalid_total(&self) -> u64 {
        self.invalid.values().sum()
    }
}

/// Restriction tables shared by the passes
#[derive(Debug, Default)]
pub struct RestrictionData {
    /// Ways referenced by any restriction; their edges are recorded
    pub way_ids: FxHashSet<i64>,
    pub way_edges: FxHashMap<i64, Vec<EdgeId>>,
    /// Chain way bodies, `None` until seen in pass 1
    pub way_bodies: FxHashMap<i64, Option<ReaderWay>>,
    pub pending: FxHashMap<i64, PendingRestriction>,
    pub way_restrictions: Vec<WayRestriction>,
    /// Hop chains of valid via-way restrictions, by relation id
    pub hops: FxHashMap<i64, Vec<NodeRestriction>>,
    artificial_ways: Vec<i64>,
    artificial_by_way: FxHashMap<i64, u32>,
    pub resolved: Vec<GraphRestriction>,
    pub stats: RestrictionStats,
}

impl RestrictionData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Artificial copy of a via way, created once per way
    pub fn artificial_way(&mut self, way_id: i64) -> WayRef {
        if let Some(&id) = self.artificial_by_way.get(&way_id) {
            return WayRef::Artificial(id);
        }
        let id = self.artificial_ways.len() as u32;
        self.artificial_ways.push(way_id);
        self.artificial_by_way.insert(way_id, id);
        WayRef::Artificial(id)
    }

    /// The OSM way an artificial copy was made from
    pub fn source_way(&self, way: WayRef) -> Option<i64> {
        match way {
            WayRef::Osm(id) => Some(id),
            WayRef::Artificial(id) => self.artificial_ways.get(id as usize).copied(),
        }
    }

    pub fn artificial_way_count(&self) -> usize {
        self.artificial_ways.len()
    }

    /// Remember a chain way so pass 1 captures its body
    pub fn want_way_body(&mut self, way_id: i64) {
        self.way_bodies.entry(way_id).or_insert(None);
    }

    pub fn record_edge(&mut self, way_id: i64, edge: EdgeId) {
        if self.way_ids.contains(&way_id) {
            self.way_edges.entry(way_id).or_default().push(edge);
        }
    }

    pub fn reject(&mut self, relation_id: i64, error: &RestrictionError) {
        warn!(
            relation = relation_id,
            reason = error.reason(),
            "discarding turn restriction: {error}"
        );
        *self.stats.invalid.entry(error.reason()).or_default() += 1;
    }

    /// Drop everything once the turn costs are written
    pub fn release(&mut self) {
        let stats = std::mem::take(&mut self.stats);
        *self = Self {
            stats,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Member, Tags};

    fn relation(members: &[(&str, MemberKind, i64)]) -> ReaderRelation {
        ReaderRelation {
            id: 77,
            members: members
                .iter()
                .map(|&(role, kind, ref_id)| Member {
                    role: role.to_string(),
                    kind,
                    ref_id,
                })
                .collect(),
            tags: Tags::new(),
        }
    }

    #[test]
    fn test_decode_via_node() {
        let r = OsmTurnRestriction::from_relation(&relation(&[
            ("from", MemberKind::Way, 1),
            ("via", MemberKind::Node, 3),
            ("to", MemberKind::Way, 2),
        ]))
        .unwrap();
        assert_eq!(r.via, Via::Node(3));
        assert!(!r.is_via_way());
        assert_eq!(r.way_ids().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_decode_via_ways() {
        let r = OsmTurnRestriction::from_relation(&relation(&[
            ("via", MemberKind::Way, 20),
            ("from", MemberKind::Way, 10),
            ("via", MemberKind::Way, 21),
            ("to", MemberKind::Way, 30),
        ]))
        .unwrap();
        assert_eq!(r.via, Via::Ways(vec![20, 21]));
        assert_eq!(r.way_ids().collect::<Vec<_>>(), vec![10, 20, 21, 30]);

        let w = WayRestriction::new(&r, RestrictionType::No).unwrap();
        assert_eq!(w.ways().collect::<Vec<_>>(), vec![10, 20, 21, 30]);
    }

    #[test]
    fn test_decode_errors() {
        let missing_to = relation(&[("from", MemberKind::Way, 1), ("via", MemberKind::Node, 3)]);
        assert_eq!(
            OsmTurnRestriction::from_relation(&missing_to),
            Err(RestrictionError::MissingMember("to"))
        );

        let mixed = relation(&[
            ("from", MemberKind::Way, 1),
            ("via", MemberKind::Node, 3),
            ("via", MemberKind::Way, 4),
            ("to", MemberKind::Way, 2),
        ]);
        assert_eq!(OsmTurnRestriction::from_relation(&mixed), Err(RestrictionError::MixedVia));
    }

    #[test]
    fn test_multiple_from_rejected_for_via_way() {
        let r = OsmTurnRestriction::from_relation(&relation(&[
            ("from", MemberKind::Way, 1),
            ("from", MemberKind::Way, 2),
            ("via", MemberKind::Way, 3),
            ("to", MemberKind::Way, 4),
        ]))
        .unwrap();
        assert_eq!(
            WayRestriction::new(&r, RestrictionType::No),
            Err(RestrictionError::MultipleFromOrTo)
        );
    }

    #[test]
    fn test_artificial_way_is_idempotent() {
        let mut data = RestrictionData::new();
        let a = data.artificial_way(20);
        let b = data.artificial_way(21);
        assert_eq!(data.artificial_way(20), a);
        assert_ne!(a, b);
        assert_eq!(data.source_way(a), Some(20));
        assert_eq!(data.source_way(WayRef::Osm(5)), Some(5));
        assert_eq!(data.artificial_way_count(), 2);
    }

    #[test]
    fn test_reject_counts_by_reason() {
        let mut data = RestrictionData::new();
        data.reject(1, &RestrictionError::BrokenChain);
        data.reject(2, &RestrictionError::BrokenChain);
        data.reject(3, &RestrictionError::MixedVia);
        assert_eq!(data.stats.invalid.get("broken_chain"), Some(&2));
        assert_eq!(data.stats.invalid_total(), 3);

        data.release();
        assert_eq!(data.stats.invalid_total(), 3);
        assert!(data.pending.is_empty());
    }
}
