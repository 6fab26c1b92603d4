//! Node Role Store
//!
//! Every OSM node referenced by an accepted way gets a slot in a dense role
//! table, assigned lazily on first sight. Roles only ever move up:
//!
//! ```text
//! Unseen -> Pillar ----------------------------> Junction
//!        \        \-> BarrierSplit (barrier tag)
//!         -> End -> Connection (second end of another way) -> Junction
//! ```
//!
//! Tower nodes (End, Junction, Connection, BarrierSplit) become graph
//! vertices and keep a graph node id. Pillar nodes only keep their
//! coordinate until the way that owns them is segmented.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::geometry::GeoPoint;
use crate::graph::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeRole {
    Unseen = 0,
    Pillar,
    End,
    Junction,
    Connection,
    BarrierSplit,
}

impl NodeRole {
    pub fn is_tower(self) -> bool {
        matches!(
            self,
            NodeRole::End | NodeRole::Junction | NodeRole::Connection | NodeRole::BarrierSplit
        )
    }
}

/// What happened to a node carrying a barrier tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierOutcome {
    /// The node is not used by any accepted way
    NotMapped,
    /// A pillar became a tower so the way is split at the barrier
    Split,
    /// Already a tower; the barrier is recorded on it
    Marked,
    /// Barriers on junctions are dropped
    IgnoredAtJunction,
}

const NO_TOWER: NodeId = NodeId::MAX;

#[derive(Debug, Default)]
pub struct NodeRoleStore {
    slots: FxHashMap<i64, u32>,
    roles: Vec<NodeRole>,
    tower_ids: Vec<NodeId>,
    pillar_points: FxHashMap<u32, GeoPoint>,
    barriers: FxHashSet<u32>,
    released: bool,
}

impl NodeRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the tables for roughly `expected` distinct way nodes
    pub fn with_capacity(expected: usize) -> Self {
        let mut slots = FxHashMap::default();
        slots.reserve(expected);
        Self {
            slots,
            roles: Vec::with_capacity(expected),
            tower_ids: Vec::with_capacity(expected),
            ..Self::default()
        }
    }

    fn slot(&self, osm_id: i64) -> Option<usize> {
        self.slots.get(&osm_id).map(|&s| s as usize)
    }

    fn slot_or_insert(&mut self, osm_id: i64) -> usize {
        if let Some(slot) = self.slot(osm_id) {
            return slot;
        }
        let slot = self.roles.len();
        self.slots.insert(osm_id, slot as u32);
        self.roles.push(NodeRole::Unseen);
        self.tower_ids.push(NO_TOWER);
        slot
    }

    /// Record one reference of a node by an accepted way and promote its role
    pub fn record_way_node(&mut self, osm_id: i64, is_end: bool) -> NodeRole {
        let slot = self.slot_or_insert(osm_id);
        let role = &mut self.roles[slot];
        *role = match *role {
            NodeRole::Unseen if is_end => NodeRole::End,
            NodeRole::Unseen => NodeRole::Pillar,
            NodeRole::End if is_end => NodeRole::Connection,
            _ => NodeRole::Junction,
        };
        *role
    }

    /// Force a node to junction, as for the shared first/last node of a closed way
    pub fn mark_junction(&mut self, osm_id: i64) {
        let slot = self.slot_or_insert(osm_id);
        self.roles[slot] = NodeRole::Junction;
    }

    pub fn role(&self, osm_id: i64) -> NodeRole {
        self.slot(osm_id)
            .map(|s| self.roles[s])
            .unwrap_or(NodeRole::Unseen)
    }

    pub fn is_tower(&self, osm_id: i64) -> bool {
        self.role(osm_id).is_tower()
    }

    pub fn mark_barrier(&mut self, osm_id: i64) -> BarrierOutcome {
        let Some(slot) = self.slot(osm_id) else {
            return BarrierOutcome::NotMapped;
        };
        match self.roles[slot] {
            NodeRole::Unseen => BarrierOutcome::NotMapped,
            NodeRole::Junction => BarrierOutcome::IgnoredAtJunction,
            NodeRole::Pillar => {
                self.roles[slot] = NodeRole::BarrierSplit;
                self.barriers.insert(slot as u32);
                BarrierOutcome::Split
            }
            NodeRole::End | NodeRole::Connection | NodeRole::BarrierSplit => {
                self.barriers.insert(slot as u32);
                BarrierOutcome::Marked
            }
        }
    }

    pub fn is_barrier(&self, osm_id: i64) -> bool {
        self.slot(osm_id)
            .is_some_and(|s| self.barriers.contains(&(s as u32)))
    }

    pub fn set_tower_id(&mut self, osm_id: i64, node: NodeId) {
        if let Some(slot) = self.slot(osm_id) {
            self.tower_ids[slot] = node;
        }
    }

    pub fn tower_id(&self, osm_id: i64) -> Option<NodeId> {
        self.slot(osm_id)
            .map(|s| self.tower_ids[s])
            .filter(|&id| id != NO_TOWER)
    }

    pub fn set_pillar_point(&mut self, osm_id: i64, point: GeoPoint) {
        if let Some(slot) = self.slot(osm_id) {
            self.pillar_points.insert(slot as u32, point);
        }
    }

    /// Hand out a pillar coordinate once; the store forgets it afterwards
    pub fn take_pillar_point(&mut self, osm_id: i64) -> Option<GeoPoint> {
        let slot = self.slot(osm_id)?;
        self.pillar_points.remove(&(slot as u32))
    }

    pub fn pending_pillar_points(&self) -> usize {
        self.pillar_points.len()
    }

    /// Distinct nodes referenced by accepted ways
    pub fn node_count(&self) -> usize {
        self.roles.len()
    }

    pub fn tower_count(&self) -> usize {
        self.roles.iter().filter(|r| r.is_tower()).count()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Drop every table once the graph is built
    pub fn release(&mut self) {
        self.slots = FxHashMap::default();
        self.roles = Vec::new();
        self.tower_ids = Vec::new();
        self.pillar_points = FxHashMap::default();
        self.barriers = FxHashSet::default();
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interior_node_is_pillar() {
        let mut store = NodeRoleStore::new();
        store.record_way_node(1, true);
        assert_eq!(store.record_way_node(2, false), NodeRole::Pillar);
        store.record_way_node(3, true);
        assert!(!store.is_tower(2));
        assert!(store.is_tower(1));
        assert_eq!(store.tower_count(), 2);
    }

    #[test]
    fn test_two_ends_make_connection() {
        let mut store = NodeRoleStore::new();
        store.record_way_node(5, true);
        assert_eq!(store.record_way_node(5, true), NodeRole::Connection);
        // a third way turns it into a junction
        assert_eq!(store.record_way_node(5, true), NodeRole::Junction);
    }

    #[test]
    fn test_end_and_interior_make_junction() {
        let mut store = NodeRoleStore::new();
        store.record_way_node(7, false);
        assert_eq!(store.record_way_node(7, true), NodeRole::Junction);

        store.record_way_node(8, true);
        assert_eq!(store.record_way_node(8, false), NodeRole::Junction);
    }

    #[test]
    fn test_barrier_outcomes() {
        let mut store = NodeRoleStore::new();
        store.record_way_node(1, true);
        store.record_way_node(2, false);
        store.record_way_node(3, false);
        store.record_way_node(3, false);

        assert_eq!(store.mark_barrier(2), BarrierOutcome::Split);
        assert_eq!(store.role(2), NodeRole::BarrierSplit);
        assert_eq!(store.mark_barrier(1), BarrierOutcome::Marked);
        assert_eq!(store.role(1), NodeRole::End);
        assert_eq!(store.mark_barrier(3), BarrierOutcome::IgnoredAtJunction);
        assert!(!store.is_barrier(3));
        assert_eq!(store.mark_barrier(99), BarrierOutcome::NotMapped);
    }

    #[test]
    fn test_pillar_point_is_taken_once() {
        let mut store = NodeRoleStore::with_capacity(4);
        store.record_way_node(2, false);
        store.set_pillar_point(2, GeoPoint::new(1.0, 2.0));
        assert_eq!(store.pending_pillar_points(), 1);
        assert!(store.take_pillar_point(2).is_some());
        assert!(store.take_pillar_point(2).is_none());
        assert_eq!(store.pending_pillar_points(), 0);
    }

    #[test]
    fn test_release_forgets_everything() {
        let mut store = NodeRoleStore::new();
        store.record_way_node(1, true);
        store.set_tower_id(1, 0);
        assert_eq!(store.tower_id(1), Some(0));
        store.release();
        assert!(store.is_released());
        assert_eq!(store.role(1), NodeRole::Unseen);
        assert_eq!(store.tower_id(1), None);
        assert_eq!(store.node_count(), 0);
    }
}
