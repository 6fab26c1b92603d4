//! Graph storage interface and the in-memory reference graph

use rustc_hash::FxHashMap;

use crate::encoder::EdgeFlags;
use crate::geometry::GeoPoint;

pub type NodeId = u32;
pub type EdgeId = u32;

/// One stored edge; `geometry` holds the pillar points between base and adj
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub base: NodeId,
    pub adj: NodeId,
    pub geometry: Vec<GeoPoint>,
    pub distance: f64,
    pub flags: EdgeFlags,
    /// Source OSM way
    pub way_id: i64,
    /// Duplicate created for a via-way restriction
    pub artificial: bool,
}

impl EdgeRecord {
    pub fn touches(&self, node: NodeId) -> bool {
        self.base == node || self.adj == node
    }
}

/// Directed turn costs keyed by (from edge, via node, to edge).
///
/// Missing entries cost 0; `f64::INFINITY` means the turn is forbidden.
#[derive(Debug, Default, Clone)]
pub struct TurnCostTable {
    entries: FxHashMap<(EdgeId, NodeId, EdgeId), f64>,
}

impl TurnCostTable {
    pub fn set(&mut self, from: EdgeId, via: NodeId, to: EdgeId, cost: f64) {
        self.entries.insert((from, via, to), cost);
    }

    pub fn get(&self, from: EdgeId, via: NodeId, to: EdgeId) -> f64 {
        self.entries.get(&(from, via, to)).copied().unwrap_or(0.0)
    }

    pub fn is_forbidden(&self, from: EdgeId, via: NodeId, to: EdgeId) -> bool {
        self.get(from, via, to).is_infinite()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What the reader needs from a graph
pub trait GraphStorage {
    fn add_node(&mut self, point: GeoPoint) -> NodeId;

    fn node_count(&self) -> usize;

    fn node_point(&self, node: NodeId) -> Option<GeoPoint>;

    fn add_edge(&mut self, edge: EdgeRecord) -> EdgeId;

    fn edge_count(&self) -> usize;

    fn edge(&self, edge: EdgeId) -> Option<&EdgeRecord>;

    /// All edges incident to a node, in insertion order
    fn edges_at(&self, node: NodeId) -> Vec<EdgeId>;

    fn turn_costs(&self) -> &TurnCostTable;

    fn turn_costs_mut(&mut self) -> &mut TurnCostTable;
}

/// In-memory adjacency-list graph
#[derive(Debug, Default)]
pub struct BaseGraph {
    points: Vec<GeoPoint>,
    edges: Vec<EdgeRecord>,
    adjacency: Vec<Vec<EdgeId>>,
    turn_costs: TurnCostTable,
}

impl BaseGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &EdgeRecord)> {
        self.edges.iter().enumerate().map(|(i, e)| (i as EdgeId, e))
    }

    /// Edges created from the given OSM way, artificial copies included
    pub fn edges_of_way(&self, way_id: i64) -> Vec<EdgeId> {
        self.edges()
            .filter(|(_, e)| e.way_id == way_id)
            .map(|(id, _)| id)
            .collect()
    }
}

impl GraphStorage for BaseGraph {
    fn add_node(&mut self, point: GeoPoint) -> NodeId {
        let id = self.points.len() as NodeId;
        self.points.push(point);
        self.adjacency.push(Vec::new());
        id
    }

    fn node_count(&self) -> usize {
        self.points.len()
    }

    fn node_point(&self, node: NodeId) -> Option<GeoPoint> {
        self.points.get(node as usize).copied()
    }

    fn add_edge(&mut self, edge: EdgeRecord) -> EdgeId {
        let id = self.edges.len() as EdgeId;
        if let Some(adj) = self.adjacency.get_mut(edge.base as usize) {
            adj.push(id);
        }
        if edge.adj != edge.base {
            if let Some(adj) = self.adjacency.get_mut(edge.adj as usize) {
                adj.push(id);
            }
        }
        self.edges.push(edge);
        id
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn edge(&self, edge: EdgeId) -> Option<&EdgeRecord> {
        self.edges.get(edge as usize)
    }

    fn edges_at(&self, node: NodeId) -> Vec<EdgeId> {
        self.adjacency
            .get(node as usize)
            .cloned()
            .unwrap_or_default()
    }

    fn turn_costs(&self) -> &TurnCostTable {
        &self.turn_costs
    }

    fn turn_costs_mut(&mut self) -> &mut TurnCostTable {
        &mut self.turn_costs
    }
}
