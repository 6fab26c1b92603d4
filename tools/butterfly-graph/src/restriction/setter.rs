//! Restriction Setter
//!
//! Writes resolved restrictions into the turn cost table of a finished graph.
//! Three phases, in this order:
//!
//! 1. create one artificial duplicate per distinct via edge (shared by every
//!    restriction using that via edge)
//! 2. via-way restrictions
//! 3. via-node restrictions, mirrored onto artificial duplicates
//!
//! Every entry written is a prohibition (`f64::INFINITY`). ONLY restrictions
//! are expressed as prohibitions of all the other turns.
//!
//! Every hop of a via-way chain applies the type of its relation. A NO hop
//! forbids the one designated turn, an ONLY hop forbids every other turn at
//! its via node. Inner hops start from the artificial copy of the previous
//! via edge, so an ONLY chain cannot be left at an inner via node.

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{GraphRestriction, RestrictionType};
use crate::graph::{EdgeId, GraphStorage, NodeId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SetterSummary {
    pub applied: u64,
    pub skipped: u64,
    pub artificial_edges: u64,
    pub turn_cost_entries: u64,
}

#[derive(Debug, Default)]
pub struct RestrictionSetter {
    artificial_by_edge: FxHashMap<EdgeId, EdgeId>,
}

impl RestrictionSetter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duplicate of `edge` with the same ends, geometry and flags.
    /// Created on first request; later requests return the same edge.
    pub fn artificial_edge<G: GraphStorage + ?Sized>(
        &mut self,
        graph: &mut G,
        edge: EdgeId,
    ) -> Option<EdgeId> {
        if let Some(&artificial) = self.artificial_by_edge.get(&edge) {
            return Some(artificial);
        }
        let mut copy = graph.edge(edge)?.clone();
        copy.artificial = true;
        let artificial = graph.add_edge(copy);
        self.artificial_by_edge.insert(edge, artificial);
        Some(artificial)
    }

    pub fn artificial_of(&self, edge: EdgeId) -> Option<EdgeId> {
        self.artificial_by_edge.get(&edge).copied()
    }

    fn artificial_or_self(&self, edge: EdgeId) -> EdgeId {
        self.artificial_of(edge).unwrap_or(edge)
    }

    pub fn set_restrictions<G: GraphStorage + ?Sized>(
        &mut self,
        graph: &mut G,
        restrictions: &[GraphRestriction],
    ) -> SetterSummary {
        let entries_before = graph.turn_costs().len();
        let artificial_before = self.artificial_by_edge.len();
        let mut summary = SetterSummary::default();

        // all artificial edges first: overlapping restrictions restrict turns
        // between artificial edges created for each other
        self.add_artificial_edges(graph, restrictions);

        for restriction in restrictions.iter().filter(|r| r.is_via_way()) {
            if self.add_via_way_restriction(graph, restriction) {
                summary.applied += 1;
            } else {
                summary.skipped += 1;
            }
        }
        for restriction in restrictions.iter().filter(|r| !r.is_via_way()) {
            if self.add_via_node_restriction(graph, restriction) {
                summary.applied += 1;
            } else {
                summary.skipped += 1;
            }
        }

        summary.artificial_edges = (self.artificial_by_edge.len() - artificial_before) as u64;
        summary.turn_cost_entries = (graph.turn_costs().len() - entries_before) as u64;
        info!(
            applied = summary.applied,
            skipped = summary.skipped,
            artificial_edges = summary.artificial_edges,
            turn_cost_entries = summary.turn_cost_entries,
            "turn restrictions written"
        );
        summary
    }

    /// Multiple from or to edges are not supported on via-way restrictions
    fn ignore_via_way(restriction: &GraphRestriction) -> bool {
        restriction.from_edges.len() != 1
            || restriction.to_edges.len() != 1
            || restriction.via_nodes.len() != restriction.via_edges.len() + 1
    }

    fn add_artificial_edges<G: GraphStorage + ?Sized>(
        &mut self,
        graph: &mut G,
        restrictions: &[GraphRestriction],
    ) {
        for restriction in restrictions.iter().filter(|r| r.is_via_way()) {
            if Self::ignore_via_way(restriction) {
                continue;
            }
            for &via_edge in &restriction.via_edges {
                if self.artificial_edge(graph, via_edge).is_none() {
                    warn!(
                        relation = restriction.relation_id,
                        edge = via_edge,
                        "via edge missing from graph"
                    );
                }
            }
        }
    }

    fn add_via_way_restriction<G: GraphStorage + ?Sized>(
        &self,
        graph: &mut G,
        r: &GraphRestriction,
    ) -> bool {
        if Self::ignore_via_way(r) {
            debug!(
                relation = r.relation_id,
                "skipping via-way restriction with several from/to edges"
            );
            return false;
        }
        let from = r.from_edges[0];
        let to = r.to_edges[0];
        let artificial_from = self.artificial_or_self(from);
        let artificial_to = self.artificial_or_self(to);
        let last = r.via_edges.len() - 1;

        for (i, &via_edge) in r.via_edges.iter().enumerate() {
            let entry = r.via_nodes[i];
            let exit = r.via_nodes[i + 1];
            let Some(artificial_via) = self.artificial_of(via_edge) else {
                warn!(relation = r.relation_id, edge = via_edge, "no artificial edge for via edge");
                return false;
            };

            // never turn between an artificial edge and its real edge
            restrict(graph, artificial_via, entry, via_edge);
            restrict(graph, via_edge, entry, artificial_via);
            restrict(graph, artificial_via, exit, via_edge);
            restrict(graph, via_edge, exit, artificial_via);

            if i == 0 {
                match r.kind {
                    RestrictionType::No => {
                        restrict(graph, from, entry, via_edge);
                        // an artificial from edge of an overlapping restriction
                        // is restricted the same way
                        if artificial_from != from {
                            restrict(graph, artificial_from, entry, artificial_via);
                        }
                    }
                    RestrictionType::Only => {
                        for edge in graph.edges_at(entry) {
                            if edge != from && edge != artificial_from && edge != artificial_via {
                                restrict(graph, from, entry, edge);
                            }
                        }
                    }
                }
            } else {
                // stay on the artificial copies inside the chain
                let Some(previous) = self.artificial_of(r.via_edges[i - 1]) else {
                    return false;
                };
                match r.kind {
                    RestrictionType::No => restrict(graph, previous, entry, via_edge),
                    RestrictionType::Only => {
                        for edge in graph.edges_at(entry) {
                            if edge != previous && edge != artificial_via {
                                restrict(graph, previous, entry, edge);
                            }
                        }
                    }
                }
            }

            if i == last {
                match r.kind {
                    RestrictionType::No => {
                        restrict(graph, artificial_via, exit, to);
                        if artificial_to != to {
                            restrict(graph, artificial_via, exit, artificial_to);
                        }
                    }
                    RestrictionType::Only => {
                        for edge in graph.edges_at(exit) {
                            if edge != artificial_via && edge != to && edge != artificial_to {
                                restrict(graph, artificial_via, exit, edge);
                            }
                        }
                    }
                }
            }
        }
        true
    }

    fn add_via_node_restriction<G: GraphStorage + ?Sized>(
        &self,
        graph: &mut G,
        r: &GraphRestriction,
    ) -> bool {
        let Some(&via) = r.via_nodes.first() else {
            return false;
        };
        for &from in &r.from_edges {
            for &to in &r.to_edges {
                let artificial_from = self.artificial_or_self(from);
                let artificial_to = self.artificial_or_self(to);
                match r.kind {
                    RestrictionType::No => {
                        restrict(graph, from, via, to);
                        // the same turn over artificial duplicates
                        if artificial_from != from {
                            restrict(graph, artificial_from, via, to);
                        }
                        if artificial_to != to {
                            restrict(graph, from, via, artificial_to);
                        }
                        if artificial_from != from && artificial_to != to {
                            restrict(graph, artificial_from, via, artificial_to);
                        }
                    }
                    RestrictionType::Only => {
                        // the u-turn back onto the from edge is left alone
                        for edge in graph.edges_at(via) {
                            if edge != from && edge != to && edge != artificial_to {
                                restrict(graph, from, via, edge);
                            }
                            if artificial_from != from
                                && edge != artificial_from
                                && edge != to
                                && edge != artificial_to
                            {
                                restrict(graph, artificial_from, via, edge);
                            }
                        }
                    }
                }
            }
        }
        true
    }
}

fn restrict<G: GraphStorage + ?Sized>(graph: &mut G, from: EdgeId, via: NodeId, to: EdgeId) {
    graph.turn_costs_mut().set(from, via, to, f64::INFINITY);
}
