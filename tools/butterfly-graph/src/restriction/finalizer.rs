//! Pass 2: Relation Finalizer
//!
//! Resolves the restrictions parked in pass 0 into edge and node ids once
//! every way has been segmented, then hands the whole batch to the
//! [`RestrictionSetter`](super::setter::RestrictionSetter) when the relation
//! phase ends.

use butterfly_common::Result;
use tracing::info;

use super::{GraphRestriction, PendingRestriction, RestrictionError, Via, WayRef};
use crate::context::ReadContext;
use crate::dispatch::{log_every, ElementHandler};
use crate::element::{Element, ElementKind};
use crate::graph::{EdgeId, GraphStorage, NodeId};

#[derive(Debug, Default)]
pub struct RelationFinalizer {
    counter: u64,
}

/// Edges of a restriction way that end at the given tower node
fn edges_at_node<G: GraphStorage>(
    ctx: &ReadContext<'_, G>,
    way: i64,
    node: NodeId,
) -> Vec<EdgeId> {
    ctx.restrictions
        .way_edges
        .get(&way)
        .map(|edges| {
            edges
                .iter()
                .copied()
                .filter(|&e| ctx.graph.edge(e).is_some_and(|r| r.touches(node)))
                .collect()
        })
        .unwrap_or_default()
}

fn tower<G: GraphStorage>(
    ctx: &ReadContext<'_, G>,
    osm_node: i64,
) -> std::result::Result<NodeId, RestrictionError> {
    ctx.nodes
        .tower_id(osm_node)
        .ok_or(RestrictionError::UnknownViaNode(osm_node))
}

fn edges_for<G: GraphStorage>(
    ctx: &ReadContext<'_, G>,
    ways: &[i64],
    osm_node: i64,
    node: NodeId,
) -> std::result::Result<Vec<EdgeId>, RestrictionError> {
    let edges: Vec<EdgeId> = ways.iter().flat_map(|&w| edges_at_node(ctx, w, node)).collect();
    match (edges.is_empty(), ways.first()) {
        (true, Some(&way)) => Err(RestrictionError::UnresolvedEdges { way, node: osm_node }),
        _ => Ok(edges),
    }
}

/// Resolve one parked restriction; `Ok(None)` when the builder already dropped it
pub fn resolve<G: GraphStorage>(
    ctx: &ReadContext<'_, G>,
    pending: &PendingRestriction,
) -> std::result::Result<Option<GraphRestriction>, RestrictionError> {
    let restriction = &pending.restriction;
    match &restriction.via {
        Via::Node(osm_via) => {
            let via = tower(ctx, *osm_via)?;
            Ok(Some(GraphRestriction {
                relation_id: restriction.relation_id,
                kind: pending.kind,
                from_edges: edges_for(ctx, &restriction.from, *osm_via, via)?,
                via_nodes: vec![via],
                via_edges: Vec::new(),
                to_edges: edges_for(ctx, &restriction.to, *osm_via, via)?,
            }))
        }
        Via::Ways(_) => {
            let Some(hops) = ctx.restrictions.hops.get(&restriction.relation_id) else {
                return Ok(None);
            };
            let (Some(first), Some(last)) = (hops.first(), hops.last()) else {
                return Ok(None);
            };

            let via_nodes = hops
                .iter()
                .map(|h| tower(ctx, h.via))
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut via_edges = Vec::with_capacity(hops.len() - 1);
            for (i, hop) in hops[..hops.len() - 1].iter().enumerate() {
                let way = ctx
                    .restrictions
                    .source_way(hop.to)
                    .ok_or(RestrictionError::BrokenChain)?;
                let all = ctx.restrictions.way_edges.get(&way).map_or(0, Vec::len);
                if all != 1 {
                    return Err(RestrictionError::MultiSegmentVia { way, edges: all });
                }
                let edges = edges_at_node(ctx, way, via_nodes[i]);
                let Some(&edge) = edges.first() else {
                    return Err(RestrictionError::UnresolvedEdges { way, node: hop.via });
                };
                via_edges.push(edge);
            }

            let osm_way = |w: WayRef| {
                ctx.restrictions
                    .source_way(w)
                    .ok_or(RestrictionError::BrokenChain)
            };
            let from = osm_way(first.from)?;
            let to = osm_way(last.to)?;
            let from_edges = edges_for(ctx, &[from], first.via, via_nodes[0])?;
            let to_edges = edges_for(ctx, &[to], last.via, via_nodes[via_nodes.len() - 1])?;
            Ok(Some(GraphRestriction {
                relation_id: restriction.relation_id,
                kind: pending.kind,
                from_edges,
                via_nodes,
                via_edges,
                to_edges,
            }))
        }
    }
}

impl<G: GraphStorage> ElementHandler<ReadContext<'_, G>> for RelationFinalizer {
    fn on_start(&mut self, _ctx: &mut ReadContext<'_, G>) -> Result<()> {
        info!("pass2 - start reading OSM relations");
        Ok(())
    }

    fn handle(&mut self, ctx: &mut ReadContext<'_, G>, element: Element) -> Result<()> {
        if let Element::Relation(relation) = element {
            self.counter += 1;
            log_every(ElementKind::Relation, self.counter, ctx.config.log_every);
            if let Some(pending) = ctx.restrictions.pending.remove(&relation.id) {
                match resolve(ctx, &pending) {
                    Ok(Some(resolved)) => ctx.restrictions.resolved.push(resolved),
                    Ok(None) => {}
                    Err(e) => ctx.restrictions.reject(relation.id, &e),
                }
            }
        }
        Ok(())
    }

    fn on_finish(&mut self, ctx: &mut ReadContext<'_, G>) -> Result<()> {
        let resolved = std::mem::take(&mut ctx.restrictions.resolved);
        let summary = ctx.setter.set_restrictions(&mut *ctx.graph, &resolved);

        let stats = &mut ctx.restrictions.stats;
        stats.applied += summary.applied;
        stats.artificial_edges += summary.artificial_edges;
        stats.turn_cost_entries += summary.turn_cost_entries;
        if summary.skipped > 0 {
            *stats.invalid.entry("unsupported_via_way").or_default() += summary.skipped;
        }

        ctx.restrictions.release();
        info!(relations = self.counter, "pass2 - finished reading OSM relations");
        Ok(())
    }
}
