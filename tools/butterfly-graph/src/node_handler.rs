//! Pass 2: node coordinates and barriers

use butterfly_common::Result;
use tracing::{debug, info};

use crate::context::ReadContext;
use crate::dispatch::{log_every, ElementHandler};
use crate::element::{Element, ElementKind, ReaderNode};
use crate::geometry::GeoPoint;
use crate::graph::GraphStorage;
use crate::node_roles::{BarrierOutcome, NodeRole};

/// `barrier=*` and `ford=*` split ways
pub fn is_barrier_node(node: &ReaderNode) -> bool {
    node.tags.has("barrier") || node.tags.has("ford")
}

#[derive(Debug, Default)]
pub struct NodeHandler {
    counter: u64,
}

impl NodeHandler {
    fn handle_node<G: GraphStorage>(&mut self, ctx: &mut ReadContext<'_, G>, node: &ReaderNode) {
        if ctx.nodes.role(node.id) == NodeRole::Unseen {
            return;
        }
        ctx.stats.nodes_accepted += 1;

        if is_barrier_node(node) {
            match ctx.nodes.mark_barrier(node.id) {
                BarrierOutcome::Split => ctx.stats.barriers_split += 1,
                BarrierOutcome::IgnoredAtJunction => {
                    debug!(
                        node = node.id,
                        lat = node.lat,
                        lon = node.lon,
                        "barrier node at a junction, the barrier will be ignored"
                    );
                    ctx.stats.barriers_ignored_at_junction += 1;
                }
                BarrierOutcome::Marked | BarrierOutcome::NotMapped => {}
            }
        }

        let ele = ctx.elevation.elevation(node.lat, node.lon);
        let point = GeoPoint::with_ele(node.lat, node.lon, ele);
        if ctx.nodes.is_tower(node.id) {
            // duplicate node elements keep their first vertex
            if ctx.nodes.tower_id(node.id).is_none() {
                let id = ctx.graph.add_node(point);
                ctx.nodes.set_tower_id(node.id, id);
                ctx.stats.tower_nodes += 1;
            }
        } else {
            ctx.nodes.set_pillar_point(node.id, point);
        }
    }
}

impl<G: GraphStorage> ElementHandler<ReadContext<'_, G>> for NodeHandler {
    fn on_start(&mut self, _ctx: &mut ReadContext<'_, G>) -> Result<()> {
        info!("pass2 - start reading OSM nodes");
        Ok(())
    }

    fn handle(&mut self, ctx: &mut ReadContext<'_, G>, element: Element) -> Result<()> {
        if let Element::Node(node) = element {
            self.counter += 1;
            ctx.stats.nodes_read += 1;
            log_every(ElementKind::Node, self.counter, ctx.config.log_every);
            self.handle_node(ctx, &node);
        }
        Ok(())
    }

    fn on_finish(&mut self, ctx: &mut ReadContext<'_, G>) -> Result<()> {
        info!(
            way_nodes = ctx.stats.nodes_accepted,
            towers = ctx.stats.tower_nodes,
            barriers_split = ctx.stats.barriers_split,
            ignored_barriers = ctx.stats.barriers_ignored_at_junction,
            "pass2 - finished reading OSM nodes"
        );
        Ok(())
    }
}
