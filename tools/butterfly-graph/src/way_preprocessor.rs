//! Pass 1: node role classification from way membership

use butterfly_common::Result;
use tracing::info;

use crate::context::ReadContext;
use crate::dispatch::{log_every, ElementHandler};
use crate::element::{Element, ElementKind, ReaderWay};
use crate::graph::GraphStorage;

#[derive(Debug, Default)]
pub struct WayPreprocessor {
    counter: u64,
}

impl WayPreprocessor {
    fn preprocess<G: GraphStorage>(&mut self, ctx: &mut ReadContext<'_, G>, way: ReaderWay) {
        ctx.stats.ways_processed += 1;
        if !ctx.encoder.accept_way(&way) {
            return;
        }
        ctx.stats.ways_accepted += 1;

        let closed = way.is_closed();
        let last = way.nodes.len() - 1;
        for (i, &node) in way.nodes.iter().enumerate() {
            let is_end = i == 0 || i == last;
            if closed && is_end {
                continue;
            }
            ctx.nodes.record_way_node(node, is_end);
        }
        if closed {
            ctx.stats.closed_ways += 1;
            ctx.nodes.mark_junction(way.nodes[0]);
        }

        if let Some(slot) = ctx.restrictions.way_bodies.get_mut(&way.id) {
            *slot = Some(way);
        }
    }
}

impl<G: GraphStorage> ElementHandler<ReadContext<'_, G>> for WayPreprocessor {
    fn on_start(&mut self, _ctx: &mut ReadContext<'_, G>) -> Result<()> {
        info!("pass1 - start reading OSM ways");
        Ok(())
    }

    fn handle(&mut self, ctx: &mut ReadContext<'_, G>, element: Element) -> Result<()> {
        if let Element::Way(way) = element {
            self.counter += 1;
            log_every(ElementKind::Way, self.counter, ctx.config.log_every);
            if !way.nodes.is_empty() {
                self.preprocess(ctx, way);
            }
        }
        Ok(())
    }

    fn on_finish(&mut self, ctx: &mut ReadContext<'_, G>) -> Result<()> {
        ctx.stats.way_nodes = ctx.nodes.node_count() as u64;
        info!(
            processed = ctx.stats.ways_processed,
            accepted = ctx.stats.ways_accepted,
            way_nodes = ctx.stats.way_nodes,
            "pass1 - finished reading OSM ways"
        );
        Ok(())
    }
}
