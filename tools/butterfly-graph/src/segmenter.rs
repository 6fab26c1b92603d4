//! Pass 2: Way Segmenter
//!
//! Walks each accepted way once and cuts it into edges at tower nodes. Pillar
//! coordinates are pulled out of the role store as they are consumed. A node
//! without coordinates breaks the way: the current segment is dropped and
//! segmentation restarts at the next tower node.

use butterfly_common::Result;
use tracing::info;

use crate::area::merge_area_tags;
use crate::context::ReadContext;
use crate::dispatch::{log_every, ElementHandler};
use crate::element::{Element, ElementKind, ReaderWay};
use crate::encoder::{class_bits, EdgeFlags};
use crate::geometry::{path_length, GeoPoint, Simplifier};
use crate::graph::{EdgeRecord, GraphStorage, NodeId};

/// Segment start: tower node and its OSM id
#[derive(Debug, Clone, Copy)]
struct Anchor {
    node: NodeId,
    osm_id: i64,
}

#[derive(Debug)]
pub struct WaySegmenter {
    simplifier: Simplifier,
    counter: u64,
}

impl WaySegmenter {
    pub fn new(simplifier: Simplifier) -> Self {
        Self {
            simplifier,
            counter: 0,
        }
    }

    fn segment<G: GraphStorage>(&mut self, ctx: &mut ReadContext<'_, G>, way: &ReaderWay) {
        if !ctx.encoder.accept_way(way) {
            return;
        }

        let relation_flags = ctx.relation_flags.get(&way.id).copied().unwrap_or(0);
        let area_tags = way
            .nodes
            .first()
            .and_then(|&n| ctx.nodes.tower_id(n))
            .and_then(|t| ctx.graph.node_point(t))
            .map(|p| ctx.areas.query(&p))
            .unwrap_or_default();
        let flags = if area_tags.is_empty() {
            ctx.encoder.encode_way(&way.tags, relation_flags)
        } else {
            ctx.encoder
                .encode_way(&merge_area_tags(&way.tags, &area_tags), relation_flags)
        };

        let mut anchor: Option<Anchor> = None;
        let mut points: Vec<GeoPoint> = Vec::new();

        for &osm_id in &way.nodes {
            if let Some(tower) = ctx.nodes.tower_id(osm_id) {
                let Some(point) = ctx.graph.node_point(tower) else {
                    ctx.stats.missing_coordinates += 1;
                    anchor = None;
                    points.clear();
                    continue;
                };
                let end = Anchor {
                    node: tower,
                    osm_id,
                };
                if let Some(start) = anchor {
                    points.push(point);
                    self.emit(ctx, way.id, start, end, std::mem::take(&mut points), flags);
                }
                points.clear();
                points.push(point);
                anchor = Some(end);
            } else if let Some(point) = ctx.nodes.take_pillar_point(osm_id) {
                if anchor.is_some() {
                    points.push(point);
                }
            } else {
                // tower without coordinates, or a pillar never seen in the node pass
                ctx.stats.missing_coordinates += 1;
                anchor = None;
                points.clear();
            }
        }
    }

    fn emit<G: GraphStorage>(
        &mut self,
        ctx: &mut ReadContext<'_, G>,
        way_id: i64,
        start: Anchor,
        end: Anchor,
        mut points: Vec<GeoPoint>,
        mut flags: EdgeFlags,
    ) {
        if start.node == end.node && points.len() < 3 {
            return;
        }

        // length over the full geometry, before simplification
        let distance = path_length(&points);
        self.simplifier.simplify(&mut points);
        let geometry = if points.len() > 2 {
            points[1..points.len() - 1].to_vec()
        } else {
            Vec::new()
        };

        if ctx.nodes.is_barrier(start.osm_id) || ctx.nodes.is_barrier(end.osm_id) {
            flags.class_bits |= 1 << class_bits::BARRIER;
        }

        let edge = ctx.graph.add_edge(EdgeRecord {
            base: start.node,
            adj: end.node,
            geometry,
            distance,
            flags,
            way_id,
            artificial: false,
        });
        ctx.restrictions.record_edge(way_id, edge);
        ctx.stats.edges_created += 1;
    }
}

impl<G: GraphStorage> ElementHandler<ReadContext<'_, G>> for WaySegmenter {
    fn on_start(&mut self, _ctx: &mut ReadContext<'_, G>) -> Result<()> {
        info!("pass2 - start reading OSM ways");
        Ok(())
    }

    fn handle(&mut self, ctx: &mut ReadContext<'_, G>, element: Element) -> Result<()> {
        if let Element::Way(way) = element {
            self.counter += 1;
            log_every(ElementKind::Way, self.counter, ctx.config.log_every);
            self.segment(ctx, &way);
        }
        Ok(())
    }

    fn on_finish(&mut self, ctx: &mut ReadContext<'_, G>) -> Result<()> {
        info!(
            ways = self.counter,
            edges = ctx.stats.edges_created,
            missing_coordinates = ctx.stats.missing_coordinates,
            pending_pillars = ctx.nodes.pending_pillar_points(),
            "pass2 - finished reading OSM ways"
        );
        Ok(())
    }
}
