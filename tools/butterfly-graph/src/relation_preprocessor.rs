//! Pass 0: relations and way sizes
//!
//! Route relations leave flags on their member ways. Restriction relations
//! are decoded, checked against the encoder and parked until pass 2; via-way
//! restrictions also ask pass 1 to keep the bodies of their chain ways.

use butterfly_common::Result;
use tracing::info;

use crate::context::ReadContext;
use crate::dispatch::{log_every, ElementHandler};
use crate::element::{Element, ElementKind, ReaderRelation};
use crate::graph::GraphStorage;
use crate::restriction::{OsmTurnRestriction, PendingRestriction, RestrictionError, WayRestriction};

/// Counts node references of accepted ways to size the role store
#[derive(Debug, Default)]
pub struct WayCounter {
    counter: u64,
}

impl<G: GraphStorage> ElementHandler<ReadContext<'_, G>> for WayCounter {
    fn handle(&mut self, ctx: &mut ReadContext<'_, G>, element: Element) -> Result<()> {
        if let Element::Way(way) = element {
            self.counter += 1;
            if ctx.encoder.accept_way(&way) {
                ctx.stats.way_node_refs += way.nodes.len() as u64;
            }
        }
        Ok(())
    }

    fn on_finish(&mut self, ctx: &mut ReadContext<'_, G>) -> Result<()> {
        info!(
            ways = self.counter,
            way_node_refs = ctx.stats.way_node_refs,
            "pass0 - counted way nodes"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RelationPreprocessor {
    counter: u64,
}

impl RelationPreprocessor {
    fn preprocess<G: GraphStorage>(
        &mut self,
        ctx: &mut ReadContext<'_, G>,
        relation: &ReaderRelation,
    ) {
        if !relation.is_meta_relation() && relation.tags.has_tag("type", "route") {
            ctx.stats.route_relations += 1;
            for member in relation.way_members() {
                let previous = ctx.relation_flags.get(&member.ref_id).copied().unwrap_or(0);
                let flags = ctx.encoder.handle_route_relation(relation, previous);
                if flags != 0 {
                    ctx.relation_flags.insert(member.ref_id, flags);
                }
            }
        }

        if relation.tags.has_tag("type", "restriction") {
            ctx.restrictions.stats.restriction_relations += 1;
            if let Err(e) = register_restriction(ctx, relation) {
                ctx.restrictions.reject(relation.id, &e);
            }
        }
    }
}

fn register_restriction<G: GraphStorage>(
    ctx: &mut ReadContext<'_, G>,
    relation: &ReaderRelation,
) -> std::result::Result<(), RestrictionError> {
    let restriction = OsmTurnRestriction::from_relation(relation)?;
    let Some(kind) = ctx.encoder.restriction_type(&relation.tags)? else {
        ctx.restrictions.stats.not_applicable += 1;
        return Ok(());
    };

    let data = &mut ctx.restrictions;
    if restriction.is_via_way() {
        let chain = WayRestriction::new(&restriction, kind)?;
        for way in chain.ways() {
            data.want_way_body(way);
        }
        data.way_restrictions.push(chain);
        data.stats.via_way += 1;
    } else {
        data.stats.via_node += 1;
    }

    data.way_ids.extend(restriction.way_ids());
    data.pending
        .insert(relation.id, PendingRestriction { restriction, kind });
    Ok(())
}

impl<G: GraphStorage> ElementHandler<ReadContext<'_, G>> for RelationPreprocessor {
    fn on_start(&mut self, _ctx: &mut ReadContext<'_, G>) -> Result<()> {
        info!("pass0 - start reading OSM relations");
        Ok(())
    }

    fn handle(&mut self, ctx: &mut ReadContext<'_, G>, element: Element) -> Result<()> {
        if let Element::Relation(relation) = element {
            self.counter += 1;
            log_every(ElementKind::Relation, self.counter, ctx.config.log_every);
            self.preprocess(ctx, &relation);
        }
        Ok(())
    }

    fn on_finish(&mut self, ctx: &mut ReadContext<'_, G>) -> Result<()> {
        let stats = &ctx.restrictions.stats;
        info!(
            relations = self.counter,
            route_relations = ctx.stats.route_relations,
            restrictions = stats.restriction_relations,
            via_way = stats.via_way,
            invalid = stats.invalid_total(),
            "pass0 - finished reading OSM relations"
        );
        Ok(())
    }
}
