//! Turn Restriction Builder
//!
//! Runs once between pass 1 and pass 2, when the role of every node is known
//! and the bodies of all via-way chain ways have been captured. Each via-way
//! restriction is ordered into a chain, its via nodes are derived from the
//! shared end nodes, and it is rewritten as k+1 node-local hops:
//!
//! ```text
//! from --n1--> v1 --n2--> v2 ... vk --n(k+1)--> to
//!
//! hop 0: (from, n1, v1)
//! hop i: (v_i', n(i+1), v(i+1))
//! hop k: (v_k', n(k+1), to)
//! ```
//!
//! where `v'` is the artificial copy of a via way. A driver coming from the
//! from way is kept on the copies, so the restriction cannot be escaped or
//! confused with ordinary traffic on the same via way.
//!
//! The chain may start at either end of the from way. Both ends are tried and
//! the first chain whose exit node lies on the to way wins.

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use super::{NodeRestriction, RestrictionData, RestrictionError, WayRef, WayRestriction};
use crate::element::ReaderWay;
use crate::node_roles::NodeRoleStore;

/// Via ways in driving order and the k+1 OSM via nodes between them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViaChain {
    pub ways: Vec<i64>,
    pub nodes: Vec<i64>,
}

/// Build hop chains for every registered via-way restriction.
/// Returns the number of restrictions built; failures are counted on `data`.
pub fn build_way_restrictions(data: &mut RestrictionData, nodes: &NodeRoleStore) -> usize {
    let restrictions = std::mem::take(&mut data.way_restrictions);
    let mut built = 0;

    for restriction in &restrictions {
        match order_chain(restriction, &data.way_bodies, nodes) {
            Ok(chain) => {
                let hops = materialize(data, restriction, &chain);
                debug!(
                    relation = restriction.relation_id,
                    hops = hops.len(),
                    "built via-way restriction"
                );
                data.stats.hops += hops.len() as u64;
                data.hops.insert(restriction.relation_id, hops);
                built += 1;
            }
            Err(e) => data.reject(restriction.relation_id, &e),
        }
    }

    // bodies are only needed to derive the chains
    data.way_bodies = FxHashMap::default();
    info!(
        built,
        failed = restrictions.len() - built,
        artificial_ways = data.artificial_way_count(),
        "via-way restrictions built"
    );
    built
}

fn body(
    bodies: &FxHashMap<i64, Option<ReaderWay>>,
    id: i64,
) -> Result<&ReaderWay, RestrictionError> {
    bodies
        .get(&id)
        .and_then(Option::as_ref)
        .ok_or(RestrictionError::MissingWayBody(id))
}

fn tower_count(way: &ReaderWay, nodes: &NodeRoleStore) -> usize {
    way.nodes.iter().filter(|&&n| nodes.is_tower(n)).count()
}

fn has_end(way: &ReaderWay, node: i64) -> bool {
    way.end_nodes().is_some_and(|(a, b)| a == node || b == node)
}

/// First remaining way with an end node among `candidates`, tried in order
fn find_next(remaining: &[&ReaderWay], candidates: &[i64]) -> Option<(usize, i64)> {
    candidates.iter().find_map(|&node| {
        remaining
            .iter()
            .position(|w| has_end(w, node))
            .map(|i| (i, node))
    })
}

/// Order the via ways by shared end nodes and derive the via nodes
pub fn order_chain(
    restriction: &WayRestriction,
    bodies: &FxHashMap<i64, Option<ReaderWay>>,
    nodes: &NodeRoleStore,
) -> Result<ViaChain, RestrictionError> {
    let from = body(bodies, restriction.from)?;
    let to = body(bodies, restriction.to)?;

    let mut remaining = Vec::with_capacity(restriction.via.len());
    for &id in &restriction.via {
        let way = body(bodies, id)?;
        let towers = tower_count(way, nodes);
        if towers != 2 || way.is_closed() {
            return Err(RestrictionError::TowerEndpoints { way: id, towers });
        }
        remaining.push(way);
    }

    let (from_first, from_last) = from
        .end_nodes()
        .ok_or(RestrictionError::MissingWayBody(restriction.from))?;

    let mut result = Err(RestrictionError::NoSharedViaNode {
        from: restriction.from,
        to: restriction.via[0],
    });
    for start in [from_first, from_last] {
        let Some(first) = find_next(&remaining, &[start]) else {
            continue;
        };
        result = walk_chain(restriction, remaining.clone(), first, to);
        if result.is_ok() {
            break;
        }
    }
    result
}

/// Follow the via ways from `first`, then check the exit against the to way
fn walk_chain(
    restriction: &WayRestriction,
    mut remaining: Vec<&ReaderWay>,
    first: (usize, i64),
    to: &ReaderWay,
) -> Result<ViaChain, RestrictionError> {
    let mut chain = ViaChain {
        ways: Vec::with_capacity(remaining.len()),
        nodes: vec![first.1],
    };
    let mut next = Some(first);
    let mut last_way = restriction.from;

    while let Some((idx, entry)) = next {
        let way = remaining.remove(idx);
        let (a, b) = way
            .end_nodes()
            .ok_or(RestrictionError::MissingWayBody(way.id))?;
        let exit = if a == entry { b } else { a };
        chain.ways.push(way.id);
        chain.nodes.push(exit);
        last_way = way.id;

        next = if remaining.is_empty() {
            None
        } else {
            Some(find_next(&remaining, &[exit]).ok_or(RestrictionError::BrokenChain)?)
        };
    }

    let exit = *chain.nodes.last().ok_or(RestrictionError::BrokenChain)?;
    if !has_end(to, exit) {
        return Err(RestrictionError::NoSharedViaNode {
            from: last_way,
            to: restriction.to,
        });
    }
    Ok(chain)
}

/// Rewrite a chain into node-local hops over artificial via-way copies
fn materialize(
    data: &mut RestrictionData,
    restriction: &WayRestriction,
    chain: &ViaChain,
) -> Vec<NodeRestriction> {
    let k = chain.ways.len();
    let mut hops = Vec::with_capacity(k + 1);
    let mut from = WayRef::Osm(restriction.from);

    for (i, &via) in chain.nodes.iter().enumerate() {
        let to = if i < k {
            WayRef::Osm(chain.ways[i])
        } else {
            WayRef::Osm(restriction.to)
        };
        hops.push(NodeRestriction { from, via, to });
        if i < k {
            from = data.artificial_way(chain.ways[i]);
        }
    }
    hops
}
