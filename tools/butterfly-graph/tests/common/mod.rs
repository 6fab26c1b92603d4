//! Small OSM fixtures for driving the reader over in-memory elements

#![allow(dead_code)]

use std::collections::HashMap;

use butterfly_graph::{
    BaseGraph, CarEncoder, EdgeId, Element, GraphStorage, Member, MemberKind, MemorySource, NodeId,
    OsmReader, ReadReport, ReaderConfig, ReaderNode, ReaderRelation, ReaderWay, Tags,
};

pub const HIGHWAY: &[(&str, &str)] = &[("highway", "residential")];

#[derive(Default)]
pub struct OsmFixture {
    timestamp: Option<String>,
    nodes: Vec<Element>,
    ways: Vec<Element>,
    relations: Vec<Element>,
    coords: HashMap<i64, (f64, f64)>,
}

fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs.iter().map(|&(k, v)| (k, v)).collect()
}

impl OsmFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestamp(mut self, ts: &str) -> Self {
        self.timestamp = Some(ts.to_string());
        self
    }

    pub fn node(self, id: i64, lat: f64, lon: f64) -> Self {
        self.tagged_node(id, lat, lon, &[])
    }

    pub fn tagged_node(mut self, id: i64, lat: f64, lon: f64, pairs: &[(&str, &str)]) -> Self {
        self.coords.insert(id, (lat, lon));
        self.nodes.push(Element::Node(ReaderNode {
            id,
            lat,
            lon,
            tags: tags(pairs),
        }));
        self
    }

    /// Nodes 1..=n spaced along a parallel, about 70 m apart
    pub fn line_nodes(mut self, ids: std::ops::RangeInclusive<i64>) -> Self {
        for id in ids {
            self = self.node(id, 50.0, 4.0 + id as f64 * 0.001);
        }
        self
    }

    pub fn way(self, id: i64, nodes: &[i64]) -> Self {
        self.tagged_way(id, nodes, HIGHWAY)
    }

    pub fn tagged_way(mut self, id: i64, nodes: &[i64], pairs: &[(&str, &str)]) -> Self {
        self.ways.push(Element::Way(ReaderWay {
            id,
            nodes: nodes.to_vec(),
            tags: tags(pairs),
        }));
        self
    }

    pub fn relation(
        mut self,
        id: i64,
        members: &[(&str, MemberKind, i64)],
        pairs: &[(&str, &str)],
    ) -> Self {
        self.relations.push(Element::Relation(ReaderRelation {
            id,
            members: members
                .iter()
                .map(|&(role, kind, ref_id)| Member {
                    role: role.to_string(),
                    kind,
                    ref_id,
                })
                .collect(),
            tags: tags(pairs),
        }));
        self
    }

    pub fn via_node_restriction(self, id: i64, value: &str, from: i64, via: i64, to: i64) -> Self {
        self.relation(
            id,
            &[
                ("from", MemberKind::Way, from),
                ("via", MemberKind::Node, via),
                ("to", MemberKind::Way, to),
            ],
            &[("type", "restriction"), ("restriction", value)],
        )
    }

    pub fn via_way_restriction(
        self,
        id: i64,
        value: &str,
        from: i64,
        via: &[i64],
        to: i64,
    ) -> Self {
        let mut members = vec![("from", MemberKind::Way, from)];
        members.extend(via.iter().map(|&w| ("via", MemberKind::Way, w)));
        members.push(("to", MemberKind::Way, to));
        self.relation(id, &members, &[("type", "restriction"), ("restriction", value)])
    }

    pub fn source(&self) -> MemorySource {
        let mut elements = vec![Element::Header {
            timestamp: self.timestamp.clone(),
        }];
        elements.extend(self.nodes.iter().cloned());
        elements.extend(self.ways.iter().cloned());
        elements.extend(self.relations.iter().cloned());
        MemorySource::new(elements)
    }

    /// Graph vertex created for an OSM node, found by its coordinate
    pub fn vertex(&self, graph: &BaseGraph, osm_id: i64) -> NodeId {
        let (lat, lon) = self.coords[&osm_id];
        (0..graph.node_count() as NodeId)
            .find(|&n| {
                graph
                    .node_point(n)
                    .is_some_and(|p| p.lat == lat && p.lon == lon)
            })
            .unwrap_or_else(|| panic!("node {osm_id} is not a graph vertex"))
    }

    pub fn is_vertex(&self, graph: &BaseGraph, osm_id: i64) -> bool {
        let (lat, lon) = self.coords[&osm_id];
        (0..graph.node_count() as NodeId).any(|n| {
            graph
                .node_point(n)
                .is_some_and(|p| p.lat == lat && p.lon == lon)
        })
    }

    pub fn coord(&self, osm_id: i64) -> (f64, f64) {
        self.coords[&osm_id]
    }
}

/// Config without geometry simplification, so every coordinate survives
pub fn exact_config() -> ReaderConfig {
    ReaderConfig {
        max_way_point_distance: 0.0,
        ..ReaderConfig::default()
    }
}

pub fn read(fixture: &OsmFixture) -> (BaseGraph, ReadReport) {
    let mut reader = OsmReader::new(BaseGraph::new(), exact_config())
        .with_encoder(CarEncoder)
        .with_source(fixture.source());
    let report = reader.read_graph().expect("read should succeed");
    (reader.into_graph(), report)
}

/// The single real edge of a way
pub fn edge_of(graph: &BaseGraph, way_id: i64) -> EdgeId {
    let edges: Vec<EdgeId> = graph
        .edges_of_way(way_id)
        .into_iter()
        .filter(|&e| graph.edge(e).is_some_and(|r| !r.artificial))
        .collect();
    assert_eq!(edges.len(), 1, "way {way_id} should have exactly one edge");
    edges[0]
}

/// The artificial duplicate created for a via way
pub fn artificial_of(graph: &BaseGraph, way_id: i64) -> EdgeId {
    let edges: Vec<EdgeId> = graph
        .edges_of_way(way_id)
        .into_iter()
        .filter(|&e| graph.edge(e).is_some_and(|r| r.artificial))
        .collect();
    assert_eq!(edges.len(), 1, "way {way_id} should have exactly one artificial copy");
    edges[0]
}
