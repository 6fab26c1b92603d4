mod common;

use butterfly_graph::encoder::{class_bits, relation_bits};
use butterfly_graph::{
    BaseGraph, BoxAreas, CarEncoder, Element, Error, FixedElevation, GeoPoint, GraphStorage,
    MemberKind, MemorySource, OsmReader, ReaderConfig, ReaderNode, ReaderWay, Tags,
};
use common::{edge_of, exact_config, read, OsmFixture};

fn two_ways() -> OsmFixture {
    OsmFixture::new()
        .line_nodes(1..=5)
        .way(1, &[1, 2, 3])
        .way(2, &[3, 4, 5])
}

#[test]
fn test_pillars_are_not_vertices() {
    let fixture = two_ways();
    let (graph, report) = read(&fixture);

    assert_eq!(graph.node_count(), 3, "only ends and the connection become vertices");
    assert!(fixture.is_vertex(&graph, 1));
    assert!(fixture.is_vertex(&graph, 3));
    assert!(fixture.is_vertex(&graph, 5));
    assert!(!fixture.is_vertex(&graph, 2));
    assert!(!fixture.is_vertex(&graph, 4));

    assert_eq!(report.stats.ways_accepted, 2);
    assert_eq!(report.stats.way_nodes, 5);
    assert_eq!(report.stats.tower_nodes, 3);
    assert_eq!(report.stats.edges_created, 2);
    assert_eq!(report.edges, 2);
}

#[test]
fn test_pillar_coordinates_end_up_in_geometry() {
    let fixture = two_ways();
    let (graph, _) = read(&fixture);

    let edge = graph.edge(edge_of(&graph, 1)).unwrap();
    assert_eq!(edge.base, fixture.vertex(&graph, 1));
    assert_eq!(edge.adj, fixture.vertex(&graph, 3));
    assert_eq!(edge.geometry.len(), 1);
    let (lat, lon) = fixture.coord(2);
    assert_eq!((edge.geometry[0].lat, edge.geometry[0].lon), (lat, lon));
}

#[test]
fn test_way_with_t_towers_yields_t_minus_one_edges() {
    // node 3 is interior to way 1 and the end of way 2: a junction
    let fixture = OsmFixture::new()
        .line_nodes(1..=6)
        .node(7, 50.001, 4.003)
        .way(1, &[1, 2, 3, 4, 5, 6])
        .way(2, &[3, 7]);
    let (graph, _) = read(&fixture);

    let edges = graph.edges_of_way(1);
    assert_eq!(edges.len(), 2, "towers 1, 3 and 6 give two edges");

    // walking the edges in order covers every coordinate exactly once
    let mut walked: Vec<(f64, f64)> = Vec::new();
    for &e in &edges {
        let edge = graph.edge(e).unwrap();
        let base = graph.node_point(edge.base).unwrap();
        let adj = graph.node_point(edge.adj).unwrap();
        if walked.is_empty() {
            walked.push((base.lat, base.lon));
        }
        assert_eq!(walked.last().copied(), Some((base.lat, base.lon)));
        walked.extend(edge.geometry.iter().map(|p| (p.lat, p.lon)));
        walked.push((adj.lat, adj.lon));
    }
    let expected: Vec<(f64, f64)> = (1..=6).map(|id| fixture.coord(id)).collect();
    assert_eq!(walked, expected);
}

#[test]
fn test_simplification_keeps_full_distance() {
    let fixture = OsmFixture::new().line_nodes(1..=5).way(1, &[1, 2, 3, 4, 5]);

    let (exact, _) = read(&fixture);
    let mut reader = OsmReader::new(BaseGraph::new(), ReaderConfig::default())
        .with_encoder(CarEncoder)
        .with_source(fixture.source());
    reader.read_graph().unwrap();
    let simplified = reader.into_graph();

    let exact_edge = exact.edge(0).unwrap();
    let simple_edge = simplified.edge(0).unwrap();
    assert_eq!(exact_edge.geometry.len(), 3);
    // the points sit on one parallel, so they all go
    assert!(simple_edge.geometry.is_empty());
    assert!(exact_edge.distance > 250.0);
    assert_eq!(exact_edge.distance, simple_edge.distance);
}

#[test]
fn test_closed_way_makes_a_loop_edge() {
    let fixture = OsmFixture::new()
        .node(1, 50.0, 4.0)
        .node(2, 50.0, 4.001)
        .node(3, 50.001, 4.001)
        .node(4, 50.001, 4.0)
        .node(5, 49.999, 4.0)
        .way(1, &[1, 2, 3, 4, 1])
        .way(2, &[1, 5]);
    let (graph, report) = read(&fixture);

    assert_eq!(report.stats.closed_ways, 1);
    assert_eq!(graph.node_count(), 2);
    let edges = graph.edges_of_way(1);
    assert_eq!(edges.len(), 1);
    let edge = graph.edge(edges[0]).unwrap();
    assert_eq!(edge.base, edge.adj);
    assert_eq!(edge.geometry.len(), 3);
}

#[test]
fn test_barrier_on_pillar_splits_way() {
    let fixture = OsmFixture::new()
        .node(1, 50.0, 4.001)
        .tagged_node(2, 50.0, 4.002, &[("barrier", "gate")])
        .node(3, 50.0, 4.003)
        .way(1, &[1, 2, 3]);
    let (graph, report) = read(&fixture);

    assert_eq!(report.stats.barriers_split, 1);
    assert!(fixture.is_vertex(&graph, 2));
    let edges = graph.edges_of_way(1);
    assert_eq!(edges.len(), 2);
    for e in edges {
        assert!(graph.edge(e).unwrap().flags.has_class(class_bits::BARRIER));
    }
}

#[test]
fn test_barrier_on_junction_is_ignored() {
    let fixture = OsmFixture::new()
        .node(1, 50.0, 4.001)
        .node(2, 50.0, 4.002)
        .tagged_node(3, 50.0, 4.003, &[("barrier", "bollard")])
        .node(4, 50.0, 4.004)
        .node(5, 50.001, 4.003)
        .way(1, &[1, 2, 3, 4])
        .way(2, &[3, 5]);
    let (graph, report) = read(&fixture);

    assert_eq!(report.stats.barriers_split, 0);
    assert_eq!(report.stats.barriers_ignored_at_junction, 1);
    assert_eq!(graph.edge_count(), 3);
    for (_, edge) in graph.edges() {
        assert!(!edge.flags.has_class(class_bits::BARRIER));
    }
}

#[test]
fn test_missing_node_breaks_segment() {
    // node 2 never shows up in the node section
    let fixture = OsmFixture::new()
        .node(1, 50.0, 4.001)
        .node(3, 50.0, 4.003)
        .node(4, 50.0, 4.004)
        .way(1, &[1, 2, 3])
        .way(2, &[3, 4]);
    let (graph, report) = read(&fixture);

    assert_eq!(report.stats.missing_coordinates, 1);
    assert!(graph.edges_of_way(1).is_empty());
    assert_eq!(graph.edges_of_way(2).len(), 1);
}

#[test]
fn test_rejected_ways_contribute_nothing() {
    let fixture = OsmFixture::new()
        .line_nodes(1..=4)
        .way(1, &[1, 2])
        .tagged_way(2, &[2, 3], &[("highway", "footway")])
        .tagged_way(3, &[3, 4], &[("highway", "residential"), ("access", "private")]);
    let (graph, report) = read(&fixture);

    assert_eq!(report.stats.ways_processed, 3);
    assert_eq!(report.stats.ways_accepted, 1);
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 1);
}

#[test]
fn test_oneway_and_speed_flags() {
    let fixture = OsmFixture::new()
        .line_nodes(1..=3)
        .tagged_way(1, &[1, 2], &[("highway", "primary"), ("oneway", "yes")])
        .tagged_way(2, &[2, 3], &[("highway", "motorway")]);
    let (graph, _) = read(&fixture);

    let primary = graph.edge(edge_of(&graph, 1)).unwrap().flags;
    assert!(primary.forward);
    assert!(!primary.backward);
    assert_eq!(primary.speed_kmh, 70.0);

    let motorway = graph.edge(edge_of(&graph, 2)).unwrap().flags;
    assert!(!motorway.backward, "motorways are oneway by default");
}

#[test]
fn test_route_relation_flags_reach_edges() {
    let fixture = two_ways().relation(
        500,
        &[("", MemberKind::Way, 1)],
        &[("type", "route"), ("route", "road")],
    );
    let (graph, report) = read(&fixture);

    assert_eq!(report.stats.route_relations, 1);
    let on_route = graph.edge(edge_of(&graph, 1)).unwrap().flags;
    let off_route = graph.edge(edge_of(&graph, 2)).unwrap().flags;
    assert_ne!(on_route.relation_flags & (1 << relation_bits::ROAD_ROUTE), 0);
    assert_eq!(off_route.relation_flags, 0);
}

#[test]
fn test_area_tags_are_merged() {
    let fixture = two_ways();
    let mut areas = BoxAreas::new();
    let toll: Tags = [("toll", "yes")].into_iter().collect();
    areas.add(GeoPoint::new(49.9, 3.9), GeoPoint::new(50.1, 4.0025), toll);

    let mut reader = OsmReader::new(BaseGraph::new(), exact_config())
        .with_encoder(CarEncoder)
        .with_areas(areas)
        .with_source(fixture.source());
    reader.read_graph().unwrap();
    let graph = reader.into_graph();

    // way 1 starts inside the box, way 2 outside
    assert!(graph.edge(edge_of(&graph, 1)).unwrap().flags.has_class(class_bits::TOLL));
    assert!(!graph.edge(edge_of(&graph, 2)).unwrap().flags.has_class(class_bits::TOLL));
}

#[test]
fn test_elevation_is_attached_to_nodes() {
    let fixture = two_ways();
    let mut reader = OsmReader::new(BaseGraph::new(), exact_config())
        .with_encoder(CarEncoder)
        .with_elevation(FixedElevation(120.0))
        .with_source(fixture.source());
    reader.read_graph().unwrap();

    let point = reader.graph().node_point(0).unwrap();
    assert!(point.has_ele());
    assert_eq!(point.ele, 120.0);
}

#[test]
fn test_header_timestamp_is_kept() {
    let fixture = two_ways().timestamp("2024-05-01T00:00:00+00:00");
    let mut reader = OsmReader::new(BaseGraph::new(), exact_config())
        .with_encoder(CarEncoder)
        .with_source(fixture.source());
    let report = reader.read_graph().unwrap();

    assert_eq!(report.data_timestamp.as_deref(), Some("2024-05-01T00:00:00+00:00"));
    assert_eq!(reader.data_timestamp(), Some("2024-05-01T00:00:00+00:00"));
}

#[test]
fn test_report_serializes_to_json() {
    let (_, report) = read(&two_ways());
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["nodes"], 3);
    assert_eq!(json["stats"]["ways_accepted"], 2);
    assert!(json["restrictions"]["invalid"].is_object());
}

fn node(id: i64) -> Element {
    Element::Node(ReaderNode {
        id,
        lat: 50.0,
        lon: 4.0 + id as f64 * 0.001,
        tags: Tags::new(),
    })
}

fn way(id: i64, nodes: &[i64]) -> Element {
    Element::Way(ReaderWay {
        id,
        nodes: nodes.to_vec(),
        tags: [("highway", "residential")].into_iter().collect(),
    })
}

fn reader_for(source: MemorySource) -> OsmReader<BaseGraph> {
    OsmReader::new(BaseGraph::new(), exact_config())
        .with_encoder(CarEncoder)
        .with_source(source)
}

#[test]
fn test_node_after_way_aborts() {
    let source = MemorySource::new(vec![node(1), node(2), way(1, &[1, 2]), node(3)]);
    let result = reader_for(source).read_graph();
    assert!(matches!(result, Err(Error::InvalidOrdering { .. })));
}

#[test]
fn test_leftover_elements_abort() {
    let source = MemorySource::new(vec![node(1), node(2), way(1, &[1, 2])]).with_leftover(3);
    let result = reader_for(source).read_graph();
    assert!(matches!(result, Err(Error::UnprocessedElements(3))));
}

#[test]
fn test_empty_graph_is_fatal() {
    let fixture = OsmFixture::new()
        .line_nodes(1..=2)
        .tagged_way(1, &[1, 2], &[("highway", "footway")]);
    let result = reader_for(fixture.source()).read_graph();
    assert!(matches!(result, Err(Error::EmptyGraph)));
}

#[test]
fn test_second_read_is_refused() {
    let mut reader = reader_for(two_ways().source());
    reader.read_graph().unwrap();
    assert!(matches!(reader.read_graph(), Err(Error::AlreadyRead)));
}

#[test]
fn test_missing_inputs_are_fatal() {
    let mut no_encoder =
        OsmReader::new(BaseGraph::new(), exact_config()).with_source(two_ways().source());
    assert!(matches!(no_encoder.read_graph(), Err(Error::MissingInput("tag encoder"))));

    let mut no_source = OsmReader::new(BaseGraph::new(), exact_config()).with_encoder(CarEncoder);
    assert!(matches!(no_source.read_graph(), Err(Error::MissingInput("element source"))));
}

#[test]
fn test_graph_must_start_empty() {
    let mut graph = BaseGraph::new();
    graph.add_node(GeoPoint::new(0.0, 0.0));
    let mut reader = OsmReader::new(graph, exact_config())
        .with_encoder(CarEncoder)
        .with_source(two_ways().source());
    assert!(matches!(reader.read_graph(), Err(Error::InvalidInput(_))));
}

#[test]
fn test_invalid_config_is_fatal() {
    let config = ReaderConfig {
        worker_threads: 0,
        ..ReaderConfig::default()
    };
    let mut reader = OsmReader::new(BaseGraph::new(), config)
        .with_encoder(CarEncoder)
        .with_source(two_ways().source());
    assert!(matches!(reader.read_graph(), Err(Error::Config(_))));
}
