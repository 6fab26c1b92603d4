//! OSM reader: runs the passes over an element source and fills a graph
//!
//! ```text
//! pass 0   relations (route flags, restriction descriptors), way sizes
//! pass 1   header, ways (node roles, via-way bodies)
//!          -> via-way restrictions built into hop chains
//! pass 2   nodes (coordinates, barriers), ways (edges), relations (turn costs)
//! ```

use std::path::Path;
use std::time::Instant;

use butterfly_common::{Error, Result};
use serde::Serialize;
use tracing::info;

use crate::area::{AreaIndex, NoAreas};
use crate::config::ReaderConfig;
use crate::context::{ReadContext, ReadStats};
use crate::dispatch::{Dispatcher, Skip};
use crate::elevation::{ElevationProvider, NoElevation};
use crate::encoder::TagEncoder;
use crate::geometry::Simplifier;
use crate::graph::GraphStorage;
use crate::header::HeaderHandler;
use crate::node_handler::NodeHandler;
use crate::node_roles::NodeRoleStore;
use crate::pbf::PbfSource;
use crate::relation_preprocessor::{RelationPreprocessor, WayCounter};
use crate::restriction::builder::build_way_restrictions;
use crate::restriction::finalizer::RelationFinalizer;
use crate::restriction::RestrictionStats;
use crate::segmenter::WaySegmenter;
use crate::source::ElementSource;
use crate::way_preprocessor::WayPreprocessor;

/// Outcome of a successful read
#[derive(Debug, Clone, Serialize)]
pub struct ReadReport {
    /// Replication timestamp from the file header (RFC 3339)
    pub data_timestamp: Option<String>,
    pub nodes: usize,
    pub edges: usize,
    pub stats: ReadStats,
    pub restrictions: RestrictionStats,
    pub pass_millis: [u64; 3],
}

pub struct OsmReader<G: GraphStorage> {
    graph: G,
    config: ReaderConfig,
    encoder: Option<Box<dyn TagEncoder>>,
    elevation: Box<dyn ElevationProvider>,
    areas: Box<dyn AreaIndex>,
    source: Option<Box<dyn ElementSource>>,
    finished: bool,
    data_timestamp: Option<String>,
}

impl<G: GraphStorage> OsmReader<G> {
    pub fn new(graph: G, config: ReaderConfig) -> Self {
        Self {
            graph,
            config,
            encoder: None,
            elevation: Box::new(NoElevation),
            areas: Box::new(NoAreas),
            source: None,
            finished: false,
            data_timestamp: None,
        }
    }

    pub fn with_encoder(mut self, encoder: impl TagEncoder + 'static) -> Self {
        self.encoder = Some(Box::new(encoder));
        self
    }

    pub fn with_source(mut self, source: impl ElementSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Read a `.osm.pbf` file with the configured decoder pool
    pub fn with_pbf_file<P: AsRef<Path>>(self, path: P) -> Self {
        let source = PbfSource::new(path)
            .with_worker_threads(self.config.worker_threads)
            .with_queue_capacity(self.config.queue_capacity);
        self.with_source(source)
    }

    pub fn with_elevation(mut self, elevation: impl ElevationProvider + 'static) -> Self {
        self.elevation = Box::new(elevation);
        self
    }

    pub fn with_areas(mut self, areas: impl AreaIndex + 'static) -> Self {
        self.areas = Box::new(areas);
        self
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn into_graph(self) -> G {
        self.graph
    }

    /// Timestamp from the file header, once read
    pub fn data_timestamp(&self) -> Option<&str> {
        self.data_timestamp.as_deref()
    }

    pub fn read_graph(&mut self) -> Result<ReadReport> {
        if self.finished {
            return Err(Error::AlreadyRead);
        }
        let encoder = self
            .encoder
            .as_deref()
            .ok_or(Error::MissingInput("tag encoder"))?;
        let source = self
            .source
            .as_deref()
            .ok_or(Error::MissingInput("element source"))?;
        self.config.validate()?;
        if self.graph.node_count() > 0 {
            return Err(Error::InvalidInput("the graph must be empty before reading".into()));
        }
        self.finished = true;

        info!(source = %source.describe(), "start reading OSM data");
        let mut ctx = ReadContext::new(
            &mut self.graph,
            &self.config,
            encoder,
            &*self.elevation,
            &*self.areas,
        );
        let mut pass_millis = [0u64; 3];

        let started = Instant::now();
        Dispatcher::<ReadContext<'_, G>>::new(
            &mut Skip,
            &mut Skip,
            &mut WayCounter::default(),
            &mut RelationPreprocessor::default(),
        )
        .read(source, &mut ctx)?;
        ctx.nodes = NodeRoleStore::with_capacity(ctx.stats.way_node_refs as usize);
        pass_millis[0] = started.elapsed().as_millis() as u64;

        let started = Instant::now();
        Dispatcher::<ReadContext<'_, G>>::new(
            &mut HeaderHandler,
            &mut Skip,
            &mut WayPreprocessor::default(),
            &mut Skip,
        )
        .read(source, &mut ctx)?;
        build_way_restrictions(&mut ctx.restrictions, &ctx.nodes);
        pass_millis[1] = started.elapsed().as_millis() as u64;
        info!(
            way_nodes = ctx.stats.way_nodes,
            towers = ctx.nodes.tower_count(),
            "preprocessing finished, creating graph"
        );

        let started = Instant::now();
        let simplifier = Simplifier::new(
            self.config.max_way_point_distance,
            self.config.elevation_max_way_point_distance,
        );
        Dispatcher::<ReadContext<'_, G>>::new(
            &mut Skip,
            &mut NodeHandler::default(),
            &mut WaySegmenter::new(simplifier),
            &mut RelationFinalizer::default(),
        )
        .read(source, &mut ctx)?;
        pass_millis[2] = started.elapsed().as_millis() as u64;

        ctx.nodes.release();
        ctx.restrictions.release();
        let timestamp = ctx.timestamp.take();
        let stats = std::mem::take(&mut ctx.stats);
        let restrictions = std::mem::take(&mut ctx.restrictions.stats);
        drop(ctx);
        self.elevation.release();

        if self.graph.node_count() == 0 {
            return Err(Error::EmptyGraph);
        }
        self.data_timestamp = timestamp.clone();

        let report = ReadReport {
            data_timestamp: timestamp,
            nodes: self.graph.node_count(),
            edges: self.graph.edge_count(),
            stats,
            restrictions,
            pass_millis,
        };
        info!(
            nodes = report.nodes,
            edges = report.edges,
            turn_costs = self.graph.turn_costs().len(),
            total_ms = pass_millis.iter().sum::<u64>(),
            "finished reading OSM data"
        );
        Ok(report)
    }
}
