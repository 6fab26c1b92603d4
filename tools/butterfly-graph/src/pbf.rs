//! PBF element source
//!
//! A producer thread reads raw blobs, decodes them in batches on a bounded
//! rayon pool (batch order is preserved) and pushes one message per decoded
//! block into a single bounded crossbeam queue. The reader pipeline consumes
//! that queue on its own thread.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use butterfly_common::{Error, Result};
use chrono::{DateTime, SecondsFormat};
use crossbeam_channel::{bounded, Receiver, Sender};
use osmpbf::{Blob, BlobDecode, BlobReader, RelMemberType};
use rayon::prelude::*;

use crate::element::{Element, Member, MemberKind, ReaderNode, ReaderRelation, ReaderWay, Tags};
use crate::source::{ElementSource, ElementStream};

type Block = Result<Vec<Element>>;

pub struct PbfSource {
    path: PathBuf,
    worker_threads: usize,
    queue_capacity: usize,
}

impl PbfSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            worker_threads: 2,
            queue_capacity: 64,
        }
    }

    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads.max(1);
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ElementSource for PbfSource {
    fn open(&self) -> Result<Box<dyn ElementStream + '_>> {
        if !self.path.exists() {
            return Err(Error::FileNotFound(self.path.clone()));
        }

        let reader = BlobReader::from_path(&self.path)
            .map_err(|e| Error::Pbf(format!("failed to open {}: {e}", self.path.display())))?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_threads)
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build decoder pool: {e}")))?;

        let (tx, rx) = bounded(self.queue_capacity);
        let batch_size = self.worker_threads;
        let handle = std::thread::Builder::new()
            .name("pbf-producer".to_string())
            .spawn(move || produce(reader, pool, batch_size, tx))?;

        Ok(Box::new(PbfStream {
            rx,
            current: VecDeque::new(),
            producer: Some(handle),
        }))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn produce<R: std::io::Read + Send>(
    reader: BlobReader<R>,
    pool: rayon::ThreadPool,
    batch_size: usize,
    tx: Sender<Block>,
) {
    let mut batch: Vec<Blob> = Vec::with_capacity(batch_size);
    for blob in reader {
        match blob {
            Ok(blob) => batch.push(blob),
            Err(e) => {
                let _ = tx.send(Err(Error::Pbf(e.to_string())));
                return;
            }
        }
        if batch.len() == batch_size && !flush(&pool, &mut batch, &tx) {
            return;
        }
    }
    flush(&pool, &mut batch, &tx);
}

/// Decode and send one batch; false once the consumer is gone or a block failed
fn flush(pool: &rayon::ThreadPool, batch: &mut Vec<Blob>, tx: &Sender<Block>) -> bool {
    let blobs = std::mem::take(batch);
    let decoded: Vec<Block> =
        pool.install(|| blobs.into_par_iter().map(|b| decode_blob(&b)).collect());
    for block in decoded {
        let failed = block.is_err();
        if tx.send(block).is_err() || failed {
            return false;
        }
    }
    true
}

fn decode_blob(blob: &Blob) -> Block {
    match blob.decode().map_err(|e| Error::Pbf(e.to_string()))? {
        BlobDecode::OsmHeader(header) => {
            let timestamp = header
                .osmosis_replication_timestamp()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true));
            Ok(vec![Element::Header { timestamp }])
        }
        BlobDecode::OsmData(block) => Ok(block.elements().filter_map(convert).collect()),
        BlobDecode::Unknown(_) => Ok(Vec::new()),
    }
}

fn convert(element: osmpbf::Element<'_>) -> Option<Element> {
    match element {
        osmpbf::Element::Node(node) => Some(Element::Node(ReaderNode {
            id: node.id(),
            lat: node.lat(),
            lon: node.lon(),
            tags: node.tags().collect(),
        })),
        osmpbf::Element::DenseNode(node) => Some(Element::Node(ReaderNode {
            id: node.id(),
            lat: node.lat(),
            lon: node.lon(),
            tags: node.tags().collect(),
        })),
        osmpbf::Element::Way(way) => Some(Element::Way(ReaderWay {
            id: way.id(),
            nodes: way.refs().collect(),
            tags: way.tags().collect(),
        })),
        osmpbf::Element::Relation(relation) => {
            let members = relation
                .members()
                .map(|member| Member {
                    role: member.role().unwrap_or("").to_string(),
                    kind: match member.member_type {
                        RelMemberType::Node => MemberKind::Node,
                        RelMemberType::Way => MemberKind::Way,
                        RelMemberType::Relation => MemberKind::Relation,
                    },
                    ref_id: member.member_id,
                })
                .collect();
            let tags: Tags = relation.tags().collect();
            Some(Element::Relation(ReaderRelation {
                id: relation.id(),
                members,
                tags,
            }))
        }
    }
}

struct PbfStream {
    rx: Receiver<Block>,
    current: VecDeque<Element>,
    producer: Option<JoinHandle<()>>,
}

impl Iterator for PbfStream {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(element) = self.current.pop_front() {
                return Some(Ok(element));
            }
            match self.rx.recv() {
                Ok(Ok(block)) => self.current = block.into(),
                Ok(Err(e)) => return Some(Err(e)),
                Err(_) => {
                    // queue closed: the producer is done, surface a panic if it had one
                    let producer = self.producer.take()?;
                    return match producer.join() {
                        Ok(()) => None,
                        Err(_) => Some(Err(Error::Pbf("producer thread panicked".to_string()))),
                    };
                }
            }
        }
    }
}

impl ElementStream for PbfStream {
    fn unprocessed(&mut self) -> usize {
        let queued: usize = self
            .rx
            .try_iter()
            .map(|block| block.map(|b| b.len()).unwrap_or(0))
            .sum();
        self.current.len() + queued
    }
}
