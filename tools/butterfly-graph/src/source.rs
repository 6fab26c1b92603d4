//! Element sources: one fresh stream per pass

use butterfly_common::Result;

use crate::element::Element;

/// A stream of elements for one pass over the input
pub trait ElementStream: Iterator<Item = Result<Element>> {
    /// Elements the producer queued that the consumer never received.
    /// Only meaningful once the iterator returned `None`.
    fn unprocessed(&mut self) -> usize;
}

/// Anything that can be read from the beginning once per pass
pub trait ElementSource {
    fn open(&self) -> Result<Box<dyn ElementStream + '_>>;

    /// Human readable name for log lines
    fn describe(&self) -> String;
}

/// In-memory element list, mostly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    elements: Vec<Element>,
    leftover: usize,
}

impl MemorySource {
    pub fn new(elements: Vec<Element>) -> Self {
        Self {
            elements,
            leftover: 0,
        }
    }

    /// Simulate a producer that reports queued elements after the end of the stream
    pub fn with_leftover(mut self, leftover: usize) -> Self {
        self.leftover = leftover;
        self
    }

    pub fn push(&mut self, element: Element) {
        self.elements.push(element);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

struct MemoryStream<'a> {
    inner: std::slice::Iter<'a, Element>,
    leftover: usize,
}

impl Iterator for MemoryStream<'_> {
    type Item = Result<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().cloned().map(Ok)
    }
}

impl ElementStream for MemoryStream<'_> {
    fn unprocessed(&mut self) -> usize {
        self.inner.len() + self.leftover
    }
}

impl ElementSource for MemorySource {
    fn open(&self) -> Result<Box<dyn ElementStream + '_>> {
        Ok(Box::new(MemoryStream {
            inner: self.elements.iter(),
            leftover: self.leftover,
        }))
    }

    fn describe(&self) -> String {
        format!("memory ({} elements)", self.elements.len())
    }
}
