//! Element stream dispatcher
//!
//! Enforces the element order of an OSM file (an optional header, then nodes,
//! then ways, then relations) with an explicit state machine and routes every
//! element to the handler registered for its kind. Handlers share one mutable
//! context `C` that is threaded through every call, so the per-kind handlers
//! of a pass can all work on the same tables.

use butterfly_common::{ElementKind, Error, Result};
use tracing::info;

use crate::element::Element;
use crate::source::ElementSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Initial,
    Header,
    Node,
    Way,
    Relation,
    Error,
}

impl ParseState {
    /// Transition table. The match is exhaustive over every (state, event)
    /// pair, so adding a state or an element kind will not compile until the
    /// table is extended.
    pub fn next(self, event: ElementKind) -> ParseState {
        use ElementKind as K;
        use ParseState as S;
        match (self, event) {
            (S::Initial, K::Header) => S::Header,
            (S::Initial, K::Node) => S::Node,
            (S::Initial, K::Way) => S::Error,
            (S::Initial, K::Relation) => S::Error,

            // the header can only happen once
            (S::Header, K::Header) => S::Error,
            (S::Header, K::Node) => S::Node,
            (S::Header, K::Way) => S::Error,
            (S::Header, K::Relation) => S::Error,

            (S::Node, K::Header) => S::Error,
            (S::Node, K::Node) => S::Node,
            (S::Node, K::Way) => S::Way,
            (S::Node, K::Relation) => S::Error,

            (S::Way, K::Header) => S::Error,
            (S::Way, K::Node) => S::Error,
            (S::Way, K::Way) => S::Way,
            (S::Way, K::Relation) => S::Relation,

            (S::Relation, K::Header) => S::Error,
            (S::Relation, K::Node) => S::Error,
            (S::Relation, K::Way) => S::Error,
            (S::Relation, K::Relation) => S::Relation,

            (S::Error, _) => S::Error,
        }
    }
}

/// Receives the elements of one kind during one pass
pub trait ElementHandler<C> {
    fn on_start(&mut self, _ctx: &mut C) -> Result<()> {
        Ok(())
    }

    fn handle(&mut self, ctx: &mut C, element: Element) -> Result<()>;

    fn on_finish(&mut self, _ctx: &mut C) -> Result<()> {
        Ok(())
    }
}

/// Handler for kinds a pass does not care about
pub struct Skip;

impl<C> ElementHandler<C> for Skip {
    fn handle(&mut self, _ctx: &mut C, _element: Element) -> Result<()> {
        Ok(())
    }
}

/// The per-kind handlers of one pass
pub struct Dispatcher<'h, C> {
    header: &'h mut dyn ElementHandler<C>,
    node: &'h mut dyn ElementHandler<C>,
    way: &'h mut dyn ElementHandler<C>,
    relation: &'h mut dyn ElementHandler<C>,
}

impl<'h, C> Dispatcher<'h, C> {
    pub fn new(
        header: &'h mut dyn ElementHandler<C>,
        node: &'h mut dyn ElementHandler<C>,
        way: &'h mut dyn ElementHandler<C>,
        relation: &'h mut dyn ElementHandler<C>,
    ) -> Self {
        Self {
            header,
            node,
            way,
            relation,
        }
    }

    fn handler(&mut self, kind: ElementKind) -> &mut dyn ElementHandler<C> {
        match kind {
            ElementKind::Header => &mut *self.header,
            ElementKind::Node => &mut *self.node,
            ElementKind::Way => &mut *self.way,
            ElementKind::Relation => &mut *self.relation,
        }
    }

    /// Read the whole source once, feeding every element to its handler.
    ///
    /// The active handler only changes when the element kind changes: the
    /// old handler's `on_finish` runs before the new handler's `on_start`.
    /// Fails on an ordering violation or when the producer still holds
    /// queued elements after the stream ended.
    pub fn read(&mut self, source: &dyn ElementSource, ctx: &mut C) -> Result<()> {
        let mut stream = source.open()?;
        let mut state = ParseState::Initial;
        let mut active: Option<ElementKind> = None;

        for element in stream.by_ref() {
            let element = element?;
            let kind = element.kind();
            let next = state.next(kind);
            if next == ParseState::Error {
                return Err(Error::InvalidOrdering {
                    found: kind,
                    after: format!("{state:?}"),
                });
            }
            if next != state {
                if let Some(previous) = active {
                    self.handler(previous).on_finish(ctx)?;
                }
                self.handler(kind).on_start(ctx)?;
                active = Some(kind);
                state = next;
            }
            self.handler(kind).handle(ctx, element)?;
        }

        if let Some(previous) = active {
            self.handler(previous).on_finish(ctx)?;
        }

        let unprocessed = stream.unprocessed();
        if unprocessed > 0 {
            return Err(Error::UnprocessedElements(unprocessed));
        }
        debug_assert_ne!(state, ParseState::Error);
        info!(source = %source.describe(), final_state = ?state, "finished reading input");
        Ok(())
    }
}

/// Log progress every `every` elements of a handler
pub fn log_every(kind: ElementKind, counter: u64, every: u64) {
    if every > 0 && counter % every == 0 {
        info!(kind = kind.name(), processed = counter, "progress");
    }
}
