//! File header handler: keeps the replication timestamp

use butterfly_common::Result;
use tracing::info;

use crate::context::ReadContext;
use crate::dispatch::ElementHandler;
use crate::element::Element;
use crate::graph::GraphStorage;

#[derive(Debug, Default)]
pub struct HeaderHandler;

impl<G: GraphStorage> ElementHandler<ReadContext<'_, G>> for HeaderHandler {
    fn handle(&mut self, ctx: &mut ReadContext<'_, G>, element: Element) -> Result<()> {
        if let Element::Header { timestamp } = element {
            if let Some(ts) = &timestamp {
                info!(timestamp = %ts, "OSM file header");
            }
            ctx.timestamp = timestamp;
        }
        Ok(())
    }
}
