//! Composition root.
//! Wires Defaulting → interpolation → request building → transport →
//! reduction behind the two operations the host UI calls: the panel
//! data-fetch path and the variable-list path. Stateless: every call builds
//! fresh request values; descriptors are never mutated.

use tracing::debug;

use crate::descriptor::{QueryDescriptorPatch, VariableQueryDescriptor};
use crate::error::AppResult;
use crate::frame::Frame;
use crate::request::{RequestBuilder, TimeRange};
use crate::response::{reduce_panel, reduce_variable, VariableOption};
use crate::template::{ScopedVars, TemplateEngine};
use crate::transport::QueryTransport;

pub struct Bridge<E, T> {
    engine: E,
    transport: T,
}

impl<E: TemplateEngine, T: QueryTransport> Bridge<E, T> {
    pub fn new(engine: E, transport: T) -> Self {
        Bridge { engine, transport }
    }

    /// Panel path: complete each persisted descriptor, interpolate, dispatch
    /// the batch as one round trip, and pass the resulting frames through.
    /// Any per-query backend error fails the whole call.
    pub async fn fetch_panel_data(
        &self,
        descriptors: &[QueryDescriptorPatch],
        range: TimeRange,
        scoped: &ScopedVars,
    ) -> AppResult<Vec<Frame>> {
        let completed: Vec<_> = descriptors.iter().map(QueryDescriptorPatch::or_defaults).collect();
        let request = RequestBuilder::new(&self.engine).build(&completed, range, scoped)?;
        let response = self.transport.execute(&request).await?;
        let frames = reduce_panel(&request, response)?;
        debug!(queries = request.queries.len(), frames = frames.len(), "panel fetch complete");
        Ok(frames)
    }

    /// Variable path: lower the reduced descriptor, run it as a single-query
    /// batch, and flatten the first column into dropdown options. Zero rows
    /// is an empty list, not an error.
    pub async fn fetch_variable_options(
        &self,
        variable: &VariableQueryDescriptor,
        range: TimeRange,
    ) -> AppResult<Vec<VariableOption>> {
        let builder = RequestBuilder::new(&self.engine);
        let request = builder.build_variable(variable, range)?;
        let response = self.transport.execute(&request).await?;
        let ref_id = request.queries[0].ref_id.clone();
        let options = reduce_variable(&response, &ref_id)?;
        debug!(options = options.len(), "variable fetch complete");
        Ok(options)
    }
}
