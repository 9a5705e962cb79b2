//! Batch request construction.
//! One data fetch = one transport round trip carrying every panel query plus
//! the dashboard time range. The active window is registered with the
//! templating context before any descriptor is interpolated, so range
//! built-ins always resolve to the range of *this* call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::{QueryDescriptor, VariableQueryDescriptor};
use crate::error::AppResult;
use crate::template::{interpolate_aggregation, ScopedVars, TemplateEngine, VarValue};

/// Absolute dashboard time window `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        TimeRange { from, to }
    }

    pub fn from_millis(&self) -> i64 {
        self.from.timestamp_millis()
    }

    pub fn to_millis(&self) -> i64 {
        self.to.timestamp_millis()
    }
}

/// The transport-level request: ordered queries, shared range. Each query is
/// a structural copy of its descriptor with `aggregation` already
/// interpolated; everything else is carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub range: TimeRange,
    pub queries: Vec<QueryDescriptor>,
}

/// Names under which the active window is visible to the pipeline text.
pub const VAR_RANGE_FROM: &str = "__from";
pub const VAR_RANGE_TO: &str = "__to";

/// Clone the caller's scoped variables and register the range built-ins as
/// epoch-millisecond numbers, so they splice into `$match` stages unquoted.
fn register_time_range(range: TimeRange, scoped: &ScopedVars) -> ScopedVars {
    let mut out = scoped.clone();
    out.insert(VAR_RANGE_FROM.to_string(), VarValue::number(range.from_millis()));
    out.insert(VAR_RANGE_TO.to_string(), VarValue::number(range.to_millis()));
    out
}

/// Builds transport requests from descriptors. The templating engine is an
/// injected capability; the builder owns no state of its own.
pub struct RequestBuilder<'a> {
    engine: &'a dyn TemplateEngine,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(engine: &'a dyn TemplateEngine) -> Self {
        RequestBuilder { engine }
    }

    /// Panel path: interpolate every descriptor against the caller's scoped
    /// variables plus the range built-ins. Descriptors are never mutated.
    pub fn build(
        &self,
        descriptors: &[QueryDescriptor],
        range: TimeRange,
        scoped: &ScopedVars,
    ) -> AppResult<QueryRequest> {
        // Range registration must precede interpolation for every query
        let scoped = register_time_range(range, scoped);
        let mut queries = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let aggregation =
                interpolate_aggregation(self.engine, &descriptor.aggregation, &scoped)?;
            debug!(
                ref_id = %descriptor.ref_id,
                database = %descriptor.database,
                collection = %descriptor.collection,
                "query interpolated"
            );
            queries.push(QueryDescriptor { aggregation, ..descriptor.clone() });
        }
        Ok(QueryRequest { range, queries })
    }

    /// Variable path: lower the reduced descriptor and build it as a
    /// single-query batch. No caller-scoped variables exist here.
    pub fn build_variable(
        &self,
        variable: &VariableQueryDescriptor,
        range: TimeRange,
    ) -> AppResult<QueryRequest> {
        let lowered = variable.lower();
        self.build(std::slice::from_ref(&lowered), range, &ScopedVars::new())
    }
}
