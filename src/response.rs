//! Response interpretation.
//! The transport answers a batch with one result per submitted query, keyed
//! by refId: columnar frames on success, a message on failure. The panel
//! path passes frames through untouched; the variable path flattens the
//! single lowered query's first column into dropdown options.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::frame::Frame;
use crate::request::QueryRequest;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub frames: Vec<Frame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: HashMap<String, QueryResult>,
}

/// One dropdown entry for the host's templating/variable system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableOption {
    pub text: String,
}

/// Fail the whole batch if any query came back with an error; the backend
/// message travels verbatim. No partial frames are surfaced.
fn check_errors(response: &QueryResponse) -> AppResult<()> {
    for (ref_id, result) in &response.results {
        if let Some(message) = &result.error {
            debug!(%ref_id, "backend reported query error");
            return Err(AppError::exec("exec_error", message.as_str()));
        }
    }
    Ok(())
}

/// Panel path: frames pass through unchanged, ordered by the submitted
/// batch's refId order regardless of response-map iteration order.
pub fn reduce_panel(request: &QueryRequest, mut response: QueryResponse) -> AppResult<Vec<Frame>> {
    check_errors(&response)?;
    let mut frames = Vec::new();
    for query in &request.queries {
        if let Some(result) = response.results.remove(&query.ref_id) {
            frames.extend(result.frames);
        }
    }
    Ok(frames)
}

/// Variable path: the single lowered query's first frame, first field, every
/// row stringified in order. A response with no usable shape is an empty
/// list, not an error; a query legitimately returning zero rows must not
/// look like a failure.
pub fn reduce_variable(response: &QueryResponse, ref_id: &str) -> AppResult<Vec<VariableOption>> {
    check_errors(response)?;
    let Some(result) = response.results.get(ref_id) else {
        return Ok(Vec::new());
    };
    let Some(field) = result.frames.first().and_then(|f| f.fields.first()) else {
        return Ok(Vec::new());
    };
    let options = (0..field.len())
        .filter_map(|ix| field.text_at(ix))
        .map(|text| VariableOption { text })
        .collect();
    Ok(options)
}
