//! Query descriptor model.
//! A descriptor is the declarative, serializable description of one query
//! against the document store, independent of any UI widget. Dashboards
//! persist the partial form ([`QueryDescriptorPatch`]); the bridge completes
//! it against the reference defaults before building a request.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QueryType {
    #[default]
    Timeseries,
    Table,
}

/// Canonical sample pipeline: project timestamp + one label + one value.
/// Kept as a literal so the defaulted descriptor round-trips byte-for-byte.
pub const DEFAULT_AGGREGATION: &str =
    r#"[{"$project":{"timestamp":1,"sensorID":"$metadata.sensorID","measurement":1,"_id":0}}]"#;

/// A complete query definition. Field names mirror the persisted dashboard
/// JSON (camelCase on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescriptor {
    /// Identifier of this query within a batch; responses are keyed by it.
    pub ref_id: String,
    pub database: String,
    pub collection: String,
    pub query_type: QueryType,
    /// Timeseries only: field carrying the sample instant.
    pub timestamp_field: String,
    /// Empty means the timestamp is a native temporal value; non-empty means
    /// parse the string field with this format.
    pub timestamp_format: String,
    /// Flat field names; each unique combination of their values defines one
    /// output series. No duplicates.
    pub label_fields: Vec<String>,
    /// Series display-name template; empty derives a name from label values.
    pub legend_format: String,
    pub value_fields: Vec<String>,
    /// Parallel to `value_fields`. A leading `*` marks a field that may be
    /// absent from any given document.
    pub value_field_types: Vec<String>,
    /// JSON-encoded array of pipeline stages, submitted to the store after
    /// interpolation.
    pub aggregation: String,
    pub auto_time_bound: bool,
    pub auto_time_bound_at_start: bool,
    pub auto_time_sort: bool,
    /// When set, the backend samples documents instead of trusting
    /// `value_fields`/`value_field_types`.
    pub schema_inference: bool,
    pub schema_inference_depth: u32,
}

impl QueryDescriptor {
    /// The fixed reference descriptor used to backfill missing fields.
    pub fn reference() -> Self {
        QueryDescriptor {
            ref_id: "A".to_string(),
            database: "my_db".to_string(),
            collection: "my_collection".to_string(),
            query_type: QueryType::Timeseries,
            timestamp_field: "timestamp".to_string(),
            timestamp_format: String::new(),
            label_fields: vec!["sensorID".to_string()],
            legend_format: String::new(),
            value_fields: vec!["measurement".to_string()],
            value_field_types: vec!["float64".to_string()],
            aggregation: DEFAULT_AGGREGATION.to_string(),
            auto_time_bound: false,
            auto_time_bound_at_start: false,
            auto_time_sort: false,
            schema_inference: false,
            schema_inference_depth: 20,
        }
    }

    /// Value field names zipped with their declared types.
    pub fn value_field_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.value_fields
            .iter()
            .map(String::as_str)
            .zip(self.value_field_types.iter().map(String::as_str))
    }
}

impl Default for QueryDescriptor {
    fn default() -> Self {
        Self::reference()
    }
}

/// A leading `*` on a declared type marks the field as optionally absent.
pub fn type_is_optional(ty: &str) -> bool {
    ty.starts_with('*')
}

/// Partial descriptor as held by editors and persisted in dashboards.
/// Unknown JSON fields are ignored on read; unset fields serialize away.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryDescriptorPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_field_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_time_bound: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_time_bound_at_start: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_time_sort: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_inference: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_inference_depth: Option<u32>,
}

impl QueryDescriptorPatch {
    /// Complete this patch against the reference defaults. Set fields are
    /// preserved (falsy values included); unset fields take the default.
    /// Pure: the patch itself is untouched.
    pub fn or_defaults(&self) -> QueryDescriptor {
        let r = QueryDescriptor::reference();
        QueryDescriptor {
            ref_id: self.ref_id.clone().unwrap_or(r.ref_id),
            database: self.database.clone().unwrap_or(r.database),
            collection: self.collection.clone().unwrap_or(r.collection),
            query_type: self.query_type.unwrap_or(r.query_type),
            timestamp_field: self.timestamp_field.clone().unwrap_or(r.timestamp_field),
            timestamp_format: self.timestamp_format.clone().unwrap_or(r.timestamp_format),
            label_fields: self.label_fields.clone().unwrap_or(r.label_fields),
            legend_format: self.legend_format.clone().unwrap_or(r.legend_format),
            value_fields: self.value_fields.clone().unwrap_or(r.value_fields),
            value_field_types: self.value_field_types.clone().unwrap_or(r.value_field_types),
            aggregation: self.aggregation.clone().unwrap_or(r.aggregation),
            auto_time_bound: self.auto_time_bound.unwrap_or(r.auto_time_bound),
            auto_time_bound_at_start: self
                .auto_time_bound_at_start
                .unwrap_or(r.auto_time_bound_at_start),
            auto_time_sort: self.auto_time_sort.unwrap_or(r.auto_time_sort),
            schema_inference: self.schema_inference.unwrap_or(r.schema_inference),
            schema_inference_depth: self
                .schema_inference_depth
                .unwrap_or(r.schema_inference_depth),
        }
    }
}

impl From<QueryDescriptor> for QueryDescriptorPatch {
    fn from(d: QueryDescriptor) -> Self {
        QueryDescriptorPatch {
            ref_id: Some(d.ref_id),
            database: Some(d.database),
            collection: Some(d.collection),
            query_type: Some(d.query_type),
            timestamp_field: Some(d.timestamp_field),
            timestamp_format: Some(d.timestamp_format),
            label_fields: Some(d.label_fields),
            legend_format: Some(d.legend_format),
            value_fields: Some(d.value_fields),
            value_field_types: Some(d.value_field_types),
            aggregation: Some(d.aggregation),
            auto_time_bound: Some(d.auto_time_bound),
            auto_time_bound_at_start: Some(d.auto_time_bound_at_start),
            auto_time_sort: Some(d.auto_time_sort),
            schema_inference: Some(d.schema_inference),
            schema_inference_depth: Some(d.schema_inference_depth),
        }
    }
}

/// Reduced descriptor for template-variable population. Never executed
/// directly; always lowered into a single-query [`QueryDescriptor`] first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VariableQueryDescriptor {
    pub database: String,
    pub collection: String,
    pub aggregation: String,
    pub field_name: String,
    pub field_type: String,
}

impl VariableQueryDescriptor {
    /// Lower into a table query selecting exactly the named field, with
    /// bounding, sorting and inference disabled.
    pub fn lower(&self) -> QueryDescriptor {
        QueryDescriptor {
            ref_id: "A".to_string(),
            database: self.database.clone(),
            collection: self.collection.clone(),
            query_type: QueryType::Table,
            timestamp_field: String::new(),
            timestamp_format: String::new(),
            label_fields: Vec::new(),
            legend_format: String::new(),
            value_fields: vec![self.field_name.clone()],
            value_field_types: vec![self.field_type.clone()],
            aggregation: self.aggregation.clone(),
            auto_time_bound: false,
            auto_time_bound_at_start: false,
            auto_time_sort: false,
            schema_inference: false,
            schema_inference_depth: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaulting_fills_everything_from_identifiers_only() {
        let patch = QueryDescriptorPatch {
            database: Some("my_db".to_string()),
            collection: Some("my_collection".to_string()),
            ..Default::default()
        };
        let full = patch.or_defaults();
        assert_eq!(full, QueryDescriptor::reference());
        assert_eq!(full.schema_inference_depth, 20);
        assert_eq!(full.aggregation, DEFAULT_AGGREGATION);
    }

    #[test]
    fn defaulting_is_idempotent() {
        let patch = QueryDescriptorPatch {
            collection: Some("sensors".to_string()),
            auto_time_sort: Some(true),
            ..Default::default()
        };
        let once = patch.or_defaults();
        let twice = QueryDescriptorPatch::from(once.clone()).or_defaults();
        assert_eq!(once, twice);
    }

    #[test]
    fn defaulting_preserves_falsy_values() {
        let patch = QueryDescriptorPatch {
            aggregation: Some(String::new()),
            auto_time_bound: Some(false),
            schema_inference_depth: Some(1),
            label_fields: Some(Vec::new()),
            ..Default::default()
        };
        let full = patch.or_defaults();
        assert_eq!(full.aggregation, "");
        assert!(!full.auto_time_bound);
        assert_eq!(full.schema_inference_depth, 1);
        assert!(full.label_fields.is_empty());
    }

    #[test]
    fn value_field_parallelism_survives_defaulting() {
        let patch = QueryDescriptorPatch {
            value_fields: Some(vec!["temp".to_string(), "rh".to_string()]),
            value_field_types: Some(vec!["float64".to_string(), "*float64".to_string()]),
            ..Default::default()
        };
        let full = patch.or_defaults();
        assert_eq!(full.value_fields.len(), full.value_field_types.len());
        let pairs: Vec<_> = full.value_field_pairs().collect();
        assert_eq!(pairs, vec![("temp", "float64"), ("rh", "*float64")]);
    }

    #[test]
    fn star_prefix_marks_optional() {
        assert!(type_is_optional("*float64"));
        assert!(!type_is_optional("float64"));
    }

    #[test]
    fn variable_descriptor_lowers_to_table_query() {
        let v = VariableQueryDescriptor {
            database: "d".to_string(),
            collection: "c".to_string(),
            aggregation: r#"[{"$group":{"_id":"$host"}}]"#.to_string(),
            field_name: "_id".to_string(),
            field_type: "string".to_string(),
        };
        let q = v.lower();
        assert_eq!(q.query_type, QueryType::Table);
        assert_eq!(q.database, "d");
        assert_eq!(q.collection, "c");
        assert_eq!(q.value_fields, vec!["_id".to_string()]);
        assert_eq!(q.value_field_types, vec!["string".to_string()]);
        assert!(q.label_fields.is_empty());
        assert_eq!(q.timestamp_field, "");
        assert!(!q.auto_time_bound && !q.auto_time_sort && !q.schema_inference);
    }

    #[test]
    fn patch_tolerates_unknown_and_missing_fields() {
        let json = r#"{"database":"telemetry","hide":false,"datasource":{"uid":"x"}}"#;
        let patch: QueryDescriptorPatch = serde_json::from_str(json).unwrap();
        assert_eq!(patch.database.as_deref(), Some("telemetry"));
        assert!(patch.collection.is_none());
        let full = patch.or_defaults();
        assert_eq!(full.database, "telemetry");
        assert_eq!(full.collection, "my_collection");
    }

    #[test]
    fn descriptor_wire_names_are_camel_case() {
        let v = serde_json::to_value(QueryDescriptor::reference()).unwrap();
        assert!(v.get("refId").is_some());
        assert!(v.get("timestampField").is_some());
        assert!(v.get("valueFieldTypes").is_some());
        assert!(v.get("schemaInferenceDepth").is_some());
        assert_eq!(v["queryType"], "Timeseries");
    }
}
