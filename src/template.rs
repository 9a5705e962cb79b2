//! Template-variable interpolation for aggregation pipeline text.
//! Placeholders use the host's `$name` / `${name}` / `${name:format}` forms.
//! Pipeline syntax itself is `$`-prefixed (`$project`, `$gte`, field paths
//! like `$metadata.sensorID`), so only names that actually resolve are
//! replaced; everything else survives byte-for-byte.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{AppError, AppResult};

/// A resolved variable value: one scalar, or the selection of a multi-value
/// variable.
#[derive(Debug, Clone, PartialEq)]
pub enum VarValue {
    Scalar(Value),
    Many(Vec<Value>),
}

impl VarValue {
    pub fn string<S: Into<String>>(s: S) -> Self {
        VarValue::Scalar(Value::String(s.into()))
    }

    pub fn number(n: i64) -> Self {
        VarValue::Scalar(Value::from(n))
    }

    /// Encode for splicing into JSON: scalars via their JSON literal (strings
    /// arrive quoted and escaped), multi-values as a JSON array.
    fn encode_json(&self) -> AppResult<String> {
        let encoded = match self {
            VarValue::Scalar(v) => serde_json::to_string(v),
            VarValue::Many(vs) => serde_json::to_string(vs),
        };
        encoded.map_err(|e| AppError::internal("var_encode".to_string(), e.to_string()))
    }

    /// Raw text form, for `${name:raw}`: strings unquoted, everything else
    /// its JSON literal.
    fn encode_raw(&self) -> AppResult<String> {
        match self {
            VarValue::Scalar(Value::String(s)) => Ok(s.clone()),
            other => other.encode_json(),
        }
    }
}

/// Per-execution variable context (panel repeat vars, built-ins like
/// `__from`/`__to`), distinct from the persisted dashboard variables the
/// engine itself holds.
pub type ScopedVars = HashMap<String, VarValue>;

/// The host templating seam. Injected wherever substitution happens so tests
/// run without a global runtime.
pub trait TemplateEngine {
    fn replace(&self, text: &str, scoped: &ScopedVars) -> AppResult<String>;
}

/// Resolve the pipeline text of one descriptor. An empty pipeline
/// short-circuits to an empty string without touching the engine.
pub fn interpolate_aggregation(
    engine: &dyn TemplateEngine,
    aggregation: &str,
    scoped: &ScopedVars,
) -> AppResult<String> {
    if aggregation.is_empty() {
        return Ok(String::new());
    }
    engine.replace(aggregation, scoped)
}

static VAR_RE: Lazy<Regex> = Lazy::new(|| {
    // ${name} / ${name:format} first so the braced form wins, then bare $name
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::([A-Za-z0-9_]+))?\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("variable pattern")
});

/// Default `TemplateEngine`: dashboard variables registered up front, scoped
/// variables taking precedence per call, JSON-safe output mode.
#[derive(Debug, Clone, Default)]
pub struct VarInterpolator {
    vars: HashMap<String, VarValue>,
}

impl VarInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var<S: Into<String>>(mut self, name: S, value: VarValue) -> Self {
        self.vars.insert(name.into(), value);
        self
    }

    pub fn set_var<S: Into<String>>(&mut self, name: S, value: VarValue) {
        self.vars.insert(name.into(), value);
    }

    fn lookup<'a>(&'a self, name: &str, scoped: &'a ScopedVars) -> Option<&'a VarValue> {
        scoped.get(name).or_else(|| self.vars.get(name))
    }
}

impl TemplateEngine for VarInterpolator {
    fn replace(&self, text: &str, scoped: &ScopedVars) -> AppResult<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0usize;
        for caps in VAR_RE.captures_iter(text) {
            let m = caps.get(0).expect("whole match");
            let (name, format) = match caps.get(1) {
                Some(braced) => (braced.as_str(), caps.get(2).map(|f| f.as_str())),
                None => (caps.get(3).expect("bare name").as_str(), None),
            };
            let Some(value) = self.lookup(name, scoped) else {
                // Not a variable; pipeline operator or unknown name stays as-is
                continue;
            };
            let encoded = match format {
                None | Some("json") => value.encode_json()?,
                Some("raw") => value.encode_raw()?,
                Some(other) => {
                    return Err(AppError::template(
                        "bad_var_format".to_string(),
                        format!("unsupported variable format '{other}' for ${name}"),
                    ))
                }
            };
            out.push_str(&text[last..m.start()]);
            out.push_str(&encoded);
            last = m.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scoped(pairs: &[(&str, VarValue)]) -> ScopedVars {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn string_values_are_quoted_and_escaped() {
        let engine = VarInterpolator::new().with_var("host", VarValue::string(r#"na"ive\box"#));
        let out = engine
            .replace(r#"[{"$match":{"host":$host}}]"#, &ScopedVars::new())
            .unwrap();
        assert_eq!(out, r#"[{"$match":{"host":"na\"ive\\box"}}]"#);
    }

    #[test]
    fn pipeline_operators_survive() {
        let engine = VarInterpolator::new().with_var("sensor", VarValue::string("s1"));
        let text = r#"[{"$project":{"sensorID":"$metadata.sensorID","m":1}},{"$match":{"sensorID":${sensor}}}]"#;
        let out = engine.replace(text, &ScopedVars::new()).unwrap();
        assert_eq!(
            out,
            r#"[{"$project":{"sensorID":"$metadata.sensorID","m":1}},{"$match":{"sensorID":"s1"}}]"#
        );
    }

    #[test]
    fn multi_values_become_arrays() {
        let engine = VarInterpolator::new()
            .with_var("hosts", VarValue::Many(vec![json!("a"), json!("b")]));
        let out = engine
            .replace(r#"{"$in":$hosts}"#, &ScopedVars::new())
            .unwrap();
        assert_eq!(out, r#"{"$in":["a","b"]}"#);
    }

    #[test]
    fn scoped_vars_override_registered_vars() {
        let engine = VarInterpolator::new().with_var("env", VarValue::string("prod"));
        let sv = scoped(&[("env", VarValue::string("staging"))]);
        assert_eq!(engine.replace("$env", &sv).unwrap(), r#""staging""#);
        assert_eq!(engine.replace("$env", &ScopedVars::new()).unwrap(), r#""prod""#);
    }

    #[test]
    fn numbers_splice_bare() {
        let sv = scoped(&[("__from", VarValue::number(1700000000000))]);
        let engine = VarInterpolator::new();
        let out = engine.replace(r#"{"$gte":$__from}"#, &sv).unwrap();
        assert_eq!(out, r#"{"$gte":1700000000000}"#);
    }

    #[test]
    fn raw_format_drops_quotes() {
        let engine = VarInterpolator::new().with_var("coll", VarValue::string("weather"));
        assert_eq!(engine.replace("${coll:raw}", &ScopedVars::new()).unwrap(), "weather");
    }

    #[test]
    fn unsupported_format_is_a_template_error() {
        let engine = VarInterpolator::new().with_var("x", VarValue::string("v"));
        let err = engine.replace("${x:csv}", &ScopedVars::new()).unwrap_err();
        assert!(matches!(err, AppError::Template { .. }));
    }

    #[test]
    fn empty_aggregation_skips_the_engine() {
        struct Exploding;
        impl TemplateEngine for Exploding {
            fn replace(&self, _: &str, _: &ScopedVars) -> AppResult<String> {
                panic!("engine must not be invoked for empty pipelines");
            }
        }
        let out = interpolate_aggregation(&Exploding, "", &ScopedVars::new()).unwrap();
        assert_eq!(out, "");
    }
}
