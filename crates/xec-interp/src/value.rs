//! Interpolant values: everything a template can embed between literal
//! fragments (spec §4.1).

use crate::quote::single_quote;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use xec_core::XecError;

/// Capability check for a "deferred handle" interpolant (spec §9 "Deferred
/// interpolation"): anything that can force itself to completion and hand
/// back trimmed stdout. `xec-engine`'s `ProcessHandle` implements this; the
/// interpolator never depends on the engine crate directly, avoiding a
/// cyclic dependency.
#[async_trait]
pub trait AwaitedStdout: Send + Sync {
    async fn await_stdout(&self) -> Result<String, XecError>;
}

/// An interpolant: a structured value embedded into a [`crate::Template`]
/// between literal fragments.
#[derive(Clone)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    Seq(Vec<Value>),
    /// Arbitrary structured data, rendered via a deterministic canonical
    /// serialization (spec §9 "Serialization of spec values").
    Structured(serde_json::Value),
    DateTime(DateTime<Utc>),
    /// A deferred handle: forced to completion before rendering, yielding
    /// its trimmed stdout.
    Deferred(Arc<dyn AwaitedStdout>),
}

impl Value {
    /// Render this value quoted for safe shell embedding. May force a
    /// deferred handle to completion (spec §9, testable property §8 item 10).
    pub async fn render_quoted(&self) -> Result<String, XecError> {
        Ok(single_quote(&self.render_text().await?))
    }

    /// Render this value verbatim, with no quoting (`raw` mode). The author
    /// accepts responsibility for shell safety.
    pub async fn render_raw(&self) -> Result<String, XecError> {
        self.render_text().await
    }

    async fn render_text(&self) -> Result<String, XecError> {
        match self {
            Value::Str(s) => Ok(s.clone()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Ok(String::new()),
            Value::Seq(items) => {
                let mut rendered = Vec::with_capacity(items.len());
                for item in items {
                    rendered.push(item.render_text_unquoted_element().await?);
                }
                Ok(rendered.join(" "))
            }
            Value::Structured(json) => canonical_json(json)
                .map_err(|e| XecError::BadInterpolant(format!("cyclic or unrenderable value: {e}"))),
            Value::DateTime(dt) => Ok(dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
            Value::Deferred(handle) => handle.await_stdout().await,
        }
    }

    /// A sequence element renders its own text representation, unquoted;
    /// the *sequence as a whole* is quoted once by the caller (spec §4.1:
    /// "quoted concatenation of element renderings joined by a single
    /// space").
    fn render_text_unquoted_element<'a>(
        &'a self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<String, XecError>> + Send + 'a>>
    {
        Box::pin(self.render_text())
    }
}

/// Deterministic, compact, key-ordered JSON text: lexicographic key
/// ordering on UTF-8 bytes, no pretty-printing, no trailing whitespace
/// (spec §9).
pub fn canonical_json(value: &serde_json::Value) -> Result<String, serde_json::Error> {
    let sorted = sort_keys(value);
    serde_json::to_string(&sorted)
}

fn sort_keys(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<(&String, &serde_json::Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            let mut out = serde_json::Map::new();
            for (k, v) in entries {
                out.insert(k.clone(), sort_keys(v));
            }
            serde_json::Value::Object(out)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(sort_keys).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn null_renders_as_empty_and_is_still_quoted() {
        assert_eq!(Value::Null.render_quoted().await.unwrap(), "''");
    }

    #[tokio::test]
    async fn bool_and_number_render_as_lowercase_decimal_text() {
        assert_eq!(Value::Bool(true).render_text().await.unwrap(), "true");
        assert_eq!(Value::Int(-7).render_text().await.unwrap(), "-7");
        assert_eq!(Value::Float(1.5).render_text().await.unwrap(), "1.5");
    }

    #[tokio::test]
    async fn sequence_joins_quoted_concatenation_with_single_space() {
        let seq = Value::Seq(vec![
            Value::Str("a b".into()),
            Value::Int(2),
            Value::Null,
        ]);
        let rendered = seq.render_quoted().await.unwrap();
        assert_eq!(rendered, "'a b 2 '");
    }

    #[test]
    fn canonical_json_orders_keys_lexicographically() {
        let v = json!({"b": 1, "a": 2, "c": {"z": 1, "a": 2}});
        let text = canonical_json(&v).unwrap();
        assert_eq!(text, r#"{"a":2,"b":1,"c":{"a":2,"z":1}}"#);
    }

    #[tokio::test]
    async fn datetime_renders_extended_iso8601_utc() {
        let dt = DateTime::parse_from_rfc3339("2026-07-28T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let rendered = Value::DateTime(dt).render_text().await.unwrap();
        assert_eq!(rendered, "2026-07-28T12:00:00.000Z");
    }

    struct FakeHandle(&'static str);

    #[async_trait]
    impl AwaitedStdout for FakeHandle {
        async fn await_stdout(&self) -> Result<String, XecError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn deferred_handle_is_forced_before_rendering() {
        let handle: Arc<dyn AwaitedStdout> = Arc::new(FakeHandle("ran to completion"));
        let value = Value::Deferred(handle);
        assert_eq!(
            value.render_text().await.unwrap(),
            "ran to completion"
        );
    }
}
