use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GalaxyError, GalaxyResult};

pub const DEFAULT_NODE_WEIGHT: f64 = 5.0;

/// Weights must survive conversion to the `f32` the layout runs on.
pub(crate) fn weight_in_range(weight: f64) -> bool {
    weight.is_finite() && weight.abs() <= f64::from(f32::MAX)
}

fn default_weight() -> f64 {
    DEFAULT_NODE_WEIGHT
}

/// One merge unit produced by a single analysis call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBatch {
    #[serde(default)]
    pub nodes: Vec<BatchNode>,
    #[serde(default)]
    pub links: Vec<BatchLink>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchNode {
    pub id: String,
    #[serde(alias = "work")]
    pub system: String,
    #[serde(default = "default_weight", alias = "size")]
    pub weight: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchLink {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Node,
    Link,
}

/// A batch item dropped without affecting the rest of its batch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rejected {
    pub kind: ItemKind,
    pub index: usize,
    pub reason: String,
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ItemKind::Node => "node",
            ItemKind::Link => "link",
        };
        write!(f, "{kind} #{}: {}", self.index, self.reason)
    }
}

/// A batch decoded from raw JSON together with the entries that could not be
/// decoded at all.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedBatch {
    pub batch: AnalysisBatch,
    pub rejected: Vec<Rejected>,
}

impl From<AnalysisBatch> for ParsedBatch {
    fn from(batch: AnalysisBatch) -> Self {
        Self {
            batch,
            rejected: Vec::new(),
        }
    }
}

impl BatchNode {
    pub fn new(id: impl Into<String>, system: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            system: system.into(),
            weight,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.id.trim().is_empty() {
            return Err("missing id");
        }
        if self.system.trim().is_empty() {
            return Err("missing system");
        }
        if !weight_in_range(self.weight) {
            return Err("weight is not a finite single-precision number");
        }
        Ok(())
    }
}

impl BatchLink {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: label.into(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.source.trim().is_empty() {
            return Err("missing source");
        }
        if self.target.trim().is_empty() {
            return Err("missing target");
        }
        Ok(())
    }
}

impl AnalysisBatch {
    /// Decodes a `{nodes, links}` payload, keeping every well-formed entry.
    ///
    /// Only a payload that is not a JSON object, or whose `nodes`/`links` are
    /// not arrays, fails as a whole.
    pub fn from_json(raw: &str) -> GalaxyResult<ParsedBatch> {
        let parsed: Value = serde_json::from_str(raw)?;
        Self::from_value(&parsed)
    }

    pub fn read_from(path: &Path) -> GalaxyResult<ParsedBatch> {
        let raw = fs::read_to_string(path).map_err(|error| GalaxyError::io(path, error))?;
        Self::from_json(&raw)
    }

    pub fn from_value(value: &Value) -> GalaxyResult<ParsedBatch> {
        let object = value
            .as_object()
            .ok_or_else(|| GalaxyError::InvalidBatch("expected a JSON object".to_owned()))?;

        let mut parsed = ParsedBatch::default();

        for (index, entry) in entries(object.get("nodes"), "nodes")?.iter().enumerate() {
            match BatchNode::deserialize(entry) {
                Ok(node) => parsed.batch.nodes.push(node),
                Err(error) => parsed.rejected.push(Rejected {
                    kind: ItemKind::Node,
                    index,
                    reason: error.to_string(),
                }),
            }
        }

        for (index, entry) in entries(object.get("links"), "links")?.iter().enumerate() {
            match BatchLink::deserialize(entry) {
                Ok(link) => parsed.batch.links.push(link),
                Err(error) => parsed.rejected.push(Rejected {
                    kind: ItemKind::Link,
                    index,
                    reason: error.to_string(),
                }),
            }
        }

        Ok(parsed)
    }
}

fn entries<'a>(value: Option<&'a Value>, field: &str) -> GalaxyResult<&'a [Value]> {
    match value {
        None | Some(Value::Null) => Ok(&[][..]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(GalaxyError::InvalidBatch(format!(
            "`{field}` must be an array"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_entries_are_rejected_individually() {
        let parsed = AnalysisBatch::from_json(
            r#"{
                "nodes": [
                    {"id": "Jonathan Harker", "system": "Dracula", "weight": 8},
                    {"system": "Dracula", "weight": 2},
                    {"id": "Renfield", "work": "Dracula", "size": 4}
                ],
                "links": [
                    {"source": "Jonathan Harker", "target": "Renfield", "label": "visits"},
                    {"source": "Jonathan Harker"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(parsed.batch.nodes.len(), 2);
        assert_eq!(parsed.batch.nodes[1], BatchNode::new("Renfield", "Dracula", 4.0));
        assert_eq!(parsed.batch.links.len(), 1);
        assert_eq!(parsed.rejected.len(), 2);
        assert_eq!(parsed.rejected[0].kind, ItemKind::Node);
        assert_eq!(parsed.rejected[0].index, 1);
        assert_eq!(parsed.rejected[1].kind, ItemKind::Link);
        assert_eq!(parsed.rejected[1].index, 1);
    }

    #[test]
    fn missing_weight_and_label_take_defaults() {
        let parsed = AnalysisBatch::from_json(
            r#"{"nodes": [{"id": "A", "system": "S"}], "links": [{"source": "A", "target": "B"}]}"#,
        )
        .unwrap();

        assert_eq!(parsed.batch.nodes[0].weight, DEFAULT_NODE_WEIGHT);
        assert_eq!(parsed.batch.links[0].label, "");
        assert!(parsed.rejected.is_empty());
    }

    #[test]
    fn missing_sections_are_empty() {
        let parsed = AnalysisBatch::from_json("{}").unwrap();
        assert!(parsed.batch.nodes.is_empty());
        assert!(parsed.batch.links.is_empty());
    }

    #[test]
    fn non_object_payload_fails_whole() {
        assert!(matches!(
            AnalysisBatch::from_json("[1, 2]"),
            Err(GalaxyError::InvalidBatch(_))
        ));
        assert!(matches!(
            AnalysisBatch::from_json(r#"{"nodes": 3}"#),
            Err(GalaxyError::InvalidBatch(_))
        ));
        assert!(matches!(
            AnalysisBatch::from_json("not json"),
            Err(GalaxyError::Json(_))
        ));
    }

    #[test]
    fn validation_catches_blank_fields() {
        assert!(BatchNode::new("", "S", 1.0).validate().is_err());
        assert!(BatchNode::new("A", " ", 1.0).validate().is_err());
        assert!(BatchNode::new("A", "S", f64::NAN).validate().is_err());
        assert!(BatchNode::new("A", "S", 1.0).validate().is_ok());
        assert!(BatchLink::new("A", "", "x").validate().is_err());
        assert!(BatchLink::new("A", "B", "").validate().is_ok());
    }

    #[test]
    fn weights_beyond_single_precision_are_rejected() {
        assert!(BatchNode::new("A", "S", 1e300).validate().is_err());
        assert!(BatchNode::new("A", "S", -1e300).validate().is_err());
        assert!(BatchNode::new("A", "S", f64::from(f32::MAX)).validate().is_ok());
    }
}
