use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::batch::DEFAULT_NODE_WEIGHT;
use super::registry::SystemRecord;
use super::store::{Edge, Node};
use crate::error::{GalaxyError, GalaxyResult};
use crate::math::{Vec3, optional_point, point, vec3};

fn default_weight() -> f64 {
    DEFAULT_NODE_WEIGHT
}

/// Serializable form of a whole session, consumed by save/load.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
    #[serde(default, rename = "systemMeta", alias = "work_meta")]
    pub system_meta: BTreeMap<String, SystemMeta>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "NodeRecordRepr")]
pub struct NodeRecord {
    pub id: String,
    pub systems: Vec<String>,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none", with = "optional_point")]
    pub position: Option<Vec3>,
}

/// Accepted shape of a saved node. Older saves keep the layout as flat
/// `x`/`y`/`z` fields next to the id.
#[derive(Deserialize)]
struct NodeRecordRepr {
    id: String,
    #[serde(alias = "workList")]
    systems: Vec<String>,
    #[serde(default = "default_weight", alias = "size")]
    weight: f64,
    #[serde(default, with = "optional_point")]
    position: Option<Vec3>,
    x: Option<f32>,
    y: Option<f32>,
    z: Option<f32>,
}

impl From<NodeRecordRepr> for NodeRecord {
    fn from(repr: NodeRecordRepr) -> Self {
        let flat = match (repr.x, repr.y, repr.z) {
            (Some(x), Some(y), Some(z)) => Some(vec3(x, y, z)),
            _ => None,
        };
        Self {
            id: repr.id,
            systems: repr.systems,
            weight: repr.weight,
            position: repr.position.or(flat),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source: EndpointRef,
    pub target: EndpointRef,
    #[serde(default)]
    pub label: String,
}

/// A link endpoint as found in saved graphs: either a bare id or the node
/// object itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EndpointRef {
    Id(String),
    Embedded { id: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemMeta {
    pub color: String,
    #[serde(with = "point")]
    pub center: Vec3,
}

impl EndpointRef {
    pub fn into_id(self) -> String {
        match self {
            Self::Id(id) | Self::Embedded { id } => id,
        }
    }
}

impl LinkRecord {
    pub(crate) fn into_edge(self) -> Edge {
        Edge {
            source: self.source.into_id(),
            target: self.target.into_id(),
            label: self.label,
        }
    }
}

impl From<&Edge> for LinkRecord {
    fn from(edge: &Edge) -> Self {
        Self {
            source: EndpointRef::Id(edge.source.clone()),
            target: EndpointRef::Id(edge.target.clone()),
            label: edge.label.clone(),
        }
    }
}

impl NodeRecord {
    pub(crate) fn from_node(node: &Node, position: Option<Vec3>) -> Self {
        Self {
            id: node.id.clone(),
            systems: node.systems.clone(),
            weight: node.weight,
            position,
        }
    }

    pub(crate) fn into_node(self) -> (Node, Option<Vec3>) {
        let node = Node {
            id: self.id,
            systems: self.systems,
            weight: self.weight,
        };
        (node, self.position)
    }
}

impl SystemMeta {
    pub(crate) fn into_record(self, name: String) -> SystemRecord {
        SystemRecord {
            name,
            color: self.color,
            center: self.center,
        }
    }
}

impl From<&SystemRecord> for SystemMeta {
    fn from(record: &SystemRecord) -> Self {
        Self {
            color: record.color.clone(),
            center: record.center,
        }
    }
}

impl GraphSnapshot {
    pub fn from_json(raw: &str) -> GalaxyResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json_pretty(&self) -> GalaxyResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn read_from(path: &Path) -> GalaxyResult<Self> {
        let raw = fs::read_to_string(path).map_err(|error| GalaxyError::io(path, error))?;
        Self::from_json(&raw)
    }

    pub fn write_to(&self, path: &Path) -> GalaxyResult<()> {
        let raw = self.to_json_pretty()?;
        fs::write(path, raw).map_err(|error| GalaxyError::io(path, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_legacy_layout() {
        let snapshot = GraphSnapshot::from_json(
            r##"{
                "nodes": [
                    {"id": "A", "workList": ["Dracula", "Carmilla"], "size": 12, "x": 4},
                    {"id": "B", "systems": ["Dracula"]}
                ],
                "links": [
                    {"source": {"id": "A", "x": 1, "vx": 0}, "target": "B", "label": "hunts"}
                ],
                "work_meta": {
                    "Dracula": {"color": "#00ffcc", "center": {"x": 1, "y": 2, "z": 3}}
                }
            }"##,
        )
        .unwrap();

        assert_eq!(snapshot.nodes[0].systems, ["Dracula", "Carmilla"]);
        assert_eq!(snapshot.nodes[0].weight, 12.0);
        assert_eq!(snapshot.nodes[1].weight, DEFAULT_NODE_WEIGHT);
        assert_eq!(
            snapshot.links[0].source,
            EndpointRef::Embedded { id: "A".to_owned() }
        );
        assert_eq!(
            snapshot.links[0].clone().into_edge(),
            Edge::new("A", "B", "hunts")
        );
        assert_eq!(snapshot.system_meta["Dracula"].center, vec3(1.0, 2.0, 3.0));
    }

    #[test]
    fn flat_coordinates_become_a_position() {
        let snapshot = GraphSnapshot::from_json(
            r#"{
                "nodes": [
                    {"id": "A", "workList": ["Dracula"], "x": 4.5, "y": -2, "z": 10},
                    {"id": "B", "systems": ["Dracula"], "position": {"x": 1, "y": 1, "z": 1}, "x": 9, "y": 9, "z": 9},
                    {"id": "C", "systems": ["Dracula"], "x": 3, "y": 3}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(snapshot.nodes[0].position, Some(vec3(4.5, -2.0, 10.0)));
        assert_eq!(snapshot.nodes[1].position, Some(vec3(1.0, 1.0, 1.0)));
        assert_eq!(snapshot.nodes[2].position, None);

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            value["nodes"][0]["position"],
            serde_json::json!({"x": 4.5, "y": -2.0, "z": 10.0})
        );
        assert!(value["nodes"][0].get("x").is_none());
        assert!(value["nodes"][2].get("position").is_none());
    }

    #[test]
    fn writes_system_meta_key_and_bare_ids() {
        let mut snapshot = GraphSnapshot::default();
        snapshot
            .links
            .push(LinkRecord::from(&Edge::new("A", "B", "x")));
        snapshot.system_meta.insert(
            "S".to_owned(),
            SystemMeta {
                color: "#fff".to_owned(),
                center: Vec3::ZERO,
            },
        );

        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value.get("systemMeta").is_some());
        assert_eq!(value["links"][0]["source"], "A");
    }
}
