use std::collections::HashMap;

use serde::Serialize;

use crate::config::ShellConfig;
use crate::graph::{GraphStore, SystemRegistry};
use crate::math::{Vec3, point};

/// Spherical boundary drawn around one system's cluster.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Shell {
    pub name: String,
    pub color: String,
    #[serde(serialize_with = "point::serialize")]
    pub center: Vec3,
    pub radius: f32,
    pub members: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShellProjector {
    base_radius: f32,
    per_member_radius: f32,
}

impl Default for ShellProjector {
    fn default() -> Self {
        Self::new(&ShellConfig::default())
    }
}

impl ShellProjector {
    pub fn new(config: &ShellConfig) -> Self {
        Self {
            base_radius: config.base_radius,
            per_member_radius: config.per_member_radius,
        }
    }

    /// One shell per registered system with at least one member, in
    /// registration order.
    pub fn compute(&self, store: &GraphStore, registry: &SystemRegistry) -> Vec<Shell> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for node in store.nodes() {
            for system in &node.systems {
                *counts.entry(system.as_str()).or_default() += 1;
            }
        }

        registry
            .iter()
            .filter_map(|record| {
                let members = counts.get(record.name.as_str()).copied().unwrap_or(0);
                (members > 0).then(|| Shell {
                    name: record.name.clone(),
                    color: record.color.clone(),
                    center: record.center,
                    radius: self.base_radius + (members as f32 * self.per_member_radius),
                    members,
                })
            })
            .collect()
    }
}
