use crate::graph::{Node, SystemRegistry};
use crate::math::Vec3;
use crate::sim::{Body, Force, GraphView};

/// Pulls every node toward the mean anchor of the systems it belongs to.
///
/// Nodes shared by several systems settle between their clusters. The force
/// keeps no state of its own; the store and registry arrive through the
/// [`GraphView`] on each tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterForce {
    strength: f32,
}

impl ClusterForce {
    pub const NAME: &'static str = "cluster";

    pub fn new(strength: f32) -> Self {
        Self { strength }
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Mean center of the node's registered systems. Systems without a record
    /// are left out of the average; `None` when none are registered.
    pub fn centroid(node: &Node, registry: &SystemRegistry) -> Option<Vec3> {
        let mut sum = Vec3::ZERO;
        let mut count = 0usize;
        for system in &node.systems {
            if let Some(record) = registry.get(system) {
                sum += record.center;
                count += 1;
            }
        }
        (count > 0).then(|| sum / count as f32)
    }
}

impl Force for ClusterForce {
    fn apply(&self, alpha: f32, view: &GraphView<'_>, bodies: &mut [Body]) {
        let scale = alpha * self.strength;
        if scale == 0.0 {
            return;
        }

        for body in bodies {
            let Some(node) = view.store.node(&body.id) else {
                continue;
            };
            let Some(centroid) = Self::centroid(node, view.registry) else {
                continue;
            };
            body.velocity += (centroid - body.position) * scale;
        }
    }
}
