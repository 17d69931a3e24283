//! Headless force-simulation host: owns per-node position and velocity and runs
//! the built-in charge, collision and link forces plus any registered custom
//! forces once per tick.

mod forces;
mod octree;

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::config::PhysicsConfig;
use crate::graph::{GraphStore, SystemRegistry};
use crate::math::Vec3;
use crate::util::stable_triple;
use forces::{ChargeParams, CollisionParams, accumulate_charge_for_body, accumulate_collision_pairs};
use octree::OctNode;

const MAX_BODY_RADIUS: f32 = 1.0e6;

/// Host-owned simulation state of one node.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub id: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
}

/// Read-only graph state handed to forces each tick.
#[derive(Clone, Copy)]
pub struct GraphView<'a> {
    pub store: &'a GraphStore,
    pub registry: &'a SystemRegistry,
}

/// A custom force. `apply` runs once per tick after the built-in forces and may
/// only touch body velocities.
pub trait Force: Send {
    fn apply(&self, alpha: f32, view: &GraphView<'_>, bodies: &mut [Body]);
}

#[derive(Clone, Copy, Debug)]
struct LinkSpring {
    source: usize,
    target: usize,
    strength: f32,
    bias: f32,
}

#[derive(Default)]
struct PhysicsScratch {
    velocity_deltas: Vec<Vec3>,
    positions: Vec<Vec3>,
    radii: Vec<f32>,
}

pub struct Simulation {
    config: PhysicsConfig,
    bodies: Vec<Body>,
    index_by_id: HashMap<String, usize>,
    links: Vec<LinkSpring>,
    forces: Vec<(String, Box<dyn Force>)>,
    alpha: f32,
    ticks: u64,
    scratch: PhysicsScratch,
}

impl Simulation {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            bodies: Vec::new(),
            index_by_id: HashMap::new(),
            links: Vec::new(),
            forces: Vec::new(),
            alpha: 1.0,
            ticks: 0,
            scratch: PhysicsScratch::default(),
        }
    }

    /// Installs `force` under `name`, replacing a force already registered
    /// under that name in place.
    pub fn register_force(&mut self, name: impl Into<String>, force: Box<dyn Force>) {
        let name = name.into();
        if let Some(slot) = self.forces.iter_mut().find(|(existing, _)| *existing == name) {
            slot.1 = force;
        } else {
            self.forces.push((name, force));
        }
    }

    pub fn remove_force(&mut self, name: &str) -> bool {
        let before = self.forces.len();
        self.forces.retain(|(existing, _)| existing != name);
        self.forces.len() != before
    }

    pub fn force_names(&self) -> impl Iterator<Item = &str> {
        self.forces.iter().map(|(name, _)| name.as_str())
    }

    /// Brings bodies in line with the store: bodies of surviving nodes keep
    /// their state, new nodes get an initial placement, removed nodes lose
    /// theirs. Reheats the layout.
    pub fn sync(&mut self, store: &GraphStore) {
        let mut prior = self
            .bodies
            .drain(..)
            .map(|body| (body.id.clone(), body))
            .collect::<HashMap<_, _>>();

        let mut created = 0usize;
        for (index, node) in store.nodes().iter().enumerate() {
            let radius =
                (node.weight as f32 + self.config.collide_margin).clamp(0.0, MAX_BODY_RADIUS);
            if let Some(mut body) = prior.remove(&node.id) {
                body.radius = radius;
                self.bodies.push(body);
            } else {
                let position = self.initial_position(&node.id, index);
                self.bodies.push(Body {
                    id: node.id.clone(),
                    position,
                    velocity: Vec3::ZERO,
                    radius,
                });
                created += 1;
            }
        }

        self.index_by_id.clear();
        for (index, body) in self.bodies.iter().enumerate() {
            self.index_by_id.insert(body.id.clone(), index);
        }

        self.rebuild_links(store);
        self.reheat();

        debug!(
            bodies = self.bodies.len(),
            created,
            dropped = prior.len(),
            links = self.links.len(),
            "synced simulation"
        );
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.index_by_id.clear();
        self.links.clear();
        self.reheat();
    }

    /// Moves a body to a known position, e.g. one restored from a snapshot.
    pub fn place(&mut self, id: &str, position: Vec3) -> bool {
        let Some(&index) = self.index_by_id.get(id) else {
            return false;
        };
        if !position.is_finite() {
            return false;
        }
        self.bodies[index].position = position;
        self.bodies[index].velocity = Vec3::ZERO;
        true
    }

    pub fn reheat(&mut self) {
        self.alpha = 1.0;
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_hot(&self) -> bool {
        self.alpha >= self.config.alpha_min
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    pub fn body(&self, id: &str) -> Option<&Body> {
        self.index_by_id.get(id).map(|&index| &self.bodies[index])
    }

    /// Advances one step. Returns whether the layout is still cooling.
    pub fn tick(&mut self, view: &GraphView<'_>) -> bool {
        self.alpha += (self.config.alpha_target - self.alpha) * self.config.alpha_decay();
        self.ticks += 1;
        let alpha = self.alpha;

        if !self.bodies.is_empty() {
            self.apply_builtin_forces(alpha);

            for (name, force) in &self.forces {
                trace!(force = name.as_str(), alpha, "applying force");
                force.apply(alpha, view, &mut self.bodies);
            }

            let retain = 1.0 - self.config.velocity_decay.clamp(0.0, 1.0);
            for body in &mut self.bodies {
                body.velocity *= retain;
                if !body.velocity.is_finite() {
                    body.velocity = Vec3::ZERO;
                }
                body.position += body.velocity;
            }
        }

        self.is_hot()
    }

    fn apply_builtin_forces(&mut self, alpha: f32) {
        let body_count = self.bodies.len();
        let scratch = &mut self.scratch;
        scratch.velocity_deltas.clear();
        scratch.velocity_deltas.resize(body_count, Vec3::ZERO);
        scratch.positions.clear();
        scratch.radii.clear();
        let mut max_radius = 0.0_f32;
        for body in &self.bodies {
            scratch.positions.push(body.position);
            scratch.radii.push(body.radius);
            max_radius = max_radius.max(body.radius);
        }

        let deltas = &mut scratch.velocity_deltas;
        let positions = &scratch.positions;
        let radii = &scratch.radii;

        if body_count > 1
            && let Some(tree) = OctNode::build(positions)
        {
            let distance_min = self.config.charge_distance_min.max(0.0);
            let distance_max = self.config.charge_distance_max.max(distance_min);
            let charge = ChargeParams {
                strength: self.config.charge_strength * alpha,
                distance_min_sq: distance_min * distance_min,
                distance_max_sq: distance_max * distance_max,
                theta: self.config.theta,
            };
            if charge.strength != 0.0 {
                for (index, delta) in deltas.iter_mut().enumerate() {
                    accumulate_charge_for_body(&tree, index, positions, charge, delta);
                }
            }

            let max_collision_distance = max_radius * 2.0;
            if max_collision_distance > 0.0 && self.config.collide_strength > 0.0 {
                accumulate_collision_pairs(
                    &tree,
                    &tree,
                    true,
                    positions,
                    radii,
                    CollisionParams {
                        strength: self.config.collide_strength,
                        max_collision_distance_sq: max_collision_distance * max_collision_distance,
                    },
                    deltas,
                );
            }
        }

        for link in &self.links {
            let source = positions[link.source] + self.bodies[link.source].velocity;
            let target = positions[link.target] + self.bodies[link.target].velocity;
            let delta = target - source;
            let distance = delta.length();
            if distance <= 0.0001 {
                continue;
            }

            let stretch =
                (distance - self.config.link_distance) / distance * alpha * link.strength;
            let correction = delta * stretch;
            deltas[link.target] -= correction * link.bias;
            deltas[link.source] += correction * (1.0 - link.bias);
        }

        for (body, delta) in self.bodies.iter_mut().zip(deltas.iter()) {
            body.velocity += *delta;
        }
    }

    fn rebuild_links(&mut self, store: &GraphStore) {
        let mut pairs = store
            .edges()
            .iter()
            .filter_map(|edge| {
                let source = *self.index_by_id.get(&edge.source)?;
                let target = *self.index_by_id.get(&edge.target)?;
                (source != target).then_some((source.min(target), source.max(target)))
            })
            .collect::<Vec<_>>();
        pairs.sort_unstable();
        pairs.dedup();

        let mut degree = vec![0usize; self.bodies.len()];
        for &(source, target) in &pairs {
            degree[source] += 1;
            degree[target] += 1;
        }

        let scale = self.config.link_strength_scale.max(0.0);
        self.links = pairs
            .into_iter()
            .map(|(source, target)| {
                let source_degree = degree[source] as f32;
                let target_degree = degree[target] as f32;
                LinkSpring {
                    source,
                    target,
                    strength: scale / source_degree.min(target_degree),
                    bias: source_degree / (source_degree + target_degree),
                }
            })
            .collect();
    }

    fn initial_position(&self, id: &str, index: usize) -> Vec3 {
        let mut direction = stable_triple(id).normalize_or_zero();
        if direction == Vec3::ZERO {
            direction = forces::fallback_direction(index, index + 1);
        }
        direction * (self.config.initial_radius * (0.5 + index as f32).cbrt())
    }
}
