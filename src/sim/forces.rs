use std::f32::consts::TAU;

use super::octree::OctNode;
use crate::math::{Vec3, vec3};

#[derive(Clone, Copy, Debug)]
pub(super) struct ChargeParams {
    /// Charge strength already scaled by alpha. Negative repels.
    pub(super) strength: f32,
    pub(super) distance_min_sq: f32,
    pub(super) distance_max_sq: f32,
    pub(super) theta: f32,
}

#[derive(Clone, Copy, Debug)]
pub(super) struct CollisionParams {
    pub(super) strength: f32,
    pub(super) max_collision_distance_sq: f32,
}

/// Unit direction for two coincident bodies, antisymmetric in its arguments.
pub(super) fn fallback_direction(from: usize, to: usize) -> Vec3 {
    let (low, high, sign) = if from <= to {
        (from, to, 1.0)
    } else {
        (to, from, -1.0)
    };
    let azimuth = ((low as f32) * 0.618_034 + (high as f32) * 0.414_214) * TAU;
    let polar = ((low as f32) * 0.414_214 + (high as f32) * 0.618_034 + 0.25) * TAU;
    vec3(
        azimuth.cos() * polar.sin(),
        azimuth.sin() * polar.sin(),
        polar.cos(),
    ) * sign
}

fn charge_between(delta: Vec3, weight: f32, params: ChargeParams) -> Vec3 {
    let mut distance_sq = delta.length_squared();
    if distance_sq >= params.distance_max_sq {
        return Vec3::ZERO;
    }
    if distance_sq < params.distance_min_sq {
        distance_sq = (params.distance_min_sq * distance_sq).sqrt();
    }
    delta * (params.strength * weight / distance_sq)
}

pub(super) fn accumulate_charge_for_body(
    node: &OctNode,
    index: usize,
    positions: &[Vec3],
    params: ChargeParams,
    velocity_delta: &mut Vec3,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index == index {
                continue;
            }
            let mut delta = positions[other_index] - point;
            if delta.length_squared() <= 1e-12 {
                delta = fallback_direction(other_index, index) * 1e-3;
            }
            *velocity_delta += charge_between(delta, 1.0, params);
        }
        return;
    }

    let delta = node.center_of_mass - point;
    let distance = delta.length().max(0.0001);
    let can_approximate = !node.bounds.contains(point)
        && ((node.bounds.side_length() / distance) < params.theta)
        && node.mass > 1.0;

    if can_approximate {
        *velocity_delta += charge_between(delta, node.mass, params);
        return;
    }

    for child in node.children() {
        accumulate_charge_for_body(child, index, positions, params, velocity_delta);
    }
}

fn collide_pair(
    from: usize,
    to: usize,
    positions: &[Vec3],
    radii: &[f32],
    params: CollisionParams,
    velocity_deltas: &mut [Vec3],
) {
    let min_distance = radii[from] + radii[to];
    if !min_distance.is_finite() {
        return;
    }
    let mut delta = positions[from] - positions[to];
    let mut distance = delta.length();
    if distance >= min_distance {
        return;
    }
    if distance <= 0.0001 {
        delta = fallback_direction(to, from) * 0.0001;
        distance = 0.0001;
    }

    let overlap = (min_distance - distance) / distance * params.strength;
    let from_sq = radii[from] * radii[from];
    let to_sq = radii[to] * radii[to];
    let total = (from_sq + to_sq).max(f32::EPSILON);
    let push = delta * overlap;

    velocity_deltas[from] += push * (to_sq / total);
    velocity_deltas[to] -= push * (from_sq / total);
}

pub(super) fn accumulate_collision_pairs(
    node_a: &OctNode,
    node_b: &OctNode,
    same_node: bool,
    positions: &[Vec3],
    radii: &[f32],
    params: CollisionParams,
    velocity_deltas: &mut [Vec3],
) {
    if node_a.bounds.distance_sq_to(node_b.bounds) > params.max_collision_distance_sq {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[offset + 1..] {
                    collide_pair(from, to, positions, radii, params, velocity_deltas);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    collide_pair(from, to, positions, radii, params, velocity_deltas);
                }
            }
        }
        return;
    }

    if same_node {
        let children = node_a.children().collect::<Vec<_>>();
        for (first, child_a) in children.iter().enumerate() {
            accumulate_collision_pairs(
                child_a,
                child_a,
                true,
                positions,
                radii,
                params,
                velocity_deltas,
            );
            for child_b in &children[first + 1..] {
                accumulate_collision_pairs(
                    child_a,
                    child_b,
                    false,
                    positions,
                    radii,
                    params,
                    velocity_deltas,
                );
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.bounds.half_extent >= node_b.bounds.half_extent
    };

    if split_a {
        for child in node_a.children() {
            accumulate_collision_pairs(
                child,
                node_b,
                false,
                positions,
                radii,
                params,
                velocity_deltas,
            );
        }
    } else {
        for child in node_b.children() {
            accumulate_collision_pairs(
                node_a,
                child,
                false,
                positions,
                radii,
                params,
                velocity_deltas,
            );
        }
    }
}
