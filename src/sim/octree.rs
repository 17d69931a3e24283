use crate::math::{Vec3, vec3};

const OCTREE_LEAF_CAPACITY: usize = 12;
const OCTREE_MAX_DEPTH: usize = 10;

#[derive(Clone, Copy, Debug)]
pub(super) struct OctBounds {
    pub(super) center: Vec3,
    pub(super) half_extent: f32,
}

impl OctBounds {
    fn from_points(points: &[Vec3]) -> Option<Self> {
        let mut min = Vec3::INFINITY;
        let mut max = Vec3::NEG_INFINITY;

        for point in points {
            min = min.min(*point);
            max = max.max(*point);
        }

        if !min.is_finite() || !max.is_finite() {
            return None;
        }

        let center = (min + max) * 0.5;
        let span = (max - min).max(Vec3::ONE);
        let half_extent = (span.max_element() * 0.5) + 1.0;

        Some(Self {
            center,
            half_extent,
        })
    }

    pub(super) fn contains(self, point: Vec3) -> bool {
        let delta = point - self.center;
        delta.x.abs() <= self.half_extent
            && delta.y.abs() <= self.half_extent
            && delta.z.abs() <= self.half_extent
    }

    fn child(self, octant: usize) -> Self {
        let quarter = self.half_extent * 0.5;
        let axis = |bit: usize| if octant & bit == 0 { -quarter } else { quarter };

        Self {
            center: self.center + vec3(axis(1), axis(2), axis(4)),
            half_extent: quarter,
        }
    }

    fn octant_for(self, point: Vec3) -> usize {
        let mut octant = 0;
        if point.x >= self.center.x {
            octant |= 1;
        }
        if point.y >= self.center.y {
            octant |= 2;
        }
        if point.z >= self.center.z {
            octant |= 4;
        }
        octant
    }

    pub(super) fn side_length(self) -> f32 {
        self.half_extent * 2.0
    }

    pub(super) fn distance_sq_to(self, other: Self) -> f32 {
        let reach = self.half_extent + other.half_extent;
        let gap = |a: f32, b: f32| ((a - b).abs() - reach).max(0.0);
        let dx = gap(self.center.x, other.center.x);
        let dy = gap(self.center.y, other.center.y);
        let dz = gap(self.center.z, other.center.z);
        (dx * dx) + (dy * dy) + (dz * dz)
    }
}

pub(super) struct OctNode {
    pub(super) bounds: OctBounds,
    pub(super) center_of_mass: Vec3,
    pub(super) mass: f32,
    pub(super) indices: Vec<usize>,
    pub(super) children: [Option<Box<OctNode>>; 8],
}

impl OctNode {
    pub(super) fn build(positions: &[Vec3]) -> Option<Self> {
        let bounds = OctBounds::from_points(positions)?;
        let indices = (0..positions.len()).collect::<Vec<_>>();
        Some(Self::build_node(bounds, indices, positions, 0))
    }

    fn build_node(bounds: OctBounds, indices: Vec<usize>, positions: &[Vec3], depth: usize) -> Self {
        let mut center_of_mass = Vec3::ZERO;
        for &index in &indices {
            center_of_mass += positions[index];
        }

        let mass = indices.len() as f32;
        if mass > 0.0 {
            center_of_mass /= mass;
        }

        let mut node = Self {
            bounds,
            center_of_mass,
            mass,
            indices,
            children: std::array::from_fn(|_| None),
        };

        if depth >= OCTREE_MAX_DEPTH || node.indices.len() <= OCTREE_LEAF_CAPACITY {
            return node;
        }

        let mut buckets = std::array::from_fn::<_, 8, _>(|_| Vec::new());
        for &index in &node.indices {
            let octant = bounds.octant_for(positions[index]);
            buckets[octant].push(index);
        }

        let non_empty = buckets.iter().filter(|bucket| !bucket.is_empty()).count();
        if non_empty <= 1 {
            return node;
        }

        for (octant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }

            node.children[octant] = Some(Box::new(Self::build_node(
                bounds.child(octant),
                bucket,
                positions,
                depth + 1,
            )));
        }
        node.indices.clear();
        node
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(|child| child.is_none())
    }

    pub(super) fn children(&self) -> impl Iterator<Item = &OctNode> {
        self.children.iter().filter_map(|child| child.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_indices(node: &OctNode, out: &mut Vec<usize>) {
        out.extend_from_slice(&node.indices);
        for child in node.children() {
            leaf_indices(child, out);
        }
    }

    #[test]
    fn every_point_lands_in_exactly_one_leaf() {
        let positions = (0..200)
            .map(|index| {
                let t = index as f32;
                vec3((t * 7.3).sin() * 300.0, (t * 1.7).cos() * 300.0, t - 100.0)
            })
            .collect::<Vec<_>>();

        let tree = OctNode::build(&positions).unwrap();
        assert_eq!(tree.mass, 200.0);
        assert!(!tree.is_leaf());

        let mut indices = Vec::new();
        leaf_indices(&tree, &mut indices);
        indices.sort_unstable();
        assert_eq!(indices, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn empty_or_non_finite_input_has_no_tree() {
        assert!(OctNode::build(&[]).is_none());
        assert!(OctNode::build(&[vec3(f32::NAN, 0.0, 0.0)]).is_none());
    }

    #[test]
    fn bounds_distance() {
        let a = OctBounds {
            center: Vec3::ZERO,
            half_extent: 1.0,
        };
        let b = OctBounds {
            center: vec3(5.0, 0.0, 0.0),
            half_extent: 1.0,
        };
        assert_eq!(a.distance_sq_to(b), 9.0);
        assert_eq!(a.distance_sq_to(a), 0.0);
        assert!(a.contains(vec3(1.0, -1.0, 0.5)));
        assert!(!a.contains(vec3(1.5, 0.0, 0.0)));
    }
}
