use crate::reference::geometry::{Hit, Triangle};
use crate::reference::math::{Ray, Vec3};

const LEAF_SIZE: usize = 4;

#[derive(Debug, Clone, Copy)]
struct Aabb {
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    fn around(triangles: &[Triangle]) -> Self {
        triangles.iter().fold(Self::EMPTY, |acc, tri| {
            let [a, b, c] = tri.vertices;
            Self {
                min: acc.min.min(a).min(b).min(c),
                max: acc.max.max(a).max(b).max(c),
            }
        })
    }

    fn longest_axis(&self) -> usize {
        let extent = self.max - self.min;
        if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        }
    }

    /// Slab test against `[t_min, t_max]`.
    fn hit(&self, ray: &Ray, mut t_min: f32, mut t_max: f32) -> bool {
        for axis in 0..3 {
            let origin = ray.origin[axis];
            let direction = ray.direction[axis];
            if direction == 0.0 {
                if origin < self.min[axis] || origin > self.max[axis] {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / direction;
            let (mut near, mut far) = ((self.min[axis] - origin) * inv, (self.max[axis] - origin) * inv);
            if inv < 0.0 {
                std::mem::swap(&mut near, &mut far);
            }
            t_min = t_min.max(near);
            t_max = t_max.min(far);
            // Flat boxes (a single axis-aligned triangle) have t_min == t_max.
            if t_max < t_min {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf { bounds: Aabb, start: usize, end: usize },
    Inner { bounds: Aabb, left: usize, right: usize },
}

impl Node {
    fn bounds(&self) -> &Aabb {
        match self {
            Node::Leaf { bounds, .. } | Node::Inner { bounds, .. } => bounds,
        }
    }
}

/// Bounding volume hierarchy over a model's triangles.
///
/// Built once when a model is committed. Triangles are reordered so every
/// leaf owns a contiguous range; nodes live in one flat vector.
pub struct Bvh {
    triangles: Vec<Triangle>,
    nodes: Vec<Node>,
}

impl Bvh {
    pub fn new(mut triangles: Vec<Triangle>) -> Self {
        let mut nodes = Vec::new();
        if !triangles.is_empty() {
            let len = triangles.len();
            build(&mut nodes, &mut triangles, 0, len);
        }
        Self { triangles, nodes }
    }

    /// Closest intersection in `[t_min, t_max]`.
    pub fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<Hit> {
        let mut closest: Option<Hit> = None;
        self.traverse(ray, t_min, t_max, |tri, limit| {
            let hit = tri.hit(ray, t_min, limit)?;
            let t = hit.t;
            closest = Some(hit);
            Some(t)
        });
        closest
    }

    /// Whether anything blocks the ray in `[t_min, t_max]`.
    pub fn occluded(&self, ray: &Ray, t_min: f32, t_max: f32) -> bool {
        let mut blocked = false;
        self.traverse(ray, t_min, t_max, |tri, limit| {
            if blocked {
                return None;
            }
            blocked = tri.hit(ray, t_min, limit).is_some();
            // Shrinking the interval to t_min stops the traversal.
            blocked.then_some(t_min)
        });
        blocked
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Visits candidate triangles; `visit` returns a new far limit on a hit.
    fn traverse(&self, ray: &Ray, t_min: f32, t_max: f32, mut visit: impl FnMut(&Triangle, f32) -> Option<f32>) {
        if self.nodes.is_empty() {
            return;
        }
        let mut limit = t_max;
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if limit <= t_min || !node.bounds().hit(ray, t_min, limit) {
                continue;
            }
            match *node {
                Node::Leaf { start, end, .. } => {
                    for tri in &self.triangles[start..end] {
                        if let Some(t) = visit(tri, limit) {
                            limit = t;
                        }
                    }
                }
                Node::Inner { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
    }
}

/// Builds the subtree over `triangles[start..end]` and returns its node index.
fn build(nodes: &mut Vec<Node>, triangles: &mut [Triangle], start: usize, end: usize) -> usize {
    let bounds = Aabb::around(&triangles[start..end]);
    let index = nodes.len();
    if end - start <= LEAF_SIZE {
        nodes.push(Node::Leaf { bounds, start, end });
        return index;
    }

    let axis = bounds.longest_axis();
    triangles[start..end].sort_by(|a, b| a.centroid()[axis].total_cmp(&b.centroid()[axis]));

    // Reserve the slot; children are filled in after recursion.
    nodes.push(Node::Leaf { bounds, start, end });
    let mid = start + (end - start) / 2;
    let left = build(nodes, triangles, start, mid);
    let right = build(nodes, triangles, mid, end);
    nodes[index] = Node::Inner { bounds, left, right };
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::geometry::DEFAULT_COLOR;

    fn quad_row(count: usize) -> Vec<Triangle> {
        (0..count)
            .map(|i| {
                let x = i as f32 * 2.0;
                Triangle {
                    vertices: [
                        Vec3::new(x, 0.0, 5.0),
                        Vec3::new(x + 1.0, 0.0, 5.0),
                        Vec3::new(x, 1.0, 5.0),
                    ],
                    colors: [DEFAULT_COLOR; 3],
                }
            })
            .collect()
    }

    fn ray_at(x: f32) -> Ray {
        Ray {
            origin: Vec3::new(x, 0.25, 0.0),
            direction: Vec3::new(0.0, 0.0, 1.0),
        }
    }

    #[test]
    fn finds_every_triangle_through_the_tree() {
        let bvh = Bvh::new(quad_row(17));
        for i in 0..17 {
            let hit = bvh.hit(&ray_at(i as f32 * 2.0 + 0.25), 0.0, f32::INFINITY);
            assert!(hit.is_some(), "triangle {i}");
        }
        assert!(bvh.hit(&ray_at(1.5), 0.0, f32::INFINITY).is_none());
    }

    #[test]
    fn closest_hit_wins() {
        let mut triangles = quad_row(1);
        let mut near = triangles[0].clone();
        for v in &mut near.vertices {
            v.z = 2.0;
        }
        triangles.push(near);
        let bvh = Bvh::new(triangles);
        let hit = bvh.hit(&ray_at(0.25), 0.0, f32::INFINITY).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-5);
    }

    #[test]
    fn occlusion_respects_the_distance_limit() {
        let bvh = Bvh::new(quad_row(8));
        assert!(bvh.occluded(&ray_at(0.25), 0.0, 10.0));
        assert!(!bvh.occluded(&ray_at(0.25), 0.0, 4.0));
        assert!(!Bvh::new(Vec::new()).occluded(&ray_at(0.25), 0.0, 10.0));
    }
}
