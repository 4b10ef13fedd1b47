use crate::reference::math::{Ray, Vec3};

pub const DEFAULT_COLOR: [f32; 4] = [0.8, 0.8, 0.8, 1.0];

#[derive(Debug, Clone, Copy)]
pub struct Hit {
    pub t: f32,
    pub point: Vec3,
    /// Geometric normal, flipped to face the incoming ray.
    pub normal: Vec3,
    pub color: [f32; 4],
}

#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vec3; 3],
    pub colors: [[f32; 4]; 3],
}

impl Triangle {
    pub fn centroid(&self) -> Vec3 {
        (self.vertices[0] + self.vertices[1] + self.vertices[2]) / 3.0
    }

    pub fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<Hit> {
        let [a, b, c] = self.vertices;
        let edge1 = b - a;
        let edge2 = c - a;
        let p = ray.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < 1e-9 {
            return None;
        }
        let inv_det = 1.0 / det;

        let s = ray.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = ray.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(q) * inv_det;
        if t < t_min || t > t_max {
            return None;
        }

        let mut normal = edge1.cross(edge2).normalized();
        if normal.dot(ray.direction) > 0.0 {
            normal = -normal;
        }

        let w = 1.0 - u - v;
        let mut color = [0.0; 4];
        for (i, channel) in color.iter_mut().enumerate() {
            *channel = w * self.colors[0][i] + u * self.colors[1][i] + v * self.colors[2][i];
        }

        Some(Hit {
            t,
            point: ray.at(t),
            normal,
            color,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Triangle {
        Triangle {
            vertices: [
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(0.0, 1.0, 1.0),
            ],
            colors: [[1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0]],
        }
    }

    #[test]
    fn hit_interpolates_vertex_colors() {
        let ray = Ray {
            origin: Vec3::new(0.25, 0.25, 0.0),
            direction: Vec3::new(0.0, 0.0, 1.0),
        };
        let hit = unit_triangle().hit(&ray, 0.0, f32::INFINITY).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-6);
        assert!((hit.color[0] - 0.5).abs() < 1e-6);
        assert!((hit.color[1] - 0.25).abs() < 1e-6);
        assert!((hit.color[2] - 0.25).abs() < 1e-6);
        assert!(hit.normal.dot(ray.direction) < 0.0);
    }

    #[test]
    fn miss_outside_the_edges() {
        let ray = Ray {
            origin: Vec3::new(0.8, 0.8, 0.0),
            direction: Vec3::new(0.0, 0.0, 1.0),
        };
        assert!(unit_triangle().hit(&ray, 0.0, f32::INFINITY).is_none());
    }
}
