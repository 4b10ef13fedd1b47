use crate::reference::math::{Ray, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Vertical field of view in degrees.
    Perspective { fovy: f32 },
    /// Height of the image plane in world units.
    Orthographic { height: f32 },
}

/// Committed camera state.
///
/// `(u, v)` screen coordinates run from `(0, 0)` at the bottom left to
/// `(1, 1)` at the top right.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    projection: Projection,
    origin: Vec3,
    dir_00: Vec3,
    dir_du: Vec3,
    dir_dv: Vec3,
}

impl Camera {
    pub fn new(projection: Projection, pos: Vec3, dir: Vec3, up: Vec3, aspect: f32) -> Self {
        let dir = dir.normalized();
        let right = dir.cross(up).normalized();
        let up = right.cross(dir);

        let (width, height) = match projection {
            Projection::Perspective { fovy } => {
                let height = 2.0 * (fovy.to_radians() * 0.5).tan();
                (aspect * height, height)
            }
            Projection::Orthographic { height } => (aspect * height, height),
        };

        let dir_du = right * width;
        let dir_dv = up * height;
        let dir_00 = match projection {
            Projection::Perspective { .. } => dir - dir_du * 0.5 - dir_dv * 0.5,
            Projection::Orthographic { .. } => dir,
        };
        let origin = match projection {
            Projection::Perspective { .. } => pos,
            Projection::Orthographic { .. } => pos - dir_du * 0.5 - dir_dv * 0.5,
        };

        Self {
            projection,
            origin,
            dir_00,
            dir_du,
            dir_dv,
        }
    }

    pub fn ray(&self, u: f32, v: f32) -> Ray {
        match self.projection {
            Projection::Perspective { .. } => Ray {
                origin: self.origin,
                direction: (self.dir_00 + self.dir_du * u + self.dir_dv * v).normalized(),
            },
            Projection::Orthographic { .. } => Ray {
                origin: self.origin + self.dir_du * u + self.dir_dv * v,
                direction: self.dir_00,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_ray_follows_view_direction() {
        let camera = Camera::new(
            Projection::Perspective { fovy: 60.0 },
            Vec3::zero(),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 0.0),
            4.0 / 3.0,
        );
        let ray = camera.ray(0.5, 0.5);
        assert!((ray.direction.z - 1.0).abs() < 1e-6);

        let top = camera.ray(0.5, 1.0);
        assert!(top.direction.y > 0.0);
        // Right-handed: looking down +z with +y up, screen right is -x.
        let right = camera.ray(1.0, 0.5);
        assert!(right.direction.x < 0.0);
    }

    #[test]
    fn orthographic_rays_are_parallel() {
        let camera = Camera::new(
            Projection::Orthographic { height: 2.0 },
            Vec3::zero(),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 0.0),
            1.0,
        );
        let a = camera.ray(0.0, 0.0);
        let b = camera.ray(1.0, 1.0);
        assert_eq!(a.direction, b.direction);
        assert!((b.origin.y - a.origin.y - 2.0).abs() < 1e-6);
    }
}
