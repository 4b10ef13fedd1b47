use crate::frame::{encode_pixel, Channels, Frame, FrameBufferFormat, Pixels, Size};
use crate::reference::bvh::Bvh;
use crate::reference::camera::Camera;
use crate::reference::math::{Ray, Vec3};
use rayon::prelude::*;
use std::sync::Arc;

const EPSILON: f32 = 1e-3;
const SEED: u64 = 0x05b7_ae11_0f1c_e5ed;

#[derive(Debug, Clone, Copy)]
pub struct DistantLight {
    /// Unit vector pointing from the surface towards the light.
    pub to_light: Vec3,
    pub radiance: Vec3,
}

#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub ao_samples: u32,
    pub ao_distance: f32,
    pub background: [f32; 4],
    pub spp: u32,
    pub shadows: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ao_samples: 1,
            ao_distance: 1e20,
            background: [0.0; 4],
            spp: 1,
            shadows: false,
        }
    }
}

/// Everything a frame needs, resolved from committed objects.
pub struct Scene {
    pub bvh: Option<Arc<Bvh>>,
    pub camera: Camera,
    pub ambient: Vec3,
    pub distant: Vec<DistantLight>,
    pub settings: Settings,
}

pub struct FrameBufferState {
    pub size: Size,
    pub format: FrameBufferFormat,
    pub channels: Channels,
    /// Linear color of the last frame, or the running average when
    /// accumulating. Row 0 is the bottom row.
    color: Vec<[f32; 4]>,
    accum: Vec<[f32; 4]>,
    depth: Vec<f32>,
    accum_frames: u32,
}

impl FrameBufferState {
    pub fn new(size: Size, format: FrameBufferFormat, channels: Channels) -> Self {
        let pixels = size.pixel_count();
        let accum = if channels.contains(Channels::ACCUM) {
            vec![[0.0; 4]; pixels]
        } else {
            Vec::new()
        };
        let depth = if channels.contains(Channels::DEPTH) {
            vec![f32::INFINITY; pixels]
        } else {
            Vec::new()
        };
        Self {
            size,
            format,
            channels,
            color: vec![[0.0; 4]; pixels],
            accum,
            depth,
            accum_frames: 0,
        }
    }

    pub fn clear(&mut self, channels: Channels) {
        if channels.contains(Channels::COLOR) {
            self.color.iter_mut().for_each(|px| *px = [0.0; 4]);
        }
        if channels.contains(Channels::DEPTH) {
            self.depth.iter_mut().for_each(|d| *d = f32::INFINITY);
        }
        if channels.contains(Channels::ACCUM) {
            self.accum.iter_mut().for_each(|px| *px = [0.0; 4]);
            self.accum_frames = 0;
        }
    }

    pub fn accumulated_frames(&self) -> u32 {
        self.accum_frames
    }

    pub fn map_color(&self) -> Frame {
        let pixels = match self.format {
            FrameBufferFormat::Rgba32f => Pixels::Rgba32f(self.color.iter().flatten().copied().collect()),
            FrameBufferFormat::Srgba => Pixels::Rgba8(
                self.color.iter().flat_map(|px| encode_pixel(px, true)).collect(),
            ),
            FrameBufferFormat::Rgba8 => Pixels::Rgba8(
                self.color.iter().flat_map(|px| encode_pixel(px, false)).collect(),
            ),
        };
        Frame {
            size: self.size,
            format: self.format,
            pixels,
        }
    }

    pub fn depth(&self) -> &[f32] {
        &self.depth
    }
}

/// Renders one frame into `fb` and returns the mean absolute change of the
/// accumulated color, or infinity when there is nothing to compare against.
pub fn render_frame(scene: &Scene, fb: &mut FrameBufferState, channels: Channels) -> f32 {
    let width = fb.size.width as usize;
    let height = fb.size.height;
    let accumulate = fb.channels.contains(Channels::ACCUM) && channels.contains(Channels::ACCUM);
    let spp = scene.settings.spp.max(1);
    let sample_base = if accumulate { fb.accum_frames.saturating_mul(spp) } else { 0 };

    let mut frame = vec![[0.0f32; 4]; fb.size.pixel_count()];
    let mut depth = vec![f32::INFINITY; fb.size.pixel_count()];

    if width > 0 {
        frame
            .par_chunks_mut(width)
            .zip(depth.par_chunks_mut(width))
            .enumerate()
            .for_each(|(y, (row, depth_row))| {
                for x in 0..width {
                    let mut sum = [0.0f32; 4];
                    for sample in 0..spp {
                        let sample_index = sample_base.saturating_add(sample);
                        let mut rng = Rng::new(hash_seed(SEED, x as u32, y as u32, sample_index));
                        let u = (x as f32 + rng.next_f32()) / width as f32;
                        let v = (y as f32 + rng.next_f32()) / height as f32;
                        let ray = scene.camera.ray(u, v);
                        let (color, t) = shade(scene, &ray, &mut rng);
                        for c in 0..4 {
                            sum[c] += color[c];
                        }
                        if sample == 0 {
                            depth_row[x] = t;
                        }
                    }
                    row[x] = sum.map(|c| c / spp as f32);
                }
            });
    }

    if channels.contains(Channels::DEPTH) && fb.channels.contains(Channels::DEPTH) {
        fb.depth = depth;
    }

    if !accumulate {
        fb.color = frame;
        return f32::INFINITY;
    }

    fb.accum_frames += 1;
    let scale = 1.0 / fb.accum_frames as f32;
    let mut change = 0.0f64;
    for ((accum, color), sample) in fb.accum.iter_mut().zip(fb.color.iter_mut()).zip(&frame) {
        for c in 0..4 {
            accum[c] += sample[c];
        }
        let next = accum.map(|c| c * scale);
        change += (0..3).map(|c| (next[c] - color[c]).abs() as f64).sum::<f64>();
        *color = next;
    }

    if fb.accum_frames < 2 || fb.color.is_empty() {
        f32::INFINITY
    } else {
        (change / (fb.color.len() * 3) as f64) as f32
    }
}

fn shade(scene: &Scene, ray: &Ray, rng: &mut Rng) -> ([f32; 4], f32) {
    let Some(bvh) = &scene.bvh else {
        return (scene.settings.background, f32::INFINITY);
    };
    let Some(hit) = bvh.hit(ray, 0.0, f32::INFINITY) else {
        return (scene.settings.background, f32::INFINITY);
    };

    let albedo = Vec3::new(hit.color[0], hit.color[1], hit.color[2]);
    let origin = hit.point + hit.normal * EPSILON;
    let mut radiance = Vec3::zero();

    if scene.ambient != Vec3::zero() {
        let samples = scene.settings.ao_samples;
        let visible = if samples == 0 {
            1.0
        } else {
            let mut open = 0;
            for _ in 0..samples {
                let probe = Ray {
                    origin,
                    direction: random_in_hemisphere(hit.normal, rng),
                };
                if !bvh.occluded(&probe, 0.0, scene.settings.ao_distance) {
                    open += 1;
                }
            }
            open as f32 / samples as f32
        };
        radiance = radiance + scene.ambient * visible;
    }

    for light in &scene.distant {
        let cos = hit.normal.dot(light.to_light);
        if cos <= 0.0 {
            continue;
        }
        if scene.settings.shadows {
            let shadow = Ray {
                origin,
                direction: light.to_light,
            };
            if bvh.occluded(&shadow, 0.0, f32::INFINITY) {
                continue;
            }
        }
        radiance = radiance + light.radiance * cos;
    }

    let color = albedo.mul_elem(radiance);
    ([color.x, color.y, color.z, hit.color[3]], hit.t)
}

fn random_in_hemisphere(normal: Vec3, rng: &mut Rng) -> Vec3 {
    let mut dir = random_unit_vector(rng);
    if dir.dot(normal) < 0.0 {
        dir = -dir;
    }
    (normal + dir).normalized()
}

fn random_unit_vector(rng: &mut Rng) -> Vec3 {
    loop {
        let p = Vec3::new(
            rng.next_f32() * 2.0 - 1.0,
            rng.next_f32() * 2.0 - 1.0,
            rng.next_f32() * 2.0 - 1.0,
        );
        let len2 = p.dot(p);
        if len2 < 1.0 && len2 > 1e-12 {
            return p.normalized();
        }
    }
}

fn hash_seed(seed: u64, x: u32, y: u32, sample: u32) -> u64 {
    [x, y, sample]
        .into_iter()
        .fold(seed, |v, input| mix(v ^ input as u64))
}

fn mix(mut v: u64) -> u64 {
    v = v.wrapping_add(0x9e3779b97f4a7c15);
    v = (v ^ (v >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    v = (v ^ (v >> 27)).wrapping_mul(0x94d049bb133111eb);
    v ^ (v >> 31)
}

struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        let state = if seed == 0 { 0xdeadbeefcafebabe } else { seed };
        Self { state }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        (self.state >> 32) as u32
    }

    fn next_f32(&mut self) -> f32 {
        // Strictly below 1.0 so jittered samples stay inside their pixel.
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::camera::Projection;
    use crate::reference::geometry::Triangle;

    fn wall_scene(ambient: Vec3) -> Scene {
        let color = [0.5, 0.5, 0.5, 1.0];
        let triangles = vec![
            Triangle {
                vertices: [
                    Vec3::new(-10.0, -10.0, 5.0),
                    Vec3::new(10.0, -10.0, 5.0),
                    Vec3::new(-10.0, 10.0, 5.0),
                ],
                colors: [color; 3],
            },
            Triangle {
                vertices: [
                    Vec3::new(10.0, 10.0, 5.0),
                    Vec3::new(10.0, -10.0, 5.0),
                    Vec3::new(-10.0, 10.0, 5.0),
                ],
                colors: [color; 3],
            },
        ];
        Scene {
            bvh: Some(Arc::new(Bvh::new(triangles))),
            camera: Camera::new(
                Projection::Perspective { fovy: 60.0 },
                Vec3::zero(),
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(0.0, 1.0, 0.0),
                1.0,
            ),
            ambient,
            distant: Vec::new(),
            settings: Settings::default(),
        }
    }

    #[test]
    fn unoccluded_wall_gets_full_ambient() {
        let scene = wall_scene(Vec3::splat(1.0));
        let mut fb = FrameBufferState::new(Size::new(4, 4), FrameBufferFormat::Rgba32f, Channels::COLOR);
        render_frame(&scene, &mut fb, Channels::COLOR);
        let Pixels::Rgba32f(values) = fb.map_color().pixels else {
            panic!("expected float pixels");
        };
        for px in values.chunks_exact(4) {
            assert!((px[0] - 0.5).abs() < 1e-5);
            assert_eq!(px[3], 1.0);
        }
    }

    #[test]
    fn empty_scene_shows_background() {
        let mut scene = wall_scene(Vec3::splat(1.0));
        scene.bvh = None;
        scene.settings.background = [1.0, 1.0, 1.0, 0.0];
        let mut fb = FrameBufferState::new(Size::new(2, 2), FrameBufferFormat::Rgba8, Channels::COLOR);
        render_frame(&scene, &mut fb, Channels::COLOR);
        let Pixels::Rgba8(bytes) = fb.map_color().pixels else {
            panic!("expected byte pixels");
        };
        assert!(bytes.chunks_exact(4).all(|px| px == [255, 255, 255, 0]));
    }

    #[test]
    fn accumulation_counts_frames_until_cleared() {
        let scene = wall_scene(Vec3::splat(1.0));
        let channels = Channels::COLOR | Channels::ACCUM;
        let mut fb = FrameBufferState::new(Size::new(3, 2), FrameBufferFormat::Srgba, channels);

        assert!(render_frame(&scene, &mut fb, channels).is_infinite());
        let change = render_frame(&scene, &mut fb, channels);
        assert!(change.is_finite());
        assert_eq!(fb.accumulated_frames(), 2);

        fb.clear(Channels::COLOR);
        assert_eq!(fb.accumulated_frames(), 2);
        fb.clear(Channels::ACCUM);
        assert_eq!(fb.accumulated_frames(), 0);
    }

    /// The wall, half hidden behind a nearer panel so ambient occlusion is noisy.
    fn shaded_wall_scene() -> Scene {
        let mut scene = wall_scene(Vec3::splat(1.0));
        let mut triangles = scene.bvh.as_ref().map(|bvh| bvh.triangles().to_vec()).unwrap_or_default();
        let color = [0.8, 0.8, 0.8, 1.0];
        triangles.push(Triangle {
            vertices: [
                Vec3::new(0.0, -10.0, 4.0),
                Vec3::new(10.0, -10.0, 4.0),
                Vec3::new(0.0, 10.0, 4.0),
            ],
            colors: [color; 3],
        });
        triangles.push(Triangle {
            vertices: [
                Vec3::new(10.0, 10.0, 4.0),
                Vec3::new(10.0, -10.0, 4.0),
                Vec3::new(0.0, 10.0, 4.0),
            ],
            colors: [color; 3],
        });
        scene.bvh = Some(Arc::new(Bvh::new(triangles)));
        scene
    }

    #[test]
    fn accumulation_averages_successive_frames() {
        let scene = shaded_wall_scene();
        let size = Size::new(8, 8);
        let channels = Channels::COLOR | Channels::ACCUM;

        let mut fb = FrameBufferState::new(size, FrameBufferFormat::Rgba32f, channels);
        render_frame(&scene, &mut fb, channels);
        let first = fb.color.clone();
        fb.clear(Channels::COLOR);
        render_frame(&scene, &mut fb, channels);
        let averaged = fb.color.clone();

        // The second frame on its own, rendered with the same sample offset.
        let mut raw = FrameBufferState::new(size, FrameBufferFormat::Rgba32f, channels);
        raw.accum_frames = 1;
        render_frame(&scene, &mut raw, channels);
        let second = &raw.accum;

        assert!(first.iter().zip(second).any(|(a, b)| a != b));
        for ((a, b), avg) in first.iter().zip(second).zip(&averaged) {
            for c in 0..4 {
                assert!((avg[c] - (a[c] + b[c]) / 2.0).abs() < 1e-6, "{avg:?} vs {a:?} and {b:?}");
            }
        }
    }

    #[test]
    fn rows_and_samples_get_distinct_seeds() {
        assert_ne!(hash_seed(SEED, 0, 1, 0), hash_seed(SEED, 0, 0, 1 << 16));
        assert_ne!(hash_seed(SEED, 1, 0, 0), hash_seed(SEED, 0, 1, 0));
        assert_eq!(hash_seed(SEED, 3, 4, 5), hash_seed(SEED, 3, 4, 5));
    }

    #[test]
    fn depth_records_primary_hit_distance() {
        let scene = wall_scene(Vec3::splat(1.0));
        let channels = Channels::COLOR | Channels::DEPTH;
        let mut fb = FrameBufferState::new(Size::new(2, 2), FrameBufferFormat::Srgba, channels);
        render_frame(&scene, &mut fb, channels);
        assert!(fb.depth().iter().all(|&t| t >= 5.0 && t < 10.0));
    }
}
