//! In-process CPU device.
//!
//! Implements the handle contract of the native engine for the object types
//! the bindings expose: perspective/orthographic cameras, triangle meshes,
//! ambient/distant lights, models and an ambient occlusion renderer.

pub mod bvh;
pub mod camera;
pub mod geometry;
pub mod integrator;
pub mod math;

use crate::data::{DataArray, DataFormat, DataValues};
use crate::device::{Device, ObjectId, ObjectKind};
use crate::error::{Error, Result};
use crate::frame::{Channels, Frame, FrameBufferFormat, Size};
use crate::param::{known_types, ParamValue};
use bvh::Bvh;
use camera::{Camera, Projection};
use geometry::{Triangle, DEFAULT_COLOR};
use integrator::{DistantLight, FrameBufferState, Scene, Settings};
use math::Vec3;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum LightState {
    Ambient { radiance: Vec3 },
    Distant(DistantLight),
}

#[derive(Debug, Clone)]
struct RendererState {
    model: Option<ObjectId>,
    camera: Option<ObjectId>,
    lights: Vec<ObjectId>,
    settings: Settings,
}

enum Body {
    Camera(Option<Camera>),
    Geometry(Option<Arc<Vec<Triangle>>>),
    Light(Option<LightState>),
    Model {
        geometries: Vec<ObjectId>,
        committed: Option<Arc<Bvh>>,
    },
    Renderer(Option<RendererState>),
    Data(DataArray),
    FrameBuffer(FrameBufferState),
}

struct Entry {
    refs: u32,
    kind: ObjectKind,
    type_name: String,
    params: BTreeMap<String, ParamValue>,
    body: Body,
}

impl Entry {
    /// Objects this entry holds a reference to.
    fn references(&self) -> Vec<ObjectId> {
        let mut out: Vec<ObjectId> = self.params.values().filter_map(ParamValue::referenced).collect();
        match &self.body {
            Body::Model { geometries, .. } => out.extend(geometries.iter().copied()),
            Body::Data(data) => {
                if let DataValues::Objects(ids) = data.values() {
                    out.extend(ids.iter().copied());
                }
            }
            _ => {}
        }
        out
    }
}

pub struct ReferenceDevice {
    objects: HashMap<ObjectId, Entry>,
    next_id: u64,
    pool: Option<rayon::ThreadPool>,
}

impl ReferenceDevice {
    /// `num_threads == 0` renders on rayon's global pool.
    pub fn new(num_threads: usize) -> Result<Self> {
        let pool = if num_threads == 0 {
            None
        } else {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .thread_name(|i| format!("osprey-render-{i}"))
                    .build()?,
            )
        };
        Ok(Self {
            objects: HashMap::new(),
            next_id: 1,
            pool,
        })
    }

    fn insert(&mut self, kind: ObjectKind, type_name: &str, body: Body) -> ObjectId {
        let id = ObjectId::from_raw(self.next_id);
        self.next_id += 1;
        self.objects.insert(
            id,
            Entry {
                refs: 1,
                kind,
                type_name: type_name.to_string(),
                params: BTreeMap::new(),
                body,
            },
        );
        log::trace!("reference: created {kind} '{type_name}' as #{}", id.raw());
        id
    }

    fn entry(&self, id: ObjectId) -> Result<&Entry> {
        self.objects.get(&id).ok_or(Error::InvalidObject(id.raw()))
    }

    fn entry_mut(&mut self, id: ObjectId) -> Result<&mut Entry> {
        self.objects.get_mut(&id).ok_or(Error::InvalidObject(id.raw()))
    }

    fn wrong_kind(&self, id: ObjectId, expected: ObjectKind) -> Error {
        match self.objects.get(&id) {
            Some(entry) => Error::WrongKind {
                expected,
                found: entry.kind,
            },
            None => Error::InvalidObject(id.raw()),
        }
    }

    fn retain(&mut self, id: ObjectId) -> Result<()> {
        self.entry_mut(id)?.refs += 1;
        Ok(())
    }

    fn data(&self, id: ObjectId) -> Result<&DataArray> {
        match &self.entry(id)?.body {
            Body::Data(data) => Ok(data),
            _ => Err(self.wrong_kind(id, ObjectKind::Data)),
        }
    }

    fn commit_camera(&self, entry: &Entry) -> Result<Camera> {
        let params = &entry.params;
        let pos = vec3_param(params, "pos", Vec3::zero())?;
        let dir = vec3_param(params, "dir", Vec3::new(0.0, 0.0, 1.0))?;
        let up = vec3_param(params, "up", Vec3::new(0.0, 1.0, 0.0))?;
        let aspect = float_param(params, "aspect", 1.0)?;
        let projection = match entry.type_name.as_str() {
            "orthographic" => Projection::Orthographic {
                height: float_param(params, "height", 1.0)?,
            },
            _ => Projection::Perspective {
                fovy: float_param(params, "fovy", 60.0)?,
            },
        };
        Ok(Camera::new(projection, pos, dir, up, aspect))
    }

    fn commit_triangles(&self, entry: &Entry) -> Result<Vec<Triangle>> {
        let vertex_id = data_param(&entry.params, "vertex")?.ok_or(Error::MissingParameter {
            kind: ObjectKind::Geometry,
            name: "vertex",
        })?;
        let index_id = data_param(&entry.params, "index")?.ok_or(Error::MissingParameter {
            kind: ObjectKind::Geometry,
            name: "index",
        })?;

        let vertex = self.data(vertex_id)?;
        let positions: Vec<Vec3> = match (vertex.format(), vertex.values()) {
            (DataFormat::Float3 | DataFormat::Float3A, DataValues::Floats(values)) => values
                .chunks_exact(vertex.format().width())
                .map(|v| Vec3::new(v[0], v[1], v[2]))
                .collect(),
            (format, _) => {
                return Err(Error::InvalidGeometry(format!("vertex data must be float3 or float3a, got {format}")))
            }
        };

        let colors: Option<Vec<[f32; 4]>> = match data_param(&entry.params, "vertex.color")? {
            None => None,
            Some(id) => {
                let data = self.data(id)?;
                match (data.format(), data.values()) {
                    (DataFormat::Float4, DataValues::Floats(values)) => Some(
                        values
                            .chunks_exact(4)
                            .map(|c| [c[0], c[1], c[2], c[3]])
                            .collect(),
                    ),
                    (format, _) => {
                        return Err(Error::InvalidGeometry(format!(
                            "vertex.color must be float4, got {format}"
                        )))
                    }
                }
            }
        };
        if let Some(colors) = &colors {
            if colors.len() < positions.len() {
                return Err(Error::InvalidGeometry(format!(
                    "{} colors for {} vertices",
                    colors.len(),
                    positions.len()
                )));
            }
        }

        let index = self.data(index_id)?;
        let triples: Vec<[i32; 3]> = match (index.format(), index.values()) {
            (DataFormat::Int3 | DataFormat::Int4, DataValues::Ints(values)) => values
                .chunks_exact(index.format().width())
                .map(|i| [i[0], i[1], i[2]])
                .collect(),
            (format, _) => {
                return Err(Error::InvalidGeometry(format!("index data must be int3 or int4, got {format}")))
            }
        };

        let mut triangles = Vec::with_capacity(triples.len());
        for (n, triple) in triples.iter().enumerate() {
            let mut vertices = [Vec3::zero(); 3];
            let mut vertex_colors = [DEFAULT_COLOR; 3];
            for corner in 0..3 {
                let idx = usize::try_from(triple[corner])
                    .ok()
                    .filter(|&i| i < positions.len())
                    .ok_or_else(|| {
                        Error::InvalidGeometry(format!(
                            "triangle {n} references vertex {} of {}",
                            triple[corner],
                            positions.len()
                        ))
                    })?;
                vertices[corner] = positions[idx];
                if let Some(colors) = &colors {
                    vertex_colors[corner] = colors[idx];
                }
            }
            triangles.push(Triangle {
                vertices,
                colors: vertex_colors,
            });
        }
        Ok(triangles)
    }

    fn commit_light(&self, entry: &Entry) -> Result<LightState> {
        let color = vec3_param(&entry.params, "color", Vec3::splat(1.0))?;
        let intensity = float_param(&entry.params, "intensity", 1.0)?;
        let radiance = color * intensity;
        match entry.type_name.as_str() {
            "distant" => {
                let direction = vec3_param(&entry.params, "direction", Vec3::new(0.0, 0.0, 1.0))?;
                Ok(LightState::Distant(DistantLight {
                    to_light: (-direction).normalized(),
                    radiance,
                }))
            }
            _ => Ok(LightState::Ambient { radiance }),
        }
    }

    fn commit_model(&self, geometries: &[ObjectId]) -> Result<Bvh> {
        let mut triangles = Vec::new();
        for &id in geometries {
            match &self.entry(id)?.body {
                Body::Geometry(Some(mesh)) => triangles.extend(mesh.iter().cloned()),
                Body::Geometry(None) => {
                    return Err(Error::Uncommitted {
                        kind: ObjectKind::Geometry,
                    })
                }
                _ => return Err(self.wrong_kind(id, ObjectKind::Geometry)),
            }
        }
        Ok(Bvh::new(triangles))
    }

    fn commit_renderer(&self, entry: &Entry) -> Result<RendererState> {
        let params = &entry.params;
        let background = match params.get("bgColor") {
            None => [0.0; 4],
            Some(ParamValue::Float(v)) => [*v, *v, *v, 0.0],
            Some(ParamValue::Vec3(c)) => [c[0], c[1], c[2], 0.0],
            Some(other) => {
                return Err(Error::ParameterType {
                    name: "bgColor".to_string(),
                    found: other.class_name(),
                })
            }
        };

        let lights = match data_param(params, "lights")? {
            None => Vec::new(),
            Some(id) => match self.data(id)?.values() {
                DataValues::Objects(ids) => ids.clone(),
                _ => {
                    return Err(Error::ParameterType {
                        name: "lights".to_string(),
                        found: "non-light data",
                    })
                }
            },
        };

        Ok(RendererState {
            model: object_param(params, "model")?,
            camera: object_param(params, "camera")?,
            lights,
            settings: Settings {
                ao_samples: int_param(params, "aoSamples", 1)?.max(0) as u32,
                ao_distance: float_param(params, "aoDistance", 1e20)?,
                background,
                spp: int_param(params, "spp", 1)?.max(1) as u32,
                shadows: int_param(params, "shadowsEnabled", 0)? != 0,
            },
        })
    }

    fn scene(&self, renderer: ObjectId) -> Result<Scene> {
        let state = match &self.entry(renderer)?.body {
            Body::Renderer(Some(state)) => state,
            Body::Renderer(None) => {
                return Err(Error::Uncommitted {
                    kind: ObjectKind::Renderer,
                })
            }
            _ => return Err(self.wrong_kind(renderer, ObjectKind::Renderer)),
        };

        let camera_id = state.camera.ok_or(Error::MissingParameter {
            kind: ObjectKind::Renderer,
            name: "camera",
        })?;
        let camera = match &self.entry(camera_id)?.body {
            Body::Camera(Some(camera)) => *camera,
            Body::Camera(None) => {
                return Err(Error::Uncommitted {
                    kind: ObjectKind::Camera,
                })
            }
            _ => return Err(self.wrong_kind(camera_id, ObjectKind::Camera)),
        };

        let bvh = match state.model {
            None => None,
            Some(model) => match &self.entry(model)?.body {
                Body::Model {
                    committed: Some(bvh),
                    ..
                } => Some(Arc::clone(bvh)),
                Body::Model { committed: None, .. } => {
                    return Err(Error::Uncommitted {
                        kind: ObjectKind::Model,
                    })
                }
                _ => return Err(self.wrong_kind(model, ObjectKind::Model)),
            },
        };

        let mut ambient = Vec3::zero();
        let mut distant = Vec::new();
        for &light in &state.lights {
            match &self.entry(light)?.body {
                Body::Light(Some(LightState::Ambient { radiance })) => ambient = ambient + *radiance,
                Body::Light(Some(LightState::Distant(d))) => distant.push(*d),
                Body::Light(None) => {
                    return Err(Error::Uncommitted {
                        kind: ObjectKind::Light,
                    })
                }
                _ => return Err(self.wrong_kind(light, ObjectKind::Light)),
            }
        }

        Ok(Scene {
            bvh,
            camera,
            ambient,
            distant,
            settings: state.settings,
        })
    }
}

impl Device for ReferenceDevice {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn new_object(&mut self, kind: ObjectKind, type_name: &str) -> Result<ObjectId> {
        if kind == ObjectKind::Model {
            let body = Body::Model {
                geometries: Vec::new(),
                committed: None,
            };
            return Ok(self.insert(kind, "model", body));
        }

        let body = match kind {
            _ if !known_types(kind).contains(&type_name) => {
                return Err(Error::UnknownType {
                    kind,
                    type_name: type_name.to_string(),
                })
            }
            ObjectKind::Camera => Body::Camera(None),
            ObjectKind::Geometry => Body::Geometry(None),
            ObjectKind::Light => Body::Light(None),
            ObjectKind::Renderer => Body::Renderer(None),
            ObjectKind::Model | ObjectKind::Data | ObjectKind::FrameBuffer => {
                return Err(Error::UnknownType {
                    kind,
                    type_name: type_name.to_string(),
                })
            }
        };
        Ok(self.insert(kind, type_name, body))
    }

    fn new_data(&mut self, data: &DataArray) -> Result<ObjectId> {
        if let DataValues::Objects(ids) = data.values() {
            for &id in ids {
                self.entry(id)?;
            }
            for &id in ids {
                self.retain(id)?;
            }
        }
        Ok(self.insert(ObjectKind::Data, data.format().name(), Body::Data(data.clone())))
    }

    fn new_frame_buffer(
        &mut self,
        size: Size,
        format: FrameBufferFormat,
        channels: Channels,
    ) -> Result<ObjectId> {
        let state = FrameBufferState::new(size, format, channels);
        Ok(self.insert(ObjectKind::FrameBuffer, format.name(), Body::FrameBuffer(state)))
    }

    fn set_param(&mut self, object: ObjectId, name: &str, value: &ParamValue) -> Result<()> {
        let entry = self.entry(object)?;
        if matches!(entry.kind, ObjectKind::Data | ObjectKind::FrameBuffer) {
            return Err(Error::UnknownParameter {
                kind: entry.kind,
                type_name: entry.type_name.clone(),
                name: name.to_string(),
            });
        }

        if let Some(target) = value.referenced() {
            self.retain(target)?;
        }
        let previous = self.entry_mut(object)?.params.insert(name.to_string(), *value);
        if let Some(old) = previous.as_ref().and_then(ParamValue::referenced) {
            self.release(old)?;
        }
        Ok(())
    }

    fn commit(&mut self, object: ObjectId) -> Result<()> {
        let entry = self.entry(object)?;
        let body = match &entry.body {
            Body::Camera(_) => Body::Camera(Some(self.commit_camera(entry)?)),
            Body::Geometry(_) => Body::Geometry(Some(Arc::new(self.commit_triangles(entry)?))),
            Body::Light(_) => Body::Light(Some(self.commit_light(entry)?)),
            Body::Model { geometries, .. } => {
                let bvh = self.commit_model(geometries)?;
                log::debug!(
                    "reference: model #{} committed with {} triangles",
                    object.raw(),
                    bvh.triangles().len()
                );
                Body::Model {
                    geometries: geometries.clone(),
                    committed: Some(Arc::new(bvh)),
                }
            }
            Body::Renderer(_) => Body::Renderer(Some(self.commit_renderer(entry)?)),
            Body::Data(_) | Body::FrameBuffer(_) => return Ok(()),
        };
        self.entry_mut(object)?.body = body;
        Ok(())
    }

    fn add_geometry(&mut self, model: ObjectId, geometry: ObjectId) -> Result<()> {
        if self.entry(geometry)?.kind != ObjectKind::Geometry {
            return Err(self.wrong_kind(geometry, ObjectKind::Geometry));
        }
        if self.entry(model)?.kind != ObjectKind::Model {
            return Err(self.wrong_kind(model, ObjectKind::Model));
        }
        self.retain(geometry)?;
        if let Body::Model { geometries, .. } = &mut self.entry_mut(model)?.body {
            geometries.push(geometry);
        }
        Ok(())
    }

    fn release(&mut self, object: ObjectId) -> Result<()> {
        let mut pending = vec![object];
        let mut first = true;
        while let Some(id) = pending.pop() {
            let entry = match self.objects.get_mut(&id) {
                Some(entry) => entry,
                None if first => return Err(Error::InvalidObject(id.raw())),
                None => continue,
            };
            first = false;
            entry.refs -= 1;
            if entry.refs == 0 {
                if let Some(entry) = self.objects.remove(&id) {
                    log::trace!("reference: destroyed {} #{}", entry.kind, id.raw());
                    pending.extend(entry.references());
                }
            }
        }
        Ok(())
    }

    fn frame_buffer_clear(&mut self, frame_buffer: ObjectId, channels: Channels) -> Result<()> {
        match &mut self.entry_mut(frame_buffer)?.body {
            Body::FrameBuffer(fb) => {
                fb.clear(channels);
                Ok(())
            }
            _ => Err(self.wrong_kind(frame_buffer, ObjectKind::FrameBuffer)),
        }
    }

    fn render_frame(
        &mut self,
        frame_buffer: ObjectId,
        renderer: ObjectId,
        channels: Channels,
    ) -> Result<f32> {
        let scene = self.scene(renderer)?;
        match self.objects.get_mut(&frame_buffer).map(|entry| &mut entry.body) {
            Some(Body::FrameBuffer(fb)) => Ok(match &self.pool {
                Some(pool) => pool.install(|| integrator::render_frame(&scene, fb, channels)),
                None => integrator::render_frame(&scene, fb, channels),
            }),
            _ => Err(self.wrong_kind(frame_buffer, ObjectKind::FrameBuffer)),
        }
    }

    fn map_color(&mut self, frame_buffer: ObjectId) -> Result<Frame> {
        match &self.entry(frame_buffer)?.body {
            Body::FrameBuffer(fb) => Ok(fb.map_color()),
            _ => Err(self.wrong_kind(frame_buffer, ObjectKind::FrameBuffer)),
        }
    }

    fn map_depth(&mut self, frame_buffer: ObjectId) -> Result<Vec<f32>> {
        match &self.entry(frame_buffer)?.body {
            Body::FrameBuffer(fb) if fb.channels.contains(Channels::DEPTH) => Ok(fb.depth().to_vec()),
            Body::FrameBuffer(_) => Err(Error::ChannelMissing("depth")),
            _ => Err(self.wrong_kind(frame_buffer, ObjectKind::FrameBuffer)),
        }
    }

    fn accumulated_frames(&self, frame_buffer: ObjectId) -> Result<u32> {
        match &self.entry(frame_buffer)?.body {
            Body::FrameBuffer(fb) => Ok(fb.accumulated_frames()),
            _ => Err(self.wrong_kind(frame_buffer, ObjectKind::FrameBuffer)),
        }
    }

    fn live_objects(&self) -> usize {
        self.objects.len()
    }

    fn shutdown(&mut self) {
        if !self.objects.is_empty() {
            log::warn!(
                "reference: shutting down with {} live objects",
                self.objects.len()
            );
        }
        self.objects.clear();
    }
}

fn vec3_param(params: &BTreeMap<String, ParamValue>, name: &str, default: Vec3) -> Result<Vec3> {
    match params.get(name) {
        None => Ok(default),
        Some(ParamValue::Vec3(v)) => Ok(Vec3::from(*v)),
        Some(other) => Err(Error::ParameterType {
            name: name.to_string(),
            found: other.class_name(),
        }),
    }
}

fn float_param(params: &BTreeMap<String, ParamValue>, name: &str, default: f32) -> Result<f32> {
    match params.get(name) {
        None => Ok(default),
        Some(ParamValue::Float(v)) => Ok(*v),
        Some(other) => Err(Error::ParameterType {
            name: name.to_string(),
            found: other.class_name(),
        }),
    }
}

fn int_param(params: &BTreeMap<String, ParamValue>, name: &str, default: i32) -> Result<i32> {
    match params.get(name) {
        None => Ok(default),
        Some(ParamValue::Int(v)) => Ok(*v),
        Some(other) => Err(Error::ParameterType {
            name: name.to_string(),
            found: other.class_name(),
        }),
    }
}

fn object_param(params: &BTreeMap<String, ParamValue>, name: &str) -> Result<Option<ObjectId>> {
    match params.get(name) {
        None => Ok(None),
        Some(ParamValue::Object(id)) => Ok(Some(*id)),
        Some(other) => Err(Error::ParameterType {
            name: name.to_string(),
            found: other.class_name(),
        }),
    }
}

fn data_param(params: &BTreeMap<String, ParamValue>, name: &str) -> Result<Option<ObjectId>> {
    match params.get(name) {
        None => Ok(None),
        Some(ParamValue::Data(id)) => Ok(Some(*id)),
        Some(other) => Err(Error::ParameterType {
            name: name.to_string(),
            found: other.class_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh(device: &mut ReferenceDevice) -> ObjectId {
        let geometry = device.new_object(ObjectKind::Geometry, "triangles").unwrap();
        let vertex = device
            .new_data(&DataArray::float3a(&[[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.0, 1.0, 1.0]]))
            .unwrap();
        let index = device.new_data(&DataArray::int3(&[[0, 1, 2]])).unwrap();
        device.set_param(geometry, "vertex", &ParamValue::Data(vertex)).unwrap();
        device.set_param(geometry, "index", &ParamValue::Data(index)).unwrap();
        device.release(vertex).unwrap();
        device.release(index).unwrap();
        geometry
    }

    #[test]
    fn attached_data_outlives_its_handle() {
        let mut device = ReferenceDevice::new(1).unwrap();
        let geometry = mesh(&mut device);
        assert_eq!(device.live_objects(), 3);

        device.commit(geometry).unwrap();
        device.release(geometry).unwrap();
        assert_eq!(device.live_objects(), 0);
    }

    #[test]
    fn model_keeps_released_geometry_alive() {
        let mut device = ReferenceDevice::new(1).unwrap();
        let geometry = mesh(&mut device);
        device.commit(geometry).unwrap();
        let model = device.new_object(ObjectKind::Model, "model").unwrap();
        device.add_geometry(model, geometry).unwrap();
        device.release(geometry).unwrap();

        device.commit(model).unwrap();
        assert_eq!(device.live_objects(), 4);

        device.release(model).unwrap();
        assert_eq!(device.live_objects(), 0);
    }

    #[test]
    fn replacing_a_data_parameter_releases_the_old_one() {
        let mut device = ReferenceDevice::new(1).unwrap();
        let geometry = mesh(&mut device);
        let index = device.new_data(&DataArray::int3(&[[2, 1, 0]])).unwrap();
        device.set_param(geometry, "index", &ParamValue::Data(index)).unwrap();
        device.release(index).unwrap();
        // geometry, vertex data and the new index data
        assert_eq!(device.live_objects(), 3);
    }

    #[test]
    fn out_of_range_indices_fail_at_commit() {
        let mut device = ReferenceDevice::new(1).unwrap();
        let geometry = mesh(&mut device);
        let index = device.new_data(&DataArray::int3(&[[0, 1, 7]])).unwrap();
        device.set_param(geometry, "index", &ParamValue::Data(index)).unwrap();
        assert!(matches!(device.commit(geometry), Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn model_rejects_uncommitted_geometry() {
        let mut device = ReferenceDevice::new(1).unwrap();
        let geometry = mesh(&mut device);
        let model = device.new_object(ObjectKind::Model, "model").unwrap();
        device.add_geometry(model, geometry).unwrap();
        assert!(matches!(
            device.commit(model),
            Err(Error::Uncommitted {
                kind: ObjectKind::Geometry
            })
        ));
    }

    #[test]
    fn unknown_types_and_double_release_are_errors() {
        let mut device = ReferenceDevice::new(1).unwrap();
        assert!(matches!(
            device.new_object(ObjectKind::Renderer, "pathtracer"),
            Err(Error::UnknownType { .. })
        ));
        let camera = device.new_object(ObjectKind::Camera, "perspective").unwrap();
        device.release(camera).unwrap();
        assert!(matches!(device.release(camera), Err(Error::InvalidObject(_))));
    }

    #[test]
    fn light_data_retains_its_lights() {
        let mut device = ReferenceDevice::new(1).unwrap();
        let light = device.new_object(ObjectKind::Light, "ambient").unwrap();
        device.commit(light).unwrap();
        let lights = device
            .new_data(&DataArray::objects(DataFormat::Light, vec![light]))
            .unwrap();
        device.release(light).unwrap();
        assert_eq!(device.live_objects(), 2);
        device.release(lights).unwrap();
        assert_eq!(device.live_objects(), 0);
    }
}
