//! Typed, reference-counted handles to library objects.

use crate::data::DataFormat;
use crate::device::{ObjectId, ObjectKind};
use crate::error::{Error, Result};
use crate::frame::{Channels, Frame, FrameBufferFormat, Size};
use crate::image_out;
use crate::library::{HandleState, Library};
use crate::param::ParamValue;
use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::path::Path;

mod sealed {
    pub trait Sealed {}
}

/// Marker for the object kind a [`Handle`] refers to.
pub trait Kind: sealed::Sealed {
    const KIND: ObjectKind;
}

/// Kind markers.
pub mod kind {
    use super::{sealed, Kind};
    use crate::device::ObjectKind;

    macro_rules! kinds {
        ($($name:ident),* $(,)?) => {
            $(
                #[derive(Debug)]
                pub enum $name {}

                impl sealed::Sealed for $name {}

                impl Kind for $name {
                    const KIND: ObjectKind = ObjectKind::$name;
                }
            )*
        };
    }

    kinds!(Camera, Data, FrameBuffer, Geometry, Light, Model, Renderer);
}

/// An owned reference to one library object.
///
/// Dropping the handle releases the reference; the engine keeps the object
/// alive for as long as other objects refer to it.
pub struct Handle<'lib, K: Kind> {
    lib: &'lib Library,
    id: ObjectId,
    _kind: PhantomData<K>,
}

pub type Camera<'lib> = Handle<'lib, kind::Camera>;
pub type Data<'lib> = Handle<'lib, kind::Data>;
pub type FrameBuffer<'lib> = Handle<'lib, kind::FrameBuffer>;
pub type Geometry<'lib> = Handle<'lib, kind::Geometry>;
pub type Light<'lib> = Handle<'lib, kind::Light>;
pub type Model<'lib> = Handle<'lib, kind::Model>;
pub type Renderer<'lib> = Handle<'lib, kind::Renderer>;

impl<'lib, K: Kind> Handle<'lib, K> {
    pub(crate) fn new(lib: &'lib Library, id: ObjectId) -> Self {
        Self {
            lib,
            id,
            _kind: PhantomData,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        K::KIND
    }

    pub fn state(&self) -> HandleState {
        self.lib.state(self.id).unwrap_or(HandleState::Created)
    }

    pub fn type_name(&self) -> Result<String> {
        self.lib.type_name(self.id)
    }

    /// Sets a parameter by name.
    ///
    /// The name must be in the schema for this object's type, the value must
    /// have an accepted class, and referenced objects must be committed.
    pub fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        self.lib.set_param(self.id, name, value)
    }

    /// Applies pending parameter changes.
    pub fn commit(&mut self) -> Result<()> {
        self.lib.commit(self.id)
    }

    /// Releases the handle, reporting engine errors instead of logging them.
    pub fn release(self) -> Result<()> {
        let this = ManuallyDrop::new(self);
        this.lib.release(this.id)
    }
}

impl<K: Kind> Drop for Handle<'_, K> {
    fn drop(&mut self) {
        if let Err(err) = self.lib.release(self.id) {
            log::warn!("osprey: releasing {} #{} failed: {err}", K::KIND, self.id.raw());
        }
    }
}

impl<K: Kind> fmt::Debug for Handle<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &K::KIND)
            .field("id", &self.id.raw())
            .finish()
    }
}

impl Camera<'_> {
    pub fn set_position(&mut self, pos: [f32; 3]) -> Result<()> {
        self.set_param("pos", ParamValue::Vec3(pos))
    }

    pub fn set_direction(&mut self, dir: [f32; 3]) -> Result<()> {
        self.set_param("dir", ParamValue::Vec3(dir))
    }

    pub fn set_up(&mut self, up: [f32; 3]) -> Result<()> {
        self.set_param("up", ParamValue::Vec3(up))
    }

    pub fn set_aspect(&mut self, aspect: f32) -> Result<()> {
        self.set_param("aspect", ParamValue::Float(aspect))
    }

    /// Vertical field of view in degrees. Perspective cameras only.
    pub fn set_fovy(&mut self, degrees: f32) -> Result<()> {
        self.set_param("fovy", ParamValue::Float(degrees))
    }

    /// Height of the view volume. Orthographic cameras only.
    pub fn set_height(&mut self, height: f32) -> Result<()> {
        self.set_param("height", ParamValue::Float(height))
    }
}

impl Geometry<'_> {
    pub fn set_vertices(&mut self, data: &Data<'_>) -> Result<()> {
        self.set_param("vertex", ParamValue::Data(data.id()))
    }

    pub fn set_vertex_colors(&mut self, data: &Data<'_>) -> Result<()> {
        self.set_param("vertex.color", ParamValue::Data(data.id()))
    }

    pub fn set_indices(&mut self, data: &Data<'_>) -> Result<()> {
        self.set_param("index", ParamValue::Data(data.id()))
    }
}

impl Light<'_> {
    pub fn set_color(&mut self, color: [f32; 3]) -> Result<()> {
        self.set_param("color", ParamValue::Vec3(color))
    }

    pub fn set_intensity(&mut self, intensity: f32) -> Result<()> {
        self.set_param("intensity", ParamValue::Float(intensity))
    }

    /// Direction the light travels. Distant lights only.
    pub fn set_direction(&mut self, direction: [f32; 3]) -> Result<()> {
        self.set_param("direction", ParamValue::Vec3(direction))
    }
}

impl Model<'_> {
    /// Adds a committed geometry. The model holds its own reference.
    pub fn add_geometry(&mut self, geometry: &Geometry<'_>) -> Result<()> {
        self.lib.add_geometry(self.id, geometry.id())
    }
}

impl Renderer<'_> {
    pub fn set_ao_samples(&mut self, samples: i32) -> Result<()> {
        self.set_param("aoSamples", ParamValue::Int(samples))
    }

    pub fn set_ao_distance(&mut self, distance: f32) -> Result<()> {
        self.set_param("aoDistance", ParamValue::Float(distance))
    }

    /// Gray background.
    pub fn set_background(&mut self, value: f32) -> Result<()> {
        self.set_param("bgColor", ParamValue::Float(value))
    }

    pub fn set_background_rgb(&mut self, color: [f32; 3]) -> Result<()> {
        self.set_param("bgColor", ParamValue::Vec3(color))
    }

    pub fn set_spp(&mut self, spp: i32) -> Result<()> {
        self.set_param("spp", ParamValue::Int(spp))
    }

    pub fn set_shadows(&mut self, enabled: bool) -> Result<()> {
        self.set_param("shadowsEnabled", ParamValue::Int(enabled as i32))
    }

    pub fn set_model(&mut self, model: &Model<'_>) -> Result<()> {
        self.set_param("model", ParamValue::Object(model.id()))
    }

    pub fn set_camera(&mut self, camera: &Camera<'_>) -> Result<()> {
        self.set_param("camera", ParamValue::Object(camera.id()))
    }

    pub fn set_lights(&mut self, lights: &Data<'_>) -> Result<()> {
        self.set_param("lights", ParamValue::Data(lights.id()))
    }
}

impl Data<'_> {
    pub fn format(&self) -> Option<DataFormat> {
        self.lib.data_format(self.id)
    }
}

impl FrameBuffer<'_> {
    pub fn size(&self) -> Result<Size> {
        Ok(self.lib.frame_info(self.id)?.size)
    }

    pub fn format(&self) -> Result<FrameBufferFormat> {
        Ok(self.lib.frame_info(self.id)?.format)
    }

    pub fn channels(&self) -> Result<Channels> {
        Ok(self.lib.frame_info(self.id)?.channels)
    }

    pub fn clear(&mut self, channels: Channels) -> Result<()> {
        let id = self.id;
        self.lib.device_call(|device| device.frame_buffer_clear(id, channels))
    }

    /// Renders one frame with a committed renderer.
    ///
    /// Returns the engine's variance estimate; `f32::INFINITY` when none is
    /// available.
    pub fn render_frame(&mut self, renderer: &Renderer<'_>, channels: Channels) -> Result<f32> {
        self.lib.require_committed(renderer.id())?;
        let (fb, renderer) = (self.id, renderer.id());
        self.lib.device_call(|device| device.render_frame(fb, renderer, channels))
    }

    /// Copies the color channel out. Row 0 is the bottom of the image.
    pub fn map_color(&self) -> Result<Frame> {
        let id = self.id;
        self.lib.device_call(|device| device.map_color(id))
    }

    pub fn map_depth(&self) -> Result<Vec<f32>> {
        if !self.channels()?.contains(Channels::DEPTH) {
            return Err(Error::ChannelMissing("depth"));
        }
        let id = self.id;
        self.lib.device_call(|device| device.map_depth(id))
    }

    pub fn accumulated_frames(&self) -> Result<u32> {
        let id = self.id;
        self.lib.device_call(|device| device.accumulated_frames(id))
    }

    /// Writes the color channel to `path`; the extension picks PNG or PPM.
    ///
    /// Float frame buffers are written sRGB encoded.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let info = self.lib.frame_info(self.id)?;
        let target = match info.format {
            FrameBufferFormat::Rgba32f => FrameBufferFormat::Srgba,
            format => format,
        };
        self.save_with(path, info.size, target)
    }

    /// Writes the color channel, checking the caller's idea of the image
    /// size and pixel format against the frame buffer.
    pub fn save_with(
        &self,
        path: impl AsRef<Path>,
        size: Size,
        format: FrameBufferFormat,
    ) -> Result<()> {
        let path = path.as_ref();
        let frame = self.map_color()?;
        if frame.size != size {
            return Err(Error::SizeMismatch {
                expected: frame.size,
                found: size,
            });
        }
        log::debug!("osprey: writing {} {} frame to {}", size, format, path.display());
        image_out::write_image(path, &frame, format)
    }
}
