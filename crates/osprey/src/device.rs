//! The engine boundary.
//!
//! A [`Device`] owns every object the bindings create and is addressed only
//! through [`ObjectId`]s. [`crate::Library`] validates calls before they
//! reach the device, but devices still reject ids they do not know.

use crate::data::DataArray;
use crate::error::{Error, Result};
use crate::frame::{Channels, Frame, FrameBufferFormat, Size};
use crate::param::ParamValue;
use std::fmt;
use std::str::FromStr;

/// Opaque reference to a device-owned object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Camera,
    Data,
    FrameBuffer,
    Geometry,
    Light,
    Model,
    Renderer,
}

impl ObjectKind {
    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Camera => "camera",
            ObjectKind::Data => "data",
            ObjectKind::FrameBuffer => "frame buffer",
            ObjectKind::Geometry => "geometry",
            ObjectKind::Light => "light",
            ObjectKind::Model => "model",
            ObjectKind::Renderer => "renderer",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which engine backs a [`crate::Library`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceKind {
    #[default]
    Reference,
    Native,
}

impl DeviceKind {
    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::Reference => "reference",
            DeviceKind::Native => "native",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reference" | "cpu" => Ok(DeviceKind::Reference),
            "native" | "ospray" => Ok(DeviceKind::Native),
            _ => Err(Error::DeviceUnavailable(s.to_string())),
        }
    }
}

/// Handle-based engine API.
///
/// Reference counting follows the engine convention: a new object starts
/// with one reference, attaching it as a parameter (or adding a geometry to
/// a model) takes another, and `release` drops one. Parameter changes take
/// effect at `commit`.
pub trait Device {
    fn name(&self) -> &'static str;

    /// Creates a camera, geometry, light, model or renderer. Models ignore
    /// `type_name`.
    fn new_object(&mut self, kind: ObjectKind, type_name: &str) -> Result<ObjectId>;

    /// Copies `data` into a new data object.
    fn new_data(&mut self, data: &DataArray) -> Result<ObjectId>;

    fn new_frame_buffer(
        &mut self,
        size: Size,
        format: FrameBufferFormat,
        channels: Channels,
    ) -> Result<ObjectId>;

    fn set_param(&mut self, object: ObjectId, name: &str, value: &ParamValue) -> Result<()>;

    fn commit(&mut self, object: ObjectId) -> Result<()>;

    fn add_geometry(&mut self, model: ObjectId, geometry: ObjectId) -> Result<()>;

    fn release(&mut self, object: ObjectId) -> Result<()>;

    fn frame_buffer_clear(&mut self, frame_buffer: ObjectId, channels: Channels) -> Result<()>;

    /// Renders one frame and returns an estimate of how much the accumulated
    /// image changed. `f32::INFINITY` means no estimate is available yet.
    fn render_frame(
        &mut self,
        frame_buffer: ObjectId,
        renderer: ObjectId,
        channels: Channels,
    ) -> Result<f32>;

    /// Copies the color channel out in the frame buffer's format.
    fn map_color(&mut self, frame_buffer: ObjectId) -> Result<Frame>;

    /// Copies the depth channel out; row 0 is the bottom of the image.
    fn map_depth(&mut self, frame_buffer: ObjectId) -> Result<Vec<f32>>;

    /// Frames accumulated since the last `ACCUM` clear.
    fn accumulated_frames(&self, frame_buffer: ObjectId) -> Result<u32>;

    /// Number of objects the device still holds.
    fn live_objects(&self) -> usize;

    fn shutdown(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_kind_parses_aliases() {
        assert_eq!("reference".parse::<DeviceKind>().unwrap(), DeviceKind::Reference);
        assert_eq!("OSPRay".parse::<DeviceKind>().unwrap(), DeviceKind::Native);
        assert!("gpu".parse::<DeviceKind>().is_err());
    }
}
