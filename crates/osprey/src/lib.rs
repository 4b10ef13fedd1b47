//! Safe, handle-based bindings to the OSPRay ray tracing engine.
//!
//! A [`Library`] owns the engine; every object is a typed [`Handle`] that
//! borrows it and releases its reference on drop. The default device is an
//! in-process reference renderer; the system engine is available behind the
//! `ospray` feature.

pub mod config;
pub mod data;
pub mod device;
pub mod error;
pub mod frame;
pub mod handle;
pub mod image_out;
pub mod library;
#[cfg(feature = "ospray")]
pub mod native;
pub mod param;
pub mod reference;

pub use config::{LibraryConfig, LogOutput, FLAG_PREFIX};
pub use data::{DataArray, DataFormat, DataValues};
pub use device::{Device, DeviceKind, ObjectId, ObjectKind};
pub use error::{Error, Result};
pub use frame::{Channels, Frame, FrameBufferFormat, Pixels, Size};
pub use handle::{
    kind, Camera, Data, FrameBuffer, Geometry, Handle, Kind, Light, Model, Renderer,
};
pub use image_out::{write_image, ImageKind};
pub use library::{HandleState, Library, ShutdownReport};
pub use param::ParamValue;
pub use reference::ReferenceDevice;
