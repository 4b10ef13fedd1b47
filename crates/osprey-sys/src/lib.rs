//! Raw declarations for the OSPRay 1.x C API.
//!
//! Only the subset used by `osprey` is declared. Everything here is
//! `unsafe` to call; the safe layer lives in the `osprey` crate.

#![allow(non_camel_case_types)]

use std::os::raw::{c_char, c_float, c_int, c_void};

/// Version macros forwarded by the build script.
pub const MAJOR_VERSION: &str = env!("OSPREY_SYS_MAJOR_VERSION");
pub const MINOR_VERSION: &str = env!("OSPREY_SYS_MINOR_VERSION");

#[repr(C)]
pub struct _OSPManagedObject {
    _private: [u8; 0],
}

pub type OSPObject = *mut _OSPManagedObject;
pub type OSPCamera = OSPObject;
pub type OSPData = OSPObject;
pub type OSPFrameBuffer = OSPObject;
pub type OSPGeometry = OSPObject;
pub type OSPLight = OSPObject;
pub type OSPModel = OSPObject;
pub type OSPRenderer = OSPObject;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct osp_vec2i {
    pub x: c_int,
    pub y: c_int,
}

pub type OSPError = c_int;
pub const OSP_NO_ERROR: OSPError = 0;
pub const OSP_UNKNOWN_ERROR: OSPError = 1;
pub const OSP_INVALID_ARGUMENT: OSPError = 2;
pub const OSP_INVALID_OPERATION: OSPError = 3;
pub const OSP_OUT_OF_MEMORY: OSPError = 4;
pub const OSP_UNSUPPORTED_CPU: OSPError = 5;

pub type OSPDataType = c_int;
pub const OSP_OBJECT: OSPDataType = 1000;
pub const OSP_CAMERA: OSPDataType = 1001;
pub const OSP_DATA: OSPDataType = 1002;
pub const OSP_FRAMEBUFFER: OSPDataType = 1003;
pub const OSP_GEOMETRY: OSPDataType = 1004;
pub const OSP_LIGHT: OSPDataType = 1005;
pub const OSP_MATERIAL: OSPDataType = 1006;
pub const OSP_MODEL: OSPDataType = 1007;
pub const OSP_RENDERER: OSPDataType = 1008;
pub const OSP_INT: OSPDataType = 4000;
pub const OSP_INT2: OSPDataType = 4001;
pub const OSP_INT3: OSPDataType = 4002;
pub const OSP_INT4: OSPDataType = 4003;
pub const OSP_FLOAT: OSPDataType = 6000;
pub const OSP_FLOAT2: OSPDataType = 6001;
pub const OSP_FLOAT3: OSPDataType = 6002;
pub const OSP_FLOAT4: OSPDataType = 6003;
pub const OSP_FLOAT3A: OSPDataType = 6004;

pub type OSPFrameBufferFormat = c_int;
pub const OSP_FB_NONE: OSPFrameBufferFormat = 0;
pub const OSP_FB_RGBA8: OSPFrameBufferFormat = 1;
pub const OSP_FB_SRGBA: OSPFrameBufferFormat = 2;
pub const OSP_FB_RGBA32F: OSPFrameBufferFormat = 3;

pub type OSPFrameBufferChannel = u32;
pub const OSP_FB_COLOR: OSPFrameBufferChannel = 1 << 0;
pub const OSP_FB_DEPTH: OSPFrameBufferChannel = 1 << 1;
pub const OSP_FB_ACCUM: OSPFrameBufferChannel = 1 << 2;
pub const OSP_FB_VARIANCE: OSPFrameBufferChannel = 1 << 3;

extern "C" {
    pub fn ospInit(argc: *mut c_int, argv: *mut *const c_char) -> OSPError;
    pub fn ospShutdown();

    pub fn ospNewCamera(kind: *const c_char) -> OSPCamera;
    pub fn ospNewGeometry(kind: *const c_char) -> OSPGeometry;
    pub fn ospNewLight3(kind: *const c_char) -> OSPLight;
    pub fn ospNewModel() -> OSPModel;
    pub fn ospNewRenderer(kind: *const c_char) -> OSPRenderer;
    pub fn ospNewData(
        num_items: usize,
        format: OSPDataType,
        source: *const c_void,
        flags: u32,
    ) -> OSPData;
    pub fn ospNewFrameBuffer(
        size: osp_vec2i,
        format: OSPFrameBufferFormat,
        channels: u32,
    ) -> OSPFrameBuffer;

    pub fn ospSet1i(object: OSPObject, id: *const c_char, x: c_int);
    pub fn ospSet1f(object: OSPObject, id: *const c_char, x: c_float);
    pub fn ospSet3fv(object: OSPObject, id: *const c_char, xyz: *const c_float);
    pub fn ospSetObject(object: OSPObject, id: *const c_char, other: OSPObject);
    pub fn ospSetData(object: OSPObject, id: *const c_char, data: OSPData);

    pub fn ospCommit(object: OSPObject);
    pub fn ospRelease(object: OSPObject);
    pub fn ospAddGeometry(model: OSPModel, geometry: OSPGeometry);

    pub fn ospFrameBufferClear(fb: OSPFrameBuffer, channels: u32);
    pub fn ospRenderFrame(fb: OSPFrameBuffer, renderer: OSPRenderer, channels: u32) -> c_float;
    pub fn ospMapFrameBuffer(fb: OSPFrameBuffer, channel: OSPFrameBufferChannel) -> *const c_void;
    pub fn ospUnmapFrameBuffer(mapped: *const c_void, fb: OSPFrameBuffer);
}
