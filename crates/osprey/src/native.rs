//! Device backed by the system OSPRay library.

use crate::data::{DataArray, DataFormat, DataValues};
use crate::device::{Device, ObjectId, ObjectKind};
use crate::error::{Error, Result};
use crate::frame::{Channels, Frame, FrameBufferFormat, Pixels, Size};
use crate::param::ParamValue;
use osprey_sys as sys;
use std::collections::HashMap;
use std::ffi::{c_void, CString};
use std::os::raw::{c_char, c_int};
use std::sync::atomic::{AtomicBool, Ordering};

/// The engine keeps global state; only one device may be open at a time.
static ACTIVE: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, Copy)]
struct FrameMeta {
    size: Size,
    format: FrameBufferFormat,
    channels: Channels,
    accumulated: u32,
}

#[derive(Debug)]
struct NativeObject {
    ptr: sys::OSPObject,
    kind: ObjectKind,
    frame: Option<FrameMeta>,
}

pub struct NativeDevice {
    objects: HashMap<ObjectId, NativeObject>,
    next_id: u64,
    open: bool,
}

impl NativeDevice {
    /// Initializes the engine, passing `flags` through as its command line.
    pub fn init(flags: &[String]) -> Result<Self> {
        if ACTIVE.swap(true, Ordering::SeqCst) {
            return Err(Error::DeviceUnavailable(
                "native device is already initialized".to_string(),
            ));
        }

        let mut owned = Vec::with_capacity(flags.len() + 1);
        owned.push(c_string("osprey")?);
        for flag in flags {
            owned.push(c_string(flag)?);
        }
        let mut argv: Vec<*const c_char> = owned.iter().map(|arg| arg.as_ptr()).collect();
        let mut argc = argv.len() as c_int;

        // SAFETY: argv points at `argc` NUL terminated strings that outlive the call.
        let code = unsafe { sys::ospInit(&mut argc, argv.as_mut_ptr()) };
        if code != sys::OSP_NO_ERROR {
            ACTIVE.store(false, Ordering::SeqCst);
            return Err(Error::Native(code));
        }
        log::info!(
            "native: OSPRay {}.{} initialized",
            sys::MAJOR_VERSION,
            sys::MINOR_VERSION
        );
        Ok(Self {
            objects: HashMap::new(),
            next_id: 1,
            open: true,
        })
    }

    fn insert(&mut self, ptr: sys::OSPObject, kind: ObjectKind, frame: Option<FrameMeta>) -> Result<ObjectId> {
        if ptr.is_null() {
            return Err(Error::Native(sys::OSP_UNKNOWN_ERROR));
        }
        let id = ObjectId::from_raw(self.next_id);
        self.next_id += 1;
        self.objects.insert(id, NativeObject { ptr, kind, frame });
        Ok(id)
    }

    fn object(&self, id: ObjectId) -> Result<&NativeObject> {
        self.objects.get(&id).ok_or(Error::InvalidObject(id.raw()))
    }

    fn ptr(&self, id: ObjectId) -> Result<sys::OSPObject> {
        Ok(self.object(id)?.ptr)
    }

    fn frame(&self, id: ObjectId) -> Result<(sys::OSPObject, FrameMeta)> {
        let object = self.object(id)?;
        match object.frame {
            Some(meta) => Ok((object.ptr, meta)),
            None => Err(Error::WrongKind {
                expected: ObjectKind::FrameBuffer,
                found: object.kind,
            }),
        }
    }

    /// Copies `len` elements of `T` out of a mapped channel.
    fn read_channel<T: Copy>(&self, fb: sys::OSPObject, channel: u32, len: usize) -> Result<Vec<T>> {
        // SAFETY: fb is a live frame buffer owned by this device.
        let mapped = unsafe { sys::ospMapFrameBuffer(fb, channel) };
        if mapped.is_null() {
            return Err(Error::Native(sys::OSP_INVALID_OPERATION));
        }
        // SAFETY: the engine maps `len` contiguous elements for this channel
        // until the matching unmap.
        let values = unsafe { std::slice::from_raw_parts(mapped as *const T, len).to_vec() };
        unsafe { sys::ospUnmapFrameBuffer(mapped, fb) };
        Ok(values)
    }
}

impl Device for NativeDevice {
    fn name(&self) -> &'static str {
        "native"
    }

    fn new_object(&mut self, kind: ObjectKind, type_name: &str) -> Result<ObjectId> {
        let name = c_string(type_name)?;
        // SAFETY: `name` is NUL terminated and lives across the call.
        let ptr = unsafe {
            match kind {
                ObjectKind::Camera => sys::ospNewCamera(name.as_ptr()),
                ObjectKind::Geometry => sys::ospNewGeometry(name.as_ptr()),
                ObjectKind::Light => sys::ospNewLight3(name.as_ptr()),
                ObjectKind::Model => sys::ospNewModel(),
                ObjectKind::Renderer => sys::ospNewRenderer(name.as_ptr()),
                ObjectKind::Data | ObjectKind::FrameBuffer => {
                    return Err(Error::UnknownType {
                        kind,
                        type_name: type_name.to_string(),
                    })
                }
            }
        };
        if ptr.is_null() {
            return Err(Error::UnknownType {
                kind,
                type_name: type_name.to_string(),
            });
        }
        self.insert(ptr, kind, None)
    }

    fn new_data(&mut self, data: &DataArray) -> Result<ObjectId> {
        let items = data.len();
        let format = data_type(data.format());
        let ptr = match data.values() {
            // SAFETY: each source buffer holds `items` elements of `format`
            // and the engine copies it before returning (no shared flag).
            DataValues::Floats(values) => unsafe {
                sys::ospNewData(items, format, values.as_ptr() as *const c_void, 0)
            },
            DataValues::Ints(values) => unsafe {
                sys::ospNewData(items, format, values.as_ptr() as *const c_void, 0)
            },
            DataValues::Objects(ids) => {
                let ptrs = ids.iter().map(|&id| self.ptr(id)).collect::<Result<Vec<_>>>()?;
                unsafe { sys::ospNewData(items, format, ptrs.as_ptr() as *const c_void, 0) }
            }
        };
        self.insert(ptr, ObjectKind::Data, None)
    }

    fn new_frame_buffer(
        &mut self,
        size: Size,
        format: FrameBufferFormat,
        channels: Channels,
    ) -> Result<ObjectId> {
        let dims = sys::osp_vec2i {
            x: size.width as c_int,
            y: size.height as c_int,
        };
        // SAFETY: plain value arguments.
        let ptr = unsafe { sys::ospNewFrameBuffer(dims, frame_format(format), channels.bits()) };
        let meta = FrameMeta {
            size,
            format,
            channels,
            accumulated: 0,
        };
        self.insert(ptr, ObjectKind::FrameBuffer, Some(meta))
    }

    fn set_param(&mut self, object: ObjectId, name: &str, value: &ParamValue) -> Result<()> {
        let target = self.ptr(object)?;
        let name = c_string(name)?;
        match *value {
            ParamValue::Int(v) => unsafe { sys::ospSet1i(target, name.as_ptr(), v) },
            ParamValue::Float(v) => unsafe { sys::ospSet1f(target, name.as_ptr(), v) },
            ParamValue::Vec3(v) => unsafe { sys::ospSet3fv(target, name.as_ptr(), v.as_ptr()) },
            ParamValue::Object(other) => {
                let other = self.ptr(other)?;
                unsafe { sys::ospSetObject(target, name.as_ptr(), other) }
            }
            ParamValue::Data(other) => {
                let other = self.ptr(other)?;
                unsafe { sys::ospSetData(target, name.as_ptr(), other) }
            }
        }
        Ok(())
    }

    fn commit(&mut self, object: ObjectId) -> Result<()> {
        let ptr = self.ptr(object)?;
        unsafe { sys::ospCommit(ptr) };
        Ok(())
    }

    fn add_geometry(&mut self, model: ObjectId, geometry: ObjectId) -> Result<()> {
        let (model, geometry) = (self.ptr(model)?, self.ptr(geometry)?);
        unsafe { sys::ospAddGeometry(model, geometry) };
        Ok(())
    }

    fn release(&mut self, object: ObjectId) -> Result<()> {
        let entry = self.objects.remove(&object).ok_or(Error::InvalidObject(object.raw()))?;
        unsafe { sys::ospRelease(entry.ptr) };
        Ok(())
    }

    fn frame_buffer_clear(&mut self, frame_buffer: ObjectId, channels: Channels) -> Result<()> {
        let (ptr, _) = self.frame(frame_buffer)?;
        unsafe { sys::ospFrameBufferClear(ptr, channels.bits()) };
        if channels.contains(Channels::ACCUM) {
            if let Some(meta) = self.objects.get_mut(&frame_buffer).and_then(|o| o.frame.as_mut()) {
                meta.accumulated = 0;
            }
        }
        Ok(())
    }

    fn render_frame(
        &mut self,
        frame_buffer: ObjectId,
        renderer: ObjectId,
        channels: Channels,
    ) -> Result<f32> {
        let (fb, meta) = self.frame(frame_buffer)?;
        let renderer = self.ptr(renderer)?;
        let variance = unsafe { sys::ospRenderFrame(fb, renderer, channels.bits()) };
        if channels.contains(Channels::ACCUM) && meta.channels.contains(Channels::ACCUM) {
            if let Some(meta) = self.objects.get_mut(&frame_buffer).and_then(|o| o.frame.as_mut()) {
                meta.accumulated += 1;
            }
        }
        Ok(variance)
    }

    fn map_color(&mut self, frame_buffer: ObjectId) -> Result<Frame> {
        let (fb, meta) = self.frame(frame_buffer)?;
        let len = meta.size.pixel_count() * 4;
        let pixels = match meta.format {
            FrameBufferFormat::Rgba32f => Pixels::Rgba32f(self.read_channel::<f32>(fb, sys::OSP_FB_COLOR, len)?),
            FrameBufferFormat::Rgba8 | FrameBufferFormat::Srgba => {
                Pixels::Rgba8(self.read_channel::<u8>(fb, sys::OSP_FB_COLOR, len)?)
            }
        };
        Ok(Frame {
            size: meta.size,
            format: meta.format,
            pixels,
        })
    }

    fn map_depth(&mut self, frame_buffer: ObjectId) -> Result<Vec<f32>> {
        let (fb, meta) = self.frame(frame_buffer)?;
        if !meta.channels.contains(Channels::DEPTH) {
            return Err(Error::ChannelMissing("depth"));
        }
        self.read_channel::<f32>(fb, sys::OSP_FB_DEPTH, meta.size.pixel_count())
    }

    fn accumulated_frames(&self, frame_buffer: ObjectId) -> Result<u32> {
        Ok(self.frame(frame_buffer)?.1.accumulated)
    }

    /// Objects whose handle is still open. References held inside the engine
    /// are not visible here.
    fn live_objects(&self) -> usize {
        self.objects.len()
    }

    fn shutdown(&mut self) {
        if !self.open {
            return;
        }
        if !self.objects.is_empty() {
            log::warn!("native: shutting down with {} open objects", self.objects.len());
        }
        self.objects.clear();
        unsafe { sys::ospShutdown() };
        self.open = false;
        ACTIVE.store(false, Ordering::SeqCst);
    }
}

impl Drop for NativeDevice {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn c_string(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| Error::InvalidFlag {
        flag: s.to_string(),
        reason: "contains a NUL byte".to_string(),
    })
}

fn data_type(format: DataFormat) -> sys::OSPDataType {
    match format {
        DataFormat::Float3 => sys::OSP_FLOAT3,
        DataFormat::Float3A => sys::OSP_FLOAT3A,
        DataFormat::Float4 => sys::OSP_FLOAT4,
        DataFormat::Int3 => sys::OSP_INT3,
        DataFormat::Int4 => sys::OSP_INT4,
        DataFormat::Light => sys::OSP_LIGHT,
    }
}

fn frame_format(format: FrameBufferFormat) -> sys::OSPFrameBufferFormat {
    match format {
        FrameBufferFormat::Rgba8 => sys::OSP_FB_RGBA8,
        FrameBufferFormat::Srgba => sys::OSP_FB_SRGBA,
        FrameBufferFormat::Rgba32f => sys::OSP_FB_RGBA32F,
    }
}
