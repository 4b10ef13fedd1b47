//! The process-wide library context.

use crate::config::LibraryConfig;
use crate::data::{DataArray, DataFormat};
use crate::device::{Device, DeviceKind, ObjectId, ObjectKind};
use crate::error::{Error, Result};
use crate::frame::{Channels, FrameBufferFormat, Size};
use crate::handle::{kind, Camera, Data, FrameBuffer, Geometry, Handle, Kind, Light, Model, Renderer};
use crate::param::{self, ParamClass, ParamSpec, ParamValue};
use crate::reference::ReferenceDevice;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Lifecycle of a handle as seen by the bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Created,
    Configured,
    Committed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameInfo {
    pub size: Size,
    pub format: FrameBufferFormat,
    pub channels: Channels,
}

#[derive(Debug, Clone)]
struct Record {
    kind: ObjectKind,
    type_name: String,
    state: HandleState,
    data_format: Option<DataFormat>,
    frame: Option<FrameInfo>,
}

/// What was still alive when the library shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownReport {
    /// Objects the device still held.
    pub leaked_objects: usize,
    /// Handles that were never released (for example `mem::forget`).
    pub open_handles: usize,
}

/// Scoped library state.
///
/// Created by [`Library::init`] and shut down on drop. Every handle borrows
/// the library, so none can outlive it.
pub struct Library {
    device: RefCell<Box<dyn Device>>,
    registry: RefCell<HashMap<ObjectId, Record>>,
    config: LibraryConfig,
    finished: Cell<bool>,
}

impl Library {
    /// Initializes the library from command line arguments.
    ///
    /// `--osp:` flags are consumed; everything else is returned in order.
    pub fn init<I, S>(args: I) -> Result<(Self, Vec<String>)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (config, rest) = LibraryConfig::from_args(args)?;
        Ok((Self::with_config(config)?, rest))
    }

    pub fn with_config(config: LibraryConfig) -> Result<Self> {
        for flag in &config.unknown_flags {
            log::warn!("osprey: ignoring unknown library flag {flag}");
        }
        let device = open_device(&config)?;
        log::info!(
            "osprey: {} device initialized (threads: {})",
            device.name(),
            if config.num_threads == 0 {
                "auto".to_string()
            } else {
                config.num_threads.to_string()
            }
        );
        if config.set_affinity.is_some() {
            log::debug!("osprey: thread affinity is left to the device");
        }
        Ok(Self::from_parts(device, config))
    }

    /// Wraps an already constructed device.
    pub fn with_device(device: Box<dyn Device>) -> Self {
        Self::from_parts(device, LibraryConfig::default())
    }

    fn from_parts(device: Box<dyn Device>, config: LibraryConfig) -> Self {
        Self {
            device: RefCell::new(device),
            registry: RefCell::new(HashMap::new()),
            config,
            finished: Cell::new(false),
        }
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn device_name(&self) -> &'static str {
        self.device.borrow().name()
    }

    /// Objects currently held by the device, including ones kept alive only
    /// by other objects.
    pub fn live_objects(&self) -> usize {
        self.device.borrow().live_objects()
    }

    /// Handles not yet released.
    pub fn open_handles(&self) -> usize {
        self.registry.borrow().len()
    }

    /// Shuts the library down and reports anything left alive.
    pub fn shutdown(self) -> ShutdownReport {
        self.finish()
    }

    fn finish(&self) -> ShutdownReport {
        if self.finished.replace(true) {
            return ShutdownReport::default();
        }
        let report = ShutdownReport {
            leaked_objects: self.live_objects(),
            open_handles: self.open_handles(),
        };
        if report.open_handles > 0 {
            log::warn!(
                "osprey: shutting down with {} unreleased handles ({} device objects)",
                report.open_handles,
                report.leaked_objects
            );
        }
        self.device.borrow_mut().shutdown();
        self.registry.borrow_mut().clear();
        log::info!("osprey: shut down");
        report
    }

    pub fn new_camera(&self, type_name: &str) -> Result<Camera<'_>> {
        self.create::<kind::Camera>(type_name)
    }

    pub fn new_geometry(&self, type_name: &str) -> Result<Geometry<'_>> {
        self.create::<kind::Geometry>(type_name)
    }

    pub fn new_light(&self, type_name: &str) -> Result<Light<'_>> {
        self.create::<kind::Light>(type_name)
    }

    pub fn new_model(&self) -> Result<Model<'_>> {
        self.create::<kind::Model>("model")
    }

    pub fn new_renderer(&self, type_name: &str) -> Result<Renderer<'_>> {
        self.create::<kind::Renderer>(type_name)
    }

    /// Copies `array` into a new data object.
    pub fn new_data(&self, array: &DataArray) -> Result<Data<'_>> {
        let id = self.device.borrow_mut().new_data(array)?;
        self.register(
            id,
            Record {
                kind: ObjectKind::Data,
                type_name: "data".to_string(),
                state: HandleState::Created,
                data_format: Some(array.format()),
                frame: None,
            },
        );
        Ok(Handle::new(self, id))
    }

    /// Builds a light list. Every light must be committed.
    pub fn new_light_data(&self, lights: &[&Light<'_>]) -> Result<Data<'_>> {
        let mut ids = Vec::with_capacity(lights.len());
        for light in lights {
            self.require_committed(light.id())?;
            ids.push(light.id());
        }
        self.new_data(&DataArray::objects(DataFormat::Light, ids))
    }

    pub fn new_frame_buffer(
        &self,
        size: Size,
        format: FrameBufferFormat,
        channels: Channels,
    ) -> Result<FrameBuffer<'_>> {
        if size.width == 0 || size.height == 0 {
            return Err(Error::InvalidSize(size));
        }
        let id = self.device.borrow_mut().new_frame_buffer(size, format, channels)?;
        self.register(
            id,
            Record {
                kind: ObjectKind::FrameBuffer,
                type_name: "framebuffer".to_string(),
                // Frame buffers take no parameters and are usable at once.
                state: HandleState::Committed,
                data_format: None,
                frame: Some(FrameInfo {
                    size,
                    format,
                    channels,
                }),
            },
        );
        Ok(Handle::new(self, id))
    }

    fn create<K: Kind>(&self, type_name: &str) -> Result<Handle<'_, K>> {
        if param::schema(K::KIND, type_name).is_none() {
            return Err(Error::UnknownType {
                kind: K::KIND,
                type_name: type_name.to_string(),
            });
        }
        let id = self.device.borrow_mut().new_object(K::KIND, type_name)?;
        self.register(
            id,
            Record {
                kind: K::KIND,
                type_name: type_name.to_string(),
                state: HandleState::Created,
                data_format: None,
                frame: None,
            },
        );
        Ok(Handle::new(self, id))
    }

    fn register(&self, id: ObjectId, record: Record) {
        log::debug!("osprey: new {} '{}' #{}", record.kind, record.type_name, id.raw());
        self.registry.borrow_mut().insert(id, record);
    }

    fn mark(&self, id: ObjectId, state: HandleState) {
        if let Some(record) = self.registry.borrow_mut().get_mut(&id) {
            record.state = state;
        }
    }

    pub(crate) fn state(&self, id: ObjectId) -> Result<HandleState> {
        self.registry
            .borrow()
            .get(&id)
            .map(|record| record.state)
            .ok_or(Error::InvalidObject(id.raw()))
    }

    pub(crate) fn type_name(&self, id: ObjectId) -> Result<String> {
        self.registry
            .borrow()
            .get(&id)
            .map(|record| record.type_name.clone())
            .ok_or(Error::InvalidObject(id.raw()))
    }

    pub(crate) fn data_format(&self, id: ObjectId) -> Option<DataFormat> {
        self.registry.borrow().get(&id).and_then(|record| record.data_format)
    }

    pub(crate) fn frame_info(&self, id: ObjectId) -> Result<FrameInfo> {
        self.registry
            .borrow()
            .get(&id)
            .and_then(|record| record.frame)
            .ok_or(Error::InvalidObject(id.raw()))
    }

    pub(crate) fn require_committed(&self, id: ObjectId) -> Result<()> {
        let registry = self.registry.borrow();
        let record = registry.get(&id).ok_or(Error::InvalidObject(id.raw()))?;
        if record.state != HandleState::Committed {
            return Err(Error::Uncommitted { kind: record.kind });
        }
        Ok(())
    }

    pub(crate) fn set_param(&self, id: ObjectId, name: &str, value: ParamValue) -> Result<()> {
        {
            let registry = self.registry.borrow();
            let record = registry.get(&id).ok_or(Error::InvalidObject(id.raw()))?;
            let spec = param::lookup(record.kind, &record.type_name, name).ok_or_else(|| {
                Error::UnknownParameter {
                    kind: record.kind,
                    type_name: record.type_name.clone(),
                    name: name.to_string(),
                }
            })?;
            check_value(&registry, spec, &value)?;
        }

        log::trace!("osprey: #{} {name} = {value:?}", id.raw());
        self.device.borrow_mut().set_param(id, name, &value)?;
        self.mark(id, HandleState::Configured);
        Ok(())
    }

    pub(crate) fn commit(&self, id: ObjectId) -> Result<()> {
        self.device.borrow_mut().commit(id)?;
        self.mark(id, HandleState::Committed);
        Ok(())
    }

    pub(crate) fn add_geometry(&self, model: ObjectId, geometry: ObjectId) -> Result<()> {
        self.require_committed(geometry)?;
        self.device.borrow_mut().add_geometry(model, geometry)?;
        self.mark(model, HandleState::Configured);
        Ok(())
    }

    pub(crate) fn release(&self, id: ObjectId) -> Result<()> {
        if self.finished.get() {
            return Ok(());
        }
        self.registry.borrow_mut().remove(&id);
        self.device.borrow_mut().release(id)
    }

    pub(crate) fn device_call<T>(&self, f: impl FnOnce(&mut dyn Device) -> Result<T>) -> Result<T> {
        let mut device = self.device.borrow_mut();
        f(device.as_mut())
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        self.finish();
    }
}

fn check_value(registry: &HashMap<ObjectId, Record>, spec: &ParamSpec, value: &ParamValue) -> Result<()> {
    for class in spec.accepts {
        match (class, value) {
            (ParamClass::Int, ParamValue::Int(_))
            | (ParamClass::Float, ParamValue::Float(_))
            | (ParamClass::Vec3, ParamValue::Vec3(_)) => return Ok(()),
            (ParamClass::Object(kind), ParamValue::Object(target)) => {
                let record = committed(registry, *target)?;
                if record.kind != *kind {
                    return Err(Error::WrongKind {
                        expected: *kind,
                        found: record.kind,
                    });
                }
                return Ok(());
            }
            (ParamClass::Data(formats), ParamValue::Data(target)) => {
                let record = committed(registry, *target)?;
                match record.data_format {
                    Some(format) if formats.contains(&format) => return Ok(()),
                    Some(format) => {
                        return Err(Error::UnknownFormat(format!(
                            "'{}' does not accept {format} data",
                            spec.name
                        )))
                    }
                    None => {
                        return Err(Error::WrongKind {
                            expected: ObjectKind::Data,
                            found: record.kind,
                        })
                    }
                }
            }
            _ => {}
        }
    }

    Err(Error::ParameterType {
        name: spec.name.to_string(),
        found: value.class_name(),
    })
}

fn committed(registry: &HashMap<ObjectId, Record>, target: ObjectId) -> Result<&Record> {
    let record = registry.get(&target).ok_or(Error::InvalidObject(target.raw()))?;
    if record.state != HandleState::Committed {
        return Err(Error::Uncommitted { kind: record.kind });
    }
    Ok(record)
}

fn open_device(config: &LibraryConfig) -> Result<Box<dyn Device>> {
    match config.device {
        DeviceKind::Reference => Ok(Box::new(ReferenceDevice::new(config.num_threads)?)),
        DeviceKind::Native => native_device(config),
    }
}

#[cfg(feature = "ospray")]
fn native_device(config: &LibraryConfig) -> Result<Box<dyn Device>> {
    Ok(Box::new(crate::native::NativeDevice::init(&config.flags)?))
}

#[cfg(not(feature = "ospray"))]
fn native_device(_config: &LibraryConfig) -> Result<Box<dyn Device>> {
    Err(Error::DeviceUnavailable(
        "native (rebuild with the `ospray` feature)".to_string(),
    ))
}
