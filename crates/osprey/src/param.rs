//! Parameter values and the closed schema of recognized parameters.

use crate::data::DataFormat;
use crate::device::{ObjectId, ObjectKind};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Int(i32),
    Float(f32),
    Vec3([f32; 3]),
    Object(ObjectId),
    Data(ObjectId),
}

impl ParamValue {
    pub fn class_name(&self) -> &'static str {
        match self {
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Vec3(_) => "vec3f",
            ParamValue::Object(_) => "object",
            ParamValue::Data(_) => "data",
        }
    }

    /// The object this value refers to, if any.
    pub fn referenced(&self) -> Option<ObjectId> {
        match self {
            ParamValue::Object(id) | ParamValue::Data(id) => Some(*id),
            _ => None,
        }
    }
}

/// What a parameter slot accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamClass {
    Int,
    Float,
    Vec3,
    Object(ObjectKind),
    Data(&'static [DataFormat]),
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub accepts: &'static [ParamClass],
}

const fn spec(name: &'static str, accepts: &'static [ParamClass]) -> ParamSpec {
    ParamSpec { name, accepts }
}

const VEC3: &[ParamClass] = &[ParamClass::Vec3];
const FLOAT: &[ParamClass] = &[ParamClass::Float];
const INT: &[ParamClass] = &[ParamClass::Int];

const PERSPECTIVE_CAMERA: &[ParamSpec] = &[
    spec("pos", VEC3),
    spec("dir", VEC3),
    spec("up", VEC3),
    spec("aspect", FLOAT),
    spec("fovy", FLOAT),
];

const ORTHOGRAPHIC_CAMERA: &[ParamSpec] = &[
    spec("pos", VEC3),
    spec("dir", VEC3),
    spec("up", VEC3),
    spec("aspect", FLOAT),
    spec("height", FLOAT),
];

const POSITIONS: &[ParamClass] = &[ParamClass::Data(&[DataFormat::Float3, DataFormat::Float3A])];
const COLORS: &[ParamClass] = &[ParamClass::Data(&[DataFormat::Float4])];
const INDICES: &[ParamClass] = &[ParamClass::Data(&[DataFormat::Int3, DataFormat::Int4])];
const LIGHTS: &[ParamClass] = &[ParamClass::Data(&[DataFormat::Light])];
const BACKGROUND: &[ParamClass] = &[ParamClass::Float, ParamClass::Vec3];
const MODEL: &[ParamClass] = &[ParamClass::Object(ObjectKind::Model)];
const CAMERA: &[ParamClass] = &[ParamClass::Object(ObjectKind::Camera)];

const TRIANGLES: &[ParamSpec] = &[
    spec("vertex", POSITIONS),
    spec("vertex.color", COLORS),
    spec("index", INDICES),
];

const AMBIENT_LIGHT: &[ParamSpec] = &[spec("color", VEC3), spec("intensity", FLOAT)];

const DISTANT_LIGHT: &[ParamSpec] = &[
    spec("color", VEC3),
    spec("intensity", FLOAT),
    spec("direction", VEC3),
];

const SCIVIS_RENDERER: &[ParamSpec] = &[
    spec("aoSamples", INT),
    spec("aoDistance", FLOAT),
    spec("bgColor", BACKGROUND),
    spec("spp", INT),
    spec("shadowsEnabled", INT),
    spec("model", MODEL),
    spec("camera", CAMERA),
    spec("lights", LIGHTS),
];

const NO_PARAMS: &[ParamSpec] = &[];

/// Recognized type names per object kind.
pub fn known_types(kind: ObjectKind) -> &'static [&'static str] {
    match kind {
        ObjectKind::Camera => &["perspective", "orthographic"],
        ObjectKind::Geometry => &["triangles"],
        ObjectKind::Light => &["ambient", "distant"],
        ObjectKind::Renderer => &["scivis", "ao"],
        ObjectKind::Model => &["model"],
        ObjectKind::Data => &["data"],
        ObjectKind::FrameBuffer => &["framebuffer"],
    }
}

/// Parameters accepted by an object of `kind` created as `type_name`.
pub fn schema(kind: ObjectKind, type_name: &str) -> Option<&'static [ParamSpec]> {
    let params = match (kind, type_name) {
        (ObjectKind::Camera, "perspective") => PERSPECTIVE_CAMERA,
        (ObjectKind::Camera, "orthographic") => ORTHOGRAPHIC_CAMERA,
        (ObjectKind::Geometry, "triangles") => TRIANGLES,
        (ObjectKind::Light, "ambient") => AMBIENT_LIGHT,
        (ObjectKind::Light, "distant") => DISTANT_LIGHT,
        (ObjectKind::Renderer, "scivis" | "ao") => SCIVIS_RENDERER,
        (ObjectKind::Model, _) | (ObjectKind::Data, _) | (ObjectKind::FrameBuffer, _) => NO_PARAMS,
        _ => return None,
    };
    Some(params)
}

pub fn lookup(kind: ObjectKind, type_name: &str, name: &str) -> Option<&'static ParamSpec> {
    schema(kind, type_name)?.iter().find(|spec| spec.name == name)
}
