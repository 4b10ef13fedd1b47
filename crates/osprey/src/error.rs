//! Error types for the binding layer.

use crate::device::ObjectKind;
use crate::frame::{FrameBufferFormat, Size};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown {kind} type '{type_name}'")]
    UnknownType { kind: ObjectKind, type_name: String },

    #[error("{kind} '{type_name}' has no parameter '{name}'")]
    UnknownParameter {
        kind: ObjectKind,
        type_name: String,
        name: String,
    },

    #[error("parameter '{name}' does not accept {found} values")]
    ParameterType { name: String, found: &'static str },

    #[error("{kind} must be committed before it is used by another object")]
    Uncommitted { kind: ObjectKind },

    #[error("missing required parameter '{name}' on {kind}")]
    MissingParameter { kind: ObjectKind, name: &'static str },

    #[error("invalid library flag '{flag}': {reason}")]
    InvalidFlag { flag: String, reason: String },

    #[error("unknown format '{0}'")]
    UnknownFormat(String),

    #[error("frame buffer format mismatch: expected {expected}, found {found}")]
    FormatMismatch {
        expected: FrameBufferFormat,
        found: FrameBufferFormat,
    },

    #[error("data array of {len} values is not a multiple of {width} ({format})")]
    DataLength {
        format: &'static str,
        len: usize,
        width: usize,
    },

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("object {0} does not exist or was already released")]
    InvalidObject(u64),

    #[error("expected a {expected} object, found {found}")]
    WrongKind {
        expected: ObjectKind,
        found: ObjectKind,
    },

    #[error("frame buffer size {0} must be non-zero")]
    InvalidSize(Size),

    #[error("size mismatch: frame buffer is {expected}, requested {found}")]
    SizeMismatch { expected: Size, found: Size },

    #[error("frame buffer was created without the {0} channel")]
    ChannelMissing(&'static str),

    #[error("device '{0}' is not available in this build")]
    DeviceUnavailable(String),

    #[error("native library error (code {0})")]
    Native(i32),

    #[error("failed to build render thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_offending_parameter() {
        let err = Error::UnknownParameter {
            kind: ObjectKind::Camera,
            type_name: "perspective".to_string(),
            name: "fov".to_string(),
        };
        assert_eq!(err.to_string(), "camera 'perspective' has no parameter 'fov'");

        let err = Error::Uncommitted {
            kind: ObjectKind::Geometry,
        };
        assert_eq!(
            err.to_string(),
            "geometry must be committed before it is used by another object"
        );
    }
}
