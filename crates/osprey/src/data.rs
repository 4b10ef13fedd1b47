//! Typed host arrays handed to the engine as data objects.

use crate::device::ObjectId;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Element layout of a data array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    Float3,
    /// Three floats plus one padding slot.
    Float3A,
    Float4,
    Int3,
    Int4,
    /// Light object references.
    Light,
}

impl DataFormat {
    /// Scalars per element.
    pub fn width(self) -> usize {
        match self {
            DataFormat::Float3 | DataFormat::Int3 => 3,
            DataFormat::Float3A | DataFormat::Float4 | DataFormat::Int4 => 4,
            DataFormat::Light => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataFormat::Float3 => "float3",
            DataFormat::Float3A => "float3a",
            DataFormat::Float4 => "float4",
            DataFormat::Int3 => "int3",
            DataFormat::Int4 => "int4",
            DataFormat::Light => "light",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let tag = lower.strip_prefix("osp_").unwrap_or(&lower);
        match tag {
            "float3" => Ok(DataFormat::Float3),
            "float3a" => Ok(DataFormat::Float3A),
            "float4" => Ok(DataFormat::Float4),
            "int3" => Ok(DataFormat::Int3),
            "int4" => Ok(DataFormat::Int4),
            "light" => Ok(DataFormat::Light),
            _ => Err(Error::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataValues {
    Floats(Vec<f32>),
    Ints(Vec<i32>),
    Objects(Vec<ObjectId>),
}

/// A host array together with its element layout.
///
/// The element count is derived from the slice length, so a mismatched count
/// cannot be passed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    format: DataFormat,
    values: DataValues,
}

impl DataArray {
    pub fn floats(format: DataFormat, values: &[f32]) -> Result<Self> {
        match format {
            DataFormat::Float3 | DataFormat::Float3A | DataFormat::Float4 => {}
            other => return Err(Error::UnknownFormat(format!("{other} is not a float format"))),
        }
        check_len(format, values.len())?;
        Ok(Self {
            format,
            values: DataValues::Floats(values.to_vec()),
        })
    }

    pub fn ints(format: DataFormat, values: &[i32]) -> Result<Self> {
        match format {
            DataFormat::Int3 | DataFormat::Int4 => {}
            other => return Err(Error::UnknownFormat(format!("{other} is not an int format"))),
        }
        check_len(format, values.len())?;
        Ok(Self {
            format,
            values: DataValues::Ints(values.to_vec()),
        })
    }

    /// Builds a `Float3A` array, inserting the padding slot.
    pub fn float3a(points: &[[f32; 3]]) -> Self {
        let values = points
            .iter()
            .flat_map(|p| [p[0], p[1], p[2], 0.0])
            .collect();
        Self {
            format: DataFormat::Float3A,
            values: DataValues::Floats(values),
        }
    }

    pub fn float4(values: &[[f32; 4]]) -> Self {
        Self {
            format: DataFormat::Float4,
            values: DataValues::Floats(values.iter().flatten().copied().collect()),
        }
    }

    pub fn int3(triples: &[[i32; 3]]) -> Self {
        Self {
            format: DataFormat::Int3,
            values: DataValues::Ints(triples.iter().flatten().copied().collect()),
        }
    }

    pub(crate) fn objects(format: DataFormat, ids: Vec<ObjectId>) -> Self {
        Self {
            format,
            values: DataValues::Objects(ids),
        }
    }

    pub fn format(&self) -> DataFormat {
        self.format
    }

    pub fn values(&self) -> &DataValues {
        &self.values
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        let scalars = match &self.values {
            DataValues::Floats(v) => v.len(),
            DataValues::Ints(v) => v.len(),
            DataValues::Objects(v) => v.len(),
        };
        scalars / self.format.width()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_len(format: DataFormat, len: usize) -> Result<()> {
    let width = format.width();
    if len % width != 0 {
        return Err(Error::DataLength {
            format: format.name(),
            len,
            width,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_tags_accept_both_spellings() {
        assert_eq!("float3a".parse::<DataFormat>().unwrap(), DataFormat::Float3A);
        assert_eq!("OSP_FLOAT3A".parse::<DataFormat>().unwrap(), DataFormat::Float3A);
        assert_eq!("OSP_LIGHT".parse::<DataFormat>().unwrap(), DataFormat::Light);
        assert!("double".parse::<DataFormat>().is_err());
    }

    #[test]
    fn element_count_comes_from_the_slice() {
        let vertex = [
            -1.0, -1.0, 3.0, 0.0, //
            -1.0, 1.0, 3.0, 0.0, //
            1.0, -1.0, 3.0, 0.0, //
            0.1, 0.1, 0.3, 0.0,
        ];
        let data = DataArray::floats(DataFormat::Float3A, &vertex).unwrap();
        assert_eq!(data.len(), 4);

        let index = DataArray::ints(DataFormat::Int3, &[0, 1, 2, 1, 2, 3]).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn ragged_arrays_are_rejected() {
        let err = DataArray::floats(DataFormat::Float4, &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, Error::DataLength { len: 3, width: 4, .. }));
    }

    #[test]
    fn scalar_type_must_match_format() {
        assert!(DataArray::floats(DataFormat::Int3, &[1.0, 2.0, 3.0]).is_err());
        assert!(DataArray::ints(DataFormat::Float3, &[1, 2, 3]).is_err());
    }

    #[test]
    fn float3a_pads_each_point() {
        let data = DataArray::float3a(&[[1.0, 2.0, 3.0]]);
        assert_eq!(data.values(), &DataValues::Floats(vec![1.0, 2.0, 3.0, 0.0]));
        assert_eq!(data.len(), 1);
    }
}
