//! The primitive type registry and the dynamic value model.

use std::io;

use crate::bytes::Bytes;
use crate::bytes_mut::BytesMut;
use crate::error::CodecError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A MAVLink base type. Field types are matched verbatim against this
/// registry; an unmatched type fails the compile, never a codec call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MavType {
    /// Decodes like `uint8_t` but keeps its identity in the descriptor;
    /// digests as plain `uint8_t` in the CRC seed.
    UInt8MavlinkVersion,
    #[default]
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Char,
    Float,
    Double,
}

impl MavType {
    pub fn parse(s: &str) -> Option<Self> {
        use self::MavType::*;
        match s {
            "uint8_t_mavlink_version" => Some(UInt8MavlinkVersion),
            "uint8_t" => Some(UInt8),
            "uint16_t" => Some(UInt16),
            "uint32_t" => Some(UInt32),
            "uint64_t" => Some(UInt64),
            "int8_t" => Some(Int8),
            "int16_t" => Some(Int16),
            "int32_t" => Some(Int32),
            "int64_t" => Some(Int64),
            "char" => Some(Char),
            "float" => Some(Float),
            "double" | "Double" => Some(Double),
            _ => None,
        }
    }

    /// Payload footprint in bytes. Doubles as the wire-ordering priority:
    /// 8-byte types sort first, 1-byte types last.
    pub const fn len(&self) -> usize {
        use self::MavType::*;
        match self {
            UInt8MavlinkVersion | UInt8 | Int8 | Char => 1,
            UInt16 | Int16 => 2,
            UInt32 | Int32 | Float => 4,
            UInt64 | Int64 | Double => 8,
        }
    }

    /// Textual type name digested into the CRC seed.
    pub const fn wire_name(&self) -> &'static str {
        use self::MavType::*;
        match self {
            UInt8MavlinkVersion | UInt8 => "uint8_t",
            UInt16 => "uint16_t",
            UInt32 => "uint32_t",
            UInt64 => "uint64_t",
            Int8 => "int8_t",
            Int16 => "int16_t",
            Int32 => "int32_t",
            Int64 => "int64_t",
            Char => "char",
            Float => "float",
            Double => "double",
        }
    }

    pub fn default_value(&self) -> Value {
        use self::MavType::*;
        match self {
            UInt8MavlinkVersion | UInt8 | Char => Value::UInt8(0),
            UInt16 => Value::UInt16(0),
            UInt32 => Value::UInt32(0),
            UInt64 => Value::UInt64(0),
            Int8 => Value::Int8(0),
            Int16 => Value::Int16(0),
            Int32 => Value::Int32(0),
            Int64 => Value::Int64(0),
            Float => Value::Float(0.0),
            Double => Value::Double(0.0),
        }
    }

    /// Read one scalar of this type off the payload.
    ///
    /// # Errors
    ///
    /// Will return an error on buffer underflow
    pub fn read(&self, buf: &mut Bytes<'_>) -> io::Result<Value> {
        use self::MavType::*;
        Ok(match self {
            UInt8MavlinkVersion | UInt8 | Char => Value::UInt8(buf.get_u8()?),
            UInt16 => Value::UInt16(buf.get_u16_le()?),
            UInt32 => Value::UInt32(buf.get_u32_le()?),
            UInt64 => Value::UInt64(buf.get_u64_le()?),
            Int8 => Value::Int8(buf.get_i8()?),
            Int16 => Value::Int16(buf.get_i16_le()?),
            Int32 => Value::Int32(buf.get_i32_le()?),
            Int64 => Value::Int64(buf.get_i64_le()?),
            Float => Value::Float(buf.get_f32_le()?),
            Double => Value::Double(buf.get_f64_le()?),
        })
    }

    /// Write one scalar of this type into the payload, coercing across the
    /// numeric variants. Integer values never coerce from floats.
    ///
    /// # Errors
    ///
    /// Will return an error when the value kind cannot encode as this type
    pub fn write(
        &self,
        buf: &mut BytesMut<'_>,
        field: &str,
        value: &Value,
    ) -> Result<(), CodecError> {
        use self::MavType::*;
        let mismatch = || CodecError::ValueMismatch {
            field: field.to_string(),
            expected: self.wire_name(),
        };
        match self {
            UInt8MavlinkVersion | UInt8 | Char => {
                buf.put_u8(value.as_i128().ok_or_else(mismatch)? as u8)
            }
            UInt16 => buf.put_u16_le(value.as_i128().ok_or_else(mismatch)? as u16),
            UInt32 => buf.put_u32_le(value.as_i128().ok_or_else(mismatch)? as u32),
            UInt64 => buf.put_u64_le(value.as_i128().ok_or_else(mismatch)? as u64),
            Int8 => buf.put_i8(value.as_i128().ok_or_else(mismatch)? as i8),
            Int16 => buf.put_i16_le(value.as_i128().ok_or_else(mismatch)? as i16),
            Int32 => buf.put_i32_le(value.as_i128().ok_or_else(mismatch)? as i32),
            Int64 => buf.put_i64_le(value.as_i128().ok_or_else(mismatch)? as i64),
            Float => buf.put_f32_le(value.as_f64().ok_or_else(mismatch)? as f32),
            Double => buf.put_f64_le(value.as_f64().ok_or_else(mismatch)?),
        }
        Ok(())
    }
}

/// A dynamic payload value.
///
/// Scalar variants mirror the registry. `Str` carries decoded `char[N]`
/// text, `Array` a fixed-length sequence of scalars, and `Sym` the
/// normalized key of a decoded enum entry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Array(Vec<Value>),
    Sym(String),
}

impl Value {
    /// Widen any integer variant; floats and the rest yield `None`.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Self::UInt8(v) => Some(v.into()),
            Self::UInt16(v) => Some(v.into()),
            Self::UInt32(v) => Some(v.into()),
            Self::UInt64(v) => Some(v.into()),
            Self::Int8(v) => Some(v.into()),
            Self::Int16(v) => Some(v.into()),
            Self::Int32(v) => Some(v.into()),
            Self::Int64(v) => Some(v.into()),
            _ => None,
        }
    }

    /// Widen any numeric variant, integers included.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(v.into()),
            Self::Double(v) => Some(v),
            _ => self.as_i128().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    u8 => UInt8, u16 => UInt16, u32 => UInt32, u64 => UInt64,
    i8 => Int8, i16 => Int16, i32 => Int32, i64 => Int64,
    f32 => Float, f64 => Double, String => Str,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_matches_verbatim() {
        assert_eq!(MavType::parse("uint8_t"), Some(MavType::UInt8));
        assert_eq!(
            MavType::parse("uint8_t_mavlink_version"),
            Some(MavType::UInt8MavlinkVersion)
        );
        // base-type names are never normalized
        assert_eq!(MavType::parse("UINT8_T"), None);
        assert_eq!(MavType::parse("u8"), None);
    }

    #[test]
    fn version_pseudo_type_digests_as_uint8() {
        assert_eq!(MavType::UInt8MavlinkVersion.wire_name(), "uint8_t");
        assert_eq!(MavType::UInt8MavlinkVersion.len(), 1);
    }

    #[test]
    fn sizes_follow_the_wire_priority_table() {
        assert_eq!(MavType::UInt64.len(), 8);
        assert_eq!(MavType::Double.len(), 8);
        assert_eq!(MavType::Float.len(), 4);
        assert_eq!(MavType::Int16.len(), 2);
        assert_eq!(MavType::Char.len(), 1);
    }

    #[test]
    fn integers_do_not_coerce_from_floats() {
        let mut data = [0u8; 1];
        let mut buf = BytesMut::new(&mut data);
        let err = MavType::UInt8.write(&mut buf, "x", &Value::Float(1.0));
        assert!(matches!(err, Err(CodecError::ValueMismatch { .. })));
    }

    #[test]
    fn floats_accept_integer_values() {
        let mut data = [0u8; 4];
        let mut buf = BytesMut::new(&mut data);
        MavType::Float.write(&mut buf, "x", &Value::UInt8(2)).unwrap();
        assert_eq!(data, 2.0f32.to_le_bytes());
    }
}
