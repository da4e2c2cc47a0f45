//! Message layout, the CRC seed and the per-field payload codec.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use crc_any::CRCu16;

use crate::bytes::Bytes;
use crate::bytes_mut::BytesMut;
use crate::enums::EnumTables;
use crate::error::{CodecError, CompileError};
use crate::types::{MavType, Value};
use crate::util;
use crate::xml::{DialectDef, FieldDef, MessageDef};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A message record: normalized field key → value.
pub type MessageRecord = BTreeMap<String, Value>;

/// One field of a compiled message.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Field {
    /// Name as written in the dialect file, digested into the CRC seed.
    pub name: String,
    /// Normalized lookup key.
    pub key: String,
    pub typ: MavType,
    /// Normalized enum group key, when the field is enum-bound.
    pub enum_group: Option<String>,
    pub array_len: Option<usize>,
}

impl Field {
    /// Payload bytes this field occupies.
    pub fn wire_size(&self) -> usize {
        self.typ.len() * self.array_len.map_or(1, |n| n.max(1))
    }

    /// Default slot for this field in a fresh message record: numeric zero,
    /// a zero-filled array, or the empty string for `char[N]` (which encodes
    /// to an all-NUL buffer).
    pub fn default_value(&self) -> Value {
        match self.array_len {
            None => self.typ.default_value(),
            Some(_) if self.typ == MavType::Char => Value::Str(String::new()),
            Some(n) => Value::Array(vec![self.typ.default_value(); n]),
        }
    }

    /// Encode this field's slot of `record` into `buf`.
    ///
    /// A missing slot encodes as the default. Arrays shorter than the
    /// declared length are zero-padded; longer ones are rejected.
    ///
    /// # Errors
    ///
    /// Will return [`CodecError::ArrayOverflow`] on oversize arrays and a
    /// mismatch error when the value kind does not fit the field.
    pub fn encode(
        &self,
        buf: &mut BytesMut<'_>,
        record: &MessageRecord,
        tables: &EnumTables,
    ) -> Result<(), CodecError> {
        let default;
        let value = match record.get(&self.key) {
            Some(value) => value,
            None => {
                default = self.default_value();
                &default
            }
        };

        match self.array_len {
            None => self.encode_scalar(buf, value, tables),
            Some(n) if self.typ == MavType::Char => {
                // text or raw bytes; either way NUL-padded to the length
                let written = match value {
                    Value::Str(s) => {
                        if s.len() > n {
                            return Err(CodecError::ArrayOverflow {
                                field: self.name.clone(),
                                got: s.len(),
                                max: n,
                            });
                        }
                        buf.put_slice(s.as_bytes());
                        s.len()
                    }
                    Value::Array(items) => {
                        if items.len() > n {
                            return Err(CodecError::ArrayOverflow {
                                field: self.name.clone(),
                                got: items.len(),
                                max: n,
                            });
                        }
                        for item in items {
                            self.typ.write(buf, &self.name, item)?;
                        }
                        items.len()
                    }
                    _ => {
                        return Err(CodecError::ValueMismatch {
                            field: self.name.clone(),
                            expected: "string",
                        })
                    }
                };
                for _ in written..n {
                    buf.put_u8(0);
                }
                Ok(())
            }
            Some(n) => {
                let items = value.as_slice().ok_or_else(|| CodecError::ValueMismatch {
                    field: self.name.clone(),
                    expected: "array",
                })?;
                if items.len() > n {
                    return Err(CodecError::ArrayOverflow {
                        field: self.name.clone(),
                        got: items.len(),
                        max: n,
                    });
                }
                for item in items {
                    self.encode_scalar(buf, item, tables)?;
                }
                for _ in items.len()..n {
                    self.typ.write(buf, &self.name, &self.typ.default_value())?;
                }
                Ok(())
            }
        }
    }

    fn encode_scalar(
        &self,
        buf: &mut BytesMut<'_>,
        value: &Value,
        tables: &EnumTables,
    ) -> Result<(), CodecError> {
        if let Value::Sym(sym) = value {
            let raw = tables
                .value_of(sym)
                .ok_or_else(|| CodecError::UnknownEnumEntry {
                    field: self.name.clone(),
                    entry: sym.clone(),
                })?;
            return self.typ.write(buf, &self.name, &Value::Int64(raw));
        }
        self.typ.write(buf, &self.name, value)
    }

    /// Decode this field off `buf`, returning its normalized key and value.
    ///
    /// `char[N]` comes back as text with trailing NULs stripped and
    /// surrounding ASCII whitespace trimmed; a payload holding non-ASCII
    /// bytes passes through untouched as a byte array instead. Enum-bound
    /// values substitute through the group table and pass through
    /// numerically when the raw value is unknown to the group.
    ///
    /// # Errors
    ///
    /// Will return an error on payload underflow
    pub fn decode(
        &self,
        buf: &mut Bytes<'_>,
        tables: &EnumTables,
    ) -> Result<(String, Value), CodecError> {
        let value = match self.array_len {
            None => self.substitute(self.typ.read(buf)?, tables),
            Some(n) if self.typ == MavType::Char => {
                let mut raw = Vec::with_capacity(n);
                for _ in 0..n {
                    raw.push(buf.get_u8()?);
                }
                while raw.last() == Some(&0) {
                    raw.pop();
                }
                if raw.is_ascii() {
                    let text = raw.trim_ascii();
                    Value::Str(text.iter().map(|&b| b as char).collect())
                } else {
                    // not ASCII text; hand the wire bytes back untouched
                    Value::Array(raw.into_iter().map(Value::UInt8).collect())
                }
            }
            Some(n) => {
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(self.substitute(self.typ.read(buf)?, tables));
                }
                Value::Array(items)
            }
        };
        Ok((self.key.clone(), value))
    }

    fn substitute(&self, value: Value, tables: &EnumTables) -> Value {
        let Some(group) = &self.enum_group else {
            return value;
        };
        let Some(raw) = value.as_i128() else {
            return value;
        };
        match i64::try_from(raw).ok().and_then(|v| tables.lookup(group, v)) {
            Some(entry) => Value::Sym(entry.to_string()),
            None => value,
        }
    }
}

/// A compiled message: wire layout, CRC seed and codec entry points.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Message {
    pub id: u32,
    /// Name as written in the dialect file.
    pub name: String,
    /// Normalized lookup key.
    pub key: String,
    /// Regular fields in wire order: size-descending, stable.
    pub fields: Vec<Field>,
    /// Extension fields in declaration order, never re-sorted.
    pub extension_fields: Vec<Field>,
    pub payload_size: usize,
    pub extension_payload_size: usize,
    /// The MAVLink "extra CRC" byte folded into packet checksums.
    pub crc_extra: u8,
    /// Zeroed template covering every field, for partial construction.
    pub default_msg: MessageRecord,
}

impl Message {
    /// Regular then extension fields: the full wire order.
    pub fn all_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().chain(self.extension_fields.iter())
    }

    /// Encode `record` into a fresh extended-size payload.
    ///
    /// # Errors
    ///
    /// Will return an error when a value does not fit its field
    pub fn encode(
        &self,
        record: &MessageRecord,
        tables: &EnumTables,
    ) -> Result<Vec<u8>, CodecError> {
        let mut payload = vec![0u8; self.extension_payload_size];
        let mut buf = BytesMut::new(&mut payload);
        for field in self.all_fields() {
            field.encode(&mut buf, record, tables)?;
        }
        Ok(payload)
    }

    /// Decode a payload into a message record.
    ///
    /// Payloads shorter than the extended size decode as if zero-extended,
    /// so a sender without the extension fields yields their defaults.
    ///
    /// # Errors
    ///
    /// Will return an error on payload underflow
    pub fn decode(&self, payload: &[u8], tables: &EnumTables) -> Result<MessageRecord, CodecError> {
        let padded;
        let payload = if payload.len() < self.extension_payload_size {
            let mut zeroed = vec![0u8; self.extension_payload_size];
            zeroed[..payload.len()].copy_from_slice(payload);
            padded = zeroed;
            &padded
        } else {
            payload
        };

        let mut buf = Bytes::new(payload);
        let mut record = MessageRecord::new();
        for field in self.all_fields() {
            let (key, value) = field.decode(&mut buf, tables)?;
            record.insert(key, value);
        }
        Ok(record)
    }
}

/// Compile every `<message>` of a dialect.
pub fn compile_messages(def: &DialectDef) -> Result<Vec<Message>, CompileError> {
    def.messages
        .iter()
        .map(|md| compile_message(def, md))
        .collect()
}

fn compile_message(def: &DialectDef, md: &MessageDef) -> Result<Message, CompileError> {
    if md.id.is_empty() {
        return Err(CompileError::NullIdentifier {
            element: "message",
            attribute: "id",
            file: def.file_name.clone(),
        });
    }
    let id = crate::enums::parse_int(&md.id)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| CompileError::NotAnInteger {
            identifier: format!("{}.id", md.name),
            text: md.id.clone(),
            file: def.file_name.clone(),
        })?;

    let mut fields = Vec::new();
    let mut extension_fields = Vec::new();
    for fd in &md.fields {
        let field = compile_field(def, md, fd)?;
        if fd.is_extension {
            extension_fields.push(field);
        } else {
            fields.push(field);
        }
    }

    // Wire order: size-descending, declaration order within a size class.
    fields.sort_by_key(|f| Reverse(f.typ.len()));

    let payload_size = fields.iter().map(Field::wire_size).sum::<usize>();
    let extension_payload_size =
        payload_size + extension_fields.iter().map(Field::wire_size).sum::<usize>();

    let default_msg = fields
        .iter()
        .chain(&extension_fields)
        .map(|f| (f.key.clone(), f.default_value()))
        .collect();

    Ok(Message {
        id,
        name: md.name.clone(),
        key: util::key(&md.name),
        crc_extra: crc_extra(&md.name, &fields),
        fields,
        extension_fields,
        payload_size,
        extension_payload_size,
        default_msg,
    })
}

fn compile_field(def: &DialectDef, md: &MessageDef, fd: &FieldDef) -> Result<Field, CompileError> {
    let unknown = || CompileError::UnknownType {
        base_type: fd.type_text.clone(),
        field: fd.name.clone(),
        message: md.name.clone(),
        file: def.file_name.clone(),
    };
    let (base, array_len) = util::split_array_suffix(&fd.type_text).ok_or_else(unknown)?;
    let typ = MavType::parse(base).ok_or_else(unknown)?;
    Ok(Field {
        name: fd.name.clone(),
        key: util::key(&fd.name),
        typ,
        enum_group: fd.enum_group.as_deref().map(util::key),
        array_len,
    })
}

/// Seed byte folded into packet checksums so receivers detect schema skew.
///
/// Digests the message name and the sorted regular fields: textual type
/// name, field name, and for arrays a single raw length byte. Extension
/// fields never participate.
pub fn crc_extra(name: &str, sorted_fields: &[Field]) -> u8 {
    let mut crc = CRCu16::crc16mcrf4cc();

    crc.digest(name.as_bytes());
    crc.digest(b" ");

    for field in sorted_fields {
        crc.digest(field.typ.wire_name().as_bytes());
        crc.digest(b" ");
        crc.digest(field.name.as_bytes());
        crc.digest(b" ");
        if let Some(len) = field.array_len {
            crc.digest(&[len as u8]);
        }
    }

    let value = crc.get_crc();
    ((value & 0xff) ^ (value >> 8)) as u8
}
