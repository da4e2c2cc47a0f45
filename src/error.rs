use core::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The namespace in which a merge collision was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    EnumEntry,
    MessageId,
    MessageName,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EnumEntry => "enum entry",
            Self::MessageId => "message id",
            Self::MessageName => "message name",
        })
    }
}

/// A fatal compilation failure. No partial descriptor is ever returned.
#[derive(Error, Debug)]
pub enum CompileError {
    /// A required identifying attribute was absent.
    #[error("{file}: <{element}> is missing its {attribute}")]
    NullIdentifier {
        element: &'static str,
        attribute: &'static str,
        file: String,
    },
    /// An attribute that must be a signed integer did not parse as one.
    #[error("{file}: {identifier}: `{text}` is not an integer")]
    NotAnInteger {
        identifier: String,
        text: String,
        file: String,
    },
    /// A source carried neither a `file` attribute nor a caller-supplied name.
    #[error("XML source has neither a `file` attribute nor a caller-supplied name")]
    MissingFileIdentity,
    /// An `<include>` target was not among the loaded sources.
    #[error("{file}: include `{include}` matches none of the loaded sources")]
    MissingInclude { include: String, file: String },
    /// A field declared a base type absent from the primitive registry.
    #[error("{file}: field `{field}` of message {message} has unknown type `{base_type}`")]
    UnknownType {
        base_type: String,
        field: String,
        message: String,
        file: String,
    },
    /// Two dialects collided on a key the caller did not permit to override.
    #[error("{file}: {kind} conflict on merge: {}", items.join(", "))]
    MergeConflict {
        kind: ConflictKind,
        items: Vec<String>,
        file: String,
    },
    /// The XML itself could not be parsed.
    #[error("{file}: malformed XML: {err}")]
    InvalidXml {
        #[source]
        err: quick_xml::Error,
        file: String,
    },
    /// A definition file could not be read (CLI boundary only).
    #[error("could not read {}: {err}", path.display())]
    ReadSource {
        #[source]
        err: std::io::Error,
        path: PathBuf,
    },
}

/// An encode- or decode-time failure on an otherwise trusted descriptor.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The supplied array is longer than the field's declared length.
    #[error("field `{field}`: array has {got} elements, declared length is {max}")]
    ArrayOverflow {
        field: String,
        got: usize,
        max: usize,
    },
    /// The supplied value cannot encode as the field's base type.
    #[error("field `{field}`: value cannot encode as {expected}")]
    ValueMismatch {
        field: String,
        expected: &'static str,
    },
    /// A symbolic value did not resolve through the dialect's enum tables.
    #[error("field `{field}`: `{entry}` is not a known enum entry")]
    UnknownEnumEntry { field: String, entry: String },
    /// Payload buffer underflow.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
