//! Compile MAVLink message definition XML into a runtime codec table.
//!
//! [`compile`] takes a list of named XML sources and produces a
//! [`MergedDialect`]: enum tables, per-message wire layout, the per-message
//! CRC seed byte, and a payload codec for every message, merged across
//! dialects with conflict detection. Downstream framers consume the
//! descriptor; framing, signing and transport live elsewhere.
//!
//! Compilation is a pure, synchronous function and the descriptor never
//! mutates afterwards, so it is freely shareable across threads.
//!
//! ```no_run
//! use mavdialect::{compile, CompileOptions, XmlSource};
//!
//! let xml = std::fs::read_to_string("common.xml")?;
//! let table = compile(
//!     &[XmlSource::new("common.xml", xml)],
//!     &CompileOptions::default(),
//! )?;
//! let heartbeat = &table.messages_by_name["heartbeat"];
//! let record = heartbeat.decode(&[0; 9], &table.enums)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

pub mod bytes;
pub mod bytes_mut;
pub mod enums;
pub mod error;
pub mod merge;
pub mod messages;
pub mod types;
mod util;
pub mod xml;

pub use crate::enums::EnumTables;
pub use crate::error::{CodecError, CompileError, ConflictKind};
pub use crate::merge::{Descriptions, Dialect, MergePolicy, MergedDialect};
pub use crate::messages::{Field, Message, MessageRecord};
pub use crate::types::{MavType, Value};
pub use crate::xml::XmlSource;

/// Payload ceiling enforced by framers; the compiler only reports it.
pub const MAX_MESSAGE_SIZE: usize = 300;

/// Knobs for [`compile`].
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Collect `<description>` text into the descriptor. Never affects
    /// codec output.
    pub descriptions: bool,
    pub merge: MergePolicy,
}

/// Compile `sources` into one merged descriptor.
///
/// Loads every source, verifies the include closure, compiles each dialect
/// independently and folds them in order.
///
/// # Errors
///
/// Any [`CompileError`] is fatal; no partial descriptor is returned.
pub fn compile(
    sources: &[XmlSource],
    options: &CompileOptions,
) -> Result<MergedDialect, CompileError> {
    let defs = xml::load_sources(sources)?;
    let mut merged = MergedDialect::default();
    for def in &defs {
        merged.merge(compile_dialect(def, options)?, options.merge)?;
    }
    Ok(merged)
}

/// Compile a single loaded dialect tree.
///
/// # Errors
///
/// Will return an error on bad values, unknown types or duplicate messages
pub fn compile_dialect(
    def: &xml::DialectDef,
    options: &CompileOptions,
) -> Result<Dialect, CompileError> {
    let enums = enums::compile_enums(def)?;

    let mut messages_by_name = BTreeMap::new();
    let mut messages_by_id = BTreeMap::new();
    for message in messages::compile_messages(def)? {
        let message = Arc::new(message);
        if let Some(prev) = messages_by_id.insert(message.id, Arc::clone(&message)) {
            return Err(duplicate(ConflictKind::MessageId, prev.id.to_string(), def));
        }
        if let Some(prev) = messages_by_name.insert(message.key.clone(), message) {
            return Err(duplicate(ConflictKind::MessageName, prev.key.clone(), def));
        }
    }

    let descriptions = options.descriptions.then(|| collect_descriptions(def));

    Ok(Dialect {
        source: def.file_name.clone(),
        version: def.version,
        dialect: def.dialect,
        enums,
        messages_by_name,
        messages_by_id,
        descriptions,
    })
}

fn duplicate(kind: ConflictKind, item: String, def: &xml::DialectDef) -> CompileError {
    CompileError::MergeConflict {
        kind,
        items: vec![item],
        file: def.file_name.clone(),
    }
}

fn collect_descriptions(def: &xml::DialectDef) -> Descriptions {
    let mut out = Descriptions::default();
    for enm in &def.enums {
        if let Some(text) = &enm.description {
            out.enums.insert(util::key(&enm.name), text.clone());
        }
        for entry in &enm.entries {
            if let Some(text) = &entry.description {
                out.enum_entries.insert(util::key(&entry.name), text.clone());
            }
        }
    }
    for msg in &def.messages {
        if let Some(text) = &msg.description {
            out.messages.insert(util::key(&msg.name), text.clone());
        }
    }
    out
}
