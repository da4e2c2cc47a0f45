//! Enum value assignment and the symbolic lookup tables.

use std::collections::BTreeMap;

use crate::error::CompileError;
use crate::util;
use crate::xml::DialectDef;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Symbolic lookup tables for a dialect (or a merged set of them).
///
/// `entries` maps every normalized entry key to its numeric value and is
/// consulted when encoding symbolic values. `groups` maps each normalized
/// enum name to a value → entry-key table used when decoding raw integers
/// back into symbols.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnumTables {
    pub entries: BTreeMap<String, i64>,
    pub groups: BTreeMap<String, BTreeMap<i64, String>>,
}

impl EnumTables {
    /// Entry key for `value` within `group`, if the group knows it.
    pub fn lookup(&self, group: &str, value: i64) -> Option<&str> {
        self.groups
            .get(group)
            .and_then(|table| table.get(&value))
            .map(String::as_str)
    }

    /// Numeric value of a normalized entry key.
    pub fn value_of(&self, entry: &str) -> Option<i64> {
        self.entries.get(entry).copied()
    }
}

/// Assign entry values and build the group tables for one dialect.
///
/// The value counter is local to each `<enum>`: the first entry without an
/// explicit `value=` gets 0, each later implicit entry gets the previous
/// value plus one, and an explicit `value=` resets the counter to itself.
pub fn compile_enums(def: &DialectDef) -> Result<EnumTables, CompileError> {
    let mut tables = EnumTables::default();

    for enm in &def.enums {
        let mut last: Option<i64> = None;
        let mut group = BTreeMap::new();
        for entry in &enm.entries {
            let value = match &entry.value {
                Some(text) => {
                    parse_int(text).ok_or_else(|| CompileError::NotAnInteger {
                        identifier: format!("{}.{}", enm.name, entry.name),
                        text: text.clone(),
                        file: def.file_name.clone(),
                    })?
                }
                None => last.map_or(0, |v| v + 1),
            };
            last = Some(value);

            let entry_key = util::key(&entry.name);
            group.insert(value, entry_key.clone());
            tables.entries.insert(entry_key, value);
        }
        tables.groups.insert(util::key(&enm.name), group);
    }

    Ok(tables)
}

/// Signed integer with an optional `0x` prefix; dialect files use both.
pub(crate) fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    Some(if negative { -value } else { value })
}
