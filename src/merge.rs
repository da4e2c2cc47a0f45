//! Folding compiled dialects into one namespace.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::enums::EnumTables;
use crate::error::{CompileError, ConflictKind};
use crate::messages::Message;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Conflict handling when dialects share keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Any shared enum entry, message id or message name fails the compile.
    #[default]
    Strict,
    /// Later sources replace earlier entries on shared keys.
    Override,
}

/// Free-text documentation, partitioned by kind so that an enum entry and a
/// message sharing a normalized name cannot collide.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Descriptions {
    pub enums: BTreeMap<String, String>,
    pub enum_entries: BTreeMap<String, String>,
    pub messages: BTreeMap<String, String>,
}

/// The compiled product of one XML source. Immutable once built; messages
/// are shared between the two indexes.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dialect {
    pub source: String,
    pub version: Option<u32>,
    pub dialect: Option<u32>,
    pub enums: EnumTables,
    pub messages_by_name: BTreeMap<String, Arc<Message>>,
    pub messages_by_id: BTreeMap<u32, Arc<Message>>,
    pub descriptions: Option<Descriptions>,
}

/// The union of every compiled dialect, same shape as [`Dialect`].
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MergedDialect {
    pub sources: Vec<String>,
    pub enums: EnumTables,
    pub messages_by_name: BTreeMap<String, Arc<Message>>,
    pub messages_by_id: BTreeMap<u32, Arc<Message>>,
    pub descriptions: Option<Descriptions>,
}

impl MergedDialect {
    /// Fold `next` into the union.
    ///
    /// Under [`MergePolicy::Strict`] any key collision fails the compile;
    /// under [`MergePolicy::Override`] the incoming dialect wins and the
    /// displaced message leaves both indexes.
    ///
    /// # Errors
    ///
    /// Will return [`CompileError::MergeConflict`] on a strict collision
    pub fn merge(&mut self, next: Dialect, policy: MergePolicy) -> Result<(), CompileError> {
        if policy == MergePolicy::Strict {
            self.check_conflicts(&next)?;
        }

        self.enums.entries.extend(next.enums.entries);
        for (group, table) in next.enums.groups {
            self.enums.groups.entry(group).or_default().extend(table);
        }

        for msg in next.messages_by_name.into_values() {
            if let Some(prev) = self.messages_by_name.remove(&msg.key) {
                self.messages_by_id.remove(&prev.id);
            }
            if let Some(prev) = self.messages_by_id.remove(&msg.id) {
                self.messages_by_name.remove(&prev.key);
            }
            self.messages_by_id.insert(msg.id, Arc::clone(&msg));
            self.messages_by_name.insert(msg.key.clone(), msg);
        }

        if let Some(next_desc) = next.descriptions {
            let desc = self.descriptions.get_or_insert_with(Descriptions::default);
            desc.enums.extend(next_desc.enums);
            desc.enum_entries.extend(next_desc.enum_entries);
            desc.messages.extend(next_desc.messages);
        }

        self.sources.push(next.source);
        Ok(())
    }

    fn check_conflicts(&self, next: &Dialect) -> Result<(), CompileError> {
        let conflict = |kind, items: Vec<String>| CompileError::MergeConflict {
            kind,
            items,
            file: next.source.clone(),
        };

        let items: Vec<String> = next
            .enums
            .entries
            .keys()
            .filter(|key| self.enums.entries.contains_key(*key))
            .cloned()
            .collect();
        if !items.is_empty() {
            return Err(conflict(ConflictKind::EnumEntry, items));
        }

        let items: Vec<String> = next
            .messages_by_id
            .keys()
            .filter(|id| self.messages_by_id.contains_key(*id))
            .map(u32::to_string)
            .collect();
        if !items.is_empty() {
            return Err(conflict(ConflictKind::MessageId, items));
        }

        let items: Vec<String> = next
            .messages_by_name
            .keys()
            .filter(|key| self.messages_by_name.contains_key(*key))
            .cloned()
            .collect();
        if !items.is_empty() {
            return Err(conflict(ConflictKind::MessageName, items));
        }

        Ok(())
    }
}
