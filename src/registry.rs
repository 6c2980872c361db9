//! Hash-keyed view of a parsed schema.

use crate::ast::{MessageDefinition, SchemaMap};
use crate::hash::canonical_layout;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("hash {hash:#018x} is shared by `{first}` and `{second}` with different layouts")]
    Collision {
        hash: u64,
        first: String,
        second: String,
    },
}

/// Structural hash → definition. Built once, read-only afterwards; cloning shares
/// the definitions.
#[derive(Debug, Clone, Default)]
pub struct HashRegistry {
    by_hash: HashMap<u64, Arc<MessageDefinition>>,
}

impl HashRegistry {
    /// One entry per distinct hash. Definitions with the same hash and the same
    /// layout are aliases of each other: the first declared non-naked one is kept.
    /// Names do not count toward the layout, so two enums with the same values but
    /// different variant names also alias, and decoded values of either are dumped
    /// with the kept definition's type and variant names.
    pub fn from_schema(schema: &SchemaMap) -> Result<Self, RegistryError> {
        let mut by_hash: HashMap<u64, Arc<MessageDefinition>> = HashMap::with_capacity(schema.len());
        for def in schema.values() {
            match by_hash.get(&def.hash_value) {
                None => {
                    by_hash.insert(def.hash_value, def.clone());
                }
                Some(existing) if !same_layout(existing, def) => {
                    return Err(RegistryError::Collision {
                        hash: def.hash_value,
                        first: existing.type_name.clone(),
                        second: def.type_name.clone(),
                    });
                }
                Some(existing) => {
                    tracing::warn!(
                        hash = %format_args!("{:#018x}", def.hash_value),
                        kept = %existing.type_name,
                        alias = %def.type_name,
                        "structurally identical definitions share one hash"
                    );
                    if existing.naked && !def.naked {
                        by_hash.insert(def.hash_value, def.clone());
                    }
                }
            }
        }
        tracing::debug!(entries = by_hash.len(), "built cbuf hash registry");
        Ok(HashRegistry { by_hash })
    }

    pub fn get(&self, hash: u64) -> Option<&Arc<MessageDefinition>> {
        self.by_hash.get(&hash)
    }

    pub fn contains(&self, hash: u64) -> bool {
        self.by_hash.contains_key(&hash)
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &Arc<MessageDefinition>)> {
        self.by_hash.iter().map(|(h, d)| (*h, d))
    }

    /// Find a definition by fully qualified name.
    pub fn by_name(&self, type_name: &str) -> Option<&Arc<MessageDefinition>> {
        self.by_hash.values().find(|d| d.type_name == type_name)
    }
}

/// Equal hashes with unequal canonical layouts are a genuine collision.
fn same_layout(a: &MessageDefinition, b: &MessageDefinition) -> bool {
    canonical_layout(&a.fields) == canonical_layout(&b.fields)
}

/// Hash-keyed registry for a parsed schema; see [`HashRegistry::from_schema`].
pub fn to_hash_map(schema: &SchemaMap) -> Result<HashRegistry, RegistryError> {
    HashRegistry::from_schema(schema)
}
