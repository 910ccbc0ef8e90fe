//! Resolving user-supplied identifiers to full ids.
//!
//! Services and enclaves can be referred to by full id, by shortened id or
//! by name. Names are reused over time and shortened ids are only unique
//! within one batch, so both may match several full ids. Resolution order:
//!
//! 1. full id (always unique),
//! 2. shortened id,
//! 3. name.
//!
//! The first index that contains the identifier decides the outcome: one
//! match resolves, several matches fail as ambiguous.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IdentifierError;

/// What an [`IdentifierSet`] identifies. Only used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A service inside an enclave
    Service,
    /// An enclave
    Enclave,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service => f.write_str("service"),
            Self::Enclave => f.write_str("enclave"),
        }
    }
}

/// The three identifiers of one entity, as returned by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierTriple {
    /// Canonical, globally unique id
    pub full_id: String,
    /// Human-assigned name
    pub name: String,
    /// Short prefix of the full id
    pub shortened_id: String,
}

impl IdentifierTriple {
    /// Build a triple.
    pub fn new(
        full_id: impl Into<String>,
        name: impl Into<String>,
        shortened_id: impl Into<String>,
    ) -> Self {
        Self {
            full_id: full_id.into(),
            name: name.into(),
            shortened_id: shortened_id.into(),
        }
    }
}

/// Outcome of looking an identifier up in one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// Not in this index
    Missing,
    /// Exactly one full id
    Unique(&'a str),
    /// More than one full id
    Ambiguous(&'a [String]),
}

impl<'a> Lookup<'a> {
    fn in_bucket(bucket: Option<&'a Vec<String>>) -> Self {
        match bucket.map(Vec::as_slice) {
            None | Some([]) => Self::Missing,
            Some([only]) => Self::Unique(only.as_str()),
            Some(many) => Self::Ambiguous(many),
        }
    }
}

/// Immutable indices over a batch of [`IdentifierTriple`]s.
///
/// Built once per query; safe to share between readers.
#[derive(Debug, Clone)]
pub struct IdentifierSet {
    kind: EntityKind,
    full_ids: BTreeSet<String>,
    by_name: BTreeMap<String, Vec<String>>,
    by_shortened_id: BTreeMap<String, Vec<String>>,
}

impl IdentifierSet {
    /// Index a batch of triples (existing and historical entities alike).
    ///
    /// A full id listed more than once is indexed under its first triple.
    pub fn new(kind: EntityKind, triples: impl IntoIterator<Item = IdentifierTriple>) -> Self {
        let mut set = Self {
            kind,
            full_ids: BTreeSet::new(),
            by_name: BTreeMap::new(),
            by_shortened_id: BTreeMap::new(),
        };

        for triple in triples {
            if !set.full_ids.insert(triple.full_id.clone()) {
                tracing::warn!(
                    %kind,
                    full_id = %triple.full_id,
                    "full id listed twice, keeping the first entry"
                );
                continue;
            }
            set.by_name
                .entry(triple.name)
                .or_default()
                .push(triple.full_id.clone());
            set.by_shortened_id
                .entry(triple.shortened_id)
                .or_default()
                .push(triple.full_id);
        }

        tracing::debug!(%kind, count = set.full_ids.len(), "identifier set built");
        set
    }

    /// What this set identifies.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Number of distinct full ids.
    pub fn len(&self) -> usize {
        self.full_ids.len()
    }

    /// True if the batch was empty.
    pub fn is_empty(&self) -> bool {
        self.full_ids.is_empty()
    }

    /// Look `shortened_id` up in the shortened id index only.
    pub fn lookup_shortened_id(&self, shortened_id: &str) -> Lookup<'_> {
        Lookup::in_bucket(self.by_shortened_id.get(shortened_id))
    }

    /// Look `name` up in the name index only.
    pub fn lookup_name(&self, name: &str) -> Lookup<'_> {
        Lookup::in_bucket(self.by_name.get(name))
    }

    /// Resolve `identifier` to exactly one full id.
    pub fn resolve(&self, identifier: &str) -> Result<&str, IdentifierError> {
        if let Some(full_id) = self.full_ids.get(identifier) {
            return Ok(full_id.as_str());
        }

        for lookup in [
            self.lookup_shortened_id(identifier),
            self.lookup_name(identifier),
        ] {
            match lookup {
                Lookup::Missing => continue,
                Lookup::Unique(full_id) => return Ok(full_id),
                Lookup::Ambiguous(matches) => {
                    return Err(IdentifierError::Ambiguous {
                        kind: self.kind,
                        identifier: identifier.to_string(),
                        matches: matches.to_vec(),
                    });
                }
            }
        }

        Err(IdentifierError::NotFound {
            kind: self.kind,
            identifier: identifier.to_string(),
        })
    }

    /// Every known name, then every full id, each group sorted. For display.
    pub fn canonical_order(&self) -> Vec<&str> {
        // BTree keys are already sorted.
        self.by_name
            .keys()
            .chain(self.full_ids.iter())
            .map(String::as_str)
            .collect()
    }
}
