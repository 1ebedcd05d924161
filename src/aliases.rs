//! Alias tables and header resolution.
//!
//! An [`AliasTable`] lists, for each canonical field, the raw header spellings
//! accepted for it in priority order. [`resolve_aliases`] matches a source's
//! headers against the table case-insensitively and returns a frozen
//! [`ResolvedAliases`] mapping used for the rest of that load.
//!
//! ## Resolution rules
//!
//! - Fields are resolved in table order; within a field the first candidate
//!   present among the headers wins.
//! - A header claimed by an earlier field is unavailable to later fields. The
//!   later field falls through to its next candidate and the skip is recorded
//!   as an [`AliasCollision`].
//! - Fields with no matching candidate are simply absent from the result.

use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::BufReader,
    path::Path,
};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{error::PipelineError, fields::CanonicalField, fields::normalize_key};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    pub field: CanonicalField,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable {
    pub fields: Vec<AliasEntry>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `field` with its candidate spellings, normalized for lookup.
    pub fn with(mut self, field: CanonicalField, candidates: &[&str]) -> Self {
        self.fields.push(AliasEntry {
            field,
            candidates: candidates.iter().map(|c| normalize_key(c)).collect(),
        });
        self
    }

    pub fn candidates(&self, field: CanonicalField) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|entry| entry.field == field)
            .map(|entry| entry.candidates.as_slice())
    }

    pub fn fields(&self) -> impl Iterator<Item = CanonicalField> + '_ {
        self.fields.iter().map(|entry| entry.field)
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.fields.iter().any(|entry| entry.field == field)
    }

    /// Replaces the candidate lists of fields `other` defines and appends
    /// fields this table lacks.
    pub fn overlay(&mut self, other: &AliasTable) {
        for entry in &other.fields {
            let candidates: Vec<String> =
                entry.candidates.iter().map(|c| normalize_key(c)).collect();
            match self.fields.iter_mut().find(|own| own.field == entry.field) {
                Some(own) => own.candidates = candidates,
                None => self.fields.push(AliasEntry {
                    field: entry.field,
                    candidates,
                }),
            }
        }
    }

    /// Rejects tables whose resolution would be ambiguous by construction.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let mut seen_fields = HashSet::new();
        let mut owners: HashMap<String, CanonicalField> = HashMap::new();
        for entry in &self.fields {
            if !seen_fields.insert(entry.field) {
                return Err(PipelineError::DuplicateAliasField(entry.field));
            }
            for candidate in &entry.candidates {
                let key = normalize_key(candidate);
                if key.is_empty() {
                    return Err(PipelineError::EmptyAlias(entry.field));
                }
                if let Some(first) = owners.get(&key)
                    && *first != entry.field
                {
                    return Err(PipelineError::AmbiguousAlias {
                        spelling: key,
                        first: *first,
                        second: entry.field,
                    });
                }
                owners.insert(key, entry.field);
            }
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening alias file {path:?}"))?;
        let reader = BufReader::new(file);
        let table: AliasTable =
            serde_yaml::from_reader(reader).context("Parsing alias table YAML")?;
        table
            .validate()
            .with_context(|| format!("Validating alias table {path:?}"))?;
        Ok(table)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing alias table to YAML")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating alias file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing alias table YAML")
    }
}

/// A header that matched a later field's candidate after an earlier field had
/// already claimed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasCollision {
    pub header: String,
    pub claimed_by: CanonicalField,
    pub skipped: CanonicalField,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedAliases {
    mapping: Vec<(CanonicalField, String)>,
    collisions: Vec<AliasCollision>,
}

impl ResolvedAliases {
    pub fn header_for(&self, field: CanonicalField) -> Option<&str> {
        self.mapping
            .iter()
            .find(|(candidate, _)| *candidate == field)
            .map(|(_, header)| header.as_str())
    }

    pub fn field_for(&self, header: &str) -> Option<CanonicalField> {
        self.mapping
            .iter()
            .find(|(_, mapped)| mapped == header)
            .map(|(field, _)| *field)
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.header_for(field).is_some()
    }

    /// Resolved pairs in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &str)> + '_ {
        self.mapping
            .iter()
            .map(|(field, header)| (*field, header.as_str()))
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn collisions(&self) -> &[AliasCollision] {
        &self.collisions
    }

    /// Records a mapping decided outside the alias table, e.g. by column
    /// selection.
    pub(crate) fn record(&mut self, field: CanonicalField, header: &str) {
        self.mapping.push((field, header.to_string()));
    }

    /// Fields from `required` that did not resolve, in the order given.
    pub fn missing(&self, required: &[CanonicalField]) -> Vec<CanonicalField> {
        required
            .iter()
            .copied()
            .filter(|field| !self.contains(*field))
            .collect()
    }
}

pub fn resolve_aliases(headers: &[String], table: &AliasTable) -> ResolvedAliases {
    let mut index: HashMap<String, &str> = HashMap::with_capacity(headers.len());
    for header in headers {
        let key = normalize_key(header);
        if index.contains_key(&key) {
            debug!("Ignoring duplicate header '{header}' (normalizes to '{key}')");
            continue;
        }
        index.insert(key, header.as_str());
    }

    let mut resolved = ResolvedAliases::default();
    let mut claimed: HashMap<&str, CanonicalField> = HashMap::new();
    for entry in &table.fields {
        for candidate in &entry.candidates {
            let Some(header) = index.get(&normalize_key(candidate)).copied() else {
                continue;
            };
            if let Some(owner) = claimed.get(header) {
                if *owner != entry.field {
                    warn!(
                        "Header '{header}' already resolved to {owner}; not reusing it for {}",
                        entry.field
                    );
                    resolved.collisions.push(AliasCollision {
                        header: header.to_string(),
                        claimed_by: *owner,
                        skipped: entry.field,
                    });
                }
                continue;
            }
            debug!("Resolved {} -> '{header}'", entry.field);
            claimed.insert(header, entry.field);
            resolved.mapping.push((entry.field, header.to_string()));
            break;
        }
    }
    resolved
}
