//! Left join of secondary sources onto a primary entity list.
//!
//! The primary table anchors the row set: every primary record yields exactly
//! one merged row, in primary order. Each secondary contributes its field set
//! as columns; entities it does not cover get nulls. Secondary columns whose
//! name is already taken are prefixed with the source name.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    data::Value,
    error::PipelineError,
    fields::CanonicalField,
    normalize::{NormalizedRecord, NormalizedTable},
};

/// A secondary input to [`merge`].
#[derive(Debug, Clone)]
pub enum Secondary {
    Loaded(NormalizedTable),
    /// The source could not be read; its columns are emitted as all-null.
    Missing {
        source: String,
        fields: Vec<CanonicalField>,
    },
}

impl Secondary {
    pub fn source(&self) -> &str {
        match self {
            Secondary::Loaded(table) => &table.source,
            Secondary::Missing { source, .. } => source,
        }
    }

    pub fn fields(&self) -> &[CanonicalField] {
        match self {
            Secondary::Loaded(table) => &table.fields,
            Secondary::Missing { fields, .. } => fields,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputColumn {
    pub name: String,
    pub source: String,
    pub field: CanonicalField,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    /// One slot per output column; the first is always the entity.
    pub values: Vec<Option<Value>>,
}

impl MergedRecord {
    pub fn entity(&self) -> &str {
        match self.values.first() {
            Some(Some(Value::Text(entity))) => entity,
            _ => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedTable {
    pub columns: Vec<OutputColumn>,
    pub rows: Vec<MergedRecord>,
}

impl MergedTable {
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.values.get(idx)?.as_ref()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceMatch {
    pub source: String,
    /// Rows the secondary offered after deduplication.
    pub rows: usize,
    /// Primary rows that found a partner.
    pub matched: usize,
    pub missing: bool,
    #[serde(skip)]
    primary_rows: usize,
}

impl SourceMatch {
    pub fn match_rate(&self) -> f64 {
        if self.primary_rows == 0 {
            0.0
        } else {
            self.matched as f64 / self.primary_rows as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeReport {
    pub primary_source: String,
    pub primary_rows: usize,
    pub sources: Vec<SourceMatch>,
}

impl MergeReport {
    pub fn source(&self, name: &str) -> Option<&SourceMatch> {
        self.sources.iter().find(|s| s.source == name)
    }
}

pub fn merge(
    primary: &NormalizedTable,
    secondaries: &[Secondary],
) -> Result<(MergedTable, MergeReport), PipelineError> {
    index_entities(primary)?;

    let mut names = ColumnNames::default();
    let mut columns = vec![names.claim(&primary.source, CanonicalField::Entity)];
    columns.extend(
        primary
            .fields
            .iter()
            .map(|field| names.claim(&primary.source, *field)),
    );
    let mut rows: Vec<MergedRecord> = primary
        .records
        .iter()
        .map(|record| MergedRecord {
            values: std::iter::once(CanonicalField::Entity)
                .chain(primary.fields.iter().copied())
                .map(|field| record.get(field))
                .collect(),
        })
        .collect();

    let mut report = MergeReport {
        primary_source: primary.source.clone(),
        primary_rows: primary.len(),
        sources: Vec::with_capacity(secondaries.len()),
    };

    for secondary in secondaries {
        let source = secondary.source();
        let fields = secondary.fields();
        columns.extend(fields.iter().map(|field| names.claim(source, *field)));

        let outcome = match secondary {
            Secondary::Loaded(table) => {
                let index = index_entities(table)?;
                let mut matched = 0usize;
                for (row, record) in rows.iter_mut().zip(&primary.records) {
                    let partner = index.get(&record.key()).map(|idx| &table.records[*idx]);
                    if partner.is_some() {
                        matched += 1;
                    }
                    attach(row, partner, fields);
                }
                SourceMatch {
                    source: source.to_string(),
                    rows: table.len(),
                    matched,
                    missing: false,
                    primary_rows: primary.len(),
                }
            }
            Secondary::Missing { .. } => {
                warn!("{source}: source unavailable; padding {} column(s) with nulls", fields.len());
                for row in &mut rows {
                    attach(row, None, fields);
                }
                SourceMatch {
                    source: source.to_string(),
                    rows: 0,
                    matched: 0,
                    missing: true,
                    primary_rows: primary.len(),
                }
            }
        };

        if !outcome.missing && outcome.rows > 0 && outcome.matched == 0 && !primary.is_empty() {
            warn!(
                "{source}: none of {} row(s) matched a {} entity; check entity spellings",
                outcome.rows, primary.source
            );
        } else {
            info!(
                "{source}: matched {}/{} {} row(s)",
                outcome.matched,
                primary.len(),
                primary.source
            );
        }
        report.sources.push(outcome);
    }

    Ok((MergedTable { columns, rows }, report))
}

fn attach(row: &mut MergedRecord, partner: Option<&NormalizedRecord>, fields: &[CanonicalField]) {
    row.values.extend(
        fields
            .iter()
            .map(|field| partner.and_then(|record| record.get(*field))),
    );
}

/// Maps normalized entity keys to record positions, rejecting repeats.
fn index_entities(table: &NormalizedTable) -> Result<HashMap<String, usize>, PipelineError> {
    let mut index = HashMap::with_capacity(table.len());
    for (idx, record) in table.records.iter().enumerate() {
        if let Some(first) = index.insert(record.key(), idx) {
            return Err(PipelineError::DuplicateEntity {
                source_name: table.source.clone(),
                entity: record.entity.clone(),
                first: first + 1,
                second: idx + 1,
            });
        }
    }
    Ok(index)
}

#[derive(Default)]
struct ColumnNames {
    taken: HashSet<String>,
}

impl ColumnNames {
    fn claim(&mut self, source: &str, field: CanonicalField) -> OutputColumn {
        let base = field.as_str().to_string();
        let mut name = base.clone();
        if self.taken.contains(&name) {
            let prefixed = format!("{source}_{base}");
            name = prefixed.clone();
            let mut counter = 2usize;
            while self.taken.contains(&name) {
                name = format!("{prefixed}_{counter}");
                counter += 1;
            }
            debug!("Column '{base}' from {source} renamed to '{name}'");
        }
        self.taken.insert(name.clone());
        OutputColumn {
            name,
            source: source.to_string(),
            field,
        }
    }
}
