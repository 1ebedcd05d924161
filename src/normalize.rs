//! Raw table → normalized table.
//!
//! Resolves headers with the profile's alias table (or the column selector for
//! wide layouts), checks required fields, and coerces every cell according to
//! its field kind. The output carries the profile's full field set so absent
//! source columns become all-null columns rather than missing ones.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::{
    aliases::{ResolvedAliases, resolve_aliases},
    data::{DecimalSeparator, RawCell, Value, coerce_numeric, coerce_year},
    error::PipelineError,
    fields::{CanonicalField, FieldKind, UNKNOWN_REGION, normalize_key},
    profile::{Layout, SourceProfile},
    raw::RawTable,
    select::{ColumnChoice, pinned_column, select_informative_column},
};

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub entity: String,
    pub region: String,
    pub year: Option<i32>,
    /// Remaining fields; a missing key is a null.
    pub values: BTreeMap<CanonicalField, Value>,
}

impl NormalizedRecord {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            region: UNKNOWN_REGION.to_string(),
            year: None,
            values: BTreeMap::new(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn with_value(mut self, field: CanonicalField, value: Value) -> Self {
        self.set(field, Some(value));
        self
    }

    pub fn set(&mut self, field: CanonicalField, value: Option<Value>) {
        match (field, value) {
            (CanonicalField::Entity, Some(value)) => self.entity = value.as_display(),
            (CanonicalField::Entity, None) => {}
            (CanonicalField::Region, value) => {
                self.region = value
                    .map(|v| v.as_display())
                    .unwrap_or_else(|| UNKNOWN_REGION.to_string())
            }
            (CanonicalField::Year, value) => {
                self.year = value
                    .and_then(|v| v.as_f64())
                    .filter(|y| y.fract() == 0.0)
                    .map(|y| y as i32)
            }
            (field, Some(value)) => {
                self.values.insert(field, value);
            }
            (field, None) => {
                self.values.remove(&field);
            }
        }
    }

    /// Join key for this record.
    pub fn key(&self) -> String {
        normalize_key(&self.entity)
    }

    pub fn get(&self, field: CanonicalField) -> Option<Value> {
        match field {
            CanonicalField::Entity => Some(Value::Text(self.entity.clone())),
            CanonicalField::Region => Some(Value::Text(self.region.clone())),
            CanonicalField::Year => self.year.map(|y| Value::Integer(i64::from(y))),
            other => self.values.get(&other).cloned(),
        }
    }

    pub fn metric(&self, field: CanonicalField) -> Option<f64> {
        self.values.get(&field).and_then(Value::as_f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub source: String,
    /// Column set in output order, excluding the entity.
    pub fields: Vec<CanonicalField>,
    pub records: Vec<NormalizedRecord>,
}

impl NormalizedTable {
    pub fn new(
        source: impl Into<String>,
        fields: Vec<CanonicalField>,
        records: Vec<NormalizedRecord>,
    ) -> Self {
        Self {
            source: source.into(),
            fields,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.iter().map(|r| r.entity.as_str())
    }
}

/// Result of normalizing one source.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub table: NormalizedTable,
    pub aliases: ResolvedAliases,
    pub selected: Option<ColumnChoice>,
    /// Rows dropped because their entity cell was empty.
    pub skipped_rows: usize,
}

pub fn normalize(raw: &RawTable, profile: &SourceProfile) -> Result<Normalized, PipelineError> {
    match &profile.layout {
        Layout::Named => normalize_named(raw, profile),
        Layout::Wide {
            entity_column,
            metric,
            prefer_column,
        } => normalize_wide(raw, profile, *entity_column, *metric, prefer_column.as_deref()),
    }
}

fn normalize_named(raw: &RawTable, profile: &SourceProfile) -> Result<Normalized, PipelineError> {
    profile.aliases.validate()?;
    let aliases = resolve_aliases(raw.headers(), &profile.aliases);
    let mut required = profile.required.clone();
    if !required.contains(&CanonicalField::Entity) {
        required.insert(0, CanonicalField::Entity);
    }
    let missing = aliases.missing(&required);
    if !missing.is_empty() {
        return Err(PipelineError::MissingFields {
            source_name: profile.name().to_string(),
            missing,
            available: raw.headers().to_vec(),
        });
    }

    let mut entity_column = 0;
    let mut plan: Vec<(CanonicalField, usize)> = Vec::new();
    for (field, header) in aliases.iter() {
        let Some(index) = raw.header_index(header) else {
            continue;
        };
        if field == CanonicalField::Entity {
            entity_column = index;
        } else {
            plan.push((field, index));
        }
    }

    let mut records = Vec::with_capacity(raw.row_count());
    let mut skipped_rows = 0usize;
    for row in raw.rows() {
        let Some(entity) = row[entity_column].as_text() else {
            skipped_rows += 1;
            continue;
        };
        let mut record = NormalizedRecord::new(entity);
        for (field, index) in &plan {
            record.set(*field, coerce_cell(*field, &row[*index], profile.decimal));
        }
        records.push(record);
    }

    if skipped_rows > 0 {
        warn!(
            "{}: skipped {skipped_rows} row(s) with an empty entity",
            profile.name()
        );
    }
    info!(
        "{}: normalized {} row(s) using {} resolved column(s)",
        profile.name(),
        records.len(),
        aliases.len()
    );

    Ok(Normalized {
        table: NormalizedTable::new(profile.name(), profile.output_fields(), records),
        aliases,
        selected: None,
        skipped_rows,
    })
}

fn normalize_wide(
    raw: &RawTable,
    profile: &SourceProfile,
    entity_column: usize,
    metric: CanonicalField,
    prefer_column: Option<&str>,
) -> Result<Normalized, PipelineError> {
    if entity_column >= raw.width() {
        return Err(PipelineError::EntityColumnOutOfRange {
            source_name: profile.name().to_string(),
            index: entity_column,
            width: raw.width(),
        });
    }

    let pinned = prefer_column
        .and_then(|header| pinned_column(raw, header, entity_column, profile.decimal));
    if let (Some(header), None) = (prefer_column, &pinned) {
        debug!(
            "{}: preferred column '{header}' not present; scoring candidates",
            profile.name()
        );
    }
    let choice = match pinned {
        Some(choice) => choice,
        None => select_informative_column(raw, entity_column, profile.decimal).ok_or_else(
            || PipelineError::NoCandidateColumns {
                source_name: profile.name().to_string(),
            },
        )?,
    };
    info!(
        "{}: using column '{}' for {metric} ({} numeric value(s), {:?})",
        profile.name(),
        choice.header,
        choice.non_null,
        choice.reason
    );

    let mut aliases = ResolvedAliases::default();
    aliases.record(CanonicalField::Entity, &raw.headers()[entity_column]);
    aliases.record(metric, &choice.header);

    let mut records = Vec::with_capacity(raw.row_count());
    let mut skipped_rows = 0usize;
    for row in raw.rows() {
        let Some(entity) = row[entity_column].as_text() else {
            skipped_rows += 1;
            continue;
        };
        let mut record = NormalizedRecord::new(entity);
        record.set(metric, coerce_cell(metric, &row[choice.index], profile.decimal));
        records.push(record);
    }
    if skipped_rows > 0 {
        warn!(
            "{}: skipped {skipped_rows} row(s) with an empty entity",
            profile.name()
        );
    }

    Ok(Normalized {
        table: NormalizedTable::new(profile.name(), profile.output_fields(), records),
        aliases,
        selected: Some(choice),
        skipped_rows,
    })
}

fn coerce_cell(field: CanonicalField, cell: &RawCell, decimal: DecimalSeparator) -> Option<Value> {
    match field.kind() {
        FieldKind::Key | FieldKind::Text => cell.as_text().map(Value::Text),
        FieldKind::Integer => coerce_year(cell, decimal).map(|v| Value::Integer(i64::from(v))),
        FieldKind::Numeric => coerce_numeric(cell, decimal).map(Value::Number),
    }
}
