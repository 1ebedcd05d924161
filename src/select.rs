//! Picks the informative column of a source whose metric header is not a
//! stable name (bare year strings, release-specific labels).
//!
//! Every column other than the entity column is a candidate. The candidate
//! with the strictly greatest count of numerically coercible cells wins; ties
//! go to the leftmost column. When no candidate has a single numeric cell the
//! last candidate is chosen and the choice is flagged as a fallback.

use log::{debug, warn};
use serde::Serialize;

use crate::{
    data::{DecimalSeparator, coerce_numeric},
    fields::normalize_key,
    raw::RawTable,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceReason {
    MostNumeric,
    Fallback,
    Pinned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnChoice {
    pub index: usize,
    pub header: String,
    pub non_null: usize,
    pub reason: ChoiceReason,
}

pub fn non_null_count(table: &RawTable, column: usize, decimal: DecimalSeparator) -> usize {
    table
        .column(column)
        .filter(|cell| coerce_numeric(cell, decimal).is_some())
        .count()
}

/// Chooses among `(column index, non-null count)` pairs given in column order.
pub fn pick_column(counts: &[(usize, usize)]) -> Option<(usize, ChoiceReason)> {
    let mut best: Option<(usize, usize)> = None;
    for &(index, count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((index, count)),
        }
    }
    match best {
        Some((index, count)) if count > 0 => Some((index, ChoiceReason::MostNumeric)),
        _ => counts
            .last()
            .map(|&(index, _)| (index, ChoiceReason::Fallback)),
    }
}

pub fn select_informative_column(
    table: &RawTable,
    key_column: usize,
    decimal: DecimalSeparator,
) -> Option<ColumnChoice> {
    let counts: Vec<(usize, usize)> = (0..table.width())
        .filter(|idx| *idx != key_column)
        .map(|idx| (idx, non_null_count(table, idx, decimal)))
        .collect();
    for (idx, count) in &counts {
        debug!(
            "{}: column '{}' has {count} numeric value(s)",
            table.source(),
            table.headers()[*idx]
        );
    }
    let (index, reason) = pick_column(&counts)?;
    let non_null = counts
        .iter()
        .find(|(idx, _)| *idx == index)
        .map(|(_, count)| *count)
        .unwrap_or_default();
    if reason == ChoiceReason::Fallback {
        warn!(
            "{}: no column holds numeric values; falling back to last column '{}'",
            table.source(),
            table.headers()[index]
        );
    }
    Some(ColumnChoice {
        index,
        header: table.headers()[index].clone(),
        non_null,
        reason,
    })
}

/// Uses the column named `header` (case-insensitive) when the table has it.
pub fn pinned_column(
    table: &RawTable,
    header: &str,
    key_column: usize,
    decimal: DecimalSeparator,
) -> Option<ColumnChoice> {
    let wanted = normalize_key(header);
    let index = table
        .headers()
        .iter()
        .enumerate()
        .position(|(idx, h)| idx != key_column && normalize_key(h) == wanted)?;
    Some(ColumnChoice {
        index,
        header: table.headers()[index].clone(),
        non_null: non_null_count(table, index, decimal),
        reason: ChoiceReason::Pinned,
    })
}
