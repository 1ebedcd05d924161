//! One row per entity.
//!
//! [`latest_per_entity`] collapses a per-(entity, year) series to the latest
//! dated row of each entity. [`first_per_entity`] deduplicates sources that
//! carry no year. Both group by the normalized entity key and emit entities
//! in order of first appearance.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::normalize::{NormalizedRecord, NormalizedTable};

/// Keeps, per entity, the record with the greatest year. Null years rank
/// below every dated year; among equal years the later input row wins.
pub fn latest_per_entity(table: NormalizedTable) -> NormalizedTable {
    let NormalizedTable {
        source,
        fields,
        records,
    } = table;
    let input_rows = records.len();

    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<NormalizedRecord> = Vec::new();
    for record in records {
        let key = record.key();
        match slots.get(&key) {
            Some(&slot) => {
                // `Option` orders `None` below any `Some`, matching the rule
                // for undated rows.
                if record.year >= kept[slot].year {
                    kept[slot] = record;
                }
            }
            None => {
                slots.insert(key, kept.len());
                kept.push(record);
            }
        }
    }

    info!(
        "{source}: reduced {input_rows} row(s) to {} entity row(s) (latest year)",
        kept.len()
    );
    NormalizedTable::new(source, fields, kept)
}

/// Keeps the first record per entity and returns how many were dropped.
pub fn first_per_entity(table: NormalizedTable) -> (NormalizedTable, usize) {
    let NormalizedTable {
        source,
        fields,
        records,
    } = table;

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<NormalizedRecord> = Vec::with_capacity(records.len());
    let mut dropped = 0usize;
    for (row_idx, record) in records.into_iter().enumerate() {
        let key = record.key();
        if let Some(first) = seen.get(&key) {
            debug!(
                "{source}: dropping duplicate '{}' at row {} (first seen at row {})",
                record.entity,
                row_idx + 1,
                first + 1
            );
            dropped += 1;
            continue;
        }
        seen.insert(key, row_idx);
        kept.push(record);
    }
    if dropped > 0 {
        warn!("{source}: dropped {dropped} duplicate entity row(s), keeping the first of each");
    }
    (NormalizedTable::new(source, fields, kept), dropped)
}
