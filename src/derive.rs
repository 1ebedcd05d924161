use log::debug;

use crate::{data::Value, fields::CanonicalField, normalize::NormalizedTable};

/// Writes a descending "min" rank of `by` into `into`: one plus the number of
/// records with a strictly greater value. Records with a null `by` get a null
/// rank. Record order is preserved.
pub fn rank_descending(table: &mut NormalizedTable, by: CanonicalField, into: CanonicalField) {
    let mut scores: Vec<f64> = table
        .records
        .iter()
        .filter_map(|record| record.metric(by))
        .collect();
    scores.sort_by(|a, b| b.total_cmp(a));

    for record in &mut table.records {
        let rank = record.metric(by).map(|score| {
            let above = scores.partition_point(|other| *other > score);
            Value::Integer(above as i64 + 1)
        });
        record.set(into, rank);
    }
    if !table.fields.contains(&into) {
        table.fields.push(into);
    }
    debug!(
        "{}: ranked {} record(s) by {by} into {into}",
        table.source,
        scores.len()
    );
}
