//! Writers for the merged table.
//!
//! CSV output renders nulls as empty cells; JSON output is an array of
//! objects whose keys follow output column order and whose nulls are `null`.

use std::io::Write;

use anyhow::{Context, Result};
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{
    data::Value,
    io_utils,
    merge::{MergedTable, OutputColumn},
};

pub fn write_csv<W: Write>(table: &MergedTable, writer: W, delimiter: u8) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(writer, delimiter);
    writer
        .write_record(table.headers())
        .context("Writing merged headers")?;
    for (row_idx, row) in table.rows.iter().enumerate() {
        let cells = row
            .values
            .iter()
            .map(|value| value.as_ref().map(Value::as_display).unwrap_or_default());
        writer
            .write_record(cells)
            .with_context(|| format!("Writing merged row {}", row_idx + 1))?;
    }
    writer.flush().context("Flushing CSV output")?;
    Ok(())
}

pub fn write_json<W: Write>(table: &MergedTable, mut writer: W) -> Result<()> {
    let rows: Vec<JsonRow<'_>> = json_rows(table).collect();
    serde_json::to_writer_pretty(&mut writer, &rows).context("Writing JSON output")?;
    writeln!(writer).context("Writing JSON output")?;
    writer.flush().context("Flushing JSON output")?;
    Ok(())
}

/// One merged row as a JSON object keyed by output column, in column order.
pub struct JsonRow<'a> {
    columns: &'a [OutputColumn],
    values: &'a [Option<Value>],
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(self.values) {
            map.serialize_entry(&column.name, value)?;
        }
        map.end()
    }
}

pub fn json_rows(table: &MergedTable) -> impl Iterator<Item = JsonRow<'_>> + '_ {
    table.rows.iter().map(|row| JsonRow {
        columns: &table.columns,
        values: &row.values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fields::CanonicalField, merge::MergedRecord};
    use serde_json::Value as JsonValue;

    fn sample() -> MergedTable {
        let column = |name: &str, field| OutputColumn {
            name: name.to_string(),
            source: "happiness".into(),
            field,
        };
        MergedTable {
            columns: vec![
                column("entity", CanonicalField::Entity),
                column("year", CanonicalField::Year),
                column("score", CanonicalField::Score),
            ],
            rows: vec![
                MergedRecord {
                    values: vec![
                        Some(Value::Text("Atlantis, North".into())),
                        Some(Value::Integer(2021)),
                        Some(Value::Number(7.2)),
                    ],
                },
                MergedRecord {
                    values: vec![Some(Value::Text("Ruritania".into())), None, None],
                },
            ],
        }
    }

    #[test]
    fn csv_quotes_when_needed_and_leaves_nulls_empty() {
        let mut buffer = Vec::new();
        write_csv(&sample(), &mut buffer, b',').unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "entity,year,score\n\"Atlantis, North\",2021,7.2\nRuritania,,\n"
        );
    }

    #[test]
    fn json_keeps_column_order_and_nulls() {
        let table = sample();
        let rows: Vec<String> = json_rows(&table)
            .map(|row| serde_json::to_string(&row).unwrap())
            .collect();
        assert_eq!(
            rows[0],
            r#"{"entity":"Atlantis, North","year":2021,"score":7.2}"#
        );
        assert_eq!(
            rows[1],
            r#"{"entity":"Ruritania","year":null,"score":null}"#
        );

        let mut buffer = Vec::new();
        write_json(&table, &mut buffer).unwrap();
        let parsed: JsonValue = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
    }
}
