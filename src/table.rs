//! Plain-text column alignment for terminal previews.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::{data::Value, fields::FieldKind, merge::MergedTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

pub fn render_table(headers: &[String], rows: &[Vec<String>], align: &[Align]) -> String {
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, align));
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths, &[]));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, align));
    }
    output
}

/// Renders up to `limit` rows of a merged table. Numeric columns are
/// right-aligned and nulls print as empty cells.
pub fn render_merged(table: &MergedTable, limit: Option<usize>) -> String {
    let headers: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    let align: Vec<Align> = table
        .columns
        .iter()
        .map(|c| match c.field.kind() {
            FieldKind::Integer | FieldKind::Numeric => Align::Right,
            FieldKind::Key | FieldKind::Text => Align::Left,
        })
        .collect();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|row| {
            row.values
                .iter()
                .map(|v| v.as_ref().map(Value::as_display).unwrap_or_default())
                .collect()
        })
        .collect();
    render_table(&headers, &rows, &align)
}

fn format_row(values: &[String], widths: &[usize], align: &[Align]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate().take(widths.len()) {
        let sanitized = sanitize_cell(value);
        let padding = " ".repeat(widths[idx].saturating_sub(display_width(&sanitized)));
        let cell = match align.get(idx).copied().unwrap_or(Align::Left) {
            Align::Left => format!("{sanitized}{padding}"),
            Align::Right => format!("{padding}{sanitized}"),
        };
        cells.push(cell);
    }
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
