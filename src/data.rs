use std::fmt;

use serde::{Deserialize, Serialize};

/// A cell as it arrives from a source, before any coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
}

impl RawCell {
    pub fn from_text(value: &str) -> Self {
        if value.trim().is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(value.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(text) => text.trim().is_empty(),
            RawCell::Number(_) => false,
        }
    }

    /// Trimmed textual form, `None` for empty cells.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawCell::Empty => None,
            RawCell::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            RawCell::Number(n) => Some(Value::Number(*n).as_display()),
        }
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        RawCell::from_text(value)
    }
}

impl From<f64> for RawCell {
    fn from(value: f64) -> Self {
        RawCell::Number(value)
    }
}

/// Decimal separator used by a source's numeric literals. Declared per
/// source, never sniffed from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalSeparator {
    #[default]
    Period,
    Comma,
}

/// A coerced, typed value. Nulls are represented by `Option<Value>::None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Integer(i64),
    Number(f64),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Number(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Text(_) => None,
            Value::Integer(i) => Some(*i as f64),
            Value::Number(f) => Some(*f),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Coerces a raw cell into a finite number.
///
/// Never fails: empty cells, unparseable text, and non-finite results all
/// yield `None`. With [`DecimalSeparator::Comma`] the first comma is read as
/// the decimal point.
pub fn coerce_numeric(cell: &RawCell, decimal: DecimalSeparator) -> Option<f64> {
    match cell {
        RawCell::Empty => None,
        RawCell::Number(n) => n.is_finite().then_some(*n),
        RawCell::Text(text) => parse_numeric_str(text, decimal),
    }
}

pub fn parse_numeric_str(value: &str, decimal: DecimalSeparator) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = match decimal {
        DecimalSeparator::Period => trimmed.parse::<f64>().ok(),
        DecimalSeparator::Comma => trimmed.replacen(',', ".", 1).parse::<f64>().ok(),
    };
    parsed.filter(|n| n.is_finite())
}

/// Coerces a raw cell into a calendar year: a whole number that fits `i32`.
pub fn coerce_year(cell: &RawCell, decimal: DecimalSeparator) -> Option<i32> {
    let value = coerce_numeric(cell, decimal)?;
    if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
        return None;
    }
    Some(value as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_numeric_trims_and_parses() {
        assert_eq!(
            coerce_numeric(&RawCell::from(" 7.25 "), DecimalSeparator::Period),
            Some(7.25)
        );
        assert_eq!(
            coerce_numeric(&RawCell::from("-0.5"), DecimalSeparator::Period),
            Some(-0.5)
        );
        assert_eq!(
            coerce_numeric(&RawCell::from("1e3"), DecimalSeparator::Period),
            Some(1000.0)
        );
    }

    #[test]
    fn coerce_numeric_returns_none_for_invalid_input() {
        for raw in ["", "   ", "n/a", "1,5", "12abc", "NaN", "inf", "-infinity"] {
            assert_eq!(
                coerce_numeric(&RawCell::from(raw), DecimalSeparator::Period),
                None,
                "expected null for {raw:?}"
            );
        }
        assert_eq!(coerce_numeric(&RawCell::Empty, DecimalSeparator::Comma), None);
        assert_eq!(
            coerce_numeric(&RawCell::Number(f64::NAN), DecimalSeparator::Period),
            None
        );
    }

    #[test]
    fn coerce_numeric_reads_comma_decimals_when_flagged() {
        assert_eq!(
            coerce_numeric(&RawCell::from("1,9"), DecimalSeparator::Comma),
            Some(1.9)
        );
        assert_eq!(
            coerce_numeric(&RawCell::from("2.1"), DecimalSeparator::Comma),
            Some(2.1)
        );
        // Only the first comma becomes a decimal point.
        assert_eq!(
            coerce_numeric(&RawCell::from("1,234,5"), DecimalSeparator::Comma),
            None
        );
    }

    #[test]
    fn coerce_numeric_passes_numbers_through() {
        let cell = RawCell::Number(82.0);
        assert_eq!(coerce_numeric(&cell, DecimalSeparator::Period), Some(82.0));
        assert_eq!(coerce_numeric(&cell, DecimalSeparator::Comma), Some(82.0));
    }

    #[test]
    fn coerce_year_requires_whole_numbers() {
        assert_eq!(
            coerce_year(&RawCell::from("2021"), DecimalSeparator::Period),
            Some(2021)
        );
        assert_eq!(
            coerce_year(&RawCell::from("2021.0"), DecimalSeparator::Period),
            Some(2021)
        );
        assert_eq!(
            coerce_year(&RawCell::from("2021.5"), DecimalSeparator::Period),
            None
        );
        assert_eq!(
            coerce_year(&RawCell::from("1e12"), DecimalSeparator::Period),
            None
        );
        assert_eq!(coerce_year(&RawCell::Empty, DecimalSeparator::Period), None);
    }

    #[test]
    fn value_display_drops_integral_fraction() {
        assert_eq!(Value::Number(82.0).as_display(), "82");
        assert_eq!(Value::Number(7.2).as_display(), "7.2");
        assert_eq!(Value::Integer(3).as_display(), "3");
        assert_eq!(Value::Text("High income".into()).as_display(), "High income");
    }

    #[test]
    fn raw_cell_from_text_detects_blank_cells() {
        assert_eq!(RawCell::from_text("  "), RawCell::Empty);
        assert!(RawCell::Text(" ".into()).is_empty());
        assert_eq!(RawCell::from("x").as_text().as_deref(), Some("x"));
        assert_eq!(RawCell::Number(2.5).as_text().as_deref(), Some("2.5"));
    }
}
