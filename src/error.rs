//! Typed failures raised by the normalization and merge stages.
//!
//! Only structural problems are errors. Unparseable cells and unmatched join
//! keys are absorbed into nulls and surface through logs and the merge report.

use itertools::Itertools;
use thiserror::Error;

use crate::fields::CanonicalField;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error(
        "{source_name}: required field(s) not found: {}. Available headers: {}",
        join_fields(.missing),
        quote_headers(.available)
    )]
    MissingFields {
        source_name: String,
        missing: Vec<CanonicalField>,
        available: Vec<String>,
    },

    #[error("{source_name}: no candidate columns besides the entity column")]
    NoCandidateColumns { source_name: String },

    #[error("{source_name}: entity column {index} is out of range ({width} column(s))")]
    EntityColumnOutOfRange {
        source_name: String,
        index: usize,
        width: usize,
    },

    #[error("{source_name}: entity '{entity}' appears in rows {first} and {second}")]
    DuplicateEntity {
        source_name: String,
        entity: String,
        first: usize,
        second: usize,
    },

    #[error("Alias table lists '{spelling}' under both {first} and {second}")]
    AmbiguousAlias {
        spelling: String,
        first: CanonicalField,
        second: CanonicalField,
    },

    #[error("Alias table defines {0} more than once")]
    DuplicateAliasField(CanonicalField),

    #[error("Alias table gives {0} an empty candidate spelling")]
    EmptyAlias(CanonicalField),
}

fn join_fields(fields: &[CanonicalField]) -> String {
    fields.iter().join(", ")
}

fn quote_headers(headers: &[String]) -> String {
    headers.iter().map(|h| format!("'{h}'")).join(", ")
}

impl PipelineError {
    /// Canonical fields the caller has to remap, when the error is structural.
    pub fn missing_fields(&self) -> &[CanonicalField] {
        match self {
            PipelineError::MissingFields { missing, .. } => missing,
            _ => &[],
        }
    }
}
