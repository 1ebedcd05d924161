//! Canonical field vocabulary shared by every stage of the pipeline.
//!
//! A [`CanonicalField`] is the stable name a column is known by once alias
//! resolution has run. Each field has a [`FieldKind`] that decides how its raw
//! cells are coerced, and an output name used in merged tables.

use std::{fmt, str::FromStr};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Region assigned to entities whose source carries no region column or a
/// blank region cell.
pub const UNKNOWN_REGION: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Entity,
    Region,
    Year,
    HappinessRank,
    Score,
    Gdp,
    SocialSupport,
    HealthyLifeExpectancy,
    Freedom,
    Generosity,
    Corruption,
    DystopiaResidual,
    IncomeGroup,
    LifeExpectancy,
    HealthExpenditure,
    EducationExpenditure,
    Undernourishment,
    Co2,
    Unemployment,
    PeaceScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// The join key. Always a non-empty string.
    Key,
    Text,
    Integer,
    Numeric,
}

impl CanonicalField {
    pub const ALL: &'static [CanonicalField] = &[
        CanonicalField::Entity,
        CanonicalField::Region,
        CanonicalField::Year,
        CanonicalField::HappinessRank,
        CanonicalField::Score,
        CanonicalField::Gdp,
        CanonicalField::SocialSupport,
        CanonicalField::HealthyLifeExpectancy,
        CanonicalField::Freedom,
        CanonicalField::Generosity,
        CanonicalField::Corruption,
        CanonicalField::DystopiaResidual,
        CanonicalField::IncomeGroup,
        CanonicalField::LifeExpectancy,
        CanonicalField::HealthExpenditure,
        CanonicalField::EducationExpenditure,
        CanonicalField::Undernourishment,
        CanonicalField::Co2,
        CanonicalField::Unemployment,
        CanonicalField::PeaceScore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Entity => "entity",
            CanonicalField::Region => "region",
            CanonicalField::Year => "year",
            CanonicalField::HappinessRank => "happiness_rank",
            CanonicalField::Score => "score",
            CanonicalField::Gdp => "gdp",
            CanonicalField::SocialSupport => "social_support",
            CanonicalField::HealthyLifeExpectancy => "healthy_life_expectancy",
            CanonicalField::Freedom => "freedom",
            CanonicalField::Generosity => "generosity",
            CanonicalField::Corruption => "corruption",
            CanonicalField::DystopiaResidual => "dystopia_residual",
            CanonicalField::IncomeGroup => "income_group",
            CanonicalField::LifeExpectancy => "life_expectancy",
            CanonicalField::HealthExpenditure => "health_expenditure",
            CanonicalField::EducationExpenditure => "education_expenditure",
            CanonicalField::Undernourishment => "undernourishment",
            CanonicalField::Co2 => "co2",
            CanonicalField::Unemployment => "unemployment",
            CanonicalField::PeaceScore => "peace_score",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            CanonicalField::Entity => FieldKind::Key,
            CanonicalField::Region | CanonicalField::IncomeGroup => FieldKind::Text,
            CanonicalField::Year | CanonicalField::HappinessRank => FieldKind::Integer,
            _ => FieldKind::Numeric,
        }
    }

    pub fn is_metric(&self) -> bool {
        matches!(self.kind(), FieldKind::Numeric)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalField {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        CanonicalField::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == wanted)
            .ok_or_else(|| anyhow!("Unknown canonical field '{value}'"))
    }
}

/// Normalizes a header or entity name for case-insensitive lookup.
///
/// Trims, collapses internal whitespace runs to a single space, and lowercases.
/// Header resolution and entity joins both go through this function so a key
/// that resolves as a header also matches as a join key.
pub fn normalize_key(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_key_trims_collapses_and_lowercases() {
        assert_eq!(normalize_key("  Country   Name "), "country name");
        assert_eq!(normalize_key("CÔTE D'IVOIRE"), "côte d'ivoire");
        assert_eq!(normalize_key("\tLadder\nscore"), "ladder score");
        assert_eq!(normalize_key("   "), "");
    }

    #[test]
    fn canonical_field_parses_loose_spellings() {
        assert_eq!(
            "peace-score".parse::<CanonicalField>().unwrap(),
            CanonicalField::PeaceScore
        );
        assert_eq!(
            " Social Support ".parse::<CanonicalField>().unwrap(),
            CanonicalField::SocialSupport
        );
        assert!("happiness".parse::<CanonicalField>().is_err());
    }

    #[test]
    fn every_field_round_trips_through_its_output_name() {
        for field in CanonicalField::ALL {
            assert_eq!(field.as_str().parse::<CanonicalField>().unwrap(), *field);
        }
    }

    #[test]
    fn field_kinds_partition_metrics() {
        assert_eq!(CanonicalField::Entity.kind(), FieldKind::Key);
        assert_eq!(CanonicalField::IncomeGroup.kind(), FieldKind::Text);
        assert_eq!(CanonicalField::Year.kind(), FieldKind::Integer);
        assert!(CanonicalField::Co2.is_metric());
        assert!(!CanonicalField::Region.is_metric());
    }
}
