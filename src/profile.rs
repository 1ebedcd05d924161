//! Built-in source profiles.
//!
//! A [`SourceProfile`] captures everything release-specific about one input:
//! delimiter, decimal locale, the alias table its headers are resolved with,
//! which canonical fields must resolve, and how its informative columns are
//! laid out.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{aliases::AliasTable, data::DecimalSeparator, fields::CanonicalField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[value(rename_all = "kebab-case")]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Happiness,
    LifeExpectancy,
    PeaceIndex,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Happiness => "happiness",
            SourceKind::LifeExpectancy => "life_expectancy",
            SourceKind::PeaceIndex => "peace_index",
        }
    }

    pub fn profile(&self) -> SourceProfile {
        match self {
            SourceKind::Happiness => SourceProfile::happiness(),
            SourceKind::LifeExpectancy => SourceProfile::life_expectancy(),
            SourceKind::PeaceIndex => SourceProfile::peace_index(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// Every informative column is identified by header through the alias table.
    Named,
    /// The entity sits in a fixed column and one metric lives in whichever of
    /// the remaining columns carries the most numeric values.
    Wide {
        entity_column: usize,
        metric: CanonicalField,
        prefer_column: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceProfile {
    pub kind: SourceKind,
    pub delimiter: u8,
    pub decimal: DecimalSeparator,
    pub encoding: Option<String>,
    pub aliases: AliasTable,
    pub required: Vec<CanonicalField>,
    pub layout: Layout,
    /// Metric ranked descending into `happiness_rank` after reduction.
    pub rank_by: Option<CanonicalField>,
}

impl SourceProfile {
    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn happiness() -> Self {
        let aliases = AliasTable::new()
            .with(
                CanonicalField::Entity,
                &["country name", "country", "countryname", "name"],
            )
            .with(CanonicalField::Year, &["year"])
            .with(
                CanonicalField::Region,
                &[
                    "regional indicator",
                    "region",
                    "regional_indicator",
                    "subregion",
                    "continent",
                ],
            )
            .with(
                CanonicalField::Score,
                &["ladder score", "life ladder", "happiness score", "score"],
            )
            .with(
                CanonicalField::Gdp,
                &[
                    "logged gdp per capita",
                    "gdp per capita",
                    "log gdp per capita",
                    "gdp",
                ],
            )
            .with(
                CanonicalField::SocialSupport,
                &["social support", "social_support"],
            )
            .with(
                CanonicalField::HealthyLifeExpectancy,
                &[
                    "healthy life expectancy at birth",
                    "healthy life expectancy",
                    "life expectancy",
                ],
            )
            .with(
                CanonicalField::Freedom,
                &["freedom to make life choices", "freedom"],
            )
            .with(CanonicalField::Generosity, &["generosity"])
            .with(
                CanonicalField::Corruption,
                &["perceptions of corruption", "corruption"],
            )
            .with(
                CanonicalField::DystopiaResidual,
                &["dystopia + residual", "dystopia residual"],
            );
        Self {
            kind: SourceKind::Happiness,
            delimiter: b',',
            decimal: DecimalSeparator::Period,
            encoding: None,
            aliases,
            required: vec![CanonicalField::Entity, CanonicalField::Score],
            layout: Layout::Named,
            rank_by: Some(CanonicalField::Score),
        }
    }

    pub fn life_expectancy() -> Self {
        let aliases = AliasTable::new()
            .with(
                CanonicalField::Entity,
                &["country name", "country", "entity"],
            )
            .with(CanonicalField::Year, &["year"])
            .with(CanonicalField::Region, &["region"])
            .with(CanonicalField::IncomeGroup, &["incomegroup", "income group"])
            .with(
                CanonicalField::LifeExpectancy,
                &["life expectancy world bank", "life expectancy"],
            )
            .with(
                CanonicalField::HealthExpenditure,
                &["health expenditure %", "health expenditure"],
            )
            .with(
                CanonicalField::EducationExpenditure,
                &["education expenditure %", "education expenditure"],
            )
            .with(
                CanonicalField::Undernourishment,
                &[
                    "prevelance of undernourishment",
                    "prevalence of undernourishment",
                    "undernourishment",
                ],
            )
            .with(CanonicalField::Co2, &["co2", "co2 emissions"])
            .with(CanonicalField::Unemployment, &["unemployment"]);
        Self {
            kind: SourceKind::LifeExpectancy,
            delimiter: b',',
            decimal: DecimalSeparator::Period,
            encoding: None,
            aliases,
            required: vec![CanonicalField::Entity, CanonicalField::Year],
            layout: Layout::Named,
            rank_by: None,
        }
    }

    pub fn peace_index() -> Self {
        Self {
            kind: SourceKind::PeaceIndex,
            delimiter: b';',
            decimal: DecimalSeparator::Comma,
            encoding: None,
            aliases: AliasTable::new(),
            required: vec![CanonicalField::Entity],
            layout: Layout::Wide {
                entity_column: 0,
                metric: CanonicalField::PeaceScore,
                prefer_column: None,
            },
            rank_by: None,
        }
    }

    /// Columns every normalized table of this profile carries, in output
    /// order, whether or not the source provided them. Entity is implied;
    /// region and year are carried by every named-layout source.
    pub fn output_fields(&self) -> Vec<CanonicalField> {
        let mut fields = Vec::new();
        if self.layout == Layout::Named {
            fields.extend([CanonicalField::Region, CanonicalField::Year]);
        }
        if self.rank_by.is_some() {
            fields.push(CanonicalField::HappinessRank);
        }
        for field in self.aliases.fields() {
            if !fields.contains(&field) && field != CanonicalField::Entity {
                fields.push(field);
            }
        }
        if let Layout::Wide { metric, .. } = &self.layout
            && !fields.contains(metric)
        {
            fields.push(*metric);
        }
        fields
    }
}
