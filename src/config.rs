//! YAML pipeline configuration.
//!
//! Every key is optional. A section only overrides what it names; the rest of
//! the source's built-in profile stays in effect.
//!
//! ```yaml
//! happiness:
//!   path: data/world-happiness-report-2023.csv
//!   aliases:
//!     - field: score
//!       candidates: [ladder score, happiness score]
//! life_expectancy:
//!   path: data/life_expectancy.csv
//!   required: [entity, year, life_expectancy]
//! peace_index:
//!   path: data/peace_index.csv
//!   delimiter: ";"
//!   decimal: comma
//!   score_column: "2023"
//! ```

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    aliases::AliasTable,
    cli::parse_delimiter,
    data::DecimalSeparator,
    fields::CanonicalField,
    profile::{Layout, SourceKind, SourceProfile},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub happiness: Option<SourceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub life_expectancy: Option<SourceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peace_index: Option<SourceConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal: Option<DecimalSeparator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<AliasTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<CanonicalField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_column: Option<usize>,
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: PipelineConfig =
            serde_yaml::from_reader(reader).context("Parsing pipeline config YAML")?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Parsing pipeline config YAML")
    }

    pub fn section(&self, kind: SourceKind) -> Option<&SourceConfig> {
        match kind {
            SourceKind::Happiness => self.happiness.as_ref(),
            SourceKind::LifeExpectancy => self.life_expectancy.as_ref(),
            SourceKind::PeaceIndex => self.peace_index.as_ref(),
        }
    }

    /// The built-in profile for `kind` with this config's overrides applied.
    pub fn profile(&self, kind: SourceKind) -> Result<SourceProfile> {
        let mut profile = kind.profile();
        if let Some(section) = self.section(kind) {
            section
                .apply(&mut profile)
                .with_context(|| format!("Applying '{}' config section", kind.as_str()))?;
        }
        Ok(profile)
    }

    pub fn path(&self, kind: SourceKind) -> Option<&Path> {
        self.section(kind).and_then(|s| s.path.as_deref())
    }
}

impl SourceConfig {
    pub fn apply(&self, profile: &mut SourceProfile) -> Result<()> {
        if let Some(delimiter) = &self.delimiter {
            profile.delimiter =
                parse_delimiter(delimiter).map_err(|err| anyhow!("delimiter: {err}"))?;
        }
        if let Some(decimal) = self.decimal {
            profile.decimal = decimal;
        }
        if let Some(encoding) = &self.encoding {
            profile.encoding = Some(encoding.clone());
        }
        if let Some(aliases) = &self.aliases {
            profile.aliases.overlay(aliases);
            profile.aliases.validate()?;
        }
        if let Some(required) = &self.required {
            profile.required = required.clone();
        }
        let name = profile.name();
        match &mut profile.layout {
            Layout::Wide {
                entity_column,
                prefer_column,
                ..
            } => {
                if let Some(column) = self.entity_column {
                    *entity_column = column;
                }
                if let Some(column) = &self.score_column {
                    *prefer_column = Some(column.clone());
                }
            }
            Layout::Named => {
                if self.score_column.is_some() || self.entity_column.is_some() {
                    warn!(
                        "{name}: score_column/entity_column only apply to column-selected sources; ignoring"
                    );
                }
            }
        }
        Ok(())
    }
}
