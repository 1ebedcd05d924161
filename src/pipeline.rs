//! End-to-end orchestration: load → normalize → reduce → rank → merge.
//!
//! Every stage below [`load_source`] is a pure function of its input, so the
//! same source bytes always yield the same merged table. Each loaded source is
//! fingerprinted with SHA-256 and the fingerprints are reported in the run
//! [`Manifest`] for callers that memoize results.

use std::{
    fs,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{
    aliases::{AliasCollision, ResolvedAliases, resolve_aliases},
    derive::rank_descending,
    fields::CanonicalField,
    io_utils,
    merge::{MergeReport, MergedTable, OutputColumn, Secondary, merge},
    normalize::{NormalizedTable, normalize},
    profile::{Layout, SourceProfile},
    raw::{RawTable, read_raw_table},
    reduce::{first_per_entity, latest_per_entity},
    select::{ColumnChoice, pinned_column, select_informative_column},
};

#[derive(Debug, Clone)]
pub struct SourceInput {
    pub profile: SourceProfile,
    pub path: Option<PathBuf>,
}

impl SourceInput {
    pub fn new(profile: SourceProfile, path: Option<PathBuf>) -> Self {
        Self { profile, path }
    }

    fn is_available(&self) -> bool {
        match &self.path {
            Some(path) => io_utils::is_dash(path) || path.exists(),
            None => false,
        }
    }
}

/// A source file read into memory alongside its content fingerprint.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub raw: RawTable,
    pub fingerprint: String,
}

#[derive(Debug, Clone)]
pub struct PreparedSource {
    pub table: NormalizedTable,
    pub aliases: ResolvedAliases,
    pub selected: Option<ColumnChoice>,
    pub skipped_rows: usize,
    pub duplicates_dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub missing: bool,
    pub raw_rows: usize,
    pub rows: usize,
    pub skipped_rows: usize,
    pub duplicates_dropped: usize,
    pub resolved: Vec<ResolvedColumn>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub collisions: Vec<AliasCollision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_column: Option<ColumnChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    pub field: CanonicalField,
    pub header: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub tool: String,
    pub version: String,
    pub sources: Vec<SourceSummary>,
    pub merge: MergeReport,
    pub columns: Vec<OutputColumn>,
    pub rows: usize,
}

impl Manifest {
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut writer = io_utils::open_output(Some(path), encoding_rs::UTF_8)?;
        serde_json::to_writer_pretty(&mut writer, self)
            .with_context(|| format!("Writing manifest {path:?}"))?;
        writeln!(writer).context("Writing manifest")?;
        writer.flush().context("Flushing manifest")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub merged: MergedTable,
    pub report: MergeReport,
    pub manifest: Manifest,
}

pub fn fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Reads `path` (stdin for `-`) and parses it with the profile's delimiter
/// and encoding unless `delimiter` overrides it.
pub fn load_source(
    path: &Path,
    profile: &SourceProfile,
    delimiter: Option<u8>,
) -> Result<LoadedSource> {
    let bytes = if io_utils::is_dash(path) {
        let mut buffer = Vec::new();
        std::io::stdin()
            .lock()
            .read_to_end(&mut buffer)
            .context("Reading source from stdin")?;
        buffer
    } else {
        fs::read(path).with_context(|| format!("Reading {} source {path:?}", profile.name()))?
    };
    let fingerprint = fingerprint(&bytes);
    let delimiter = io_utils::resolve_input_delimiter(path, delimiter, profile.delimiter);
    let encoding = io_utils::resolve_encoding(profile.encoding.as_deref())?;
    let raw = read_raw_table(bytes.as_slice(), profile.name(), delimiter, encoding)
        .with_context(|| format!("Parsing {} source {path:?}", profile.name()))?;
    info!(
        "{}: loaded {} row(s) x {} column(s) from {path:?} (sha256 {})",
        profile.name(),
        raw.row_count(),
        raw.width(),
        &fingerprint[..12]
    );
    Ok(LoadedSource { raw, fingerprint })
}

/// Normalizes a raw table and reduces it to one row per entity: the latest
/// year when a year column resolved, otherwise the first row. Derived columns
/// are added last.
pub fn prepare_source(raw: &RawTable, profile: &SourceProfile) -> Result<PreparedSource> {
    let normalized = normalize(raw, profile)?;
    let (mut table, duplicates_dropped) = if normalized.aliases.contains(CanonicalField::Year) {
        let before = normalized.table.len();
        let reduced = latest_per_entity(normalized.table);
        let dropped = before - reduced.len();
        (reduced, dropped)
    } else {
        first_per_entity(normalized.table)
    };
    if let Some(by) = profile.rank_by {
        rank_descending(&mut table, by, CanonicalField::HappinessRank);
    }
    Ok(PreparedSource {
        table,
        aliases: normalized.aliases,
        selected: normalized.selected,
        skipped_rows: normalized.skipped_rows,
        duplicates_dropped,
    })
}

pub fn run_pipeline(primary: &SourceInput, secondaries: &[SourceInput]) -> Result<PipelineOutput> {
    let primary_path = primary
        .path
        .as_deref()
        .ok_or_else(|| anyhow!("No path given for primary source {}", primary.profile.name()))?;
    if !primary.is_available() {
        return Err(anyhow!(
            "Primary source {} not found at {primary_path:?}",
            primary.profile.name()
        ));
    }
    let loaded = load_source(primary_path, &primary.profile, None)?;
    let prepared = prepare_source(&loaded.raw, &primary.profile)?;
    let mut summaries = vec![summarize(primary_path, &loaded, &prepared)];
    let primary_table = prepared.table;

    let mut tables = Vec::with_capacity(secondaries.len());
    for input in secondaries {
        let name = input.profile.name();
        if !input.is_available() {
            match &input.path {
                Some(path) => warn!("{name}: source {path:?} not found; its columns will be null"),
                None => warn!("{name}: no source path given; its columns will be null"),
            }
            summaries.push(missing_summary(input));
            tables.push(Secondary::Missing {
                source: name.to_string(),
                fields: input.profile.output_fields(),
            });
            continue;
        }
        let path = input.path.as_deref().unwrap_or(Path::new("-"));
        let loaded = load_source(path, &input.profile, None)?;
        let prepared = prepare_source(&loaded.raw, &input.profile)?;
        summaries.push(summarize(path, &loaded, &prepared));
        tables.push(Secondary::Loaded(prepared.table));
    }

    let (merged, report) = merge(&primary_table, &tables)?;
    info!(
        "Merged {} row(s) across {} column(s)",
        merged.len(),
        merged.columns.len()
    );
    let manifest = Manifest {
        tool: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        sources: summaries,
        merge: report.clone(),
        columns: merged.columns.clone(),
        rows: merged.len(),
    };
    Ok(PipelineOutput {
        merged,
        report,
        manifest,
    })
}

fn summarize(path: &Path, loaded: &LoadedSource, prepared: &PreparedSource) -> SourceSummary {
    SourceSummary {
        source: prepared.table.source.clone(),
        path: Some(path.display().to_string()),
        sha256: Some(loaded.fingerprint.clone()),
        missing: false,
        raw_rows: loaded.raw.row_count(),
        rows: prepared.table.len(),
        skipped_rows: prepared.skipped_rows,
        duplicates_dropped: prepared.duplicates_dropped,
        resolved: prepared
            .aliases
            .iter()
            .map(|(field, header)| ResolvedColumn {
                field,
                header: header.to_string(),
            })
            .collect(),
        collisions: prepared.aliases.collisions().to_vec(),
        selected_column: prepared.selected.clone(),
    }
}

fn missing_summary(input: &SourceInput) -> SourceSummary {
    SourceSummary {
        source: input.profile.name().to_string(),
        path: input.path.as_ref().map(|p| p.display().to_string()),
        sha256: None,
        missing: true,
        raw_rows: 0,
        rows: 0,
        skipped_rows: 0,
        duplicates_dropped: 0,
        resolved: Vec::new(),
        collisions: Vec::new(),
        selected_column: None,
    }
}

/// Header diagnostics for one source without failing on missing fields.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub headers: Vec<String>,
    pub aliases: ResolvedAliases,
    pub missing: Vec<CanonicalField>,
    pub selected: Option<ColumnChoice>,
}

pub fn inspect(raw: &RawTable, profile: &SourceProfile) -> Inspection {
    match &profile.layout {
        Layout::Named => {
            let aliases = resolve_aliases(raw.headers(), &profile.aliases);
            let mut required = profile.required.clone();
            if !required.contains(&CanonicalField::Entity) {
                required.insert(0, CanonicalField::Entity);
            }
            let missing = aliases.missing(&required);
            Inspection {
                headers: raw.headers().to_vec(),
                aliases,
                missing,
                selected: None,
            }
        }
        Layout::Wide {
            entity_column,
            metric,
            prefer_column,
        } => {
            let mut aliases = ResolvedAliases::default();
            let mut missing = Vec::new();
            match raw.headers().get(*entity_column) {
                Some(header) => aliases.record(CanonicalField::Entity, header),
                None => missing.push(CanonicalField::Entity),
            }
            let selected = prefer_column
                .as_deref()
                .and_then(|h| pinned_column(raw, h, *entity_column, profile.decimal))
                .or_else(|| select_informative_column(raw, *entity_column, profile.decimal));
            if let Some(choice) = &selected {
                aliases.record(*metric, &choice.header);
            }
            Inspection {
                headers: raw.headers().to_vec(),
                aliases,
                missing,
                selected,
            }
        }
    }
}
