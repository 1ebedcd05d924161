pub mod aliases;
pub mod cli;
pub mod config;
pub mod data;
pub mod derive;
pub mod error;
pub mod fields;
pub mod io_utils;
pub mod merge;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod profile;
pub mod raw;
pub mod reduce;
pub mod select;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use itertools::Itertools;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{AliasesArgs, Cli, Commands, MergeArgs, OutputFormat, ResolveArgs},
    config::PipelineConfig,
    error::PipelineError,
    pipeline::SourceInput,
    profile::SourceKind,
    table::Align,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("wellbeing_merge", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Merge(args) => handle_merge(&args),
        Commands::Resolve(args) => handle_resolve(&args),
        Commands::Aliases(args) => handle_aliases(&args),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            PipelineConfig::load(path).with_context(|| format!("Loading config from {path:?}"))
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn handle_merge(args: &MergeArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let input = |kind: SourceKind, cli_path: &Option<std::path::PathBuf>| -> Result<SourceInput> {
        let path = cli_path
            .clone()
            .or_else(|| config.path(kind).map(|p| p.to_path_buf()));
        Ok(SourceInput::new(config.profile(kind)?, path))
    };
    let primary = input(SourceKind::Happiness, &args.happiness)?;
    if primary.path.is_none() {
        return Err(anyhow!(
            "No happiness source given; pass --happiness or set happiness.path in the config"
        ));
    }
    let secondaries = [
        input(SourceKind::LifeExpectancy, &args.life)?,
        input(SourceKind::PeaceIndex, &args.peace)?,
    ];

    let result = pipeline::run_pipeline(&primary, &secondaries)?;
    for source in &result.report.sources {
        debug!(
            "{}: {} row(s), {} matched ({:.1}%)",
            source.source,
            source.rows,
            source.matched,
            source.match_rate() * 100.0
        );
    }

    if args.table {
        print!("{}", table::render_merged(&result.merged, args.limit));
    }
    // With --table and no --output the preview is the only thing on stdout.
    if !args.table || args.output.is_some() {
        let encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;
        let writer = io_utils::open_output(args.output.as_deref(), encoding)?;
        match args.format {
            OutputFormat::Csv => {
                let delimiter =
                    io_utils::resolve_output_delimiter(args.output.as_deref(), args.output_delimiter);
                debug!("Writing CSV with delimiter '{}'", printable_delimiter(delimiter));
                output::write_csv(&result.merged, writer, delimiter)?;
            }
            OutputFormat::Json => output::write_json(&result.merged, writer)?,
        }
        if let Some(path) = &args.output {
            info!("Wrote {} merged row(s) to {path:?}", result.merged.len());
        }
    }

    if let Some(path) = &args.manifest {
        result.manifest.write(path)?;
        info!("Run manifest written to {path:?}");
    }
    Ok(())
}

fn handle_resolve(args: &ResolveArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let profile = config.profile(args.source)?;
    info!(
        "Resolving '{}' as {} with delimiter '{}'",
        args.input.display(),
        profile.name(),
        printable_delimiter(io_utils::resolve_input_delimiter(
            &args.input,
            args.delimiter,
            profile.delimiter
        ))
    );
    let loaded = pipeline::load_source(&args.input, &profile, args.delimiter)?;
    let inspection = pipeline::inspect(&loaded.raw, &profile);

    let rows: Vec<Vec<String>> = inspection
        .headers
        .iter()
        .map(|header| {
            let field = inspection
                .aliases
                .field_for(header)
                .map(|f| f.to_string())
                .unwrap_or_default();
            vec![header.clone(), field]
        })
        .collect();
    print!(
        "{}",
        table::render_table(
            &["header".to_string(), "field".to_string()],
            &rows,
            &[Align::Left, Align::Left]
        )
    );
    for collision in inspection.aliases.collisions() {
        println!(
            "collision: '{}' claimed by {}, skipped for {}",
            collision.header, collision.claimed_by, collision.skipped
        );
    }
    if let Some(choice) = &inspection.selected {
        println!(
            "selected column: '{}' (index {}, {} numeric value(s), {:?})",
            choice.header, choice.index, choice.non_null, choice.reason
        );
    }
    if inspection.missing.is_empty() {
        println!("sha256: {}", loaded.fingerprint);
        Ok(())
    } else {
        println!("missing: {}", inspection.missing.iter().join(", "));
        Err(PipelineError::MissingFields {
            source_name: profile.name().to_string(),
            missing: inspection.missing,
            available: inspection.headers,
        }
        .into())
    }
}

fn handle_aliases(args: &AliasesArgs) -> Result<()> {
    let aliases = args.source.profile().aliases;
    match &args.output {
        Some(path) => {
            aliases
                .save(path)
                .with_context(|| format!("Writing alias table to {path:?}"))?;
            info!(
                "Alias table for {} field(s) written to {path:?}",
                aliases.fields.len()
            );
        }
        None => print!("{}", aliases.to_yaml_string()?),
    }
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
