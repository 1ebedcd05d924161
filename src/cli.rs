use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::profile::SourceKind;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Normalize and merge country wellbeing datasets",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Normalize the happiness, life-expectancy and peace-index sources and merge them per country
    Merge(MergeArgs),
    /// Show how a source's headers resolve to canonical fields
    Resolve(ResolveArgs),
    /// Write a source's built-in alias table as YAML
    Aliases(AliasesArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Happiness report CSV (the primary source; one output row per country)
    #[arg(long)]
    pub happiness: Option<PathBuf>,
    /// Life-expectancy time series CSV
    #[arg(long)]
    pub life: Option<PathBuf>,
    /// Peace-index CSV
    #[arg(long)]
    pub peace: Option<PathBuf>,
    /// YAML pipeline configuration overriding built-in source profiles
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Output file (stdout when omitted or '-')
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value = "csv")]
    pub format: OutputFormat,
    /// Output CSV delimiter (supports ',', 'tab', ';', '|')
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding for the output file/stdout (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
    /// Print an aligned preview of the merged table to stdout
    #[arg(long)]
    pub table: bool,
    /// Limit the number of rows shown by --table
    #[arg(long)]
    pub limit: Option<usize>,
    /// Write a JSON run manifest (fingerprints, resolutions, match rates)
    #[arg(long)]
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Input CSV file to inspect ('-' for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Which source profile to resolve against
    #[arg(long, value_enum)]
    pub source: SourceKind,
    /// YAML pipeline configuration overriding built-in source profiles
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// CSV delimiter character (defaults to the source profile's)
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct AliasesArgs {
    /// Which source profile's alias table to write
    #[arg(long, value_enum)]
    pub source: SourceKind,
    /// Destination YAML file (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delimiter_accepts_names_and_single_characters() {
        assert_eq!(parse_delimiter("semicolon"), Ok(b';'));
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(":"), Ok(b':'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("::").is_err());
        assert!(parse_delimiter("§").is_err());
    }

    #[test]
    fn merge_args_parse() {
        let cli = Cli::try_parse_from([
            "wellbeing-merge",
            "merge",
            "--happiness",
            "h.csv",
            "--peace",
            "p.csv",
            "--format",
            "json",
            "--table",
            "--limit",
            "5",
        ])
        .unwrap();
        let Commands::Merge(args) = cli.command else {
            panic!("expected merge command");
        };
        assert_eq!(args.happiness, Some(PathBuf::from("h.csv")));
        assert_eq!(args.life, None);
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.table);
        assert_eq!(args.limit, Some(5));
    }

    #[test]
    fn source_kind_uses_kebab_case() {
        let cli = Cli::try_parse_from([
            "wellbeing-merge",
            "resolve",
            "-i",
            "x.csv",
            "--source",
            "life-expectancy",
        ])
        .unwrap();
        let Commands::Resolve(args) = cli.command else {
            panic!("expected resolve command");
        };
        assert_eq!(args.source, SourceKind::LifeExpectancy);
    }
}
