use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use keysplit::error::{ErrorKind, SplitResult};
use keysplit::split_error;
use keysplit_config::shared::{OutputMode, SplitterConfig, VocabularyConfig};
use keysplit_telemetry::tracing::LogFormat;

/// Splits a large delimited file into one file per key value in a single pass.
#[derive(Debug, Parser)]
#[command(name = "keysplit", version, about, arg_required_else_help = true)]
pub struct AppArgs {
    /// Delimited input file whose first line is the header
    #[arg(long, short)]
    pub input: PathBuf,

    /// Key value to extract, repeat for several keys
    #[arg(long = "key", short = 'k', value_name = "NAME")]
    pub keys: Vec<String>,

    /// File listing one key value per line
    #[arg(long, value_name = "PATH")]
    pub keys_file: Option<PathBuf>,

    /// Output prefix: `dir/`, `dir/stem` or `stem` (default: current directory)
    #[arg(long, short)]
    pub prefix: Option<String>,

    /// Field delimiter, a single character or `tab`
    #[arg(long, short, value_parser = parse_delimiter)]
    pub delimiter: Option<char>,

    /// Header name of the key column
    #[arg(long)]
    pub key_field: Option<String>,

    /// Replace existing output files
    #[arg(long)]
    pub overwrite: bool,

    /// Open and close the output file for every routed row
    #[arg(long)]
    pub reopen_per_row: bool,

    /// Sync every routed row to disk
    #[arg(long)]
    pub sync_each_row: bool,

    /// Taxonomy table used to resolve key names
    #[arg(long, value_name = "PATH")]
    pub vocabulary: Option<PathBuf>,

    /// Configuration file, or a directory holding `keysplit.yaml` / `keysplit.json`
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the split summary as JSON instead of one path per line
    #[arg(long)]
    pub json: bool,

    /// Format of log lines written to stderr
    #[arg(long, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl AppArgs {
    /// Applies the command line flags on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut SplitterConfig) {
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        if let Some(key_field) = &self.key_field {
            config.key_field = key_field.clone();
        }
        if self.overwrite {
            config.overwrite = true;
        }
        if self.reopen_per_row {
            config.output_mode = OutputMode::ReopenPerRow;
        }
        if self.sync_each_row {
            config.sync_each_row = true;
        }
        if let Some(path) = &self.vocabulary {
            match config.vocabulary.as_mut() {
                Some(vocabulary) => vocabulary.path = path.clone(),
                None => {
                    config.vocabulary = Some(VocabularyConfig {
                        path: path.clone(),
                        canonical_column: SplitterConfig::DEFAULT_KEY_FIELD.to_string(),
                        delimiter: None,
                    })
                }
            }
        }
    }

    /// Returns the `--key` values followed by the entries of `--keys-file`.
    pub fn requested_keys(&self) -> SplitResult<Vec<String>> {
        let mut keys = self.keys.clone();
        if let Some(path) = &self.keys_file {
            keys.extend(read_keys_file(path)?);
        }

        Ok(keys)
    }
}

/// Reads one key per line, skipping blank lines.
fn read_keys_file(path: &Path) -> SplitResult<Vec<String>> {
    let contents = fs::read_to_string(path).map_err(|err| {
        split_error!(
            ErrorKind::InputNotFound,
            "Failed to read keys file",
            path.display(),
            source: err
        )
    })?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn parse_delimiter(value: &str) -> Result<char, String> {
    if matches!(value, "tab" | "\\t") {
        return Ok('\t');
    }

    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(delimiter), None) => Ok(delimiter),
        _ => Err(format!("expected a single character or `tab`, got `{value}`")),
    }
}
