use serde::{Deserialize, Serialize};

use crate::shared::{ValidationError, VocabularyConfig, base::validate_delimiter};

/// How the router holds output files while a pass is running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Every output file stays open, behind a buffered writer, for the whole pass.
    #[default]
    KeepOpen,
    /// Each matched row opens its output file in append mode, writes, and closes it again.
    ///
    /// Slower, but never holds more than one output handle at a time.
    ReopenPerRow,
}

/// Settings for one split pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SplitterConfig {
    /// Header name of the key column, matched case-insensitively.
    #[serde(default = "default_key_field")]
    pub key_field: String,
    /// Field separator shared by the input and every output file.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Deletes pre-existing output files instead of failing.
    #[serde(default)]
    pub overwrite: bool,
    /// Output handle strategy.
    #[serde(default)]
    pub output_mode: OutputMode,
    /// Flushes and syncs the target file to disk after every routed row.
    #[serde(default)]
    pub sync_each_row: bool,
    /// Buffer capacity of each output writer in [`OutputMode::KeepOpen`].
    #[serde(default = "default_write_buffer_bytes")]
    pub write_buffer_bytes: usize,
    /// Number of scanned records between progress log lines. Zero disables progress logging.
    #[serde(default = "default_progress_interval_rows")]
    pub progress_interval_rows: u64,
    /// Taxonomy table used to resolve requested keys.
    ///
    /// When absent, requested keys are used verbatim as canonical keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<VocabularyConfig>,
}

impl SplitterConfig {
    /// Default key column name.
    pub const DEFAULT_KEY_FIELD: &'static str = "scientific name";

    /// Default field delimiter.
    pub const DEFAULT_DELIMITER: char = '\t';

    /// Default output writer buffer capacity.
    pub const DEFAULT_WRITE_BUFFER_BYTES: usize = 64 * 1024;

    /// Default number of records between progress log lines.
    pub const DEFAULT_PROGRESS_INTERVAL_ROWS: u64 = 1_000_000;

    /// Validates the splitter configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.key_field.trim().is_empty() {
            return Err(ValidationError::EmptyField {
                field: "key_field".to_string(),
            });
        }

        validate_delimiter("delimiter", self.delimiter)?;

        if self.write_buffer_bytes == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "write_buffer_bytes".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        if let Some(vocabulary) = &self.vocabulary {
            vocabulary.validate()?;
        }

        Ok(())
    }
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            key_field: default_key_field(),
            delimiter: default_delimiter(),
            overwrite: false,
            output_mode: OutputMode::default(),
            sync_each_row: false,
            write_buffer_bytes: default_write_buffer_bytes(),
            progress_interval_rows: default_progress_interval_rows(),
            vocabulary: None,
        }
    }
}

pub(crate) fn default_key_field() -> String {
    SplitterConfig::DEFAULT_KEY_FIELD.to_string()
}

fn default_delimiter() -> char {
    SplitterConfig::DEFAULT_DELIMITER
}

fn default_write_buffer_bytes() -> usize {
    SplitterConfig::DEFAULT_WRITE_BUFFER_BYTES
}

fn default_progress_interval_rows() -> u64 {
    SplitterConfig::DEFAULT_PROGRESS_INTERVAL_ROWS
}
