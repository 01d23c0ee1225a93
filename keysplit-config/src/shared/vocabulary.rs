use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::shared::splitter::default_key_field;
use crate::shared::{ValidationError, base::validate_delimiter};

/// Location and layout of a taxonomy lookup table.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VocabularyConfig {
    /// Path of the delimited lookup table. The first line is a header.
    pub path: PathBuf,
    /// Header name of the column holding canonical names, matched case-insensitively.
    #[serde(default = "default_key_field")]
    pub canonical_column: String,
    /// Field separator of the lookup table. Defaults to the splitter delimiter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
}

impl VocabularyConfig {
    /// Validates the vocabulary configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.canonical_column.trim().is_empty() {
            return Err(ValidationError::EmptyField {
                field: "vocabulary.canonical_column".to_string(),
            });
        }

        if let Some(delimiter) = self.delimiter {
            validate_delimiter("vocabulary.delimiter", delimiter)?;
        }

        Ok(())
    }
}
