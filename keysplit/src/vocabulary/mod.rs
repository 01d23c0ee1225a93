//! Resolution of requested key names to canonical keys.
//!
//! A [`Vocabulary`] is the authority deciding which names are valid keys and what their canonical
//! spelling is. Requested names may follow any of the naming conventions the vocabulary knows
//! (scientific names, common names, codes); the router only ever sees canonical keys.

mod identity;
mod memory;
mod table;

pub use identity::IdentityVocabulary;
pub use memory::MemoryVocabulary;
pub use table::TableVocabulary;

use keysplit_config::shared::SplitterConfig;
use tracing::info;

use crate::error::SplitResult;

/// Maps requested key names to canonical keys.
///
/// Implementations must answer consistently for the duration of one [`Vocabulary::resolve_all`]
/// call.
pub trait Vocabulary {
    /// Returns the name of the vocabulary, used in logs.
    fn name(&self) -> &'static str;

    /// Returns the canonical key for `name`, or [`None`] when the name is unknown.
    fn resolve(&self, name: &str) -> Option<String>;

    /// Resolves every name of a request in one call, returning one entry per name in order.
    ///
    /// Vocabularies backed by a remote service should override this to issue a single bulk
    /// query.
    fn resolve_all(&self, names: &[String]) -> SplitResult<Vec<Option<String>>> {
        Ok(names.iter().map(|name| self.resolve(name)).collect())
    }
}

impl<V> Vocabulary for Box<V>
where
    V: Vocabulary + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resolve(&self, name: &str) -> Option<String> {
        (**self).resolve(name)
    }

    fn resolve_all(&self, names: &[String]) -> SplitResult<Vec<Option<String>>> {
        (**self).resolve_all(names)
    }
}

/// Builds the vocabulary described by `config`.
///
/// Loads the configured taxonomy table, or falls back to [`IdentityVocabulary`] when none is
/// configured.
pub fn vocabulary_from_config(
    config: &SplitterConfig,
) -> SplitResult<Box<dyn Vocabulary + Send + Sync>> {
    match &config.vocabulary {
        Some(vocabulary_config) => {
            let delimiter = vocabulary_config.delimiter.unwrap_or(config.delimiter);
            let vocabulary = TableVocabulary::load(
                &vocabulary_config.path,
                delimiter,
                &vocabulary_config.canonical_column,
            )?;

            Ok(Box::new(vocabulary))
        }
        None => {
            info!("no vocabulary configured, requested keys are used verbatim");
            Ok(Box::new(IdentityVocabulary))
        }
    }
}

/// Normalizes a name for alias lookup: trims, collapses whitespace runs and lowercases.
pub(crate) fn normalize_alias(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
