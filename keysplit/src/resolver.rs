use std::collections::HashSet;

use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, SplitError, SplitResult};
use crate::split_error;
use crate::vocabulary::Vocabulary;

/// A requested key name together with its canonical key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    pub requested: String,
    pub canonical: String,
}

/// Requested keys resolved against a vocabulary, in request order.
#[derive(Debug, Clone)]
pub struct ResolvedKeys {
    keys: Vec<ResolvedKey>,
    distinct: Vec<String>,
}

impl ResolvedKeys {
    /// Returns every requested key with its canonical key, in request order.
    pub fn keys(&self) -> &[ResolvedKey] {
        &self.keys
    }

    /// Returns the distinct canonical keys in order of first request.
    ///
    /// Two requested names resolving to the same canonical key share one entry.
    pub fn canonical_keys(&self) -> &[String] {
        &self.distinct
    }
}

/// Resolves every requested key name through `vocabulary`.
///
/// Fails with [`ErrorKind::EmptyKeySet`] for an empty request and with
/// [`ErrorKind::UnresolvedKeys`] when any name is unknown; the error then carries one entry per
/// unknown name.
pub fn resolve_keys<V>(requested: &[String], vocabulary: &V) -> SplitResult<ResolvedKeys>
where
    V: Vocabulary + ?Sized,
{
    if requested.is_empty() {
        bail!(ErrorKind::EmptyKeySet, "No keys were requested");
    }

    let resolved = vocabulary.resolve_all(requested)?;
    if resolved.len() != requested.len() {
        bail!(
            ErrorKind::VocabularyUnavailable,
            "Vocabulary returned an incomplete resolution",
            format!(
                "{} returned {} results for {} names",
                vocabulary.name(),
                resolved.len(),
                requested.len()
            )
        );
    }

    let mut keys = Vec::with_capacity(requested.len());
    let mut unresolved: Vec<SplitError> = Vec::new();

    for (name, canonical) in requested.iter().zip(resolved) {
        match canonical {
            Some(canonical) => {
                debug!(requested = %name, canonical = %canonical, "resolved key");
                keys.push(ResolvedKey {
                    requested: name.clone(),
                    canonical,
                });
            }
            None => unresolved.push(split_error!(
                ErrorKind::UnresolvedKeys,
                "Requested key is not in the vocabulary",
                name
            )),
        }
    }

    if !unresolved.is_empty() {
        return Err(unresolved.into());
    }

    let distinct = {
        let mut seen = HashSet::with_capacity(keys.len());
        keys.iter()
            .filter(|key| seen.insert(key.canonical.as_str()))
            .map(|key| key.canonical.clone())
            .collect()
    };

    Ok(ResolvedKeys { keys, distinct })
}
