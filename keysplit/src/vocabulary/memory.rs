use std::collections::HashMap;

use crate::vocabulary::{Vocabulary, normalize_alias};

/// In-memory vocabulary built from explicit alias to canonical key pairs.
///
/// Every canonical key is also registered as an alias of itself.
#[derive(Debug, Clone, Default)]
pub struct MemoryVocabulary {
    aliases: HashMap<String, String>,
}

impl MemoryVocabulary {
    /// Creates an empty vocabulary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `alias` for `canonical` and returns the vocabulary.
    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.insert(alias, canonical);
        self
    }

    /// Registers `alias` for `canonical`. A later registration of the same alias wins.
    pub fn insert(&mut self, alias: &str, canonical: &str) {
        self.aliases
            .insert(normalize_alias(canonical), canonical.to_string());
        self.aliases
            .insert(normalize_alias(alias), canonical.to_string());
    }
}

impl<A, C> FromIterator<(A, C)> for MemoryVocabulary
where
    A: AsRef<str>,
    C: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (A, C)>>(iter: I) -> Self {
        let mut vocabulary = Self::new();
        for (alias, canonical) in iter {
            vocabulary.insert(alias.as_ref(), canonical.as_ref());
        }
        vocabulary
    }
}

impl Vocabulary for MemoryVocabulary {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn resolve(&self, name: &str) -> Option<String> {
        self.aliases.get(&normalize_alias(name)).cloned()
    }
}
