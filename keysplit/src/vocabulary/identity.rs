use crate::vocabulary::Vocabulary;

/// Vocabulary accepting every non-blank name as its own canonical key.
///
/// Surrounding whitespace is trimmed; nothing else is changed, so matching stays exact.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityVocabulary;

impl Vocabulary for IdentityVocabulary {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn resolve(&self, name: &str) -> Option<String> {
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}
