use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{info, warn};

use crate::bail;
use crate::error::{ErrorKind, SplitResult};
use crate::header::find_column;
use crate::record::{Delimiter, strip_line_terminator};
use crate::split_error;
use crate::vocabulary::{Vocabulary, normalize_alias};

/// Maximum number of ambiguous aliases named individually in the load warning.
const MAX_LOGGED_AMBIGUOUS_ALIASES: usize = 10;

#[derive(Debug, Clone)]
enum AliasEntry {
    Canonical(String),
    Ambiguous,
}

/// Taxonomy lookup table loaded from a delimited file.
///
/// One column holds canonical names. Every non-empty cell of a row, in any column, is an alias of
/// that row's canonical name. Canonical names take precedence over aliases; an alias shared by
/// rows with different canonical names resolves to nothing.
#[derive(Debug, Clone, Default)]
pub struct TableVocabulary {
    canonical: HashMap<String, String>,
    aliases: HashMap<String, AliasEntry>,
}

impl TableVocabulary {
    /// Loads the lookup table at `path`.
    pub fn load(path: &Path, delimiter: char, canonical_column: &str) -> SplitResult<Self> {
        let file = File::open(path).map_err(|err| {
            split_error!(
                ErrorKind::VocabularyUnavailable,
                "Failed to open vocabulary table",
                path.display(),
                source: err
            )
        })?;

        let vocabulary =
            Self::read_from(BufReader::new(file), delimiter, canonical_column).map_err(|err| {
                split_error!(
                    ErrorKind::VocabularyUnavailable,
                    "Failed to load vocabulary table",
                    path.display(),
                    source: err
                )
            })?;

        info!(
            path = %path.display(),
            canonical_names = vocabulary.len(),
            aliases = vocabulary.aliases.len(),
            "loaded vocabulary table"
        );

        Ok(vocabulary)
    }

    /// Reads a lookup table whose first line is a header naming `canonical_column`.
    pub fn read_from<R: BufRead>(
        mut reader: R,
        delimiter: char,
        canonical_column: &str,
    ) -> SplitResult<Self> {
        let delimiter = Delimiter::new(delimiter);

        let mut line = Vec::new();
        if reader.read_until(b'\n', &mut line)? == 0 {
            bail!(
                ErrorKind::VocabularyUnavailable,
                "Vocabulary table is empty"
            );
        }

        let header: Vec<String> = delimiter
            .fields(strip_line_terminator(&line))
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();
        let canonical_index = find_column(&header, canonical_column)?;

        let mut vocabulary = Self::default();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }

            let row = String::from_utf8_lossy(strip_line_terminator(&line)).into_owned();
            let cells: Vec<&str> = row.split(delimiter.as_char()).collect();

            let Some(canonical) = cells.get(canonical_index).map(|cell| cell.trim()) else {
                continue;
            };
            if canonical.is_empty() {
                continue;
            }

            vocabulary.insert_row(canonical, &cells);
        }

        vocabulary.warn_ambiguous_aliases();

        Ok(vocabulary)
    }

    /// Returns the number of canonical names in the table.
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    /// Returns `true` when the table holds no canonical names.
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    fn insert_row(&mut self, canonical: &str, cells: &[&str]) {
        self.canonical
            .entry(normalize_alias(canonical))
            .or_insert_with(|| canonical.to_string());

        for cell in cells {
            let alias = normalize_alias(cell);
            if alias.is_empty() {
                continue;
            }

            match self.aliases.entry(alias) {
                Entry::Vacant(entry) => {
                    entry.insert(AliasEntry::Canonical(canonical.to_string()));
                }
                Entry::Occupied(mut entry) => {
                    let conflicting = matches!(
                        entry.get(),
                        AliasEntry::Canonical(existing) if existing != canonical
                    );
                    if conflicting {
                        entry.insert(AliasEntry::Ambiguous);
                    }
                }
            }
        }
    }

    fn warn_ambiguous_aliases(&self) {
        let ambiguous: Vec<&str> = self
            .aliases
            .iter()
            .filter(|(alias, entry)| {
                matches!(entry, AliasEntry::Ambiguous) && !self.canonical.contains_key(*alias)
            })
            .map(|(alias, _)| alias.as_str())
            .collect();

        if ambiguous.is_empty() {
            return;
        }

        let sample: Vec<&str> = ambiguous
            .iter()
            .take(MAX_LOGGED_AMBIGUOUS_ALIASES)
            .copied()
            .collect();
        warn!(
            count = ambiguous.len(),
            sample = ?sample,
            "vocabulary aliases claimed by several canonical names will not resolve"
        );
    }
}

impl Vocabulary for TableVocabulary {
    fn name(&self) -> &'static str {
        "table"
    }

    fn resolve(&self, name: &str) -> Option<String> {
        let alias = normalize_alias(name);

        if let Some(canonical) = self.canonical.get(&alias) {
            return Some(canonical.clone());
        }

        match self.aliases.get(&alias) {
            Some(AliasEntry::Canonical(canonical)) => Some(canonical.clone()),
            Some(AliasEntry::Ambiguous) | None => None,
        }
    }
}
