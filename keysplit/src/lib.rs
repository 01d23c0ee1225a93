//! Single-pass partitioning of large delimited files by key column.
//!
//! A split request names an input file, a set of key values and an output prefix. The input is
//! read once; every record whose key column holds one of the requested keys is appended to that
//! key's output file, which starts with a copy of the input header. All other records are
//! discarded.
//!
//! Requested keys are resolved through a [`vocabulary::Vocabulary`] before anything is written,
//! and every pre-flight check (output directory, existing outputs, file name collisions, header
//! layout) completes before the first output byte.
//!
//! # Example
//!
//! ```no_run
//! use keysplit::splitter::{SplitRequest, Splitter};
//! use keysplit::vocabulary::IdentityVocabulary;
//! use keysplit_config::shared::SplitterConfig;
//!
//! let splitter = Splitter::new(SplitterConfig::default(), IdentityVocabulary)?;
//! let request = SplitRequest::new(
//!     "occurrences.tsv",
//!     vec!["Passer domesticus".to_string()],
//!     std::env::current_dir()?,
//! )
//! .with_prefix("out/");
//!
//! let summary = splitter.split(&request)?;
//! for path in summary.output_paths() {
//!     println!("{}", path.display());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod concurrency;
pub mod error;
pub mod failpoints;
pub mod header;
mod macros;
pub mod planner;
pub mod policy;
pub mod record;
pub mod resolver;
pub mod router;
pub mod sanitize;
pub mod splitter;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod vocabulary;
