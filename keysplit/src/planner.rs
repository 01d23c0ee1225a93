//! Output path planning and pre-flight validation.
//!
//! Everything here either only inspects the filesystem or, for
//! [`OutputPlan::remove_stale_outputs`], runs once every precondition of the pass holds.

use std::collections::BTreeMap;
use std::fs;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, SplitError, SplitResult};
use crate::sanitize::sanitize;
use crate::split_error;

/// Extension of every output file.
pub const OUTPUT_EXTENSION: &str = "txt";

/// Directory and file name stem that output files are created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    directory: PathBuf,
    stem: String,
}

impl OutputLocation {
    /// Splits `prefix` into an existing absolute directory and a file name stem.
    ///
    /// `prefix` may be a directory ending in a path separator (`out/`), a directory plus stem
    /// (`out/run1_`), a bare stem (`run1_`), or absent. Relative directories and a missing prefix
    /// resolve against `working_dir`, which the caller supplies instead of this reading the
    /// process working directory.
    pub fn from_prefix(prefix: Option<&str>, working_dir: &Path) -> SplitResult<Self> {
        let (directory, stem) = split_prefix(prefix.unwrap_or_default());
        let directory = working_dir.join(directory);

        if !directory.is_dir() {
            bail!(
                ErrorKind::DirectoryNotFound,
                "Output directory does not exist",
                directory.display()
            );
        }

        let directory = fs::canonicalize(&directory).map_err(|err| {
            split_error!(
                ErrorKind::DirectoryNotFound,
                "Failed to normalize output directory",
                directory.display(),
                source: err
            )
        })?;

        Ok(Self { directory, stem })
    }

    /// Returns the absolute output directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the file name stem prepended to every sanitized key.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Returns the output path of `canonical`: `directory/stem + sanitize(canonical) + ".txt"`.
    pub fn path_for(&self, canonical: &str) -> PathBuf {
        self.directory.join(format!(
            "{}{}.{OUTPUT_EXTENSION}",
            self.stem,
            sanitize(canonical)
        ))
    }

    /// Computes and validates the output path of every canonical key.
    ///
    /// Fails with [`ErrorKind::AmbiguousKeyNames`] when two keys share a path and with
    /// [`ErrorKind::OutputAlreadyExists`] when a path exists and `overwrite` is off. With
    /// `overwrite` on, existing paths are recorded in the plan and left untouched until
    /// [`OutputPlan::remove_stale_outputs`] runs.
    pub fn plan(&self, canonical_keys: &[String], overwrite: bool) -> SplitResult<OutputPlan> {
        let targets: Vec<PlannedTarget> = canonical_keys
            .iter()
            .map(|canonical| PlannedTarget {
                canonical: canonical.clone(),
                path: self.path_for(canonical),
            })
            .collect();

        check_collisions(&targets)?;

        let mut stale = Vec::new();
        let mut existing: Vec<SplitError> = Vec::new();
        for target in &targets {
            let exists = target.path.try_exists().map_err(|err| {
                split_error!(
                    ErrorKind::IoFailure,
                    "Failed to check whether output file exists",
                    target.path.display(),
                    source: err
                )
            })?;

            if !exists {
                continue;
            }

            if overwrite {
                stale.push(target.path.clone());
            } else {
                existing.push(split_error!(
                    ErrorKind::OutputAlreadyExists,
                    "Output file already exists",
                    target.path.display()
                ));
            }
        }

        if !existing.is_empty() {
            return Err(existing.into());
        }

        Ok(OutputPlan { targets, stale })
    }
}

/// Splits a prefix at its last path separator.
///
/// The directory keeps everything up to and including the separator and the stem is the rest,
/// taken literally, so `out/.` names files `.<key>.txt` inside `out/`.
fn split_prefix(prefix: &str) -> (PathBuf, String) {
    match prefix.rfind(|c: char| c == '/' || c == MAIN_SEPARATOR) {
        Some(index) => {
            let (directory, stem) = prefix.split_at(index + 1);
            (PathBuf::from(directory), stem.to_string())
        }
        None => (PathBuf::new(), prefix.to_string()),
    }
}

fn check_collisions(targets: &[PlannedTarget]) -> SplitResult<()> {
    let mut by_path: BTreeMap<&Path, Vec<&str>> = BTreeMap::new();
    for target in targets {
        by_path
            .entry(target.path.as_path())
            .or_default()
            .push(target.canonical.as_str());
    }

    let collisions: Vec<SplitError> = by_path
        .into_iter()
        .filter(|(_, keys)| keys.len() > 1)
        .map(|(path, keys)| {
            let keys = keys
                .iter()
                .map(|key| format!("`{key}`"))
                .collect::<Vec<_>>()
                .join(", ");
            split_error!(
                ErrorKind::AmbiguousKeyNames,
                "Several keys map to the same output file",
                format!("{keys} -> {}", path.display())
            )
        })
        .collect();

    if !collisions.is_empty() {
        return Err(collisions.into());
    }

    Ok(())
}

/// A canonical key and the path its rows are written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTarget {
    pub canonical: String,
    pub path: PathBuf,
}

/// Validated output targets of one pass.
#[derive(Debug, Clone)]
pub struct OutputPlan {
    targets: Vec<PlannedTarget>,
    stale: Vec<PathBuf>,
}

impl OutputPlan {
    /// Returns the planned targets in key order.
    pub fn targets(&self) -> &[PlannedTarget] {
        &self.targets
    }

    /// Returns pre-existing outputs that will be replaced.
    pub fn stale_outputs(&self) -> &[PathBuf] {
        &self.stale
    }

    /// Fails when a pre-existing output that would be replaced is `input` itself.
    ///
    /// Both sides are canonicalized, so a symlinked output pointing at the input is caught too.
    pub fn check_input_not_replaced(&self, input: &Path) -> SplitResult<()> {
        let input = fs::canonicalize(input).map_err(|err| {
            split_error!(
                ErrorKind::InputNotFound,
                "Failed to normalize input path",
                input.display(),
                source: err
            )
        })?;

        for path in &self.stale {
            let Ok(stale) = fs::canonicalize(path) else {
                continue;
            };
            if stale == input {
                bail!(
                    ErrorKind::OutputAlreadyExists,
                    "Output file is the input file",
                    path.display()
                );
            }
        }

        Ok(())
    }

    /// Deletes every pre-existing output recorded in the plan.
    ///
    /// All deletions are attempted; failures are reported together.
    pub fn remove_stale_outputs(&self) -> SplitResult<()> {
        let mut errors: Vec<SplitError> = Vec::new();

        for path in &self.stale {
            match fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed existing output file"),
                Err(err) => errors.push(split_error!(
                    ErrorKind::IoFailure,
                    "Failed to remove existing output file",
                    path.display(),
                    source: err
                )),
            }
        }

        if !errors.is_empty() {
            return Err(errors.into());
        }

        Ok(())
    }
}
