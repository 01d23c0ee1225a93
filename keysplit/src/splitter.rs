use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

use keysplit_config::shared::SplitterConfig;
use serde::Serialize;
use tracing::info;

use crate::bail;
use crate::concurrency::cancel::CancelRx;
use crate::error::{ErrorKind, SplitResult};
use crate::header::HeaderLayout;
use crate::planner::OutputLocation;
use crate::record::Delimiter;
use crate::resolver::resolve_keys;
use crate::router::{PartitionRouter, TargetSummary};
use crate::split_error;
use crate::vocabulary::Vocabulary;

/// Read buffer capacity of the input file.
const INPUT_BUFFER_BYTES: usize = 256 * 1024;

/// One invocation of a split pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRequest {
    /// Input file. A relative path resolves against `working_dir`.
    pub input: PathBuf,
    /// Requested key names, in the order outputs are reported.
    pub keys: Vec<String>,
    /// Output prefix: a directory ending in a separator, a directory plus stem, a bare stem or
    /// nothing.
    pub prefix: Option<String>,
    /// Directory relative paths resolve against.
    pub working_dir: PathBuf,
}

impl SplitRequest {
    pub fn new<P, W>(input: P, keys: Vec<String>, working_dir: W) -> Self
    where
        P: Into<PathBuf>,
        W: Into<PathBuf>,
    {
        Self {
            input: input.into(),
            keys,
            prefix: None,
            working_dir: working_dir.into(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// Result of a completed split pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    pub input: PathBuf,
    /// One entry per distinct canonical key, in request order.
    pub outputs: Vec<TargetSummary>,
    /// Pre-existing output files that were deleted and rewritten.
    pub replaced_outputs: Vec<PathBuf>,
    pub records_scanned: u64,
    pub records_routed: u64,
    pub records_discarded: u64,
    pub records_malformed: u64,
}

impl SplitSummary {
    /// Returns the written output paths in request order.
    pub fn output_paths(&self) -> Vec<&Path> {
        self.outputs
            .iter()
            .map(|output| output.path.as_path())
            .collect()
    }
}

/// Splits delimited files into one output file per requested key.
///
/// A [`Splitter`] holds no per-pass state, so one instance can serve any number of requests and
/// independent instances can run on different inputs in parallel.
#[derive(Debug)]
pub struct Splitter<V> {
    config: SplitterConfig,
    vocabulary: V,
    cancel_rx: Option<CancelRx>,
}

impl<V> Splitter<V>
where
    V: Vocabulary,
{
    /// Creates a splitter after validating `config`.
    pub fn new(config: SplitterConfig, vocabulary: V) -> SplitResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            vocabulary,
            cancel_rx: None,
        })
    }

    /// Makes every pass stop between two records once `cancel_rx` observes a cancellation.
    pub fn with_cancellation(mut self, cancel_rx: CancelRx) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &V {
        &self.vocabulary
    }

    /// Runs one split pass.
    ///
    /// Every check that can fail the request runs before the first output byte is written:
    /// the key set is non-empty, the output directory exists, the input exists, every key
    /// resolves, no two keys share an output path, no output exists unless overwriting, no
    /// replaced output is the input itself, and the header has exactly one key column. Only then are replaced outputs deleted and the input
    /// streamed.
    pub fn split(&self, request: &SplitRequest) -> SplitResult<SplitSummary> {
        let started = Instant::now();

        if request.keys.is_empty() {
            bail!(ErrorKind::EmptyKeySet, "No keys were requested");
        }

        let location = OutputLocation::from_prefix(request.prefix.as_deref(), &request.working_dir)?;

        let input = request.working_dir.join(&request.input);
        if !input.is_file() {
            bail!(
                ErrorKind::InputNotFound,
                "Input file does not exist",
                input.display()
            );
        }

        let resolved = resolve_keys(&request.keys, &self.vocabulary)?;
        let plan = location.plan(resolved.canonical_keys(), self.config.overwrite)?;
        plan.check_input_not_replaced(&input)?;

        let file = File::open(&input).map_err(|err| {
            split_error!(
                ErrorKind::InputNotFound,
                "Failed to open input file",
                input.display(),
                source: err
            )
        })?;
        let mut reader = BufReader::with_capacity(INPUT_BUFFER_BYTES, file);
        let header = HeaderLayout::read_from(
            &mut reader,
            Delimiter::new(self.config.delimiter),
            &self.config.key_field,
        )?;

        info!(
            input = %input.display(),
            output_directory = %location.directory().display(),
            keys = plan.targets().len(),
            vocabulary = self.vocabulary.name(),
            output_mode = ?self.config.output_mode,
            "starting split pass"
        );

        plan.remove_stale_outputs()?;

        let mut router =
            PartitionRouter::new(&self.config, &header, &plan).with_input_path(&input);
        if let Some(cancel_rx) = &self.cancel_rx {
            router = router.with_cancellation(cancel_rx.clone());
        }
        let routed = router.run(reader)?;

        info!(
            records_scanned = routed.records_scanned,
            records_routed = routed.records_routed,
            records_discarded = routed.records_discarded,
            records_malformed = routed.records_malformed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "split pass completed"
        );

        Ok(SplitSummary {
            input,
            outputs: routed.targets,
            replaced_outputs: plan.stale_outputs().to_vec(),
            records_scanned: routed.records_scanned,
            records_routed: routed.records_routed,
            records_discarded: routed.records_discarded,
            records_malformed: routed.records_malformed,
        })
    }
}
