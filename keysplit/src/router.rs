//! Single-pass routing of records to their output targets.
//!
//! The router scans the input once, from the first record to the end, and appends every record
//! whose key is in the resolved key set to that key's output file. Records keep their input
//! order inside each output. A record with too few fields never matches. An I/O failure aborts
//! the pass and leaves already written output files as they are; nothing is rolled back.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use keysplit_config::shared::{OutputMode, SplitterConfig};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bail;
use crate::concurrency::cancel::CancelRx;
use crate::error::{ErrorKind, SplitResult};
use crate::failpoints::{ROUTER_APPEND_ROW, ROUTER_WRITE_HEADER, split_fail_point};
use crate::header::HeaderLayout;
use crate::planner::OutputPlan;
use crate::record::{Delimiter, strip_line_terminator};
use crate::split_error;

/// Number of malformed records logged individually before the router only counts them.
const MAX_LOGGED_MALFORMED_RECORDS: u64 = 5;

/// Rows written to one output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetSummary {
    pub key: String,
    pub path: PathBuf,
    pub rows: u64,
}

/// Counters of a completed pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    /// Output files in key order.
    pub targets: Vec<TargetSummary>,
    /// Records read, header excluded.
    pub records_scanned: u64,
    /// Records appended to an output file.
    pub records_routed: u64,
    /// Well-formed records whose key was not requested.
    pub records_discarded: u64,
    /// Records with fewer fields than the key column index requires.
    pub records_malformed: u64,
}

impl RouteSummary {
    /// Returns the output paths in key order.
    pub fn output_paths(&self) -> Vec<&Path> {
        self.targets
            .iter()
            .map(|target| target.path.as_path())
            .collect()
    }
}

/// An output file owned by the router for the duration of a pass.
#[derive(Debug)]
struct TargetWriter {
    key: String,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    sync_each_row: bool,
    rows: u64,
}

impl TargetWriter {
    /// Creates the output file and writes the header line to it.
    ///
    /// The file must not exist yet. In [`OutputMode::ReopenPerRow`] the file is closed again
    /// right after the header is written.
    fn create(
        key: &str,
        path: &Path,
        header: &[u8],
        config: &SplitterConfig,
    ) -> SplitResult<Self> {
        split_fail_point(ROUTER_WRITE_HEADER)?;

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|err| {
                split_error!(
                    ErrorKind::IoFailure,
                    "Failed to create output file",
                    path.display(),
                    source: err
                )
            })?;

        let mut target = Self {
            key: key.to_string(),
            path: path.to_path_buf(),
            writer: Some(BufWriter::with_capacity(config.write_buffer_bytes, file)),
            sync_each_row: config.sync_each_row,
            rows: 0,
        };

        target.write_line(header, "Failed to write header to output file")?;

        if config.output_mode == OutputMode::ReopenPerRow {
            target.close()?;
        }

        debug!(key = %target.key, path = %target.path.display(), "created output file");

        Ok(target)
    }

    /// Appends a record to the output file.
    fn append(&mut self, line: &[u8]) -> SplitResult<()> {
        split_fail_point(ROUTER_APPEND_ROW)?;

        if self.writer.is_none() {
            let file = OpenOptions::new()
                .append(true)
                .open(&self.path)
                .map_err(|err| {
                    split_error!(
                        ErrorKind::IoFailure,
                        "Failed to reopen output file",
                        self.path.display(),
                        source: err
                    )
                })?;

            // A row is small, no point in buffering it on top of the page cache.
            self.writer = Some(BufWriter::with_capacity(line.len() + 1, file));
            self.write_line(line, "Failed to append row to output file")?;
            self.close()?;
        } else {
            self.write_line(line, "Failed to append row to output file")?;
        }

        self.rows += 1;

        Ok(())
    }

    /// Writes `line`, adding a line feed when it has none, and syncs if configured.
    fn write_line(&mut self, line: &[u8], description: &'static str) -> SplitResult<()> {
        let Some(writer) = self.writer.as_mut() else {
            bail!(
                ErrorKind::IoFailure,
                "Output file is not open",
                self.path.display()
            );
        };

        let result = writer.write_all(line).and_then(|()| {
            if line.ends_with(b"\n") {
                Ok(())
            } else {
                writer.write_all(b"\n")
            }
        });

        let result = result.and_then(|()| {
            if self.sync_each_row {
                writer.flush()?;
                writer.get_ref().sync_data()
            } else {
                Ok(())
            }
        });

        result.map_err(|err| {
            split_error!(
                ErrorKind::IoFailure,
                description,
                self.path.display(),
                source: err
            )
        })
    }

    /// Flushes and releases the file handle, if one is held.
    fn close(&mut self) -> SplitResult<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };

        writer.flush().map_err(|err| {
            split_error!(
                ErrorKind::IoFailure,
                "Failed to flush output file",
                self.path.display(),
                source: err
            )
        })
    }

    fn summary(&self) -> TargetSummary {
        TargetSummary {
            key: self.key.clone(),
            path: self.path.clone(),
            rows: self.rows,
        }
    }
}

/// Routes the records of one input to the targets of an [`OutputPlan`].
///
/// The router exclusively owns every output handle from the moment it creates the files until
/// [`PartitionRouter::run`] returns.
#[derive(Debug)]
pub struct PartitionRouter<'a> {
    config: &'a SplitterConfig,
    header: &'a HeaderLayout,
    plan: &'a OutputPlan,
    delimiter: Delimiter,
    input_path: Option<&'a Path>,
    cancel_rx: Option<CancelRx>,
}

impl<'a> PartitionRouter<'a> {
    /// Creates a router. No file is touched until [`PartitionRouter::run`].
    pub fn new(config: &'a SplitterConfig, header: &'a HeaderLayout, plan: &'a OutputPlan) -> Self {
        Self {
            config,
            header,
            plan,
            delimiter: Delimiter::new(config.delimiter),
            input_path: None,
            cancel_rx: None,
        }
    }

    /// Names the input in read errors.
    pub fn with_input_path(mut self, input_path: &'a Path) -> Self {
        self.input_path = Some(input_path);
        self
    }

    /// Stops the pass between two records once `cancel_rx` observes a cancellation.
    pub fn with_cancellation(mut self, cancel_rx: CancelRx) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Creates every output file with the header, then streams the records of `input`.
    ///
    /// `input` must be positioned at the first record, as left by [`HeaderLayout::read_from`].
    pub fn run<R: BufRead>(self, mut input: R) -> SplitResult<RouteSummary> {
        let mut targets = Vec::with_capacity(self.plan.targets().len());
        let mut routes: HashMap<Vec<u8>, usize> = HashMap::with_capacity(targets.capacity());

        for planned in self.plan.targets() {
            let target = TargetWriter::create(
                &planned.canonical,
                &planned.path,
                self.header.raw_line(),
                self.config,
            )?;
            routes.insert(planned.canonical.as_bytes().to_vec(), targets.len());
            targets.push(target);
        }

        let key_index = self.header.key_index();
        let progress_interval = self.config.progress_interval_rows;

        let mut records_scanned: u64 = 0;
        let mut records_routed: u64 = 0;
        let mut records_discarded: u64 = 0;
        let mut records_malformed: u64 = 0;

        let mut line = Vec::with_capacity(8 * 1024);
        loop {
            if self.is_cancelled() {
                for target in &mut targets {
                    target.close()?;
                }

                bail!(
                    ErrorKind::Cancelled,
                    "Split pass was cancelled",
                    format!("cancelled after {records_scanned} records, {records_routed} routed")
                );
            }

            line.clear();
            let read = input.read_until(b'\n', &mut line).map_err(|err| {
                split_error!(
                    ErrorKind::IoFailure,
                    "Failed to read record from input",
                    self.record_location(records_scanned + 1),
                    source: err
                )
            })?;
            if read == 0 {
                break;
            }
            records_scanned += 1;

            match self.delimiter.field(strip_line_terminator(&line), key_index) {
                Some(key) => match routes.get(key) {
                    Some(&index) => {
                        targets[index].append(&line)?;
                        records_routed += 1;
                    }
                    None => records_discarded += 1,
                },
                None => {
                    records_malformed += 1;
                    if records_malformed <= MAX_LOGGED_MALFORMED_RECORDS {
                        warn!(
                            record = records_scanned,
                            key_index,
                            "skipping record without a key field"
                        );
                    }
                }
            }

            if progress_interval > 0 && records_scanned % progress_interval == 0 {
                info!(
                    records_scanned,
                    records_routed, records_malformed, "split progress"
                );
            }
        }

        for target in &mut targets {
            target.close()?;
        }

        Ok(RouteSummary {
            targets: targets.iter().map(TargetWriter::summary).collect(),
            records_scanned,
            records_routed,
            records_discarded,
            records_malformed,
        })
    }

    fn record_location(&self, record: u64) -> String {
        match self.input_path {
            Some(path) => format!("{}, record {record}", path.display()),
            None => format!("record {record}"),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_rx
            .as_ref()
            .is_some_and(|cancel_rx| cancel_rx.is_cancelled())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::{self, BufReader, Cursor, Read};

    use tempfile::TempDir;

    use super::*;
    use crate::concurrency::cancel::{CancelTx, create_cancel_channel};
    use crate::planner::OutputLocation;

    const INPUT: &str = "\
ID\tSCIENTIFIC NAME\tCOUNT
1\tFoo bar\t5
2\tBaz qux\t2
3\tFoo bar\t1
4
5\tBaz qux\t7
6\tfoo bar\t9
";

    struct Fixture {
        _dir: TempDir,
        config: SplitterConfig,
        header: HeaderLayout,
        plan: OutputPlan,
        records: Cursor<Vec<u8>>,
    }

    fn fixture(input: impl AsRef<[u8]>, keys: &[&str], config: SplitterConfig) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut records = Cursor::new(input.as_ref().to_vec());
        let header = HeaderLayout::read_from(
            &mut records,
            Delimiter::new(config.delimiter),
            &config.key_field,
        )
        .unwrap();
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();
        let plan = OutputLocation::from_prefix(None, dir.path())
            .unwrap()
            .plan(&keys, false)
            .unwrap();

        Fixture {
            _dir: dir,
            config,
            header,
            plan,
            records,
        }
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_routes_matching_records_in_order() {
        let fixture = fixture(INPUT, &["Foo bar", "Baz qux"], SplitterConfig::default());

        let summary = PartitionRouter::new(&fixture.config, &fixture.header, &fixture.plan)
            .run(fixture.records)
            .unwrap();

        let paths = summary.output_paths();
        assert_eq!(
            read(paths[0]),
            "ID\tSCIENTIFIC NAME\tCOUNT\n1\tFoo bar\t5\n3\tFoo bar\t1\n"
        );
        assert_eq!(
            read(paths[1]),
            "ID\tSCIENTIFIC NAME\tCOUNT\n2\tBaz qux\t2\n5\tBaz qux\t7\n"
        );
        assert_eq!(summary.records_scanned, 6);
        assert_eq!(summary.records_routed, 4);
        assert_eq!(summary.records_discarded, 1);
        assert_eq!(summary.records_malformed, 1);
        assert_eq!(summary.targets[0].rows, 2);
    }

    #[test]
    fn test_matching_is_exact() {
        let fixture = fixture(INPUT, &["foo bar"], SplitterConfig::default());

        let summary = PartitionRouter::new(&fixture.config, &fixture.header, &fixture.plan)
            .run(fixture.records)
            .unwrap();

        assert_eq!(
            read(summary.output_paths()[0]),
            "ID\tSCIENTIFIC NAME\tCOUNT\n6\tfoo bar\t9\n"
        );
    }

    #[test]
    fn test_header_only_output_when_nothing_matches() {
        let fixture = fixture(INPUT, &["Corvus corax"], SplitterConfig::default());

        let summary = PartitionRouter::new(&fixture.config, &fixture.header, &fixture.plan)
            .run(fixture.records)
            .unwrap();

        assert_eq!(read(summary.output_paths()[0]), "ID\tSCIENTIFIC NAME\tCOUNT\n");
        assert_eq!(summary.records_routed, 0);
    }

    #[test]
    fn test_last_line_without_terminator_is_terminated() {
        let input = "id,scientific name\n1,Foo bar\n2,Foo bar";
        let config = SplitterConfig {
            delimiter: ',',
            ..Default::default()
        };
        let fixture = fixture(input, &["Foo bar"], config);

        let summary = PartitionRouter::new(&fixture.config, &fixture.header, &fixture.plan)
            .run(fixture.records)
            .unwrap();

        assert_eq!(
            read(summary.output_paths()[0]),
            "id,scientific name\n1,Foo bar\n2,Foo bar\n"
        );
    }

    #[test]
    fn test_crlf_records_are_matched_and_kept_verbatim() {
        let input = "id\tscientific name\r\n1\tFoo bar\r\n2\tBaz\r\n";
        let fixture = fixture(input, &["Foo bar"], SplitterConfig::default());

        let summary = PartitionRouter::new(&fixture.config, &fixture.header, &fixture.plan)
            .run(fixture.records)
            .unwrap();

        assert_eq!(
            read(summary.output_paths()[0]),
            "id\tscientific name\r\n1\tFoo bar\r\n"
        );
    }

    #[test]
    fn test_reopen_per_row_produces_same_output() {
        let config = SplitterConfig {
            output_mode: OutputMode::ReopenPerRow,
            sync_each_row: true,
            ..Default::default()
        };
        let fixture = fixture(INPUT, &["Foo bar", "Baz qux"], config);

        let summary = PartitionRouter::new(&fixture.config, &fixture.header, &fixture.plan)
            .run(fixture.records)
            .unwrap();

        let paths = summary.output_paths();
        assert_eq!(
            read(paths[0]),
            "ID\tSCIENTIFIC NAME\tCOUNT\n1\tFoo bar\t5\n3\tFoo bar\t1\n"
        );
        assert_eq!(
            read(paths[1]),
            "ID\tSCIENTIFIC NAME\tCOUNT\n2\tBaz qux\t2\n5\tBaz qux\t7\n"
        );
    }

    #[test]
    fn test_existing_target_file_aborts_before_routing() {
        let fixture = fixture(INPUT, &["Foo bar"], SplitterConfig::default());
        let path = fixture.plan.targets()[0].path.clone();
        fs::write(&path, "created concurrently").unwrap();

        let err = PartitionRouter::new(&fixture.config, &fixture.header, &fixture.plan)
            .run(fixture.records)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert_eq!(read(&path), "created concurrently");
    }

    #[test]
    fn test_cancelled_pass_keeps_header() {
        let fixture = fixture(INPUT, &["Foo bar"], SplitterConfig::default());
        let (cancel_tx, cancel_rx) = create_cancel_channel();
        cancel_tx.cancel();

        let err = PartitionRouter::new(&fixture.config, &fixture.header, &fixture.plan)
            .with_cancellation(cancel_rx)
            .run(fixture.records)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(
            read(&fixture.plan.targets()[0].path),
            "ID\tSCIENTIFIC NAME\tCOUNT\n"
        );
    }

    /// Input that requests cancellation once the router has read a given number of lines.
    struct CancellingInput {
        inner: Cursor<Vec<u8>>,
        cancel_after_lines: usize,
        lines: usize,
        cancel_tx: CancelTx,
    }

    impl Read for CancellingInput {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl BufRead for CancellingInput {
        fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
            self.inner.fill_buf()
        }

        fn consume(&mut self, amount: usize) {
            let consumed = &self.inner.get_ref()[self.inner.position() as usize..][..amount];
            self.lines += consumed.iter().filter(|b| **b == b'\n').count();
            if self.lines >= self.cancel_after_lines {
                self.cancel_tx.cancel();
            }
            self.inner.consume(amount);
        }
    }

    #[test]
    fn test_cancelled_pass_leaves_valid_prefix() {
        let fixture = fixture(INPUT, &["Foo bar"], SplitterConfig::default());
        let (cancel_tx, cancel_rx) = create_cancel_channel();
        let input = CancellingInput {
            inner: fixture.records,
            cancel_after_lines: 1,
            lines: 0,
            cancel_tx,
        };

        let err = PartitionRouter::new(&fixture.config, &fixture.header, &fixture.plan)
            .with_cancellation(cancel_rx)
            .run(input)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(
            read(&fixture.plan.targets()[0].path),
            "ID\tSCIENTIFIC NAME\tCOUNT\n1\tFoo bar\t5\n"
        );
    }

    /// Reader whose every read fails, as a vanished network share would.
    struct BrokenInput;

    impl Read for BrokenInput {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("input device went away"))
        }
    }

    #[test]
    fn test_read_failure_aborts_and_keeps_routed_rows() {
        let fixture = fixture(INPUT, &["Foo bar", "Baz qux"], SplitterConfig::default());
        let mut records = fixture.records;
        let mut first_records = Vec::new();
        for _ in 0..3 {
            records.read_until(b'\n', &mut first_records).unwrap();
        }
        let input = BufReader::new(Cursor::new(first_records).chain(BrokenInput));

        let err = PartitionRouter::new(&fixture.config, &fixture.header, &fixture.plan)
            .with_input_path(Path::new("/data/occurrences.tsv"))
            .run(input)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert_eq!(err.detail(), Some("/data/occurrences.tsv, record 4"));
        let targets = fixture.plan.targets();
        assert_eq!(
            read(&targets[0].path),
            "ID\tSCIENTIFIC NAME\tCOUNT\n1\tFoo bar\t5\n3\tFoo bar\t1\n"
        );
        assert_eq!(
            read(&targets[1].path),
            "ID\tSCIENTIFIC NAME\tCOUNT\n2\tBaz qux\t2\n"
        );
    }

    #[test]
    fn test_non_utf8_records_are_copied_byte_for_byte() {
        let input: &[u8] = b"id\tscientific name\tnote\n1\tFoo bar\t\xff\xfe caf\xe9\n2\t\xffBaz\tx\n";
        let fixture = fixture(input, &["Foo bar"], SplitterConfig::default());

        let summary = PartitionRouter::new(&fixture.config, &fixture.header, &fixture.plan)
            .run(fixture.records)
            .unwrap();

        assert_eq!(
            fs::read(summary.output_paths()[0]).unwrap(),
            b"id\tscientific name\tnote\n1\tFoo bar\t\xff\xfe caf\xe9\n"
        );
        assert_eq!(summary.records_discarded, 1);
    }
}
