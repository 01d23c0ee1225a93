use std::fs;

use keysplit::error::ErrorKind;
use keysplit::splitter::{SplitRequest, Splitter};
use keysplit::test_utils::fixtures::write_input;
use keysplit::vocabulary::{IdentityVocabulary, MemoryVocabulary};
use keysplit_config::shared::{OutputMode, SplitterConfig};
use keysplit_telemetry::tracing::init_test_tracing;

const HEADER: &str = "ID\tSCIENTIFIC NAME\tCOUNT";
const RECORDS: [&str; 3] = ["1\tFoo bar\t5", "2\tBaz qux\t2", "3\tFoo bar\t1"];

fn keys(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn scenario_input(dir: &std::path::Path) {
    let mut lines = vec![HEADER];
    lines.extend(RECORDS);
    write_input(dir, "occurrences.tsv", &lines);
}

fn splitter(config: SplitterConfig) -> Splitter<IdentityVocabulary> {
    Splitter::new(config, IdentityVocabulary).unwrap()
}

fn file_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn single_key_gets_header_and_matching_rows() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    scenario_input(dir.path());

    let summary = splitter(SplitterConfig::default())
        .split(&SplitRequest::new(
            "occurrences.tsv",
            keys(&["Foo bar"]),
            dir.path(),
        ))
        .unwrap();

    assert_eq!(summary.output_paths().len(), 1);
    assert_eq!(
        fs::read_to_string(summary.output_paths()[0]).unwrap(),
        "ID\tSCIENTIFIC NAME\tCOUNT\n1\tFoo bar\t5\n3\tFoo bar\t1\n"
    );
    assert_eq!(
        file_names(dir.path()),
        ["Foo_bar.txt", "occurrences.tsv"]
    );
}

#[test]
fn colliding_keys_write_nothing() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    scenario_input(dir.path());

    let err = splitter(SplitterConfig::default())
        .split(&SplitRequest::new(
            "occurrences.tsv",
            keys(&["Foo bar", "Foo-bar"]),
            dir.path(),
        ))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AmbiguousKeyNames);
    assert_eq!(file_names(dir.path()), ["occurrences.tsv"]);
}

#[test]
fn missing_output_directory_is_rejected() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    scenario_input(dir.path());

    let err = splitter(SplitterConfig::default())
        .split(
            &SplitRequest::new("occurrences.tsv", keys(&["Foo bar"]), dir.path())
                .with_prefix("nested/out/"),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DirectoryNotFound);
    assert_eq!(file_names(dir.path()), ["occurrences.tsv"]);
}

#[test]
fn existing_outputs_are_left_unchanged() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    scenario_input(dir.path());
    fs::write(dir.path().join("Baz_qux.txt"), "previous run").unwrap();

    let err = splitter(SplitterConfig::default())
        .split(&SplitRequest::new(
            "occurrences.tsv",
            keys(&["Foo bar", "Baz qux"]),
            dir.path(),
        ))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::OutputAlreadyExists);
    assert_eq!(
        fs::read_to_string(dir.path().join("Baz_qux.txt")).unwrap(),
        "previous run"
    );
    assert!(!dir.path().join("Foo_bar.txt").exists());
}

#[test]
fn unresolved_key_is_named_and_nothing_is_written() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    scenario_input(dir.path());
    let vocabulary = MemoryVocabulary::new()
        .with_alias("Foo bar", "Foo bar")
        .with_alias("Baz qux", "Baz qux");
    let splitter = Splitter::new(SplitterConfig::default(), vocabulary).unwrap();

    let err = splitter
        .split(&SplitRequest::new(
            "occurrences.tsv",
            keys(&["Foo bar", "Quux corge"]),
            dir.path(),
        ))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnresolvedKeys);
    assert_eq!(err.details(), vec!["Quux corge"]);
    assert_eq!(file_names(dir.path()), ["occurrences.tsv"]);
}

#[test]
fn missing_key_column_writes_nothing() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    scenario_input(dir.path());
    let config = SplitterConfig {
        key_field: "species".to_string(),
        ..Default::default()
    };

    let err = splitter(config)
        .split(&SplitRequest::new(
            "occurrences.tsv",
            keys(&["Foo bar"]),
            dir.path(),
        ))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::KeyColumnNotFound);
    assert_eq!(file_names(dir.path()), ["occurrences.tsv"]);
}

#[test]
fn duplicated_key_column_writes_nothing() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_input(
        dir.path(),
        "occurrences.tsv",
        &["id\tScientific Name\tscientific name", "1\tFoo bar\tFoo bar"],
    );

    let err = splitter(SplitterConfig::default())
        .split(&SplitRequest::new(
            "occurrences.tsv",
            keys(&["Foo bar"]),
            dir.path(),
        ))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AmbiguousKeyColumn);
    assert_eq!(file_names(dir.path()), ["occurrences.tsv"]);
}

#[test]
fn overwrite_runs_are_idempotent() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    scenario_input(dir.path());
    let config = SplitterConfig {
        overwrite: true,
        ..Default::default()
    };
    let splitter = splitter(config);
    let request = SplitRequest::new(
        "occurrences.tsv",
        keys(&["Foo bar", "Baz qux"]),
        dir.path(),
    );

    let first = splitter.split(&request).unwrap();
    let first_contents: Vec<Vec<u8>> = first
        .output_paths()
        .iter()
        .map(|path| fs::read(path).unwrap())
        .collect();
    let second = splitter.split(&request).unwrap();
    let second_contents: Vec<Vec<u8>> = second
        .output_paths()
        .iter()
        .map(|path| fs::read(path).unwrap())
        .collect();

    assert!(first.replaced_outputs.is_empty());
    assert_eq!(second.replaced_outputs.len(), 2);
    assert_eq!(first_contents, second_contents);
}

#[test]
fn output_modes_produce_identical_files() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    scenario_input(dir.path());
    fs::create_dir(dir.path().join("kept")).unwrap();
    fs::create_dir(dir.path().join("reopened")).unwrap();
    let request = SplitRequest::new(
        "occurrences.tsv",
        keys(&["Baz qux", "Foo bar"]),
        dir.path(),
    );

    let kept = splitter(SplitterConfig::default())
        .split(&request.clone().with_prefix("kept/"))
        .unwrap();
    let reopened = splitter(SplitterConfig {
        output_mode: OutputMode::ReopenPerRow,
        sync_each_row: true,
        ..Default::default()
    })
    .split(&request.with_prefix("reopened/"))
    .unwrap();

    for (kept, reopened) in kept.output_paths().iter().zip(reopened.output_paths()) {
        assert_eq!(fs::read(kept).unwrap(), fs::read(reopened).unwrap());
    }
}

#[test]
fn summary_serializes_to_json() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    scenario_input(dir.path());

    let summary = splitter(SplitterConfig::default())
        .split(&SplitRequest::new(
            "occurrences.tsv",
            keys(&["Baz qux"]),
            dir.path(),
        ))
        .unwrap();
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["outputs"][0]["key"], "Baz qux");
    assert_eq!(json["outputs"][0]["rows"], 1);
    assert_eq!(json["records_scanned"], 3);
    assert_eq!(json["records_malformed"], 0);
}
