use std::fs;

use keysplit::concurrency::cancel::create_cancel_channel;
use keysplit::error::ErrorKind;
use keysplit::splitter::{SplitRequest, Splitter};
use keysplit::test_utils::fixtures::{
    OCCURRENCE_HEADER, SPECIES, expected_records, generate_occurrences, read_output,
};
use keysplit::vocabulary::IdentityVocabulary;
use keysplit_config::shared::SplitterConfig;
use keysplit_telemetry::tracing::init_test_tracing;

const ROWS: usize = 5_000;

#[test]
fn records_are_partitioned_in_input_order() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    let contents = generate_occurrences(ROWS);
    fs::write(dir.path().join("occurrences.tsv"), &contents).unwrap();
    let requested = [SPECIES[0], SPECIES[2], SPECIES[3]];
    let config = SplitterConfig {
        progress_interval_rows: 1_000,
        ..Default::default()
    };
    let splitter = Splitter::new(config, IdentityVocabulary).unwrap();

    let summary = splitter
        .split(&SplitRequest::new(
            "occurrences.tsv",
            requested.iter().map(|species| species.to_string()).collect(),
            dir.path(),
        ))
        .unwrap();

    let mut routed = 0;
    for (species, path) in requested.iter().zip(summary.output_paths()) {
        let (header, records) = read_output(path);
        let expected = expected_records(&contents, species);

        assert_eq!(header, OCCURRENCE_HEADER);
        assert_eq!(records, expected, "{species}");
        routed += records.len() as u64;
    }

    let malformed = (0..ROWS).filter(|id| id % 11 == 10).count() as u64;
    assert_eq!(summary.records_scanned, ROWS as u64);
    assert_eq!(summary.records_malformed, malformed);
    assert_eq!(summary.records_routed, routed);
    assert_eq!(
        summary.records_routed + summary.records_discarded + summary.records_malformed,
        summary.records_scanned
    );
}

#[test]
fn header_only_input_creates_header_only_outputs() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("occurrences.tsv"), generate_occurrences(0)).unwrap();
    let splitter = Splitter::new(SplitterConfig::default(), IdentityVocabulary).unwrap();

    let summary = splitter
        .split(&SplitRequest::new(
            "occurrences.tsv",
            vec![SPECIES[1].to_string()],
            dir.path(),
        ))
        .unwrap();

    let (header, records) = read_output(summary.output_paths()[0]);
    assert_eq!(header, OCCURRENCE_HEADER);
    assert!(records.is_empty());
    assert_eq!(summary.records_scanned, 0);
}

#[test]
fn cancelled_split_fails_with_cancelled() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("occurrences.tsv"), generate_occurrences(100)).unwrap();
    let (cancel_tx, cancel_rx) = create_cancel_channel();
    let splitter = Splitter::new(SplitterConfig::default(), IdentityVocabulary)
        .unwrap()
        .with_cancellation(cancel_rx);
    cancel_tx.cancel();

    let err = splitter
        .split(&SplitRequest::new(
            "occurrences.tsv",
            vec![SPECIES[0].to_string()],
            dir.path(),
        ))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    let (header, records) = read_output(&dir.path().join("Passer_domesticus.txt"));
    assert_eq!(header, OCCURRENCE_HEADER);
    assert!(records.is_empty());
}
