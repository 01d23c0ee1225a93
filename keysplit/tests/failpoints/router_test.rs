use std::fs;

use keysplit::error::ErrorKind;
use keysplit::failpoints::{ROUTER_APPEND_ROW, ROUTER_WRITE_HEADER};
use keysplit::splitter::{SplitRequest, Splitter};
use keysplit::test_utils::failpoints::CustomFailScenario;
use keysplit::test_utils::fixtures::{
    OCCURRENCE_HEADER, SPECIES, expected_records, generate_occurrences, read_output,
};
use keysplit::vocabulary::IdentityVocabulary;
use keysplit_config::shared::{OutputMode, SplitterConfig};
use keysplit_telemetry::tracing::init_test_tracing;

fn split_passer(config: SplitterConfig, dir: &std::path::Path) -> keysplit::error::SplitError {
    Splitter::new(config, IdentityVocabulary)
        .unwrap()
        .split(&SplitRequest::new(
            "occurrences.tsv",
            vec![SPECIES[0].to_string(), SPECIES[1].to_string()],
            dir,
        ))
        .unwrap_err()
}

#[test]
fn append_failure_aborts_and_keeps_partial_output() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    let contents = generate_occurrences(200);
    fs::write(dir.path().join("occurrences.tsv"), &contents).unwrap();

    // The first three appends succeed, the fourth fails.
    let scenario = CustomFailScenario::setup(&[(ROUTER_APPEND_ROW, "3*off->return")]);
    let config = SplitterConfig {
        output_mode: OutputMode::ReopenPerRow,
        ..Default::default()
    };
    let err = split_passer(config, dir.path());
    scenario.teardown();

    assert_eq!(err.kind(), ErrorKind::IoFailure);

    let (header, passer) = read_output(&dir.path().join("Passer_domesticus.txt"));
    let (_, parus) = read_output(&dir.path().join("Parus_major.txt"));
    assert_eq!(header, OCCURRENCE_HEADER);
    assert_eq!(passer.len() + parus.len(), 3);

    let expected_passer = expected_records(&contents, SPECIES[0]);
    assert_eq!(passer, expected_passer[..passer.len()]);
}

#[test]
fn header_failure_aborts_before_routing() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("occurrences.tsv"), generate_occurrences(50)).unwrap();

    // The first output is created, the second fails.
    let scenario = CustomFailScenario::setup(&[(ROUTER_WRITE_HEADER, "1*off->return")]);
    let err = split_passer(SplitterConfig::default(), dir.path());
    scenario.teardown();

    assert_eq!(err.kind(), ErrorKind::IoFailure);
    assert!(err.details()[0].contains(ROUTER_WRITE_HEADER));

    let (header, records) = read_output(&dir.path().join("Passer_domesticus.txt"));
    assert_eq!(header, OCCURRENCE_HEADER);
    assert!(records.is_empty());
    assert!(!dir.path().join("Parus_major.txt").exists());
}
