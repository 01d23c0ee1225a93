use std::process::ExitCode;

use clap::Parser;
use keysplit::bail;
use keysplit::concurrency::cancel::{CancelTx, create_cancel_channel};
use keysplit::error::{ErrorKind, SplitResult};
use keysplit::policy::{ErrorHandlingPolicy, build_error_handling_policy};
use keysplit::split_error;
use keysplit::splitter::{SplitRequest, SplitSummary, Splitter};
use keysplit::vocabulary::vocabulary_from_config;
use keysplit_config::load_config;
use keysplit_config::shared::SplitterConfig;
use keysplit_telemetry::tracing::init_tracing_with_format;
use tracing::{error, warn};

use crate::args::AppArgs;

mod args;

/// Entry point of the `keysplit` binary.
///
/// Stdout carries the written output paths, or the JSON summary with `--json`. Logs and errors
/// go to stderr. The exit code follows the error handling policy of the failure kind.
#[tokio::main]
async fn main() -> ExitCode {
    let args = AppArgs::parse();

    let _log_flusher =
        match init_tracing_with_format(env!("CARGO_BIN_NAME"), args.log_format.into()) {
            Ok(log_flusher) => log_flusher,
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::from(ErrorHandlingPolicy::EXIT_FAILURE);
            }
        };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let policy = build_error_handling_policy(&err);
            error!(kind = ?err.kind(), exit_code = policy.exit_code(), "split failed");

            eprintln!("error: {err}");
            if let Some(solution) = policy.solution() {
                eprintln!("hint: {solution}");
            }

            ExitCode::from(policy.exit_code())
        }
    }
}

async fn run(args: AppArgs) -> SplitResult<()> {
    let keys = args.requested_keys()?;
    if keys.is_empty() {
        bail!(
            ErrorKind::EmptyKeySet,
            "No keys were requested",
            "pass `--key` at least once or a non-empty `--keys-file`"
        );
    }

    let mut config = load_config::<SplitterConfig>(args.config.as_deref())?;
    args.apply_overrides(&mut config);

    let working_dir = std::env::current_dir().map_err(|err| {
        split_error!(
            ErrorKind::IoFailure,
            "Failed to read the current working directory",
            source: err
        )
    })?;

    let vocabulary = vocabulary_from_config(&config)?;

    let (cancel_tx, cancel_rx) = create_cancel_channel();
    let splitter = Splitter::new(config, vocabulary)?.with_cancellation(cancel_rx);

    let mut request = SplitRequest::new(args.input.clone(), keys, working_dir);
    if let Some(prefix) = &args.prefix {
        request = request.with_prefix(prefix.clone());
    }

    let cancel_on_interrupt = tokio::spawn(cancel_on_interrupt(cancel_tx));

    // The pass is blocking file I/O, the runtime only waits for it and for Ctrl-C.
    let result = tokio::task::spawn_blocking(move || splitter.split(&request))
        .await
        .map_err(|err| {
            split_error!(
                ErrorKind::Unknown,
                "Split task terminated unexpectedly",
                source: err
            )
        })?;

    cancel_on_interrupt.abort();

    print_summary(&result?, args.json)
}

async fn cancel_on_interrupt(cancel_tx: CancelTx) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupt received, stopping after the current record");
        cancel_tx.cancel();
    }
}

fn print_summary(summary: &SplitSummary, json: bool) -> SplitResult<()> {
    if json {
        let rendered = serde_json::to_string_pretty(summary).map_err(|err| {
            split_error!(
                ErrorKind::Unknown,
                "Failed to render split summary",
                source: err
            )
        })?;
        println!("{rendered}");
    } else {
        for path in summary.output_paths() {
            println!("{}", path.display());
        }
    }

    Ok(())
}
