use crate::error::{ErrorKind, SplitError};

/// Policy describing how a failed split request is reported to the operator.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ErrorHandlingPolicy {
    exit_code: u8,
    solution: Option<&'static str>,
}

impl ErrorHandlingPolicy {
    /// Command line usage error.
    pub const EXIT_USAGE: u8 = 64;
    /// Input data was incorrect.
    pub const EXIT_DATA: u8 = 65;
    /// An input file or output directory did not exist.
    pub const EXIT_NO_INPUT: u8 = 66;
    /// An output file could not be created.
    pub const EXIT_CANT_CREATE: u8 = 73;
    /// An I/O error occurred during the pass.
    pub const EXIT_IO: u8 = 74;
    /// Configuration error.
    pub const EXIT_CONFIG: u8 = 78;
    /// The pass was interrupted.
    pub const EXIT_INTERRUPTED: u8 = 130;
    /// Any other failure.
    pub const EXIT_FAILURE: u8 = 1;

    const fn new(exit_code: u8, solution: Option<&'static str>) -> Self {
        Self {
            exit_code,
            solution,
        }
    }

    /// Returns the process exit code.
    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    /// Returns an optional operator-facing solution message.
    pub fn solution(&self) -> Option<&'static str> {
        self.solution
    }
}

/// Builds an [`ErrorHandlingPolicy`] from a [`SplitError`].
///
/// Aggregated errors are classified by their first error.
pub fn build_error_handling_policy(error: &SplitError) -> ErrorHandlingPolicy {
    match error.kind() {
        ErrorKind::EmptyKeySet => ErrorHandlingPolicy::new(
            ErrorHandlingPolicy::EXIT_USAGE,
            Some("Pass at least one key with `--key` or `--keys-file`."),
        ),
        ErrorKind::UnresolvedKeys => ErrorHandlingPolicy::new(
            ErrorHandlingPolicy::EXIT_DATA,
            Some("Check the spelling of the listed keys against the vocabulary table."),
        ),
        ErrorKind::KeyColumnNotFound | ErrorKind::AmbiguousKeyColumn => {
            ErrorHandlingPolicy::new(
                ErrorHandlingPolicy::EXIT_DATA,
                Some("Check the delimiter and the key field name against the input header."),
            )
        }
        ErrorKind::AmbiguousKeyNames => ErrorHandlingPolicy::new(
            ErrorHandlingPolicy::EXIT_DATA,
            Some("Split the colliding keys into separate runs with different prefixes."),
        ),
        ErrorKind::InputNotFound => {
            ErrorHandlingPolicy::new(ErrorHandlingPolicy::EXIT_NO_INPUT, None)
        }
        ErrorKind::DirectoryNotFound => ErrorHandlingPolicy::new(
            ErrorHandlingPolicy::EXIT_NO_INPUT,
            Some("Create the output directory before running the split."),
        ),
        ErrorKind::OutputAlreadyExists => ErrorHandlingPolicy::new(
            ErrorHandlingPolicy::EXIT_CANT_CREATE,
            Some("Remove the listed files, choose another prefix, or pass `--overwrite`."),
        ),
        ErrorKind::IoFailure => ErrorHandlingPolicy::new(
            ErrorHandlingPolicy::EXIT_IO,
            Some("Output files written so far are incomplete. Fix the cause and rerun with `--overwrite`."),
        ),
        ErrorKind::InvalidConfiguration | ErrorKind::VocabularyUnavailable => {
            ErrorHandlingPolicy::new(ErrorHandlingPolicy::EXIT_CONFIG, None)
        }
        ErrorKind::Cancelled => ErrorHandlingPolicy::new(
            ErrorHandlingPolicy::EXIT_INTERRUPTED,
            Some("Output files hold the rows routed before cancellation. Rerun with `--overwrite`."),
        ),
        _ => ErrorHandlingPolicy::new(ErrorHandlingPolicy::EXIT_FAILURE, None),
    }
}
