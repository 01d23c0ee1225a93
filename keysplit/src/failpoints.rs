use fail::fail_point;

use crate::bail;
use crate::error::{ErrorKind, SplitResult};

pub const ROUTER_WRITE_HEADER: &str = "router.write_header";
pub const ROUTER_APPEND_ROW: &str = "router.append_row";

/// Fails with [`ErrorKind::IoFailure`] when the named fail point is configured to `return`.
///
/// Compiles to a no-op unless the `failpoints` feature is enabled.
pub fn split_fail_point(name: &str) -> SplitResult<()> {
    fail_point!(name, |parameter| {
        let detail = match parameter {
            Some(parameter) => format!("The failpoint '{name}' returned an error: {parameter}"),
            None => format!("The failpoint '{name}' returned an error"),
        };

        bail!(
            ErrorKind::IoFailure,
            "An error occurred in a fail point",
            detail = detail
        );
    });

    Ok(())
}
