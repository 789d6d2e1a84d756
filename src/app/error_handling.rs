//! Error handling utilities
//!
//! Maps errors reaching `main` to a message on stderr and an exit code.

use tracing::error;

use crate::error::TableError;

/// Exit code for errors that are not table errors (bad config, bad flags).
pub const GENERAL_ERROR: i32 = 1;

/// Exit code and user-facing text for an error reaching `main`.
pub fn describe_fatal_error(error: &anyhow::Error, verbose: u8) -> (i32, String) {
    let mut message = match error.downcast_ref::<TableError>() {
        Some(table_err) => table_err.user_message(),
        None => format!("Error: {error}"),
    };

    if verbose >= 1 {
        message.push_str("\n\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            message.push_str(&format!("\n  {}: {}", i, cause));
        }
    }

    let exit_code = error
        .downcast_ref::<TableError>()
        .map(TableError::exit_code)
        .unwrap_or(GENERAL_ERROR);
    (exit_code, message)
}

/// Handle fatal errors and exit with the matching status code.
///
/// Table errors exit with their own code; everything else exits with
/// [`GENERAL_ERROR`]. Verbose mode adds the full error chain.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {:#}", error);
    let (exit_code, message) = describe_fatal_error(&error, verbose);
    eprintln!("{}", message);
    std::process::exit(exit_code)
}
