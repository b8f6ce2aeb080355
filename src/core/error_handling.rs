//! Reporting of run-fatal errors
//!
//! Only configuration, authentication and output errors end a run. They are
//! reported through [`log_error_with_context`], which shows the user the
//! specific message for errors they can act on and a generic context otherwise.

/// Errors that know whether their message is useful to the operator
///
/// When `is_user_actionable()` returns `true`, `user_message()` should return
/// `Some(message)`; otherwise it should return `None`.
pub trait ContextualError: std::error::Error {
    /// True for errors the operator can fix (missing settings, bad paths)
    fn is_user_actionable(&self) -> bool;

    /// Specific message for user-actionable errors
    fn user_message(&self) -> Option<&str>;
}

/// Log a fatal error with the appropriate level of detail
///
/// The primary line is always emitted at error level; the full error and its
/// debug representation follow at debug level.
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => {
            log::error!("FATAL: {}: {}", operation_context, user_msg);
        }
        _ => {
            log::error!("FATAL: {}: {}", operation_context, error);
        }
    }
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
