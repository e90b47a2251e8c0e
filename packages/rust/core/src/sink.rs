//! Progress and warning notifications from the pipeline.
//!
//! The pipeline reports through this seam instead of printing, so the CLI
//! can drive an interactive progress bar while tests capture messages.

/// Receiver for pipeline notifications.
pub trait NotificationSink: Send + Sync {
    /// A progress update ("fetched 10 of 24 rosters").
    fn progress(&self, message: &str);

    /// A user-facing warning or failure notice. Transient: reported once,
    /// never persisted.
    fn error(&self, message: &str);
}

/// Sink that discards everything. Used by tests and non-interactive runs.
pub struct SilentSink;

impl NotificationSink for SilentSink {
    fn progress(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}
