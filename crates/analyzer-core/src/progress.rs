//! Progress notifications emitted while a report is being rendered.

/// Receives human-readable progress messages such as
/// `"Processing venue Troisi"`.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, message: &str);
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _message: &str) {}
}

impl<F> ProgressReporter for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, message: &str) {
        self(message)
    }
}

/// Message reported before a venue page is rendered.
pub fn venue_message(venue: &str) -> String {
    format!("Processing venue {}", venue)
}
