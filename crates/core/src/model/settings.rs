use std::time::Duration;

use thiserror::Error;

/// How long answer feedback stays on screen before the quiz moves on.
pub const DEFAULT_FEEDBACK_DISPLAY_MS: u32 = 1_500;
pub const MIN_FEEDBACK_DISPLAY_MS: u32 = 100;
pub const MAX_FEEDBACK_DISPLAY_MS: u32 = 10_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error(
        "feedback display must be between {MIN_FEEDBACK_DISPLAY_MS} and {MAX_FEEDBACK_DISPLAY_MS} ms, got {0}"
    )]
    InvalidFeedbackDisplay(u32),
}

/// Session tuning that is independent of quiz content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    feedback_display_ms: u32,
}

impl SessionSettings {
    /// Creates custom session settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidFeedbackDisplay` when the delay is outside
    /// `MIN_FEEDBACK_DISPLAY_MS..=MAX_FEEDBACK_DISPLAY_MS`.
    pub fn new(feedback_display_ms: u32) -> Result<Self, SettingsError> {
        if !(MIN_FEEDBACK_DISPLAY_MS..=MAX_FEEDBACK_DISPLAY_MS).contains(&feedback_display_ms) {
            return Err(SettingsError::InvalidFeedbackDisplay(feedback_display_ms));
        }
        Ok(Self {
            feedback_display_ms,
        })
    }

    #[must_use]
    pub fn feedback_display_ms(&self) -> u32 {
        self.feedback_display_ms
    }

    #[must_use]
    pub fn feedback_display(&self) -> Duration {
        Duration::from_millis(u64::from(self.feedback_display_ms))
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            feedback_display_ms: DEFAULT_FEEDBACK_DISPLAY_MS,
        }
    }
}
