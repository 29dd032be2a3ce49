use chrono::{DateTime, Utc};

/// Source of wall-clock timestamps for session start and completion.
///
/// Countdown timing is not taken from here; this only stamps reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Frozen(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn frozen(at: DateTime<Utc>) -> Self {
        Self::Frozen(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Frozen(at) => *at,
        }
    }
}

/// 2023-11-14T22:13:20Z, used wherever tests need a stable instant.
pub const FROZEN_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// # Panics
///
/// Panics if `FROZEN_TEST_TIMESTAMP` is not representable, which cannot happen.
#[must_use]
pub fn frozen_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FROZEN_TEST_TIMESTAMP, 0)
        .expect("frozen timestamp should be valid")
}

#[must_use]
pub fn frozen_clock() -> Clock {
    Clock::frozen(frozen_now())
}
