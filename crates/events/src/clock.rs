use chrono::{DateTime, Utc};

/// Source of event timestamps.
///
/// The executor and the progress loggers never read the wall clock directly,
/// so tests can substitute a deterministic implementation.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
