use chrono::{DateTime, Utc};

/// Source of write timestamps. Every `updated_at` the reconciler stores
/// comes from here, never from the database.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
