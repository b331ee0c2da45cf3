//! Time source injected into the services.

use chrono::{DateTime, Utc};

pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant. For tests.
#[derive(Debug, Copy, Clone)]
pub struct FixedTimeSource(pub DateTime<Utc>);

impl TimeSource for FixedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<T> TimeSource for std::sync::Arc<T>
where
    T: TimeSource + ?Sized,
{
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
