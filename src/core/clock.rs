//! Injectable wall clock
//!
//! The limit evaluator asks the clock for the current local calendar day, so
//! tests swap in [`ManualClock`] to pin or move time across midnight. The day
//! is resolved in the clock's own timezone, so DST transitions give 23- and
//! 25-hour days.

use super::limits::DailyWindow;
use chrono::{DateTime, Duration, FixedOffset, Local, TimeZone, Utc};
use parking_lot::Mutex;

/// Source of the current time and local day
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Local calendar day containing the current instant
    fn today(&self) -> DailyWindow;
}

/// Clock backed by the system time in the process's local timezone
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> DailyWindow {
        DailyWindow::containing(Local::now())
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock<Tz: TimeZone = FixedOffset> {
    now: Mutex<DateTime<Tz>>,
}

impl<Tz: TimeZone> ManualClock<Tz> {
    pub fn new(now: DateTime<Tz>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Tz>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Current instant in the clock's timezone
    pub fn local_now(&self) -> DateTime<Tz> {
        self.now.lock().clone()
    }
}

impl<Tz> Clock for ManualClock<Tz>
where
    Tz: TimeZone + Send + Sync,
    Tz::Offset: Send + Sync,
{
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().with_timezone(&Utc)
    }

    fn today(&self) -> DailyWindow {
        DailyWindow::containing(self.local_now())
    }
}
