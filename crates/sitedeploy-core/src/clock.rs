use chrono::{DateTime, Utc};
use std::time::Duration;

/// Time source and sleeper. The orchestrator never calls `thread::sleep`
/// directly so retry backoff and polling can be tested with a recording
/// fake instead of real delays.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
