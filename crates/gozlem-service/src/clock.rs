use std::sync::Mutex;

/// Source of "now" for timestamps and report bucketing.
pub trait Clock: Send + Sync {
    /// Current time in the caller's time zone.
    fn now(&self) -> jiff::Zoned;

    fn timestamp(&self) -> jiff::Timestamp {
        self.now().timestamp()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> jiff::Zoned {
        jiff::Zoned::now()
    }
}

/// A settable clock for deterministic tests.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<jiff::Zoned>,
}

impl FixedClock {
    pub fn new(now: jiff::Zoned) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: jiff::Zoned) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = now;
    }

    /// Move forward by `by`. Out-of-range results leave the clock unchanged.
    pub fn advance(&self, by: jiff::SignedDuration) {
        let mut guard = self.now.lock().unwrap_or_else(|p| p.into_inner());
        if let Ok(next) = guard.checked_add(by) {
            *guard = next;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> jiff::Zoned {
        self.now.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}
