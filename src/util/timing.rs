use std::time::Instant;

use log::{self, Level};

/// Logs how long a scope took when dropped.
pub struct ScopedTimer {
    label: String,
    level: Level,
    start: Instant,
}

impl ScopedTimer {
    pub fn with_level(label: impl Into<String>, level: Level) -> Self {
        Self {
            label: label.into(),
            level,
            start: Instant::now(),
        }
    }

    pub fn info(label: impl Into<String>) -> Self {
        Self::with_level(label, Level::Info)
    }

    pub fn debug(label: impl Into<String>) -> Self {
        Self::with_level(label, Level::Debug)
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed().as_millis();
        log::log!(self.level, "{} took {} ms", self.label, elapsed);
    }
}

pub fn measure_debug<T, F>(label: impl Into<String>, f: F) -> T
where
    F: FnOnce() -> T,
{
    let _timer = ScopedTimer::debug(label);
    f()
}
