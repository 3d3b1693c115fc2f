use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Meter,
    Thermo,
}

/// Identifies one independent suppression timeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: SensorKind,
    pub identifier: String,
}

impl CacheKey {
    pub fn meter(identifier: impl Into<String>) -> Self {
        Self {
            kind: SensorKind::Meter,
            identifier: identifier.into(),
        }
    }

    pub fn thermo(identifier: impl Into<String>) -> Self {
        Self {
            kind: SensorKind::Thermo,
            identifier: identifier.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadingValue {
    Count(u64),
    Celsius(f64),
}

#[derive(Debug)]
struct CacheEntry {
    last_value: ReadingValue,
    last_seen: Instant,
}

/// Decides whether a reading is new enough to forward.
///
/// An unchanged value is forwarded again only once the window has fully
/// elapsed since it was last forwarded; a changed value is always forwarded
/// and restarts the window. A zero window never suppresses.
#[derive(Debug)]
pub struct DuplicateSuppressingCache {
    window: Duration,
    entries: HashMap<CacheKey, CacheEntry>,
}

impl DuplicateSuppressingCache {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: HashMap::new(),
        }
    }

    pub fn should_suppress(&mut self, key: &CacheKey, value: ReadingValue) -> bool {
        self.should_suppress_at(key, value, Instant::now())
    }

    pub fn should_suppress_at(
        &mut self,
        key: &CacheKey,
        value: ReadingValue,
        now: Instant,
    ) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            self.entries.insert(
                key.clone(),
                CacheEntry {
                    last_value: value,
                    last_seen: now,
                },
            );
            return false;
        };

        // Strict comparison: elapsed == window forwards.
        let elapsed = now.saturating_duration_since(entry.last_seen);
        if entry.last_value == value && elapsed < self.window {
            return true;
        }

        entry.last_value = value;
        entry.last_seen = entry.last_seen.max(now);
        false
    }
}
