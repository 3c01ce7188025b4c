//! Broadcast deduplication with time-windowed rotation.
//!
//! Uses a dual-window approach so an identifier seen just before a rotation
//! is still recognized right after it:
//! - Current window: receives new identifiers
//! - Previous window: retained for one more interval, then dropped
//!
//! A window also rotates early once it holds `capacity` entries, which bounds
//! memory at roughly twice the capacity.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::{Duration, Instant};

struct Windows {
    current: HashSet<String>,
    previous: HashSet<String>,
    last_rotation: Instant,
}

pub struct DeduplicationFilter {
    windows: Mutex<Windows>,
    rotation_interval: Duration,
    capacity: usize,
}

impl DeduplicationFilter {
    pub fn new(rotation_interval: Duration, capacity: usize) -> Self {
        Self {
            windows: Mutex::new(Windows {
                current: HashSet::new(),
                previous: HashSet::new(),
                last_rotation: Instant::now(),
            }),
            rotation_interval,
            capacity: capacity.max(1),
        }
    }

    /// Record `id`. Returns true if it was already seen in either window.
    pub fn check_and_insert(&self, id: &str) -> bool {
        let mut w = self.windows.lock();

        if w.current.contains(id) || w.previous.contains(id) {
            return true;
        }

        let now = Instant::now();
        if now.duration_since(w.last_rotation) > self.rotation_interval
            || w.current.len() >= self.capacity
        {
            w.previous = std::mem::take(&mut w.current);
            w.last_rotation = now;
        }

        w.current.insert(id.to_string());
        false
    }

    /// Identifiers currently remembered across both windows.
    pub fn len(&self) -> usize {
        let w = self.windows.lock();
        w.current.len() + w.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
