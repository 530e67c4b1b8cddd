use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::record::Record;

/// Drips pre-loaded records into a view at a fixed interval, standing in for
/// a live event source.
#[derive(Debug)]
pub struct ReplayFeed {
    pending: VecDeque<Record>,
    interval: Duration,
    last_tick: Instant,
    paused: bool,
}

impl ReplayFeed {
    pub fn new(records: Vec<Record>, interval: Duration, now: Instant) -> Self {
        debug!(
            "Replay feed with {} records every {}ms",
            records.len(),
            interval.as_millis()
        );
        Self {
            pending: records.into(),
            interval,
            last_tick: now,
            paused: false,
        }
    }

    /// Next record when the interval has elapsed since the last delivery.
    pub fn poll(&mut self, now: Instant) -> Option<Record> {
        if self.paused || now.saturating_duration_since(self.last_tick) < self.interval {
            return None;
        }
        self.last_tick = now;
        let record = self.pending.pop_front();
        if let Some(r) = &record {
            trace!("Feed delivers {} ({} left)", r.id(), self.pending.len());
        }
        record
    }

    /// Pauses or resumes delivery. Resuming restarts the interval so a
    /// backlog is not flushed at once.
    pub fn toggle_pause(&mut self, now: Instant) -> bool {
        self.paused = !self.paused;
        if !self.paused {
            self.last_tick = now;
        }
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }
}
