// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sample recording with run-length coalescing.
//!
//! A camera moved interactively is sampled far more often than anyone wants
//! to replay it. Samples arriving faster than the record interval are folded
//! into the last event: its held time grows and its pose becomes the newest
//! sample.

use crate::event::Mat4;
use crate::store::EventStore;
use std::time::Instant;

/// Default coalescing threshold (one frame at 24 fps)
pub const DEFAULT_REC_INTERVAL: f32 = 1.0 / 24.0;

/// What a recorded sample did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new event with this id was appended
    Appended(u64),
    /// The sample was folded into the event with this id
    Coalesced(u64),
}

impl RecordOutcome {
    /// Id of the event touched by the sample
    pub fn id(&self) -> u64 {
        match self {
            Self::Appended(id) | Self::Coalesced(id) => *id,
        }
    }
}

/// Turns a stream of sampled transforms into playback events
#[derive(Debug, Clone)]
pub struct Recorder {
    /// Coalescing threshold in seconds
    pub rec_interval: f32,
    /// Time of the previous sample, `None` until the first sample
    last_sample: Option<Instant>,
}

impl Recorder {
    /// Create a recorder with the given threshold
    pub fn new(rec_interval: f32) -> Self {
        Self {
            rec_interval,
            last_sample: None,
        }
    }

    /// Restart timing; the next sample is treated as arriving with no delay
    pub fn restart(&mut self) {
        self.last_sample = None;
    }

    /// Record a sample timed against the wall clock
    pub fn sample(&mut self, store: &mut EventStore, transform: Mat4) -> RecordOutcome {
        let now = Instant::now();
        let interval = self
            .last_sample
            .map(|prev| now.duration_since(prev).as_secs_f32())
            .unwrap_or(0.0);
        let outcome = self.record(store, interval, transform);
        self.last_sample = Some(now);
        outcome
    }

    /// Record a sample that arrived `interval` seconds after the previous one
    pub fn record(&self, store: &mut EventStore, interval: f32, transform: Mat4) -> RecordOutcome {
        if self.makes_new_event(store, interval) {
            return RecordOutcome::Appended(store.push(interval, transform, false));
        }
        store.coalesce_last(interval, transform);
        RecordOutcome::Coalesced(store.last_index() as u64)
    }

    /// Whether a sample arriving after `interval` seconds starts a new event
    pub fn makes_new_event(&self, store: &EventStore, interval: f32) -> bool {
        if store.len() < 2 {
            return true;
        }
        if self.rec_interval <= interval {
            return true;
        }
        // Last event already holds its pose long enough, don't stretch it.
        store
            .last()
            .map_or(true, |last| self.rec_interval <= last.interval_sec)
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(DEFAULT_REC_INTERVAL)
    }
}
