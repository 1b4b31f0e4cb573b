// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ordered, append-only storage of playback events.

use crate::error::{Result, SequencerError};
use crate::event::{sec_str, Mat4, PlaybackEvent};
use std::fmt::Write as _;

/// Ordered sequence of playback events
///
/// Events are appended or the whole store is cleared/replaced; nothing is
/// ever removed from the middle, which keeps `event.id == index`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventStore {
    events: Vec<PlaybackEvent>,
}

impl EventStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Build a store from decoded events, checking the id invariant
    pub fn from_events(events: Vec<PlaybackEvent>) -> Result<Self> {
        if let Some((index, event)) = events
            .iter()
            .enumerate()
            .find(|(index, event)| event.id != *index as u64)
        {
            return Err(SequencerError::EventIdMismatch {
                index,
                id: event.id,
            });
        }
        Ok(Self { events })
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the store holds no events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Index of the last event, 0 when empty
    pub fn last_index(&self) -> usize {
        self.events.len().saturating_sub(1)
    }

    /// Get an event
    pub fn get(&self, index: usize) -> Option<&PlaybackEvent> {
        self.events.get(index)
    }

    /// Get the last event
    pub fn last(&self) -> Option<&PlaybackEvent> {
        self.events.last()
    }

    /// Iterate events in order
    pub fn iter(&self) -> impl Iterator<Item = &PlaybackEvent> {
        self.events.iter()
    }

    /// All events as a slice
    pub fn as_slice(&self) -> &[PlaybackEvent] {
        &self.events
    }

    /// Append a new event and return its id
    pub fn push(&mut self, interval_sec: f32, transform: Mat4, force_render_start: bool) -> u64 {
        let id = self.events.len() as u64;
        self.events.push(
            PlaybackEvent::new(id, interval_sec, transform).with_force_render_start(force_render_start),
        );
        id
    }

    /// Fold a sample into the last event. Returns false on an empty store.
    pub fn coalesce_last(&mut self, interval_sec: f32, transform: Mat4) -> bool {
        match self.events.last_mut() {
            Some(last) => {
                last.coalesce(interval_sec, transform);
                true
            }
            None => false,
        }
    }

    /// Overwrite the held interval of one event
    pub fn set_interval(&mut self, index: usize, interval_sec: f32) -> bool {
        match self.events.get_mut(index) {
            Some(event) => {
                event.interval_sec = interval_sec;
                true
            }
            None => false,
        }
    }

    /// Remove every event
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Sum of every held interval
    pub fn total_duration(&self) -> f32 {
        self.events.iter().map(|e| e.interval_sec).sum()
    }

    /// Per-event interval listing used by the `showInterval` command
    pub fn interval_report(&self) -> String {
        let width = self.events.len().to_string().len();
        let mut out = format!("showInterval (size:{}) {{\n", self.events.len());
        for (index, event) in self.events.iter().enumerate() {
            let _ = writeln!(
                out,
                " eventId:{:>width$} interval:{:>8.5} ({})",
                index,
                event.interval_sec,
                sec_str(event.interval_sec),
                width = width
            );
        }
        out.push('}');
        out
    }
}
