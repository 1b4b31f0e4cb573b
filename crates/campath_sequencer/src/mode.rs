// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequencer mode and scheduler lifecycle state.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// What the sequencer is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Mode {
    /// Idle
    #[default]
    Stop = 0,
    /// Recording camera samples
    Rec = 1,
    /// Playing events at their recorded pace
    Play = 2,
    /// Playing events with a fixed hold per event
    SlideShow = 3,
}

impl Mode {
    /// Whether the scheduler should be stepping through events
    pub fn is_playing(&self) -> bool {
        matches!(self, Mode::Play | Mode::SlideShow)
    }

    /// Name shown by the console
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Stop => "STOP",
            Mode::Rec => "REC",
            Mode::Play => "PLAY",
            Mode::SlideShow => "SLIDESHOW",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Mode::Rec,
            2 => Mode::Play,
            3 => Mode::SlideShow,
            _ => Mode::Stop,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle of the scheduler thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ThreadState {
    /// Spawned, not yet running its loop
    #[default]
    Init = 0,
    /// Waiting for work
    Idle = 1,
    /// Running a playback step
    Busy = 2,
}

impl ThreadState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ThreadState::Idle,
            2 => ThreadState::Busy,
            _ => ThreadState::Init,
        }
    }
}

/// Lock-free cell holding a [`Mode`]
#[derive(Debug, Default)]
pub struct AtomicMode(AtomicU8);

impl AtomicMode {
    /// Create a cell
    pub fn new(mode: Mode) -> Self {
        Self(AtomicU8::new(mode as u8))
    }

    /// Read the mode
    pub fn load(&self) -> Mode {
        Mode::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Replace the mode, returning the previous one
    pub fn swap(&self, mode: Mode) -> Mode {
        Mode::from_u8(self.0.swap(mode as u8, Ordering::AcqRel))
    }
}

/// Lock-free cell holding a [`ThreadState`]
#[derive(Debug, Default)]
pub struct AtomicThreadState(AtomicU8);

impl AtomicThreadState {
    /// Read the state
    pub fn load(&self) -> ThreadState {
        ThreadState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Write the state
    pub fn store(&self, state: ThreadState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_cell_round_trip() {
        let cell = AtomicMode::new(Mode::Stop);
        for mode in [Mode::Rec, Mode::Play, Mode::SlideShow, Mode::Stop] {
            cell.swap(mode);
            assert_eq!(cell.load(), mode);
        }
        assert_eq!(cell.swap(Mode::Play), Mode::Stop);
    }

    #[test]
    fn test_is_playing() {
        assert!(Mode::Play.is_playing());
        assert!(Mode::SlideShow.is_playing());
        assert!(!Mode::Rec.is_playing());
        assert!(!Mode::Stop.is_playing());
    }

    #[test]
    fn test_thread_state_starts_in_init() {
        let cell = AtomicThreadState::default();
        assert_eq!(cell.load(), ThreadState::Init);
        cell.store(ThreadState::Busy);
        assert_eq!(cell.load(), ThreadState::Busy);
    }
}
