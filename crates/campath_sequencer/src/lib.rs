// SPDX-License-Identifier: MIT OR Apache-2.0
//! Camera path recorder and player for interactive render viewers.
//!
//! This crate captures an interactively moved camera and replays it later
//! with the recorded timing:
//! - Recording with run-length coalescing of dense samples
//! - Paced playback on a background scheduler thread
//! - Slideshow, loop, reverse and range playback
//! - Binary camera path files
//! - A text command surface for debug consoles
//!
//! ## Architecture
//!
//! The sequencer is built on:
//! - An append-only event store guarded by a single lock
//! - A scheduler thread woken through a channel, with interruptible holds
//! - A [`CameraSink`] the host implements to push poses to its renderer

pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod mode;
pub mod persistence;
pub mod playback;
pub mod recorder;
mod scheduler;
mod state;
pub mod store;

pub use command::{execute, CommandError};
pub use config::{ConfigError, SequencerConfig};
pub use error::{Result, SequencerError};
pub use event::{translation, CameraSink, Mat4, PlaybackEvent, IDENTITY};
pub use mode::{Mode, ThreadState};
pub use persistence::CamPathData;
pub use playback::CamPlayback;
pub use recorder::{RecordOutcome, Recorder};
pub use store::EventStore;
