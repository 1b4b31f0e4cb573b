// SPDX-License-Identifier: MIT OR Apache-2.0
//! State shared between the owner thread and the scheduler thread.

use crate::config::SequencerConfig;
use crate::event::{CameraSink, Mat4, PlaybackEvent};
use crate::mode::{AtomicMode, AtomicThreadState, Mode};
use crate::recorder::Recorder;
use crate::store::EventStore;
use parking_lot::{Mutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Everything guarded by the state lock
#[derive(Debug)]
pub(crate) struct PlaybackState {
    pub store: EventStore,
    pub recorder: Recorder,
    pub cursor: usize,
    pub range_start: usize,
    pub range_end: usize,
    pub loop_playback: bool,
    pub reverse_playback: bool,
    pub speed_scale: f32,
    pub init_hold_sec: f32,
    pub last_hold_sec: f32,
    pub slideshow_hold_sec: f32,
    /// Pose registered by `save_current_pose`, appended by `append_held`
    pub current_pose: Option<Mat4>,
    /// Bumped by every owner command that supersedes an in-flight step
    pub generation: u64,
    /// Set while `jump_to` runs the step at the cursor on the owner thread
    pub jump_in_progress: bool,
    /// Generation whose step already had its pose applied by `jump_to`
    pub applied_by_jump: Option<u64>,
}

/// One scheduler step, computed under the lock and run outside of it
#[derive(Debug, Clone, Copy)]
pub(crate) struct StepPlan {
    pub event: PlaybackEvent,
    pub hold: Duration,
    pub at_last_boundary: bool,
    pub generation: u64,
}

impl PlaybackState {
    pub fn from_config(config: &SequencerConfig) -> Self {
        Self {
            store: EventStore::new(),
            recorder: Recorder::new(config.rec_interval),
            cursor: 0,
            range_start: 0,
            range_end: 0,
            loop_playback: config.loop_playback,
            reverse_playback: config.reverse_playback,
            speed_scale: config.speed_scale,
            init_hold_sec: config.init_hold_sec,
            last_hold_sec: config.last_hold_sec,
            slideshow_hold_sec: config.slideshow_hold_sec,
            current_pose: None,
            generation: 0,
            jump_in_progress: false,
            applied_by_jump: None,
        }
    }

    pub fn to_config(&self) -> SequencerConfig {
        SequencerConfig {
            rec_interval: self.recorder.rec_interval,
            init_hold_sec: self.init_hold_sec,
            last_hold_sec: self.last_hold_sec,
            slideshow_hold_sec: self.slideshow_hold_sec,
            speed_scale: self.speed_scale,
            loop_playback: self.loop_playback,
            reverse_playback: self.reverse_playback,
            ..SequencerConfig::default()
        }
    }

    fn clamp_index(&self, index: usize) -> usize {
        index.min(self.store.last_index())
    }

    /// First event visited in the current direction
    pub fn first_boundary(&self) -> usize {
        self.clamp_index(if self.reverse_playback {
            self.range_end
        } else {
            self.range_start
        })
    }

    /// Last event visited in the current direction
    pub fn last_boundary(&self) -> usize {
        self.clamp_index(if self.reverse_playback {
            self.range_start
        } else {
            self.range_end
        })
    }

    /// Hold of one event in the given mode, without boundary extras
    pub fn event_hold(&self, mode: Mode, event: &PlaybackEvent) -> f32 {
        match mode {
            Mode::Play => event.interval_sec * self.speed_scale,
            Mode::SlideShow => self.slideshow_hold_sec,
            Mode::Stop | Mode::Rec => 0.0,
        }
    }

    /// Plan the step at the cursor. `None` on an empty store.
    pub fn plan_step(&mut self, mode: Mode) -> Option<StepPlan> {
        if self.store.is_empty() {
            return None;
        }
        self.cursor = self.clamp_index(self.cursor);
        let event = *self.store.get(self.cursor)?;

        let mut hold = self.event_hold(mode, &event);
        if self.cursor == self.first_boundary() {
            hold += self.init_hold_sec;
        }
        let at_last_boundary = self.cursor == self.last_boundary();
        if at_last_boundary {
            hold += self.last_hold_sec;
        }

        Some(StepPlan {
            event,
            hold: seconds(hold),
            at_last_boundary,
            generation: self.generation,
        })
    }

    /// Plan the step `jump_to` runs itself: the event's own hold, without
    /// boundary extras
    pub fn plan_jump(&mut self, mode: Mode) -> Option<StepPlan> {
        let mut plan = self.plan_step(mode)?;
        plan.hold = seconds(self.event_hold(mode, &plan.event));
        Some(plan)
    }

    /// Move one event in the playback direction, wrapping at the array ends
    pub fn advance_cursor(&mut self) {
        let len = self.store.len();
        if len == 0 {
            return;
        }
        self.cursor = if self.reverse_playback {
            if self.cursor == 0 {
                len - 1
            } else {
                self.cursor - 1
            }
        } else if self.cursor + 1 >= len {
            0
        } else {
            self.cursor + 1
        };
    }
}

/// Convert a hold in seconds to a duration. Negative or NaN holds are zero,
/// holds too long for a `Duration` saturate.
pub(crate) fn seconds(sec: f32) -> Duration {
    if sec.is_nan() || sec <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f32(sec).unwrap_or(Duration::MAX)
}

/// Shared between the owner and the scheduler
pub(crate) struct Shared {
    pub state: Mutex<PlaybackState>,
    /// Written only while `state` is locked so mode and generation move together
    pub mode: AtomicMode,
    pub thread_state: AtomicThreadState,
    /// Written only by the scheduler's drop
    pub shutdown: AtomicBool,
    sink: RwLock<Option<Arc<dyn CameraSink>>>,
}

impl Shared {
    pub fn new(config: &SequencerConfig) -> Self {
        Self {
            state: Mutex::new(PlaybackState::from_config(config)),
            mode: AtomicMode::new(Mode::Stop),
            thread_state: AtomicThreadState::default(),
            shutdown: AtomicBool::new(false),
            sink: RwLock::new(None),
        }
    }

    /// Change mode and supersede any in-flight step. Takes the locked state
    /// as proof the lock is held.
    pub fn set_mode(&self, state: &mut PlaybackState, mode: Mode) -> Mode {
        state.generation = state.generation.wrapping_add(1);
        let previous = self.mode.swap(mode);
        if previous != mode {
            tracing::info!("Camera playback mode {} -> {}", previous, mode);
        }
        previous
    }

    /// Move past a finished step: wrap or stop at the last boundary,
    /// otherwise advance. Does nothing if the step was superseded.
    pub fn finish_step(&self, state: &mut PlaybackState, plan: &StepPlan) {
        if state.generation != plan.generation {
            return;
        }
        if plan.at_last_boundary {
            tracing::info!("Camera playback reached last event {}", plan.event.id);
            if state.loop_playback {
                state.cursor = state.first_boundary();
            } else {
                self.set_mode(state, Mode::Stop);
            }
        } else {
            state.advance_cursor();
        }
    }

    pub fn set_sink(&self, sink: Option<Arc<dyn CameraSink>>) {
        *self.sink.write() = sink;
    }

    /// Push an event's pose to the sink. A panicking sink is logged and
    /// otherwise ignored.
    pub fn apply(&self, event: &PlaybackEvent) {
        let Some(sink) = self.sink.read().clone() else {
            tracing::debug!("No camera sink, event {} dropped", event.id);
            return;
        };

        tracing::debug!("Applying camera event {} (interval {})", event.id, event.interval_sec);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            sink.apply_camera(&event.transform);
            if event.force_render_start {
                sink.force_render_restart();
            }
        }));
        if result.is_err() {
            tracing::error!("Camera sink panicked while applying event {}", event.id);
        }
    }
}
