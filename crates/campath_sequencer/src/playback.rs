// SPDX-License-Identifier: MIT OR Apache-2.0
//! Camera path recorder and player.
//!
//! [`CamPlayback`] records an interactively moved camera as a compact list of
//! events and plays it back later with the same timing, so the exact same
//! camera path can be re-shot against different render configurations.
//!
//! All methods take `&self` and are meant to be called from one owner
//! thread; playback runs on a scheduler thread owned by the sequencer.

use crate::config::SequencerConfig;
use crate::error::{Result, SequencerError};
use crate::event::{bool_str, sec_str, CameraSink, Mat4, PlaybackEvent};
use crate::mode::{Mode, ThreadState};
use crate::persistence;
use crate::recorder::RecordOutcome;
use crate::scheduler::Scheduler;
use crate::state::{seconds, Shared};
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

/// Camera event sequencer
pub struct CamPlayback {
    shared: Arc<Shared>,
    scheduler: Scheduler,
}

impl CamPlayback {
    /// Create a sequencer with default settings
    pub fn new() -> Self {
        Self::with_config(SequencerConfig::default())
    }

    /// Create a sequencer. Blocks until the scheduler thread is running.
    pub fn with_config(config: SequencerConfig) -> Self {
        let shared = Arc::new(Shared::new(&config));
        let scheduler = Scheduler::spawn(Arc::clone(&shared));
        Self { shared, scheduler }
    }

    /// Set where played poses are sent
    pub fn set_sink<S: CameraSink + 'static>(&self, sink: S) {
        let sink: Arc<dyn CameraSink> = Arc::new(sink);
        self.shared.set_sink(Some(sink));
    }

    /// Set a shared sink
    pub fn set_shared_sink(&self, sink: Arc<dyn CameraSink>) {
        self.shared.set_sink(Some(sink));
    }

    /// Remove the sink; played events are dropped
    pub fn clear_sink(&self) {
        self.shared.set_sink(None);
    }

    /// Current mode
    pub fn mode(&self) -> Mode {
        self.shared.mode.load()
    }

    /// Scheduler lifecycle state
    pub fn thread_state(&self) -> ThreadState {
        self.shared.thread_state.load()
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.shared.state.lock().store.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().store.is_empty()
    }

    /// Copy of one event
    pub fn event(&self, index: usize) -> Option<PlaybackEvent> {
        self.shared.state.lock().store.get(index).copied()
    }

    /// Copy of every event
    pub fn events(&self) -> Vec<PlaybackEvent> {
        self.shared.state.lock().store.as_slice().to_vec()
    }

    /// Index of the event playback is at
    pub fn cursor(&self) -> usize {
        self.shared.state.lock().cursor
    }

    /// Playback range as `(start, end)`, both inclusive
    pub fn event_range(&self) -> (usize, usize) {
        let state = self.shared.state.lock();
        (state.range_start, state.range_end)
    }

    /// Coalescing threshold in seconds
    pub fn rec_interval(&self) -> f32 {
        self.shared.state.lock().recorder.rec_interval
    }

    /// Snapshot of the current settings
    pub fn config(&self) -> SequencerConfig {
        self.shared.state.lock().to_config()
    }

    /// Stop and drop every event
    pub fn clear(&self) {
        {
            let mut state = self.shared.state.lock();
            self.shared.set_mode(&mut state, Mode::Stop);
            state.store.clear();
            state.cursor = 0;
            state.range_start = 0;
            state.range_end = 0;
        }
        self.scheduler.wake();
        tracing::info!("Camera events cleared");
    }

    /// Set the coalescing threshold
    pub fn set_rec_interval(&self, sec: f32) {
        self.shared.state.lock().recorder.rec_interval = sec;
    }

    /// Start recording. The next sample counts as arriving without delay.
    pub fn rec(&self) {
        {
            let mut state = self.shared.state.lock();
            state.recorder.restart();
            self.shared.set_mode(&mut state, Mode::Rec);
        }
        self.scheduler.wake();
    }

    /// Record a camera sample, coalescing it into the last event when
    /// samples arrive faster than the record interval
    pub fn sample(&self, transform: Mat4) -> RecordOutcome {
        let mut state = self.shared.state.lock();
        let state = &mut *state;
        let outcome = state.recorder.sample(&mut state.store, transform);
        if let RecordOutcome::Appended(_) = outcome {
            state.range_end = state.store.last_index();
        }
        outcome
    }

    /// Hook for every camera update: records while in REC, otherwise only
    /// remembers the pose for [`append_held`](Self::append_held)
    pub fn camera_updated(&self, transform: Mat4) -> Option<RecordOutcome> {
        if self.mode() == Mode::Rec {
            Some(self.sample(transform))
        } else {
            self.save_current_pose(transform);
            None
        }
    }

    /// Remember the current camera pose
    pub fn save_current_pose(&self, transform: Mat4) {
        self.shared.state.lock().current_pose = Some(transform);
    }

    /// Append the remembered pose as a new event held for `interval_sec`.
    /// Returns the new event id, or `None` if no pose was remembered.
    pub fn append_held(&self, interval_sec: f32) -> Option<u64> {
        let mut state = self.shared.state.lock();
        let Some(pose) = state.current_pose else {
            tracing::warn!("No camera pose saved, nothing to append");
            return None;
        };
        let id = state.store.push(interval_sec, pose, false);
        state.range_end = state.store.last_index();
        Some(id)
    }

    /// Append a list of poses as consecutive events sharing one interval and
    /// one render restart flag. Returns the ids of the new events.
    pub fn append_sequence(
        &self,
        transforms: &[Mat4],
        interval_sec: f32,
        force_render_start: bool,
    ) -> Range<u64> {
        let mut state = self.shared.state.lock();
        let first = state.store.len() as u64;
        for transform in transforms {
            state.store.push(interval_sec, *transform, force_render_start);
        }
        if !state.store.is_empty() {
            state.range_end = state.store.last_index();
        }
        first..state.store.len() as u64
    }

    /// Play the range from its first event
    pub fn play(&self) {
        {
            let mut state = self.shared.state.lock();
            state.cursor = state.first_boundary();
            self.shared.set_mode(&mut state, Mode::Play);
        }
        self.scheduler.wake();
    }

    /// Play from the current event
    pub fn play_continue(&self) {
        {
            let mut state = self.shared.state.lock();
            self.shared.set_mode(&mut state, Mode::Play);
        }
        self.scheduler.wake();
    }

    /// Play the range from its first event, holding every event for
    /// `hold_sec` regardless of the recorded intervals
    pub fn slideshow(&self, hold_sec: f32) {
        {
            let mut state = self.shared.state.lock();
            state.cursor = state.first_boundary();
            state.slideshow_hold_sec = hold_sec;
            self.shared.set_mode(&mut state, Mode::SlideShow);
        }
        self.scheduler.wake();
    }

    /// Stop playing or recording. Cuts any in-progress hold short.
    pub fn stop(&self) {
        {
            let mut state = self.shared.state.lock();
            if self.shared.mode.load() == Mode::Stop {
                return;
            }
            self.shared.set_mode(&mut state, Mode::Stop);
        }
        self.scheduler.wake();
    }

    /// Move the cursor to `id` (clamped to the last event) and apply that
    /// pose once. While playing, the caller runs that event's step itself:
    /// in PLAY it waits the scaled interval and then applies, and the
    /// scheduler resumes by holding the event without applying it again. In
    /// SLIDESHOW it applies, waits the slideshow hold, and the scheduler
    /// resumes at the next event. No-op on an empty store.
    pub fn jump_to(&self, id: usize) -> Option<usize> {
        let (plan, mode) = {
            let mut state = self.shared.state.lock();
            if state.store.is_empty() {
                return None;
            }
            state.cursor = id.min(state.store.last_index());
            state.generation = state.generation.wrapping_add(1);
            let mode = self.shared.mode.load();
            let plan = state.plan_jump(mode)?;
            state.jump_in_progress = mode.is_playing();
            (plan, mode)
        };
        self.scheduler.wake();

        match mode {
            Mode::Play => {
                std::thread::sleep(plan.hold);
                self.shared.apply(&plan.event);
            }
            Mode::SlideShow => {
                self.shared.apply(&plan.event);
                std::thread::sleep(plan.hold);
            }
            Mode::Stop | Mode::Rec => self.shared.apply(&plan.event),
        }

        if mode.is_playing() {
            {
                let mut state = self.shared.state.lock();
                state.jump_in_progress = false;
                if mode == Mode::Play && state.generation == plan.generation {
                    state.applied_by_jump = Some(plan.generation);
                } else {
                    self.shared.finish_step(&mut state, &plan);
                }
            }
            self.scheduler.wake();
        }
        tracing::debug!("Jumped to camera event {} in {}", plan.event.id, mode);
        Some(plan.event.id as usize)
    }

    /// Overwrite the interval of the event at the cursor
    pub fn edit_interval(&self, interval_sec: f32) -> bool {
        let mut state = self.shared.state.lock();
        let cursor = state.cursor;
        state.store.set_interval(cursor, interval_sec)
    }

    /// Restrict playback to `[start, end]` and jump to `start`. Both ends
    /// are clamped to the last event.
    pub fn set_event_range(&self, start: usize, end: usize) -> Result<()> {
        {
            let mut state = self.shared.state.lock();
            if state.store.is_empty() {
                return Err(SequencerError::EmptyStore);
            }
            let last = state.store.last_index();
            let (start, end) = (start.min(last), end.min(last));
            if start > end {
                return Err(SequencerError::InvalidRange { start, end });
            }
            state.range_start = start;
            state.range_end = end;
        }
        self.jump_to(start);
        Ok(())
    }

    /// Play every event again
    pub fn reset_event_range(&self) {
        let empty = {
            let mut state = self.shared.state.lock();
            state.range_start = 0;
            state.range_end = state.store.last_index();
            state.store.is_empty()
        };
        if !empty {
            self.jump_to(0);
        }
    }

    /// Extra hold on the first event of the range
    pub fn set_init_hold(&self, sec: f32) {
        self.shared.state.lock().init_hold_sec = sec;
    }

    /// Extra hold on the last event of the range
    pub fn set_last_hold(&self, sec: f32) {
        self.shared.state.lock().last_hold_sec = sec;
    }

    /// Multiplier applied to recorded intervals
    pub fn set_speed_scale(&self, scale: f32) {
        self.shared.state.lock().speed_scale = scale;
    }

    /// Restart from the range start after the last event
    pub fn set_loop(&self, enabled: bool) {
        self.shared.state.lock().loop_playback = enabled;
    }

    /// Walk the range backwards
    pub fn set_reverse(&self, enabled: bool) {
        self.shared.state.lock().reverse_playback = enabled;
    }

    /// Play every event back-to-back on the calling thread and return when
    /// done. Runs independently of the scheduler and cannot be interrupted.
    pub fn quick_playback(&self) {
        let (events, speed_scale) = {
            let state = self.shared.state.lock();
            (state.store.as_slice().to_vec(), state.speed_scale)
        };

        for (index, event) in events.iter().enumerate() {
            self.shared.apply(event);
            if index + 1 < events.len() {
                std::thread::sleep(seconds(event.interval_sec * speed_scale));
            }
        }
    }

    /// Write the events and record interval to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let (rec_interval, events) = {
            let state = self.shared.state.lock();
            (state.recorder.rec_interval, state.store.as_slice().to_vec())
        };
        persistence::save_file(path.as_ref(), rec_interval, &events)
    }

    /// Replace everything with the contents of `path`. Stops playback and
    /// resets the range to cover every loaded event. Nothing changes if the
    /// file cannot be read or decoded.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = persistence::load_file(path.as_ref())?;
        {
            let mut state = self.shared.state.lock();
            self.shared.set_mode(&mut state, Mode::Stop);
            state.recorder.rec_interval = data.rec_interval;
            state.store = data.store;
            state.cursor = 0;
            state.range_start = 0;
            state.range_end = state.store.last_index();
        }
        self.scheduler.wake();
        Ok(())
    }

    /// Multi-line status report
    pub fn show(&self) -> String {
        let mode = self.mode();
        let state = self.shared.state.lock();
        let sec = |s: f32| format!("{} ({})", s, sec_str(s));
        format!(
            "CamPlayback {{\n  mode:{}\n  recInterval:{}\n  events:{} (length: {})\n  loop:{}\n  reverse:{}\n  cursor:{}\n  rangeStart:{}\n  rangeEnd:{}\n  playSpeed:{}\n  initFrameLength:{}\n  lastFrameLength:{}\n  slideShowFrameLength:{}\n}}",
            mode,
            sec(state.recorder.rec_interval),
            state.store.len(),
            sec_str(state.store.total_duration()),
            bool_str(state.loop_playback),
            bool_str(state.reverse_playback),
            state.cursor,
            state.range_start,
            state.range_end,
            state.speed_scale,
            sec(state.init_hold_sec),
            sec(state.last_hold_sec),
            sec(state.slideshow_hold_sec),
        )
    }

    /// Interval of every event, one per line
    pub fn show_interval(&self) -> String {
        self.shared.state.lock().store.interval_report()
    }
}

impl Default for CamPlayback {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::IDENTITY;

    fn pose(x: f32) -> Mat4 {
        let mut m = IDENTITY;
        m[0][3] = x;
        m
    }

    fn poses(count: usize) -> Vec<Mat4> {
        (0..count).map(|i| pose(i as f32)).collect()
    }

    #[test]
    fn test_boot_reaches_idle() {
        let playback = CamPlayback::new();
        assert_eq!(playback.thread_state(), ThreadState::Idle);
        assert_eq!(playback.mode(), Mode::Stop);
        assert!(playback.is_empty());
    }

    #[test]
    fn test_jump_to_clamps() {
        let playback = CamPlayback::new();
        playback.append_sequence(&poses(3), 0.1, false);

        assert_eq!(playback.jump_to(1), Some(1));
        assert_eq!(playback.cursor(), 1);
        assert_eq!(playback.jump_to(99), Some(2));
        assert_eq!(playback.cursor(), 2);
    }

    #[test]
    fn test_jump_to_on_empty_store_is_noop() {
        let playback = CamPlayback::new();
        assert_eq!(playback.jump_to(4), None);
        assert_eq!(playback.cursor(), 0);
    }

    #[test]
    fn test_jump_to_applies_pose_when_stopped() {
        let playback = CamPlayback::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        playback.set_sink(move |m: &Mat4| {
            let _ = tx.send(m[0][3]);
        });
        playback.append_sequence(&poses(3), 10.0, false);

        playback.jump_to(2);
        assert_eq!(rx.try_recv().ok(), Some(2.0));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let playback = CamPlayback::new();
        playback.append_sequence(&poses(3), 0.1, false);
        playback.jump_to(1);
        let before = (playback.mode(), playback.cursor(), playback.event_range(), playback.events());

        playback.stop();
        playback.stop();

        let after = (playback.mode(), playback.cursor(), playback.event_range(), playback.events());
        assert_eq!(before, after);
    }

    #[test]
    fn test_clear_resets_cursor_and_range() {
        let playback = CamPlayback::new();
        playback.append_sequence(&poses(5), 0.1, false);
        playback.set_event_range(1, 3).unwrap();
        playback.rec();

        playback.clear();

        assert!(playback.is_empty());
        assert_eq!(playback.mode(), Mode::Stop);
        assert_eq!(playback.cursor(), 0);
        assert_eq!(playback.event_range(), (0, 0));
    }

    #[test]
    fn test_append_moves_range_end() {
        let playback = CamPlayback::new();
        let ids = playback.append_sequence(&poses(4), 0.25, true);
        assert_eq!(ids, 0..4);
        assert_eq!(playback.event_range(), (0, 3));
        assert!(playback.events().iter().all(|e| e.force_render_start && e.interval_sec == 0.25));

        assert_eq!(playback.append_held(1.0), None);
        playback.save_current_pose(pose(9.0));
        assert_eq!(playback.append_held(1.0), Some(4));
        assert_eq!(playback.event_range(), (0, 4));
        assert_eq!(playback.event(4).map(|e| e.transform), Some(pose(9.0)));
    }

    #[test]
    fn test_camera_updated_records_only_in_rec() {
        let playback = CamPlayback::new();
        assert_eq!(playback.camera_updated(pose(1.0)), None);
        assert!(playback.is_empty());

        playback.rec();
        assert_eq!(playback.camera_updated(pose(1.0)), Some(RecordOutcome::Appended(0)));
        assert_eq!(playback.camera_updated(pose(2.0)), Some(RecordOutcome::Appended(1)));
        assert_eq!(playback.len(), 2);
        assert_eq!(playback.event(0).map(|e| e.interval_sec), Some(0.0));
    }

    #[test]
    fn test_event_range_validation() {
        let playback = CamPlayback::new();
        assert!(matches!(playback.set_event_range(0, 1), Err(SequencerError::EmptyStore)));

        playback.append_sequence(&poses(4), 0.1, false);
        assert!(matches!(
            playback.set_event_range(3, 1),
            Err(SequencerError::InvalidRange { start: 3, end: 1 })
        ));

        playback.set_event_range(2, 50).unwrap();
        assert_eq!(playback.event_range(), (2, 3));
        assert_eq!(playback.cursor(), 2);

        playback.reset_event_range();
        assert_eq!(playback.event_range(), (0, 3));
        assert_eq!(playback.cursor(), 0);
    }

    #[test]
    fn test_edit_interval_targets_cursor() {
        let playback = CamPlayback::new();
        assert!(!playback.edit_interval(1.0));

        playback.append_sequence(&poses(3), 0.1, false);
        playback.jump_to(1);
        assert!(playback.edit_interval(2.5));
        assert_eq!(playback.event(1).map(|e| e.interval_sec), Some(2.5));
        assert_eq!(playback.event(0).map(|e| e.interval_sec), Some(0.1));
    }

    #[test]
    fn test_quick_playback_applies_every_event_in_order() {
        let playback = CamPlayback::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        playback.set_sink(move |m: &Mat4| {
            let _ = tx.send(m[0][3]);
        });
        playback.append_sequence(&poses(4), 0.005, false);

        playback.quick_playback();

        let seen: Vec<f32> = rx.try_iter().collect();
        assert_eq!(seen, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(playback.mode(), Mode::Stop);
    }

    #[test]
    fn test_save_and_load_replace_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orbit.campath");

        let source = CamPlayback::new();
        source.set_rec_interval(0.2);
        source.append_sequence(&poses(5), 0.3, false);
        source.save(&path).unwrap();

        let target = CamPlayback::new();
        target.append_sequence(&poses(2), 1.0, false);
        target.jump_to(1);
        target.rec();
        target.load(&path).unwrap();

        assert_eq!(target.mode(), Mode::Stop);
        assert_eq!(target.rec_interval(), 0.2);
        assert_eq!(target.events(), source.events());
        assert_eq!(target.event_range(), (0, 4));
        assert_eq!(target.cursor(), 0);
    }

    #[test]
    fn test_failed_load_leaves_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.campath");
        std::fs::write(&path, b"CAMP\x01\x00").unwrap();

        let playback = CamPlayback::new();
        playback.append_sequence(&poses(2), 1.0, false);
        let err = playback.load(&path).unwrap_err();
        assert!(err.is_corrupt());
        assert_eq!(playback.len(), 2);

        let missing = dir.path().join("missing.campath");
        assert!(matches!(playback.load(&missing), Err(SequencerError::Io { .. })));
        assert_eq!(playback.len(), 2);
    }

    #[test]
    fn test_show_reports_state() {
        let playback = CamPlayback::new();
        playback.append_sequence(&poses(2), 0.5, false);
        playback.set_loop(true);

        let text = playback.show();
        assert!(text.contains("mode:STOP"));
        assert!(text.contains("events:2"));
        assert!(text.contains("loop:true"));
        assert!(playback.show_interval().starts_with("showInterval (size:2)"));
    }
}
