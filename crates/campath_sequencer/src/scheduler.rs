// SPDX-License-Identifier: MIT OR Apache-2.0
//! Background thread that paces playback.
//!
//! The scheduler sleeps on a wake channel while the sequencer is stopped or
//! recording. While playing it applies the event at the cursor, holds it,
//! and advances. Holds are timed receives on the same channel, so an owner
//! command that supersedes the current step cuts the hold short.

use crate::mode::{Mode, ThreadState};
use crate::state::Shared;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Handle to the scheduler thread. Dropping it stops and joins the thread.
pub(crate) struct Scheduler {
    shared: Arc<Shared>,
    wake_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn the thread and block until it reports idle
    pub fn spawn(shared: Arc<Shared>) -> Self {
        let (wake_tx, wake_rx) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let worker = Worker {
            shared: Arc::clone(&shared),
            wake_rx,
        };
        let handle = std::thread::spawn(move || worker.run(ready_tx));

        if ready_rx.recv().is_err() {
            tracing::error!("Camera playback scheduler exited before booting");
        }

        Self {
            shared,
            wake_tx,
            handle: Some(handle),
        }
    }

    /// Nudge the thread to re-read shared state
    pub fn wake(&self) {
        let _ = self.wake_tx.send(());
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.wake();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Camera playback scheduler panicked");
            }
        }
    }
}

struct Worker {
    shared: Arc<Shared>,
    wake_rx: Receiver<()>,
}

impl Worker {
    fn run(self, ready_tx: Sender<()>) {
        self.shared.thread_state.store(ThreadState::Idle);
        let _ = ready_tx.send(());
        tracing::info!("Camera playback scheduler booted");

        while !self.is_shutdown() {
            if self.shared.mode.load().is_playing() {
                self.shared.thread_state.store(ThreadState::Busy);
                self.step();
                self.shared.thread_state.store(ThreadState::Idle);
            } else if self.wake_rx.recv().is_err() {
                break;
            }
        }

        tracing::info!("Camera playback scheduler shutdown");
    }

    fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    fn step(&self) {
        let (plan, already_applied) = {
            let mut state = self.shared.state.lock();
            let mode = self.shared.mode.load();
            if !mode.is_playing() {
                return;
            }
            if state.jump_in_progress {
                drop(state);
                let _ = self.wake_rx.recv();
                return;
            }
            match state.plan_step(mode) {
                Some(plan) => {
                    let already_applied = state.applied_by_jump.take() == Some(plan.generation);
                    (plan, already_applied)
                }
                None => {
                    tracing::warn!("No camera events to play, stopping");
                    self.shared.set_mode(&mut state, Mode::Stop);
                    return;
                }
            }
        };

        if !already_applied {
            self.shared.apply(&plan.event);
        }

        if !self.hold(plan.hold, plan.generation) {
            return;
        }

        let mut state = self.shared.state.lock();
        self.shared.finish_step(&mut state, &plan);
    }

    /// Wait out a hold. Returns false if the step was superseded or the
    /// scheduler is shutting down.
    fn hold(&self, duration: Duration, generation: u64) -> bool {
        let Some(deadline) = Instant::now().checked_add(duration) else {
            return self.hold_until_woken(generation);
        };
        loop {
            if self.is_shutdown() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            match self.wake_rx.recv_timeout(deadline - now) {
                Ok(()) => {
                    if self.is_superseded(generation) {
                        return false;
                    }
                }
                Err(RecvTimeoutError::Timeout) => return true,
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }

    /// Hold with no reachable deadline; only a superseding command or
    /// shutdown ends it
    fn hold_until_woken(&self, generation: u64) -> bool {
        tracing::warn!("Camera hold exceeds the clock range, holding until stopped");
        loop {
            if self.is_shutdown() || self.wake_rx.recv().is_err() || self.is_superseded(generation) {
                return false;
            }
        }
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.shared.state.lock().generation != generation
    }
}
