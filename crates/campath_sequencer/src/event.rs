// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback event definitions for the sequencer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Row-major 4x4 camera transform, indexed `m[row][column]`. Points are
/// column vectors, so the translation sits in column 3 of the first three
/// rows.
pub type Mat4 = [[f32; 4]; 4];

/// Identity transform
pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// A recorded camera pose and how long it is held.
///
/// `id` is the position of the event in its store at creation time. The store
/// only grows or is replaced wholesale, so `id` always equals the index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackEvent {
    /// Sequence index
    pub id: u64,
    /// Seconds this pose is held before playback advances
    pub interval_sec: f32,
    /// Camera transform
    pub transform: Mat4,
    /// Kick a render even if the next event fires immediately after this one
    pub force_render_start: bool,
}

impl PlaybackEvent {
    /// Create a new event
    pub fn new(id: u64, interval_sec: f32, transform: Mat4) -> Self {
        Self {
            id,
            interval_sec,
            transform,
            force_render_start: false,
        }
    }

    /// Set the force render start hint
    pub fn with_force_render_start(mut self, force: bool) -> Self {
        self.force_render_start = force;
        self
    }

    /// Fold another sample into this event: the held time grows by `interval_sec`
    /// and the pose becomes the newest sample.
    pub fn coalesce(&mut self, interval_sec: f32, transform: Mat4) {
        self.interval_sec += interval_sec;
        self.transform = transform;
    }
}

impl fmt::Display for PlaybackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PlaybackEvent {{")?;
        writeln!(f, "  id:{}", self.id)?;
        writeln!(f, "  interval:{} ({})", self.interval_sec, sec_str(self.interval_sec))?;
        writeln!(f, "  forceRenderStart:{}", bool_str(self.force_render_start))?;
        writeln!(f, "  transform {{")?;
        for row in &self.transform {
            writeln!(
                f,
                "    {:10.5} {:10.5} {:10.5} {:10.5}",
                row[0], row[1], row[2], row[3]
            )?;
        }
        writeln!(f, "  }}")?;
        write!(f, "}}")
    }
}

/// Receiver of camera poses produced by playback.
///
/// Implemented by whatever pushes a pose to the renderer. Closures taking a
/// `&Mat4` are sinks too.
pub trait CameraSink: Send + Sync {
    /// Push a new camera pose
    fn apply_camera(&self, transform: &Mat4);

    /// Force the renderer to restart the current frame
    fn force_render_restart(&self) {}
}

impl<F> CameraSink for F
where
    F: Fn(&Mat4) + Send + Sync,
{
    fn apply_camera(&self, transform: &Mat4) {
        self(transform);
    }
}

/// Human readable seconds, e.g. `41.667 ms` or `2 min 3.500 sec`
pub fn sec_str(sec: f32) -> String {
    let abs = sec.abs();
    if abs < 0.001 {
        format!("{:.3} us", sec * 1_000_000.0)
    } else if abs < 1.0 {
        format!("{:.3} ms", sec * 1000.0)
    } else if abs < 60.0 {
        format!("{:.3} sec", sec)
    } else {
        let minutes = (sec / 60.0).trunc();
        format!("{} min {:.3} sec", minutes as i64, sec - minutes * 60.0)
    }
}

/// Translation part of a transform
pub fn translation(m: &Mat4) -> [f32; 3] {
    [m[0][3], m[1][3], m[2][3]]
}

/// `true`/`false` as shown by the console
pub fn bool_str(flag: bool) -> &'static str {
    if flag {
        "true"
    } else {
        "false"
    }
}
