// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequencer configuration.
//!
//! Settings are stored as RON so they can be edited by hand:
//!
//! ```ron
//! SequencerConfig(
//!     version: 1,
//!     rec_interval: 0.041666668,
//!     init_hold_sec: 5.0,
//!     ...
//! )
//! ```

use crate::recorder::DEFAULT_REC_INTERVAL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current config format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Config file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("IO error on {path:?}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid RON for this config
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Config could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// File was written by a newer version
    #[error("Config version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest supported version
        supported: u32,
    },
}

/// Playback and recording settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// Format version
    pub version: u32,
    /// Coalescing threshold for recorded samples, seconds
    pub rec_interval: f32,
    /// Extra hold on the first event of the playback range, seconds
    pub init_hold_sec: f32,
    /// Extra hold on the last event of the playback range, seconds
    pub last_hold_sec: f32,
    /// Hold per event in slideshow mode, seconds
    pub slideshow_hold_sec: f32,
    /// Multiplier applied to recorded intervals during playback
    pub speed_scale: f32,
    /// Restart from the range start after the last event
    pub loop_playback: bool,
    /// Walk the range backwards
    pub reverse_playback: bool,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            rec_interval: DEFAULT_REC_INTERVAL,
            init_hold_sec: 5.0,
            last_hold_sec: 5.0,
            slideshow_hold_sec: 1.0,
            speed_scale: 1.0,
            loop_playback: false,
            reverse_playback: false,
        }
    }
}

impl SequencerConfig {
    /// Load config from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&content)
    }

    /// Parse config from RON text
    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        let config: SequencerConfig = ron::from_str(content)?;

        if config.version > CONFIG_FORMAT_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: config.version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }

        Ok(config)
    }

    /// Save config to a RON file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let pretty = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
