// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the sequencer.

use std::path::PathBuf;
use thiserror::Error;

/// Sequencer errors
#[derive(Debug, Error)]
pub enum SequencerError {
    /// File could not be created, opened, read or written
    #[error("IO error on {path:?}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Byte stream is truncated or malformed
    #[error("Corrupt camera path data: {0}")]
    Corrupt(#[from] bincode::Error),

    /// Byte stream does not start with the camera path magic
    #[error("Not a camera path file (bad magic {0:?})")]
    BadMagic([u8; 4]),

    /// Byte stream carries a format version this build does not read
    #[error("Unsupported camera path format version {found} (expected {supported})")]
    UnsupportedVersion {
        /// Version found in the stream
        found: u16,
        /// Version this build reads and writes
        supported: u16,
    },

    /// Stored event id does not match its position
    #[error("Event at index {index} carries id {id}")]
    EventIdMismatch {
        /// Position in the stream
        index: usize,
        /// Id found at that position
        id: u64,
    },

    /// Range start lies after range end
    #[error("Invalid event range: start {start} is after end {end}")]
    InvalidRange {
        /// Requested start
        start: usize,
        /// Requested end
        end: usize,
    },

    /// Operation needs at least one event
    #[error("No events recorded")]
    EmptyStore,
}

impl SequencerError {
    /// Whether the error came from malformed input data
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            Self::Corrupt(_)
                | Self::BadMagic(_)
                | Self::UnsupportedVersion { .. }
                | Self::EventIdMismatch { .. }
        )
    }
}

/// Result type for sequencer operations
pub type Result<T> = std::result::Result<T, SequencerError>;
