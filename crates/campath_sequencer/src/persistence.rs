// SPDX-License-Identifier: MIT OR Apache-2.0
//! Binary camera path files.
//!
//! Layout (bincode, little-endian, varint integers, fixed-width floats):
//!
//! ```text
//! magic "CAMP" | version: varint | rec_interval: f32 | count: varint
//! count x { id: varint | interval_sec: f32 | 16 x f32 row-major | force_render_start: u8 }
//! ```
//!
//! The whole stream is decoded and validated before anything is handed
//! back, so a failed load never leaves a half-replaced store behind.

use crate::error::{Result, SequencerError};
use crate::event::PlaybackEvent;
use crate::store::EventStore;
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File magic
pub const MAGIC: [u8; 4] = *b"CAMP";

/// Current file format version
pub const FORMAT_VERSION: u16 = 1;

/// Upper bound on a decoded stream
const MAX_STREAM_BYTES: u64 = 256 * 1024 * 1024;

#[derive(Deserialize)]
struct Header {
    magic: [u8; 4],
    version: u16,
}

#[derive(Serialize)]
struct FileRef<'a> {
    magic: [u8; 4],
    version: u16,
    rec_interval: f32,
    events: &'a [PlaybackEvent],
}

#[derive(Deserialize)]
struct FileOwned {
    _magic: [u8; 4],
    _version: u16,
    rec_interval: f32,
    events: Vec<PlaybackEvent>,
}

/// Decoded contents of a camera path file
#[derive(Debug, Clone, PartialEq)]
pub struct CamPathData {
    /// Coalescing threshold the path was recorded with
    pub rec_interval: f32,
    /// Recorded events
    pub store: EventStore,
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_little_endian()
        .with_varint_encoding()
}

/// Decoding is bounded so a corrupt length prefix cannot exhaust memory
fn decode_options(limit: u64) -> impl Options {
    options().with_limit(limit)
}

/// Encode a camera path into bytes
pub fn encode(rec_interval: f32, events: &[PlaybackEvent]) -> Result<Vec<u8>> {
    let file = FileRef {
        magic: MAGIC,
        version: FORMAT_VERSION,
        rec_interval,
        events,
    };
    Ok(options().serialize(&file)?)
}

/// Decode a camera path from bytes
pub fn decode(bytes: &[u8]) -> Result<CamPathData> {
    decode_with_limit(bytes, MAX_STREAM_BYTES)
}

fn decode_with_limit(bytes: &[u8], limit: u64) -> Result<CamPathData> {
    let header: Header = decode_options(limit).allow_trailing_bytes().deserialize(bytes)?;
    if header.magic != MAGIC {
        return Err(SequencerError::BadMagic(header.magic));
    }
    if header.version != FORMAT_VERSION {
        return Err(SequencerError::UnsupportedVersion {
            found: header.version,
            supported: FORMAT_VERSION,
        });
    }

    let file: FileOwned = decode_options(limit).reject_trailing_bytes().deserialize(bytes)?;
    Ok(CamPathData {
        rec_interval: file.rec_interval,
        store: EventStore::from_events(file.events)?,
    })
}

/// Write a camera path file, replacing any existing file
pub fn save_file(path: &Path, rec_interval: f32, events: &[PlaybackEvent]) -> Result<()> {
    let bytes = encode(rec_interval, events)?;
    std::fs::write(path, bytes).map_err(|source| SequencerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Saved {} camera events to {:?}", events.len(), path);
    Ok(())
}

/// Read a camera path file
pub fn load_file(path: &Path) -> Result<CamPathData> {
    let bytes = std::fs::read(path).map_err(|source| SequencerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let data = decode(&bytes)?;
    tracing::info!("Loaded {} camera events from {:?}", data.store.len(), path);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Mat4, IDENTITY};

    fn sample_store(count: usize) -> EventStore {
        let mut store = EventStore::new();
        for i in 0..count {
            let mut m: Mat4 = IDENTITY;
            for (r, row) in m.iter_mut().enumerate() {
                for (c, v) in row.iter_mut().enumerate() {
                    *v = (i * 16 + r * 4 + c) as f32 * 0.1 - 3.3;
                }
            }
            store.push(i as f32 / 7.0, m, i % 3 == 0);
        }
        store
    }

    #[test]
    fn test_round_trip_sizes() {
        for count in [0, 1, 5, 100] {
            let store = sample_store(count);
            let bytes = encode(1.0 / 24.0, store.as_slice()).unwrap();
            let data = decode(&bytes).unwrap();

            assert_eq!(data.rec_interval.to_bits(), (1.0f32 / 24.0).to_bits());
            assert_eq!(data.store.len(), count);
            for (a, b) in store.iter().zip(data.store.iter()) {
                assert_eq!(a.id, b.id);
                assert_eq!(a.interval_sec.to_bits(), b.interval_sec.to_bits());
                assert_eq!(a.force_render_start, b.force_render_start);
                for (ra, rb) in a.transform.iter().zip(b.transform.iter()) {
                    for (va, vb) in ra.iter().zip(rb.iter()) {
                        assert_eq!(va.to_bits(), vb.to_bits());
                    }
                }
            }
        }
    }

    #[test]
    fn test_layout_starts_with_header() {
        let bytes = encode(0.5, &[]).unwrap();
        assert_eq!(&bytes[..4], b"CAMP");
        assert_eq!(bytes[4], FORMAT_VERSION as u8);
        assert_eq!(&bytes[5..9], &0.5f32.to_le_bytes());
        assert_eq!(bytes[9], 0);
        assert_eq!(bytes.len(), 10);
    }

    #[test]
    fn test_truncated_stream_is_corrupt() {
        let bytes = encode(0.1, sample_store(5).as_slice()).unwrap();
        for cut in [0, 3, 6, bytes.len() / 2, bytes.len() - 1] {
            let err = decode(&bytes[..cut]).unwrap_err();
            assert!(err.is_corrupt(), "cut {cut}: {err}");
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = encode(0.1, sample_store(2).as_slice()).unwrap();
        bytes.push(0xff);
        assert!(matches!(decode(&bytes), Err(SequencerError::Corrupt(_))));
    }

    #[test]
    fn test_bad_magic_and_newer_version() {
        let mut bytes = encode(0.1, &[]).unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes), Err(SequencerError::BadMagic(_))));

        let mut bytes = encode(0.1, &[]).unwrap();
        bytes[4] = (FORMAT_VERSION + 1) as u8;
        assert!(matches!(
            decode(&bytes),
            Err(SequencerError::UnsupportedVersion { found, .. }) if found == FORMAT_VERSION + 1
        ));
    }

    #[test]
    fn test_version_zero_rejected() {
        let mut bytes = encode(0.1, sample_store(1).as_slice()).unwrap();
        bytes[4] = 0;
        assert!(matches!(
            decode(&bytes),
            Err(SequencerError::UnsupportedVersion { found: 0, .. })
        ));
    }

    #[test]
    fn test_size_limit_only_bounds_decoding() {
        let bytes = encode(0.1, sample_store(100).as_slice()).unwrap();
        assert!(bytes.len() > 1024);
        assert!(decode_with_limit(&bytes, 1024).unwrap_err().is_corrupt());
        assert_eq!(decode(&bytes).unwrap().store.len(), 100);
    }

    #[test]
    fn test_file_round_trip_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("path.campath");
        let store = sample_store(3);

        save_file(&path, 0.25, store.as_slice()).unwrap();
        let data = load_file(&path).unwrap();
        assert_eq!(data.rec_interval, 0.25);
        assert_eq!(data.store, store);

        let missing = dir.path().join("missing.campath");
        assert!(matches!(load_file(&missing), Err(SequencerError::Io { .. })));
    }
}
