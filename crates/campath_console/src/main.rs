// SPDX-License-Identifier: MIT OR Apache-2.0
//! `campath` - camera path console
//!
//! Drives a camera playback sequencer from stdin, one command per line.
//! Played poses are logged instead of being sent to a renderer, which makes
//! this handy for inspecting recorded camera path files.
//!
//! Usage: `campath [config.ron]`
//!
//! On top of the sequencer commands (`help` lists them) the console accepts:
//! - `sample <16 floats>` - feed a camera sample (recorded while in REC)
//! - `quick` - play every event back-to-back and wait for it
//! - `config <file>` - write the current settings as RON
//! - `quit`

use campath_sequencer::{command, translation, CamPlayback, CameraSink, Mat4, SequencerConfig};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Logs every pose it receives
struct LogSink;

impl CameraSink for LogSink {
    fn apply_camera(&self, transform: &Mat4) {
        let [x, y, z] = translation(transform);
        tracing::info!("camera translate ({:.4}, {:.4}, {:.4})", x, y, z);
    }

    fn force_render_restart(&self) {
        tracing::info!("render restart requested");
    }
}

fn parse_matrix(words: &[&str]) -> Option<Mat4> {
    if words.len() != 16 {
        return None;
    }
    let mut m = [[0.0f32; 4]; 4];
    for (i, word) in words.iter().enumerate() {
        m[i / 4][i % 4] = word.parse().ok()?;
    }
    Some(m)
}

/// Handle commands that only make sense in this console. Returns `None` when
/// the line should go to the sequencer.
fn console_command(playback: &CamPlayback, line: &str) -> Option<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let (&name, rest) = parts.split_first()?;
    match name {
        "sample" => Some(match parse_matrix(rest) {
            Some(m) => match playback.camera_updated(m) {
                Some(outcome) => format!("sample -> event {}", outcome.id()),
                None => "pose saved".to_string(),
            },
            None => "Usage: sample <16 floats, row-major>".to_string(),
        }),
        "quick" => {
            playback.quick_playback();
            Some(format!("QUICK-PLAYBACK {} events", playback.len()))
        }
        "config" => Some(match rest.first() {
            Some(file) => match playback.config().save(&PathBuf::from(file)) {
                Ok(()) => "config OK".to_string(),
                Err(e) => format!("config NG {e}"),
            },
            None => "Usage: config <file>".to_string(),
        }),
        _ => None,
    }
}

fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("campath=info,campath_sequencer=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    tracing::info!("Starting campath console v{}", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => match SequencerConfig::load(&path) {
            Ok(config) => {
                tracing::info!("Loaded config {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to load config: {e}");
                std::process::exit(1);
            }
        },
        None => SequencerConfig::default(),
    };

    let playback = CamPlayback::with_config(config);
    playback.set_sink(LogSink);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to read stdin: {e}");
                break;
            }
        };
        let line = line.trim();
        if matches!(line, "quit" | "exit") {
            break;
        }

        let output = match console_command(&playback, line) {
            Some(output) => output,
            None => match command::execute(&playback, line) {
                Ok(output) => output,
                Err(e) => e.to_string(),
            },
        };
        if !output.is_empty() {
            let _ = writeln!(stdout, "{output}");
        }
    }

    tracing::info!("Shutting down campath console");
}
