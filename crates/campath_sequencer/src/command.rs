// SPDX-License-Identifier: MIT OR Apache-2.0
//! Text command surface for a debug console.
//!
//! Each line is split on whitespace; the first word selects the command and
//! the rest are its arguments. A successful command returns the message to
//! print.

use crate::error::SequencerError;
use crate::event::{bool_str, sec_str};
use crate::playback::CamPlayback;
use std::str::FromStr;
use thiserror::Error;

/// Command errors
#[derive(Debug, Error)]
pub enum CommandError {
    /// First word is not a known command
    #[error("Unknown command: {0}. Type 'help' for available commands.")]
    Unknown(String),

    /// Required argument is absent
    #[error("Usage: {command} {usage}")]
    MissingArgument {
        /// Command name
        command: &'static str,
        /// Argument synopsis
        usage: &'static str,
    },

    /// Argument could not be parsed
    #[error("{command}: invalid argument '{value}'")]
    InvalidArgument {
        /// Command name
        command: &'static str,
        /// Offending argument
        value: String,
    },

    /// The sequencer rejected the command
    #[error("{command} NG {source}")]
    Sequencer {
        /// Command name
        command: &'static str,
        /// Underlying error
        #[source]
        source: SequencerError,
    },
}

/// Every command as `(name, arguments, description)`
pub const COMMANDS: &[(&str, &str, &str)] = &[
    ("show", "", "show current information"),
    ("showInterval", "", "show the interval of every event"),
    ("clear", "", "clear all event data"),
    ("stop", "", "stop playback or recording"),
    ("recInterval", "<sec>", "set the record coalescing interval"),
    ("rec", "", "start recording"),
    ("recAdd", "<sec>", "append the current camera pose held for <sec>"),
    ("initFrameLength", "<sec>", "set the extra hold on the first event"),
    ("lastFrameLength", "<sec>", "set the extra hold on the last event"),
    ("eventRange", "<start> <end>", "set the playback start and end event"),
    ("eventRangeReset", "", "play every event"),
    ("jumpTo", "<eventId>", "set the current event"),
    ("editInterval", "<sec>", "edit the interval of the current event"),
    ("play", "", "start playback from the beginning"),
    ("playSpeed", "<scale>", "set the playback speed scale"),
    ("continue", "", "start playback from the current event"),
    ("slideShow", "<sec>", "play every event held for <sec>"),
    ("loop", "<on|off>", "loop playback (default off)"),
    ("reverse", "<on|off>", "play backwards (default off)"),
    ("save", "<file>", "save camera path data"),
    ("load", "<file>", "load camera path data"),
    ("help", "", "show this help"),
];

fn usage_of(command: &'static str) -> &'static str {
    COMMANDS
        .iter()
        .find(|(name, _, _)| *name == command)
        .map_or("", |(_, usage, _)| *usage)
}

/// Positional argument reader for one command
struct Args<'a> {
    command: &'static str,
    words: std::slice::Iter<'a, &'a str>,
}

impl<'a> Args<'a> {
    fn next_str(&mut self) -> Result<&'a str, CommandError> {
        self.words.next().copied().ok_or(CommandError::MissingArgument {
            command: self.command,
            usage: usage_of(self.command),
        })
    }

    fn next<T: FromStr>(&mut self) -> Result<T, CommandError> {
        let word = self.next_str()?;
        word.parse().map_err(|_| CommandError::InvalidArgument {
            command: self.command,
            value: word.to_string(),
        })
    }

    fn next_switch(&mut self) -> Result<bool, CommandError> {
        let word = self.next_str()?;
        match word.to_lowercase().as_str() {
            "on" | "true" | "1" | "yes" => Ok(true),
            "off" | "false" | "0" | "no" => Ok(false),
            _ => Err(CommandError::InvalidArgument {
                command: self.command,
                value: word.to_string(),
            }),
        }
    }
}

/// Run one console line against a sequencer
pub fn execute(playback: &CamPlayback, line: &str) -> Result<String, CommandError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((&name, rest)) = parts.split_first() else {
        return Ok(String::new());
    };
    let Some(&(command, _, _)) = COMMANDS.iter().find(|(n, _, _)| *n == name) else {
        return Err(CommandError::Unknown(name.to_string()));
    };
    let mut args = Args {
        command,
        words: rest.iter(),
    };

    let message = match command {
        "show" => playback.show(),
        "showInterval" => playback.show_interval(),
        "clear" => {
            playback.clear();
            "CLEAR".to_string()
        }
        "stop" => {
            playback.stop();
            "STOP".to_string()
        }
        "recInterval" => {
            let sec: f32 = args.next()?;
            playback.set_rec_interval(sec);
            format!("recInterval:{}", sec_str(sec))
        }
        "rec" => {
            playback.rec();
            "REC".to_string()
        }
        "recAdd" => {
            let sec: f32 = args.next()?;
            match playback.append_held(sec) {
                Some(id) => format!("REC-ADD eventId:{} interval:{}", id, sec_str(sec)),
                None => "REC-ADD skipped, no camera pose yet".to_string(),
            }
        }
        "initFrameLength" => {
            let sec: f32 = args.next()?;
            playback.set_init_hold(sec);
            format!("initFrameSec:{}", sec_str(sec))
        }
        "lastFrameLength" => {
            let sec: f32 = args.next()?;
            playback.set_last_hold(sec);
            format!("lastFrameSec:{}", sec_str(sec))
        }
        "eventRange" => {
            let start: usize = args.next()?;
            let end: usize = args.next()?;
            playback
                .set_event_range(start, end)
                .map_err(|source| CommandError::Sequencer { command, source })?;
            let (start, end) = playback.event_range();
            format!("eventRange start:{} end:{}", start, end)
        }
        "eventRangeReset" => {
            playback.reset_event_range();
            "Reset eventRange".to_string()
        }
        "jumpTo" => {
            let id: usize = args.next()?;
            playback.jump_to(id);
            format!("jumpTo:{}", playback.cursor())
        }
        "editInterval" => {
            let sec: f32 = args.next()?;
            if playback.edit_interval(sec) {
                format!("edit current interval {}", sec_str(sec))
            } else {
                "editInterval skipped, no events".to_string()
            }
        }
        "play" => {
            playback.play();
            "PLAY".to_string()
        }
        "playSpeed" => {
            let scale: f32 = args.next()?;
            playback.set_speed_scale(scale);
            format!("playSpeed scale:{}", scale)
        }
        "continue" => {
            playback.play_continue();
            "CONTINUE".to_string()
        }
        "slideShow" => {
            let sec: f32 = args.next()?;
            playback.slideshow(sec);
            format!("SLIDE-SHOW interval:{}", sec_str(sec))
        }
        "loop" => {
            let enabled = args.next_switch()?;
            playback.set_loop(enabled);
            format!("loop {}", bool_str(enabled))
        }
        "reverse" => {
            let enabled = args.next_switch()?;
            playback.set_reverse(enabled);
            format!("reverse {}", bool_str(enabled))
        }
        "save" => {
            let file = args.next_str()?;
            playback
                .save(file)
                .map_err(|source| CommandError::Sequencer { command, source })?;
            "save OK".to_string()
        }
        "load" => {
            let file = args.next_str()?;
            playback
                .load(file)
                .map_err(|source| CommandError::Sequencer { command, source })?;
            "load OK".to_string()
        }
        _ => help(),
    };

    Ok(message)
}

/// Help text listing every command
pub fn help() -> String {
    let mut out = String::from("camera playback commands:");
    for (name, usage, description) in COMMANDS {
        out.push_str(&format!("\n  {:<16}{:<16}: {}", name, usage, description));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::IDENTITY;
    use crate::mode::Mode;

    #[test]
    fn test_blank_line_is_ignored() {
        let playback = CamPlayback::new();
        assert_eq!(execute(&playback, "   ").unwrap(), "");
    }

    #[test]
    fn test_unknown_command() {
        let playback = CamPlayback::new();
        let err = execute(&playback, "dance now").unwrap_err();
        assert!(matches!(err, CommandError::Unknown(ref name) if name == "dance"));
    }

    #[test]
    fn test_settings_commands() {
        let playback = CamPlayback::new();
        assert_eq!(execute(&playback, "recInterval 0.5").unwrap(), "recInterval:500.000 ms");
        assert_eq!(execute(&playback, "loop on").unwrap(), "loop true");
        assert_eq!(execute(&playback, "reverse off").unwrap(), "reverse false");
        execute(&playback, "playSpeed 2").unwrap();
        execute(&playback, "initFrameLength 0").unwrap();
        execute(&playback, "lastFrameLength 1.5").unwrap();

        let config = playback.config();
        assert_eq!(config.rec_interval, 0.5);
        assert!(config.loop_playback);
        assert!(!config.reverse_playback);
        assert_eq!(config.speed_scale, 2.0);
        assert_eq!(config.init_hold_sec, 0.0);
        assert_eq!(config.last_hold_sec, 1.5);
    }

    #[test]
    fn test_argument_errors() {
        let playback = CamPlayback::new();
        assert!(matches!(
            execute(&playback, "recInterval").unwrap_err(),
            CommandError::MissingArgument { command: "recInterval", usage: "<sec>" }
        ));
        assert!(matches!(
            execute(&playback, "jumpTo three").unwrap_err(),
            CommandError::InvalidArgument { command: "jumpTo", .. }
        ));
        assert!(matches!(
            execute(&playback, "loop maybe").unwrap_err(),
            CommandError::InvalidArgument { command: "loop", .. }
        ));
    }

    #[test]
    fn test_recording_commands() {
        let playback = CamPlayback::new();
        assert_eq!(execute(&playback, "rec").unwrap(), "REC");
        assert_eq!(playback.mode(), Mode::Rec);
        assert_eq!(execute(&playback, "stop").unwrap(), "STOP");

        assert_eq!(execute(&playback, "recAdd 1").unwrap(), "REC-ADD skipped, no camera pose yet");
        playback.save_current_pose(IDENTITY);
        assert_eq!(execute(&playback, "recAdd 1").unwrap(), "REC-ADD eventId:0 interval:1.000 sec");
        execute(&playback, "recAdd 2").unwrap();
        execute(&playback, "recAdd 3").unwrap();

        assert_eq!(execute(&playback, "jumpTo 10").unwrap(), "jumpTo:2");
        assert_eq!(execute(&playback, "editInterval 0.25").unwrap(), "edit current interval 250.000 ms");
        assert_eq!(execute(&playback, "eventRange 1 2").unwrap(), "eventRange start:1 end:2");
        assert_eq!(execute(&playback, "eventRangeReset").unwrap(), "Reset eventRange");
        assert_eq!(playback.event_range(), (0, 2));
        assert!(execute(&playback, "showInterval").unwrap().contains("size:3"));
        assert_eq!(execute(&playback, "clear").unwrap(), "CLEAR");
        assert!(playback.is_empty());
    }

    #[test]
    fn test_event_range_error_message() {
        let playback = CamPlayback::new();
        let err = execute(&playback, "eventRange 0 1").unwrap_err();
        assert_eq!(err.to_string(), "eventRange NG No events recorded");
    }

    #[test]
    fn test_save_and_load_commands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmd.campath");
        let path_str = path.to_string_lossy().to_string();

        let playback = CamPlayback::new();
        playback.save_current_pose(IDENTITY);
        playback.append_held(0.5);
        assert_eq!(execute(&playback, &format!("save {path_str}")).unwrap(), "save OK");

        let other = CamPlayback::new();
        assert_eq!(execute(&other, &format!("load {path_str}")).unwrap(), "load OK");
        assert_eq!(other.len(), 1);

        let missing = dir.path().join("nope.campath");
        let err = execute(&other, &format!("load {}", missing.to_string_lossy())).unwrap_err();
        assert!(err.to_string().starts_with("load NG"));
    }

    #[test]
    fn test_help_lists_every_command() {
        let playback = CamPlayback::new();
        let text = execute(&playback, "help").unwrap();
        for (name, _, _) in COMMANDS {
            assert!(text.contains(name), "missing {name}");
        }
    }
}
