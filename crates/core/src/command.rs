use serde::{Deserialize, Serialize};

use crate::Angle;

/// A user action on the practice screen, as issued by a button, a keyboard
/// shortcut or a rehearsal script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    Play,
    Pause,
    TogglePlay,
    Seek { seconds: f64 },
    SeekRelative { seconds: f64 },
    SetVolume { volume: f64 },
    ToggleMute,
    SetRate { rate: f64 },
    SwitchAngle { angle: Angle },
    SelectQuality { index: usize },
    ToggleAutoQuality,
    SetLoop { start: f64, end: f64 },
    SetLoopStart { seconds: f64 },
    SetLoopEnd { seconds: f64 },
    ToggleLoop,
    LoopFromHere,
    ClearLoop,
    JumpToSection { id: String },
    ToggleMirror,
    ToggleFullscreen,
    ToggleCamera,
    ToggleMetronome,
    SetTempo { bpm: f64 },
    SetBeatsPerMeasure { beats: u32 },
    SetAccent { enabled: bool },
}

impl Command {
    /// Maps a keyboard key (DOM-style names, case-insensitive) to its
    /// shortcut.
    pub fn from_key(key: &str, seek_step_secs: f64) -> Option<Self> {
        let command = match key.to_lowercase().as_str() {
            " " | "space" => Command::TogglePlay,
            "arrowleft" => Command::SeekRelative {
                seconds: -seek_step_secs,
            },
            "arrowright" => Command::SeekRelative {
                seconds: seek_step_secs,
            },
            "m" => Command::ToggleMute,
            "f" => Command::ToggleFullscreen,
            "l" => Command::ToggleLoop,
            "h" => Command::ToggleMirror,
            _ => return None,
        };
        Some(command)
    }
}
