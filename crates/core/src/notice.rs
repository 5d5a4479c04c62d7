use std::{collections::VecDeque, fmt};

use serde::{Deserialize, Serialize};

use crate::Angle;

/// Transient, user-facing message raised by a recoverable condition or a
/// notable user action. The UI layer drains and displays them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notice {
    /// The host refused to start playback; the next play action retries.
    PlaybackBlocked,
    AngleSwitched(Angle),
    QualityChanged(String),
    AutoQuality(bool),
    PlaybackRate(f64),
    Mirror(bool),
    CameraOn,
    CameraError(String),
    FullscreenFailed(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::PlaybackBlocked => write!(f, "Playback was blocked. Press play to continue."),
            Notice::AngleSwitched(angle) => write!(f, "Switched to {angle} view"),
            Notice::QualityChanged(label) => write!(f, "Quality set to {label}"),
            Notice::AutoQuality(true) => write!(f, "Auto quality enabled"),
            Notice::AutoQuality(false) => write!(f, "Auto quality disabled"),
            Notice::PlaybackRate(rate) => write!(f, "Playback speed: {rate}x"),
            Notice::Mirror(true) => write!(f, "Mirror mode on"),
            Notice::Mirror(false) => write!(f, "Mirror mode off"),
            Notice::CameraOn => write!(f, "Camera turned on"),
            Notice::CameraError(message) => write!(f, "{message}"),
            Notice::FullscreenFailed(reason) => write!(f, "Fullscreen unavailable: {reason}"),
        }
    }
}

/// Undrained notices beyond this count push out the oldest ones.
pub const MAX_PENDING_NOTICES: usize = 32;

/// Pending notices, oldest first. Holds at most [`MAX_PENDING_NOTICES`].
#[derive(Debug, Default, Clone)]
pub struct Notices {
    queue: VecDeque<Notice>,
}

impl Notices {
    pub fn push(&mut self, notice: Notice) {
        tracing::info!(%notice, "notice");
        if self.queue.len() >= MAX_PENDING_NOTICES {
            self.queue.pop_front();
        }
        self.queue.push_back(notice);
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        self.queue.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}
