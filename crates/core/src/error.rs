/// Result alias that carries the custom [`PracticeError`] type.
pub type Result<T> = std::result::Result<T, PracticeError>;

/// Common error type for the core crate.
///
/// None of these are fatal. Callers inside the crate convert the permission
/// and availability variants into a [`crate::Notice`] and keep going.
#[derive(Debug, thiserror::Error)]
pub enum PracticeError {
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration or script files that failed to parse.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// The media surface refused to start playback, usually because the host
    /// requires a user gesture first.
    #[error("playback was rejected: {0}")]
    PlaybackRejected(String),
    /// The camera could not be opened (permission denied or no device).
    #[error("capture device unavailable: {0}")]
    CaptureUnavailable(String),
    /// A click could not be sounded.
    #[error("click sink unavailable: {0}")]
    SinkUnavailable(String),
    /// The display host refused to enter or leave fullscreen.
    #[error("fullscreen request failed: {0}")]
    Fullscreen(String),
}

impl PracticeError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for PracticeError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for PracticeError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
