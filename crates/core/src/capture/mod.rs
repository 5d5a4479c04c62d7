use serde::{Deserialize, Serialize};

use crate::{Notice, PracticeError, Result};

pub const CAMERA_ERROR_MESSAGE: &str = "Could not access camera. Please check permissions.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    User,
    Environment,
}

/// Requested camera format for the self-view preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    pub width: u32,
    pub height: u32,
    pub facing: Facing,
    pub audio: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            facing: Facing::User,
            audio: false,
        }
    }
}

/// Source of a live camera stream.
pub trait CaptureDevice {
    /// Handle attachable to a preview surface.
    type Stream;

    fn open(&mut self, constraints: &CaptureConstraints) -> Result<Self::Stream>;
    fn release(&mut self, stream: Self::Stream);
}

/// Mirrored webcam preview shown next to the instructional video.
pub struct SelfView<D: CaptureDevice> {
    device: D,
    constraints: CaptureConstraints,
    stream: Option<D::Stream>,
    last_error: Option<String>,
}

impl<D: CaptureDevice> SelfView<D> {
    pub fn new(device: D) -> Self {
        Self::with_constraints(device, CaptureConstraints::default())
    }

    pub fn with_constraints(device: D, constraints: CaptureConstraints) -> Self {
        Self {
            device,
            constraints,
            stream: None,
            last_error: None,
        }
    }

    pub fn is_on(&self) -> bool {
        self.stream.is_some()
    }

    pub fn stream(&self) -> Option<&D::Stream> {
        self.stream.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Opens the camera. A failure is reported as a notice and leaves the
    /// preview off.
    pub fn start(&mut self) -> Notice {
        if self.stream.is_some() {
            return Notice::CameraOn;
        }

        self.last_error = None;
        match self.device.open(&self.constraints) {
            Ok(stream) => {
                self.stream = Some(stream);
                tracing::info!("camera preview started");
                Notice::CameraOn
            }
            Err(err) => {
                tracing::warn!(error = %err, "camera unavailable");
                self.last_error = Some(CAMERA_ERROR_MESSAGE.to_string());
                Notice::CameraError(CAMERA_ERROR_MESSAGE.to_string())
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            self.device.release(stream);
            tracing::info!("camera preview stopped");
        }
    }

    /// Turns the preview on or off. Only turning it on produces a notice.
    pub fn toggle(&mut self) -> Option<Notice> {
        if self.is_on() {
            self.stop();
            None
        } else {
            Some(self.start())
        }
    }
}

impl<D: CaptureDevice> std::fmt::Debug for SelfView<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfView")
            .field("constraints", &self.constraints)
            .field("on", &self.stream.is_some())
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl<D: CaptureDevice> Drop for SelfView<D> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Camera stand-in for scripted rehearsals: grants or denies access and
/// counts live streams.
#[derive(Debug, Default)]
pub struct SimulatedCamera {
    available: bool,
    live_streams: usize,
}

/// Stream handed out by [`SimulatedCamera`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedStream {
    pub width: u32,
    pub height: u32,
}

impl SimulatedCamera {
    pub fn new(available: bool) -> Self {
        Self {
            available,
            live_streams: 0,
        }
    }

    pub fn live_streams(&self) -> usize {
        self.live_streams
    }
}

impl CaptureDevice for SimulatedCamera {
    type Stream = SimulatedStream;

    fn open(&mut self, constraints: &CaptureConstraints) -> Result<SimulatedStream> {
        if !self.available {
            return Err(PracticeError::CaptureUnavailable(
                "permission denied".to_string(),
            ));
        }
        self.live_streams += 1;
        Ok(SimulatedStream {
            width: constraints.width,
            height: constraints.height,
        })
    }

    fn release(&mut self, _stream: SimulatedStream) {
        self.live_streams = self.live_streams.saturating_sub(1);
    }
}
