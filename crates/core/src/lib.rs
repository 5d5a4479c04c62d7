//! Core library for the Dance Practice player.
//!
//! Two loosely coupled subsystems live here. The [`metronome`] runs a
//! lookahead click scheduler against an injected clock and click sink. The
//! [`playback`] synchroniser keeps one logical playback state consistent
//! across the front and back camera angles and enforces the practice loop.
//! The remaining modules wrap them into a player the UI layer can drive:
//! sections, adaptive quality, the webcam self view and user commands.
//!
//! Everything is single-threaded and event driven. Hosts deliver timer
//! ticks, surface events and user commands; nothing here spawns threads.

pub mod capture;
pub mod click;
pub mod command;
pub mod config;
pub mod error;
pub mod metronome;
pub mod notice;
pub mod playback;
pub mod player;
pub mod quality;
pub mod sections;
pub mod timing;

pub use capture::{CaptureConstraints, CaptureDevice, Facing, SelfView, SimulatedCamera, SimulatedStream};
pub use click::{ClickKind, ClickSink, ClickVoice, PooledClickSink};
pub use command::Command;
pub use config::{AppConfig, MetronomeConfig, PlayerConfig, QualityConfig};
pub use error::{PracticeError, Result};
pub use metronome::{BeatEvent, Metronome, TempoState};
pub use notice::{Notice, Notices};
pub use playback::{
    Angle, LoopRegion, MediaSurface, PlaybackState, PlayerPhase, SimulatedSurface, SurfaceEvent,
    Synchronizer,
};
pub use player::{DisplayHost, HeadlessDisplay, Player, PlayerSnapshot, VideoSources};
pub use quality::{NetworkSample, QualityPolicy, QualityTier, ThresholdPolicy};
pub use sections::{format_time, SectionIndex, VideoSection};
pub use timing::{Clock, ManualClock, MonotonicClock, TimerId, TimerSlot};
