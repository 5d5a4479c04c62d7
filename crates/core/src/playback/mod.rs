//! Playback synchronisation across the two camera angles.
//!
//! Each angle has its own media surface. Volume, mute and rate are pushed to
//! both surfaces on every change so the hidden one is always pre-synced. On
//! an angle switch the position and play intent are carried over; when the
//! target has not loaded its metadata yet the seek is parked as a pending
//! continuation and completed on the target's ready signal. A quality switch
//! swaps the sources on both surfaces and uses the same continuation.

mod loop_region;
mod simulated;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use loop_region::LoopRegion;
pub use simulated::SimulatedSurface;

use crate::{Notice, Notices, PlayerConfig, Result};

pub const MIN_RATE: f64 = 0.25;
pub const MAX_RATE: f64 = 2.0;

/// Camera viewpoint of the instructional video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Angle {
    #[default]
    Front,
    Back,
}

impl Angle {
    pub fn other(self) -> Self {
        match self {
            Angle::Front => Angle::Back,
            Angle::Back => Angle::Front,
        }
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Angle::Front => write!(f, "front"),
            Angle::Back => write!(f, "back"),
        }
    }
}

/// An addressable, playable media element.
pub trait MediaSurface {
    /// Replaces the source. The duration is unknown until the surface raises
    /// [`SurfaceEvent::MetadataReady`].
    fn load(&mut self, source: &str);
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    fn duration(&self) -> Option<f64>;
    fn set_volume(&mut self, volume: f64);
    fn set_muted(&mut self, muted: bool);
    fn set_playback_rate(&mut self, rate: f64);
}

/// Notifications raised by a media surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SurfaceEvent {
    MetadataReady,
    CanPlay,
    TimeAdvanced(f64),
    Playing,
    Paused,
    Stalled,
}

/// Logical playback state replicated onto whichever surface is active.
///
/// `is_playing` is the intended state: it stays `true` when a resume was
/// rejected by the host, and the next play action reconciles it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub position: f64,
    pub is_playing: bool,
    pub volume: f64,
    pub muted: bool,
    pub rate: f64,
    pub active_angle: Angle,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            position: 0.0,
            is_playing: false,
            volume: 1.0,
            muted: false,
            rate: 1.0,
            active_angle: Angle::Front,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerPhase {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
}

/// Seek and resume waiting for the active surface's ready signal.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingSync {
    angle: Angle,
    position: f64,
    resume: bool,
}

/// Single owner of the two angle surfaces and of the loop region.
pub struct Synchronizer<S: MediaSurface> {
    front: S,
    back: S,
    state: PlaybackState,
    phase: PlayerPhase,
    pending: Option<PendingSync>,
    loop_region: Option<LoopRegion>,
    loop_enabled: bool,
    config: PlayerConfig,
    notices: Notices,
}

impl<S: MediaSurface> Synchronizer<S> {
    pub fn new(front: S, back: S, config: PlayerConfig) -> Self {
        Self {
            front,
            back,
            state: PlaybackState::default(),
            phase: PlayerPhase::Idle,
            pending: None,
            loop_region: None,
            loop_enabled: false,
            config: config.sanitized(),
            notices: Notices::default(),
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn phase(&self) -> PlayerPhase {
        self.phase
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn active_angle(&self) -> Angle {
        self.state.active_angle
    }

    pub fn surface(&self, angle: Angle) -> &S {
        match angle {
            Angle::Front => &self.front,
            Angle::Back => &self.back,
        }
    }

    pub fn surface_mut(&mut self, angle: Angle) -> &mut S {
        match angle {
            Angle::Front => &mut self.front,
            Angle::Back => &mut self.back,
        }
    }

    fn active(&self) -> &S {
        self.surface(self.state.active_angle)
    }

    fn active_mut(&mut self) -> &mut S {
        self.surface_mut(self.state.active_angle)
    }

    /// Duration of the active surface, once its metadata is known.
    pub fn duration(&self) -> Option<f64> {
        self.active().duration()
    }

    /// Current position, including a position still waiting to be applied.
    pub fn position(&self) -> f64 {
        match (&self.pending, self.phase) {
            (Some(pending), PlayerPhase::Loading) => pending.position,
            (_, PlayerPhase::Idle) => self.state.position,
            _ => self.active().current_time(),
        }
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    /// Loads the sources of both angles and waits for the active one.
    pub fn open(&mut self, front: &str, back: &str) {
        self.front.load(front);
        self.back.load(back);
        self.apply_outputs(Angle::Front);
        self.apply_outputs(Angle::Back);
        let (position, resume) = (self.state.position, self.state.is_playing);
        self.begin_loading(position, resume);
    }

    /// Swaps both sources (quality switch), keeping position and play intent.
    pub fn reload(&mut self, front: &str, back: &str) {
        if self.phase == PlayerPhase::Idle {
            self.open(front, back);
            return;
        }

        let (position, resume) = self.capture();
        self.front.pause();
        self.back.pause();
        self.front.load(front);
        self.back.load(back);
        self.apply_outputs(Angle::Front);
        self.apply_outputs(Angle::Back);
        self.begin_loading(position, resume);
    }

    /// Routes a native surface notification.
    pub fn handle_event(&mut self, angle: Angle, event: SurfaceEvent) {
        if angle != self.state.active_angle {
            tracing::trace!(%angle, ?event, "ignoring event from inactive surface");
            return;
        }

        match event {
            SurfaceEvent::MetadataReady | SurfaceEvent::CanPlay => {
                if self.phase == PlayerPhase::Loading {
                    self.complete_pending();
                }
            }
            SurfaceEvent::TimeAdvanced(position) => {
                if !matches!(self.phase, PlayerPhase::Idle | PlayerPhase::Loading) {
                    self.on_position_update(position);
                }
            }
            SurfaceEvent::Playing => {
                if matches!(self.phase, PlayerPhase::Ready | PlayerPhase::Paused) {
                    self.state.is_playing = true;
                    self.set_phase(PlayerPhase::Playing);
                }
            }
            SurfaceEvent::Paused => {
                // Ignored when a loop wrap already restarted the surface.
                if self.phase == PlayerPhase::Playing && self.active().is_paused() {
                    self.state.is_playing = false;
                    self.set_phase(PlayerPhase::Paused);
                }
            }
            SurfaceEvent::Stalled => {
                tracing::debug!(%angle, position = self.state.position, "surface stalled");
            }
        }
    }

    /// Applies a playback position tick and enforces the loop region.
    /// Returns `true` when playback was sent back to the loop start.
    pub fn on_position_update(&mut self, position: f64) -> bool {
        self.state.position = position;
        if self.phase != PlayerPhase::Playing || !self.loop_enabled {
            return false;
        }
        let Some(region) = self.loop_region else {
            return false;
        };

        let past_end = position >= region.end() - self.config.loop_end_slack_secs;
        let before_start = position < region.start() - self.config.loop_start_slack_secs;
        if !(past_end || before_start) {
            return false;
        }

        tracing::debug!(position, start = region.start(), "wrapping to loop start");
        self.active_mut().set_current_time(region.start());
        self.state.position = region.start();
        if self.active().is_paused() {
            // The surface stopped at the end of media before the wrap.
            self.resume_active();
        }
        true
    }

    pub fn play(&mut self) {
        self.state.is_playing = true;
        match self.phase {
            PlayerPhase::Idle => tracing::debug!("play requested before any source was opened"),
            PlayerPhase::Loading => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.resume = true;
                }
            }
            PlayerPhase::Ready | PlayerPhase::Paused | PlayerPhase::Playing => self.resume_active(),
        }
    }

    pub fn pause(&mut self) {
        self.state.is_playing = false;
        match self.phase {
            PlayerPhase::Idle => {}
            PlayerPhase::Loading => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.resume = false;
                }
            }
            PlayerPhase::Ready | PlayerPhase::Paused | PlayerPhase::Playing => {
                self.active_mut().pause();
                self.set_phase(PlayerPhase::Paused);
            }
        }
    }

    pub fn toggle_play(&mut self) {
        if self.state.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Seeks to `seconds`, clamped to `[0, duration]`. Returns the applied
    /// position.
    pub fn seek(&mut self, seconds: f64) -> f64 {
        if seconds.is_nan() {
            return self.position();
        }

        let target = seconds.max(0.0).min(self.duration().unwrap_or(f64::INFINITY));
        match self.pending.as_mut() {
            Some(pending) if self.phase == PlayerPhase::Loading => pending.position = target,
            _ => self.active_mut().set_current_time(target),
        }
        self.state.position = target;
        target
    }

    pub fn seek_relative(&mut self, delta: f64) -> f64 {
        let base = self.position();
        self.seek(base + delta)
    }

    pub fn set_volume(&mut self, volume: f64) -> f64 {
        if !volume.is_nan() {
            self.state.volume = volume.clamp(0.0, 1.0);
            self.front.set_volume(self.state.volume);
            self.back.set_volume(self.state.volume);
        }
        self.state.volume
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.state.muted = muted;
        self.front.set_muted(muted);
        self.back.set_muted(muted);
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.set_muted(!self.state.muted);
        self.state.muted
    }

    pub fn set_rate(&mut self, rate: f64) -> f64 {
        if !rate.is_nan() {
            self.state.rate = rate.clamp(MIN_RATE, MAX_RATE);
            self.front.set_playback_rate(self.state.rate);
            self.back.set_playback_rate(self.state.rate);
        }
        self.state.rate
    }

    /// Moves playback to the other camera angle, carrying position and play
    /// intent. Any continuation still waiting on the previous target is
    /// dropped.
    pub fn switch_angle(&mut self, target: Angle) {
        if target == self.state.active_angle {
            return;
        }
        if self.phase == PlayerPhase::Idle {
            self.state.active_angle = target;
            return;
        }

        let (position, resume) = self.capture();
        self.active_mut().pause();
        self.state.active_angle = target;
        self.apply_outputs(target);
        tracing::info!(%target, position, resume, "switching angle");
        self.notices.push(Notice::AngleSwitched(target));
        self.begin_loading(position, resume);
    }

    pub fn loop_region(&self) -> Option<LoopRegion> {
        self.loop_region
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    /// Replaces the loop region and enables looping. Reversed bounds are
    /// swapped; a range with nothing left after clamping is ignored and the
    /// previous region stays in place.
    pub fn set_loop_region(&mut self, start: f64, end: f64) -> Option<LoopRegion> {
        match LoopRegion::new(start, end, self.duration()) {
            Some(region) => {
                self.loop_region = Some(region);
                self.loop_enabled = true;
                Some(region)
            }
            None => {
                tracing::warn!(start, end, "ignoring empty loop region");
                None
            }
        }
    }

    /// Drags the loop start handle. Without a region, one is created that
    /// runs to the end of media.
    pub fn set_loop_start(&mut self, seconds: f64) -> Option<LoopRegion> {
        let duration = self.duration();
        let region = match self.loop_region {
            Some(region) => region.with_start(seconds, self.config.min_loop_span_secs),
            None => duration.and_then(|end| LoopRegion::new(seconds, end, duration)),
        };
        if region.is_some() {
            self.loop_region = region;
        }
        self.loop_region
    }

    /// Drags the loop end handle. Without a region, one is created that
    /// starts at zero.
    pub fn set_loop_end(&mut self, seconds: f64) -> Option<LoopRegion> {
        let duration = self.duration();
        let region = match self.loop_region {
            Some(region) => region.with_end(seconds, self.config.min_loop_span_secs, duration),
            None => LoopRegion::new(0.0, seconds, duration),
        };
        if region.is_some() {
            self.loop_region = region;
        }
        self.loop_region
    }

    /// Disables looping, or enables it around the current position.
    pub fn toggle_loop(&mut self) -> bool {
        if self.loop_enabled {
            self.loop_enabled = false;
            return false;
        }

        let position = self.position();
        let half = self.config.quick_loop_half_window_secs;
        self.set_loop_region((position - half).max(0.0), position + half)
            .is_some()
    }

    /// Loops from the current position for the configured length.
    pub fn set_loop_from_current(&mut self) -> Option<LoopRegion> {
        let position = self.position();
        self.set_loop_region(position, position + self.config.loop_from_here_secs)
    }

    pub fn clear_loop(&mut self) {
        self.loop_region = None;
        self.loop_enabled = false;
    }

    /// Pauses both surfaces, drops pending work and returns to `Idle`.
    pub fn teardown(&mut self) {
        self.pending = None;
        self.front.pause();
        self.back.pause();
        self.state.is_playing = false;
        self.set_phase(PlayerPhase::Idle);
    }

    fn capture(&self) -> (f64, bool) {
        match (&self.pending, self.phase) {
            (Some(pending), PlayerPhase::Loading) => (pending.position, pending.resume),
            _ => (self.active().current_time(), self.state.is_playing),
        }
    }

    fn begin_loading(&mut self, position: f64, resume: bool) {
        self.pending = Some(PendingSync {
            angle: self.state.active_angle,
            position,
            resume,
        });
        self.set_phase(PlayerPhase::Loading);

        if self.active().duration().is_some() {
            self.complete_pending();
        }
    }

    fn complete_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            self.set_phase(PlayerPhase::Ready);
            return;
        };
        if pending.angle != self.state.active_angle {
            tracing::debug!(angle = %pending.angle, "dropping continuation for a stale target");
            return;
        }
        let Some(duration) = self.active().duration() else {
            self.pending = Some(pending);
            return;
        };

        self.clamp_loop_to(duration);

        let latest = (duration - self.config.end_epsilon_secs).max(0.0);
        let target = pending.position.max(0.0).min(latest);
        self.active_mut().set_current_time(target);
        self.state.position = target;
        self.set_phase(PlayerPhase::Ready);

        if pending.resume {
            self.resume_active();
        }
    }

    /// Fits the loop region into media whose duration just became known. A
    /// region lying entirely past the end is dropped and looping turns off.
    fn clamp_loop_to(&mut self, duration: f64) {
        let Some(region) = self.loop_region else {
            return;
        };
        match region.clamped_to(Some(duration)) {
            Some(clamped) => {
                if clamped != region {
                    tracing::debug!(?region, ?clamped, duration, "loop region clamped to media");
                }
                self.loop_region = Some(clamped);
            }
            None => {
                tracing::warn!(?region, duration, "dropping loop region past the end of media");
                self.loop_region = None;
                self.loop_enabled = false;
            }
        }
    }

    fn resume_active(&mut self) {
        match self.active_mut().play() {
            Ok(()) => self.set_phase(PlayerPhase::Playing),
            Err(err) => {
                tracing::warn!(error = %err, "resume rejected by media surface");
                self.notices.push(Notice::PlaybackBlocked);
            }
        }
    }

    fn apply_outputs(&mut self, angle: Angle) {
        let (volume, muted, rate) = (self.state.volume, self.state.muted, self.state.rate);
        let surface = self.surface_mut(angle);
        surface.set_volume(volume);
        surface.set_muted(muted);
        surface.set_playback_rate(rate);
    }

    fn set_phase(&mut self, phase: PlayerPhase) {
        if self.phase != phase {
            tracing::debug!(from = ?self.phase, to = ?phase, "player phase");
            self.phase = phase;
        }
    }
}

impl<S: MediaSurface> fmt::Debug for Synchronizer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("state", &self.state)
            .field("phase", &self.phase)
            .field("pending", &self.pending)
            .field("loop_region", &self.loop_region)
            .field("loop_enabled", &self.loop_enabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synchronizer(front: f64, back: f64) -> Synchronizer<SimulatedSurface> {
        let mut sync = Synchronizer::new(
            SimulatedSurface::new(front),
            SimulatedSurface::new(back),
            PlayerConfig::default(),
        );
        sync.open("front.mp4", "back.mp4");
        sync
    }

    fn finish(sync: &mut Synchronizer<SimulatedSurface>, angle: Angle) {
        if let Some(event) = sync.surface_mut(angle).finish_loading() {
            sync.handle_event(angle, event);
        }
    }

    /// Advances the active surface in quarter-second steps, routing every
    /// event it raises.
    fn play_for(sync: &mut Synchronizer<SimulatedSurface>, seconds: f64) {
        let steps = (seconds / 0.25).round() as usize;
        for _ in 0..steps {
            let angle = sync.active_angle();
            for event in sync.surface_mut(angle).advance(0.25) {
                sync.handle_event(angle, event);
            }
        }
    }

    fn ready(duration: f64) -> Synchronizer<SimulatedSurface> {
        let mut sync = synchronizer(duration, duration);
        finish(&mut sync, Angle::Front);
        finish(&mut sync, Angle::Back);
        sync
    }

    #[test]
    fn walks_through_the_player_phases() {
        let mut sync = Synchronizer::new(
            SimulatedSurface::new(60.0),
            SimulatedSurface::new(60.0),
            PlayerConfig::default(),
        );
        assert_eq!(sync.phase(), PlayerPhase::Idle);

        sync.open("a", "b");
        assert_eq!(sync.phase(), PlayerPhase::Loading);
        finish(&mut sync, Angle::Front);
        assert_eq!(sync.phase(), PlayerPhase::Ready);

        sync.play();
        assert_eq!(sync.phase(), PlayerPhase::Playing);
        sync.pause();
        assert_eq!(sync.phase(), PlayerPhase::Paused);
        assert!(sync.surface(Angle::Front).is_paused());

        sync.teardown();
        assert_eq!(sync.phase(), PlayerPhase::Idle);
    }

    #[test]
    fn play_while_loading_resumes_once_ready() {
        let mut sync = synchronizer(60.0, 60.0);
        sync.play();
        assert_eq!(sync.phase(), PlayerPhase::Loading);

        finish(&mut sync, Angle::Front);
        assert_eq!(sync.phase(), PlayerPhase::Playing);
        assert!(!sync.surface(Angle::Front).is_paused());
    }

    #[test]
    fn wraps_to_loop_start_at_the_end_of_the_region() {
        let mut sync = ready(120.0);
        sync.set_loop_region(10.0, 20.0).unwrap();
        sync.play();

        assert!(sync.on_position_update(9.0));
        assert!(!sync.on_position_update(11.0));
        assert!(sync.on_position_update(19.95));
        assert!(sync.on_position_update(20.05));
        assert_eq!(sync.surface(Angle::Front).current_time(), 10.0);
        assert_eq!(sync.state().position, 10.0);
    }

    #[test]
    fn small_backward_jitter_near_the_start_does_not_wrap() {
        let mut sync = ready(120.0);
        sync.set_loop_region(10.0, 20.0).unwrap();
        sync.play();

        assert!(!sync.on_position_update(9.7));
    }

    #[test]
    fn loop_is_only_enforced_while_playing() {
        let mut sync = ready(120.0);
        sync.set_loop_region(10.0, 20.0).unwrap();

        assert!(!sync.on_position_update(25.0));
        sync.play();
        sync.pause();
        assert!(!sync.on_position_update(25.0));
    }

    #[test]
    fn setting_a_region_does_not_seek_until_the_next_tick() {
        let mut sync = ready(120.0);
        sync.seek(50.0);
        sync.play();
        sync.set_loop_region(10.0, 20.0).unwrap();
        assert_eq!(sync.surface(Angle::Front).current_time(), 50.0);

        play_for(&mut sync, 0.25);
        assert_eq!(sync.surface(Angle::Front).current_time(), 10.0);
    }

    #[test]
    fn loop_set_while_loading_is_clamped_once_metadata_arrives() {
        let mut sync = synchronizer(60.0, 60.0);
        let open_ended = sync.set_loop_region(50.0, 500.0).unwrap();
        assert_eq!(open_ended.end(), 500.0);

        finish(&mut sync, Angle::Front);
        let region = sync.loop_region().unwrap();
        assert_eq!((region.start(), region.end()), (50.0, 60.0));
        assert!(sync.loop_enabled());

        sync.play();
        play_for(&mut sync, 15.0);

        assert_eq!(sync.phase(), PlayerPhase::Playing);
        assert!(sync.state().is_playing);
        assert!(!sync.surface(Angle::Front).is_paused());
        let position = sync.state().position;
        assert!((50.0..60.0).contains(&position), "position {position}");
    }

    #[test]
    fn loop_wrap_at_the_very_end_of_media_keeps_playing() {
        let mut sync = ready(60.0);
        sync.set_loop_region(50.0, 60.0).unwrap();
        sync.seek(59.8);
        sync.play();

        play_for(&mut sync, 0.25);
        assert_eq!(sync.state().position, 50.0);
        assert_eq!(sync.phase(), PlayerPhase::Playing);
        assert!(!sync.surface(Angle::Front).is_paused());
    }

    #[test]
    fn loop_past_the_end_of_a_shorter_angle_is_dropped() {
        let mut sync = synchronizer(180.0, 100.0);
        finish(&mut sync, Angle::Front);
        sync.set_loop_region(150.0, 170.0).unwrap();

        sync.switch_angle(Angle::Back);
        finish(&mut sync, Angle::Back);
        assert_eq!(sync.loop_region(), None);
        assert!(!sync.loop_enabled());

        let region = sync.set_loop_end(120.0).unwrap();
        assert!(region.start() < region.end());
        assert_eq!((region.start(), region.end()), (0.0, 100.0));
    }

    #[test]
    fn loop_overlapping_the_end_of_a_shorter_angle_is_trimmed() {
        let mut sync = synchronizer(180.0, 100.0);
        finish(&mut sync, Angle::Front);
        finish(&mut sync, Angle::Back);
        sync.set_loop_region(80.0, 150.0).unwrap();

        sync.switch_angle(Angle::Back);
        let region = sync.loop_region().unwrap();
        assert_eq!((region.start(), region.end()), (80.0, 100.0));
        assert!(sync.loop_enabled());
    }

    #[test]
    fn dragging_the_end_handle_never_collapses_the_region() {
        let mut sync = ready(120.0);
        sync.set_loop_region(100.0, 110.0).unwrap();

        let region = sync.set_loop_end(90.0).unwrap();
        assert_eq!((region.start(), region.end()), (100.0, 101.0));

        let region = sync.set_loop_start(130.0).unwrap();
        assert_eq!((region.start(), region.end()), (100.0, 101.0));
    }

    #[test]
    fn zero_loop_span_in_config_is_raised() {
        let config = PlayerConfig {
            min_loop_span_secs: 0.0,
            ..PlayerConfig::default()
        };
        let mut sync = Synchronizer::new(
            SimulatedSurface::new(60.0),
            SimulatedSurface::new(60.0),
            config,
        );
        sync.open("front.mp4", "back.mp4");
        finish(&mut sync, Angle::Front);
        sync.set_loop_region(10.0, 20.0).unwrap();

        let region = sync.set_loop_start(25.0).unwrap();
        assert!(region.start() < region.end());
    }

    #[test]
    fn loop_survives_a_quality_reload() {
        let mut sync = ready(120.0);
        sync.set_loop_region(100.0, 110.0).unwrap();
        sync.play();

        sync.reload("front-lo.mp4", "back-lo.mp4");
        finish(&mut sync, Angle::Front);
        let region = sync.loop_region().unwrap();
        assert_eq!((region.start(), region.end()), (100.0, 110.0));
        assert!(sync.loop_enabled());
        assert_eq!(sync.phase(), PlayerPhase::Playing);
    }

    #[test]
    fn reaching_the_end_of_media_pauses_playback() {
        let mut sync = ready(10.0);
        sync.play();
        play_for(&mut sync, 12.0);

        assert_eq!(sync.phase(), PlayerPhase::Paused);
        assert!(!sync.state().is_playing);
        assert_eq!(sync.state().position, 10.0);
    }

    #[test]
    fn reversed_loop_bounds_are_swapped() {
        let mut sync = ready(120.0);
        let region = sync.set_loop_region(30.0, 5.0).unwrap();
        assert!(region.start() < region.end());
        assert_eq!((region.start(), region.end()), (5.0, 30.0));
    }

    #[test]
    fn empty_loop_region_keeps_the_previous_one() {
        let mut sync = ready(120.0);
        sync.set_loop_region(10.0, 20.0).unwrap();
        assert!(sync.set_loop_region(200.0, 300.0).is_none());
        assert_eq!(sync.loop_region().unwrap().start(), 10.0);
    }

    #[test]
    fn angle_switch_carries_position_and_play_state() {
        let mut sync = ready(180.0);
        sync.seek(42.3);
        sync.play();

        sync.switch_angle(Angle::Back);

        let back = sync.surface(Angle::Back);
        assert!((back.current_time() - 42.3).abs() < 1.0 / 30.0);
        assert!(!back.is_paused());
        assert!(sync.surface(Angle::Front).is_paused());
        assert!(sync.state().is_playing);
        assert_eq!(sync.phase(), PlayerPhase::Playing);
        assert_eq!(sync.drain_notices(), vec![Notice::AngleSwitched(Angle::Back)]);
    }

    #[test]
    fn angle_switch_waits_for_target_metadata() {
        let mut sync = synchronizer(180.0, 180.0);
        finish(&mut sync, Angle::Front);
        sync.seek(42.3);
        sync.play();

        sync.switch_angle(Angle::Back);
        assert_eq!(sync.phase(), PlayerPhase::Loading);
        assert_eq!(sync.surface(Angle::Back).current_time(), 0.0);

        finish(&mut sync, Angle::Back);
        assert_eq!(sync.phase(), PlayerPhase::Playing);
        assert!((sync.surface(Angle::Back).current_time() - 42.3).abs() < 1e-9);
    }

    #[test]
    fn deferred_seek_stays_inside_shorter_media() {
        let mut sync = synchronizer(180.0, 100.0);
        finish(&mut sync, Angle::Front);
        sync.seek(150.0);

        sync.switch_angle(Angle::Back);
        finish(&mut sync, Angle::Back);

        let expected = 100.0 - PlayerConfig::default().end_epsilon_secs;
        assert!((sync.surface(Angle::Back).current_time() - expected).abs() < 1e-9);
        assert_eq!(sync.phase(), PlayerPhase::Ready);
    }

    #[test]
    fn switching_back_cancels_the_pending_continuation() {
        let mut sync = synchronizer(180.0, 180.0);
        finish(&mut sync, Angle::Front);
        sync.seek(30.0);
        sync.play();

        sync.switch_angle(Angle::Back);
        sync.switch_angle(Angle::Front);
        assert_eq!(sync.phase(), PlayerPhase::Playing);
        assert_eq!(sync.surface(Angle::Front).current_time(), 30.0);

        finish(&mut sync, Angle::Back);
        assert_eq!(sync.surface(Angle::Back).current_time(), 0.0);
        assert!(sync.surface(Angle::Back).is_paused());
    }

    #[test]
    fn outputs_are_applied_to_both_surfaces() {
        let mut sync = ready(60.0);
        assert_eq!(sync.set_volume(1.7), 1.0);
        assert_eq!(sync.set_volume(0.4), 0.4);
        assert_eq!(sync.set_rate(8.0), MAX_RATE);
        assert_eq!(sync.set_rate(0.75), 0.75);
        assert!(sync.toggle_mute());

        for angle in [Angle::Front, Angle::Back] {
            let surface = sync.surface(angle);
            assert_eq!(surface.volume(), 0.4);
            assert_eq!(surface.rate(), 0.75);
            assert!(surface.muted());
        }
    }

    #[test]
    fn blocked_resume_keeps_the_intended_play_state() {
        let mut sync = ready(180.0);
        sync.seek(12.0);
        sync.play();
        sync.surface_mut(Angle::Back).block_play(true);

        sync.switch_angle(Angle::Back);
        assert!(sync.state().is_playing);
        assert_eq!(sync.phase(), PlayerPhase::Ready);
        assert!(sync.drain_notices().contains(&Notice::PlaybackBlocked));

        sync.surface_mut(Angle::Back).block_play(false);
        sync.play();
        assert_eq!(sync.phase(), PlayerPhase::Playing);
        assert!(!sync.surface(Angle::Back).is_paused());
    }

    #[test]
    fn reload_restores_position_after_metadata() {
        let mut sync = ready(180.0);
        sync.seek(64.0);
        sync.play();

        sync.reload("front-low.mp4", "back-low.mp4");
        assert_eq!(sync.phase(), PlayerPhase::Loading);
        assert_eq!(sync.surface(Angle::Front).source(), Some("front-low.mp4"));

        finish(&mut sync, Angle::Front);
        assert_eq!(sync.surface(Angle::Front).current_time(), 64.0);
        assert_eq!(sync.phase(), PlayerPhase::Playing);
    }

    #[test]
    fn seeking_while_loading_moves_the_pending_target() {
        let mut sync = synchronizer(180.0, 180.0);
        assert_eq!(sync.seek(33.0), 33.0);
        assert_eq!(sync.position(), 33.0);

        finish(&mut sync, Angle::Front);
        assert_eq!(sync.surface(Angle::Front).current_time(), 33.0);
    }

    #[test]
    fn seeks_are_clamped_to_the_media() {
        let mut sync = ready(60.0);
        assert_eq!(sync.seek(-3.0), 0.0);
        assert_eq!(sync.seek(75.0), 60.0);
        sync.seek(10.0);
        assert_eq!(sync.seek_relative(-5.0), 5.0);
        assert_eq!(sync.seek_relative(-5.0), 0.0);
    }

    #[test]
    fn quick_loop_surrounds_the_current_position() {
        let mut sync = ready(180.0);
        sync.seek(5.0);
        assert!(sync.toggle_loop());
        let region = sync.loop_region().unwrap();
        assert_eq!((region.start(), region.end()), (0.0, 15.0));

        assert!(!sync.toggle_loop());
        assert!(sync.loop_region().is_some());

        sync.seek(50.0);
        assert!(sync.toggle_loop());
        let region = sync.loop_region().unwrap();
        assert_eq!((region.start(), region.end()), (40.0, 60.0));

        sync.clear_loop();
        assert!(sync.loop_region().is_none());
        assert!(!sync.loop_enabled());
    }

    #[test]
    fn loop_from_here_stops_at_the_end_of_media() {
        let mut sync = ready(180.0);
        sync.seek(170.0);
        let region = sync.set_loop_from_current().unwrap();
        assert_eq!((region.start(), region.end()), (170.0, 180.0));
    }

    #[test]
    fn loop_handles_create_and_adjust_regions() {
        let mut sync = ready(120.0);
        let region = sync.set_loop_start(30.0).unwrap();
        assert_eq!((region.start(), region.end()), (30.0, 120.0));
        assert!(!sync.loop_enabled());

        let region = sync.set_loop_end(10.0).unwrap();
        assert_eq!((region.start(), region.end()), (30.0, 31.0));
    }
}
