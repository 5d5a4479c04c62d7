//! Practice player: the synchroniser plus sources, quality selection,
//! sections, mirror and fullscreen state, and a notice queue for the UI.

mod display;

use serde::{Deserialize, Serialize};

pub use display::{DisplayHost, HeadlessDisplay};

use crate::{
    Angle, AppConfig, Command, LoopRegion, MediaSurface, NetworkSample, Notice, Notices,
    PlaybackState, PlayerPhase, PracticeError, QualityPolicy, QualityTier, Result, SectionIndex,
    SurfaceEvent, Synchronizer, ThresholdPolicy, VideoSection,
};

/// Quality tiers for both angles, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoSources {
    pub front: Vec<QualityTier>,
    pub back: Vec<QualityTier>,
}

impl VideoSources {
    pub fn tiers(&self, angle: Angle) -> &[QualityTier] {
        match angle {
            Angle::Front => &self.front,
            Angle::Back => &self.back,
        }
    }

    /// Tier `index` of `angle`, or that angle's lowest tier if it has fewer.
    pub fn tier(&self, angle: Angle, index: usize) -> Option<&QualityTier> {
        let tiers = self.tiers(angle);
        tiers.get(index).or_else(|| tiers.last())
    }
}

/// Serializable view of the player for status output.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerSnapshot {
    pub state: PlaybackState,
    pub phase: PlayerPhase,
    pub duration: Option<f64>,
    pub loop_enabled: bool,
    pub loop_region: Option<LoopRegion>,
    pub quality: Option<String>,
    pub auto_quality: bool,
    pub mirrored: bool,
    pub fullscreen: bool,
    pub section: Option<String>,
}

pub struct Player<S: MediaSurface, D: DisplayHost> {
    sync: Synchronizer<S>,
    sources: VideoSources,
    sections: SectionIndex,
    active_section: Option<String>,
    quality_index: usize,
    auto_quality: bool,
    policy: Box<dyn QualityPolicy>,
    display: D,
    mirrored: bool,
    notices: Notices,
}

impl<S: MediaSurface, D: DisplayHost> Player<S, D> {
    pub fn new(
        front: S,
        back: S,
        display: D,
        sources: VideoSources,
        sections: Vec<VideoSection>,
        config: &AppConfig,
    ) -> Self {
        Self {
            sync: Synchronizer::new(front, back, config.player.clone()),
            sources,
            sections: SectionIndex::new(sections),
            active_section: None,
            quality_index: 0,
            auto_quality: config.quality.auto,
            policy: Box::new(ThresholdPolicy::new(&config.quality)),
            display,
            mirrored: false,
            notices: Notices::default(),
        }
    }

    /// Replaces the adaptive quality policy.
    pub fn with_policy(mut self, policy: impl QualityPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn sync(&self) -> &Synchronizer<S> {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut Synchronizer<S> {
        &mut self.sync
    }

    pub fn state(&self) -> &PlaybackState {
        self.sync.state()
    }

    pub fn phase(&self) -> PlayerPhase {
        self.sync.phase()
    }

    pub fn sections(&self) -> &SectionIndex {
        &self.sections
    }

    pub fn mirrored(&self) -> bool {
        self.mirrored
    }

    pub fn auto_quality(&self) -> bool {
        self.auto_quality
    }

    pub fn quality_index(&self) -> usize {
        self.quality_index
    }

    pub fn quality_label(&self) -> Option<&str> {
        self.sources
            .tier(self.sync.active_angle(), self.quality_index)
            .map(|tier| tier.label.as_str())
    }

    /// Loads the current quality tier of both angles.
    pub fn open(&mut self) -> Result<()> {
        let (front, back) = self.sources_for(self.quality_index)?;
        self.sync.open(&front, &back);
        Ok(())
    }

    pub fn handle_event(&mut self, angle: Angle, event: SurfaceEvent) {
        self.sync.handle_event(angle, event);
    }

    pub fn play(&mut self) {
        self.sync.play();
    }

    pub fn pause(&mut self) {
        self.sync.pause();
    }

    pub fn toggle_play(&mut self) {
        self.sync.toggle_play();
    }

    pub fn seek(&mut self, seconds: f64) -> f64 {
        self.sync.seek(seconds)
    }

    pub fn seek_relative(&mut self, delta: f64) -> f64 {
        self.sync.seek_relative(delta)
    }

    pub fn set_volume(&mut self, volume: f64) -> f64 {
        self.sync.set_volume(volume)
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.sync.toggle_mute()
    }

    pub fn set_rate(&mut self, rate: f64) -> f64 {
        let applied = self.sync.set_rate(rate);
        self.notices.push(Notice::PlaybackRate(applied));
        applied
    }

    pub fn switch_angle(&mut self, angle: Angle) {
        self.sync.switch_angle(angle);
    }

    /// Manually picks a quality tier, which turns auto quality off.
    pub fn select_quality(&mut self, index: usize) -> Result<()> {
        let tiers = self.sources.tiers(self.sync.active_angle());
        let index = index.min(tiers.len().saturating_sub(1));
        self.auto_quality = false;
        self.apply_quality(index)?;
        if let Some(label) = self.quality_label().map(str::to_string) {
            self.notices.push(Notice::QualityChanged(label));
        }
        Ok(())
    }

    pub fn toggle_auto_quality(&mut self) -> bool {
        self.auto_quality = !self.auto_quality;
        self.notices.push(Notice::AutoQuality(self.auto_quality));
        self.auto_quality
    }

    /// Feeds a network measurement to the quality policy while auto quality
    /// is on and playback is running. Returns the new tier, if any.
    pub fn observe_network(&mut self, sample: &NetworkSample, now: f64) -> Result<Option<usize>> {
        if !self.auto_quality || !self.sync.state().is_playing {
            return Ok(None);
        }

        let tiers = self.sources.tiers(self.sync.active_angle());
        let Some(index) = self.policy.choose(tiers, self.quality_index, sample, now) else {
            return Ok(None);
        };

        self.apply_quality(index)?;
        let label = self.quality_label().unwrap_or("unknown").to_string();
        tracing::info!(
            quality = %label,
            downlink_mbps = sample.downlink_mbps,
            "auto-switched quality"
        );
        self.notices.push(Notice::QualityChanged(label));
        Ok(Some(index))
    }

    pub fn set_loop_region(&mut self, start: f64, end: f64) -> Option<LoopRegion> {
        self.sync.set_loop_region(start, end)
    }

    pub fn set_loop_start(&mut self, seconds: f64) -> Option<LoopRegion> {
        self.sync.set_loop_start(seconds)
    }

    pub fn set_loop_end(&mut self, seconds: f64) -> Option<LoopRegion> {
        self.sync.set_loop_end(seconds)
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.sync.toggle_loop()
    }

    pub fn set_loop_from_current(&mut self) -> Option<LoopRegion> {
        self.sync.set_loop_from_current()
    }

    pub fn clear_loop(&mut self) {
        self.sync.clear_loop();
    }

    /// Seeks to the start of a section and marks it active.
    pub fn jump_to_section(&mut self, id: &str) -> Option<f64> {
        let start = self.sections.get(id)?.start_secs;
        self.active_section = Some(id.to_string());
        Some(self.sync.seek(start))
    }

    /// The section picked by the user while the playhead is still inside it,
    /// or else the one under the playhead.
    pub fn current_section(&self) -> Option<&VideoSection> {
        let position = self.sync.position();
        self.active_section
            .as_deref()
            .and_then(|id| self.sections.get(id))
            .filter(|section| (section.start_secs..section.end_secs).contains(&position))
            .or_else(|| self.sections.current_at(position))
    }

    pub fn toggle_mirror(&mut self) -> bool {
        self.mirrored = !self.mirrored;
        self.notices.push(Notice::Mirror(self.mirrored));
        self.mirrored
    }

    pub fn is_fullscreen(&self) -> bool {
        self.display.is_fullscreen()
    }

    pub fn toggle_fullscreen(&mut self) -> bool {
        let outcome = if self.display.is_fullscreen() {
            self.display.exit_fullscreen()
        } else {
            self.display.request_fullscreen()
        };
        if let Err(err) = outcome {
            tracing::warn!(error = %err, "fullscreen toggle failed");
            self.notices.push(Notice::FullscreenFailed(err.to_string()));
        }
        self.display.is_fullscreen()
    }

    /// Runs a player command. Returns `false` for commands that belong to
    /// other components (camera, metronome).
    pub fn apply(&mut self, command: &Command) -> Result<bool> {
        match command {
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::TogglePlay => self.toggle_play(),
            Command::Seek { seconds } => {
                self.seek(*seconds);
            }
            Command::SeekRelative { seconds } => {
                self.seek_relative(*seconds);
            }
            Command::SetVolume { volume } => {
                self.set_volume(*volume);
            }
            Command::ToggleMute => {
                self.toggle_mute();
            }
            Command::SetRate { rate } => {
                self.set_rate(*rate);
            }
            Command::SwitchAngle { angle } => self.switch_angle(*angle),
            Command::SelectQuality { index } => self.select_quality(*index)?,
            Command::ToggleAutoQuality => {
                self.toggle_auto_quality();
            }
            Command::SetLoop { start, end } => {
                self.set_loop_region(*start, *end);
            }
            Command::SetLoopStart { seconds } => {
                self.set_loop_start(*seconds);
            }
            Command::SetLoopEnd { seconds } => {
                self.set_loop_end(*seconds);
            }
            Command::ToggleLoop => {
                self.toggle_loop();
            }
            Command::LoopFromHere => {
                self.set_loop_from_current();
            }
            Command::ClearLoop => self.clear_loop(),
            Command::JumpToSection { id } => {
                if self.jump_to_section(id).is_none() {
                    tracing::warn!(id = %id, "unknown section");
                }
            }
            Command::ToggleMirror => {
                self.toggle_mirror();
            }
            Command::ToggleFullscreen => {
                self.toggle_fullscreen();
            }
            Command::ToggleCamera
            | Command::ToggleMetronome
            | Command::SetTempo { .. }
            | Command::SetBeatsPerMeasure { .. }
            | Command::SetAccent { .. } => return Ok(false),
        }
        Ok(true)
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        let mut notices = self.sync.drain_notices();
        notices.extend(self.notices.drain());
        notices
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            state: self.sync.state().clone(),
            phase: self.sync.phase(),
            duration: self.sync.duration(),
            loop_enabled: self.sync.loop_enabled(),
            loop_region: self.sync.loop_region(),
            quality: self.quality_label().map(str::to_string),
            auto_quality: self.auto_quality,
            mirrored: self.mirrored,
            fullscreen: self.display.is_fullscreen(),
            section: self.current_section().map(|section| section.id.clone()),
        }
    }

    /// Stops playback and leaves fullscreen.
    pub fn teardown(&mut self) {
        self.sync.teardown();
        if self.display.is_fullscreen() {
            if let Err(err) = self.display.exit_fullscreen() {
                tracing::warn!(error = %err, "could not leave fullscreen on teardown");
            }
        }
    }

    fn apply_quality(&mut self, index: usize) -> Result<()> {
        if index == self.quality_index && self.sync.phase() != PlayerPhase::Idle {
            return Ok(());
        }
        let (front, back) = self.sources_for(index)?;
        self.quality_index = index;
        self.sync.reload(&front, &back);
        Ok(())
    }

    fn sources_for(&self, index: usize) -> Result<(String, String)> {
        let source = |angle: Angle| {
            self.sources
                .tier(angle, index)
                .map(|tier| tier.source.clone())
                .ok_or_else(|| PracticeError::msg(format!("no video source for the {angle} angle")))
        };
        Ok((source(Angle::Front)?, source(Angle::Back)?))
    }
}

impl<S: MediaSurface, D: DisplayHost> std::fmt::Debug for Player<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("sync", &self.sync)
            .field("quality_index", &self.quality_index)
            .field("auto_quality", &self.auto_quality)
            .field("mirrored", &self.mirrored)
            .finish()
    }
}
