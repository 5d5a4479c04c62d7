use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub metronome: MetronomeConfig,
    pub player: PlayerConfig,
    pub quality: QualityConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing fields fall back to their
    /// defaults so partial files are accepted.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(raw)?;
        config.player = config.player.sanitized();
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Configuration for the metronome and its lookahead scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetronomeConfig {
    pub bpm: f64,
    pub beats_per_measure: u32,
    pub accent_first_beat: bool,
    /// Period of the scheduling poll.
    pub lookahead_ms: f64,
    /// How far past `now` a poll looks for beats to dispatch.
    pub schedule_horizon_secs: f64,
    /// Delay between `start()` and the first beat.
    pub start_offset_secs: f64,
    /// Beats further behind `now` than this are skipped instead of sounded.
    pub stale_tolerance_secs: f64,
    /// Number of interchangeable voices per click kind.
    pub click_pool_size: usize,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            bpm: 100.0,
            beats_per_measure: 4,
            accent_first_beat: true,
            lookahead_ms: 25.0,
            schedule_horizon_secs: 0.1,
            start_offset_secs: 0.05,
            stale_tolerance_secs: 0.1,
            click_pool_size: 4,
        }
    }
}

/// Smallest loop span accepted from configuration.
pub const MIN_LOOP_SPAN_SECS: f64 = 0.1;

/// Tolerances and step sizes used by the playback synchroniser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Positions this close to the loop end wrap back to the loop start.
    pub loop_end_slack_secs: f64,
    /// Positions further than this below the loop start are pulled back in.
    pub loop_start_slack_secs: f64,
    /// Distance kept from the end of media when restoring a position.
    pub end_epsilon_secs: f64,
    /// Smallest loop span reachable by dragging a loop handle.
    pub min_loop_span_secs: f64,
    pub seek_step_secs: f64,
    pub quick_loop_half_window_secs: f64,
    pub loop_from_here_secs: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            loop_end_slack_secs: 0.1,
            loop_start_slack_secs: 0.5,
            end_epsilon_secs: 0.05,
            min_loop_span_secs: 1.0,
            seek_step_secs: 5.0,
            quick_loop_half_window_secs: 10.0,
            loop_from_here_secs: 15.0,
        }
    }
}

impl PlayerConfig {
    /// Raises a missing or too small loop span to [`MIN_LOOP_SPAN_SECS`], so a
    /// handle drag can never collapse a loop region.
    pub fn sanitized(mut self) -> Self {
        if !(self.min_loop_span_secs >= MIN_LOOP_SPAN_SECS) {
            self.min_loop_span_secs = MIN_LOOP_SPAN_SECS;
        }
        self
    }
}

/// Parameters of the threshold quality policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub auto: bool,
    /// Measured bandwidth must exceed a tier's bitrate by this factor.
    pub bitrate_margin: f64,
    pub switch_interval_secs: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            auto: true,
            bitrate_margin: 1.2,
            switch_interval_secs: 5.0,
        }
    }
}
