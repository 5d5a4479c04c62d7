//! Quality tiers and the bandwidth-threshold policy that picks between them.
//!
//! The policy only proposes a tier index; the player decides when to ask
//! and performs the source swap through the synchroniser.

use serde::{Deserialize, Serialize};

use crate::QualityConfig;

/// One encoding of an angle's video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityTier {
    pub label: String,
    pub source: String,
    pub bitrate_kbps: u32,
}

/// Snapshot of the host's network information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSample {
    #[serde(default = "default_online")]
    pub online: bool,
    pub downlink_mbps: f64,
    #[serde(default)]
    pub rtt_ms: u32,
    #[serde(default)]
    pub effective_type: Option<String>,
}

fn default_online() -> bool {
    true
}

/// Decides which tier to use for the measured network conditions.
pub trait QualityPolicy {
    /// Returns a new tier index, or `None` to keep `current`.
    fn choose(
        &mut self,
        tiers: &[QualityTier],
        current: usize,
        sample: &NetworkSample,
        now: f64,
    ) -> Option<usize>;
}

/// Picks the first tier (tiers are ordered best first) whose bitrate, with a
/// safety margin, fits the measured downlink; otherwise the last tier.
/// Switches are throttled to avoid flicker.
#[derive(Debug, Clone)]
pub struct ThresholdPolicy {
    margin: f64,
    min_interval_secs: f64,
    last_switch: Option<f64>,
}

impl ThresholdPolicy {
    pub fn new(config: &QualityConfig) -> Self {
        Self {
            margin: config.bitrate_margin.max(1.0),
            min_interval_secs: config.switch_interval_secs.max(0.0),
            last_switch: None,
        }
    }
}

impl QualityPolicy for ThresholdPolicy {
    fn choose(
        &mut self,
        tiers: &[QualityTier],
        current: usize,
        sample: &NetworkSample,
        now: f64,
    ) -> Option<usize> {
        if tiers.is_empty() || !sample.online {
            return None;
        }
        if let Some(last) = self.last_switch {
            if now - last < self.min_interval_secs {
                return None;
            }
        }

        let available_kbps = sample.downlink_mbps * 1000.0;
        let best = tiers
            .iter()
            .position(|tier| available_kbps > f64::from(tier.bitrate_kbps) * self.margin)
            .unwrap_or(tiers.len() - 1);

        if best == current {
            return None;
        }

        tracing::debug!(
            from = current,
            to = best,
            downlink_mbps = sample.downlink_mbps,
            "quality policy switching tier"
        );
        self.last_switch = Some(now);
        Some(best)
    }
}
