use crate::{MediaSurface, PracticeError, Result, SurfaceEvent};

/// In-memory media surface used by scripted rehearsals and tests.
///
/// Loading a source leaves the duration unknown until [`finish_loading`]
/// is called, mirroring a real element waiting for its metadata.
///
/// [`finish_loading`]: SimulatedSurface::finish_loading
#[derive(Debug, Clone)]
pub struct SimulatedSurface {
    media_duration: f64,
    source: Option<String>,
    metadata_ready: bool,
    time: f64,
    paused: bool,
    volume: f64,
    muted: bool,
    rate: f64,
    block_play: bool,
    play_calls: usize,
}

impl SimulatedSurface {
    pub fn new(media_duration: f64) -> Self {
        Self {
            media_duration: media_duration.max(0.0),
            source: None,
            metadata_ready: false,
            time: 0.0,
            paused: true,
            volume: 1.0,
            muted: false,
            rate: 1.0,
            block_play: false,
            play_calls: 0,
        }
    }

    /// Makes subsequent `play` calls fail as if no user gesture happened yet.
    pub fn block_play(&mut self, blocked: bool) {
        self.block_play = blocked;
    }

    pub fn is_loading(&self) -> bool {
        self.source.is_some() && !self.metadata_ready
    }

    /// Completes a pending load and returns the event the host would raise.
    pub fn finish_loading(&mut self) -> Option<SurfaceEvent> {
        if !self.is_loading() {
            return None;
        }
        self.metadata_ready = true;
        Some(SurfaceEvent::MetadataReady)
    }

    /// Advances the media clock by `delta` wall seconds while playing and
    /// returns the events a real element would raise, in order. Reaching the
    /// end of media stops the surface and adds [`SurfaceEvent::Paused`].
    pub fn advance(&mut self, delta: f64) -> Vec<SurfaceEvent> {
        if self.paused || !self.metadata_ready {
            return Vec::new();
        }

        self.time = (self.time + delta * self.rate).min(self.media_duration);
        let mut events = vec![SurfaceEvent::TimeAdvanced(self.time)];
        if self.time >= self.media_duration {
            self.paused = true;
            events.push(SurfaceEvent::Paused);
        }
        events
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls
    }
}

impl MediaSurface for SimulatedSurface {
    fn load(&mut self, source: &str) {
        self.source = Some(source.to_string());
        self.metadata_ready = false;
        self.time = 0.0;
        self.paused = true;
    }

    fn play(&mut self) -> Result<()> {
        self.play_calls += 1;
        if self.block_play {
            return Err(PracticeError::PlaybackRejected(
                "play() requires a user gesture".to_string(),
            ));
        }
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn current_time(&self) -> f64 {
        self.time
    }

    fn set_current_time(&mut self, seconds: f64) {
        let upper = if self.metadata_ready {
            self.media_duration
        } else {
            f64::INFINITY
        };
        self.time = seconds.max(0.0).min(upper);
    }

    fn duration(&self) -> Option<f64> {
        self.metadata_ready.then_some(self.media_duration)
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.rate = rate;
    }
}
