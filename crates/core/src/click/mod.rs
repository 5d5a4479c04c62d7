use serde::{Deserialize, Serialize};

use crate::{PracticeError, Result};

/// Which of the two click sounds a beat uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClickKind {
    /// First beat of a measure when accenting is enabled.
    Accent,
    Plain,
}

/// Destination for metronome clicks.
///
/// `at` is the beat's target time on the scheduler's clock. Sinks that can
/// schedule sound precisely should honour it; simple sinks play immediately.
pub trait ClickSink {
    fn emit(&mut self, kind: ClickKind, at: f64) -> Result<()>;
}

/// One replayable, preloaded click sound.
pub trait ClickVoice {
    fn play(&mut self, at: f64) -> Result<()>;

    /// Silences the voice and frees whatever it holds.
    fn stop(&mut self) {}
}

/// Click sink that cycles round-robin through a pool of voices per kind,
/// so a rapid replay never has to restart an instance that is still
/// sounding.
pub struct PooledClickSink<V: ClickVoice> {
    accent: VoicePool<V>,
    plain: VoicePool<V>,
}

impl<V: ClickVoice> PooledClickSink<V> {
    pub fn new(accent: Vec<V>, plain: Vec<V>) -> Self {
        Self {
            accent: VoicePool::new(accent),
            plain: VoicePool::new(plain),
        }
    }

    /// Builds `size` voices of each kind with `factory`.
    pub fn with_pool(size: usize, mut factory: impl FnMut(ClickKind) -> V) -> Self {
        let accent = (0..size).map(|_| factory(ClickKind::Accent)).collect();
        let plain = (0..size).map(|_| factory(ClickKind::Plain)).collect();
        Self::new(accent, plain)
    }

    pub fn pool_size(&self, kind: ClickKind) -> usize {
        self.pool(kind).voices.len()
    }

    fn pool(&self, kind: ClickKind) -> &VoicePool<V> {
        match kind {
            ClickKind::Accent => &self.accent,
            ClickKind::Plain => &self.plain,
        }
    }

    fn pool_mut(&mut self, kind: ClickKind) -> &mut VoicePool<V> {
        match kind {
            ClickKind::Accent => &mut self.accent,
            ClickKind::Plain => &mut self.plain,
        }
    }
}

impl<V: ClickVoice> ClickSink for PooledClickSink<V> {
    fn emit(&mut self, kind: ClickKind, at: f64) -> Result<()> {
        self.pool_mut(kind).play_next(at).map_err(|err| match err {
            PracticeError::SinkUnavailable(_) => err,
            other => PracticeError::SinkUnavailable(format!("{kind:?} click: {other}")),
        })
    }
}

impl<V: ClickVoice> Drop for PooledClickSink<V> {
    fn drop(&mut self) {
        self.accent.stop_all();
        self.plain.stop_all();
    }
}

impl<V: ClickVoice> std::fmt::Debug for PooledClickSink<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledClickSink")
            .field("accent", &self.accent.voices.len())
            .field("plain", &self.plain.voices.len())
            .finish()
    }
}

struct VoicePool<V> {
    voices: Vec<V>,
    cursor: usize,
}

impl<V: ClickVoice> VoicePool<V> {
    fn new(voices: Vec<V>) -> Self {
        Self { voices, cursor: 0 }
    }

    fn play_next(&mut self, at: f64) -> Result<()> {
        if self.voices.is_empty() {
            return Err(PracticeError::SinkUnavailable(
                "no voices loaded".to_string(),
            ));
        }

        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.voices.len();
        self.voices[index].play(at)
    }

    fn stop_all(&mut self) {
        for voice in &mut self.voices {
            voice.stop();
        }
    }
}
