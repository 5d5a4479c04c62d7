use std::io::Write;

use dance_practice_core::{ClickKind, ClickVoice, Result};

/// Click voice that prints to the terminal. Output is line based, so a
/// pool of these never has a voice "still sounding"; the pool just keeps
/// the same shape as an audio-backed sink.
#[derive(Debug)]
pub struct TerminalVoice {
    kind: ClickKind,
}

impl TerminalVoice {
    pub fn new(kind: ClickKind) -> Self {
        Self { kind }
    }
}

impl ClickVoice for TerminalVoice {
    fn play(&mut self, at: f64) -> Result<()> {
        let label = match self.kind {
            ClickKind::Accent => "TOCK",
            ClickKind::Plain => "tick",
        };
        let mut out = std::io::stdout().lock();
        writeln!(out, "{label}  @ {at:>8.3}s")?;
        out.flush()?;
        Ok(())
    }
}
