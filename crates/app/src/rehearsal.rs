//! Scripted practice sessions against simulated surfaces.
//!
//! A script lists timed commands (and optional network samples); the runner
//! steps a virtual clock, delivers them, completes surface loads after a
//! fixed delay, advances the active surface and polls the metronome, then
//! reports the final state.

use std::{cell::Cell, collections::HashMap, rc::Rc};

use dance_practice_core::{
    Angle, AppConfig, ClickKind, ClickSink, Command, HeadlessDisplay, ManualClock, Metronome,
    NetworkSample, Player, PlayerSnapshot, Result, SelfView, SimulatedCamera, SimulatedSurface,
    TempoState, VideoSection, VideoSources,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct RehearsalScript {
    #[serde(default = "default_duration")]
    pub media_duration_secs: f64,
    /// Length of the back-angle media when it differs from the front.
    #[serde(default)]
    pub back_duration_secs: Option<f64>,
    pub sources: VideoSources,
    #[serde(default)]
    pub sections: Vec<VideoSection>,
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
    #[serde(default)]
    pub network: Vec<NetworkStep>,
    pub run_secs: f64,
    #[serde(default = "default_tick")]
    pub tick_secs: f64,
    #[serde(default = "default_load_delay")]
    pub load_delay_secs: f64,
    #[serde(default)]
    pub block_autoplay: bool,
    #[serde(default = "default_camera")]
    pub camera_available: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptStep {
    pub at: f64,
    #[serde(flatten)]
    pub command: Command,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkStep {
    pub at: f64,
    #[serde(flatten)]
    pub sample: NetworkSample,
}

fn default_duration() -> f64 {
    180.0
}

fn default_tick() -> f64 {
    0.25
}

fn default_load_delay() -> f64 {
    0.5
}

fn default_camera() -> bool {
    true
}

impl RehearsalScript {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Serialize)]
pub struct RehearsalReport {
    pub player: PlayerSnapshot,
    pub camera_on: bool,
    pub metronome: TempoState,
    pub clicks: usize,
    pub notices: Vec<String>,
}

struct CountingSink(Rc<Cell<usize>>);

impl ClickSink for CountingSink {
    fn emit(&mut self, _kind: ClickKind, _at: f64) -> Result<()> {
        self.0.set(self.0.get() + 1);
        Ok(())
    }
}

type SimPlayer = Player<SimulatedSurface, HeadlessDisplay>;

struct Rehearsal {
    player: SimPlayer,
    camera: SelfView<SimulatedCamera>,
    metronome: Metronome,
    clock: ManualClock,
    clicks: Rc<Cell<usize>>,
    loading_since: HashMap<Angle, f64>,
    notices: Vec<String>,
}

pub fn run(script: &RehearsalScript, config: &AppConfig) -> Result<RehearsalReport> {
    let mut rehearsal = Rehearsal::new(script, config)?;
    let tick = script.tick_secs.max(0.01);

    let mut steps = script.steps.clone();
    steps.sort_by(|a, b| a.at.total_cmp(&b.at));
    let mut network = script.network.clone();
    network.sort_by(|a, b| a.at.total_cmp(&b.at));
    let (mut next_step, mut next_sample) = (0, 0);

    let mut ticks = 0u64;
    loop {
        let now = ticks as f64 * tick;
        if now > script.run_secs {
            break;
        }
        rehearsal.clock.set(now);

        while let Some(step) = steps.get(next_step).filter(|step| step.at <= now) {
            tracing::debug!(at = step.at, command = ?step.command, "script step");
            rehearsal.dispatch(&step.command)?;
            next_step += 1;
        }
        while let Some(step) = network.get(next_sample).filter(|step| step.at <= now) {
            rehearsal.player.observe_network(&step.sample, now)?;
            next_sample += 1;
        }

        rehearsal.complete_loads(now, script.load_delay_secs);
        rehearsal.poll_metronome(now);
        rehearsal.advance_media(tick);
        rehearsal.collect_notices();
        ticks += 1;
    }

    Ok(rehearsal.finish())
}

impl Rehearsal {
    fn new(script: &RehearsalScript, config: &AppConfig) -> Result<Self> {
        let mut front = SimulatedSurface::new(script.media_duration_secs);
        let mut back =
            SimulatedSurface::new(script.back_duration_secs.unwrap_or(script.media_duration_secs));
        front.block_play(script.block_autoplay);
        back.block_play(script.block_autoplay);

        let mut player = Player::new(
            front,
            back,
            HeadlessDisplay::new(),
            script.sources.clone(),
            script.sections.clone(),
            config,
        );
        player.open()?;

        let clock = ManualClock::new(0.0);
        let clicks = Rc::new(Cell::new(0));
        let metronome = Metronome::new(
            &config.metronome,
            Box::new(clock.clone()),
            Box::new(CountingSink(clicks.clone())),
        );

        Ok(Self {
            player,
            camera: SelfView::new(SimulatedCamera::new(script.camera_available)),
            metronome,
            clock,
            clicks,
            loading_since: HashMap::new(),
            notices: Vec::new(),
        })
    }

    fn dispatch(&mut self, command: &Command) -> Result<()> {
        if self.player.apply(command)? {
            return Ok(());
        }

        match command {
            Command::ToggleCamera => {
                if let Some(notice) = self.camera.toggle() {
                    self.notices.push(notice.to_string());
                }
            }
            Command::ToggleMetronome => self.metronome.toggle(),
            Command::SetTempo { bpm } => {
                self.metronome.set_tempo(*bpm);
            }
            Command::SetBeatsPerMeasure { beats } => {
                self.metronome.set_beats_per_measure(*beats);
            }
            Command::SetAccent { enabled } => self.metronome.set_accent_first_beat(*enabled),
            other => tracing::debug!(command = ?other, "command not handled"),
        }
        Ok(())
    }

    fn complete_loads(&mut self, now: f64, delay: f64) {
        for angle in [Angle::Front, Angle::Back] {
            if !self.player.sync().surface(angle).is_loading() {
                self.loading_since.remove(&angle);
                continue;
            }

            let since = *self.loading_since.entry(angle).or_insert(now);
            if now - since < delay {
                continue;
            }
            self.loading_since.remove(&angle);
            if let Some(event) = self.player.sync_mut().surface_mut(angle).finish_loading() {
                self.player.handle_event(angle, event);
            }
        }
    }

    fn poll_metronome(&mut self, now: f64) {
        while let Some(wakeup) = self.metronome.next_wakeup().filter(|wakeup| *wakeup <= now) {
            self.clock.set(wakeup);
            self.metronome.tick();
        }
        self.clock.set(now);
    }

    fn advance_media(&mut self, delta: f64) {
        let angle = self.player.sync().active_angle();
        for event in self.player.sync_mut().surface_mut(angle).advance(delta) {
            self.player.handle_event(angle, event);
        }
    }

    fn collect_notices(&mut self) {
        self.notices
            .extend(self.player.drain_notices().iter().map(ToString::to_string));
    }

    fn finish(mut self) -> RehearsalReport {
        self.collect_notices();
        let report = RehearsalReport {
            player: self.player.snapshot(),
            camera_on: self.camera.is_on(),
            metronome: self.metronome.tempo().clone(),
            clicks: self.clicks.get(),
            notices: self.notices,
        };
        self.metronome.stop();
        self.player.teardown();
        self.camera.stop();
        report
    }
}
