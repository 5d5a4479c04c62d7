//! Lookahead metronome.
//!
//! A short poll (every `lookahead_ms`) dispatches every beat whose target
//! time falls inside the next `schedule_horizon_secs`. Beat times come from
//! an accumulating clock value rather than from timer delays, so timer
//! jitter shifts when a beat is *dispatched* but never when it is *due*,
//! and error does not build up over long runs.

use serde::{Deserialize, Serialize};

use crate::{ClickKind, ClickSink, Clock, MetronomeConfig, TimerSlot};

pub const MIN_BPM: f64 = 20.0;
pub const MAX_BPM: f64 = 300.0;
pub const MIN_BEATS_PER_MEASURE: u32 = 1;
pub const MAX_BEATS_PER_MEASURE: u32 = 16;

/// Tempo settings and the running beat counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoState {
    pub bpm: f64,
    pub beats_per_measure: u32,
    pub accent_first_beat: bool,
    pub current_beat_index: u64,
    pub is_running: bool,
}

impl TempoState {
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Accent iff the beat opens a measure and accenting is on.
    pub fn click_kind(&self, beat_index: u64) -> ClickKind {
        if self.accent_first_beat && beat_index % u64::from(self.beats_per_measure) == 0 {
            ClickKind::Accent
        } else {
            ClickKind::Plain
        }
    }
}

/// A beat handed to the click sink.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    /// Zero-based count since `start()`.
    pub index: u64,
    /// Position inside the measure, used for the visual count.
    pub beat_in_measure: u32,
    pub kind: ClickKind,
    /// Target time on the metronome clock.
    pub scheduled_at: f64,
}

#[derive(Debug, Clone, Copy)]
struct ScheduleClock {
    next_event_time: f64,
    lookahead_interval_ms: f64,
    schedule_horizon_secs: f64,
}

type BeatObserver = Box<dyn FnMut(&BeatEvent)>;

/// Metronome driven by a lookahead poll.
///
/// The host owns the event loop: it sleeps until [`Metronome::next_wakeup`]
/// and then calls [`Metronome::tick`]. Each tick dispatches due beats and
/// re-arms the poll relative to the time it actually ran.
pub struct Metronome {
    tempo: TempoState,
    schedule: ScheduleClock,
    start_offset_secs: f64,
    stale_tolerance_secs: f64,
    clock: Box<dyn Clock>,
    sink: Box<dyn ClickSink>,
    timer: TimerSlot,
    observer: Option<BeatObserver>,
    last_beat: Option<BeatEvent>,
}

impl Metronome {
    pub fn new(config: &MetronomeConfig, clock: Box<dyn Clock>, sink: Box<dyn ClickSink>) -> Self {
        Self {
            tempo: TempoState {
                bpm: clamp_bpm(config.bpm),
                beats_per_measure: clamp_beats(config.beats_per_measure),
                accent_first_beat: config.accent_first_beat,
                current_beat_index: 0,
                is_running: false,
            },
            schedule: ScheduleClock {
                next_event_time: 0.0,
                lookahead_interval_ms: config.lookahead_ms.max(1.0),
                schedule_horizon_secs: config.schedule_horizon_secs.max(0.0),
            },
            start_offset_secs: config.start_offset_secs.max(0.0),
            stale_tolerance_secs: config.stale_tolerance_secs.max(0.0),
            clock,
            sink,
            timer: TimerSlot::new(),
            observer: None,
            last_beat: None,
        }
    }

    /// Registers a callback invoked for every dispatched beat, whether or not
    /// the click actually sounded.
    pub fn on_beat(&mut self, observer: impl FnMut(&BeatEvent) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn tempo(&self) -> &TempoState {
        &self.tempo
    }

    pub fn is_running(&self) -> bool {
        self.tempo.is_running
    }

    /// Beat position inside the current measure, for the visual count.
    pub fn current_beat(&self) -> u32 {
        self.last_beat.map(|beat| beat.beat_in_measure).unwrap_or(0)
    }

    pub fn last_beat(&self) -> Option<&BeatEvent> {
        self.last_beat.as_ref()
    }

    /// Time at which the host should call [`Metronome::tick`] next.
    pub fn next_wakeup(&self) -> Option<f64> {
        self.timer.deadline()
    }

    /// Starts the beat clock. Does nothing if already running.
    pub fn start(&mut self) {
        if self.tempo.is_running {
            tracing::debug!("metronome already running");
            return;
        }

        let now = self.clock.now();
        self.tempo.current_beat_index = 0;
        self.tempo.is_running = true;
        self.last_beat = None;
        self.schedule.next_event_time = now + self.start_offset_secs;
        self.timer.arm(now + self.poll_interval());
        tracing::info!(bpm = self.tempo.bpm, beats = self.tempo.beats_per_measure, "metronome started");
    }

    /// Stops the beat clock and cancels the pending poll. Idempotent.
    pub fn stop(&mut self) {
        self.timer.cancel();
        self.tempo.current_beat_index = 0;
        self.last_beat = None;
        if self.tempo.is_running {
            self.tempo.is_running = false;
            tracing::info!("metronome stopped");
        }
    }

    pub fn toggle(&mut self) {
        if self.tempo.is_running {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Clamps `bpm` to the supported range and returns the applied value.
    ///
    /// While running, the already computed next beat keeps its time; the new
    /// spacing applies from the beat after it.
    pub fn set_tempo(&mut self, bpm: f64) -> f64 {
        self.tempo.bpm = clamp_bpm(bpm);
        self.tempo.bpm
    }

    pub fn set_beats_per_measure(&mut self, beats: u32) -> u32 {
        self.tempo.beats_per_measure = clamp_beats(beats);
        self.tempo.beats_per_measure
    }

    pub fn set_accent_first_beat(&mut self, accent: bool) {
        self.tempo.accent_first_beat = accent;
    }

    /// Runs one poll if it is due. Returns the number of beats dispatched.
    pub fn tick(&mut self) -> usize {
        let now = self.clock.now();
        if self.timer.take_due(now).is_none() {
            return 0;
        }

        let dispatched = self.schedule_due_beats(now);
        if self.tempo.is_running {
            self.timer.arm(now + self.poll_interval());
        }
        dispatched
    }

    fn poll_interval(&self) -> f64 {
        self.schedule.lookahead_interval_ms / 1000.0
    }

    fn schedule_due_beats(&mut self, now: f64) -> usize {
        let horizon = now + self.schedule.schedule_horizon_secs;
        let mut dispatched = 0;

        while self.schedule.next_event_time < horizon {
            let scheduled_at = self.schedule.next_event_time;
            let index = self.tempo.current_beat_index;

            if now - scheduled_at < self.stale_tolerance_secs {
                self.dispatch(index, scheduled_at);
                dispatched += 1;
            } else {
                tracing::debug!(index, late_by = now - scheduled_at, "skipping stale beat");
            }

            self.schedule.next_event_time += self.tempo.seconds_per_beat();
            self.tempo.current_beat_index += 1;
        }

        dispatched
    }

    fn dispatch(&mut self, index: u64, scheduled_at: f64) {
        let beat = BeatEvent {
            index,
            beat_in_measure: (index % u64::from(self.tempo.beats_per_measure)) as u32,
            kind: self.tempo.click_kind(index),
            scheduled_at,
        };

        // A silent click must not stall the beat clock.
        if let Err(err) = self.sink.emit(beat.kind, scheduled_at) {
            tracing::warn!(index, error = %err, "click failed to sound");
        }

        self.last_beat = Some(beat);
        if let Some(observer) = self.observer.as_mut() {
            observer(&beat);
        }
    }
}

impl std::fmt::Debug for Metronome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metronome")
            .field("tempo", &self.tempo)
            .field("next_event_time", &self.schedule.next_event_time)
            .field("next_wakeup", &self.timer.deadline())
            .finish()
    }
}

fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_nan() {
        return MIN_BPM;
    }
    bpm.clamp(MIN_BPM, MAX_BPM)
}

fn clamp_beats(beats: u32) -> u32 {
    beats.clamp(MIN_BEATS_PER_MEASURE, MAX_BEATS_PER_MEASURE)
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{ManualClock, PracticeError, Result};

    type ClickLog = Rc<RefCell<Vec<(ClickKind, f64)>>>;

    struct RecordingSink(ClickLog);

    impl ClickSink for RecordingSink {
        fn emit(&mut self, kind: ClickKind, at: f64) -> Result<()> {
            self.0.borrow_mut().push((kind, at));
            Ok(())
        }
    }

    struct BlockedSink;

    impl ClickSink for BlockedSink {
        fn emit(&mut self, _kind: ClickKind, _at: f64) -> Result<()> {
            Err(PracticeError::SinkUnavailable("no user gesture yet".to_string()))
        }
    }

    fn metronome(bpm: f64) -> (Metronome, ManualClock, ClickLog) {
        let clock = ManualClock::new(10.0);
        let log = ClickLog::default();
        let config = MetronomeConfig {
            bpm,
            ..MetronomeConfig::default()
        };
        let metronome = Metronome::new(
            &config,
            Box::new(clock.clone()),
            Box::new(RecordingSink(log.clone())),
        );
        (metronome, clock, log)
    }

    fn run_until(metronome: &mut Metronome, clock: &ManualClock, until: f64) {
        while let Some(wakeup) = metronome.next_wakeup() {
            if wakeup > until {
                break;
            }
            clock.set(wakeup);
            metronome.tick();
        }
    }

    #[test]
    fn beat_times_follow_the_tempo_without_drift() {
        for bpm in [20.0, 97.0, 137.0, 300.0] {
            let (mut metronome, clock, log) = metronome(bpm);
            metronome.start();
            let t0 = 10.0 + 0.05;
            let spb = 60.0 / bpm;
            run_until(&mut metronome, &clock, t0 + spb * 1000.0);

            let log = log.borrow();
            assert!(log.len() >= 1000, "bpm {bpm}: only {} beats", log.len());
            for (k, (_, at)) in log.iter().enumerate().take(1000) {
                let expected = t0 + spb * k as f64;
                assert!((at - expected).abs() < 1e-6, "bpm {bpm} beat {k}: {at} vs {expected}");
            }
        }
    }

    #[test]
    fn beats_are_dispatched_shortly_before_they_are_due() {
        let (mut metronome, clock, _log) = metronome(120.0);
        let observed = Rc::new(RefCell::new(Vec::new()));
        let sink = observed.clone();
        let seen_clock = clock.clone();
        metronome.on_beat(move |beat| sink.borrow_mut().push(beat.scheduled_at - seen_clock.now()));
        metronome.start();
        run_until(&mut metronome, &clock, 15.0);

        let leads = observed.borrow();
        assert!(leads.len() >= 9);
        for lead in leads.iter() {
            assert!(*lead <= 0.1 && *lead > -0.1, "lead {lead}");
        }
    }

    #[test]
    fn accents_first_beat_of_each_measure() {
        let (mut metronome, clock, log) = metronome(240.0);
        metronome.start();
        run_until(&mut metronome, &clock, 13.0);

        let log = log.borrow();
        for (index, (kind, _)) in log.iter().enumerate() {
            let expected = if index % 4 == 0 {
                ClickKind::Accent
            } else {
                ClickKind::Plain
            };
            assert_eq!(*kind, expected, "beat {index}");
        }
    }

    #[test]
    fn accent_can_be_disabled() {
        let (mut metronome, clock, log) = metronome(240.0);
        metronome.set_accent_first_beat(false);
        metronome.start();
        run_until(&mut metronome, &clock, 12.0);

        assert!(log.borrow().iter().all(|(kind, _)| *kind == ClickKind::Plain));
    }

    #[test]
    fn visual_count_wraps_with_beats_per_measure() {
        let (mut metronome, clock, _log) = metronome(120.0);
        assert_eq!(metronome.set_beats_per_measure(3), 3);
        let counts = Rc::new(RefCell::new(Vec::new()));
        let sink = counts.clone();
        metronome.on_beat(move |beat| sink.borrow_mut().push(beat.beat_in_measure));
        metronome.start();
        run_until(&mut metronome, &clock, 14.0);

        let counts = counts.borrow();
        assert_eq!(&counts[..7], &[0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(metronome.current_beat(), *counts.last().unwrap());
    }

    #[test]
    fn start_twice_matches_start_once() {
        let (mut once, clock_once, log_once) = metronome(100.0);
        once.start();
        run_until(&mut once, &clock_once, 12.0);

        let (mut twice, clock_twice, log_twice) = metronome(100.0);
        twice.start();
        twice.start();
        run_until(&mut twice, &clock_twice, 12.0);

        assert_eq!(*log_once.borrow(), *log_twice.borrow());
        assert_eq!(once.tempo(), twice.tempo());
    }

    #[test]
    fn stop_cancels_the_pending_poll_and_is_idempotent() {
        let (mut metronome, clock, log) = metronome(100.0);
        metronome.start();
        run_until(&mut metronome, &clock, 11.0);
        metronome.stop();

        assert!(metronome.next_wakeup().is_none());
        let beats = log.borrow().len();
        clock.advance(5.0);
        assert_eq!(metronome.tick(), 0);
        assert_eq!(log.borrow().len(), beats);

        metronome.stop();
        assert!(!metronome.is_running());
        assert_eq!(metronome.tempo().current_beat_index, 0);
        assert_eq!(metronome.current_beat(), 0);
    }

    #[test]
    fn restart_begins_a_fresh_measure() {
        let (mut metronome, clock, log) = metronome(200.0);
        metronome.start();
        run_until(&mut metronome, &clock, 11.3);
        metronome.toggle();
        assert!(!metronome.is_running());

        log.borrow_mut().clear();
        metronome.toggle();
        run_until(&mut metronome, &clock, clock.now() + 0.2);
        assert_eq!(log.borrow()[0].0, ClickKind::Accent);
    }

    #[test]
    fn tempo_clamps_to_supported_range() {
        let (mut metronome, _, _) = metronome(100.0);
        assert_eq!(metronome.set_tempo(5.0), MIN_BPM);
        assert_eq!(metronome.set_tempo(1000.0), MAX_BPM);
        assert_eq!(metronome.set_tempo(f64::NAN), MIN_BPM);
        assert_eq!(metronome.set_beats_per_measure(0), 1);
        assert_eq!(metronome.set_beats_per_measure(40), 16);
    }

    #[test]
    fn tempo_change_applies_after_the_next_computed_beat() {
        let (mut metronome, clock, log) = metronome(60.0);
        metronome.start();
        // First poll dispatches the beat at 10.05 and computes the next at 11.05.
        run_until(&mut metronome, &clock, 10.5);
        assert_eq!(log.borrow().len(), 1);

        metronome.set_tempo(120.0);
        run_until(&mut metronome, &clock, 12.2);

        let times: Vec<f64> = log.borrow().iter().map(|(_, at)| *at).collect();
        assert!((times[1] - 11.05).abs() < 1e-9);
        assert!((times[2] - 11.55).abs() < 1e-9);
        assert!((times[3] - 12.05).abs() < 1e-9);
    }

    #[test]
    fn failing_sink_does_not_stop_the_beat_clock() {
        let clock = ManualClock::new(0.0);
        let mut metronome = Metronome::new(
            &MetronomeConfig::default(),
            Box::new(clock.clone()),
            Box::new(BlockedSink),
        );
        let seen = Rc::new(RefCell::new(0));
        let counter = seen.clone();
        metronome.on_beat(move |_| *counter.borrow_mut() += 1);
        metronome.start();
        run_until(&mut metronome, &clock, 3.0);

        assert!(metronome.is_running());
        assert!(*seen.borrow() >= 5);
        assert!(metronome.tempo().current_beat_index >= 5);
    }

    #[test]
    fn stale_beats_are_skipped_but_still_counted() {
        let (mut metronome, clock, log) = metronome(120.0);
        metronome.start();
        // Host stalls for two seconds before the first poll.
        clock.advance(2.0);
        metronome.tick();

        let log = log.borrow();
        assert!(log.iter().all(|(_, at)| 12.0 - at < 0.1));
        assert!(metronome.tempo().current_beat_index >= 4);
    }
}
