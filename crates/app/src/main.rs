mod rehearsal;
mod terminal;

use std::{
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use clap::{Parser, Subcommand};
use dance_practice_core::{AppConfig, Clock, Metronome, MonotonicClock, PooledClickSink};
use tracing_subscriber::EnvFilter;

use crate::{rehearsal::RehearsalScript, terminal::TerminalVoice};

fn main() -> dance_practice_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Metronome {
            bpm,
            beats,
            no_accent,
            seconds,
            config,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(bpm) = bpm {
                config.metronome.bpm = bpm;
            }
            if let Some(beats) = beats {
                config.metronome.beats_per_measure = beats;
            }
            if no_accent {
                config.metronome.accent_first_beat = false;
            }
            run_metronome(&config, seconds)
        }
        Commands::Rehearse { script, config } => run_rehearsal(&script, config.as_deref()),
        Commands::InitConfig { output } => {
            std::fs::write(&output, AppConfig::default().to_json_pretty()?)?;
            tracing::info!(?output, "wrote default configuration");
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> dance_practice_core::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path),
        None => Ok(AppConfig::default()),
    }
}

fn run_metronome(config: &AppConfig, seconds: f64) -> dance_practice_core::Result<()> {
    let clock = MonotonicClock::start();
    let sink = PooledClickSink::with_pool(config.metronome.click_pool_size, TerminalVoice::new);
    let mut metronome = Metronome::new(&config.metronome, Box::new(clock), Box::new(sink));
    metronome.on_beat(|beat| {
        tracing::debug!(
            index = beat.index,
            beat = beat.beat_in_measure + 1,
            at = beat.scheduled_at,
            "beat"
        );
    });

    let tempo = metronome.tempo();
    tracing::info!(
        bpm = tempo.bpm,
        beats_per_measure = tempo.beats_per_measure,
        accent = tempo.accent_first_beat,
        seconds,
        "starting metronome"
    );

    metronome.start();
    let deadline = clock.now() + seconds.max(0.0);
    while let Some(wakeup) = metronome.next_wakeup() {
        let now = clock.now();
        if now >= deadline {
            break;
        }
        if wakeup > now {
            thread::sleep(Duration::from_secs_f64((wakeup - now).min(deadline - now)));
        }
        metronome.tick();
    }
    metronome.stop();
    Ok(())
}

fn run_rehearsal(script: &Path, config: Option<&Path>) -> dance_practice_core::Result<()> {
    tracing::info!(?script, "running rehearsal script");
    let config = load_config(config)?;
    let raw = std::fs::read_to_string(script)?;
    let script = RehearsalScript::from_json(&raw)?;

    let report = rehearsal::run(&script, &config)?;
    for notice in &report.notices {
        tracing::info!(%notice, "notice");
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Dance practice player tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the lookahead metronome against the terminal.
    Metronome {
        /// Tempo in beats per minute (20-300).
        #[arg(short, long)]
        bpm: Option<f64>,
        /// Beats per measure (1-16).
        #[arg(long)]
        beats: Option<u32>,
        /// Do not accent the first beat of each measure.
        #[arg(long)]
        no_accent: bool,
        /// How long to run, in seconds.
        #[arg(short, long, default_value_t = 10.0)]
        seconds: f64,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Replay a scripted practice session against simulated video surfaces.
    Rehearse {
        /// Path to the rehearsal script (JSON).
        script: PathBuf,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Write the default configuration to a file.
    InitConfig {
        /// Destination path for the configuration file.
        output: PathBuf,
    },
}
