use clap::{Parser, Subcommand};
use log::{LevelFilter, debug, error, info, warn};
use midisaber::config::{self, CONFIG_INI_PATH};
use midisaber::core::audio::{AudioCommand, ChannelSink};
use midisaber::core::clock::{Clock, ManualClock};
use midisaber::core::tracking::PoseSlot;
use midisaber::game::autoplay::Autoplay;
use midisaber::game::cache::{self, ChartCache};
use midisaber::game::chart::{BackgroundAudioEvent, Chart, ChartOptions};
use midisaber::game::difficulty::Difficulty;
use midisaber::game::gameplay::GameMode;
use midisaber::game::note::Hand;
use midisaber::game::session::{Phase, Session};
use midisaber::game::song::SongCatalog;
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::thread;

#[derive(Parser)]
#[command(
    name = "midisaber",
    about = "Generate hand-tracking rhythm charts from MIDI files and simulate plays"
)]
struct Cli {
    /// Options file
    #[arg(long, default_value = CONFIG_INI_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the songs in the catalog
    Songs,
    /// Generate a chart and print it
    Chart {
        /// Catalog song id, MIDI file path or http(s) URL
        source: String,
        #[arg(long)]
        difficulty: Option<Difficulty>,
        /// Print the full chart as JSON
        #[arg(long)]
        json: bool,
        /// Bypass the chart cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Play a chart with scripted hands and report the score
    Simulate {
        source: String,
        #[arg(long)]
        difficulty: Option<Difficulty>,
        #[arg(long)]
        mode: Option<GameMode>,
        /// Engine ticks per second of song time
        #[arg(long, default_value = "60")]
        tick_rate: u32,
        /// Never report the left hand
        #[arg(long)]
        without_left: bool,
        /// Never report the right hand
        #[arg(long)]
        without_right: bool,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        no_cache: bool,
    },
}

#[derive(Serialize)]
struct ChartDump<'a> {
    chart: &'a Chart,
    background: &'a [BackgroundAudioEvent],
}

/// Resolves a catalog id to its MIDI source; anything else is used as is.
fn resolve_source(source: &str, config: &config::Config) -> String {
    match SongCatalog::load(&config.song_catalog) {
        Ok(catalog) => match catalog.find(source) {
            Ok(song) => {
                info!("Playing '{}' by {}.", song.title, song.artist);
                catalog.midi_source(song)
            }
            Err(_) => source.to_string(),
        },
        Err(e) => {
            debug!("No catalog available ({}), treating '{}' as a path.", e, source);
            source.to_string()
        }
    }
}

fn load(
    source: &str,
    difficulty: Option<Difficulty>,
    no_cache: bool,
    config: &config::Config,
) -> Result<(Chart, Vec<BackgroundAudioEvent>), Box<dyn Error>> {
    let options = ChartOptions {
        difficulty: difficulty.unwrap_or(config.difficulty),
        lead_in: config.lead_in_seconds,
    };
    let chart_cache = (!no_cache).then(|| ChartCache::from_config(config));
    let source = resolve_source(source, config);
    Ok(cache::load_chart(&source, options, chart_cache.as_ref())?)
}

fn list_songs(config: &config::Config) -> Result<(), Box<dyn Error>> {
    let catalog = SongCatalog::load(&config.song_catalog)?;
    for song in catalog.songs() {
        println!(
            "{:<16} {:<32} {:<24} {:>6} BPM  {}",
            song.id,
            song.title,
            song.artist,
            song.formatted_bpm(),
            song.difficulty
        );
    }
    Ok(())
}

fn print_chart(chart: &Chart, background: &[BackgroundAudioEvent], json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(&ChartDump { chart, background })?);
        return Ok(());
    }
    println!(
        "{} chart: {} notes ({} holds), {} left / {} right, {} background events",
        chart.difficulty,
        chart.len(),
        chart.hold_count(),
        chart.count_for(Hand::Left),
        chart.count_for(Hand::Right),
        background.len()
    );
    for note in &chart.notes {
        println!(
            "{:>6} {:>9.3}s {:>6.2}s  {:<5} lane {} layer {}  {} ({})",
            note.id.to_string(),
            note.time,
            note.length,
            note.hand.to_string(),
            note.lane,
            note.layer,
            note.audio.name,
            note.audio.instrument
        );
    }
    Ok(())
}

struct SimulateArgs {
    mode: GameMode,
    tick_rate: u32,
    without: Vec<Hand>,
    json: bool,
}

fn simulate(chart: Chart, background: Vec<BackgroundAudioEvent>, args: SimulateArgs) -> Result<(), Box<dyn Error>> {
    let mut autoplay = Autoplay::new(&chart);
    for hand in args.without {
        autoplay = autoplay.without(hand);
    }

    // Stand-in synth: drains commands until the session drops its sink.
    let (sink, commands) = ChannelSink::new();
    let synth = thread::spawn(move || {
        let mut played = 0usize;
        for command in commands {
            if let AudioCommand::Trigger { audio, at } = command {
                debug!("Keysound {} at {:.3}s", audio.name, at);
                played += 1;
            }
        }
        played
    });

    let slot = PoseSlot::new();
    let mut session = Session::new(chart, background, args.mode, ManualClock::new(), sink);
    let dt = 1.0 / args.tick_rate.max(1) as f32;
    session.start();
    while !session.phase().is_terminal() {
        session.clock_mut().advance(dt);
        slot.publish(autoplay.snapshot(session.clock().current_time_seconds()));
        session.tick_from(&slot);
    }

    let phase = session.phase();
    let summary = session.scores().summary();
    drop(session);
    let keysounds = match synth.join() {
        Ok(played) => played,
        Err(_) => {
            warn!("Synth thread panicked.");
            0
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!("Result:     {}", if phase == Phase::GameOver { "FAILED" } else { "CLEARED" });
    println!("Score:      {}", summary.score);
    println!("Max combo:  {}", summary.max_combo);
    println!("Accuracy:   {:.2}%", summary.accuracy * 100.0);
    println!("Health:     {:.2}", summary.health);
    println!(
        "Judgments:  {} perfect, {} good, {} auto, {} miss, {} holds",
        summary.counts.perfect,
        summary.counts.good,
        summary.counts.auto,
        summary.counts.miss,
        summary.counts.holds_completed
    );
    println!("Keysounds:  {}", keysounds);
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    config::load(&cli.config);
    let config = config::get();

    match cli.command {
        Command::Songs => list_songs(&config),
        Command::Chart {
            source,
            difficulty,
            json,
            no_cache,
        } => {
            let (chart, background) = load(&source, difficulty, no_cache, &config)?;
            print_chart(&chart, &background, json)
        }
        Command::Simulate {
            source,
            difficulty,
            mode,
            tick_rate,
            without_left,
            without_right,
            json,
            no_cache,
        } => {
            let (chart, background) = load(&source, difficulty, no_cache, &config)?;
            let mut without = Vec::new();
            if without_left {
                without.push(Hand::Left);
            }
            if without_right {
                without.push(Hand::Right);
            }
            let args = SimulateArgs {
                mode: mode.unwrap_or(config.game_mode),
                tick_rate,
                without,
                json,
            };
            simulate(chart, background, args)
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // --- Logging Setup ---
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .filter_module("midisaber::game::gameplay", LevelFilter::Warn) // per-note judgments are noisy
        .filter_module("midisaber::core::network", LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("midisaber exited with error: {}", e);
        return Err(e);
    }
    Ok(())
}
