use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Parser, Subcommand};
use tardis_core::{
    event_channel, Action, AnimationEngine, AppConfig, AssetStore, AudioBackend, AudioPlayer,
    Clock, Finale, ImageDecoder, ImageHandle, PlaybackCoordinator, Result, Session,
    SimulatedAudio, SystemClock, TickScheduler, TrackCatalog, VisualCoordinator,
};
use tracing_subscriber::EnvFilter;

mod apng;
mod console;
#[cfg(feature = "rodio")]
mod rodio_audio;

use apng::ApngDecoder;
use console::ConsoleSurface;

const FINALE_ASSETS: [&str; 3] = ["btn_prev_ani", "btn_next_ani", "btn_power_ani"];

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let catalog = match cli.catalog.as_deref() {
        Some(path) => TrackCatalog::from_json_file(path)?,
        None => TrackCatalog::builtin(),
    };

    match cli.command {
        Commands::Play(args) => run_play(&config, catalog, &args),
        Commands::Tracks => {
            for track in catalog.tracks() {
                println!("{track}  [{}]", track.effect);
            }
            Ok(())
        }
        Commands::Effects => {
            let registry = config.effect_registry();
            for id in registry.ids() {
                let resolved = registry.resolve(id);
                println!(
                    "{id}: box={} beacon={}",
                    resolved.box_asset.unwrap_or("-"),
                    resolved.beacon.map(|speed| speed.asset_name()).unwrap_or("-"),
                );
            }
            Ok(())
        }
        Commands::Inspect { file } => run_inspect(&file),
    }
}

fn run_play(config: &AppConfig, catalog: TrackCatalog, args: &PlayArgs) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let decoder: Arc<dyn ImageDecoder> = Arc::new(ApngDecoder);
    let assets = AssetStore::new(&config.images.folder, &config.audio.folder);
    assets.verify()?;

    let beacon = ConsoleSurface::new("beacon", still_image(&assets, "tardis_beacon"));
    let window = ConsoleSurface::new("box", still_image(&assets, "tardis_box"));
    let engine = |label: &str, surface: ConsoleSurface| {
        AnimationEngine::new(label, Box::new(surface), decoder.clone(), clock.clone())
            .with_stats(config.images.stats)
    };
    let visuals = VisualCoordinator::new(
        engine("beacon", beacon.clone()),
        engine("box", window.clone()),
        Arc::new(config.effect_registry()),
        assets.clone(),
    );

    let backend = audio_backend(config, clock.clone(), args.simulate)?;
    let audio = AudioPlayer::new(backend, assets.clone(), &config.audio);
    let (sender, receiver) = event_channel(config.host.event_capacity);
    let catalog = Arc::new(catalog);
    let coordinator = PlaybackCoordinator::new(audio, visuals, catalog.clone(), sender);
    let mut session = Session::new(coordinator, receiver);

    let demo = args.demo || config.host.demo_mode;
    begin(&mut session, args, demo);
    tracing::info!(title = session.title(), demo, "session started");

    let mut scheduler = TickScheduler::new(config.host.tick_interval_ms);
    let started = clock.now_ms();
    let mut title = session.title().to_string();
    let mut idle_ticks = 0;
    loop {
        let now = clock.now_ms();
        if !scheduler.poll(now) {
            std::thread::sleep(scheduler.until_next(now));
            continue;
        }

        if session.tick() {
            if session.title() != title {
                title = session.title().to_string();
                tracing::info!(%title, "now playing");
            }
            tracing::debug!(progress = session.progress(), "progress");
        }

        if session.is_playing() {
            idle_ticks = 0;
        } else if !session.demo_mode() {
            break;
        } else {
            idle_ticks += 1;
            if idle_ticks > catalog.len() {
                tracing::warn!("no track in the catalog could be played");
                break;
            }
        }

        if args.limit.is_some_and(|limit| now.saturating_sub(started) >= limit) {
            tracing::info!(ticks = scheduler.ticks(), "time limit reached");
            break;
        }
    }

    session.shutdown();
    tracing::info!(
        beacon_updates = beacon.updates(),
        box_updates = window.updates(),
        "session finished"
    );

    if args.finale {
        run_finale(config, &assets, decoder, clock);
    }
    Ok(())
}

/// Applies the command line's start-up requests. A request that fails leaves
/// the session idle and the host keeps running.
fn begin(session: &mut Session, args: &PlayArgs, demo: bool) {
    let mut actions = Vec::new();
    if let Some(volume) = args.volume {
        actions.push(Action::SetVolume(volume));
    }
    match args.track.as_deref() {
        Some(title) => actions.push(Action::SelectTitle(title.to_string())),
        None if !demo => actions.push(Action::TogglePlay),
        None => {}
    }
    if demo {
        actions.push(Action::SetDemo(true));
    }

    for action in actions {
        if let Err(err) = session.handle(action.clone()) {
            tracing::warn!(?action, %err, "start-up request failed, staying idle");
        }
    }
}

/// Plays the button animations once before exit.
fn run_finale(
    config: &AppConfig,
    assets: &AssetStore,
    decoder: Arc<dyn ImageDecoder>,
    clock: Arc<dyn Clock>,
) {
    let mut engines = Vec::with_capacity(FINALE_ASSETS.len());
    for name in FINALE_ASSETS {
        let surface = ConsoleSurface::new("button", None);
        let mut engine = AnimationEngine::new(name, Box::new(surface), decoder.clone(), clock.clone());
        match engine.load(assets.animation_path(name)) {
            Ok(_) => engines.push(engine),
            Err(err) => tracing::warn!(%err, "finale animation skipped"),
        }
    }

    let mut finale = Finale::new(engines, clock.clone(), config.host.finale_limit_ms);
    let mut scheduler = TickScheduler::new(config.host.tick_interval_ms);
    finale.start();
    loop {
        let now = clock.now_ms();
        if !scheduler.poll(now) {
            std::thread::sleep(scheduler.until_next(now));
            continue;
        }
        if finale.tick() {
            break;
        }
    }
}

/// First frame of a still asset, used as the widget's resting image.
fn still_image(assets: &AssetStore, name: &str) -> Option<ImageHandle> {
    match ApngDecoder.decode(&assets.animation_path(name)) {
        Ok(sequence) => sequence.frames().first().map(|frame| frame.image.clone()),
        Err(err) => {
            tracing::warn!(%err, "resting image unavailable");
            None
        }
    }
}

#[cfg(feature = "rodio")]
fn audio_backend(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
    simulate: bool,
) -> Result<Box<dyn AudioBackend>> {
    if simulate {
        return Ok(Box::new(SimulatedAudio::new(clock, config.audio.simulated_track_ms)));
    }
    Ok(Box::new(rodio_audio::RodioAudio::new()?))
}

#[cfg(not(feature = "rodio"))]
fn audio_backend(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
    _simulate: bool,
) -> Result<Box<dyn AudioBackend>> {
    tracing::debug!("built without the rodio feature; audio is simulated");
    Ok(Box::new(SimulatedAudio::new(clock, config.audio.simulated_track_ms)))
}

fn run_inspect(file: &Path) -> Result<()> {
    let sequence = ApngDecoder.decode(file)?;
    println!(
        "{}: {} frames, loops {}, cycle {} ms{}",
        file.display(),
        sequence.len(),
        sequence.loop_count(),
        sequence.cycle_ms(),
        if sequence.has_default_frame() {
            ", separate default image"
        } else {
            ""
        },
    );
    for (index, frame) in sequence.frames().iter().enumerate() {
        let (width, height) = frame.image.dimensions();
        println!("  #{index:<3} {width}x{height} {} ms", frame.duration_ms);
    }
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
#[command(author, version, about = "TARDIS music player", long_about = None)]
struct Cli {
    /// JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// JSON track list replacing the built-in catalog.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play tracks with the scene animations on a headless display.
    Play(PlayArgs),
    /// List the track catalog.
    Tracks,
    /// List the known effects and the animations they use.
    Effects,
    /// Decode an animation and print its frames.
    Inspect {
        file: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct PlayArgs {
    /// Title of the track to start with.
    #[arg(short, long)]
    track: Option<String>,
    /// Keep advancing to the next track.
    #[arg(long)]
    demo: bool,
    #[arg(long)]
    volume: Option<i32>,
    /// Stop after this many milliseconds.
    #[arg(long)]
    limit: Option<u64>,
    /// Play the button animations before exit.
    #[arg(long)]
    finale: bool,
    /// Use the simulated audio backend even when real output is available.
    #[arg(long)]
    simulate: bool,
}
