use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowBuilder},
};

use pulsewave::audio::{
    playback::is_local_media, AutoplayPolicy, CpalHost, FrameSampler, PlaybackElement,
    PlaybackEvent, RodioBackend, SignalGraph, UserGesture,
};
use pulsewave::catalog::{Playlist, TrackDescriptor};
use pulsewave::config::PlayerConfig;
use pulsewave::driver::WindowScheduler;
use pulsewave::graphics::{ColorScheme, GraphicsEngine, MeshSurface, Surface, VisualizerType};
use pulsewave::player::Player;

type AppPlayer = Player<RodioBackend, CpalHost, WindowScheduler>;

const SEEK_STEP_SECS: f64 = 5.0;
const VOLUME_STEP: f32 = 0.05;

#[derive(Parser)]
#[command(name = "pulsewave")]
#[command(about = "Music player with a real-time audio visualizer")]
struct Args {
    /// Audio file to play; overrides the catalog
    #[arg()]
    file: Option<PathBuf>,

    /// JSON player configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON track catalog
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Catalog id of the first track
    #[arg(long)]
    track: Option<u32>,

    /// Visualizer variant, overriding the config
    #[arg(long, value_enum)]
    visualizer: Option<VisualizerType>,

    /// Color scheme, overriding the config
    #[arg(long, value_enum)]
    colors: Option<ColorScheme>,
}

fn load_playlist(args: &Args) -> Result<Playlist> {
    if let Some(file) = &args.file {
        if !is_local_media(file) {
            warn!("{} does not look like an audio file", file.display());
        }
        return Ok(Playlist::new(vec![TrackDescriptor::from_path(file)])?);
    }
    let path = args
        .catalog
        .as_ref()
        .context("either an audio file or --catalog is required")?;
    let mut playlist = Playlist::load(path)?;
    if let Some(id) = args.track {
        playlist.select(id)?;
    }
    Ok(playlist)
}

fn window_title(player: &AppPlayer, playlist: &Playlist) -> String {
    let track = playlist.current().label();
    let state = if player.is_playing() { "Playing" } else { "Paused" };
    match player.notifications().current() {
        Some(note) => format!("Pulsewave | {} | {} | {}", track, state, note.message),
        None => format!("Pulsewave | {} | {}", track, state),
    }
}

fn switch_track(player: &mut AppPlayer, track: &TrackDescriptor, gesture: Option<&UserGesture>) {
    info!("Switching to {}", track.label());
    if player.load(&track.url).is_ok() {
        if let Err(e) = player.play(gesture) {
            warn!("Cannot start {}: {}", track.label(), e);
        }
    }
}

fn handle_key(
    key: KeyCode,
    player: &mut AppPlayer,
    playlist: &mut Playlist,
    window: &Window,
) -> bool {
    let gesture = UserGesture::from_input();
    match key {
        KeyCode::Escape => return false,
        KeyCode::Space => {
            if let Err(e) = player.toggle(Some(&gesture)) {
                warn!("Toggle failed: {}", e);
            }
        }
        KeyCode::ArrowLeft | KeyCode::ArrowRight => {
            let delta = if key == KeyCode::ArrowLeft { -SEEK_STEP_SECS } else { SEEK_STEP_SECS };
            if let Err(e) = player.seek_by(delta) {
                warn!("Seek failed: {}", e);
            }
        }
        KeyCode::ArrowUp => {
            let level = player.set_volume(player.volume() + VOLUME_STEP);
            info!("Volume {:.0}%", level * 100.0);
        }
        KeyCode::ArrowDown => {
            let level = player.set_volume(player.volume() - VOLUME_STEP);
            info!("Volume {:.0}%", level * 100.0);
        }
        KeyCode::KeyN => {
            let track = playlist.next().clone();
            switch_track(player, &track, Some(&gesture));
        }
        KeyCode::KeyP => {
            let track = playlist.previous().clone();
            switch_track(player, &track, Some(&gesture));
        }
        KeyCode::KeyV => {
            let variant = player.visual_parameters().variant.next();
            info!("Visualizer: {:?}", variant);
            player.set_visualizer(variant);
        }
        KeyCode::KeyC => {
            let scheme = player.color_scheme().next();
            info!("Color scheme: {}", scheme.palette().name);
            player.set_color_scheme(scheme);
        }
        _ => {}
    }
    window.set_title(&window_title(player, playlist));
    true
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    info!("Starting Pulsewave");

    let mut config = match &args.config {
        Some(path) => PlayerConfig::load(path)?,
        None => PlayerConfig::default(),
    };
    if let Some(variant) = args.visualizer {
        config.visualizer_type = variant;
    }
    if let Some(scheme) = args.colors {
        config.color_scheme = scheme;
    }
    let mut playlist = load_playlist(&args)?;

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Pulsewave")
            .with_inner_size(winit::dpi::LogicalSize::new(1200, 800))
            .build(&event_loop)?,
    );

    let mut graphics_engine = pollster::block_on(GraphicsEngine::new(Arc::clone(&window)))?;
    let size = graphics_engine.size();
    let mut mesh = MeshSurface::new(size.width as f32, size.height as f32);

    let element = PlaybackElement::new(RodioBackend::new()?, config.fetch_mode);
    let graph = SignalGraph::new(CpalHost, config.graph_config());
    let mut player: AppPlayer = Player::new(
        element,
        graph,
        FrameSampler::new(config.beat_threshold),
        WindowScheduler::new(Arc::clone(&window)),
        config.visual_parameters(),
        config.color_scheme,
    );
    player.set_volume(config.volume);

    let first = playlist.current().clone();
    match config.autoplay_policy {
        AutoplayPolicy::Allowed => switch_track(&mut player, &first, None),
        // Wait for the first key press to start anything.
        AutoplayPolicy::UserGesture => {
            if let Err(e) = player.load(&first.url) {
                warn!("Cannot load {}: {}", first.label(), e);
            }
        }
    }
    window.set_title(&window_title(&player, &playlist));
    info!("Player initialized");

    let window_clone = Arc::clone(&window);
    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                player.teardown();
                elwt.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat,
                        ..
                    },
                ..
            } => {
                let repeatable = matches!(
                    key,
                    KeyCode::ArrowLeft | KeyCode::ArrowRight | KeyCode::ArrowUp | KeyCode::ArrowDown
                );
                if repeat && !repeatable {
                    return;
                }
                if !handle_key(key, &mut player, &mut playlist, &window_clone) {
                    info!("Escape pressed");
                    player.teardown();
                    elwt.exit();
                }
            }
            WindowEvent::Resized(physical_size) => {
                graphics_engine.resize(physical_size);
                mesh.resize(physical_size.width as f32, physical_size.height as f32);
                window_clone.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                if let Some(handle) = player.driver_mut().scheduler_mut().take_pending() {
                    player.on_frame(handle, &mut mesh);
                }
                let background = player.color_scheme().palette().background;
                if let Err(e) = graphics_engine.render(&mesh, background) {
                    error!("Render error: {}", e);
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            let before = player.notifications().len();
            let events = player.poll(Instant::now());
            let mut retitle = before != player.notifications().len();
            for event in events {
                match event {
                    PlaybackEvent::Ended => {
                        if playlist.tracks().len() > 1 {
                            let track = playlist.next().clone();
                            switch_track(&mut player, &track, None);
                        }
                        retitle = true;
                    }
                    PlaybackEvent::Error(_) | PlaybackEvent::LoadedMetadata(_) => retitle = true,
                    PlaybackEvent::TimeUpdate(_) => {}
                }
            }
            if retitle {
                window_clone.set_title(&window_title(&player, &playlist));
            }
        }
        _ => {}
    })?;

    Ok(())
}
