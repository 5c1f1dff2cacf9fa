use crossbeam_channel::{Receiver, Sender};
use log::{info, warn};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

use super::tap::{SourceId, TapPoint};

/// `TimeUpdate` events are emitted at most this often.
pub const TIME_UPDATE_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
    #[error("cannot open {url}: {reason}")]
    Open { url: String, reason: String },
    #[error("cannot decode {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("seek failed: {0}")]
    Seek(String),
    #[error("no track loaded")]
    NothingLoaded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    LoadedMetadata(Option<Duration>),
    TimeUpdate(Duration),
    Ended,
    Error(String),
}

/// How media is fetched. `NoCors` media plays normally but is opaque to
/// analysis: the tap feeds silence to the analyser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchMode {
    #[default]
    Cors,
    NoCors,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    pub duration: Option<Duration>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// The platform media-playback primitive behind a `PlaybackElement`.
pub trait MediaBackend {
    /// Replaces the current media with `url`, routed through `tap`, paused.
    fn open(
        &mut self,
        url: &str,
        tap: &TapPoint,
        events: Sender<PlaybackEvent>,
    ) -> Result<MediaInfo, PlaybackError>;

    fn play(&mut self);

    fn pause(&mut self);

    fn stop(&mut self);

    fn seek(&mut self, position: Duration) -> Result<(), PlaybackError>;

    fn set_volume(&mut self, level: f32);
}

/// rodio-backed output: one `Sink` per loaded track.
pub struct RodioBackend {
    #[allow(dead_code)]
    stream: OutputStream,
    stream_handle: OutputStreamHandle,
    sink: Option<Sink>,
    volume: f32,
}

impl RodioBackend {
    pub fn new() -> Result<Self, PlaybackError> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| PlaybackError::Unavailable(e.to_string()))?;

        Ok(Self {
            stream,
            stream_handle,
            sink: None,
            volume: 1.0,
        })
    }
}

/// Resolves a track url to a local path. Plain paths and `file://` urls are
/// accepted; remote schemes are not streamed.
pub fn resolve_media_path(url: &str) -> Result<PathBuf, PlaybackError> {
    if let Some(path) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(path));
    }
    if url.contains("://") {
        return Err(PlaybackError::Open {
            url: url.to_string(),
            reason: "remote media is not supported".to_string(),
        });
    }
    Ok(PathBuf::from(url))
}

pub fn open_decoder(url: &str) -> Result<Decoder<BufReader<File>>, PlaybackError> {
    let path = resolve_media_path(url)?;
    let file = File::open(&path).map_err(|e| PlaybackError::Open {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    Decoder::new(BufReader::new(file)).map_err(|e| PlaybackError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

impl MediaBackend for RodioBackend {
    fn open(
        &mut self,
        url: &str,
        tap: &TapPoint,
        events: Sender<PlaybackEvent>,
    ) -> Result<MediaInfo, PlaybackError> {
        if let Some(old) = self.sink.take() {
            old.stop();
        }

        let decoder = open_decoder(url)?;
        let info = MediaInfo {
            duration: decoder.total_duration(),
            sample_rate: decoder.sample_rate(),
            channels: decoder.channels(),
        };

        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| PlaybackError::Unavailable(e.to_string()))?;
        sink.pause();
        sink.set_volume(self.volume);
        sink.append(tap.wrap(decoder.convert_samples::<f32>(), Some(events)));
        self.sink = Some(sink);

        info!(
            "Loaded {} ({} Hz, {} ch, {:?})",
            url, info.sample_rate, info.channels, info.duration
        );
        Ok(info)
    }

    fn play(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn seek(&mut self, position: Duration) -> Result<(), PlaybackError> {
        let sink = self.sink.as_ref().ok_or(PlaybackError::NothingLoaded)?;
        sink.try_seek(position)
            .map_err(|e| PlaybackError::Seek(e.to_string()))
    }

    fn set_volume(&mut self, level: f32) {
        self.volume = level;
        if let Some(sink) = &self.sink {
            sink.set_volume(level);
        }
    }
}

/// Wall-clock playback position: the sink does not report one.
#[derive(Debug, Default)]
struct PlaybackClock {
    base: Duration,
    started: Option<Instant>,
}

impl PlaybackClock {
    fn position(&self) -> Duration {
        match self.started {
            Some(started) => self.base + started.elapsed(),
            None => self.base,
        }
    }

    fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        self.base = self.position();
        self.started = None;
    }

    fn set(&mut self, position: Duration) {
        self.base = position;
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }
}

/// Adapter around the single playback source. Owns its tap point, so the
/// graph can only ever tap this element once.
pub struct PlaybackElement<B: MediaBackend = RodioBackend> {
    id: SourceId,
    backend: B,
    tap: TapPoint,
    fetch_mode: FetchMode,
    url: Option<String>,
    info: Option<MediaInfo>,
    clock: PlaybackClock,
    volume: f32,
    playing: bool,
    last_time_update: Option<Instant>,
    event_sender: Sender<PlaybackEvent>,
    event_receiver: Receiver<PlaybackEvent>,
}

impl<B: MediaBackend> PlaybackElement<B> {
    pub fn new(backend: B, fetch_mode: FetchMode) -> Self {
        let id = SourceId::next();
        let (event_sender, event_receiver) = crossbeam_channel::unbounded();
        Self {
            id,
            backend,
            tap: TapPoint::new(id),
            fetch_mode,
            url: None,
            info: None,
            clock: PlaybackClock::default(),
            volume: 1.0,
            playing: false,
            last_time_update: None,
            event_sender,
            event_receiver,
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn tap(&self) -> &TapPoint {
        &self.tap
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn load(&mut self, url: &str) -> Result<(), PlaybackError> {
        self.playing = false;
        self.clock = PlaybackClock::default();
        self.tap.set_ready(false);

        match self.backend.open(url, &self.tap, self.event_sender.clone()) {
            Ok(info) => {
                self.url = Some(url.to_string());
                self.info = Some(info);
                let opaque = self.fetch_mode == FetchMode::NoCors;
                if opaque {
                    warn!("{} is opaque under no-cors; the visualizer will stay flat", url);
                }
                self.tap.set_opaque(opaque);
                self.tap.set_ready(true);
                self.emit(PlaybackEvent::LoadedMetadata(info.duration));
                Ok(())
            }
            // Reported through the return value only; `Error` events are
            // for failures during playback.
            Err(e) => {
                warn!("Cannot load {}: {}", url, e);
                self.url = None;
                self.info = None;
                Err(e)
            }
        }
    }

    pub fn play(&mut self) -> Result<(), PlaybackError> {
        if self.info.is_none() {
            return Err(PlaybackError::NothingLoaded);
        }
        self.backend.play();
        self.clock.start();
        self.playing = true;
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.playing {
            self.backend.pause();
            self.clock.pause();
            self.playing = false;
        }
    }

    /// Stops playback and unloads the media; `load` must be called again.
    pub fn stop(&mut self) {
        self.backend.stop();
        self.clock = PlaybackClock::default();
        self.playing = false;
        self.info = None;
        self.tap.set_ready(false);
    }

    pub fn seek(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        if self.info.is_none() {
            return Err(PlaybackError::NothingLoaded);
        }
        let mut target = Duration::from_secs_f64(seconds.max(0.0));
        if let Some(duration) = self.duration() {
            target = target.min(duration);
        }
        self.backend.seek(target)?;
        self.clock.set(target);
        self.emit(PlaybackEvent::TimeUpdate(target));
        Ok(())
    }

    pub fn set_volume(&mut self, level: f32) -> f32 {
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        self.volume = level;
        self.backend.set_volume(level);
        level
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn position(&self) -> Duration {
        self.clock.position()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.info.and_then(|info| info.duration)
    }

    pub fn current_url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.info.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Drains lifecycle events. Emits a `TimeUpdate` when one is due and
    /// settles the playing flag when the media has ended.
    pub fn poll_events(&mut self) -> Vec<PlaybackEvent> {
        if self.playing {
            let due = self
                .last_time_update
                .map_or(true, |at| at.elapsed() >= TIME_UPDATE_INTERVAL);
            if due {
                self.last_time_update = Some(Instant::now());
                self.emit(PlaybackEvent::TimeUpdate(self.position()));
            }
        }

        let events: Vec<PlaybackEvent> = self.event_receiver.try_iter().collect();
        for event in &events {
            match event {
                PlaybackEvent::Ended => {
                    self.playing = false;
                    self.clock.pause();
                    if let Some(duration) = self.duration() {
                        self.clock.set(duration);
                    }
                }
                PlaybackEvent::Error(reason) => {
                    warn!("Playback error: {}", reason);
                    self.playing = false;
                    self.clock.pause();
                }
                _ => {}
            }
        }
        events
    }

    fn emit(&self, event: PlaybackEvent) {
        let _ = self.event_sender.send(event);
    }
}

impl<B: MediaBackend> Drop for PlaybackElement<B> {
    fn drop(&mut self) {
        self.backend.stop();
    }
}

pub fn is_local_media(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()),
        Some(ext) if ["wav", "mp3", "flac", "ogg", "m4a", "aac"].contains(&ext.as_str())
    )
}
