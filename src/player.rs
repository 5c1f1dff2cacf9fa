use log::{debug, info, trace, warn};
use std::time::{Duration, Instant};

use crate::audio::{
    AudioHost, BandLevels, FrameSampler, GraphError, MediaBackend, PlaybackElement, PlaybackError,
    PlaybackEvent, SignalGraph, UserGesture,
};
use crate::driver::{AnimationDriver, FrameHandle, FrameScheduler};
use crate::graphics::{render, ColorScheme, Surface, VisualParameters, VisualizerType};
use crate::notify::Notifications;

/// Ties the playback element, the analysis graph, the frame driver and the
/// renderer together. Owned by the event loop; all calls come from one thread.
pub struct Player<B: MediaBackend, H: AudioHost, S: FrameScheduler> {
    element: PlaybackElement<B>,
    graph: SignalGraph<H>,
    sampler: FrameSampler,
    driver: AnimationDriver<S>,
    params: VisualParameters,
    color_scheme: ColorScheme,
    volume: f32,
    notifications: Notifications,
    pipeline_enabled: bool,
    last_bands: Option<(BandLevels, bool)>,
}

impl<B: MediaBackend, H: AudioHost, S: FrameScheduler> Player<B, H, S> {
    pub fn new(
        element: PlaybackElement<B>,
        graph: SignalGraph<H>,
        sampler: FrameSampler,
        scheduler: S,
        params: VisualParameters,
        color_scheme: ColorScheme,
    ) -> Self {
        let mut player = Self {
            element,
            graph,
            sampler,
            driver: AnimationDriver::new(scheduler),
            params,
            color_scheme,
            volume: 1.0,
            notifications: Notifications::default(),
            pipeline_enabled: true,
            last_bands: None,
        };
        player.set_volume(1.0);
        player
    }

    pub fn element(&self) -> &PlaybackElement<B> {
        &self.element
    }

    pub fn graph(&self) -> &SignalGraph<H> {
        &self.graph
    }

    pub fn driver(&self) -> &AnimationDriver<S> {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut AnimationDriver<S> {
        &mut self.driver
    }

    pub fn sampler(&self) -> &FrameSampler {
        &self.sampler
    }

    pub fn visual_parameters(&self) -> &VisualParameters {
        &self.params
    }

    pub fn color_scheme(&self) -> ColorScheme {
        self.color_scheme
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    /// False once the host has no audio output for analysis; playback
    /// continues without a visualizer.
    pub fn pipeline_enabled(&self) -> bool {
        self.pipeline_enabled
    }

    /// Bands and beat flag of the last rendered frame.
    pub fn last_bands(&self) -> Option<(BandLevels, bool)> {
        self.last_bands
    }

    pub fn is_playing(&self) -> bool {
        self.element.is_playing()
    }

    pub fn load(&mut self, url: &str) -> Result<(), PlaybackError> {
        self.driver.stop();
        self.last_bands = None;
        if let Err(e) = self.element.load(url) {
            self.notify(format!("Cannot load track: {}", e));
            return Err(e);
        }
        info!("Loaded {}", url);
        Ok(())
    }

    /// Starts playback. The analysis graph is built and bound on the first
    /// call; `gesture` lets it resume under a user-gesture autoplay policy.
    pub fn play(&mut self, gesture: Option<&UserGesture>) -> Result<(), PlaybackError> {
        if !self.element.is_loaded() {
            return Err(PlaybackError::NothingLoaded);
        }
        self.ensure_graph(gesture);
        if let Err(e) = self.element.play() {
            self.notify(format!("Cannot start playback: {}", e));
            return Err(e);
        }
        self.driver.start();
        Ok(())
    }

    fn ensure_graph(&mut self, gesture: Option<&UserGesture>) {
        if !self.pipeline_enabled {
            return;
        }
        match self.graph.bind(self.element.tap()) {
            Ok(()) => self.apply_volume(),
            Err(GraphError::AlreadyBound(source)) => trace!("{} already tapped", source),
            Err(GraphError::UnsupportedPlatform) => {
                warn!("Audio analysis unavailable, visualizer disabled");
                self.pipeline_enabled = false;
                self.notify("Visualizer unavailable on this system");
                return;
            }
            Err(e) => {
                warn!("Cannot bind analysis graph: {}", e);
                return;
            }
        }
        if let Err(e) = self.graph.resume(gesture) {
            debug!("Graph not resumed: {}", e);
        }
    }

    pub fn pause(&mut self) {
        self.element.pause();
        self.driver.stop();
        self.graph.suspend();
    }

    pub fn stop(&mut self) {
        self.element.stop();
        self.driver.stop();
        self.graph.suspend();
        self.last_bands = None;
    }

    pub fn toggle(&mut self, gesture: Option<&UserGesture>) -> Result<(), PlaybackError> {
        if self.element.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play(gesture)
        }
    }

    pub fn seek(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        self.element.seek(seconds)
    }

    pub fn seek_by(&mut self, delta: f64) -> Result<(), PlaybackError> {
        let target = self.element.position().as_secs_f64() + delta;
        self.seek(target.max(0.0))
    }

    /// Sets the output level; returns the clamped value. Once the graph is
    /// bound its gain stage carries the level and the element stays at unity.
    pub fn set_volume(&mut self, level: f32) -> f32 {
        self.volume = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        self.apply_volume();
        self.volume
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn apply_volume(&mut self) {
        self.graph.set_volume(self.volume);
        if self.graph.is_bound_to(self.element.id()) {
            self.element.set_volume(1.0);
        } else {
            self.element.set_volume(self.volume);
        }
    }

    pub fn set_visualizer(&mut self, variant: VisualizerType) {
        self.params.variant = variant;
    }

    pub fn set_color_scheme(&mut self, scheme: ColorScheme) {
        self.color_scheme = scheme;
        self.params.color = scheme.palette().base;
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        if sensitivity > 0.0 {
            self.params.sensitivity = sensitivity;
        }
    }

    /// Handles one display-refresh callback. Returns whether a frame was drawn.
    pub fn on_frame(&mut self, handle: FrameHandle, surface: &mut dyn Surface) -> bool {
        let playing = self.element.is_playing();
        let Self {
            driver,
            graph,
            sampler,
            params,
            pipeline_enabled,
            last_bands,
            ..
        } = self;

        let mut drawn = false;
        driver.tick(handle, playing, || {
            if !*pipeline_enabled {
                render(&mut *surface, &[], params);
                drawn = true;
                return;
            }
            match sampler.sample(graph) {
                Ok(frame) => {
                    render(&mut *surface, frame.snapshot, params);
                    *last_bands = Some((frame.bands, frame.beat));
                    drawn = true;
                }
                Err(GraphError::SampleNotReady) => trace!("Analysis not running, frame skipped"),
                Err(e) => warn!("Sampling failed: {}", e),
            }
        });
        drawn
    }

    /// Drains playback events and expires notifications. Returns the events
    /// so the caller can react to them (auto-advance on `Ended`).
    pub fn poll(&mut self, now: Instant) -> Vec<PlaybackEvent> {
        let events = self.element.poll_events();
        for event in &events {
            match event {
                // The graph keeps running so the next track needs no new gesture.
                PlaybackEvent::Ended => {
                    debug!("Track ended");
                    self.driver.stop();
                }
                PlaybackEvent::Error(reason) => self.handle_playback_error(reason),
                PlaybackEvent::LoadedMetadata(duration) => {
                    debug!("Metadata loaded, duration {:?}", duration)
                }
                PlaybackEvent::TimeUpdate(_) => {}
            }
        }
        self.notifications.prune(now);
        events
    }

    fn handle_playback_error(&mut self, reason: &str) {
        self.element.pause();
        self.driver.stop();
        self.graph.suspend();
        self.notify(format!("Playback failed: {}", reason));
    }

    fn notify(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.notifications.push(message, Instant::now());
    }

    /// Position and duration for display.
    pub fn progress(&self) -> (Duration, Option<Duration>) {
        (self.element.position(), self.element.duration())
    }

    pub fn teardown(&mut self) {
        self.driver.stop();
        self.element.stop();
        self.graph.teardown();
    }
}

impl<B: MediaBackend, H: AudioHost, S: FrameScheduler> Drop for Player<B, H, S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
