use cpal::traits::{DeviceTrait, HostTrait};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use super::analyser::Analyser;
use super::bands::FrequencySnapshot;
use super::tap::{SourceId, TapLink, TapPoint};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("no audio output available on this host")]
    UnsupportedPlatform,
    #[error("{0} is already tapped")]
    AlreadyBound(SourceId),
    #[error("graph belongs to {bound}, not {requested}")]
    SourceMismatch { bound: SourceId, requested: SourceId },
    #[error("{0} has no media loaded yet")]
    SourceNotReady(SourceId),
    #[error("resume rejected: {0}")]
    ResumeFailure(&'static str),
    #[error("analysis graph is not running")]
    SampleNotReady,
    #[error("analysis graph is closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    Uninitialized,
    Constructed,
    Connected,
    Suspended,
    Running,
    Closed,
}

/// Whether the host lets the graph run before a user interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoplayPolicy {
    #[default]
    UserGesture,
    Allowed,
}

/// Proof that a user interaction just happened. Minted by the input layer.
#[derive(Debug)]
pub struct UserGesture(());

impl UserGesture {
    pub fn from_input() -> Self {
        Self(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphConfig {
    pub fft_size: usize,
    pub smoothing_time_constant: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
    pub autoplay: AutoplayPolicy,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            fft_size: 256,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
            autoplay: AutoplayPolicy::UserGesture,
        }
    }
}

/// Audio processing context handed out by a host.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextInfo {
    pub sample_rate: u32,
    pub device_name: String,
}

/// Checks for the platform's audio-processing primitive.
pub trait AudioHost {
    fn open_context(&self) -> Result<ContextInfo, GraphError>;
}

/// Default output device as reported by cpal.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalHost;

impl AudioHost for CpalHost {
    fn open_context(&self) -> Result<ContextInfo, GraphError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(GraphError::UnsupportedPlatform)?;
        let config = device.default_output_config().map_err(|e| {
            warn!("Failed to query output config: {}", e);
            GraphError::UnsupportedPlatform
        })?;

        Ok(ContextInfo {
            sample_rate: config.sample_rate().0,
            device_name: device.name().unwrap_or_else(|_| "Unknown".to_string()),
        })
    }
}

/// Analysis graph: tap -> analyser -> gain -> destination.
///
/// Built lazily on first playback, bound once to one playback element, and
/// closed on teardown. Sampling only yields data while `Running`.
pub struct SignalGraph<H: AudioHost = CpalHost> {
    host: H,
    config: GraphConfig,
    state: GraphState,
    context: Option<ContextInfo>,
    source: Option<SourceId>,
    link: Option<Arc<TapLink>>,
    analyser: Option<Analyser>,
    volume: f32,
}

impl<H: AudioHost> SignalGraph<H> {
    pub fn new(host: H, config: GraphConfig) -> Self {
        Self {
            host,
            config,
            state: GraphState::Uninitialized,
            context: None,
            source: None,
            link: None,
            analyser: None,
            volume: 1.0,
        }
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn context(&self) -> Option<&ContextInfo> {
        self.context.as_ref()
    }

    pub fn is_bound_to(&self, source: SourceId) -> bool {
        self.source == Some(source)
            && matches!(
                self.state,
                GraphState::Connected | GraphState::Suspended | GraphState::Running
            )
    }

    /// Builds the context, analyser and gain stage for `tap`'s element.
    /// A no-op when already constructed for that element.
    pub fn construct(&mut self, tap: &TapPoint) -> Result<(), GraphError> {
        match self.state {
            GraphState::Closed => return Err(GraphError::Closed),
            GraphState::Uninitialized => {}
            _ => {
                return match self.source {
                    Some(bound) if bound == tap.source() => Ok(()),
                    Some(bound) => Err(GraphError::SourceMismatch {
                        bound,
                        requested: tap.source(),
                    }),
                    None => Ok(()),
                };
            }
        }

        let context = self.host.open_context()?;
        info!(
            "Audio context opened on '{}' at {} Hz",
            context.device_name, context.sample_rate
        );

        self.analyser = Some(Analyser::new(
            self.config.fft_size,
            self.config.smoothing_time_constant,
            self.config.min_decibels,
            self.config.max_decibels,
        ));
        self.link = Some(Arc::new(TapLink::new(self.config.fft_size, self.volume)));
        self.context = Some(context);
        self.source = Some(tap.source());
        self.state = GraphState::Constructed;
        debug!("Signal graph constructed for {}", tap.source());
        Ok(())
    }

    /// Taps the element once and wires tap -> analyser -> gain -> destination.
    ///
    /// `AlreadyBound` is a warning for callers: the existing tap stays in use.
    pub fn bind(&mut self, tap: &TapPoint) -> Result<(), GraphError> {
        self.construct(tap)?;
        if self.is_bound_to(tap.source()) {
            return Err(GraphError::AlreadyBound(tap.source()));
        }
        if !tap.is_ready() {
            return Err(GraphError::SourceNotReady(tap.source()));
        }

        let link = match &self.link {
            Some(link) => Arc::clone(link),
            None => return Err(GraphError::Closed),
        };
        if tap.attach(Arc::clone(&link)).is_err() {
            return Err(GraphError::AlreadyBound(tap.source()));
        }

        self.state = GraphState::Connected;
        info!(
            "Tapped {} (fft size {}, smoothing {:.2})",
            tap.source(),
            self.config.fft_size,
            self.config.smoothing_time_constant
        );

        match self.config.autoplay {
            AutoplayPolicy::Allowed => {
                link.set_running(true);
                self.state = GraphState::Running;
            }
            AutoplayPolicy::UserGesture => {
                self.state = GraphState::Suspended;
                debug!("Graph suspended until a user gesture");
            }
        }
        Ok(())
    }

    pub fn resume(&mut self, gesture: Option<&UserGesture>) -> Result<(), GraphError> {
        match self.state {
            GraphState::Running => Ok(()),
            GraphState::Suspended => {
                if self.config.autoplay == AutoplayPolicy::UserGesture && gesture.is_none() {
                    return Err(GraphError::ResumeFailure("no user gesture yet"));
                }
                if let Some(link) = &self.link {
                    link.set_running(true);
                }
                self.state = GraphState::Running;
                info!("Signal graph running");
                Ok(())
            }
            GraphState::Closed => Err(GraphError::Closed),
            _ => Err(GraphError::ResumeFailure("graph is not connected")),
        }
    }

    pub fn suspend(&mut self) {
        if self.state == GraphState::Running {
            if let Some(link) = &self.link {
                link.set_running(false);
            }
            self.state = GraphState::Suspended;
            debug!("Signal graph suspended");
        }
    }

    pub fn sample_frequencies(&mut self) -> Result<&FrequencySnapshot, GraphError> {
        let analyser = self.running_analyser()?;
        Ok(analyser.frequency_data())
    }

    pub fn sample_time_domain(&mut self) -> Result<&[u8], GraphError> {
        let analyser = self.running_analyser()?;
        Ok(analyser.time_domain_data())
    }

    fn running_analyser(&mut self) -> Result<&mut Analyser, GraphError> {
        if self.state != GraphState::Running {
            return Err(GraphError::SampleNotReady);
        }
        match (self.analyser.as_mut(), self.link.as_ref()) {
            (Some(analyser), Some(link)) => {
                link.copy_latest(analyser.input_mut());
                Ok(analyser)
            }
            _ => Err(GraphError::SampleNotReady),
        }
    }

    /// Clamps `level` to [0, 1] and applies it to the gain stage at once.
    /// Remembered and applied at construction if the graph is not built yet.
    pub fn set_volume(&mut self, level: f32) -> f32 {
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        self.volume = level;
        if let Some(link) = &self.link {
            link.gain().set(level);
        }
        level
    }

    pub fn volume(&self) -> f32 {
        match &self.link {
            Some(link) => link.gain().get(),
            None => self.volume,
        }
    }

    /// Disconnects tap, analyser and gain in that order, then closes the
    /// context. Safe to call repeatedly and on a graph never constructed.
    /// Audio still flowing through the tap afterwards keeps the last gain.
    pub fn teardown(&mut self) {
        match self.state {
            GraphState::Uninitialized | GraphState::Closed => return,
            _ => {}
        }

        if let Some(link) = self.link.take() {
            link.disconnect();
            debug!("Tap disconnected");
        }
        if self.analyser.take().is_some() {
            debug!("Analyser disconnected");
        }
        debug!("Gain stage disconnected");
        if let Some(context) = self.context.take() {
            info!("Audio context on '{}' closed", context.device_name);
        }
        self.state = GraphState::Closed;
    }
}

impl<H: AudioHost> Drop for SignalGraph<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::playback::{FetchMode, PlaybackElement};
    use crate::testing::{FakeBackend, FakeHost};
    use rodio::source::{SineWave, Source};

    fn loaded_element() -> PlaybackElement<FakeBackend> {
        let mut element = PlaybackElement::new(FakeBackend::default(), FetchMode::Cors);
        element.load("tone.wav").unwrap();
        element
    }

    fn graph(autoplay: AutoplayPolicy) -> SignalGraph<FakeHost> {
        SignalGraph::new(
            FakeHost::supported(),
            GraphConfig {
                autoplay,
                ..GraphConfig::default()
            },
        )
    }

    #[test]
    fn construct_fails_without_audio_output() {
        let element = loaded_element();
        let mut graph = SignalGraph::new(FakeHost::unsupported(), GraphConfig::default());
        assert_eq!(graph.construct(element.tap()), Err(GraphError::UnsupportedPlatform));
        assert_eq!(graph.state(), GraphState::Uninitialized);
    }

    #[test]
    fn construct_is_idempotent_for_the_same_source() {
        let element = loaded_element();
        let mut graph = graph(AutoplayPolicy::UserGesture);
        graph.construct(element.tap()).unwrap();
        graph.construct(element.tap()).unwrap();
        assert_eq!(graph.state(), GraphState::Constructed);
        assert_eq!(graph.host.opened(), 1);
    }

    #[test]
    fn graph_refuses_a_second_element() {
        let first = loaded_element();
        let second = loaded_element();
        let mut graph = graph(AutoplayPolicy::Allowed);
        graph.bind(first.tap()).unwrap();
        assert!(matches!(
            graph.bind(second.tap()),
            Err(GraphError::SourceMismatch { .. })
        ));
        assert!(!second.tap().is_tapped());
    }

    #[test]
    fn bind_waits_for_loaded_media() {
        let element = PlaybackElement::new(FakeBackend::default(), FetchMode::Cors);
        let mut graph = graph(AutoplayPolicy::Allowed);
        assert_eq!(
            graph.bind(element.tap()),
            Err(GraphError::SourceNotReady(element.id()))
        );
        assert!(!element.tap().is_tapped());
    }

    #[test]
    fn sampling_before_bind_is_not_ready() {
        let element = loaded_element();
        let mut graph = graph(AutoplayPolicy::Allowed);
        assert_eq!(graph.sample_frequencies().err(), Some(GraphError::SampleNotReady));
        graph.construct(element.tap()).unwrap();
        assert_eq!(graph.sample_frequencies().err(), Some(GraphError::SampleNotReady));
        assert_eq!(graph.sample_time_domain().err(), Some(GraphError::SampleNotReady));
    }

    #[test]
    fn gesture_policy_starts_suspended() {
        let element = loaded_element();
        let mut graph = graph(AutoplayPolicy::UserGesture);
        graph.bind(element.tap()).unwrap();
        assert_eq!(graph.state(), GraphState::Suspended);
        assert_eq!(graph.sample_frequencies().err(), Some(GraphError::SampleNotReady));

        assert!(matches!(graph.resume(None), Err(GraphError::ResumeFailure(_))));
        assert_eq!(graph.state(), GraphState::Suspended);

        graph.resume(Some(&UserGesture::from_input())).unwrap();
        assert_eq!(graph.state(), GraphState::Running);
        assert_eq!(graph.sample_frequencies().unwrap().len(), 128);

        graph.resume(None).unwrap();
        assert_eq!(graph.state(), GraphState::Running);
    }

    #[test]
    fn suspend_and_resume_toggle_running() {
        let element = loaded_element();
        let mut graph = graph(AutoplayPolicy::Allowed);
        graph.bind(element.tap()).unwrap();
        assert_eq!(graph.state(), GraphState::Running);
        graph.suspend();
        assert_eq!(graph.state(), GraphState::Suspended);
        graph.resume(None).unwrap();
        assert_eq!(graph.state(), GraphState::Running);
    }

    #[test]
    fn resume_before_bind_is_rejected() {
        let mut graph = graph(AutoplayPolicy::Allowed);
        assert!(matches!(graph.resume(None), Err(GraphError::ResumeFailure(_))));
        assert_eq!(graph.state(), GraphState::Uninitialized);
    }

    #[test]
    fn repeated_bind_leaves_a_single_tap() {
        let element = loaded_element();
        let mut graph = graph(AutoplayPolicy::Allowed);
        graph.construct(element.tap()).unwrap();
        graph.bind(element.tap()).unwrap();
        graph.construct(element.tap()).unwrap();
        assert_eq!(graph.bind(element.tap()), Err(GraphError::AlreadyBound(element.id())));
        assert_eq!(graph.state(), GraphState::Running);

        // A full-scale tone at half amplitude must arrive once, not summed twice.
        let tone = SineWave::new(1000.0).amplify(0.5).take_duration(std::time::Duration::from_millis(50));
        let played: Vec<f32> = element.tap().wrap(tone, None).collect();
        assert!(!played.is_empty());

        let time = graph.sample_time_domain().unwrap();
        let peak = time.iter().map(|&v| (v as i32 - 128).abs()).max().unwrap();
        assert!((60..=64).contains(&peak), "peak deviation {peak}");
    }

    #[test]
    fn muted_gain_leaves_analysis_untouched() {
        let element = loaded_element();
        let mut graph = graph(AutoplayPolicy::Allowed);
        graph.bind(element.tap()).unwrap();
        assert_eq!(graph.set_volume(0.0), 0.0);

        let tone = SineWave::new(1000.0).amplify(0.5).take_duration(std::time::Duration::from_millis(50));
        let played: Vec<f32> = element.tap().wrap(tone, None).collect();
        assert!(played.iter().all(|&s| s == 0.0));

        let time = graph.sample_time_domain().unwrap();
        let peak = time.iter().map(|&v| (v as i32 - 128).abs()).max().unwrap();
        assert!((60..=64).contains(&peak), "peak deviation {peak}");
    }

    #[test]
    fn a_second_graph_cannot_retap_an_element() {
        let element = loaded_element();
        let mut first = graph(AutoplayPolicy::Allowed);
        first.bind(element.tap()).unwrap();

        let mut second = graph(AutoplayPolicy::Allowed);
        assert_eq!(second.bind(element.tap()), Err(GraphError::AlreadyBound(element.id())));
    }

    #[test]
    fn volume_is_clamped_and_applied_to_gain() {
        let element = loaded_element();
        let mut graph = graph(AutoplayPolicy::Allowed);
        assert_eq!(graph.set_volume(-0.5), 0.0);
        assert_eq!(graph.set_volume(2.0), 1.0);
        assert_eq!(graph.set_volume(0.4), 0.4);
        assert_eq!(graph.volume(), 0.4);

        graph.bind(element.tap()).unwrap();
        assert_eq!(graph.volume(), 0.4);
        assert_eq!(graph.set_volume(7.0), 1.0);
        assert_eq!(element.tap().link().unwrap().gain().get(), 1.0);
        assert_eq!(graph.set_volume(f32::NAN), 0.0);
    }

    #[test]
    fn teardown_is_idempotent() {
        let element = loaded_element();
        let mut graph = graph(AutoplayPolicy::Allowed);
        graph.bind(element.tap()).unwrap();

        graph.teardown();
        assert_eq!(graph.state(), GraphState::Closed);
        assert!(!element.tap().link().unwrap().is_connected());
        graph.teardown();
        assert_eq!(graph.state(), GraphState::Closed);
        assert!(graph.context().is_none());
        assert_eq!(graph.sample_frequencies().err(), Some(GraphError::SampleNotReady));
        assert_eq!(graph.construct(element.tap()), Err(GraphError::Closed));
    }

    #[test]
    fn teardown_of_unbuilt_graph_is_a_no_op() {
        let mut graph = graph(AutoplayPolicy::Allowed);
        graph.teardown();
        graph.teardown();
        assert_eq!(graph.state(), GraphState::Uninitialized);
    }
}
