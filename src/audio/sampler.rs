use log::trace;

use super::bands::{bands, detect_beat, BandLevels, FrequencySnapshot, DEFAULT_BEAT_THRESHOLD};
use super::graph::{AudioHost, GraphError, SignalGraph};

/// One driven frame of analysis. Borrows the graph's snapshot buffer, which
/// the next sampling call overwrites.
#[derive(Debug)]
pub struct AnalysisFrame<'a> {
    pub snapshot: &'a FrequencySnapshot,
    pub bands: BandLevels,
    pub beat: bool,
}

/// Pulls one snapshot per frame from the graph and derives bands and beats.
pub struct FrameSampler {
    beat_threshold: f32,
    frames: u64,
    beats: u64,
}

impl FrameSampler {
    pub fn new(beat_threshold: f32) -> Self {
        Self {
            beat_threshold,
            frames: 0,
            beats: 0,
        }
    }

    pub fn beat_threshold(&self) -> f32 {
        self.beat_threshold
    }

    pub fn set_beat_threshold(&mut self, threshold: f32) {
        self.beat_threshold = threshold.clamp(0.0, 255.0);
    }

    pub fn sample<'g, H: AudioHost>(
        &mut self,
        graph: &'g mut SignalGraph<H>,
    ) -> Result<AnalysisFrame<'g>, GraphError> {
        let snapshot = graph.sample_frequencies()?;
        let levels = bands(snapshot);
        let beat = detect_beat(snapshot, self.beat_threshold);

        self.frames += 1;
        if beat {
            self.beats += 1;
            trace!(
                "Beat on frame {} (bass {:.1}, avg {:.1})",
                self.frames,
                levels.bass,
                levels.average
            );
        }

        Ok(AnalysisFrame {
            snapshot,
            bands: levels,
            beat,
        })
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn beats(&self) -> u64 {
        self.beats
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new(DEFAULT_BEAT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::graph::{AutoplayPolicy, GraphConfig};
    use crate::audio::playback::{FetchMode, PlaybackElement};
    use crate::testing::{FakeBackend, FakeHost};
    use rodio::source::{SineWave, Source};
    use std::time::Duration;

    #[test]
    fn not_ready_graph_yields_no_frame() {
        let mut graph = SignalGraph::new(FakeHost::supported(), GraphConfig::default());
        let mut sampler = FrameSampler::default();
        assert!(matches!(sampler.sample(&mut graph), Err(GraphError::SampleNotReady)));
        assert_eq!(sampler.frames(), 0);
    }

    #[test]
    fn loud_bass_registers_a_beat() {
        let mut element = PlaybackElement::new(FakeBackend::default(), FetchMode::Cors);
        element.load("bass.wav").unwrap();
        let mut graph = SignalGraph::new(
            FakeHost::supported(),
            GraphConfig {
                smoothing_time_constant: 0.0,
                autoplay: AutoplayPolicy::Allowed,
                ..GraphConfig::default()
            },
        );
        graph.bind(element.tap()).unwrap();

        // 375 Hz sits in bin 2 of a 256-point window at 48 kHz.
        let tone = SineWave::new(375.0).take_duration(Duration::from_millis(20));
        let _: Vec<f32> = element.tap().wrap(tone, None).collect();

        let mut sampler = FrameSampler::new(10.0);
        let frame = sampler.sample(&mut graph).unwrap();
        assert_eq!(frame.snapshot.len(), 128);
        assert!(frame.bands.bass > frame.bands.treble);
        assert!(frame.beat);
        assert_eq!(sampler.beats(), 1);
    }

    #[test]
    fn threshold_is_kept_on_the_byte_scale() {
        let mut sampler = FrameSampler::default();
        assert_eq!(sampler.beat_threshold(), 200.0);
        sampler.set_beat_threshold(400.0);
        assert_eq!(sampler.beat_threshold(), 255.0);
    }
}
