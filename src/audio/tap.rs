use crossbeam_channel::Sender;
use rodio::source::SeekError;
use rodio::Source;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use super::playback::PlaybackEvent;

/// Mono samples are handed to the analysis ring in blocks of this size.
const FLUSH_BLOCK: usize = 256;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one playback element instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    pub fn next() -> Self {
        Self(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// Linear gain stage. Read on the audio thread, written by volume callers.
#[derive(Debug)]
pub struct GainNode {
    bits: AtomicU32,
}

impl GainNode {
    pub fn new(level: f32) -> Self {
        Self {
            bits: AtomicU32::new(level.to_bits()),
        }
    }

    pub fn set(&self, level: f32) {
        self.bits.store(level.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// Most recent mono samples seen by the tap, bounded to the analysis window.
#[derive(Debug)]
pub struct SampleRing {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push_slice(&mut self, block: &[f32]) {
        for &sample in block {
            if self.samples.len() == self.capacity {
                self.samples.pop_front();
            }
            self.samples.push_back(sample);
        }
    }

    pub fn push_silence(&mut self, len: usize) {
        for _ in 0..len {
            if self.samples.len() == self.capacity {
                self.samples.pop_front();
            }
            self.samples.push_back(0.0);
        }
    }

    /// Copies the newest `out.len()` samples into `out`, zero-padding the front
    /// when fewer are available.
    pub fn copy_latest(&self, out: &mut [f32]) {
        let available = self.samples.len().min(out.len());
        let pad = out.len() - available;
        out[..pad].fill(0.0);
        let skip = self.samples.len() - available;
        for (dst, &src) in out[pad..].iter_mut().zip(self.samples.iter().skip(skip)) {
            *dst = src;
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// The graph side of a tap: gain stage plus the analyser's input ring.
#[derive(Debug)]
pub struct TapLink {
    gain: GainNode,
    ring: Mutex<SampleRing>,
    connected: AtomicBool,
    running: AtomicBool,
    opaque: AtomicBool,
}

impl TapLink {
    pub fn new(window_size: usize, gain: f32) -> Self {
        Self {
            gain: GainNode::new(gain),
            ring: Mutex::new(SampleRing::new(window_size)),
            connected: AtomicBool::new(true),
            running: AtomicBool::new(false),
            opaque: AtomicBool::new(false),
        }
    }

    pub fn gain(&self) -> &GainNode {
        &self.gain
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn disconnect(&self) {
        self.running.store(false, Ordering::Release);
        self.connected.store(false, Ordering::Release);
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn set_opaque(&self, opaque: bool) {
        self.opaque.store(opaque, Ordering::Release);
    }

    /// Feeds a block of mono samples to the analyser. Dropped while suspended.
    pub fn push(&self, block: &[f32]) {
        if !self.is_running() {
            return;
        }
        if let Ok(mut ring) = self.ring.lock() {
            if self.opaque.load(Ordering::Acquire) {
                ring.push_silence(block.len());
            } else {
                ring.push_slice(block);
            }
        }
    }

    pub fn copy_latest(&self, out: &mut [f32]) {
        match self.ring.lock() {
            Ok(ring) => ring.copy_latest(out),
            Err(_) => out.fill(0.0),
        }
    }
}

/// One-shot tap slot owned by a playback element. The decoded stream always
/// flows through it; a graph may attach to it exactly once.
#[derive(Debug, Clone)]
pub struct TapPoint {
    source: SourceId,
    link: Arc<OnceLock<Arc<TapLink>>>,
    ready: Arc<AtomicBool>,
    opaque: Arc<AtomicBool>,
}

impl TapPoint {
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            link: Arc::new(OnceLock::new()),
            ready: Arc::new(AtomicBool::new(false)),
            opaque: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Returns the link back if this element already carries a tap.
    pub fn attach(&self, link: Arc<TapLink>) -> Result<(), Arc<TapLink>> {
        link.set_opaque(self.opaque.load(Ordering::Acquire));
        self.link.set(link)
    }

    pub fn is_tapped(&self) -> bool {
        self.link.get().is_some()
    }

    pub fn link(&self) -> Option<&Arc<TapLink>> {
        self.link.get()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub(crate) fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub(crate) fn set_opaque(&self, opaque: bool) {
        self.opaque.store(opaque, Ordering::Release);
        if let Some(link) = self.link.get() {
            link.set_opaque(opaque);
        }
    }

    pub fn wrap<S>(&self, inner: S, ended: Option<Sender<PlaybackEvent>>) -> TapSource<S>
    where
        S: Source<Item = f32>,
    {
        TapSource::new(inner, self.clone(), ended)
    }
}

/// Source adapter that routes decoded samples through the tap: mirrors a
/// mono mixdown of the raw signal into the analysis ring, then applies the
/// graph's gain to the output. A disconnected link keeps its last gain.
pub struct TapSource<S> {
    inner: S,
    tap: TapPoint,
    channels: usize,
    frame_sum: f32,
    frame_pos: usize,
    pending: Vec<f32>,
    ended: Option<Sender<PlaybackEvent>>,
}

impl<S> TapSource<S>
where
    S: Source<Item = f32>,
{
    fn new(inner: S, tap: TapPoint, ended: Option<Sender<PlaybackEvent>>) -> Self {
        let channels = inner.channels().max(1) as usize;
        Self {
            inner,
            tap,
            channels,
            frame_sum: 0.0,
            frame_pos: 0,
            pending: Vec::with_capacity(FLUSH_BLOCK),
            ended,
        }
    }

    fn flush(&mut self, link: &TapLink) {
        if !self.pending.is_empty() {
            link.push(&self.pending);
            self.pending.clear();
        }
    }
}

impl<S> Iterator for TapSource<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let Some(sample) = self.inner.next() else {
            if let Some(link) = self.tap.link().cloned() {
                self.flush(&link);
            }
            if let Some(ended) = self.ended.take() {
                let _ = ended.send(PlaybackEvent::Ended);
            }
            return None;
        };

        let Some(link) = self.tap.link().cloned() else {
            return Some(sample);
        };

        if link.is_connected() {
            self.frame_sum += sample;
            self.frame_pos += 1;
            if self.frame_pos == self.channels {
                self.pending.push(self.frame_sum / self.channels as f32);
                self.frame_sum = 0.0;
                self.frame_pos = 0;
                if self.pending.len() >= FLUSH_BLOCK {
                    self.flush(&link);
                }
            }
        }
        Some(sample * link.gain().get())
    }
}

impl<S> Source for TapSource<S>
where
    S: Source<Item = f32>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), SeekError> {
        self.frame_sum = 0.0;
        self.frame_pos = 0;
        self.pending.clear();
        self.inner.try_seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rodio::source::SineWave;

    fn running_link(window: usize) -> Arc<TapLink> {
        let link = Arc::new(TapLink::new(window, 1.0));
        link.set_running(true);
        link
    }

    #[test]
    fn ring_keeps_only_newest_samples() {
        let mut ring = SampleRing::new(4);
        ring.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut out = [0.0; 4];
        ring.copy_latest(&mut out);
        assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn ring_zero_pads_short_history() {
        let mut ring = SampleRing::new(8);
        ring.push_slice(&[0.5, 0.25]);
        let mut out = [9.0; 4];
        ring.copy_latest(&mut out);
        assert_eq!(out, [0.0, 0.0, 0.5, 0.25]);
    }

    #[test]
    fn second_attach_is_rejected() {
        let tap = TapPoint::new(SourceId::next());
        assert!(tap.attach(running_link(64)).is_ok());
        assert!(tap.attach(running_link(64)).is_err());
        assert!(tap.is_tapped());
    }

    #[test]
    fn untapped_source_passes_samples_through() {
        let tap = TapPoint::new(SourceId::next());
        let input: Vec<f32> = SineWave::new(440.0).take(32).collect();
        let output: Vec<f32> = tap.wrap(SineWave::new(440.0), None).take(32).collect();
        assert_eq!(input, output);
    }

    #[test]
    fn gain_is_applied_on_the_tapped_path() {
        let tap = TapPoint::new(SourceId::next());
        let link = running_link(64);
        link.gain().set(0.5);
        tap.attach(link).unwrap();

        let input: Vec<f32> = SineWave::new(440.0).take(64).collect();
        let output: Vec<f32> = tap.wrap(SineWave::new(440.0), None).take(64).collect();
        for (i, o) in input.iter().zip(&output) {
            approx::assert_abs_diff_eq!(i * 0.5, *o, epsilon = 1e-6);
        }
    }

    #[test]
    fn analyser_sees_the_signal_before_gain() {
        let tap = TapPoint::new(SourceId::next());
        let link = running_link(256);
        link.gain().set(0.0);
        tap.attach(Arc::clone(&link)).unwrap();

        let expected: Vec<f32> = SineWave::new(440.0).take(256).collect();
        let played: Vec<f32> = tap.wrap(SineWave::new(440.0), None).take(256).collect();
        assert!(played.iter().all(|&s| s == 0.0));

        let mut seen = vec![0.0; 256];
        link.copy_latest(&mut seen);
        for (e, s) in expected.iter().zip(&seen) {
            approx::assert_abs_diff_eq!(*e, *s, epsilon = 1e-6);
        }
    }

    #[test]
    fn disconnected_link_keeps_its_last_gain() {
        let tap = TapPoint::new(SourceId::next());
        let link = running_link(64);
        link.gain().set(0.25);
        tap.attach(Arc::clone(&link)).unwrap();
        link.disconnect();

        let input: Vec<f32> = SineWave::new(440.0).take(32).collect();
        let output: Vec<f32> = tap.wrap(SineWave::new(440.0), None).take(32).collect();
        for (i, o) in input.iter().zip(&output) {
            approx::assert_abs_diff_eq!(i * 0.25, *o, epsilon = 1e-6);
        }
    }

    #[test]
    fn ring_pushes_silence_in_place() {
        let mut ring = SampleRing::new(4);
        ring.push_slice(&[1.0, 2.0, 3.0]);
        ring.push_silence(2);
        let mut out = [9.0; 4];
        ring.copy_latest(&mut out);
        assert_eq!(out, [2.0, 3.0, 0.0, 0.0]);
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn suspended_link_does_not_feed_the_analyser() {
        let tap = TapPoint::new(SourceId::next());
        let link = Arc::new(TapLink::new(512, 1.0));
        tap.attach(Arc::clone(&link)).unwrap();

        let _: Vec<f32> = tap.wrap(SineWave::new(440.0), None).take(1024).collect();
        let mut out = vec![1.0; 512];
        link.copy_latest(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn opaque_media_feeds_silence() {
        let tap = TapPoint::new(SourceId::next());
        tap.set_opaque(true);
        let link = running_link(512);
        tap.attach(Arc::clone(&link)).unwrap();

        let played: Vec<f32> = tap.wrap(SineWave::new(440.0), None).take(1024).collect();
        assert!(played.iter().any(|&s| s != 0.0));

        let mut out = vec![1.0; 512];
        link.copy_latest(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn exhausted_source_reports_ended_once() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let tap = TapPoint::new(SourceId::next());
        let mut source = tap.wrap(SineWave::new(440.0).take_duration(Duration::from_millis(5)), Some(tx));
        while source.next().is_some() {}
        assert!(source.next().is_none());
        assert_eq!(rx.try_iter().count(), 1);
    }
}
