use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Real-time spectrum analyser over the most recent `fft_size` samples.
///
/// Magnitudes are smoothed over time with `smoothing_time_constant` and mapped
/// from the `[min_decibels, max_decibels]` range onto bytes `0..=255`, so one
/// call yields a frame that can be drawn directly.
pub struct Analyser {
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,

    input: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    frequency_bytes: Vec<u8>,
    time_bytes: Vec<u8>,
}

impl Analyser {
    pub fn new(fft_size: usize, smoothing: f32, min_decibels: f32, max_decibels: f32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let bins = fft_size / 2;

        Self {
            fft_size,
            fft,
            window: Self::blackman_window(fft_size),
            smoothing,
            min_decibels,
            max_decibels,
            input: vec![0.0; fft_size],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; bins],
            frequency_bytes: vec![0; bins],
            time_bytes: vec![128; fft_size],
        }
    }

    fn blackman_window(size: usize) -> Vec<f32> {
        const A0: f32 = 0.42;
        const A1: f32 = 0.5;
        const A2: f32 = 0.08;
        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
                A0 - A1 * phase.cos() + A2 * (2.0 * phase).cos()
            })
            .collect()
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn smoothing_time_constant(&self) -> f32 {
        self.smoothing
    }

    /// Time-domain input window; the graph refills it before each read.
    pub fn input_mut(&mut self) -> &mut [f32] {
        &mut self.input
    }

    pub fn frequency_data(&mut self) -> &[u8] {
        for ((slot, &sample), &w) in self.scratch.iter_mut().zip(&self.input).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let norm = 1.0 / self.fft_size as f32;
        let tau = self.smoothing;
        for (previous, bin) in self.smoothed.iter_mut().zip(&self.scratch) {
            let magnitude = bin.norm() * norm;
            let value = tau * *previous + (1.0 - tau) * magnitude;
            *previous = if value.is_finite() { value } else { 0.0 };
        }

        let range = self.max_decibels - self.min_decibels;
        for (byte, &magnitude) in self.frequency_bytes.iter_mut().zip(&self.smoothed) {
            let db = 20.0 * magnitude.log10();
            let scaled = 255.0 * (db - self.min_decibels) / range;
            *byte = scaled.clamp(0.0, 255.0) as u8;
        }
        &self.frequency_bytes
    }

    pub fn time_domain_data(&mut self) -> &[u8] {
        for (byte, &sample) in self.time_bytes.iter_mut().zip(&self.input) {
            *byte = (128.0 * (1.0 + sample)).clamp(0.0, 255.0) as u8;
        }
        &self.time_bytes
    }

    /// Forgets smoothing history, e.g. after a seek.
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
        self.frequency_bytes.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(analyser: &mut Analyser, bin: usize, amplitude: f32) {
        let n = analyser.fft_size();
        for (i, s) in analyser.input_mut().iter_mut().enumerate() {
            *s = amplitude * (2.0 * std::f32::consts::PI * bin as f32 * i as f32 / n as f32).sin();
        }
    }

    #[test]
    fn silence_maps_to_zero_bytes() {
        let mut analyser = Analyser::new(256, 0.8, -100.0, -30.0);
        let data = analyser.frequency_data();
        assert_eq!(data.len(), 128);
        assert!(data.iter().all(|&v| v == 0));
    }

    #[test]
    fn tone_peaks_at_its_bin() {
        let mut analyser = Analyser::new(1024, 0.0, -100.0, -30.0);
        tone(&mut analyser, 40, 0.8);
        let data = analyser.frequency_data();
        let peak = data
            .iter()
            .enumerate()
            .max_by_key(|(_, &v)| v)
            .map(|(i, _)| i)
            .unwrap();
        assert!((peak as i32 - 40).abs() <= 1, "peak at bin {peak}");
        assert!(data[40] > 200);
    }

    #[test]
    fn smoothing_decays_rather_than_dropping() {
        let mut analyser = Analyser::new(512, 0.8, -100.0, -30.0);
        tone(&mut analyser, 20, 0.8);
        let loud = analyser.frequency_data()[20];

        analyser.input_mut().fill(0.0);
        let decayed = analyser.frequency_data()[20];
        assert!(decayed > 0 && decayed < loud);

        analyser.reset();
        assert_eq!(analyser.frequency_data()[20], 0);
    }

    #[test]
    fn time_domain_centres_silence_at_128() {
        let mut analyser = Analyser::new(64, 0.8, -100.0, -30.0);
        assert!(analyser.time_domain_data().iter().all(|&v| v == 128));

        analyser.input_mut()[0] = 1.0;
        analyser.input_mut()[1] = -1.0;
        let data = analyser.time_domain_data();
        assert_eq!(data[0], 255);
        assert_eq!(data[1], 0);
    }
}
