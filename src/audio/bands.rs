use std::ops::Range;

/// One frame of per-bin magnitudes in `0..=255`, `fft_size / 2` entries long.
pub type FrequencySnapshot = [u8];

/// Beat threshold on the 0-255 scale. Empirical; tune per material.
pub const DEFAULT_BEAT_THRESHOLD: f32 = 200.0;

// Coarse low/mid/high split as eighths of the snapshot: bass [0, 1/8),
// mid [1/8, 5/8), treble [5/8, 1). Not derived from a psychoacoustic model.
const BASS_EIGHTHS: usize = 1;
const MID_EIGHTHS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandLevels {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub average: f32,
}

/// Index ranges for bass, mid and treble over a snapshot of `len` bins.
pub fn band_ranges(len: usize) -> [Range<usize>; 3] {
    let bass_end = len * BASS_EIGHTHS / 8;
    let mid_end = len * MID_EIGHTHS / 8;
    [0..bass_end, bass_end..mid_end, mid_end..len]
}

pub fn bands(snapshot: &FrequencySnapshot) -> BandLevels {
    let [bass, mid, treble] = band_ranges(snapshot.len());
    BandLevels {
        bass: average_range(snapshot, bass),
        mid: average_range(snapshot, mid),
        treble: average_range(snapshot, treble),
        average: average_range(snapshot, 0..snapshot.len()),
    }
}

/// True iff the bass average exceeds `threshold`. Stateless: no tempo
/// tracking and no refractory window between beats.
pub fn detect_beat(snapshot: &FrequencySnapshot, threshold: f32) -> bool {
    let [bass, _, _] = band_ranges(snapshot.len());
    average_range(snapshot, bass) > threshold
}

fn average_range(data: &[u8], range: Range<usize>) -> f32 {
    if range.is_empty() || range.start >= data.len() {
        return 0.0;
    }
    let end = range.end.min(data.len());
    let sum: u32 = data[range.start..end].iter().map(|&v| v as u32).sum();
    sum as f32 / (end - range.start) as f32
}
