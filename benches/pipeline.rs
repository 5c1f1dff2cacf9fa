//! Per-frame cost of analysis and rendering.
//!
//! Run with: cargo bench --bench pipeline

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::f32::consts::TAU;
use std::hint::black_box;

use pulsewave::audio::{bands, detect_beat, Analyser, DEFAULT_BEAT_THRESHOLD};
use pulsewave::graphics::{render, MeshSurface, VisualParameters, VisualizerType};

fn fill_tone(analyser: &mut Analyser) {
    for (i, sample) in analyser.input_mut().iter_mut().enumerate() {
        *sample = (TAU * 440.0 * i as f32 / 48_000.0).sin() * 0.6;
    }
}

fn bench_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis");

    for fft_size in [256usize, 1024, 4096].iter() {
        let mut analyser = Analyser::new(*fft_size, 0.8, -100.0, -30.0);
        group.bench_with_input(BenchmarkId::from_parameter(fft_size), fft_size, |b, _| {
            b.iter(|| {
                fill_tone(&mut analyser);
                let snapshot = analyser.frequency_data();
                black_box(bands(snapshot));
                black_box(detect_beat(snapshot, DEFAULT_BEAT_THRESHOLD));
            });
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");

    let mut analyser = Analyser::new(256, 0.8, -100.0, -30.0);
    fill_tone(&mut analyser);
    let snapshot = analyser.frequency_data().to_vec();
    let mut mesh = MeshSurface::new(1200.0, 800.0);

    for variant in [VisualizerType::Bars, VisualizerType::Circular, VisualizerType::Waveform] {
        let params = VisualParameters {
            variant,
            ..VisualParameters::default()
        };
        group.bench_function(format!("{:?}", variant), |b| {
            b.iter(|| {
                render(&mut mesh, &snapshot, &params);
                black_box(mesh.vertices().len());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_analysis, bench_render);
criterion_main!(benches);
