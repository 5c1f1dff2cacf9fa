use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use super::surface::{Color, Glow, LinearGradient, Paint, Rect, Surface};
use crate::audio::FrequencySnapshot;

/// Radius of the circular variant's reference ring, in pixels.
pub const RING_RADIUS: f32 = 100.0;
/// Longest spoke of the circular variant at full scale, in pixels.
pub const SPOKE_LENGTH: f32 = 60.0;
const CENTER_DISC_RADIUS: f32 = 28.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum VisualizerType {
    #[default]
    Bars,
    Circular,
    Waveform,
}

impl VisualizerType {
    pub fn next(self) -> Self {
        match self {
            VisualizerType::Bars => VisualizerType::Circular,
            VisualizerType::Circular => VisualizerType::Waveform,
            VisualizerType::Waveform => VisualizerType::Bars,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualParameters {
    pub variant: VisualizerType,
    pub color: Color,
    pub sensitivity: f32,
}

impl Default for VisualParameters {
    fn default() -> Self {
        Self {
            variant: VisualizerType::Bars,
            color: super::ColorScheme::default().palette().base,
            sensitivity: 1.0,
        }
    }
}

/// Paints one frame. Always clears first; an empty snapshot leaves the
/// surface blank.
pub fn render<S: Surface + ?Sized>(surface: &mut S, snapshot: &FrequencySnapshot, params: &VisualParameters) {
    surface.clear();
    if snapshot.is_empty() {
        return;
    }
    match params.variant {
        VisualizerType::Bars => draw_bars(surface, snapshot, params),
        VisualizerType::Circular => draw_circular(surface, snapshot, params),
        VisualizerType::Waveform => draw_waveform(surface, snapshot, params),
    }
}

fn level(sample: u8, sensitivity: f32) -> f32 {
    sample as f32 / 255.0 * sensitivity
}

fn draw_bars<S: Surface + ?Sized>(surface: &mut S, snapshot: &FrequencySnapshot, params: &VisualParameters) {
    let size = surface.size();
    let slot = size.x / snapshot.len() as f32;
    let gap = (slot * 0.2).min(1.0);
    let paint = Paint::Linear(LinearGradient {
        start: Vec2::new(0.0, size.y),
        end: Vec2::ZERO,
        from: params.color.with_alpha(0.3),
        to: params.color,
    });
    let glow = Some(Glow {
        color: params.color.with_alpha(0.5),
        radius: 10.0,
    });

    for (i, &sample) in snapshot.iter().enumerate() {
        let height = level(sample, params.sensitivity) * size.y;
        let rect = Rect {
            x: i as f32 * slot,
            y: size.y - height,
            width: slot - gap,
            height,
        };
        surface.fill_rect(rect, paint, glow);
    }
}

fn draw_circular<S: Surface + ?Sized>(surface: &mut S, snapshot: &FrequencySnapshot, params: &VisualParameters) {
    let center = surface.size() * 0.5;
    let step = TAU / snapshot.len() as f32;

    surface.stroke_circle(center, RING_RADIUS, 2.0, Paint::Solid(params.color.with_alpha(0.35)));

    let glow = Some(Glow {
        color: params.color.with_alpha(0.4),
        radius: 6.0,
    });
    for (i, &sample) in snapshot.iter().enumerate() {
        let direction = Vec2::from_angle(i as f32 * step);
        let length = level(sample, params.sensitivity) * SPOKE_LENGTH;
        let from = center + direction * RING_RADIUS;
        let to = center + direction * (RING_RADIUS + length);
        surface.stroke_line(from, to, 2.0, Paint::Solid(params.color), glow);
    }

    surface.fill_circle(
        center,
        CENTER_DISC_RADIUS,
        Paint::Solid(params.color.with_alpha(0.85)),
        Some(Glow {
            color: params.color.with_alpha(0.5),
            radius: 16.0,
        }),
    );
}

fn draw_waveform<S: Surface + ?Sized>(surface: &mut S, snapshot: &FrequencySnapshot, params: &VisualParameters) {
    let size = surface.size();
    let mid = size.y * 0.5;
    let step = if snapshot.len() > 1 {
        size.x / (snapshot.len() - 1) as f32
    } else {
        0.0
    };

    let points: Vec<Vec2> = snapshot
        .iter()
        .enumerate()
        .map(|(i, &sample)| Vec2::new(i as f32 * step, mid - level(sample, params.sensitivity) * mid))
        .collect();

    let paint = Paint::Linear(LinearGradient {
        start: Vec2::ZERO,
        end: Vec2::new(size.x, 0.0),
        from: params.color.with_alpha(0.4),
        to: params.color,
    });
    surface.stroke_polyline(
        &points,
        2.5,
        paint,
        Some(Glow {
            color: params.color.with_alpha(0.5),
            radius: 8.0,
        }),
    );
}
