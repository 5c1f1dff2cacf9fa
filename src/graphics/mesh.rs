use glam::Vec2;
use std::f32::consts::TAU;

use super::surface::{Color, Glow, Paint, Rect, Surface};
use super::vertex::Vertex;

const CIRCLE_SEGMENTS: usize = 64;
const GLOW_LAYERS: usize = 3;
const GLOW_LAYER_ALPHA: f32 = 0.18;

/// Surface that tessellates draw calls into a triangle list for the GPU.
#[derive(Debug, Clone)]
pub struct MeshSurface {
    size: Vec2,
    vertices: Vec<Vertex>,
}

impl MeshSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
            vertices: Vec::with_capacity(8192),
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    fn vertex(&mut self, position: Vec2, color: Color) {
        self.vertices.push(Vertex {
            position: position.to_array(),
            color: color.to_array(),
        });
    }

    fn triangle(&mut self, a: Vec2, b: Vec2, c: Vec2, paint: Paint) {
        self.vertex(a, paint.color_at(a));
        self.vertex(b, paint.color_at(b));
        self.vertex(c, paint.color_at(c));
    }

    fn quad(&mut self, corners: [Vec2; 4], paint: Paint) {
        let [a, b, c, d] = corners;
        self.triangle(a, b, c, paint);
        self.triangle(a, c, d, paint);
    }

    fn rect_quad(&mut self, rect: Rect, paint: Paint) {
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let min = Vec2::new(rect.x, rect.y);
        let max = min + Vec2::new(rect.width, rect.height);
        self.quad(
            [min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)],
            paint,
        );
    }

    fn segment(&mut self, from: Vec2, to: Vec2, width: f32, paint: Paint) {
        let normal = (to - from).perp().normalize_or_zero() * (width * 0.5);
        if normal == Vec2::ZERO {
            return;
        }
        self.quad([from + normal, to + normal, to - normal, from - normal], paint);
    }

    fn disc(&mut self, center: Vec2, radius: f32, paint: Paint) {
        if radius <= 0.0 {
            return;
        }
        for i in 0..CIRCLE_SEGMENTS {
            let a = center + Vec2::from_angle(i as f32 * TAU / CIRCLE_SEGMENTS as f32) * radius;
            let b = center + Vec2::from_angle((i + 1) as f32 * TAU / CIRCLE_SEGMENTS as f32) * radius;
            self.triangle(center, a, b, paint);
        }
    }

    fn ring(&mut self, center: Vec2, radius: f32, width: f32, paint: Paint) {
        let inner = (radius - width * 0.5).max(0.0);
        let outer = radius + width * 0.5;
        for i in 0..CIRCLE_SEGMENTS {
            let d0 = Vec2::from_angle(i as f32 * TAU / CIRCLE_SEGMENTS as f32);
            let d1 = Vec2::from_angle((i + 1) as f32 * TAU / CIRCLE_SEGMENTS as f32);
            self.quad(
                [center + d0 * inner, center + d0 * outer, center + d1 * outer, center + d1 * inner],
                paint,
            );
        }
    }

    /// Concentric translucent layers, widest first.
    fn glow_layers(glow: Option<Glow>) -> impl Iterator<Item = (f32, Paint)> {
        glow.into_iter().flat_map(|glow| {
            (1..=GLOW_LAYERS).rev().map(move |layer| {
                let spread = glow.radius * layer as f32 / GLOW_LAYERS as f32;
                let color = glow.color.with_alpha(glow.color.a * GLOW_LAYER_ALPHA);
                (spread, Paint::Solid(color))
            })
        })
    }
}

impl Surface for MeshSurface {
    fn size(&self) -> Vec2 {
        self.size
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.size = Vec2::new(width, height);
    }

    fn clear(&mut self) {
        self.vertices.clear();
    }

    fn fill_rect(&mut self, rect: Rect, paint: Paint, glow: Option<Glow>) {
        if rect.height <= 0.0 {
            return;
        }
        for (spread, halo) in Self::glow_layers(glow) {
            let expanded = Rect {
                x: rect.x - spread,
                y: rect.y - spread,
                width: rect.width + spread * 2.0,
                height: rect.height + spread * 2.0,
            };
            self.rect_quad(expanded, halo);
        }
        self.rect_quad(rect, paint);
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, paint: Paint, glow: Option<Glow>) {
        for (spread, halo) in Self::glow_layers(glow) {
            self.segment(from, to, width + spread * 2.0, halo);
        }
        self.segment(from, to, width, paint);
    }

    fn stroke_polyline(&mut self, points: &[Vec2], width: f32, paint: Paint, glow: Option<Glow>) {
        for (spread, halo) in Self::glow_layers(glow) {
            for pair in points.windows(2) {
                self.segment(pair[0], pair[1], width + spread * 2.0, halo);
            }
        }
        for pair in points.windows(2) {
            self.segment(pair[0], pair[1], width, paint);
        }
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, paint: Paint) {
        self.ring(center, radius, width, paint);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, paint: Paint, glow: Option<Glow>) {
        for (spread, halo) in Self::glow_layers(glow) {
            self.disc(center, radius + spread, halo);
        }
        self.disc(center, radius, paint);
    }
}
