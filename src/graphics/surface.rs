use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn lerp(self, other: Color, t: f32) -> Self {
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Two-stop linear gradient in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearGradient {
    pub start: Vec2,
    pub end: Vec2,
    pub from: Color,
    pub to: Color,
}

impl LinearGradient {
    pub fn color_at(&self, point: Vec2) -> Color {
        let axis = self.end - self.start;
        let len2 = axis.length_squared();
        if len2 <= f32::EPSILON {
            return self.from;
        }
        let t = ((point - self.start).dot(axis) / len2).clamp(0.0, 1.0);
        self.from.lerp(self.to, t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Paint {
    Solid(Color),
    Linear(LinearGradient),
}

impl Paint {
    pub fn color_at(&self, point: Vec2) -> Color {
        match self {
            Paint::Solid(color) => *color,
            Paint::Linear(gradient) => gradient.color_at(point),
        }
    }
}

/// Soft halo drawn behind a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glow {
    pub color: Color,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Resizable 2-D drawing target, in pixels with the origin top-left.
pub trait Surface {
    fn size(&self) -> Vec2;

    fn resize(&mut self, width: f32, height: f32);

    fn clear(&mut self);

    fn fill_rect(&mut self, rect: Rect, paint: Paint, glow: Option<Glow>);

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, paint: Paint, glow: Option<Glow>);

    fn stroke_polyline(&mut self, points: &[Vec2], width: f32, paint: Paint, glow: Option<Glow>);

    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, paint: Paint);

    fn fill_circle(&mut self, center: Vec2, radius: f32, paint: Paint, glow: Option<Glow>);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear,
    FillRect {
        rect: Rect,
        paint: Paint,
        glow: Option<Glow>,
    },
    StrokeLine {
        from: Vec2,
        to: Vec2,
        width: f32,
        paint: Paint,
        glow: Option<Glow>,
    },
    StrokePolyline {
        points: Vec<Vec2>,
        width: f32,
        paint: Paint,
        glow: Option<Glow>,
    },
    StrokeCircle {
        center: Vec2,
        radius: f32,
        width: f32,
        paint: Paint,
    },
    FillCircle {
        center: Vec2,
        radius: f32,
        paint: Paint,
        glow: Option<Glow>,
    },
}

/// Surface that records draw calls instead of producing pixels.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    size: Vec2,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn rects(&self) -> Vec<Rect> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillRect { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect()
    }

    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> Vec2 {
        self.size
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.size = Vec2::new(width, height);
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear);
    }

    fn fill_rect(&mut self, rect: Rect, paint: Paint, glow: Option<Glow>) {
        self.commands.push(DrawCommand::FillRect { rect, paint, glow });
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, paint: Paint, glow: Option<Glow>) {
        self.commands.push(DrawCommand::StrokeLine {
            from,
            to,
            width,
            paint,
            glow,
        });
    }

    fn stroke_polyline(&mut self, points: &[Vec2], width: f32, paint: Paint, glow: Option<Glow>) {
        self.commands.push(DrawCommand::StrokePolyline {
            points: points.to_vec(),
            width,
            paint,
            glow,
        });
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, paint: Paint) {
        self.commands.push(DrawCommand::StrokeCircle {
            center,
            radius,
            width,
            paint,
        });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, paint: Paint, glow: Option<Glow>) {
        self.commands.push(DrawCommand::FillCircle {
            center,
            radius,
            paint,
            glow,
        });
    }
}
