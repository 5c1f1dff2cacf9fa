pub mod engine;
pub mod mesh;
pub mod palette;
pub mod shader;
pub mod surface;
pub mod vertex;
pub mod visualizer;

pub use engine::GraphicsEngine;
pub use mesh::MeshSurface;
pub use palette::{ColorScheme, Palette};
pub use shader::MeshPipeline;
pub use surface::{Color, DrawCommand, Glow, LinearGradient, Paint, Rect, RecordingSurface, Surface};
pub use vertex::{Vertex, VertexBuffer};
pub use visualizer::{render, VisualParameters, VisualizerType};
