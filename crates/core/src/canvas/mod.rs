//! Drawing vocabulary shared by renderers and surfaces.

use serde::{Deserialize, Serialize};

/// Straight, non-premultiplied 8-bit colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

/// How a fill or stroke combines with what is already on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMode {
    #[default]
    SourceOver,
    /// Multiplies the complements: pulls the destination toward the source.
    Screen,
    Multiply,
    Lighten,
}

/// Stroke parameters for a batch of segments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub width: f32,
    pub color: Rgba,
    #[serde(default)]
    pub mode: CompositeMode,
    #[serde(default = "default_anti_alias")]
    pub anti_alias: bool,
}

fn default_anti_alias() -> bool {
    true
}

impl StrokeStyle {
    pub fn new(width: f32, color: Rgba) -> Self {
        Self {
            width,
            color,
            mode: CompositeMode::SourceOver,
            anti_alias: true,
        }
    }

    pub fn with_mode(mut self, mode: CompositeMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Size of the area renderers draw into, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero-sized viewport cannot be drawn into.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn width_f32(&self) -> f32 {
        self.width as f32
    }

    pub fn height_f32(&self) -> f32 {
        self.height as f32
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width_f32() / 2.0, self.height_f32() / 2.0)
    }

    /// The whole viewport as a rectangle anchored at the origin.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width_f32(), self.height_f32())
    }
}

/// Axis-aligned rectangle in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Drawing capability renderers emit geometry to.
pub trait Canvas {
    /// Strokes every segment in `points`, laid out as `x0, y0, x1, y1, ...`.
    /// A trailing partial segment is ignored.
    fn draw_segments(&mut self, points: &[f32], style: &StrokeStyle);

    /// Fills `rect` with `color` combined through `mode`.
    fn fill_rect(&mut self, rect: Rect, mode: CompositeMode, color: Rgba);
}

/// One batch handed to a [`RecordingCanvas`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Segments { points: Vec<f32>, style: StrokeStyle },
    FillRect { rect: Rect, mode: CompositeMode, color: Rgba },
}

/// Canvas that keeps every call instead of rasterising it. Useful for
/// inspecting renderer geometry without a pixel surface.
#[derive(Debug, Default, Clone)]
pub struct RecordingCanvas {
    calls: Vec<DrawCall>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Segment batches in call order, as `(points, style)`.
    pub fn segment_batches(&self) -> impl Iterator<Item = (&[f32], &StrokeStyle)> {
        self.calls.iter().filter_map(|call| match call {
            DrawCall::Segments { points, style } => Some((points.as_slice(), style)),
            DrawCall::FillRect { .. } => None,
        })
    }

    /// Total number of complete segments drawn so far.
    pub fn segment_count(&self) -> usize {
        self.segment_batches().map(|(points, _)| points.len() / 4).sum()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl Canvas for RecordingCanvas {
    fn draw_segments(&mut self, points: &[f32], style: &StrokeStyle) {
        let complete = points.len() - points.len() % 4;
        self.calls.push(DrawCall::Segments {
            points: points[..complete].to_vec(),
            style: *style,
        });
    }

    fn fill_rect(&mut self, rect: Rect, mode: CompositeMode, color: Rgba) {
        self.calls.push(DrawCall::FillRect { rect, mode, color });
    }
}
