use std::f32::consts::TAU;

use crate::{
    canvas::{Canvas, StrokeStyle, Viewport},
    frame::SampleFrame,
};

use super::{color::ColorCycle, PointBuffer, Visualisation};

/// Share of the radius driven by sample amplitude rather than the base circle.
pub const AGGRESSION: f32 = 0.33;
/// Pulse phase advance per rendered frame.
pub const MODULATION_STEP: f32 = 0.04;

/// Wraps the waveform around a pulsing circle centred in the viewport.
#[derive(Debug, Clone)]
pub struct CircleRenderer {
    stroke: StrokeStyle,
    color_cycle: Option<ColorCycle>,
    modulation: f32,
    points: PointBuffer,
}

impl CircleRenderer {
    pub fn new(stroke: StrokeStyle) -> Self {
        Self {
            stroke,
            color_cycle: None,
            modulation: 0.0,
            points: PointBuffer::default(),
        }
    }

    pub fn with_color_cycle(mut self) -> Self {
        self.color_cycle = Some(ColorCycle::rainbow());
        self
    }

    pub fn modulation(&self) -> f32 {
        self.modulation
    }

    /// Maps a position along the waveform (`fraction` in `0..=1`) and a
    /// magnitude in `0..2R` onto the disc. The radius never exceeds `R`, half
    /// the shorter viewport side, so points stay inside the viewport.
    fn to_polar(&self, fraction: f32, magnitude: f32, viewport: Viewport) -> (f32, f32) {
        let (cx, cy) = viewport.center();
        let base = cx.min(cy);
        let angle = fraction * TAU;
        let pulse = (1.2 + self.modulation.sin()) / 2.2;
        let radius = (base * (1.0 - AGGRESSION) + AGGRESSION * magnitude / 2.0) * pulse;

        (
            (cx + radius * angle.sin()).clamp(0.0, viewport.width_f32()),
            (cy + radius * angle.cos()).clamp(0.0, viewport.height_f32()),
        )
    }
}

impl Visualisation for CircleRenderer {
    fn render_waveform(
        &mut self,
        frame: &SampleFrame,
        viewport: Viewport,
        canvas: &mut dyn Canvas,
    ) {
        if frame.len() < 2 || viewport.is_empty() {
            return;
        }

        if let Some(cycle) = self.color_cycle.as_mut() {
            self.stroke.color = cycle.advance();
        }

        let segments = frame.len() - 1;
        let base = viewport.width_f32().min(viewport.height_f32()) / 2.0;
        let fraction = |index: usize| index as f32 / segments as f32;
        let magnitude = |index: usize| base + f32::from(frame.centered(index)) * base / 128.0;

        let mut points = std::mem::take(&mut self.points);
        let buffer = points.prepare(frame.len());
        for i in 0..segments {
            let (x0, y0) = self.to_polar(fraction(i), magnitude(i), viewport);
            let (x1, y1) = self.to_polar(fraction(i + 1), magnitude(i + 1), viewport);
            let at = i * 4;
            buffer[at] = x0;
            buffer[at + 1] = y0;
            buffer[at + 2] = x1;
            buffer[at + 3] = y1;
        }

        canvas.draw_segments(points.segments(segments), &self.stroke);
        self.points = points;

        self.modulation += MODULATION_STEP;
    }
}
