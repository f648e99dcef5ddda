use std::f32::consts::TAU;

use crate::{
    canvas::{Canvas, StrokeStyle, Viewport},
    frame::SpectrumFrame,
    Result,
};

use super::{color::ColorCycle, validate_divisions, PointBuffer, Visualisation};

pub const AGGRESSION: f32 = 0.4;
/// How much of the radius takes part in the pulse, `0..=1`.
pub const MODULATION_STRENGTH: f32 = 0.4;
pub const MODULATION_STEP: f32 = 0.13;
pub const ANGLE_MODULATION_STEP: f32 = 0.28;

/// Spectrum bars radiating from a pulsing, rotating circle.
#[derive(Debug, Clone)]
pub struct CircleBarRenderer {
    divisions: usize,
    stroke: StrokeStyle,
    color_cycle: Option<ColorCycle>,
    modulation: f32,
    angle_modulation: f32,
    points: PointBuffer,
}

impl CircleBarRenderer {
    pub fn new(stroke: StrokeStyle, divisions: usize) -> Result<Self> {
        Ok(Self {
            divisions: validate_divisions(divisions)?,
            stroke,
            color_cycle: None,
            modulation: 0.0,
            angle_modulation: 0.0,
            points: PointBuffer::default(),
        })
    }

    pub fn with_color_cycle(mut self) -> Self {
        self.color_cycle = Some(ColorCycle::rainbow());
        self
    }

    pub fn divisions(&self) -> usize {
        self.divisions
    }

    pub fn modulation(&self) -> f32 {
        self.modulation
    }

    pub fn angle_modulation(&self) -> f32 {
        self.angle_modulation
    }

    fn to_polar(&self, fraction: f32, magnitude: f32, viewport: Viewport) -> (f32, f32) {
        let (cx, cy) = viewport.center();
        let base = cx.min(cy);
        let angle = fraction * TAU + self.angle_modulation;
        let pulse = (1.0 - MODULATION_STRENGTH)
            + MODULATION_STRENGTH * (1.0 + self.modulation.sin()) / 2.0;
        let radius = (base * (1.0 - AGGRESSION) + AGGRESSION * magnitude / 2.0) * pulse;

        (cx + radius * angle.sin(), cy + radius * angle.cos())
    }
}

impl Visualisation for CircleBarRenderer {
    fn render_spectrum(
        &mut self,
        frame: &SpectrumFrame,
        viewport: Viewport,
        canvas: &mut dyn Canvas,
    ) {
        let bars = frame.len() / self.divisions;
        if bars == 0 || frame.len() < 2 || viewport.is_empty() {
            return;
        }

        if let Some(cycle) = self.color_cycle.as_mut() {
            self.stroke.color = cycle.advance();
        }

        let base = viewport.width_f32().min(viewport.height_f32()) / 2.0;
        let last = (frame.len() - 1) as f32;

        let mut points = std::mem::take(&mut self.points);
        let buffer = points.prepare(frame.len());
        for i in 0..bars {
            let offset = self.divisions * i;
            let db = 7.5 * frame.decibels_at(offset);
            let fraction = offset as f32 / last;

            let (x0, y0) = self.to_polar(fraction, base - db / 4.0, viewport);
            let (x1, y1) = self.to_polar(fraction, base + db, viewport);
            let at = i * 4;
            buffer[at] = x0;
            buffer[at + 1] = y0;
            buffer[at + 2] = x1;
            buffer[at + 3] = y1;
        }

        canvas.draw_segments(points.segments(bars), &self.stroke);
        self.points = points;

        self.modulation += MODULATION_STEP;
        self.angle_modulation += ANGLE_MODULATION_STEP;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{RecordingCanvas, Rgba};

    fn renderer() -> CircleBarRenderer {
        CircleBarRenderer::new(StrokeStyle::new(8.0, Rgba::new(222, 92, 143, 255)), 32).unwrap()
    }

    #[test]
    fn draws_one_bar_per_division() {
        let mut circle_bar = renderer();
        let mut canvas = RecordingCanvas::new();
        let bytes: Vec<i8> = (0..512).map(|i| (i % 97) as i8).collect();
        circle_bar.render_spectrum(
            &SpectrumFrame::new(bytes),
            Viewport::new(400, 300),
            &mut canvas,
        );

        assert_eq!(canvas.segment_count(), 16);
        let (points, _) = canvas.segment_batches().next().unwrap();
        assert!(points.iter().all(|value| value.is_finite()));
    }

    #[test]
    fn louder_bins_reach_further_out() {
        let viewport = Viewport::new(300, 300);
        let distance = |bytes: Vec<i8>| {
            let mut canvas = RecordingCanvas::new();
            renderer().render_spectrum(&SpectrumFrame::new(bytes), viewport, &mut canvas);
            let (points, _) = canvas.segment_batches().next().unwrap();
            ((points[2] - 150.0).powi(2) + (points[3] - 150.0).powi(2)).sqrt()
        };

        let mut loud = vec![0; 64];
        loud[0] = 100;
        loud[1] = 100;
        assert!(distance(loud) > distance(vec![0; 64]));
    }

    #[test]
    fn advances_both_phases_and_cycles_color() {
        let mut circle_bar = renderer().with_color_cycle();
        let mut canvas = RecordingCanvas::new();
        let frame = SpectrumFrame::new(vec![10; 64]);
        circle_bar.render_spectrum(&frame, Viewport::new(100, 100), &mut canvas);
        circle_bar.render_spectrum(&frame, Viewport::new(100, 100), &mut canvas);

        assert!((circle_bar.modulation() - 2.0 * MODULATION_STEP).abs() < 1e-6);
        assert!((circle_bar.angle_modulation() - 2.0 * ANGLE_MODULATION_STEP).abs() < 1e-6);

        let colors: Vec<_> = canvas.segment_batches().map(|(_, style)| style.color).collect();
        assert_eq!(colors.len(), 2);
        assert_ne!(colors[0], colors[1]);
        assert_eq!(colors[0].a, 128);
    }
}
