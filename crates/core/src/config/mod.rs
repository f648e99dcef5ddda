use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    canvas::{CompositeMode, Rgba, StrokeStyle},
    queue::DEFAULT_CAPACITY,
    renderer::{BarGraphRenderer, CircleBarRenderer, CircleRenderer, LineRenderer, Renderer},
    Result,
};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub compositor: CompositorConfig,
    /// Renderers registered at start-up, in compositing order.
    pub renderers: Vec<RendererConfig>,
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON configuration file. Missing sections take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// How often and how much the capture scheduler samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Bytes per waveform and spectrum snapshot.
    pub capture_size: usize,
    pub period_ms: u64,
    pub queue_capacity: usize,
}

impl CaptureConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            capture_size: 512,
            period_ms: 20,
            queue_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Persistence and flash overlays, plus pacing of the render loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Alpha of the white overlay applied after every pass; higher fades faster.
    pub fade_alpha: u8,
    pub flash_alpha: u8,
    pub background: Rgba,
    /// Upper bound on passes per second. `None` renders as fast as possible.
    pub max_fps: Option<u32>,
}

impl CompositorConfig {
    pub fn frame_interval(&self) -> Option<Duration> {
        self.max_fps
            .filter(|fps| *fps > 0)
            .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps)))
    }
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            fade_alpha: 128,
            flash_alpha: 200,
            background: Rgba::WHITE,
            max_fps: Some(60),
        }
    }
}

/// Serialisable description of one renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RendererConfig {
    Line {
        stroke: StrokeStyle,
        flash_stroke: StrokeStyle,
        #[serde(default)]
        cycle_color: bool,
    },
    BarGraph {
        stroke: StrokeStyle,
        divisions: usize,
        #[serde(default)]
        top: bool,
    },
    Circle {
        stroke: StrokeStyle,
        #[serde(default)]
        cycle_color: bool,
    },
    CircleBar {
        stroke: StrokeStyle,
        divisions: usize,
        #[serde(default)]
        cycle_color: bool,
    },
}

impl RendererConfig {
    /// Blue line that flashes white on beats.
    pub fn line() -> Self {
        RendererConfig::Line {
            stroke: StrokeStyle::new(5.0, Rgba::new(0, 128, 255, 128)),
            flash_stroke: StrokeStyle::new(5.0, Rgba::WHITE),
            cycle_color: false,
        }
    }

    /// Dense histogram on the bottom edge.
    pub fn bars_bottom() -> Self {
        RendererConfig::BarGraph {
            stroke: StrokeStyle::new(50.0, Rgba::new(56, 138, 252, 200)),
            divisions: 16,
            top: false,
        }
    }

    /// Sparse histogram hanging from the top edge.
    pub fn bars_top() -> Self {
        RendererConfig::BarGraph {
            stroke: StrokeStyle::new(12.0, Rgba::new(181, 111, 233, 200)),
            divisions: 4,
            top: true,
        }
    }

    pub fn circle() -> Self {
        RendererConfig::Circle {
            stroke: StrokeStyle::new(3.0, Rgba::new(222, 92, 143, 255)),
            cycle_color: true,
        }
    }

    pub fn circle_bar() -> Self {
        RendererConfig::CircleBar {
            stroke: StrokeStyle::new(8.0, Rgba::new(222, 92, 143, 255))
                .with_mode(CompositeMode::Lighten),
            divisions: 32,
            cycle_color: true,
        }
    }

    /// Validates the description and builds a fresh renderer with its own
    /// animation state.
    pub fn build(&self) -> Result<Renderer> {
        let renderer = match self {
            RendererConfig::Line {
                stroke,
                flash_stroke,
                cycle_color,
            } => {
                let line = LineRenderer::new(*stroke, *flash_stroke);
                Renderer::Line(if *cycle_color {
                    line.with_color_cycle()
                } else {
                    line
                })
            }
            RendererConfig::BarGraph {
                stroke,
                divisions,
                top,
            } => Renderer::BarGraph(BarGraphRenderer::new(*divisions, *stroke, *top)?),
            RendererConfig::Circle {
                stroke,
                cycle_color,
            } => {
                let circle = CircleRenderer::new(*stroke);
                Renderer::Circle(if *cycle_color {
                    circle.with_color_cycle()
                } else {
                    circle
                })
            }
            RendererConfig::CircleBar {
                stroke,
                divisions,
                cycle_color,
            } => {
                let circle_bar = CircleBarRenderer::new(*stroke, *divisions)?;
                Renderer::CircleBar(if *cycle_color {
                    circle_bar.with_color_cycle()
                } else {
                    circle_bar
                })
            }
        };
        Ok(renderer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VisualiserError;

    #[test]
    fn missing_sections_take_defaults() {
        let config = AppConfig::from_json_str(r#"{"capture":{"period_ms":10}}"#).unwrap();
        assert_eq!(config.capture.period(), Duration::from_millis(10));
        assert_eq!(config.capture.capture_size, 512);
        assert_eq!(config.capture.queue_capacity, 5);
        assert_eq!(config.compositor, CompositorConfig::default());
        assert!(config.renderers.is_empty());
    }

    #[test]
    fn round_trips_through_json() {
        let config = AppConfig {
            renderers: vec![
                RendererConfig::line(),
                RendererConfig::bars_bottom(),
                RendererConfig::circle_bar(),
            ],
            ..AppConfig::default()
        };
        let json = config.to_json_pretty().unwrap();
        assert!(json.contains(r#""kind": "bar_graph""#));
        assert_eq!(AppConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn builds_each_renderer_kind() {
        let names: Vec<_> = [
            RendererConfig::line(),
            RendererConfig::bars_top(),
            RendererConfig::circle(),
            RendererConfig::circle_bar(),
        ]
        .iter()
        .map(|config| config.build().unwrap().name())
        .collect();
        assert_eq!(names, ["line", "bar_graph", "circle", "circle_bar"]);
    }

    #[test]
    fn invalid_divisions_fail_to_build() {
        let json = r#"{
            "kind": "bar_graph",
            "divisions": 6,
            "stroke": { "width": 2.0, "color": { "r": 0, "g": 0, "b": 0, "a": 255 } }
        }"#;
        let config: RendererConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(config.build(), Err(VisualiserError::InvalidDivisions(6))));
    }

    #[test]
    fn frame_interval_follows_max_fps() {
        let mut compositor = CompositorConfig::default();
        assert!(compositor.frame_interval().is_some());
        compositor.max_fps = Some(0);
        assert!(compositor.frame_interval().is_none());
        compositor.max_fps = None;
        assert!(compositor.frame_interval().is_none());
    }
}
