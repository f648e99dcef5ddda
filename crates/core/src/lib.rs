//! Core library for the audio visualiser.
//!
//! A capture thread samples waveform and spectrum snapshots from an analysis
//! session at a fixed period and hands them to a free-running render loop
//! through two most-recent-wins queues. The render loop lets every registered
//! renderer draw the newest frames onto a persistent accumulation surface,
//! fades it toward white and presents it.

pub mod analysis;
pub mod audio;
pub mod canvas;
pub mod config;
pub mod error;
pub mod frame;
pub mod preset;
pub mod queue;
pub mod record;
pub mod render;
pub mod renderer;
pub mod surface;
pub mod timeline;
pub mod visualiser;

pub use analysis::{quantize_waveform, SpectrumAnalyser};
pub use audio::{AnalysisSession, AudioAnalysisSource, ClipSession, ClipSource};
pub use canvas::{Canvas, CompositeMode, Rect, Rgba, StrokeStyle, Viewport};
pub use config::{AppConfig, CaptureConfig, CompositorConfig, RendererConfig};
pub use error::{Result, VisualiserError};
pub use frame::{SampleFrame, SpectrumFrame};
pub use preset::PresetLibrary;
pub use queue::FrameQueue;
pub use record::{PngRecorder, RecordingSettings};
pub use render::{Compositor, FlashTrigger, PassOutcome, RenderLoop, RenderStats};
pub use renderer::{
    BarGraphRenderer, CircleBarRenderer, CircleRenderer, FrameKind, LineRenderer, Renderer,
    RendererHandle, RendererSet, Visualisation,
};
pub use surface::{AccumulationSurface, FrameLease, HeadlessSurface, OutputSurface};
pub use timeline::{CaptureScheduler, Capturer, FrameQueues, PlaybackClock, TickOutcome};
pub use visualiser::Visualiser;
