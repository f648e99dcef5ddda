//! Render side of the pipeline: the compositor that owns the accumulation
//! surface, and the free-running loop that drives it.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{
    canvas::{Canvas, CompositeMode, Rgba, Viewport},
    config::CompositorConfig,
    frame::{SampleFrame, SpectrumFrame},
    renderer::{RendererSet, Visualisation},
    surface::{AccumulationSurface, FrameLease, OutputSurface},
    timeline::FrameQueues,
    Result, VisualiserError,
};

/// How long the loop waits before retrying after a skipped or failed pass.
const IDLE_BACKOFF: Duration = Duration::from_millis(5);

/// One-shot request for a bright overlay on the next pass. Clones share the
/// same flag.
#[derive(Debug, Clone, Default)]
pub struct FlashTrigger {
    pending: Arc<AtomicBool>,
}

impl FlashTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Returns whether a flash was pending and clears the request.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderStats {
    pub passes: u64,
    pub presented: u64,
    /// Passes without a drawable viewport.
    pub skipped: u64,
    /// Smoothed estimate, each pass averaging in its instantaneous rate.
    pub fps: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Presented,
    Skipped,
}

/// Pulls the newest frames, lets every renderer draw them onto the
/// accumulation surface, fades it and presents it.
pub struct Compositor {
    queues: FrameQueues,
    renderers: RendererSet,
    flash: FlashTrigger,
    config: CompositorConfig,
    accumulation: Option<AccumulationSurface>,
    waveform: Option<SampleFrame>,
    spectrum: Option<SpectrumFrame>,
    stats: RenderStats,
    last_pass: Option<Instant>,
}

impl Compositor {
    pub fn new(
        queues: FrameQueues,
        renderers: RendererSet,
        flash: FlashTrigger,
        config: CompositorConfig,
    ) -> Self {
        Self {
            queues,
            renderers,
            flash,
            config,
            accumulation: None,
            waveform: None,
            spectrum: None,
            stats: RenderStats::default(),
            last_pass: None,
        }
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    pub fn accumulation(&self) -> Option<&AccumulationSurface> {
        self.accumulation.as_ref()
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Waveform drawn by the latest pass, if one has been captured yet.
    pub fn latest_waveform(&self) -> Option<&SampleFrame> {
        self.waveform.as_ref()
    }

    pub fn latest_spectrum(&self) -> Option<&SpectrumFrame> {
        self.spectrum.as_ref()
    }

    /// Runs one pass against `surface`.
    ///
    /// Frames that did not change since the last pass are drawn again. A
    /// missing or empty viewport skips the pass. The surface is unlocked on
    /// every exit path.
    pub fn render_pass<S: OutputSurface + ?Sized>(
        &mut self,
        surface: &mut S,
    ) -> Result<PassOutcome> {
        if let Some(frame) = self.queues.waveform().try_pop_newest() {
            self.waveform = Some(frame);
        }
        if let Some(frame) = self.queues.spectrum().try_pop_newest() {
            self.spectrum = Some(frame);
        }
        self.stats.passes += 1;

        let Some(viewport) = surface.viewport().filter(|viewport| !viewport.is_empty()) else {
            self.stats.skipped += 1;
            tracing::debug!("no drawable viewport, skipping pass");
            return Ok(PassOutcome::Skipped);
        };
        self.ensure_accumulation(viewport);
        let Some(accumulation) = self.accumulation.as_mut() else {
            self.stats.skipped += 1;
            return Ok(PassOutcome::Skipped);
        };

        let lease = FrameLease::acquire(surface)?;

        for handle in self.renderers.snapshot()? {
            handle.with(|renderer| {
                if let Some(frame) = &self.waveform {
                    renderer.render_waveform(frame, viewport, &mut *accumulation);
                }
                if let Some(frame) = &self.spectrum {
                    renderer.render_spectrum(frame, viewport, &mut *accumulation);
                }
            })?;
        }

        let bounds = viewport.bounds();
        // Screen with translucent white scales each pixel's distance to white by
        // 1 - alpha; multiply with white would leave the surface unchanged.
        accumulation.fill_rect(
            bounds,
            CompositeMode::Screen,
            Rgba::WHITE.with_alpha(self.config.fade_alpha),
        );
        if self.flash.take() {
            tracing::debug!("flash");
            accumulation.fill_rect(
                bounds,
                CompositeMode::SourceOver,
                Rgba::WHITE.with_alpha(self.config.flash_alpha),
            );
        }

        lease.post(accumulation)?;

        self.stats.presented += 1;
        self.update_fps();
        tracing::trace!(
            pass = self.stats.passes,
            fps = self.stats.fps,
            "presented frame"
        );
        Ok(PassOutcome::Presented)
    }

    fn ensure_accumulation(&mut self, viewport: Viewport) {
        let stale = self
            .accumulation
            .as_ref()
            .map_or(true, |accumulation| accumulation.viewport() != viewport);
        if stale {
            tracing::debug!(
                width = viewport.width,
                height = viewport.height,
                "allocating accumulation surface"
            );
            self.accumulation = AccumulationSurface::new(viewport, self.config.background);
        }
    }

    fn update_fps(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_pass.replace(now) {
            let millis = now.duration_since(last).as_secs_f32() * 1000.0;
            if millis > 0.0 {
                self.stats.fps = (self.stats.fps + 1000.0 / millis) / 2.0;
            }
        }
    }
}

/// Drives a [`Compositor`] against an output surface on its own thread.
pub struct RenderLoop<S: OutputSurface + 'static> {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<(S, Compositor)>>,
}

impl<S: OutputSurface + 'static> RenderLoop<S> {
    pub fn spawn(compositor: Compositor, surface: S) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let interval = compositor.config().frame_interval();

        let handle = {
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("render".to_string())
                .spawn(move || {
                    let mut compositor = compositor;
                    let mut surface = surface;
                    while running.load(Ordering::Acquire) {
                        let started = Instant::now();
                        match compositor.render_pass(&mut surface) {
                            Ok(PassOutcome::Presented) => {}
                            Ok(PassOutcome::Skipped) => thread::sleep(IDLE_BACKOFF),
                            Err(err) => {
                                tracing::warn!(%err, "render pass failed");
                                thread::sleep(IDLE_BACKOFF);
                            }
                        }

                        let rest = interval
                            .and_then(|interval| interval.checked_sub(started.elapsed()));
                        if let Some(rest) = rest {
                            thread::sleep(rest);
                        }
                    }

                    let stats = compositor.stats();
                    tracing::debug!(
                        passes = stats.passes,
                        presented = stats.presented,
                        fps = stats.fps,
                        "render loop exiting"
                    );
                    (surface, compositor)
                })?
        };

        tracing::info!(
            max_fps = ?interval.map(|interval| 1.0 / interval.as_secs_f64()),
            "render loop started"
        );
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the loop and waits for its thread to exit, handing back the
    /// surface and compositor.
    pub fn stop(mut self) -> Result<(S, Compositor)> {
        self.running.store(false, Ordering::Release);
        let handle = self
            .handle
            .take()
            .ok_or_else(|| VisualiserError::msg("render loop already stopped"))?;
        let parts = handle
            .join()
            .map_err(|_| VisualiserError::msg("render thread panicked"))?;
        tracing::info!("render loop stopped");
        Ok(parts)
    }
}

impl<S: OutputSurface + 'static> Drop for RenderLoop<S> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("render thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        canvas::StrokeStyle,
        renderer::{LineRenderer, RendererHandle},
        surface::HeadlessSurface,
    };

    fn compositor(
        queues: &FrameQueues,
        renderers: &RendererSet,
        flash: &FlashTrigger,
    ) -> Compositor {
        Compositor::new(
            queues.clone(),
            renderers.clone(),
            flash.clone(),
            CompositorConfig::default(),
        )
    }

    fn black_line() -> RendererHandle {
        let stroke = StrokeStyle {
            anti_alias: false,
            ..StrokeStyle::new(6.0, Rgba::BLACK)
        };
        RendererHandle::new(LineRenderer::new(stroke, stroke))
    }

    #[test]
    fn flash_is_one_shot() {
        let flash = FlashTrigger::new();
        assert!(!flash.take());
        flash.clone().trigger();
        assert!(flash.is_pending());
        assert!(flash.take());
        assert!(!flash.take());
    }

    #[test]
    fn skips_without_a_viewport() {
        let queues = FrameQueues::default();
        let mut compositor = compositor(&queues, &RendererSet::new(), &FlashTrigger::new());
        let mut surface = HeadlessSurface::detached();

        assert_eq!(compositor.render_pass(&mut surface).unwrap(), PassOutcome::Skipped);
        surface.resize(Some(Viewport::new(0, 20)));
        assert_eq!(compositor.render_pass(&mut surface).unwrap(), PassOutcome::Skipped);

        assert_eq!(compositor.stats().skipped, 2);
        assert_eq!(surface.presented(), 0);
        assert!(compositor.accumulation().is_none());
    }

    #[test]
    fn reuses_the_last_frame_when_nothing_new_arrives() {
        let queues = FrameQueues::default();
        let renderers = RendererSet::new();
        renderers.add(black_line()).unwrap();
        let mut compositor = compositor(&queues, &renderers, &FlashTrigger::new());
        let mut surface = HeadlessSurface::new(Viewport::new(32, 32));

        compositor.render_pass(&mut surface).unwrap();
        assert!(compositor.latest_waveform().is_none());

        queues.waveform().try_push(SampleFrame::new(vec![i8::MIN; 32]));
        compositor.render_pass(&mut surface).unwrap();
        compositor.render_pass(&mut surface).unwrap();

        assert_eq!(compositor.latest_waveform().map(SampleFrame::len), Some(32));
        // Drawn on every pass, so the midline stays dark despite the fade.
        let frame = surface.last_frame().unwrap();
        assert!(frame.pixel(16, 16).unwrap().r < 160);
        assert_eq!(frame.pixel(16, 2), Some(Rgba::WHITE));
        assert_eq!(surface.presented(), 3);
    }

    #[test]
    fn fade_pulls_old_content_toward_white() {
        let queues = FrameQueues::default();
        let renderers = RendererSet::new();
        let handle = black_line();
        renderers.add(handle.clone()).unwrap();
        let mut compositor = compositor(&queues, &renderers, &FlashTrigger::new());
        let mut surface = HeadlessSurface::new(Viewport::new(32, 32));

        queues.waveform().try_push(SampleFrame::new(vec![i8::MIN; 32]));
        compositor.render_pass(&mut surface).unwrap();
        let drawn = compositor.accumulation().unwrap().pixel(16, 16).unwrap();

        renderers.remove(&handle).unwrap();
        compositor.render_pass(&mut surface).unwrap();
        let faded = compositor.accumulation().unwrap().pixel(16, 16).unwrap();

        assert!(faded.r > drawn.r);
        assert_eq!(faded.a, 255);

        // Half-alpha white closes half the remaining distance to white.
        let expected = f32::from(drawn.r) + f32::from(255 - drawn.r) * 128.0 / 255.0;
        assert!((f32::from(faded.r) - expected).abs() <= 3.0);
    }

    #[test]
    fn flash_brightens_a_single_pass() {
        let queues = FrameQueues::default();
        let flash = FlashTrigger::new();
        let mut config = CompositorConfig::default();
        config.background = Rgba::BLACK;
        config.fade_alpha = 0;
        let mut compositor = Compositor::new(queues, RendererSet::new(), flash.clone(), config);
        let mut surface = HeadlessSurface::new(Viewport::new(8, 8));

        compositor.render_pass(&mut surface).unwrap();
        assert_eq!(compositor.accumulation().unwrap().pixel(4, 4), Some(Rgba::BLACK));

        flash.trigger();
        compositor.render_pass(&mut surface).unwrap();
        let flashed = compositor.accumulation().unwrap().pixel(4, 4).unwrap();
        assert!(flashed.r > 150);
        assert!(!flash.is_pending());
    }

    #[test]
    fn reallocates_on_resize() {
        let mut compositor = compositor(
            &FrameQueues::default(),
            &RendererSet::new(),
            &FlashTrigger::new(),
        );
        let mut surface = HeadlessSurface::new(Viewport::new(8, 8));
        compositor.render_pass(&mut surface).unwrap();

        surface.resize(Some(Viewport::new(16, 4)));
        compositor.render_pass(&mut surface).unwrap();
        assert_eq!(
            compositor.accumulation().unwrap().viewport(),
            Viewport::new(16, 4)
        );
        assert_eq!(surface.last_frame().unwrap().viewport(), Viewport::new(16, 4));
    }

    #[test]
    fn loop_renders_until_stopped() {
        let queues = FrameQueues::default();
        let renderers = RendererSet::new();
        renderers.add(black_line()).unwrap();
        let mut config = CompositorConfig::default();
        config.max_fps = Some(500);
        let compositor = Compositor::new(queues.clone(), renderers, FlashTrigger::new(), config);
        queues.waveform().try_push(SampleFrame::new(vec![0; 64]));

        let surface = HeadlessSurface::new(Viewport::new(24, 24));
        let render_loop = RenderLoop::spawn(compositor, surface).unwrap();
        let started = Instant::now();
        while started.elapsed() < Duration::from_millis(50) {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(render_loop.is_running());

        let (surface, compositor) = render_loop.stop().unwrap();
        assert!(surface.presented() > 0);
        assert_eq!(compositor.stats().presented, surface.presented());
        assert!(!surface.is_locked());
    }
}
