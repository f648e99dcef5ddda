//! Entry point tying the pieces together: link to an audio source, register
//! renderers, request flashes and start rendering.

use crate::{
    audio::AudioAnalysisSource,
    config::{AppConfig, CaptureConfig, CompositorConfig},
    render::{Compositor, FlashTrigger, RenderLoop},
    renderer::{Renderer, RendererHandle, RendererSet},
    surface::OutputSurface,
    timeline::{CaptureScheduler, Capturer, FrameQueues},
    Result,
};

pub struct Visualiser {
    capture: CaptureConfig,
    compositor: CompositorConfig,
    queues: FrameQueues,
    renderers: RendererSet,
    flash: FlashTrigger,
    scheduler: Option<CaptureScheduler>,
}

impl Visualiser {
    /// Creates an unlinked visualiser with the configured renderers
    /// registered in order.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let visualiser = Self {
            capture: config.capture.clone(),
            compositor: config.compositor.clone(),
            queues: FrameQueues::new(config.capture.queue_capacity),
            renderers: RendererSet::new(),
            flash: FlashTrigger::new(),
            scheduler: None,
        };

        for renderer in &config.renderers {
            visualiser.add_renderer(renderer.build()?)?;
        }

        Ok(visualiser)
    }

    /// Attaches to `source` and starts capturing. An existing link is
    /// released first. Attach failures are returned as-is and leave the
    /// visualiser unlinked.
    pub fn link(&mut self, source: &dyn AudioAnalysisSource) -> Result<()> {
        self.release()?;

        let session = source.attach(self.capture.capture_size)?;
        let capturer = Capturer::new(session, self.queues.clone());
        self.scheduler = Some(CaptureScheduler::spawn(capturer, self.capture.period())?);

        tracing::info!(
            capture_size = self.capture.capture_size,
            period_ms = self.capture.period_ms,
            "linked visualiser"
        );
        Ok(())
    }

    /// Stops capturing and releases the session. Queued frames stay where
    /// they are, so rendering continues from the last captured data.
    pub fn release(&mut self) -> Result<()> {
        match self.scheduler.take() {
            Some(mut scheduler) => scheduler.stop(),
            None => Ok(()),
        }
    }

    pub fn is_linked(&self) -> bool {
        self.scheduler.is_some()
    }

    /// Registers a new renderer and returns its handle for later removal.
    pub fn add_renderer(&self, renderer: impl Into<Renderer>) -> Result<RendererHandle> {
        let handle = RendererHandle::new(renderer);
        self.renderers.add(handle.clone())?;
        tracing::debug!(?handle, "registered renderer");
        Ok(handle)
    }

    /// Registers an existing handle. Returns `false` if already registered.
    pub fn add_handle(&self, handle: RendererHandle) -> Result<bool> {
        self.renderers.add(handle)
    }

    pub fn remove_renderer(&self, handle: &RendererHandle) -> Result<bool> {
        self.renderers.remove(handle)
    }

    pub fn clear_renderers(&self) -> Result<()> {
        self.renderers.clear()
    }

    pub fn trigger_flash(&self) {
        self.flash.trigger();
    }

    pub fn queues(&self) -> &FrameQueues {
        &self.queues
    }

    pub fn renderers(&self) -> &RendererSet {
        &self.renderers
    }

    /// A compositor sharing this visualiser's queues, renderers and flash.
    pub fn compositor(&self) -> Compositor {
        Compositor::new(
            self.queues.clone(),
            self.renderers.clone(),
            self.flash.clone(),
            self.compositor.clone(),
        )
    }

    pub fn start_rendering<S: OutputSurface + 'static>(&self, surface: S) -> Result<RenderLoop<S>> {
        RenderLoop::spawn(self.compositor(), surface)
    }
}
