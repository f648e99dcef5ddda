use std::{
    thread,
    time::{Duration, Instant},
};

use audio_visualiser_core::{
    AnalysisSession, AppConfig, Capturer, ClipSource, Compositor, CompositorConfig, FlashTrigger,
    FrameQueues, HeadlessSurface, LineRenderer, PassOutcome, Renderer, RendererConfig,
    RendererHandle, RendererSet, Result, Rgba, StrokeStyle, TickOutcome, Viewport, Visualiser,
};

/// Session reporting silence: every waveform byte sits at the 0x80 midpoint
/// and every spectrum bin is zero.
struct SilentSession {
    released: bool,
}

impl AnalysisSession for SilentSession {
    fn capture_size(&self) -> usize {
        512
    }

    fn is_active(&self) -> bool {
        !self.released
    }

    fn waveform(&mut self, buffer: &mut [i8]) -> Result<()> {
        buffer.fill(i8::MIN);
        Ok(())
    }

    fn spectrum(&mut self, buffer: &mut [i8]) -> Result<()> {
        buffer.fill(0);
        Ok(())
    }

    fn release(&mut self) {
        self.released = true;
    }
}

fn line_envelope(handle: &RendererHandle) -> f32 {
    handle
        .with(|renderer| match renderer {
            Renderer::Line(line) => line.envelope(),
            other => panic!("expected a line renderer, got {}", other.name()),
        })
        .unwrap()
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let started = Instant::now();
    while !condition() {
        assert!(started.elapsed() < Duration::from_secs(5), "timed out");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn silence_never_flashes_and_only_fades() {
    let queues = FrameQueues::default();
    let renderers = RendererSet::new();
    let line = RendererHandle::new(LineRenderer::new(
        StrokeStyle::new(2.0, Rgba::new(0, 128, 255, 128)),
        StrokeStyle::new(2.0, Rgba::WHITE),
    ));
    renderers.add(line.clone()).unwrap();
    let flash = FlashTrigger::new();
    let mut compositor = Compositor::new(
        queues.clone(),
        renderers,
        flash.clone(),
        CompositorConfig::default(),
    );
    let mut capturer = Capturer::new(Box::new(SilentSession { released: false }), queues);
    let mut surface = HeadlessSurface::new(Viewport::new(120, 90));

    let initial = line_envelope(&line);
    for _ in 0..10 {
        assert_eq!(
            capturer.tick(),
            TickOutcome::Captured {
                waveform: true,
                spectrum: true
            }
        );
        assert_eq!(
            compositor.render_pass(&mut surface).unwrap(),
            PassOutcome::Presented
        );
    }

    assert!(line_envelope(&line) <= initial * 0.99_f32.powi(10));
    assert!(!flash.is_pending());
    assert_eq!(surface.presented(), 10);

    // Silence is a flat line on the midline; the rest of the surface stays white.
    let frame = surface.last_frame().unwrap();
    assert_eq!(frame.pixel(60, 80), Some(Rgba::WHITE));
    assert_eq!(frame.pixel(60, 10), Some(Rgba::WHITE));
    assert_ne!(frame.pixel(60, 45), Some(Rgba::WHITE));
}

#[test]
fn releasing_mid_capture_keeps_the_last_frames() {
    let config = AppConfig {
        renderers: vec![RendererConfig::line(), RendererConfig::bars_bottom()],
        ..AppConfig::default()
    };
    let mut visualiser = Visualiser::new(&config).unwrap();
    let clip = ClipSource::tone(8_000, 2.0, &[220.0, 330.0], 4.0).looping(true);

    visualiser.link(&clip).unwrap();
    wait_until(|| {
        let queues = visualiser.queues();
        !queues.waveform().is_empty() && !queues.spectrum().is_empty()
    });
    visualiser.release().unwrap();

    let queued = visualiser.queues().waveform().len();
    assert!(queued >= 1);

    let mut compositor = visualiser.compositor();
    let mut surface = HeadlessSurface::new(Viewport::new(64, 64));
    assert_eq!(
        compositor.render_pass(&mut surface).unwrap(),
        PassOutcome::Presented
    );
    assert_eq!(compositor.latest_waveform().map(|frame| frame.len()), Some(512));
    assert!(compositor.latest_spectrum().is_some());

    // Nothing new arrives after release; the next pass reuses the same frames.
    assert_eq!(
        compositor.render_pass(&mut surface).unwrap(),
        PassOutcome::Presented
    );
    assert_eq!(compositor.latest_waveform().map(|frame| frame.len()), Some(512));
}

#[test]
fn capture_and_render_threads_run_together() {
    let mut config = AppConfig::default();
    config.capture.period_ms = 5;
    config.compositor.max_fps = Some(200);
    config.renderers = vec![RendererConfig::circle(), RendererConfig::circle_bar()];

    let mut visualiser = Visualiser::new(&config).unwrap();
    let clip = ClipSource::tone(16_000, 1.0, &[440.0], 2.0).looping(true);
    visualiser.link(&clip).unwrap();
    visualiser.trigger_flash();

    let render_loop = visualiser
        .start_rendering(HeadlessSurface::new(Viewport::new(96, 96)))
        .unwrap();
    thread::sleep(Duration::from_millis(150));

    visualiser.release().unwrap();
    let (surface, compositor) = render_loop.stop().unwrap();

    let stats = compositor.stats();
    assert!(stats.presented > 0);
    assert_eq!(stats.presented, surface.presented());
    assert!(compositor.latest_waveform().is_some());
    assert!(compositor.latest_spectrum().is_some());
    assert!(!surface.is_locked());
}

#[test]
fn one_shot_clip_stops_capturing_when_it_ends() {
    let config = AppConfig::default();
    let mut visualiser = Visualiser::new(&config).unwrap();
    let clip = ClipSource::tone(8_000, 0.1, &[440.0], 1.0);

    visualiser.link(&clip).unwrap();
    thread::sleep(Duration::from_millis(250));

    let queues = visualiser.queues().clone();
    while queues.waveform().try_pop_newest().is_some() {}
    thread::sleep(Duration::from_millis(60));
    assert!(queues.waveform().is_empty());

    visualiser.release().unwrap();
}
