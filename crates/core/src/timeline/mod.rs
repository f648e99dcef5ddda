//! Capture side of the pipeline: the playback clock sessions read from and
//! the fixed-period scheduler that feeds the frame queues.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

use crate::{
    audio::AnalysisSession,
    frame::{SampleFrame, SpectrumFrame},
    queue::{FrameQueue, DEFAULT_CAPACITY},
    Result, VisualiserError,
};

/// Wall-clock playback position.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    started: Instant,
    offset: Duration,
}

impl PlaybackClock {
    pub fn start() -> Self {
        Self::starting_at(Duration::ZERO)
    }

    /// A clock that reports `offset` as already played.
    pub fn starting_at(offset: Duration) -> Self {
        Self {
            started: Instant::now(),
            offset,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.offset + self.started.elapsed()
    }

    pub fn restart(&mut self) {
        self.started = Instant::now();
        self.offset = Duration::ZERO;
    }
}

/// The two queues shared between the capture and render threads.
#[derive(Debug, Clone)]
pub struct FrameQueues {
    waveform: Arc<FrameQueue<SampleFrame>>,
    spectrum: Arc<FrameQueue<SpectrumFrame>>,
}

impl FrameQueues {
    pub fn new(capacity: usize) -> Self {
        Self {
            waveform: Arc::new(FrameQueue::new(capacity)),
            spectrum: Arc::new(FrameQueue::new(capacity)),
        }
    }

    pub fn waveform(&self) -> &FrameQueue<SampleFrame> {
        &self.waveform
    }

    pub fn spectrum(&self) -> &FrameQueue<SpectrumFrame> {
        &self.spectrum
    }
}

impl Default for FrameQueues {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// What a single capture tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session is not playing; nothing was read.
    Inactive,
    /// Which of the two snapshots were read and queued.
    Captured { waveform: bool, spectrum: bool },
}

/// One analysis session bound to the queues it feeds.
pub struct Capturer {
    session: Box<dyn AnalysisSession>,
    queues: FrameQueues,
    ticks: u64,
}

impl Capturer {
    pub fn new(session: Box<dyn AnalysisSession>, queues: FrameQueues) -> Self {
        Self {
            session,
            queues,
            ticks: 0,
        }
    }

    /// Number of ticks that found the session active.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Reads one waveform and one spectrum snapshot and queues them. A failed
    /// read only costs that snapshot; the renderer keeps its previous frame.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.session.is_active() {
            return TickOutcome::Inactive;
        }
        self.ticks += 1;

        let size = self.session.capture_size();

        let mut bytes = vec![0i8; size];
        let waveform = match self.session.waveform(&mut bytes) {
            Ok(()) => {
                self.queues.waveform().try_push(SampleFrame::new(bytes));
                true
            }
            Err(err) => {
                tracing::warn!(%err, tick = self.ticks, "waveform snapshot failed");
                false
            }
        };

        let mut bytes = vec![0i8; size];
        let spectrum = match self.session.spectrum(&mut bytes) {
            Ok(()) => {
                self.queues.spectrum().try_push(SpectrumFrame::new(bytes));
                true
            }
            Err(err) => {
                tracing::warn!(%err, tick = self.ticks, "spectrum snapshot failed");
                false
            }
        };

        tracing::trace!(tick = self.ticks, waveform, spectrum, "capture tick");
        TickOutcome::Captured { waveform, spectrum }
    }

    /// Releases the session. Safe to call more than once.
    pub fn release(&mut self) {
        self.session.release();
    }
}

/// Runs a [`Capturer`] on its own thread at a fixed period until stopped.
pub struct CaptureScheduler {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<Capturer>>,
}

impl CaptureScheduler {
    /// Shortest period the scheduler will tick at.
    pub const MIN_PERIOD: Duration = Duration::from_millis(1);

    pub fn spawn(capturer: Capturer, period: Duration) -> Result<Self> {
        let period = period.max(Self::MIN_PERIOD);
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let handle = thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || {
                let mut capturer = capturer;
                let mut deadline = Instant::now();
                loop {
                    capturer.tick();

                    deadline += period;
                    let now = Instant::now();
                    if deadline < now {
                        // Fell behind; skip the missed ticks instead of bursting.
                        deadline = now;
                    }

                    match stop_rx.recv_timeout(deadline - now) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                capturer
            })?;

        tracing::info!(
            period_ms = period.as_millis() as u64,
            "capture scheduler started"
        );
        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops ticking, waits for the capture thread and releases its session.
    /// Once this returns no further frames are queued. Idempotent.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stop) = self.stop.take() {
            // The thread may already be gone; dropping the sender wakes it too.
            let _ = stop.send(());
        }

        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        let mut capturer = handle
            .join()
            .map_err(|_| VisualiserError::msg("capture thread panicked"))?;
        capturer.release();

        tracing::info!(ticks = capturer.ticks(), "capture scheduler stopped");
        Ok(())
    }
}

impl Drop for CaptureScheduler {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::error!(%err, "failed to stop capture scheduler");
        }
    }
}
