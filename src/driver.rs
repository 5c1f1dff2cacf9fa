use log::trace;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::window::Window;

/// Identifies one requested frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Source of display-refresh callbacks.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;

    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Frames driven by winit redraw requests. The pending handle is taken when
/// `RedrawRequested` arrives.
pub struct WindowScheduler {
    window: Arc<Window>,
    next: u64,
    pending: Option<FrameHandle>,
}

impl WindowScheduler {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            next: 0,
            pending: None,
        }
    }

    pub fn take_pending(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }
}

impl FrameScheduler for WindowScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        let handle = FrameHandle(self.next);
        self.pending = Some(handle);
        self.window.request_redraw();
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Scheduled(FrameHandle),
}

/// Per-frame loop: while playback is active each tick samples, renders and
/// resubmits itself. `stop` cancels the pending tick so nothing renders after it.
pub struct AnimationDriver<S: FrameScheduler> {
    scheduler: S,
    state: DriverState,
    last_tick: Option<Instant>,
    ticks: u64,
}

impl<S: FrameScheduler> AnimationDriver<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            state: DriverState::Idle,
            last_tick: None,
            ticks: 0,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn is_scheduled(&self) -> bool {
        matches!(self.state, DriverState::Scheduled(_))
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn start(&mut self) {
        if self.state == DriverState::Idle {
            self.state = DriverState::Scheduled(self.scheduler.request_frame());
            self.last_tick = None;
        }
    }

    pub fn stop(&mut self) {
        if let DriverState::Scheduled(handle) = self.state {
            self.scheduler.cancel_frame(handle);
            self.state = DriverState::Idle;
        }
    }

    /// Runs one frame for `handle`. Stale or cancelled handles are ignored.
    /// The frame only runs, and the next one is only requested, while
    /// `playing` holds. Returns whether `frame` ran.
    pub fn tick<F: FnOnce()>(&mut self, handle: FrameHandle, playing: bool, frame: F) -> bool {
        if self.state != DriverState::Scheduled(handle) {
            trace!("Ignoring stale frame {:?}", handle);
            return false;
        }
        self.state = DriverState::Idle;
        if !playing {
            return false;
        }

        let now = Instant::now();
        if let Some(last) = self.last_tick.replace(now) {
            trace!("Frame interval {:?}", now.duration_since(last));
        }
        self.ticks += 1;

        frame();
        self.state = DriverState::Scheduled(self.scheduler.request_frame());
        true
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Time since the previous tick; frames may be dropped, so this varies.
    pub fn since_last_tick(&self) -> Option<Duration> {
        self.last_tick.map(|t| t.elapsed())
    }
}
