//! Fakes for the platform seams, shared by unit tests.

use crossbeam_channel::Sender;
use std::cell::{Cell, RefCell};
use std::time::Duration;

use crate::audio::graph::{AudioHost, ContextInfo, GraphError};
use crate::audio::playback::{MediaBackend, MediaInfo, PlaybackError, PlaybackEvent};
use crate::audio::tap::TapPoint;
use crate::driver::{FrameHandle, FrameScheduler};

pub struct FakeHost {
    supported: bool,
    opened: Cell<usize>,
}

impl FakeHost {
    pub fn supported() -> Self {
        Self {
            supported: true,
            opened: Cell::new(0),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            opened: Cell::new(0),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.get()
    }
}

impl AudioHost for FakeHost {
    fn open_context(&self) -> Result<ContextInfo, GraphError> {
        if !self.supported {
            return Err(GraphError::UnsupportedPlatform);
        }
        self.opened.set(self.opened.get() + 1);
        Ok(ContextInfo {
            sample_rate: 48_000,
            device_name: "fake".to_string(),
        })
    }
}

/// Media backend that never touches an output device.
#[derive(Default)]
pub struct FakeBackend {
    fail_open: Cell<bool>,
    fail_play: Cell<bool>,
    events: RefCell<Option<Sender<PlaybackEvent>>>,
    volume: Cell<f32>,
    playing: Cell<bool>,
    opened: Cell<usize>,
}

impl FakeBackend {
    pub fn failing() -> Self {
        Self {
            fail_open: Cell::new(true),
            ..Self::default()
        }
    }

    /// Makes subsequent `open` calls fail, or succeed again.
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.set(fail);
    }

    /// Simulates the media running out.
    pub fn finish(&self) {
        if let Some(events) = self.events.borrow_mut().take() {
            let _ = events.send(PlaybackEvent::Ended);
        }
    }

    /// Simulates the output failing mid-playback.
    pub fn fail(&self, reason: &str) {
        if let Some(events) = self.events.borrow().as_ref() {
            let _ = events.send(PlaybackEvent::Error(reason.to_string()));
        }
        self.fail_play.set(true);
    }

    pub fn volume(&self) -> f32 {
        self.volume.get()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.get()
    }

    pub fn opened(&self) -> usize {
        self.opened.get()
    }
}

impl MediaBackend for FakeBackend {
    fn open(
        &mut self,
        url: &str,
        _tap: &TapPoint,
        events: Sender<PlaybackEvent>,
    ) -> Result<MediaInfo, PlaybackError> {
        if self.fail_open.get() {
            return Err(PlaybackError::Decode {
                url: url.to_string(),
                reason: "unsupported format".to_string(),
            });
        }
        self.opened.set(self.opened.get() + 1);
        self.playing.set(false);
        *self.events.borrow_mut() = Some(events);
        Ok(MediaInfo {
            duration: Some(Duration::from_secs(180)),
            sample_rate: 48_000,
            channels: 2,
        })
    }

    fn play(&mut self) {
        self.playing.set(!self.fail_play.get());
    }

    fn pause(&mut self) {
        self.playing.set(false);
    }

    fn stop(&mut self) {
        self.playing.set(false);
        self.events.borrow_mut().take();
    }

    fn seek(&mut self, _position: Duration) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn set_volume(&mut self, level: f32) {
        self.volume.set(level);
    }
}

/// Scheduler whose frames fire only when a test says so.
#[derive(Default)]
pub struct ManualScheduler {
    next: u64,
    pending: Option<FrameHandle>,
    pub requested: usize,
    pub cancelled: usize,
}

impl ManualScheduler {
    /// The frame callback the "display" would deliver now, if any.
    pub fn fire(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        self.requested += 1;
        let handle = FrameHandle::new(self.next);
        self.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
        self.cancelled += 1;
    }
}
