//! Headless media sink
//!
//! Stands in for a video element. It decodes nothing; it only models the
//! play/pause state machine and queues the media events a real element would
//! fire so the driver loop can hand them to the player.

use livecast_core::{MediaEvent, MediaSink, MediaSource, PlayRejection};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct SinkState {
    attached: bool,
    has_data: bool,
    play_requested: bool,
    playing: bool,
    /// Reject the next play request as an autoplay policy would
    block_next_play: bool,
    pending: VecDeque<MediaEvent>,
}

impl SinkState {
    fn push(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::Playing => self.playing = true,
            MediaEvent::Pause | MediaEvent::Ended => self.playing = false,
            _ => {}
        }
        self.pending.push_back(event);
    }
}

/// Shared handle the driver uses to feed data arrival and drain events
#[derive(Debug, Clone, Default)]
pub struct SinkHandle(Rc<RefCell<SinkState>>);

impl SinkHandle {
    pub fn new(block_autoplay: bool) -> Self {
        let handle = Self::default();
        handle.0.borrow_mut().block_next_play = block_autoplay;
        handle
    }

    pub fn sink(&self) -> HeadlessSink {
        HeadlessSink(self.clone())
    }

    /// First media data reached the sink
    pub fn on_data(&self) {
        let mut state = self.0.borrow_mut();
        if !state.attached || state.has_data {
            return;
        }
        state.has_data = true;
        state.push(MediaEvent::LoadedData);
        if state.play_requested {
            state.push(MediaEvent::Playing);
        }
    }

    /// The buffered media ran out
    pub fn on_end(&self) {
        let mut state = self.0.borrow_mut();
        if state.attached {
            state.push(MediaEvent::Ended);
        }
    }

    pub fn next_event(&self) -> Option<MediaEvent> {
        self.0.borrow_mut().pending.pop_front()
    }
}

pub struct HeadlessSink(SinkHandle);

impl MediaSink for HeadlessSink {
    fn can_play_type(&self, _mime: &str) -> bool {
        false
    }

    fn set_source(&mut self, source: MediaSource) {
        let mut state = self.0 .0.borrow_mut();
        let block_next_play = state.block_next_play;
        *state = SinkState {
            attached: true,
            block_next_play,
            ..Default::default()
        };
        debug!(?source, "Sink source attached");
    }

    fn clear_source(&mut self) {
        let mut state = self.0 .0.borrow_mut();
        state.attached = false;
        state.has_data = false;
        state.play_requested = false;
        state.playing = false;
        state.pending.clear();
        debug!("Sink source cleared");
    }

    fn set_poster(&mut self, poster: Option<&str>) {
        debug!(?poster, "Poster set");
    }

    fn play(&mut self) -> Result<(), PlayRejection> {
        let mut state = self.0 .0.borrow_mut();
        if state.block_next_play {
            state.block_next_play = false;
            return Err(PlayRejection::NotAllowed);
        }
        if !state.attached {
            return Err(PlayRejection::Aborted);
        }
        state.play_requested = true;
        if state.has_data && !state.playing {
            state.push(MediaEvent::Playing);
        }
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = self.0 .0.borrow_mut();
        state.play_requested = false;
        if state.playing {
            state.push(MediaEvent::Pause);
        }
    }

    fn set_volume(&mut self, volume: f64) {
        debug!(volume, "Volume set");
    }

    fn set_muted(&mut self, muted: bool) {
        info!(muted, "Mute set");
    }
}
