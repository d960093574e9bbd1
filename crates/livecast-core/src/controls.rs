//! Playback control surface
//!
//! Display state here is driven by what the sink and platform report, not by
//! what was requested: the play button follows `Playing`/`Pause` events and
//! the fullscreen button follows fullscreen-change events.

use crate::sink::{FullscreenHost, MediaEvent, MediaSink, PlayRejection};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Play/pause, volume and fullscreen display state
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSurface {
    playing: bool,
    muted: bool,
    volume: f64,
    fullscreen: bool,
}

impl ControlSurface {
    pub fn new(initial_volume: f64) -> Self {
        let volume = initial_volume.clamp(0.0, 1.0);
        Self {
            playing: false,
            muted: volume == 0.0,
            volume,
            fullscreen: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Push the current volume/mute state to a freshly attached sink
    pub fn apply_to(&self, sink: &mut dyn MediaSink) {
        sink.set_volume(self.volume);
        sink.set_muted(self.muted);
    }

    /// Track the sink's actual play state
    pub fn on_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::Playing => self.playing = true,
            MediaEvent::Pause | MediaEvent::Ended => self.playing = false,
            MediaEvent::LoadedData | MediaEvent::Waiting => {}
        }
    }

    /// Ask the sink to play or pause; display changes when the sink reports back
    pub fn toggle_play(&self, sink: &mut dyn MediaSink) -> Result<(), PlayRejection> {
        if self.playing {
            sink.pause();
            Ok(())
        } else {
            sink.play()
        }
    }

    /// Flip mute. At volume zero the display stays muted.
    pub fn toggle_mute(&mut self, sink: &mut dyn MediaSink) {
        self.muted = !self.muted || self.volume == 0.0;
        sink.set_muted(self.muted);
    }

    /// Set absolute volume. Zero reads as muted; anything above unmutes.
    pub fn set_volume(&mut self, sink: &mut dyn MediaSink, volume: f64) {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.volume = volume;
        self.muted = volume == 0.0;
        sink.set_volume(volume);
        sink.set_muted(self.muted);
    }

    pub fn toggle_fullscreen(&self, host: &mut dyn FullscreenHost) {
        if self.fullscreen {
            host.exit_fullscreen();
        } else {
            host.request_fullscreen();
        }
    }

    pub fn on_fullscreen_change(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    /// Forget the play state of a detached sink. Volume, mute and
    /// fullscreen belong to the player and carry over.
    pub fn reset(&mut self) {
        self.playing = false;
    }
}

/// Single-shot timer that hides the controls after pointer inactivity
///
/// Holds at most one deadline; re-arming replaces it.
#[derive(Debug, Clone)]
pub struct AutoHide {
    delay: Duration,
    visible: bool,
    deadline: Option<Instant>,
}

impl AutoHide {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            visible: true,
            deadline: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Pending hide, if armed
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Pointer moved over the player: show, and re-arm while playing
    pub fn on_pointer_move(&mut self, now: Instant, playing: bool) {
        self.visible = true;
        self.deadline = playing.then(|| now + self.delay);
    }

    /// Pointer left the player: show and disarm until playback resumes
    pub fn on_pointer_leave(&mut self) {
        self.visible = true;
        self.deadline = None;
    }

    /// Playback started or stopped
    pub fn on_playing_changed(&mut self, now: Instant, playing: bool) {
        if playing {
            if self.visible {
                self.deadline = Some(now + self.delay);
            }
        } else {
            self.visible = true;
            self.deadline = None;
        }
    }

    /// Fire the timer if due. Returns true if the controls were hidden.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                debug!("Hiding idle controls");
                self.visible = false;
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Back to the initial visible, disarmed state
    pub fn reset(&mut self) {
        self.visible = true;
        self.deadline = None;
    }
}
