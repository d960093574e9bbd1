//! Session lifecycle and error policy
//!
//! ```text
//!   Loading ──► Playing ◄──► Buffering ──► Ended
//!      │           │             │           │
//!      └───────────┴──── Errored(terminal) ◄─┘
//! ```
//!
//! Fatal network and media errors leave the state untouched and show a
//! transient message while the transport recovers. Anything else is terminal:
//! the transport is destroyed and only a re-mount retries.

use crate::{
    error::{PlaybackFailure, TransportError},
    sink::MediaEvent,
    types::PlaybackState,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// What the player must ask of the transport after a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Non-fatal error; nothing to do
    Ignore,
    /// Resume loading
    StartLoad,
    /// Reset the decoder
    RecoverMediaError,
    /// Give up and release the transport
    Destroy,
}

/// Message overlaid on the video surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlay {
    pub failure: PlaybackFailure,
    pub text: String,
    /// Blocking; offers a manual retry
    pub terminal: bool,
}

impl Overlay {
    fn for_failure(failure: PlaybackFailure) -> Self {
        Self {
            failure,
            text: failure.message().to_string(),
            terminal: failure.is_terminal(),
        }
    }
}

/// Lifecycle state machine for one player
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: PlaybackState,
    overlay: Option<Overlay>,
    first_frame: bool,
    recoveries: u32,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            overlay: None,
            first_frame: false,
            recoveries: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Whether the first frame has been shown this session
    pub fn has_first_frame(&self) -> bool {
        self.first_frame
    }

    /// Recovery actions taken this session
    pub fn recoveries(&self) -> u32 {
        self.recoveries
    }

    /// Loading indicator overlay
    pub fn show_spinner(&self) -> bool {
        matches!(self.state, PlaybackState::Loading | PlaybackState::Buffering)
    }

    /// A new session was created
    pub fn begin(&mut self) {
        self.reset();
        self.transition(PlaybackState::Loading);
    }

    /// Session torn down
    pub fn reset(&mut self) {
        self.state = PlaybackState::Idle;
        self.overlay = None;
        self.first_frame = false;
        self.recoveries = 0;
    }

    /// Enter a terminal failure directly (unsupported format, bad source)
    pub fn fail(&mut self, failure: PlaybackFailure) {
        warn!(%failure, "Playback failed");
        self.transition(PlaybackState::Errored(failure));
        self.overlay = Some(Overlay::for_failure(failure));
    }

    /// Route a transport error through the recovery policy
    pub fn on_transport_error(&mut self, error: &TransportError) -> RecoveryAction {
        if self.is_terminal() {
            debug!(%error, "Error after terminal failure ignored");
            return RecoveryAction::Ignore;
        }
        if !error.fatal {
            debug!(%error, "Non-fatal transport error ignored");
            return RecoveryAction::Ignore;
        }

        let failure = PlaybackFailure::classify(error);
        match failure {
            PlaybackFailure::NetworkTransient => {
                self.recoveries += 1;
                warn!(%error, recoveries = self.recoveries, "Fatal network error, resuming load");
                self.overlay = Some(Overlay::for_failure(failure));
                RecoveryAction::StartLoad
            }
            PlaybackFailure::MediaDecodeTransient => {
                self.recoveries += 1;
                warn!(%error, recoveries = self.recoveries, "Fatal media error, recovering decoder");
                self.overlay = Some(Overlay::for_failure(failure));
                RecoveryAction::RecoverMediaError
            }
            PlaybackFailure::Unclassified | PlaybackFailure::UnsupportedFormat => {
                self.fail(failure);
                RecoveryAction::Destroy
            }
        }
    }

    /// Playback resumed; transient messages go away
    pub fn clear_transient(&mut self) {
        if self.overlay.as_ref().is_some_and(|o| !o.terminal) {
            info!("Recovered from transient error");
            self.overlay = None;
        }
    }

    /// Apply a media sink event
    pub fn on_media_event(&mut self, event: MediaEvent) {
        if self.is_terminal() || self.state == PlaybackState::Idle {
            return;
        }

        match event {
            MediaEvent::LoadedData => {
                self.first_frame = true;
                if self.state == PlaybackState::Loading {
                    self.transition(PlaybackState::Playing);
                }
            }
            MediaEvent::Playing => {
                self.first_frame = true;
                self.clear_transient();
                self.transition(PlaybackState::Playing);
            }
            MediaEvent::Waiting => {
                if self.state == PlaybackState::Playing {
                    self.transition(PlaybackState::Buffering);
                }
            }
            MediaEvent::Ended => self.transition(PlaybackState::Ended),
            MediaEvent::Pause => {}
        }
    }

    fn transition(&mut self, next: PlaybackState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            debug!(from = %self.state, to = %next, "Ignoring invalid lifecycle transition");
            return;
        }
        info!(from = %self.state, to = %next, "State transition");
        self.state = next;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
