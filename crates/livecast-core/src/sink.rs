//! Media sink and fullscreen host abstractions
//!
//! The sink is the video-capable surface a session attaches to. It reports
//! what actually happened (playing, paused, stalled) through [`MediaEvent`]s;
//! the player derives display state from those events rather than from the
//! requests it made.

use crate::types::SessionId;
use url::Url;

/// MIME type probed for native manifest support
pub const HLS_MIME_TYPE: &str = "application/vnd.apple.mpegurl";

/// What the sink is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// The sink decodes the manifest itself
    Native(Url),
    /// A software transport feeds the sink for this session
    Managed(SessionId),
}

/// Events emitted by the media sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    /// First frame is available
    LoadedData,
    Playing,
    Pause,
    /// Playback stalled waiting for data
    Waiting,
    Ended,
}

/// Why the sink refused to start playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayRejection {
    /// Platform autoplay policy requires a user gesture
    NotAllowed,
    /// A newer load or pause interrupted the request
    Aborted,
    Failed(String),
}

impl std::fmt::Display for PlayRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayRejection::NotAllowed => write!(f, "playback not allowed without user gesture"),
            PlayRejection::Aborted => write!(f, "play request aborted"),
            PlayRejection::Failed(reason) => write!(f, "play failed: {}", reason),
        }
    }
}

/// Video-capable output surface
pub trait MediaSink {
    /// Whether the sink natively understands `mime`
    fn can_play_type(&self, mime: &str) -> bool;

    fn set_source(&mut self, source: MediaSource);

    /// Detach whatever source is attached
    fn clear_source(&mut self);

    fn set_poster(&mut self, poster: Option<&str>);

    fn play(&mut self) -> Result<(), PlayRejection>;

    fn pause(&mut self);

    fn set_volume(&mut self, volume: f64);

    fn set_muted(&mut self, muted: bool);
}

/// Platform fullscreen API for the player's container
///
/// Requests may be denied or reversed by the platform; the player only trusts
/// the fullscreen-change events it is later handed.
pub trait FullscreenHost {
    fn request_fullscreen(&mut self);

    fn exit_fullscreen(&mut self);
}

/// A fullscreen host that never enters fullscreen
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFullscreen;

impl FullscreenHost for NoFullscreen {
    fn request_fullscreen(&mut self) {}

    fn exit_fullscreen(&mut self) {}
}
