//! Core types for Livecast

use crate::error::PlaybackFailure;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A quality level parsed from the manifest. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualityLevel {
    /// Position in the manifest's variant list
    pub index: usize,
    /// Vertical resolution in pixels (0 when the manifest omits it)
    pub height: u32,
}

impl QualityLevel {
    pub fn new(index: usize, height: u32) -> Self {
        Self { index, height }
    }

    /// Label shown in the quality selector
    pub fn label(&self) -> String {
        if self.height == 0 {
            format!("Level {}", self.index + 1)
        } else {
            format!("{}p", self.height)
        }
    }
}

/// Requested quality: network-adaptive or pinned to a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QualitySelection {
    #[default]
    Auto,
    Level(usize),
}

impl QualitySelection {
    /// Sentinel used by adaptive-streaming clients for automatic selection
    pub const AUTO_INDEX: i64 = -1;

    /// Integer form, `-1` for `Auto`
    pub fn as_index(&self) -> i64 {
        match self {
            QualitySelection::Auto => Self::AUTO_INDEX,
            QualitySelection::Level(index) => *index as i64,
        }
    }

    pub fn from_index(index: i64) -> Self {
        if index < 0 {
            QualitySelection::Auto
        } else {
            QualitySelection::Level(index as usize)
        }
    }
}

impl std::fmt::Display for QualitySelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualitySelection::Auto => write!(f, "auto"),
            QualitySelection::Level(index) => write!(f, "level {}", index),
        }
    }
}

impl std::str::FromStr for QualitySelection {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(QualitySelection::Auto);
        }
        s.parse::<i64>().map(QualitySelection::from_index)
    }
}

/// Which engine a session plays through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineKind {
    /// Software demuxing client with adaptive bitrate
    Software,
    /// The media sink decodes the manifest itself
    Native,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Software => write!(f, "software"),
            EngineKind::Native => write!(f, "native"),
        }
    }
}

/// Playback lifecycle states
///
/// `Playing` means the pipeline is producing frames; whether the viewer has
/// paused is tracked by the control surface, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No session
    Idle,
    /// Session created, waiting for the first frame
    Loading,
    /// Frames are being produced
    Playing,
    /// The sink stalled waiting for data
    Buffering,
    /// The sink reached the end of the media
    Ended,
    /// Terminal failure
    Errored(PlaybackFailure),
}

impl PlaybackState {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: PlaybackState) -> bool {
        use PlaybackState::*;
        match (self, target) {
            // Any live state may fail or be torn down
            (Idle, Errored(_)) => true,
            (Errored(_), _) => matches!(target, Idle | Loading),
            (_, Errored(_)) | (_, Idle) => true,
            (Idle, Loading) => true,
            (Loading, Playing) | (Loading, Buffering) | (Loading, Ended) => true,
            (Playing, Buffering) | (Playing, Ended) => true,
            (Buffering, Playing) | (Buffering, Ended) => true,
            (Ended, Playing) | (Ended, Buffering) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackState::Errored(failure) if failure.is_terminal())
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Loading => write!(f, "loading"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Buffering => write!(f, "buffering"),
            PlaybackState::Ended => write!(f, "ended"),
            PlaybackState::Errored(failure) => write!(f, "errored({})", failure),
        }
    }
}

/// Inputs supplied by the host page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProps {
    /// Manifest URL; `None` means no session is created
    pub source: Option<String>,
    /// Image shown before the first frame
    pub poster: Option<String>,
    /// Selects live-tuned transport configuration and live-edge autoplay
    pub is_live: bool,
    /// Cosmetic, owned by the host
    pub is_theater_mode: bool,
}

impl PlayerProps {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Default::default()
        }
    }

    pub fn live(mut self, is_live: bool) -> Self {
        self.is_live = is_live;
        self
    }

    pub fn with_poster(mut self, poster: impl Into<String>) -> Self {
        self.poster = Some(poster.into());
        self
    }

    pub fn with_theater_mode(mut self, theater: bool) -> Self {
        self.is_theater_mode = theater;
        self
    }

    /// Whether switching from `self` to `next` requires a new session
    pub fn requires_new_session(&self, next: &PlayerProps) -> bool {
        self.source != next.source || self.is_live != next.is_live
    }
}
