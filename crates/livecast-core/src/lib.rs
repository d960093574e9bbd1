//! Livecast Core - Adaptive HLS Playback Engine
//!
//! This crate provides the playback logic behind a live/VOD video player:
//! - Engine selection between a software HLS client and native playback
//! - Session lifecycle with strict teardown ordering
//! - Error classification and recovery routing
//! - Quality ladder selection (auto and pinned levels)
//! - Transport controls with auto-hiding chrome
//! - Viewer presence join/leave pairing
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Livecast Core                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   PlayerProps ──► ┌─────────────┐ ◄── MediaEvent / pointer      │
//! │                   │   Player    │                               │
//! │                   └──────┬──────┘ ──► PlayerView                │
//! │          ┌───────────────┼────────────────┐                     │
//! │  ┌───────┴──────┐ ┌──────┴───────┐ ┌──────┴───────┐             │
//! │  │  Lifecycle   │ │   Quality    │ │   Controls   │             │
//! │  │  + Recovery  │ │  Controller  │ │  + AutoHide  │             │
//! │  └──────────────┘ └──────────────┘ └──────────────┘             │
//! │                          │                                      │
//! │                   ┌──────┴──────┐        ┌──────────────┐       │
//! │                   │  Playback   │ ─────► │  MediaSink   │       │
//! │                   │  Session    │        └──────────────┘       │
//! │                   └──────┬──────┘                               │
//! │                          │ SessionEvent (tagged, queued)        │
//! │                   ┌──────┴──────┐                               │
//! │                   │  Transport  │  hls: playlist, buffer, ABR   │
//! │                   └─────────────┘                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod abr;
pub mod config;
pub mod controls;
pub mod error;
#[cfg(feature = "hls")]
pub mod hls;
pub mod lifecycle;
pub mod player;
pub mod presence;
pub mod session;
pub mod sink;
pub mod transport;
pub mod types;

pub use abr::{AbrEngine, QualityController, QualityOption};
pub use config::{PlayerConfig, TransportConfig};
pub use controls::{AutoHide, ControlSurface};
pub use error::{Error, ErrorCategory, PlaybackFailure, Result, TransportError};
#[cfg(feature = "hls")]
pub use hls::{HlsTransport, HlsTransportFactory};
pub use lifecycle::{Lifecycle, Overlay, RecoveryAction};
pub use player::{AutoplayOutcome, HostCallbacks, Player, PlayerEvent, PlayerView};
pub use presence::ViewerPresence;
pub use session::PlaybackSession;
pub use sink::{
    FullscreenHost, MediaEvent, MediaSink, MediaSource, NoFullscreen, PlayRejection, HLS_MIME_TYPE,
};
pub use transport::{
    EventSink, SessionEvent, Transport, TransportEvent, TransportFactory, UnsupportedTransport,
};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() {
    tracing::info!(version = VERSION, "Livecast Core initialized");
}
