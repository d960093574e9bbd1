//! Transport abstraction
//!
//! A transport is the adaptive-streaming client: it fetches the manifest and
//! fragments, picks quality levels and feeds the media sink. Everything it
//! learns is reported asynchronously as [`TransportEvent`]s, each stamped with
//! the [`SessionId`] of the session that created it, so the player can drop
//! callbacks that arrive after their session was torn down.

use crate::{config::TransportConfig, error::TransportError, types::*, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::trace;
use url::Url;

/// Events a transport reports back to the player
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The manifest was parsed; levels are in manifest order
    ManifestParsed { levels: Vec<QualityLevel> },
    /// The transport is now fetching from this level
    LevelSwitched { level: usize },
    /// A fragment was appended to the sink's buffer
    FragmentBuffered {
        level: Option<usize>,
        sequence: u64,
        duration: Duration,
    },
    /// Every fragment of a VOD stream has been buffered
    EndOfStream,
    Error(TransportError),
}

/// A transport event tagged with its originating session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub session: SessionId,
    pub event: TransportEvent,
}

/// Session-scoped sender handed to a transport
#[derive(Debug, Clone)]
pub struct EventSink {
    session: SessionId,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    pub fn new(session: SessionId, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Queue an event. Returns false once the player is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        trace!(session_id = %self.session, ?event, "Transport event");
        self.tx
            .send(SessionEvent {
                session: self.session,
                event,
            })
            .is_ok()
    }
}

/// Adaptive-streaming client bound to one session
///
/// All methods return immediately; results arrive through the session's
/// [`EventSink`].
pub trait Transport {
    /// Begin loading the manifest at `url`
    fn load_source(&mut self, url: &Url);

    /// Resume loading after a fatal network error
    fn start_load(&mut self);

    /// Reset the decoding pipeline after a fatal media error
    fn recover_media_error(&mut self);

    /// Request a level switch; `Auto` returns control to bandwidth estimation
    fn set_level(&mut self, selection: QualitySelection);

    /// Abort all in-flight work and release resources. Idempotent.
    fn destroy(&mut self);
}

/// Constructs transports and reports whether the client can run here
pub trait TransportFactory {
    fn is_supported(&self) -> bool;

    fn create(&self, config: TransportConfig, events: EventSink) -> Result<Box<dyn Transport>>;
}

/// A factory for environments without a software client
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedTransport;

impl TransportFactory for UnsupportedTransport {
    fn is_supported(&self) -> bool {
        false
    }

    fn create(&self, _config: TransportConfig, _events: EventSink) -> Result<Box<dyn Transport>> {
        Err(crate::Error::UnsupportedFormat)
    }
}
