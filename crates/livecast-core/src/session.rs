//! Playback Session - owns one transport handle for one source
//!
//! A session is created for a (source, live flag) pair and never patched:
//! any change to either produces a new session. Teardown releases the
//! transport first and only then detaches the sink.

use crate::{
    config::PlayerConfig,
    sink::{MediaSink, MediaSource, HLS_MIME_TYPE},
    transport::{EventSink, Transport, TransportFactory},
    types::*,
    Error, Result,
};
use tracing::{debug, info, instrument};
use url::Url;

/// Playback session managing a single source
pub struct PlaybackSession {
    /// Unique session ID
    id: SessionId,
    /// Manifest URL
    source: Url,
    /// Live-tuned session
    is_live: bool,
    /// Engine chosen by the capability check
    engine: EngineKind,
    /// Software transport, if that engine was chosen and not yet released
    transport: Option<Box<dyn Transport>>,
    /// Set once `destroy` has run
    destroyed: bool,
}

impl PlaybackSession {
    /// Pick an engine and attach it to the sink. Nothing is fetched yet.
    ///
    /// Engine order: the software client when supported, else native sink
    /// playback when the sink understands HLS, else `UnsupportedFormat`.
    /// `prefer_native` swaps the first two.
    #[instrument(skip(config, factory, sink, events), fields(session_id = %events.session()))]
    pub fn attach(
        source: Url,
        is_live: bool,
        config: &PlayerConfig,
        factory: &dyn TransportFactory,
        sink: &mut dyn MediaSink,
        events: EventSink,
    ) -> Result<Self> {
        let id = events.session();
        let engine = choose_engine(config.prefer_native, factory, &*sink)?;

        let transport = match engine {
            EngineKind::Software => {
                let transport_config = config.transport_config(is_live);
                debug!(?transport_config, "Creating software transport");
                let transport = factory.create(transport_config, events)?;
                sink.set_source(MediaSource::Managed(id));
                Some(transport)
            }
            EngineKind::Native => None,
        };

        info!(%source, is_live, %engine, "Session attached");

        Ok(Self {
            id,
            source,
            is_live,
            engine,
            transport,
            destroyed: false,
        })
    }

    /// Start fetching. Native sessions hand the URL to the sink.
    pub fn start(&mut self, sink: &mut dyn MediaSink) {
        match self.engine {
            EngineKind::Software => {
                if let Some(transport) = self.transport.as_mut() {
                    transport.load_source(&self.source);
                }
            }
            EngineKind::Native => sink.set_source(MediaSource::Native(self.source.clone())),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn source(&self) -> &Url {
        &self.source
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Live transport handle, if any
    pub fn transport_mut(&mut self) -> Option<&mut (dyn Transport + 'static)> {
        self.transport.as_deref_mut()
    }

    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    /// Release the transport but keep the session (terminal error)
    pub fn release_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            info!(session_id = %self.id, "Destroying transport");
            transport.destroy();
        }
    }

    /// Full teardown. Returns false if already torn down.
    pub fn destroy(&mut self, sink: &mut dyn MediaSink) -> bool {
        if self.destroyed {
            return false;
        }
        self.release_transport();
        sink.clear_source();
        self.destroyed = true;
        info!(session_id = %self.id, "Session destroyed");
        true
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.release_transport();
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("id", &self.id)
            .field("source", &self.source.as_str())
            .field("is_live", &self.is_live)
            .field("engine", &self.engine)
            .field("has_transport", &self.transport.is_some())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

fn choose_engine(
    prefer_native: bool,
    factory: &dyn TransportFactory,
    sink: &dyn MediaSink,
) -> Result<EngineKind> {
    let software = factory.is_supported();
    let native = sink.can_play_type(HLS_MIME_TYPE);

    match (prefer_native, software, native) {
        (true, _, true) => Ok(EngineKind::Native),
        (_, true, _) => Ok(EngineKind::Software),
        (false, false, true) => Ok(EngineKind::Native),
        _ => Err(Error::UnsupportedFormat),
    }
}
