//! Software HLS client
//!
//! [`HlsTransportFactory`] builds one [`HlsTransport`] per playback session.
//! The transport is a thin handle: `load_source` spawns a loader task on the
//! ambient tokio runtime and every other call is forwarded to it as a
//! command. Dropping or destroying the handle aborts the task.

mod buffer;
mod loader;
mod playlist;

pub use buffer::{BufferStats, BufferedFragment, SegmentBuffer};
pub use loader::LoaderOptions;
pub use playlist::{
    parse_media_playlist, parse_playlist, Fragment, MediaPlaylistInfo, Playlist, Variant,
};

use crate::{
    config::{PlayerConfig, TransportConfig},
    error::{ErrorCategory, TransportError},
    transport::{EventSink, Transport, TransportEvent, TransportFactory},
    types::QualitySelection,
    Result,
};
use loader::{Loader, LoaderCommand};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use url::Url;

/// Creates HTTP-backed HLS transports sharing one connection pool
#[derive(Debug, Clone)]
pub struct HlsTransportFactory {
    client: reqwest::Client,
    options: LoaderOptions,
}

impl HlsTransportFactory {
    pub fn new(config: &PlayerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Use a preconfigured client
    pub fn with_client(client: reqwest::Client, config: &PlayerConfig) -> Self {
        Self {
            client,
            options: LoaderOptions {
                retry_attempts: config.fragment_retry_attempts,
                retry_delay: config.retry_delay(),
                live_sync_segments: config.live_sync_segments,
                max_buffer_secs: config.max_buffer_secs,
            },
        }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }
}

impl TransportFactory for HlsTransportFactory {
    fn is_supported(&self) -> bool {
        true
    }

    fn create(&self, config: TransportConfig, events: EventSink) -> Result<Box<dyn Transport>> {
        Ok(Box::new(HlsTransport::new(
            self.client.clone(),
            self.options,
            config,
            events,
        )))
    }
}

/// Handle to a running loader task
pub struct HlsTransport {
    client: reqwest::Client,
    options: LoaderOptions,
    config: TransportConfig,
    events: EventSink,
    commands: Option<mpsc::UnboundedSender<LoaderCommand>>,
    task: Option<JoinHandle<()>>,
    destroyed: bool,
}

impl HlsTransport {
    pub fn new(
        client: reqwest::Client,
        options: LoaderOptions,
        config: TransportConfig,
        events: EventSink,
    ) -> Self {
        Self {
            client,
            options,
            config,
            events,
            commands: None,
            task: None,
            destroyed: false,
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn send(&self, command: LoaderCommand) {
        match &self.commands {
            Some(tx) => {
                if tx.send(command).is_err() {
                    debug!(?command, "Loader already stopped");
                }
            }
            None => debug!(?command, "No loader running"),
        }
    }

    fn stop_loader(&mut self) {
        self.commands = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Transport for HlsTransport {
    fn load_source(&mut self, url: &Url) {
        if self.destroyed {
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = %e, "HLS transport requires a tokio runtime");
                self.events.emit(TransportEvent::Error(TransportError::fatal(
                    ErrorCategory::Other,
                    format!("no async runtime: {}", e),
                )));
                return;
            }
        };

        self.stop_loader();
        let (tx, rx) = mpsc::unbounded_channel();
        let loader = Loader::new(
            self.client.clone(),
            self.options,
            self.config,
            self.events.clone(),
            url.clone(),
        );
        self.task = Some(runtime.spawn(loader.run(rx)));
        self.commands = Some(tx);
        info!(session_id = %self.events.session(), %url, "HLS loader spawned");
    }

    fn start_load(&mut self) {
        self.send(LoaderCommand::StartLoad);
    }

    fn recover_media_error(&mut self) {
        self.send(LoaderCommand::RecoverMedia);
    }

    fn set_level(&mut self, selection: QualitySelection) {
        self.send(LoaderCommand::SetLevel(selection));
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.stop_loader();
        self.destroyed = true;
        info!(session_id = %self.events.session(), "HLS transport destroyed");
    }
}

impl Drop for HlsTransport {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for HlsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HlsTransport")
            .field("session", &self.events.session())
            .field("config", &self.config)
            .field("running", &self.task.is_some())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}
