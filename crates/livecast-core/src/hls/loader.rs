//! Background fetch loop for one HLS session
//!
//! The loader runs on a tokio task owned by [`super::HlsTransport`]. It
//! fetches the entry playlist, then keeps the forward buffer filled from the
//! current level's media playlist, refreshing live playlists once per target
//! duration. Failed fetches are retried in place; once retries are exhausted
//! a fatal error is reported and the loop halts until the player sends a
//! recovery command.

use super::buffer::SegmentBuffer;
use super::playlist::{parse_media_playlist, parse_playlist, Fragment, MediaPlaylistInfo, Playlist, Variant};
use crate::{
    abr::AbrEngine,
    config::TransportConfig,
    error::{Error, TransportError},
    transport::{EventSink, TransportEvent},
    types::QualitySelection,
    Result,
};
use bytes::Bytes;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Poll interval while the forward buffer is full
const BUFFER_FULL_BACKOFF: Duration = Duration::from_millis(500);

/// Requests from the transport handle to the running loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoaderCommand {
    SetLevel(QualitySelection),
    StartLoad,
    RecoverMedia,
}

/// Loader tuning taken from the player configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoaderOptions {
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub live_sync_segments: u64,
    pub max_buffer_secs: f64,
}

enum Step {
    /// Go straight to the next step
    Continue,
    /// Sleep unless a command arrives first
    Wait(Duration),
    /// Nothing left to do until a command arrives
    Idle,
}

pub(crate) struct Loader {
    client: reqwest::Client,
    options: LoaderOptions,
    config: TransportConfig,
    events: EventSink,
    source: Url,
    abr: AbrEngine,
    buffer: SegmentBuffer,
    selection: QualitySelection,
    variants: Vec<Variant>,
    manifest_loaded: bool,
    /// Variant currently fetched from; `None` for single-rendition sources
    level: Option<usize>,
    playlist: Option<MediaPlaylistInfo>,
    playlist_stale: bool,
    next_sequence: Option<u64>,
    /// Wall-clock origin of the virtual playhead, set by the first fragment
    clock: Option<Instant>,
    end_reported: bool,
}

impl Loader {
    pub(crate) fn new(
        client: reqwest::Client,
        options: LoaderOptions,
        config: TransportConfig,
        events: EventSink,
        source: Url,
    ) -> Self {
        Self {
            client,
            options,
            buffer: SegmentBuffer::new(config.back_buffer_length),
            config,
            events,
            source,
            abr: AbrEngine::new(),
            selection: QualitySelection::Auto,
            variants: Vec::new(),
            manifest_loaded: false,
            level: None,
            playlist: None,
            playlist_stale: false,
            next_sequence: None,
            clock: None,
            end_reported: false,
        }
    }

    #[instrument(skip_all, fields(session_id = %self.events.session(), source = %self.source))]
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<LoaderCommand>) {
        info!("Loader started");
        let mut halted = false;

        loop {
            if halted {
                match commands.recv().await {
                    Some(command) => {
                        self.apply(command);
                        halted = false;
                    }
                    None => break,
                }
                continue;
            }

            while let Ok(command) = commands.try_recv() {
                self.apply(command);
            }

            match self.step().await {
                Ok(Step::Continue) => {}
                Ok(Step::Wait(delay)) => {
                    tokio::select! {
                        _ = sleep(delay) => {}
                        command = commands.recv() => match command {
                            Some(command) => self.apply(command),
                            None => break,
                        },
                    }
                }
                Ok(Step::Idle) => halted = true,
                Err(e) => {
                    warn!(error = %e, code = e.error_code(), "Loader halted on fatal error");
                    if !self.events.emit(TransportEvent::Error(e.into_fatal())) {
                        break;
                    }
                    halted = true;
                }
            }
        }

        debug!("Loader stopped");
    }

    fn apply(&mut self, command: LoaderCommand) {
        debug!(?command, "Loader command");
        match command {
            LoaderCommand::StartLoad => {}
            LoaderCommand::RecoverMedia => self.drop_ahead(),
            LoaderCommand::SetLevel(selection) => {
                if selection == self.selection {
                    return;
                }
                self.selection = selection;
                // A pinned level replaces what is buffered ahead right away
                if let QualitySelection::Level(index) = selection {
                    if Some(index) != self.level {
                        self.drop_ahead();
                    }
                }
            }
        }
    }

    fn drop_ahead(&mut self) {
        if let Some(sequence) = self.buffer.drop_ahead() {
            self.next_sequence = Some(sequence);
            self.end_reported = false;
        }
    }

    async fn step(&mut self) -> Result<Step> {
        if !self.manifest_loaded {
            self.load_manifest().await?;
            return Ok(Step::Continue);
        }

        self.advance_playhead();
        if !self.buffer.needs_data(self.options.max_buffer_secs) {
            return Ok(Step::Wait(BUFFER_FULL_BACKOFF));
        }

        let level = self.choose_level();
        if level != self.level || self.playlist.is_none() || self.playlist_stale {
            self.load_level(level).await?;
        }

        let Some(playlist) = self.playlist.as_ref() else {
            return Err(Error::InvalidManifest("no media playlist loaded".into()));
        };

        let next = match (self.next_sequence, playlist.first_sequence()) {
            (Some(next), Some(first)) if next >= first => Some(next),
            _ => playlist.start_sequence(self.options.live_sync_segments),
        };

        match next.and_then(|sequence| playlist.fragment(sequence)).cloned() {
            Some(fragment) => {
                self.load_fragment(fragment).await?;
                Ok(Step::Continue)
            }
            None if playlist.is_live() => {
                self.next_sequence = next;
                self.playlist_stale = true;
                Ok(Step::Wait(self.refresh_interval(playlist)))
            }
            None => {
                if !self.end_reported {
                    info!("All fragments buffered");
                    self.end_reported = true;
                    self.events.emit(TransportEvent::EndOfStream);
                }
                Ok(Step::Idle)
            }
        }
    }

    /// Live playlists reload once per target duration, twice as often in
    /// low-latency mode.
    fn refresh_interval(&self, playlist: &MediaPlaylistInfo) -> Duration {
        let target = playlist.target_duration.max(Duration::from_secs(1));
        if self.config.low_latency_mode {
            target / 2
        } else {
            target
        }
    }

    fn choose_level(&mut self) -> Option<usize> {
        if self.variants.is_empty() {
            return None;
        }
        match self.selection {
            QualitySelection::Level(index) if index < self.variants.len() => Some(index),
            _ => {
                let bandwidths: Vec<u64> = self.variants.iter().map(|v| v.bandwidth).collect();
                self.abr.select_level(&bandwidths)
            }
        }
    }

    /// Playhead advances with wall time from the first fragment and holds at
    /// the buffered end while starved.
    fn advance_playhead(&mut self) {
        let Some(origin) = self.clock else {
            return;
        };
        let end = self.buffer.buffered_end();
        let mut position = origin.elapsed().as_secs_f64();
        if position > end {
            position = end;
            self.clock = Instant::now().checked_sub(Duration::from_secs_f64(end));
        }
        self.buffer.update_position(position);
    }

    #[instrument(skip(self))]
    async fn load_manifest(&mut self) -> Result<()> {
        let source = self.source.clone();
        let (body, _) = self
            .fetch(&source, |_, e| Error::ManifestFetch(e.to_string()))
            .await?;

        match parse_playlist(&body, &source)? {
            Playlist::Master(variants) => {
                if variants.is_empty() {
                    return Err(Error::InvalidManifest("no variant streams".into()));
                }
                info!(levels = variants.len(), "Multivariant playlist loaded");
                let levels = variants.iter().map(Variant::level).collect();
                self.variants = variants;
                self.events.emit(TransportEvent::ManifestParsed { levels });
            }
            Playlist::Media(media) => {
                info!(
                    fragments = media.fragments.len(),
                    live = media.is_live(),
                    "Single-rendition playlist loaded"
                );
                self.playlist = Some(media);
                self.events.emit(TransportEvent::ManifestParsed { levels: Vec::new() });
            }
        }

        self.manifest_loaded = true;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_level(&mut self, level: Option<usize>) -> Result<()> {
        let url = level
            .and_then(|index| self.variants.get(index))
            .map(|variant| variant.uri.clone())
            .unwrap_or_else(|| self.source.clone());

        let (body, _) = self
            .fetch(&url, |_, e| Error::ManifestFetch(e.to_string()))
            .await?;
        let media = parse_media_playlist(&body, &url)?;
        debug!(
            fragments = media.fragments.len(),
            first = ?media.first_sequence(),
            last = ?media.last_sequence(),
            "Media playlist loaded"
        );

        self.playlist = Some(media);
        self.playlist_stale = false;

        if level != self.level {
            self.level = level;
            if let Some(index) = level {
                info!(level = index, "Switched level");
                self.events.emit(TransportEvent::LevelSwitched { level: index });
            }
        }
        Ok(())
    }

    async fn load_fragment(&mut self, fragment: Fragment) -> Result<()> {
        let (data, elapsed) = self
            .fetch(&fragment.uri, |url, source| Error::FragmentFetch {
                url: url.to_string(),
                source,
            })
            .await?;

        if data.is_empty() {
            return Err(Error::FragmentEmpty {
                url: fragment.uri.to_string(),
            });
        }

        self.abr.record_measurement(data.len(), elapsed);
        self.buffer.append(fragment.sequence, fragment.duration, data);
        self.next_sequence = Some(fragment.sequence + 1);
        if self.clock.is_none() {
            self.clock = Some(Instant::now());
        }

        self.events.emit(TransportEvent::FragmentBuffered {
            level: self.level,
            sequence: fragment.sequence,
            duration: fragment.duration,
        });
        Ok(())
    }

    /// GET with in-place retries. Each failed attempt that will be retried is
    /// reported as a non-fatal error.
    async fn fetch(
        &self,
        url: &Url,
        map_err: impl Fn(&Url, reqwest::Error) -> Error,
    ) -> Result<(Bytes, Duration)> {
        let mut attempt = 0;
        loop {
            let started = Instant::now();
            match self.get(url).await {
                Ok(body) => return Ok((body, started.elapsed())),
                Err(e) => {
                    let error = map_err(url, e);
                    if attempt >= self.options.retry_attempts || !error.is_recoverable() {
                        return Err(error);
                    }
                    attempt += 1;
                    warn!(%url, attempt, error = %error, "Fetch failed, retrying");
                    self.events.emit(TransportEvent::Error(TransportError::non_fatal(
                        error.category(),
                        error.to_string(),
                    )));
                    sleep(self.options.retry_delay).await;
                }
            }
        }
    }

    async fn get(&self, url: &Url) -> std::result::Result<Bytes, reqwest::Error> {
        self.client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await
    }
}
