//! Recording fakes shared by the integration tests

#![allow(dead_code)]

use livecast_core::{
    EventSink, FullscreenHost, HostCallbacks, MediaSink, MediaSource, PlayRejection, Player,
    PlayerConfig, QualitySelection, Result, Transport, TransportConfig, TransportEvent,
    TransportFactory, HLS_MIME_TYPE,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use url::Url;

pub const VOD_URL: &str = "https://cdn.example.com/vod/master.m3u8";
pub const LIVE_URL: &str = "https://cdn.example.com/live/master.m3u8";

/// Ordered record of every side effect the player caused
#[derive(Clone, Default)]
pub struct Log(Rc<RefCell<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.borrow().iter().filter(|e| e.as_str() == entry).count()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.borrow().iter().position(|e| e == entry)
    }
}

/// A transport the factory handed out
#[derive(Clone)]
pub struct CreatedTransport {
    pub config: TransportConfig,
    pub events: EventSink,
}

/// Shared controls and records for one player under test
#[derive(Clone)]
pub struct Harness {
    pub log: Log,
    pub created: Rc<RefCell<Vec<CreatedTransport>>>,
    pub software_supported: Rc<Cell<bool>>,
    pub native_hls: Rc<Cell<bool>>,
    pub reject_autoplay: Rc<Cell<bool>>,
    pub joins: Rc<Cell<u32>>,
    pub leaves: Rc<Cell<u32>>,
    pub theater_toggles: Rc<Cell<u32>>,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            log: Log::default(),
            created: Rc::default(),
            software_supported: Rc::new(Cell::new(true)),
            native_hls: Rc::new(Cell::new(false)),
            reject_autoplay: Rc::new(Cell::new(false)),
            joins: Rc::default(),
            leaves: Rc::default(),
            theater_toggles: Rc::default(),
        }
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that can play HLS itself, with no software client available
    pub fn native_only() -> Self {
        let harness = Self::default();
        harness.software_supported.set(false);
        harness.native_hls.set(true);
        harness
    }

    pub fn player(&self) -> Player {
        self.player_with(PlayerConfig::default(), self.callbacks())
    }

    pub fn player_with(&self, config: PlayerConfig, callbacks: HostCallbacks) -> Player {
        Player::new(
            config,
            Box::new(FakeFactory(self.clone())),
            Box::new(FakeSink(self.clone())),
            Box::new(FakeFullscreen(self.log.clone())),
            callbacks,
        )
    }

    /// Player driven by a real transport factory; the sink is still recorded
    pub fn player_with_factory(
        &self,
        config: PlayerConfig,
        factory: Box<dyn TransportFactory>,
    ) -> Player {
        Player::new(
            config,
            factory,
            Box::new(FakeSink(self.clone())),
            Box::new(FakeFullscreen(self.log.clone())),
            self.callbacks(),
        )
    }

    /// Join/leave hooks that count and log
    pub fn callbacks(&self) -> HostCallbacks {
        let (joins, join_log) = (self.joins.clone(), self.log.clone());
        let (leaves, leave_log) = (self.leaves.clone(), self.log.clone());
        HostCallbacks::new()
            .on_viewer_join(move || {
                joins.set(joins.get() + 1);
                join_log.push("join");
            })
            .on_viewer_leave(move || {
                leaves.set(leaves.get() + 1);
                leave_log.push("leave");
            })
    }

    pub fn callbacks_with_theater(&self) -> HostCallbacks {
        let toggles = self.theater_toggles.clone();
        self.callbacks()
            .on_toggle_theater(move || toggles.set(toggles.get() + 1))
    }

    pub fn transports(&self) -> usize {
        self.created.borrow().len()
    }

    pub fn transport(&self, index: usize) -> CreatedTransport {
        self.created.borrow()[index].clone()
    }

    /// Emit from the most recently created transport
    pub fn emit(&self, event: TransportEvent) -> bool {
        let last = self.transports() - 1;
        self.transport(last).events.emit(event)
    }
}

struct FakeFactory(Harness);

impl TransportFactory for FakeFactory {
    fn is_supported(&self) -> bool {
        self.0.software_supported.get()
    }

    fn create(&self, config: TransportConfig, events: EventSink) -> Result<Box<dyn Transport>> {
        let mut created = self.0.created.borrow_mut();
        let index = created.len();
        created.push(CreatedTransport { config, events });
        self.0.log.push(format!("transport[{}] create", index));
        Ok(Box::new(FakeTransport {
            index,
            log: self.0.log.clone(),
        }))
    }
}

struct FakeTransport {
    index: usize,
    log: Log,
}

impl Transport for FakeTransport {
    fn load_source(&mut self, url: &Url) {
        self.log.push(format!("transport[{}] load {}", self.index, url));
    }

    fn start_load(&mut self) {
        self.log.push(format!("transport[{}] start_load", self.index));
    }

    fn recover_media_error(&mut self) {
        self.log.push(format!("transport[{}] recover", self.index));
    }

    fn set_level(&mut self, selection: QualitySelection) {
        self.log
            .push(format!("transport[{}] set_level {}", self.index, selection.as_index()));
    }

    fn destroy(&mut self) {
        self.log.push(format!("transport[{}] destroy", self.index));
    }
}

struct FakeSink(Harness);

impl MediaSink for FakeSink {
    fn can_play_type(&self, mime: &str) -> bool {
        self.0.native_hls.get() && mime == HLS_MIME_TYPE
    }

    fn set_source(&mut self, source: MediaSource) {
        match source {
            MediaSource::Native(url) => self.0.log.push(format!("sink native {}", url)),
            MediaSource::Managed(_) => self.0.log.push("sink managed"),
        }
    }

    fn clear_source(&mut self) {
        self.0.log.push("sink clear");
    }

    fn set_poster(&mut self, poster: Option<&str>) {
        self.0.log.push(format!("sink poster {}", poster.unwrap_or("-")));
    }

    fn play(&mut self) -> std::result::Result<(), PlayRejection> {
        self.0.log.push("sink play");
        if self.0.reject_autoplay.get() {
            Err(PlayRejection::NotAllowed)
        } else {
            Ok(())
        }
    }

    fn pause(&mut self) {
        self.0.log.push("sink pause");
    }

    fn set_volume(&mut self, volume: f64) {
        self.0.log.push(format!("sink volume {}", volume));
    }

    fn set_muted(&mut self, muted: bool) {
        self.0.log.push(format!("sink muted {}", muted));
    }
}

struct FakeFullscreen(Log);

impl FullscreenHost for FakeFullscreen {
    fn request_fullscreen(&mut self) {
        self.0.push("fullscreen request");
    }

    fn exit_fullscreen(&mut self) {
        self.0.push("fullscreen exit");
    }
}
