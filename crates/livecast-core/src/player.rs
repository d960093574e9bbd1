//! Player - the component the host page mounts
//!
//! Owns at most one [`PlaybackSession`] plus the display state around it.
//! Every input (transport callbacks, sink events, platform events, pointer
//! activity, timer ticks) enters through [`Player::dispatch`]; viewer actions
//! are plain methods. The host reads [`Player::view`] to render.

use crate::{
    abr::{QualityController, QualityOption},
    config::PlayerConfig,
    controls::{AutoHide, ControlSurface},
    error::PlaybackFailure,
    lifecycle::{Lifecycle, Overlay, RecoveryAction},
    presence::{Callback, ViewerPresence},
    session::PlaybackSession,
    sink::{FullscreenHost, MediaEvent, MediaSink, PlayRejection},
    transport::{EventSink, SessionEvent, TransportEvent, TransportFactory},
    types::*,
    Error, Result,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Host callbacks. All optional.
#[derive(Default)]
pub struct HostCallbacks {
    pub on_viewer_join: Option<Callback>,
    pub on_viewer_leave: Option<Callback>,
    /// The theater affordance is only offered when this is set
    pub on_toggle_theater: Option<Callback>,
}

impl HostCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_viewer_join(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_viewer_join = Some(Box::new(callback));
        self
    }

    pub fn on_viewer_leave(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_viewer_leave = Some(Box::new(callback));
        self
    }

    pub fn on_toggle_theater(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_toggle_theater = Some(Box::new(callback));
        self
    }
}

/// Inputs delivered to the player
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Callback from a transport
    Transport(SessionEvent),
    /// Event from the media sink
    Media(MediaEvent),
    /// The platform entered or left fullscreen
    FullscreenChanged(bool),
    PointerMoved(Instant),
    PointerLeft,
    /// Timer check for the auto-hide deadline
    Tick(Instant),
}

/// Outcome of the live-edge autoplay attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AutoplayOutcome {
    Started,
    /// Autoplay may be blocked by platform policy; this is expected and not an
    /// error. A user gesture starts playback instead.
    BlockedByPolicy,
}

/// Snapshot of everything the host renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub state: PlaybackState,
    pub engine: Option<EngineKind>,
    pub is_live: bool,
    /// Poster shown until the first frame
    pub poster: Option<String>,
    /// Loading indicator
    pub show_spinner: bool,
    pub overlay: Option<Overlay>,
    pub is_playing: bool,
    pub is_muted: bool,
    pub volume: f64,
    pub is_fullscreen: bool,
    pub controls_visible: bool,
    /// `None` hides the selector
    pub quality_options: Option<Vec<QualityOption>>,
    pub current_quality: Option<QualityLevel>,
    pub show_theater_toggle: bool,
    pub is_theater_mode: bool,
    pub autoplay: Option<AutoplayOutcome>,
}

/// Adaptive streaming player
pub struct Player {
    config: PlayerConfig,
    factory: Box<dyn TransportFactory>,
    sink: Box<dyn MediaSink>,
    fullscreen: Box<dyn FullscreenHost>,
    presence: ViewerPresence,
    on_toggle_theater: Option<Callback>,
    props: PlayerProps,
    session: Option<PlaybackSession>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    quality: QualityController,
    lifecycle: Lifecycle,
    controls: ControlSurface,
    auto_hide: AutoHide,
    autoplay: Option<AutoplayOutcome>,
    mounted: bool,
}

impl Player {
    pub fn new(
        config: PlayerConfig,
        factory: Box<dyn TransportFactory>,
        mut sink: Box<dyn MediaSink>,
        fullscreen: Box<dyn FullscreenHost>,
        callbacks: HostCallbacks,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let controls = ControlSurface::new(config.initial_volume);
        controls.apply_to(sink.as_mut());

        Self {
            auto_hide: AutoHide::new(config.auto_hide_delay()),
            config,
            factory,
            sink,
            fullscreen,
            presence: ViewerPresence::new(callbacks.on_viewer_join, callbacks.on_viewer_leave),
            on_toggle_theater: callbacks.on_toggle_theater,
            props: PlayerProps::default(),
            session: None,
            events_tx,
            events_rx,
            quality: QualityController::new(),
            lifecycle: Lifecycle::new(),
            controls,
            autoplay: None,
            mounted: true,
        }
    }

    /// Supply new props. A changed source or live flag tears the current
    /// session down completely before the next one is opened.
    pub fn set_props(&mut self, props: PlayerProps) {
        if !self.mounted {
            warn!("set_props on an unmounted player ignored");
            return;
        }

        let first = self.session.is_none() && self.lifecycle.state() == PlaybackState::Idle;
        let restart = first || self.props.requires_new_session(&props);

        if self.props.poster != props.poster {
            self.sink.set_poster(props.poster.as_deref());
        }
        self.props = props;

        if restart {
            self.teardown();
            self.open();
        }
    }

    pub fn props(&self) -> &PlayerProps {
        &self.props
    }

    /// Tear everything down. Safe to call more than once.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.teardown();
        self.mounted = false;
        info!("Player unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Manual retry after a terminal failure: a full re-mount of the session
    pub fn retry(&mut self) {
        if !self.mounted || !self.lifecycle.is_terminal() {
            return;
        }
        info!("Retrying after terminal failure");
        self.teardown();
        self.open();
    }

    /// Single entry point for every event
    pub fn dispatch(&mut self, event: PlayerEvent) {
        if !self.mounted {
            return;
        }
        match event {
            PlayerEvent::Transport(event) => self.on_transport_event(event),
            PlayerEvent::Media(event) => self.on_media_event(event),
            PlayerEvent::FullscreenChanged(fullscreen) => {
                self.controls.on_fullscreen_change(fullscreen)
            }
            PlayerEvent::PointerMoved(now) => {
                self.auto_hide.on_pointer_move(now, self.controls.is_playing())
            }
            PlayerEvent::PointerLeft => self.auto_hide.on_pointer_leave(),
            PlayerEvent::Tick(now) => {
                self.auto_hide.poll(now);
            }
        }
    }

    /// Dispatch every transport event already queued. Returns how many.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.dispatch(PlayerEvent::Transport(event));
            handled += 1;
        }
        handled
    }

    /// Wait for the next transport event
    pub async fn next_transport_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// When the controls are due to hide, if armed
    pub fn auto_hide_deadline(&self) -> Option<Instant> {
        self.auto_hide.deadline()
    }

    // ---------------------------------------------------------------------
    // Viewer actions
    // ---------------------------------------------------------------------

    /// Toggle play/pause. The display follows the sink's events.
    pub fn toggle_play(&mut self) {
        if self.session.is_none() || self.lifecycle.is_terminal() {
            return;
        }
        if let Err(rejection) = self.controls.toggle_play(self.sink.as_mut()) {
            warn!(%rejection, "Play request rejected");
        }
    }

    pub fn toggle_mute(&mut self) {
        self.controls.toggle_mute(self.sink.as_mut());
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.controls.set_volume(self.sink.as_mut(), volume);
    }

    pub fn toggle_fullscreen(&mut self) {
        self.controls.toggle_fullscreen(self.fullscreen.as_mut());
    }

    /// Pin a quality level or return to `Auto`
    pub fn select_quality(&mut self, selection: QualitySelection) -> Result<()> {
        let session = match self.session.as_mut() {
            Some(session) if !self.lifecycle.is_terminal() => session,
            _ => return Ok(()),
        };
        self.quality.request(selection)?;
        if let Some(transport) = session.transport_mut() {
            info!(%selection, "Quality requested");
            transport.set_level(selection);
        }
        Ok(())
    }

    /// Invoke the host's theater toggle, if one was supplied
    pub fn toggle_theater(&mut self) -> bool {
        match self.on_toggle_theater.as_mut() {
            Some(toggle) => {
                toggle();
                true
            }
            None => false,
        }
    }

    // ---------------------------------------------------------------------
    // Read access
    // ---------------------------------------------------------------------

    pub fn state(&self) -> PlaybackState {
        self.lifecycle.state()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(PlaybackSession::id)
    }

    pub fn levels(&self) -> &[QualityLevel] {
        self.quality.levels()
    }

    pub fn presence(&self) -> &ViewerPresence {
        &self.presence
    }

    pub fn view(&self) -> PlayerView {
        let terminal = self.lifecycle.is_terminal();
        PlayerView {
            state: self.lifecycle.state(),
            engine: self.session.as_ref().map(PlaybackSession::engine),
            is_live: self.props.is_live,
            poster: if self.lifecycle.has_first_frame() {
                None
            } else {
                self.props.poster.clone()
            },
            show_spinner: self.lifecycle.show_spinner(),
            overlay: self.lifecycle.overlay().cloned(),
            is_playing: self.controls.is_playing(),
            is_muted: self.controls.is_muted(),
            volume: self.controls.volume(),
            is_fullscreen: self.controls.is_fullscreen(),
            controls_visible: self.auto_hide.is_visible(),
            quality_options: if terminal { None } else { self.quality.selector_options() },
            current_quality: self.quality.current_level(),
            show_theater_toggle: self.on_toggle_theater.is_some(),
            is_theater_mode: self.props.is_theater_mode,
            autoplay: self.autoplay,
        }
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn open(&mut self) {
        let Some(source) = self.props.source.clone() else {
            debug!("No source; no session created");
            return;
        };

        let events = EventSink::new(SessionId::new(), self.events_tx.clone());
        let attached = Url::parse(&source).map_err(Error::from).and_then(|url| {
            PlaybackSession::attach(
                url,
                self.props.is_live,
                &self.config,
                self.factory.as_ref(),
                self.sink.as_mut(),
                events,
            )
        });

        match attached {
            Ok(mut session) => {
                self.lifecycle.begin();
                self.presence.join();
                session.start(self.sink.as_mut());
                let native_live = session.engine() == EngineKind::Native && session.is_live();
                self.session = Some(session);
                if native_live {
                    self.start_live_playback();
                }
            }
            Err(Error::UnsupportedFormat) => {
                self.lifecycle.fail(PlaybackFailure::UnsupportedFormat);
            }
            Err(e) => {
                warn!(%source, error = %e, code = e.error_code(), "Failed to create session");
                self.lifecycle.fail(PlaybackFailure::Unclassified);
            }
        }
    }

    fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.destroy(self.sink.as_mut());
        }
        self.presence.leave();
        self.quality.clear();
        self.lifecycle.reset();
        self.auto_hide.reset();
        self.autoplay = None;
        self.controls.reset();
    }

    fn on_transport_event(&mut self, event: SessionEvent) {
        let Some(session) = self.session.as_ref() else {
            debug!(session_id = %event.session, "Transport event with no active session dropped");
            return;
        };
        if session.id() != event.session {
            debug!(
                stale = %event.session,
                active = %session.id(),
                "Stale transport event dropped"
            );
            return;
        }
        if !session.has_transport() {
            debug!("Transport event after transport release dropped");
            return;
        }

        match event.event {
            TransportEvent::ManifestParsed { levels } => {
                info!(levels = levels.len(), "Manifest parsed");
                self.quality.replace_levels(levels);
                if self.props.is_live {
                    self.start_live_playback();
                }
            }
            TransportEvent::LevelSwitched { level } => {
                if self.quality.on_level_switched(level) {
                    info!(level, "Level switched");
                }
            }
            TransportEvent::FragmentBuffered { sequence, .. } => {
                debug!(sequence, "Fragment buffered");
                self.lifecycle.clear_transient();
            }
            TransportEvent::EndOfStream => debug!("All fragments buffered"),
            TransportEvent::Error(error) => {
                let action = self.lifecycle.on_transport_error(&error);
                self.apply_recovery(action);
            }
        }
    }

    fn apply_recovery(&mut self, action: RecoveryAction) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match action {
            RecoveryAction::Ignore => {}
            RecoveryAction::StartLoad => {
                if let Some(transport) = session.transport_mut() {
                    transport.start_load();
                }
            }
            RecoveryAction::RecoverMediaError => {
                if let Some(transport) = session.transport_mut() {
                    transport.recover_media_error();
                }
            }
            RecoveryAction::Destroy => {
                session.release_transport();
                self.auto_hide.reset();
            }
        }
    }

    /// Start playback at the live edge without a user gesture
    fn start_live_playback(&mut self) {
        self.autoplay = Some(match self.sink.play() {
            Ok(()) => AutoplayOutcome::Started,
            Err(PlayRejection::NotAllowed) | Err(PlayRejection::Aborted) => {
                debug!("Live autoplay blocked by platform policy");
                AutoplayOutcome::BlockedByPolicy
            }
            Err(rejection) => {
                debug!(%rejection, "Live autoplay did not start");
                AutoplayOutcome::BlockedByPolicy
            }
        });
    }

    fn on_media_event(&mut self, event: MediaEvent) {
        if self.session.is_none() {
            return;
        }
        let was_playing = self.controls.is_playing();
        self.lifecycle.on_media_event(event);
        self.controls.on_media_event(event);

        let playing = self.controls.is_playing();
        if playing != was_playing {
            self.auto_hide.on_playing_changed(Instant::now(), playing);
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.unmount();
    }
}
