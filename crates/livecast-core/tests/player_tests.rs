//! Integration tests for the Livecast player

mod support;

use livecast_core::{
    AutoplayOutcome, EngineKind, ErrorCategory, MediaEvent, PlaybackFailure, PlaybackState,
    PlayerConfig, PlayerEvent, PlayerProps, QualityLevel, QualitySelection, TransportError,
    TransportEvent,
};
use std::time::Duration;
use support::{Harness, LIVE_URL, VOD_URL};
use tokio::time::Instant;

fn ladder() -> Vec<QualityLevel> {
    vec![
        QualityLevel::new(0, 360),
        QualityLevel::new(1, 720),
        QualityLevel::new(2, 1080),
    ]
}

// =============================================================================
// Session Lifecycle Tests
// =============================================================================

#[test]
fn test_no_source_no_session() {
    let harness = Harness::new();
    let mut player = harness.player();

    player.set_props(PlayerProps::default());

    assert_eq!(player.state(), PlaybackState::Idle);
    assert!(player.session_id().is_none());
    assert_eq!(harness.transports(), 0);
    assert_eq!(harness.joins.get(), 0);
}

#[test]
fn test_mount_order_join_before_load() {
    let harness = Harness::new();
    let mut player = harness.player();
    harness.log.clear();

    player.set_props(PlayerProps::new(VOD_URL));

    assert_eq!(
        harness.log.entries(),
        vec![
            "transport[0] create".to_string(),
            "sink managed".to_string(),
            "join".to_string(),
            format!("transport[0] load {}", VOD_URL),
        ]
    );
    assert_eq!(player.state(), PlaybackState::Loading);
    assert!(player.view().show_spinner);
}

#[test]
fn test_unmount_is_idempotent() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));

    player.unmount();
    player.unmount();
    drop(player);

    assert_eq!(harness.log.count("transport[0] destroy"), 1);
    assert_eq!(harness.log.count("sink clear"), 1);
    assert_eq!(harness.leaves.get(), 1);
}

#[test]
fn test_source_change_resets_play_button_without_pausing_sink() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));
    player.dispatch(PlayerEvent::Media(MediaEvent::Playing));
    player.set_volume(0.4);
    assert!(player.view().is_playing);

    player.set_props(PlayerProps::new(LIVE_URL).live(true));

    let view = player.view();
    assert!(!view.is_playing);
    assert_eq!(view.volume, 0.4);
    assert_eq!(harness.log.count("sink pause"), 0);
}

#[test]
fn test_teardown_destroys_transport_before_detaching_sink() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));
    player.unmount();

    let destroy = harness.log.position("transport[0] destroy").unwrap();
    let clear = harness.log.position("sink clear").unwrap();
    let leave = harness.log.position("leave").unwrap();
    assert!(destroy < clear);
    assert!(clear < leave);
}

#[test]
fn test_join_leave_pairing_across_source_changes() {
    let harness = Harness::new();
    let mut player = harness.player();

    player.set_props(PlayerProps::new(VOD_URL));
    player.set_props(PlayerProps::new(LIVE_URL).live(true));
    player.set_props(PlayerProps::new(LIVE_URL).live(false));
    assert_eq!(harness.joins.get(), 3);
    assert_eq!(harness.leaves.get(), 2);

    // Each leave follows the previous session's teardown
    let entries = harness.log.entries();
    let first_leave = entries.iter().position(|e| e == "leave").unwrap();
    assert_eq!(entries[first_leave - 2], "transport[0] destroy");
    assert_eq!(entries[first_leave - 1], "sink clear");

    player.unmount();
    assert_eq!(harness.joins.get(), harness.leaves.get());
    assert_eq!(harness.transports(), 3);
}

#[test]
fn test_cosmetic_props_keep_session() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));
    let session = player.session_id();

    player.set_props(
        PlayerProps::new(VOD_URL)
            .with_theater_mode(true)
            .with_poster("https://cdn.example.com/poster.jpg"),
    );

    assert_eq!(player.session_id(), session);
    assert_eq!(harness.transports(), 1);
    assert!(player.view().is_theater_mode);
    assert_eq!(harness.log.count("sink poster https://cdn.example.com/poster.jpg"), 1);
}

#[test]
fn test_back_buffer_by_mode() {
    let harness = Harness::new();
    let mut player = harness.player();

    player.set_props(PlayerProps::new(VOD_URL));
    player.set_props(PlayerProps::new(LIVE_URL).live(true));

    let vod = harness.transport(0).config;
    assert!(!vod.low_latency_mode);
    assert_eq!(vod.back_buffer_length, Duration::from_secs(90));

    let live = harness.transport(1).config;
    assert!(live.low_latency_mode);
    assert_eq!(live.back_buffer_length, Duration::ZERO);
}

#[test]
fn test_first_frame_hides_poster() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL).with_poster("poster.jpg"));
    assert_eq!(player.view().poster.as_deref(), Some("poster.jpg"));

    player.dispatch(PlayerEvent::Media(MediaEvent::LoadedData));

    let view = player.view();
    assert_eq!(view.state, PlaybackState::Playing);
    assert!(view.poster.is_none());
    assert!(!view.show_spinner);
}

#[test]
fn test_waiting_shows_spinner() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));
    player.dispatch(PlayerEvent::Media(MediaEvent::Playing));

    player.dispatch(PlayerEvent::Media(MediaEvent::Waiting));
    assert_eq!(player.state(), PlaybackState::Buffering);
    assert!(player.view().show_spinner);

    player.dispatch(PlayerEvent::Media(MediaEvent::Playing));
    assert_eq!(player.state(), PlaybackState::Playing);
}

#[test]
fn test_ended() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));
    player.dispatch(PlayerEvent::Media(MediaEvent::Playing));
    player.dispatch(PlayerEvent::Media(MediaEvent::Ended));

    let view = player.view();
    assert_eq!(view.state, PlaybackState::Ended);
    assert!(!view.is_playing);
}

// =============================================================================
// Engine Selection Tests
// =============================================================================

#[test]
fn test_native_fallback() {
    let harness = Harness::native_only();
    let mut player = harness.player();

    player.set_props(PlayerProps::new(VOD_URL));

    assert_eq!(harness.transports(), 0);
    assert_eq!(player.view().engine, Some(EngineKind::Native));
    assert_eq!(harness.log.count(&format!("sink native {}", VOD_URL)), 1);
    assert_eq!(harness.joins.get(), 1);
    assert!(player.view().quality_options.is_none());
}

#[test]
fn test_native_live_autoplays_on_attach() {
    let harness = Harness::native_only();
    let mut player = harness.player();

    player.set_props(PlayerProps::new(LIVE_URL).live(true));

    assert_eq!(harness.log.count("sink play"), 1);
    assert_eq!(player.view().autoplay, Some(AutoplayOutcome::Started));
}

#[test]
fn test_unsupported_format() {
    let harness = Harness::native_only();
    harness.native_hls.set(false);
    let mut player = harness.player();

    player.set_props(PlayerProps::new(VOD_URL));

    let view = player.view();
    assert_eq!(view.state, PlaybackState::Errored(PlaybackFailure::UnsupportedFormat));
    let overlay = view.overlay.unwrap();
    assert!(overlay.terminal);
    assert_eq!(overlay.text, "This stream format is not supported");
    assert_eq!(harness.joins.get(), 0);
    assert!(!harness.log.entries().iter().any(|e| e.starts_with("sink native")));
}

#[test]
fn test_invalid_source_is_terminal() {
    let harness = Harness::new();
    let mut player = harness.player();

    player.set_props(PlayerProps::new("not a url"));

    assert_eq!(player.state(), PlaybackState::Errored(PlaybackFailure::Unclassified));
    assert_eq!(harness.transports(), 0);
}

// =============================================================================
// Quality Selection Tests
// =============================================================================

#[test]
fn test_quality_selector_options() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));
    assert!(player.view().quality_options.is_none());

    harness.emit(TransportEvent::ManifestParsed { levels: ladder() });
    assert_eq!(player.pump(), 1);

    let options = player.view().quality_options.unwrap();
    assert_eq!(options.len(), 4);
    assert_eq!(options[0].selection, QualitySelection::Auto);
    assert!(options[0].selected);
    let labels: Vec<&str> = options[1..].iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["360p", "720p", "1080p"]);
}

#[test]
fn test_quality_selector_hidden_without_levels() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));

    harness.emit(TransportEvent::ManifestParsed { levels: Vec::new() });
    player.pump();

    assert!(player.view().quality_options.is_none());
}

#[test]
fn test_current_quality_follows_switch_events() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));
    harness.emit(TransportEvent::ManifestParsed { levels: ladder() });
    player.pump();

    player.select_quality(QualitySelection::Level(2)).unwrap();
    assert_eq!(harness.log.count("transport[0] set_level 2"), 1);
    assert!(player.view().current_quality.is_none());

    harness.emit(TransportEvent::LevelSwitched { level: 2 });
    player.pump();
    assert_eq!(player.view().current_quality, Some(QualityLevel::new(2, 1080)));

    player.select_quality(QualitySelection::Auto).unwrap();
    assert_eq!(harness.log.count("transport[0] set_level -1"), 1);
    assert!(player.view().quality_options.unwrap()[0].selected);
}

#[test]
fn test_select_quality_out_of_range() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));
    harness.emit(TransportEvent::ManifestParsed { levels: ladder() });
    player.pump();

    let err = player.select_quality(QualitySelection::Level(7)).unwrap_err();
    assert_eq!(err.error_code(), "LEVEL_RANGE");
    assert_eq!(harness.log.count("transport[0] set_level 7"), 0);
}

// =============================================================================
// Error Routing Tests
// =============================================================================

#[test]
fn test_fatal_network_error_resumes_loading() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));
    player.dispatch(PlayerEvent::Media(MediaEvent::Playing));

    harness.emit(TransportEvent::Error(TransportError::fatal(
        ErrorCategory::Network,
        "fragment timeout",
    )));
    player.pump();

    assert_eq!(harness.log.count("transport[0] start_load"), 1);
    assert_eq!(harness.log.count("transport[0] destroy"), 0);
    let view = player.view();
    assert_eq!(view.state, PlaybackState::Playing);
    let overlay = view.overlay.unwrap();
    assert!(!overlay.terminal);
    assert_eq!(overlay.text, PlaybackFailure::NetworkTransient.message());

    // Data flowing again clears the message
    harness.emit(TransportEvent::FragmentBuffered {
        level: None,
        sequence: 4,
        duration: Duration::from_secs(4),
    });
    player.pump();
    assert!(player.view().overlay.is_none());
}

#[test]
fn test_fatal_media_error_recovers_decoder() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));

    harness.emit(TransportEvent::Error(TransportError::fatal(
        ErrorCategory::Media,
        "bad fragment",
    )));
    player.pump();

    assert_eq!(harness.log.count("transport[0] recover"), 1);
    assert_eq!(
        player.view().overlay.unwrap().text,
        PlaybackFailure::MediaDecodeTransient.message()
    );
}

#[test]
fn test_recovery_is_not_capped() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(LIVE_URL).live(true));

    for _ in 0..25 {
        harness.emit(TransportEvent::Error(TransportError::fatal(
            ErrorCategory::Network,
            "edge unreachable",
        )));
    }
    player.pump();

    assert_eq!(harness.log.count("transport[0] start_load"), 25);
    assert!(!player.view().overlay.unwrap().terminal);
}

#[test]
fn test_non_fatal_errors_ignored() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));

    harness.emit(TransportEvent::Error(TransportError::non_fatal(
        ErrorCategory::Network,
        "retrying",
    )));
    player.pump();

    assert!(player.view().overlay.is_none());
    assert_eq!(harness.log.count("transport[0] start_load"), 0);
}

#[test]
fn test_other_fatal_error_is_terminal() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));
    harness.emit(TransportEvent::ManifestParsed { levels: ladder() });
    player.pump();

    harness.emit(TransportEvent::Error(TransportError::fatal(
        ErrorCategory::Other,
        "key system failure",
    )));
    player.pump();

    assert_eq!(harness.log.count("transport[0] destroy"), 1);
    let view = player.view();
    assert_eq!(view.state, PlaybackState::Errored(PlaybackFailure::Unclassified));
    assert_eq!(view.overlay.unwrap().text, "Stream unavailable");
    assert!(view.quality_options.is_none());

    // Anything the released transport still had queued is dropped
    harness.emit(TransportEvent::Error(TransportError::fatal(
        ErrorCategory::Network,
        "late",
    )));
    player.pump();
    assert_eq!(harness.log.count("transport[0] start_load"), 0);

    // Presence is only released by teardown
    assert_eq!(harness.leaves.get(), 0);
    player.unmount();
    assert_eq!(harness.leaves.get(), 1);
    assert_eq!(harness.log.count("transport[0] destroy"), 1);
}

#[test]
fn test_retry_after_terminal_failure() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));

    // Retry is a no-op while healthy
    player.retry();
    assert_eq!(harness.transports(), 1);

    harness.emit(TransportEvent::Error(TransportError::fatal(ErrorCategory::Other, "boom")));
    player.pump();
    player.retry();

    assert_eq!(harness.transports(), 2);
    assert_eq!(player.state(), PlaybackState::Loading);
    assert!(player.view().overlay.is_none());
    assert_eq!(harness.joins.get(), 2);
    assert_eq!(harness.leaves.get(), 1);
}

// =============================================================================
// Stale Callback Tests
// =============================================================================

#[test]
fn test_stale_events_dropped_after_source_change() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));
    let old = harness.transport(0).events;

    player.set_props(PlayerProps::new(LIVE_URL).live(true));

    old.emit(TransportEvent::ManifestParsed { levels: ladder() });
    old.emit(TransportEvent::Error(TransportError::fatal(ErrorCategory::Other, "late")));
    assert_eq!(player.pump(), 2);

    assert!(player.levels().is_empty());
    assert_eq!(player.state(), PlaybackState::Loading);
    assert_eq!(harness.log.count("transport[1] destroy"), 0);
}

#[test]
fn test_events_after_unmount_ignored() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));
    player.unmount();

    harness.emit(TransportEvent::ManifestParsed { levels: ladder() });
    player.pump();
    player.dispatch(PlayerEvent::Media(MediaEvent::Playing));

    assert!(player.levels().is_empty());
    assert_eq!(player.state(), PlaybackState::Idle);
}

// =============================================================================
// Autoplay Tests
// =============================================================================

#[test]
fn test_live_autoplay_after_manifest() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(LIVE_URL).live(true));
    assert_eq!(harness.log.count("sink play"), 0);

    harness.emit(TransportEvent::ManifestParsed { levels: ladder() });
    player.pump();

    assert_eq!(harness.log.count("sink play"), 1);
    assert_eq!(player.view().autoplay, Some(AutoplayOutcome::Started));
}

#[test]
fn test_vod_does_not_autoplay() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));

    harness.emit(TransportEvent::ManifestParsed { levels: ladder() });
    player.pump();

    assert_eq!(harness.log.count("sink play"), 0);
    assert!(player.view().autoplay.is_none());
}

#[test]
fn test_blocked_autoplay_is_not_an_error() {
    let harness = Harness::new();
    harness.reject_autoplay.set(true);
    let mut player = harness.player();
    player.set_props(PlayerProps::new(LIVE_URL).live(true));

    harness.emit(TransportEvent::ManifestParsed { levels: ladder() });
    player.pump();

    let view = player.view();
    assert_eq!(view.autoplay, Some(AutoplayOutcome::BlockedByPolicy));
    assert_eq!(view.state, PlaybackState::Loading);
    assert!(view.overlay.is_none());
}

// =============================================================================
// Controls Tests
// =============================================================================

#[test]
fn test_play_button_follows_sink_events() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));

    player.toggle_play();
    assert_eq!(harness.log.count("sink play"), 1);
    assert!(!player.view().is_playing);

    player.dispatch(PlayerEvent::Media(MediaEvent::Playing));
    assert!(player.view().is_playing);

    player.toggle_play();
    assert_eq!(harness.log.count("sink pause"), 1);
    player.dispatch(PlayerEvent::Media(MediaEvent::Pause));
    assert!(!player.view().is_playing);
}

#[test]
fn test_volume_and_mute() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));

    player.set_volume(0.0);
    assert!(player.view().is_muted);

    player.set_volume(0.5);
    let view = player.view();
    assert!(!view.is_muted);
    assert_eq!(view.volume, 0.5);

    player.toggle_mute();
    assert!(player.view().is_muted);
    assert_eq!(harness.log.entries().last().map(String::as_str), Some("sink muted true"));

    player.set_volume(1.7);
    assert_eq!(player.view().volume, 1.0);

    // Unmuting at zero volume still displays muted
    player.set_volume(0.0);
    player.toggle_mute();
    assert!(player.view().is_muted);
}

#[test]
fn test_fullscreen_follows_platform() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));

    player.toggle_fullscreen();
    assert_eq!(harness.log.count("fullscreen request"), 1);
    assert!(!player.view().is_fullscreen);

    player.dispatch(PlayerEvent::FullscreenChanged(true));
    assert!(player.view().is_fullscreen);

    player.toggle_fullscreen();
    assert_eq!(harness.log.count("fullscreen exit"), 1);

    // Platform may leave fullscreen on its own (escape key)
    player.dispatch(PlayerEvent::FullscreenChanged(false));
    assert!(!player.view().is_fullscreen);
}

#[test]
fn test_auto_hide_after_three_seconds() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));

    player.dispatch(PlayerEvent::Media(MediaEvent::Playing));
    let start = Instant::now();
    player.dispatch(PlayerEvent::PointerMoved(start));
    assert_eq!(player.auto_hide_deadline(), Some(start + Duration::from_secs(3)));

    player.dispatch(PlayerEvent::Tick(start + Duration::from_millis(2999)));
    assert!(player.view().controls_visible);

    // Movement re-arms the single timer
    let moved = start + Duration::from_secs(2);
    player.dispatch(PlayerEvent::PointerMoved(moved));
    player.dispatch(PlayerEvent::Tick(start + Duration::from_secs(4)));
    assert!(player.view().controls_visible);

    player.dispatch(PlayerEvent::Tick(moved + Duration::from_secs(3)));
    assert!(!player.view().controls_visible);

    player.dispatch(PlayerEvent::PointerMoved(moved + Duration::from_secs(4)));
    assert!(player.view().controls_visible);
}

#[test]
fn test_controls_stay_visible_while_paused() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));

    let start = Instant::now();
    player.dispatch(PlayerEvent::PointerMoved(start));
    assert!(player.auto_hide_deadline().is_none());

    player.dispatch(PlayerEvent::Tick(start + Duration::from_secs(10)));
    assert!(player.view().controls_visible);
}

#[test]
fn test_pointer_leave_shows_controls() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));
    player.dispatch(PlayerEvent::Media(MediaEvent::Playing));

    let start = Instant::now();
    player.dispatch(PlayerEvent::PointerMoved(start));
    player.dispatch(PlayerEvent::Tick(start + Duration::from_secs(3)));
    assert!(!player.view().controls_visible);

    player.dispatch(PlayerEvent::PointerLeft);
    assert!(player.view().controls_visible);
    assert!(player.auto_hide_deadline().is_none());
}

#[test]
fn test_custom_auto_hide_delay() {
    let harness = Harness::new();
    let config = PlayerConfig {
        auto_hide_delay_ms: 500,
        ..Default::default()
    };
    let mut player = harness.player_with(config, harness.callbacks());
    player.set_props(PlayerProps::new(VOD_URL));
    player.dispatch(PlayerEvent::Media(MediaEvent::Playing));

    let start = Instant::now();
    player.dispatch(PlayerEvent::PointerMoved(start));
    assert_eq!(player.auto_hide_deadline(), Some(start + Duration::from_millis(500)));
}

// =============================================================================
// Theater Mode Tests
// =============================================================================

#[test]
fn test_theater_toggle_requires_callback() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));

    assert!(!player.view().show_theater_toggle);
    assert!(!player.toggle_theater());
}

#[test]
fn test_theater_toggle_invokes_host() {
    let harness = Harness::new();
    let mut player = harness.player_with(PlayerConfig::default(), harness.callbacks_with_theater());
    player.set_props(PlayerProps::new(VOD_URL));

    assert!(player.view().show_theater_toggle);
    assert!(player.toggle_theater());
    assert!(player.toggle_theater());
    assert_eq!(harness.theater_toggles.get(), 2);

    // The host owns the flag; the player only reflects it
    assert!(!player.view().is_theater_mode);
    assert_eq!(harness.transports(), 1);
}

#[test]
fn test_view_serializes() {
    let harness = Harness::new();
    let mut player = harness.player();
    player.set_props(PlayerProps::new(VOD_URL));
    harness.emit(TransportEvent::ManifestParsed { levels: ladder() });
    player.pump();

    let json = serde_json::to_value(player.view()).unwrap();
    assert_eq!(json["state"], "Loading");
    assert_eq!(json["quality_options"].as_array().unwrap().len(), 4);
}
