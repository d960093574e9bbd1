//! CLI command implementations

use anyhow::Context;
use crate::output::{print_probe, LevelRow, OutputFormat, ProbeReport, ViewReporter};
use crate::sink::SinkHandle;
use livecast_core::{
    hls::{parse_playlist, Playlist, Variant},
    AutoplayOutcome, HlsTransportFactory, HostCallbacks, NoFullscreen, Player, PlayerConfig,
    PlayerEvent, PlayerProps, QualityController, QualitySelection, TransportEvent,
};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::{info, warn};
use url::Url;

/// Fetch a manifest and describe its quality ladder
pub async fn probe(manifest_url: &str, config: &PlayerConfig, format: &str) -> anyhow::Result<()> {
    let url = Url::parse(manifest_url)?;
    info!(%url, "Probing manifest");

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()?;
    let body = client
        .get(url.clone())
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .with_context(|| format!("fetching {}", url))?
        .bytes()
        .await?;

    let report = match parse_playlist(&body, &url).context("parsing manifest")? {
        Playlist::Master(variants) => {
            let mut quality = QualityController::new();
            quality.replace_levels(variants.iter().map(Variant::level).collect());
            ProbeReport {
                url: url.to_string(),
                kind: "multivariant",
                live: None,
                fragments: None,
                levels: variants.iter().map(level_row).collect(),
                selector: quality.selector_options(),
            }
        }
        Playlist::Media(media) => ProbeReport {
            url: url.to_string(),
            kind: "media",
            live: Some(media.is_live()),
            fragments: Some(media.fragments.len()),
            levels: Vec::new(),
            selector: None,
        },
    };

    print_probe(&report, OutputFormat::from(format))
}

fn level_row(variant: &Variant) -> LevelRow {
    LevelRow {
        index: variant.index,
        label: variant.level().label(),
        bandwidth_kbps: variant.bandwidth / 1000,
        uri: variant.uri.to_string(),
    }
}

/// Options for `play`
#[derive(Debug, Clone)]
pub struct PlayOptions {
    pub url: String,
    pub live: bool,
    pub quality: QualitySelection,
    pub duration: Option<u64>,
    pub block_autoplay: bool,
}

/// Play a stream headlessly until it ends, the duration elapses or Ctrl-C
pub async fn play(options: PlayOptions, config: PlayerConfig, format: &str) -> anyhow::Result<()> {
    let factory = HlsTransportFactory::new(&config).context("building HTTP client")?;
    let sink = SinkHandle::new(options.block_autoplay);

    let callbacks = HostCallbacks::new()
        .on_viewer_join(|| info!("Viewer joined"))
        .on_viewer_leave(|| info!("Viewer left"));

    let mut player = Player::new(
        config,
        Box::new(factory),
        Box::new(sink.sink()),
        Box::new(NoFullscreen),
        callbacks,
    );
    let mut reporter = ViewReporter::new(OutputFormat::from(format));

    player.set_props(PlayerProps::new(options.url.as_str()).live(options.live));
    reporter.report(player.view())?;

    let stop_at = options
        .duration
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut quality_applied = options.quality == QualitySelection::Auto;
    let mut started = false;
    let mut failure = None;

    loop {
        while let Some(event) = sink.next_event() {
            player.dispatch(PlayerEvent::Media(event));
        }

        let view = player.view();
        if view.is_playing && !started {
            // Stand-in for the viewer's pointer so the controls auto-hide
            started = true;
            player.dispatch(PlayerEvent::PointerMoved(Instant::now()));
        }
        if let Some(overlay) = view.overlay.as_ref().filter(|o| o.terminal) {
            failure = Some(overlay.text.clone());
        }
        reporter.report(player.view())?;
        if failure.is_some() {
            break;
        }

        let hide_at = player.auto_hide_deadline();
        tokio::select! {
            event = player.next_transport_event() => {
                let Some(event) = event else { break };
                let data = matches!(event.event, TransportEvent::FragmentBuffered { .. });
                let ended = matches!(event.event, TransportEvent::EndOfStream);
                player.dispatch(PlayerEvent::Transport(event));

                if !quality_applied && !player.levels().is_empty() {
                    quality_applied = true;
                    if let Err(e) = player.select_quality(options.quality) {
                        warn!(error = %e, "Requested quality unavailable, staying on auto");
                    }
                }
                if data {
                    sink.on_data();
                    press_play_if_idle(&mut player, options.live);
                }
                if ended {
                    info!("Stream fully buffered");
                    sink.on_end();
                    while let Some(event) = sink.next_event() {
                        player.dispatch(PlayerEvent::Media(event));
                    }
                    reporter.report(player.view())?;
                    break;
                }
            }
            _ = sleep_until_some(hide_at) => {
                player.dispatch(PlayerEvent::Tick(Instant::now()));
            }
            _ = sleep_until_some(stop_at) => {
                info!("Duration elapsed");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    player.unmount();

    match failure {
        Some(text) => anyhow::bail!("playback failed: {}", text),
        None => Ok(()),
    }
}

/// A VOD viewer presses play once data arrives; a live viewer only does so
/// when autoplay was blocked.
fn press_play_if_idle(player: &mut Player, live: bool) {
    let view = player.view();
    if view.is_playing {
        return;
    }
    let wants_play = match view.autoplay {
        Some(AutoplayOutcome::BlockedByPolicy) => true,
        Some(AutoplayOutcome::Started) => false,
        None => !live,
    };
    if wants_play {
        info!("Simulating viewer play gesture");
        player.toggle_play();
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
