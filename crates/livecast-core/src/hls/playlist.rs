//! HLS playlist parsing
//!
//! Implements parsing for:
//! - Multivariant (master) playlists -> quality ladder in manifest order
//! - Media playlists -> fragment list, target duration, live/VOD

use crate::{error::Error, types::QualityLevel, Result};
use m3u8_rs::{MasterPlaylist, MediaPlaylist};
use std::time::Duration;
use url::Url;

/// A variant stream from the multivariant playlist
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    /// Position in the multivariant playlist
    pub index: usize,
    /// Peak bandwidth in bits per second
    pub bandwidth: u64,
    /// Vertical resolution, 0 when absent
    pub height: u32,
    /// Media playlist URL
    pub uri: Url,
}

impl Variant {
    pub fn level(&self) -> QualityLevel {
        QualityLevel::new(self.index, self.height)
    }
}

/// One media fragment
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Media sequence number
    pub sequence: u64,
    pub uri: Url,
    pub duration: Duration,
}

/// Parsed media playlist
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPlaylistInfo {
    pub fragments: Vec<Fragment>,
    pub target_duration: Duration,
    /// `EXT-X-ENDLIST` seen
    pub ended: bool,
}

impl MediaPlaylistInfo {
    pub fn is_live(&self) -> bool {
        !self.ended
    }

    pub fn first_sequence(&self) -> Option<u64> {
        self.fragments.first().map(|f| f.sequence)
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.fragments.last().map(|f| f.sequence)
    }

    pub fn fragment(&self, sequence: u64) -> Option<&Fragment> {
        let first = self.first_sequence()?;
        let offset = sequence.checked_sub(first)?;
        self.fragments.get(offset as usize)
    }

    /// Where a new session starts: the first fragment for VOD, `sync_segments`
    /// behind the live edge for live.
    pub fn start_sequence(&self, sync_segments: u64) -> Option<u64> {
        let first = self.first_sequence()?;
        let last = self.last_sequence()?;
        if self.ended {
            Some(first)
        } else {
            Some((last + 1).saturating_sub(sync_segments.max(1)).max(first))
        }
    }

    pub fn total_duration(&self) -> Duration {
        self.fragments.iter().map(|f| f.duration).sum()
    }
}

/// Entry-point playlist
#[derive(Debug, Clone, PartialEq)]
pub enum Playlist {
    Master(Vec<Variant>),
    Media(MediaPlaylistInfo),
}

/// Parse a playlist fetched from `url`
pub fn parse_playlist(content: &[u8], url: &Url) -> Result<Playlist> {
    match m3u8_rs::parse_playlist_res(content) {
        Ok(m3u8_rs::Playlist::MasterPlaylist(master)) => Ok(Playlist::Master(extract_variants(&master, url)?)),
        Ok(m3u8_rs::Playlist::MediaPlaylist(media)) => Ok(Playlist::Media(extract_fragments(&media, url)?)),
        Err(e) => Err(Error::ManifestParse(format!("Failed to parse HLS playlist: {:?}", e))),
    }
}

/// Parse a media playlist
pub fn parse_media_playlist(content: &[u8], url: &Url) -> Result<MediaPlaylistInfo> {
    let parsed = m3u8_rs::parse_media_playlist_res(content)
        .map_err(|e| Error::ManifestParse(format!("Failed to parse HLS media: {:?}", e)))?;
    extract_fragments(&parsed, url)
}

/// Extract variants in manifest order. I-frame-only streams are skipped.
fn extract_variants(master: &MasterPlaylist, base_url: &Url) -> Result<Vec<Variant>> {
    master
        .variants
        .iter()
        .filter(|variant| !variant.is_i_frame)
        .enumerate()
        .map(|(index, variant)| {
            Ok(Variant {
                index,
                bandwidth: variant.bandwidth,
                height: variant.resolution.map(|r| r.height as u32).unwrap_or(0),
                uri: resolve_uri(base_url, &variant.uri)?,
            })
        })
        .collect()
}

fn extract_fragments(media: &MediaPlaylist, base_url: &Url) -> Result<MediaPlaylistInfo> {
    let fragments = media
        .segments
        .iter()
        .enumerate()
        .map(|(idx, seg)| {
            Ok(Fragment {
                sequence: media.media_sequence + idx as u64,
                uri: resolve_uri(base_url, &seg.uri)?,
                duration: Duration::from_secs_f32(seg.duration.max(0.0)),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(MediaPlaylistInfo {
        fragments,
        target_duration: Duration::from_secs(media.target_duration),
        ended: media.end_list,
    })
}

/// Resolve relative URI against base URL
fn resolve_uri(base: &Url, relative: &str) -> Result<Url> {
    base.join(relative)
        .map_err(|e| Error::InvalidManifest(format!("Invalid URI '{}': {}", relative, e)))
}
