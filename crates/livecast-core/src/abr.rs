//! Adaptive bitrate (ABR)
//!
//! Two pieces:
//! - [`QualityController`]: the player-side view of quality. Holds the level
//!   list for the current manifest, the viewer's request, and the level the
//!   transport last reported switching to.
//! - [`AbrEngine`]: throughput estimation and level choice used by the HLS
//!   transport while the selection is `Auto`.

use crate::{types::*, Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// One entry in the quality selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityOption {
    pub selection: QualitySelection,
    pub label: String,
    /// Matches the viewer's current request
    pub selected: bool,
}

/// Level list and selection state for one session
#[derive(Debug, Clone, Default)]
pub struct QualityController {
    levels: Vec<QualityLevel>,
    requested: QualitySelection,
    current: Option<usize>,
}

impl QualityController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the level list with one from a freshly parsed manifest
    pub fn replace_levels(&mut self, levels: Vec<QualityLevel>) {
        debug!(levels = levels.len(), "Quality levels replaced");
        self.levels = levels;
        self.requested = QualitySelection::Auto;
        self.current = None;
    }

    /// Forget everything from the previous session
    pub fn clear(&mut self) {
        self.levels.clear();
        self.requested = QualitySelection::Auto;
        self.current = None;
    }

    pub fn levels(&self) -> &[QualityLevel] {
        &self.levels
    }

    pub fn requested(&self) -> QualitySelection {
        self.requested
    }

    /// Record a viewer request; the displayed level does not change until the
    /// transport reports the switch.
    pub fn request(&mut self, selection: QualitySelection) -> Result<QualitySelection> {
        if let QualitySelection::Level(index) = selection {
            if index >= self.levels.len() {
                return Err(Error::LevelOutOfRange {
                    index,
                    available: self.levels.len(),
                });
            }
        }
        self.requested = selection;
        Ok(selection)
    }

    /// Apply a level-switched event. Unknown indices are ignored.
    pub fn on_level_switched(&mut self, index: usize) -> bool {
        if index >= self.levels.len() {
            debug!(index, available = self.levels.len(), "Ignoring switch to unknown level");
            return false;
        }
        self.current = Some(index);
        true
    }

    /// Level shown as "current quality"
    pub fn current_level(&self) -> Option<QualityLevel> {
        self.current.and_then(|index| self.levels.get(index).copied())
    }

    /// Selector entries: `Auto` followed by every level, or `None` when the
    /// manifest had no levels to choose from.
    pub fn selector_options(&self) -> Option<Vec<QualityOption>> {
        if self.levels.is_empty() {
            return None;
        }

        let auto = QualityOption {
            selection: QualitySelection::Auto,
            label: match (self.requested, self.current_level()) {
                (QualitySelection::Auto, Some(level)) => format!("Auto ({})", level.label()),
                _ => "Auto".to_string(),
            },
            selected: self.requested == QualitySelection::Auto,
        };

        let levels = self.levels.iter().map(|level| QualityOption {
            selection: QualitySelection::Level(level.index),
            label: level.label(),
            selected: self.requested == QualitySelection::Level(level.index),
        });

        Some(std::iter::once(auto).chain(levels).collect())
    }
}

/// Bandwidth measurement sample
#[derive(Debug, Clone)]
pub struct BandwidthMeasurement {
    /// Bytes downloaded
    pub bytes: usize,
    /// Time taken
    pub duration: Duration,
}

impl BandwidthMeasurement {
    /// Calculate throughput in bits per second
    pub fn throughput_bps(&self) -> u64 {
        if self.duration.as_secs_f64() > 0.0 {
            ((self.bytes as f64 * 8.0) / self.duration.as_secs_f64()) as u64
        } else {
            0
        }
    }
}

/// Throughput-based level chooser
pub struct AbrEngine {
    /// Current bandwidth estimate
    bandwidth_estimate: u64,
    /// Fraction of the estimate a level may use
    safety_factor: f64,
    /// Last selected level index
    last_selection: Option<usize>,
    /// Stability counter (prevent oscillation)
    stability_counter: u32,
}

impl AbrEngine {
    pub fn new() -> Self {
        Self {
            bandwidth_estimate: 0,
            safety_factor: 0.8,
            last_selection: None,
            stability_counter: 0,
        }
    }

    /// Record a bandwidth measurement
    #[instrument(skip(self))]
    pub fn record_measurement(&mut self, bytes: usize, duration: Duration) {
        let sample = BandwidthMeasurement { bytes, duration }.throughput_bps();
        if sample == 0 {
            return;
        }

        // EWMA with alpha = 0.2
        if self.bandwidth_estimate == 0 {
            self.bandwidth_estimate = sample;
        } else {
            self.bandwidth_estimate =
                ((self.bandwidth_estimate as f64 * 0.8) + (sample as f64 * 0.2)) as u64;
        }

        debug!(
            bytes = bytes,
            duration_ms = duration.as_millis(),
            throughput_mbps = sample as f64 / 1_000_000.0,
            estimate_mbps = self.bandwidth_estimate as f64 / 1_000_000.0,
            "Bandwidth measurement recorded"
        );
    }

    /// Pick a level from per-level bandwidths (manifest order).
    ///
    /// Before any measurement the first level is used. A new choice must win
    /// three consecutive times before it replaces the previous one.
    pub fn select_level(&mut self, bandwidths: &[u64]) -> Option<usize> {
        if bandwidths.is_empty() {
            return None;
        }

        let candidate = if self.bandwidth_estimate == 0 {
            0
        } else {
            let budget = (self.bandwidth_estimate as f64 * self.safety_factor) as u64;
            bandwidths
                .iter()
                .enumerate()
                .filter(|(_, bw)| **bw <= budget)
                .max_by_key(|(_, bw)| **bw)
                .map(|(index, _)| index)
                .unwrap_or_else(|| lowest_level(bandwidths))
        };

        if let Some(last) = self.last_selection.filter(|last| *last < bandwidths.len()) {
            if candidate != last {
                self.stability_counter += 1;
                if self.stability_counter < 3 {
                    return Some(last);
                }
            }
            self.stability_counter = 0;
        }

        self.last_selection = Some(candidate);
        Some(candidate)
    }

    /// Get current bandwidth estimate
    pub fn bandwidth_estimate(&self) -> u64 {
        self.bandwidth_estimate
    }
}

impl Default for AbrEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn lowest_level(bandwidths: &[u64]) -> usize {
    bandwidths
        .iter()
        .enumerate()
        .min_by_key(|(_, bw)| **bw)
        .map(|(index, _)| index)
        .unwrap_or(0)
}
