//! Fragment buffer for the HLS loader
//!
//! Handles:
//! - Forward buffer level monitoring
//! - Back-buffer retention and eviction
//! - Dropping unplayed data for decoder recovery

use bytes::Bytes;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Buffered fragment data
#[derive(Debug, Clone)]
pub struct BufferedFragment {
    pub sequence: u64,
    pub data: Bytes,
    /// Start time in the session timeline (seconds)
    pub start_time: f64,
    /// End time in the session timeline (seconds)
    pub end_time: f64,
}

/// Buffer statistics
#[derive(Debug, Clone, PartialEq)]
pub struct BufferStats {
    pub fragment_count: usize,
    pub forward_level: f64,
    pub back_buffer: f64,
    pub memory_used: usize,
    pub playback_position: f64,
}

/// Timeline of appended fragments
#[derive(Debug)]
pub struct SegmentBuffer {
    fragments: BTreeMap<u64, BufferedFragment>,
    /// Played media kept behind the playhead (seconds)
    back_buffer_length: f64,
    playback_position: f64,
    memory_used: usize,
}

impl SegmentBuffer {
    pub fn new(back_buffer_length: Duration) -> Self {
        Self {
            fragments: BTreeMap::new(),
            back_buffer_length: back_buffer_length.as_secs_f64(),
            playback_position: 0.0,
            memory_used: 0,
        }
    }

    /// Append a fragment after the last buffered one
    pub fn append(&mut self, sequence: u64, duration: Duration, data: Bytes) {
        let start_time = self
            .fragments
            .values()
            .next_back()
            .map(|last| last.end_time)
            .unwrap_or(self.playback_position);
        let end_time = start_time + duration.as_secs_f64();

        self.memory_used += data.len();
        if let Some(replaced) = self.fragments.insert(
            sequence,
            BufferedFragment {
                sequence,
                data,
                start_time,
                end_time,
            },
        ) {
            self.memory_used -= replaced.data.len();
        }

        debug!(
            sequence,
            start = start_time,
            end = end_time,
            forward = self.forward_level(),
            "Fragment appended"
        );
    }

    /// Move the playhead and evict what falls out of the back-buffer
    pub fn update_position(&mut self, position: f64) {
        self.playback_position = position.max(0.0);
        let threshold = self.playback_position - self.back_buffer_length;

        let evict: Vec<u64> = self
            .fragments
            .values()
            .filter(|f| f.end_time <= threshold)
            .map(|f| f.sequence)
            .collect();

        for sequence in evict {
            if let Some(fragment) = self.fragments.remove(&sequence) {
                self.memory_used -= fragment.data.len();
                debug!(sequence, "Evicted fragment from back-buffer");
            }
        }
    }

    pub fn playback_position(&self) -> f64 {
        self.playback_position
    }

    /// Seconds buffered ahead of the playhead
    pub fn forward_level(&self) -> f64 {
        self.fragments
            .values()
            .filter(|f| f.end_time > self.playback_position)
            .map(|f| f.end_time - f.start_time.max(self.playback_position))
            .sum()
    }

    /// Seconds of played media still held
    pub fn back_buffer_level(&self) -> f64 {
        self.fragments
            .values()
            .filter(|f| f.start_time < self.playback_position)
            .map(|f| f.end_time.min(self.playback_position) - f.start_time)
            .sum()
    }

    /// End of buffered media on the timeline
    pub fn buffered_end(&self) -> f64 {
        self.fragments
            .values()
            .next_back()
            .map(|f| f.end_time)
            .unwrap_or(self.playback_position)
    }

    pub fn needs_data(&self, max_forward: f64) -> bool {
        self.forward_level() < max_forward
    }

    /// Drop every fragment not yet fully played. Returns the sequence the
    /// loader should refetch from, if anything was dropped.
    pub fn drop_ahead(&mut self) -> Option<u64> {
        let position = self.playback_position;
        let dropped: Vec<u64> = self
            .fragments
            .values()
            .filter(|f| f.end_time > position)
            .map(|f| f.sequence)
            .collect();

        let resume = dropped.first().copied();
        for sequence in dropped {
            if let Some(fragment) = self.fragments.remove(&sequence) {
                self.memory_used -= fragment.data.len();
            }
        }
        debug!(resume = ?resume, "Dropped unplayed fragments");
        resume
    }

    pub fn stats(&self) -> BufferStats {
        BufferStats {
            fragment_count: self.fragments.len(),
            forward_level: self.forward_level(),
            back_buffer: self.back_buffer_level(),
            memory_used: self.memory_used,
            playback_position: self.playback_position,
        }
    }
}
