//! Seek table: a bounded (timestamp, file offset) index over keyframes.
//!
//! The table is built exactly one of two ways, decided once after the
//! metadata parse:
//!
//! - **Imported**: the `onMetaData` tag supplied explicit
//!   `filepositions`/`times` arrays. They are copied in, down-sampled by
//!   a fixed stride if they exceed the table capacity.
//! - **Synthesized**: no index in the file. Entries are appended
//!   incrementally as video keyframes flow past during normal forward
//!   demuxing, spaced at least one granularity interval apart so the
//!   bounded table covers the whole declared duration.
//!
//! Lookups answer "seek to millisecond X" with the bracketing entry at
//! or before X. Ordering of imported entries is taken on faith from the
//! file; lookups are written to be total for unsorted input.

use crate::metadata::Metadata;
use tracing::debug;

/// Default maximum number of table entries.
pub const DEFAULT_TABLE_CAPACITY: usize = 2048;

/// Hard lower bound on entry spacing in synthesized mode.
pub const MIN_GRANULARITY_MS: u64 = 1000;

/// Hard upper bound on entry spacing in synthesized mode.
pub const MAX_GRANULARITY_MS: u64 = 5000;

/// One seek table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekEntry {
    /// Keyframe timestamp in milliseconds.
    pub time_ms: u64,
    /// File offset of the keyframe's tag.
    pub offset: u64,
}

/// Bounded keyframe index.
#[derive(Debug, Clone)]
pub struct SeekTable {
    entries: Vec<SeekEntry>,
    capacity: usize,
    granularity_ms: u64,
    /// Timestamp of the most recently accepted entry; the granularity
    /// gate measures from here.
    range_time_ms: u64,
    imported: bool,
}

impl SeekTable {
    /// Create an empty synthesized-mode table.
    ///
    /// The granularity is derived from the declared duration so the
    /// entries spread evenly across it, clamped to the hard bounds; an
    /// unknown or zero duration gets the minimum granularity and the
    /// full capacity.
    pub fn synthesized(capacity: usize, duration_ms: u64) -> Self {
        let capacity = capacity.max(1);
        let granularity_ms = if duration_ms == 0 {
            MIN_GRANULARITY_MS
        } else {
            (duration_ms / capacity as u64).clamp(MIN_GRANULARITY_MS, MAX_GRANULARITY_MS)
        };

        Self {
            entries: Vec::new(),
            capacity,
            granularity_ms,
            range_time_ms: 0,
            imported: false,
        }
    }

    /// Build an imported-mode table from metadata index arrays.
    ///
    /// Returns `None` when the metadata carries no index. Oversized
    /// arrays are down-sampled by stride (`ceil(n / capacity)`, keeping
    /// every Nth entry) so the capacity is never exceeded.
    pub fn from_metadata(meta: &Metadata, capacity: usize) -> Option<Self> {
        if !meta.has_seek_index() {
            return None;
        }

        let capacity = capacity.max(1);
        let n = meta.file_positions.len().min(meta.times_ms.len());
        let stride = n.div_ceil(capacity).max(1);

        let entries: Vec<SeekEntry> = (0..n)
            .step_by(stride)
            .map(|i| SeekEntry {
                time_ms: meta.times_ms[i],
                offset: meta.file_positions[i],
            })
            .collect();

        if stride > 1 {
            debug!(
                source_entries = n,
                stride,
                kept = entries.len(),
                "down-sampled metadata seek index"
            );
        }

        Some(Self {
            range_time_ms: entries.last().map(|e| e.time_ms).unwrap_or(0),
            entries,
            capacity,
            granularity_ms: MIN_GRANULARITY_MS,
            imported: true,
        })
    }

    /// Number of populated entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no entries are populated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the table was imported from metadata.
    pub fn is_imported(&self) -> bool {
        self.imported
    }

    /// Whether the table has reached capacity.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Entry spacing enforced in synthesized mode.
    pub fn granularity_ms(&self) -> u64 {
        self.granularity_ms
    }

    /// The last (highest-indexed) entry.
    pub fn last(&self) -> Option<&SeekEntry> {
        self.entries.last()
    }

    /// All entries, in insertion order.
    pub fn entries(&self) -> &[SeekEntry] {
        &self.entries
    }

    /// Offer a video keyframe observed during forward demuxing.
    ///
    /// Rejected when the table was imported (metadata already covers the
    /// file), when full, or when the keyframe is closer than one
    /// granularity interval to the last accepted entry. Returns whether
    /// the entry was accepted.
    pub fn observe_keyframe(&mut self, time_ms: u64, offset: u64) -> bool {
        if self.imported || self.is_full() {
            return false;
        }
        if !self.entries.is_empty() && time_ms < self.range_time_ms + self.granularity_ms {
            return false;
        }

        self.entries.push(SeekEntry { time_ms, offset });
        self.range_time_ms = time_ms;
        true
    }

    /// Find the bracketing entry for `target_ms`: the last entry whose
    /// timestamp is at or before the target. `None` when the table is
    /// empty or the target precedes the first entry.
    pub fn lookup(&self, target_ms: u64) -> Option<&SeekEntry> {
        let mut best: Option<&SeekEntry> = None;
        for entry in &self.entries {
            if entry.time_ms <= target_ms {
                match best {
                    Some(b) if b.time_ms >= entry.time_ms => {}
                    _ => best = Some(entry),
                }
            }
        }
        best
    }
}
