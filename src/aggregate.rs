//! Per-worker aggregation of `key;value` lines into a [`PartialMap`].

use ahash::AHashMap;
use log::warn;
use memchr::{memchr, memchr_iter};

use crate::config::Strictness;
use crate::decimal::FixedDecimal;
use crate::error::{Error, Result};

/// Running statistics for one key. Never exists with `count == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationStats {
    pub min: FixedDecimal,
    pub max: FixedDecimal,
    pub sum_tenths: i64,
    pub count: u64,
}

impl StationStats {
    pub fn new(value: FixedDecimal) -> Self {
        Self {
            min: value,
            max: value,
            sum_tenths: value.tenths(),
            count: 1,
        }
    }

    /// Returns `None`, leaving `self` untouched, if the sum would overflow.
    #[inline]
    #[must_use]
    pub fn record(&mut self, value: FixedDecimal) -> Option<()> {
        self.sum_tenths = self.sum_tenths.checked_add(value.tenths())?;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.count += 1;
        Some(())
    }

    /// Returns `None`, leaving `self` untouched, if the sum would overflow.
    #[must_use]
    pub fn combine(&mut self, other: &StationStats) -> Option<()> {
        self.sum_tenths = self.sum_tenths.checked_add(other.sum_tenths)?;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count += other.count;
        Some(())
    }

    pub fn mean(&self) -> FixedDecimal {
        FixedDecimal::mean(self.sum_tenths, self.count)
    }
}

/// Key to [`StationStats`] mapping produced by one worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialMap {
    stations: AHashMap<Box<[u8]>, StationStats>,
}

impl PartialMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            stations: AHashMap::with_capacity(capacity),
        }
    }

    /// Records one observation of `key` read from the line at `offset`.
    #[inline]
    pub fn record(&mut self, key: &[u8], value: FixedDecimal, offset: u64) -> Result<()> {
        match self.stations.get_mut(key) {
            Some(stats) => stats
                .record(value)
                .ok_or_else(|| Error::sum_overflow(key, Some(offset))),
            None => {
                self.stations.insert(key.into(), StationStats::new(value));
                Ok(())
            }
        }
    }

    /// Folds already-aggregated stats for `key` into the map.
    pub fn absorb(&mut self, key: Box<[u8]>, stats: StationStats) -> Result<()> {
        match self.stations.get_mut(&key) {
            Some(existing) => existing
                .combine(&stats)
                .ok_or_else(|| Error::sum_overflow(&key, None)),
            None => {
                self.stations.insert(key, stats);
                Ok(())
            }
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<&StationStats> {
        self.stations.get(key)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &StationStats)> {
        self.stations.iter().map(|(key, stats)| (&**key, stats))
    }
}

impl IntoIterator for PartialMap {
    type Item = (Box<[u8]>, StationStats);
    type IntoIter = std::collections::hash_map::IntoIter<Box<[u8]>, StationStats>;

    fn into_iter(self) -> Self::IntoIter {
        self.stations.into_iter()
    }
}

/// Expected number of distinct keys; sizes the per-worker map up front.
const EXPECTED_STATIONS: usize = 10_000;

/// Parses lines into a [`PartialMap`], applying the configured strictness.
#[derive(Debug)]
pub struct Aggregator {
    map: PartialMap,
    strictness: Strictness,
    skipped: u64,
}

impl Aggregator {
    pub fn new(strictness: Strictness) -> Self {
        Self {
            map: PartialMap::with_capacity(EXPECTED_STATIONS),
            strictness,
            skipped: 0,
        }
    }

    /// Processes a batch of newline-separated lines. The batch need not end
    /// with a newline; bytes after the last newline are a complete line.
    /// `offset` is the absolute file offset of `batch[0]`.
    pub fn feed(&mut self, batch: &[u8], offset: u64) -> Result<()> {
        let mut start = 0;
        for end in memchr_iter(b'\n', batch) {
            self.observe(&batch[start..end], offset + start as u64)?;
            start = end + 1;
        }
        self.observe(&batch[start..], offset + start as u64)
    }

    /// Processes a single line without its newline.
    pub fn observe(&mut self, line: &[u8], offset: u64) -> Result<()> {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            return Ok(());
        }

        let Some(split) = memchr(b';', line) else {
            return self.reject(Error::malformed_line(line, offset));
        };
        let (key, token) = (&line[..split], &line[split + 1..]);

        match FixedDecimal::parse(token) {
            // overflow is fatal in both modes: skipping it would drop a valid line
            Ok(value) => self.map.record(key, value, offset),
            Err(source) => self.reject(Error::malformed_number(key, token, offset, source)),
        }
    }

    fn reject(&mut self, error: Error) -> Result<()> {
        match self.strictness {
            Strictness::Strict => Err(error),
            Strictness::Permissive => {
                warn!("skipping input: {error}");
                self.skipped += 1;
                Ok(())
            }
        }
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn into_parts(self) -> (PartialMap, u64) {
        (self.map, self.skipped)
    }
}
