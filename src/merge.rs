//! Combining worker partials and reassembling lines cut by range boundaries.

use rayon::prelude::*;

use crate::aggregate::{Aggregator, PartialMap, StationStats};
use crate::chunk::Fragments;
use crate::error::Result;

/// Associative, commutative combination of two partials. The empty map is
/// the identity. Fails if a combined sum overflows.
pub fn merge(a: PartialMap, b: PartialMap) -> Result<PartialMap> {
    let (mut into, from) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    for (key, stats) in from {
        into.absorb(key, stats)?;
    }
    Ok(into)
}

/// Tree reduction of any number of partials on the rayon pool.
pub fn merge_all<I>(partials: I) -> Result<PartialMap>
where
    I: IntoParallelIterator<Item = PartialMap>,
{
    partials
        .into_par_iter()
        .map(Ok)
        .try_reduce(PartialMap::new, merge)
}

/// Rebuilds every line cut by a range boundary from `fragments` (ordered by
/// range index) and feeds it to `aggregator`. Returns the number of lines
/// rebuilt.
///
/// Normally each boundary yields `tail(i) + head(i + 1)`. Ranges marked
/// `spans_range` contribute their bytes to the line in progress without
/// closing it.
pub fn stitch(fragments: &[Fragments], aggregator: &mut Aggregator) -> Result<usize> {
    let mut pending = Vec::new();
    let mut pending_offset = 0;
    let mut stitched = 0;

    for fragment in fragments {
        if !fragment.range.is_first() {
            if pending.is_empty() {
                pending_offset = fragment.range.start;
            }
            pending.extend_from_slice(&fragment.head);
            if fragment.spans_range {
                continue;
            }
            aggregator.observe(&pending, pending_offset)?;
            stitched += 1;
            pending.clear();
        }
        pending.extend_from_slice(&fragment.tail);
        pending_offset = fragment.tail_offset;
    }

    if !pending.is_empty() {
        aggregator.observe(&pending, pending_offset)?;
        stitched += 1;
    }
    Ok(stitched)
}

/// Fully merged result of a run. Read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalMap(PartialMap);

impl FinalMap {
    pub fn get(&self, key: &[u8]) -> Option<&StationStats> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in ascending byte-wise key order.
    pub fn sorted(&self) -> Vec<(&[u8], &StationStats)> {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl From<PartialMap> for FinalMap {
    fn from(map: PartialMap) -> Self {
        Self(map)
    }
}
