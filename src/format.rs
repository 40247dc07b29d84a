//! Rendering a [`FinalMap`] as `{key=min/mean/max, ...}`.

use std::fmt;

use crate::merge::FinalMap;

/// Keys in byte-wise order, numbers with one fractional digit. Depends only
/// on the map's contents.
pub fn format_results(map: &FinalMap) -> String {
    map.to_string()
}

impl fmt::Display for FinalMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, stats)) in self.sorted().into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(
                f,
                "{}={}/{}/{}",
                String::from_utf8_lossy(key),
                stats.min,
                stats.mean(),
                stats.max
            )?;
        }
        f.write_str("}")
    }
}
