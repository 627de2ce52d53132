//! Time ranges, version limits and version filtering

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use crate::model::{Timestamp, Timestamped};

/// Half-open timestamp interval `[min, max)`; a missing bound is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub min: Option<Timestamp>,
    pub max: Option<Timestamp>,
}

impl TimeRange {
    pub const ALL: TimeRange = TimeRange { min: None, max: None };

    pub fn new(min: Option<Timestamp>, max: Option<Timestamp>) -> Result<Self, String> {
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(format!("start {} is after end {}", lo, hi));
            }
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.min.map_or(true, |lo| ts >= lo) && self.max.map_or(true, |hi| ts < hi)
    }
}

impl FromStr for TimeRange {
    type Err = String;

    /// Parse `start..end`, either side optional
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lo, hi) = s
            .split_once("..")
            .ok_or_else(|| format!("expected 'start..end', got '{}'", s))?;
        let bound = |text: &str| -> Result<Option<Timestamp>, String> {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse()
                .map(Some)
                .map_err(|_| format!("'{}' is not a timestamp", text))
        };
        Self::new(bound(lo)?, bound(hi)?)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(lo) = self.min {
            write!(f, "{}", lo)?;
        }
        f.write_str("..")?;
        if let Some(hi) = self.max {
            write!(f, "{}", hi)?;
        }
        Ok(())
    }
}

/// How many versions of each coordinate to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionLimit {
    All,
    Latest(NonZeroUsize),
}

impl VersionLimit {
    pub const ONE: VersionLimit = VersionLimit::Latest(NonZeroUsize::MIN);

    pub fn get(self) -> Option<usize> {
        match self {
            VersionLimit::All => None,
            VersionLimit::Latest(n) => Some(n.get()),
        }
    }
}

impl Default for VersionLimit {
    fn default() -> Self {
        Self::ONE
    }
}

impl FromStr for VersionLimit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(VersionLimit::All);
        }
        s.parse::<NonZeroUsize>()
            .map(VersionLimit::Latest)
            .map_err(|_| format!("expected 'all' or a positive integer, got '{}'", s))
    }
}

impl fmt::Display for VersionLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionLimit::All => f.write_str("all"),
            VersionLimit::Latest(n) => write!(f, "{}", n),
        }
    }
}

/// Keep the `limit` newest versions inside `range`, newest first
///
/// The range is applied before the cap.
pub fn filter_versions<V>(
    mut versions: Vec<Timestamped<V>>,
    range: TimeRange,
    limit: VersionLimit,
) -> Vec<Timestamped<V>> {
    versions.sort_by(|a, b| b.ts.cmp(&a.ts));
    versions.retain(|v| range.contains(v.ts));
    if let Some(n) = limit.get() {
        versions.truncate(n);
    }
    versions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(stamps: &[u64]) -> Vec<Timestamped<u64>> {
        stamps
            .iter()
            .map(|&ts| Timestamped::new(ts, Timestamp::new(ts)))
            .collect()
    }

    fn stamps(filtered: &[Timestamped<u64>]) -> Vec<u64> {
        filtered.iter().map(|v| v.ts.get()).collect()
    }

    #[test]
    fn test_parse_time_range() {
        let range: TimeRange = "2..3".parse().unwrap();
        assert_eq!(range, TimeRange::new(Some(2.into()), Some(3.into())).unwrap());
        assert!(range.contains(2.into()));
        assert!(!range.contains(3.into()));

        assert_eq!("..".parse::<TimeRange>().unwrap(), TimeRange::ALL);
        assert_eq!("5..".parse::<TimeRange>().unwrap().to_string(), "5..");
        assert!("5".parse::<TimeRange>().is_err());
        assert!("9..2".parse::<TimeRange>().is_err());
        assert!("a..b".parse::<TimeRange>().is_err());
    }

    #[test]
    fn test_parse_version_limit() {
        assert_eq!("all".parse::<VersionLimit>().unwrap(), VersionLimit::All);
        assert_eq!("3".parse::<VersionLimit>().unwrap().get(), Some(3));
        assert!("0".parse::<VersionLimit>().is_err());
        assert!("-1".parse::<VersionLimit>().is_err());
        assert_eq!(VersionLimit::default(), VersionLimit::ONE);
    }

    #[test]
    fn test_range_before_cap() {
        let input = versions(&[1, 2, 3, 4, 5]);
        let range: TimeRange = "2..3".parse().unwrap();
        assert_eq!(stamps(&filter_versions(input.clone(), range, VersionLimit::ONE)), [2]);
        assert_eq!(
            stamps(&filter_versions(input.clone(), TimeRange::ALL, VersionLimit::All)),
            [5, 4, 3, 2, 1]
        );
        assert_eq!(stamps(&filter_versions(input, TimeRange::ALL, VersionLimit::ONE)), [5]);
    }

    #[test]
    fn test_filter_is_newest_in_range() {
        let input = versions(&[7, 1, 9, 4, 4, 12, 3]);
        for lo in 0..14u64 {
            for hi in lo..14u64 {
                let range = TimeRange::new(Some(lo.into()), Some(hi.into())).unwrap();
                let mut in_range: Vec<u64> = input
                    .iter()
                    .map(|v| v.ts.get())
                    .filter(|&ts| ts >= lo && ts < hi)
                    .collect();
                in_range.sort_unstable_by(|a, b| b.cmp(a));
                for n in 1..5usize {
                    let limit = VersionLimit::Latest(NonZeroUsize::new(n).unwrap());
                    let got = stamps(&filter_versions(input.clone(), range, limit));
                    let expected: Vec<u64> = in_range.iter().copied().take(n).collect();
                    assert_eq!(got, expected, "range {} limit {}", range, n);
                }
            }
        }
    }
}
