use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub const MAX_POPULARITY: u8 = 100;

/// Inclusive popularity bounds, always within `0..=100` with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRange", into = "RawRange")]
pub struct PopularityRange {
    min: u8,
    max: u8,
}

#[derive(Serialize, Deserialize)]
struct RawRange {
    min: u8,
    max: u8,
}

impl TryFrom<RawRange> for PopularityRange {
    type Error = AppError;

    fn try_from(raw: RawRange) -> Result<Self> {
        PopularityRange::new(raw.min, raw.max)
    }
}

impl From<PopularityRange> for RawRange {
    fn from(range: PopularityRange) -> Self {
        RawRange {
            min: range.min,
            max: range.max,
        }
    }
}

impl PopularityRange {
    pub fn new(min: u8, max: u8) -> Result<Self> {
        if min > max {
            return Err(AppError::InvalidRange(format!(
                "min ({}) cannot be greater than max ({})",
                min, max
            )));
        }
        if max > MAX_POPULARITY {
            return Err(AppError::InvalidRange(format!(
                "max ({}) exceeds {}",
                max, MAX_POPULARITY
            )));
        }
        Ok(Self { min, max })
    }

    pub fn full() -> Self {
        Self {
            min: 0,
            max: MAX_POPULARITY,
        }
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn contains(&self, popularity: u8) -> bool {
        popularity >= self.min && popularity <= self.max
    }
}

impl fmt::Display for PopularityRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl FromStr for PopularityRange {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let (min, max) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| AppError::InvalidRange(format!("expected `min-max`, got `{}`", s)))?;
        let parse = |value: &str| {
            value
                .trim()
                .parse::<u8>()
                .map_err(|_| AppError::InvalidRange(format!("`{}` is not a popularity value", value)))
        };
        PopularityRange::new(parse(min)?, parse(max)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledRange {
    pub label: String,
    pub range: PopularityRange,
}

/// Ordered, gap-free and non-overlapping cover of `0..=100`.
///
/// Every popularity value belongs to exactly one range, so classification
/// never has to break ties. Parsed schemes go through [`PartitionScheme::new`],
/// which validates the whole scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionScheme {
    ranges: Vec<LabeledRange>,
}

impl PartitionScheme {
    pub fn new(ranges: Vec<LabeledRange>) -> Result<Self> {
        let mut ranges = ranges;
        ranges.sort_by_key(|r| r.range.min());

        let Some(first) = ranges.first() else {
            return Err(AppError::InvalidRange("partition has no ranges".to_string()));
        };
        if first.range.min() != 0 {
            return Err(AppError::InvalidRange(format!(
                "partition must start at 0, `{}` starts at {}",
                first.label,
                first.range.min()
            )));
        }

        let mut labels = HashSet::new();
        for pair in ranges.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if u16::from(next.range.min()) != u16::from(prev.range.max()) + 1 {
                return Err(AppError::InvalidRange(format!(
                    "`{}` ({}) and `{}` ({}) leave a gap or overlap",
                    prev.label, prev.range, next.label, next.range
                )));
            }
        }
        for labeled in &ranges {
            if labeled.label.trim().is_empty() {
                return Err(AppError::InvalidRange("empty bucket label".to_string()));
            }
            if !labels.insert(labeled.label.as_str()) {
                return Err(AppError::InvalidRange(format!(
                    "duplicate bucket label `{}`",
                    labeled.label
                )));
            }
        }

        let last = &ranges[ranges.len() - 1];
        if last.range.max() != MAX_POPULARITY {
            return Err(AppError::InvalidRange(format!(
                "partition must end at {}, `{}` ends at {}",
                MAX_POPULARITY,
                last.label,
                last.range.max()
            )));
        }

        Ok(Self { ranges })
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, u8, u8)]) -> Result<Self> {
        let ranges = pairs
            .iter()
            .map(|(label, min, max)| {
                Ok(LabeledRange {
                    label: label.to_string(),
                    range: PopularityRange::new(*min, *max)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(ranges)
    }

    /// Four buckets used for the fixed global playlists.
    pub fn global_default() -> Self {
        Self::builtin(vec![
            ("less", 0, 20),
            ("lessMedium", 21, 40),
            ("moreMedium", 41, 80),
            ("more", 81, 100),
        ])
    }

    /// Three buckets used for per-artist playlists.
    pub fn artist_default() -> Self {
        Self::builtin(vec![("less", 0, 33), ("medium", 34, 66), ("more", 67, 100)])
    }

    pub fn single(label: &str) -> Self {
        Self {
            ranges: vec![LabeledRange {
                label: label.to_string(),
                range: PopularityRange::full(),
            }],
        }
    }

    fn builtin(pairs: Vec<(&str, u8, u8)>) -> Self {
        Self {
            ranges: pairs
                .into_iter()
                .map(|(label, min, max)| LabeledRange {
                    label: label.to_string(),
                    range: PopularityRange { min, max },
                })
                .collect(),
        }
    }

    /// Returns a copy with `label` bound to `range`. Fails if the result
    /// would no longer cover `0..=100` exactly once.
    #[cfg(test)]
    pub fn replace(&self, label: &str, range: PopularityRange) -> Result<Self> {
        let mut ranges = self.ranges.clone();
        let slot = ranges
            .iter_mut()
            .find(|r| r.label == label)
            .ok_or_else(|| AppError::InvalidRange(format!("unknown bucket label `{}`", label)))?;
        slot.range = range;
        Self::new(ranges)
    }

    pub fn ranges(&self) -> &[LabeledRange] {
        &self.ranges
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.ranges.iter().map(|r| r.label.as_str())
    }

    pub fn range_of(&self, label: &str) -> Option<PopularityRange> {
        self.ranges.iter().find(|r| r.label == label).map(|r| r.range)
    }

    pub fn label_for(&self, popularity: u8) -> Option<&str> {
        self.ranges
            .iter()
            .find(|r| r.range.contains(popularity))
            .map(|r| r.label.as_str())
    }
}

/// Parses `less=0-20,lessMedium=21-40,...`.
impl FromStr for PartitionScheme {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let ranges = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (label, range) = part.split_once('=').ok_or_else(|| {
                    AppError::InvalidRange(format!("expected `label=min-max`, got `{}`", part))
                })?;
                Ok(LabeledRange {
                    label: label.trim().to_string(),
                    range: range.parse()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(ranges)
    }
}

impl fmt::Display for PartitionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, labeled) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}={}", labeled.label, labeled.range)?;
        }
        Ok(())
    }
}
