use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncScope {
    Global,
    /// One bucket of the global scheme.
    GlobalBucket { label: String },
    Artist { artist_id: String },
    MinorArtists,
}

impl fmt::Display for SyncScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncScope::Global => write!(f, "global"),
            SyncScope::GlobalBucket { label } => write!(f, "global:{}", label),
            SyncScope::Artist { artist_id } => write!(f, "artist:{}", artist_id),
            SyncScope::MinorArtists => write!(f, "minor-artists"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BucketOutcome {
    Success,
    Failure { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketResult {
    pub playlist_id: String,
    /// Tracks classified into this bucket.
    pub track_count: usize,
    /// Tracks confirmed by the remote before the bucket finished or failed.
    pub inserted: usize,
    #[serde(flatten)]
    pub outcome: BucketOutcome,
}

impl BucketResult {
    pub fn succeeded(&self) -> bool {
        self.outcome == BucketOutcome::Success
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub scope: SyncScope,
    pub bucket_results: BTreeMap<String, BucketResult>,
    pub overall_success: bool,
}

impl SyncReport {
    pub fn new(scope: SyncScope, bucket_results: BTreeMap<String, BucketResult>) -> Self {
        let overall_success = bucket_results.values().all(BucketResult::succeeded);
        Self {
            scope,
            bucket_results,
            overall_success,
        }
    }

    pub fn failed_buckets(&self) -> impl Iterator<Item = &str> {
        self.bucket_results
            .iter()
            .filter(|(_, result)| !result.succeeded())
            .map(|(label, _)| label.as_str())
    }
}
