use crate::config::{ClearMode, SyncSettings};
use crate::error::{AppError, Result};
use crate::models::{
    BucketOutcome, BucketResult, PartitionScheme, PopularityRange, SyncReport, SyncScope, Track,
};
use crate::services::classifier::{classify, minor_artists, TrackFilter};
use crate::services::gateway::{RemoteLibraryGateway, Session};
use crate::services::library_cache::LibraryCache;
use crate::services::resolver::{PlaylistResolver, ResolvedBucket};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

const MINOR_BUCKET: &str = "minor";

/// Runs one classify-then-populate pass for a scope.
#[derive(Clone)]
pub struct PlaylistSynchronizer {
    library: LibraryCache,
    resolver: PlaylistResolver,
    settings: Arc<SyncSettings>,
    /// Owners with a run in flight.
    in_flight: Arc<Mutex<HashSet<String>>>,
}

/// Releases the owner's run slot when dropped.
struct RunGuard {
    owner_id: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.owner_id);
    }
}

impl PlaylistSynchronizer {
    pub fn new(library: LibraryCache, settings: Arc<SyncSettings>) -> Self {
        Self {
            library,
            resolver: PlaylistResolver::new(settings.clone()),
            settings,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn sync(&self, session: &Session, scope: &SyncScope) -> Result<SyncReport> {
        let _guard = self.acquire(&session.owner_id)?;
        let gateway = session.gateway.as_ref();
        info!("Starting {} sync for {}", scope, session.owner_id);

        let buckets = self.resolve(session, scope).await?;

        let clear_mode = self.clear_mode(scope);
        if clear_mode == ClearMode::RequireEmpty {
            if let Some(bucket) = buckets.iter().find(|b| b.playlist.track_count > 0) {
                return Err(AppError::PlaylistNotEmpty(format!(
                    "playlist {} ({}) for bucket `{}` already holds {} tracks",
                    bucket.playlist.name, bucket.playlist.id, bucket.label, bucket.playlist.track_count
                )));
            }
        }

        // Load before clearing so an upstream outage leaves the playlists untouched.
        let library = self.library.get_library(gateway, &session.owner_id).await?;

        if clear_mode == ClearMode::AutoClear {
            clear_all(gateway, &buckets).await?;
        }

        let (scheme, filter) = self.classification(scope, &library.tracks);
        let classified = classify(&library.tracks, &scheme, &filter);

        let inserts = buckets.iter().map(|bucket| {
            let tracks = classified
                .get(&bucket.label)
                .map(Vec::as_slice)
                .unwrap_or_default();
            self.insert_bucket(gateway, bucket, tracks)
        });
        let results = join_all(inserts).await;

        let report = SyncReport::new(
            scope.clone(),
            buckets.iter().map(|b| b.label.clone()).zip(results).collect(),
        );

        if report.overall_success {
            info!("{} sync for {} completed", scope, session.owner_id);
        } else {
            warn!(
                "{} sync for {} finished with failed buckets: {:?}",
                scope,
                session.owner_id,
                report.failed_buckets().collect::<Vec<_>>()
            );
        }

        Ok(report)
    }

    fn acquire(&self, owner_id: &str) -> Result<RunGuard> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(owner_id.to_string()) {
            return Err(AppError::SyncInProgress(owner_id.to_string()));
        }

        Ok(RunGuard {
            owner_id: owner_id.to_string(),
            in_flight: self.in_flight.clone(),
        })
    }

    async fn resolve(&self, session: &Session, scope: &SyncScope) -> Result<Vec<ResolvedBucket>> {
        let gateway = session.gateway.as_ref();
        match scope {
            SyncScope::Global => self.resolver.resolve_global(gateway).await,
            SyncScope::GlobalBucket { label } => {
                Ok(vec![self.resolver.resolve_global_bucket(gateway, label).await?])
            }
            SyncScope::Artist { artist_id } => {
                let (artist_name, buckets) = self
                    .resolver
                    .resolve_artist(gateway, &session.owner_id, artist_id)
                    .await?;
                info!("Resolved {} playlists for artist {}", buckets.len(), artist_name);
                Ok(buckets)
            }
            SyncScope::MinorArtists => {
                let playlist = self
                    .resolver
                    .resolve_named(gateway, &session.owner_id, &self.settings.minor_playlist_name)
                    .await?;
                Ok(vec![ResolvedBucket {
                    label: MINOR_BUCKET.to_string(),
                    range: PopularityRange::full(),
                    playlist,
                }])
            }
        }
    }

    fn clear_mode(&self, scope: &SyncScope) -> ClearMode {
        match scope {
            SyncScope::Global | SyncScope::GlobalBucket { .. } => self.settings.global_clear_mode,
            SyncScope::Artist { .. } | SyncScope::MinorArtists => self.settings.artist_clear_mode,
        }
    }

    fn classification(&self, scope: &SyncScope, tracks: &[Track]) -> (PartitionScheme, TrackFilter) {
        match scope {
            SyncScope::Global | SyncScope::GlobalBucket { .. } => {
                (self.settings.global_scheme.clone(), TrackFilter::All)
            }
            SyncScope::Artist { artist_id } => (
                self.settings.artist_scheme.clone(),
                TrackFilter::Artist(artist_id.clone()),
            ),
            SyncScope::MinorArtists => (
                PartitionScheme::single(MINOR_BUCKET),
                TrackFilter::PrimaryArtists(minor_artists(tracks, self.settings.minor_artist_max_tracks)),
            ),
        }
    }

    /// Inserts one bucket's tracks batch by batch, stopping at the first
    /// rejected batch.
    async fn insert_bucket(
        &self,
        gateway: &dyn RemoteLibraryGateway,
        bucket: &ResolvedBucket,
        tracks: &[&Track],
    ) -> BucketResult {
        let uris: Vec<String> = tracks.iter().map(|t| t.uri.clone()).collect();
        let mut inserted = 0;

        for (index, batch) in uris.chunks(self.settings.batch_size.max(1)).enumerate() {
            let failure = match gateway.add_items(&bucket.playlist.id, batch).await {
                Ok(token) if !token.is_empty() => None,
                Ok(_) => Some(format!("batch {} was not confirmed", index + 1)),
                Err(e) => Some(format!("batch {} failed: {}", index + 1, e)),
            };

            if let Some(reason) = failure {
                warn!("Bucket `{}` ({}): {}", bucket.label, bucket.playlist.id, reason);
                return BucketResult {
                    playlist_id: bucket.playlist.id.clone(),
                    track_count: uris.len(),
                    inserted,
                    outcome: BucketOutcome::Failure { reason },
                };
            }
            inserted += batch.len();
        }

        info!(
            "Bucket `{}` ({}): inserted {} tracks into {}",
            bucket.label, bucket.range, inserted, bucket.playlist.id
        );
        BucketResult {
            playlist_id: bucket.playlist.id.clone(),
            track_count: uris.len(),
            inserted,
            outcome: BucketOutcome::Success,
        }
    }
}

async fn clear_all(gateway: &dyn RemoteLibraryGateway, buckets: &[ResolvedBucket]) -> Result<()> {
    let clears = buckets.iter().map(|bucket| async move {
        match gateway.remove_all_items(&bucket.playlist.id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::UpstreamFetch(format!(
                "could not clear playlist {}",
                bucket.playlist.id
            ))),
            Err(e) => Err(e),
        }
    });

    join_all(clears).await.into_iter().collect()
}
