use crate::config::{ArtistPlaylistPolicy, SyncSettings};
use crate::error::{AppError, Result};
use crate::models::{Playlist, PopularityRange};
use crate::services::gateway::RemoteLibraryGateway;
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// A bucket label bound to its range and the playlist it will be written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBucket {
    pub label: String,
    pub range: PopularityRange,
    pub playlist: Playlist,
}

/// Finds or creates the playlists each scope writes into.
#[derive(Clone)]
pub struct PlaylistResolver {
    settings: Arc<SyncSettings>,
}

impl PlaylistResolver {
    pub fn new(settings: Arc<SyncSettings>) -> Self {
        Self { settings }
    }

    /// Looks up every configured global playlist; any missing one fails the call.
    pub async fn resolve_global(&self, gateway: &dyn RemoteLibraryGateway) -> Result<Vec<ResolvedBucket>> {
        let lookups = self
            .settings
            .global_scheme
            .ranges()
            .iter()
            .map(|labeled| self.lookup_global(gateway, &labeled.label, labeled.range));

        try_join_all(lookups).await
    }

    /// Looks up the configured playlist of a single global bucket.
    pub async fn resolve_global_bucket(
        &self,
        gateway: &dyn RemoteLibraryGateway,
        label: &str,
    ) -> Result<ResolvedBucket> {
        let range = self.settings.global_scheme.range_of(label).ok_or_else(|| {
            AppError::Validation(format!(
                "unknown bucket `{}`, expected one of: {}",
                label,
                self.settings.global_scheme.labels().collect::<Vec<_>>().join(", ")
            ))
        })?;

        self.lookup_global(gateway, label, range).await
    }

    async fn lookup_global(
        &self,
        gateway: &dyn RemoteLibraryGateway,
        label: &str,
        range: PopularityRange,
    ) -> Result<ResolvedBucket> {
        let playlist_id = self
            .settings
            .global_playlists
            .get(label)
            .ok_or_else(|| AppError::PlaylistNotFound(format!("no playlist configured for `{}`", label)))?;

        let playlist = gateway
            .get_playlist(playlist_id)
            .await?
            .ok_or_else(|| AppError::PlaylistNotFound(playlist_id.clone()))?;

        Ok(ResolvedBucket {
            label: label.to_string(),
            range,
            playlist,
        })
    }

    /// Resolves the `"{artist name} {label}"` playlists for one artist.
    ///
    /// Returns the artist's display name with the buckets.
    pub async fn resolve_artist(
        &self,
        gateway: &dyn RemoteLibraryGateway,
        owner_id: &str,
        artist_id: &str,
    ) -> Result<(String, Vec<ResolvedBucket>)> {
        let artist = gateway.get_artist(artist_id).await?;
        let existing = gateway.list_user_playlists(owner_id).await?;
        let scheme = &self.settings.artist_scheme;

        let by_name: HashMap<&str, &Playlist> = existing.iter().map(|p| (p.name.as_str(), p)).collect();
        let found: HashMap<&str, Playlist> = scheme
            .labels()
            .filter_map(|label| {
                by_name
                    .get(artist_playlist_name(&artist.name, label).as_str())
                    .map(|playlist| (label, (*playlist).clone()))
            })
            .collect();

        let all_found = found.len() == scheme.ranges().len();
        let reuse = match self.settings.artist_playlist_policy {
            ArtistPlaylistPolicy::RecreateAll => all_found,
            ArtistPlaylistPolicy::ReuseExisting => true,
        };
        if !all_found {
            info!(
                "Artist {} has {}/{} bucket playlists, policy {:?}",
                artist.name,
                found.len(),
                scheme.ranges().len(),
                self.settings.artist_playlist_policy
            );
        }

        let mut buckets = Vec::with_capacity(scheme.ranges().len());
        for labeled in scheme.ranges() {
            let playlist = match found.get(labeled.label.as_str()) {
                Some(playlist) if reuse => playlist.clone(),
                _ => {
                    let name = artist_playlist_name(&artist.name, &labeled.label);
                    info!("Creating playlist \"{}\"", name);
                    gateway.create_playlist(owner_id, &name).await?
                }
            };
            buckets.push(ResolvedBucket {
                label: labeled.label.clone(),
                range: labeled.range,
                playlist,
            });
        }

        Ok((artist.name, buckets))
    }

    /// Finds a playlist by exact name, creating it when absent.
    pub async fn resolve_named(
        &self,
        gateway: &dyn RemoteLibraryGateway,
        owner_id: &str,
        name: &str,
    ) -> Result<Playlist> {
        let existing = gateway.list_user_playlists(owner_id).await?;
        if let Some(playlist) = existing.into_iter().find(|p| p.name == name) {
            return Ok(playlist);
        }

        info!("Creating playlist \"{}\"", name);
        gateway.create_playlist(owner_id, name).await
    }
}

pub fn artist_playlist_name(artist_name: &str, label: &str) -> String {
    format!("{} {}", artist_name, label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeGateway;

    fn global_settings() -> SyncSettings {
        let mut settings = SyncSettings::default();
        for label in ["less", "lessMedium", "moreMedium", "more"] {
            settings
                .global_playlists
                .insert(label.to_string(), format!("p-{}", label));
        }
        settings
    }

    fn with_global_playlists(gateway: FakeGateway) -> FakeGateway {
        gateway
            .with_playlist("p-less", "Less", &[])
            .with_playlist("p-lessMedium", "Less medium", &[])
            .with_playlist("p-moreMedium", "More medium", &["spotify:track:old"])
            .with_playlist("p-more", "More", &[])
    }

    #[tokio::test]
    async fn test_resolve_global_returns_scheme_order() {
        let gateway = with_global_playlists(FakeGateway::new("owner"));
        let resolver = PlaylistResolver::new(Arc::new(global_settings()));

        let buckets = resolver.resolve_global(&gateway).await.unwrap();

        let labels: Vec<_> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["less", "lessMedium", "moreMedium", "more"]);
        assert_eq!(buckets[2].playlist.track_count, 1);
    }

    #[tokio::test]
    async fn test_resolve_global_missing_playlist() {
        let gateway = FakeGateway::new("owner")
            .with_playlist("p-less", "Less", &[])
            .with_playlist("p-lessMedium", "Less medium", &[])
            .with_playlist("p-more", "More", &[]);
        let resolver = PlaylistResolver::new(Arc::new(global_settings()));

        let err = resolver.resolve_global(&gateway).await.unwrap_err();
        assert!(matches!(err, AppError::PlaylistNotFound(id) if id == "p-moreMedium"));
    }

    #[tokio::test]
    async fn test_resolve_single_global_bucket() {
        let gateway = FakeGateway::new("owner").with_playlist("p-more", "More", &[]);
        let resolver = PlaylistResolver::new(Arc::new(global_settings()));

        let bucket = resolver.resolve_global_bucket(&gateway, "more").await.unwrap();
        assert_eq!(bucket.playlist.id, "p-more");
        assert_eq!(bucket.range, PopularityRange::new(81, 100).unwrap());

        let err = resolver.resolve_global_bucket(&gateway, "loudest").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = resolver.resolve_global_bucket(&gateway, "less").await.unwrap_err();
        assert!(matches!(err, AppError::PlaylistNotFound(id) if id == "p-less"));
    }

    #[tokio::test]
    async fn test_resolve_artist_reuses_complete_set() {
        let gateway = FakeGateway::new("owner")
            .with_artist("x", "X")
            .with_playlist("l", "X less", &[])
            .with_playlist("m", "X medium", &[])
            .with_playlist("h", "X more", &[]);
        let resolver = PlaylistResolver::new(Arc::new(SyncSettings::default()));

        let (name, buckets) = resolver.resolve_artist(&gateway, "owner", "x").await.unwrap();

        assert_eq!(name, "X");
        let ids: Vec<_> = buckets.iter().map(|b| b.playlist.id.as_str()).collect();
        assert_eq!(ids, vec!["l", "m", "h"]);
        assert!(gateway.created().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_artist_recreates_all_when_one_is_missing() {
        let gateway = FakeGateway::new("owner")
            .with_artist("x", "X")
            .with_playlist("l", "X less", &[])
            .with_playlist("h", "X more", &[]);
        let resolver = PlaylistResolver::new(Arc::new(SyncSettings::default()));

        let (_, buckets) = resolver.resolve_artist(&gateway, "owner", "x").await.unwrap();

        assert_eq!(gateway.created(), vec!["X less", "X medium", "X more"]);
        assert!(buckets.iter().all(|b| b.playlist.id.starts_with("created-")));
    }

    #[tokio::test]
    async fn test_resolve_artist_reuse_existing_policy() {
        let gateway = FakeGateway::new("owner")
            .with_artist("x", "X")
            .with_playlist("l", "X less", &[])
            .with_playlist("h", "X more", &[]);
        let settings = SyncSettings {
            artist_playlist_policy: ArtistPlaylistPolicy::ReuseExisting,
            ..SyncSettings::default()
        };
        let resolver = PlaylistResolver::new(Arc::new(settings));

        let (_, buckets) = resolver.resolve_artist(&gateway, "owner", "x").await.unwrap();

        assert_eq!(gateway.created(), vec!["X medium"]);
        assert_eq!(buckets[0].playlist.id, "l");
        assert_eq!(buckets[2].playlist.id, "h");
    }

    #[tokio::test]
    async fn test_resolve_named_finds_or_creates() {
        let gateway = FakeGateway::new("owner").with_playlist("minor", "MinorSongs", &[]);
        let resolver = PlaylistResolver::new(Arc::new(SyncSettings::default()));

        let found = resolver.resolve_named(&gateway, "owner", "MinorSongs").await.unwrap();
        assert_eq!(found.id, "minor");

        let created = resolver.resolve_named(&gateway, "owner", "Other").await.unwrap();
        assert!(created.id.starts_with("created-"));
        assert_eq!(gateway.created(), vec!["Other"]);
    }
}
