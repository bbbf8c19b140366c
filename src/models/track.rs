use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub uri: String,
    /// Upstream may omit the score; see [`Track::popularity_score`].
    pub popularity: Option<u8>,
    pub artists: Vec<Artist>,
}

impl Track {
    /// Popularity used for bucketing. Missing scores count as 0.
    pub fn popularity_score(&self) -> u8 {
        self.popularity.unwrap_or(0)
    }

    pub fn has_artist(&self, artist_id: &str) -> bool {
        self.artists.iter().any(|artist| artist.id == artist_id)
    }

    pub fn primary_artist(&self) -> Option<&Artist> {
        self.artists.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub track_count: u32,
}

/// One page of the saved-tracks listing.
#[derive(Debug, Clone, Default)]
pub struct LibraryPage {
    pub tracks: Vec<Track>,
    pub next_page_token: Option<String>,
}

/// A user's full library as stored in the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedLibrary {
    pub owner_id: String,
    pub tracks: Vec<Track>,
    pub fetched_at: DateTime<Utc>,
    pub ttl_secs: u64,
}

impl CachedLibrary {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let ttl = Duration::seconds(i64::try_from(self.ttl_secs).unwrap_or(i64::MAX));
        match self.fetched_at.checked_add_signed(ttl) {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
    pub track_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryInfo {
    pub owner_id: String,
    pub track_count: usize,
    pub fetched_at: DateTime<Utc>,
    pub ttl_secs: u64,
}

impl From<&CachedLibrary> for LibraryInfo {
    fn from(library: &CachedLibrary) -> Self {
        LibraryInfo {
            owner_id: library.owner_id.clone(),
            track_count: library.tracks.len(),
            fetched_at: library.fetched_at,
            ttl_secs: library.ttl_secs,
        }
    }
}
