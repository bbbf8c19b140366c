use crate::models::PartitionScheme;
use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Hard per-request item limit of the remote playlist API.
pub const MAX_INSERT_BATCH_SIZE: usize = 100;

/// How destination playlists are prepared before tracks are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearMode {
    /// Fail the sync if any destination already holds tracks.
    RequireEmpty,
    /// Remove every existing item before writing.
    AutoClear,
}

impl FromStr for ClearMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "require_empty" => Ok(ClearMode::RequireEmpty),
            "auto_clear" => Ok(ClearMode::AutoClear),
            other => Err(anyhow::anyhow!(
                "unknown clear mode `{}` (expected require_empty or auto_clear)",
                other
            )),
        }
    }
}

/// What to do when only some of an artist's playlists already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtistPlaylistPolicy {
    RecreateAll,
    ReuseExisting,
}

impl FromStr for ArtistPlaylistPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recreate_all" => Ok(ArtistPlaylistPolicy::RecreateAll),
            "reuse_existing" => Ok(ArtistPlaylistPolicy::ReuseExisting),
            other => Err(anyhow::anyhow!(
                "unknown artist playlist policy `{}` (expected recreate_all or reuse_existing)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub global_scheme: PartitionScheme,
    pub artist_scheme: PartitionScheme,
    /// Bucket label -> fixed playlist id for the global scope.
    pub global_playlists: BTreeMap<String, String>,
    pub cache_ttl: Duration,
    pub batch_size: usize,
    pub global_clear_mode: ClearMode,
    /// Also applies to the minor-artists scope.
    pub artist_clear_mode: ClearMode,
    pub artist_playlist_policy: ArtistPlaylistPolicy,
    pub minor_playlist_name: String,
    pub minor_artist_max_tracks: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            global_scheme: PartitionScheme::global_default(),
            artist_scheme: PartitionScheme::artist_default(),
            global_playlists: BTreeMap::new(),
            cache_ttl: Duration::from_secs(3600),
            batch_size: MAX_INSERT_BATCH_SIZE,
            global_clear_mode: ClearMode::RequireEmpty,
            artist_clear_mode: ClearMode::AutoClear,
            artist_playlist_policy: ArtistPlaylistPolicy::RecreateAll,
            minor_playlist_name: "MinorSongs".to_string(),
            minor_artist_max_tracks: 5,
        }
    }
}

impl SyncSettings {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.batch_size == 0 || self.batch_size > MAX_INSERT_BATCH_SIZE {
            return Err(anyhow::anyhow!(
                "INSERT_BATCH_SIZE must be between 1 and {}, got {}",
                MAX_INSERT_BATCH_SIZE,
                self.batch_size
            ));
        }

        for label in self.global_scheme.labels() {
            match self.global_playlists.get(label) {
                Some(id) if !id.trim().is_empty() => {}
                _ => {
                    return Err(anyhow::anyhow!(
                        "{} must be set for global bucket `{}`",
                        playlist_env_key(label),
                        label
                    ))
                }
            }
        }

        if self.minor_playlist_name.trim().is_empty() {
            return Err(anyhow::anyhow!("MINOR_PLAYLIST_NAME cannot be empty"));
        }

        Ok(())
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, anyhow::Error> {
        let defaults = SyncSettings::default();

        let global_scheme = match lookup("GLOBAL_POPULARITY_RANGES") {
            Some(raw) => raw
                .parse::<PartitionScheme>()
                .map_err(|e| anyhow::anyhow!("GLOBAL_POPULARITY_RANGES: {}", e))?,
            None => defaults.global_scheme,
        };
        let artist_scheme = match lookup("ARTIST_POPULARITY_RANGES") {
            Some(raw) => raw
                .parse::<PartitionScheme>()
                .map_err(|e| anyhow::anyhow!("ARTIST_POPULARITY_RANGES: {}", e))?,
            None => defaults.artist_scheme,
        };

        let global_playlists = global_scheme
            .labels()
            .filter_map(|label| lookup(&playlist_env_key(label)).map(|id| (label.to_string(), id)))
            .collect();

        let settings = SyncSettings {
            global_scheme,
            artist_scheme,
            global_playlists,
            cache_ttl: Duration::from_secs(parse_or(lookup, "CACHE_TTL_SECS", 3600)?),
            batch_size: parse_or(lookup, "INSERT_BATCH_SIZE", MAX_INSERT_BATCH_SIZE)?,
            global_clear_mode: parse_or(lookup, "GLOBAL_CLEAR_MODE", defaults.global_clear_mode)?,
            artist_clear_mode: parse_or(lookup, "ARTIST_CLEAR_MODE", defaults.artist_clear_mode)?,
            artist_playlist_policy: parse_or(
                lookup,
                "ARTIST_PLAYLIST_POLICY",
                defaults.artist_playlist_policy,
            )?,
            minor_playlist_name: lookup("MINOR_PLAYLIST_NAME").unwrap_or(defaults.minor_playlist_name),
            minor_artist_max_tracks: parse_or(
                lookup,
                "MINOR_ARTIST_MAX_TRACKS",
                defaults.minor_artist_max_tracks,
            )?,
        };

        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub spotify_api_url: String,
    pub server_host: String,
    pub server_port: u16,
    /// Allowed CORS origins (comma-separated). Use "*" for any origin (development only).
    pub cors_origins: Vec<String>,
    pub gateway_timeout: Duration,
    /// Zero disables the periodic cache flush.
    pub cache_flush_interval: Duration,
    pub sync: SyncSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(&|key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, anyhow::Error> {
        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".to_string()),
            spotify_api_url: lookup("SPOTIFY_API_URL")
                .unwrap_or_else(|| "https://api.spotify.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: parse_or(lookup, "SERVER_PORT", 8000)?,
            cors_origins,
            gateway_timeout: Duration::from_secs(parse_or(lookup, "GATEWAY_TIMEOUT_SECS", 200)?),
            cache_flush_interval: Duration::from_secs(parse_or(
                lookup,
                "CACHE_FLUSH_INTERVAL_SECS",
                300,
            )?),
            sync: SyncSettings::from_lookup(lookup)?,
        })
    }
}

/// `lessMedium` -> `PLAYLIST_ID_LESS_MEDIUM`.
pub fn playlist_env_key(label: &str) -> String {
    let mut key = String::from("PLAYLIST_ID_");
    let mut prev_lower = false;
    for ch in label.chars() {
        if ch == '-' || ch == ' ' || ch == '_' {
            key.push('_');
            prev_lower = false;
            continue;
        }
        if ch.is_ascii_uppercase() && prev_lower {
            key.push('_');
        }
        prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        key.push(ch.to_ascii_uppercase());
    }
    key
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, anyhow::Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value `{}`: {}", key, raw, e)),
        None => Ok(default),
    }
}
