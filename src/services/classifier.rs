use crate::models::{ArtistSummary, PartitionScheme, Track};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Which tracks take part in a classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackFilter {
    All,
    /// Tracks where any credited artist has this id.
    Artist(String),
    /// Tracks whose primary artist is in the set.
    PrimaryArtists(HashSet<String>),
}

impl TrackFilter {
    pub fn matches(&self, track: &Track) -> bool {
        match self {
            TrackFilter::All => true,
            TrackFilter::Artist(artist_id) => track.has_artist(artist_id),
            TrackFilter::PrimaryArtists(ids) => track
                .primary_artist()
                .map(|artist| ids.contains(&artist.id))
                .unwrap_or(false),
        }
    }
}

/// Partitions `tracks` into the buckets of `scheme`.
///
/// Every label of the scheme is present in the result, empty or not, and
/// tracks keep their library order inside a bucket. The scheme is already
/// known to cover `0..=100` exactly once, so each matching track lands in
/// exactly one bucket.
pub fn classify<'a>(
    tracks: &'a [Track],
    scheme: &PartitionScheme,
    filter: &TrackFilter,
) -> BTreeMap<String, Vec<&'a Track>> {
    let mut buckets: BTreeMap<String, Vec<&'a Track>> = scheme
        .labels()
        .map(|label| (label.to_string(), Vec::new()))
        .collect();

    for track in tracks.iter().filter(|track| filter.matches(track)) {
        if let Some(bucket) = scheme
            .label_for(track.popularity_score())
            .and_then(|label| buckets.get_mut(label))
        {
            bucket.push(track);
        }
    }

    buckets
}

/// Track counts per primary artist, most represented first.
pub fn artist_summary(tracks: &[Track]) -> Vec<ArtistSummary> {
    let mut counts: HashMap<&str, ArtistSummary> = HashMap::new();

    for artist in tracks.iter().filter_map(Track::primary_artist) {
        counts
            .entry(artist.id.as_str())
            .or_insert_with(|| ArtistSummary {
                id: artist.id.clone(),
                name: artist.name.clone(),
                track_count: 0,
            })
            .track_count += 1;
    }

    let mut summary: Vec<ArtistSummary> = counts.into_values().collect();
    summary.sort_by(|a, b| {
        b.track_count
            .cmp(&a.track_count)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    summary
}

/// Primary artists with at most `max_tracks` tracks in the library.
pub fn minor_artists(tracks: &[Track], max_tracks: usize) -> HashSet<String> {
    artist_summary(tracks)
        .into_iter()
        .filter(|artist| artist.track_count <= max_tracks)
        .map(|artist| artist.id)
        .collect()
}
