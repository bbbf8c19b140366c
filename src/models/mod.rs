pub mod popularity;
pub mod report;
pub mod track;

pub use popularity::{PartitionScheme, PopularityRange};
pub use report::{BucketOutcome, BucketResult, SyncReport, SyncScope};
pub use track::{Artist, ArtistSummary, CachedLibrary, LibraryInfo, LibraryPage, Playlist, Track};
