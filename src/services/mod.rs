pub mod cache_reset;
pub mod cache_store;
pub mod classifier;
pub mod gateway;
pub mod library_cache;
pub mod resolver;
pub mod spotify;
pub mod synchronizer;

pub use cache_reset::spawn_cache_reset;
pub use cache_store::{CacheStore, RedisCacheStore};
pub use gateway::{GatewayProvider, Session};
pub use library_cache::LibraryCache;
pub use spotify::SpotifyGatewayProvider;
pub use synchronizer::PlaylistSynchronizer;
