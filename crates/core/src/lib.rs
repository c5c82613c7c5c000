pub mod cache;
pub mod config;
pub mod feed;
pub mod fetcher;
pub mod metrics;
pub mod photo;
pub mod registry;
pub mod store;
pub mod testing;

pub use cache::{cache_key, ByteCache, CacheError, DiskImageCache, HttpImageSource, ImageSource};
pub use config::{
    load_config, load_config_from_str, validate_config, CacheConfig, Config, ConfigError,
    SanitizedConfig, ServerConfig, UnsplashConfig,
};
pub use feed::{
    CachingMode, FeedConfig, FeedError, FeedErrorEvent, FeedState, FeedStatus, PageCursor,
    PageOutcome, PhotoFeed, SearchDebouncer,
};
pub use fetcher::{FetchError, PageRequest, PhotoFetcher, UnsplashClient};
pub use photo::{LoadingStatus, Photo, PhotoPage, PhotoUrls};
pub use registry::{StartOutcome, TaskRegistry};
pub use store::{PhotoStore, StoreUpdate};
