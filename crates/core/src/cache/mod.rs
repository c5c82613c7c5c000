//! Content-addressed on-disk image cache.
//!
//! Images are stored under the lowercase hex SHA-256 of their source URL, so
//! repeated requests for the same URL resolve to the same file without a
//! second download.

mod disk;
mod http;
mod types;

pub use disk::DiskImageCache;
pub use http::HttpImageSource;
pub use types::*;
