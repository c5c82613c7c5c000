//! Photo search abstraction.
//!
//! This module provides a `PhotoFetcher` trait for fetching pages of photo
//! metadata from a remote search API, plus the Unsplash implementation.

mod types;
mod unsplash;

pub use types::*;
pub use unsplash::UnsplashClient;
