//! Shared ordered photo collection.
//!
//! The [`PhotoStore`] is the single source of truth for what is currently
//! displayed. It keeps the ordered sequence and an id → position index in
//! lockstep and publishes a snapshot after every visible change.

mod photo_store;

pub use photo_store::{PhotoStore, StoreUpdate};
