use std::path::Path;
use std::sync::Arc;

use photofeed_core::{Config, PhotoFeed, SanitizedConfig, SearchDebouncer};

use crate::api::WsBroadcaster;

/// Shared application state
pub struct AppState {
    config: Config,
    feed: Arc<PhotoFeed>,
    debouncer: SearchDebouncer,
    ws_broadcaster: WsBroadcaster,
}

impl AppState {
    pub fn new(
        config: Config,
        feed: Arc<PhotoFeed>,
        debouncer: SearchDebouncer,
        ws_broadcaster: WsBroadcaster,
    ) -> Self {
        Self {
            config,
            feed,
            debouncer,
            ws_broadcaster,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn feed(&self) -> &Arc<PhotoFeed> {
        &self.feed
    }

    pub fn debouncer(&self) -> &SearchDebouncer {
        &self.debouncer
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }

    /// Directory cached thumbnails are served from.
    pub fn image_dir(&self) -> &Path {
        &self.config.cache.dir
    }
}
