//! Response types shared by the REST and WebSocket APIs.

use photofeed_core::Photo;
use serde::{Deserialize, Serialize};

/// A photo as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoResponse {
    #[serde(flatten)]
    pub photo: Photo,
    /// URL the cached thumbnail is served from, once loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl PhotoResponse {
    pub fn list(photos: &[Photo]) -> Vec<PhotoResponse> {
        photos.iter().cloned().map(PhotoResponse::from).collect()
    }
}

impl From<Photo> for PhotoResponse {
    fn from(photo: Photo) -> Self {
        let image_url = photo
            .cached_location
            .as_deref()
            .and_then(|path| path.file_name())
            .and_then(|name| name.to_str())
            .map(|name| format!("/images/{}", name));
        Self { photo, image_url }
    }
}
