pub mod feed;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod types;
pub mod ws;

pub use routes::create_router;
pub use types::PhotoResponse;
pub use ws::{spawn_feed_bridge, WsBroadcaster, WsMessage};
