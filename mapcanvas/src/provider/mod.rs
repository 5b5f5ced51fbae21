//! Tile-server description and network retrieval.
//!
//! A [`TileServer`] names a URL template, the zoom range it serves, how many
//! downloads may run against it at once, and the image encoding of its tiles.
//! A [`TileFetcher`] performs the actual retrieval; [`ReqwestFetcher`] is the
//! HTTP implementation.
//!
//! ```
//! use mapcanvas::coord::TileRequest;
//! use mapcanvas::provider::TileServer;
//!
//! let server = TileServer::openstreetmap();
//! let url = server.url().expand(&TileRequest::new(3, 4, 2));
//! assert_eq!(url, "https://tile.openstreetmap.org/3/4/2.png");
//! ```

mod http;
mod server;
mod template;
mod types;

pub use http::{parse_expiry, ReqwestFetcher, DEFAULT_TIMEOUT_SECS, USER_AGENT};
pub use server::{TileServer, OPENSTREETMAP_URL};
pub use template::{UrlTemplate, X_PLACEHOLDER, Y_PLACEHOLDER, ZOOM_PLACEHOLDER};
pub use types::{FetchError, FetchedTile, ImageType, ProtocolError, TileFetcher};

#[cfg(test)]
pub use http::tests::MockFetcher;
