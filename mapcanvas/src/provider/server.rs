//! Tile-server descriptor.

use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::coord::MAX_ZOOM;
use crate::provider::template::UrlTemplate;
use crate::provider::types::{ImageType, ProtocolError};

/// OpenStreetMap standard tile layer.
pub const OPENSTREETMAP_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// A validated tile-server configuration.
///
/// The URL template doubles as the cache session, so tiles fetched from
/// different servers never share cache entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileServer {
    name: String,
    url: UrlTemplate,
    min_zoom: u8,
    max_zoom: u8,
    parallelism: usize,
    image_type: ImageType,
}

impl TileServer {
    /// Creates a tile-server descriptor.
    ///
    /// # Arguments
    ///
    /// * `name` - Display name of the layer
    /// * `url` - URL template with `{z}`, `{x}` and `{y}` placeholders
    /// * `min_zoom` / `max_zoom` - Zoom levels the server can render
    /// * `parallelism` - Maximum simultaneous downloads
    /// * `image_type` - Encoding of served tiles
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` for a malformed template, an inverted or
    /// unsupported zoom range, or zero parallelism.
    pub fn new(
        name: impl Into<String>,
        url: &str,
        min_zoom: u8,
        max_zoom: u8,
        parallelism: usize,
        image_type: ImageType,
    ) -> Result<Self, ProtocolError> {
        let url = UrlTemplate::parse(url)?;

        if min_zoom > max_zoom {
            return Err(ProtocolError::InvalidZoomRange {
                min: min_zoom,
                max: max_zoom,
            });
        }
        if max_zoom > MAX_ZOOM {
            return Err(ProtocolError::UnsupportedZoom(max_zoom));
        }
        if parallelism == 0 {
            return Err(ProtocolError::ZeroParallelism);
        }

        Ok(Self {
            name: name.into(),
            url,
            min_zoom,
            max_zoom,
            parallelism,
            image_type,
        })
    }

    /// The OpenStreetMap standard layer (zoom 0-19, two connections).
    pub fn openstreetmap() -> Self {
        Self {
            name: "OpenStreetMap".to_string(),
            url: UrlTemplate::parse(OPENSTREETMAP_URL)
                .unwrap_or_else(|_| unreachable!("built-in template is valid")),
            min_zoom: 0,
            max_zoom: 19,
            parallelism: 2,
            image_type: ImageType::Png,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &UrlTemplate {
        &self.url
    }

    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    /// Zoom levels served, inclusive.
    pub fn zoom_range(&self) -> RangeInclusive<u8> {
        self.min_zoom..=self.max_zoom
    }

    /// Checks if this server supports the given zoom level.
    pub fn supports_zoom(&self, zoom: u8) -> bool {
        zoom >= self.min_zoom && zoom <= self.max_zoom
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    /// Cache session identifier for this server.
    pub fn session(&self) -> Arc<str> {
        Arc::from(self.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_server() {
        let server =
            TileServer::new("Test", "http://t/{z}/{x}/{y}.png", 2, 18, 4, ImageType::Png).unwrap();
        assert_eq!(server.name(), "Test");
        assert_eq!(server.parallelism(), 4);
        assert_eq!(server.zoom_range(), 2..=18);
        assert!(server.supports_zoom(2));
        assert!(server.supports_zoom(18));
        assert!(!server.supports_zoom(1));
        assert!(!server.supports_zoom(19));
        assert_eq!(&*server.session(), "http://t/{z}/{x}/{y}.png");
    }

    #[test]
    fn test_rejects_bad_template() {
        let result = TileServer::new("Test", "http://t/{z}/{x}.png", 0, 18, 2, ImageType::Png);
        assert_eq!(result, Err(ProtocolError::MissingPlaceholder("{y}")));
    }

    #[test]
    fn test_rejects_inverted_zoom_range() {
        let result = TileServer::new("Test", "http://t/{z}/{x}/{y}", 10, 5, 2, ImageType::Png);
        assert_eq!(
            result,
            Err(ProtocolError::InvalidZoomRange { min: 10, max: 5 })
        );
    }

    #[test]
    fn test_rejects_unaddressable_zoom() {
        let result = TileServer::new("Test", "http://t/{z}/{x}/{y}", 0, 31, 2, ImageType::Png);
        assert_eq!(result, Err(ProtocolError::UnsupportedZoom(31)));
    }

    #[test]
    fn test_rejects_zero_parallelism() {
        let result = TileServer::new("Test", "http://t/{z}/{x}/{y}", 0, 18, 0, ImageType::Png);
        assert_eq!(result, Err(ProtocolError::ZeroParallelism));
    }

    #[test]
    fn test_openstreetmap_preset() {
        let server = TileServer::openstreetmap();
        assert_eq!(server.url().as_str(), OPENSTREETMAP_URL);
        assert_eq!(server.max_zoom(), 19);
        assert_eq!(server.parallelism(), 2);
    }

    #[test]
    fn test_distinct_servers_have_distinct_sessions() {
        let a = TileServer::new("A", "http://a/{z}/{x}/{y}", 0, 18, 1, ImageType::Png).unwrap();
        let b = TileServer::new("B", "http://b/{z}/{x}/{y}", 0, 18, 1, ImageType::Png).unwrap();
        assert_ne!(a.session(), b.session());
    }
}
