//! Provider types and traits

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use image::ImageFormat;
use thiserror::Error;

/// Errors from a single tile retrieval.
///
/// These are never fatal: a failed fetch leaves the tile missing and it is
/// requested again on a later render pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Response body could not be read.
    #[error("Failed to read response: {0}")]
    Body(String),

    /// Server answered successfully with no bytes.
    #[error("Empty response from {0}")]
    EmptyBody(String),
}

/// Configuration errors in a tile-server descriptor.
///
/// These are fatal at construction time and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// URL template is empty.
    #[error("Tile URL template is empty")]
    EmptyTemplate,

    /// URL template lacks a required placeholder.
    #[error("Tile URL template is missing the {0} placeholder")]
    MissingPlaceholder(&'static str),

    /// Minimum zoom is above maximum zoom.
    #[error("Invalid zoom range: {min} > {max}")]
    InvalidZoomRange { min: u8, max: u8 },

    /// Zoom level above what tile indices can address.
    #[error("Zoom level {0} is not supported")]
    UnsupportedZoom(u8),

    /// Worker pool would be empty.
    #[error("Tile server parallelism must be at least 1")]
    ZeroParallelism,

    /// Unrecognized tile image type.
    #[error("Unknown image type '{0}' (expected png or jpeg)")]
    UnknownImageType(String),
}

/// Encoding of the tiles served by a tile server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageType {
    #[default]
    Png,
    Jpeg,
}

impl ImageType {
    /// Image crate format used to decode tiles.
    pub fn format(&self) -> ImageFormat {
        match self {
            ImageType::Png => ImageFormat::Png,
            ImageType::Jpeg => ImageFormat::Jpeg,
        }
    }

    /// Canonical configuration name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::Png => "png",
            ImageType::Jpeg => "jpeg",
        }
    }
}

impl FromStr for ImageType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" => Ok(ImageType::Png),
            "jpg" | "jpeg" => Ok(ImageType::Jpeg),
            other => Err(ProtocolError::UnknownImageType(other.to_string())),
        }
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bytes and caching metadata returned by a tile fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchedTile {
    /// Response body.
    pub data: Vec<u8>,
    /// Absolute expiry advertised by the server, in seconds since epoch.
    pub expires: Option<i64>,
}

impl FetchedTile {
    pub fn new(data: Vec<u8>, expires: Option<i64>) -> Self {
        Self { data, expires }
    }
}

/// The network primitive used by fetch workers.
///
/// Implementations perform one retrieval per call. They should not retry;
/// the download coordinator re-requests missing tiles on later renders.
pub trait TileFetcher: Send + Sync + 'static {
    /// Retrieves the resource at `url`.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedTile, FetchError>> + Send;
}
