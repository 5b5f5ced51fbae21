//! mapcanvas - tile acquisition and compositing for raster maps
//!
//! This library renders pannable, zoomable raster maps from square image
//! tiles served by a remote tile server. Fetched tiles are persisted in a
//! local cache with expiry, and rendered pixels are reused when the view
//! shifts.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            TileLayer                              │
//! │                                                                   │
//! │  render(viewport) ──► ViewportCompositor ──► TileCache::get       │
//! │                              │                    ▲               │
//! │                              │ miss/expired       │ put           │
//! │                              ▼                    │               │
//! │                      DownloadCoordinator ──► FetchWorker × P      │
//! │                              │                                    │
//! │                              └──► TileAvailable events ──► UI     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mapcanvas::app::{LayerConfig, TileLayer};
//! use mapcanvas::coord::Viewport;
//! use mapcanvas::provider::TileServer;
//!
//! let runtime = tokio::runtime::Runtime::new()?;
//! let config = LayerConfig::new(TileServer::openstreetmap(), "/tmp/tiles");
//! let (mut layer, mut events) = TileLayer::open(config, runtime.handle().clone())?;
//!
//! let report = layer.render(Viewport::new(0, 0, 3, 800, 600));
//! // ... render again when `events` yields TileAvailable ...
//! layer.stop();
//! ```

pub mod app;
pub mod cache;
pub mod config;
pub mod coord;
pub mod download;
pub mod logging;
pub mod provider;
pub mod render;
pub mod time;
