//! Tile layer assembly.
//!
//! This module provides [`TileLayer`], which owns the cache, download
//! coordinator and compositor of one tile server, and [`LayerConfig`], which
//! describes how to build one.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           TileLayer                              │
//! │                                                                  │
//! │  LayerConfig ──► TileStore (disk / memory) ──► TileCache         │
//! │                                                   │              │
//! │              TileServer + TileFetcher ──► DownloadCoordinator    │
//! │                                                   │              │
//! │              zoom range + tile size ──► ViewportCompositor       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::TileLayer;
pub use config::{CacheLocation, LayerConfig, DEFAULT_MEMORY_STORE_BYTES};
pub use error::AppError;
