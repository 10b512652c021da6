//! BDC STAC kernel library.
//!
//! Read-only STAC catalog over the Brazil Data Cube PostgreSQL/PostGIS
//! schema. The server entry point is the `stac-server` binary.

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod stac;
pub mod state;

pub use config::Config;
pub use state::AppState;
