//! # Fibertrack Common Library
//!
//! Shared code for the fibertrack crates:
//! - Fault record models and the SQLite schema
//! - The record store seam used by ingest and the HTTP API
//! - Configuration loading and root folder resolution
//! - Turkish-aware text helpers

pub mod config;
pub mod db;
pub mod error;
pub mod store;
pub mod text;

pub use error::{Error, Result};
