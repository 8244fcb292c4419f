//! # FabTrack Common Library
//!
//! Shared code for FabTrack services including:
//! - Database models, initialization, and migrations
//! - API authentication helpers
//! - Configuration loading and root folder resolution
//! - Common error types

pub mod api;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;

pub use error::{Error, Result};
