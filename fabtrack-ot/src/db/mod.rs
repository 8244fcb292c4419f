//! Data access layer for the Order Tracking service
//!
//! Thin async functions over the shared SQLite pool. Row models live in
//! `fabtrack_common::db::models`; schema creation and migrations live in
//! `fabtrack_common::db::init`.

pub mod clients;
pub mod durations;
pub mod orders;
pub mod progress;
pub mod steps;
