//! Shared API helpers for FabTrack services

pub mod auth;
