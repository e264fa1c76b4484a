//! HTTP transport for the cover type dispatcher

pub mod api;
pub mod config;
