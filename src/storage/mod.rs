//! Storage Layer
//!
//! Handles the JSON config file. Sessions live in memory only.

pub mod config;

pub use config::*;
