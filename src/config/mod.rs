//! Configuration module for locate runs
//!
//! This module provides the `LocateConfig` struct and its type-safe builder
//! with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod types;

// Re-exports for public API
pub use builder::{LocateConfigBuilder, WithSourceImage, default_save_folder};
pub use types::LocateConfig;
