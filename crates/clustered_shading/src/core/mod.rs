//! # Core Module
//!
//! Shared configuration for the clustering subsystem.
//!
//! ## Organization
//!
//! - **Config**: Grid dimensions, bucket and buffer bounds, worker count

pub mod config;

// Re-export commonly used config types
pub use config::{
    ClustererConfig,
    Config,
    ConfigError,
};
