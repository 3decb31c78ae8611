//! Configuration for the reset tool
//!
//! This module provides two layers:
//! - **document**: the application's storage file, loaded, patched and saved
//! - **settings**: how this tool itself is configured (CLI flags and env vars)

pub mod document;
pub mod settings;

// Re-export commonly used types
pub use document::ConfigDocument;
pub use settings::{Command, Settings};
