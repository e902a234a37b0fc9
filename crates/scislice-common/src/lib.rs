//! scislice-common — Shared types, errors, and confidence arithmetic used across all Scislice crates.

pub mod confidence;
pub mod content_type;
pub mod error;

// Re-export commonly used types
pub use content_type::ContentType;
pub use error::{Result, ScisliceError};
