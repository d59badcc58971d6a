//! sf-core: shared types, IDs, errors, configuration, and sprite geometry.
//!
//! This crate is the foundational dependency for all other sf-* crates,
//! providing validated identifiers, a unified error type, application
//! configuration, and the pure sprite layout math shared by the generator
//! and the metadata endpoint.

pub mod config;
pub mod error;
pub mod ids;
pub mod sprite;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
pub use sprite::{parse_sprite_file_name, SpriteGeometry, SpriteMetadata};
