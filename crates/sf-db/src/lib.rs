//! sf-db: database access and persistence layer.
//!
//! This crate provides SQLite-backed storage with connection pooling,
//! embedded migrations, typed models, and the catalogue queries (episodes
//! and their streams) the sprite service depends on.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
