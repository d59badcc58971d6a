//! HTTP middleware.

pub mod request_id;
pub mod sprite_files;
