//! Database query modules.

pub mod episodes;
pub mod streams;
