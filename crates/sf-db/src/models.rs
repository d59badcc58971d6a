//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`.

use std::str::FromStr;

use sf_core::{EpisodeId, StreamId};

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

/// Parse a validated ID from a text column.
fn parse_id<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = sf_core::IdError>,
{
    let s: String = row.get(idx)?;
    s.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub id: StreamId,
    /// Count of fixed-duration segments composing the stream.
    pub number_of_chunks: u32,
    pub created_at: String,
}

impl Stream {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Self::from_row_at(row, 0)
    }

    /// Read a stream whose columns start at `offset` (used by joins).
    pub(crate) fn from_row_at(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, offset)?,
            number_of_chunks: row.get(offset + 1)?,
            created_at: row.get(offset + 2)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Episode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub id: EpisodeId,
    pub stream_id: StreamId,
    pub title: String,
    pub created_at: String,
}

impl Episode {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            stream_id: parse_id(row, 1)?,
            title: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

/// An episode joined with the stream it plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeWithStream {
    pub episode: Episode,
    pub stream: Stream,
}

impl EpisodeWithStream {
    /// Expects episode columns followed by stream columns.
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            episode: Episode::from_row(row)?,
            stream: Stream::from_row_at(row, 4)?,
        })
    }
}
