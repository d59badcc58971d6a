//! Stream CRUD operations.

use chrono::Utc;
use rusqlite::Connection;
use sf_core::{Error, Result, StreamId};

use crate::models::Stream;

const COLS: &str = "id, number_of_chunks, created_at";

/// Create a new stream record.
pub fn create_stream(conn: &Connection, id: &StreamId, number_of_chunks: u32) -> Result<Stream> {
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO streams (id, number_of_chunks, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![id.as_str(), number_of_chunks, now],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Stream {
        id: id.clone(),
        number_of_chunks,
        created_at: now,
    })
}

/// List all streams ordered by ID.
pub fn list_streams(conn: &Connection) -> Result<Vec<Stream>> {
    let q = format!("SELECT {COLS} FROM streams ORDER BY id");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], Stream::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;

    #[test]
    fn create_then_list_in_id_order() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let b: StreamId = "b-stream".parse().unwrap();
        let a: StreamId = "a-stream".parse().unwrap();
        create_stream(&conn, &b, 3).unwrap();
        let created = create_stream(&conn, &a, 10).unwrap();

        let all = list_streams(&conn).unwrap();
        let ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["a-stream", "b-stream"]);
        assert_eq!(all[0], created);
        assert_eq!(all[1].number_of_chunks, 3);
    }

    #[test]
    fn empty_catalogue_lists_nothing() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        assert!(list_streams(&conn).unwrap().is_empty());
    }

    #[test]
    fn duplicate_id_is_database_error() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let id = StreamId::new();
        create_stream(&conn, &id, 1).unwrap();
        let err = create_stream(&conn, &id, 1).unwrap_err();
        assert!(matches!(err, Error::Database { .. }));
    }
}
