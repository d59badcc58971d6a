//! Episode operations, including the joined lookup the sprite service uses.

use chrono::Utc;
use rusqlite::Connection;
use sf_core::{EpisodeId, Error, Result, StreamId};

use crate::models::{Episode, EpisodeWithStream};

/// Create a new episode record pointing at an existing stream.
pub fn create_episode(
    conn: &Connection,
    id: &EpisodeId,
    stream_id: &StreamId,
    title: &str,
) -> Result<Episode> {
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO episodes (id, stream_id, title, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![id.as_str(), stream_id.as_str(), title, now],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Episode {
        id: id.clone(),
        stream_id: stream_id.clone(),
        title: title.to_string(),
        created_at: now,
    })
}

/// Find an episode by ID together with its stream.
///
/// Returns `None` when the episode does not exist.
pub fn find_episode_with_stream(
    conn: &Connection,
    id: &EpisodeId,
) -> Result<Option<EpisodeWithStream>> {
    let result = conn.query_row(
        "SELECT e.id, e.stream_id, e.title, e.created_at,
                s.id, s.number_of_chunks, s.created_at
         FROM episodes e
         JOIN streams s ON s.id = e.stream_id
         WHERE e.id = ?1",
        [id.as_str()],
        EpisodeWithStream::from_row,
    );
    match result {
        Ok(e) => Ok(Some(e)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use crate::queries::streams;

    fn setup() -> (
        r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>,
        StreamId,
    ) {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let stream_id: StreamId = "test-stream-id".parse().unwrap();
        streams::create_stream(&conn, &stream_id, 10).unwrap();
        (conn, stream_id)
    }

    #[test]
    fn find_with_stream() {
        let (conn, stream_id) = setup();
        let ep_id: EpisodeId = "test-episode-id".parse().unwrap();
        create_episode(&conn, &ep_id, &stream_id, "Pilot").unwrap();

        let found = find_episode_with_stream(&conn, &ep_id).unwrap().unwrap();
        assert_eq!(found.episode.id, ep_id);
        assert_eq!(found.episode.title, "Pilot");
        assert_eq!(found.stream.id, stream_id);
        assert_eq!(found.stream.number_of_chunks, 10);
    }

    #[test]
    fn find_missing_is_none() {
        let (conn, _) = setup();
        let missing: EpisodeId = "non-existent-id".parse().unwrap();
        assert!(find_episode_with_stream(&conn, &missing).unwrap().is_none());
    }

    #[test]
    fn episode_requires_existing_stream() {
        let (conn, _) = setup();
        let result = create_episode(&conn, &EpisodeId::new(), &StreamId::new(), "Orphan");
        assert!(result.is_err());
    }

    #[test]
    fn episodes_can_share_a_stream() {
        let (conn, stream_id) = setup();
        let a: EpisodeId = "ep-a".parse().unwrap();
        let b: EpisodeId = "ep-b".parse().unwrap();
        create_episode(&conn, &a, &stream_id, "A").unwrap();
        create_episode(&conn, &b, &stream_id, "B").unwrap();

        let found_a = find_episode_with_stream(&conn, &a).unwrap().unwrap();
        let found_b = find_episode_with_stream(&conn, &b).unwrap().unwrap();
        assert_eq!(found_a.stream.id, stream_id);
        assert_eq!(found_b.stream.id, stream_id);
        assert_eq!(found_b.episode.title, "B");
    }
}
