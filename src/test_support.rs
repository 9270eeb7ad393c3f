//! Fixtures shared by the unit tests.

use crate::error::Result;
use crate::model::{ArtistId, Listen, NewArtist, TagAssignment, UserId};
use crate::store::{GraphStore, GraphWrite, SqliteGraphStore};

/// Upsert a listen, creating the user and a placeholder artist as needed.
pub fn listen<W: GraphWrite + ?Sized>(
    tx: &W,
    user_id: UserId,
    artist_id: ArtistId,
    weight: i64,
) -> Result<()> {
    tx.insert_user(user_id)?;
    ensure_artist(tx, artist_id)?;
    tx.upsert_listen(&Listen { user_id, artist_id, weight })?;
    Ok(())
}

/// Tag `artist_id` with `value` (reusing a tag with the same value).
pub fn tag<W: GraphWrite + ?Sized>(
    tx: &W,
    user_id: UserId,
    artist_id: ArtistId,
    value: &str,
    timestamp: i64,
) -> Result<()> {
    tx.insert_user(user_id)?;
    ensure_artist(tx, artist_id)?;
    let tag = match tx.tags_by_value(value)?.into_iter().next() {
        Some(tag) => tag,
        None => tx.insert_tag(value)?,
    };
    tx.insert_tag_assignment(&TagAssignment::new(user_id, artist_id, tag.tag_id, timestamp))?;
    Ok(())
}

fn ensure_artist<W: GraphWrite + ?Sized>(tx: &W, artist_id: ArtistId) -> Result<()> {
    if !tx.artist_exists(artist_id)? {
        tx.insert_artist(&NewArtist {
            id: Some(artist_id),
            ..NewArtist::named(format!("artist {artist_id}"))
        })?;
    }
    Ok(())
}

/// Users 1..=3 and artists A=1, B=2, C=3 with listens
/// (1,A,10) (1,B,5) (2,A,8) (2,C,3) (3,B,7).
pub fn scenario() -> SqliteGraphStore {
    let store = SqliteGraphStore::open_in_memory().expect("in-memory store");
    store
        .write(|tx| {
            listen(tx, 1, 1, 10)?;
            listen(tx, 1, 2, 5)?;
            listen(tx, 2, 1, 8)?;
            listen(tx, 2, 3, 3)?;
            listen(tx, 3, 2, 7)?;
            Ok(())
        })
        .expect("seed scenario");
    store
}
