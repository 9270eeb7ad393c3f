//! SQLite-backed [`GraphStore`].
//!
//! One connection behind a mutex. Reads run in a deferred transaction and
//! writes in an immediate one, so a closure always sees a single snapshot and
//! a failed write leaves nothing behind. Foreign keys are enforced but carry no
//! `ON DELETE CASCADE`: dependents are removed explicitly by the delete
//! primitives, inside the caller's transaction.

use super::{GraphRead, GraphStore, GraphWrite};
use crate::error::{GraphError, Result};
use crate::model::{
    Artist, ArtistId, ArtistUpdate, CalendarDate, Friendship, Listen, NewArtist, Table, Tag,
    TagAssignment, TagAssignmentFilter, TagId, User, UserId,
};
use log::{debug, info, trace};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        user_id     INTEGER PRIMARY KEY
    );

    CREATE TABLE IF NOT EXISTS artists (
        id          INTEGER PRIMARY KEY,
        name        TEXT    NOT NULL,
        url         TEXT,
        picture_url TEXT
    );

    CREATE TABLE IF NOT EXISTS tags (
        tag_id      INTEGER PRIMARY KEY,
        tag_value   TEXT    NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_tags_value ON tags (lower(tag_value));

    CREATE TABLE IF NOT EXISTS user_artists (
        user_id     INTEGER NOT NULL REFERENCES users (user_id),
        artist_id   INTEGER NOT NULL REFERENCES artists (id),
        weight      INTEGER NOT NULL CHECK (weight >= 0),
        PRIMARY KEY (user_id, artist_id)
    );
    CREATE INDEX IF NOT EXISTS idx_user_artists_artist ON user_artists (artist_id);

    CREATE TABLE IF NOT EXISTS user_tagged_artists (
        user_id     INTEGER NOT NULL REFERENCES users (user_id),
        artist_id   INTEGER NOT NULL REFERENCES artists (id),
        tag_id      INTEGER NOT NULL REFERENCES tags (tag_id),
        timestamp   INTEGER NOT NULL,
        day         INTEGER,
        month       INTEGER,
        year        INTEGER,
        PRIMARY KEY (user_id, artist_id, tag_id, timestamp)
    );
    CREATE INDEX IF NOT EXISTS idx_tagged_artist ON user_tagged_artists (artist_id);
    CREATE INDEX IF NOT EXISTS idx_tagged_tag ON user_tagged_artists (tag_id);

    CREATE TABLE IF NOT EXISTS user_friends (
        user_id     INTEGER NOT NULL REFERENCES users (user_id),
        friend_id   INTEGER NOT NULL REFERENCES users (user_id),
        PRIMARY KEY (user_id, friend_id),
        CHECK (user_id <> friend_id)
    );
    CREATE INDEX IF NOT EXISTS idx_user_friends_friend ON user_friends (friend_id);
";

const LISTEN_COLUMNS: &str = "SELECT user_id, artist_id, weight FROM user_artists";
const TAGGED_COLUMNS: &str =
    "SELECT user_id, artist_id, tag_id, timestamp, day, month, year FROM user_tagged_artists";

/// SQLite implementation of the Graph Store.
#[derive(Debug)]
pub struct SqliteGraphStore {
    conn: Mutex<Connection>,
}

impl SqliteGraphStore {
    /// Open (or create) a database file and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        trace!("journal_mode = {mode}");
        info!("Opened graph store at {}", path.display());
        Self::with_connection(conn)
    }

    /// Private in-memory database, used by tests and benchmarks.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        debug!("Graph store schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| GraphError::LockPoisoned)
    }
}

impl GraphStore for SqliteGraphStore {
    fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn GraphRead) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let out = f(&SqliteView { conn: &tx })?;
        tx.commit()?;
        Ok(out)
    }

    fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn GraphWrite) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // Dropping `tx` on the error path rolls the whole scope back.
        let out = f(&SqliteView { conn: &tx })?;
        tx.commit()?;
        Ok(out)
    }
}

/// A transaction-scoped view. Only ever handed out through `read`/`write`.
struct SqliteView<'a> {
    conn: &'a Connection,
}

impl SqliteView<'_> {
    fn exists(&self, sql: &str, id: i64) -> Result<bool> {
        let found = self
            .conn
            .prepare_cached(sql)?
            .query_row([id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn listens_query(&self, sql: &str, args: &[i64]) -> Result<Vec<Listen>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), listen_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn page(skip: usize, limit: usize) -> (i64, i64) {
    (
        i64::try_from(limit).unwrap_or(i64::MAX),
        i64::try_from(skip).unwrap_or(i64::MAX),
    )
}

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'`.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn artist_from_row(row: &Row<'_>) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        picture_url: row.get(3)?,
    })
}

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        tag_id: row.get(0)?,
        tag_value: row.get(1)?,
    })
}

fn listen_from_row(row: &Row<'_>) -> rusqlite::Result<Listen> {
    Ok(Listen {
        user_id: row.get(0)?,
        artist_id: row.get(1)?,
        weight: row.get(2)?,
    })
}

fn tagged_from_row(row: &Row<'_>) -> rusqlite::Result<TagAssignment> {
    let day: Option<u8> = row.get(4)?;
    let month: Option<u8> = row.get(5)?;
    let year: Option<i32> = row.get(6)?;
    let date = match (day, month, year) {
        (Some(day), Some(month), Some(year)) => Some(CalendarDate { day, month, year }),
        _ => None,
    };
    Ok(TagAssignment {
        user_id: row.get(0)?,
        artist_id: row.get(1)?,
        tag_id: row.get(2)?,
        timestamp: row.get(3)?,
        date,
    })
}

fn friendship_from_row(row: &Row<'_>) -> rusqlite::Result<Friendship> {
    Ok(Friendship {
        user_id: row.get(0)?,
        friend_id: row.get(1)?,
    })
}

impl GraphRead for SqliteView<'_> {
    fn user_exists(&self, user_id: UserId) -> Result<bool> {
        self.exists("SELECT 1 FROM users WHERE user_id = ?1", user_id)
    }

    fn artist_exists(&self, artist_id: ArtistId) -> Result<bool> {
        self.exists("SELECT 1 FROM artists WHERE id = ?1", artist_id)
    }

    fn tag_exists(&self, tag_id: TagId) -> Result<bool> {
        self.exists("SELECT 1 FROM tags WHERE tag_id = ?1", tag_id)
    }

    fn users(&self, skip: usize, limit: usize) -> Result<Vec<User>> {
        let (limit, offset) = page(skip, limit);
        let mut stmt = self
            .conn
            .prepare_cached("SELECT user_id FROM users ORDER BY user_id LIMIT ?1 OFFSET ?2")?;
        let rows = stmt.query_map([limit, offset], |row| Ok(User { user_id: row.get(0)? }))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn artist(&self, artist_id: ArtistId) -> Result<Option<Artist>> {
        Ok(self
            .conn
            .prepare_cached("SELECT id, name, url, picture_url FROM artists WHERE id = ?1")?
            .query_row([artist_id], artist_from_row)
            .optional()?)
    }

    fn artist_by_name(&self, name: &str) -> Result<Option<Artist>> {
        Ok(self
            .conn
            .prepare_cached(
                "SELECT id, name, url, picture_url FROM artists
                 WHERE lower(name) = lower(?1) ORDER BY id LIMIT 1",
            )?
            .query_row([name], artist_from_row)
            .optional()?)
    }

    fn artists(&self, skip: usize, limit: usize, name_filter: Option<&str>) -> Result<Vec<Artist>> {
        let (limit, offset) = page(skip, limit);
        let artists = match name_filter {
            Some(needle) => {
                let mut stmt = self.conn.prepare_cached(
                    "SELECT id, name, url, picture_url FROM artists
                     WHERE name LIKE ?1 ESCAPE '\\' ORDER BY id LIMIT ?2 OFFSET ?3",
                )?;
                let rows = stmt.query_map(params![like_pattern(needle), limit, offset], artist_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = self.conn.prepare_cached(
                    "SELECT id, name, url, picture_url FROM artists ORDER BY id LIMIT ?1 OFFSET ?2",
                )?;
                let rows = stmt.query_map([limit, offset], artist_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(artists)
    }

    fn tag(&self, tag_id: TagId) -> Result<Option<Tag>> {
        Ok(self
            .conn
            .prepare_cached("SELECT tag_id, tag_value FROM tags WHERE tag_id = ?1")?
            .query_row([tag_id], tag_from_row)
            .optional()?)
    }

    fn tags_by_value(&self, value: &str) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT tag_id, tag_value FROM tags WHERE lower(tag_value) = lower(?1) ORDER BY tag_id",
        )?;
        let rows = stmt.query_map([value], tag_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn tags(&self, skip: usize, limit: usize) -> Result<Vec<Tag>> {
        let (limit, offset) = page(skip, limit);
        let mut stmt = self
            .conn
            .prepare_cached("SELECT tag_id, tag_value FROM tags ORDER BY tag_id LIMIT ?1 OFFSET ?2")?;
        let rows = stmt.query_map([limit, offset], tag_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn listens(&self, user_id: Option<UserId>, artist_id: Option<ArtistId>) -> Result<Vec<Listen>> {
        // One statement per filter shape so SQLite can pick the right index.
        match (user_id, artist_id) {
            (Some(user), Some(artist)) => self.listens_query(
                &format!("{LISTEN_COLUMNS} WHERE user_id = ?1 AND artist_id = ?2"),
                &[user, artist],
            ),
            (Some(user), None) => self.listens_query(
                &format!("{LISTEN_COLUMNS} WHERE user_id = ?1 ORDER BY artist_id"),
                &[user],
            ),
            (None, Some(artist)) => self.listens_query(
                &format!("{LISTEN_COLUMNS} WHERE artist_id = ?1 ORDER BY user_id"),
                &[artist],
            ),
            (None, None) => {
                self.listens_query(&format!("{LISTEN_COLUMNS} ORDER BY user_id, artist_id"), &[])
            }
        }
    }

    fn co_listens(&self, user_id: UserId) -> Result<Vec<Listen>> {
        self.listens_query(
            &format!(
                "{LISTEN_COLUMNS} WHERE artist_id IN \
                 (SELECT artist_id FROM user_artists WHERE user_id = ?1) \
                 ORDER BY artist_id, user_id"
            ),
            &[user_id],
        )
    }

    fn tag_assignments(&self, filter: &TagAssignmentFilter) -> Result<Vec<TagAssignment>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<i64> = Vec::new();
        let mut push = |clause: &'static str, value: Option<i64>| {
            if let Some(value) = value {
                args.push(value);
                clauses.push(clause);
            }
        };
        push("user_id = ?", filter.user_id);
        push("artist_id = ?", filter.artist_id);
        push("tag_id = ?", filter.tag_id);
        push("timestamp >= ?", filter.since);
        push("timestamp <= ?", filter.until);

        let mut sql = TAGGED_COLUMNS.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY user_id, artist_id, tag_id, timestamp");

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), tagged_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn friendship_edges(&self, user_id: Option<UserId>) -> Result<Vec<Friendship>> {
        let edges = match user_id {
            Some(user) => {
                let mut stmt = self.conn.prepare_cached(
                    "SELECT user_id, friend_id FROM user_friends
                     WHERE user_id = ?1 OR friend_id = ?1 ORDER BY user_id, friend_id",
                )?;
                let rows = stmt.query_map([user], friendship_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = self.conn.prepare_cached(
                    "SELECT user_id, friend_id FROM user_friends ORDER BY user_id, friend_id",
                )?;
                let rows = stmt.query_map([], friendship_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(edges)
    }

    fn friendship_exists(&self, edge: Friendship) -> Result<bool> {
        let found = self
            .conn
            .prepare_cached("SELECT 1 FROM user_friends WHERE user_id = ?1 AND friend_id = ?2")?
            .query_row([edge.user_id, edge.friend_id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn count(&self, table: Table) -> Result<u64> {
        let sql = match table {
            Table::Users => "SELECT COUNT(*) FROM users",
            Table::Artists => "SELECT COUNT(*) FROM artists",
            Table::Tags => "SELECT COUNT(*) FROM tags",
            Table::Listens => "SELECT COUNT(*) FROM user_artists",
            Table::TagAssignments => "SELECT COUNT(*) FROM user_tagged_artists",
            Table::Friendships => "SELECT COUNT(*) FROM user_friends",
        };
        let count: i64 = self.conn.prepare_cached(sql)?.query_row([], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

impl GraphWrite for SqliteView<'_> {
    fn insert_user(&self, user_id: UserId) -> Result<bool> {
        let inserted = self
            .conn
            .prepare_cached("INSERT OR IGNORE INTO users (user_id) VALUES (?1)")?
            .execute([user_id])?;
        if inserted > 0 {
            trace!("Created user {user_id}");
        }
        Ok(inserted > 0)
    }

    fn insert_artist(&self, artist: &NewArtist) -> Result<Artist> {
        let id = match artist.id {
            Some(id) => {
                if self.artist_exists(id)? {
                    return Err(GraphError::AlreadyExists(format!("artist {id}")));
                }
                self.conn
                    .prepare_cached(
                        "INSERT INTO artists (id, name, url, picture_url) VALUES (?1, ?2, ?3, ?4)",
                    )?
                    .execute(params![id, artist.name, artist.url, artist.picture_url])?;
                id
            }
            None => {
                self.conn
                    .prepare_cached("INSERT INTO artists (name, url, picture_url) VALUES (?1, ?2, ?3)")?
                    .execute(params![artist.name, artist.url, artist.picture_url])?;
                self.conn.last_insert_rowid()
            }
        };
        Ok(Artist {
            id,
            name: artist.name.clone(),
            url: artist.url.clone(),
            picture_url: artist.picture_url.clone(),
        })
    }

    fn update_artist(&self, artist_id: ArtistId, update: &ArtistUpdate) -> Result<Option<Artist>> {
        let Some(mut artist) = self.artist(artist_id)? else {
            return Ok(None);
        };
        if let Some(name) = &update.name {
            artist.name.clone_from(name);
        }
        if update.url.is_some() {
            artist.url.clone_from(&update.url);
        }
        if update.picture_url.is_some() {
            artist.picture_url.clone_from(&update.picture_url);
        }
        self.conn
            .prepare_cached("UPDATE artists SET name = ?1, url = ?2, picture_url = ?3 WHERE id = ?4")?
            .execute(params![artist.name, artist.url, artist.picture_url, artist_id])?;
        Ok(Some(artist))
    }

    fn insert_tag(&self, tag_value: &str) -> Result<Tag> {
        self.conn
            .prepare_cached("INSERT INTO tags (tag_value) VALUES (?1)")?
            .execute([tag_value])?;
        Ok(Tag {
            tag_id: self.conn.last_insert_rowid(),
            tag_value: tag_value.to_string(),
        })
    }

    fn update_tag(&self, tag_id: TagId, tag_value: &str) -> Result<Option<Tag>> {
        let updated = self
            .conn
            .prepare_cached("UPDATE tags SET tag_value = ?1 WHERE tag_id = ?2")?
            .execute(params![tag_value, tag_id])?;
        Ok((updated > 0).then(|| Tag {
            tag_id,
            tag_value: tag_value.to_string(),
        }))
    }

    fn upsert_listen(&self, listen: &Listen) -> Result<Option<i64>> {
        let previous: Option<i64> = self
            .conn
            .prepare_cached("SELECT weight FROM user_artists WHERE user_id = ?1 AND artist_id = ?2")?
            .query_row([listen.user_id, listen.artist_id], |row| row.get(0))
            .optional()?;
        self.conn
            .prepare_cached(
                "INSERT INTO user_artists (user_id, artist_id, weight) VALUES (?1, ?2, ?3)
                 ON CONFLICT (user_id, artist_id) DO UPDATE SET weight = excluded.weight",
            )?
            .execute([listen.user_id, listen.artist_id, listen.weight])?;
        Ok(previous)
    }

    fn delete_listen(&self, user_id: UserId, artist_id: ArtistId) -> Result<bool> {
        let deleted = self
            .conn
            .prepare_cached("DELETE FROM user_artists WHERE user_id = ?1 AND artist_id = ?2")?
            .execute([user_id, artist_id])?;
        Ok(deleted > 0)
    }

    fn insert_tag_assignment(&self, assignment: &TagAssignment) -> Result<bool> {
        let date = assignment.date;
        let inserted = self
            .conn
            .prepare_cached(
                "INSERT OR IGNORE INTO user_tagged_artists
                 (user_id, artist_id, tag_id, timestamp, day, month, year)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?
            .execute(params![
                assignment.user_id,
                assignment.artist_id,
                assignment.tag_id,
                assignment.timestamp,
                date.map(|d| d.day),
                date.map(|d| d.month),
                date.map(|d| d.year),
            ])?;
        Ok(inserted > 0)
    }

    fn delete_tag_assignment(
        &self,
        user_id: UserId,
        artist_id: ArtistId,
        tag_id: TagId,
        timestamp: i64,
    ) -> Result<bool> {
        let deleted = self
            .conn
            .prepare_cached(
                "DELETE FROM user_tagged_artists
                 WHERE user_id = ?1 AND artist_id = ?2 AND tag_id = ?3 AND timestamp = ?4",
            )?
            .execute([user_id, artist_id, tag_id, timestamp])?;
        Ok(deleted > 0)
    }

    fn delete_user_tags_for_artist(&self, user_id: UserId, artist_id: ArtistId) -> Result<usize> {
        Ok(self
            .conn
            .prepare_cached("DELETE FROM user_tagged_artists WHERE user_id = ?1 AND artist_id = ?2")?
            .execute([user_id, artist_id])?)
    }

    fn insert_friendship_edge(&self, edge: Friendship) -> Result<bool> {
        let inserted = self
            .conn
            .prepare_cached("INSERT OR IGNORE INTO user_friends (user_id, friend_id) VALUES (?1, ?2)")?
            .execute([edge.user_id, edge.friend_id])?;
        Ok(inserted > 0)
    }

    fn delete_friendship_edge(&self, edge: Friendship) -> Result<bool> {
        let deleted = self
            .conn
            .prepare_cached("DELETE FROM user_friends WHERE user_id = ?1 AND friend_id = ?2")?
            .execute([edge.user_id, edge.friend_id])?;
        Ok(deleted > 0)
    }

    fn delete_user(&self, user_id: UserId) -> Result<bool> {
        let listens = self
            .conn
            .prepare_cached("DELETE FROM user_artists WHERE user_id = ?1")?
            .execute([user_id])?;
        let tagged = self
            .conn
            .prepare_cached("DELETE FROM user_tagged_artists WHERE user_id = ?1")?
            .execute([user_id])?;
        let friends = self
            .conn
            .prepare_cached("DELETE FROM user_friends WHERE user_id = ?1 OR friend_id = ?1")?
            .execute([user_id])?;
        let deleted = self
            .conn
            .prepare_cached("DELETE FROM users WHERE user_id = ?1")?
            .execute([user_id])?;
        debug!(
            "Deleting user {user_id}: {listens} listens, {tagged} tag assignments, {friends} friendship edges"
        );
        Ok(deleted > 0)
    }

    fn delete_artist(&self, artist_id: ArtistId) -> Result<bool> {
        let listens = self
            .conn
            .prepare_cached("DELETE FROM user_artists WHERE artist_id = ?1")?
            .execute([artist_id])?;
        let tagged = self
            .conn
            .prepare_cached("DELETE FROM user_tagged_artists WHERE artist_id = ?1")?
            .execute([artist_id])?;
        let deleted = self
            .conn
            .prepare_cached("DELETE FROM artists WHERE id = ?1")?
            .execute([artist_id])?;
        debug!("Deleting artist {artist_id}: {listens} listens, {tagged} tag assignments");
        Ok(deleted > 0)
    }

    fn delete_tag(&self, tag_id: TagId) -> Result<bool> {
        let tagged = self
            .conn
            .prepare_cached("DELETE FROM user_tagged_artists WHERE tag_id = ?1")?
            .execute([tag_id])?;
        let deleted = self
            .conn
            .prepare_cached("DELETE FROM tags WHERE tag_id = ?1")?
            .execute([tag_id])?;
        debug!("Deleting tag {tag_id}: {tagged} tag assignments");
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::calendar_date;

    fn seeded() -> SqliteGraphStore {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        store
            .write(|tx| {
                for user in [1, 2] {
                    tx.insert_user(user)?;
                }
                tx.insert_artist(&NewArtist { id: Some(10), ..NewArtist::named("Björk") })?;
                tx.insert_artist(&NewArtist { id: Some(20), ..NewArtist::named("Bonobo") })?;
                let rock = tx.insert_tag("Rock")?;
                tx.upsert_listen(&Listen { user_id: 1, artist_id: 10, weight: 5 })?;
                tx.upsert_listen(&Listen { user_id: 2, artist_id: 10, weight: 7 })?;
                tx.upsert_listen(&Listen { user_id: 2, artist_id: 20, weight: 1 })?;
                tx.insert_tag_assignment(&TagAssignment::new(1, 10, rock.tag_id, 1_000))?;
                tx.insert_tag_assignment(&TagAssignment::new(1, 10, rock.tag_id, 2_000))?;
                tx.insert_friendship_edge(Friendship { user_id: 1, friend_id: 2 })?;
                Ok(())
            })
            .unwrap();
        store
    }

    #[test]
    fn test_listen_filters() {
        let store = seeded();
        store
            .read(|view| {
                assert_eq!(view.listens(None, None)?.len(), 3);
                assert_eq!(view.listens(Some(2), None)?.len(), 2);
                let for_artist = view.listens(None, Some(10))?;
                assert_eq!(for_artist.iter().map(|l| l.user_id).collect::<Vec<_>>(), vec![1, 2]);
                assert_eq!(view.listens(Some(1), Some(20))?, vec![]);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_co_listens_cover_heard_artists() {
        let store = seeded();
        store
            .read(|view| {
                let pairs: Vec<(ArtistId, UserId)> = view
                    .co_listens(1)?
                    .iter()
                    .map(|l| (l.artist_id, l.user_id))
                    .collect();
                assert_eq!(pairs, vec![(10, 1), (10, 2)]);
                assert_eq!(view.co_listens(2)?.len(), 3);
                assert!(view.co_listens(99)?.is_empty());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_upsert_replaces_weight() {
        let store = seeded();
        let previous = store
            .write(|tx| tx.upsert_listen(&Listen { user_id: 1, artist_id: 10, weight: 42 }))
            .unwrap();
        assert_eq!(previous, Some(5));
        let listens = store.read(|view| view.listens(Some(1), Some(10))).unwrap();
        assert_eq!(listens, vec![Listen { user_id: 1, artist_id: 10, weight: 42 }]);
    }

    #[test]
    fn test_tag_assignment_multiset_over_time() {
        let store = seeded();
        let all = store
            .read(|view| view.tag_assignments(&TagAssignmentFilter::for_user(1)))
            .unwrap();
        assert_eq!(all.len(), 2);

        // Same full key is ignored.
        let inserted = store
            .write(|tx| tx.insert_tag_assignment(&TagAssignment::new(1, 10, all[0].tag_id, 1_000)))
            .unwrap();
        assert!(!inserted);

        let ranged = store
            .read(|view| {
                view.tag_assignments(&TagAssignmentFilter {
                    since: Some(1_500),
                    ..Default::default()
                })
            })
            .unwrap();
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].timestamp, 2_000);
        assert_eq!(ranged[0].date, calendar_date(2_000));
    }

    #[test]
    fn test_tags_by_value_ignores_case() {
        let store = seeded();
        let tags = store.read(|view| view.tags_by_value("rOCK")).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].tag_value, "Rock");
    }

    #[test]
    fn test_artist_name_filter_escapes_wildcards() {
        let store = seeded();
        store
            .write(|tx| tx.insert_artist(&NewArtist::named("100% Rock_Band")))
            .unwrap();
        let hits = store.read(|view| view.artists(0, 10, Some("0% rock_"))).unwrap();
        assert_eq!(hits.len(), 1);
        let none = store.read(|view| view.artists(0, 10, Some("b_n"))).unwrap();
        assert!(none.is_empty());
        let by_name = store.read(|view| view.artist_by_name("bonobo")).unwrap();
        assert_eq!(by_name.map(|a| a.id), Some(20));
    }

    #[test]
    fn test_delete_user_cascades_every_edge() {
        let store = seeded();
        assert!(store.write(|tx| tx.delete_user(1)).unwrap());
        store
            .read(|view| {
                assert!(!view.user_exists(1)?);
                assert!(view.listens(Some(1), None)?.is_empty());
                assert!(view.tag_assignments(&TagAssignmentFilter::for_user(1))?.is_empty());
                assert!(view.friendship_edges(Some(1))?.is_empty());
                assert_eq!(view.count(Table::Listens)?, 2);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_delete_artist_cascade() {
        let store = seeded();
        assert!(store.write(|tx| tx.delete_artist(10)).unwrap());
        store
            .read(|view| {
                assert!(view.listens(None, Some(10))?.is_empty());
                assert!(view.tag_assignments(&TagAssignmentFilter::for_artist(10))?.is_empty());
                assert_eq!(view.count(Table::Listens)?, 1);
                Ok(())
            })
            .unwrap();
        assert!(!store.write(|tx| tx.delete_artist(10)).unwrap());
    }

    #[test]
    fn test_delete_tag_cascade() {
        let store = seeded();
        let rock = store.read(|view| view.tags_by_value("rock")).unwrap()[0].tag_id;
        assert!(store.write(|tx| tx.delete_tag(rock)).unwrap());
        store
            .read(|view| {
                assert!(view.tags_by_value("rock")?.is_empty());
                assert!(view.tag_assignments(&TagAssignmentFilter::for_tag(rock))?.is_empty());
                assert_eq!(view.count(Table::TagAssignments)?, 0);
                // Artists and listens are untouched.
                assert_eq!(view.count(Table::Artists)?, 2);
                assert_eq!(view.count(Table::Listens)?, 3);
                Ok(())
            })
            .unwrap();
        assert!(!store.write(|tx| tx.delete_tag(rock)).unwrap());
    }

    #[test]
    fn test_out_of_range_timestamp_stores_no_date() {
        let store = seeded();
        let rock = store.read(|view| view.tags_by_value("rock")).unwrap()[0].tag_id;
        let far = TagAssignment::new(2, 20, rock, i64::MAX);
        assert_eq!(far.date, None);
        assert!(store.write(|tx| tx.insert_tag_assignment(&far)).unwrap());

        let stored = store
            .read(|view| view.tag_assignments(&TagAssignmentFilter::for_user(2)))
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].timestamp, i64::MAX);
        assert_eq!(stored[0].date, None);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let store = seeded();
        let result: Result<()> = store.write(|tx| {
            tx.delete_artist(10)?;
            Err(GraphError::invalid("abort"))
        });
        assert!(result.is_err());
        let listens = store.read(|view| view.listens(None, Some(10))).unwrap();
        assert_eq!(listens.len(), 2);
    }

    #[test]
    fn test_foreign_keys_reject_orphans() {
        let store = seeded();
        let result = store.write(|tx| tx.upsert_listen(&Listen { user_id: 99, artist_id: 10, weight: 1 }));
        assert!(matches!(result, Err(GraphError::Storage(_))));
    }

    #[test]
    fn test_counts() {
        let store = seeded();
        store
            .read(|view| {
                assert_eq!(view.count(Table::Users)?, 2);
                assert_eq!(view.count(Table::Artists)?, 2);
                assert_eq!(view.count(Table::Tags)?, 1);
                assert_eq!(view.count(Table::Listens)?, 3);
                assert_eq!(view.count(Table::TagAssignments)?, 2);
                assert_eq!(view.count(Table::Friendships)?, 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern("a%b_c\\"), "%a\\%b\\_c\\\\%");
    }
}
