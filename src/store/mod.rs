//! Graph Store interface.
//!
//! The store owns users, artists, tags and the three edge kinds (listens, tag
//! assignments, friendships). Engines never talk to a backend directly: they
//! receive a [`GraphRead`] view from [`GraphStore::read`], which is one
//! internally consistent snapshot for the duration of the closure.
//!
//! Mutations go through [`GraphStore::write`]. Whatever the closure does is
//! committed together when it returns `Ok` and rolled back when it returns
//! `Err`, which is what makes the cascading deletes all-or-nothing.

mod sqlite;

pub use sqlite::SqliteGraphStore;

use crate::error::Result;
use crate::model::{
    Artist, ArtistId, ArtistUpdate, Friendship, Listen, NewArtist, Table, Tag, TagAssignment,
    TagAssignmentFilter, TagId, User, UserId,
};

/// Read access to one consistent snapshot of the graph.
///
/// Scans return rows in ascending key order so callers never depend on
/// backend iteration order.
pub trait GraphRead {
    fn user_exists(&self, user_id: UserId) -> Result<bool>;
    fn artist_exists(&self, artist_id: ArtistId) -> Result<bool>;
    fn tag_exists(&self, tag_id: TagId) -> Result<bool>;

    fn users(&self, skip: usize, limit: usize) -> Result<Vec<User>>;

    fn artist(&self, artist_id: ArtistId) -> Result<Option<Artist>>;
    /// Exact name match, ignoring case.
    fn artist_by_name(&self, name: &str) -> Result<Option<Artist>>;
    /// Artists by ascending id, optionally restricted to names containing
    /// `name_filter` (ignoring case).
    fn artists(&self, skip: usize, limit: usize, name_filter: Option<&str>) -> Result<Vec<Artist>>;

    fn tag(&self, tag_id: TagId) -> Result<Option<Tag>>;
    /// Every tag whose value equals `value` ignoring case.
    fn tags_by_value(&self, value: &str) -> Result<Vec<Tag>>;
    fn tags(&self, skip: usize, limit: usize) -> Result<Vec<Tag>>;

    /// Listen edges, filtered by either key.
    fn listens(&self, user_id: Option<UserId>, artist_id: Option<ArtistId>) -> Result<Vec<Listen>>;
    /// Every listen edge, the user's own included, on an artist `user_id`
    /// has heard. Ordered by artist, then user.
    fn co_listens(&self, user_id: UserId) -> Result<Vec<Listen>>;
    fn tag_assignments(&self, filter: &TagAssignmentFilter) -> Result<Vec<TagAssignment>>;
    /// Friendship edges touching `user_id` at either endpoint, or all edges.
    fn friendship_edges(&self, user_id: Option<UserId>) -> Result<Vec<Friendship>>;
    fn friendship_exists(&self, edge: Friendship) -> Result<bool>;

    fn count(&self, table: Table) -> Result<u64>;
}

/// Mutation primitives. Validation and auto-creation rules live in
/// [`crate::catalog`] and [`crate::friends`]; these only touch rows.
pub trait GraphWrite: GraphRead {
    /// Returns `false` when the user already existed.
    fn insert_user(&self, user_id: UserId) -> Result<bool>;
    fn insert_artist(&self, artist: &NewArtist) -> Result<Artist>;
    fn update_artist(&self, artist_id: ArtistId, update: &ArtistUpdate) -> Result<Option<Artist>>;
    fn insert_tag(&self, tag_value: &str) -> Result<Tag>;
    fn update_tag(&self, tag_id: TagId, tag_value: &str) -> Result<Option<Tag>>;

    /// Inserts or replaces the weight. Returns the previous weight, if any.
    fn upsert_listen(&self, listen: &Listen) -> Result<Option<i64>>;
    fn delete_listen(&self, user_id: UserId, artist_id: ArtistId) -> Result<bool>;

    /// Returns `false` when an assignment with the same full key exists.
    fn insert_tag_assignment(&self, assignment: &TagAssignment) -> Result<bool>;
    fn delete_tag_assignment(
        &self,
        user_id: UserId,
        artist_id: ArtistId,
        tag_id: TagId,
        timestamp: i64,
    ) -> Result<bool>;
    fn delete_user_tags_for_artist(&self, user_id: UserId, artist_id: ArtistId) -> Result<usize>;

    /// Returns `false` when the directed edge already exists.
    fn insert_friendship_edge(&self, edge: Friendship) -> Result<bool>;
    fn delete_friendship_edge(&self, edge: Friendship) -> Result<bool>;

    /// Removes the user with its listens, tag assignments and friendship
    /// edges in both directions.
    fn delete_user(&self, user_id: UserId) -> Result<bool>;
    /// Removes the artist with its listens and tag assignments.
    fn delete_artist(&self, artist_id: ArtistId) -> Result<bool>;
    /// Removes the tag with its assignments.
    fn delete_tag(&self, tag_id: TagId) -> Result<bool>;
}

/// A backend that can hand out consistent read views and atomic write scopes.
pub trait GraphStore: Send + Sync {
    fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn GraphRead) -> Result<T>;

    fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn GraphWrite) -> Result<T>;
}
