//! Record-level operations on users, artists, tags and their edges.
//!
//! This is where the creation rules live: users are created implicitly by
//! anything that references them, while artists and tags must already exist
//! before an edge can point at them. Every operation runs in its own store
//! transaction.

use crate::calendar::now_millis;
use crate::error::{GraphError, Result};
use crate::model::{
    Artist, ArtistId, ArtistUpdate, Listen, NewArtist, Tag, TagAssignment, TagAssignmentFilter,
    TagId, User, UserId,
};
use crate::store::{GraphRead, GraphStore};
use log::{debug, info};
use std::cmp::Reverse;

/// Upper bound applied to every paged `limit` unless configured otherwise.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 500;

/// User ids are assigned externally and must be positive.
pub fn validate_user_id(user_id: UserId) -> Result<()> {
    if user_id <= 0 {
        return Err(GraphError::invalid(format!(
            "user id must be positive, got {user_id}"
        )));
    }
    Ok(())
}

fn validate_weight(weight: i64) -> Result<()> {
    if weight < 0 {
        return Err(GraphError::invalid(format!(
            "listen weight must not be negative, got {weight}"
        )));
    }
    Ok(())
}

fn non_blank<'s>(what: &str, value: &'s str) -> Result<&'s str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GraphError::invalid(format!("{what} must not be blank")));
    }
    Ok(trimmed)
}

fn require_artist<V: GraphRead + ?Sized>(view: &V, artist_id: ArtistId) -> Result<()> {
    if !view.artist_exists(artist_id)? {
        return Err(GraphError::not_found(format!("artist {artist_id}")));
    }
    Ok(())
}

fn require_tag<V: GraphRead + ?Sized>(view: &V, tag_id: TagId) -> Result<()> {
    if !view.tag_exists(tag_id)? {
        return Err(GraphError::not_found(format!("tag {tag_id}")));
    }
    Ok(())
}

/// Heaviest first, then by the other endpoint's id.
fn by_weight(mut listens: Vec<Listen>, key: impl Fn(&Listen) -> i64) -> Vec<Listen> {
    listens.sort_unstable_by_key(|listen| (Reverse(listen.weight), key(listen)));
    listens
}

fn paginate<T>(items: Vec<T>, skip: usize, limit: usize) -> Vec<T> {
    items.into_iter().skip(skip).take(limit).collect()
}

/// Creation, lookup, update and deletion of records and edges.
#[derive(Debug)]
pub struct Catalog<'a, S: GraphStore> {
    store: &'a S,
    max_page_size: usize,
}

impl<'a, S: GraphStore> Catalog<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    fn clamp(&self, limit: usize) -> usize {
        limit.min(self.max_page_size)
    }

    // Users

    /// Idempotent: creating an existing user returns it unchanged.
    pub fn create_user(&self, user_id: UserId) -> Result<User> {
        validate_user_id(user_id)?;
        let created = self.store.write(|tx| tx.insert_user(user_id))?;
        if created {
            debug!("Created user {user_id}");
        }
        Ok(User { user_id })
    }

    pub fn get_user(&self, user_id: UserId) -> Result<User> {
        if self.store.read(|view| view.user_exists(user_id))? {
            Ok(User { user_id })
        } else {
            Err(GraphError::not_found(format!("user {user_id}")))
        }
    }

    pub fn list_users(&self, skip: usize, limit: usize) -> Result<Vec<User>> {
        let limit = self.clamp(limit);
        self.store.read(|view| view.users(skip, limit))
    }

    /// Removes the user together with every edge touching it.
    pub fn delete_user(&self, user_id: UserId) -> Result<()> {
        if !self.store.write(|tx| tx.delete_user(user_id))? {
            return Err(GraphError::not_found(format!("user {user_id}")));
        }
        info!("Deleted user {user_id}");
        Ok(())
    }

    // Artists

    pub fn create_artist(&self, artist: &NewArtist) -> Result<Artist> {
        let name = non_blank("artist name", &artist.name)?;
        let artist = NewArtist {
            name: name.to_string(),
            ..artist.clone()
        };
        let created = self.store.write(|tx| tx.insert_artist(&artist))?;
        debug!("Created artist {} ({})", created.id, created.name);
        Ok(created)
    }

    pub fn get_artist(&self, artist_id: ArtistId) -> Result<Artist> {
        self.store
            .read(|view| view.artist(artist_id))?
            .ok_or_else(|| GraphError::not_found(format!("artist {artist_id}")))
    }

    /// Exact match ignoring case.
    pub fn get_artist_by_name(&self, name: &str) -> Result<Artist> {
        self.store
            .read(|view| view.artist_by_name(name))?
            .ok_or_else(|| GraphError::not_found(format!("artist named {name:?}")))
    }

    pub fn list_artists(
        &self,
        skip: usize,
        limit: usize,
        name_filter: Option<&str>,
    ) -> Result<Vec<Artist>> {
        let limit = self.clamp(limit);
        self.store.read(|view| view.artists(skip, limit, name_filter))
    }

    pub fn update_artist(&self, artist_id: ArtistId, update: &ArtistUpdate) -> Result<Artist> {
        let name = update
            .name
            .as_deref()
            .map(|name| non_blank("artist name", name).map(str::to_string))
            .transpose()?;
        let update = ArtistUpdate {
            name,
            ..update.clone()
        };
        self.store
            .write(|tx| tx.update_artist(artist_id, &update))?
            .ok_or_else(|| GraphError::not_found(format!("artist {artist_id}")))
    }

    /// Removes the artist together with its listens and tag assignments.
    pub fn delete_artist(&self, artist_id: ArtistId) -> Result<()> {
        if !self.store.write(|tx| tx.delete_artist(artist_id))? {
            return Err(GraphError::not_found(format!("artist {artist_id}")));
        }
        info!("Deleted artist {artist_id}");
        Ok(())
    }

    // Tags

    /// Returns the existing tag when one with the same value (ignoring case)
    /// is already stored.
    pub fn create_tag(&self, tag_value: &str) -> Result<Tag> {
        let tag_value = non_blank("tag value", tag_value)?;
        self.store.write(|tx| {
            if let Some(existing) = tx.tags_by_value(tag_value)?.into_iter().next() {
                return Ok(existing);
            }
            let tag = tx.insert_tag(tag_value)?;
            debug!("Created tag {} ({})", tag.tag_id, tag.tag_value);
            Ok(tag)
        })
    }

    pub fn get_tag(&self, tag_id: TagId) -> Result<Tag> {
        self.store
            .read(|view| view.tag(tag_id))?
            .ok_or_else(|| GraphError::not_found(format!("tag {tag_id}")))
    }

    /// The lowest-id tag whose value matches ignoring case.
    pub fn get_tag_by_value(&self, tag_value: &str) -> Result<Tag> {
        self.store
            .read(|view| view.tags_by_value(tag_value))?
            .into_iter()
            .next()
            .ok_or_else(|| GraphError::not_found(format!("tag {tag_value:?}")))
    }

    pub fn list_tags(&self, skip: usize, limit: usize) -> Result<Vec<Tag>> {
        let limit = self.clamp(limit);
        self.store.read(|view| view.tags(skip, limit))
    }

    pub fn update_tag(&self, tag_id: TagId, tag_value: &str) -> Result<Tag> {
        let tag_value = non_blank("tag value", tag_value)?;
        self.store
            .write(|tx| tx.update_tag(tag_id, tag_value))?
            .ok_or_else(|| GraphError::not_found(format!("tag {tag_id}")))
    }

    /// Removes the tag together with its assignments.
    pub fn delete_tag(&self, tag_id: TagId) -> Result<()> {
        if !self.store.write(|tx| tx.delete_tag(tag_id))? {
            return Err(GraphError::not_found(format!("tag {tag_id}")));
        }
        info!("Deleted tag {tag_id}");
        Ok(())
    }

    // Listens

    /// Creates or replaces the listen edge. The user is created if needed;
    /// the artist must exist.
    pub fn set_listen(&self, user_id: UserId, artist_id: ArtistId, weight: i64) -> Result<Listen> {
        validate_user_id(user_id)?;
        validate_weight(weight)?;
        self.store.write(|tx| {
            require_artist(tx, artist_id)?;
            tx.insert_user(user_id)?;
            let listen = Listen { user_id, artist_id, weight };
            let previous = tx.upsert_listen(&listen)?;
            debug!("Listen {user_id} -> {artist_id}: {previous:?} => {weight}");
            Ok(listen)
        })
    }

    /// Adds `delta` to the current weight, starting from zero when the edge
    /// does not exist. The result must stay non-negative.
    pub fn increment_listen(&self, user_id: UserId, artist_id: ArtistId, delta: i64) -> Result<Listen> {
        validate_user_id(user_id)?;
        self.store.write(|tx| {
            require_artist(tx, artist_id)?;
            let current = tx
                .listens(Some(user_id), Some(artist_id))?
                .first()
                .map_or(0, |listen| listen.weight);
            let weight = current
                .checked_add(delta)
                .ok_or_else(|| GraphError::invalid("listen weight overflow"))?;
            validate_weight(weight)?;
            tx.insert_user(user_id)?;
            let listen = Listen { user_id, artist_id, weight };
            tx.upsert_listen(&listen)?;
            Ok(listen)
        })
    }

    pub fn get_listen(&self, user_id: UserId, artist_id: ArtistId) -> Result<Listen> {
        self.store
            .read(|view| view.listens(Some(user_id), Some(artist_id)))?
            .into_iter()
            .next()
            .ok_or_else(|| GraphError::not_found(format!("listen {user_id} -> {artist_id}")))
    }

    pub fn delete_listen(&self, user_id: UserId, artist_id: ArtistId) -> Result<()> {
        if !self.store.write(|tx| tx.delete_listen(user_id, artist_id))? {
            return Err(GraphError::not_found(format!("listen {user_id} -> {artist_id}")));
        }
        Ok(())
    }

    /// Listens of one user, heaviest first.
    pub fn user_artists(&self, user_id: UserId, skip: usize, limit: usize) -> Result<Vec<Listen>> {
        let listens = self.store.read(|view| view.listens(Some(user_id), None))?;
        Ok(paginate(
            by_weight(listens, |l| l.artist_id),
            skip,
            self.clamp(limit),
        ))
    }

    /// Listeners of one artist, heaviest first.
    pub fn artist_listeners(&self, artist_id: ArtistId, skip: usize, limit: usize) -> Result<Vec<Listen>> {
        let listens = self.store.read(|view| view.listens(None, Some(artist_id)))?;
        Ok(paginate(
            by_weight(listens, |l| l.user_id),
            skip,
            self.clamp(limit),
        ))
    }

    pub fn top_artists_for_user(&self, user_id: UserId, limit: usize) -> Result<Vec<Listen>> {
        self.user_artists(user_id, 0, limit)
    }

    // Tag assignments

    /// Records that `user_id` tagged `artist_id` with `tag_id` at `timestamp`
    /// (milliseconds, defaulting to now).
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing artist or tag, `AlreadyExists` when the same
    /// four-part key was already recorded.
    pub fn tag_artist(
        &self,
        user_id: UserId,
        artist_id: ArtistId,
        tag_id: TagId,
        timestamp: Option<i64>,
    ) -> Result<TagAssignment> {
        validate_user_id(user_id)?;
        let assignment =
            TagAssignment::new(user_id, artist_id, tag_id, timestamp.unwrap_or_else(now_millis));
        self.store.write(|tx| {
            require_artist(tx, artist_id)?;
            require_tag(tx, tag_id)?;
            tx.insert_user(user_id)?;
            if !tx.insert_tag_assignment(&assignment)? {
                return Err(GraphError::AlreadyExists(format!(
                    "tag assignment ({user_id}, {artist_id}, {tag_id}, {})",
                    assignment.timestamp
                )));
            }
            Ok(assignment)
        })
    }

    pub fn list_tag_assignments(
        &self,
        filter: &TagAssignmentFilter,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<TagAssignment>> {
        if let (Some(since), Some(until)) = (filter.since, filter.until) {
            if since > until {
                return Err(GraphError::invalid(format!(
                    "empty time range: since {since} is after until {until}"
                )));
            }
        }
        let assignments = self.store.read(|view| view.tag_assignments(filter))?;
        Ok(paginate(assignments, skip, self.clamp(limit)))
    }

    pub fn delete_tag_assignment(
        &self,
        user_id: UserId,
        artist_id: ArtistId,
        tag_id: TagId,
        timestamp: i64,
    ) -> Result<()> {
        let deleted = self
            .store
            .write(|tx| tx.delete_tag_assignment(user_id, artist_id, tag_id, timestamp))?;
        if !deleted {
            return Err(GraphError::not_found(format!(
                "tag assignment ({user_id}, {artist_id}, {tag_id}, {timestamp})"
            )));
        }
        Ok(())
    }

    /// Returns how many assignments were removed; zero is not an error.
    pub fn delete_user_tags_for_artist(&self, user_id: UserId, artist_id: ArtistId) -> Result<usize> {
        let removed = self
            .store
            .write(|tx| tx.delete_user_tags_for_artist(user_id, artist_id))?;
        debug!("Removed {removed} tag assignments by {user_id} on {artist_id}");
        Ok(removed)
    }
}

/// A user's `limit` heaviest listens, over an existing view.
pub(crate) fn top_listens_in<V: GraphRead + ?Sized>(
    view: &V,
    user_id: UserId,
    limit: usize,
) -> Result<Vec<Listen>> {
    let listens = view.listens(Some(user_id), None)?;
    Ok(paginate(by_weight(listens, |l| l.artist_id), 0, limit))
}
