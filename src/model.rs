//! Entities, edges and the result records produced by the engines.
//!
//! Everything here is plain data. Entities and edges are owned by the
//! [`crate::store`]; engines only ever read them and build the ranked records
//! defined at the bottom of this file.

use serde::{Deserialize, Serialize};

/// Externally assigned, positive.
pub type UserId = i64;
pub type ArtistId = i64;
pub type TagId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
    pub url: Option<String>,
    pub picture_url: Option<String>,
}

/// Input for artist creation. `id` is assigned by the store when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArtist {
    pub id: Option<ArtistId>,
    pub name: String,
    pub url: Option<String>,
    pub picture_url: Option<String>,
}

impl NewArtist {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Partial artist update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    pub picture_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub tag_id: TagId,
    /// Free text. Lookups by value ignore case.
    pub tag_value: String,
}

/// At most one per `(user_id, artist_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listen {
    pub user_id: UserId,
    pub artist_id: ArtistId,
    /// Play-count proxy, never negative.
    pub weight: i64,
}

/// Calendar breakdown of a tag assignment timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDate {
    pub day: u8,
    pub month: u8,
    pub year: i32,
}

/// Keyed by all four of `(user_id, artist_id, tag_id, timestamp)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAssignment {
    pub user_id: UserId,
    pub artist_id: ArtistId,
    pub tag_id: TagId,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Derived once at creation; `None` when the timestamp has no calendar
    /// representation.
    pub date: Option<CalendarDate>,
}

impl TagAssignment {
    /// Builds an assignment, deriving its calendar date from `timestamp`.
    pub fn new(user_id: UserId, artist_id: ArtistId, tag_id: TagId, timestamp: i64) -> Self {
        Self {
            user_id,
            artist_id,
            tag_id,
            timestamp,
            date: crate::calendar::calendar_date(timestamp),
        }
    }
}

/// Optional filters for tag assignment scans. `since`/`until` are inclusive
/// millisecond bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagAssignmentFilter {
    pub user_id: Option<UserId>,
    pub artist_id: Option<ArtistId>,
    pub tag_id: Option<TagId>,
    pub since: Option<i64>,
    pub until: Option<i64>,
}

impl TagAssignmentFilter {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn for_artist(artist_id: ArtistId) -> Self {
        Self {
            artist_id: Some(artist_id),
            ..Default::default()
        }
    }

    pub fn for_tag(tag_id: TagId) -> Self {
        Self {
            tag_id: Some(tag_id),
            ..Default::default()
        }
    }
}

/// Directed social edge. A bidirectional friendship is two of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Friendship {
    pub user_id: UserId,
    pub friend_id: UserId,
}

/// Entity kinds that can be counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Users,
    Artists,
    Tags,
    Listens,
    TagAssignments,
    Friendships,
}

// Ranked results.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarUser {
    pub user_id: UserId,
    /// Number of artists both users listened to.
    pub common_artists: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub artist_id: ArtistId,
    pub name: String,
    /// Sum of listen weights from similar users.
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularArtist {
    pub artist_id: ArtistId,
    pub name: String,
    pub total_weight: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularTag {
    pub tag_id: TagId,
    pub tag_value: String,
    pub usage_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveUser {
    pub user_id: UserId,
    /// Distinct artists listened to, not the sum of weights.
    pub artist_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalStatistics {
    pub total_artists: u64,
    pub total_users: u64,
    pub total_tags: u64,
    pub total_listens: u64,
    pub total_tagged: u64,
    pub total_friendships: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatistics {
    pub user_id: UserId,
    pub artists_listened: u64,
    pub tags_created: u64,
    pub friends_count: u64,
    pub top_artists: Vec<Listen>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistStatistics {
    pub artist_id: ArtistId,
    pub name: String,
    pub total_listens: i64,
    pub listener_count: u64,
    pub tags_count: u64,
    pub top_tags: Vec<PopularTag>,
}
