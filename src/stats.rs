//! Summary statistics over the whole graph, one user, or one artist.

use crate::catalog::top_listens_in;
use crate::error::{GraphError, Result};
use crate::friends::friends_of_in;
use crate::model::{
    Artist, ArtistId, ArtistStatistics, GlobalStatistics, PopularTag, Table, TagAssignmentFilter,
    UserId, UserStatistics,
};
use crate::popularity::popular_tags_in;
use crate::search::artists_with_all_tags_in;
use crate::store::GraphStore;
use log::debug;

/// Entries in the "top" lists of user and artist statistics.
pub const TOP_ENTRIES: usize = 5;

/// Statistics queries, each answered from one snapshot of the store.
#[derive(Debug)]
pub struct StatisticsService<'a, S: GraphStore> {
    store: &'a S,
}

impl<'a, S: GraphStore> StatisticsService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn global_statistics(&self) -> Result<GlobalStatistics> {
        self.store.read(|view| {
            Ok(GlobalStatistics {
                total_artists: view.count(Table::Artists)?,
                total_users: view.count(Table::Users)?,
                total_tags: view.count(Table::Tags)?,
                total_listens: view.count(Table::Listens)?,
                total_tagged: view.count(Table::TagAssignments)?,
                total_friendships: view.count(Table::Friendships)?,
            })
        })
    }

    pub fn user_statistics(&self, user_id: UserId) -> Result<UserStatistics> {
        self.store.read(|view| {
            if !view.user_exists(user_id)? {
                return Err(GraphError::not_found(format!("user {user_id}")));
            }
            let artists_listened = view.listens(Some(user_id), None)?.len() as u64;
            let tags_created = view
                .tag_assignments(&TagAssignmentFilter::for_user(user_id))?
                .len() as u64;
            let friends_count = friends_of_in(view, user_id)?.len() as u64;
            let top_artists = top_listens_in(view, user_id, TOP_ENTRIES)?;
            debug!("User {user_id}: {artists_listened} artists, {tags_created} tags, {friends_count} friends");
            Ok(UserStatistics {
                user_id,
                artists_listened,
                tags_created,
                friends_count,
                top_artists,
            })
        })
    }

    pub fn artist_statistics(&self, artist_id: ArtistId) -> Result<ArtistStatistics> {
        self.store.read(|view| {
            let artist = view
                .artist(artist_id)?
                .ok_or_else(|| GraphError::not_found(format!("artist {artist_id}")))?;
            let listens = view.listens(None, Some(artist_id))?;
            let total_listens = listens
                .iter()
                .fold(0_i64, |total, listen| total.saturating_add(listen.weight));
            let filter = TagAssignmentFilter::for_artist(artist_id);
            let tags_count = view.tag_assignments(&filter)?.len() as u64;
            let top_tags = popular_tags_in(view, &filter, TOP_ENTRIES)?;
            Ok(ArtistStatistics {
                artist_id,
                name: artist.name,
                total_listens,
                listener_count: listens.len() as u64,
                tags_count,
                top_tags,
            })
        })
    }

    /// Tags used on one artist by usage count, ties by ascending tag id.
    pub fn artist_top_tags(&self, artist_id: ArtistId, limit: usize) -> Result<Vec<PopularTag>> {
        self.store.read(|view| {
            if !view.artist_exists(artist_id)? {
                return Err(GraphError::not_found(format!("artist {artist_id}")));
            }
            popular_tags_in(view, &TagAssignmentFilter::for_artist(artist_id), limit)
        })
    }

    pub fn artists_by_tag(&self, tag_value: &str, skip: usize, limit: usize) -> Result<Vec<Artist>> {
        self.store
            .read(|view| artists_with_all_tags_in(view, &[tag_value], skip, limit))
    }
}
