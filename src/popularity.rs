//! Global popularity and activity rankings.
//!
//! Each ranking groups edges by one key, aggregates, and keeps the `limit`
//! best, ties by ascending key. Nothing is cached between calls.

use crate::error::Result;
use crate::model::{
    ActiveUser, ArtistId, PopularArtist, PopularTag, TagAssignmentFilter, TagId, UserId,
};
use crate::ranking::top_by_score;
use crate::store::{GraphRead, GraphStore};
use log::{debug, warn};
use std::collections::HashMap;

/// Artists by summed listen weight.
pub fn popular_artists_in<V: GraphRead + ?Sized>(view: &V, limit: usize) -> Result<Vec<PopularArtist>> {
    let mut tally: HashMap<ArtistId, i64> = HashMap::new();
    for listen in view.listens(None, None)? {
        let total = tally.entry(listen.artist_id).or_insert(0);
        *total = total.saturating_add(listen.weight);
    }
    debug!("Ranking {} artists by listen weight", tally.len());

    let mut ranked = Vec::new();
    for (artist_id, total_weight) in top_by_score(tally, limit) {
        match view.artist(artist_id)? {
            Some(artist) => ranked.push(PopularArtist {
                artist_id,
                name: artist.name,
                total_weight,
            }),
            None => warn!("Listen edge references missing artist {artist_id}"),
        }
    }
    Ok(ranked)
}

/// Tags by number of assignments, optionally restricted by `filter`
/// (e.g. to one artist).
pub fn popular_tags_in<V: GraphRead + ?Sized>(
    view: &V,
    filter: &TagAssignmentFilter,
    limit: usize,
) -> Result<Vec<PopularTag>> {
    let mut tally: HashMap<TagId, u64> = HashMap::new();
    for assignment in view.tag_assignments(filter)? {
        *tally.entry(assignment.tag_id).or_insert(0) += 1;
    }
    debug!("Ranking {} tags by usage", tally.len());

    let mut ranked = Vec::new();
    for (tag_id, usage_count) in top_by_score(tally, limit) {
        match view.tag(tag_id)? {
            Some(tag) => ranked.push(PopularTag {
                tag_id,
                tag_value: tag.tag_value,
                usage_count,
            }),
            None => warn!("Tag assignment references missing tag {tag_id}"),
        }
    }
    Ok(ranked)
}

/// Users by number of distinct artists listened to.
pub fn active_users_in<V: GraphRead + ?Sized>(view: &V, limit: usize) -> Result<Vec<ActiveUser>> {
    // One listen edge per (user, artist), so counting edges counts artists.
    let mut tally: HashMap<UserId, u64> = HashMap::new();
    for listen in view.listens(None, None)? {
        *tally.entry(listen.user_id).or_insert(0) += 1;
    }
    debug!("Ranking {} users by listening breadth", tally.len());

    Ok(top_by_score(tally, limit)
        .into_iter()
        .map(|(user_id, artist_count)| ActiveUser { user_id, artist_count })
        .collect())
}

/// Popularity and activity rankings, each answered from one snapshot.
#[derive(Debug)]
pub struct PopularityAggregator<'a, S: GraphStore> {
    store: &'a S,
}

impl<'a, S: GraphStore> PopularityAggregator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn popular_artists(&self, limit: usize) -> Result<Vec<PopularArtist>> {
        self.store.read(|view| popular_artists_in(view, limit))
    }

    pub fn popular_tags(&self, limit: usize) -> Result<Vec<PopularTag>> {
        self.store
            .read(|view| popular_tags_in(view, &TagAssignmentFilter::default(), limit))
    }

    pub fn active_users(&self, limit: usize) -> Result<Vec<ActiveUser>> {
        self.store.read(|view| active_users_in(view, limit))
    }
}
