//! Shared-taste similarity between users.
//!
//! `score(u, v)` is the number of artists both users have a listen edge to.
//! Candidates are found by walking the listeners of each artist `u` heard and
//! tallying co-occurrences, so the full user-by-user cross product is never
//! built.

use crate::error::Result;
use crate::model::{ArtistId, SimilarUser, UserId};
use crate::ranking::top_by_score;
use crate::store::{GraphRead, GraphStore};
use log::debug;
use std::collections::{BTreeSet, HashMap};

/// Top `limit` users by shared-artist count, ties by ascending user id.
/// Users sharing nothing with `user_id` never appear.
pub fn similar_users_in<V: GraphRead + ?Sized>(
    view: &V,
    user_id: UserId,
    limit: usize,
) -> Result<Vec<SimilarUser>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut heard = 0_usize;
    let mut tally: HashMap<UserId, u64> = HashMap::new();
    for co_listen in view.co_listens(user_id)? {
        if co_listen.user_id == user_id {
            heard += 1;
        } else {
            *tally.entry(co_listen.user_id).or_insert(0) += 1;
        }
    }
    debug!("User {user_id}: {heard} artists heard, {} candidate users", tally.len());

    Ok(top_by_score(tally, limit)
        .into_iter()
        .map(|(user_id, common_artists)| SimilarUser { user_id, common_artists })
        .collect())
}

/// `|A(u) ∩ A(v)|` for one pair.
pub fn shared_artist_count_in<V: GraphRead + ?Sized>(
    view: &V,
    user_id: UserId,
    other_id: UserId,
) -> Result<u64> {
    let artists_of = |user: UserId| -> Result<BTreeSet<ArtistId>> {
        Ok(view
            .listens(Some(user), None)?
            .into_iter()
            .map(|listen| listen.artist_id)
            .collect())
    };
    let mine = artists_of(user_id)?;
    let theirs = artists_of(other_id)?;
    Ok(mine.intersection(&theirs).count() as u64)
}

/// Similarity queries, each answered from one snapshot of the store.
#[derive(Debug)]
pub struct SimilarityEngine<'a, S: GraphStore> {
    store: &'a S,
}

impl<'a, S: GraphStore> SimilarityEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn similar_users(&self, user_id: UserId, limit: usize) -> Result<Vec<SimilarUser>> {
        self.store.read(|view| similar_users_in(view, user_id, limit))
    }

    pub fn score(&self, user_id: UserId, other_id: UserId) -> Result<u64> {
        self.store.read(|view| shared_artist_count_in(view, user_id, other_id))
    }
}
