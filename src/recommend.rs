//! Artist recommendations from similar users.
//!
//! For a user `u`, take the `candidate_pool` most similar users `S`, then score
//! every artist `u` has not heard by the sum of the listen weights `S` gave it.
//! The pool size is fixed independently of how many recommendations are asked
//! for.

use crate::error::Result;
use crate::model::{ArtistId, Recommendation, UserId};
use crate::ranking::top_by_score;
use crate::similarity::similar_users_in;
use crate::store::{GraphRead, GraphStore};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

/// Number of similar users consulted when none is configured.
pub const DEFAULT_CANDIDATE_POOL: usize = 20;

/// Top `limit` unheard artists by summed weight, ties by ascending artist id.
/// Empty, never an error, when `u` has no similar users or they only listen
/// to artists `u` already knows.
pub fn recommend_in<V: GraphRead + ?Sized>(
    view: &V,
    user_id: UserId,
    limit: usize,
    candidate_pool: usize,
) -> Result<Vec<Recommendation>> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let similar = similar_users_in(view, user_id, candidate_pool)?;
    if similar.is_empty() {
        return Ok(Vec::new());
    }

    let heard: HashSet<ArtistId> = view
        .listens(Some(user_id), None)?
        .into_iter()
        .map(|listen| listen.artist_id)
        .collect();

    let mut tally: HashMap<ArtistId, i64> = HashMap::new();
    for peer in &similar {
        for listen in view.listens(Some(peer.user_id), None)? {
            if !heard.contains(&listen.artist_id) {
                let score = tally.entry(listen.artist_id).or_insert(0);
                *score = score.saturating_add(listen.weight);
            }
        }
    }
    debug!(
        "User {user_id}: {} similar users, {} candidate artists",
        similar.len(),
        tally.len()
    );

    let mut recommendations = Vec::with_capacity(limit.min(tally.len()));
    for (artist_id, score) in top_by_score(tally, limit) {
        match view.artist(artist_id)? {
            Some(artist) => recommendations.push(Recommendation {
                artist_id,
                name: artist.name,
                score,
            }),
            None => warn!("Listen edge references missing artist {artist_id}"),
        }
    }
    Ok(recommendations)
}

/// Recommendation queries, each answered from one snapshot of the store.
#[derive(Debug)]
pub struct RecommendationEngine<'a, S: GraphStore> {
    store: &'a S,
    candidate_pool: usize,
}

impl<'a, S: GraphStore> RecommendationEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            candidate_pool: DEFAULT_CANDIDATE_POOL,
        }
    }

    /// Consult `candidate_pool` similar users instead of the default 20.
    #[must_use]
    pub fn with_candidate_pool(mut self, candidate_pool: usize) -> Self {
        self.candidate_pool = candidate_pool;
        self
    }

    pub fn candidate_pool(&self) -> usize {
        self.candidate_pool
    }

    pub fn recommend(&self, user_id: UserId, limit: usize) -> Result<Vec<Recommendation>> {
        let pool = self.candidate_pool;
        self.store.read(|view| recommend_in(view, user_id, limit, pool))
    }
}
