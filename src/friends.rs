//! Friendship graph.
//!
//! Storage keeps directed edges; a "bidirectional" friendship is simply both
//! edges. Queries treat the relation as undirected: two users are friends when
//! an edge exists in either direction, so asymmetric states left behind by a
//! one-way create or delete are tolerated everywhere.

use crate::error::{GraphError, Result};
use crate::model::{Friendship, UserId};
use crate::store::{GraphRead, GraphStore};
use log::debug;
use std::collections::BTreeSet;

/// Undirected "are friends" over one read view.
pub fn are_friends_in<V: GraphRead + ?Sized>(view: &V, user_id: UserId, other_id: UserId) -> Result<bool> {
    Ok(view.friendship_exists(Friendship { user_id, friend_id: other_id })?
        || view.friendship_exists(Friendship { user_id: other_id, friend_id: user_id })?)
}

/// Deduplicated union of outgoing and incoming edges, ascending.
pub fn friends_of_in<V: GraphRead + ?Sized>(view: &V, user_id: UserId) -> Result<Vec<UserId>> {
    let friends: BTreeSet<UserId> = view
        .friendship_edges(Some(user_id))?
        .into_iter()
        .map(|edge| {
            if edge.user_id == user_id {
                edge.friend_id
            } else {
                edge.user_id
            }
        })
        .collect();
    Ok(friends.into_iter().collect())
}

/// Friendship operations on top of a [`GraphStore`].
#[derive(Debug)]
pub struct FriendshipGraph<'a, S: GraphStore> {
    store: &'a S,
}

impl<'a, S: GraphStore> FriendshipGraph<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create the edge `(user_id, friend_id)`, plus `(friend_id, user_id)` when
    /// `bidirectional`. Both users are created if they do not exist yet.
    ///
    /// # Errors
    ///
    /// `SelfReference` when both ids are equal, `AlreadyExists` when the two
    /// users are already friends in either direction.
    pub fn create(&self, user_id: UserId, friend_id: UserId, bidirectional: bool) -> Result<Friendship> {
        if user_id == friend_id {
            return Err(GraphError::SelfReference(user_id));
        }
        crate::catalog::validate_user_id(user_id)?;
        crate::catalog::validate_user_id(friend_id)?;

        self.store.write(|tx| {
            if are_friends_in(tx, user_id, friend_id)? {
                return Err(GraphError::AlreadyExists(format!(
                    "friendship between {user_id} and {friend_id}"
                )));
            }
            tx.insert_user(user_id)?;
            tx.insert_user(friend_id)?;

            let edge = Friendship { user_id, friend_id };
            tx.insert_friendship_edge(edge)?;
            if bidirectional {
                tx.insert_friendship_edge(Friendship { user_id: friend_id, friend_id: user_id })?;
            }
            debug!("Created friendship {user_id} -> {friend_id} (bidirectional: {bidirectional})");
            Ok(edge)
        })
    }

    /// Delete `(user_id, friend_id)`, plus the reverse edge when
    /// `bidirectional`. Returns how many edges were removed, at least one.
    ///
    /// # Errors
    ///
    /// `NotFound` when no edge was removed.
    pub fn delete(&self, user_id: UserId, friend_id: UserId, bidirectional: bool) -> Result<usize> {
        self.store.write(|tx| {
            let mut removed = usize::from(tx.delete_friendship_edge(Friendship { user_id, friend_id })?);
            if bidirectional {
                removed += usize::from(
                    tx.delete_friendship_edge(Friendship { user_id: friend_id, friend_id: user_id })?,
                );
            }
            if removed == 0 {
                return Err(GraphError::not_found(format!(
                    "friendship between {user_id} and {friend_id}"
                )));
            }
            debug!("Removed {removed} friendship edge(s) between {user_id} and {friend_id}");
            Ok(removed)
        })
    }

    pub fn are_friends(&self, user_id: UserId, other_id: UserId) -> Result<bool> {
        self.store.read(|view| are_friends_in(view, user_id, other_id))
    }

    pub fn friends_of(&self, user_id: UserId) -> Result<Vec<UserId>> {
        self.store.read(|view| friends_of_in(view, user_id))
    }
}
