//! Multi-tag artist search.
//!
//! An artist matches a tag value when anyone tagged it with a tag whose value
//! equals it, ignoring case. Searching for several values intersects the
//! per-value artist sets, so adding a value can only shrink the result.

use crate::error::{GraphError, Result};
use crate::model::{Artist, ArtistId, TagAssignmentFilter};
use crate::store::{GraphRead, GraphStore};
use log::{debug, warn};
use std::collections::BTreeSet;

/// Artist ids tagged with `tag_value` by anyone.
fn artists_tagged_in<V: GraphRead + ?Sized>(view: &V, tag_value: &str) -> Result<BTreeSet<ArtistId>> {
    let mut artists = BTreeSet::new();
    for tag in view.tags_by_value(tag_value)? {
        artists.extend(
            view.tag_assignments(&TagAssignmentFilter::for_tag(tag.tag_id))?
                .into_iter()
                .map(|assignment| assignment.artist_id),
        );
    }
    Ok(artists)
}

/// Artists carrying every value in `tag_values`, by ascending id, paginated.
///
/// # Errors
///
/// `InvalidArgument` when `tag_values` is empty.
pub fn artists_with_all_tags_in<V: GraphRead + ?Sized, T: AsRef<str>>(
    view: &V,
    tag_values: &[T],
    skip: usize,
    limit: usize,
) -> Result<Vec<Artist>> {
    let Some((first, rest)) = tag_values.split_first() else {
        return Err(GraphError::invalid("at least one tag value is required"));
    };

    let mut matching = artists_tagged_in(view, first.as_ref())?;
    for tag_value in rest {
        if matching.is_empty() {
            break;
        }
        let tagged = artists_tagged_in(view, tag_value.as_ref())?;
        matching.retain(|artist_id| tagged.contains(artist_id));
    }
    debug!("{} artists carry all of {} tag values", matching.len(), tag_values.len());

    let mut artists = Vec::new();
    for artist_id in matching.into_iter().skip(skip).take(limit) {
        match view.artist(artist_id)? {
            Some(artist) => artists.push(artist),
            None => warn!("Tag assignment references missing artist {artist_id}"),
        }
    }
    Ok(artists)
}

/// Tag search, answered from one snapshot of the store.
#[derive(Debug)]
pub struct TagSearchEngine<'a, S: GraphStore> {
    store: &'a S,
}

impl<'a, S: GraphStore> TagSearchEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn artists_with_all_tags<T: AsRef<str>>(
        &self,
        tag_values: &[T],
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Artist>> {
        self.store
            .read(|view| artists_with_all_tags_in(view, tag_values, skip, limit))
    }

    /// Single-value search.
    pub fn artists_by_tag(&self, tag_value: &str, skip: usize, limit: usize) -> Result<Vec<Artist>> {
        self.artists_with_all_tags(&[tag_value], skip, limit)
    }
}
