//! Listening-graph analytics: who listens to what, who tagged what, who knows
//! whom, and what follows from it.
//!
//! The graph is kept in a [`store::GraphStore`]. On top of it sit the
//! derivation engines, none of which keep any state between calls:
//!
//! - [`similarity`] - shared-artist similarity between users
//! - [`recommend`] - unheard artists scored by similar users' listen weights
//! - [`popularity`] - artist, tag and user rankings
//! - [`search`] - artists carrying every one of a set of tags
//! - [`friends`] - the directed friendship edges, queried as undirected
//!
//! ### Supporting Modules
//!
//! - [`catalog`] - record-level create/read/update/delete with cascades
//! - [`stats`] - global, per-user and per-artist summaries
//! - [`config`] - data directory and `config.json` settings
//! - [`cli`] / [`completion`] - the `tastegraph` command line
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use tastegraph::catalog::Catalog;
//! use tastegraph::model::NewArtist;
//! use tastegraph::recommend::RecommendationEngine;
//! use tastegraph::store::SqliteGraphStore;
//!
//! let store = SqliteGraphStore::open_in_memory()?;
//! let catalog = Catalog::new(&store);
//! let low = catalog.create_artist(&NewArtist::named("Low"))?;
//! let can = catalog.create_artist(&NewArtist::named("Can"))?;
//! catalog.set_listen(1, low.id, 40)?;
//! catalog.set_listen(2, low.id, 12)?;
//! catalog.set_listen(2, can.id, 30)?;
//!
//! for rec in RecommendationEngine::new(&store).recommend(1, 10)? {
//!     println!("{} ({})", rec.name, rec.score);
//! }
//! # Ok::<(), tastegraph::GraphError>(())
//! ```
//!
//! ## Error Handling
//!
//! Library functions return [`Result`] with a [`GraphError`]; the binary and
//! the configuration layer use `anyhow` for context.

pub mod calendar;
pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod friends;
pub mod model;
pub mod popularity;
pub mod ranking;
pub mod recommend;
pub mod search;
pub mod similarity;
pub mod stats;
pub mod store;

#[cfg(test)]
mod test_support;

pub use error::{GraphError, Result};
pub use store::{GraphRead, GraphStore, GraphWrite, SqliteGraphStore};
