//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `tastegraph` binary. Record-level commands
//! are grouped per entity (`user`, `artist`, `tag`, `listen`, `tagging`,
//! `friend`); the analytic queries are top-level commands.
//!
//! ## Examples
//!
//! ```bash
//! tastegraph artist create "Boards of Canada"
//! tastegraph listen set 1 1 120
//! tastegraph similar 1 --limit 5
//! tastegraph recommend 1 --json
//! tastegraph search rock indie
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Which popularity ranking to print.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum Ranking {
    /// Artists by summed listen weight
    Artists,
    /// Tags by number of assignments
    Tags,
    /// Users by number of distinct artists
    Users,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "tastegraph")]
#[command(about = "tastegraph: listening graph analytics - similar users, recommendations, rankings")]
#[command(version)]
pub struct Args {
    /// Database file to use instead of the one in the data directory
    #[arg(long, global = true, env = "TASTEGRAPH_DB")]
    pub db: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage artists
    Artist {
        #[command(subcommand)]
        action: ArtistAction,
    },

    /// Manage tags
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },

    /// Manage listen edges (user -> artist with a play-count weight)
    Listen {
        #[command(subcommand)]
        action: ListenAction,
    },

    /// Manage tag assignments (user tagged artist with tag at a time)
    Tagging {
        #[command(subcommand)]
        action: TaggingAction,
    },

    /// Manage friendships
    Friend {
        #[command(subcommand)]
        action: FriendAction,
    },

    /// Users sharing the most artists with USER
    ///
    /// Ranked by the number of artists both users listened to, ties broken by
    /// ascending user id. Users sharing nothing are left out.
    Similar {
        user: i64,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Number of artists two users both listened to
    Score { user: i64, other: i64 },

    /// Artists USER has not heard, scored by similar users' listen weights
    Recommend {
        user: i64,

        #[arg(short, long)]
        limit: Option<usize>,

        /// Similar users to draw candidates from (overrides config)
        #[arg(long, value_parser = parse_candidate_pool)]
        candidate_pool: Option<usize>,
    },

    /// Global rankings
    Popular {
        #[arg(value_enum)]
        ranking: Ranking,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Artists tagged with every given value (case-insensitive)
    Search {
        #[arg(required = true, num_args = 1..)]
        tags: Vec<String>,

        #[arg(long, default_value_t = 0)]
        skip: usize,

        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Summary statistics for the whole graph, one user or one artist
    Stats {
        #[arg(long, conflicts_with = "artist")]
        user: Option<i64>,

        #[arg(long)]
        artist: Option<i64>,
    },

    /// Generate shell completions
    ///
    /// Usage: tastegraph completion bash > ~/.local/share/bash-completion/completions/tastegraph
    Completion { shell: Shell },
}

#[derive(Subcommand, Debug)]
pub enum UserAction {
    /// Create a user (no-op if it exists)
    Create { id: i64 },
    Get { id: i64 },
    List {
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Delete a user with all its listens, tag assignments and friendships
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum ArtistAction {
    Create {
        name: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        picture_url: Option<String>,
        /// Explicit id; assigned automatically when omitted
        #[arg(long)]
        id: Option<i64>,
    },
    Get { id: i64 },
    /// Look an artist up by exact name, ignoring case
    Find { name: String },
    List {
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(short, long)]
        limit: Option<usize>,
        /// Only names containing this text (case-insensitive)
        #[arg(long)]
        name: Option<String>,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        picture_url: Option<String>,
    },
    /// Delete an artist with its listens and tag assignments
    Delete { id: i64 },
    /// Users listening to the artist, heaviest first
    Listeners {
        id: i64,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Tags most used on the artist
    TopTags {
        id: i64,
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TagAction {
    /// Create a tag, or return the existing one with the same value
    Create { value: String },
    Get { id: i64 },
    /// Look a tag up by value, ignoring case
    Find { value: String },
    List {
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    Update { id: i64, value: String },
    /// Delete a tag with its assignments
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum ListenAction {
    /// Set the weight of a listen, creating it if needed
    Set { user: i64, artist: i64, weight: i64 },
    /// Add to the weight of a listen
    Add {
        user: i64,
        artist: i64,
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },
    Get { user: i64, artist: i64 },
    Delete { user: i64, artist: i64 },
    /// Artists a user listened to, heaviest first
    List {
        user: i64,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaggingAction {
    /// Record that USER tagged ARTIST with TAG
    Add {
        user: i64,
        artist: i64,
        tag: i64,
        /// Milliseconds since the Unix epoch; defaults to now
        #[arg(long, allow_negative_numbers = true)]
        timestamp: Option<i64>,
    },
    List {
        #[arg(long)]
        user: Option<i64>,
        #[arg(long)]
        artist: Option<i64>,
        #[arg(long)]
        tag: Option<i64>,
        /// Inclusive lower bound in milliseconds
        #[arg(long, allow_negative_numbers = true)]
        since: Option<i64>,
        /// Inclusive upper bound in milliseconds
        #[arg(long, allow_negative_numbers = true)]
        until: Option<i64>,
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Delete one assignment by its full key
    Delete {
        user: i64,
        artist: i64,
        tag: i64,
        #[arg(allow_negative_numbers = true)]
        timestamp: i64,
    },
    /// Delete every assignment USER made on ARTIST
    Clear { user: i64, artist: i64 },
}

#[derive(Subcommand, Debug)]
pub enum FriendAction {
    /// Befriend two users (both directions unless --one-way)
    Add {
        user: i64,
        friend: i64,
        #[arg(long)]
        one_way: bool,
    },
    /// Remove a friendship (both directions unless --one-way)
    Remove {
        user: i64,
        friend: i64,
        #[arg(long)]
        one_way: bool,
    },
    /// Whether two users are friends in either direction
    Check { user: i64, other: i64 },
    List { user: i64 },
}

fn parse_candidate_pool(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("candidate pool must be at least 1".to_string()),
        Ok(pool) => Ok(pool),
        Err(e) => Err(e.to_string()),
    }
}
