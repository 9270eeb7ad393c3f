//! `tastegraph` binary: parses the command line, opens the graph store and
//! routes each command to the matching engine.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::debug;
use serde::Serialize;

use tastegraph::catalog::Catalog;
use tastegraph::cli::{
    self, ArtistAction, Command, FriendAction, ListenAction, Ranking, TagAction, TaggingAction,
    UserAction,
};
use tastegraph::completion;
use tastegraph::config::RuntimeConfig;
use tastegraph::friends::FriendshipGraph;
use tastegraph::model::{Artist, ArtistUpdate, Listen, NewArtist, Tag, TagAssignmentFilter};
use tastegraph::popularity::PopularityAggregator;
use tastegraph::recommend::RecommendationEngine;
use tastegraph::search::TagSearchEngine;
use tastegraph::similarity::SimilarityEngine;
use tastegraph::stats::StatisticsService;
use tastegraph::store::SqliteGraphStore;

/// Prints `value` as pretty JSON when `json` is set, otherwise through `render`.
fn emit<T: Serialize + ?Sized>(json: bool, value: &T, render: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        render(value);
    }
    Ok(())
}

fn print_artist(artist: &Artist) {
    print!("{:>6}  {}", artist.id, artist.name);
    if let Some(url) = &artist.url {
        print!("  <{url}>");
    }
    println!();
}

fn print_artists(artists: &[Artist]) {
    if artists.is_empty() {
        println!("No artists.");
    }
    artists.iter().for_each(print_artist);
}

fn print_tag(tag: &Tag) {
    println!("{:>6}  {}", tag.tag_id, tag.tag_value);
}

fn print_listens(listens: &[Listen]) {
    if listens.is_empty() {
        println!("No listens.");
    }
    for listen in listens {
        println!(
            "user {:>6}  artist {:>6}  weight {}",
            listen.user_id, listen.artist_id, listen.weight
        );
    }
}

/// Main entry point.
///
/// Logging is controlled via `RUST_LOG`, e.g.
/// `RUST_LOG=tastegraph::recommend=debug tastegraph recommend 1`.
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();
    let json = args.json;

    // Completions never touch the database.
    if let Command::Completion { shell } = &args.command {
        completion::generate_completions(
            completion::shell_to_completion_shell(shell),
            &mut cli::Args::command(),
        );
        return Ok(());
    }

    let mut config = RuntimeConfig::load()?;
    if let Some(db) = args.db {
        config = config.with_db_path(db);
    }
    debug!("Runtime config: {config:?}");

    let db_path = config.database_path()?;
    let store = SqliteGraphStore::open(&db_path)
        .with_context(|| format!("Failed to open graph store at {}", db_path.display()))?;
    let catalog = Catalog::new(&store).with_max_page_size(config.max_page_size);
    let limit_or_default = |limit: Option<usize>| limit.unwrap_or(config.default_limit);

    match args.command {
        Command::User { action } => match action {
            UserAction::Create { id } => {
                let user = catalog.create_user(id)?;
                emit(json, &user, |u| println!("User {}", u.user_id))?;
            }
            UserAction::Get { id } => {
                let user = catalog.get_user(id)?;
                emit(json, &user, |u| println!("User {}", u.user_id))?;
            }
            UserAction::List { skip, limit } => {
                let users = catalog.list_users(skip, limit_or_default(limit))?;
                emit(json, &users, |users| {
                    users.iter().for_each(|u| println!("{}", u.user_id));
                })?;
            }
            UserAction::Delete { id } => {
                catalog.delete_user(id)?;
                println!("Deleted user {id}");
            }
        },

        Command::Artist { action } => match action {
            ArtistAction::Create { name, url, picture_url, id } => {
                let artist = catalog.create_artist(&NewArtist { id, name, url, picture_url })?;
                emit(json, &artist, print_artist)?;
            }
            ArtistAction::Get { id } => emit(json, &catalog.get_artist(id)?, print_artist)?,
            ArtistAction::Find { name } => emit(json, &catalog.get_artist_by_name(&name)?, print_artist)?,
            ArtistAction::List { skip, limit, name } => {
                let artists = catalog.list_artists(skip, limit_or_default(limit), name.as_deref())?;
                emit(json, artists.as_slice(), print_artists)?;
            }
            ArtistAction::Update { id, name, url, picture_url } => {
                let artist = catalog.update_artist(id, &ArtistUpdate { name, url, picture_url })?;
                emit(json, &artist, print_artist)?;
            }
            ArtistAction::Delete { id } => {
                catalog.delete_artist(id)?;
                println!("Deleted artist {id}");
            }
            ArtistAction::Listeners { id, skip, limit } => {
                let listens = catalog.artist_listeners(id, skip, limit_or_default(limit))?;
                emit(json, listens.as_slice(), print_listens)?;
            }
            ArtistAction::TopTags { id, limit } => {
                let tags = StatisticsService::new(&store).artist_top_tags(id, limit_or_default(limit))?;
                emit(json, tags.as_slice(), |tags| {
                    for tag in tags {
                        println!("{:>6}  {:<24} {}", tag.tag_id, tag.tag_value, tag.usage_count);
                    }
                })?;
            }
        },

        Command::Tag { action } => match action {
            TagAction::Create { value } => emit(json, &catalog.create_tag(&value)?, print_tag)?,
            TagAction::Get { id } => emit(json, &catalog.get_tag(id)?, print_tag)?,
            TagAction::Find { value } => emit(json, &catalog.get_tag_by_value(&value)?, print_tag)?,
            TagAction::List { skip, limit } => {
                let tags = catalog.list_tags(skip, limit_or_default(limit))?;
                emit(json, tags.as_slice(), |tags| tags.iter().for_each(print_tag))?;
            }
            TagAction::Update { id, value } => emit(json, &catalog.update_tag(id, &value)?, print_tag)?,
            TagAction::Delete { id } => {
                catalog.delete_tag(id)?;
                println!("Deleted tag {id}");
            }
        },

        Command::Listen { action } => match action {
            ListenAction::Set { user, artist, weight } => {
                let listen = catalog.set_listen(user, artist, weight)?;
                emit(json, &listen, |l| print_listens(std::slice::from_ref(l)))?;
            }
            ListenAction::Add { user, artist, delta } => {
                let listen = catalog.increment_listen(user, artist, delta)?;
                emit(json, &listen, |l| print_listens(std::slice::from_ref(l)))?;
            }
            ListenAction::Get { user, artist } => {
                let listen = catalog.get_listen(user, artist)?;
                emit(json, &listen, |l| print_listens(std::slice::from_ref(l)))?;
            }
            ListenAction::Delete { user, artist } => {
                catalog.delete_listen(user, artist)?;
                println!("Deleted listen {user} -> {artist}");
            }
            ListenAction::List { user, skip, limit } => {
                let listens = catalog.user_artists(user, skip, limit_or_default(limit))?;
                emit(json, listens.as_slice(), print_listens)?;
            }
        },

        Command::Tagging { action } => match action {
            TaggingAction::Add { user, artist, tag, timestamp } => {
                let assignment = catalog.tag_artist(user, artist, tag, timestamp)?;
                emit(json, &assignment, |a| {
                    println!("User {} tagged artist {} with tag {} at {}", a.user_id, a.artist_id, a.tag_id, a.timestamp);
                })?;
            }
            TaggingAction::List { user, artist, tag, since, until, skip, limit } => {
                let filter = TagAssignmentFilter {
                    user_id: user,
                    artist_id: artist,
                    tag_id: tag,
                    since,
                    until,
                };
                let assignments = catalog.list_tag_assignments(&filter, skip, limit_or_default(limit))?;
                emit(json, assignments.as_slice(), |assignments| {
                    for a in assignments {
                        let date = a
                            .date
                            .map(|d| format!("{:04}-{:02}-{:02}", d.year, d.month, d.day))
                            .unwrap_or_else(|| "-".to_string());
                        println!(
                            "user {:>6}  artist {:>6}  tag {:>6}  {} ({date})",
                            a.user_id, a.artist_id, a.tag_id, a.timestamp
                        );
                    }
                })?;
            }
            TaggingAction::Delete { user, artist, tag, timestamp } => {
                catalog.delete_tag_assignment(user, artist, tag, timestamp)?;
                println!("Deleted tag assignment");
            }
            TaggingAction::Clear { user, artist } => {
                let removed = catalog.delete_user_tags_for_artist(user, artist)?;
                emit(json, &removed, |n| println!("Removed {n} tag assignments"))?;
            }
        },

        Command::Friend { action } => {
            let friends = FriendshipGraph::new(&store);
            match action {
                FriendAction::Add { user, friend, one_way } => {
                    let edge = friends.create(user, friend, !one_way)?;
                    emit(json, &edge, |e| println!("{} -> {}", e.user_id, e.friend_id))?;
                }
                FriendAction::Remove { user, friend, one_way } => {
                    let removed = friends.delete(user, friend, !one_way)?;
                    emit(json, &removed, |n| println!("Removed {n} friendship edge(s)"))?;
                }
                FriendAction::Check { user, other } => {
                    let are_friends = friends.are_friends(user, other)?;
                    emit(json, &are_friends, |yes| println!("{yes}"))?;
                }
                FriendAction::List { user } => {
                    let list = friends.friends_of(user)?;
                    emit(json, list.as_slice(), |ids| ids.iter().for_each(|id| println!("{id}")))?;
                }
            }
        }

        Command::Similar { user, limit } => {
            let similar = SimilarityEngine::new(&store).similar_users(user, limit_or_default(limit))?;
            emit(json, similar.as_slice(), |similar| {
                if similar.is_empty() {
                    println!("No users share an artist with user {user}.");
                }
                for s in similar {
                    println!("user {:>6}  {} shared artists", s.user_id, s.common_artists);
                }
            })?;
        }

        Command::Score { user, other } => {
            let score = SimilarityEngine::new(&store).score(user, other)?;
            emit(json, &score, |s| println!("{s}"))?;
        }

        Command::Recommend { user, limit, candidate_pool } => {
            let engine = RecommendationEngine::new(&store)
                .with_candidate_pool(candidate_pool.unwrap_or(config.candidate_pool));
            let recommendations = engine.recommend(user, limit_or_default(limit))?;
            emit(json, recommendations.as_slice(), |recs| {
                if recs.is_empty() {
                    println!("Nothing to recommend for user {user}.");
                }
                for r in recs {
                    println!("{:>6}  {:<32} score {}", r.artist_id, r.name, r.score);
                }
            })?;
        }

        Command::Popular { ranking, limit } => {
            let aggregator = PopularityAggregator::new(&store);
            let limit = limit_or_default(limit);
            match ranking {
                Ranking::Artists => {
                    let ranked = aggregator.popular_artists(limit)?;
                    emit(json, ranked.as_slice(), |ranked| {
                        for p in ranked {
                            println!("{:>6}  {:<32} {}", p.artist_id, p.name, p.total_weight);
                        }
                    })?;
                }
                Ranking::Tags => {
                    let ranked = aggregator.popular_tags(limit)?;
                    emit(json, ranked.as_slice(), |ranked| {
                        for t in ranked {
                            println!("{:>6}  {:<32} {}", t.tag_id, t.tag_value, t.usage_count);
                        }
                    })?;
                }
                Ranking::Users => {
                    let ranked = aggregator.active_users(limit)?;
                    emit(json, ranked.as_slice(), |ranked| {
                        for u in ranked {
                            println!("user {:>6}  {} artists", u.user_id, u.artist_count);
                        }
                    })?;
                }
            }
        }

        Command::Search { tags, skip, limit } => {
            let artists = TagSearchEngine::new(&store).artists_with_all_tags(&tags, skip, limit_or_default(limit))?;
            emit(json, artists.as_slice(), print_artists)?;
        }

        Command::Stats { user, artist } => {
            let stats = StatisticsService::new(&store);
            if let Some(user_id) = user {
                let s = stats.user_statistics(user_id)?;
                emit(json, &s, |s| {
                    println!("User {}", s.user_id);
                    println!("  artists listened: {}", s.artists_listened);
                    println!("  tag assignments:  {}", s.tags_created);
                    println!("  friends:          {}", s.friends_count);
                    for l in &s.top_artists {
                        println!("  top artist {:>6}  weight {}", l.artist_id, l.weight);
                    }
                })?;
            } else if let Some(artist_id) = artist {
                let s = stats.artist_statistics(artist_id)?;
                emit(json, &s, |s| {
                    println!("Artist {} ({})", s.artist_id, s.name);
                    println!("  total weight:    {}", s.total_listens);
                    println!("  listeners:       {}", s.listener_count);
                    println!("  tag assignments: {}", s.tags_count);
                    for t in &s.top_tags {
                        println!("  top tag {:<24} {}", t.tag_value, t.usage_count);
                    }
                })?;
            } else {
                let s = stats.global_statistics()?;
                emit(json, &s, |s| {
                    println!("artists:         {}", s.total_artists);
                    println!("users:           {}", s.total_users);
                    println!("tags:            {}", s.total_tags);
                    println!("listens:         {}", s.total_listens);
                    println!("tag assignments: {}", s.total_tagged);
                    println!("friendships:     {}", s.total_friendships);
                })?;
            }
        }

        // Handled above.
        Command::Completion { .. } => {}
    }

    Ok(())
}
