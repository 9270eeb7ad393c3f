//! # Integration Tests for tastegraph
//!
//! End-to-end tests against a file-backed store: the documented scenarios,
//! cross-engine properties, cascades, concurrent access and the binary.

use anyhow::Result;
use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

use tastegraph::catalog::Catalog;
use tastegraph::friends::FriendshipGraph;
use tastegraph::model::{ArtistId, NewArtist, Table, TagAssignmentFilter, UserId};
use tastegraph::popularity::PopularityAggregator;
use tastegraph::recommend::RecommendationEngine;
use tastegraph::search::TagSearchEngine;
use tastegraph::similarity::SimilarityEngine;
use tastegraph::{GraphError, GraphStore, SqliteGraphStore};

/// A fresh database file inside a temporary directory.
fn create_test_store() -> Result<(TempDir, SqliteGraphStore)> {
    let temp_dir = TempDir::new()?;
    let store = SqliteGraphStore::open(&temp_dir.path().join("graph.db"))?;
    Ok((temp_dir, store))
}

/// Artists A, B, C and listens (1,A,10) (1,B,5) (2,A,8) (2,C,3) (3,B,7).
fn seed_listens(store: &SqliteGraphStore) -> Result<[ArtistId; 3]> {
    let catalog = Catalog::new(store);
    let a = catalog.create_artist(&NewArtist::named("A"))?.id;
    let b = catalog.create_artist(&NewArtist::named("B"))?.id;
    let c = catalog.create_artist(&NewArtist::named("C"))?.id;
    for (user, artist, weight) in [(1, a, 10), (1, b, 5), (2, a, 8), (2, c, 3), (3, b, 7)] {
        catalog.set_listen(user, artist, weight)?;
    }
    Ok([a, b, c])
}

fn references_to_artist(store: &SqliteGraphStore, artist_id: ArtistId) -> Result<usize> {
    Ok(store.read(|view| {
        Ok(view.listens(None, Some(artist_id))?.len()
            + view
                .tag_assignments(&TagAssignmentFilter::for_artist(artist_id))?
                .len())
    })?)
}

mod scenario_tests {
    use super::*;

    #[test]
    fn test_similarity_scenario() -> Result<()> {
        let (_dir, store) = create_test_store()?;
        seed_listens(&store)?;
        let similar: Vec<(UserId, u64)> = SimilarityEngine::new(&store)
            .similar_users(1, 5)?
            .into_iter()
            .map(|s| (s.user_id, s.common_artists))
            .collect();
        // User 2 shares A and user 3 shares B, one artist each.
        assert_eq!(similar, vec![(2, 1), (3, 1)]);
        Ok(())
    }

    #[test]
    fn test_recommendation_scenario() -> Result<()> {
        let (_dir, store) = create_test_store()?;
        let [_, _, c] = seed_listens(&store)?;
        let recs = RecommendationEngine::new(&store).recommend(1, 5)?;
        assert_eq!(recs.len(), 1);
        assert_eq!((recs[0].artist_id, recs[0].name.as_str(), recs[0].score), (c, "C", 3));
        Ok(())
    }

    #[test]
    fn test_tag_search_scenario() -> Result<()> {
        let (_dir, store) = create_test_store()?;
        let [a, b, _] = seed_listens(&store)?;
        let catalog = Catalog::new(&store);
        let rock = catalog.create_tag("rock")?.tag_id;
        let indie = catalog.create_tag("indie")?.tag_id;
        catalog.tag_artist(1, a, rock, Some(1_000))?;
        catalog.tag_artist(2, a, indie, Some(2_000))?;
        catalog.tag_artist(1, b, rock, Some(3_000))?;

        let search = TagSearchEngine::new(&store);
        let ids = |tags: &[&str]| -> Result<Vec<ArtistId>> {
            Ok(search.artists_with_all_tags(tags, 0, 100)?.into_iter().map(|a| a.id).collect())
        };
        assert_eq!(ids(&["rock"])?, vec![a, b]);
        assert_eq!(ids(&["rock", "indie"])?, vec![a]);
        assert_eq!(ids(&["ROCK", "Indie"])?, vec![a]);
        Ok(())
    }
}

mod property_tests {
    use super::*;

    #[test]
    fn test_bidirectional_friendship_is_symmetric() -> Result<()> {
        let (_dir, store) = create_test_store()?;
        let friends = FriendshipGraph::new(&store);
        let pairs = [(1, 2), (2, 5), (7, 3)];
        for (u, v) in pairs {
            friends.create(u, v, true)?;
        }
        for (u, v) in pairs {
            assert!(friends.are_friends(u, v)? && friends.are_friends(v, u)?);
        }
        for (u, v) in pairs {
            friends.delete(u, v, true)?;
            assert!(!friends.are_friends(u, v)? && !friends.are_friends(v, u)?);
        }
        Ok(())
    }

    #[test]
    fn test_similarity_score_is_symmetric() -> Result<()> {
        let (_dir, store) = create_test_store()?;
        seed_listens(&store)?;
        let engine = SimilarityEngine::new(&store);
        for u in 1..=4 {
            for v in 1..=4 {
                assert_eq!(engine.score(u, v)?, engine.score(v, u)?);
            }
        }
        Ok(())
    }

    #[test]
    fn test_recommendations_exclude_heard_artists() -> Result<()> {
        let (_dir, store) = create_test_store()?;
        seed_listens(&store)?;
        let catalog = Catalog::new(&store);
        let engine = RecommendationEngine::new(&store);
        for user in 1..=3 {
            let heard: BTreeSet<ArtistId> =
                catalog.user_artists(user, 0, 100)?.into_iter().map(|l| l.artist_id).collect();
            for rec in engine.recommend(user, 10)? {
                assert!(!heard.contains(&rec.artist_id));
            }
        }
        Ok(())
    }

    #[test]
    fn test_popularity_tracks_listen_deltas() -> Result<()> {
        let (_dir, store) = create_test_store()?;
        let [a, _, c] = seed_listens(&store)?;
        let catalog = Catalog::new(&store);
        let popularity = PopularityAggregator::new(&store);
        let total = |artist: ArtistId| -> Result<i64> {
            Ok(popularity
                .popular_artists(100)?
                .into_iter()
                .find(|p| p.artist_id == artist)
                .map_or(0, |p| p.total_weight))
        };

        let before = total(c)?;
        catalog.set_listen(3, c, 9)?;
        assert_eq!(total(c)?, before + 9);

        let before = total(a)?;
        catalog.set_listen(1, a, 4)?;
        assert_eq!(total(a)?, before + (4 - 10));
        Ok(())
    }

    #[test]
    fn test_tag_search_shrinks_monotonically() -> Result<()> {
        let (_dir, store) = create_test_store()?;
        let catalog = Catalog::new(&store);
        let values = ["rock", "indie", "shoegaze", "dream pop"];
        let mut tag_ids = Vec::new();
        for value in values {
            tag_ids.push(catalog.create_tag(value)?.tag_id);
        }
        // Artist i carries the first i+1 tags.
        for i in 0..values.len() {
            let artist = catalog.create_artist(&NewArtist::named(format!("band {i}")))?.id;
            for tag in &tag_ids[..=i] {
                catalog.tag_artist(1, artist, *tag, Some(i as i64))?;
            }
        }

        let search = TagSearchEngine::new(&store);
        let mut previous: Option<BTreeSet<ArtistId>> = None;
        for n in 1..=values.len() {
            let current: BTreeSet<ArtistId> = search
                .artists_with_all_tags(&values[..n], 0, 100)?
                .into_iter()
                .map(|a| a.id)
                .collect();
            assert_eq!(current.len(), values.len() - n + 1);
            if let Some(previous) = &previous {
                assert!(current.is_subset(previous));
            }
            previous = Some(current);
        }
        Ok(())
    }

    #[test]
    fn test_deleting_artist_leaves_no_references() -> Result<()> {
        let (_dir, store) = create_test_store()?;
        let [a, b, _] = seed_listens(&store)?;
        let catalog = Catalog::new(&store);
        let tag = catalog.create_tag("slowcore")?.tag_id;
        catalog.tag_artist(1, a, tag, Some(5))?;
        catalog.tag_artist(2, a, tag, Some(6))?;
        catalog.tag_artist(2, b, tag, Some(7))?;

        catalog.delete_artist(a)?;
        assert_eq!(references_to_artist(&store, a)?, 0);
        assert!(references_to_artist(&store, b)? > 0);
        Ok(())
    }

    #[test]
    fn test_deleting_user_removes_both_friendship_directions() -> Result<()> {
        let (_dir, store) = create_test_store()?;
        seed_listens(&store)?;
        let friends = FriendshipGraph::new(&store);
        friends.create(1, 2, true)?;
        friends.create(3, 1, false)?;

        Catalog::new(&store).delete_user(1)?;
        assert!(friends.friends_of(2)?.is_empty());
        assert!(friends.friends_of(3)?.is_empty());
        let listens = store.read(|view| view.listens(Some(1), None))?;
        assert!(listens.is_empty());
        Ok(())
    }
}

mod persistence_tests {
    use super::*;

    #[test]
    fn test_data_survives_reopen() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("graph.db");
        {
            let store = SqliteGraphStore::open(&path)?;
            seed_listens(&store)?;
        }
        let store = SqliteGraphStore::open(&path)?;
        let counts = store.read(|view| Ok((view.count(Table::Users)?, view.count(Table::Listens)?)))?;
        assert_eq!(counts, (3, 5));
        Ok(())
    }

    #[test]
    fn test_errors_surface_as_typed_variants() -> Result<()> {
        let (_dir, store) = create_test_store()?;
        let catalog = Catalog::new(&store);
        assert!(matches!(catalog.set_listen(1, 404, 1), Err(GraphError::NotFound(_))));
        assert!(matches!(
            FriendshipGraph::new(&store).create(2, 2, true),
            Err(GraphError::SelfReference(2))
        ));
        assert!(matches!(
            TagSearchEngine::new(&store).artists_with_all_tags::<&str>(&[], 0, 10),
            Err(GraphError::InvalidArgument(_))
        ));
        Ok(())
    }
}

mod concurrency_tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_queries_run_alongside_cascading_deletes() -> Result<()> {
        let (_dir, store) = create_test_store()?;
        let store = Arc::new(store);
        let catalog = Catalog::new(store.as_ref());
        let artists: Vec<ArtistId> = (0..20)
            .map(|i| catalog.create_artist(&NewArtist::named(format!("artist {i}"))).map(|a| a.id))
            .collect::<Result<_, _>>()?;
        for user in 1..=10 {
            for (i, artist) in artists.iter().enumerate() {
                if (i as i64 + user) % 3 != 0 {
                    catalog.set_listen(user, *artist, user * 10 + i as i64)?;
                }
            }
        }

        let writer = {
            let store = Arc::clone(&store);
            let doomed = artists[..10].to_vec();
            thread::spawn(move || -> tastegraph::Result<()> {
                let catalog = Catalog::new(store.as_ref());
                for artist in doomed {
                    catalog.delete_artist(artist)?;
                }
                Ok(())
            })
        };

        let readers: Vec<_> = (1..=4)
            .map(|user| {
                let store = Arc::clone(&store);
                thread::spawn(move || -> tastegraph::Result<()> {
                    for _ in 0..20 {
                        // Every recommended artist must still resolve to a record.
                        let recs = RecommendationEngine::new(store.as_ref()).recommend(user, 5)?;
                        assert!(recs.iter().all(|r| !r.name.is_empty()));
                        PopularityAggregator::new(store.as_ref()).popular_artists(5)?;
                        SimilarityEngine::new(store.as_ref()).similar_users(user, 5)?;
                    }
                    Ok(())
                })
            })
            .collect();

        writer.join().expect("writer thread panicked")?;
        for reader in readers {
            reader.join().expect("reader thread panicked")?;
        }

        for artist in &artists[..10] {
            assert_eq!(references_to_artist(&store, *artist)?, 0);
        }
        Ok(())
    }
}

mod cli_tests {
    use super::*;

    fn tastegraph(db: &Path, args: &[&str]) -> std::process::Output {
        Command::new(env!("CARGO_BIN_EXE_tastegraph"))
            .arg("--db")
            .arg(db)
            .args(args)
            .output()
            .expect("Failed to run tastegraph")
    }

    #[test]
    fn test_cli_help_displays_correctly() {
        let output = Command::new(env!("CARGO_BIN_EXE_tastegraph"))
            .arg("--help")
            .output()
            .expect("Failed to run help command");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success());
        assert!(stdout.contains("recommend"));
        assert!(stdout.contains("search"));
    }

    #[test]
    fn test_completion_generation() {
        let output = Command::new(env!("CARGO_BIN_EXE_tastegraph"))
            .args(["completion", "bash"])
            .output()
            .expect("Failed to run completion command");
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("tastegraph"));
    }

    #[test]
    fn test_cli_round_trip_through_database() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let db = temp_dir.path().join("cli.db");

        assert!(tastegraph(&db, &["artist", "create", "Low", "--id", "1"]).status.success());
        assert!(tastegraph(&db, &["artist", "create", "Can", "--id", "2"]).status.success());
        assert!(tastegraph(&db, &["listen", "set", "1", "1", "10"]).status.success());
        assert!(tastegraph(&db, &["listen", "set", "2", "1", "4"]).status.success());
        assert!(tastegraph(&db, &["listen", "set", "2", "2", "7"]).status.success());

        let output = tastegraph(&db, &["recommend", "1", "--json"]);
        assert!(output.status.success());
        let recs: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(recs[0]["artist_id"], 2);
        assert_eq!(recs[0]["score"], 7);

        let missing = tastegraph(&db, &["listen", "set", "1", "99", "1"]);
        assert!(!missing.status.success());
        assert!(String::from_utf8_lossy(&missing.stderr).contains("not found"));
        Ok(())
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_db_flag_bypasses_unusable_data_dir() -> Result<()> {
        let temp_dir = TempDir::new()?;
        // A regular file where the data directory's parent should be.
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "")?;
        let data_home = blocker.join("data");
        let db = temp_dir.path().join("explicit.db");

        let run = |with_db: bool| {
            let mut command = Command::new(env!("CARGO_BIN_EXE_tastegraph"));
            command
                .env("HOME", &blocker)
                .env("XDG_DATA_HOME", &data_home)
                .env_remove("TASTEGRAPH_DB");
            if with_db {
                command.arg("--db").arg(&db);
            }
            command.arg("stats").output().expect("Failed to run tastegraph")
        };

        let output = run(true);
        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        assert!(db.exists());

        assert!(!run(false).status.success());
        Ok(())
    }
}
