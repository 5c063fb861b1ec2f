//! End-to-end scenarios over an in-memory store: queue, pair, upload,
//! report, finalize, and read the leaderboard the way the view layer
//! would.

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use evo_ladder::{
    catalog::{Catalog, RegionCode},
    commands::{CommandContext, Commands, SetupArgs},
    config::{Config, DatabaseType},
    database::entities::{ActionLog, MatchStatus, RaceCode, Rating, ReportedResult},
    database::migration::Migrator,
    errors::LadderError,
    services::{
        data::{DataLayer, MONTHLY_ABORT_QUOTA},
        events::{EventBus, EventFilter, EventKind},
        leaderboard::models::QueryFilters,
        leaderboard::Leaderboard,
        lifecycle::Lifecycle,
        matchmaking::Matchmaking,
        replays::{MpqHeaderParser, Replays},
        rating::RankTier,
        storage::ObjectStore,
    },
    utils::types::{MatchId, PlayerId},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

struct Harness {
    db: DatabaseConnection,
    data: Arc<DataLayer>,
    bus: Arc<EventBus>,
    matchmaking: Arc<Matchmaking>,
    lifecycle: Arc<Lifecycle>,
    leaderboard: Arc<Leaderboard>,
    replays: Arc<Replays>,
    commands: Commands,
    _data_dir: std::path::PathBuf,
}

fn test_config(data_dir: std::path::PathBuf) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        database_type: DatabaseType::Sqlite,
        worker_processes: 2,
        global_timeout: Duration::from_secs(900),
        data_dir,
        logging: log::LevelFilter::Off,
        supabase: None,
        activation_code: None,
        name_alphabet: Default::default(),
        wave_period: Duration::from_secs(45),
        match_timeout: Duration::from_secs(3600),
        leaderboard_refresh: Duration::from_secs(60),
    }
}

async fn harness() -> Harness {
    harness_with(|_| {}).await
}

async fn harness_with(tweak: impl FnOnce(&mut Catalog)) -> Harness {
    let mut options = sea_orm::ConnectOptions::new("sqlite::memory:".to_string());
    // A pooled in-memory sqlite would hand every connection its own
    // empty database
    options.max_connections(1);
    let db = sea_orm::Database::connect(options)
        .await
        .expect("connect in-memory sqlite");
    Migrator::up(&db, None).await.expect("run migrations");

    let data_dir = std::env::temp_dir().join(format!(
        "evo-ladder-test-{}-{}",
        std::process::id(),
        rand::random::<u64>()
    ));
    std::fs::create_dir_all(&data_dir).expect("create test data dir");

    let data = DataLayer::new(db.clone(), data_dir.clone())
        .await
        .expect("load data layer");

    let mut catalog = Catalog::builtin();
    tweak(&mut catalog);
    let catalog = Arc::new(catalog);

    let workers = Arc::new(Semaphore::new(2));
    let bus = Arc::new(EventBus::default());
    let leaderboard = Arc::new(Leaderboard::new(data.clone(), workers.clone()));
    let matchmaking = Arc::new(Matchmaking::new(data.clone(), catalog.clone(), bus.clone()));
    let lifecycle = Arc::new(Lifecycle::new(
        data.clone(),
        bus.clone(),
        Duration::from_secs(3600),
    ));
    let replays = Arc::new(Replays::new(
        data.clone(),
        bus.clone(),
        lifecycle.clone(),
        ObjectStore::new(None, &data_dir),
        Arc::new(MpqHeaderParser),
        workers,
    ));
    let commands = Commands::new(
        data.clone(),
        catalog.clone(),
        matchmaking.clone(),
        leaderboard.clone(),
        &test_config(data_dir.clone()),
    );

    Harness {
        db,
        data,
        bus,
        matchmaking,
        lifecycle,
        leaderboard,
        replays,
        commands,
        _data_dir: data_dir,
    }
}

fn ctx(player_id: PlayerId) -> CommandContext {
    CommandContext {
        player_id,
        username: format!("user{player_id}"),
        is_dm: true,
    }
}

/// Walks a player through ToS, setup and activation
fn register(harness: &Harness, id: PlayerId, name: &str, region: RegionCode) {
    let ctx = ctx(id);
    harness
        .commands
        .terms_of_service(&ctx, true)
        .expect("accept tos");
    harness
        .commands
        .setup(
            &ctx,
            SetupArgs {
                display_name: name.to_string(),
                country: Some("KR".to_string()),
                region: Some(region.code().to_string()),
                ..Default::default()
            },
        )
        .expect("complete setup");
    harness.commands.activate(&ctx, "LADDER").expect("activate");
}

fn seed_rating(harness: &Harness, id: PlayerId, race: RaceCode, mmr: i32, games: i32) {
    let mut row = harness.data.rating_or_default(id, race);
    row.mmr = mmr;
    row.games_played = games;
    row.games_won = games;
    harness.data.upsert_rating(row);
}

fn replay_bytes(tag: u8) -> Bytes {
    let mut bytes = b"MPQ\x1b".to_vec();
    bytes.extend_from_slice(&[tag; 64]);
    Bytes::from(bytes)
}

fn queue_terran(harness: &Harness, id: PlayerId) {
    harness
        .commands
        .queue(&ctx(id), vec![RaceCode::BwTerran], Vec::new())
        .expect("enter queue");
}

async fn pair_one(harness: &Harness) -> MatchId {
    let created = harness.matchmaking.tick();
    assert_eq!(created.len(), 1, "expected exactly one pairing");
    created[0]
}

/// S1: two close players pair, upload distinct replays, report
/// matching results and trade rating
#[tokio::test]
async fn test_happy_path() {
    let harness = harness().await;
    register(&harness, 100, "flash", RegionCode::Nae);
    register(&harness, 200, "bisu", RegionCode::Nae);
    seed_rating(&harness, 100, RaceCode::BwTerran, 1500, 3);
    seed_rating(&harness, 200, RaceCode::BwTerran, 1520, 3);

    let sub_1 = harness.bus.subscribe(EventFilter {
        match_id: None,
        participant: Some(100),
    });
    let sub_2 = harness.bus.subscribe(EventFilter {
        match_id: None,
        participant: Some(200),
    });

    queue_terran(&harness, 100);
    queue_terran(&harness, 200);
    let match_id = pair_one(&harness).await;

    // Both views learn about the pairing exactly once
    for sub in [&sub_1, &sub_2] {
        let event = sub.try_recv().expect("match_found missing");
        assert!(matches!(event.kind, EventKind::MatchFound { .. }));
    }

    let row = harness.data.get_match(match_id).expect("match row");
    assert_eq!(row.status, MatchStatus::Pending);
    assert_eq!(row.server, "us-central");
    assert_eq!((row.race_1, row.race_2), (RaceCode::BwTerran, RaceCode::BwTerran));

    harness
        .replays
        .ingest(match_id, 100, "game.SC2Replay", replay_bytes(1))
        .await
        .expect("replay one");
    harness
        .replays
        .ingest(match_id, 200, "game.SC2Replay", replay_bytes(2))
        .await
        .expect("replay two");

    let status = harness
        .lifecycle
        .report_result(match_id, 100, ReportedResult::Win)
        .await
        .expect("first report");
    assert_eq!(status, MatchStatus::Pending);

    let status = harness
        .lifecycle
        .report_result(match_id, 200, ReportedResult::Loss)
        .await
        .expect("second report");
    assert_eq!(status, MatchStatus::Player1Win);

    let row = harness.data.get_match(match_id).expect("match row");
    assert_eq!(row.status, MatchStatus::Player1Win);
    assert_eq!((row.delta_1, row.delta_2), (Some(21), Some(-21)));

    let winner = harness
        .data
        .get_rating(100, RaceCode::BwTerran)
        .expect("winner rating");
    let loser = harness
        .data
        .get_rating(200, RaceCode::BwTerran)
        .expect("loser rating");
    assert_eq!(winner.mmr, 1521);
    assert_eq!(loser.mmr, 1499);
    assert_eq!(winner.games_played, 4);
    assert_eq!(winner.games_won, 4);
    assert_eq!(loser.games_lost, 1);

    // The leaderboard reflects the new order on its next read
    let page = harness
        .leaderboard
        .query(&QueryFilters::default(), 1, 40)
        .await;
    let position_winner = page.rows.iter().position(|r| r.player_id == 100);
    let position_loser = page.rows.iter().position(|r| r.player_id == 200);
    assert!(position_winner < position_loser);

    // Terminal event reached both participants
    for sub in [&sub_1, &sub_2] {
        let mut saw_completed = false;
        while let Some(event) = sub.try_recv() {
            if let EventKind::Completed {
                status,
                delta_1,
                delta_2,
            } = event.kind
            {
                assert_eq!(status, MatchStatus::Player1Win);
                assert_eq!((delta_1, delta_2), (21, -21));
                assert!(!saw_completed, "completed delivered twice");
                saw_completed = true;
            }
        }
        assert!(saw_completed, "completed never delivered");
    }
}

/// S2: both players claim the win; the match conflicts and no rating
/// moves
#[tokio::test]
async fn test_conflicting_reports() {
    let harness = harness().await;
    register(&harness, 100, "flash", RegionCode::Nae);
    register(&harness, 200, "bisu", RegionCode::Nae);
    seed_rating(&harness, 100, RaceCode::BwTerran, 1500, 3);
    seed_rating(&harness, 200, RaceCode::BwTerran, 1520, 3);

    queue_terran(&harness, 100);
    queue_terran(&harness, 200);
    let match_id = pair_one(&harness).await;

    harness
        .lifecycle
        .report_result(match_id, 100, ReportedResult::Win)
        .await
        .expect("first report");
    let status = harness
        .lifecycle
        .report_result(match_id, 200, ReportedResult::Win)
        .await
        .expect("second report");
    assert_eq!(status, MatchStatus::Conflict);

    let row = harness.data.get_match(match_id).expect("match row");
    assert_eq!(row.status, MatchStatus::Conflict);
    assert_eq!(row.delta_1, None);

    // Ratings are untouched
    assert_eq!(
        harness
            .data
            .get_rating(100, RaceCode::BwTerran)
            .map(|r| r.mmr),
        Some(1500)
    );

    // The match row is now immutable
    let late = harness
        .lifecycle
        .report_result(match_id, 100, ReportedResult::Loss)
        .await;
    assert!(matches!(late, Err(LadderError::State(_))));
}

/// S3: abort consumes quota and changes no rating
#[tokio::test]
async fn test_abort_with_quota() {
    let harness = harness().await;
    register(&harness, 100, "flash", RegionCode::Nae);
    register(&harness, 200, "bisu", RegionCode::Nae);

    queue_terran(&harness, 100);
    queue_terran(&harness, 200);
    let match_id = pair_one(&harness).await;

    let sub = harness
        .bus
        .subscribe(EventFilter::for_match(match_id));

    let status = harness
        .lifecycle
        .report_result(match_id, 100, ReportedResult::Abort)
        .await
        .expect("abort");
    assert_eq!(status, MatchStatus::Aborted);

    let player = harness.data.get_player(100).expect("player row");
    assert_eq!(player.abort_quota, MONTHLY_ABORT_QUOTA - 1);

    assert!(harness.data.get_rating(100, RaceCode::BwTerran).is_none());

    let event = sub.try_recv().expect("aborted event");
    assert_eq!(event.kind, EventKind::Aborted { by: 100 });
}

/// Abort quota runs 3 -> 2 -> 1 -> 0 then rejects, and the first abort
/// of a new month resets to a fresh quota
#[tokio::test]
async fn test_abort_quota_boundaries() {
    let harness = harness().await;
    register(&harness, 100, "flash", RegionCode::Nae);

    let january = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
    for expected in [2, 1, 0] {
        let remaining = harness
            .data
            .try_consume_abort(100, january)
            .expect("abort within quota");
        assert_eq!(remaining, expected);
    }
    assert!(matches!(
        harness.data.try_consume_abort(100, january),
        Err(LadderError::Quota)
    ));

    // Month rollover: reset to 3 then consume one
    let february = Utc.with_ymd_and_hms(2026, 2, 1, 0, 30, 0).unwrap();
    let remaining = harness
        .data
        .try_consume_abort(100, february)
        .expect("fresh month abort");
    assert_eq!(remaining, MONTHLY_ABORT_QUOTA - 1);
}

/// S4: wave widening lets a saturated waiter reach a distant newcomer
#[tokio::test]
async fn test_wave_widening() {
    let harness = harness_with(|catalog| {
        catalog.override_ping(RegionCode::Nae, RegionCode::Euw, 250);
    })
    .await;
    register(&harness, 100, "flash", RegionCode::Nae);
    register(&harness, 200, "serral", RegionCode::Euw);
    seed_rating(&harness, 100, RaceCode::BwTerran, 1800, 5);
    seed_rating(&harness, 200, RaceCode::BwTerran, 2200, 5);

    queue_terran(&harness, 100);

    // Three waves alone: the window saturates
    for _ in 0..3 {
        assert!(harness.matchmaking.tick().is_empty());
    }

    queue_terran(&harness, 200);
    let match_id = pair_one(&harness).await;

    let row = harness.data.get_match(match_id).expect("match row");
    assert_eq!(row.server, "us-east");
    assert!(!harness.matchmaking.queued(100));
    assert!(!harness.matchmaking.queued(200));
}

/// A fresh pair at the same gap is NOT feasible: widening earned it
#[tokio::test]
async fn test_wide_gap_needs_waiting() {
    let harness = harness_with(|catalog| {
        catalog.override_ping(RegionCode::Nae, RegionCode::Euw, 250);
    })
    .await;
    register(&harness, 100, "flash", RegionCode::Nae);
    register(&harness, 200, "serral", RegionCode::Euw);
    seed_rating(&harness, 100, RaceCode::BwTerran, 1800, 5);
    seed_rating(&harness, 200, RaceCode::BwTerran, 2200, 5);

    queue_terran(&harness, 100);
    queue_terran(&harness, 200);
    assert!(harness.matchmaking.tick().is_empty());
}

/// S5: the same replay content surfacing on a second match flags that
/// match conflicted and stores nothing new
#[tokio::test]
async fn test_replay_hash_collision() {
    let harness = harness().await;
    for (id, name) in [(100, "flash"), (200, "bisu"), (300, "stork"), (400, "jaedong")] {
        register(&harness, id, name, RegionCode::Nae);
    }

    queue_terran(&harness, 100);
    queue_terran(&harness, 200);
    let first_match = pair_one(&harness).await;

    queue_terran(&harness, 300);
    queue_terran(&harness, 400);
    let second_match = pair_one(&harness).await;

    let shared = replay_bytes(7);
    harness
        .replays
        .ingest(first_match, 100, "game.SC2Replay", shared.clone())
        .await
        .expect("original upload");

    let duplicate = harness
        .replays
        .ingest(second_match, 300, "game.SC2Replay", shared)
        .await;
    assert!(matches!(duplicate, Err(LadderError::Conflict(_))));

    let second = harness.data.get_match(second_match).expect("match row");
    assert_eq!(second.status, MatchStatus::Conflict);
    // The original match is untouched and remains the hash's only owner
    let first = harness.data.get_match(first_match).expect("match row");
    assert_eq!(first.status, MatchStatus::Pending);
    let hash = first.replay_1_hash.as_deref().expect("hash recorded");
    assert_eq!(harness.data.matches_referencing_hash(hash), vec![first_match]);
}

/// Re-uploading from the same player on the same match overwrites the
/// reference instead of conflicting
#[tokio::test]
async fn test_replay_reupload_idempotent() {
    let harness = harness().await;
    register(&harness, 100, "flash", RegionCode::Nae);
    register(&harness, 200, "bisu", RegionCode::Nae);

    queue_terran(&harness, 100);
    queue_terran(&harness, 200);
    let match_id = pair_one(&harness).await;

    let bytes = replay_bytes(9);
    harness
        .replays
        .ingest(match_id, 100, "game.SC2Replay", bytes.clone())
        .await
        .expect("first upload");
    harness
        .replays
        .ingest(match_id, 100, "game.SC2Replay", bytes)
        .await
        .expect("re-upload");

    let row = harness.data.get_match(match_id).expect("match row");
    assert_eq!(row.status, MatchStatus::Pending);
    assert!(row.replay_1_hash.is_some());
}

/// S6: best_race_only yields one row per player and the per-tier
/// counts sum back to that total
#[tokio::test]
async fn test_leaderboard_filter_ordering() {
    let harness = harness().await;
    let mut rng = StdRng::seed_from_u64(20260801);

    let mut total_rows = 0usize;
    for id in 1..=256i64 {
        register(&harness, id, &format!("pl{id:03}"), RegionCode::Nae);
        let race_count = rng.gen_range(1..=6);
        for race in RaceCode::ALL.into_iter().take(race_count) {
            seed_rating(&harness, id, race, rng.gen_range(600..2600), rng.gen_range(1..40));
            total_rows += 1;
        }
    }
    assert!(total_rows > 256);

    let best = harness
        .leaderboard
        .query(
            &QueryFilters {
                best_race_only: true,
                ..Default::default()
            },
            1,
            40,
        )
        .await;
    assert_eq!(best.total_rows, 256);

    let mut sum = 0usize;
    for tier in RankTier::RANKED {
        let page = harness
            .leaderboard
            .query(
                &QueryFilters {
                    best_race_only: true,
                    rank: Some(tier),
                    ..Default::default()
                },
                1,
                40,
            )
            .await;
        sum += page.total_rows;
    }
    assert_eq!(sum, 256);
}

/// Queue entry uniqueness and the one-active-match rule
#[tokio::test]
async fn test_queue_guards() {
    let harness = harness().await;
    register(&harness, 100, "flash", RegionCode::Nae);
    register(&harness, 200, "bisu", RegionCode::Nae);

    queue_terran(&harness, 100);
    let doubled = harness
        .commands
        .queue(&ctx(100), vec![RaceCode::BwTerran], Vec::new());
    assert!(matches!(doubled, Err(LadderError::State(_))));

    queue_terran(&harness, 200);
    let match_id = pair_one(&harness).await;
    assert!(harness.data.active_match_for(100) == Some(match_id));

    // In a live match: joining the queue is rejected
    let busy = harness
        .commands
        .queue(&ctx(100), vec![RaceCode::BwTerran], Vec::new());
    assert!(matches!(busy, Err(LadderError::State(_))));

    // Queue commands are DM-only
    let public = harness.commands.queue(
        &CommandContext {
            player_id: 200,
            username: "bisu".to_string(),
            is_dm: false,
        },
        vec![RaceCode::BwTerran],
        Vec::new(),
    );
    assert!(matches!(public, Err(LadderError::Validation(_))));
}

/// Guard chain ordering: ToS before setup before activation
#[tokio::test]
async fn test_guard_chain() {
    let harness = harness().await;
    let context = ctx(100);

    // Anything but /termsofservice is blocked first
    let blocked = harness.commands.profile(&context);
    assert!(matches!(blocked, Err(LadderError::Validation(_))));

    harness
        .commands
        .terms_of_service(&context, true)
        .expect("accept tos");

    // Now setup is reachable, activation still is not
    let blocked = harness.commands.activate(&context, "LADDER");
    assert!(matches!(blocked, Err(LadderError::Validation(_))));

    harness
        .commands
        .setup(
            &context,
            SetupArgs {
                display_name: "flash".to_string(),
                region: Some("NAE".to_string()),
                ..Default::default()
            },
        )
        .expect("setup");

    harness.commands.activate(&context, "LADDER").expect("activate");
    // Activation is one-shot
    let twice = harness.commands.activate(&context, "LADDER");
    assert!(matches!(twice, Err(LadderError::State(_))));

    harness.commands.profile(&context).expect("profile readable");
}

/// Round trip: profile mutations survive the write queue and land in
/// the durable store together with their action-log deltas
#[tokio::test]
async fn test_persistence_round_trip() {
    let harness = harness().await;
    register(&harness, 100, "flash", RegionCode::Nae);

    harness
        .commands
        .set_country(&ctx(100), "DE")
        .expect("set country");

    // Mirror reads its own write immediately
    assert_eq!(
        harness.data.get_player(100).and_then(|p| p.country),
        Some("DE".to_string())
    );

    // Drain the queue, then inspect the durable store directly
    harness.data.shutdown(Duration::from_secs(10)).await;

    let stored = evo_ladder::database::entities::Player::by_id(&harness.db, 100)
        .await
        .expect("query player")
        .expect("player persisted");
    assert_eq!(stored.country.as_deref(), Some("DE"));
    assert!(stored.completed_setup);
    assert!(stored.accepted_tos_date.is_some());

    let log = ActionLog::for_player(&harness.db, 100, 50)
        .await
        .expect("query action log");
    let country_entry = log
        .iter()
        .find(|entry| entry.field == "country" && entry.new_value.as_deref() == Some("DE"))
        .expect("country delta logged");
    assert_eq!(country_entry.old_value.as_deref(), Some("KR"));
}

/// The write-once dates never change after they are first stamped
#[tokio::test]
async fn test_write_once_dates() {
    let harness = harness().await;
    register(&harness, 100, "flash", RegionCode::Nae);

    let first = harness
        .data
        .get_player(100)
        .and_then(|p| p.completed_setup_date)
        .expect("setup date stamped");

    // A second setup pass must not move the date
    harness
        .commands
        .setup(
            &ctx(100),
            SetupArgs {
                display_name: "flash2".to_string(),
                region: Some("NAE".to_string()),
                ..Default::default()
            },
        )
        .expect("second setup");

    let second = harness
        .data
        .get_player(100)
        .and_then(|p| p.completed_setup_date)
        .expect("setup date still present");
    assert_eq!(first, second);

    // Same for the ToS date across re-acceptance
    let tos_first = harness
        .data
        .get_player(100)
        .and_then(|p| p.accepted_tos_date)
        .expect("tos date");
    harness
        .commands
        .terms_of_service(&ctx(100), true)
        .expect("re-accept");
    let tos_second = harness
        .data
        .get_player(100)
        .and_then(|p| p.accepted_tos_date)
        .expect("tos date kept");
    assert_eq!(tos_first, tos_second);
}

/// Rating rows appear lazily at the midpoint and stay unique per
/// (player, race)
#[tokio::test]
async fn test_lazy_rating_rows() {
    let harness = harness().await;
    register(&harness, 100, "flash", RegionCode::Nae);
    register(&harness, 200, "bisu", RegionCode::Nae);

    queue_terran(&harness, 100);
    queue_terran(&harness, 200);
    let match_id = pair_one(&harness).await;

    harness
        .lifecycle
        .report_result(match_id, 100, ReportedResult::Win)
        .await
        .expect("report");
    harness
        .lifecycle
        .report_result(match_id, 200, ReportedResult::Loss)
        .await
        .expect("report");

    let winner = harness
        .data
        .get_rating(100, RaceCode::BwTerran)
        .expect("created lazily");
    // First game from the 1200 midpoint against an equal: half the K
    assert_eq!(winner.mmr, 1220);
    assert_eq!(winner.games_played, 1);

    let rows: Vec<Rating> = harness.data.get_ratings_for(100);
    assert_eq!(rows.len(), 1);
}

/// Draw reports split evenly and the deltas mirror each other
#[tokio::test]
async fn test_draw_outcome() {
    let harness = harness().await;
    register(&harness, 100, "flash", RegionCode::Nae);
    register(&harness, 200, "bisu", RegionCode::Nae);
    seed_rating(&harness, 100, RaceCode::BwTerran, 1400, 2);
    seed_rating(&harness, 200, RaceCode::BwTerran, 1600, 2);

    queue_terran(&harness, 100);
    // 200-point gap needs one widening cycle
    assert!(harness.matchmaking.tick().is_empty());
    queue_terran(&harness, 200);
    let match_id = pair_one(&harness).await;

    harness
        .lifecycle
        .report_result(match_id, 100, ReportedResult::Draw)
        .await
        .expect("report");
    let status = harness
        .lifecycle
        .report_result(match_id, 200, ReportedResult::Draw)
        .await
        .expect("report");
    assert_eq!(status, MatchStatus::Draw);

    let row = harness.data.get_match(match_id).expect("match row");
    let delta_1 = row.delta_1.expect("delta recorded");
    let delta_2 = row.delta_2.expect("delta recorded");
    assert!(delta_1 > 0, "underdog gains on a draw");
    assert_eq!(delta_1 + delta_2, 0);

    let low = harness.data.get_rating(100, RaceCode::BwTerran).unwrap();
    assert_eq!(low.games_drawn, 1);
}

/// Leaving the queue between waves is instant; the next wave no longer
/// sees the entry
#[tokio::test]
async fn test_queue_cancellation() {
    let harness = harness().await;
    register(&harness, 100, "flash", RegionCode::Nae);
    register(&harness, 200, "bisu", RegionCode::Nae);

    queue_terran(&harness, 100);
    queue_terran(&harness, 200);
    assert!(harness.commands.leave_queue(&ctx(100)).expect("leave"));
    assert!(harness.matchmaking.tick().is_empty());
    assert!(harness.matchmaking.queued(200));
}
