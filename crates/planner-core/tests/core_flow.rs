use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use planner_core::app::PlannerApp;
use planner_core::cli::{AddArgs, Command};
use planner_core::commands::{Context, dispatch};
use planner_core::config::Config;
use planner_core::mode::PlannerMode;
use planner_core::remote::{ApiClient, MemoryRemote, Partition, RemoteStore};
use planner_core::render::Renderer;
use planner_core::session::{Session, SessionFile};
use planner_core::stats::ModeAggregate;
use planner_core::store::TaskStore;
use planner_core::task::{DurationInput, TaskDraft, TimeUnit};
use tempfile::tempdir;

fn tz() -> chrono_tz::Tz {
    chrono_tz::America::Sao_Paulo
}

#[tokio::test]
async fn study_day_with_timer_survives_reload() {
    let remote = Arc::new(MemoryRemote::new());
    let partition = Partition::new("ana@example.com", PlannerMode::Study);
    let today = NaiveDate::from_ymd_opt(2026, 10, 16).expect("date");
    let now = Utc
        .with_ymd_and_hms(2026, 10, 16, 14, 0, 0)
        .single()
        .expect("instant");

    let store = TaskStore::load(remote.clone(), partition.clone(), tz()).await;
    let mut app = PlannerApp::new(PlannerMode::Study, store, today);

    let timed = app
        .add(
            &TaskDraft {
                text: "Derivatives".to_string(),
                subject: Some("Math".to_string()),
                duration: None,
            },
            now,
        )
        .expect_err("study tasks need a duration");
    assert_eq!(timed.to_string(), "duration must be a whole number greater than zero");

    let id = app
        .add(
            &TaskDraft {
                text: "Derivatives".to_string(),
                subject: Some("Math".to_string()),
                duration: Some(DurationInput {
                    value: 25,
                    unit: TimeUnit::Minute,
                }),
            },
            now,
        )
        .expect("valid study draft");

    app.start_timer(id).expect("timer idle");
    for _ in 0..125 {
        app.tick_timer();
    }
    let outcome = app.stop_timer().expect("timer running");
    assert_eq!(outcome.minutes, 3);

    let view = app.render(now);
    assert_eq!(view.date_title, "Today");
    assert_eq!(view.stats.percentage, 100);
    assert_eq!(
        view.aggregate,
        Some(ModeAggregate::Study {
            total_minutes: 3.0,
            display: "3 min".to_string(),
            subjects: 1,
        })
    );
    app.shutdown().await;

    let reloaded = TaskStore::load(remote.clone(), partition, tz()).await;
    let task = reloaded.get(id).expect("task persisted");
    assert!(task.completed);
    assert_eq!(task.time_display.as_deref(), Some("3 min"));

    let other_mode = Partition::new("ana@example.com", PlannerMode::Fitness);
    assert!(remote.load(&other_mode).await.expect("load").is_empty());
}

#[tokio::test]
async fn cli_commands_edit_the_signed_in_partition() {
    let temp = tempdir().expect("tempdir");
    let sessions = SessionFile::open(temp.path()).expect("session file");
    sessions
        .save(&Session {
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            is_admin: false,
        })
        .expect("save session");

    let remote = Arc::new(MemoryRemote::new());
    let selected = NaiveDate::from_ymd_opt(2026, 10, 20).expect("date");
    let ctx = Context {
        cfg: Config::default(),
        renderer: Renderer::plain(),
        sessions,
        client: ApiClient::new("http://127.0.0.1:9/api").expect("client"),
        remote: remote.clone(),
        tz: tz(),
        mode: PlannerMode::Fitness,
        selected,
    };

    dispatch(
        &ctx,
        Some(Command::Add(AddArgs {
            text: vec!["Morning".to_string(), "run".to_string()],
            subject: None,
            duration: Some(90),
            unit: TimeUnit::Second,
        })),
    )
    .await
    .expect("add");

    let partition = Partition::new("ana@example.com", PlannerMode::Fitness);
    let stored = remote.stored(&partition).expect("stored");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].text, "Morning run");
    assert_eq!(stored[0].minutes, Some(1.5));
    assert_eq!(stored[0].day(&tz()), selected);

    dispatch(&ctx, Some(Command::Toggle { id: stored[0].id }))
        .await
        .expect("toggle");
    dispatch(&ctx, Some(Command::ClearCompleted))
        .await
        .expect("clear");
    assert!(remote.stored(&partition).expect("stored").is_empty());

    dispatch(&ctx, Some(Command::Stats)).await.expect("stats");
    dispatch(&ctx, None).await.expect("show");
}

#[tokio::test]
async fn timer_command_requires_study_mode() {
    let temp = tempdir().expect("tempdir");
    let ctx = Context {
        cfg: Config::default(),
        renderer: Renderer::plain(),
        sessions: SessionFile::open(temp.path()).expect("session file"),
        client: ApiClient::new("http://127.0.0.1:9/api").expect("client"),
        remote: Arc::new(MemoryRemote::new()),
        tz: tz(),
        mode: PlannerMode::Generic,
        selected: NaiveDate::from_ymd_opt(2026, 10, 16).expect("date"),
    };
    assert!(dispatch(&ctx, Some(Command::Timer { id: 1 })).await.is_err());
}
