//! SQLite Workload: load, concurrent ingest with conflicts, verification
//!
//! Runs a three-phase workload against a SQLite file:
//! - `setup`: create the table and a trigger rejecting `conflict` rows
//! - `ingest`: four concurrent sessions, one statement per session conflicts
//! - `verify`: count rows per session
//!
//! The skip-on-error strategy turns the conflicting statements into WARN
//! events; everything else must succeed. Events land in `events.jsonl`.
//!
//! Run with: cargo run --example sqlite_workload
//! Verbose:  RUST_LOG=lst_bench=debug cargo run --example sqlite_workload

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use lst_bench::client::{ConnectionFactory, MessageSubstringHandler, SqliteConnectionFactory};
use lst_bench::config::RunConfig;
use lst_bench::logging::init_tracing;
use lst_bench::orchestrator::Orchestrator;
use lst_bench::task::{ExecutorKind, SKIP_ERRONEOUS_QUERY_STRINGS_KEY};
use lst_bench::telemetry::{EventInfo, EventRecorder, EventType, JsonLinesTelemetrySink, Status};
use lst_bench::workload::{
    FileExec, Phase, Session, StatementExec, Task, TaskLibrary, TaskTemplate, Workload,
};

const SESSIONS: usize = 4;

fn library() -> TaskLibrary {
    TaskLibrary::new([
        TaskTemplate::new(
            "setup",
            vec![FileExec::new(
                "setup.sql",
                vec![
                    StatementExec::new("drop", "DROP TABLE IF EXISTS ${table}"),
                    StatementExec::new(
                        "create",
                        "CREATE TABLE ${table} (id INTEGER PRIMARY KEY AUTOINCREMENT, session TEXT, kind TEXT)",
                    ),
                    StatementExec::new(
                        "guard",
                        "CREATE TRIGGER guard BEFORE INSERT ON ${table} WHEN NEW.kind = 'conflict' \
                         BEGIN SELECT RAISE(ABORT, 'write conflict detected'); END",
                    ),
                ],
            )],
        ),
        TaskTemplate::new(
            "ingest",
            vec![
                FileExec::new(
                    "ingest_base.sql",
                    vec![
                        StatementExec::new(
                            "insert_a",
                            "INSERT INTO ${table} (session, kind) VALUES ('${session}', 'a')",
                        ),
                        StatementExec::new(
                            "insert_b",
                            "INSERT INTO ${table} (session, kind) VALUES ('${session}', 'b')",
                        ),
                    ],
                ),
                FileExec::new(
                    "ingest_conflict.sql",
                    vec![StatementExec::new(
                        "insert_conflict",
                        "INSERT INTO ${table} (session, kind) VALUES ('${session}', 'conflict')",
                    )],
                ),
                FileExec::new(
                    "ingest_tail.sql",
                    vec![StatementExec::new(
                        "insert_c",
                        "INSERT INTO ${table} (session, kind) VALUES ('${session}', 'c')",
                    )],
                ),
            ],
        ),
        TaskTemplate::new(
            "verify",
            vec![FileExec::new(
                "verify.sql",
                vec![StatementExec::new(
                    "count",
                    "SELECT session, COUNT(*) FROM ${table} GROUP BY session",
                )],
            )],
        ),
    ])
}

fn workload() -> Workload {
    Workload::new(
        "sqlite_ingest",
        1,
        vec![
            Phase::new("setup", vec![Session::new(vec![Task::new("setup")])]),
            Phase::new(
                "ingest",
                (0..SESSIONS)
                    .map(|i| {
                        Session::new(vec![Task::new("ingest")
                            .with_parameter("session", format!("s{i}"))
                            .permuted()])
                    })
                    .collect(),
            ),
            Phase::new("verify", vec![Session::new(vec![Task::new("verify")])]),
        ],
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("lst_bench=info");

    println!("=== LST-Bench SQLite Workload ===\n");

    let dir = tempfile::tempdir().context("creating scratch directory")?;
    let database = dir.path().join("bench.db");
    let events_path = dir.path().join("events.jsonl");

    let sink = Arc::new(JsonLinesTelemetrySink::create(&events_path)?);
    let config = RunConfig::builder()
        .max_num_retries(3)
        .executor(ExecutorKind::SkipOnError)
        .executor_argument(SKIP_ERRONEOUS_QUERY_STRINGS_KEY, "write conflict;database is locked")
        .parameter("table", "events")
        .permutation_seed(2024)
        .build();
    let factory: Arc<dyn ConnectionFactory> = Arc::new(
        SqliteConnectionFactory::from_config(vec![database.clone()], &config)
            .with_exception_handler(Arc::new(MessageSubstringHandler::new([
                "database is locked",
            ]))),
    );

    let orchestrator = Orchestrator::new(
        config,
        library(),
        factory,
        EventRecorder::new(sink, Utc::now()),
    );

    println!("Database: {}", database.display());
    println!("Sessions in ingest phase: {SESSIONS}\n");

    let result = orchestrator.run(&workload()).await?;

    println!("=== Phases ===");
    for phase in result.phases() {
        println!(
            "  {:<8} {:>6} ms  {} session(s), {} failed",
            phase.phase_id(),
            (phase.ended_at() - phase.started_at()).num_milliseconds(),
            phase.sessions().len(),
            phase.failed_sessions().count()
        );
    }
    println!("\nFinal state: {:?}", result.state());

    let events = std::fs::read_to_string(&events_path)?
        .lines()
        .map(|line| serde_json::from_str::<EventInfo>(line))
        .collect::<Result<Vec<_>, _>>()?;
    let warned = events
        .iter()
        .filter(|e| e.event_type() == EventType::ExecStatement && e.status() == Status::Warn)
        .count();
    println!("Events written: {} ({warned} skipped statements)", events.len());

    result.into_result()?;
    Ok(())
}
