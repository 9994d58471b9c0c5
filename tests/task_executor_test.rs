//! Fail-fast and skip-on-error task execution

use std::sync::Arc;

use chrono::Utc;
#[cfg(feature = "sqlite")]
use lst_bench::client::{Connection, SqliteDriver};
use lst_bench::client::{
    DriverError, QueryResult, ResultMode, RetryingConnection, ScriptedDriver, Value,
};
use lst_bench::task::{
    build_executor, ExecutorArguments, ExecutorKind, FailFastExecutor, SkipOnError,
    SkipOnErrorExecutor, TaskExecutor, SKIP_ERRONEOUS_QUERY_STRINGS_KEY,
};
use lst_bench::telemetry::{EventRecorder, EventType, MemoryTelemetrySink, Status};
use lst_bench::workload::{FileExec, ParameterValues, StatementExec, TaskExec};

fn recorder() -> (EventRecorder, Arc<MemoryTelemetrySink>) {
    let sink = Arc::new(MemoryTelemetrySink::new());
    (EventRecorder::new(sink.clone(), Utc::now()), sink)
}

fn three_statement_task() -> TaskExec {
    TaskExec::new(
        "maintenance",
        vec![
            FileExec::new(
                "f1.sql",
                vec![
                    StatementExec::new("s1", "INSERT INTO t VALUES (1)"),
                    StatementExec::new("s2", "UPDATE t SET a = 2 -- conflict"),
                    StatementExec::new("s3", "DELETE FROM t WHERE a = 0"),
                ],
            ),
            FileExec::new("f2.sql", vec![StatementExec::new("s4", "SELECT COUNT(*) FROM t")]),
        ],
    )
}

fn conflicting_driver() -> ScriptedDriver {
    ScriptedDriver::new().fail_always(
        "conflict",
        DriverError::new("write conflict on table t").with_sql_state("40001"),
    )
}

#[test]
fn test_fail_fast_stops_at_first_failure() {
    let (recorder, sink) = recorder();
    let driver = conflicting_driver();
    let mut conn = RetryingConnection::new(driver.clone(), 0);
    let executor = FailFastExecutor::fail_fast(recorder);

    let err = executor
        .execute_task(&mut conn, &three_statement_task(), &ParameterValues::default())
        .unwrap_err();

    assert!(err.is_retries_exhausted());
    assert_eq!(driver.attempt_count("DELETE"), 0);
    assert_eq!(driver.attempt_count("SELECT"), 0);

    let s2 = sink.events_for("s2");
    assert_eq!(s2.len(), 1);
    assert_eq!(s2[0].status(), Status::Failure);
    let payload = s2[0].payload().unwrap();
    assert!(payload.starts_with(
        "Exception executing statement: s2, statement text: UPDATE t SET a = 2 -- conflict; \
         error message: "
    ));
    assert!(payload.contains("write conflict on table t"));

    assert_eq!(sink.events_for("f1.sql")[0].status(), Status::Failure);
    assert!(sink.events_for("f2.sql").is_empty());
    assert!(sink.events_for("s3").is_empty());
}

#[test]
fn test_skip_on_error_continues_past_matching_failure() {
    let (recorder, sink) = recorder();
    let driver = conflicting_driver();
    let mut conn = RetryingConnection::new(driver.clone(), 1);
    let executor =
        SkipOnErrorExecutor::new(recorder, SkipOnError::parse("deadlock;write conflict"));

    executor
        .execute_task(&mut conn, &three_statement_task(), &ParameterValues::default())
        .unwrap();

    // Retries still happen before the skip decision.
    assert_eq!(driver.attempt_count("conflict"), 2);
    assert_eq!(driver.attempt_count("DELETE"), 1);

    let s2 = sink.events_for("s2");
    assert_eq!(s2.len(), 1);
    assert_eq!(s2[0].status(), Status::Warn);
    assert!(s2[0].payload().unwrap().contains("write conflict"));

    assert_eq!(sink.count(EventType::ExecStatement, Status::Success), 3);
    assert_eq!(sink.count(EventType::ExecFile, Status::Success), 2);
}

#[test]
fn test_skip_on_error_fails_on_unmatched_failure() {
    let (recorder, sink) = recorder();
    let mut conn = RetryingConnection::new(conflicting_driver(), 0);
    let executor = SkipOnErrorExecutor::new(recorder, SkipOnError::parse("deadlock"));

    assert!(executor
        .execute_task(&mut conn, &three_statement_task(), &ParameterValues::default())
        .is_err());
    assert_eq!(sink.events_for("s2")[0].status(), Status::Failure);
    assert!(sink.events_for("s3").is_empty());
}

#[test]
fn test_skip_on_error_matches_sql_state_in_diagnostic() {
    let (recorder, _sink) = recorder();
    let mut conn = RetryingConnection::new(conflicting_driver(), 0);
    let executor = SkipOnErrorExecutor::new(recorder, SkipOnError::parse("SQL State: 40001"));

    assert!(executor
        .execute_task(&mut conn, &three_statement_task(), &ParameterValues::default())
        .is_ok());
}

#[test]
fn test_empty_fragments_never_match() {
    let policy = SkipOnError::parse(";;");
    assert!(policy.skip_strings().is_empty());

    let (recorder, _sink) = recorder();
    let mut conn = RetryingConnection::new(conflicting_driver(), 0);
    let executor = SkipOnErrorExecutor::new(recorder, policy);
    assert!(executor
        .execute_task(&mut conn, &three_statement_task(), &ParameterValues::default())
        .is_err());
}

#[test]
fn test_parameters_are_substituted_before_execution() {
    let (recorder, sink) = recorder();
    let driver = ScriptedDriver::new();
    let mut conn = RetryingConnection::new(driver.clone(), 0);
    let executor = FailFastExecutor::fail_fast(recorder);
    let task = TaskExec::new(
        "load",
        vec![FileExec::new(
            "load.sql",
            vec![StatementExec::new("copy", "INSERT INTO ${db}.t SELECT * FROM ${src} ${missing}")],
        )],
    );
    let mut values = ParameterValues::default();
    values.insert("db".to_string(), "tpcds".to_string());
    values.insert("src".to_string(), "staging".to_string());

    executor.execute_task(&mut conn, &task, &values).unwrap();

    assert_eq!(
        driver.attempts(),
        vec!["INSERT INTO tpcds.t SELECT * FROM staging ${missing}".to_string()]
    );
    assert_eq!(sink.len(), 2);
}

#[test]
fn test_execute_statement_collects_rows() {
    let (recorder, sink) = recorder();
    let mut rows = QueryResult::new(vec!["c".to_string()]);
    rows.push_row(vec![Value::Integer(7)]).unwrap();
    let mut conn = RetryingConnection::new(ScriptedDriver::new().respond_with("COUNT", rows), 0);
    let executor = FailFastExecutor::fail_fast(recorder);

    let result = executor
        .execute_statement(
            &mut conn,
            &StatementExec::new("count", "SELECT COUNT(*) AS c FROM t"),
            &ParameterValues::default(),
            ResultMode::Collect,
        )
        .unwrap()
        .unwrap();

    assert_eq!(result.value(0, "c").and_then(Value::as_i64), Some(7));
    assert_eq!(sink.count(EventType::ExecStatement, Status::Success), 1);
}

#[test]
fn test_skipped_statement_returns_no_rows() {
    let (recorder, _sink) = recorder();
    let mut conn = RetryingConnection::new(conflicting_driver(), 0);
    let executor = SkipOnErrorExecutor::new(recorder, SkipOnError::parse("conflict"));

    let result = executor
        .execute_statement(
            &mut conn,
            &StatementExec::new("s", "SELECT * FROM t -- conflict"),
            &ParameterValues::default(),
            ResultMode::Collect,
        )
        .unwrap();

    assert!(result.is_none());
}

#[test]
fn test_build_executor_from_arguments() {
    let (recorder, sink) = recorder();
    let mut arguments = ExecutorArguments::default();
    arguments.insert(SKIP_ERRONEOUS_QUERY_STRINGS_KEY.to_string(), "write conflict".to_string());
    let executor = build_executor(ExecutorKind::SkipOnError, recorder, &arguments);
    let mut conn = RetryingConnection::new(conflicting_driver(), 0);

    executor
        .execute_task(&mut conn, &three_statement_task(), &ParameterValues::default())
        .unwrap();

    assert_eq!(sink.count(EventType::ExecStatement, Status::Warn), 1);
}

#[cfg(feature = "sqlite")]
#[test]
fn test_rerun_on_fresh_target_repeats_event_sequence() {
    let task = TaskExec::new(
        "idempotent",
        vec![
            FileExec::new(
                "schema.sql",
                vec![
                    StatementExec::new(
                        "create",
                        "CREATE TABLE IF NOT EXISTS t (a INTEGER PRIMARY KEY)",
                    ),
                    StatementExec::new("upsert", "INSERT OR REPLACE INTO t VALUES (1)"),
                ],
            ),
            FileExec::new(
                "read.sql",
                vec![StatementExec::new("count", "SELECT COUNT(*) FROM t")],
            ),
        ],
    );

    let run = || {
        let (recorder, sink) = recorder();
        let mut conn = RetryingConnection::new(SqliteDriver::open_in_memory().unwrap(), 0);
        FailFastExecutor::fail_fast(recorder)
            .execute_task(&mut conn, &task, &ParameterValues::default())
            .unwrap();
        conn.close().unwrap();
        sink.events_of_type(EventType::ExecStatement)
            .into_iter()
            .map(|e| (e.event_id().to_string(), e.status()))
            .collect::<Vec<_>>()
    };

    let first = run();
    let second = run();

    assert_eq!(first, second);
    let ids: Vec<_> = first.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, ["create", "upsert", "count"]);
    assert!(first.iter().all(|(_, status)| *status == Status::Success));
}
