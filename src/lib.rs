//! # LST-Bench: Workload Execution Engine
//!
//! **Version**: 0.1.0
//!
//! Executes benchmark workloads against SQL engines: phases run in order,
//! the sessions of a phase run concurrently on their own connections, and
//! every task, file and statement execution is recorded as a telemetry
//! event.
//!
//! ## Architecture
//!
//! ```text
//! Orchestrator ──> Session workers ──> TaskExecutor ──> Connection ──> Driver
//!      │                 │                  │               │
//!      └── PhaseRegistry └── EventRecorder ─┴──> TelemetrySink
//! ```
//!
//! - [`client`]: retry contract over a single-attempt [`client::Driver`]
//! - [`task`]: fail-fast and skip-on-error execution strategies
//! - [`orchestrator`]: phase barrier, concurrent sessions, time travel
//! - [`telemetry`]: `EventInfo` records and sinks
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::Utc;
//! use lst_bench::client::{Connection, ConnectionFactory, RetryingConnection, ScriptedDriver};
//! use lst_bench::config::RunConfig;
//! use lst_bench::orchestrator::Orchestrator;
//! use lst_bench::telemetry::{EventRecorder, MemoryTelemetrySink};
//! use lst_bench::workload::{
//!     FileExec, Phase, Session, StatementExec, Task, TaskLibrary, TaskTemplate, Workload,
//! };
//!
//! # tokio::runtime::Runtime::new()?.block_on(async {
//! let library = TaskLibrary::new([TaskTemplate::new(
//!     "setup",
//!     vec![FileExec::new(
//!         "setup.sql",
//!         vec![StatementExec::new("create", "CREATE TABLE t (a INT)")],
//!     )],
//! )]);
//! let factory: Arc<dyn ConnectionFactory> =
//!     Arc::new(|_endpoint: usize| -> lst_bench::Result<Box<dyn Connection>> {
//!         Ok(Box::new(RetryingConnection::new(ScriptedDriver::new(), 3)))
//!     });
//! let sink = Arc::new(MemoryTelemetrySink::new());
//! let orchestrator = Orchestrator::new(
//!     RunConfig::default(),
//!     library,
//!     factory,
//!     EventRecorder::new(sink.clone(), Utc::now()),
//! );
//!
//! let session = Session::new(vec![Task::new("setup")]);
//! let workload = Workload::new("demo", 1, vec![Phase::new("setup", vec![session])]);
//! let result = orchestrator.run(&workload).await?;
//! assert!(result.is_success());
//! # Ok::<(), lst_bench::Error>(())
//! # })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod task;
pub mod telemetry;
pub mod workload;

pub use error::{Error, Result};
