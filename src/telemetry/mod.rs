//! Execution Telemetry
//!
//! Every file and statement execution, and every task, session, phase and
//! workload run, produces exactly one [`EventInfo`], on success, skip and
//! failure alike.
//!
//! ## Schema Overview
//!
//! ```text
//! EXEC_EXPERIMENT (1) ──< EXEC_PHASE (N) ──< EXEC_SESSION (N)
//!                                               │
//!                                               └──< EXEC_TASK ──< EXEC_FILE ──< EXEC_STATEMENT
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::Utc;
//! use lst_bench::telemetry::{EventRecorder, EventType, MemoryTelemetrySink, Status};
//!
//! let sink = Arc::new(MemoryTelemetrySink::new());
//! let recorder = EventRecorder::new(sink.clone(), Utc::now());
//!
//! let start = Utc::now();
//! recorder.record_statement(start, "q1", Status::Success, None);
//!
//! assert_eq!(sink.count(EventType::ExecStatement, Status::Success), 1);
//! ```

mod columnar;
mod event;
mod recorder;
mod sink;

pub use columnar::{event_schema, events_to_record_batch};
pub use event::{EventInfo, EventType, Status};
pub use recorder::EventRecorder;
pub use sink::{JsonLinesTelemetrySink, MemoryTelemetrySink, TelemetrySink};
