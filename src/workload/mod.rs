//! Workload model
//!
//! ```text
//! Workload (1) ──< Phase (N) ──< Session (N) ──< Task (N) ──> TaskTemplate
//!                                                              │
//!                                                              └──< FileExec ──< StatementExec
//! ```
//!
//! The model is immutable once loaded. A [`Task`] is resolved against a
//! [`TaskLibrary`] into a [`TaskExec`] right before it runs, which is where
//! rewrite rules and permute-order take effect.

mod model;
mod params;
mod resolve;

pub use model::{
    FileExec, ParameterValues, Phase, RewriteRule, Session, StatementExec, Task, TaskExec,
    TaskLibrary, TaskTemplate, Workload,
};
pub use params::replace_parameters;
