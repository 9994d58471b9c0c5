//! Workload tree: phases → sessions → tasks → files → statements

use std::collections::{HashMap, HashSet};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Named values substituted into `${name}` placeholders.
pub type ParameterValues = FxHashMap<String, String>;

/// One statement: an id plus raw text with placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementExec {
    /// Statement id, used as the telemetry subject.
    pub id: String,
    /// Statement text, possibly containing `${name}` placeholders.
    pub statement: String,
}

impl StatementExec {
    /// Create a statement.
    #[must_use]
    pub fn new(id: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            statement: statement.into(),
        }
    }
}

/// Ordered statements of one script file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileExec {
    /// File id, used as the telemetry subject.
    pub id: String,
    /// Statements in execution order.
    pub statements: Vec<StatementExec>,
}

impl FileExec {
    /// Create a file.
    #[must_use]
    pub fn new(id: impl Into<String>, statements: Vec<StatementExec>) -> Self {
        Self {
            id: id.into(),
            statements,
        }
    }
}

/// Reusable ordered sequence of files, referenced by tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    /// Template id.
    pub id: String,
    /// Files in declared order.
    pub files: Vec<FileExec>,
}

impl TaskTemplate {
    /// Create a template.
    #[must_use]
    pub fn new(id: impl Into<String>, files: Vec<FileExec>) -> Self {
        Self {
            id: id.into(),
            files,
        }
    }
}

/// All task templates a workload may reference, by id.
#[derive(Debug, Clone, Default)]
pub struct TaskLibrary {
    templates: HashMap<String, TaskTemplate>,
}

impl TaskLibrary {
    /// Build a library; later templates replace earlier ones with the same id.
    #[must_use]
    pub fn new(templates: impl IntoIterator<Item = TaskTemplate>) -> Self {
        Self {
            templates: templates
                .into_iter()
                .map(|t| (t.id.clone(), t))
                .collect(),
        }
    }

    /// Look up a template.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TaskTemplate> {
        self.templates.get(id)
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the library is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Regex rewrite applied to every statement of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    /// Regular expression to match.
    pub pattern: String,
    /// Replacement text; `$1`/`${name}` refer to capture groups.
    pub replacement: String,
}

/// Instantiation of a task template with per-instance modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Referenced template.
    pub template_id: String,
    /// Values overriding the experiment-level parameter values.
    #[serde(default)]
    pub parameter_values: ParameterValues,
    /// Shuffle file order once per execution.
    #[serde(default)]
    pub permute_order: bool,
    /// Rewrites applied in declared order.
    #[serde(default)]
    pub replace_regex: Vec<RewriteRule>,
    /// Earlier phase whose completion time is injected as `asof`.
    #[serde(default)]
    pub time_travel_phase_id: Option<String>,
}

impl Task {
    /// Task instantiating `template_id` with no modifiers.
    #[must_use]
    pub fn new(template_id: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            parameter_values: ParameterValues::default(),
            permute_order: false,
            replace_regex: Vec::new(),
            time_travel_phase_id: None,
        }
    }

    /// Add a parameter value.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameter_values.insert(name.into(), value.into());
        self
    }

    /// Enable permute-order.
    #[must_use]
    pub const fn permuted(mut self) -> Self {
        self.permute_order = true;
        self
    }

    /// Add a rewrite rule.
    #[must_use]
    pub fn with_rewrite(
        mut self,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        self.replace_regex.push(RewriteRule {
            pattern: pattern.into(),
            replacement: replacement.into(),
        });
        self
    }

    /// Reference an earlier phase for time travel.
    #[must_use]
    pub fn time_travel(mut self, phase_id: impl Into<String>) -> Self {
        self.time_travel_phase_id = Some(phase_id.into());
        self
    }
}

/// One independent sequential execution stream bound to one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Tasks in execution order.
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Index of the endpoint the session's connection targets.
    #[serde(default)]
    pub target_endpoint: usize,
}

impl Session {
    /// Session over endpoint 0.
    #[must_use]
    pub const fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            target_endpoint: 0,
        }
    }

    /// Bind the session to another endpoint.
    #[must_use]
    pub const fn on_endpoint(mut self, target_endpoint: usize) -> Self {
        self.target_endpoint = target_endpoint;
        self
    }
}

/// Barrier-delimited stage whose sessions run concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Phase id, unique within the workload.
    pub id: String,
    /// Sessions, started together.
    pub sessions: Vec<Session>,
    /// Default time-travel reference for tasks that name none.
    #[serde(default)]
    pub time_travel_phase_id: Option<String>,
}

impl Phase {
    /// Create a phase.
    #[must_use]
    pub fn new(id: impl Into<String>, sessions: Vec<Session>) -> Self {
        Self {
            id: id.into(),
            sessions,
            time_travel_phase_id: None,
        }
    }

    /// Reference an earlier phase for time travel.
    #[must_use]
    pub fn time_travel(mut self, phase_id: impl Into<String>) -> Self {
        self.time_travel_phase_id = Some(phase_id.into());
        self
    }
}

/// Full declarative benchmark description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    /// Workload id.
    pub id: String,
    /// Format version.
    pub version: u32,
    /// Phases in execution order.
    pub phases: Vec<Phase>,
}

impl Workload {
    /// Create a workload.
    #[must_use]
    pub fn new(id: impl Into<String>, version: u32, phases: Vec<Phase>) -> Self {
        Self {
            id: id.into(),
            version,
            phases,
        }
    }

    /// Check the workload against a library before anything runs.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWorkload` for duplicate phase ids, unknown templates,
    /// or time-travel references to a phase that does not run earlier.
    pub fn validate(&self, library: &TaskLibrary) -> Result<()> {
        let mut earlier: HashSet<&str> = HashSet::new();
        for phase in &self.phases {
            if earlier.contains(phase.id.as_str()) {
                return Err(Error::InvalidWorkload(format!(
                    "duplicate phase id '{}'",
                    phase.id
                )));
            }
            let check_reference = |reference: &Option<String>| -> Result<()> {
                match reference {
                    Some(target) if !earlier.contains(target.as_str()) => {
                        Err(Error::InvalidWorkload(format!(
                            "phase '{}' time-travels to '{target}', which does not run before it",
                            phase.id
                        )))
                    }
                    _ => Ok(()),
                }
            };
            check_reference(&phase.time_travel_phase_id)?;
            for task in phase.sessions.iter().flat_map(|s| &s.tasks) {
                if library.get(&task.template_id).is_none() {
                    return Err(Error::InvalidWorkload(format!(
                        "phase '{}' references unknown task template '{}'",
                        phase.id, task.template_id
                    )));
                }
                check_reference(&task.time_travel_phase_id)?;
            }
            earlier.insert(phase.id.as_str());
        }
        Ok(())
    }
}

/// Task after template lookup, rewrites and permutation: what an executor runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskExec {
    /// Template id of the task.
    pub id: String,
    /// Files in execution order.
    pub files: Vec<FileExec>,
    /// Time-travel reference carried over from the task or its phase.
    pub time_travel_phase_id: Option<String>,
}

impl TaskExec {
    /// Create a resolved task.
    #[must_use]
    pub fn new(id: impl Into<String>, files: Vec<FileExec>) -> Self {
        Self {
            id: id.into(),
            files,
            time_travel_phase_id: None,
        }
    }
}
