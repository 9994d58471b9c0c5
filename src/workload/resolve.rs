//! Task resolution: template lookup, statement rewrites, file permutation

use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;

use super::{Task, TaskExec, TaskLibrary};
use crate::{Error, Result};

impl Task {
    /// Resolve the task into the files an executor will run.
    ///
    /// Rewrite rules are applied to every statement in declared order. With
    /// permute-order set, the file order is shuffled once using `rng`; the
    /// statements inside each file are never reordered.
    ///
    /// # Errors
    ///
    /// Returns `InvalidWorkload` for an unknown template and `Regex` for a
    /// rewrite pattern that does not compile.
    pub fn resolve<R: Rng + ?Sized>(&self, library: &TaskLibrary, rng: &mut R) -> Result<TaskExec> {
        let template = library.get(&self.template_id).ok_or_else(|| {
            Error::InvalidWorkload(format!("unknown task template '{}'", self.template_id))
        })?;

        let rules = self
            .replace_regex
            .iter()
            .map(|rule| Ok((Regex::new(&rule.pattern)?, rule.replacement.as_str())))
            .collect::<Result<Vec<_>>>()?;

        let mut files = template.files.clone();
        if !rules.is_empty() {
            for statement in files.iter_mut().flat_map(|f| f.statements.iter_mut()) {
                for (regex, replacement) in &rules {
                    statement.statement = regex
                        .replace_all(&statement.statement, *replacement)
                        .into_owned();
                }
            }
        }

        if self.permute_order {
            files.shuffle(rng);
        }

        Ok(TaskExec {
            id: template.id.clone(),
            files,
            time_travel_phase_id: self.time_travel_phase_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::{FileExec, StatementExec, TaskTemplate};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn library() -> TaskLibrary {
        let files = (0..6)
            .map(|i| {
                FileExec::new(
                    format!("f{i}"),
                    vec![
                        StatementExec::new(format!("f{i}-s0"), "SELECT * FROM delta.t0"),
                        StatementExec::new(format!("f{i}-s1"), "SELECT * FROM delta.t1"),
                    ],
                )
            })
            .collect();
        TaskLibrary::new([TaskTemplate::new("single_user", files)])
    }

    #[test]
    fn test_resolve_keeps_declared_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let exec = Task::new("single_user").resolve(&library(), &mut rng).unwrap();
        let ids: Vec<&str> = exec.files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["f0", "f1", "f2", "f3", "f4", "f5"]);
    }

    #[test]
    fn test_rewrites_apply_in_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let task = Task::new("single_user")
            .with_rewrite(r"delta\.(t\d)", "iceberg.$1")
            .with_rewrite("iceberg", "hudi");
        let exec = task.resolve(&library(), &mut rng).unwrap();
        assert_eq!(exec.files[0].statements[1].statement, "SELECT * FROM hudi.t1");
    }

    #[test]
    fn test_permute_keeps_file_set_and_statement_order() {
        let mut rng = StdRng::seed_from_u64(42);
        let exec = Task::new("single_user").permuted().resolve(&library(), &mut rng).unwrap();

        let mut ids: Vec<String> = exec.files.iter().map(|f| f.id.clone()).collect();
        ids.sort();
        assert_eq!(ids, ["f0", "f1", "f2", "f3", "f4", "f5"]);
        for file in &exec.files {
            assert_eq!(file.statements[0].id, format!("{}-s0", file.id));
            assert_eq!(file.statements[1].id, format!("{}-s1", file.id));
        }
    }

    #[test]
    fn test_bad_pattern_and_unknown_template() {
        let mut rng = StdRng::seed_from_u64(0);
        let bad = Task::new("single_user").with_rewrite("(", "x");
        assert!(matches!(bad.resolve(&library(), &mut rng), Err(Error::Regex(_))));
        assert!(matches!(
            Task::new("missing").resolve(&library(), &mut rng),
            Err(Error::InvalidWorkload(_))
        ));
    }
}
