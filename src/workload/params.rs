//! `${name}` placeholder substitution

use super::{ParameterValues, StatementExec};

const OPEN: &str = "${";
const CLOSE: char = '}';

/// Substitute `${name}` placeholders in the statement text.
///
/// Placeholders with no value, and unterminated `${`, are left as written.
///
/// # Example
///
/// ```rust
/// use lst_bench::workload::{replace_parameters, ParameterValues, StatementExec};
///
/// let mut values = ParameterValues::default();
/// values.insert("db".to_string(), "tpcds".to_string());
///
/// let statement = StatementExec::new("q1", "SELECT * FROM ${db}.store_sales ${asof}");
/// let resolved = replace_parameters(&statement, &values);
/// assert_eq!(resolved.statement, "SELECT * FROM tpcds.store_sales ${asof}");
/// ```
#[must_use]
pub fn replace_parameters(statement: &StatementExec, values: &ParameterValues) -> StatementExec {
    StatementExec {
        id: statement.id.clone(),
        statement: substitute(&statement.statement, values),
    }
}

fn substitute(text: &str, values: &ParameterValues) -> String {
    if values.is_empty() || !text.contains(OPEN) {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];
        match after.find(CLOSE) {
            Some(end) => {
                let name = &after[..end];
                match values.get(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + OPEN.len() + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
