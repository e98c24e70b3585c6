use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::TyperError;

/// How one function came out of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Changed,
    NoReturn,
    NoExec,
    NotDocumented,
    NotChanged(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub function: String,
    pub reason: String,
}

/// Everything a run did, grouped by outcome. A function name lands in at
/// most one list.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub changed: Vec<String>,
    pub not_changed: Vec<Failure>,
    pub no_exec: Vec<String>,
    pub no_return: Vec<String>,
    pub not_documented: Vec<String>,
    /// Raw reply phrases that matched no known label.
    pub unrecognized: Vec<String>,
}

impl RunReport {
    pub fn record(&mut self, function: &str, outcome: Outcome) {
        let function = function.to_string();
        match outcome {
            Outcome::Changed => self.changed.push(function),
            Outcome::NoReturn => self.no_return.push(function),
            Outcome::NoExec => self.no_exec.push(function),
            Outcome::NotDocumented => self.not_documented.push(function),
            Outcome::NotChanged(reason) => self.not_changed.push(Failure { function, reason }),
        }
    }

    pub fn outcome_of(&self, function: &str) -> Option<Outcome> {
        let has = |list: &[String]| list.iter().any(|f| f == function);
        if has(self.changed.as_slice()) {
            Some(Outcome::Changed)
        } else if has(self.no_return.as_slice()) {
            Some(Outcome::NoReturn)
        } else if has(self.no_exec.as_slice()) {
            Some(Outcome::NoExec)
        } else if has(self.not_documented.as_slice()) {
            Some(Outcome::NotDocumented)
        } else {
            self.not_changed
                .iter()
                .find(|f| f.function == function)
                .map(|f| Outcome::NotChanged(f.reason.clone()))
        }
    }

    /// One line per function whose annotation became the placeholder.
    pub fn failure_lines(&self) -> Vec<String> {
        let undocumented = self.not_documented.iter().map(|function| Failure {
            function: function.clone(),
            reason: TyperError::NotDocumented(function.clone()).to_string(),
        });
        self.not_changed
            .iter()
            .cloned()
            .chain(undocumented)
            .map(|f| format!("Function error - {} : {}", f.function, f.reason))
            .collect()
    }

    /// Append the failure lines to `path`; earlier runs are never truncated.
    pub fn append_log(&self, path: &Path) -> std::io::Result<()> {
        let lines = self.failure_lines();
        if lines.is_empty() {
            return Ok(());
        }
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        for line in lines {
            writeln!(file, "{line}")?;
        }
        Ok(())
    }
}
