//! Outcomes of best-effort file operations.
//!
//! Housekeeping passes never abort on a single bad file. Each step records
//! an [`Outcome`] in a [`RunSummary`], which is printed once at the end.

use std::fmt;
use std::path::{Path, PathBuf};

/// Result of one best-effort step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Skipped(String),
    Failed(String),
}

impl Outcome {
    /// Turn a fallible step into an outcome, keeping the full error chain.
    pub fn from_result<T>(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(_) => Outcome::Done,
            Err(e) => Outcome::Failed(format!("{:#}", e)),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// One recorded step.
#[derive(Debug, Clone)]
pub struct Step {
    pub action: String,
    pub path: PathBuf,
    pub outcome: Outcome,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::Done => write!(f, "[DONE] {} {}", self.action, self.path.display()),
            Outcome::Skipped(why) => {
                write!(f, "[SKIP] {} {}: {}", self.action, self.path.display(), why)
            }
            Outcome::Failed(why) => {
                write!(f, "[FAIL] {} {}: {}", self.action, self.path.display(), why)
            }
        }
    }
}

/// All steps of one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub title: String,
    pub steps: Vec<Step>,
}

impl RunSummary {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            steps: Vec::new(),
        }
    }

    /// Record a step and echo it.
    pub fn record(&mut self, action: &str, path: &Path, outcome: Outcome) {
        let step = Step {
            action: action.to_string(),
            path: path.to_path_buf(),
            outcome,
        };
        match &step.outcome {
            Outcome::Failed(_) => {
                tracing::warn!("{}", step);
                println!("  {}", step);
            }
            Outcome::Skipped(_) => {
                tracing::debug!("{}", step);
                println!("  {}", step);
            }
            Outcome::Done => {
                tracing::debug!("{}", step);
                println!("  {} {}", step.action, step.path.display());
            }
        }
        self.steps.push(step);
    }

    pub fn done_count(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.is_done()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, Outcome::Skipped(_)))
            .count()
    }

    pub fn fail_count(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.is_failed()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| s.outcome.is_failed())
    }

    /// Print the closing summary.
    pub fn print(&self) {
        println!();
        println!(
            "{}: {} done, {} skipped, {} failed",
            self.title,
            self.done_count(),
            self.skipped_count(),
            self.fail_count()
        );
        for step in self.failures() {
            println!("  {}", step);
        }
    }
}
