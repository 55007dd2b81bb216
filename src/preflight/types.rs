//! Preflight check types and report.

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed.
    Pass,
    /// Check failed - the ISO build will fail.
    Fail,
    /// Usable, but something is off.
    Warn,
    /// Not applicable with the current configuration.
    Skip,
}

impl CheckStatus {
    fn tag(self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Warn => "WARN",
            CheckStatus::Skip => "SKIP",
        }
    }
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, details: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            status,
            details: details.map(str::to_string),
        }
    }

    pub fn pass(name: &str) -> Self {
        Self::new(name, CheckStatus::Pass, None)
    }

    pub fn pass_with(name: &str, details: &str) -> Self {
        Self::new(name, CheckStatus::Pass, Some(details))
    }

    pub fn fail(name: &str, details: &str) -> Self {
        Self::new(name, CheckStatus::Fail, Some(details))
    }

    pub fn warn(name: &str, details: &str) -> Self {
        Self::new(name, CheckStatus::Warn, Some(details))
    }

    pub fn skip(name: &str, details: &str) -> Self {
        Self::new(name, CheckStatus::Skip, Some(details))
    }
}

/// Results of all preflight checks.
#[derive(Debug, Default)]
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    pub fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    /// No failures.
    pub fn all_passed(&self) -> bool {
        self.count(CheckStatus::Fail) == 0
    }

    pub fn fail_count(&self) -> usize {
        self.count(CheckStatus::Fail)
    }

    pub fn warn_count(&self) -> usize {
        self.count(CheckStatus::Warn)
    }

    pub fn find(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn print(&self) {
        println!("=== Preflight Check Results ===\n");

        for check in &self.checks {
            match &check.details {
                Some(details) => println!("  [{}] {}: {}", check.status.tag(), check.name, details),
                None => println!("  [{}] {}", check.status.tag(), check.name),
            }
        }

        println!();
        let applicable = self.checks.len() - self.count(CheckStatus::Skip);
        println!(
            "Summary: {}/{} passed",
            self.count(CheckStatus::Pass),
            applicable
        );
        if self.fail_count() > 0 {
            println!("         {} FAILED - the ISO build will not succeed", self.fail_count());
        }
        if self.warn_count() > 0 {
            println!("         {} warnings", self.warn_count());
        }
    }
}
