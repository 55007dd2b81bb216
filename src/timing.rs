//! Wall-clock time per assembly phase.

use std::fmt;
use std::time::{Duration, Instant};

/// Phases in the order they ran, with how long each took.
#[derive(Debug, Default)]
pub struct PhaseTimes {
    phases: Vec<(&'static str, Duration)>,
}

impl PhaseTimes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `phase`, recording its duration whether or not it succeeds.
    pub fn run<T, E>(
        &mut self,
        phase: &'static str,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        tracing::debug!(phase, ok = result.is_ok(), "phase took {:.3}s", elapsed.as_secs_f64());
        self.phases.push((phase, elapsed));
        result
    }

    pub fn phases(&self) -> &[(&'static str, Duration)] {
        &self.phases
    }

    pub fn get(&self, phase: &str) -> Option<Duration> {
        self.phases
            .iter()
            .find(|(name, _)| *name == phase)
            .map(|(_, elapsed)| *elapsed)
    }

    pub fn total(&self) -> Duration {
        self.phases.iter().map(|(_, elapsed)| *elapsed).sum()
    }

    pub fn print(&self) {
        if self.phases.is_empty() {
            return;
        }
        println!("\nPhase times:");
        for (phase, elapsed) in &self.phases {
            println!("  {:<16} {}", phase, Elapsed(*elapsed));
        }
        println!("  {:<16} {}", "Total", Elapsed(self.total()));
    }
}

/// Seconds, or minutes once past one minute.
pub struct Elapsed(pub Duration);

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs_f64();
        if secs >= 60.0 {
            write!(f, "{:.1}m", secs / 60.0)
        } else {
            write!(f, "{:.1}s", secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_phase_is_still_recorded() {
        let mut times = PhaseTimes::new();
        times.run("Stage workspace", || Ok::<_, String>(())).unwrap();
        let err = times.run("Master ISO", || Err::<(), _>("xorriso exited 1".to_string()));

        assert!(err.is_err());
        let names: Vec<&str> = times.phases().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["Stage workspace", "Master ISO"]);
        assert!(times.get("Master ISO").is_some());
        assert!(times.get("Copy content").is_none());
    }

    #[test]
    fn test_elapsed_switches_to_minutes() {
        assert_eq!(Elapsed(Duration::from_millis(4_200)).to_string(), "4.2s");
        assert_eq!(Elapsed(Duration::from_secs(90)).to_string(), "1.5m");
    }
}
