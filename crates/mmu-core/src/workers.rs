use serde::{Deserialize, Serialize};

pub const DEFAULT_WORKER_PERCENT: u8 = 80;

/// How many workers to run, relative to the machine's parallelism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerSpec {
    /// Percentage of available threads, 1..=100
    Percent(u8),
    All,
}

impl Default for WorkerSpec {
    fn default() -> Self {
        WorkerSpec::Percent(DEFAULT_WORKER_PERCENT)
    }
}

impl WorkerSpec {
    /// `"all"` (any case), or a percentage clamped to 1..=100. Anything
    /// else falls back to the default percentage.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return WorkerSpec::All;
        }
        match s.parse::<i64>() {
            Ok(pct) => WorkerSpec::Percent(pct.clamp(1, 100) as u8),
            Err(_) => {
                tracing::warn!("Invalid worker setting '{}', using {}%", s, DEFAULT_WORKER_PERCENT);
                WorkerSpec::default()
            }
        }
    }

    /// Worker count for `units` threads, always within [1, units].
    pub fn resolve(self, units: usize) -> usize {
        let units = units.max(1);
        match self {
            WorkerSpec::All => units,
            WorkerSpec::Percent(pct) => (units * pct.min(100) as usize / 100).clamp(1, units),
        }
    }
}

/// Threads the OS says we may use.
pub fn available_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(WorkerSpec::parse("all"), WorkerSpec::All);
        assert_eq!(WorkerSpec::parse("ALL"), WorkerSpec::All);
        assert_eq!(WorkerSpec::parse("50"), WorkerSpec::Percent(50));
        assert_eq!(WorkerSpec::parse("250"), WorkerSpec::Percent(100));
        assert_eq!(WorkerSpec::parse("0"), WorkerSpec::Percent(1));
        assert_eq!(WorkerSpec::parse("-5"), WorkerSpec::Percent(1));
        assert_eq!(WorkerSpec::parse("lots"), WorkerSpec::Percent(80));
    }

    #[test]
    fn test_resolve() {
        assert_eq!(WorkerSpec::default().resolve(10), 8);
        assert_eq!(WorkerSpec::Percent(80).resolve(16), 12);
        assert_eq!(WorkerSpec::Percent(1).resolve(16), 1);
        assert_eq!(WorkerSpec::Percent(100).resolve(6), 6);
        assert_eq!(WorkerSpec::All.resolve(12), 12);
        assert_eq!(WorkerSpec::Percent(80).resolve(1), 1);
        assert_eq!(WorkerSpec::All.resolve(0), 1);
    }
}
