//! Generator configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Allow the parallel strategies. `false` forces the single-threaded path.
    pub parallel: bool,

    /// Explicit worker count; `None` detects it from the machine.
    pub max_threads: Option<usize>,

    /// Upper bound on detected workers unless total memory is plentiful.
    pub thread_cap: usize,

    /// Requests with fewer nodes always run single-threaded.
    pub sequential_below: usize,

    /// Largest subtree size pre-warmed before workers fan out.
    pub prewarm_limit: usize,

    /// A generic subproblem is split across threads only when it has more
    /// than `split_min_nodes` nodes below the root...
    pub split_min_nodes: usize,
    /// ...and a leaf budget above `split_min_leaves`.
    pub split_min_leaves: usize,

    /// The exact-leaf generator handles budgets up to this many leaves...
    pub optimized_max_leaves: usize,
    /// ...for trees of at least this many nodes.
    pub optimized_min_nodes: usize,

    /// Absolute node-count ceiling enforced by admission control.
    pub max_nodes: usize,

    /// Memory model is only consulted from this node count on.
    pub admission_check_from: usize,

    /// Progress polling interval.
    pub progress_interval_ms: u64,

    /// Result batches in flight between workers and the collector.
    pub channel_capacity: usize,

    /// Work claims per worker; the claim size is `total / (threads * this)`.
    pub batches_per_thread: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_threads: None,
            thread_cap: 32,
            sequential_below: 10,
            prewarm_limit: 15,
            split_min_nodes: 12,
            split_min_leaves: 4,
            optimized_max_leaves: 4,
            optimized_min_nodes: 20,
            max_nodes: 30,
            admission_check_from: 25,
            progress_interval_ms: 500,
            channel_capacity: 64,
            batches_per_thread: 4,
        }
    }
}

impl GeneratorConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `TREEGEN_PARALLEL`: `0`/`false` disables the parallel strategies
    /// - `TREEGEN_MAX_THREADS`: explicit worker count
    /// - `TREEGEN_THREAD_CAP`: cap on detected workers
    /// - `TREEGEN_PREWARM_LIMIT`: largest pre-warmed subtree size
    /// - `TREEGEN_MAX_NODES`: admission ceiling on N
    /// - `TREEGEN_PROGRESS_MS`: progress polling interval
    /// - `TREEGEN_CHANNEL_CAPACITY`: result batches in flight
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("TREEGEN_PARALLEL") {
            match s.trim().to_ascii_lowercase().as_str() {
                "0" | "false" | "no" | "off" => cfg.parallel = false,
                "1" | "true" | "yes" | "on" => cfg.parallel = true,
                _ => {}
            }
        }

        if let Ok(s) = std::env::var("TREEGEN_MAX_THREADS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_threads = Some(v);
            }
        }

        if let Ok(s) = std::env::var("TREEGEN_THREAD_CAP") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.thread_cap = v;
            }
        }

        if let Ok(s) = std::env::var("TREEGEN_PREWARM_LIMIT") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.prewarm_limit = v;
            }
        }

        if let Ok(s) = std::env::var("TREEGEN_MAX_NODES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_nodes = v;
            }
        }

        if let Ok(s) = std::env::var("TREEGEN_PROGRESS_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.progress_interval_ms = v;
            }
        }

        if let Ok(s) = std::env::var("TREEGEN_CHANNEL_CAPACITY") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.channel_capacity = v;
            }
        }

        cfg
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_threads == Some(0) {
            return Err(Error::Config("max_threads must be at least 1".into()));
        }
        if self.thread_cap == 0 {
            return Err(Error::Config("thread_cap must be at least 1".into()));
        }
        if self.channel_capacity == 0 {
            return Err(Error::Config("channel_capacity must be at least 1".into()));
        }
        if self.batches_per_thread == 0 {
            return Err(Error::Config("batches_per_thread must be at least 1".into()));
        }
        if self.progress_interval_ms == 0 {
            return Err(Error::Config("progress_interval_ms must be positive".into()));
        }
        Ok(())
    }

    /// Whether the closed-form exact-leaf generator should handle (n, m).
    pub fn should_use_optimized(&self, n: usize, m: usize) -> bool {
        m <= self.optimized_max_leaves && n >= self.optimized_min_nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = GeneratorConfig::default();
        cfg.validate().unwrap();
        assert!(cfg.parallel);
        assert_eq!(cfg.max_nodes, 30);
    }

    #[test]
    fn json_fills_missing_fields() {
        let cfg = GeneratorConfig::from_json_str(r#"{"parallel": false, "thread_cap": 2}"#).unwrap();
        assert!(!cfg.parallel);
        assert_eq!(cfg.thread_cap, 2);
        assert_eq!(cfg.prewarm_limit, GeneratorConfig::default().prewarm_limit);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let err = GeneratorConfig::from_json_str(r#"{"channel_capacity": 0}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = GeneratorConfig::from_json_str("not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn optimized_predicate_uses_thresholds() {
        let cfg = GeneratorConfig::default();
        assert!(cfg.should_use_optimized(30, 3));
        assert!(cfg.should_use_optimized(20, 4));
        assert!(!cfg.should_use_optimized(19, 3));
        assert!(!cfg.should_use_optimized(30, 5));
    }
}
