//! Optimization configuration

use serde::{Deserialize, Serialize};
use super::SamplerType;

/// Configuration for hyperparameter optimization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    /// Number of trials to run
    pub n_trials: usize,

    /// Sampler type
    pub sampler: SamplerType,

    /// Number of initial random samples before optimization
    pub n_startup_trials: usize,

    /// Random seed; `None` draws from entropy
    pub random_state: Option<u64>,

    /// Whether to print one line per trial
    pub verbose: bool,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            n_trials: 100,
            sampler: SamplerType::TPE,
            n_startup_trials: 10,
            random_state: None,
            verbose: false,
        }
    }
}

impl OptimizationConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set number of trials
    pub fn with_n_trials(mut self, n: usize) -> Self {
        self.n_trials = n;
        self
    }

    /// Builder method to set sampler
    pub fn with_sampler(mut self, sampler: SamplerType) -> Self {
        self.sampler = sampler;
        self
    }

    /// Builder method to set the number of random startup trials
    pub fn with_n_startup_trials(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    /// Builder method to seed the sampler
    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    /// Builder method to toggle per-trial output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OptimizationConfig::default();
        assert_eq!(config.n_trials, 100);
        assert!(matches!(config.sampler, SamplerType::TPE));
        assert!(config.random_state.is_none());
    }

    #[test]
    fn test_builder() {
        let config = OptimizationConfig::new()
            .with_n_trials(50)
            .with_sampler(SamplerType::Random)
            .with_random_state(Some(3));

        assert_eq!(config.n_trials, 50);
        assert!(matches!(config.sampler, SamplerType::Random));
        assert_eq!(config.random_state, Some(3));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: OptimizationConfig = serde_json::from_str(r#"{"n_trials": 7}"#).unwrap();
        assert_eq!(config.n_trials, 7);
        assert_eq!(config.n_startup_trials, 10);
    }
}
