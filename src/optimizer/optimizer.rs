//! HyperSearch - trial loop driving a sampler against an objective

use crate::error::Result;
use super::{
    config::OptimizationConfig,
    search_space::{SearchSpace, TrialParams},
    samplers::{Sampler, create_sampler},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome status of a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialStatus {
    Ok,
    Fail,
}

/// What an objective reports back for one configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    /// Value to minimize
    pub loss: f64,
    pub status: TrialStatus,
    /// Additional metrics
    pub metrics: HashMap<String, f64>,
}

impl TrialOutcome {
    /// A successful outcome with the given loss
    pub fn ok(loss: f64) -> Self {
        Self {
            loss,
            status: TrialStatus::Ok,
            metrics: HashMap::new(),
        }
    }

    /// Attach a named metric
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }
}

/// Result of a single trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// Trial number
    pub trial_id: usize,
    /// Parameters used
    pub params: TrialParams,
    /// Objective value; failed trials store +inf
    #[serde(with = "loss_serde")]
    pub loss: f64,
    pub status: TrialStatus,
    /// Trial duration in seconds
    pub duration_secs: f64,
    /// Additional metrics; non-finite values are stored as null
    #[serde(with = "metrics_serde")]
    pub metrics: HashMap<String, f64>,
    /// Error message of a failed trial
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrialResult {
    pub fn is_ok(&self) -> bool {
        self.status == TrialStatus::Ok
    }
}

// JSON has no infinity; failed losses round-trip through null
mod loss_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(loss: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if loss.is_finite() {
            serializer.serialize_some(loss)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

mod metrics_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::HashMap;

    pub fn serialize<S: Serializer>(
        metrics: &HashMap<String, f64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            metrics
                .iter()
                .map(|(name, &value)| (name, Some(value).filter(|v| v.is_finite()))),
        )
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<String, f64>, D::Error> {
        let raw = HashMap::<String, Option<f64>>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(name, value)| (name, value.unwrap_or(f64::NAN)))
            .collect())
    }
}

/// Study containing all trials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Study {
    /// All trial results in execution order
    pub trials: Vec<TrialResult>,
    /// Best trial index
    pub best_trial_idx: Option<usize>,
    /// Total duration
    pub total_duration_secs: f64,
}

impl Study {
    /// Create a new study
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the best trial
    pub fn best_trial(&self) -> Option<&TrialResult> {
        self.best_trial_idx.and_then(|idx| self.trials.get(idx))
    }

    /// Get the best (minimum) loss
    pub fn best_loss(&self) -> Option<f64> {
        self.best_trial().map(|t| t.loss)
    }

    /// Get the best parameters
    pub fn best_params(&self) -> Option<&TrialParams> {
        self.best_trial().map(|t| &t.params)
    }

    /// Number of trials that failed
    pub fn n_failed(&self) -> usize {
        self.trials.iter().filter(|t| !t.is_ok()).count()
    }

    /// Add a trial result
    pub fn add_trial(&mut self, result: TrialResult) {
        let idx = self.trials.len();

        let is_better = result.is_ok()
            && match self.best_loss() {
                None => true,
                Some(best) => result.loss < best,
            };

        if is_better {
            self.best_trial_idx = Some(idx);
        }

        self.trials.push(result);
    }
}

/// Sequential hyperparameter search
pub struct HyperSearch {
    config: OptimizationConfig,
    search_space: SearchSpace,
    sampler: Box<dyn Sampler>,
    study: Study,
}

impl HyperSearch {
    /// Create a new optimizer
    pub fn new(config: OptimizationConfig, search_space: SearchSpace) -> Self {
        let sampler = create_sampler(config.sampler, config.random_state, config.n_startup_trials);

        Self {
            config,
            search_space,
            sampler,
            study: Study::new(),
        }
    }

    /// Run `n_trials` evaluations of `objective`, minimizing its loss.
    ///
    /// An objective error or non-finite loss is recorded as a failed trial
    /// and the loop moves on.
    pub fn optimize<F>(&mut self, mut objective: F) -> Result<&Study>
    where
        F: FnMut(&TrialParams) -> Result<TrialOutcome>,
    {
        self.search_space.validate()?;

        let start = Instant::now();
        let mut history: Vec<(TrialParams, f64)> = self
            .study
            .trials
            .iter()
            .map(|t| (t.params.clone(), t.loss))
            .collect();
        let first_id = self.study.trials.len();

        for trial_id in first_id..first_id + self.config.n_trials {
            let trial_start = Instant::now();

            // Sample parameters
            let params = self.sampler.sample(&self.search_space, &history);

            let (loss, status, metrics, error) = match objective(&params) {
                Ok(outcome) if outcome.status == TrialStatus::Ok && outcome.loss.is_finite() => {
                    (outcome.loss, TrialStatus::Ok, outcome.metrics, None)
                }
                Ok(outcome) => {
                    let reason = if outcome.status == TrialStatus::Fail {
                        "objective reported failure".to_string()
                    } else {
                        format!("non-finite loss {}", outcome.loss)
                    };
                    (f64::INFINITY, TrialStatus::Fail, outcome.metrics, Some(reason))
                }
                Err(e) => (f64::INFINITY, TrialStatus::Fail, HashMap::new(), Some(e.to_string())),
            };

            if let Some(reason) = &error {
                warn!(trial_id, error = %reason, "Trial failed");
            } else {
                debug!(trial_id, loss, "Trial complete");
            }

            history.push((params.clone(), loss));

            let result = TrialResult {
                trial_id,
                params,
                loss,
                status,
                duration_secs: trial_start.elapsed().as_secs_f64(),
                metrics,
                error,
            };

            self.study.add_trial(result);

            if self.config.verbose {
                let best = self.study.best_loss().unwrap_or(f64::INFINITY);
                match status {
                    TrialStatus::Ok => {
                        println!("Trial {}: loss={:.6} (best={:.6})", trial_id, loss, best)
                    }
                    TrialStatus::Fail => println!("Trial {}: FAILED (best={:.6})", trial_id, best),
                }
            }
        }

        self.study.total_duration_secs += start.elapsed().as_secs_f64();

        info!(
            n_trials = self.study.trials.len(),
            n_failed = self.study.n_failed(),
            best_loss = ?self.study.best_loss(),
            "Search finished"
        );

        Ok(&self.study)
    }

    /// Get the study results
    pub fn study(&self) -> &Study {
        &self.study
    }

    /// Save study to file as pretty JSON
    pub fn save_study(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.study)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load study from file
    pub fn load_study(path: impl AsRef<Path>) -> Result<Study> {
        let json = std::fs::read_to_string(path)?;
        let study: Study = serde_json::from_str(&json)?;
        Ok(study)
    }
}
