//! Sampling strategies for hyperparameter optimization

use super::search_space::{Parameter, ParameterType, ParameterValue, SearchSpace, TrialParams};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Type of sampler to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplerType {
    /// Random sampling
    Random,
    /// Tree-structured Parzen Estimator
    TPE,
}

/// Trait for hyperparameter samplers
pub trait Sampler: Send + Sync {
    /// Sample the next set of hyperparameters given `(params, loss)` history
    fn sample(&mut self, search_space: &SearchSpace, history: &[(TrialParams, f64)]) -> TrialParams;
}

fn make_rng(seed: Option<u64>) -> Xoshiro256PlusPlus {
    match seed {
        Some(s) => Xoshiro256PlusPlus::seed_from_u64(s),
        None => Xoshiro256PlusPlus::from_entropy(),
    }
}

/// Random sampler
#[derive(Debug)]
pub struct RandomSampler {
    rng: Xoshiro256PlusPlus,
}

impl RandomSampler {
    /// Create a new random sampler
    pub fn new(seed: Option<u64>) -> Self {
        Self { rng: make_rng(seed) }
    }
}

impl Sampler for RandomSampler {
    fn sample(
        &mut self,
        search_space: &SearchSpace,
        _history: &[(TrialParams, f64)],
    ) -> TrialParams {
        search_space.sample(&mut self.rng)
    }
}

/// Tree-structured Parzen Estimator sampler
///
/// Past trials are split at the `gamma` loss quantile into a good and a bad
/// set. Each parameter is then drawn where the density of good values `l(x)`
/// is high relative to the density of bad values `g(x)`. Parameters nested
/// in a conditional branch only see the trials in which they were active.
#[derive(Debug)]
pub struct TPESampler {
    rng: Xoshiro256PlusPlus,
    n_startup_trials: usize,
    gamma: f64,
    n_candidates: usize,
    bandwidth: f64,
}

impl TPESampler {
    /// Create a new TPE sampler
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: make_rng(seed),
            n_startup_trials: 10,
            gamma: 0.25,
            n_candidates: 24,
            bandwidth: 0.1,
        }
    }

    /// Set number of startup trials
    pub fn with_n_startup(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    /// Set gamma (quantile for splitting good/bad)
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma.clamp(0.01, 0.99);
        self
    }

    /// Set the number of candidates scored per numeric parameter
    pub fn with_n_candidates(mut self, n: usize) -> Self {
        self.n_candidates = n.max(1);
        self
    }

    fn sample_parameters(
        &mut self,
        params: &[Parameter],
        good: &[&TrialParams],
        bad: &[&TrialParams],
        out: &mut TrialParams,
    ) {
        for param in params {
            let good_values: Vec<&ParameterValue> =
                good.iter().filter_map(|t| t.get(&param.name)).collect();
            let bad_values: Vec<&ParameterValue> =
                bad.iter().filter_map(|t| t.get(&param.name)).collect();

            let value = match &param.param_type {
                ParameterType::Float { low, high, log_scale } => {
                    let to_internal = |v: f64| if *log_scale { v.ln() } else { v };
                    let g: Vec<f64> = good_values
                        .iter()
                        .filter_map(|v| v.as_float())
                        .map(to_internal)
                        .collect();
                    let b: Vec<f64> = bad_values
                        .iter()
                        .filter_map(|v| v.as_float())
                        .map(to_internal)
                        .collect();
                    let x = self.sample_continuous(&g, &b, to_internal(*low), to_internal(*high));
                    ParameterValue::Float(if *log_scale { x.exp().clamp(*low, *high) } else { x })
                }
                ParameterType::Int { low, high } => {
                    let g: Vec<f64> = good_values.iter().filter_map(|v| v.as_float()).collect();
                    let b: Vec<f64> = bad_values.iter().filter_map(|v| v.as_float()).collect();
                    let x = self.sample_continuous(&g, &b, *low as f64 - 0.5, *high as f64 + 0.5);
                    ParameterValue::Int((x.round() as i64).clamp(*low, *high))
                }
                ParameterType::Categorical { choices } => {
                    let idx = self.sample_categorical(choices, &good_values, &bad_values);
                    choices[idx].clone()
                }
                ParameterType::Boolean => {
                    let choices = [ParameterValue::Bool(false), ParameterValue::Bool(true)];
                    let idx = self.sample_categorical(&choices, &good_values, &bad_values);
                    choices[idx].clone()
                }
                ParameterType::Conditional { branches } => {
                    let labels: Vec<ParameterValue> = branches
                        .iter()
                        .map(|b| ParameterValue::String(b.label.clone()))
                        .collect();
                    let idx = self.sample_categorical(&labels, &good_values, &bad_values);
                    self.sample_parameters(&branches[idx].parameters, good, bad, out);
                    labels[idx].clone()
                }
            };

            out.insert(param.name.clone(), value);
        }
    }

    /// Draw candidates around good values and keep the one with the best l(x)/g(x)
    fn sample_continuous(&mut self, good: &[f64], bad: &[f64], low: f64, high: f64) -> f64 {
        if good.is_empty() {
            return low + self.rng.gen::<f64>() * (high - low);
        }

        let bandwidth = ((high - low) * self.bandwidth).max(1e-12);
        let mut best_value = low;
        let mut best_ratio = f64::NEG_INFINITY;

        for _ in 0..self.n_candidates {
            let base = good[self.rng.gen_range(0..good.len())];
            let candidate = (base + self.standard_normal() * bandwidth).clamp(low, high);

            let l = kde_score(candidate, good, bandwidth);
            let g = kde_score(candidate, bad, bandwidth);
            let ratio = l / (g + 1e-12);

            if ratio > best_ratio {
                best_ratio = ratio;
                best_value = candidate;
            }
        }

        best_value
    }

    /// Sample a choice index with probability proportional to smoothed l/g
    fn sample_categorical(
        &mut self,
        choices: &[ParameterValue],
        good: &[&ParameterValue],
        bad: &[&ParameterValue],
    ) -> usize {
        let k = choices.len() as f64;
        let frequency = |values: &[&ParameterValue], choice: &ParameterValue| {
            let count = values.iter().filter(|v| **v == choice).count() as f64;
            (count + 1.0) / (values.len() as f64 + k)
        };

        let weights: Vec<f64> = choices
            .iter()
            .map(|c| frequency(good, c) / frequency(bad, c))
            .collect();
        let total: f64 = weights.iter().sum();

        let mut r = self.rng.gen::<f64>() * total;
        for (idx, w) in weights.iter().enumerate() {
            if r < *w {
                return idx;
            }
            r -= w;
        }
        choices.len() - 1
    }

    // Box-Muller
    fn standard_normal(&mut self) -> f64 {
        let u1: f64 = self.rng.gen::<f64>().max(1e-12);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

impl Sampler for TPESampler {
    fn sample(
        &mut self,
        search_space: &SearchSpace,
        history: &[(TrialParams, f64)],
    ) -> TrialParams {
        let mut sorted: Vec<&(TrialParams, f64)> =
            history.iter().filter(|(_, loss)| loss.is_finite()).collect();

        // Use random sampling for startup trials
        if sorted.len() < self.n_startup_trials.max(2) {
            return search_space.sample(&mut self.rng);
        }

        sorted.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        let n_good = ((sorted.len() as f64 * self.gamma).ceil() as usize)
            .max(1)
            .min(sorted.len() - 1);
        let good: Vec<&TrialParams> = sorted[..n_good].iter().map(|(p, _)| p).collect();
        let bad: Vec<&TrialParams> = sorted[n_good..].iter().map(|(p, _)| p).collect();

        let mut params = TrialParams::new();
        self.sample_parameters(search_space.parameters(), &good, &bad, &mut params);
        params
    }
}

fn kde_score(x: f64, values: &[f64], bandwidth: f64) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    values
        .iter()
        .map(|&v| (-(x - v).powi(2) / (2.0 * bandwidth * bandwidth)).exp())
        .sum::<f64>()
        / values.len() as f64
}

/// Create a sampler from type
pub fn create_sampler(
    sampler_type: SamplerType,
    seed: Option<u64>,
    n_startup_trials: usize,
) -> Box<dyn Sampler> {
    match sampler_type {
        SamplerType::Random => Box::new(RandomSampler::new(seed)),
        SamplerType::TPE => Box::new(TPESampler::new(seed).with_n_startup(n_startup_trials)),
    }
}
