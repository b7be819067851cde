//! Search space definition for hyperparameters

use crate::error::{PrimerError, Result};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Type of parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterType {
    /// Continuous float parameter, uniform on [low, high)
    Float {
        low: f64,
        high: f64,
        log_scale: bool,
    },
    /// Integer parameter on [low, high]
    Int { low: i64, high: i64 },
    /// One of a fixed list of values
    Categorical { choices: Vec<ParameterValue> },
    /// Boolean parameter
    Boolean,
    /// Pick a branch label, then sample only that branch's parameters
    Conditional { branches: Vec<Branch> },
}

/// Labelled sub-space of a conditional parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub label: String,
    pub parameters: Vec<Parameter>,
}

impl Branch {
    pub fn new(label: impl Into<String>, parameters: Vec<Parameter>) -> Self {
        Self {
            label: label.into(),
            parameters,
        }
    }

    /// Branch that adds no parameters
    pub fn empty(label: impl Into<String>) -> Self {
        Self::new(label, Vec::new())
    }
}

/// A single hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: ParameterType,
}

impl Parameter {
    /// Create a float parameter
    pub fn float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Float {
                low,
                high,
                log_scale: false,
            },
        }
    }

    /// Create a log-scale float parameter
    pub fn log_float(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Float {
                low,
                high,
                log_scale: true,
            },
        }
    }

    /// Create an integer parameter
    pub fn int(name: impl Into<String>, low: i64, high: i64) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Int { low, high },
        }
    }

    /// Create a parameter choosing among arbitrary values
    pub fn choice<V: Into<ParameterValue>>(name: impl Into<String>, choices: Vec<V>) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Categorical {
                choices: choices.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Create a categorical parameter over strings
    pub fn categorical(name: impl Into<String>, choices: Vec<&str>) -> Self {
        Self::choice(name, choices)
    }

    /// Create a boolean parameter
    pub fn boolean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Boolean,
        }
    }

    /// Create a conditional parameter
    pub fn conditional(name: impl Into<String>, branches: Vec<Branch>) -> Self {
        Self {
            name: name.into(),
            param_type: ParameterType::Conditional { branches },
        }
    }

    /// Sample this parameter into `out`.
    ///
    /// Conditionals also sample the parameters of the chosen branch.
    pub fn sample_into(&self, rng: &mut impl Rng, out: &mut TrialParams) {
        let value = match &self.param_type {
            ParameterType::Float { low, high, log_scale } => {
                let val = if *log_scale {
                    let log_low = low.ln();
                    let log_high = high.ln();
                    (rng.gen::<f64>() * (log_high - log_low) + log_low).exp()
                } else {
                    rng.gen::<f64>() * (high - low) + low
                };
                ParameterValue::Float(val)
            }
            ParameterType::Int { low, high } => ParameterValue::Int(rng.gen_range(*low..=*high)),
            ParameterType::Categorical { choices } => {
                let idx = rng.gen_range(0..choices.len());
                choices[idx].clone()
            }
            ParameterType::Boolean => ParameterValue::Bool(rng.gen()),
            ParameterType::Conditional { branches } => {
                let branch = &branches[rng.gen_range(0..branches.len())];
                for nested in &branch.parameters {
                    nested.sample_into(rng, out);
                }
                ParameterValue::String(branch.label.clone())
            }
        };
        out.insert(self.name.clone(), value);
    }
}

/// Sampled parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Float(f64),
    Int(i64),
    String(String),
    Bool(bool),
}

impl ParameterValue {
    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            ParameterValue::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            ParameterValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::String(v) => write!(f, "{}", v),
            ParameterValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::String(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        ParameterValue::String(v)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Bool(v)
    }
}

/// Search space for hyperparameter optimization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSpace {
    parameters: Vec<Parameter>,
}

impl SearchSpace {
    /// Create a new empty search space
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter to the search space
    pub fn add(mut self, param: Parameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// Add a uniform float parameter
    pub fn uniform(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(Parameter::float(name, low, high))
    }

    /// Add a log-scale float parameter
    pub fn log_uniform(self, name: impl Into<String>, low: f64, high: f64) -> Self {
        self.add(Parameter::log_float(name, low, high))
    }

    /// Add an integer parameter
    pub fn int(self, name: impl Into<String>, low: i64, high: i64) -> Self {
        self.add(Parameter::int(name, low, high))
    }

    /// Add a choice among arbitrary values
    pub fn choice<V: Into<ParameterValue>>(self, name: impl Into<String>, choices: Vec<V>) -> Self {
        self.add(Parameter::choice(name, choices))
    }

    /// Add a categorical parameter over strings
    pub fn categorical(self, name: impl Into<String>, choices: Vec<&str>) -> Self {
        self.add(Parameter::categorical(name, choices))
    }

    /// Add a boolean parameter
    pub fn boolean(self, name: impl Into<String>) -> Self {
        self.add(Parameter::boolean(name))
    }

    /// Add a conditional parameter
    pub fn conditional(self, name: impl Into<String>, branches: Vec<Branch>) -> Self {
        self.add(Parameter::conditional(name, branches))
    }

    /// Top-level parameters
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Sample a random configuration
    pub fn sample(&self, rng: &mut impl Rng) -> TrialParams {
        let mut params = TrialParams::new();
        for p in &self.parameters {
            p.sample_into(rng, &mut params);
        }
        params
    }

    /// Number of top-level parameters
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Names of every parameter, including those nested in branches
    pub fn param_names(&self) -> Vec<String> {
        fn collect(params: &[Parameter], out: &mut Vec<String>) {
            for p in params {
                out.push(p.name.clone());
                if let ParameterType::Conditional { branches } = &p.param_type {
                    for branch in branches {
                        collect(&branch.parameters, out);
                    }
                }
            }
        }

        let mut names = Vec::new();
        collect(&self.parameters, &mut names);
        names
    }

    /// Check parameter bounds and that every name is unique
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for name in self.param_names() {
            if !seen.insert(name.clone()) {
                return Err(PrimerError::ConfigError(format!(
                    "duplicate parameter name '{}'",
                    name
                )));
            }
        }
        validate_parameters(&self.parameters)
    }
}

fn validate_parameters(params: &[Parameter]) -> Result<()> {
    for p in params {
        let invalid = |reason: &str| PrimerError::InvalidParameter {
            name: p.name.clone(),
            value: format!("{:?}", p.param_type),
            reason: reason.to_string(),
        };
        match &p.param_type {
            ParameterType::Float { low, high, log_scale } => {
                if low >= high {
                    return Err(invalid("low must be below high"));
                }
                if *log_scale && *low <= 0.0 {
                    return Err(invalid("log scale needs a positive lower bound"));
                }
            }
            ParameterType::Int { low, high } => {
                if low > high {
                    return Err(invalid("low must not exceed high"));
                }
            }
            ParameterType::Categorical { choices } => {
                if choices.is_empty() {
                    return Err(invalid("needs at least one choice"));
                }
            }
            ParameterType::Boolean => {}
            ParameterType::Conditional { branches } => {
                if branches.is_empty() {
                    return Err(invalid("needs at least one branch"));
                }
                for branch in branches {
                    validate_parameters(&branch.parameters)?;
                }
            }
        }
    }
    Ok(())
}

/// Alias for sampled configuration
pub type TrialParams = HashMap<String, ParameterValue>;

#[cfg(test)]
mod tests {
    use super::*;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn conditional_space() -> SearchSpace {
        SearchSpace::new()
            .uniform("dropout", 0.0, 1.0)
            .conditional(
                "depth",
                vec![
                    Branch::empty("shallow"),
                    Branch::new("deep", vec![Parameter::choice("extra_units", vec![64_i64, 128])]),
                ],
            )
    }

    #[test]
    fn test_search_space_builder() {
        let space = SearchSpace::new()
            .uniform("learning_rate", 0.001, 0.1)
            .int("n_estimators", 10, 1000)
            .categorical("model", vec!["rf", "gbm", "linear"])
            .choice("batch_size", vec![64_i64, 128])
            .boolean("early_stopping");

        assert_eq!(space.len(), 5);
        assert!(space.validate().is_ok());
    }

    #[test]
    fn test_parameter_sampling() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let space = SearchSpace::new().uniform("lr", 0.0, 1.0).int("n", 3, 5);

        for _ in 0..50 {
            let params = space.sample(&mut rng);
            let lr = params["lr"].as_float().unwrap();
            let n = params["n"].as_int().unwrap();
            assert!((0.0..1.0).contains(&lr));
            assert!((3..=5).contains(&n));
        }
    }

    #[test]
    fn test_log_scale_sampling() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let space = SearchSpace::new().log_uniform("lr", 0.0001, 0.1);

        for _ in 0..100 {
            let v = space.sample(&mut rng)["lr"].as_float().unwrap();
            assert!(v >= 0.0001 && v <= 0.1 + 1e-12);
        }
    }

    #[test]
    fn test_choice_sampling_keeps_value_types() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        let space = SearchSpace::new()
            .choice("batch_size", vec![64_i64, 128])
            .categorical("optimizer", vec!["adam", "sgd"]);

        let params = space.sample(&mut rng);
        assert!(matches!(params["batch_size"], ParameterValue::Int(64) | ParameterValue::Int(128)));
        assert!(["adam", "sgd"].contains(&params["optimizer"].as_string().unwrap()));
    }

    #[test]
    fn test_conditional_only_samples_active_branch() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let space = conditional_space();

        let mut saw_deep = false;
        let mut saw_shallow = false;
        for _ in 0..100 {
            let params = space.sample(&mut rng);
            match params["depth"].as_string().unwrap() {
                "deep" => {
                    saw_deep = true;
                    assert!(params.contains_key("extra_units"));
                }
                "shallow" => {
                    saw_shallow = true;
                    assert!(!params.contains_key("extra_units"));
                }
                other => panic!("unexpected branch {}", other),
            }
        }
        assert!(saw_deep && saw_shallow);
    }

    #[test]
    fn test_param_names_include_nested() {
        let names = conditional_space().param_names();
        assert_eq!(names, vec!["dropout", "depth", "extra_units"]);
    }

    #[test]
    fn test_validate_rejects_bad_spaces() {
        assert!(SearchSpace::new().uniform("x", 1.0, 0.0).validate().is_err());
        assert!(SearchSpace::new().log_uniform("x", 0.0, 1.0).validate().is_err());
        assert!(SearchSpace::new()
            .choice("x", Vec::<i64>::new())
            .validate()
            .is_err());
        assert!(SearchSpace::new()
            .uniform("x", 0.0, 1.0)
            .int("x", 0, 1)
            .validate()
            .is_err());
    }

    #[test]
    fn test_parameter_value_display() {
        assert_eq!(ParameterValue::Int(512).to_string(), "512");
        assert_eq!(ParameterValue::from("relu").to_string(), "relu");
        assert_eq!(ParameterValue::Bool(true).to_string(), "true");
    }
}
