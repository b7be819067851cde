//! Integration test: search driver over a conditional space

use ml_primer::error::PrimerError;
use ml_primer::optimizer::{
    Branch, HyperSearch, OptimizationConfig, Parameter, SamplerType, SearchSpace, TrialOutcome,
    TrialParams, TrialStatus,
};

fn conditional_space() -> SearchSpace {
    SearchSpace::new()
        .uniform("x", -3.0, 3.0)
        .categorical("mode", vec!["plain", "shifted"])
        .conditional(
            "depth",
            vec![
                Branch::empty("shallow"),
                Branch::new("deep", vec![Parameter::float("bonus", 0.0, 1.0)]),
            ],
        )
}

fn objective(params: &TrialParams) -> ml_primer::Result<TrialOutcome> {
    let x = params["x"].as_float().unwrap_or(0.0);
    let shift = if params["mode"].as_string() == Some("shifted") { 1.0 } else { 0.0 };
    let bonus = params.get("bonus").and_then(|v| v.as_float()).unwrap_or(0.5);
    Ok(TrialOutcome::ok((x - shift).powi(2) + bonus))
}

#[test]
fn test_tpe_search_over_conditional_space() {
    let config = OptimizationConfig::new()
        .with_n_trials(40)
        .with_n_startup_trials(10)
        .with_random_state(Some(42));
    let mut search = HyperSearch::new(config, conditional_space());
    let study = search.optimize(objective).unwrap();

    assert_eq!(study.trials.len(), 40);
    for trial in &study.trials {
        let deep = trial.params["depth"].as_string() == Some("deep");
        assert_eq!(deep, trial.params.contains_key("bonus"));
    }

    let best = study.best_trial().unwrap();
    assert_eq!(best.status, TrialStatus::Ok);
    assert!(study.trials.iter().all(|t| t.loss >= best.loss));
    assert!(best.loss < 1.0);
}

#[test]
fn test_seeded_searches_repeat() {
    let run = || {
        let config = OptimizationConfig::new()
            .with_n_trials(15)
            .with_n_startup_trials(5)
            .with_random_state(Some(7));
        let mut search = HyperSearch::new(config, conditional_space());
        search.optimize(objective).unwrap();
        search
            .study()
            .trials
            .iter()
            .map(|t| t.loss)
            .collect::<Vec<f64>>()
    };

    assert_eq!(run(), run());
}

#[test]
fn test_failing_objective_keeps_going() {
    let config = OptimizationConfig::new()
        .with_n_trials(8)
        .with_sampler(SamplerType::Random)
        .with_random_state(Some(1));
    let mut search = HyperSearch::new(config, conditional_space());

    let study = search
        .optimize(|params| {
            if params["mode"].as_string() == Some("shifted") {
                Err(PrimerError::TrainingError("unsupported mode".to_string()))
            } else {
                objective(params)
            }
        })
        .unwrap();

    assert_eq!(study.trials.len(), 8);
    for trial in &study.trials {
        let shifted = trial.params["mode"].as_string() == Some("shifted");
        assert_eq!(shifted, trial.status == TrialStatus::Fail);
    }
    if let Some(best) = study.best_trial() {
        assert_eq!(best.params["mode"].as_string(), Some("plain"));
    }
}

#[test]
fn test_history_round_trip_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");

    let config = OptimizationConfig::new().with_n_trials(5).with_random_state(Some(3));
    let mut search = HyperSearch::new(config, conditional_space());
    search.optimize(objective).unwrap();
    search.save_study(&path).unwrap();

    let loaded = HyperSearch::load_study(&path).unwrap();
    assert_eq!(loaded.trials.len(), 5);
    assert_eq!(loaded.best_trial_idx, search.study().best_trial_idx);

    let mut loaded_names: Vec<&String> = loaded.best_params().unwrap().keys().collect();
    let mut names: Vec<&String> = search.study().best_params().unwrap().keys().collect();
    loaded_names.sort();
    names.sort();
    assert_eq!(loaded_names, names);
}
