//! ml-primer CLI Module
//!
//! Command-line interface for the scaling comparison and the hyperparameter search.

use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::time::Instant;

use crate::optimizer::SamplerType;
use crate::pipelines::hyperparameter_search::{self, HyperparameterSearchConfig};
use crate::pipelines::scaling_comparison::{self, ScalingComparisonConfig};
use crate::utils::{load_mnist, MnistLimits};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "ml-primer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Feature scaling comparison and hyperparameter search for small classifiers")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train one classifier per scaling strategy and compare test accuracy
    CompareScaling(CompareScalingArgs),

    /// Search network hyperparameters on MNIST
    Search(SearchArgs),
}

#[derive(Args, Debug, Default)]
pub struct CompareScalingArgs {
    /// JSON config file; flags below override its fields
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Input CSV file
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Training epochs per model
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Seed for the train/test split
    #[arg(long)]
    pub seed: Option<u64>,
}

impl CompareScalingArgs {
    pub fn to_config(&self) -> anyhow::Result<ScalingComparisonConfig> {
        let mut config = match &self.config {
            Some(path) => ScalingComparisonConfig::from_file(path)?,
            None => ScalingComparisonConfig::default(),
        };
        if let Some(data) = &self.data {
            config.data_path = data.clone();
        }
        if let Some(epochs) = self.epochs {
            config.epochs = epochs;
        }
        if let Some(seed) = self.seed {
            config.split_seed = seed;
        }
        Ok(config)
    }
}

#[derive(Args, Debug, Default)]
pub struct SearchArgs {
    /// JSON config file; flags below override its fields
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory with the MNIST IDX files
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Number of trials
    #[arg(short = 'n', long)]
    pub trials: Option<usize>,

    /// Training epochs per trial
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Sampler (random, tpe)
    #[arg(long)]
    pub sampler: Option<String>,

    /// Seed for the sampler
    #[arg(long)]
    pub seed: Option<u64>,

    /// Trial history output file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Do not write the trial history
    #[arg(long)]
    pub no_save: bool,

    /// Use at most this many training images
    #[arg(long)]
    pub max_train: Option<usize>,

    /// Use at most this many test images
    #[arg(long)]
    pub max_test: Option<usize>,
}

impl SearchArgs {
    pub fn to_config(&self) -> anyhow::Result<HyperparameterSearchConfig> {
        let mut config = match &self.config {
            Some(path) => HyperparameterSearchConfig::from_file(path)?,
            None => HyperparameterSearchConfig::default(),
        };
        if let Some(data) = &self.data {
            config.data_dir = data.clone();
        }
        if let Some(trials) = self.trials {
            config.n_trials = trials;
        }
        if let Some(epochs) = self.epochs {
            config.epochs = epochs;
        }
        if let Some(sampler) = &self.sampler {
            config.sampler = parse_sampler(sampler)?;
        }
        if self.seed.is_some() {
            config.random_state = self.seed;
        }
        if let Some(output) = &self.output {
            config.trials_path = Some(output.clone());
        }
        if self.no_save {
            config.trials_path = None;
        }
        if self.max_train.is_some() {
            config.max_train = self.max_train;
        }
        if self.max_test.is_some() {
            config.max_test = self.max_test;
        }
        Ok(config)
    }
}

fn parse_sampler(name: &str) -> anyhow::Result<SamplerType> {
    match name.to_lowercase().as_str() {
        "random" => Ok(SamplerType::Random),
        "tpe" => Ok(SamplerType::TPE),
        _ => anyhow::bail!("Invalid sampler: {}", name),
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_compare_scaling(args: &CompareScalingArgs) -> anyhow::Result<()> {
    let config = args.to_config()?;
    section("Scaling comparison");

    step_run("Loading data");
    let start = Instant::now();
    let (split, encoder) = scaling_comparison::prepare(&config)?;
    step_done(&format!("{} classes in {:?}", encoder.n_classes(), start.elapsed()));

    println!("  {}", kv("train samples", &split.n_train().to_string()));
    println!("  {}", kv("test samples ", &split.n_test().to_string()));
    println!();

    step_run(&format!("Training {} models", "3".cyan()));
    let start = Instant::now();
    let report = scaling_comparison::compare_scalers(&split, &encoder, &config)?;
    step_done(&format!("{:?}", start.elapsed()));

    let best = report.best().map(|b| b.scaler);
    println!();
    for r in &report.results {
        let marker = if Some(r.scaler) == best { ok("best") } else { dim("") };
        println!(
            "  {:<16} {} {}",
            muted(r.scaler.name()),
            format!("{:.2}", r.accuracy).white().bold(),
            marker
        );
    }
    println!();

    Ok(())
}

pub fn cmd_search(args: &SearchArgs) -> anyhow::Result<()> {
    let config = args.to_config()?;
    section("Hyperparameter search");

    step_run("Loading MNIST");
    let start = Instant::now();
    let limits = MnistLimits {
        max_train: config.max_train,
        max_test: config.max_test,
    };
    let data = load_mnist(&config.data_dir, limits)?;
    step_done(&format!(
        "{} train / {} test in {:?}",
        data.n_train(),
        data.n_test(),
        start.elapsed()
    ));

    println!("  {}", kv("trials ", &config.n_trials.to_string()));
    println!("  {}", kv("epochs ", &config.epochs.to_string()));
    println!("  {}", kv("sampler", &format!("{:?}", config.sampler)));
    println!();

    let start = Instant::now();
    let report = hyperparameter_search::run_search(&data, &config)?;
    step_ok(&format!(
        "{} trials ({} failed) in {:?}",
        report.n_trials,
        report.n_failed,
        start.elapsed()
    ));

    section("Best configuration");
    let mut names: Vec<&String> = report.best_params.keys().collect();
    names.sort();
    for name in names {
        println!("  {:<20} {}", muted(name), report.best_params[name].to_string().white());
    }
    println!(
        "  {:<20} {}",
        muted("accuracy"),
        format!("{:.4}", report.best_accuracy).white().bold()
    );
    println!();

    if let Some(path) = &report.saved_to {
        step_ok(&format!("Saved trials → {}", path.display()));
        println!();
    }

    Ok(())
}
