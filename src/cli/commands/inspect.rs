//! Inspect command - print the training curves a run wrote

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;

use crate::{
    cli::output::{format_series, print_kv, print_section, print_subsection},
    pipeline::{CurveArtifacts, artifacts::load_benchmark},
};

#[derive(Parser, Debug, Clone)]
#[command(about = "Inspect training curves and benchmark data")]
pub struct InspectArgs {
    /// Directory where plot data was saved
    #[arg(long, default_value = "./learning_curves/")]
    pub plots_dir: PathBuf,

    /// Name of the experiment
    #[arg(long, default_value = "debug")]
    pub exp_name: String,

    /// Optional benchmark file to summarise
    #[arg(long)]
    pub benchmark_file: Option<PathBuf>,

    /// Values shown at each end of a long series
    #[arg(long, default_value_t = 5)]
    pub keep: usize,
}

pub fn execute(args: InspectArgs) -> Result<()> {
    let artifacts = CurveArtifacts::new(&args.plots_dir, &args.exp_name);
    let (curves, worst_levels) = artifacts.load()?;

    if curves.is_empty() && worst_levels.is_empty() && args.benchmark_file.is_none() {
        return Err(anyhow!(
            "no curve data for experiment '{}' in {}",
            args.exp_name,
            args.plots_dir.display()
        ));
    }

    print_section(&format!("Experiment: {}", args.exp_name));
    print_kv("Save events", &curves.len().to_string());
    print_kv("Mean rewards", &format_series(&curves.rewards, args.keep));
    if let Some(last) = curves.rewards.last() {
        print_kv("Latest mean reward", &format!("{last:.3}"));
    }

    if !curves.is_empty() {
        let per_save = curves.agent_rewards.len() / curves.len();
        print_subsection("Per-agent mean rewards");
        for agent in 0..per_save {
            let series: Vec<f64> = curves
                .agent_rewards
                .iter()
                .skip(agent)
                .step_by(per_save.max(1))
                .copied()
                .collect();
            print_kv(&format!("Agent {agent}"), &format_series(&series, args.keep));
        }
    }

    print_subsection("Evaluation");
    print_kv("Cycles", &worst_levels.len().to_string());
    print_kv("Worst level history", &format!("{worst_levels:?}"));

    if let Some(path) = &args.benchmark_file {
        let episodes = load_benchmark(path)?;
        let steps: usize = episodes
            .iter()
            .filter_map(|agents| agents.first())
            .map(Vec::len)
            .sum();
        print_subsection("Benchmark");
        print_kv("Episodes", &episodes.len().to_string());
        print_kv("Steps", &steps.to_string());
    }
    Ok(())
}
