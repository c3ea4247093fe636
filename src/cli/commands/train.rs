//! Train command - train a level-k super agent against frozen opponents

use std::{fs::File, path::PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use serde_json::to_writer_pretty;

use crate::{
    adapters::MsgPackCheckpointRepository,
    cli::output::{format_number, print_kv, print_section},
    curriculum::EvaluationConfig,
    env::{HvtConfig, make_env},
    pipeline::{
        ArtifactPaths, DisplayTiming, DistributionLogObserver, LevelKPipeline, LossLogObserver,
        ProgressObserver, RunMode, TrainingConfig,
    },
    roles::Role,
    trainers::{LinearTrainerConfig, PolicyKind, StandardTrainerFactory},
};

#[derive(Parser, Debug, Clone)]
#[command(about = "Train a level-k super agent", allow_negative_numbers = true)]
pub struct TrainArgs {
    /// Name of the scenario script
    #[arg(long, default_value = "hvt_1v1")]
    pub scenario: String,

    /// Maximum episode length
    #[arg(long, default_value_t = 25)]
    pub max_episode_len: usize,

    /// Number of episodes
    #[arg(long, default_value_t = 100_000)]
    pub num_episodes: usize,

    /// Policy for good agents (maddpg or ddpg)
    #[arg(long, default_value = "maddpg")]
    pub good_policy: String,

    /// Policy of adversaries (maddpg or ddpg)
    #[arg(long, default_value = "maddpg")]
    pub adv_policy: String,

    /// Learning rate
    #[arg(long, default_value_t = 1e-2)]
    pub lr: f64,

    /// Discount factor
    #[arg(long, default_value_t = 0.95)]
    pub gamma: f64,

    /// Number of episodes to optimize at the same time
    #[arg(long, default_value_t = 1024)]
    pub batch_size: usize,

    /// Name of the experiment
    #[arg(long, default_value = "debug")]
    pub exp_name: String,

    /// Directory in which training state and model should be saved
    #[arg(long, default_value = "/tmp/debug/")]
    pub save_dir: PathBuf,

    /// Save model once every time this many episodes are completed
    #[arg(long, default_value_t = 1000)]
    pub save_rate: usize,

    /// Directory in which opponent models are loaded (defaults to --save-dir)
    #[arg(long, default_value = "")]
    pub load_dir: String,

    /// Model file to resume from; its `_<episodes>` suffix continues episode numbering
    #[arg(long)]
    pub model_file: Option<String>,

    /// Log the super agent's policy loss to a CSV file
    #[arg(long)]
    pub log_loss: bool,

    /// Restore opponents (and the model file, if present) before training
    #[arg(long)]
    pub restore: bool,

    /// Play episodes without updates
    #[arg(long)]
    pub testing: bool,

    /// Render every step without learning
    #[arg(long)]
    pub display: bool,

    /// Collect per-step info for benchmarking
    #[arg(long)]
    pub benchmark: bool,

    /// Number of iterations run for benchmarking
    #[arg(long, default_value_t = 100_000)]
    pub benchmark_iters: u64,

    /// Directory where benchmark data is saved
    #[arg(long, default_value = "./benchmark_files/")]
    pub benchmark_dir: PathBuf,

    /// Directory where plot data is saved
    #[arg(long, default_value = "./learning_curves/")]
    pub plots_dir: PathBuf,

    /// Record per-step environment state
    #[arg(long)]
    pub logging: bool,

    /// Suffix appended to the environment log file name
    #[arg(long, default_value = "")]
    pub log_append: String,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,

    /// Role of the super agent (defender or attacker)
    #[arg(long, default_value = "defender")]
    pub training_role: String,

    /// Highest opponent level K; opponents are levels 0..=K
    #[arg(long)]
    pub level: usize,

    /// Completed episodes between evaluation cycles
    #[arg(long, default_value_t = 5000)]
    pub evaluate_rate: usize,

    /// Evaluation episodes per opponent level
    #[arg(long, default_value_t = 100)]
    pub evaluate_length: usize,

    /// Weight given to the worst level after an evaluation cycle
    #[arg(long, default_value_t = 1.0)]
    pub worst_level_weight: f64,

    /// Log the opponent selection probabilities at every save
    #[arg(long)]
    pub level_k_select_print: bool,

    /// Show a progress bar
    #[arg(long)]
    pub progress: bool,

    /// Optional path for writing the run summary as JSON
    #[arg(long)]
    pub summary: Option<PathBuf>,
}

impl TrainArgs {
    pub fn role(&self) -> Result<Role> {
        self.training_role
            .parse()
            .with_context(|| format!("invalid --training-role '{}'", self.training_role))
    }

    pub fn mode(&self) -> RunMode {
        RunMode::from_flags(self.display, self.benchmark, self.testing)
    }

    /// Translate the flags into a pipeline configuration.
    pub fn to_config(&self) -> Result<TrainingConfig> {
        if self.lr <= 0.0 || !self.lr.is_finite() {
            return Err(anyhow!("--lr must be a positive number, got {}", self.lr));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(anyhow!("--gamma must lie in [0, 1], got {}", self.gamma));
        }

        let load_dir = match self.load_dir.trim() {
            "" => None,
            dir => Some(PathBuf::from(dir)),
        };

        let config = TrainingConfig {
            role: self.role()?,
            max_level: self.level,
            evaluation: EvaluationConfig {
                rate: self.evaluate_rate,
                length: self.evaluate_length,
                worst_level_weight: self.worst_level_weight,
            },
            max_episode_len: self.max_episode_len,
            num_episodes: self.num_episodes,
            save_rate: self.save_rate,
            seed: self.seed,
            mode: self.mode(),
            restore: self.restore,
            exp_name: self.exp_name.clone(),
            model_file: self.model_file.clone(),
            paths: ArtifactPaths {
                save_dir: self.save_dir.clone(),
                load_dir,
                plots_dir: self.plots_dir.clone(),
                benchmark_dir: self.benchmark_dir.clone(),
            },
            benchmark_iters: self.benchmark_iters,
            env_logging: self.logging,
            log_append: self.log_append.clone(),
            display: DisplayTiming::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn trainer_config(&self) -> LinearTrainerConfig {
        LinearTrainerConfig {
            learning_rate: self.lr,
            gamma: self.gamma,
            batch_size: self.batch_size,
            ..LinearTrainerConfig::default()
        }
    }
}

pub fn execute(args: TrainArgs) -> Result<()> {
    let config = args.to_config()?;
    let good_policy: PolicyKind = args.good_policy.parse()?;
    let adv_policy: PolicyKind = args.adv_policy.parse()?;

    let env = make_env(
        &args.scenario,
        HvtConfig {
            seed: args.seed,
            ..HvtConfig::default()
        },
    )?;
    let factory = StandardTrainerFactory::new(env.as_ref(), args.trainer_config())
        .with_policies(good_policy, adv_policy);

    print_section("Level-k Training");
    print_kv("Scenario", &args.scenario);
    print_kv("Training role", config.role.label());
    print_kv("Opponent levels", &format!("0..={}", config.max_level));
    print_kv("Good / adv policy", &format!("{good_policy} / {adv_policy}"));
    print_kv("Mode", config.mode.label());
    print_kv("Episodes", &format_number(config.num_episodes));
    print_kv(
        "Evaluation",
        &format!(
            "every {} episodes, {} per level",
            config.evaluation.rate, config.evaluation.length
        ),
    );

    let log_loss = args.log_loss && config.mode == RunMode::Train;
    let mut pipeline = LevelKPipeline::new(
        config,
        env,
        &factory,
        Box::new(MsgPackCheckpointRepository::new()),
    )?;

    if log_loss {
        let super_index = pipeline.roster().layout().super_agent_index();
        let observer = LossLogObserver::new(
            pipeline.save_dir(),
            pipeline.target_episodes(),
            &[super_index],
        )?;
        pipeline.add_observer(Box::new(observer));
    }
    if args.level_k_select_print {
        pipeline.add_observer(Box::new(DistributionLogObserver::new()));
    }
    if args.progress {
        pipeline.add_observer(Box::new(ProgressObserver::new()));
    }

    let summary = pipeline.run()?;

    print_section("Run Summary");
    print_kv("Episodes", &format_number(summary.episodes));
    print_kv("Train steps", &summary.train_steps.to_string());
    print_kv("Updates", &format_number(summary.updates));
    print_kv("Evaluation cycles", &format_number(summary.evaluations));
    print_kv("Worst levels", &format!("{:?}", summary.worst_levels));
    print_kv(
        "Final distribution",
        &format!("{:?}", summary.final_distribution),
    );

    if let Some(path) = &args.summary {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create summary file {}", path.display()))?;
        to_writer_pretty(file, &summary)?;
        print_kv("Summary", &path.display().to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> TrainArgs {
        let mut argv = vec!["train"];
        argv.extend_from_slice(extra);
        TrainArgs::parse_from(argv)
    }

    #[test]
    fn test_defaults_match_reference_flags() {
        let args = parse(&["--level", "2"]);
        let config = args.to_config().unwrap();
        assert_eq!(config.role, Role::Defender);
        assert_eq!(config.max_level, 2);
        assert_eq!(config.max_episode_len, 25);
        assert_eq!(config.evaluation.rate, 5000);
        assert_eq!(config.evaluation.length, 100);
        assert_eq!(config.mode, RunMode::Train);
        assert!(config.paths.load_dir.is_none());
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let args = parse(&["--level", "1", "--training-role", "goalie"]);
        assert!(args.to_config().is_err());
    }

    #[test]
    fn test_mode_flags_and_load_dir() {
        let args = parse(&[
            "--level",
            "0",
            "--testing",
            "--benchmark",
            "--load-dir",
            "/models/",
            "--training-role",
            "Attacker",
        ]);
        let config = args.to_config().unwrap();
        assert_eq!(config.mode, RunMode::Benchmark);
        assert_eq!(config.role, Role::Attacker);
        assert_eq!(config.paths.load_dir, Some(PathBuf::from("/models/")));
    }
}
