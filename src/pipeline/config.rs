//! Run configuration

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, curriculum::EvaluationConfig, roles::Role};

/// What the loop does besides stepping the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunMode {
    /// Curriculum training with updates, evaluation and checkpoints
    #[default]
    Train,
    /// Render every step for a human, no learning
    Display,
    /// Collect per-step info for a fixed number of steps, no learning
    Benchmark,
    /// Play episodes without updates
    Testing,
}

impl RunMode {
    /// Resolve the command-line flags; display wins over benchmark over testing.
    pub fn from_flags(display: bool, benchmark: bool, testing: bool) -> Self {
        if display {
            RunMode::Display
        } else if benchmark {
            RunMode::Benchmark
        } else if testing {
            RunMode::Testing
        } else {
            RunMode::Train
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunMode::Train => "train",
            RunMode::Display => "display",
            RunMode::Benchmark => "benchmark",
            RunMode::Testing => "testing",
        }
    }
}

/// Output and input directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactPaths {
    /// Checkpoints, loss logs and environment logs
    pub save_dir: PathBuf,
    /// Where opponent checkpoints are read from; `None` means `save_dir`
    pub load_dir: Option<PathBuf>,
    /// Training-curve artifacts
    pub plots_dir: PathBuf,
    /// Benchmark artifact
    pub benchmark_dir: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from("/tmp/debug/"),
            load_dir: None,
            plots_dir: PathBuf::from("/tmp/debug/learning_curves/"),
            benchmark_dir: PathBuf::from("/tmp/debug/benchmark_files/"),
        }
    }
}

impl ArtifactPaths {
    /// All artifact directories under one root.
    pub fn under(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            save_dir: root.clone(),
            load_dir: None,
            plots_dir: root.join("learning_curves"),
            benchmark_dir: root.join("benchmark_files"),
        }
    }

    pub fn effective_load_dir(&self) -> &PathBuf {
        self.load_dir.as_ref().unwrap_or(&self.save_dir)
    }
}

/// Render pacing for display mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayTiming {
    pub step_delay: Duration,
    pub episode_delay: Duration,
}

impl Default for DisplayTiming {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(100),
            episode_delay: Duration::from_millis(500),
        }
    }
}

/// Full configuration of a level-k run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Role of the super agent
    pub role: Role,
    /// Highest opponent level `K`
    pub max_level: usize,
    pub evaluation: EvaluationConfig,
    pub max_episode_len: usize,
    pub num_episodes: usize,
    /// Completed episodes between checkpoints
    pub save_rate: usize,
    pub seed: Option<u64>,
    pub mode: RunMode,
    /// Restore the opponent ladder (and the super agent, if `model_file` exists)
    pub restore: bool,
    pub exp_name: String,
    /// Checkpoint stem to resume from; its `_<episodes>` suffix seeds episode numbering
    pub model_file: Option<String>,
    pub paths: ArtifactPaths,
    /// Steps before a benchmark run stops
    pub benchmark_iters: u64,
    /// Record per-step state in the environment log
    pub env_logging: bool,
    /// Suffix for the testing-mode environment log
    pub log_append: String,
    pub display: DisplayTiming,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            role: Role::Defender,
            max_level: 0,
            evaluation: EvaluationConfig::default(),
            max_episode_len: 25,
            num_episodes: 100_000,
            save_rate: 1000,
            seed: None,
            mode: RunMode::Train,
            restore: false,
            exp_name: "debug".to_string(),
            model_file: None,
            paths: ArtifactPaths::default(),
            benchmark_iters: 100_000,
            env_logging: false,
            log_append: String::new(),
            display: DisplayTiming::default(),
        }
    }
}

impl TrainingConfig {
    /// Configuration for training `role` against levels `0..=max_level`.
    pub fn new(role: Role, max_level: usize) -> Self {
        Self {
            role,
            max_level,
            ..Self::default()
        }
    }

    pub fn with_evaluation(mut self, rate: usize, length: usize) -> Self {
        self.evaluation.rate = rate;
        self.evaluation.length = length;
        self
    }

    pub fn with_worst_level_weight(mut self, weight: f64) -> Self {
        self.evaluation.worst_level_weight = weight;
        self
    }

    pub fn with_episodes(mut self, num_episodes: usize, max_episode_len: usize) -> Self {
        self.num_episodes = num_episodes;
        self.max_episode_len = max_episode_len;
        self
    }

    pub fn with_save_rate(mut self, save_rate: usize) -> Self {
        self.save_rate = save_rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_paths(mut self, paths: ArtifactPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_exp_name(mut self, exp_name: impl Into<String>) -> Self {
        self.exp_name = exp_name.into();
        self
    }

    pub fn with_restore(mut self, model_file: Option<String>) -> Self {
        self.restore = true;
        self.model_file = model_file;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.evaluation.validate()?;
        if self.max_episode_len == 0 {
            return Err(Error::config("max-episode-len must be at least 1"));
        }
        if self.num_episodes == 0 {
            return Err(Error::config("num-episodes must be at least 1"));
        }
        if self.save_rate == 0 {
            return Err(Error::config("save-rate must be at least 1"));
        }
        if self.exp_name.trim().is_empty() {
            return Err(Error::config("exp-name must not be empty"));
        }
        Ok(())
    }

    /// Save more often when the run is shorter than the save rate.
    pub fn effective_save_rate(&self) -> usize {
        self.save_rate.min(self.num_episodes)
    }

    /// Episodes already trained before this run, from the model file name.
    pub fn previous_episodes(&self) -> usize {
        parse_previous_episodes(self.model_file.as_deref())
    }
}

/// Parse the episode count from a checkpoint stem like `debug_25000`.
///
/// A missing or malformed suffix starts the numbering from zero.
pub fn parse_previous_episodes(model_file: Option<&str>) -> usize {
    let Some(model_file) = model_file else {
        return 0;
    };
    let suffix = model_file.rsplit('_').next().unwrap_or(model_file);
    match suffix.trim_end_matches(".msgpack").parse::<usize>() {
        Ok(episodes) => episodes,
        Err(_) => {
            tracing::warn!(
                "Could not read an episode count from model file '{model_file}'; starting from untrained network numbering"
            );
            0
        }
    }
}
