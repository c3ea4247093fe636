//! Level-k training pipeline
//!
//! Drives the episode/step loop: every step a single opponent level is drawn,
//! only that opponent and the super agent act and store experience, and only
//! the super agent learns. Periodic evaluation cycles re-weight the opponent
//! distribution towards the level the super agent currently handles worst.

use std::{
    path::{Path, PathBuf},
    thread,
    time::Instant,
};

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    curriculum::{
        MatchPair, RoleLayout, TrainerRoster, TrainingContext, build_roster,
        evaluation::EvaluationEvent,
    },
    pipeline::{
        artifacts::{BenchmarkRecorder, CurveArtifacts, TrainingCurves},
        config::{RunMode, TrainingConfig},
    },
    ports::{CheckpointRepository, Environment, Observer, TrainerFactory},
    types::{Observation, Transition},
};

/// What a finished run reports back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub mode: RunMode,
    /// Completed episodes in this run
    pub episodes: usize,
    pub train_steps: u64,
    /// Updates that returned a loss
    pub updates: usize,
    /// Completed evaluation cycles
    pub evaluations: usize,
    /// Worst level picked by each evaluation cycle
    pub worst_levels: Vec<usize>,
    /// Opponent weights when the loop exited
    pub final_distribution: Vec<f64>,
}

/// Level-k training pipeline
///
/// Owns the environment, the trainer roster and the run state. Observers see
/// the run but never influence it.
///
/// # Examples
///
/// ```no_run
/// use levelk::{
///     adapters::MsgPackCheckpointRepository,
///     env::{HvtConfig, HvtEnvironment},
///     pipeline::{LevelKPipeline, TrainingConfig},
///     roles::Role,
///     trainers::{LinearTrainerConfig, StandardTrainerFactory},
/// };
///
/// let env = HvtEnvironment::new(HvtConfig::default());
/// let factory = StandardTrainerFactory::new(&env, LinearTrainerConfig::default());
/// let config = TrainingConfig::new(Role::Defender, 2).with_episodes(1000, 25);
///
/// let mut pipeline = LevelKPipeline::new(
///     config,
///     Box::new(env),
///     &factory,
///     Box::new(MsgPackCheckpointRepository::new()),
/// )?;
/// let summary = pipeline.run()?;
/// println!("{} episodes", summary.episodes);
/// # Ok::<(), levelk::Error>(())
/// ```
pub struct LevelKPipeline {
    config: TrainingConfig,
    env: Box<dyn Environment>,
    roster: TrainerRoster,
    repository: Box<dyn CheckpointRepository>,
    observers: Vec<Box<dyn Observer>>,
    context: TrainingContext,
    curves: TrainingCurves,
    benchmark: BenchmarkRecorder,
    previous_episodes: usize,
    evaluations: usize,
}

impl LevelKPipeline {
    /// Build the roster and run state for `config`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration, an environment that does not have
    /// exactly two agents, or a factory error.
    pub fn new(
        config: TrainingConfig,
        mut env: Box<dyn Environment>,
        factory: &dyn TrainerFactory,
        repository: Box<dyn CheckpointRepository>,
    ) -> Result<Self> {
        config.validate()?;
        if env.num_agents() != 2 {
            return Err(Error::Environment {
                message: format!(
                    "level-k training needs a two-agent environment, got {} agents",
                    env.num_agents()
                ),
            });
        }

        let layout = RoleLayout::new(config.role, config.max_level);
        let mut roster = build_roster(layout, factory)?;
        let context =
            TrainingContext::new(layout, config.evaluation, env.num_agents(), config.seed)?;

        if let Some(seed) = config.seed {
            env.set_rng_seed(seed.wrapping_add(1));
            for index in 0..roster.len() {
                if let Some(trainer) = roster.get_mut(index) {
                    trainer.set_rng_seed(seed.wrapping_add(2 + index as u64));
                }
            }
        }

        let previous_episodes = config.previous_episodes();
        let num_agents = env.num_agents();

        Ok(Self {
            config,
            env,
            roster,
            repository,
            observers: Vec::new(),
            context,
            curves: TrainingCurves::new(),
            benchmark: BenchmarkRecorder::new(num_agents),
            previous_episodes,
            evaluations: 0,
        })
    }

    /// Add an observer
    pub fn with_observer(mut self, observer: Box<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn roster(&self) -> &TrainerRoster {
        &self.roster
    }

    pub fn context(&self) -> &TrainingContext {
        &self.context
    }

    pub fn curves(&self) -> &TrainingCurves {
        &self.curves
    }

    /// Episodes trained before this run, from the resume file name
    pub fn previous_episodes(&self) -> usize {
        self.previous_episodes
    }

    /// Total episode count this run ends at, used to name the loss logs.
    pub fn target_episodes(&self) -> usize {
        self.previous_episodes + self.config.num_episodes
    }

    fn load_dir(&self) -> PathBuf {
        self.config.paths.effective_load_dir().clone()
    }

    fn should_restore_opponents(&self) -> bool {
        let requested = self.config.restore || self.config.paths.load_dir.is_some();
        (requested && self.config.max_level != 0) || self.config.mode == RunMode::Benchmark
    }

    /// Load the frozen opponent ladder and, when resuming, the super agent.
    ///
    /// # Errors
    ///
    /// A missing checkpoint file or a checkpoint without the opponent's
    /// variables is fatal.
    pub fn restore_checkpoints(&mut self) -> Result<()> {
        let load_dir = self.load_dir();
        let layout = *self.roster.layout();

        if self.should_restore_opponents() {
            for level in 0..=layout.max_level() {
                let stem = load_dir.join(layout.opponent_checkpoint_stem(level));
                let checkpoint = self.repository.load(&stem)?;
                let restored =
                    self.roster
                        .restore_opponent(level, &checkpoint, &stem.display().to_string())?;
                tracing::info!(
                    "Loaded level {level} {} from {} ({restored} variables)",
                    layout.opponent_role(),
                    stem.display()
                );
            }
        }

        if self.config.restore
            && let Some(model_file) = &self.config.model_file
        {
            let stem = load_dir.join(model_file);
            if self.repository.exists(&stem) {
                let checkpoint = self.repository.load(&stem)?;
                let restored = self
                    .roster
                    .restore_super_agent(&checkpoint, &stem.display().to_string())?;
                tracing::info!(
                    "Resumed {} from {} ({restored} variables)",
                    layout.super_agent_name(),
                    stem.display()
                );
            } else {
                tracing::warn!(
                    "Model file {} not found; super agent starts untrained",
                    stem.display()
                );
            }
        }
        Ok(())
    }

    /// Run the loop until the mode's termination condition.
    ///
    /// # Errors
    ///
    /// Environment, trainer, persistence and observer errors abort the run.
    pub fn run(&mut self) -> Result<RunSummary> {
        let layout = *self.roster.layout();
        tracing::info!(
            "Using {} agents as the super agent's ({}) opponents; level {}",
            layout.opponent_role(),
            layout.role(),
            layout.max_level()
        );

        self.restore_checkpoints()?;
        notify(&mut self.observers, |o| o.on_run_start(self.config.num_episodes))?;

        let save_rate = self.config.effective_save_rate();
        let mut observations = self.reset_env()?;
        let mut timer = Instant::now();

        tracing::info!("Starting iterations...");
        loop {
            let (sample, pair) = self.context.select_match()?;
            let indices = pair.indices();

            let mut actions = Vec::with_capacity(indices.len());
            for (position, &index) in indices.iter().enumerate() {
                let trainer = self.roster.get_mut(index).ok_or_else(|| {
                    Error::config(format!("no trainer at roster index {index}"))
                })?;
                actions.push(trainer.action(&observations[position])?);
            }

            let step = self.env.step(&actions)?;
            check_step_shape(&step.observations, &step.rewards, &step.dones)?;

            if self.config.env_logging {
                let episode = self.context.ledger().len() + self.previous_episodes;
                self.env.log(episode, self.context.episode_step(), &step);
            }
            self.context.record_step(&step.rewards);
            let done = step.any_done();
            let terminal = self.context.episode_step() >= self.config.max_episode_len;

            for (position, &index) in indices.iter().enumerate() {
                if let Some(trainer) = self.roster.get_mut(index) {
                    trainer.experience(Transition {
                        observation: observations[position].clone(),
                        action: actions[position].clone(),
                        reward: step.rewards[position],
                        next_observation: step.observations[position].clone(),
                        done: step.dones[position],
                        terminal,
                    });
                }
            }
            if self.config.mode == RunMode::Benchmark {
                self.benchmark.record(&step.infos);
            }
            observations = step.observations;

            let boundary = done || terminal;
            tracing::trace!(level = sample.level, boundary, "step");

            if self.config.mode == RunMode::Display {
                thread::sleep(self.config.display.step_delay);
                self.env.render()?;
                if boundary {
                    tracing::info!(
                        "Episode reward: {:?}",
                        (0..self.context.ledger().num_agents())
                            .map(|agent| self.context.ledger().current_agent_reward(agent))
                            .collect::<Vec<_>>()
                    );
                    thread::sleep(self.config.display.episode_delay);
                    observations = self.end_episode()?;
                    if self.context.ledger().completed() >= self.config.num_episodes {
                        return self.finish();
                    }
                }
                continue;
            }

            if boundary {
                observations = self.end_episode()?;
            }
            self.context.advance_train_step();

            match self.config.mode {
                RunMode::Benchmark => {
                    if self.context.train_step() > self.config.benchmark_iters && boundary {
                        let path = self
                            .benchmark
                            .save(&self.config.paths.benchmark_dir, &self.config.exp_name)?;
                        tracing::info!("Finished benchmarking, now saving to {}", path.display());
                        return self.finish();
                    }
                    continue;
                }
                RunMode::Testing => {
                    if self.context.ledger().completed() >= self.config.num_episodes {
                        return self.finish();
                    }
                    continue;
                }
                RunMode::Train | RunMode::Display => {}
            }

            if boundary {
                self.handle_boundary_events()?;
            }
            if self.context.is_evaluating() {
                continue;
            }

            self.update_super_agent(&pair)?;

            let completed = self.context.ledger().completed();
            if boundary && completed.is_multiple_of(100) {
                tracing::debug!(
                    "Episode {} reached, {:.2}s since last save",
                    completed + self.previous_episodes,
                    timer.elapsed().as_secs_f64()
                );
            }

            if boundary && completed.is_multiple_of(save_rate) {
                self.save(completed, save_rate, timer)?;
                timer = Instant::now();
            }

            if completed >= self.config.num_episodes {
                return self.finish();
            }
        }
    }

    fn reset_env(&mut self) -> Result<Vec<Observation>> {
        let observations = self.env.reset();
        if observations.len() != self.env.num_agents() {
            return Err(Error::Environment {
                message: format!(
                    "reset returned {} observations for {} agents",
                    observations.len(),
                    self.env.num_agents()
                ),
            });
        }
        Ok(observations)
    }

    fn end_episode(&mut self) -> Result<Vec<Observation>> {
        let observations = self.reset_env()?;
        self.context.end_episode();
        self.benchmark.start_episode();
        let completed = self.context.ledger().completed();
        notify(&mut self.observers, |o| {
            o.on_episode_end(completed, self.context.ledger())
        })?;
        Ok(observations)
    }

    fn handle_boundary_events(&mut self) -> Result<()> {
        let completed = self.context.ledger().completed();
        for event in self.context.on_episode_boundary() {
            match event {
                EvaluationEvent::Started { level, scheduled } => {
                    tracing::info!(
                        episode = completed,
                        "Freezing current super agent and evaluating against {scheduled} episodes, starting at level {level}"
                    );
                    notify(&mut self.observers, |o| {
                        o.on_evaluation_started(completed, scheduled)
                    })?;
                }
                EvaluationEvent::Advanced { level, remaining } => {
                    tracing::debug!("Evaluating against level {level}, {remaining} episodes left");
                }
                EvaluationEvent::Exhausted { level } => {
                    tracing::debug!("Evaluation queue exhausted at level {level}");
                }
                EvaluationEvent::Completed(report) => {
                    self.evaluations += 1;
                    tracing::info!(
                        "Evaluation complete, performance against levels 0 to {}: {:.2?}",
                        report.performances.len().saturating_sub(1),
                        report.performances
                    );
                    tracing::info!("Worst performing level is {}", report.worst_level);
                    tracing::info!(
                        "Opponent selection weights set to {:?}",
                        self.context.distribution().weights()
                    );
                    notify(&mut self.observers, |o| {
                        o.on_evaluation_completed(&report, self.context.distribution())
                    })?;
                }
            }
        }
        Ok(())
    }

    fn update_super_agent(&mut self, pair: &MatchPair) -> Result<()> {
        let step = self.context.train_step();
        self.roster.super_agent_mut().preupdate();
        let (learner, opponent) = self.roster.split_pair(pair);
        if let Some(loss) = learner.update(&[opponent], step)? {
            self.context.count_update();
            let index = pair.super_index();
            notify(&mut self.observers, |o| o.on_update(index, step, &loss))?;
        }
        Ok(())
    }

    fn save(&mut self, completed: usize, save_rate: usize, since: Instant) -> Result<()> {
        let episodes = completed + self.previous_episodes;
        let stem = self
            .config
            .paths
            .save_dir
            .join(format!("{}_{episodes}", self.config.exp_name));
        self.repository.save(&self.roster.snapshot(), &stem)?;

        let ledger = self.context.ledger();
        tracing::info!(
            "steps: {}, episodes: {}, mean episode reward: {:.3}, agent episode reward: {:.3?}, time: {:.3}s",
            self.context.train_step(),
            episodes,
            ledger.mean_recent(save_rate),
            ledger.agent_means_recent(save_rate),
            since.elapsed().as_secs_f64()
        );

        self.curves.record(ledger, save_rate);
        self.curve_artifacts()
            .save(&self.curves, self.context.worst_level_history())?;

        notify(&mut self.observers, |o| {
            o.on_checkpoint(
                episodes,
                self.context.ledger(),
                self.context.distribution(),
            )
        })
    }

    fn curve_artifacts(&self) -> CurveArtifacts {
        CurveArtifacts::new(&self.config.paths.plots_dir, &self.config.exp_name)
    }

    fn finish(&mut self) -> Result<RunSummary> {
        let completed = self.context.ledger().completed();
        let episodes = completed + self.previous_episodes;

        if self.config.mode == RunMode::Train {
            self.curve_artifacts()
                .save(&self.curves, self.context.worst_level_history())?;
        }
        if self.config.env_logging
            && matches!(self.config.mode, RunMode::Train | RunMode::Testing)
        {
            let filename = format!(
                "{}_state_{episodes}{}",
                self.config.exp_name, self.config.log_append
            );
            self.env.save_log(&self.config.paths.save_dir, &filename)?;
        }

        tracing::info!("Finished a total of {completed} episodes ({episodes} overall)");
        tracing::info!(
            "Worst performing level history: {:?}",
            self.context.worst_level_history()
        );

        let summary = RunSummary {
            mode: self.config.mode,
            episodes: completed,
            train_steps: self.context.train_step(),
            updates: self.context.updates(),
            evaluations: self.evaluations,
            worst_levels: self.context.worst_level_history().to_vec(),
            final_distribution: self.context.distribution().weights().to_vec(),
        };
        notify(&mut self.observers, |o| o.on_run_end(&summary))?;
        Ok(summary)
    }

    /// Directory the super-agent checkpoints are written to
    pub fn save_dir(&self) -> &Path {
        &self.config.paths.save_dir
    }
}

fn notify<F>(observers: &mut [Box<dyn Observer>], mut event: F) -> Result<()>
where
    F: FnMut(&mut dyn Observer) -> Result<()>,
{
    for observer in observers.iter_mut() {
        event(observer.as_mut())?;
    }
    Ok(())
}

fn check_step_shape(observations: &[Observation], rewards: &[f64], dones: &[bool]) -> Result<()> {
    if observations.len() != 2 || rewards.len() != 2 || dones.len() != 2 {
        return Err(Error::Environment {
            message: format!(
                "step returned {} observations, {} rewards and {} done flags for 2 agents",
                observations.len(),
                rewards.len(),
                dones.len()
            ),
        });
    }
    Ok(())
}
