//! One attacker, one defender, one high-value target
//!
//! Agent 0 is the attacker and tries to reach the target at the origin; agent
//! 1 is the defender and tries to intercept the attacker first. Both are
//! damped point masses driven by a 2-D force in `[-1, 1]^2`.

use std::{
    fs::{self, File},
    path::Path,
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    ports::{Environment, Step},
    types::{Action, Observation, StepInfo},
};

const ATTACKER: usize = 0;
const DEFENDER: usize = 1;
const OBSERVATION_DIM: usize = 8;
const ACTION_DIM: usize = 2;

/// Physical and reward parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HvtConfig {
    /// Integration step
    pub dt: f64,
    /// Fraction of velocity lost each step
    pub damping: f64,
    /// Force-to-acceleration gain per agent (attacker, defender)
    pub acceleration: [f64; 2],
    /// Speed cap per agent (attacker, defender)
    pub max_speed: [f64; 2],
    /// Attacker wins inside this radius around the target
    pub target_radius: f64,
    /// Defender wins inside this radius around the attacker
    pub capture_radius: f64,
    /// Terminal bonus (and penalty for the loser)
    pub terminal_reward: f64,
    /// Per-step shaping on distance
    pub shaping: f64,
    /// End the episode on capture or on reaching the target
    pub done_callback: bool,
    pub seed: Option<u64>,
}

impl Default for HvtConfig {
    fn default() -> Self {
        Self {
            dt: 0.1,
            damping: 0.25,
            acceleration: [3.0, 4.0],
            max_speed: [1.0, 1.3],
            target_radius: 0.1,
            capture_radius: 0.1,
            terminal_reward: 10.0,
            shaping: 0.1,
            done_callback: true,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Body {
    position: [f64; 2],
    velocity: [f64; 2],
}

/// One row of the per-step state log
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LogRow {
    episode: usize,
    step: usize,
    agent: usize,
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    reward: f64,
    done: bool,
}

/// High-value-target pursuit environment
pub struct HvtEnvironment {
    config: HvtConfig,
    bodies: [Body; 2],
    rng: StdRng,
    log: Vec<LogRow>,
}

impl HvtEnvironment {
    pub fn new(config: HvtConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rand::random::<u64>()),
        };
        let mut env = Self {
            config,
            bodies: [Body::default(); 2],
            rng,
            log: Vec::new(),
        };
        env.spawn();
        env
    }

    pub fn config(&self) -> &HvtConfig {
        &self.config
    }

    /// Current position of `agent`
    pub fn position(&self, agent: usize) -> [f64; 2] {
        self.bodies[agent].position
    }

    fn spawn(&mut self) {
        let angle = self.rng.random_range(0.0..std::f64::consts::TAU);
        let radius = self.rng.random_range(0.8..1.0);
        self.bodies[ATTACKER] = Body {
            position: [radius * angle.cos(), radius * angle.sin()],
            velocity: [0.0; 2],
        };
        self.bodies[DEFENDER] = Body {
            position: [
                self.rng.random_range(-0.3..0.3),
                self.rng.random_range(-0.3..0.3),
            ],
            velocity: [0.0; 2],
        };
    }

    fn observe(&self, agent: usize) -> Observation {
        let me = self.bodies[agent];
        let other = self.bodies[1 - agent];
        vec![
            me.velocity[0],
            me.velocity[1],
            me.position[0],
            me.position[1],
            -me.position[0],
            -me.position[1],
            other.position[0] - me.position[0],
            other.position[1] - me.position[1],
        ]
    }

    fn integrate(&mut self, agent: usize, action: &[f64]) {
        let config = &self.config;
        let body = &mut self.bodies[agent];
        for axis in 0..2 {
            let force = action[axis].clamp(-1.0, 1.0);
            body.velocity[axis] = body.velocity[axis] * (1.0 - config.damping)
                + force * config.acceleration[agent] * config.dt;
        }
        let speed = norm(body.velocity);
        if speed > config.max_speed[agent] {
            let scale = config.max_speed[agent] / speed;
            body.velocity.iter_mut().for_each(|v| *v *= scale);
        }
        for axis in 0..2 {
            body.position[axis] += body.velocity[axis] * config.dt;
        }
    }
}

fn norm(v: [f64; 2]) -> f64 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}

fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    norm([a[0] - b[0], a[1] - b[1]])
}

impl Environment for HvtEnvironment {
    fn num_agents(&self) -> usize {
        2
    }

    fn observation_dim(&self, _agent: usize) -> usize {
        OBSERVATION_DIM
    }

    fn action_dim(&self, _agent: usize) -> usize {
        ACTION_DIM
    }

    fn reset(&mut self) -> Vec<Observation> {
        self.spawn();
        (0..2).map(|agent| self.observe(agent)).collect()
    }

    fn step(&mut self, actions: &[Action]) -> Result<Step> {
        if actions.len() != 2 {
            return Err(Error::Environment {
                message: format!("expected 2 actions, got {}", actions.len()),
            });
        }
        if let Some(bad) = actions.iter().position(|a| a.len() != ACTION_DIM) {
            return Err(Error::Environment {
                message: format!(
                    "agent {bad} action has {} values, expected {ACTION_DIM}",
                    actions[bad].len()
                ),
            });
        }

        for (agent, action) in actions.iter().enumerate() {
            self.integrate(agent, action);
        }

        let attacker = self.bodies[ATTACKER].position;
        let defender = self.bodies[DEFENDER].position;
        let to_target = distance(attacker, [0.0, 0.0]);
        let separation = distance(attacker, defender);
        let captured = separation < self.config.capture_radius;
        let reached = !captured && to_target < self.config.target_radius;

        let bonus = self.config.terminal_reward;
        let mut attacker_reward = -self.config.shaping * to_target;
        let mut defender_reward = -self.config.shaping * separation;
        if captured {
            attacker_reward -= bonus;
            defender_reward += bonus;
        }
        if reached {
            attacker_reward += bonus;
            defender_reward -= bonus;
        }

        let finished = self.config.done_callback && (captured || reached);
        let info: StepInfo = [
            ("distance_to_target".to_string(), to_target),
            ("separation".to_string(), separation),
            ("captured".to_string(), f64::from(u8::from(captured))),
            ("reached".to_string(), f64::from(u8::from(reached))),
        ]
        .into_iter()
        .collect();

        Ok(Step {
            observations: (0..2).map(|agent| self.observe(agent)).collect(),
            rewards: vec![attacker_reward, defender_reward],
            dones: vec![finished; 2],
            infos: vec![info.clone(), info],
        })
    }

    fn render(&self) -> Result<()> {
        let [a, d] = self.bodies;
        println!(
            "attacker ({:+.2}, {:+.2})  defender ({:+.2}, {:+.2})  target (0, 0)",
            a.position[0], a.position[1], d.position[0], d.position[1]
        );
        Ok(())
    }

    fn log(&mut self, episode: usize, step: usize, outcome: &Step) {
        for (agent, body) in self.bodies.iter().enumerate() {
            self.log.push(LogRow {
                episode,
                step,
                agent,
                x: body.position[0],
                y: body.position[1],
                vx: body.velocity[0],
                vy: body.velocity[1],
                reward: outcome.rewards[agent],
                done: outcome.dones[agent],
            });
        }
    }

    fn save_log(&self, dir: &Path, filename: &str) -> Result<()> {
        fs::create_dir_all(dir)
            .map_err(|source| Error::io(format!("create directory {dir:?}"), source))?;
        let path = dir.join(format!("{filename}.csv"));
        let file =
            File::create(&path).map_err(|source| Error::io(format!("create file {path:?}"), source))?;
        let mut writer = csv::Writer::from_writer(file);
        for row in &self.log {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn set_rng_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}
