//! Training-curve and benchmark artifacts
//!
//! Every artifact is a single MessagePack blob that is overwritten wholesale
//! each time it is written.

use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Result, adapters::with_msgpack_extension, curriculum::EpisodeRewardLedger, error::Error,
    types::StepInfo,
};

/// Mean rewards sampled at every save event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingCurves {
    /// Mean total reward over the last save window, one entry per save
    pub rewards: Vec<f64>,
    /// Mean per-agent reward over the last save window, flattened per save
    pub agent_rewards: Vec<f64>,
}

impl TrainingCurves {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the means over the last `window` ledger entries.
    pub fn record(&mut self, ledger: &EpisodeRewardLedger, window: usize) {
        self.rewards.push(ledger.mean_recent(window));
        self.agent_rewards.extend(ledger.agent_means_recent(window));
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

/// Locations of the training-curve artifacts for one experiment
#[derive(Debug, Clone)]
pub struct CurveArtifacts {
    dir: PathBuf,
    exp_name: String,
}

impl CurveArtifacts {
    pub fn new(dir: impl Into<PathBuf>, exp_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            exp_name: exp_name.into(),
        }
    }

    pub fn rewards_path(&self) -> PathBuf {
        self.file(&format!("{}_rewards", self.exp_name))
    }

    pub fn agent_rewards_path(&self) -> PathBuf {
        self.file(&format!("{}_agrewards", self.exp_name))
    }

    pub fn worst_level_path(&self) -> PathBuf {
        self.file(&format!("{}_worst_performing_level", self.exp_name))
    }

    fn file(&self, stem: &str) -> PathBuf {
        with_msgpack_extension(&self.dir.join(stem))
    }

    /// Overwrite all three curve files.
    pub fn save(&self, curves: &TrainingCurves, worst_levels: &[usize]) -> Result<()> {
        write_msgpack(&self.rewards_path(), &curves.rewards)?;
        write_msgpack(&self.agent_rewards_path(), &curves.agent_rewards)?;
        write_msgpack(&self.worst_level_path(), &worst_levels)?;
        Ok(())
    }

    /// Read back whatever curve files exist.
    pub fn load(&self) -> Result<(TrainingCurves, Vec<usize>)> {
        let rewards = read_msgpack_or_default(&self.rewards_path())?;
        let agent_rewards = read_msgpack_or_default(&self.agent_rewards_path())?;
        let worst_levels = read_msgpack_or_default(&self.worst_level_path())?;
        Ok((
            TrainingCurves {
                rewards,
                agent_rewards,
            },
            worst_levels,
        ))
    }
}

/// Per-step info collected in benchmark mode, grouped by episode then agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecorder {
    episodes: Vec<Vec<Vec<StepInfo>>>,
    num_agents: usize,
}

impl BenchmarkRecorder {
    pub fn new(num_agents: usize) -> Self {
        Self {
            episodes: vec![vec![Vec::new(); num_agents]],
            num_agents,
        }
    }

    /// Append one step's info to the open episode.
    pub fn record(&mut self, infos: &[StepInfo]) {
        if let Some(open) = self.episodes.last_mut() {
            for (agent, info) in open.iter_mut().zip(infos) {
                agent.push(info.clone());
            }
        }
    }

    pub fn start_episode(&mut self) {
        self.episodes.push(vec![Vec::new(); self.num_agents]);
    }

    /// Completed episodes only; the open one is still being filled.
    pub fn completed(&self) -> &[Vec<Vec<StepInfo>>] {
        &self.episodes[..self.episodes.len().saturating_sub(1)]
    }

    /// Write the completed episodes to `{dir}/{exp_name}.msgpack`.
    pub fn save(&self, dir: &Path, exp_name: &str) -> Result<PathBuf> {
        let path = with_msgpack_extension(&dir.join(exp_name));
        write_msgpack(&path, &self.completed())?;
        Ok(path)
    }
}

/// Load a benchmark artifact written by [`BenchmarkRecorder::save`].
pub fn load_benchmark(path: &Path) -> Result<Vec<Vec<Vec<StepInfo>>>> {
    read_msgpack(&with_msgpack_extension(path))
}

pub(crate) fn write_msgpack<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|source| Error::io(format!("create directory {parent:?}"), source))?;
    }
    let file =
        File::create(path).map_err(|source| Error::io(format!("create file {path:?}"), source))?;
    let mut writer = BufWriter::new(file);
    rmp_serde::encode::write_named(&mut writer, value).map_err(|e| {
        Error::SerializationContext {
            operation: format!("serialize {path:?} to MessagePack"),
            message: e.to_string(),
        }
    })
}

pub(crate) fn read_msgpack<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|source| Error::io(format!("open file {path:?}"), source))?;
    rmp_serde::decode::from_read(file).map_err(|e| Error::SerializationContext {
        operation: format!("deserialize {path:?} from MessagePack"),
        message: e.to_string(),
    })
}

fn read_msgpack_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if path.is_file() {
        read_msgpack(path)
    } else {
        Ok(T::default())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_curves_record_window_means() {
        let mut ledger = EpisodeRewardLedger::new(2);
        ledger.record_step(&[1.0, 3.0]);
        ledger.start_episode();
        ledger.record_step(&[3.0, 5.0]);
        ledger.start_episode();

        let mut curves = TrainingCurves::new();
        curves.record(&ledger, 3);
        assert_eq!(curves.len(), 1);
        assert!((curves.rewards[0] - 4.0).abs() < 1e-12);
        assert_eq!(curves.agent_rewards.len(), 2);
    }

    #[test]
    fn test_curve_files_are_overwritten() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let artifacts = CurveArtifacts::new(temp_dir.path().join("curves"), "exp");

        let mut curves = TrainingCurves::new();
        curves.rewards.push(1.0);
        artifacts.save(&curves, &[]).expect("first save");
        curves.rewards.push(2.0);
        artifacts.save(&curves, &[1]).expect("second save");

        assert!(temp_dir.path().join("curves/exp_rewards.msgpack").is_file());
        assert!(temp_dir.path().join("curves/exp_agrewards.msgpack").is_file());
        let (loaded, worst) = artifacts.load().expect("load");
        assert_eq!(loaded.rewards, vec![1.0, 2.0]);
        assert_eq!(worst, vec![1]);
    }

    #[test]
    fn test_benchmark_drops_open_episode() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut recorder = BenchmarkRecorder::new(2);
        let info: StepInfo = [("captured".to_string(), 0.0)].into_iter().collect();

        recorder.record(&[info.clone(), info.clone()]);
        recorder.record(&[info.clone(), info.clone()]);
        recorder.start_episode();
        recorder.record(&[info.clone(), info]);

        let path = recorder.save(temp_dir.path(), "bench").expect("save");
        let loaded = load_benchmark(&path).expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].len(), 2);
        assert_eq!(loaded[0][0].len(), 2);
    }
}
