// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Persists everything needed to rebuild a trained co-learner:
//
//   {dir}/model_epoch_{n}.mpk.gz   masker + learner weights
//   {dir}/latest_epoch.json        epoch of the newest weights
//   {dir}/train_config.json        architecture + masking options
//
// The config is written before training starts; `mask` reads
// it back to rebuild the exact architecture before loading
// weights into it. CompactRecorder refuses records whose
// structure does not match the model.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{fs, path::PathBuf};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::CoLearnerModel;

const LATEST_EPOCH_FILE: &str = "latest_epoch.json";
const CONFIG_FILE:       &str = "train_config.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn save_model<B: Backend>(&self, model: &CoLearnerModel<B>, epoch: usize) -> Result<()> {
        let path = self.dir.join(format!("model_epoch_{epoch}"));
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        fs::write(self.dir.join(LATEST_EPOCH_FILE), serde_json::to_string(&epoch)?)
            .context("Failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {epoch}");
        Ok(())
    }

    pub fn load_model<B: Backend>(
        &self,
        model:  CoLearnerModel<B>,
        device: &B::Device,
    ) -> Result<CoLearnerModel<B>> {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {epoch}");
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!("Cannot read '{}'. Run 'train' before 'mask'.", path.display())
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn latest_epoch(&self) -> Result<usize> {
        let s = fs::read_to_string(self.dir.join(LATEST_EPOCH_FILE))
            .context("Cannot find 'latest_epoch.json'. Has a training epoch finished?")?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::{CoLearnerConfig, Masker};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mask_co_learner_ckpt_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_config_roundtrip() {
        let dir  = scratch_dir("config");
        let mgr  = CheckpointManager::new(&dir).unwrap();
        let cfg  = TrainConfig { masker_lambda: 0.25, deterministic: true, ..TrainConfig::default() };
        mgr.save_config(&cfg).unwrap();

        let back = mgr.load_config().unwrap();
        assert_eq!(back.masker_lambda, 0.25);
        assert!(back.deterministic);
        assert_eq!(back.max_seq_len, cfg.max_seq_len);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir = scratch_dir("missing");
        let mgr = CheckpointManager::new(&dir).unwrap();
        assert!(mgr.latest_epoch().is_err());
        assert!(mgr.load_config().is_err());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_saved_weights_reload_into_fresh_model() {
        let dir    = scratch_dir("weights");
        let mgr    = CheckpointManager::new(&dir).unwrap();
        let device = Default::default();
        let config = CoLearnerConfig::new(20, 8, 8, 2, 1, 16, 0.0, 1);

        let trained: CoLearnerModel<TestBackend> = config.init(&device);
        mgr.save_model(&trained, 3).unwrap();
        assert_eq!(mgr.latest_epoch().unwrap(), 3);

        let fresh: CoLearnerModel<TestBackend> = config.init(&device);
        let loaded = mgr.load_model(fresh, &device).unwrap();

        let tokens = Tensor::<TestBackend, 2, Int>::from_ints([[5, 6, 7, 8]], &device);
        let a: Vec<f32> = trained.masking_probabilities(tokens.clone()).into_data().iter::<f32>().collect();
        let b: Vec<f32> = loaded.masking_probabilities(tokens).into_data().iter::<f32>().collect();
        for (x, y) in a.iter().zip(&b) {
            // CompactRecorder stores half precision
            assert!((x - y).abs() < 1e-2, "{x} vs {y}");
        }
        fs::remove_dir_all(&dir).unwrap();
    }
}
