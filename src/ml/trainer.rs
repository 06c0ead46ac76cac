// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One epoch:
//
//   train  shuffle → batch → criterion.forward (rewrites the
//          batch) → loss / sample_size → backward → Adam step
//   valid  model.valid() on the inner backend, same criterion,
//          no gradients
//   report reduce_metrics over the epoch's logging outputs,
//          one CSV row, one checkpoint
//
// The criterion owns mask selection, so the data side only
// ever hands it pre-masked windows.
//
// Burn 0.20 notes:
//   - training runs on Autodiff<Wgpu>
//   - model.valid() → same model on the inner Wgpu backend,
//     dropout off
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{MlmBatch, MlmBatcher},
    dataset::{MlmDataset, MlmSample},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsAggregator, MetricsLogger},
};
use crate::ml::criterion::{LoggingOutput, MaskCoLearnerLoss};
use crate::ml::model::{CoLearnerConfig, CoLearnerModel};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Everything a training run needs besides the data.
pub struct TrainingSetup<'a> {
    pub cfg:          &'a TrainConfig,
    pub model_cfg:    CoLearnerConfig,
    pub criterion:    MaskCoLearnerLoss,
    pub ckpt_manager: CheckpointManager,
    pub logger:       MetricsLogger,
}

pub fn run_training(
    setup:         TrainingSetup<'_>,
    train_dataset: MlmDataset,
    val_dataset:   MlmDataset,
) -> Result<Vec<EpochMetrics>> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(setup, train_dataset, val_dataset, device)
}

pub fn train_loop<B: AutodiffBackend>(
    setup:         TrainingSetup<'_>,
    train_dataset: MlmDataset,
    val_dataset:   MlmDataset,
    device:        B::Device,
) -> Result<Vec<EpochMetrics>> {
    let TrainingSetup { cfg, model_cfg, criterion, ckpt_manager, logger } = setup;

    let mut model: CoLearnerModel<B> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: {} layers, d_model={}, vocab={}",
        model_cfg.num_layers, model_cfg.d_model, model_cfg.vocab_size,
    );

    let mut optim   = AdamConfig::new().with_epsilon(1e-8).init();
    let batcher     = MlmBatcher::new(model_cfg.pad_id);
    let mut rng     = StdRng::seed_from_u64(cfg.seed);
    let batch_size  = cfg.batch_size.max(1);
    let mut history = Vec::with_capacity(cfg.epochs);

    for epoch in 1..=cfg.epochs {
        // ── Training phase ────────────────────────────────────────────────────
        let mut order: Vec<usize> = (0..train_dataset.len()).collect();
        order.shuffle(&mut rng);

        let mut train_outputs: Vec<LoggingOutput> = Vec::new();
        for indices in order.chunks(batch_size) {
            let mut batch: MlmBatch<B> = batcher.batch(gather_samples(&train_dataset, indices), &device);
            let output = criterion.forward_with_rng(&model, &mut batch, &mut rng);
            train_outputs.push(output.logging_output);

            if output.sample_size == 0 {
                tracing::debug!("epoch {epoch}: batch without supervised positions, no update");
                continue;
            }

            let loss  = output.loss.div_scalar(output.sample_size as f64);
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.lr, model, grads);
        }

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        let all_val: Vec<usize> = (0..val_dataset.len()).collect();

        let mut val_outputs: Vec<LoggingOutput> = Vec::new();
        for indices in all_val.chunks(batch_size) {
            let mut batch: MlmBatch<B::InnerBackend> =
                batcher.batch(gather_samples(&val_dataset, indices), &device);
            let output = criterion.forward_with_rng(&model_valid, &mut batch, &mut rng);
            val_outputs.push(output.logging_output);
        }

        // ── Report ────────────────────────────────────────────────────────────
        let mut train_metrics = MetricsAggregator::new();
        MaskCoLearnerLoss::reduce_metrics(&train_outputs, &mut train_metrics);
        let mut val_metrics = MetricsAggregator::new();
        MaskCoLearnerLoss::reduce_metrics(&val_outputs, &mut val_metrics);

        tracing::info!("epoch {epoch} train | {}", train_metrics.summary());
        tracing::info!("epoch {epoch} valid | {}", val_metrics.summary());

        let row = EpochMetrics::from_aggregators(epoch, &train_metrics, &val_metrics);
        println!(
            "Epoch {:>3}/{} | train_loss={:.3} | val_loss={:.3} | masker_loss={:.5} | entropy={:.3} | ppl={:.3}",
            epoch, cfg.epochs, row.train_loss, row.val_loss, row.masker_loss, row.masker_entropy, row.ppl,
        );
        logger.log(&row)?;
        history.push(row);

        ckpt_manager.save_model(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {epoch}");
    }

    tracing::info!("Training complete");
    Ok(history)
}

fn gather_samples(dataset: &MlmDataset, indices: &[usize]) -> Vec<MlmSample> {
    indices.iter().filter_map(|&i| dataset.get(i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vocabulary::Vocabulary;
    use crate::ml::criterion::MaskCoLearnerLossConfig;
    use burn::backend::{Autodiff, NdArray};
    use std::path::PathBuf;

    type TestBackend = Autodiff<NdArray>;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mask_co_learner_train_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn tiny_setup<'a>(cfg: &'a TrainConfig, dir: &PathBuf) -> TrainingSetup<'a> {
        let words: Vec<(String, u64)> = (0..15).map(|i| (format!("w{i}"), 15 - i)).collect();
        let vocab = Vocabulary::from_word_counts(&words);
        TrainingSetup {
            cfg,
            model_cfg:    CoLearnerConfig::new(vocab.len(), 8, 8, 2, 1, 16, 0.0, vocab.pad_id()),
            criterion:    MaskCoLearnerLossConfig::new().init(&vocab).unwrap(),
            ckpt_manager: CheckpointManager::new(dir).unwrap(),
            logger:       MetricsLogger::new(dir).unwrap(),
        }
    }

    fn windows(n: usize) -> MlmDataset {
        let samples = (0..n)
            .map(|i| {
                let tokens: Vec<u32> = (0..8).map(|j| 5 + ((i + j) % 15) as u32).collect();
                MlmSample::unmasked(tokens, 1)
            })
            .collect();
        MlmDataset::new(samples)
    }

    #[test]
    fn test_epochs_produce_metrics_csv_and_checkpoints() {
        let dir = scratch_dir("epochs");
        let cfg = TrainConfig { epochs: 2, batch_size: 3, lr: 1e-3, ..TrainConfig::default() };

        let history = train_loop::<TestBackend>(
            tiny_setup(&cfg, &dir), windows(7), windows(3), Default::default(),
        ).unwrap();

        assert_eq!(history.len(), 2);
        for row in &history {
            assert!(row.train_loss.is_finite() && row.train_loss > 0.0);
            assert!(row.val_loss.is_finite() && row.val_loss > 0.0);
            assert!(row.ppl > 1.0);
            assert!(row.masker_entropy > 0.0);
        }

        let csv = std::fs::read_to_string(dir.join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert_eq!(CheckpointManager::new(&dir).unwrap().latest_epoch().unwrap(), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_empty_validation_set_reports_zero() {
        let dir = scratch_dir("noval");
        let cfg = TrainConfig { epochs: 1, batch_size: 4, ..TrainConfig::default() };

        let history = train_loop::<TestBackend>(
            tiny_setup(&cfg, &dir), windows(4), MlmDataset::new(Vec::new()), Default::default(),
        ).unwrap();

        assert_eq!(history[0].val_loss, 0.0);
        assert!(history[0].train_loss > 0.0);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
