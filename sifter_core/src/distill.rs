use std::fs::File;
use std::io::BufWriter;
use std::thread;

use log::{debug, info};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use serde::Serialize;
use thiserror::Error;

use crate::codec;
use crate::config::DistillConfig;
use crate::coverage::FeatureSet;
use crate::feature::DomainFilter;
use crate::pool::{self, ReadOrder};
use crate::store::{FileRecordWriter, RecordWriter, StoreError};
use crate::workdir::ShardLayout;

/// Errors that abort a distillation run. Nothing here is retried, and a
/// failed run never leaves output advertised as complete.
#[derive(Error, Debug)]
pub enum DistillError {
    /// Opening, reading, or writing a record stream failed.
    #[error("Record store failure: {0}")]
    Store(#[from] StoreError),

    /// The run-summary sidecar could not be written.
    #[error("Failed to write run summary: {0}")]
    Summary(String),

    /// A run thread panicked instead of returning a result.
    #[error("Distillation run {0} panicked")]
    RunPanicked(usize),
}

/// Progress counters for one distillation run, persisted as the run's JSON
/// summary sidecar.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RunStats {
    /// Output identity of this run (process shard-index offset plus run
    /// ordinal).
    pub run_index: usize,
    /// Effective seed of this run's shard shuffle.
    pub seed: u64,
    pub shards_read: usize,
    pub elements_read: usize,
    pub elements_retained: usize,
    /// Distinct features covered by the retained elements.
    pub features_covered: usize,
}

/// Per-run inputs derived from [`DistillConfig`] by the orchestrator.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub run_index: usize,
    /// Effective seed of this run's shard shuffle, recorded in the summary.
    pub seed: u64,
    pub max_concurrent_reads: usize,
    pub read_order: ReadOrder,
    pub frequency_threshold: u32,
    pub discarded_domains: Vec<u32>,
}

/// Uniform random permutation of `0..total_shards` for one run.
///
/// Deterministic in `seed`: repeating a run shuffles identically, while
/// runs seeded differently visit shards in independent orders and so drop
/// different redundant elements.
pub fn shard_visitation_order(total_shards: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..total_shards).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices
}

/// One sequential greedy set-cover pass over `shard_indices`, producing one
/// distilled output pair plus a summary sidecar.
///
/// All assigned shards are loaded (and reversed per `read_order`) before
/// the cover pass starts. Elements are then visited in strict order; an
/// element is retained iff its pruned feature vector still contains an
/// unseen feature, and is released as soon as the decision is made. This is
/// a single-pass greedy approximation to minimum set cover: deterministic
/// for a fixed visitation order, not guaranteed size-optimal.
pub fn run_distill_task(
    layout: &dyn ShardLayout,
    options: &RunOptions,
    shard_indices: &[usize],
) -> Result<RunStats, DistillError> {
    let corpus_path = layout.distilled_corpus_path(options.run_index);
    let features_path = layout.distilled_features_path(options.run_index);
    info!(
        "run {}: distilling {} shards into {:?} and {:?}",
        options.run_index,
        shard_indices.len(),
        corpus_path,
        features_path
    );

    // Overwrite any previous distilled output, never append.
    let mut corpus_writer = FileRecordWriter::create(&corpus_path)?;
    let mut features_writer = FileRecordWriter::create(&features_path)?;

    let mut feature_set = FeatureSet::new(
        options.frequency_threshold,
        DomainFilter::new(&options.discarded_domains),
    );
    let mut stats = RunStats {
        run_index: options.run_index,
        seed: options.seed,
        shards_read: 0,
        elements_read: 0,
        elements_retained: 0,
        features_covered: 0,
    };

    // Barrier: every shard is in memory before any coverage logic runs.
    let shards = pool::read_shards(
        layout,
        shard_indices,
        options.max_concurrent_reads,
        options.read_order,
    )?;

    for (elements, shard_index) in shards.into_iter().zip(shard_indices) {
        for element in elements {
            stats.elements_read += 1;
            let features = feature_set.prune(&element.features);
            if !feature_set.has_unseen(&features) {
                // Redundant element: contributes no new coverage.
                continue;
            }
            feature_set.increment(&features);
            corpus_writer.write_record(&element.input)?;
            features_writer.write_record(&codec::pack_features(&element.input, &features)?)?;
            stats.elements_retained += 1;
            if stats.elements_retained.is_power_of_two() {
                debug!(
                    "run {}: {} elements retained so far",
                    options.run_index, stats.elements_retained
                );
            }
        }
        stats.shards_read += 1;
        stats.features_covered = feature_set.len();
        info!(
            "run {}: {} src_shards: {}/{} ({}) src_elts: {} dist_elts: {}",
            options.run_index,
            feature_set,
            stats.shards_read,
            shard_indices.len(),
            shard_index,
            stats.elements_read,
            stats.elements_retained
        );
    }

    corpus_writer.flush()?;
    features_writer.flush()?;
    write_summary(layout, &stats)?;
    Ok(stats)
}

fn write_summary(layout: &dyn ShardLayout, stats: &RunStats) -> Result<(), DistillError> {
    let path = layout.summary_path(stats.run_index);
    let file = File::create(&path)
        .map_err(|e| DistillError::Summary(format!("Failed to create {:?}: {}", path, e)))?;
    serde_json::to_writer_pretty(BufWriter::new(file), stats).map_err(|e| {
        DistillError::Summary(format!("Failed to serialize summary to {:?}: {}", path, e))
    })?;
    Ok(())
}

/// Spawns `threads` independent distillation runs and waits for all of
/// them.
///
/// Run `t` gets output identity `my_shard_index + t` and shuffles the full
/// shard list with seed `seed + t`, so every run sees the same input but
/// covers it in its own order. Runs share no mutable state; the per-element
/// cover loop needs no locks. Every run handle is joined before this
/// returns, and the first run failure becomes the overall result.
pub fn distill(
    config: &DistillConfig,
    layout: &dyn ShardLayout,
) -> Result<Vec<RunStats>, DistillError> {
    let threads = config.run.threads.max(1);
    let total_shards = config.store.total_shards;

    let runs: Vec<(RunOptions, Vec<usize>)> = (0..threads)
        .map(|thread_idx| {
            let seed = config.run.seed.wrapping_add(thread_idx as u64);
            let options = RunOptions {
                run_index: config.store.my_shard_index + thread_idx,
                seed,
                max_concurrent_reads: config.run.max_concurrent_reads,
                read_order: config.run.read_order,
                frequency_threshold: config.coverage.frequency_threshold,
                discarded_domains: config.coverage.discarded_domains.clone(),
            };
            (options, shard_visitation_order(total_shards, seed))
        })
        .collect();

    let results: Vec<Result<RunStats, DistillError>> = thread::scope(|scope| {
        let handles: Vec<_> = runs
            .iter()
            .map(|(options, shard_indices)| {
                scope.spawn(move || run_distill_task(layout, options, shard_indices))
            })
            .collect();

        // Join every run before surfacing any failure.
        handles
            .into_iter()
            .zip(&runs)
            .map(|(handle, (options, _))| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(DistillError::RunPanicked(options.run_index)))
            })
            .collect()
    });

    results.into_iter().collect()
}
