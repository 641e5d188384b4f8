use std::collections::HashMap;
use std::path::Path;
use std::thread;

use log::debug;
use serde::Deserialize;

use crate::codec;
use crate::element::CorpusElement;
use crate::feature::Feature;
use crate::store::{FileRecordReader, RecordReader, StoreError};
use crate::workdir::ShardLayout;

/// Order in which a loaded shard's elements are handed to the cover pass.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ReadOrder {
    /// Visit elements appended last first. A shard produced by a fuzzing
    /// run tends to hold its most interesting inputs near the end; when no
    /// such ordering signal exists the reversal is harmless.
    #[default]
    NewestFirst,
    /// Preserve the stored stream order.
    StoredOrder,
}

/// Loads one shard's parallel streams and pairs each input with its
/// feature vector, matched by input hash. An input with no matching
/// feature record gets an empty vector.
pub fn read_shard(
    corpus_path: &Path,
    features_path: &Path,
) -> Result<Vec<CorpusElement>, StoreError> {
    let mut inputs: Vec<Vec<u8>> = Vec::new();
    let mut reader = FileRecordReader::open(corpus_path)?;
    while let Some(record) = reader.read_record()? {
        inputs.push(record);
    }

    let mut features_by_hash: HashMap<[u8; 16], Vec<Feature>> = HashMap::new();
    let mut reader = FileRecordReader::open(features_path)?;
    while let Some(record) = reader.read_record()? {
        let unpacked = codec::unpack_features(&record)?;
        features_by_hash.insert(unpacked.input_hash, unpacked.features);
    }

    Ok(inputs
        .into_iter()
        .map(|input| {
            let features = features_by_hash
                .remove(&codec::input_hash(&input))
                .unwrap_or_default();
            CorpusElement::new(input, features)
        })
        .collect())
}

/// Loads every listed shard fully into memory, at most
/// `max_concurrent_reads` shards at a time. Result slots line up with
/// `shard_indices`.
///
/// Every reader thread is joined before this returns: all reads complete
/// (or the first failure is reported) before any caller proceeds. Each
/// result slot is written exactly once by exactly one reader, so the
/// readers share no mutable state.
pub fn read_shards(
    layout: &dyn ShardLayout,
    shard_indices: &[usize],
    max_concurrent_reads: usize,
    read_order: ReadOrder,
) -> Result<Vec<Vec<CorpusElement>>, StoreError> {
    if shard_indices.is_empty() {
        return Ok(Vec::new());
    }

    let mut slots: Vec<Option<Vec<CorpusElement>>> = Vec::new();
    slots.resize_with(shard_indices.len(), || None);

    let workers = max_concurrent_reads.clamp(1, shard_indices.len());
    let mut assignments: Vec<(usize, &mut Option<Vec<CorpusElement>>)> =
        shard_indices.iter().copied().zip(slots.iter_mut()).collect();
    let chunk_len = assignments.len().div_ceil(workers);

    thread::scope(|scope| -> Result<(), StoreError> {
        let mut handles = Vec::with_capacity(workers);
        for chunk in assignments.chunks_mut(chunk_len) {
            handles.push(scope.spawn(move || -> Result<(), StoreError> {
                for (shard_index, slot) in chunk.iter_mut() {
                    let corpus_path = layout.corpus_shard_path(*shard_index);
                    let features_path = layout.features_shard_path(*shard_index);
                    debug!(
                        "reading shard {} from {:?} and {:?}",
                        shard_index, corpus_path, features_path
                    );
                    let mut elements = read_shard(&corpus_path, &features_path)?;
                    if read_order == ReadOrder::NewestFirst {
                        elements.reverse();
                    }
                    **slot = Some(elements);
                }
                Ok(())
            }));
        }

        // Join every reader before reporting; the first failure wins.
        let mut first_error = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(_) => {
                    if first_error.is_none() {
                        first_error =
                            Some(StoreError::Io("A shard reader thread panicked".to_string()));
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    })?;

    slots
        .into_iter()
        .map(|slot| {
            slot.ok_or_else(|| StoreError::Io("A shard result slot was never filled".to_string()))
        })
        .collect()
}
