use crate::store::StoreError;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolves shard indices and run identities to record-stream paths.
///
/// The engine never constructs paths itself; everything it opens comes
/// from a layout. Implementations must be shareable across reader and run
/// threads.
pub trait ShardLayout: Send + Sync {
    /// Input-record stream of shard `shard_index`.
    fn corpus_shard_path(&self, shard_index: usize) -> PathBuf;
    /// Feature-record stream of shard `shard_index`.
    fn features_shard_path(&self, shard_index: usize) -> PathBuf;
    /// Distilled input-record stream written by run `run_index`.
    fn distilled_corpus_path(&self, run_index: usize) -> PathBuf;
    /// Distilled feature-record stream written by run `run_index`.
    fn distilled_features_path(&self, run_index: usize) -> PathBuf;
    /// JSON summary sidecar written by run `run_index` on completion.
    fn summary_path(&self, run_index: usize) -> PathBuf;
}

/// Flat single-directory layout with zero-padded shard suffixes, e.g.
/// `corpus.000013` next to `features.000013` and `distilled-corpus.000013`.
#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    /// Roots a layout at `root`, creating the directory if it is absent.
    pub fn new(root: PathBuf) -> Result<Self, StoreError> {
        if !root.exists() {
            fs::create_dir_all(&root).map_err(|e| {
                StoreError::Io(format!(
                    "Failed to create work directory at {:?}: {}",
                    root, e
                ))
            })?;
        } else if !root.is_dir() {
            return Err(StoreError::Io(format!(
                "Work directory path {:?} exists but is not a directory",
                root
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn indexed(&self, stem: &str, index: usize) -> PathBuf {
        self.root.join(format!("{stem}.{index:06}"))
    }
}

impl ShardLayout for WorkDir {
    fn corpus_shard_path(&self, shard_index: usize) -> PathBuf {
        self.indexed("corpus", shard_index)
    }

    fn features_shard_path(&self, shard_index: usize) -> PathBuf {
        self.indexed("features", shard_index)
    }

    fn distilled_corpus_path(&self, run_index: usize) -> PathBuf {
        self.indexed("distilled-corpus", run_index)
    }

    fn distilled_features_path(&self, run_index: usize) -> PathBuf {
        self.indexed("distilled-features", run_index)
    }

    fn summary_path(&self, run_index: usize) -> PathBuf {
        self.root.join(format!("distilled-summary.{run_index:06}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn paths_use_zero_padded_shard_suffixes() {
        let dir = tempdir().unwrap();
        let layout = WorkDir::new(dir.path().to_path_buf()).unwrap();

        assert_eq!(
            layout.corpus_shard_path(13),
            dir.path().join("corpus.000013")
        );
        assert_eq!(
            layout.features_shard_path(0),
            dir.path().join("features.000000")
        );
        assert_eq!(
            layout.distilled_corpus_path(2),
            dir.path().join("distilled-corpus.000002")
        );
        assert_eq!(
            layout.distilled_features_path(2),
            dir.path().join("distilled-features.000002")
        );
        assert_eq!(
            layout.summary_path(2),
            dir.path().join("distilled-summary.000002.json")
        );
    }

    #[test]
    fn new_creates_a_missing_root_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested").join("workdir");
        assert!(!root.exists());

        let layout = WorkDir::new(root.clone()).unwrap();
        assert!(root.is_dir());
        assert_eq!(layout.root(), root);
    }

    #[test]
    fn new_rejects_a_root_that_is_a_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("not_a_dir");
        File::create(&file_path).unwrap();

        match WorkDir::new(file_path) {
            Err(StoreError::Io(msg)) => {
                assert!(msg.contains("not a directory"), "unexpected message: {msg}")
            }
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }
}
