use serde::Deserialize;
use std::path::PathBuf;

use crate::pool::ReadOrder;

/// Where the shard streams live and which output identity this process
/// owns.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct StoreSettings {
    /// Directory holding the input shards and receiving distilled output.
    pub workdir: PathBuf,
    /// Number of input shards; every run visits all of them.
    #[serde(default = "default_total_shards")]
    pub total_shards: usize,
    /// Shard-index offset of this process. Run `t` writes output identity
    /// `my-shard-index + t`, so cooperating processes can share a work
    /// directory without colliding.
    #[serde(default)]
    pub my_shard_index: usize,
}

fn default_total_shards() -> usize {
    1
}

pub fn default_workdir() -> PathBuf {
    PathBuf::from("./.sifter_workdir")
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct RunSettings {
    /// Number of independent distillation runs to execute concurrently.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Base seed for the per-run shard shuffles. Always taken from
    /// configuration so repeated invocations are reproducible.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Upper bound on shards read simultaneously within one run, to limit
    /// I/O contention.
    #[serde(default = "default_max_concurrent_reads")]
    pub max_concurrent_reads: usize,
    #[serde(default)]
    pub read_order: ReadOrder,
}

pub fn default_threads() -> usize {
    1
}
pub fn default_seed() -> u64 {
    1
}
fn default_max_concurrent_reads() -> usize {
    1
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            seed: default_seed(),
            max_concurrent_reads: default_max_concurrent_reads(),
            read_order: ReadOrder::default(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct CoverageSettings {
    /// Feature domains to ignore wholesale during distillation.
    #[serde(default)]
    pub discarded_domains: Vec<u32>,
    /// A feature counts as unseen until observed this many times.
    #[serde(default = "default_frequency_threshold")]
    pub frequency_threshold: u32,
}

fn default_frequency_threshold() -> u32 {
    1
}

impl Default for CoverageSettings {
    fn default() -> Self {
        Self {
            discarded_domains: Vec::new(),
            frequency_threshold: default_frequency_threshold(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct DistillConfig {
    pub store: StoreSettings,
    #[serde(default)]
    pub run: RunSettings,
    #[serde(default)]
    pub coverage: CoverageSettings,
}

impl DistillConfig {
    pub fn load_from_file(path: &PathBuf) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        let config: DistillConfig = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })?;

        Ok(config)
    }
}

impl Default for DistillConfig {
    fn default() -> Self {
        Self {
            store: StoreSettings {
                workdir: default_workdir(),
                total_shards: default_total_shards(),
                my_shard_index: 0,
            },
            run: RunSettings::default(),
            coverage: CoverageSettings::default(),
        }
    }
}
