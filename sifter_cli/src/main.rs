use sifter_core::config::DistillConfig;
use sifter_core::distill::distill;
use sifter_core::workdir::WorkDir;

use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    #[clap(short, long)]
    workdir: Option<PathBuf>,
    #[clap(short, long)]
    threads: Option<usize>,
    #[clap(long)]
    total_shards: Option<usize>,
    #[clap(short, long)]
    seed: Option<u64>,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match cli.config_file {
        Some(config_path) => {
            println!("Loading configuration from specified path: {config_path:?}");
            DistillConfig::load_from_file(&config_path)?
        }
        None => {
            // No config file specified via CLI, load default
            let default_config_path = PathBuf::from("sifter.toml");
            if default_config_path.exists() {
                println!(
                    "No config file specified via CLI, loading default: {default_config_path:?}",
                );
                DistillConfig::load_from_file(&default_config_path)?
            } else {
                println!(
                    "No config file specified and default 'sifter.toml' not found, using built-in defaults."
                );
                DistillConfig::default()
            }
        }
    };

    if let Some(workdir) = cli.workdir {
        config.store.workdir = workdir;
    }
    if let Some(threads) = cli.threads {
        config.run.threads = threads;
    }
    if let Some(total_shards) = cli.total_shards {
        config.store.total_shards = total_shards;
    }
    if let Some(seed) = cli.seed {
        config.run.seed = seed;
    }

    let layout = WorkDir::new(config.store.workdir.clone())?;

    println!(
        "Distilling {} shards under {:?} across {} runs (seed {})...",
        config.store.total_shards, config.store.workdir, config.run.threads, config.run.seed
    );
    let start_time = Instant::now();
    let all_stats = distill(&config, &layout)?;
    let elapsed = start_time.elapsed();

    let mut total_read = 0;
    let mut total_retained = 0;
    for stats in &all_stats {
        println!(
            "Run {}: retained {}/{} elements covering {} features ({} shards read)",
            stats.run_index,
            stats.elements_retained,
            stats.elements_read,
            stats.features_covered,
            stats.shards_read
        );
        total_read += stats.elements_read;
        total_retained += stats.elements_retained;
    }
    println!(
        "Distillation finished in {:.2?}: retained {}/{} elements across {} runs.",
        elapsed,
        total_retained,
        total_read,
        all_stats.len()
    );
    Ok(())
}
