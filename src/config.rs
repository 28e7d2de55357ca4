use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use sha2::{Digest, Sha256};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub run_id: String,
    /// Worker thread count; 0 means one per logical CPU.
    pub workers: usize,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub config_hash: String,
}

pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig> {
    let bytes: Vec<u8> = if let Some(p) = path {
        std::fs::read(p)?
    } else {
        include_bytes!("../config/default.yml").to_vec()
    };

    let mut config: Config = serde_yaml::from_slice(&bytes)?;
    if config.run_id.trim().is_empty() {
        config.run_id = generate_run_id();
    }

    let config_hash = hash_bytes(&bytes);

    Ok(LoadedConfig {
        config,
        config_hash,
    })
}

/// Effective worker count: CLI override first, then a non-zero config value,
/// then one worker per logical CPU.
pub fn resolve_workers(cfg: &Config, cli_override: Option<usize>) -> usize {
    cli_override
        .or(if cfg.workers > 0 {
            Some(cfg.workers)
        } else {
            None
        })
        .unwrap_or_else(num_cpus::get)
        .max(1)
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn generate_run_id() -> String {
    let now = chrono::Utc::now();
    format!("{}_{:05}", now.format("%Y%m%dT%H%M%SZ"), std::process::id() % 100_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads() {
        let loaded = load_config(None).expect("config");
        assert!(!loaded.config.run_id.is_empty());
        assert_eq!(loaded.config.workers, 0);
        assert_eq!(loaded.config.output_dir, PathBuf::from("./output"));
        assert_eq!(loaded.config_hash.len(), 64);
    }

    #[test]
    fn blank_run_id_is_generated() {
        let loaded = load_config(None).expect("config");
        assert!(loaded.config.run_id.contains('_'));
    }

    #[test]
    fn cli_override_wins_over_config() {
        let cfg = Config {
            run_id: "t".to_string(),
            workers: 3,
            output_dir: PathBuf::from("./output"),
        };
        assert_eq!(resolve_workers(&cfg, Some(8)), 8);
        assert_eq!(resolve_workers(&cfg, None), 3);
    }

    #[test]
    fn zero_workers_falls_back_to_cpu_count() {
        let cfg = Config {
            run_id: "t".to_string(),
            workers: 0,
            output_dir: PathBuf::from("./output"),
        };
        assert_eq!(resolve_workers(&cfg, None), num_cpus::get().max(1));
    }
}
