//! Process configuration: a YAML file plus CLI overrides.
//!
//! The bind address, routing-config path, and poll interval live in a plain
//! `serde`-derived struct loaded from disk, with `clap` covering the
//! handful of flags worth overriding without editing the file.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration, deserialized from a YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Address the ingress HTTP/2 listener binds to, e.g. `"0.0.0.0:9090"`.
    pub listen_address: String,

    /// Path to the routing-config YAML file the cluster client watches.
    pub routing_config_path: PathBuf,

    /// How often the routing-config file is polled for changes.
    #[serde(default = "default_poll_interval_ms", rename = "poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// `RUST_LOG`-style filter directive, used only if `--log-level` isn't
    /// passed on the command line.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ProxyConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Loads and parses a config file from `path`.
    pub async fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
        let config: Self = serde_yaml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))?;
        Ok(config)
    }
}

/// Command-line flags. Every field is optional so that an absent flag
/// simply defers to the config file.
#[derive(Debug, clap::Parser)]
#[command(name = "director-proxy", about = "Transparent HTTP/2 reverse proxy")]
pub struct Cli {
    /// Path to the proxy's own YAML configuration file.
    #[arg(short, long, default_value = "director.yaml")]
    pub config: PathBuf,

    /// Overrides the config file's `log_level`.
    #[arg(long)]
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_missing_optional_fields() {
        let yaml = "listen_address: \"0.0.0.0:9090\"\nrouting_config_path: \"routing.yaml\"\n";
        let cfg: ProxyConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.poll_interval_ms, 1000);
        assert_eq!(cfg.log_level, "info");
    }
}
