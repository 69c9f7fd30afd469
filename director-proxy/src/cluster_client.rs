//! The cluster collaborator: produces [`RoutingConfig`] snapshots for the
//! Reconfigurator to install.
//!
//! How a `RoutingConfig` arrives is deliberately behind a trait: the
//! Director only needs `recv()` to eventually yield a snapshot. The
//! concrete source shipped here watches a local YAML file, polling for
//! modification-time changes, which keeps this crate free of a dependency
//! on any particular control-plane protocol. The trait is the seam: wiring
//! in a remote, push-based source later means implementing
//! [`RoutingConfigSource`] again, not touching the Reconfigurator.

use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use director_core::{Address, BackendDeclaration, RoutingConfig};
use serde::Deserialize;

/// Wire format for one entry of the routing-config file. Kept separate from
/// [`BackendDeclaration`] since the file format is this crate's concern, not
/// `director-core`'s.
#[derive(Debug, Clone, Deserialize)]
struct BackendEntry {
    module_name: String,
    host: String,
    port: String,
    #[serde(default)]
    endpoints: Vec<String>,
}

impl From<BackendEntry> for BackendDeclaration {
    fn from(entry: BackendEntry) -> Self {
        BackendDeclaration::new(entry.module_name, Address::new(entry.host, entry.port), entry.endpoints)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RoutingFile {
    #[serde(default)]
    backends: Vec<BackendEntry>,
}

/// Anything that can eventually produce a fresh [`RoutingConfig`]. `recv`
/// returning `None` means the source is exhausted (e.g. the watched file
/// was deleted) and no further reconfigurations will occur.
#[async_trait]
pub trait RoutingConfigSource: Send {
    async fn recv(&mut self) -> Option<RoutingConfig>;
}

/// A [`RoutingConfigSource`] that polls a YAML file on disk for
/// modification-time changes, re-parsing and yielding a new snapshot
/// whenever it changes.
pub struct WatchedFileConfigSource {
    path: PathBuf,
    poll_interval: std::time::Duration,
    last_modified: Option<SystemTime>,
    /// Whether the very first poll (which always yields, regardless of
    /// mtime, so the Director has an initial table) has happened yet.
    primed: bool,
}

impl WatchedFileConfigSource {
    pub fn new(path: PathBuf, poll_interval: std::time::Duration) -> Self {
        Self {
            path,
            poll_interval,
            last_modified: None,
            primed: false,
        }
    }

    async fn read_config(&self) -> std::io::Result<RoutingConfig> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let parsed: RoutingFile = serde_yaml::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(parsed.backends.into_iter().map(BackendDeclaration::from).collect())
    }

    async fn modified_at(&self) -> std::io::Result<SystemTime> {
        tokio::fs::metadata(&self.path).await?.modified()
    }
}

#[async_trait]
impl RoutingConfigSource for WatchedFileConfigSource {
    async fn recv(&mut self) -> Option<RoutingConfig> {
        loop {
            match self.modified_at().await {
                Ok(modified) => {
                    let changed = self.last_modified != Some(modified);
                    if !self.primed || changed {
                        self.primed = true;
                        self.last_modified = Some(modified);
                        match self.read_config().await {
                            Ok(config) => return Some(config),
                            Err(err) => {
                                tracing::error!(path = %self.path.display(), error = %err, "failed to parse routing config");
                            }
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), error = %err, "routing config file unreadable");
                    if !self.primed {
                        // Give the Director an empty table rather than
                        // stalling startup on a file that doesn't exist yet.
                        self.primed = true;
                        return Some(RoutingConfig::default());
                    }
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn missing_file_primes_with_an_empty_config() {
        let mut source = WatchedFileConfigSource::new(
            PathBuf::from("/nonexistent/path/to/routing.yaml"),
            Duration::from_millis(5),
        );
        let config = source.recv().await.unwrap();
        assert!(config.declarations().is_empty());
    }

    #[tokio::test]
    async fn parses_backends_from_file_and_detects_changes() {
        let dir = tempdir();
        let path = dir.join("routing.yaml");
        tokio::fs::write(
            &path,
            "backends:\n  - module_name: svc\n    host: 127.0.0.1\n    port: \"9000\"\n    endpoints: [\"svc/echo\"]\n",
        )
        .await
        .unwrap();

        let mut source = WatchedFileConfigSource::new(path.clone(), Duration::from_millis(5));
        let first = source.recv().await.unwrap();
        assert_eq!(first.declarations().len(), 1);
        assert_eq!(first.declarations()[0].endpoints, vec!["svc/echo".to_string()]);

        tokio::fs::write(
            &path,
            "backends:\n  - module_name: svc\n    host: 127.0.0.1\n    port: \"9000\"\n    endpoints: [\"svc/echo\", \"svc/other\"]\n",
        )
        .await
        .unwrap();

        let second = tokio::time::timeout(Duration::from_secs(2), source.recv())
            .await
            .expect("second config change should be observed")
            .unwrap();
        assert_eq!(second.declarations()[0].endpoints.len(), 2);

        let _ = tokio::fs::remove_file(&path).await;
    }

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("director-proxy-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
