use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::types::{ConversationId, IncidentRecord};

pub type IncidentBook = BTreeMap<ConversationId, IncidentRecord>;

/// Durable mapping of conversation to its last reset date.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Never fails: a missing or unreadable backing store yields an empty book.
    async fn load(&self) -> IncidentBook;
    async fn save(&self, book: &IncidentBook) -> Result<()>;
}

/// JSON file backed store. Every save rewrites the whole file through a
/// temporary sibling and a rename, so readers see the old or the new file.
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "incidents.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateStore for JsonStateStore {
    async fn load(&self) -> IncidentBook {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No state file at {}, starting empty", self.path.display());
                return IncidentBook::new();
            }
            Err(e) => {
                warn!(
                    "Failed to read state file {}: {}. Starting empty.",
                    self.path.display(),
                    e
                );
                return IncidentBook::new();
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return IncidentBook::new();
        }

        match serde_json::from_slice::<IncidentBook>(&bytes) {
            Ok(book) => book,
            Err(e) => {
                warn!(
                    "State file {} is corrupt ({}). Starting empty.",
                    self.path.display(),
                    e
                );
                IncidentBook::new()
            }
        }
    }

    async fn save(&self, book: &IncidentBook) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let tmp = self.tmp_path();
        let data = serde_json::to_vec_pretty(book)?;
        tokio::fs::write(&tmp, data)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}
