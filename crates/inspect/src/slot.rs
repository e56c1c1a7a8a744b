use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Inspector;
use crate::error::{ErrorKind, Result};

/// The database currently selected for inspection, shared between the
/// interactive surface and the HTTP query server.
///
/// Starts empty. Opening a new file replaces (and closes) the previous one;
/// a failed open leaves the previous selection in place.
#[derive(Debug, Clone, Default)]
pub struct ActiveDatabase {
    current: Arc<RwLock<Option<Inspector>>>,
}

impl ActiveDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn open(&self, path: impl AsRef<Path>) -> Result<Inspector> {
        let inspector = Inspector::open(path).await?;
        let previous = self.current.write().await.replace(inspector.clone());
        if let Some(previous) = previous {
            tracing::debug!(path = %previous.path().display(), "Closing previously selected database");
            previous.close().await;
        }
        Ok(inspector)
    }

    /// The selected database, or [`NotOpen`](ErrorKind::NotOpen).
    pub async fn current(&self) -> Result<Inspector> {
        match self.current.read().await.as_ref() {
            Some(inspector) => Ok(inspector.clone()),
            None => exn::bail!(ErrorKind::NotOpen),
        }
    }

    pub async fn is_open(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub async fn close(&self) {
        if let Some(inspector) = self.current.write().await.take() {
            inspector.close().await;
        }
    }
}
