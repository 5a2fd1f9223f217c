//! Shared service state: one coordinator actor per signed-in identity.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use roadie_core::coordinator::{Coordinator, CoordinatorHandle};
use roadie_core::inference::{ResponseGenerator, Transcriber};
use roadie_core::pipeline::PipelineDeadlines;
use roadie_core::store::InteractionStore;
use roadie_core::{Result, RoadieError};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    data_dir: PathBuf,
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn ResponseGenerator>,
    deadlines: PipelineDeadlines,
    coordinators: Mutex<HashMap<String, CoordinatorHandle>>,
}

impl AppState {
    pub fn new(
        data_dir: PathBuf,
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn ResponseGenerator>,
        deadlines: PipelineDeadlines,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                data_dir,
                transcriber,
                generator,
                deadlines,
                coordinators: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Returns the coordinator for `identity`, spawning it on first use.
    /// The map lock is held across the spawn so two concurrent requests
    /// for a fresh identity cannot race into two actors.
    pub async fn coordinator(&self, identity: &str) -> Result<CoordinatorHandle> {
        let mut coordinators = self.inner.coordinators.lock().await;
        if let Some(handle) = coordinators.get(identity) {
            return Ok(handle.clone());
        }

        tokio::fs::create_dir_all(&self.inner.data_dir)
            .await
            .map_err(|e| RoadieError::internal(format!("failed to create data dir: {e}")))?;
        let path = self.inner.data_dir.join(db_file_name(identity));
        let store = InteractionStore::open(&path).await?;
        let handle = Coordinator::spawn(
            identity.to_string(),
            store,
            self.inner.transcriber.clone(),
            self.inner.generator.clone(),
            self.inner.deadlines,
        )
        .await?;
        coordinators.insert(identity.to_string(), handle.clone());
        tracing::info!(identity, "spawned coordinator");
        Ok(handle)
    }
}

/// One database file per identity. Identities come from a cookie, so
/// anything outside a conservative character set is replaced before the
/// name touches the filesystem.
fn db_file_name(identity: &str) -> String {
    let sanitized: String = identity
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{sanitized}.db")
}
