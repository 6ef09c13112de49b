//! Loading the directory tree from, and saving it to, the remote store.

use std::future::Future;

use crate::app::registry::DirectoryRegistry;
use crate::domain::errors::SandboxError;
use crate::domain::model::Dir;
use crate::domain::wire::SavePayload;

/// Remote source of truth for the directory tree.
pub trait Store {
    fn load(&self) -> impl Future<Output = Result<Vec<Dir>, SandboxError>> + Send;

    fn save(&self, payload: &SavePayload) -> impl Future<Output = Result<(), SandboxError>> + Send;
}

/// How a save serializes the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Skip variables whose name is still empty.
    pub drop_empty_variables: bool,
    /// Ask the server to rebuild outputs after storing the tree.
    pub update_builds: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            drop_empty_variables: true,
            update_builds: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub payload: SavePayload,
}

impl SaveRequest {
    pub fn dir_count(&self) -> usize {
        self.payload.dirs.len()
    }
}

/// Serialize the registry into a save request. The registry itself is not touched.
pub fn prepare_save(registry: &DirectoryRegistry, options: SaveOptions) -> SaveRequest {
    SaveRequest {
        payload: SavePayload {
            dirs: registry.snapshot(options.drop_empty_variables),
            update_builds: options.update_builds,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub dir_count: usize,
    pub result: Result<(), String>,
}

pub async fn run_save<S: Store>(store: &S, request: SaveRequest) -> SaveOutcome {
    let dir_count = request.dir_count();
    let result = store
        .save(&request.payload)
        .await
        .map_err(|err| err.to_string());
    tracing::debug!(dir_count, ok = result.is_ok(), "save finished");
    SaveOutcome { dir_count, result }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub result: Result<Vec<Dir>, String>,
}

pub async fn run_load<S: Store>(store: &S) -> LoadOutcome {
    let result = store.load().await.map_err(|err| err.to_string());
    LoadOutcome { result }
}
