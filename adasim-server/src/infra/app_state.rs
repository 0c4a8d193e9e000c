use std::{fmt, path::PathBuf, sync::Arc};

use adasim_core::{IngestOrchestrator, Notifier, RunStore};

use crate::infra::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RunStore>,
    pub orchestrator: Arc<IngestOrchestrator>,
    pub notifier: Notifier,
    pub config: Arc<Config>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn media_root(&self) -> &PathBuf {
        &self.config.media.root
    }
}
