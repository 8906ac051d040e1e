//! Application state shared across request handlers and background work.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{Instrument, error, info_span};

use crate::auth::{IdentityProvider, StoreSessions};
use crate::matching::{CompletionService, MatchPipeline, MatchRequest};
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub pipeline: MatchPipeline,
    /// Background matching runs, drained on shutdown.
    pub tasks: TaskTracker,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, completion: Arc<dyn CompletionService>) -> Self {
        let identity = Arc::new(StoreSessions::new(store.clone()));
        Self {
            pipeline: MatchPipeline::new(store.clone(), completion),
            identity,
            store,
            tasks: TaskTracker::new(),
        }
    }

    /// Run matching for a freshly created doubt without blocking the caller.
    pub fn spawn_matching(&self, request: MatchRequest) {
        let pipeline = self.pipeline.clone();
        let span = info_span!("matching", doubt_id = %request.doubt_id);
        self.tasks.spawn(
            async move {
                if let Err(e) = pipeline.run(&request).await {
                    error!(error = ?e, "background matching failed");
                }
            }
            .instrument(span),
        );
    }
}
