//! Tutor matching pipeline.
//!
//! One run loads the tutor pool, asks the completion service to pick the best
//! candidates, resolves the reply back to uids and persists them on the doubt.
//! Runs are independent and idempotent for identical inputs and replies.

pub mod client;
pub mod prompt;
pub mod resolver;

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::data::doubts::{DoubtError, set_recommended_tutors};
use crate::data::users::load_tutor_pool;
use crate::store::{DocumentStore, StoreError};
use crate::utils::fmt_duration;

pub use client::{CompletionService, DisabledCompletion, GeminiClient};
pub use prompt::build_prompt;
pub use resolver::resolve_matches;

/// Inputs for one matching run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRequest {
    pub doubt_id: String,
    pub subject: String,
    pub description: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to load tutor pool")]
    CandidatePool(#[source] StoreError),
    #[error("failed to persist recommendations")]
    Persist(#[from] DoubtError),
}

#[derive(Clone)]
pub struct MatchPipeline {
    store: Arc<dyn DocumentStore>,
    completion: Arc<dyn CompletionService>,
}

impl MatchPipeline {
    pub fn new(store: Arc<dyn DocumentStore>, completion: Arc<dyn CompletionService>) -> Self {
        Self { store, completion }
    }

    /// Run matching for one doubt and persist the result.
    ///
    /// Returns the uids written to `recommendedTutors`. A failed or empty
    /// completion reply yields an empty list, which is persisted as well.
    pub async fn run(&self, request: &MatchRequest) -> Result<Vec<String>, PipelineError> {
        let start = Instant::now();

        let pool = load_tutor_pool(self.store.as_ref())
            .await
            .map_err(PipelineError::CandidatePool)?;

        let matched = if pool.is_empty() {
            debug!(doubt_id = %request.doubt_id, "no tutors available, skipping completion");
            Vec::new()
        } else {
            let prompt = build_prompt(&request.subject, &request.description, &pool);
            let reply = self.completion.complete(&prompt).await;
            resolve_matches(Some(&reply), &pool)
        };

        set_recommended_tutors(self.store.as_ref(), &request.doubt_id, &matched).await?;

        info!(
            doubt_id = %request.doubt_id,
            candidates = pool.len(),
            matched = matched.len(),
            duration = fmt_duration(start.elapsed()),
            "tutor matching complete"
        );
        Ok(matched)
    }
}
