//! Development fixture loading.
//!
//! User profiles and sessions are owned by external services. For local runs
//! and tests a JSON fixture can stand in for them:
//!
//! ```json
//! {
//!   "users": [{ "id": "t1", "name": "Ana", "role": "Tutor", "subjects": ["Math"] }],
//!   "sessions": [{ "id": "dev-token-t1", "uid": "t1" }]
//! }
//! ```
//!
//! Existing documents are never overwritten, so reseeding is harmless.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use crate::data::models::{Session, UserProfile};
use crate::store::{Collection, DocumentStore, StoreError, to_fields};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub users: Vec<UserProfile>,
    pub sessions: Vec<Session>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedCounts {
    pub users: usize,
    pub sessions: usize,
    pub skipped: usize,
}

/// Parse a fixture, reporting the JSON path of the first bad field.
pub fn parse_fixture(raw: &str) -> anyhow::Result<Fixture> {
    let deserializer = &mut serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(deserializer).map_err(|e| {
        anyhow::anyhow!("invalid fixture at {}: {}", e.path(), e.inner())
    })
}

/// Insert every fixture document that does not exist yet.
pub async fn apply_fixture(
    store: &dyn DocumentStore,
    fixture: &Fixture,
) -> Result<SeedCounts, StoreError> {
    let mut counts = SeedCounts::default();

    for user in &fixture.users {
        if store
            .create(Collection::Users, &user.id, to_fields(user)?)
            .await?
        {
            counts.users += 1;
        } else {
            counts.skipped += 1;
        }
    }
    for session in &fixture.sessions {
        if store
            .create(Collection::Sessions, &session.id, to_fields(session)?)
            .await?
        {
            counts.sessions += 1;
        } else {
            counts.skipped += 1;
        }
    }

    Ok(counts)
}

/// Read the fixture at `path` and apply it.
pub async fn load_fixture(store: &dyn DocumentStore, path: &Path) -> anyhow::Result<SeedCounts> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read seed fixture {}", path.display()))?;
    let fixture = parse_fixture(&raw)?;
    let counts = apply_fixture(store, &fixture)
        .await
        .context("failed to apply seed fixture")?;

    info!(
        path = %path.display(),
        users = counts.users,
        sessions = counts.sessions,
        skipped = counts.skipped,
        "seed fixture applied"
    );
    Ok(counts)
}
