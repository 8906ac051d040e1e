//! Doubt persistence: creation, listing, match results and tutor acceptance.

use serde_json::Value;
use tracing::{debug, info};

use crate::data::models::{Doubt, UserProfile, stored_now};
use crate::store::{
    Collection, Direction, DocumentStore, Fields, Query, SetAdd, StoreError, decode_all, to_fields,
};

const RECOMMENDED_FIELD: &str = "recommendedTutors";
const ACCEPTED_FIELD: &str = "acceptedTutors";

#[derive(Debug, thiserror::Error)]
pub enum DoubtError {
    #[error("All fields are required")]
    MissingFields,
    #[error("only learners can post doubts")]
    NotLearner,
    #[error("only tutors teaching {subject} can accept this doubt")]
    NotEligible { subject: String },
    #[error("doubt {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Learner input for a new doubt, before validation.
#[derive(Debug, Clone, Default)]
pub struct NewDoubt {
    pub title: String,
    pub description: String,
    pub subject: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    Added,
    AlreadyAccepted,
}

/// Validate and store a new doubt owned by `learner`.
///
/// Nothing is written if validation fails. Matching is not started here.
pub async fn create_doubt(
    store: &dyn DocumentStore,
    learner: &UserProfile,
    input: NewDoubt,
) -> Result<Doubt, DoubtError> {
    let title = input.title.trim();
    let description = input.description.trim();
    let subject = input.subject.trim();
    if title.is_empty() || description.is_empty() || subject.is_empty() {
        return Err(DoubtError::MissingFields);
    }
    if !learner.is_learner() {
        return Err(DoubtError::NotLearner);
    }

    let mut doubt = Doubt {
        id: String::new(),
        uid: learner.id.clone(),
        name: learner.name.clone(),
        subject: subject.to_owned(),
        title: title.to_owned(),
        description: description.to_owned(),
        created_at: stored_now(),
        recommended_tutors: Vec::new(),
        accepted_tutors: Vec::new(),
    };
    let fields = to_fields(&doubt)?;

    // nanoid collisions are astronomically unlikely; retry rather than overwrite.
    loop {
        let id = nanoid::nanoid!();
        if store.create(Collection::Doubts, &id, fields.clone()).await? {
            doubt.id = id;
            break;
        }
        debug!(doubt_id = %id, "doubt id collision, regenerating");
    }

    info!(doubt_id = %doubt.id, learner = %doubt.uid, subject = %doubt.subject, "doubt created");
    Ok(doubt)
}

pub async fn get_doubt(store: &dyn DocumentStore, id: &str) -> Result<Option<Doubt>, StoreError> {
    store
        .get(Collection::Doubts, id)
        .await?
        .map(|doc| doc.decode(Collection::Doubts))
        .transpose()
}

/// All doubts, newest first, optionally restricted to one subject.
pub async fn list_doubts(
    store: &dyn DocumentStore,
    subject: Option<&str>,
) -> Result<Vec<Doubt>, StoreError> {
    let query = match subject {
        Some(subject) => Query::field_eq("subject", subject),
        None => Query::all(),
    }
    .order_by("createdAt", Direction::Desc);

    let docs = store.query(Collection::Doubts, &query).await?;
    decode_all(docs, Collection::Doubts)
}

/// Doubts owned by one learner, newest first.
pub async fn list_for_learner(
    store: &dyn DocumentStore,
    uid: &str,
) -> Result<Vec<Doubt>, StoreError> {
    let query = Query::field_eq("uid", uid).order_by("createdAt", Direction::Desc);
    let docs = store.query(Collection::Doubts, &query).await?;
    decode_all(docs, Collection::Doubts)
}

/// Replace the doubt's recommendation set with `tutor_uids`.
///
/// Only the `recommendedTutors` field is written; accepted tutors and every
/// other field are untouched.
pub async fn set_recommended_tutors(
    store: &dyn DocumentStore,
    doubt_id: &str,
    tutor_uids: &[String],
) -> Result<(), DoubtError> {
    let mut fields = Fields::new();
    fields.insert(
        RECOMMENDED_FIELD.to_owned(),
        Value::Array(tutor_uids.iter().cloned().map(Value::String).collect()),
    );

    if !store.update(Collection::Doubts, doubt_id, fields).await? {
        return Err(DoubtError::NotFound(doubt_id.to_owned()));
    }
    Ok(())
}

/// Server-side gate for doubt acceptance: the acting user must be a tutor
/// who teaches the doubt's subject.
pub fn check_tutor_eligibility(tutor: &UserProfile, doubt: &Doubt) -> Result<(), DoubtError> {
    if tutor.is_tutor() && tutor.teaches(&doubt.subject) {
        Ok(())
    } else {
        Err(DoubtError::NotEligible {
            subject: doubt.subject.clone(),
        })
    }
}

/// Record that `tutor_uid` accepted the doubt. Idempotent per tutor.
pub async fn accept_doubt(
    store: &dyn DocumentStore,
    doubt_id: &str,
    tutor_uid: &str,
) -> Result<AcceptOutcome, DoubtError> {
    match store
        .add_to_set(Collection::Doubts, doubt_id, ACCEPTED_FIELD, tutor_uid)
        .await?
    {
        SetAdd::Added => {
            info!(doubt_id, tutor = tutor_uid, "doubt accepted");
            Ok(AcceptOutcome::Added)
        }
        SetAdd::AlreadyPresent => Ok(AcceptOutcome::AlreadyAccepted),
        SetAdd::Missing => Err(DoubtError::NotFound(doubt_id.to_owned())),
    }
}
