//! Read access to user profiles and the tutor candidate pool.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::data::models::{TutorProfile, UserProfile};
use crate::store::{Collection, DocumentStore, Query, StoreError};

/// Fetch one user profile by uid.
pub async fn get_user(
    store: &dyn DocumentStore,
    uid: &str,
) -> Result<Option<UserProfile>, StoreError> {
    store
        .get(Collection::Users, uid)
        .await?
        .map(|doc| doc.decode(Collection::Users))
        .transpose()
}

/// Every decodable user profile in store order.
///
/// A profile that fails to decode is skipped so one malformed document
/// cannot hide the rest.
async fn load_profiles(store: &dyn DocumentStore) -> Result<Vec<UserProfile>, StoreError> {
    let docs = store.query(Collection::Users, &Query::all()).await?;

    let mut users = Vec::with_capacity(docs.len());
    for doc in docs {
        let id = doc.id.clone();
        match doc.decode::<UserProfile>(Collection::Users) {
            Ok(user) => users.push(user),
            Err(e) => warn!(uid = %id, error = ?e, "skipping malformed user profile"),
        }
    }
    Ok(users)
}

/// Load every tutor profile, fresh, in store order.
///
/// Uses the same role rule as tutor eligibility, so anyone allowed to accept
/// a doubt is also a matching candidate. An empty pool is a valid result.
pub async fn load_tutor_pool(store: &dyn DocumentStore) -> Result<Vec<TutorProfile>, StoreError> {
    let pool: Vec<TutorProfile> = load_profiles(store)
        .await?
        .into_iter()
        .filter(UserProfile::is_tutor)
        .map(TutorProfile::from)
        .collect();

    debug!(candidates = pool.len(), "tutor pool loaded");
    Ok(pool)
}

/// User directory, optionally narrowed by a subject search.
pub async fn list_users(
    store: &dyn DocumentStore,
    subject: Option<&str>,
) -> Result<Vec<UserProfile>, StoreError> {
    let subject = subject.map(str::trim).filter(|s| !s.is_empty());
    let users = load_profiles(store).await?;
    Ok(match subject {
        Some(search) => users
            .into_iter()
            .filter(|user| user.subjects_contain(search))
            .collect(),
        None => users,
    })
}

/// Map uids to display names. Unknown uids are left out.
pub async fn display_names(
    store: &dyn DocumentStore,
    uids: impl IntoIterator<Item = &str>,
) -> Result<BTreeMap<String, String>, StoreError> {
    let mut names = BTreeMap::new();
    for uid in uids {
        if names.contains_key(uid) {
            continue;
        }
        if let Some(user) = get_user(store, uid).await? {
            names.insert(user.id, user.name);
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Fields, MemoryStore};
    use serde_json::json;

    async fn insert(store: &MemoryStore, id: &str, value: serde_json::Value) {
        let fields: Fields = value.as_object().cloned().unwrap();
        store.create(Collection::Users, id, fields).await.unwrap();
    }

    #[tokio::test]
    async fn test_pool_contains_only_tutors_in_store_order() {
        let store = MemoryStore::new();
        insert(&store, "t2", json!({ "name": "Bo", "role": "Tutor", "subjects": ["Physics"] })).await;
        insert(&store, "l1", json!({ "name": "Lina", "role": "Student" })).await;
        insert(&store, "t1", json!({ "name": "Ana", "role": "Tutor" })).await;

        let pool = load_tutor_pool(&store).await.unwrap();
        let uids: Vec<_> = pool.iter().map(|t| t.uid.as_str()).collect();
        assert_eq!(uids, ["t2", "t1"]);
        assert_eq!(pool[1].bio, "");
        assert!(pool[1].subjects.is_empty());
    }

    #[tokio::test]
    async fn test_empty_pool_is_not_an_error() {
        let store = MemoryStore::new();
        assert!(load_tutor_pool(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_profile_is_skipped() {
        let store = MemoryStore::new();
        insert(&store, "t1", json!({ "name": "Ana", "role": "Tutor" })).await;
        insert(&store, "t2", json!({ "name": 42, "role": "Tutor" })).await;

        let pool = load_tutor_pool(&store).await.unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].uid, "t1");
    }

    #[tokio::test]
    async fn test_pool_matches_role_after_trimming() {
        let store = MemoryStore::new();
        insert(&store, "t1", json!({ "name": "Ana", "role": "Tutor ", "subjects": ["Math"] })).await;
        insert(&store, "t2", json!({ "name": "Bo", "role": "tutor" })).await;

        let user = get_user(&store, "t1").await.unwrap().unwrap();
        assert!(user.is_tutor());

        let pool = load_tutor_pool(&store).await.unwrap();
        let uids: Vec<_> = pool.iter().map(|t| t.uid.as_str()).collect();
        assert_eq!(uids, ["t1"]);
    }

    #[tokio::test]
    async fn test_list_users_filters_by_subject() {
        let store = MemoryStore::new();
        insert(&store, "u1", json!({ "name": "Ana", "role": "Tutor", "subjects": ["Math"] })).await;
        insert(&store, "u2", json!({ "name": "Bo", "role": "Student", "subjects": ["Physics"] })).await;
        insert(&store, "u3", json!({ "name": "Cy", "role": "Student" })).await;

        let all = list_users(&store, None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(list_users(&store, Some("  ")).await.unwrap().len(), 3);

        let physics = list_users(&store, Some("phys")).await.unwrap();
        let uids: Vec<_> = physics.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(uids, ["u2"]);
    }

    #[tokio::test]
    async fn test_display_names_skip_unknown_uids() {
        let store = MemoryStore::new();
        insert(&store, "t1", json!({ "name": "Ana", "role": "Tutor" })).await;

        let names = display_names(&store, ["t1", "ghost", "t1"]).await.unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(names["t1"], "Ana");
    }

    #[tokio::test]
    async fn test_get_user() {
        let store = MemoryStore::new();
        insert(&store, "u1", json!({ "name": "Ana", "role": "Tutor" })).await;

        let user = get_user(&store, "u1").await.unwrap().unwrap();
        assert_eq!(user.id, "u1");
        assert!(get_user(&store, "u2").await.unwrap().is_none());
    }
}
