//! Connection requests and established connections.
//!
//! A pair of users moves `NONE -> REQUESTED -> {CONNECTED | NONE}`:
//!
//! - the sender creates a [`ConnectionRequest`] (`send_request`);
//! - the recipient accepts, turning it into a [`Connection`] and deleting the
//!   request along with any crossed request in the other direction
//!   (`accept_request`), or rejects, deleting it (`reject_request`).
//!
//! Both entities use deterministic document ids derived from the user pair,
//! so "one outstanding request per ordered pair" and "one connection per
//! unordered pair" are enforced by the store's create-if-absent primitive.
//! Accepting is safe to retry: if the connection already exists the create is
//! a no-op and the leftover request is still removed.

use tracing::{debug, info};

use crate::auth::Principal;
use crate::data::models::{Connection, ConnectionRequest, stored_now};
use crate::data::users::get_user;
use crate::store::{Collection, DocumentStore, Query, StoreError, decode_all, to_fields};

/// Message used when the sender leaves it blank.
pub const DEFAULT_MESSAGE: &str = "Hi! I'd like to connect and collaborate!";

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("cannot send a connection request to yourself")]
    SelfRequest,
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error("already connected with {0}")]
    AlreadyConnected(String),
    #[error("a connection request to {0} is already pending")]
    AlreadyRequested(String),
    #[error("connection request {0} not found")]
    RequestNotFound(String),
    #[error("only the recipient can respond to a connection request")]
    NotRecipient,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Length-prefixed so that no two distinct pairs share a key.
fn pair_key(first: &str, second: &str) -> String {
    format!("{}:{first}:{second}", first.len())
}

fn sorted_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Document id of the request from `from_uid` to `to_uid`.
pub fn request_key(from_uid: &str, to_uid: &str) -> String {
    pair_key(from_uid, to_uid)
}

/// Document id of the connection between two users, independent of order.
pub fn connection_key(a: &str, b: &str) -> String {
    let (low, high) = sorted_pair(a, b);
    pair_key(low, high)
}

pub async fn get_request(
    store: &dyn DocumentStore,
    request_id: &str,
) -> Result<Option<ConnectionRequest>, StoreError> {
    store
        .get(Collection::ConnectionRequests, request_id)
        .await?
        .map(|doc| doc.decode(Collection::ConnectionRequests))
        .transpose()
}

pub async fn get_connection_between(
    store: &dyn DocumentStore,
    a: &str,
    b: &str,
) -> Result<Option<Connection>, StoreError> {
    store
        .get(Collection::Connections, &connection_key(a, b))
        .await?
        .map(|doc| doc.decode(Collection::Connections))
        .transpose()
}

/// `NONE -> REQUESTED`: the principal asks `to_uid` to connect.
pub async fn send_request(
    store: &dyn DocumentStore,
    principal: &Principal,
    to_uid: &str,
    message: Option<&str>,
) -> Result<ConnectionRequest, ConnectionError> {
    if principal.uid == to_uid {
        return Err(ConnectionError::SelfRequest);
    }

    let sender = get_user(store, &principal.uid)
        .await?
        .ok_or_else(|| ConnectionError::UserNotFound(principal.uid.clone()))?;
    let recipient = get_user(store, to_uid)
        .await?
        .ok_or_else(|| ConnectionError::UserNotFound(to_uid.to_owned()))?;

    if get_connection_between(store, &sender.id, &recipient.id)
        .await?
        .is_some()
    {
        return Err(ConnectionError::AlreadyConnected(recipient.id));
    }

    let message = message
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MESSAGE);

    let request = ConnectionRequest {
        id: request_key(&sender.id, &recipient.id),
        from_uid: sender.id,
        from_name: sender.name,
        to_uid: recipient.id,
        to_name: recipient.name,
        message: message.to_owned(),
        created_at: stored_now(),
    };

    let created = store
        .create(
            Collection::ConnectionRequests,
            &request.id,
            to_fields(&request)?,
        )
        .await?;
    if !created {
        return Err(ConnectionError::AlreadyRequested(request.to_uid));
    }

    // A crossed accept may have connected the pair after the check above.
    if get_connection_between(store, &request.from_uid, &request.to_uid)
        .await?
        .is_some()
    {
        store
            .delete(Collection::ConnectionRequests, &request.id)
            .await?;
        return Err(ConnectionError::AlreadyConnected(request.to_uid));
    }

    info!(from = %request.from_uid, to = %request.to_uid, "connection request sent");
    Ok(request)
}

/// Load a pending request and make sure the principal is its recipient.
async fn load_for_recipient(
    store: &dyn DocumentStore,
    principal: &Principal,
    request_id: &str,
) -> Result<ConnectionRequest, ConnectionError> {
    let request = get_request(store, request_id)
        .await?
        .ok_or_else(|| ConnectionError::RequestNotFound(request_id.to_owned()))?;
    if request.to_uid != principal.uid {
        return Err(ConnectionError::NotRecipient);
    }
    Ok(request)
}

/// `REQUESTED -> CONNECTED`: create the connection, then consume the request.
pub async fn accept_request(
    store: &dyn DocumentStore,
    principal: &Principal,
    request_id: &str,
) -> Result<Connection, ConnectionError> {
    let request = load_for_recipient(store, principal, request_id).await?;

    let (user_a, user_b) = sorted_pair(&request.from_uid, &request.to_uid);
    let connection = Connection {
        id: connection_key(user_a, user_b),
        user_a: user_a.to_owned(),
        user_b: user_b.to_owned(),
        initiated_by: request.from_uid.clone(),
        message: request.message.clone(),
        created_at: stored_now(),
    };

    let created = store
        .create(
            Collection::Connections,
            &connection.id,
            to_fields(&connection)?,
        )
        .await?;
    let connection = if created {
        connection
    } else {
        debug!(connection_id = %connection.id, "connection already exists, reusing it");
        store
            .get(Collection::Connections, &connection.id)
            .await?
            .map(|doc| doc.decode(Collection::Connections))
            .transpose()?
            .unwrap_or(connection)
    };

    if !store
        .delete(Collection::ConnectionRequests, &request.id)
        .await?
    {
        debug!(request_id = %request.id, "request was already consumed");
    }
    let reverse_id = request_key(&request.to_uid, &request.from_uid);
    if store
        .delete(Collection::ConnectionRequests, &reverse_id)
        .await?
    {
        debug!(request_id = %reverse_id, "removed crossed request");
    }

    info!(
        from = %request.from_uid,
        to = %request.to_uid,
        connection_id = %connection.id,
        "connection request accepted"
    );
    Ok(connection)
}

/// `REQUESTED -> NONE`: drop the request without creating a connection.
pub async fn reject_request(
    store: &dyn DocumentStore,
    principal: &Principal,
    request_id: &str,
) -> Result<ConnectionRequest, ConnectionError> {
    let request = load_for_recipient(store, principal, request_id).await?;

    if !store
        .delete(Collection::ConnectionRequests, &request.id)
        .await?
    {
        return Err(ConnectionError::RequestNotFound(request.id));
    }

    info!(from = %request.from_uid, to = %request.to_uid, "connection request rejected");
    Ok(request)
}

/// Pending requests addressed to `uid`.
pub async fn incoming_requests(
    store: &dyn DocumentStore,
    uid: &str,
) -> Result<Vec<ConnectionRequest>, StoreError> {
    let docs = store
        .query(
            Collection::ConnectionRequests,
            &Query::field_eq("toUid", uid),
        )
        .await?;
    decode_all(docs, Collection::ConnectionRequests)
}

/// Pending requests sent by `uid`.
pub async fn outgoing_requests(
    store: &dyn DocumentStore,
    uid: &str,
) -> Result<Vec<ConnectionRequest>, StoreError> {
    let docs = store
        .query(
            Collection::ConnectionRequests,
            &Query::field_eq("fromUid", uid),
        )
        .await?;
    decode_all(docs, Collection::ConnectionRequests)
}

/// Every connection `uid` participates in.
pub async fn connections_for(
    store: &dyn DocumentStore,
    uid: &str,
) -> Result<Vec<Connection>, StoreError> {
    let (by_a, by_b) = (Query::field_eq("userA", uid), Query::field_eq("userB", uid));
    let (as_a, as_b) = tokio::try_join!(
        store.query(Collection::Connections, &by_a),
        store.query(Collection::Connections, &by_b),
    )?;

    let mut connections: Vec<Connection> = decode_all(as_a, Collection::Connections)?;
    connections.extend(decode_all::<Connection>(as_b, Collection::Connections)?);
    Ok(connections)
}
