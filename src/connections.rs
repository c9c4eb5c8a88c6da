//! Connection graph: at most one edge per unordered pair of users.
//!
//! An edge starts `pending`, and only its recipient can move it to `accepted`
//! or `declined`. A declined edge is revived, with requester and recipient
//! swapped, when the party that declined asks in turn.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{BoardError, BoardResult},
    models::{Connection, ConnectionStatus, PublicUser},
    realtime::{ConnectionNotice, RealtimeEvent, RealtimeHub},
    store::{Store, StoreError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Accept,
    Decline,
}

#[derive(Debug, Clone)]
pub enum RequestOutcome {
    Created(Connection),
    Revived(Connection),
    Existing(Connection),
}

impl RequestOutcome {
    pub fn connection(&self) -> &Connection {
        match self {
            RequestOutcome::Created(connection)
            | RequestOutcome::Revived(connection)
            | RequestOutcome::Existing(connection) => connection,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RequestOutcome::Created(_) => "Request sent",
            RequestOutcome::Revived(_) => "Request re-sent",
            RequestOutcome::Existing(_) => "Connection already exists",
        }
    }
}

/// A connection together with the public identity of the other party.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionWithUser {
    #[serde(flatten)]
    pub connection: Connection,
    pub user: Option<PublicUser>,
}

fn notice(connection: &Connection, from: Option<PublicUser>) -> ConnectionNotice {
    ConnectionNotice {
        connection_id: connection.id,
        requester_id: connection.requester_id,
        recipient_id: connection.recipient_id,
        status: connection.status,
        from,
    }
}

async fn public_user(store: &dyn Store, id: Uuid) -> BoardResult<Option<PublicUser>> {
    Ok(store.find_user(id).await?.as_ref().map(PublicUser::from))
}

pub async fn request(
    store: &dyn Store,
    hub: &RealtimeHub,
    requester: &AuthenticatedUser,
    recipient_id: Uuid,
) -> BoardResult<RequestOutcome> {
    let requester_id = requester.user_id;
    if requester_id == recipient_id {
        return Err(BoardError::validation("Cannot send request to yourself"));
    }
    if store.find_user(recipient_id).await?.is_none() {
        return Err(BoardError::not_found("Recipient user not found"));
    }

    let outcome = match store.find_connection_between(requester_id, recipient_id).await? {
        Some(existing)
            if existing.status == ConnectionStatus::Declined
                && existing.requester_id != requester_id =>
        {
            let revived = store
                .update_connection(
                    existing.id,
                    requester_id,
                    recipient_id,
                    ConnectionStatus::Pending,
                )
                .await?;
            RequestOutcome::Revived(revived)
        }
        Some(existing) => return Ok(RequestOutcome::Existing(existing)),
        None => match store.insert_connection(requester_id, recipient_id).await {
            Ok(created) => RequestOutcome::Created(created),
            Err(StoreError::UniqueViolation(_)) => {
                let existing = store
                    .find_connection_between(requester_id, recipient_id)
                    .await?
                    .ok_or_else(|| BoardError::conflict("Connection already exists"))?;
                return Ok(RequestOutcome::Existing(existing));
            }
            Err(err) => return Err(err.into()),
        },
    };

    let connection = outcome.connection();
    info!(
        connection_id = %connection.id,
        user_id = %requester_id,
        recipient_id = %recipient_id,
        "connection requested"
    );
    let from = public_user(store, requester_id).await?;
    hub.emit(
        recipient_id,
        RealtimeEvent::ConnectionRequest(notice(connection, from)),
    );
    Ok(outcome)
}

/// Pending requests addressed to the user, newest first, with the requester.
pub async fn list_incoming(
    store: &dyn Store,
    user: &AuthenticatedUser,
) -> BoardResult<Vec<ConnectionWithUser>> {
    let requests = store.list_incoming_requests(user.user_id).await?;
    enrich(store, requests, |connection| connection.requester_id).await
}

async fn enrich<F>(
    store: &dyn Store,
    connections: Vec<Connection>,
    party: F,
) -> BoardResult<Vec<ConnectionWithUser>>
where
    F: Fn(&Connection) -> Uuid,
{
    let ids: Vec<Uuid> = connections.iter().map(&party).collect();
    let users = store.find_users(&ids).await?;
    Ok(connections
        .into_iter()
        .map(|connection| {
            let other = party(&connection);
            let user = users
                .iter()
                .find(|user| user.id == other)
                .map(PublicUser::from);
            ConnectionWithUser { connection, user }
        })
        .collect())
}

pub async fn respond(
    store: &dyn Store,
    hub: &RealtimeHub,
    user: &AuthenticatedUser,
    connection_id: Uuid,
    action: Action,
) -> BoardResult<Connection> {
    let connection = store
        .find_connection(connection_id)
        .await?
        .ok_or_else(|| BoardError::not_found("Request not found"))?;
    if connection.recipient_id != user.user_id {
        return Err(BoardError::forbidden(
            "Not authorized to respond to this request",
        ));
    }
    if connection.status != ConnectionStatus::Pending {
        return Err(BoardError::conflict("This request has already been answered."));
    }

    let status = match action {
        Action::Accept => ConnectionStatus::Accepted,
        Action::Decline => ConnectionStatus::Declined,
    };
    let updated = store
        .update_connection(
            connection.id,
            connection.requester_id,
            connection.recipient_id,
            status,
        )
        .await?;

    if status == ConnectionStatus::Accepted {
        store
            .add_user_connection(updated.requester_id, updated.recipient_id)
            .await?;
        store
            .add_user_connection(updated.recipient_id, updated.requester_id)
            .await?;
    }

    info!(
        connection_id = %updated.id,
        user_id = %user.user_id,
        status = status.as_str(),
        "connection answered"
    );
    let from = public_user(store, user.user_id).await?;
    for party in [updated.requester_id, updated.recipient_id] {
        hub.emit(
            party,
            RealtimeEvent::ConnectionResponded(notice(&updated, from.clone())),
        );
    }
    Ok(updated)
}

pub async fn status_between(
    store: &dyn Store,
    user: &AuthenticatedUser,
    other_id: Uuid,
) -> BoardResult<Option<Connection>> {
    Ok(store.find_connection_between(user.user_id, other_id).await?)
}

/// Accepted connections of the user, each with the other party's identity.
pub async fn list_accepted(
    store: &dyn Store,
    user: &AuthenticatedUser,
) -> BoardResult<Vec<ConnectionWithUser>> {
    let me = user.user_id;
    let accepted = store.list_accepted_connections(me).await?;
    enrich(store, accepted, |connection| connection.other_party(me)).await
}

pub async fn are_connected(store: &dyn Store, a: Uuid, b: Uuid) -> BoardResult<bool> {
    Ok(store
        .find_connection_between(a, b)
        .await?
        .is_some_and(|connection| connection.status == ConnectionStatus::Accepted))
}
