use std::future::Future;
use std::panic::AssertUnwindSafe;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditScope, EventOutcome, EventType};
use crate::auth::AuthContext;
use crate::database::models::{DefaultPayload, DefaultRecord};
use crate::database::DefaultRepository;
use crate::error::HandlerFault;
use crate::middleware::{Envelope, Responder};

use super::AppState;

pub const MISSING_JWT: &str = "missing jwt!";

/// What varies between the four default operations
#[derive(Debug)]
pub struct Operation {
    pub action: &'static str,
    pub seed: EventType,
    pub fault_message: &'static str,
    started: &'static str,
    finished: &'static str,
}

pub const LIST: Operation = Operation {
    action: "list-default",
    seed: EventType::Access,
    fault_message: "failed to fetch default from database",
    started: "fetching default",
    finished: "fetched default",
};

pub const CREATE: Operation = Operation {
    action: "create-default",
    seed: EventType::Creation,
    fault_message: "failed to create default in database",
    started: "creating default",
    finished: "created default",
};

pub const UPDATE: Operation = Operation {
    action: "update-default",
    seed: EventType::Change,
    fault_message: "failed to update default in database",
    started: "updating default",
    finished: "updated default",
};

pub const DELETE: Operation = Operation {
    action: "delete-default",
    seed: EventType::Deletion,
    fault_message: "failed to delete default from database",
    started: "deleting default",
    finished: "removed default",
};

/// Repository results the pipeline knows how to classify
pub trait RepositoryOutcome: Serialize {
    fn is_actionable(&self) -> bool;
}

impl RepositoryOutcome for bool {
    fn is_actionable(&self) -> bool {
        *self
    }
}

impl RepositoryOutcome for Vec<DefaultRecord> {
    fn is_actionable(&self) -> bool {
        !self.is_empty()
    }
}

/// GET {prefix} - all defaults of the calling user
pub async fn list(State(state): State<AppState>, auth: Option<Extension<AuthContext>>) -> Envelope {
    run(&state, auth, &LIST, Ok(()), |repo, user_id, ()| async move {
        repo.list(user_id).await
    })
    .await
}

/// POST {prefix} - create a default for the calling user
pub async fn create(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    body: Option<Json<DefaultPayload>>,
) -> Envelope {
    let input = require_name(body);

    run(&state, auth, &CREATE, input, |repo, user_id, payload| async move {
        repo.create(&payload, user_id).await
    })
    .await
}

/// PUT {prefix}/:id - rename one of the calling user's defaults
pub async fn update(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<String>,
    body: Option<Json<DefaultPayload>>,
) -> Envelope {
    let input = parse_id(&id).and_then(|id| Ok((id, require_name(body)?)));

    run(&state, auth, &UPDATE, input, |repo, user_id, (id, payload)| async move {
        repo.update(id, &payload, user_id).await
    })
    .await
}

/// DELETE {prefix}/:id - remove one of the calling user's defaults
pub async fn delete(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<String>,
) -> Envelope {
    let input = parse_id(&id);

    run(&state, auth, &DELETE, input, |repo, user_id, id| async move {
        repo.delete(id, user_id).await
    })
    .await
}

fn parse_id(raw: &str) -> Result<i32, HandlerFault> {
    raw.trim()
        .parse()
        .map_err(|_| HandlerFault::invalid("id", "must be an integer"))
}

fn require_name(body: Option<Json<DefaultPayload>>) -> Result<DefaultPayload, HandlerFault> {
    match body {
        Some(Json(payload)) if payload.name.as_deref().is_some_and(|n| !n.trim().is_empty()) => Ok(payload),
        _ => Err(HandlerFault::invalid("name", "is required")),
    }
}

/// Auth gate, dispatch, classification and audit for one request.
///
/// Requests without a decoded token stop at the gate with a 401 and leave no
/// audit trail. Every other request records exactly one audit event whose
/// outcome matches the envelope kind.
pub async fn run<I, T, F, Fut>(
    state: &AppState,
    auth: Option<Extension<AuthContext>>,
    op: &Operation,
    input: Result<I, HandlerFault>,
    dispatch: F,
) -> Envelope
where
    T: RepositoryOutcome,
    F: FnOnce(DefaultRepository, i32, I) -> Fut,
    Fut: Future<Output = T>,
{
    let responder = Responder::start();

    let Some(Extension(auth)) = auth else {
        return responder.error(MISSING_JWT).with_code(StatusCode::UNAUTHORIZED);
    };

    let span = tracing::info_span!("default", action = op.action, sub = %auth.sub, request_id = %Uuid::new_v4());
    let mut audit = AuditScope::begin(state.audit.clone(), AuditEvent::database(op.action, vec![op.seed]));

    let attempt = async {
        let input = input?;
        let user_id = auth.user_id()?;
        let executor = state.pools.get_sql_pool(None).await?;
        let repo = DefaultRepository::new(executor, state.procedures.clone(), span.clone());

        tracing::debug!("{}", op.started);
        Ok::<T, HandlerFault>(dispatch(repo, user_id, input).await)
    }
    .instrument(span.clone());

    let result = AssertUnwindSafe(attempt).catch_unwind().await;

    let envelope = span.in_scope(|| match result {
        Ok(Ok(outcome)) if outcome.is_actionable() => {
            tracing::debug!(success = true, "{}", op.finished);
            audit.resolve(EventOutcome::Success, EventType::Allowed);
            responder.success(outcome)
        }
        Ok(Ok(_)) => {
            tracing::debug!(success = false, "{}", op.finished);
            audit.resolve(EventOutcome::Failure, EventType::Denied);
            responder.fail(None)
        }
        Ok(Err(HandlerFault::InvalidInput { field, reason })) => {
            tracing::debug!(field, reason, "rejected request input");
            audit.resolve(EventOutcome::Failure, EventType::Denied);

            let mut data = Map::new();
            data.insert(field.to_string(), Value::from(reason));
            responder.fail(Some(Value::Object(data))).with_code(StatusCode::BAD_REQUEST)
        }
        Ok(Err(fault)) => {
            tracing::error!(error = %fault, "{}", op.fault_message);
            audit.resolve(EventOutcome::Failure, EventType::Error);
            responder.error(op.fault_message)
        }
        Err(_) => {
            tracing::error!("{} (handler panicked)", op.fault_message);
            audit.resolve(EventOutcome::Failure, EventType::Error);
            responder.error(op.fault_message)
        }
    });

    span.in_scope(|| drop(audit));
    envelope
}
