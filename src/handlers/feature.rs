use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::identity::{ClientIdentity, new_session_id, session_cookie, session_set_cookie};
use crate::metrics::{RATE_LIMITED, START_REQUESTS, UNAUTHORIZED_STREAMS};
use crate::models::{ChatMessage, StartRequest, StatusResponse};
use crate::relay::{Framing, OnFinish, RelayJob, RelayOutcome, relay};
use crate::session::SessionKey;
use crate::state::AppState;

// POST /{feature}/start - spend quota, leave a grant for the next stream
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    ClientIdentity(identity): ClientIdentity,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    START_REQUESTS.inc();

    let feature = state
        .features
        .get(&name)
        .ok_or_else(|| ApiError::UnknownFeature(name.clone()))?;

    // a missing or unreadable body counts as an empty seed
    let payload: StartRequest = serde_json::from_slice(&body).unwrap_or_default();
    let session = session_cookie(&headers).unwrap_or_else(new_session_id);

    state
        .gate
        .authorize(
            SessionKey::new(&session, feature.name()),
            &identity,
            payload.seed,
            Utc::now(),
        )
        .inspect_err(|_| {
            RATE_LIMITED.inc();
            warn!(feature = %name, identity = %identity, "Start rejected, quota reached");
        })?;

    info!(feature = %name, identity = %identity, "Stream authorized");

    Ok((
        [(header::SET_COOKIE, session_set_cookie(&session))],
        Json(StatusResponse::ok()),
    )
        .into_response())
}

// GET /{feature}/stream - consume the grant and relay upstream
pub async fn stream_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let feature = state
        .features
        .get(&name)
        .ok_or_else(|| ApiError::UnknownFeature(name.clone()))?;
    let framing = feature.framing();

    let now = Utc::now();
    let grant = session_cookie(&headers).and_then(|session| {
        let key = SessionKey::new(session, feature.name());
        state.gate.consume(&key, now).map(|grant| (key, grant))
    });

    // Not an HTTP error: the client already expects a stream
    let Some((key, grant)) = grant else {
        UNAUTHORIZED_STREAMS.inc();
        debug!(feature = %name, "Stream without grant");
        let notice = framing.notice(feature.unauthorized_message());
        return Ok(stream_response(framing, Body::from(notice)));
    };

    let history = if feature.keeps_history() {
        state.conversations.history(&key)
    } else {
        Vec::new()
    };
    let messages = feature.build_messages(&grant.payload, &history);

    let job = RelayJob {
        label: feature.name().to_string(),
        request: feature.upstream_request(messages),
        framing,
        trailer: feature.render_trailer(&grant.payload),
    };

    let on_finish: OnFinish = if feature.keeps_history() {
        let state = Arc::clone(&state);
        let user_turn = feature.user_message(&grant.payload);
        Box::new(move |outcome: &RelayOutcome| {
            if outcome.is_completed() && !outcome.content.is_empty() {
                let turns = user_turn
                    .into_iter()
                    .chain([ChatMessage::assistant(outcome.content.clone())]);
                state.conversations.append(&key, turns, Utc::now());
            }
        })
    } else {
        Box::new(|_: &RelayOutcome| {})
    };

    info!(feature = %name, "Relay starting");
    let stream = relay(Arc::clone(&state.upstream), job, on_finish);

    Ok(stream_response(
        framing,
        Body::from_stream(stream.map(Ok::<_, Infallible>)),
    ))
}

fn stream_response(framing: Framing, body: Body) -> Response {
    (
        [
            (header::CONTENT_TYPE, framing.content_type()),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}
