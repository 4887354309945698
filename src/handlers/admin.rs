use axum::{
    Json,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

use crate::models::AdminView;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AdminQuery {
    pwd: Option<String>,
}

// GET /admin?pwd=... - journal dump for the operator
pub async fn admin_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
) -> Response {
    let authorized = matches!(
        (&state.admin_password, &query.pwd),
        (Some(expected), Some(given)) if expected == given
    );
    if !authorized {
        warn!("Admin view refused");
        return "wrong password".into_response();
    }

    let visits = state.visits.read_all().await.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to read visits journal");
        Vec::new()
    });
    let inquiries = state.inquiries.read_all().await.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to read inquiries journal");
        Vec::new()
    });

    Json(AdminView {
        features: state.features.names(),
        rate_buckets: state.rate_buckets(),
        pending_grants: state.gate.pending(),
        conversations: state.conversations.len(),
        visits_total: visits.len(),
        visits,
        inquiries,
    })
    .into_response()
}
