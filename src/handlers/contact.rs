use axum::{
    Json,
    body::Bytes,
    extract::State,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::identity::ClientIdentity;
use crate::metrics::{JOURNAL_FAILURES, RATE_LIMITED};
use crate::models::{ContactRequest, Inquiry, StatusResponse};
use crate::state::AppState;

const MAX_MESSAGE_CHARS: usize = 2000;

// POST /contact - append one inquiry to the journal
pub async fn contact_handler(
    State(state): State<Arc<AppState>>,
    ClientIdentity(identity): ClientIdentity,
    body: Bytes,
) -> Result<Json<StatusResponse>, ApiError> {
    let now = Utc::now();
    if !state.contact_cooldown.admit(&identity, now) {
        RATE_LIMITED.inc();
        return Err(ApiError::TooFrequent);
    }

    let form: ContactRequest = serde_json::from_slice(&body).unwrap_or_default();
    let inquiry = Inquiry {
        ts: now,
        ip: identity,
        name: form.name.trim().to_string(),
        email: form.email.trim().to_string(),
        business_type: form.business_type.trim().to_string(),
        product: form.product.trim().to_string(),
        message: form.message.trim().chars().take(MAX_MESSAGE_CHARS).collect(),
    };

    // the submitter still gets an ok if the journal write fails
    match state.inquiries.append(&inquiry).await {
        Ok(()) => info!(name = %inquiry.name, product = %inquiry.product, "Inquiry recorded"),
        Err(e) => {
            JOURNAL_FAILURES.inc();
            warn!(error = %e, "Failed to record inquiry");
        }
    }

    Ok(Json(StatusResponse::ok()))
}
