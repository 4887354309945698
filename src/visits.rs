use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::error::JournalError;
use crate::identity::client_identity;
use crate::journal::Journal;
use crate::metrics::JOURNAL_FAILURES;
use crate::models::VisitRecord;
use crate::state::AppState;

pub struct VisitRecorder {
    journal: Journal<VisitRecord>,
}

impl VisitRecorder {
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            journal: Journal::new(path, max_bytes),
        }
    }

    // Write failures are logged and swallowed; the request goes on regardless.
    pub async fn record(&self, identity: &str, path: &str, at: DateTime<Utc>) {
        let visit = VisitRecord {
            time: at,
            ip: identity.to_string(),
            path: path.to_string(),
        };

        if let Err(err) = self.journal.append(&visit).await {
            JOURNAL_FAILURES.inc();
            warn!(
                journal = %self.journal.path().display(),
                path = %visit.path,
                error = %err,
                "Failed to record visit"
            );
        }
    }

    pub async fn read_all(&self) -> Result<Vec<VisitRecord>, JournalError> {
        self.journal.read_all().await
    }
}

// Middleware - runs before every handler, whatever the handler returns
pub async fn record_visit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let identity = client_identity(
        request.headers(),
        request.extensions(),
        state.trust_forwarded_for,
    );
    state
        .visits
        .record(&identity, request.uri().path(), Utc::now())
        .await;

    next.run(request).await
}
