use chrono::Utc;
use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::{debug, info};

use crate::metrics::RATE_BUCKETS;
use crate::state::AppState;

// Sweep function - drops expired rate buckets, unused grants and idle chats

pub async fn janitor(state: Arc<AppState>, every: Duration) {
    let mut interval = interval(every);

    info!(interval_secs = every.as_secs(), "Janitor started");

    loop {
        interval.tick().await;
        sweep_once(&state);
    }
}

pub fn sweep_once(state: &AppState) {
    let now = Utc::now();

    let buckets =
        state.gate.limiter().sweep(now) + state.contact_cooldown.sweep(now);
    let grants = state.gate.sweep(now);
    let conversations = state.conversations.sweep(now);

    RATE_BUCKETS.set(state.rate_buckets() as f64);

    // Log only when something was dropped
    if buckets + grants + conversations > 0 {
        info!(buckets, grants, conversations, "Expired state swept");
    } else {
        debug!("Nothing to sweep");
    }
}
