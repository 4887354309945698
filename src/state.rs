use std::sync::Arc;

use crate::config::Args;
use crate::conversation::ConversationStore;
use crate::feature::FeatureCatalog;
use crate::journal::Journal;
use crate::models::Inquiry;
use crate::rate_limit::{Cooldown, RateLimiter};
use crate::relay::Upstream;
use crate::session::SessionGate;
use crate::visits::VisitRecorder;

// app's shared state

pub struct AppState {
    pub features: FeatureCatalog,
    pub upstream: Arc<dyn Upstream>,       // where relays open their streams
    pub gate: SessionGate,                 // owns the stream rate limiter
    pub contact_cooldown: Cooldown,        // contact form, one post per gap
    pub conversations: ConversationStore,  // per-session chat history
    pub visits: VisitRecorder,
    pub inquiries: Journal<Inquiry>,
    pub admin_password: Option<String>,
    pub trust_forwarded_for: bool,
}

impl AppState {
    pub fn new(args: &Args, features: FeatureCatalog, upstream: Arc<dyn Upstream>) -> Self {
        let limiter = Arc::new(RateLimiter::new(args.rate_limit, args.rate_window()));

        Self {
            features,
            upstream,
            gate: SessionGate::new(limiter, args.grant_ttl()),
            contact_cooldown: Cooldown::new(args.contact_window()),
            conversations: ConversationStore::new(args.max_turns, args.conversation_idle()),
            visits: VisitRecorder::new(args.visits_path(), args.journal_max_bytes),
            inquiries: Journal::new(args.inquiries_path(), args.journal_max_bytes),
            admin_password: args.admin_password.clone().filter(|p| !p.is_empty()),
            trust_forwarded_for: args.trust_forwarded_for,
        }
    }

    pub fn rate_buckets(&self) -> usize {
        self.gate.limiter().bucket_count() + self.contact_cooldown.len()
    }
}
