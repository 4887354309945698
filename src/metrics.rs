use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref START_REQUESTS: Counter =
        register_counter!("seed_gateway_start_requests_total", "Total /start requests").unwrap();
    pub static ref RATE_LIMITED: Counter =
        register_counter!("seed_gateway_rate_limited_total", "Requests rejected over quota").unwrap();
    pub static ref UNAUTHORIZED_STREAMS: Counter =
        register_counter!("seed_gateway_unauthorized_streams_total", "Streams opened without a grant").unwrap();
    pub static ref RELAY_COMPLETED: Counter =
        register_counter!("seed_gateway_relay_completed_total", "Relays that reached the end of the upstream stream").unwrap();
    pub static ref RELAY_FAILED: Counter =
        register_counter!("seed_gateway_relay_failed_total", "Relays ended by an upstream error or client disconnect").unwrap();
    pub static ref SKIPPED_FRAMES: Counter =
        register_counter!("seed_gateway_skipped_frames_total", "Malformed upstream frames skipped").unwrap();
    pub static ref JOURNAL_FAILURES: Counter =
        register_counter!("seed_gateway_journal_failures_total", "Failed journal writes").unwrap();
    pub static ref ACTIVE_STREAMS: Gauge =
        register_gauge!("seed_gateway_active_streams", "Relays currently running").unwrap();
    pub static ref RATE_BUCKETS: Gauge =
        register_gauge!("seed_gateway_rate_buckets", "Live rate limit buckets").unwrap();
    pub static ref STREAM_LATENCY: Histogram = register_histogram!(
        "seed_gateway_stream_seconds",
        "Relay duration in seconds"
    )
    .unwrap();
}
