mod admin;
mod contact;
mod feature;
mod health;
mod metrics;

pub use admin::admin_handler;
pub use contact::contact_handler;
pub use feature::{start_handler, stream_handler};
pub use health::health_handler;
pub use metrics::metrics_handler;
