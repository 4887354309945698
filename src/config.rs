use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

// CLI argument structure; every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "seed-gateway")]
#[command(about = "Rate-limited streaming relay for chat completion APIs")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    // Feature catalog (JSON)
    #[arg(long, env = "SEED_GATEWAY_FEATURES", default_value = "config/features.json")]
    pub features: PathBuf,

    // Directory holding visits.jsonl and inquiries.jsonl
    #[arg(long, env = "SEED_GATEWAY_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    // Stream authorizations allowed per identity per window
    #[arg(long, env = "SEED_GATEWAY_RATE_LIMIT", default_value_t = 8)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "SEED_GATEWAY_RATE_WINDOW", default_value_t = 3600)]
    pub rate_window: u64,

    // Minimum seconds between contact submissions from one identity
    #[arg(long, default_value_t = 60)]
    pub contact_window: u64,

    // Expired bucket / grant sweep interval in seconds
    #[arg(long, default_value_t = 3600)]
    pub sweep_interval: u64,

    // Seconds a /start grant stays valid
    #[arg(long, default_value_t = 600)]
    pub grant_ttl: u64,

    // Seconds the upstream may stay silent before the relay gives up
    #[arg(long, env = "SEED_GATEWAY_UPSTREAM_TIMEOUT", default_value_t = 180)]
    pub upstream_timeout: u64,

    // Chat messages remembered per session
    #[arg(long, default_value_t = 6)]
    pub max_turns: usize,

    // Seconds before an idle conversation is forgotten
    #[arg(long, default_value_t = 86_400)]
    pub conversation_idle: u64,

    // Journal size that triggers rotation
    #[arg(long, default_value_t = 1024 * 1024)]
    pub journal_max_bytes: u64,

    // Take the client address from X-Forwarded-For (behind a proxy)
    #[arg(long, env = "SEED_GATEWAY_TRUST_FORWARDED_FOR")]
    pub trust_forwarded_for: bool,

    // Admin view password; admin is locked when unset
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,
}

impl Args {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    pub fn contact_window(&self) -> Duration {
        Duration::from_secs(self.contact_window)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval.max(1))
    }

    pub fn grant_ttl(&self) -> Duration {
        Duration::from_secs(self.grant_ttl)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }

    pub fn conversation_idle(&self) -> Duration {
        Duration::from_secs(self.conversation_idle)
    }

    pub fn visits_path(&self) -> PathBuf {
        self.data_dir.join("visits.jsonl")
    }

    pub fn inquiries_path(&self) -> PathBuf {
        self.data_dir.join("inquiries.jsonl")
    }
}
