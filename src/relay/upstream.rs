use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use futures::stream::BoxStream;
use std::time::Duration;
use tracing::debug;

use crate::error::RelayError;
use crate::models::ChatCompletionRequest;

pub type ByteStream = BoxStream<'static, Result<Bytes, RelayError>>;

#[derive(Debug, Clone)]
pub enum Credential {
    None,
    Bearer(String),
    // env var name that was not set
    Missing(String),
}

#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub endpoint: String,
    pub credential: Credential,
    pub headers: Vec<(String, String)>,
    pub body: ChatCompletionRequest,
}

#[async_trait]
pub trait Upstream: Send + Sync {
    async fn open(&self, request: UpstreamRequest) -> Result<ByteStream, RelayError>;
}

// OpenAI-compatible chat completions over HTTP
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    // `read_timeout` bounds each wait for bytes, not the whole stream
    pub fn new(read_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(read_timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn open(&self, request: UpstreamRequest) -> Result<ByteStream, RelayError> {
        let mut req = self
            .client
            .post(&request.endpoint)
            .header("Content-Type", "application/json");

        match request.credential {
            Credential::None => {}
            Credential::Bearer(ref key) => {
                req = req.header("Authorization", format!("Bearer {}", key));
            }
            Credential::Missing(name) => return Err(RelayError::MissingCredential(name)),
        }
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        debug!(
            endpoint = %request.endpoint,
            model = %request.body.model,
            "Opening upstream stream"
        );

        let response = req.json(&request.body).send().await.map_err(|e| {
            if e.is_timeout() {
                RelayError::Timeout
            } else {
                RelayError::Connect(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status(status.as_u16()));
        }

        Ok(Box::pin(response.bytes_stream().map_err(RelayError::from)))
    }
}
