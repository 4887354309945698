// Feature catalog - personas served under /{feature}/..., loaded from JSON

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::models::{ChatCompletionRequest, ChatMessage};
use crate::relay::{Credential, Framing, UpstreamRequest};

const EMPTY_SEED: &str = "none";
const DEFAULT_UNAUTHORIZED: &str =
    "Not authorized: submit a seed first, or wait for the next hour's quota.";

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureConfig {
    pub name: String,
    pub endpoint: String,
    pub model: String,
    #[serde(default)]
    pub credential_env: Option<String>,
    pub system_prompt: String,
    #[serde(default)]
    pub user_prompt: Option<String>,
    #[serde(default)]
    pub framing: Framing,
    pub trailer: String,
    #[serde(default)]
    pub unauthorized: Option<String>,
    #[serde(default)]
    pub history: bool,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    features: Vec<FeatureConfig>,
}

#[derive(Debug)]
pub struct Feature {
    config: FeatureConfig,
    credential: Credential,
}

impl Feature {
    pub fn new(config: FeatureConfig, credential: Credential) -> Self {
        Self { config, credential }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn framing(&self) -> Framing {
        self.config.framing
    }

    pub fn keeps_history(&self) -> bool {
        self.config.history
    }

    pub fn unauthorized_message(&self) -> &str {
        self.config
            .unauthorized
            .as_deref()
            .unwrap_or(DEFAULT_UNAUTHORIZED)
    }

    pub fn render_trailer(&self, seed: &str) -> String {
        render(&self.config.trailer, seed)
    }

    pub fn user_message(&self, seed: &str) -> Option<ChatMessage> {
        match &self.config.user_prompt {
            Some(template) => Some(ChatMessage::user(render(template, seed))),
            None if seed.trim().is_empty() => None,
            None => Some(ChatMessage::user(seed.trim())),
        }
    }

    // system prompt, prior turns, new user turn
    pub fn build_messages(&self, seed: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(render(&self.config.system_prompt, seed)));
        messages.extend_from_slice(history);
        messages.extend(self.user_message(seed));
        messages
    }

    pub fn upstream_request(&self, messages: Vec<ChatMessage>) -> UpstreamRequest {
        UpstreamRequest {
            endpoint: self.config.endpoint.clone(),
            credential: self.credential.clone(),
            headers: self
                .config
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            body: ChatCompletionRequest {
                model: self.config.model.clone(),
                messages,
                stream: true,
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            },
        }
    }
}

fn render(template: &str, seed: &str) -> String {
    let seed = match seed.trim() {
        "" => EMPTY_SEED,
        trimmed => trimmed,
    };
    template.replace("{seed}", seed)
}

pub struct FeatureCatalog {
    features: HashMap<String, Arc<Feature>>,
}

impl FeatureCatalog {
    // credentials come from the process environment
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let file: CatalogFile = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_configs(file.features, |name| std::env::var(name).ok())
    }

    pub fn from_configs<F>(configs: Vec<FeatureConfig>, resolve: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if configs.is_empty() {
            return Err(ConfigError::Empty);
        }

        let mut features = HashMap::new();
        for config in configs {
            let credential = match &config.credential_env {
                None => Credential::None,
                Some(var) => match resolve(var).filter(|v| !v.trim().is_empty()) {
                    Some(key) => Credential::Bearer(key),
                    None => {
                        warn!(feature = %config.name, env = %var, "Credential not set, streams will fail");
                        Credential::Missing(var.clone())
                    }
                },
            };

            let name = config.name.clone();
            info!(
                feature = %name,
                model = %config.model,
                endpoint = %config.endpoint,
                framing = ?config.framing,
                "Feature loaded"
            );
            if features
                .insert(name.clone(), Arc::new(Feature::new(config, credential)))
                .is_some()
            {
                return Err(ConfigError::Duplicate(name));
            }
        }

        Ok(Self { features })
    }

    pub fn get(&self, name: &str) -> Option<Arc<Feature>> {
        self.features.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.features.keys().cloned().collect();
        names.sort();
        names
    }
}
