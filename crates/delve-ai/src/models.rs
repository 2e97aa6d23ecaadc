//! Model registry with a small set of known models and a fallback for custom ids.

use crate::{Api, Model, Provider};

struct ModelEntry {
    id: &'static str,
    name: &'static str,
    provider: Provider,
    context_window: u32,
    max_tokens: u32,
}

const MODEL_ENTRIES: &[ModelEntry] = &[
    ModelEntry {
        id: "gpt-4o-mini",
        name: "GPT-4o mini",
        provider: Provider::OpenAI,
        context_window: 128_000,
        max_tokens: 16_384,
    },
    ModelEntry {
        id: "gpt-4o",
        name: "GPT-4o",
        provider: Provider::OpenAI,
        context_window: 128_000,
        max_tokens: 16_384,
    },
    ModelEntry {
        id: "gpt-4.1-mini",
        name: "GPT-4.1 mini",
        provider: Provider::OpenAI,
        context_window: 1_047_576,
        max_tokens: 32_768,
    },
    ModelEntry {
        id: "gpt-4.1",
        name: "GPT-4.1",
        provider: Provider::OpenAI,
        context_window: 1_047_576,
        max_tokens: 32_768,
    },
    ModelEntry {
        id: "claude-sonnet-4-5-20250929",
        name: "Claude Sonnet 4.5",
        provider: Provider::Anthropic,
        context_window: 200_000,
        max_tokens: 64_000,
    },
    ModelEntry {
        id: "claude-haiku-4-5-20251001",
        name: "Claude Haiku 4.5",
        provider: Provider::Anthropic,
        context_window: 200_000,
        max_tokens: 64_000,
    },
    ModelEntry {
        id: "llama-3.3-70b-versatile",
        name: "Llama 3.3 70B",
        provider: Provider::Groq,
        context_window: 131_072,
        max_tokens: 32_768,
    },
];

impl ModelEntry {
    fn to_model(&self) -> Model {
        let (api, base_url) = self.provider.default_endpoint();
        Model {
            id: self.id.to_string(),
            name: self.name.to_string(),
            api,
            provider: self.provider,
            base_url: base_url.to_string(),
            context_window: self.context_window,
            max_tokens: self.max_tokens,
            headers: Default::default(),
        }
    }
}

/// Look up a model by provider and ID.
pub fn get_model(provider: Provider, id: &str) -> Option<Model> {
    MODEL_ENTRIES
        .iter()
        .find(|e| e.id == id && e.provider == provider)
        .map(|e| e.to_model())
}

/// Look up a model by ID only (first match across all providers).
pub fn get_model_by_id(id: &str) -> Option<Model> {
    MODEL_ENTRIES
        .iter()
        .find(|e| e.id == id)
        .map(|e| e.to_model())
}

/// Get all models for a specific provider.
pub fn get_models(provider: Provider) -> Vec<Model> {
    MODEL_ENTRIES
        .iter()
        .filter(|e| e.provider == provider)
        .map(|e| e.to_model())
        .collect()
}

/// Resolve a model for `provider`, constructing one for ids the registry
/// does not know (new releases, local Ollama tags, proxies).
pub fn resolve(provider: Provider, id: &str) -> Model {
    if let Some(model) = get_model(provider, id) {
        return model;
    }

    let (api, base_url) = provider.default_endpoint();
    Model {
        id: id.to_string(),
        name: id.to_string(),
        api,
        provider,
        base_url: base_url.to_string(),
        context_window: 128_000,
        max_tokens: 8192,
        headers: Default::default(),
    }
}
