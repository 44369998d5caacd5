//! Inference engine integration.
//!
//! The harness talks to a text-generation backend through two seams:
//!
//! - [`EngineLoader`] turns a model identifier into a loaded engine handle.
//!   It is called once per process; loading is the dominant cost.
//! - [`InferenceEngine`] generates a completion for one prompt. `generate`
//!   takes `&mut self` because a loaded model is a single non-reentrant
//!   resource: calls are issued one at a time and each is awaited to
//!   completion before the next begins.
//!
//! [`litellm`] provides an adapter over OpenAI-compatible chat-completion
//! endpoints (LiteLLM proxies, vLLM, OpenRouter, ...).
//!
//! ```ignore
//! use smiles_eval::llm::{EngineLoader, LiteLlmLoader};
//!
//! let loader = LiteLlmLoader::from_env()?;
//! let mut engine = loader.load("Qwen/Qwen2.5-7B-Instruct").await?;
//! let answer = engine.generate("How many aromatic rings ...").await?;
//! ```

pub mod litellm;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

pub use litellm::{LiteLlmClient, LiteLlmLoader, Message, RATE_LIMIT_DELAYS};

/// Sampling parameters applied to every generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Maximum number of new tokens per call.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.1,
        }
    }
}

/// A loaded, stateful text-generation handle.
#[async_trait]
pub trait InferenceEngine: Send {
    /// Identifier of the model behind this handle.
    fn model_id(&self) -> &str;

    /// Generate a response for a single user prompt.
    async fn generate(&mut self, prompt: &str) -> Result<String, InferenceError>;
}

/// Loads an [`InferenceEngine`] for a model identifier.
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn load(&self, model_id: &str) -> Result<Box<dyn InferenceEngine>, InferenceError>;
}

/// Engine wrapper that counts generation calls.
pub struct MeteredEngine {
    inner: Box<dyn InferenceEngine>,
    calls: Arc<AtomicUsize>,
}

impl MeteredEngine {
    pub fn new(inner: Box<dyn InferenceEngine>, calls: Arc<AtomicUsize>) -> Self {
        Self { inner, calls }
    }

    /// Calls issued so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl InferenceEngine for MeteredEngine {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    async fn generate(&mut self, prompt: &str) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.generate(prompt).await
    }
}
