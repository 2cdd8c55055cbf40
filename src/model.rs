//! # LLM Client Module
//!
//! Provides the completion model used for structured extraction, with built-in
//! rate limiting to prevent API quota exhaustion.
//!
//! ## Key Components
//!
//! - `Client`: wraps a rate-limited completion model
//! - `RateLimitedCompletionModel`: adds rate limiting to any completion model
//! - `MockCompletionModel`: scripted model for tests
//!
//! ## Features
//!
//! - Configurable rate limiting with different quotas (standard and free tiers)
//! - Environment variable configuration for API keys
//! - Instrumentation with tracing spans for monitoring

use std::num::NonZeroU32;

use governor::{Quota, RateLimiter};
use ratelimited_completion::RateLimitedCompletionModel;
use rig::{completion::CompletionModel, providers::gemini};

use crate::error::{Error, Result};
use crate::extract::LlmExtractor;

pub mod mock_model;
pub mod ratelimited_completion;

/// Environment variable holding the Gemini API key
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable holding a free-tier Gemini API key
pub const GEMINI_FREE_API_KEY_ENV: &str = "GEMINI_FREE_API_KEY";

const STANDARD_COMPLETIONS_PER_MINUTE: u32 = 2000;
const FREE_COMPLETIONS_PER_MINUTE: u32 = 30;

/// The rate-limited Gemini model used by the env constructors
pub type GeminiCompletionModel = RateLimitedCompletionModel<gemini::completion::CompletionModel>;

#[derive(Debug, Clone)]
pub struct Client<C>
where
    C: CompletionModel,
{
    completion_model: C,
}

/// Raw provider response passed through the rate limiter
pub struct RateLimitResponse<T> {
    pub response: T,
}

fn api_key(var: &str) -> Result<String> {
    std::env::var(var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| Error::Config(format!("{} environment variable must be set", var)))
}

fn quota(per_minute: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN))
}

impl Client<GeminiCompletionModel> {
    /// Build a standard-tier client from `GEMINI_API_KEY`
    pub fn new_gemini_from_env() -> Result<Self> {
        let gemini_client = gemini::Client::new(&api_key(GEMINI_API_KEY_ENV)?);
        Ok(Self::new_gemini(gemini_client))
    }

    /// Build a free-tier client from `GEMINI_FREE_API_KEY`
    pub fn new_gemini_free_from_env() -> Result<Self> {
        let gemini_client = gemini::Client::new(&api_key(GEMINI_FREE_API_KEY_ENV)?);
        Ok(Self::new_gemini_free(gemini_client))
    }

    pub fn new_gemini(gemini_client: gemini::Client) -> Self {
        let completion_limiter = RateLimiter::direct(quota(STANDARD_COMPLETIONS_PER_MINUTE));
        let completion_model = RateLimitedCompletionModel::new(
            gemini_client.completion_model("gemini-2.0-flash"),
            completion_limiter,
        );
        Self { completion_model }
    }

    pub fn new_gemini_free(gemini_client: gemini::Client) -> Self {
        let completion_limiter = RateLimiter::direct(quota(FREE_COMPLETIONS_PER_MINUTE));
        let completion_model = RateLimitedCompletionModel::new(
            gemini_client.completion_model("gemini-2.0-flash-lite"),
            completion_limiter,
        );
        Self { completion_model }
    }
}

impl<C> Client<C>
where
    C: CompletionModel,
{
    /// Wrap an arbitrary completion model
    pub fn new(completion_model: C) -> Self {
        Self { completion_model }
    }

    /// A structured extractor backed by this client's model
    pub fn extractor(&self) -> LlmExtractor<C>
    where
        C: Send + Sync + 'static,
    {
        LlmExtractor::new(self.completion_model.clone())
    }
}
