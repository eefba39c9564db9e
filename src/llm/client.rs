// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! LLM batch driver.
//!
//! Speaks the OpenAI-compatible `/chat/completions` wire protocol directly
//! over `reqwest`, targeting the same DeepSeek-compatible chat-completion
//! surface a Python `openai`-client-based driver would.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::{
    codec::StringRecord,
    prompt::{
        assembler::{GlossaryEntry, assemble_prompt},
        mask::unmask_tags,
        reply::parse_reply,
    },
};

/// At most this many total attempts per batch.
const MAX_ATTEMPTS: usize = 3;
/// Delay before attempt `i + 2` is `RETRY_DELAYS[i]`; only the first
/// `MAX_ATTEMPTS - 1` entries are ever consulted.
const RETRY_DELAYS: [Duration; 3] =
    [Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)];

/// Default batch size.
pub const DEFAULT_BATCH_SIZE: usize = 20;

#[derive(Debug, Clone)]
pub struct BatchTranslateOptions {
    pub target_lang: String,
    pub custom_prompt: Option<String>,
    pub glossary: Vec<GlossaryEntry>,
    pub batch_size: usize,
}

impl Default for BatchTranslateOptions {
    fn default() -> Self {
        Self {
            target_lang: "zh-CN".to_string(),
            custom_prompt: None,
            glossary: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// The two narrow capabilities the driver reports through:
/// persisting a successful batch and tracking cumulative progress. The
/// driver itself holds no task state — the orchestrator supplies the
/// implementation.
#[async_trait]
pub trait BatchObserver: Send + Sync {
    async fn on_batch_translated(&self, batch_result: &HashMap<String, String>, batch_records: &[StringRecord]);
    async fn on_batch_done(&self, cumulative_translated: usize);
}

/// An observer that does nothing, for callers that don't need progress
/// reporting (tests, ad hoc one-off translation runs).
pub struct NoopObserver;

#[async_trait]
impl BatchObserver for NoopObserver {
    async fn on_batch_translated(&self, _batch_result: &HashMap<String, String>, _batch_records: &[StringRecord]) {}

    async fn on_batch_done(&self, _cumulative_translated: usize) {}
}

#[derive(Debug, thiserror::Error)]
enum LlmCallError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("model returned status {0}")]
    Status(u16),
    #[error("model response contained no choices")]
    EmptyChoices,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// Client for an OpenAI-compatible chat-completion endpoint.
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Runs the full batch pipeline over `records`, reporting
    /// through `observer` and never propagating a batch failure — a batch
    /// that exhausts its retries simply contributes no entries.
    pub async fn translate_records(
        &self,
        records: &[StringRecord],
        options: &BatchTranslateOptions,
        observer: &dyn BatchObserver,
    ) -> HashMap<String, String> {
        let mut translations = HashMap::new();
        let mut cumulative = 0usize;
        let batch_size = options.batch_size.max(1);

        for batch in records.chunks(batch_size) {
            let batch_result = self.translate_batch(batch, options).await;

            if !batch_result.is_empty() {
                observer.on_batch_translated(&batch_result, batch).await;
            }
            cumulative += batch_result.len();
            translations.extend(batch_result);
            observer.on_batch_done(cumulative).await;
        }

        translations
    }

    async fn translate_batch(
        &self,
        batch: &[StringRecord],
        options: &BatchTranslateOptions,
    ) -> HashMap<String, String> {
        let sources: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();
        let assembled = assemble_prompt(&sources, options.custom_prompt.as_deref(), &options.glossary);
        let system_prompt = format!(
            "You are a professional game localization translator. Translate the text to {}.",
            options.target_lang
        );

        match self.call_with_retry(&assembled.prompt, &system_prompt).await {
            Ok(reply) => {
                let parsed = parse_reply(&reply, &sources);
                let mut map = HashMap::with_capacity(batch.len());
                for (index, record) in batch.iter().enumerate() {
                    if let Some(text) = parsed.get(&index) {
                        let unmasked = unmask_tags(text, &assembled.masks[index].placeholders);
                        map.insert(record.record_id.clone(), unmasked);
                    }
                }
                map
            },
            Err(e) => {
                warn!(error = %e, batch_len = batch.len(), "LLM batch exhausted retries; dropping batch");
                HashMap::new()
            },
        }
    }

    async fn call_with_retry(&self, prompt: &str, system_prompt: &str) -> Result<String, LlmCallError> {
        let mut last_err = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(RETRY_DELAYS[attempt - 1]).await;
            }
            match self.call_once(prompt, system_prompt).await {
                Ok(reply) => return Ok(reply),
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "LLM call attempt failed");
                    last_err = Some(e);
                },
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => unreachable!("MAX_ATTEMPTS is nonzero, so the loop runs at least once"),
        }
    }

    async fn call_once(&self, prompt: &str, system_prompt: &str) -> Result<String, LlmCallError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": prompt},
            ],
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmCallError::Status(status.as_u16()));
        }

        let payload: ChatCompletionResponse = response.json().await?;
        payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(LlmCallError::EmptyChoices)
    }
}
