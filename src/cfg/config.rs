// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::env;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

const DEFAULT_ENGINE_PORT: u16 = 5001;
const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_LLM_BASE_URL: &str = "https://api.deepseek.com/v1";
const DEFAULT_LLM_MODEL: &str = "deepseek-reasoner";
pub(crate) const DEFAULT_LOG_LEVEL: &str = "warn";

/// Process-wide settings, sourced from the environment.
///
/// Construction always goes through [`EngineConfig::load`], which applies
/// defaults for everything but `LLM_API_KEY` and then validates the result,
/// failing fast with a descriptive error if required configuration is
/// missing or malformed.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EngineConfig {
    /// `ENGINE_PORT` — port the HTTP boundary listens on.
    pub engine_port: u16,
    /// `API_BASE_URL` — base URL of the translation cache service.
    pub api_base_url: String,
    /// `LLM_API_KEY` — bearer credential for the chat-completion endpoint.
    pub llm_api_key: String,
    /// `LLM_BASE_URL` — base URL of the OpenAI-compatible chat endpoint.
    pub llm_base_url: String,
    /// `LLM_MODEL` — model name passed on every chat-completion call.
    pub llm_model: String,
    /// `LOG_LEVEL` — default `tracing` filter directive.
    pub log_level: String,
}

impl EngineConfig {
    /// Loads configuration from the process environment and validates it.
    pub fn load() -> Result<Self> {
        let mut cfg = Self {
            engine_port: parse_env_or("ENGINE_PORT", DEFAULT_ENGINE_PORT)?,
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            llm_api_key: env::var("LLM_API_KEY").context("LLM_API_KEY must be set")?,
            llm_base_url: env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_LLM_BASE_URL.to_string()),
            llm_model: env::var("LLM_MODEL")
                .unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
        };
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants, trimming accidental trailing slashes from
    /// URL-shaped fields.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        self.api_base_url = self.api_base_url.trim_end_matches('/').to_string();
        self.llm_base_url = self.llm_base_url.trim_end_matches('/').to_string();

        if self.llm_api_key.trim().is_empty() {
            bail!("LLM_API_KEY must not be empty");
        }
        if self.engine_port == 0 {
            bail!("ENGINE_PORT must be a nonzero u16");
        }
        Ok(())
    }
}

fn parse_env_or(key: &str, default: u16) -> Result<u16> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("failed to parse {key}={raw:?} as u16")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> EngineConfig {
        EngineConfig {
            engine_port: DEFAULT_ENGINE_PORT,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            llm_api_key: "sk-test".to_string(),
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }

    #[test]
    fn trims_trailing_slash_from_base_urls() {
        let mut cfg = base_config();
        cfg.api_base_url = "http://localhost:8080/".to_string();
        cfg.llm_base_url = "https://api.deepseek.com/v1/".to_string();
        cfg.validate_and_normalize()
            .expect("valid config should normalize");
        assert_eq!(cfg.api_base_url, "http://localhost:8080");
        assert_eq!(cfg.llm_base_url, "https://api.deepseek.com/v1");
    }

    #[test]
    fn rejects_empty_api_key() {
        let mut cfg = base_config();
        cfg.llm_api_key = "   ".to_string();
        assert!(cfg.validate_and_normalize().is_err());
    }

    #[test]
    fn rejects_zero_port() {
        let mut cfg = base_config();
        cfg.engine_port = 0;
        assert!(cfg.validate_and_normalize().is_err());
    }
}
