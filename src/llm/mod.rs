//! LLM batch driver: partitions records into batches, masks
//! tags, assembles prompts, calls the chat-completion endpoint with
//! retry/backoff, and unmasks the reply.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod client;

pub use client::{BatchTranslateOptions, LlmClient};
