// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Wire DTOs for the boundary adapter: field names mirror the
//! JSON bodies byte-for-byte, independent of the internal `Task`/
//! `Orchestrator` types.

use serde::{Deserialize, Serialize};

use crate::{orchestrator::Task, prompt::assembler::GlossaryEntry};

fn default_target_lang() -> String {
    "zh-CN".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryEntryDto {
    pub source_text: String,
    pub target_text: String,
}

impl From<DictionaryEntryDto> for GlossaryEntry {
    fn from(dto: DictionaryEntryDto) -> Self {
        GlossaryEntry { source: dto.source_text, target: dto.target_text }
    }
}

/// Body of `POST /engine/translate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTranslateDto {
    pub task_id: Option<String>,
    pub file_path: Option<String>,
    #[serde(default = "default_target_lang")]
    pub target_lang: String,
    pub custom_prompt: Option<String>,
    #[serde(default)]
    pub dictionary_entries: Vec<DictionaryEntryDto>,
    pub callback_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyItemDto {
    pub record_id: String,
    pub target_text: String,
}

/// Body of `POST /engine/assembly`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAssemblyDto {
    pub task_id: Option<String>,
    pub file_path: Option<String>,
    #[serde(default)]
    pub items: Vec<AssemblyItemDto>,
    pub callback_url: Option<String>,
}

/// `202 {taskId,status:"accepted"}` response shared by both submit routes.
#[derive(Debug, Serialize)]
pub struct AcceptedDto {
    pub task_id: String,
    pub status: &'static str,
}

impl AcceptedDto {
    pub fn new(task_id: String) -> Self {
        Self { task_id, status: "accepted" }
    }
}

/// Shared error body: `{"error": "MISSING_PARAMS" | "INVALID_REQUEST" | "TASK_NOT_FOUND"}`.
#[derive(Debug, Serialize)]
pub struct ErrorDto {
    pub error: &'static str,
}

impl ErrorDto {
    pub const fn new(code: &'static str) -> Self {
        Self { error: code }
    }
}

/// `GET /engine/tasks/:task_id` success body — the task snapshot verbatim.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct TaskDto(pub Task);
