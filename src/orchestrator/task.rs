// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Task state: the snapshot type every query and progress report
//! is built from.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Waiting,
    Parsing,
    Translating,
    Assembling,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgress {
    pub translated: u32,
    pub total: u32,
}

/// Orchestrator-owned task state. Mutated only through the
/// orchestrator's mutex-guarded update path; reads are defensive clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: TaskProgress,
    pub output_path: Option<String>,
    pub backup_path: Option<String>,
    pub error: Option<String>,
    pub callback_url: Option<String>,
}

impl Task {
    pub fn new(task_id: String, callback_url: Option<String>) -> Self {
        Self {
            task_id,
            status: TaskStatus::Waiting,
            progress: TaskProgress::default(),
            output_path: None,
            backup_path: None,
            error: None,
            callback_url,
        }
    }
}

/// One unit reported incrementally in a progress callback body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressItem {
    pub record_id: String,
    pub record_type: String,
    pub source_text: String,
    pub target_text: String,
}

/// The body POSTed to `callback_url`: the task snapshot
/// plus an optional incremental `items` list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport<'a> {
    #[serde(flatten)]
    pub task: &'a Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<ProgressItem>>,
}
