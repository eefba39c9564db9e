// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Task orchestrator: owns the task table, runs the
//! parse → cache → translate → write pipeline as a background worker per
//! submission, and reports progress to a caller-supplied callback URL.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{error, warn};

use super::task::{ProgressItem, ProgressReport, Task, TaskProgress, TaskStatus};
use crate::{
    cache::{CacheClient, client::CacheSaveItem},
    codec::{self, StringRecord, tags::split_record_id},
    llm::{BatchTranslateOptions, LlmClient, client::BatchObserver},
    prompt::assembler::GlossaryEntry,
};

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SubmitTranslateRequest {
    pub task_id: String,
    pub file_path: String,
    pub target_lang: String,
    pub custom_prompt: Option<String>,
    pub dictionary_entries: Vec<GlossaryEntry>,
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AssemblyItem {
    pub record_id: String,
    pub target_text: String,
}

#[derive(Debug, Clone)]
pub struct SubmitAssemblyRequest {
    pub task_id: String,
    pub file_path: String,
    pub items: Vec<AssemblyItem>,
    pub callback_url: Option<String>,
}

/// Owns task state and drives the pipeline. Callers share
/// one instance behind an `Arc` — each submission spawns its own
/// `tokio::task` worker against a cloned `Arc<Orchestrator>`.
pub struct Orchestrator {
    tasks: Mutex<HashMap<String, Task>>,
    cache: CacheClient,
    llm: LlmClient,
    callback_http: reqwest::Client,
}

impl Orchestrator {
    pub fn new(cache_base_url: impl Into<String>, llm_base_url: impl Into<String>, llm_api_key: impl Into<String>, llm_model: impl Into<String>) -> Self {
        let callback_http = reqwest::Client::builder()
            .timeout(CALLBACK_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            tasks: Mutex::new(HashMap::new()),
            cache: CacheClient::new(cache_base_url),
            llm: LlmClient::new(llm_base_url, llm_api_key, llm_model),
            callback_http,
        }
    }

    /// Returns a defensive snapshot of the task, or `None` if unknown.
    pub async fn get_task(&self, task_id: &str) -> Option<Task> {
        self.tasks.lock().await.get(task_id).cloned()
    }

    /// Allocates a `waiting` task and spawns the translate pipeline worker
    ///. Returns immediately; the caller never
    /// blocks on pipeline work.
    pub async fn submit_task(self: &Arc<Self>, request: SubmitTranslateRequest) -> String {
        let task_id = request.task_id.clone();
        let task = Task::new(task_id.clone(), request.callback_url.clone());
        self.tasks.lock().await.insert(task_id.clone(), task);

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            run_translate_pipeline(orchestrator, request).await;
        });

        task_id
    }

    /// Allocates a `waiting` task and spawns the assembly-only pipeline
    /// worker: `waiting → assembling →
    /// completed`, skipping parse/cache/translate entirely.
    pub async fn submit_assembly(self: &Arc<Self>, request: SubmitAssemblyRequest) -> String {
        let task_id = request.task_id.clone();
        let task = Task::new(task_id.clone(), request.callback_url.clone());
        self.tasks.lock().await.insert(task_id.clone(), task);

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            run_assembly_pipeline(orchestrator, request).await;
        });

        task_id
    }

    async fn set_status(&self, task_id: &str, status: TaskStatus) {
        let mut tasks = self.tasks.lock().await;
        if let Some(task) = tasks.get_mut(task_id) {
            task.status = status;
        }
    }

    async fn set_progress(&self, task_id: &str, translated: u32, total: u32) {
        let mut tasks = self.tasks.lock().await;
        if let Some(task) = tasks.get_mut(task_id) {
            task.progress = TaskProgress { translated, total };
        }
    }

    async fn fail(&self, task_id: &str, message: String) {
        {
            let mut tasks = self.tasks.lock().await;
            if let Some(task) = tasks.get_mut(task_id) {
                task.status = TaskStatus::Failed;
                task.error = Some(message);
            }
        }
        self.report_progress(task_id, None).await;
    }

    async fn complete(&self, task_id: &str, output_path: String, backup_path: String) {
        {
            let mut tasks = self.tasks.lock().await;
            if let Some(task) = tasks.get_mut(task_id) {
                task.status = TaskStatus::Completed;
                task.output_path = Some(output_path);
                task.backup_path = Some(backup_path);
            }
        }
        self.report_progress(task_id, None).await;
    }

    /// POSTs the current task snapshot (plus optional `items`) to the
    /// task's `callback_url`. Failures are warned, never fatal: a dead
    /// callback never fails the task.
    async fn report_progress(&self, task_id: &str, items: Option<Vec<ProgressItem>>) {
        let snapshot = self.tasks.lock().await.get(task_id).cloned();
        let Some(task) = snapshot else {
            return;
        };
        let Some(url) = task.callback_url.clone() else {
            return;
        };

        let body = ProgressReport { task: &task, items };
        if let Err(e) = self.callback_http.post(&url).json(&body).send().await {
            warn!(task_id, error = %e, "progress callback failed");
        }
    }
}

fn compute_output_paths(file_path: &str) -> (String, String) {
    let path = std::path::Path::new(file_path);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("esm");
    let parent = path.parent().map(|p| p.to_path_buf()).unwrap_or_default();

    let output_path = parent.join(format!("{stem}_translated.{ext}"));
    let backup_path = parent.join(format!("{stem}_backup.{ext}"));
    (output_path.to_string_lossy().into_owned(), backup_path.to_string_lossy().into_owned())
}

fn build_confirmation_items(records: &[StringRecord], translations: &HashMap<String, String>) -> Vec<ProgressItem> {
    records
        .iter()
        .filter_map(|record| {
            let target_text = translations.get(&record.record_id)?;
            let (record_type, _, _) = split_record_id(&record.record_id)?;
            Some(ProgressItem {
                record_id: record.record_id.clone(),
                record_type: record_type.to_string(),
                source_text: record.text.clone(),
                target_text: target_text.clone(),
            })
        })
        .collect()
}

/// Partitions `records` by `(subrecord_tag, text)`:
/// returns the deduplicated list to hand the LLM driver plus
/// `first_id → [all_ids sharing that key]` for fan-out after translation.
fn dedup_records(records: &[&StringRecord]) -> (Vec<StringRecord>, HashMap<String, Vec<String>>) {
    let mut first_by_key: HashMap<(String, String), String> = HashMap::new();
    let mut dedup_map: HashMap<String, Vec<String>> = HashMap::new();
    let mut dedup_list = Vec::new();

    for record in records {
        let sub_type = split_record_id(&record.record_id).map(|(_, _, s)| s.to_string()).unwrap_or_default();
        let key = (sub_type, record.text.clone());

        match first_by_key.get(&key) {
            Some(first_id) => {
                if let Some(ids) = dedup_map.get_mut(first_id) {
                    ids.push(record.record_id.clone());
                }
            },
            None => {
                first_by_key.insert(key, record.record_id.clone());
                dedup_map.insert(record.record_id.clone(), vec![record.record_id.clone()]);
                dedup_list.push((*record).clone());
            },
        }
    }

    (dedup_list, dedup_map)
}

struct TaskBatchObserver {
    orchestrator: Arc<Orchestrator>,
    task_id: String,
    target_lang: String,
    cached_count: u32,
    total: u32,
    dedup_map: HashMap<String, Vec<String>>,
}

#[async_trait]
impl BatchObserver for TaskBatchObserver {
    async fn on_batch_translated(&self, batch_result: &HashMap<String, String>, batch_records: &[StringRecord]) {
        let save_items: Vec<CacheSaveItem<'_>> = batch_records
            .iter()
            .filter_map(|record| {
                batch_result.get(&record.record_id).map(|target_text| CacheSaveItem {
                    record_id: &record.record_id,
                    source_text: &record.text,
                    target_text,
                })
            })
            .collect();
        self.orchestrator.cache.save(&self.task_id, &self.target_lang, &save_items).await;

        let mut items = Vec::new();
        for (first_id, text) in batch_result {
            let Some(record) = batch_records.iter().find(|r| &r.record_id == first_id) else {
                continue;
            };
            let Some((record_type, _, _)) = split_record_id(first_id) else {
                continue;
            };
            for fanned_out_id in self.dedup_map.get(first_id).into_iter().flatten() {
                items.push(ProgressItem {
                    record_id: fanned_out_id.clone(),
                    record_type: record_type.to_string(),
                    source_text: record.text.clone(),
                    target_text: text.clone(),
                });
            }
        }
        self.orchestrator.report_progress(&self.task_id, Some(items)).await;
    }

    async fn on_batch_done(&self, cumulative_translated: usize) {
        self.orchestrator
            .set_progress(&self.task_id, self.cached_count + cumulative_translated as u32, self.total)
            .await;
        self.orchestrator.report_progress(&self.task_id, None).await;
    }
}

async fn run_translate_pipeline(orchestrator: Arc<Orchestrator>, request: SubmitTranslateRequest) {
    let task_id = request.task_id.as_str();

    orchestrator.set_status(task_id, TaskStatus::Parsing).await;
    orchestrator.report_progress(task_id, None).await;

    let original_bytes = match tokio::fs::read(&request.file_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            orchestrator.fail(task_id, format!("failed to read {}: {e}", request.file_path)).await;
            return;
        },
    };

    let records = codec::parse_esm(&original_bytes);
    let total = records.len() as u32;
    orchestrator.set_progress(task_id, 0, total).await;

    if records.is_empty() {
        match write_and_finish(&orchestrator, task_id, &request.file_path, &original_bytes, &HashMap::new()).await {
            Ok(()) => {},
            Err(e) => orchestrator.fail(task_id, e).await,
        }
        return;
    }

    let cached = orchestrator.cache.query(&request.target_lang, &records).await;
    let cached_count = cached.len() as u32;
    orchestrator.set_progress(task_id, cached_count, total).await;
    if !cached.is_empty() {
        let items = build_confirmation_items(&records, &cached);
        orchestrator.report_progress(task_id, Some(items)).await;
    }

    let uncached: Vec<&StringRecord> = records.iter().filter(|r| !cached.contains_key(&r.record_id)).collect();
    let (dedup_list, dedup_map) = dedup_records(&uncached);

    orchestrator.set_status(task_id, TaskStatus::Translating).await;
    orchestrator.report_progress(task_id, None).await;

    let options = BatchTranslateOptions {
        target_lang: request.target_lang.clone(),
        custom_prompt: request.custom_prompt.clone(),
        glossary: request.dictionary_entries.clone(),
        ..Default::default()
    };
    let observer = TaskBatchObserver {
        orchestrator: Arc::clone(&orchestrator),
        task_id: task_id.to_string(),
        target_lang: request.target_lang.clone(),
        cached_count,
        total,
        dedup_map: dedup_map.clone(),
    };

    let llm_results = orchestrator.llm.translate_records(&dedup_list, &options, &observer).await;

    let mut translations = cached;
    for (first_id, text) in llm_results {
        for fanned_out_id in dedup_map.get(&first_id).into_iter().flatten() {
            translations.insert(fanned_out_id.clone(), text.clone());
        }
    }

    orchestrator.set_progress(task_id, translations.len() as u32, total).await;
    orchestrator.set_status(task_id, TaskStatus::Assembling).await;
    orchestrator.report_progress(task_id, None).await;

    match write_and_finish(&orchestrator, task_id, &request.file_path, &original_bytes, &translations).await {
        Ok(()) => {},
        Err(e) => orchestrator.fail(task_id, e).await,
    }
}

async fn run_assembly_pipeline(orchestrator: Arc<Orchestrator>, request: SubmitAssemblyRequest) {
    let task_id = request.task_id.as_str();

    let total = request.items.len() as u32;
    orchestrator.set_progress(task_id, total, total).await;
    orchestrator.set_status(task_id, TaskStatus::Assembling).await;
    orchestrator.report_progress(task_id, None).await;

    let original_bytes = match tokio::fs::read(&request.file_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            orchestrator.fail(task_id, format!("failed to read {}: {e}", request.file_path)).await;
            return;
        },
    };

    let translations: HashMap<String, String> =
        request.items.into_iter().map(|item| (item.record_id, item.target_text)).collect();

    match write_and_finish(&orchestrator, task_id, &request.file_path, &original_bytes, &translations).await {
        Ok(()) => {},
        Err(e) => orchestrator.fail(task_id, e).await,
    }
}

/// Shared tail of both pipelines: derive paths, back up
/// the original, rewrite, and mark the task completed.
async fn write_and_finish(
    orchestrator: &Arc<Orchestrator>,
    task_id: &str,
    file_path: &str,
    original_bytes: &[u8],
    translations: &HashMap<String, String>,
) -> Result<(), String> {
    let (output_path, backup_path) = compute_output_paths(file_path);

    if let Some(parent) = std::path::Path::new(&output_path).parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("failed to create output directory: {e}"))?;
    }

    tokio::fs::copy(file_path, &backup_path)
        .await
        .map_err(|e| format!("failed to write backup {backup_path}: {e}"))?;

    let rewritten = codec::rewrite_esm(original_bytes, translations).map_err(|e| {
        error!(task_id, error = %e, "rewrite failed");
        e.to_string()
    })?;

    tokio::fs::write(&output_path, &rewritten)
        .await
        .map_err(|e| format!("failed to write output {output_path}: {e}"))?;

    orchestrator.complete(task_id, output_path, backup_path).await;
    Ok(())
}
