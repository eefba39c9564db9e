// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! End-to-end orchestrator coverage: deduplicated records share one LLM
//! call, and an all-cache-hit file never reaches the LLM at all.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use esm_translate_engine::orchestrator::{Orchestrator, SubmitTranslateRequest, TaskStatus};
use serde_json::json;
use tempfile::tempdir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn record_header(tag: &[u8; 4], data_size: u32, form_id: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(24);
    bytes.extend_from_slice(tag);
    bytes.extend_from_slice(&data_size.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&form_id.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes
}

fn subrecord(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(6 + payload.len());
    bytes.extend_from_slice(tag);
    bytes.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

/// Three records: two `WEAP`/`FULL` records share the exact text "Sword",
/// one `ARMO`/`FULL` record has distinct text "Shield".
fn sample_esm_with_duplicate() -> Vec<u8> {
    let full_sword = subrecord(b"FULL", b"Sword\0");
    let full_shield = subrecord(b"FULL", b"Shield\0");

    let mut weap_a = record_header(b"WEAP", full_sword.len() as u32, 0x0000_0001);
    weap_a.extend_from_slice(&full_sword);
    let mut weap_b = record_header(b"WEAP", full_sword.len() as u32, 0x0000_0002);
    weap_b.extend_from_slice(&full_sword);
    let mut armo = record_header(b"ARMO", full_shield.len() as u32, 0x0000_0003);
    armo.extend_from_slice(&full_shield);

    let inner_len = weap_a.len() + weap_b.len() + armo.len();
    let group_size = (24 + inner_len) as u32;
    let mut group = Vec::with_capacity(group_size as usize);
    group.extend_from_slice(b"GRUP");
    group.extend_from_slice(&group_size.to_le_bytes());
    group.extend_from_slice(b"WEAP");
    group.extend_from_slice(&0u32.to_le_bytes());
    group.extend_from_slice(&0u32.to_le_bytes());
    group.extend_from_slice(&0u32.to_le_bytes());
    group.extend_from_slice(&weap_a);
    group.extend_from_slice(&weap_b);
    group.extend_from_slice(&armo);

    let mut file = record_header(b"TES4", 0, 0);
    file.extend_from_slice(&group);
    file
}

async fn write_sample_file() -> (tempfile::TempDir, String) {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("plugin.esm");
    tokio::fs::write(&path, sample_esm_with_duplicate()).await.expect("write fixture");
    let path_str = path.to_string_lossy().into_owned();
    (dir, path_str)
}

async fn wait_for_terminal(orchestrator: &Arc<Orchestrator>, task_id: &str) -> esm_translate_engine::orchestrator::Task {
    for _ in 0..100 {
        if let Some(task) = orchestrator.get_task(task_id).await {
            if matches!(task.status, TaskStatus::Completed | TaskStatus::Failed) {
                return task;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("task {task_id} never reached a terminal state");
}

/// Two records with the same `(subrecord_tag, source_text)` collapse into
/// one LLM line, so the model only ever sees the two distinct source
/// strings even though three records are translated.
#[tokio::test]
async fn dedup_records_share_one_llm_translation() {
    let cache_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/translation-cache/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&cache_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/translation-cache/save"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&cache_server)
        .await;

    let seen_bodies: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_bodies_for_mock = Arc::clone(&seen_bodies);

    let llm_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(move |req: &wiremock::Request| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).expect("valid json body");
            let user_content = body["messages"][1]["content"].as_str().unwrap_or_default().to_string();
            seen_bodies_for_mock.lock().expect("lock").push(user_content);
            ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "[1] 剑\n[2] 盾"}}]
            }))
        })
        .mount(&llm_server)
        .await;

    let (_dir, file_path) = write_sample_file().await;
    let orchestrator =
        Arc::new(Orchestrator::new(cache_server.uri(), llm_server.uri(), "key", "test-model"));

    let task_id = orchestrator
        .submit_task(SubmitTranslateRequest {
            task_id: "dedup-task".to_string(),
            file_path,
            target_lang: "zh-CN".to_string(),
            custom_prompt: None,
            dictionary_entries: Vec::new(),
            callback_url: None,
        })
        .await;

    let task = wait_for_terminal(&orchestrator, &task_id).await;
    assert_eq!(task.status, TaskStatus::Completed);

    let bodies = seen_bodies.lock().expect("lock");
    assert_eq!(bodies.len(), 1, "dedup must fit in a single LLM batch call");
    assert!(bodies[0].contains("[1]"));
    assert!(bodies[0].contains("[2]"));
    assert!(!bodies[0].contains("[3]"), "deduplicated record must not reappear as a third prompt line");
}

/// When every extracted string is already cached, the LLM endpoint is
/// never called.
#[tokio::test]
async fn all_cache_hits_never_call_the_llm() {
    let cache_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/translation-cache/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"recordId": "WEAP:00000001:FULL", "hit": true, "targetText": "剑"},
                {"recordId": "WEAP:00000002:FULL", "hit": true, "targetText": "剑"},
                {"recordId": "ARMO:00000003:FULL", "hit": true, "targetText": "盾"},
            ]
        })))
        .mount(&cache_server)
        .await;

    let llm_server = MockServer::start().await;
    // No `/chat/completions` mock is mounted; any request this server
    // receives is unmatched, proving the driver was never invoked.

    let (_dir, file_path) = write_sample_file().await;
    let orchestrator =
        Arc::new(Orchestrator::new(cache_server.uri(), llm_server.uri(), "key", "test-model"));

    let task_id = orchestrator
        .submit_task(SubmitTranslateRequest {
            task_id: "all-cached-task".to_string(),
            file_path,
            target_lang: "zh-CN".to_string(),
            custom_prompt: None,
            dictionary_entries: Vec::new(),
            callback_url: None,
        })
        .await;

    let task = wait_for_terminal(&orchestrator, &task_id).await;
    assert_eq!(task.status, TaskStatus::Completed);
    assert!(llm_server.received_requests().await.expect("mock server tracks requests").is_empty());
}
