// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Cache client: `query`/`save` against the translation-cache
//! HTTP service. Every failure mode is swallowed — a network error or a
//! non-2xx response degrades to "no cache hit" / "save discarded", logged
//! as a warning, never surfaced to the caller.

use std::{collections::HashMap, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::codec::{StringRecord, tags::split_record_id};

const QUERY_PATH: &str = "/api/translation-cache/query";
const SAVE_PATH: &str = "/api/translation-cache/save";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One pending translation, ready to persist to the cache.
pub struct CacheSaveItem<'a> {
    pub record_id: &'a str,
    pub source_text: &'a str,
    pub target_text: &'a str,
}

#[derive(Serialize)]
struct QueryItem<'a> {
    #[serde(rename = "recordId")]
    record_id: &'a str,
    #[serde(rename = "recordType")]
    record_type: &'a str,
    #[serde(rename = "subrecordType")]
    subrecord_type: &'a str,
    #[serde(rename = "sourceText")]
    source_text: &'a str,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    #[serde(rename = "targetLang")]
    target_lang: &'a str,
    items: Vec<QueryItem<'a>>,
}

#[derive(Deserialize)]
struct QueryResponseItem {
    #[serde(rename = "recordId")]
    record_id: String,
    hit: bool,
    #[serde(rename = "targetText", default)]
    target_text: Option<String>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    items: Vec<QueryResponseItem>,
}

#[derive(Serialize)]
struct SaveItem<'a> {
    #[serde(rename = "recordType")]
    record_type: &'a str,
    #[serde(rename = "subrecordType")]
    subrecord_type: &'a str,
    #[serde(rename = "sourceText")]
    source_text: &'a str,
    #[serde(rename = "targetText")]
    target_text: &'a str,
}

#[derive(Serialize)]
struct SaveRequest<'a> {
    #[serde(rename = "taskId")]
    task_id: &'a str,
    #[serde(rename = "targetLang")]
    target_lang: &'a str,
    items: Vec<SaveItem<'a>>,
}

/// HTTP client for the translation cache service.
pub struct CacheClient {
    http: reqwest::Client,
    base_url: String,
}

impl CacheClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, base_url: base_url.into() }
    }

    /// Queries the cache for every record, returning `record_id → target_text`
    /// for hits only. Any failure yields an empty map.
    pub async fn query(&self, target_lang: &str, records: &[StringRecord]) -> HashMap<String, String> {
        let items: Vec<QueryItem<'_>> = records
            .iter()
            .filter_map(|r| {
                let (record_type, _, subrecord_type) = split_record_id(&r.record_id)?;
                Some(QueryItem {
                    record_id: &r.record_id,
                    record_type,
                    subrecord_type,
                    source_text: &r.text,
                })
            })
            .collect();

        if items.is_empty() {
            return HashMap::new();
        }

        let request = QueryRequest { target_lang, items };
        let url = format!("{}{QUERY_PATH}", self.base_url);

        let response = match self.http.post(&url).json(&request).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "cache query request failed; treating as all-miss");
                return HashMap::new();
            },
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "cache query returned non-success status; treating as all-miss");
            return HashMap::new();
        }

        match response.json::<QueryResponse>().await {
            Ok(parsed) => parsed
                .items
                .into_iter()
                .filter(|item| item.hit)
                .filter_map(|item| item.target_text.map(|text| (item.record_id, text)))
                .collect(),
            Err(e) => {
                warn!(error = %e, "cache query response was not valid JSON; treating as all-miss");
                HashMap::new()
            },
        }
    }

    /// Persists a batch of translations. Failures are logged and discarded.
    pub async fn save(&self, task_id: &str, target_lang: &str, items: &[CacheSaveItem<'_>]) {
        if items.is_empty() {
            return;
        }

        let save_items: Vec<SaveItem<'_>> = items
            .iter()
            .filter_map(|item| {
                let (record_type, _, subrecord_type) = split_record_id(item.record_id)?;
                Some(SaveItem {
                    record_type,
                    subrecord_type,
                    source_text: item.source_text,
                    target_text: item.target_text,
                })
            })
            .collect();

        let request = SaveRequest { task_id, target_lang, items: save_items };
        let url = format!("{}{SAVE_PATH}", self.base_url);

        match self.http.post(&url).json(&request).send().await {
            Ok(response) if !response.status().is_success() => {
                warn!(status = %response.status(), "cache save returned non-success status; discarding");
            },
            Err(e) => {
                warn!(error = %e, "cache save request failed; discarding");
            },
            Ok(_) => {},
        }
    }
}
