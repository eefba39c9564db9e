// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Boundary adapter: a thin `axum` router translating HTTP
//! requests into `Orchestrator` calls. Holds no state of its own.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use super::dto::{
    AcceptedDto, AssemblyItemDto, ErrorDto, SubmitAssemblyDto, SubmitTranslateDto, TaskDto,
};
use crate::orchestrator::{AssemblyItem, Orchestrator, SubmitAssemblyRequest, SubmitTranslateRequest};

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/engine/translate", post(submit_translate))
        .route("/engine/tasks/:task_id", get(get_task))
        .route("/engine/assembly", post(submit_assembly))
        .with_state(orchestrator)
}

fn missing_params() -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorDto::new("MISSING_PARAMS"))).into_response()
}

async fn submit_translate(
    State(orchestrator): State<Arc<Orchestrator>>,
    body: Result<Json<SubmitTranslateDto>, axum::extract::rejection::JsonRejection>,
) -> Response {
    let Json(dto) = match body {
        Ok(json) => json,
        Err(_) => return (StatusCode::BAD_REQUEST, Json(ErrorDto::new("INVALID_REQUEST"))).into_response(),
    };

    let (Some(task_id), Some(file_path)) = (dto.task_id, dto.file_path) else {
        return missing_params();
    };

    let request = SubmitTranslateRequest {
        task_id,
        file_path,
        target_lang: dto.target_lang,
        custom_prompt: dto.custom_prompt,
        dictionary_entries: dto.dictionary_entries.into_iter().map(Into::into).collect(),
        callback_url: dto.callback_url,
    };

    let task_id = orchestrator.submit_task(request).await;
    (StatusCode::ACCEPTED, Json(AcceptedDto::new(task_id))).into_response()
}

async fn submit_assembly(
    State(orchestrator): State<Arc<Orchestrator>>,
    body: Result<Json<SubmitAssemblyDto>, axum::extract::rejection::JsonRejection>,
) -> Response {
    let Json(dto) = match body {
        Ok(json) => json,
        Err(_) => return (StatusCode::BAD_REQUEST, Json(ErrorDto::new("INVALID_REQUEST"))).into_response(),
    };

    let (Some(task_id), Some(file_path)) = (dto.task_id, dto.file_path) else {
        return missing_params();
    };

    let items: Vec<AssemblyItem> = dto
        .items
        .into_iter()
        .map(|item: AssemblyItemDto| AssemblyItem { record_id: item.record_id, target_text: item.target_text })
        .collect();

    let request = SubmitAssemblyRequest { task_id, file_path, items, callback_url: dto.callback_url };

    let task_id = orchestrator.submit_assembly(request).await;
    (StatusCode::ACCEPTED, Json(AcceptedDto::new(task_id))).into_response()
}

async fn get_task(State(orchestrator): State<Arc<Orchestrator>>, Path(task_id): Path<String>) -> Response {
    match orchestrator.get_task(&task_id).await {
        Some(task) => (StatusCode::OK, Json(TaskDto(task))).into_response(),
        None => (StatusCode::NOT_FOUND, Json(ErrorDto::new("TASK_NOT_FOUND"))).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    fn test_orchestrator() -> Arc<Orchestrator> {
        Arc::new(Orchestrator::new("http://cache.invalid", "http://llm.invalid", "key", "model"))
    }

    #[tokio::test]
    async fn translate_missing_params_returns_400() {
        let app = router(test_orchestrator());
        let response = app
            .oneshot(
                axum::http::Request::post("/engine/translate")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["error"], "MISSING_PARAMS");
    }

    #[tokio::test]
    async fn translate_invalid_json_returns_400() {
        let app = router(test_orchestrator());
        let response = app
            .oneshot(
                axum::http::Request::post("/engine/translate")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_unknown_task_returns_404() {
        let app = router(test_orchestrator());
        let response = app
            .oneshot(axum::http::Request::get("/engine/tasks/does-not-exist").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
