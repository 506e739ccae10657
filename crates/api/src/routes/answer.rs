use crate::{create_success_response, error::ApiResult, AppState};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use lawguide_common::{AnswerOutcome, ApiResponse, Passage, ScoredPassage, SourceRef};
use lawguide_core::format_answer;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Upper bound on `k` accepted from clients.
const MAX_RETRIEVE_K: usize = 50;

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question: String,
    #[serde(default)]
    pub include_context: bool,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub question: String,
    pub answer: String,
    pub formatted_answer: String,
    pub outcome: AnswerOutcome,
    pub sources: Vec<SourceRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<Passage>>,
}

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub question: String,
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub question: String,
    pub k: usize,
    pub passages: Vec<ScoredPassage>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/answer", post(answer))
        .route("/retrieve", post(retrieve))
        .with_state(state)
}

async fn answer(
    State(state): State<AppState>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<AnswerResponse>>> {
    let Json(request) = payload?;
    debug!("Answer requested (include_context: {})", request.include_context);

    let answer = state.pipeline().answer(&request.question).await?;
    let formatted = format_answer(&answer);

    let mut sources: Vec<SourceRef> = Vec::new();
    for passage in &answer.context {
        if !sources.contains(&passage.source) {
            sources.push(passage.source.clone());
        }
    }

    Ok(create_success_response(AnswerResponse {
        question: answer.question,
        answer: formatted.raw_answer,
        formatted_answer: formatted.formatted_answer,
        outcome: answer.outcome,
        sources,
        context: request.include_context.then_some(answer.context),
    }))
}

async fn retrieve(
    State(state): State<AppState>,
    payload: Result<Json<RetrieveRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<RetrieveResponse>>> {
    let Json(request) = payload?;
    let k = request
        .k
        .unwrap_or_else(|| state.pipeline().top_k())
        .min(MAX_RETRIEVE_K);

    let passages = state.pipeline().retrieve_scored(&request.question, Some(k)).await?;

    Ok(create_success_response(RetrieveResponse {
        question: request.question.trim().to_string(),
        k,
        passages,
    }))
}
