//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.

use std::sync::Arc;
use axum::{
  extract::{Path, Query, State},
  http::{header, StatusCode},
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::domain::{ConstellationNode, DifficultyInfo, LearningSession, Rarity, DIFFICULTIES};
use crate::constellation::NodeView;
use crate::logic::*;
use crate::openai::{Categorization, Evaluation};
use crate::protocol::*;
use crate::rarity::{
  rarity_border_width, rarity_color, rarity_color_for_label, rarity_glow_class, rarity_glow_class_for_label,
};
use crate::routes::error::ApiError;
use crate::state::AppState;
use crate::stats::VaultStats;

type ApiResult<T> = Result<T, ApiError>;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, oracle_enabled: state.openai.is_some() })
}

pub async fn http_get_difficulties() -> Json<&'static [DifficultyInfo]> {
  Json(&DIFFICULTIES[..])
}

pub async fn http_get_rarity_styles() -> Json<Vec<RarityStyleOut>> {
  Json(
    Rarity::ALL
      .iter()
      .map(|&rarity| RarityStyleOut {
        rarity,
        color: rarity_color(rarity),
        glow_class: rarity_glow_class(rarity),
        border_width: rarity_border_width(rarity),
      })
      .collect(),
  )
}

/// Style for a raw tier label; unknown labels get the `normal` style.
#[instrument(level = "info")]
pub async fn http_get_rarity_style(Path(label): Path<String>) -> Json<RarityStyleOut> {
  let rarity = Rarity::from_label(&label);
  Json(RarityStyleOut {
    rarity,
    color: rarity_color_for_label(&label),
    glow_class: rarity_glow_class_for_label(&label),
    border_width: rarity_border_width(rarity),
  })
}

//
// Oracle proxy
//

#[instrument(level = "info", skip(state, body), fields(topic_len = body.topic.len(), difficulty = body.difficulty))]
pub async fn http_post_explain(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ExplainIn>,
) -> ApiResult<Json<ExplainOut>> {
  let difficulty = parse_difficulty(body.difficulty)?;
  let content = explain_topic(&state, &body.topic, difficulty).await;
  info!(target: "quest", content_len = content.len(), "HTTP explanation served");
  Ok(Json(ExplainOut { content }))
}

#[instrument(level = "info", skip(state, body), fields(topic_len = body.topic.len(), explanation_len = body.user_explanation.len()))]
pub async fn http_post_evaluate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<EvaluateIn>,
) -> Json<Evaluation> {
  Json(evaluate_explanation(&state, &body.topic, &body.user_explanation).await)
}

#[instrument(level = "info", skip(state, body), fields(topic_len = body.topic.len(), difficulty = body.difficulty))]
pub async fn http_post_quiz(
  State(state): State<Arc<AppState>>,
  Json(body): Json<QuizIn>,
) -> ApiResult<Json<QuizOut>> {
  let difficulty = parse_difficulty(body.difficulty)?;
  let questions = generate_quiz(&state, &body.topic, difficulty).await;
  info!(target: "quest", count = questions.len(), "HTTP quiz served");
  Ok(Json(QuizOut { questions }))
}

#[instrument(level = "info", skip(state, body), fields(topic_len = body.topic.len()))]
pub async fn http_post_lightning(
  State(state): State<Arc<AppState>>,
  Json(body): Json<LightningIn>,
) -> Json<LightningOut> {
  let statements = generate_lightning(&state, &body.topic).await;
  info!(target: "quest", count = statements.len(), "HTTP lightning round served");
  Json(LightningOut { statements })
}

#[instrument(level = "info", skip(state, body), fields(id = %body.session.id))]
pub async fn http_post_vault(
  State(state): State<Arc<AppState>>,
  Json(body): Json<VaultIn>,
) -> Json<VaultOut> {
  Json(VaultOut { content: create_vault_entry(&state, &body.session).await })
}

#[instrument(level = "info", skip(state, body), fields(topic_len = body.topic.len()))]
pub async fn http_post_categorize(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CategorizeIn>,
) -> Json<Categorization> {
  Json(categorize_topic(&state, &body.topic).await)
}

//
// Scoring and sessions
//

#[instrument(level = "info", skip(body), fields(difficulty = body.difficulty))]
pub async fn http_post_classify(Json(body): Json<ClassifyIn>) -> ApiResult<Json<ClassifyOut>> {
  let out = score_trials(&body.trials, body.difficulty, body.time_bonus)?;
  info!(target: "quest", rarity = %out.rarity, final_score = out.final_score, "HTTP classify evaluated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body), fields(topic_len = body.topic.len(), difficulty = body.difficulty))]
pub async fn http_post_session(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CompleteSessionIn>,
) -> ApiResult<(StatusCode, Json<LearningSession>)> {
  let session = complete_session(&state, body).await?;
  Ok((StatusCode::CREATED, Json(session)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_sessions(
  State(state): State<Arc<AppState>>,
  Query(q): Query<SearchQuery>,
) -> ApiResult<Json<Vec<LearningSession>>> {
  let sessions = search_vault(&state, q.q.as_deref()).await?;
  info!(target: "quest", count = sessions.len(), "HTTP sessions listed");
  Ok(Json(sessions))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> ApiResult<Json<LearningSession>> {
  Ok(Json(find_session(&state, &id).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_session_export(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
  let markdown = export_session(&state, &id).await?;
  Ok(([(header::CONTENT_TYPE, "text/markdown; charset=utf-8")], markdown))
}

#[instrument(level = "info", skip(state, body), fields(content_len = body.content.len()))]
pub async fn http_put_session_vault(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<VaultContentIn>,
) -> ApiResult<Json<LearningSession>> {
  Ok(Json(update_vault_content(&state, &id, body.content).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_constellation(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<NodeView>>> {
  let nodes: Vec<ConstellationNode> = state.store.list_nodes().await?;
  Ok(Json(nodes.into_iter().map(NodeView::from).collect()))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<VaultStats>> {
  Ok(Json(stats(&state).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_vault_export(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
  let json = export_vault(&state).await?;
  Ok((
    [
      (header::CONTENT_TYPE, "application/json"),
      (header::CONTENT_DISPOSITION, "attachment; filename=\"knowledge-vault.json\""),
    ],
    json,
  ))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_vault(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
  state.store.clear().await?;
  info!(target: "quest", "Vault cleared");
  Ok(StatusCode::NO_CONTENT)
}
