//! Core behaviors behind the HTTP handlers.
//!
//! This includes:
//!   - Oracle calls (explain, evaluate, quiz, lightning, vault, categorize) with local fallbacks
//!   - Scoring a trial record through the rarity engine
//!   - The session completion workflow (score once, archive, place on the constellation)
//!   - Vault lookups, stats and exports

use chrono::{NaiveDate, Utc};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::constellation::{find_connections, node_position};
use crate::domain::{
  Category, ConstellationNode, Difficulty, LearningSession, LightningStatement, QuizQuestion, TrialRecord,
};
use crate::error::SessionError;
use crate::openai::{Categorization, Evaluation};
use crate::protocol::{ClassifyOut, CompleteSessionIn};
use crate::rarity;
use crate::seeds::{
  local_categorization, local_evaluation, local_explanation, local_lightning, local_quiz, local_vault_entry,
};
use crate::state::AppState;
use crate::stats::{vault_stats, VaultStats};

pub fn parse_difficulty(level: i64) -> Result<Difficulty, SessionError> {
  Ok(Difficulty::try_from(level)?)
}

//
// Oracle calls
//

#[instrument(level = "info", skip(state, topic), fields(topic_len = topic.len(), %difficulty))]
pub async fn explain_topic(state: &AppState, topic: &str, difficulty: Difficulty) -> String {
  if let Some(oa) = &state.openai {
    match oa.explain_topic(&state.prompts, topic, difficulty).await {
      Ok(t) => return t,
      Err(e) => error!(target: "quest", error = %e, "OpenAI explain_topic failed; using local explanation."),
    }
  }
  local_explanation(topic, difficulty)
}

#[instrument(level = "info", skip(state, topic, explanation), fields(topic_len = topic.len(), explanation_len = explanation.len()))]
pub async fn evaluate_explanation(state: &AppState, topic: &str, explanation: &str) -> Evaluation {
  if let Some(oa) = &state.openai {
    match oa.evaluate_explanation(&state.prompts, topic, explanation).await {
      Ok(e) => {
        info!(target: "quest", score = e.score, "Explanation evaluated by OpenAI");
        return e;
      }
      Err(e) => error!(target: "quest", error = %e, "OpenAI evaluate_explanation failed; using local grader."),
    }
  }
  let e = local_evaluation(topic, explanation);
  info!(target: "quest", score = e.score, "Explanation evaluated locally");
  e
}

#[instrument(level = "info", skip(state, topic), fields(topic_len = topic.len(), %difficulty))]
pub async fn generate_quiz(state: &AppState, topic: &str, difficulty: Difficulty) -> Vec<QuizQuestion> {
  let count = state.trials.quiz_questions;
  if let Some(oa) = &state.openai {
    match oa.generate_quiz(&state.prompts, topic, difficulty, count).await {
      Ok(q) => return q,
      Err(e) => error!(target: "quest", error = %e, "OpenAI generate_quiz failed; using local bank."),
    }
  }
  local_quiz(topic, count)
}

#[instrument(level = "info", skip(state, topic), fields(topic_len = topic.len()))]
pub async fn generate_lightning(state: &AppState, topic: &str) -> Vec<LightningStatement> {
  let count = state.trials.lightning_statements;
  if let Some(oa) = &state.openai {
    match oa.generate_lightning(&state.prompts, topic, count).await {
      Ok(s) => return s,
      Err(e) => error!(target: "quest", error = %e, "OpenAI generate_lightning failed; using local bank."),
    }
  }
  local_lightning(topic, count)
}

#[instrument(level = "info", skip(state, session), fields(id = %session.id))]
pub async fn create_vault_entry(state: &AppState, session: &LearningSession) -> String {
  if let Some(oa) = &state.openai {
    match oa.create_vault_entry(&state.prompts, session).await {
      Ok(t) => return t,
      Err(e) => error!(target: "quest", id = %session.id, error = %e, "OpenAI create_vault_entry failed; using local template."),
    }
  }
  local_vault_entry(session)
}

/// Never fails: any oracle error degrades to keyword matching, which itself
/// falls back to `Skills`.
#[instrument(level = "info", skip(state, topic), fields(topic_len = topic.len()))]
pub async fn categorize_topic(state: &AppState, topic: &str) -> Categorization {
  if let Some(oa) = &state.openai {
    match oa.categorize_topic(&state.prompts, topic).await {
      Ok(c) => return c,
      Err(e) => warn!(target: "quest", error = %e, "OpenAI categorize_topic failed; using keyword match."),
    }
  }
  local_categorization(topic)
}

//
// Scoring
//

/// Validate and score a trial record without storing anything.
pub fn score_trials(trials: &TrialRecord, difficulty: i64, time_bonus: Option<u32>) -> Result<ClassifyOut, SessionError> {
  let difficulty = parse_difficulty(difficulty)?;
  trials.validate()?;
  let time_bonus = time_bonus.unwrap_or(trials.lightning.time_bonus);
  let outcome = rarity::classify(trials, difficulty, Some(time_bonus));
  Ok(ClassifyOut {
    rarity: outcome.rarity,
    final_score: outcome.final_score,
    breakdown: rarity::breakdown(trials, difficulty, time_bonus),
  })
}

//
// Session workflow
//

/// Turn a finished trial run into an archived session and a constellation node.
/// The rarity engine runs exactly once per call.
#[instrument(level = "info", skip(state, req), fields(topic_len = req.topic.len(), difficulty = req.difficulty))]
pub async fn complete_session(state: &AppState, req: CompleteSessionIn) -> Result<LearningSession, SessionError> {
  complete_session_on(state, req, Utc::now().date_naive()).await
}

pub async fn complete_session_on(
  state: &AppState,
  req: CompleteSessionIn,
  date: NaiveDate,
) -> Result<LearningSession, SessionError> {
  let difficulty = parse_difficulty(req.difficulty)?;
  req.trials.validate()?;
  if !req.trials.is_complete() {
    warn!(
      target: "quest",
      gauntlet_total = req.trials.gauntlet.total_questions,
      lightning_total = req.trials.lightning.total_questions,
      "Trial record has an empty round; it contributes 0 to the score"
    );
  }

  let outcome = rarity::classify(&req.trials, difficulty, None);

  let (category, related) = match (req.category.as_deref(), req.connections) {
    (Some(label), connections) => (Category::from_label(label), connections.unwrap_or_default()),
    (None, connections) => {
      let c = categorize_topic(state, &req.topic).await;
      (c.category, connections.unwrap_or(c.connections))
    }
  };

  let mut session = LearningSession {
    id: Uuid::new_v4().to_string(),
    topic: req.topic.trim().to_string(),
    date,
    difficulty,
    difficulty_name: difficulty.name().to_string(),
    category,
    trials: req.trials,
    rarity: outcome.rarity,
    final_score: outcome.final_score,
    chat_history: req.chat_history,
    vault_content: String::new(),
    ai_explanation: req.ai_explanation,
  };
  session.vault_content = create_vault_entry(state, &session).await;

  let node_id = session.id.clone();
  let node_topic = session.topic.clone();
  let tier = session.rarity;
  let node = state
    .store
    .archive_session(
      session.clone(),
      Box::new(move |existing: &[ConstellationNode]| {
        let (x, y) = node_position(category, existing.len());
        ConstellationNode {
          id: node_id,
          topic: node_topic,
          category,
          difficulty,
          rarity: tier,
          x,
          y,
          connections: find_connections(existing, &related),
        }
      }),
    )
    .await?;
  let linked = node.connections.len();

  info!(
    target: "quest",
    id = %session.id,
    rarity = %session.rarity,
    final_score = session.final_score,
    %category,
    linked,
    "Session completed and archived"
  );
  Ok(session)
}

/// Replace the vault markdown of an archived session. Nothing else about a
/// stored session is mutable.
#[instrument(level = "info", skip(state, content), fields(%id, content_len = content.len()))]
pub async fn update_vault_content(state: &AppState, id: &str, content: String) -> Result<LearningSession, SessionError> {
  let mut session = find_session(state, id).await?;
  session.vault_content = content;
  state.store.save_session(session.clone()).await?;
  Ok(session)
}

pub async fn find_session(state: &AppState, id: &str) -> Result<LearningSession, SessionError> {
  state.store.find_session(id).await?.ok_or_else(|| SessionError::NotFound(id.to_string()))
}

pub async fn search_vault(state: &AppState, query: Option<&str>) -> Result<Vec<LearningSession>, SessionError> {
  Ok(match query {
    Some(q) => state.store.search_sessions(q).await?,
    None => state.store.list_sessions().await?,
  })
}

pub async fn stats(state: &AppState) -> Result<VaultStats, SessionError> {
  let sessions = state.store.list_sessions().await?;
  Ok(vault_stats(&sessions, Utc::now().date_naive()))
}

/// All sessions as pretty-printed JSON.
pub async fn export_vault(state: &AppState) -> Result<String, SessionError> {
  let sessions = state.store.list_sessions().await?;
  serde_json::to_string_pretty(&sessions).map_err(|e| SessionError::Store(e.into()))
}

/// The vault markdown of one session.
pub async fn export_session(state: &AppState, id: &str) -> Result<String, SessionError> {
  Ok(find_session(state, id).await?.vault_content)
}
