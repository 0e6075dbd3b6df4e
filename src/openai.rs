//! Minimal OpenAI client for our use-cases: the content and scoring oracle.
//!
//! We only call chat.completions and request either plain text or a strict JSON object.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key or user-written text.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::domain::{Category, Difficulty, LearningSession, LightningStatement, QuizQuestion};
use crate::util::{fill_template, trunc_for_log};

/// Oracle scores are clamped into this range before they reach the rarity engine.
pub const MIN_ARTICULATION_SCORE: f64 = 1.0;
pub const MAX_ARTICULATION_SCORE: f64 = 10.0;

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
}

/// Oracle verdict on a learner's explanation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
  pub score: f64,
  pub feedback: String,
}

/// Oracle category + related topics for the constellation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Categorization {
  pub category: Category,
  pub connections: Vec<String>,
}

impl Default for Categorization {
  fn default() -> Self {
    Self { category: Category::Skills, connections: vec![] }
  }
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let fast_model =
      std::env::var("OPENAI_FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let strong_model =
      std::env::var("OPENAI_STRONG_MODEL").unwrap_or_else(|_| "gpt-4o".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, fast_model, strong_model })
  }

  async fn complete(&self, req: &ChatCompletionRequest) -> Result<String, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let res = self.client.post(&url)
      .header(USER_AGENT, "knowledge-quest-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      error!(status = %status, body = %trunc_for_log(&msg, 300), "OpenAI request failed");
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    Ok(body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default())
  }

  /// Plain-text chat completion. Used for explanations and vault entries.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat_plain(
    &self,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
    max_tokens: Option<u32>,
  ) -> Result<String, String> {
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: None,
      max_tokens,
    };
    let start = Instant::now();
    let text = self.complete(&req).await?.trim().to_string();
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Plain completion received");
    Ok(text)
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    model: &str,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<T, String> {
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
      max_tokens: None,
    };
    let start = Instant::now();
    let text = self.complete(&req).await?;
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "JSON completion received");
    serde_json::from_str::<T>(&text).map_err(|e| format!("JSON parse error: {}", e))
  }

  // --- High-level helpers (domain-specialized) ---

  /// Teaching text for a topic at the given difficulty.
  #[instrument(level = "info", skip(self, prompts, topic), fields(topic_len = topic.len()))]
  pub async fn explain_topic(&self, prompts: &Prompts, topic: &str, difficulty: Difficulty) -> Result<String, String> {
    let difficulty_str = difficulty.to_string();
    let user = fill_template(
      &prompts.explain_user_template,
      &[("topic", topic), ("difficulty", difficulty_str.as_str()), ("difficulty_context", difficulty.info().teaching_context)],
    );
    let text = self.chat_plain(&self.fast_model, &prompts.explain_system, &user, 0.7, Some(1000)).await?;
    if text.is_empty() {
      return Err("empty explanation".into());
    }
    Ok(text)
  }

  /// Score a learner's explanation (1..=10) with feedback.
  #[instrument(level = "info", skip(self, prompts, topic, explanation), fields(topic_len = topic.len(), explanation_len = explanation.len()))]
  pub async fn evaluate_explanation(&self, prompts: &Prompts, topic: &str, explanation: &str) -> Result<Evaluation, String> {
    let user = fill_template(&prompts.evaluate_user_template, &[("topic", topic), ("explanation", explanation)]);
    let e: Evaluation = self.chat_json(&self.strong_model, &prompts.evaluate_system, &user, 0.3).await?;
    Ok(clamp_evaluation(e))
  }

  #[instrument(level = "info", skip(self, prompts, topic), fields(topic_len = topic.len()))]
  pub async fn generate_quiz(
    &self,
    prompts: &Prompts,
    topic: &str,
    difficulty: Difficulty,
    count: usize,
  ) -> Result<Vec<QuizQuestion>, String> {
    #[derive(Deserialize)]
    struct Quiz { #[serde(default)] questions: Vec<QuizQuestion> }

    let difficulty_str = difficulty.to_string();
    let count_str = count.to_string();
    let user = fill_template(
      &prompts.quiz_user_template,
      &[("topic", topic), ("difficulty", difficulty_str.as_str()), ("count", count_str.as_str())],
    );
    let q: Quiz = self.chat_json(&self.fast_model, &prompts.quiz_system, &user, 0.5).await?;
    let questions: Vec<QuizQuestion> = q.questions.into_iter().filter(is_well_formed_question).collect();
    if questions.is_empty() {
      return Err("model returned no usable quiz questions".into());
    }
    Ok(questions)
  }

  #[instrument(level = "info", skip(self, prompts, topic), fields(topic_len = topic.len()))]
  pub async fn generate_lightning(
    &self,
    prompts: &Prompts,
    topic: &str,
    count: usize,
  ) -> Result<Vec<LightningStatement>, String> {
    #[derive(Deserialize)]
    struct Round { #[serde(default)] statements: Vec<LightningStatement> }

    let count_str = count.to_string();
    let user = fill_template(&prompts.lightning_user_template, &[("topic", topic), ("count", count_str.as_str())]);
    let r: Round = self.chat_json(&self.fast_model, &prompts.lightning_system, &user, 0.6).await?;
    let statements: Vec<LightningStatement> =
      r.statements.into_iter().filter(|s| !s.statement.trim().is_empty()).collect();
    if statements.is_empty() {
      return Err("model returned no lightning statements".into());
    }
    Ok(statements)
  }

  /// Markdown archive entry for a finished session.
  #[instrument(level = "info", skip(self, prompts, session), fields(id = %session.id))]
  pub async fn create_vault_entry(&self, prompts: &Prompts, session: &LearningSession) -> Result<String, String> {
    let user = fill_template(&prompts.vault_user_template, &vault_template_pairs(session).as_pairs());
    let text = self.chat_plain(&self.fast_model, &prompts.vault_system, &user, 0.4, Some(1500)).await?;
    if text.is_empty() {
      return Err("empty vault entry".into());
    }
    Ok(text)
  }

  #[instrument(level = "info", skip(self, prompts, topic), fields(topic_len = topic.len()))]
  pub async fn categorize_topic(&self, prompts: &Prompts, topic: &str) -> Result<Categorization, String> {
    #[derive(Deserialize)]
    struct Raw { #[serde(default)] category: String, #[serde(default)] connections: Vec<String> }

    let user = fill_template(&prompts.categorize_user_template, &[("topic", topic)]);
    let raw: Raw = self.chat_json(&self.fast_model, &prompts.categorize_system, &user, 0.3).await?;
    let category = Category::from_label(&raw.category);
    if !category.as_str().eq_ignore_ascii_case(raw.category.trim()) {
      error!(category = %raw.category, "Unknown category from model; using Skills");
    }
    Ok(Categorization { category, connections: raw.connections })
  }
}

/// Keep the oracle's score inside 1..=10; non-numeric garbage becomes the minimum.
pub fn clamp_evaluation(mut e: Evaluation) -> Evaluation {
  e.score = if e.score.is_finite() {
    e.score.clamp(MIN_ARTICULATION_SCORE, MAX_ARTICULATION_SCORE)
  } else {
    MIN_ARTICULATION_SCORE
  };
  e
}

fn is_well_formed_question(q: &QuizQuestion) -> bool {
  !q.question.trim().is_empty() && q.options.len() >= 2 && q.correct_answer < q.options.len()
}

/// Owned template values for the vault prompt (and the local vault fallback).
pub struct VaultTemplateValues {
  topic: String,
  difficulty_name: String,
  category: String,
  rarity: String,
  final_score: String,
  trials_summary: String,
}

impl VaultTemplateValues {
  pub fn as_pairs(&self) -> [(&str, &str); 6] {
    [
      ("topic", self.topic.as_str()),
      ("difficulty_name", self.difficulty_name.as_str()),
      ("category", self.category.as_str()),
      ("rarity", self.rarity.as_str()),
      ("final_score", self.final_score.as_str()),
      ("trials_summary", self.trials_summary.as_str()),
    ]
  }
}

pub fn vault_template_pairs(session: &LearningSession) -> VaultTemplateValues {
  let t = &session.trials;
  let g = t.gauntlet.tally();
  let l = t.lightning.tally();
  VaultTemplateValues {
    topic: session.topic.clone(),
    difficulty_name: session.difficulty_name.clone(),
    category: session.category.to_string(),
    rarity: session.rarity.to_string(),
    final_score: format!("{:.2}", session.final_score),
    trials_summary: format!(
      "- Articulation: {:.1}/10\n- Gauntlet: {}/{} correct\n- Lightning: {}/{} correct (time bonus {})",
      t.articulation.score, g.correct, g.total, l.correct, l.total, t.lightning.time_bonus
    ),
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
