//! Loading agent configuration (oracle prompts + trial sizes) from TOML.
//!
//! See `AgentConfig`, `Prompts` and `TrialSettings` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub trials: TrialSettings,
}

/// How many questions each generated round asks for.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct TrialSettings {
  #[serde(default = "default_quiz_questions")]
  pub quiz_questions: usize,
  #[serde(default = "default_lightning_statements")]
  pub lightning_statements: usize,
}

fn default_quiz_questions() -> usize { 10 }
fn default_lightning_statements() -> usize { 20 }

impl Default for TrialSettings {
  fn default() -> Self {
    Self { quiz_questions: default_quiz_questions(), lightning_statements: default_lightning_statements() }
  }
}

/// Prompts used by the OpenAI client. Any field can be overridden in TOML;
/// missing fields keep their defaults.
/// Placeholders: {topic}, {difficulty}, {difficulty_context}, {explanation},
/// {count}, {difficulty_name}, {category}, {rarity}, {final_score}, {trials_summary}.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub explain_system: String,
  pub explain_user_template: String,
  pub evaluate_system: String,
  pub evaluate_user_template: String,
  pub quiz_system: String,
  pub quiz_user_template: String,
  pub lightning_system: String,
  pub lightning_user_template: String,
  pub vault_system: String,
  pub vault_user_template: String,
  pub categorize_system: String,
  pub categorize_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      explain_system: "You are an expert educator who explains complex topics clearly and engagingly.".into(),
      explain_user_template: "You are an expert teacher explaining \"{topic}\" at {difficulty_context}.\n\nProvide a comprehensive explanation that includes:\n1. Clear definition and core concepts\n2. Key principles and how they work\n3. Real-world examples and applications\n4. Important terminology\n5. Common misconceptions to avoid\n\nFormat your response as clear, engaging content suitable for learning. Make it thorough but accessible for the specified difficulty level.".into(),
      evaluate_system: "You are an expert educator who provides fair, constructive assessment. Respond ONLY with strict JSON.".into(),
      evaluate_user_template: "Evaluate this student's explanation of \"{topic}\":\n\n\"{explanation}\"\n\nProvide a score from 1-10 and specific feedback. Return JSON {\"score\": number, \"feedback\": string}.\n\nScoring criteria:\n- Accuracy of information (40%)\n- Completeness of explanation (30%)\n- Clarity and organization (20%)\n- Use of appropriate terminology (10%)".into(),
      quiz_system: "You are an expert quiz creator who designs fair, educational assessments. Respond ONLY with strict JSON.".into(),
      quiz_user_template: "Create {count} multiple choice questions about \"{topic}\" for difficulty level {difficulty}.\n\nEach question should have 4 options with exactly one correct answer. Return JSON {\"questions\": [{\"question\": string, \"options\": [string, string, string, string], \"correctAnswer\": number}]}.\n\nMake questions progressively challenging and cover key concepts.".into(),
      lightning_system: "You are an expert educator creating rapid-fire assessment questions. Respond ONLY with strict JSON.".into(),
      lightning_user_template: "Create {count} true/false statements about \"{topic}\".\n\nMix obvious facts with nuanced points to test deep understanding. Return JSON {\"statements\": [{\"statement\": string, \"isTrue\": boolean}]}.\n\nInclude a variety of difficulty levels from basic facts to subtle distinctions.".into(),
      vault_system: "You are creating a comprehensive knowledge archive entry.".into(),
      vault_user_template: "Create a comprehensive markdown summary for this learning session:\n\nTopic: {topic}\nDifficulty: {difficulty_name}\nCategory: {category}\nRarity: {rarity}\nFinal Score: {final_score}\n\nTrial results:\n{trials_summary}\n\nInclude the key ideas of the topic, the learner's understanding, the trial results, and connections to related topics.\n\nFormat as a detailed markdown document suitable for a knowledge vault.".into(),
      categorize_system: "You are an expert knowledge organizer and topic categorization specialist. Respond ONLY with strict JSON.".into(),
      categorize_user_template: "Analyze this topic: \"{topic}\"\n\nDetermine:\n1. Which category it belongs to: Sciences, Mathematics, Technology, Humanities, Arts, Skills, or Languages\n2. List 3-5 related topics that would connect to this in a knowledge graph\n\nReturn JSON {\"category\": string, \"connections\": [string]}.".into(),
    }
  }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_agent_config(&s) {
      Ok(cfg) => {
        info!(target: "knowledge_quest_backend", %path, quiz_questions = cfg.trials.quiz_questions, lightning_statements = cfg.trials.lightning_statements, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "knowledge_quest_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "knowledge_quest_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_agent_config(s: &str) -> Result<AgentConfig, toml::de::Error> {
  toml::from_str::<AgentConfig>(s)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = parse_agent_config("").expect("parse");
    assert_eq!(cfg.trials.quiz_questions, 10);
    assert_eq!(cfg.trials.lightning_statements, 20);
    assert!(cfg.prompts.quiz_user_template.contains("{count}"));
  }

  #[test]
  fn partial_overrides_keep_other_defaults() {
    let cfg = parse_agent_config(
      r#"
        [prompts]
        explain_system = "Be brief."

        [trials]
        quiz_questions = 5
      "#,
    )
    .expect("parse");
    assert_eq!(cfg.prompts.explain_system, "Be brief.");
    assert_eq!(cfg.prompts.vault_system, Prompts::default().vault_system);
    assert_eq!(cfg.trials.quiz_questions, 5);
    assert_eq!(cfg.trials.lightning_statements, 20);
  }

  #[test]
  fn malformed_config_is_an_error() {
    assert!(parse_agent_config("[trials]\nquiz_questions = \"ten\"").is_err());
  }
}
