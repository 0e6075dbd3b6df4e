//! Public protocol structs for the HTTP endpoints (serde ready).
//! Field names are camelCase on the wire; difficulty arrives as a raw integer
//! and is range-checked in `logic` so callers get a domain error, not a
//! deserialization failure.

use serde::{Deserialize, Serialize};

use crate::domain::{ChatMessage, LearningSession, LightningStatement, QuizQuestion, Rarity, TrialRecord};
use crate::rarity::ScoreBreakdown;

//
// Oracle proxy
//

#[derive(Debug, Deserialize)]
pub struct ExplainIn {
    pub topic: String,
    pub difficulty: i64,
}
#[derive(Serialize)]
pub struct ExplainOut {
    pub content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateIn {
    pub topic: String,
    pub user_explanation: String,
}

#[derive(Debug, Deserialize)]
pub struct QuizIn {
    pub topic: String,
    pub difficulty: i64,
}
#[derive(Serialize)]
pub struct QuizOut {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct LightningIn {
    pub topic: String,
}
#[derive(Serialize)]
pub struct LightningOut {
    pub statements: Vec<LightningStatement>,
}

#[derive(Deserialize)]
pub struct VaultIn {
    pub session: LearningSession,
}
#[derive(Serialize)]
pub struct VaultOut {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CategorizeIn {
    pub topic: String,
}

//
// Scoring and sessions
//

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyIn {
    pub trials: TrialRecord,
    pub difficulty: i64,
    /// Overrides `trials.lightning.timeBonus` when present.
    #[serde(default)]
    pub time_bonus: Option<u32>,
}
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyOut {
    pub rarity: Rarity,
    pub final_score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Everything the client knows when the third trial ends.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSessionIn {
    pub topic: String,
    pub difficulty: i64,
    /// Skip to categorize server-side.
    #[serde(default)]
    pub category: Option<String>,
    /// Related topics used to link constellation nodes.
    #[serde(default)]
    pub connections: Option<Vec<String>>,
    pub trials: TrialRecord,
    #[serde(default)]
    pub ai_explanation: String,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct VaultContentIn {
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOut {
    pub ok: bool,
    pub oracle_enabled: bool,
}

/// Render hints for one rarity tier.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RarityStyleOut {
    pub rarity: Rarity,
    pub color: &'static str,
    pub glow_class: &'static str,
    pub border_width: u8,
}
