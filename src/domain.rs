//! Domain models: difficulty levels, categories, rarity tiers, trial records,
//! learning sessions and constellation nodes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DifficultyError, TrialError};

/// Static description of one difficulty level.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct DifficultyInfo {
  pub level: u8,
  pub name: &'static str,
  pub description: &'static str,
  /// Phrase injected into the teaching prompt.
  #[serde(skip)]
  pub teaching_context: &'static str,
}

pub const DIFFICULTIES: [DifficultyInfo; 5] = [
  DifficultyInfo {
    level: 1,
    name: "I'm Too Young to Die",
    description: "Beginner friendly introduction",
    teaching_context: "beginner level with simple explanations and basic examples",
  },
  DifficultyInfo {
    level: 2,
    name: "Hey, Not Too Rough",
    description: "Basic concepts and examples",
    teaching_context: "introductory level with clear concepts and practical examples",
  },
  DifficultyInfo {
    level: 3,
    name: "Hurt Me Plenty",
    description: "Intermediate depth and complexity",
    teaching_context: "intermediate level with detailed explanations and real-world applications",
  },
  DifficultyInfo {
    level: 4,
    name: "Ultra-Violence",
    description: "Advanced topics and nuances",
    teaching_context: "advanced level with complex concepts and technical depth",
  },
  DifficultyInfo {
    level: 5,
    name: "Nightmare",
    description: "Expert level analysis",
    teaching_context: "expert level with comprehensive analysis and cutting-edge insights",
  },
];

/// Difficulty level in `1..=5`. Can only be built through `TryFrom`, so every
/// value reaching the rarity engine is in range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
  pub const MIN: u8 = 1;
  pub const MAX: u8 = 5;

  pub fn level(self) -> u8 { self.0 }

  pub fn info(self) -> &'static DifficultyInfo {
    &DIFFICULTIES[(self.0 - 1) as usize]
  }

  pub fn name(self) -> &'static str { self.info().name }

  pub fn all() -> impl Iterator<Item = Difficulty> {
    (Self::MIN..=Self::MAX).map(Difficulty)
  }
}

impl TryFrom<i64> for Difficulty {
  type Error = DifficultyError;

  fn try_from(value: i64) -> Result<Self, Self::Error> {
    if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
      Ok(Difficulty(value as u8))
    } else {
      Err(DifficultyError::OutOfRange(value))
    }
  }
}

impl TryFrom<u8> for Difficulty {
  type Error = DifficultyError;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Difficulty::try_from(value as i64)
  }
}

impl From<Difficulty> for u8 {
  fn from(d: Difficulty) -> u8 { d.0 }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Knowledge category. Closed set; unknown labels map to `Skills`, also when
/// deserializing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Category {
  Sciences,
  Mathematics,
  Technology,
  Humanities,
  Arts,
  Skills,
  Languages,
}

impl Category {
  pub const ALL: [Category; 7] = [
    Category::Sciences,
    Category::Mathematics,
    Category::Technology,
    Category::Humanities,
    Category::Arts,
    Category::Skills,
    Category::Languages,
  ];

  /// Position in `ALL`; used to index the fixed lookup tables.
  pub fn index(self) -> usize { self as usize }

  pub fn as_str(self) -> &'static str {
    match self {
      Category::Sciences => "Sciences",
      Category::Mathematics => "Mathematics",
      Category::Technology => "Technology",
      Category::Humanities => "Humanities",
      Category::Arts => "Arts",
      Category::Skills => "Skills",
      Category::Languages => "Languages",
    }
  }

  /// Case-insensitive parse with the `Skills` fallback used whenever
  /// categorization yields something unrecognized.
  pub fn from_label(label: &str) -> Category {
    let wanted = label.trim();
    Category::ALL
      .into_iter()
      .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
      .unwrap_or_default()
  }
}

impl From<String> for Category {
  fn from(label: String) -> Self { Category::from_label(&label) }
}

impl Default for Category {
  fn default() -> Self { Category::Skills }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Rarity tier of a completed session, lowest to highest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
  Normal,
  Rare,
  Legendary,
  Unique,
}

impl Rarity {
  pub const ALL: [Rarity; 4] = [Rarity::Normal, Rarity::Rare, Rarity::Legendary, Rarity::Unique];

  pub fn as_str(self) -> &'static str {
    match self {
      Rarity::Normal => "normal",
      Rarity::Rare => "rare",
      Rarity::Legendary => "legendary",
      Rarity::Unique => "unique",
    }
  }

  /// Lenient parse for labels coming from stored or exported data.
  pub fn from_label(label: &str) -> Rarity {
    label.parse().unwrap_or(Rarity::Normal)
  }
}

impl FromStr for Rarity {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim();
    Rarity::ALL
      .into_iter()
      .find(|r| r.as_str().eq_ignore_ascii_case(wanted))
      .ok_or_else(|| format!("unknown rarity '{}'", s))
  }
}

impl fmt::Display for Rarity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

//
// Trial records
//

/// Multiple-choice question as produced by the oracle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
  pub question: String,
  pub options: Vec<String>,
  pub correct_answer: usize,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_answer: Option<usize>,
}

/// True/false statement for the lightning round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightningStatement {
  pub statement: String,
  pub is_true: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub user_answer: Option<bool>,
}

/// Correct answers out of questions asked in one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundTally {
  pub correct: u32,
  pub total: u32,
}

impl RoundTally {
  /// A round with no questions (skipped or never generated).
  pub fn is_empty(self) -> bool { self.total == 0 }
}

/// Trial 1: free-text explanation scored by the oracle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticulationResult {
  pub score: f64,
  #[serde(default)]
  pub text: String,
  #[serde(default)]
  pub feedback: String,
}

/// Trial 2: multiple-choice gauntlet.
///
/// On the wire `correctCount` (alias `score`) and `totalQuestions` may be
/// omitted; they are then derived from `answers`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "GauntletWire")]
pub struct GauntletResult {
  pub correct_count: u32,
  pub total_questions: u32,
  pub answers: Vec<bool>,
  pub questions: Vec<QuizQuestion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GauntletWire {
  #[serde(default, alias = "score")]
  correct_count: Option<u32>,
  #[serde(default)]
  total_questions: Option<u32>,
  #[serde(default)]
  answers: Vec<bool>,
  #[serde(default)]
  questions: Vec<QuizQuestion>,
}

impl From<GauntletWire> for GauntletResult {
  fn from(w: GauntletWire) -> Self {
    let derived = GauntletResult::from_answers(w.answers, w.questions);
    GauntletResult {
      correct_count: w.correct_count.unwrap_or(derived.correct_count),
      total_questions: w.total_questions.unwrap_or(derived.total_questions),
      ..derived
    }
  }
}

impl GauntletResult {
  pub fn from_answers(answers: Vec<bool>, questions: Vec<QuizQuestion>) -> Self {
    Self {
      correct_count: count_correct(&answers),
      total_questions: answers.len() as u32,
      answers,
      questions,
    }
  }

  pub fn tally(&self) -> RoundTally {
    RoundTally { correct: self.correct_count, total: self.total_questions }
  }
}

/// Trial 3: timed true/false round. `time_bonus` is derived by the caller
/// from the time left on the clock.
///
/// Deserializes like `GauntletResult`. A missing `timeBonus` is computed from
/// `timeRemaining` (seconds) when that is sent instead.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "LightningWire")]
pub struct LightningResult {
  pub correct_count: u32,
  pub total_questions: u32,
  pub time_bonus: u32,
  pub answers: Vec<bool>,
  pub questions: Vec<LightningStatement>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LightningWire {
  #[serde(default, alias = "score")]
  correct_count: Option<u32>,
  #[serde(default)]
  total_questions: Option<u32>,
  #[serde(default)]
  time_bonus: Option<u32>,
  #[serde(default)]
  time_remaining: Option<i64>,
  #[serde(default)]
  answers: Vec<bool>,
  #[serde(default)]
  questions: Vec<LightningStatement>,
}

impl From<LightningWire> for LightningResult {
  fn from(w: LightningWire) -> Self {
    let time_bonus = w
      .time_bonus
      .or_else(|| w.time_remaining.map(LightningResult::time_bonus_from_remaining))
      .unwrap_or(0);
    let derived = LightningResult::from_answers(w.answers, w.questions, time_bonus);
    LightningResult {
      correct_count: w.correct_count.unwrap_or(derived.correct_count),
      total_questions: w.total_questions.unwrap_or(derived.total_questions),
      ..derived
    }
  }
}

impl LightningResult {
  /// Seconds per bonus point granted for time left on the lightning clock.
  pub const SECONDS_PER_BONUS_POINT: i64 = 6;

  pub fn from_answers(answers: Vec<bool>, questions: Vec<LightningStatement>, time_bonus: u32) -> Self {
    Self {
      correct_count: count_correct(&answers),
      total_questions: answers.len() as u32,
      time_bonus,
      answers,
      questions,
    }
  }

  /// `floor(remaining / 6)`, never negative.
  pub fn time_bonus_from_remaining(remaining_secs: i64) -> u32 {
    if remaining_secs > 0 {
      (remaining_secs / Self::SECONDS_PER_BONUS_POINT) as u32
    } else {
      0
    }
  }

  pub fn tally(&self) -> RoundTally {
    RoundTally { correct: self.correct_count, total: self.total_questions }
  }
}

/// All three trial results of one session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
  pub articulation: ArticulationResult,
  pub gauntlet: GauntletResult,
  pub lightning: LightningResult,
}

impl TrialRecord {
  /// Both quiz rounds have at least one question.
  pub fn is_complete(&self) -> bool {
    !self.gauntlet.tally().is_empty() && !self.lightning.tally().is_empty()
  }

  /// Structural checks. Empty rounds pass; they are scored as zero.
  pub fn validate(&self) -> Result<(), TrialError> {
    let score = self.articulation.score;
    if !score.is_finite() || !(0.0..=10.0).contains(&score) {
      return Err(TrialError::ArticulationOutOfRange(score));
    }
    check_round("gauntlet", self.gauntlet.tally(), &self.gauntlet.answers)?;
    check_round("lightning", self.lightning.tally(), &self.lightning.answers)?;
    Ok(())
  }
}

fn count_correct(answers: &[bool]) -> u32 {
  answers.iter().filter(|a| **a).count() as u32
}

fn check_round(round: &'static str, tally: RoundTally, answers: &[bool]) -> Result<(), TrialError> {
  if tally.correct > tally.total {
    return Err(TrialError::CountExceedsTotal { round, correct: tally.correct, total: tally.total });
  }
  // Answers are optional detail; when present they must agree with the tally.
  if !answers.is_empty() {
    if answers.len() != tally.total as usize {
      return Err(TrialError::AnswerCountMismatch { round, answers: answers.len(), total: tally.total });
    }
    let counted = count_correct(answers);
    if counted != tally.correct {
      return Err(TrialError::CorrectCountMismatch { round, claimed: tally.correct, counted });
    }
  }
  Ok(())
}

//
// Sessions and constellation
//

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
  User,
  Ai,
  System,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: MessageKind,
  pub content: String,
  pub timestamp: DateTime<Utc>,
}

/// A completed learning session as stored in the vault.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningSession {
  pub id: String,
  pub topic: String,
  pub date: NaiveDate,
  pub difficulty: Difficulty,
  pub difficulty_name: String,
  pub category: Category,
  pub trials: TrialRecord,
  pub rarity: Rarity,
  pub final_score: f64,
  #[serde(default)]
  pub chat_history: Vec<ChatMessage>,
  #[serde(default)]
  pub vault_content: String,
  #[serde(default)]
  pub ai_explanation: String,
}

/// One star on the constellation map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstellationNode {
  pub id: String,
  pub topic: String,
  pub category: Category,
  pub difficulty: Difficulty,
  pub rarity: Rarity,
  pub x: f64,
  pub y: f64,
  #[serde(default)]
  pub connections: Vec<String>,
}
