//! Domain error types (difficulty, trial records, storage).
//!
//! HTTP mapping lives in `routes::error`.

use thiserror::Error;

/// Difficulty outside the five defined levels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DifficultyError {
  #[error("difficulty must be between 1 and 5, got {0}")]
  OutOfRange(i64),
}

/// Structurally invalid trial record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrialError {
  #[error("articulation score must be within 0..=10, got {0}")]
  ArticulationOutOfRange(f64),

  #[error("{round}: correct count {correct} exceeds total questions {total}")]
  CountExceedsTotal { round: &'static str, correct: u32, total: u32 },

  #[error("{round}: {answers} answers recorded for {total} questions")]
  AnswerCountMismatch { round: &'static str, answers: usize, total: u32 },

  #[error("{round}: correct count {claimed} does not match {counted} correct answers")]
  CorrectCountMismatch { round: &'static str, claimed: u32, counted: u32 },
}

/// Session store failures.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("vault snapshot I/O failed: {0}")]
  Io(#[from] std::io::Error),

  #[error("vault snapshot is not valid JSON: {0}")]
  Serde(#[from] serde_json::Error),
}

/// Failures of the session workflow (completion, lookups, exports).
#[derive(Debug, Error)]
pub enum SessionError {
  #[error(transparent)]
  Difficulty(#[from] DifficultyError),

  #[error(transparent)]
  Trial(#[from] TrialError),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error("unknown session: {0}")]
  NotFound(String),
}
