//! Vault statistics: node counts per rarity, daily streak, estimated time spent.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{LearningSession, Rarity};

/// Estimated minutes per difficulty level of a finished session.
const MINUTES_PER_DIFFICULTY_LEVEL: u32 = 10;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultStats {
  pub total_nodes: usize,
  pub normal_nodes: usize,
  pub rare_nodes: usize,
  pub legendary_nodes: usize,
  pub unique_nodes: usize,
  pub current_streak: u32,
  /// Minutes.
  pub total_time_spent: u32,
}

pub fn vault_stats(sessions: &[LearningSession], today: NaiveDate) -> VaultStats {
  let mut stats = VaultStats { total_nodes: sessions.len(), ..Default::default() };
  for s in sessions {
    match s.rarity {
      Rarity::Normal => stats.normal_nodes += 1,
      Rarity::Rare => stats.rare_nodes += 1,
      Rarity::Legendary => stats.legendary_nodes += 1,
      Rarity::Unique => stats.unique_nodes += 1,
    }
    stats.total_time_spent += s.difficulty.level() as u32 * MINUTES_PER_DIFFICULTY_LEVEL;
  }
  stats.current_streak = current_streak(sessions, today);
  stats
}

/// Walk sessions newest first; each one counts while it is at most one day
/// older than the previous anchor (starting at `today`).
pub fn current_streak(sessions: &[LearningSession], today: NaiveDate) -> u32 {
  let mut dates: Vec<NaiveDate> = sessions.iter().map(|s| s.date).collect();
  dates.sort_unstable_by(|a, b| b.cmp(a));

  let mut streak = 0;
  let mut anchor = today;
  for date in dates {
    if (anchor - date).num_days() <= 1 {
      streak += 1;
      anchor = date;
    } else {
      break;
    }
  }
  streak
}
