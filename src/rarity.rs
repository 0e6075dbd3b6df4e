//! Rarity engine: turns a finished trial record into a composite score and a
//! rarity tier.
//!
//! Pipeline:
//! 1) Normalize each trial to 0..=10 (articulation as-is, rounds as correct/total × 10).
//! 2) Weighted base: 40% articulation, 40% gauntlet, 20% lightning.
//! 3) Add `difficulty × 0.5` and `time_bonus × 0.1`, cap at 10 (no floor).
//! 4) Classify the capped score against difficulty-adjusted thresholds.
//! 5) Report the score rounded to two decimals (half away from zero).
//!
//! Classification always sees the unrounded score, so a raw 6.596 at
//! difficulty 3 stays below the 6.6 rare threshold even though it prints as 6.60.
//! A round with no questions contributes 0 instead of dividing by zero.

use serde::{Deserialize, Serialize};

use crate::domain::{Difficulty, Rarity, RoundTally, TrialRecord};

pub const ARTICULATION_WEIGHT: f64 = 0.4;
pub const GAUNTLET_WEIGHT: f64 = 0.4;
pub const LIGHTNING_WEIGHT: f64 = 0.2;

pub const DIFFICULTY_BONUS_PER_LEVEL: f64 = 0.5;
pub const SPEED_BONUS_PER_POINT: f64 = 0.1;
pub const MAX_SCORE: f64 = 10.0;

/// Threshold increase per difficulty level above 1.
pub const THRESHOLD_PENALTY_PER_LEVEL: f64 = 0.3;

/// (base at difficulty 1, ceiling) per tier.
const RARE_THRESHOLD: (f64, f64) = (6.0, 8.5);
const LEGENDARY_THRESHOLD: (f64, f64) = (7.5, 9.0);
const UNIQUE_THRESHOLD: (f64, f64) = (9.0, 9.5);

/// Result of scoring one session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RarityOutcome {
  pub rarity: Rarity,
  pub final_score: f64,
}

/// Inclusive lower bounds for each tier at a given difficulty.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RarityThresholds {
  pub rare: f64,
  pub legendary: f64,
  pub unique: f64,
}

impl RarityThresholds {
  pub fn for_difficulty(difficulty: Difficulty) -> Self {
    let penalty = (difficulty.level() as f64 - 1.0) * THRESHOLD_PENALTY_PER_LEVEL;
    let adjust = |(base, cap): (f64, f64)| (base + penalty).min(cap);
    Self {
      rare: adjust(RARE_THRESHOLD),
      legendary: adjust(LEGENDARY_THRESHOLD),
      unique: adjust(UNIQUE_THRESHOLD),
    }
  }

  /// Highest tier whose threshold `score` reaches.
  pub fn classify(&self, score: f64) -> Rarity {
    if score >= self.unique {
      Rarity::Unique
    } else if score >= self.legendary {
      Rarity::Legendary
    } else if score >= self.rare {
      Rarity::Rare
    } else {
      Rarity::Normal
    }
  }
}

/// Per-component view of a scoring run; handy for logs and the classify endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
  pub articulation: f64,
  pub gauntlet: f64,
  pub lightning: f64,
  pub base: f64,
  pub difficulty_bonus: f64,
  pub speed_bonus: f64,
  /// Capped at `MAX_SCORE`, not rounded. This is what gets classified.
  pub capped: f64,
  pub thresholds: RarityThresholds,
}

/// `correct / total × 10`, or 0 for a round without questions.
pub fn normalize_round(tally: RoundTally) -> f64 {
  if tally.is_empty() {
    0.0
  } else {
    tally.correct as f64 / tally.total as f64 * MAX_SCORE
  }
}

/// Half away from zero at two decimals.
pub fn round_score(score: f64) -> f64 {
  (score * 100.0).round() / 100.0
}

/// Run the scoring pipeline without the final rounding.
pub fn breakdown(trial: &TrialRecord, difficulty: Difficulty, time_bonus: u32) -> ScoreBreakdown {
  let articulation = trial.articulation.score;
  let gauntlet = normalize_round(trial.gauntlet.tally());
  let lightning = normalize_round(trial.lightning.tally());

  let base = articulation * ARTICULATION_WEIGHT + gauntlet * GAUNTLET_WEIGHT + lightning * LIGHTNING_WEIGHT;
  let difficulty_bonus = difficulty.level() as f64 * DIFFICULTY_BONUS_PER_LEVEL;
  let speed_bonus = time_bonus as f64 * SPEED_BONUS_PER_POINT;
  let capped = (base + difficulty_bonus + speed_bonus).min(MAX_SCORE);

  ScoreBreakdown {
    articulation,
    gauntlet,
    lightning,
    base,
    difficulty_bonus,
    speed_bonus,
    capped,
    thresholds: RarityThresholds::for_difficulty(difficulty),
  }
}

/// Score and classify a trial record.
///
/// `time_bonus_override` replaces `trial.lightning.time_bonus` when given.
pub fn classify(trial: &TrialRecord, difficulty: Difficulty, time_bonus_override: Option<u32>) -> RarityOutcome {
  let time_bonus = time_bonus_override.unwrap_or(trial.lightning.time_bonus);
  let b = breakdown(trial, difficulty, time_bonus);
  RarityOutcome {
    rarity: b.thresholds.classify(b.capped),
    final_score: round_score(b.capped),
  }
}

//
// Presentation lookups
//

struct RarityStyle {
  color: &'static str,
  glow_class: &'static str,
  border_width: u8,
}

/// Indexed by `Rarity as usize`.
const RARITY_STYLES: [RarityStyle; 4] = [
  RarityStyle { color: "var(--rarity-normal)", glow_class: "rarity-glow-normal", border_width: 1 },
  RarityStyle { color: "var(--rarity-rare)", glow_class: "rarity-glow-rare", border_width: 2 },
  RarityStyle { color: "var(--rarity-legendary)", glow_class: "rarity-glow-legendary", border_width: 3 },
  RarityStyle { color: "var(--rarity-unique)", glow_class: "rarity-glow-unique", border_width: 4 },
];

fn style(rarity: Rarity) -> &'static RarityStyle {
  &RARITY_STYLES[rarity as usize]
}

pub fn rarity_color(rarity: Rarity) -> &'static str { style(rarity).color }

pub fn rarity_glow_class(rarity: Rarity) -> &'static str { style(rarity).glow_class }

pub fn rarity_border_width(rarity: Rarity) -> u8 { style(rarity).border_width }

/// Color for a raw label; unknown labels get the `normal` color.
pub fn rarity_color_for_label(label: &str) -> &'static str {
  rarity_color(Rarity::from_label(label))
}

pub fn rarity_glow_class_for_label(label: &str) -> &'static str {
  rarity_glow_class(Rarity::from_label(label))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{ArticulationResult, GauntletResult, LightningResult};

  const EPS: f64 = 1e-9;

  fn diff(level: u8) -> Difficulty {
    Difficulty::try_from(level).expect("valid difficulty")
  }

  fn trial(articulation: f64, g: (u32, u32), l: (u32, u32), time_bonus: u32) -> TrialRecord {
    TrialRecord {
      articulation: ArticulationResult { score: articulation, text: String::new(), feedback: String::new() },
      gauntlet: GauntletResult { correct_count: g.0, total_questions: g.1, ..Default::default() },
      lightning: LightningResult { correct_count: l.0, total_questions: l.1, time_bonus, ..Default::default() },
    }
  }

  #[test]
  fn perfect_run_at_lowest_difficulty_is_unique() {
    let out = classify(&trial(10.0, (10, 10), (20, 20), 0), diff(1), None);
    assert_eq!(out.rarity, Rarity::Unique);
    assert_eq!(out.final_score, 10.0);
  }

  #[test]
  fn middling_run_at_difficulty_three_misses_rare() {
    let t = trial(5.0, (5, 10), (10, 20), 0);
    let b = breakdown(&t, diff(3), 0);
    assert!((b.base - 5.0).abs() < EPS);
    assert!((b.difficulty_bonus - 1.5).abs() < EPS);
    assert!((b.thresholds.rare - 6.6).abs() < EPS);

    let out = classify(&t, diff(3), None);
    assert_eq!(out.final_score, 6.5);
    assert_eq!(out.rarity, Rarity::Normal);
  }

  #[test]
  fn speed_bonus_pushes_past_cap_at_nightmare() {
    let t = trial(9.0, (9, 10), (18, 20), 12);
    let b = breakdown(&t, diff(5), 12);
    assert!((b.speed_bonus - 1.2).abs() < EPS);
    assert!((b.thresholds.rare - 7.2).abs() < EPS);
    assert!((b.thresholds.legendary - 8.7).abs() < EPS);
    assert!((b.thresholds.unique - 9.5).abs() < EPS);

    let out = classify(&t, diff(5), None);
    assert_eq!(out.final_score, 10.0);
    assert_eq!(out.rarity, Rarity::Unique);
  }

  #[test]
  fn scores_landing_on_a_threshold_take_the_higher_tier() {
    // 4.0 + 0 + 1.5 + 0.5
    let rare = classify(&trial(10.0, (0, 10), (15, 20), 0), diff(1), None);
    assert_eq!((rare.rarity, rare.final_score), (Rarity::Rare, 6.0));
    // 4.0 + 2.0 + 1.0 + 0.5
    let legendary = classify(&trial(10.0, (5, 10), (10, 20), 0), diff(1), None);
    assert_eq!((legendary.rarity, legendary.final_score), (Rarity::Legendary, 7.5));
    // 4.0 + 4.0 + 0.5 + 0.5
    let unique = classify(&trial(10.0, (10, 10), (5, 20), 0), diff(1), None);
    assert_eq!((unique.rarity, unique.final_score), (Rarity::Unique, 9.0));
  }

  #[test]
  fn rounds_sent_as_score_and_answers_are_scored_by_answer_count() {
    let json = r#"{
      "articulation": { "score": 5 },
      "gauntlet": { "score": 5, "answers": [true, true, true, true, true, false, false, false, false, false] },
      "lightning": { "score": 10, "timeBonus": 0,
        "answers": [true, true, true, true, true, true, true, true, true, true,
                    false, false, false, false, false, false, false, false, false, false] }
    }"#;
    let t: TrialRecord = serde_json::from_str(json).expect("parse");
    let out = classify(&t, diff(3), None);
    assert_eq!(out.final_score, 6.5);
    assert_eq!(out.rarity, Rarity::Normal);
  }

  #[test]
  fn empty_gauntlet_contributes_zero() {
    let t = trial(10.0, (0, 0), (20, 20), 0);
    let b = breakdown(&t, diff(1), 0);
    assert_eq!(b.gauntlet, 0.0);
    let out = classify(&t, diff(1), None);
    assert!(out.final_score.is_finite());
    // 4.0 + 0 + 2.0 + 0.5
    assert_eq!(out.final_score, 6.5);
    assert_eq!(out.rarity, Rarity::Rare);
  }

  #[test]
  fn override_replaces_recorded_time_bonus() {
    let t = trial(5.0, (5, 10), (10, 20), 10);
    assert_eq!(classify(&t, diff(3), None).final_score, 7.5);
    assert_eq!(classify(&t, diff(3), Some(0)).final_score, 6.5);
  }

  #[test]
  fn thresholds_are_inclusive_lower_bounds() {
    let t = RarityThresholds::for_difficulty(diff(1));
    assert_eq!(t.classify(6.0), Rarity::Rare);
    assert_eq!(t.classify(5.999), Rarity::Normal);
    assert_eq!(t.classify(7.5), Rarity::Legendary);
    assert_eq!(t.classify(9.0), Rarity::Unique);
  }

  #[test]
  fn thresholds_are_ordered_and_capped_for_every_level() {
    for d in Difficulty::all() {
      let t = RarityThresholds::for_difficulty(d);
      assert!(t.rare <= t.legendary && t.legendary <= t.unique, "level {d}: {t:?}");
      assert!(t.rare <= 8.5 && t.legendary <= 9.0 && t.unique <= 9.5, "level {d}: {t:?}");
    }
    let hardest = RarityThresholds::for_difficulty(diff(5));
    assert_eq!(hardest.unique, 9.5);
  }

  #[test]
  fn classification_uses_unrounded_score() {
    // 6.596 rounds to 6.60 but must stay below the 6.6 threshold at level 3.
    let t = RarityThresholds::for_difficulty(diff(3));
    assert_eq!(round_score(6.596), 6.6);
    assert_eq!(t.classify(6.596), Rarity::Normal);
  }

  #[test]
  fn rounding_is_half_away_from_zero() {
    assert_eq!(round_score(7.125), 7.13);
    assert_eq!(round_score(7.124), 7.12);
    assert_eq!(round_score(10.0), 10.0);
  }

  #[test]
  fn repeated_calls_are_bit_identical() {
    let t = trial(7.3, (7, 10), (13, 20), 4);
    let first = classify(&t, diff(4), None);
    for _ in 0..100 {
      let again = classify(&t, diff(4), None);
      assert_eq!(again.rarity, first.rarity);
      assert_eq!(again.final_score.to_bits(), first.final_score.to_bits());
    }
  }

  #[test]
  fn score_never_decreases_when_a_subscore_improves() {
    for d in Difficulty::all() {
      for bonus in [0u32, 5, 20] {
        let mut prev = f64::MIN;
        for a in 0..=10 {
          let s = classify(&trial(a as f64, (5, 10), (10, 20), bonus), d, None).final_score;
          assert!(s >= prev);
          prev = s;
        }
        let mut prev = f64::MIN;
        for g in 0..=10 {
          let s = classify(&trial(5.0, (g, 10), (10, 20), bonus), d, None).final_score;
          assert!(s >= prev);
          prev = s;
        }
        let mut prev = f64::MIN;
        for l in 0..=20 {
          let s = classify(&trial(5.0, (5, 10), (l, 20), bonus), d, None).final_score;
          assert!(s >= prev);
          prev = s;
        }
      }
    }
  }

  #[test]
  fn final_score_stays_within_bounds() {
    for d in Difficulty::all() {
      for a in [0.0, 3.5, 10.0] {
        for (g, l, bonus) in [(0, 0, 0), (10, 20, 0), (10, 20, 40), (3, 7, 2)] {
          let s = classify(&trial(a, (g, 10), (l, 20), bonus), d, None).final_score;
          assert!((0.0..=MAX_SCORE).contains(&s), "score {s} out of range");
        }
      }
    }
  }

  #[test]
  fn presentation_lookups_fall_back_to_normal() {
    assert_eq!(rarity_color(Rarity::Legendary), "var(--rarity-legendary)");
    assert_eq!(rarity_glow_class(Rarity::Unique), "rarity-glow-unique");
    assert_eq!(rarity_border_width(Rarity::Rare), 2);
    assert_eq!(rarity_color_for_label("epic"), "var(--rarity-normal)");
    assert_eq!(rarity_glow_class_for_label("epic"), "rarity-glow-normal");
  }
}
