//! Constellation layout: where a new knowledge node lands and how it is drawn.
//!
//! Nodes are placed radially around a fixed center, one sector per category.
//! Successive nodes step through three rings and drift within a 30° arc so
//! that they don't stack on top of each other.

use std::f64::consts::PI;

use serde::Serialize;

use crate::domain::{Category, ConstellationNode, Difficulty, Rarity};
use crate::rarity::{rarity_border_width, rarity_color};

pub const CENTER_X: f64 = 400.0;
pub const CENTER_Y: f64 = 300.0;

const BASE_RING: f64 = 100.0;
const RING_STEP: f64 = 50.0;
const RING_COUNT: usize = 3;
const ANGLE_STEP: f64 = 0.3;
const MAX_ANGLE_OFFSET: f64 = PI / 6.0;

/// Sector angle per category (radians), indexed by `Category::index`.
const CATEGORY_ANGLES: [f64; 7] = [
  0.0,              // Sciences
  PI / 3.0,         // Mathematics
  2.0 * PI / 3.0,   // Technology
  PI,               // Humanities
  4.0 * PI / 3.0,   // Arts
  5.0 * PI / 3.0,   // Skills
  11.0 * PI / 6.0,  // Languages
];

/// Fill color per category, indexed by `Category::index`.
const CATEGORY_COLORS: [&str; 7] = [
  "#3b82f6", // blue
  "#10b981", // green
  "#8b5cf6", // purple
  "#f59e0b", // yellow
  "#ec4899", // pink
  "#f97316", // orange
  "#ef4444", // red
];

pub fn category_angle(category: Category) -> f64 {
  CATEGORY_ANGLES[category.index()]
}

pub fn category_color(category: Category) -> &'static str {
  CATEGORY_COLORS[category.index()]
}

/// Drawn radius of a node; harder sessions make bigger stars.
pub fn node_radius(difficulty: Difficulty) -> f64 {
  8.0 + difficulty.level() as f64 * 3.0
}

/// Position of the next node given how many nodes already exist.
pub fn node_position(category: Category, existing: usize) -> (f64, f64) {
  let radius = BASE_RING + (existing % RING_COUNT) as f64 * RING_STEP;
  let offset = (existing as f64 * ANGLE_STEP) % MAX_ANGLE_OFFSET;
  let angle = category_angle(category) + offset;
  (CENTER_X + radius * angle.cos(), CENTER_Y + radius * angle.sin())
}

/// Ids of existing nodes whose topic matches one of `related_topics`
/// (case-insensitive, surrounding whitespace ignored).
pub fn find_connections(existing: &[ConstellationNode], related_topics: &[String]) -> Vec<String> {
  let wanted: Vec<String> = related_topics
    .iter()
    .map(|t| t.trim().to_lowercase())
    .filter(|t| !t.is_empty())
    .collect();
  existing
    .iter()
    .filter(|n| wanted.contains(&n.topic.trim().to_lowercase()))
    .map(|n| n.id.clone())
    .collect()
}

/// A node plus the drawing hints a client needs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
  #[serde(flatten)]
  pub node: ConstellationNode,
  pub radius: f64,
  pub fill_color: &'static str,
  pub border_color: &'static str,
  pub border_width: u8,
}

impl From<ConstellationNode> for NodeView {
  fn from(node: ConstellationNode) -> Self {
    let rarity: Rarity = node.rarity;
    Self {
      radius: node_radius(node.difficulty),
      fill_color: category_color(node.category),
      border_color: rarity_color(rarity),
      border_width: rarity_border_width(rarity),
      node,
    }
  }
}
