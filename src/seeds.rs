//! Built-in fallback content that keeps the app usable without OpenAI:
//! templated explanations, a heuristic explanation grader, a generic quiz and
//! lightning bank, a templated vault entry and keyword categorization.

use crate::domain::{Category, Difficulty, LearningSession, LightningStatement, QuizQuestion};
use crate::openai::{vault_template_pairs, Categorization, Evaluation, MAX_ARTICULATION_SCORE, MIN_ARTICULATION_SCORE};
use crate::util::{fill_template, words};

pub fn local_explanation(topic: &str, difficulty: Difficulty) -> String {
  format!(
    "# {topic}\n\n\
     *Offline mode: pitched at {context}.*\n\n\
     1. **Definition.** Write down, in one sentence, what {topic} is and what problem it addresses.\n\
     2. **Core principles.** List the two or three ideas everything else in {topic} builds on.\n\
     3. **Examples.** Find one everyday example and one professional application.\n\
     4. **Terminology.** Collect five terms an expert in {topic} would use and define each.\n\
     5. **Misconceptions.** Note one thing people commonly get wrong about {topic} and why.\n",
    topic = topic.trim(),
    context = difficulty.info().teaching_context,
  )
}

/// Heuristic 1..=10 grade: rewards length, sentence structure and mentioning
/// the topic's own terms.
pub fn local_evaluation(topic: &str, explanation: &str) -> Evaluation {
  let text = explanation.trim();
  let word_count = words(text, 1).len();
  let sentences = text.split(['.', '!', '?']).filter(|s| !s.trim().is_empty()).count();
  let topic_terms = words(topic, 3);
  let answer_terms = words(text, 3);
  let covered = topic_terms.iter().filter(|t| answer_terms.contains(t)).count();

  let mut score = MIN_ARTICULATION_SCORE;
  let mut notes = vec![];

  if word_count >= 20 { score += 2.0; } else { notes.push("Too short: aim for at least a few sentences."); }
  if word_count >= 60 { score += 2.0; } else if word_count >= 20 { notes.push("Add more detail and an example."); }
  if word_count >= 120 { score += 1.0; }
  if sentences >= 3 { score += 1.0; } else { notes.push("Structure the answer as several sentences."); }
  if !topic_terms.is_empty() {
    score += 3.0 * covered as f64 / topic_terms.len() as f64;
    if covered < topic_terms.len() { notes.push("Refer to the topic by name and use its key terms."); }
  } else {
    score += 1.5;
  }

  let score = (score.clamp(MIN_ARTICULATION_SCORE, MAX_ARTICULATION_SCORE) * 10.0).round() / 10.0;
  let mut feedback = if notes.is_empty() { "Solid explanation.".to_string() } else { notes.join(" ") };
  feedback.push_str(&format!(" (offline score: {:.1}/10)", score));
  Evaluation { score, feedback }
}

const QUIZ_BANK: &[(&str, [&str; 4], usize)] = &[
  ("What is the best first step when learning {topic}?",
   ["Memorize every detail", "Understand the core definition", "Skip to advanced material", "Avoid examples"], 1),
  ("Which habit best deepens understanding of {topic}?",
   ["Explaining it in your own words", "Re-reading passively", "Highlighting everything", "Studying only once"], 0),
  ("A misconception about {topic} is best corrected by:",
   ["Ignoring it", "Repeating it", "Comparing it with evidence", "Asking nobody"], 2),
  ("Real-world examples of {topic} mainly help to:",
   ["Fill time", "Connect ideas to practice", "Replace definitions", "Avoid terminology"], 1),
  ("Which shows mastery of {topic}?",
   ["Reciting a definition", "Recognizing the name", "Applying it to a new problem", "Owning a book on it"], 2),
  ("Key terminology in {topic} matters because it:",
   ["Sounds impressive", "Enables precise communication", "Is always optional", "Replaces understanding"], 1),
  ("When two sources disagree about {topic}, you should:",
   ["Pick the longer one", "Check their evidence and context", "Give up", "Trust the newest blindly"], 1),
  ("Spaced review of {topic} works because it:",
   ["Strengthens recall over time", "Saves no time", "Only helps experts", "Replaces practice"], 0),
  ("Breaking {topic} into smaller parts helps by:",
   ["Hiding connections", "Making each idea manageable", "Adding confusion", "Removing the need to review"], 1),
  ("Teaching {topic} to someone else mostly reveals:",
   ["Gaps in your own understanding", "Nothing new", "That it is trivial", "Only their gaps"], 0),
];

const LIGHTNING_BANK: &[(&str, bool)] = &[
  ("Explaining {topic} in your own words is a good test of understanding.", true),
  ("Memorizing definitions alone guarantees mastery of {topic}.", false),
  ("Examples make the principles of {topic} easier to remember.", true),
  ("Every expert agrees on every detail of {topic}.", false),
  ("Knowing the terminology of {topic} helps when reading further material.", true),
  ("Misconceptions about {topic} disappear on their own without review.", false),
  ("Connecting {topic} to related subjects strengthens recall.", true),
  ("You can fully understand {topic} without ever applying it.", false),
  ("Reviewing {topic} after a few days improves retention.", true),
  ("Advanced material on {topic} never depends on its basics.", false),
];

/// `count` generic questions, cycling through the bank when it runs out.
pub fn local_quiz(topic: &str, count: usize) -> Vec<QuizQuestion> {
  QUIZ_BANK
    .iter()
    .cycle()
    .take(count)
    .map(|(q, options, correct)| QuizQuestion {
      question: fill_template(q, &[("topic", topic)]),
      options: options.iter().map(|o| o.to_string()).collect(),
      correct_answer: *correct,
      user_answer: None,
    })
    .collect()
}

pub fn local_lightning(topic: &str, count: usize) -> Vec<LightningStatement> {
  LIGHTNING_BANK
    .iter()
    .cycle()
    .take(count)
    .map(|(s, is_true)| LightningStatement {
      statement: fill_template(s, &[("topic", topic)]),
      is_true: *is_true,
      user_answer: None,
    })
    .collect()
}

const LOCAL_VAULT_TEMPLATE: &str = "# {topic}\n\n\
  | Field | Value |\n|---|---|\n\
  | Category | {category} |\n| Difficulty | {difficulty_name} |\n\
  | Rarity | {rarity} |\n| Final score | {final_score}/10 |\n\n\
  ## Trial results\n\n{trials_summary}\n";

pub fn local_vault_entry(session: &LearningSession) -> String {
  let values = vault_template_pairs(session);
  let mut out = fill_template(LOCAL_VAULT_TEMPLATE, &values.as_pairs());
  if !session.ai_explanation.trim().is_empty() {
    out.push_str("\n## Explanation\n\n");
    out.push_str(session.ai_explanation.trim());
    out.push('\n');
  }
  let answer = session.trials.articulation.text.trim();
  if !answer.is_empty() {
    out.push_str("\n## In my own words\n\n");
    out.push_str(answer);
    out.push('\n');
  }
  out
}

/// Keywords per category, in `Category::ALL` order.
const CATEGORY_KEYWORDS: [&[&str]; 7] = [
  &["physics", "chemistry", "biology", "astronomy", "geology", "ecology", "quantum", "cell", "evolution", "photosynthesis", "climate", "atom", "genetics"],
  &["math", "mathematics", "algebra", "calculus", "geometry", "statistics", "probability", "theorem", "topology", "number", "equation", "matrix"],
  &["programming", "software", "computer", "rust", "python", "network", "database", "algorithm", "internet", "machine", "ai", "blockchain", "cloud"],
  &["history", "philosophy", "psychology", "economics", "politics", "sociology", "religion", "ethics", "law", "war", "empire", "stoicism"],
  &["art", "music", "painting", "poetry", "film", "literature", "design", "sculpture", "dance", "theater", "photography", "jazz"],
  &["cooking", "negotiation", "leadership", "writing", "public", "speaking", "fitness", "gardening", "productivity", "finance", "budgeting", "chess"],
  &["spanish", "french", "german", "japanese", "chinese", "mandarin", "latin", "grammar", "language", "vocabulary", "linguistics", "english"],
];

/// Keyword vote; ties go to the earlier category, no hits go to `Skills`.
pub fn local_categorization(topic: &str) -> Categorization {
  let terms = words(topic, 2);
  let best = Category::ALL
    .iter()
    .map(|c| {
      let hits = CATEGORY_KEYWORDS[c.index()].iter().filter(|k| terms.iter().any(|t| t.as_str() == **k)).count();
      (*c, hits)
    })
    .filter(|(_, hits)| *hits > 0)
    .fold(None::<(Category, usize)>, |best, cur| match best {
      Some(b) if b.1 >= cur.1 => Some(b),
      _ => Some(cur),
    });
  Categorization { category: best.map(|b| b.0).unwrap_or_default(), connections: vec![] }
}
