//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// Single pass: placeholders inside substituted values are left as they are.
/// Unknown keys stay verbatim.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let hit = after.find('}').and_then(|close| {
      let key = &after[..close];
      pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| (*v, close))
    });
    match hit {
      Some((value, close)) => {
        out.push_str(value);
        rest = &after[close + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

/// Lowercased alphanumeric words of at least `min_len` characters.
pub fn words(s: &str, min_len: usize) -> Vec<String> {
  s.split(|c: char| !c.is_alphanumeric())
    .filter(|w| w.chars().count() >= min_len)
    .map(|w| w.to_lowercase())
    .collect()
}

/// Log-safe truncation for large strings, cut on a char boundary.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  match s.char_indices().nth(max) {
    None => s.to_string(),
    Some((idx, _)) => format!("{}… ({} bytes total)", &s[..idx], s.len()),
  }
}
