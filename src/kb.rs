//! Optional knowledge sources consulted while composing. Lookups may fail;
//! the composer logs the failure and carries on without the enrichment.

use std::collections::HashMap;
use std::fmt;

use crate::utils::Err;

/// VerbNet class membership by verb stem.
pub trait VerbNet {
  /// Class ids such as `give-13.1` for a stem, in VerbNet order.
  fn classes(&self, stem: &str) -> Result<Vec<String>, Err>;
}

/// A VerbNet that knows no verbs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVerbNet;

impl VerbNet for NullVerbNet {
  fn classes(&self, _stem: &str) -> Result<Vec<String>, Err> {
    Ok(Vec::new())
  }
}

/// An in-memory stem to class table.
#[derive(Debug, Default, Clone)]
pub struct VerbNetTable(HashMap<String, Vec<String>>);

impl VerbNetTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, stem: &str, class_id: &str) {
    self
      .0
      .entry(stem.to_string())
      .or_default()
      .push(class_id.to_string());
  }
}

impl<'a> FromIterator<(&'a str, &'a str)> for VerbNetTable {
  fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
    let mut t = Self::new();
    for (stem, id) in iter {
      t.insert(stem, id);
    }
    t
  }
}

impl VerbNet for VerbNetTable {
  fn classes(&self, stem: &str) -> Result<Vec<String>, Err> {
    Ok(self.0.get(stem).cloned().unwrap_or_default())
  }
}

/// A page returned by a wiki search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiPage {
  pub title: String,
  pub summary: String,
  pub url: String,
  pub categories: Vec<String>,
}

impl WikiPage {
  pub fn new(title: &str, url: &str) -> Self {
    Self {
      title: title.to_string(),
      summary: String::new(),
      url: url.to_string(),
      categories: Vec::new(),
    }
  }
}

impl fmt::Display for WikiPage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} <{}>", self.title, self.url)
  }
}

pub trait WikiSearch {
  /// Candidate pages for a query, best first.
  fn search(&self, query: &str) -> Result<Vec<WikiPage>, Err>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullWikiSearch;

impl WikiSearch for NullWikiSearch {
  fn search(&self, _query: &str) -> Result<Vec<WikiPage>, Err> {
    Ok(Vec::new())
  }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
  a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// Scores `pages` by how well their title words cover `words` and returns the
/// best page with a mean score of at least `threshold`, along with the
/// positions in `words` that matched it.
///
/// A word's score against a title is the longest common prefix with any
/// title word, relative to the word's length.
pub fn best_title_match<'p>(
  words: &[String],
  pages: &'p [WikiPage],
  threshold: f32,
) -> Option<(Vec<usize>, &'p WikiPage)> {
  if words.is_empty() {
    return None;
  }
  let mut best: Option<(f32, Vec<usize>, &WikiPage)> = None;
  for page in pages {
    let title = page.title.to_lowercase();
    let title: Vec<&str> = title.split_whitespace().collect();
    let scores: Vec<f32> = words
      .iter()
      .map(|w| {
        let n = w.chars().count().max(1) as f32;
        title
          .iter()
          .map(|t| common_prefix_len(w, t) as f32 / n)
          .fold(0.0, f32::max)
      })
      .collect();
    let mean = scores.iter().sum::<f32>() / scores.len() as f32;
    if mean >= threshold && best.as_ref().is_none_or(|(s, _, _)| mean > *s) {
      let hits = scores
        .iter()
        .enumerate()
        .filter(|(_, s)| **s > threshold / 2.0)
        .map(|(i, _)| i)
        .collect();
      best = Some((mean, hits, page));
    }
  }
  best.map(|(_, hits, page)| (hits, page))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_verbnet_table() {
    let vn: VerbNetTable = [("give", "give-13.1"), ("give", "contribute-13.2")].into_iter().collect();
    assert_eq!(vn.classes("give").unwrap(), vec!["give-13.1", "contribute-13.2"]);
    assert!(vn.classes("run").unwrap().is_empty());
    assert!(NullVerbNet.classes("give").unwrap().is_empty());
  }

  #[test]
  fn test_best_title_match() {
    let pages = vec![
      WikiPage::new("Elsevier", "https://en.wikipedia.org/wiki/Elsevier"),
      WikiPage::new("Elsevier N.V.", "https://en.wikipedia.org/wiki/Elsevier_N.V."),
      WikiPage::new("Dutch language", "https://en.wikipedia.org/wiki/Dutch_language"),
    ];
    let words = vec!["elsevier".to_string(), "n.v.".to_string()];
    let (hits, page) = best_title_match(&words, &pages, 0.7).unwrap();
    assert_eq!(page.title, "Elsevier N.V.");
    assert_eq!(hits, vec![0, 1]);

    let words = vec!["publishing".to_string()];
    assert!(best_title_match(&words, &pages, 0.7).is_none());
  }
}
