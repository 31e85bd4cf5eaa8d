use std::fmt;

/// A Penn Treebank part-of-speech tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos(String);

pub const TAGS: [&str; 44] = [
  "CC", "CD", "DT", "EX", "FW", "IN", "JJ", "JJR", "JJS", "LS", "MD", "NN", "NNS", "NNP", "NNPS",
  "PDT", "POS", "PRP", "PRP$", "RB", "RBR", "RBS", "RP", "SYM", "TO", "UH", "VB", "VBD", "VBG",
  "VBN", "VBP", "VBZ", "WDT", "WP", "WP$", "WRB", "UNKNOWN", ",", ".", ":", ";", "?", "$", "SO",
];

impl Pos {
  pub fn new(tag: &str) -> Self {
    Self(tag.to_string())
  }

  pub fn unknown() -> Self {
    Self::new("UNKNOWN")
  }

  pub fn tag(&self) -> &str {
    &self.0
  }

  pub fn isknown(&self) -> bool {
    TAGS.contains(&self.tag())
  }

  pub fn is(&self, tag: &str) -> bool {
    self.0 == tag
  }

  pub fn is_verb(&self) -> bool {
    matches!(self.tag(), "VB" | "VBD" | "VBN" | "VBP" | "VBZ")
  }

  pub fn is_gerund(&self) -> bool {
    self.is("VBG")
  }

  pub fn is_adjective(&self) -> bool {
    matches!(self.tag(), "JJ" | "JJR" | "JJS")
  }

  pub fn is_pronoun(&self) -> bool {
    matches!(self.tag(), "PRP" | "PRP$" | "WP" | "WP$")
  }

  pub fn is_person_pronoun(&self) -> bool {
    matches!(self.tag(), "PRP" | "PRP$")
  }

  pub fn is_proper_noun(&self) -> bool {
    matches!(self.tag(), "NNP" | "NNPS")
  }

  pub fn is_noun(&self) -> bool {
    matches!(self.tag(), "NN" | "NNS" | "NNP" | "NNPS")
  }

  pub fn is_plural(&self) -> bool {
    matches!(self.tag(), "NNS" | "NNPS")
  }

  pub fn is_punct(&self) -> bool {
    matches!(self.tag(), "," | "." | "?" | ":" | ";")
  }

  pub fn is_modal(&self) -> bool {
    self.is("MD")
  }

  pub fn is_number(&self) -> bool {
    self.is("CD")
  }

  pub fn is_preposition(&self) -> bool {
    self.is("IN")
  }

  pub fn is_possessive(&self) -> bool {
    self.is("POS")
  }

  pub fn is_determiner(&self) -> bool {
    self.is("DT")
  }
}

impl fmt::Display for Pos {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[test]
fn test_pos_classes() {
  assert!(Pos::new("VBZ").is_verb());
  assert!(!Pos::new("VBG").is_verb());
  assert!(Pos::new("VBG").is_gerund());
  assert!(Pos::new("NNPS").is_proper_noun());
  assert!(Pos::new("NNPS").is_plural());
  assert!(Pos::new("PRP$").is_person_pronoun());
  assert!(Pos::new(",").is_punct());
  assert!(!Pos::new("XYZ").isknown());
}
