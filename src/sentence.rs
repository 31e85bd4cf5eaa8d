//! Read-only views over a composed sentence: index spans, typed
//! constituents, and the dependency and constituent trees.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use crate::category::{
  CAT_AP, CAT_NP, CAT_PP, CAT_SANY, CAT_VP, CAT_VPB, CAT_VPDCL, CAT_VPTO, Category, FEATURE_BEM,
  FEATURE_DCL, FEATURE_EM, FEATURE_Q, FEATURE_QEM, FEATURE_WQ,
};
use crate::drs::{Condition, Drs, DrsRef};
use crate::lexeme::Lexeme;

/// A sorted set of lexeme indexes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Span(Vec<usize>);

impl Span {
  pub fn new(indexes: impl IntoIterator<Item = usize>) -> Self {
    let mut v: Vec<usize> = indexes.into_iter().collect();
    v.sort_unstable();
    v.dedup();
    Self(v)
  }

  pub fn empty() -> Self {
    Self(Vec::new())
  }

  pub fn single(idx: usize) -> Self {
    Self(vec![idx])
  }

  /// The contiguous span `[begin, end)`.
  pub fn range(begin: usize, end: usize) -> Self {
    Self((begin..end).collect())
  }

  pub fn isempty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn indexes(&self) -> &[usize] {
    &self.0
  }

  pub fn iter(&self) -> impl DoubleEndedIterator<Item = usize> + '_ {
    self.0.iter().copied()
  }

  pub fn first(&self) -> Option<usize> {
    self.0.first().copied()
  }

  pub fn last(&self) -> Option<usize> {
    self.0.last().copied()
  }

  pub fn has(&self, idx: usize) -> bool {
    self.0.binary_search(&idx).is_ok()
  }

  /// True when `other` is non-empty and every index of it is in this span.
  pub fn contains(&self, other: &Span) -> bool {
    !other.isempty() && other.0.iter().all(|i| self.has(*i))
  }

  pub fn union(&self, other: &Span) -> Span {
    Span::new(self.0.iter().chain(other.0.iter()).copied())
  }

  pub fn intersection(&self, other: &Span) -> Span {
    Span(self.0.iter().copied().filter(|i| other.has(*i)).collect())
  }

  pub fn difference(&self, other: &Span) -> Span {
    Span(self.0.iter().copied().filter(|i| !other.has(*i)).collect())
  }

  pub fn add(&mut self, idx: usize) {
    if let Err(pos) = self.0.binary_search(&idx) {
      self.0.insert(pos, idx);
    }
  }

  pub fn remove(&mut self, idx: usize) {
    if let Ok(pos) = self.0.binary_search(&idx) {
      self.0.remove(pos);
    }
  }

  pub fn clear(&mut self) {
    self.0.clear();
  }

  /// The smallest contiguous span that covers this one.
  pub fn fullspan(&self) -> Span {
    match (self.first(), self.last()) {
      (Some(a), Some(b)) => Span::range(a, b + 1),
      _ => Span::empty(),
    }
  }

  /// Lexemes that have some bit of `required` and no bit of `excluded`.
  pub fn subspan(&self, lexemes: &[Lexeme], required: u64, excluded: u64) -> Span {
    Span(
      self
        .iter()
        .filter(|i| {
          let m = lexemes[*i].mask;
          (m & required) != 0 && (m & excluded) == 0
        })
        .collect(),
    )
  }

  /// Words joined by spaces, except before punctuation.
  pub fn text(&self, lexemes: &[Lexeme]) -> String {
    let mut txt = String::new();
    for (n, i) in self.iter().enumerate() {
      let lx = &lexemes[i];
      if n != 0 && !lx.ispunct() {
        txt.push(' ');
      }
      txt.push_str(&lx.word);
    }
    txt
  }

  /// Lexemes whose head lies outside the span. When not strict, a lexeme
  /// only counts if no lexeme further up its head chain is in the span.
  pub fn get_head_span(&self, lexemes: &[Lexeme], strict: bool) -> Span {
    if self.len() <= 1 {
      return self.clone();
    }
    let mut hds = Vec::new();
    for i in self.iter() {
      let lx = &lexemes[i];
      if lx.isroot() {
        hds.push(i);
      } else if !self.has(lx.head) {
        if strict {
          hds.push(i);
          continue;
        }
        let mut hd = &lexemes[lx.head];
        let mut seen = HashSet::new();
        while !self.has(hd.head) && !hd.isroot() && seen.insert(hd.idx) {
          hd = &lexemes[hd.head];
        }
        if !self.has(hd.head) {
          hds.push(i);
        }
      }
    }
    Span::new(hds)
  }

  /// Concatenates the DRS of every lexeme in the span. Lexemes under a
  /// proposition go into a `p: [..]` box where the first of them appears.
  pub fn get_drs(&self, lexemes: &[Lexeme]) -> Drs {
    let idx: Vec<usize> = self.iter().collect();
    boxed_drs(lexemes, &idx, 0)
  }

  /// Applies an index remapping, dropping indexes that map to `None`.
  pub fn remap(&self, idxmap: &[Option<usize>]) -> Span {
    Span::new(self.iter().filter_map(|i| idxmap.get(i).copied().flatten()))
  }
}

fn boxed_drs(lexemes: &[Lexeme], idx: &[usize], depth: usize) -> Drs {
  let mut d = Drs::default();
  let mut boxed: Vec<&DrsRef> = Vec::new();
  for &i in idx {
    let lx = &lexemes[i];
    match lx.props.get(depth) {
      Some(p) if boxed.contains(&p) => {}
      Some(p) => {
        boxed.push(p);
        let inner: Vec<usize> = idx
          .iter()
          .copied()
          .filter(|&j| lexemes[j].props.get(depth) == Some(p))
          .collect();
        d.universe.push(p.clone());
        d.conditions.push(Condition::Prop(p.clone(), boxed_drs(lexemes, &inner, depth + 1)));
      }
      None => {
        if let Some(ld) = &lx.drs {
          d.universe.extend(ld.universe.iter().cloned());
          d.conditions.extend(ld.conditions.iter().cloned());
        }
      }
    }
  }
  d
}

impl PartialOrd for Span {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

/// Lexicographic on indexes, except that when one span is a prefix of the
/// other the longer span sorts first. Parents therefore precede children.
impl Ord for Span {
  fn cmp(&self, other: &Self) -> Ordering {
    for (i, j) in self.0.iter().zip(other.0.iter()) {
      if i != j {
        return i.cmp(j);
      }
    }
    other.len().cmp(&self.len())
  }
}

impl FromIterator<usize> for Span {
  fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
    Span::new(iter)
  }
}

/// Phrase label of a syntax-tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstituentType {
  NP,
  VP,
  PP,
  ADVP,
  ADJP,
  SINF,
  SDCL,
  SEM,
  SQ,
  SWQ,
  S,
  /// Not a phrase.
  NODE,
}

impl ConstituentType {
  pub fn signature(self) -> &'static str {
    match self {
      Self::NP => "NP",
      Self::VP => "VP",
      Self::PP => "PP",
      Self::ADVP => "ADVP",
      Self::ADJP => "ADJP",
      Self::SINF => "S_INF",
      Self::SDCL => "S_DCL",
      Self::SEM => "S_EM",
      Self::SQ => "S_Q",
      Self::SWQ => "S_WQ",
      Self::S => "S",
      Self::NODE => "NODE",
    }
  }

  /// Any of the sentence types.
  pub fn issentence(self) -> bool {
    matches!(
      self,
      Self::SINF | Self::SDCL | Self::SEM | Self::SQ | Self::SWQ | Self::S
    )
  }

  /// The phrase type a production of category `cat` stands for.
  pub fn from_category(cat: &Category) -> Option<Self> {
    if *cat == *CAT_NP {
      Some(Self::NP)
    } else if *cat == *CAT_PP {
      Some(Self::PP)
    } else if *cat == *CAT_VPDCL || *cat == *CAT_VP {
      Some(Self::VP)
    } else if *cat == *CAT_VPB || *cat == *CAT_VPTO {
      Some(Self::SINF)
    } else if *cat == *CAT_AP {
      Some(Self::ADJP)
    } else if cat.isatom() && CAT_SANY.ismember(cat) {
      Some(if cat.has_any_features(FEATURE_DCL) {
        Self::SDCL
      } else if cat.has_any_features(FEATURE_EM | FEATURE_BEM) {
        Self::SEM
      } else if cat.has_any_features(FEATURE_QEM | FEATURE_Q) {
        Self::SQ
      } else if cat.has_any_features(FEATURE_WQ) {
        Self::SWQ
      } else {
        Self::S
      })
    } else {
      None
    }
  }
}

impl fmt::Display for ConstituentType {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.signature())
  }
}

/// A typed phrase. `chead` is the index of the enclosing constituent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constituent {
  pub span: Span,
  pub vntype: ConstituentType,
  pub head: usize,
  pub chead: Option<usize>,
}

impl Constituent {
  pub fn new(span: Span, vntype: ConstituentType, head: usize) -> Self {
    Self {
      span,
      vntype,
      head,
      chead: None,
    }
  }

  pub fn text(&self, lexemes: &[Lexeme]) -> String {
    self.span.text(lexemes)
  }

  /// `VNTYPE(text)`, as printed by the command line driver.
  pub fn show(&self, lexemes: &[Lexeme]) -> String {
    format!("{}({})", self.vntype, self.text(lexemes))
  }
}

impl PartialOrd for Constituent {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Constituent {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .span
      .cmp(&other.span)
      .then_with(|| self.vntype.cmp(&other.vntype))
  }
}

/// An adjacency list node of the dependency or constituent tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
  pub idx: usize,
  pub children: Vec<TreeNode>,
}

fn build_tree(idx: usize, parents: &[Option<usize>], seen: &mut HashSet<usize>) -> TreeNode {
  seen.insert(idx);
  let children = parents
    .iter()
    .enumerate()
    .filter(|(i, p)| **p == Some(idx) && *i != idx && !seen.contains(i))
    .map(|(i, _)| i)
    .collect::<Vec<_>>();
  TreeNode {
    idx,
    children: children
      .into_iter()
      .map(|i| build_tree(i, parents, seen))
      .collect(),
  }
}

/// A composed sentence: its lexemes, constituents and final DRS.
#[derive(Debug, Clone, Default)]
pub struct Sentence {
  pub lexemes: Vec<Lexeme>,
  pub constituents: Vec<Constituent>,
  pub drs: Drs,
}

impl Sentence {
  pub fn new(lexemes: Vec<Lexeme>, constituents: Vec<Constituent>, drs: Drs) -> Self {
    Self {
      lexemes,
      constituents,
      drs,
    }
  }

  pub fn len(&self) -> usize {
    self.lexemes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lexemes.is_empty()
  }

  pub fn get_span(&self) -> Span {
    Span::range(0, self.lexemes.len())
  }

  pub fn text(&self) -> String {
    self.get_span().text(&self.lexemes)
  }

  pub fn span_text(&self, span: &Span) -> String {
    span.text(&self.lexemes)
  }

  /// Case-insensitive search for a contiguous run of words.
  pub fn find_span(&self, text: &str) -> Option<Span> {
    let words: Vec<String> = text.split_whitespace().map(|w| w.to_lowercase()).collect();
    if words.is_empty() || words.len() > self.lexemes.len() {
      return None;
    }
    (0..=self.lexemes.len() - words.len())
      .find(|&i| {
        words
          .iter()
          .enumerate()
          .all(|(k, w)| self.lexemes[i + k].word.to_lowercase() == *w)
      })
      .map(|i| Span::range(i, i + words.len()))
  }

  /// The smallest constituent that contains `span`.
  pub fn find_constituent(&self, span: &Span) -> Option<&Constituent> {
    self
      .constituents
      .iter()
      .filter(|c| c.span.contains(span))
      .min_by_key(|c| c.span.len())
  }

  /// Trees rooted at the lexemes that are their own head.
  pub fn get_dependency_tree(&self) -> Vec<TreeNode> {
    let parents: Vec<Option<usize>> = self.lexemes.iter().map(|lx| Some(lx.head)).collect();
    let mut seen = HashSet::new();
    self
      .lexemes
      .iter()
      .filter(|lx| lx.isroot())
      .map(|lx| build_tree(lx.idx, &parents, &mut seen))
      .collect()
  }

  /// Trees of constituent indexes rooted at constituents with no parent.
  pub fn get_constituent_tree(&self) -> Vec<TreeNode> {
    let parents: Vec<Option<usize>> = self.constituents.iter().map(|c| c.chead).collect();
    let mut seen = HashSet::new();
    (0..self.constituents.len())
      .filter(|i| parents[*i].is_none())
      .map(|i| build_tree(i, &parents, &mut seen))
      .collect()
  }

  pub fn dependency_tree_string(&self, tree: &[TreeNode]) -> String {
    let mut out = String::new();
    for t in tree {
      self.dependency_helper(t, 0, &mut out);
    }
    out
  }

  fn dependency_helper(&self, node: &TreeNode, level: usize, out: &mut String) {
    let lx = &self.lexemes[node.idx];
    out.push_str(&format!(
      "{}{:02} {:<4}({})\n",
      " ".repeat(level * 3),
      node.idx,
      lx.pos.tag(),
      lx.word
    ));
    for c in node.children.iter() {
      self.dependency_helper(c, level + 1, out);
    }
  }

  pub fn constituent_tree_string(&self, tree: &[TreeNode]) -> String {
    let mut out = String::new();
    for t in tree {
      self.constituent_helper(t, 0, &mut out);
    }
    out
  }

  fn constituent_helper(&self, node: &TreeNode, level: usize, out: &mut String) {
    let c = &self.constituents[node.idx];
    out.push_str(&format!(
      "{}{:02} {}({})\n",
      " ".repeat(level * 3),
      node.idx,
      c.vntype,
      c.text(&self.lexemes)
    ));
    for ch in node.children.iter() {
      self.constituent_helper(ch, level + 1, out);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::category::Category;
  use crate::lexeme::Lexeme;
  use crate::pos::Pos;

  fn lexemes(words: &[(&str, &str, usize)]) -> Vec<Lexeme> {
    words
      .iter()
      .enumerate()
      .map(|(i, (w, p, h))| {
        let mut lx = Lexeme::new(Category::parse("N").unwrap(), w, Pos::new(p), i);
        lx.head = *h;
        lx
      })
      .collect()
  }

  #[test]
  fn test_span_algebra() {
    let a = Span::new([3, 1, 2, 2]);
    let b = Span::new([2, 4]);
    assert_eq!(a.indexes(), &[1, 2, 3]);
    assert_eq!(a.union(&b), Span::new([1, 2, 3, 4]));
    assert_eq!(a.intersection(&b), Span::single(2));
    assert_eq!(a.difference(&b), Span::new([1, 3]));
    assert!(a.contains(&Span::new([1, 3])));
    assert!(!a.contains(&Span::empty()));
    assert_eq!(Span::new([1, 4]).fullspan(), Span::range(1, 5));
  }

  #[test]
  fn test_get_drs_boxes_propositions() {
    let x = DrsRef::entity;
    let mut lxs = lexemes(&[("John", "NNP", 1), ("says", "VBZ", 1), ("rain", "NN", 1)]);
    lxs[0].drs = Some(Drs::new(vec![x(1)], vec![Condition::rel("John", vec![x(1)])]));
    lxs[1].drs = Some(Drs::new(vec![], vec![Condition::rel("say", vec![x(1), x(3)])]));
    lxs[2].drs = Some(Drs::new(vec![x(2)], vec![Condition::rel("rain", vec![x(2)])]));
    lxs[2].props = vec![x(3)];
    let d = Span::range(0, 3).get_drs(&lxs);
    assert_eq!(d.to_string(), "[X1,X3| John(X1),say(X1,X3),X3: [X2| rain(X2)]]");
    assert_eq!(Span::single(2).get_drs(&lxs).to_string(), "[X3| X3: [X2| rain(X2)]]");
  }

  #[test]
  fn test_span_order() {
    let mut spans = vec![Span::range(2, 4), Span::range(0, 2), Span::range(0, 5), Span::single(3)];
    spans.sort();
    assert_eq!(
      spans,
      vec![Span::range(0, 5), Span::range(0, 2), Span::range(2, 4), Span::single(3)]
    );
  }

  #[test]
  fn test_text_and_heads() {
    // he(0) -> runs(1) root, fast(2) -> runs, .(3) -> runs
    let lx = lexemes(&[("He", "PRP", 1), ("runs", "VBZ", 1), ("fast", "RB", 1), (".", ".", 1)]);
    let sp = Span::range(0, 4);
    assert_eq!(sp.text(&lx), "He runs fast.");
    assert_eq!(sp.get_head_span(&lx, false), Span::single(1));
    assert_eq!(Span::new([0, 2]).get_head_span(&lx, true), Span::new([0, 2]));
  }

  #[test]
  fn test_sentence_views() {
    let lx = lexemes(&[("The", "DT", 1), ("boy", "NN", 2), ("ran", "VBD", 2)]);
    let mut np = Constituent::new(Span::range(0, 2), ConstituentType::NP, 1);
    np.chead = Some(0);
    let s = Constituent::new(Span::range(0, 3), ConstituentType::SDCL, 2);
    let sent = Sentence::new(lx, vec![s, np], Drs::default());
    assert_eq!(sent.find_span("the BOY"), Some(Span::range(0, 2)));
    assert_eq!(sent.find_span("girl"), None);
    assert_eq!(
      sent.find_constituent(&Span::single(1)).map(|c| c.vntype),
      Some(ConstituentType::NP)
    );
    let dtree = sent.get_dependency_tree();
    assert_eq!(dtree.len(), 1);
    assert_eq!(dtree[0].idx, 2);
    assert_eq!(
      sent.dependency_tree_string(&dtree),
      "02 VBD (ran)\n   01 NN  (boy)\n      00 DT  (The)\n"
    );
    let ctree = sent.get_constituent_tree();
    assert_eq!(
      sent.constituent_tree_string(&ctree),
      "00 S_DCL(The boy ran)\n   01 NP(The boy)\n"
    );
  }

  #[test]
  fn test_from_category() {
    let c = |s: &str| Category::parse(s).unwrap();
    assert_eq!(ConstituentType::from_category(&c("NP")), Some(ConstituentType::NP));
    assert_eq!(ConstituentType::from_category(&c(r"S[dcl]\NP")), Some(ConstituentType::VP));
    assert_eq!(ConstituentType::from_category(&c(r"S[to]\NP")), Some(ConstituentType::SINF));
    assert_eq!(ConstituentType::from_category(&c("S[dcl]")), Some(ConstituentType::SDCL));
    assert_eq!(ConstituentType::from_category(&c("S[wq]")), Some(ConstituentType::SWQ));
    assert_eq!(ConstituentType::from_category(&c("N")), None);
  }
}
