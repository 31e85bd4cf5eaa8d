use regex::{Captures, Regex};
/// Recursive-descent reader for CCGbank derivations:
///
/// ```text
/// tree = '(' '<T' cat head arity '>' tree+ ')'
/// leaf = '(' '<L' cat modPOS origPOS word predArgCat '>' ')'
/// ```
use std::fmt;
use std::str::FromStr;

use crate::category::{CAT_CONJ, Category};
use crate::error::Error;

/// A parsed derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PTree {
  Node(PNode),
  Leaf(PLeaf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PNode {
  pub category: Category,
  /// Which child is the lexical head, 0 or 1.
  pub head: usize,
  pub children: Vec<PTree>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PLeaf {
  pub category: Category,
  pub modpos: String,
  pub origpos: String,
  pub word: String,
  /// The category with predicate-argument tags, e.g. `(S[dcl]\NP_3)/NP_4`.
  pub predarg: Category,
}

type ParseResult<'a, T> = Result<(T, &'a str), Error>;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

fn bad(what: &str, s: &str) -> Error {
  let at: String = s.chars().take(40).collect();
  Error::DerivationParse(format!("expected {} at `{}`", what, at))
}

/// Try to consume a regex anchored at the start of `s`
fn optional_re<'a>(re: &'static Regex, s: &'a str) -> (Option<Captures<'a>>, &'a str) {
  match re.captures(s) {
    Some(caps) => match caps.get(0) {
      Some(m) if m.start() == 0 => {
        let rest = &s[m.end()..];
        (Some(caps), rest)
      }
      _ => (None, s),
    },
    None => (None, s),
  }
}

/// Try to consume a regex, failing if it doesn't match
fn needed_re<'a>(re: &'static Regex, what: &str, s: &'a str) -> ParseResult<'a, Captures<'a>> {
  match optional_re(re, s) {
    (Some(caps), rest) => Ok((caps, rest)),
    (None, _) => Err(bad(what, s)),
  }
}

fn needed_char(c: char, s: &str) -> ParseResult<'_, char> {
  match s.strip_prefix(c) {
    Some(rest) => Ok((c, rest)),
    None => Err(bad(&format!("`{}`", c), s)),
  }
}

/// Skips whitespace and `ID=...` header lines
fn skip_whitespace(s: &str) -> &str {
  regex_static!(WHITESPACE_OR_HEADER, r"(?:\s+|ID=[^\n]*(?:\n|$))+");
  optional_re(&WHITESPACE_OR_HEADER, s).1
}

fn parse_category(sig: &str) -> Result<Category, Error> {
  Category::parse(sig).map_err(|e| Error::DerivationParse(e.to_string()))
}

fn parse_leaf(s: &str) -> ParseResult<'_, PLeaf> {
  regex_static!(LEAF, r"<L\s+([^>]*?)\s*>");
  let (caps, s) = needed_re(&LEAF, "a leaf `<L ...>`", s)?;
  let fields: Vec<&str> = caps[1].split_whitespace().collect();
  let (cat, modpos, origpos, word, predarg) = match fields.as_slice() {
    [cat, modpos, origpos, word, predarg] => (*cat, *modpos, *origpos, *word, *predarg),
    // some parsers drop the predicate-argument category
    [cat, modpos, origpos, word] => (*cat, *modpos, *origpos, *word, *cat),
    _ => return Err(bad("5 leaf fields", &caps[0])),
  };
  let leaf = PLeaf {
    category: parse_category(cat)?,
    modpos: modpos.to_string(),
    origpos: origpos.to_string(),
    word: word.to_string(),
    predarg: parse_category(predarg)?,
  };
  Ok((leaf, s))
}

fn parse_node_header(s: &str) -> ParseResult<'_, (Category, usize, usize)> {
  regex_static!(NODE, r"<T\s+(\S+)\s+(\d+)\s+(\d+)\s*>");
  let (caps, s) = needed_re(&NODE, "a node `<T cat head arity>`", s)?;
  let category = parse_category(&caps[1])?;
  let head: usize = caps[2].parse().map_err(|_| bad("a head index", &caps[0]))?;
  let arity: usize = caps[3].parse().map_err(|_| bad("an arity", &caps[0]))?;
  if head > 1 || !(1..=2).contains(&arity) {
    return Err(Error::DerivationParse(format!(
      "bad node header `{}`: head must be 0 or 1, arity 1 or 2",
      &caps[0]
    )));
  }
  Ok(((category, head, arity), s))
}

fn parse_tree(s: &str) -> ParseResult<'_, PTree> {
  let (_, s) = needed_char('(', s)?;
  let s = skip_whitespace(s);
  let (tree, s) = if s.starts_with("<L") {
    let (leaf, s) = parse_leaf(s)?;
    (PTree::Leaf(leaf), s)
  } else {
    let ((category, head, arity), mut s) = parse_node_header(s)?;
    let mut children = Vec::with_capacity(arity);
    loop {
      s = skip_whitespace(s);
      if !s.starts_with('(') {
        break;
      }
      let (child, rest) = parse_tree(s)?;
      children.push(child);
      s = rest;
    }
    if children.len() != arity {
      return Err(Error::DerivationParse(format!(
        "node {} declares {} children, found {}",
        category,
        arity,
        children.len()
      )));
    }
    if head >= children.len() {
      return Err(Error::DerivationParse(format!(
        "node {} has head {} but {} children",
        category,
        head,
        children.len()
      )));
    }
    (
      PTree::Node(PNode {
        category,
        head,
        children,
      }),
      s,
    )
  };
  let s = skip_whitespace(s);
  let (_, s) = needed_char(')', s)?;
  Ok((tree, s))
}

/// Parses one CCGbank derivation, as written by the LDC AUTO files or by
/// EasySRL with `--ccgbank`.
pub fn parse_ccg_derivation(s: &str) -> Result<PTree, Error> {
  let (tree, rest) = parse_tree(skip_whitespace(s))?;
  let rest = skip_whitespace(rest);
  if !rest.is_empty() {
    return Err(bad("end of derivation", rest));
  }
  Ok(tree)
}

impl FromStr for PTree {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    parse_ccg_derivation(s)
  }
}

impl PTree {
  pub fn category(&self) -> &Category {
    match self {
      PTree::Node(n) => &n.category,
      PTree::Leaf(l) => &l.category,
    }
  }

  /// Leaves, left to right.
  pub fn leaves(&self) -> Vec<&PLeaf> {
    let mut out = Vec::new();
    let mut stk = vec![self];
    while let Some(t) = stk.pop() {
      match t {
        PTree::Node(n) => stk.extend(n.children.iter().rev()),
        PTree::Leaf(l) => out.push(l),
      }
    }
    out
  }

  /// The tagged categories of functor leaves, skipping the conjunction
  /// functors. Feed these to `Model::with_predarg_templates`.
  pub fn predarg_categories(&self) -> Vec<Category> {
    self
      .leaves()
      .into_iter()
      .filter(|l| {
        let c = &l.category;
        c.isfunctor() && c.result_category() != *CAT_CONJ && c.argument_category() != *CAT_CONJ
      })
      .filter(|l| l.predarg.clean(true) == l.category)
      .map(|l| l.predarg.clone())
      .collect()
  }

  fn fmt_indented(&self, depth: usize, pretty: bool, out: &mut String) {
    let indent = if pretty { "  ".repeat(depth) } else { String::new() };
    let sep = if pretty { "\n" } else { " " };
    match self {
      PTree::Leaf(l) => out.push_str(&format!(
        "{}(<L {} {} {} {} {}>)",
        indent, l.category, l.modpos, l.origpos, l.word, l.predarg
      )),
      PTree::Node(n) => {
        out.push_str(&format!(
          "{}(<T {} {} {}>",
          indent,
          n.category,
          n.head,
          n.children.len()
        ));
        for c in n.children.iter() {
          out.push_str(sep);
          c.fmt_indented(depth + 1, pretty, out);
        }
        out.push_str(sep);
        out.push_str(&indent);
        out.push(')');
      }
    }
  }

  /// Writes the derivation back out, one node per line when `pretty`.
  pub fn to_ccgbank(&self, pretty: bool) -> String {
    let mut out = String::new();
    self.fmt_indented(0, pretty, &mut out);
    out
  }
}

impl fmt::Display for PTree {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.to_ccgbank(false))
  }
}

/// The sentence a derivation covers.
///
/// ```
/// let pt = ccg2drs::parse_ccg_derivation(
///   "(<T S[dcl] 1 2> (<L NP PRP PRP He NP>) (<T S[dcl]\\NP 0 2> \
///    (<L S[dcl]\\NP VBZ VBZ runs S[dcl]\\NP>) (<L . . . . .>) ) )",
/// ).unwrap();
/// assert_eq!(ccg2drs::sentence_from_pt(&pt), "He runs.");
/// ```
pub fn sentence_from_pt(pt: &PTree) -> String {
  let words: Vec<&str> = pt.leaves().iter().map(|l| l.word.as_str()).collect();
  words.join(" ").replace(" ,", ",").replace(" .", ".")
}

#[cfg(test)]
mod tests {
  use super::*;

  const BUS: &str = r"
ID=wsj_0001.1 PARSER=GOLD NUMPARSE=1
(<T S[dcl] 1 2>
  (<T NP 0 2>
    (<L NP/N DT DT The NP_1/N_1>)
    (<T N 1 2>
      (<L N/N NN NN school N_2/N_2>)
      (<L N NN NN bus N>)
    )
  )
  (<T S[dcl]\NP 0 2>
    (<L (S[dcl]\NP)/PP VBZ VBZ wheezes (S[dcl]\NP_3)/PP_4>)
    (<T PP 0 2>
      (<L PP/NP TO TO to PP/NP>)
      (<T NP 0 2>
        (<L NP/N PRP$ PRP$ my NP/N>)
        (<L N NN NN corner. N>)
      )
    )
  )
)";

  #[test]
  fn test_parse() {
    let pt = parse_ccg_derivation(BUS).unwrap();
    assert_eq!(pt.category().signature(), "S[dcl]");
    let leaves = pt.leaves();
    assert_eq!(leaves.len(), 7);
    assert_eq!(leaves[0].word, "The");
    assert_eq!(leaves[0].modpos, "DT");
    assert_eq!(leaves[0].predarg.signature(), "NP_1/N_1");
    assert_eq!(leaves[3].category.signature(), r"(S[dcl]\NP)/PP");
    match &pt {
      PTree::Node(n) => {
        assert_eq!(n.head, 1);
        assert_eq!(n.children.len(), 2);
      }
      PTree::Leaf(_) => panic!("expected a node"),
    }
  }

  #[test]
  fn test_sentence() {
    let pt = parse_ccg_derivation(BUS).unwrap();
    assert_eq!(sentence_from_pt(&pt), "The school bus wheezes to my corner.");
  }

  #[test]
  fn test_reemit() {
    let pt = parse_ccg_derivation(BUS).unwrap();
    let line = pt.to_string();
    assert!(line.starts_with("(<T S[dcl] 1 2> (<T NP 0 2> (<L NP/N DT DT The NP_1/N_1>)"));
    assert_eq!(parse_ccg_derivation(&line).unwrap(), pt);
    assert_eq!(parse_ccg_derivation(&pt.to_ccgbank(true)).unwrap(), pt);
  }

  #[test]
  fn test_predarg_categories() {
    let pt = parse_ccg_derivation(BUS).unwrap();
    let cats: Vec<String> = pt
      .predarg_categories()
      .iter()
      .map(|c| c.to_string())
      .collect();
    assert!(cats.contains(&r"(S[dcl]\NP_3)/PP_4".to_string()));
    assert!(cats.contains(&"N_2/N_2".to_string()));
    assert!(!cats.iter().any(|c| c == "N"));
  }

  #[test]
  fn test_errors() {
    assert!(matches!(
      parse_ccg_derivation("(<T S 0 2> (<L NP NNP NNP John NP>))"),
      Err(Error::DerivationParse(_))
    ));
    assert!(parse_ccg_derivation("(<L NP NNP NNP John NP>) junk").is_err());
    assert!(parse_ccg_derivation("(<T S 2 1> (<L NP NNP NNP John NP>))").is_err());
    assert!(parse_ccg_derivation("(<L NP NNP>)").is_err());
    assert!(parse_ccg_derivation("(<L NP NNP NNP John>)").is_ok());
  }
}
