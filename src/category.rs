//! CCG categories: atoms like `NP` or `S[dcl]` and slashed functors like
//! `(S[dcl]\NP)/NP`. Every category is interned, so cloning is cheap and
//! equality is usually a pointer comparison.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use regex::Regex;

use crate::error::Error;

pub const ISCONJMASK: u32 = 0x0000_0001;
pub const FEATURE_CONJ: u32 = 0x0000_0002;
pub const FEATURE_ADJ: u32 = 0x0000_0004;
pub const FEATURE_PSS: u32 = 0x0000_0008;
pub const FEATURE_NG: u32 = 0x0000_0010;
pub const FEATURE_EM: u32 = 0x0000_0020;
pub const FEATURE_DCL: u32 = 0x0000_0040;
pub const FEATURE_TO: u32 = 0x0000_0080;
pub const FEATURE_B: u32 = 0x0000_0100;
pub const FEATURE_BEM: u32 = 0x0000_0100;
pub const FEATURE_ASUP: u32 = 0x0000_0200;
pub const FEATURE_FOR: u32 = 0x0000_0400;
pub const FEATURE_POSS: u32 = 0x0000_0800;
pub const FEATURE_PT: u32 = 0x0000_1000;
pub const FEATURE_Q: u32 = 0x0000_2000;
pub const FEATURE_WQ: u32 = 0x0000_4000;
pub const FEATURE_QEM: u32 = 0x0000_8000;
pub const FEATURE_INV: u32 = 0x0001_0000;
pub const FEATURE_NUM: u32 = 0x0002_0000;

pub const FEATURE_VARG: u32 =
  FEATURE_PSS | FEATURE_NG | FEATURE_EM | FEATURE_DCL | FEATURE_TO | FEATURE_B | FEATURE_BEM;
pub const FEATURE_VRES: u32 = FEATURE_NG | FEATURE_EM | FEATURE_DCL | FEATURE_B | FEATURE_BEM;

const FEATURE_TABLE: [(&str, u32); 17] = [
  ("[conj]", FEATURE_CONJ),
  ("[adj]", FEATURE_ADJ),
  ("[pss]", FEATURE_PSS),
  ("[ng]", FEATURE_NG),
  ("[em]", FEATURE_EM),
  ("[dcl]", FEATURE_DCL),
  ("[to]", FEATURE_TO),
  ("[b]", FEATURE_B),
  ("[bem]", FEATURE_BEM),
  ("[asup]", FEATURE_ASUP),
  ("[for]", FEATURE_FOR),
  ("[poss]", FEATURE_POSS),
  ("[pt]", FEATURE_PT),
  ("[q]", FEATURE_Q),
  ("[wq]", FEATURE_WQ),
  ("[qem]", FEATURE_QEM),
  ("[inv]", FEATURE_INV),
];

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

regex_static!(SIMPLIFY_NP, r"NP\[(?:nb|conj)\]");
regex_static!(SIMPLIFY_S, r"S\[([a-z]+|X)\]");
regex_static!(N_TO_NP, r"N(\\|/|\)|$)");
regex_static!(CLEAN_PREDARG1, r":[A-Z]|\{_\*\}");
regex_static!(CLEAN_PREDARG2, r"\)_\d+");
regex_static!(CLEAN_PREDARG3, r"_\d+");
regex_static!(TRAILING_FUNCTOR_TAG, r"^.*\)_(\d+)$");
regex_static!(FEATURE, r"\[([a-z]+|X)\]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slash {
  /// `/`, takes its argument from the right
  Fwd,
  /// `\`, takes its argument from the left
  Bwd,
}

impl Slash {
  pub fn as_char(self) -> char {
    match self {
      Slash::Fwd => '/',
      Slash::Bwd => '\\',
    }
  }
}

impl fmt::Display for Slash {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.as_char())
  }
}

#[derive(Debug)]
struct CatInner {
  signature: String,
  features: u32,
  split: Option<(Category, Slash, Category)>,
}

/// An interned CCG category.
#[derive(Clone)]
pub struct Category(Arc<CatInner>);

lazy_static! {
  static ref CACHE: RwLock<HashMap<String, Category>> = RwLock::new(HashMap::new());
  pub static ref CAT_EMPTY: Category = Category(Arc::new(CatInner {
    signature: String::new(),
    features: 0,
    split: None,
  }));
}

fn extract_features(signature: &str) -> u32 {
  let mut features = FEATURE_TABLE
    .iter()
    .filter(|(f, _)| signature.contains(f))
    .fold(0, |acc, (_, bit)| acc | bit);
  if signature.contains("[num]") {
    features |= FEATURE_NUM;
  }
  if signature.starts_with("conj") {
    features |= ISCONJMASK;
  }
  features
}

/// Finds the top level slash scanning from the right, returning the raw result
/// text, the slash, and the raw argument text.
fn split_raw(signature: &str) -> Option<(&str, Slash, &str)> {
  let mut depth = 0i32;
  for (i, c) in signature.char_indices().rev() {
    match c {
      ')' => depth += 1,
      '(' => depth -= 1,
      '/' | '\\' if depth == 0 => {
        let slash = if c == '/' { Slash::Fwd } else { Slash::Bwd };
        return Some((&signature[..i], slash, &signature[i + 1..]));
      }
      _ => {}
    }
  }
  None
}

fn strip_result(ret: &str) -> &str {
  if ret.len() >= 2 && ret.starts_with('(') && ret.ends_with(')') {
    &ret[1..ret.len() - 1]
  } else {
    ret
  }
}

fn strip_argument(arg: &str) -> &str {
  if arg.starts_with('(') {
    if arg.len() >= 2 && arg.ends_with(')') {
      &arg[1..arg.len() - 1]
    } else if arg.len() >= 8 && arg.ends_with(")[conj]") {
      &arg[1..arg.len() - 7]
    } else {
      arg
    }
  } else if let Some(a) = arg.strip_suffix("[conj]") {
    a
  } else {
    arg
  }
}

fn is_function_signature(signature: &str) -> bool {
  signature.contains('/') || signature.contains('\\')
}

fn join_signature(left: &str, slash: Slash, right: &str) -> String {
  let wrap = |s: &str| {
    if is_function_signature(s) {
      format!("({})", s)
    } else {
      s.to_string()
    }
  };
  format!("{}{}{}", wrap(left), slash, wrap(right))
}

fn validate(signature: &str) -> Result<(), Error> {
  let bad = || Error::CategoryParse(signature.to_string());
  if signature.is_empty() || signature.chars().any(char::is_whitespace) {
    return Err(bad());
  }
  let mut depth = 0i32;
  for c in signature.chars() {
    match c {
      '(' => depth += 1,
      ')' => {
        depth -= 1;
        if depth < 0 {
          return Err(bad());
        }
      }
      _ => {}
    }
  }
  if depth != 0 {
    return Err(bad());
  }
  if let Some((ret, _, arg)) = split_raw(signature) {
    let (ret, arg) = (strip_result(ret), strip_argument(arg));
    if ret.is_empty() || arg.is_empty() {
      return Err(bad());
    }
    validate(ret)?;
    validate(arg)?;
  }
  Ok(())
}

impl Category {
  /// Parses and interns a category signature.
  pub fn parse(signature: &str) -> Result<Self, Error> {
    if signature.is_empty() {
      return Err(Error::CategoryParse(String::new()));
    }
    if let Some(c) = Self::lookup(signature) {
      return Ok(c);
    }
    validate(signature)?;
    Ok(Self::intern(signature))
  }

  fn lookup(signature: &str) -> Option<Self> {
    if signature.is_empty() {
      return Some(CAT_EMPTY.clone());
    }
    CACHE.read().ok().and_then(|c| c.get(signature).cloned())
  }

  /// Interns a signature that is known to be well formed.
  pub(crate) fn intern(signature: &str) -> Self {
    if let Some(c) = Self::lookup(signature) {
      return c;
    }
    let split = split_raw(signature).map(|(ret, slash, arg)| {
      (
        Self::intern(strip_result(ret)),
        slash,
        Self::intern(strip_argument(arg)),
      )
    });
    let cat = Category(Arc::new(CatInner {
      signature: signature.to_string(),
      features: extract_features(signature),
      split,
    }));
    match CACHE.write() {
      Ok(mut cache) => cache.entry(signature.to_string()).or_insert(cat).clone(),
      Err(_) => cat,
    }
  }

  /// Builds `left slash right`. An empty argument leaves `left` unchanged.
  pub fn combine(left: &Category, slash: Slash, right: &Category) -> Self {
    if right.isempty() {
      return left.clone();
    }
    Self::intern(&join_signature(left.signature(), slash, right.signature()))
  }

  pub fn signature(&self) -> &str {
    &self.0.signature
  }

  pub fn features(&self) -> u32 {
    self.0.features
  }

  pub fn isempty(&self) -> bool {
    self.0.signature.is_empty()
  }

  pub fn isfunctor(&self) -> bool {
    self.0.split.is_some()
  }

  pub fn isatom(&self) -> bool {
    !self.isfunctor() && !self.isempty()
  }

  pub fn slash(&self) -> Option<Slash> {
    self.0.split.as_ref().map(|(_, s, _)| *s)
  }

  pub fn isarg_right(&self) -> bool {
    self.slash() == Some(Slash::Fwd)
  }

  pub fn isarg_left(&self) -> bool {
    self.slash() == Some(Slash::Bwd)
  }

  /// The result of a functor, or the empty category for atoms.
  pub fn result_category(&self) -> Category {
    match &self.0.split {
      Some((r, _, _)) => r.clone(),
      None => CAT_EMPTY.clone(),
    }
  }

  /// The argument of a functor, or the empty category for atoms.
  pub fn argument_category(&self) -> Category {
    match &self.0.split {
      Some((_, _, a)) => a.clone(),
      None => CAT_EMPTY.clone(),
    }
  }

  pub fn ispunct(&self) -> bool {
    matches!(self.signature(), "," | "." | ":" | ";" | "LRB" | "RRB" | "LQU" | "RQU")
  }

  pub fn ismodifier(&self) -> bool {
    match &self.0.split {
      Some((r, _, a)) => r == a,
      None => false,
    }
  }

  pub fn isconj(&self) -> bool {
    self.has_any_features(ISCONJMASK | FEATURE_CONJ)
  }

  /// `X|(X|Y)`
  pub fn istype_raised(&self) -> bool {
    let arg = self.argument_category();
    arg.isfunctor() && arg.result_category() == self.result_category()
  }

  pub fn isbackward_type_raised(&self) -> bool {
    self.isarg_left() && self.istype_raised()
  }

  pub fn isforward_type_raised(&self) -> bool {
    self.isarg_right() && self.istype_raised()
  }

  /// True if the result of all applications is an `S[?]` type.
  pub fn issentence(&self) -> bool {
    !self.isempty() && CAT_SANY.ismember(&self.final_result())
  }

  pub fn has_all_features(&self, features: u32) -> bool {
    features != 0 && (self.0.features & features) == features
  }

  pub fn has_any_features(&self, features: u32) -> bool {
    (self.0.features & features) != 0
  }

  /// The innermost result, `X` in `X|Y|Z`.
  pub fn final_result(&self) -> Category {
    let mut cat = self.clone();
    while let Some((r, _, _)) = &cat.0.split {
      let next = r.clone();
      cat = next;
    }
    cat
  }

  /// Number of curried scopes.
  pub fn get_scope_count(&self) -> usize {
    let mut n = 0;
    let mut cat = self.clone();
    while cat.isfunctor() {
      cat = cat.result_category();
      n += 1;
    }
    n
  }

  /// Removes `[nb]` and `[conj]` from noun phrases and the features of every
  /// `S` except `S[adj]`, then rewrites `N` as `NP` so categories can be
  /// matched loosely.
  pub fn simplify(&self) -> Category {
    let sig = SIMPLIFY_NP.replace_all(self.signature(), "NP");
    let sig = SIMPLIFY_S.replace_all(&sig, |caps: &regex::Captures| {
      if &caps[1] == "adj" {
        caps[0].to_string()
      } else {
        "S".to_string()
      }
    });
    let sig = N_TO_NP.replace_all(&sig, "NP${1}");
    Self::intern(&sig)
  }

  /// Removes predicate-argument tags. A deep clean also strips the tags on
  /// atoms, otherwise only functor tags are removed.
  pub fn clean(&self, deep: bool) -> Category {
    let sig = if deep {
      CLEAN_PREDARG3.replace_all(self.signature(), "").into_owned()
    } else {
      CLEAN_PREDARG2.replace_all(self.signature(), ")").into_owned()
    };
    let mut sig = CLEAN_PREDARG1.replace_all(&sig, "").into_owned();
    while split_raw(&sig).is_none() && sig.len() >= 2 && sig.starts_with('(') && sig.ends_with(')')
    {
      sig = sig[1..sig.len() - 1].to_string();
    }
    Self::intern(&sig)
  }

  /// Adds predicate-argument tags, counting up from `tag`, to atoms that do
  /// not already carry one. Atoms of a modifier that are spelled the same
  /// share a tag.
  pub fn complete_tags(&self, tag: usize) -> Category {
    let mut next = tag;
    let mut seen: HashMap<String, String> = HashMap::new();
    let ismod = self.ismodifier();
    let sig = retag(self.signature(), &mut |atom: &str| {
      let cat = Category::intern(atom);
      if cat.clean(true) != cat {
        return atom.to_string();
      }
      if ismod {
        if let Some(s) = seen.get(atom) {
          return s.clone();
        }
      }
      let s = format!("{}_{}", atom, next);
      next += 1;
      seen.insert(atom.to_string(), s.clone());
      s
    });
    if next == tag {
      self.clone()
    } else {
      Self::intern(&sig)
    }
  }

  /// Splits `(X)_k` into `X` and the tag `k`.
  pub fn trim_functor_tag(&self) -> (Category, Option<usize>) {
    let sig = self.signature();
    if !self.isfunctor() && sig.starts_with('(') {
      if let Some(caps) = TRAILING_FUNCTOR_TAG.captures(sig) {
        let tag = &caps[1];
        if let Ok(k) = tag.parse() {
          return (Self::intern(&sig[1..sig.len() - tag.len() - 2]), Some(k));
        }
      }
    }
    (self.clone(), None)
  }

  /// Removes the `[X]` wildcard.
  pub fn remove_wildcards(&self) -> Category {
    if self.signature().contains("[X]") {
      Self::intern(&self.signature().replace("[X]", ""))
    } else {
      self.clone()
    }
  }

  /// Removes every feature bracket.
  pub fn remove_features(&self) -> Category {
    Self::intern(&FEATURE.replace_all(self.signature(), ""))
  }

  pub fn remove_conj_feature(&self) -> Category {
    Self::intern(&self.signature().replace("[conj]", ""))
  }

  /// Adds `[conj]` to the entity atom a conjunction of this category would join.
  pub fn add_conj_feature(&self) -> Category {
    if self.has_any_features(FEATURE_CONJ) {
      return self.clone();
    }
    if self.isatom() {
      if is_entity_atom(self) {
        return Self::intern(&format!("{}[conj]", self.signature()));
      }
      return self.clone();
    }
    let mut args = Vec::new();
    let mut cat = self.clone();
    while let Some((r, s, a)) = cat.0.split.clone() {
      args.push((r, s));
      cat = a;
      if !cat.isfunctor() || cat.simplify().can_unify(&CAT_VP) {
        break;
      }
    }
    if cat.isatom() && is_entity_atom(&cat) {
      let mut cat = Self::intern(&format!("{}[conj]", cat.signature()));
      while let Some((r, s)) = args.pop() {
        cat = Self::combine(&r, s, &cat);
      }
      return cat;
    }
    self.clone()
  }

  /// Atoms grouped by functor scope: argument atoms first, then each curried
  /// argument's atoms, finally the innermost result on its own.
  pub fn extract_unify_atoms(&self) -> Vec<Vec<Category>> {
    if self.isempty() {
      return Vec::new();
    }
    let mut atoms = Vec::new();
    let mut cat = self.clone();
    while let Some((r, _, a)) = cat.0.split.clone() {
      atoms.push(a.extract_unify_atoms_flat());
      cat = r;
    }
    atoms.push(vec![cat]);
    atoms
  }

  /// Atoms in argument-before-result order, flattened.
  pub fn extract_unify_atoms_flat(&self) -> Vec<Category> {
    fn helper(cat: &Category, atoms: &mut Vec<Category>) {
      match &cat.0.split {
        Some((r, _, a)) => {
          helper(a, atoms);
          helper(r, atoms);
        }
        None => {
          if !cat.isempty() {
            atoms.push(cat.clone())
          }
        }
      }
    }
    let mut atoms = Vec::new();
    helper(self, &mut atoms);
    atoms
  }

  fn slash_string(&self) -> String {
    fn helper(cat: &Category, out: &mut String) {
      if let Some((r, s, a)) = &cat.0.split {
        helper(a, out);
        out.push(s.as_char());
        helper(r, out);
      }
    }
    let mut out = String::new();
    helper(self, &mut out);
    out
  }

  /// Atom level unification: identical atoms, any pair of entity atoms,
  /// and the sentence feature equivalences `S ~ S[*]`, `S[b] ~ S[to]`,
  /// `S[dcl] ~ S[em]` and the `S[X]` wildcard.
  pub fn can_unify_atom(&self, other: &Category) -> bool {
    if !self.isatom() || !other.isatom() {
      return false;
    }
    if self == other {
      return true;
    }
    if is_entity_atom(&self.remove_features()) && is_entity_atom(&other.remove_features()) {
      return true;
    }
    let s1 = self.remove_conj_feature();
    let s2 = other.remove_conj_feature();
    let (a, b) = (s1.signature(), s2.signature());
    if a == b || (a.starts_with('N') && b.starts_with('N')) {
      return true;
    }
    if a.starts_with('S') && b.starts_with('S') {
      let o = other.signature();
      return a.len() == 1
        || b.len() == 1
        || (a == "S[to]" && o == "S[b]")
        || (a == "S[b]" && o == "S[to]")
        || (a == "S[dcl]" && b == "S[em]")
        || (a == "S[em]" && b == "S[dcl]")
        || a == "S[X]"
        || b == "S[X]";
    }
    false
  }

  /// Functors unify when their atoms unify scope by scope and their slashes
  /// agree. Atoms use [`Category::can_unify_atom`].
  pub fn can_unify(&self, other: &Category) -> bool {
    if self.isfunctor() && other.isfunctor() {
      let fa = self.extract_unify_atoms();
      let ga = other.extract_unify_atoms();
      if fa.len() != ga.len() {
        return false;
      }
      for (f, g) in fa.iter().zip(ga.iter()) {
        if f.len() != g.len() || f.iter().zip(g.iter()).any(|(a, b)| !a.can_unify_atom(b)) {
          return false;
        }
      }
      return self.slash_string() == other.slash_string();
    }
    self.can_unify_atom(other)
  }

  /// True if some result on the way to the final atom is a modifier.
  pub fn test_returns_modifier(&self) -> bool {
    let mut result = self.clone();
    while result.isfunctor() {
      result = result.result_category();
      if result.ismodifier() {
        return true;
      }
    }
    false
  }

  /// True if the functor ends in a `PP` that is not reached through a modifier.
  pub fn test_returns_preposition(&self) -> bool {
    if *self == *CAT_POSSESSIVE_ARGUMENT || *self == *CAT_POSSESSIVE_PRONOUN {
      return true;
    }
    let mut result = self.clone();
    let mut ismod = false;
    while result.isfunctor() {
      ismod = result.ismodifier();
      result = result.result_category();
    }
    !ismod && result == *CAT_PP
  }

  /// True for `(N|N)$`, `(NP|NP)$`, `(PP|PP)$`, `(NP|PP)$` and `(PP|NP)$`.
  pub fn test_returns_entity_modifier(&self) -> bool {
    let mut result = self.clone();
    while result.isfunctor() {
      let next = result.result_category();
      if next.isatom() && is_entity_atom(&next) && is_entity_atom(&result.argument_category()) {
        return true;
      }
      result = next;
    }
    false
  }

  pub fn test_return(&self, result: &Category, exact: bool) -> bool {
    self.test_return_and_get(result, exact).is_some()
  }

  /// Returns self or the first result matching `result`.
  pub fn test_return_and_get(&self, result: &Category, exact: bool) -> Option<Category> {
    let mut cat = self.clone();
    loop {
      if (exact && cat == *result) || (!exact && cat.can_unify(result)) {
        return Some(cat);
      }
      if !cat.isfunctor() {
        return None;
      }
      cat = cat.result_category();
    }
  }
}

fn is_entity_atom(cat: &Category) -> bool {
  matches!(cat.signature(), "N" | "NP" | "PP")
}

/// Rewrites each atom of `signature`, visiting arguments before results,
/// and keeps the original bracketing.
fn retag(signature: &str, f: &mut dyn FnMut(&str) -> String) -> String {
  fn side(raw: &str, inner: &str, f: &mut dyn FnMut(&str) -> String) -> String {
    // `inner` is always a subslice of `raw`
    let start = inner.as_ptr() as usize - raw.as_ptr() as usize;
    let prefix = &raw[..start];
    let suffix = &raw[start + inner.len()..];
    format!("{}{}{}", prefix, retag(inner, f), suffix)
  }
  match split_raw(signature) {
    Some((ret, slash, arg)) => {
      let a = side(arg, strip_argument(arg), f);
      let r = side(ret, strip_result(ret), f);
      format!("{}{}{}", r, slash, a)
    }
    None if signature.is_empty() => String::new(),
    None => f(signature),
  }
}

impl PartialEq for Category {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.0, &other.0) || self.0.signature == other.0.signature
  }
}

impl Eq for Category {}

impl Hash for Category {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.0.signature.hash(state)
  }
}

impl PartialOrd for Category {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Category {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    self.0.signature.cmp(&other.0.signature)
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self.0.signature)
  }
}

impl fmt::Debug for Category {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "Category({})", self.0.signature)
  }
}

impl FromStr for Category {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

/// A class of categories defined by a regular expression over the signature.
pub struct CategoryClass(Regex);

impl CategoryClass {
  fn new(pattern: &str) -> Self {
    Self(Regex::new(pattern).unwrap())
  }

  pub fn ismember(&self, cat: &Category) -> bool {
    self.0.is_match(cat.signature())
  }
}

macro_rules! categories {
  ($($name:ident = $sig:expr;)*) => {
    lazy_static! {
      $(pub static ref $name: Category = Category::intern($sig);)*
    }
  };
}

categories! {
  CAT_PP = "PP";
  CAT_NP = "NP";
  CAT_N = "N";
  CAT_POSSESSIVE_ARGUMENT = r"(NP/(N/PP))\NP";
  CAT_POSSESSIVE_PRONOUN = "NP/(N/PP)";
  CAT_NUM = "N[num]";
  CAT_NPCONJ = "NP[conj]";
  CAT_NCONJ = "N[conj]";
  CAT_COMMA = ",";
  CAT_CONJ = "conj";
  CAT_CONJ_CONJ = r"conj\conj";
  CAT_CONJCONJ = "conj/conj";
  CAT_LQU = "LQU";
  CAT_RQU = "RQU";
  CAT_LRB = "LRB";
  CAT_RRB = "RRB";
  CAT_NPTHR = "NP[thr]";
  CAT_NPEXPL = "NP[expl]";
  CAT_PR = "PR";
  CAT_PREPOSITION = "PP/NP";
  CAT_SEMICOLON = ";";
  CAT_SADJ = "S[adj]";
  CAT_SDCL = "S[dcl]";
  CAT_SEM = "S[em]";
  CAT_SQ = "S[q]";
  CAT_SB = "S[b]";
  CAT_STO = "S[to]";
  CAT_SWQ = "S[wq]";
  CAT_SFOR = "S[for]";
  CAT_SX = "S[X]";
  CAT_ADVERB = r"(S\NP)\(S\NP)";
  CAT_MODAL = r"(S\NP)/(S\NP)";
  CAT_S = "S";
  CAT_ADJECTIVE = "N/N";
  CAT_DETERMINER = "NP[nb]/N";
  CAT_INFINITIVE = r"(S[to]\NP)/(S[b]\NP)";
  CAT_PPNP = "PP/NP";
  CAT_VP = r"S\NP";
  CAT_VPDCL = r"S[dcl]\NP";
  CAT_VPB = r"S[b]\NP";
  CAT_VPTO = r"S[to]\NP";
  CAT_AP = r"S[adj]\NP";
  CAT_TV = r"(S\NP)/NP";
  CAT_DTV = r"((S\NP)/NP)/NP";
  CAT_COPULAR_DCL = r"(S[dcl]\NP)/(S[adj]\NP)";
  CAT_COPULAR_B = r"(S[b]\NP)/(S[adj]\NP)";
  CAT_ESRL_PP = r"(NP\NP)/NP";
  CAT_PP_ADVP = r"((S\NP)\(S\NP))/NP";
  CAT_VP_MOD = r"(S\NP)\(S\NP)";
  CAT_AP_PP = r"(S[adj]\NP)/PP";
  CAT_MODAL_PAST = r"(S[dcl]\NP)/(S[pt]\NP)";
  CAT_IF_THEN = r"(S/S)/S[dcl]";
  CAT_S_S = r"S\S";
  CAT_SS = "S/S";
  CAT_VPMODX = r"(S[X]\NP)/(S[X]\NP)";
  CAT_VP_MODX = r"(S[X]\NP)\(S[X]\NP)";
  CAT_VPX = r"S[X]\NP";
}

lazy_static! {
  pub static ref CAT_NOUN: CategoryClass = CategoryClass::new(r"^N(?:\[[a-z]+\])?$");
  pub static ref CAT_NP_N: CategoryClass = CategoryClass::new(r"^NP(?:\[[a-z]+\])?/N$");
  pub static ref CAT_NP_NP: CategoryClass = CategoryClass::new(r"^NP(?:\[[a-z]+\])?/NP$");
  pub static ref CAT_SANY: CategoryClass = CategoryClass::new(r"^S(?:\[[a-z]+\])?$");
}

pub fn is_copular(cat: &Category) -> bool {
  *cat == *CAT_COPULAR_DCL || *cat == *CAT_COPULAR_B
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cat(s: &str) -> Category {
    Category::parse(s).unwrap()
  }

  #[test]
  fn test_split() {
    let c = cat(r"(S[dcl]\NP)/NP");
    assert!(c.isfunctor());
    assert!(c.isarg_right());
    assert_eq!(c.result_category(), cat(r"S[dcl]\NP"));
    assert_eq!(c.argument_category(), *CAT_NP);
    assert!(c.has_all_features(FEATURE_DCL));

    let c = cat(r"S[dcl]\NP[conj]");
    assert_eq!(c.argument_category(), *CAT_NP);
    assert!(c.has_any_features(FEATURE_CONJ));

    let c = cat(r"(S_1\NP_2)_1");
    assert!(c.isatom());
    assert_eq!(c.trim_functor_tag(), (cat(r"S_1\NP_2"), Some(1)));
  }

  #[test]
  fn test_parse_errors() {
    assert!(Category::parse("(S\\NP").is_err());
    assert!(Category::parse("S\\").is_err());
    assert!(Category::parse("").is_err());
    assert!(Category::parse("NP NP").is_err());
  }

  #[test]
  fn test_round_trip() {
    for s in [
      "NP",
      r"(S[dcl]\NP)/(S[b]\NP)",
      r"((S\NP)\(S\NP))/NP",
      "NP[nb]/N",
      r"(NP/(N/PP))\NP",
      r"conj\conj",
    ] {
      let c = cat(s);
      assert_eq!(c.to_string(), s);
      assert_eq!(cat(&c.to_string()), c);
    }
  }

  #[test]
  fn test_atom_arity() {
    for s in [r"(S[dcl]\NP)/NP", r"((S\NP)\(S\NP))/NP", "NP[nb]/N", r"(S\NP)/(S\NP)"] {
      let c = cat(s);
      assert_eq!(c.extract_unify_atoms().len(), c.get_scope_count() + 1);
    }
    let c = cat(r"((S\NP)\(S\NP))/NP");
    let atoms = c.extract_unify_atoms();
    assert_eq!(atoms[0], vec![cat("NP")]);
    assert_eq!(atoms[1], vec![cat("NP"), cat("S")]);
    assert_eq!(atoms[2], vec![cat("NP")]);
    assert_eq!(atoms[3], vec![cat("S")]);
    assert_eq!(c.extract_unify_atoms_flat().len(), 5);
  }

  #[test]
  fn test_unify() {
    let sigs = ["NP", "N", "PP", "S", "S[dcl]", "S[em]", "S[b]", "S[to]", "S[X]", "S[adj]", "conj"];
    for a in sigs.iter() {
      let a = cat(a);
      assert!(a.can_unify(&a));
      for b in sigs.iter() {
        let b = cat(b);
        assert_eq!(a.can_unify(&b), b.can_unify(&a), "{} {}", a, b);
      }
    }
    assert!(cat("NP").can_unify(&cat("N")));
    assert!(cat("S[dcl]").can_unify(&cat("S[em]")));
    assert!(cat("S[b]").can_unify(&cat("S[to]")));
    assert!(!cat("S[dcl]").can_unify(&cat("S[b]")));
    assert!(cat("S[X]").can_unify(&cat("S[pss]")));
    assert!(!cat("NP").can_unify(&cat("S")));
    assert!(cat(r"S[dcl]\NP").can_unify(&cat(r"S\NP")));
    assert!(!cat(r"S[dcl]\NP").can_unify(&cat(r"S/NP")));
    assert!(!cat(r"(S\NP)/NP").can_unify(&cat(r"S\NP")));
  }

  #[test]
  fn test_simplify_and_features() {
    assert_eq!(cat(r"(S[dcl]\NP[nb])/N").simplify(), cat(r"(S\NP)/NP"));
    assert_eq!(cat(r"S[adj]\NP").simplify(), cat(r"S[adj]\NP"));
    assert_eq!(cat("N[num]").simplify(), cat("N[num]"));
    assert_eq!(cat(r"(S[dcl]\NP)/(S[b]\NP)").remove_features(), cat(r"(S\NP)/(S\NP)"));
    assert_eq!(cat(r"S[X]\NP").remove_wildcards(), cat(r"S\NP"));
    assert!(cat("conj").isconj());
    assert!(cat("NP[conj]").isconj());
    assert!(!cat("NP").isconj());
  }

  #[test]
  fn test_conj_feature() {
    assert_eq!(cat("NP").add_conj_feature(), cat("NP[conj]"));
    assert_eq!(cat("NP[conj]").remove_conj_feature(), cat("NP"));
    assert_eq!(cat(r"(S\NP)/NP").add_conj_feature(), cat(r"(S\NP)/NP[conj]"));
    assert_eq!(cat(r"S\NP").add_conj_feature(), cat(r"S\NP[conj]"));
    assert_eq!(cat("S").add_conj_feature(), cat("S"));
  }

  #[test]
  fn test_clean_and_tags() {
    assert_eq!(cat(r"(S[dcl]_1\NP_2)/NP_3").clean(true), cat(r"(S[dcl]\NP)/NP"));
    assert_eq!(cat(r"((S_1\NP_2)_1/NP_3)").clean(false).signature(), r"(S_1\NP_2)/NP_3");
    assert_eq!(cat(r"(S\NP)/NP").complete_tags(900), cat(r"(S_902\NP_901)/NP_900"));
    assert_eq!(cat(r"(S\NP)\(S\NP)").complete_tags(900), cat(r"(S_901\NP_900)\(S_901\NP_900)"));
    assert_eq!(cat(r"(S_1\NP_2)/NP").complete_tags(900), cat(r"(S_1\NP_2)/NP_900"));
  }

  #[test]
  fn test_predicates() {
    assert!(cat(r"(S\NP)\(S\NP)").ismodifier());
    assert!(cat(r"S/(S\NP)").istype_raised());
    assert!(cat(r"S/(S\NP)").isforward_type_raised());
    assert!(cat(r"(S[dcl]\NP)/NP").issentence());
    assert!(!cat("NP/N").issentence());
    assert!(cat("PP/NP").test_returns_preposition());
    assert!(cat(r"(NP/(N/PP))\NP").test_returns_preposition());
    assert!(!cat(r"(PP\PP)/NP").test_returns_preposition());
    assert!(cat(r"((S\NP)\(S\NP))/NP").test_returns_modifier());
    assert!(cat(r"(NP\NP)/NP").test_returns_entity_modifier());
    assert_eq!(
      cat(r"((S\NP)\(S\NP))/NP").test_return_and_get(&CAT_VP_MOD, true),
      Some(cat(r"(S\NP)\(S\NP)"))
    );
    assert!(cat(",").ispunct());
    assert!(CAT_NOUN.ismember(&cat("N[num]")));
    assert!(CAT_NP_N.ismember(&cat("NP[nb]/N")));
  }
}
