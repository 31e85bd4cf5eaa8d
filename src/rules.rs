use std::fmt;

use crate::category::{
  CAT_CONJ, CAT_CONJCONJ, CAT_CONJ_CONJ, CAT_EMPTY, CAT_NP_NP, CAT_NUM, Category, Slash,
};

/// How a combinator composes its productions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleClass {
  Application,
  Composition,
  GeneralizedComposition,
  Substitution,
  PassThrough,
  TypeRaise,
  TypeChange,
  Number,
}

/// A CCG combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rule {
  /// `X/Y:f Y:a => X: f(a)`
  FA,
  /// `Y:a X\Y:f => X: f(a)`
  BA,
  /// `X/Y:f Y/Z:g => X/Z`
  FC,
  /// `X/Y:f Y\Z:g => X\Z`
  FX,
  /// `Y\Z:g X\Y:f => X\Z`
  BC,
  /// `Y/Z:g X\Y:f => X/Z`
  BX,
  /// `X => T/(T\X)` or `X => T\(T/X)`
  TypeRaise,
  /// `X/Y:f (Y/Z)/$ => (X/Z)/$`
  GFC,
  /// `X/Y:f (Y\Z)$ => (X\Z)$`
  GFX,
  /// `(Y\Z)$ X\Y:f => (X\Z)$`
  GBC,
  /// `(Y/Z)/$ X\Y:f => (X/Z)/$`
  GBX,
  /// `(X/Y)/Z:f Y/Z:g => X/Z`
  FS,
  /// `Y\Z:g (X\Y)\Z:f => X\Z`
  BS,
  /// `(X/Y)\Z:f Y\Z:g => X\Z`
  FXS,
  /// `Y/Z:g (X\Y)/Z:f => X/Z`
  BXS,
  /// Punctuation on the right passes the left through.
  RP,
  /// Punctuation on the left passes the right through.
  LP,
  /// Structural no-op, only used after fixups.
  NOP,
  LConj,
  RConj,
  RNum,
  LNum,
  TcConj,
  TcAtom,
  TclUnary,
  TcrUnary,
}

impl Rule {
  pub const ALL: [Rule; 26] = [
    Self::FA,
    Self::BA,
    Self::FC,
    Self::FX,
    Self::BC,
    Self::BX,
    Self::TypeRaise,
    Self::GFC,
    Self::GFX,
    Self::GBC,
    Self::GBX,
    Self::FS,
    Self::BS,
    Self::FXS,
    Self::BXS,
    Self::RP,
    Self::LP,
    Self::NOP,
    Self::LConj,
    Self::RConj,
    Self::RNum,
    Self::LNum,
    Self::TcConj,
    Self::TcAtom,
    Self::TclUnary,
    Self::TcrUnary,
  ];

  /// Dense index of the rule.
  pub fn i(self) -> usize {
    self as usize
  }

  pub fn name(self) -> &'static str {
    match self {
      Self::FA => "FA",
      Self::BA => "BA",
      Self::FC => "FC",
      Self::FX => "FX",
      Self::BC => "BC",
      Self::BX => "BX",
      Self::TypeRaise => "TR",
      Self::GFC => "GFC",
      Self::GFX => "GFX",
      Self::GBC => "GBC",
      Self::GBX => "GBX",
      Self::FS => "FS",
      Self::BS => "BS",
      Self::FXS => "FXS",
      Self::BXS => "BXS",
      Self::RP => "RP",
      Self::LP => "LP",
      Self::NOP => "NOP",
      Self::LConj => "LCONJ",
      Self::RConj => "RCONJ",
      Self::RNum => "RNUM",
      Self::LNum => "LNUM",
      Self::TcConj => "CONJ_TC",
      Self::TcAtom => "ATOM_TC",
      Self::TclUnary => "L_UNARY_TC",
      Self::TcrUnary => "R_UNARY_TC",
    }
  }

  pub fn class(self) -> RuleClass {
    match self {
      Self::FA | Self::BA => RuleClass::Application,
      Self::FC | Self::FX | Self::BC | Self::BX => RuleClass::Composition,
      Self::GFC | Self::GFX | Self::GBC | Self::GBX => RuleClass::GeneralizedComposition,
      Self::FS | Self::BS | Self::FXS | Self::BXS => RuleClass::Substitution,
      Self::RP | Self::LP | Self::NOP | Self::LConj | Self::RConj => RuleClass::PassThrough,
      Self::TypeRaise => RuleClass::TypeRaise,
      Self::RNum | Self::LNum => RuleClass::Number,
      Self::TcConj | Self::TcAtom | Self::TclUnary | Self::TcrUnary => RuleClass::TypeChange,
    }
  }

  /// Applies the rule's category arithmetic. Returns `None` for rules whose
  /// result is not determined by their children.
  pub fn apply_rule_to_category(self, left: &Category, right: &Category) -> Option<Category> {
    let lr = left.result_category();
    let rr = right.result_category();
    let slash = |c: &Category| c.slash().unwrap_or(Slash::Fwd);
    let cat = match self {
      Self::RP | Self::LConj => left.clone(),
      Self::LP | Self::RConj => right.clone(),
      Self::FX | Self::FC => Category::combine(&lr, slash(right), &right.argument_category()),
      Self::BA => rr,
      Self::FA => lr,
      Self::BX | Self::BC => Category::combine(&rr, slash(left), &left.argument_category()),
      Self::FS | Self::FXS => {
        Category::combine(&lr.result_category(), slash(left), &right.argument_category())
      }
      Self::BS | Self::BXS => {
        Category::combine(&rr.result_category(), slash(left), &left.argument_category())
      }
      Self::GFC | Self::GFX => Category::combine(
        &Category::combine(&lr, slash(&rr), &rr.argument_category()),
        slash(right),
        &right.argument_category(),
      ),
      Self::GBC | Self::GBX => Category::combine(
        &Category::combine(&rr, slash(&lr), &lr.argument_category()),
        slash(left),
        &left.argument_category(),
      ),
      _ => return None,
    };
    if cat.isempty() { None } else { Some(cat) }
  }
}

impl fmt::Display for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

/// Branches of [`get_rule`] that have already been taken. Calling `get_rule`
/// again with the same exclusions must find nothing, which shows the choice
/// of rule was unambiguous.
#[derive(Debug, Default)]
pub struct Exclusions(Vec<u8>);

impl Exclusions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn contains(&self, id: u8) -> bool {
    self.0.contains(&id)
  }

  /// How many rules have been found so far.
  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

struct Exclude<'a>(Option<&'a mut Exclusions>);

impl Exclude<'_> {
  fn allows(&self, id: u8) -> bool {
    match &self.0 {
      Some(x) => !x.contains(id),
      None => true,
    }
  }

  fn add(&mut self, id: u8) {
    if let Some(x) = &mut self.0 {
      x.0.push(id);
    }
  }

  fn active(&self) -> bool {
    self.0.is_some()
  }
}

fn is_conj_atom(cat: &Category) -> bool {
  *cat == *CAT_CONJ || *cat == *CAT_CONJCONJ || *cat == *CAT_CONJ_CONJ
}

/// `X => T/(T\X)` or `X => T\(T/X)`. `None` when `result` does not have
/// the shape of a raised `left`, `Some(false)` when it does but the slashes
/// do not match.
fn type_raise(left: &Category, result: &Category) -> Option<bool> {
  let arg = result.argument_category();
  if result.result_category() == arg.result_category()
    && left.can_unify(&arg.argument_category())
  {
    Some(
      (result.isarg_right() && arg.isarg_left()) || (result.isarg_left() && arg.isarg_right()),
    )
  } else {
    None
  }
}

/// Infers the rule that combines `left` and `right` into `result`. Pass
/// `CAT_EMPTY` as `right` for unary nodes.
pub fn get_rule(left: &Category, right: &Category, result: &Category) -> Option<Rule> {
  get_rule_excluding(left, right, result, None)
}

/// [`get_rule`] with an exclusion list, used to check the choice is unique.
pub fn get_rule_excluding(
  left: &Category,
  right: &Category,
  result: &Category,
  exclude: Option<&mut Exclusions>,
) -> Option<Rule> {
  let mut x = Exclude(exclude);

  // punctuation
  if left.ispunct() && x.allows(13) {
    x.add(13);
    return Some(if right.ispunct() || right.isempty() || is_conj_atom(right) {
      if right.ispunct() { Rule::RP } else { Rule::LP }
    } else if right.can_unify(result) {
      Rule::LP
    } else {
      Rule::TcrUnary
    });
  } else if right.ispunct() && x.allows(14) {
    if x.active() && left.ispunct() {
      // not a duplicate
      return None;
    }
    x.add(14);
    if is_conj_atom(left) || left.can_unify(result) || left.ispunct() {
      return Some(Rule::RP);
    } else if left.isatom() && result.isatom() {
      return Some(Rule::TcAtom);
    }
    match type_raise(left, result) {
      Some(true) => return Some(Rule::TypeRaise),
      Some(false) => {}
      None => return Some(Rule::TclUnary),
    }
  }

  if left.isconj() && !right.isempty() && !right.ispunct() && x.allows(0) {
    if *left == *CAT_CONJ {
      let rule = if *right == *CAT_CONJ_CONJ {
        Rule::BA
      } else if right.can_unify(result) {
        Rule::LP
      } else if result.ismodifier() && result.argument_category().can_unify(right) {
        Rule::TcrUnary
      } else if right.isatom() && result.isatom() {
        Rule::TcAtom
      } else if result.isconj() {
        Rule::TcConj
      } else {
        return None;
      };
      x.add(0);
      return Some(rule);
    } else if *left == *CAT_CONJCONJ && *right == *CAT_CONJ {
      x.add(0);
      return Some(Rule::FA);
    } else if left.can_unify(right) {
      x.add(0);
      return Some(Rule::LConj);
    }
    None
  } else if right.isconj() && !left.ispunct() && x.allows(1) {
    if x.active() {
      if *left == *CAT_CONJ || *left == *CAT_CONJCONJ {
        // not ambiguous
        return None;
      }
      x.add(1);
    }
    if *right == *CAT_CONJ {
      Some(Rule::RP)
    } else if left.can_unify(right) {
      Some(Rule::RConj)
    } else {
      None
    }
  } else if left.isempty() && x.allows(2) {
    x.add(2);
    Some(Rule::LP)
  } else if CAT_NP_NP.ismember(left) && *right == *CAT_NUM && x.allows(3) {
    x.add(3);
    Some(Rule::RNum)
  } else if right.isempty() && x.allows(4) {
    x.add(4);
    match type_raise(left, result) {
      Some(true) => Some(Rule::TypeRaise),
      Some(false) => Some(Rule::TclUnary),
      None if left.can_unify(result) => Some(Rule::RP),
      None if left.isatom() && result.isatom() => Some(Rule::TcAtom),
      None => Some(Rule::TclUnary),
    }
  } else if left.isarg_right()
    && left.argument_category().can_unify(right)
    && left.result_category().can_unify(result)
    && x.allows(5)
  {
    x.add(5);
    Some(Rule::FA)
  } else if left.isarg_right()
    && right.isfunctor()
    && left
      .argument_category()
      .can_unify(&right.result_category())
    && Rule::FC
      .apply_rule_to_category(left, right)
      .is_some_and(|c| c.can_unify(result))
    && x.allows(6)
  {
    if x.active() {
      if left.remove_features() == right.remove_features() && (left.isconj() || right.isconj()) {
        // N/N[conj] N/N => N/N
        return None;
      }
      x.add(6);
    }
    Some(if right.isarg_right() { Rule::FC } else { Rule::FX })
  } else if right.isarg_left()
    && right.argument_category().can_unify(left)
    && right.result_category().can_unify(result)
    && x.allows(7)
  {
    x.add(7);
    Some(Rule::BA)
  } else if right.isarg_left()
    && left.isfunctor()
    && right
      .argument_category()
      .can_unify(&left.result_category())
    && Rule::BC
      .apply_rule_to_category(left, right)
      .is_some_and(|c| c.can_unify(result))
    && x.allows(8)
  {
    if x.active() {
      if left.remove_features() == right.remove_features() && (left.isconj() || right.isconj()) {
        return None;
      }
      x.add(8);
    }
    Some(if left.isarg_left() { Rule::BC } else { Rule::BX })
  } else if left
    .argument_category()
    .can_unify(&right.argument_category())
    && left.result_category().isarg_right()
    && left.slash() == right.slash()
    && left
      .result_category()
      .argument_category()
      .can_unify(&right.result_category())
    && Rule::FS
      .apply_rule_to_category(left, right)
      .is_some_and(|c| c.can_unify(result))
    && x.allows(9)
  {
    x.add(9);
    Some(if right.isarg_right() { Rule::FS } else { Rule::FXS })
  } else if right
    .argument_category()
    .can_unify(&left.argument_category())
    && right.result_category().isarg_left()
    && left.slash() == right.slash()
    && right
      .result_category()
      .argument_category()
      .can_unify(&left.result_category())
    && Rule::BS
      .apply_rule_to_category(left, right)
      .is_some_and(|c| c.can_unify(result))
    && x.allows(10)
  {
    x.add(10);
    Some(if right.isarg_left() { Rule::BS } else { Rule::BXS })
  } else if left.isarg_right()
    && right.result_category().slash() == result.result_category().slash()
    && left
      .argument_category()
      .can_unify(&right.result_category().result_category())
    && Rule::GFC
      .apply_rule_to_category(left, right)
      .is_some_and(|c| c.can_unify(result))
    && x.allows(11)
  {
    x.add(11);
    Some(if right.result_category().isarg_right() {
      Rule::GFC
    } else {
      Rule::GFX
    })
  } else if right.isarg_left()
    && left.result_category().slash() == result.result_category().slash()
    && right
      .argument_category()
      .can_unify(&left.result_category().result_category())
    && Rule::GBC
      .apply_rule_to_category(left, right)
      .is_some_and(|c| c.can_unify(result))
    && x.allows(12)
  {
    x.add(12);
    Some(if left.result_category().isarg_left() {
      Rule::GBC
    } else {
      Rule::GBX
    })
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cat(s: &str) -> Category {
    Category::parse(s).unwrap()
  }

  fn rule(l: &str, r: &str, res: &str) -> Option<Rule> {
    let r = if r.is_empty() { CAT_EMPTY.clone() } else { cat(r) };
    get_rule(&cat(l), &r, &cat(res))
  }

  /// The rule is found once and a second search with the same exclusions
  /// finds nothing.
  fn unique(l: &str, r: &str, res: &str) -> Rule {
    let r = if r.is_empty() { CAT_EMPTY.clone() } else { cat(r) };
    let (l, res) = (cat(l), cat(res));
    let mut x = Exclusions::new();
    let found = get_rule_excluding(&l, &r, &res, Some(&mut x)).unwrap();
    assert_eq!(get_rule_excluding(&l, &r, &res, Some(&mut x)), None);
    found
  }

  #[test]
  fn test_application() {
    assert_eq!(rule("NP[nb]/N", "N", "NP"), Some(Rule::FA));
    assert_eq!(rule("NP", r"S[dcl]\NP", "S[dcl]"), Some(Rule::BA));
    assert_eq!(unique(r"(S[dcl]\NP)/NP", "NP", r"S[dcl]\NP"), Rule::FA);
    assert_eq!(unique("NP", r"S[dcl]\NP", "S[dcl]"), Rule::BA);
  }

  #[test]
  fn test_composition() {
    assert_eq!(unique(r"(S\NP)/(S\NP)", r"(S\NP)/NP", r"(S\NP)/NP"), Rule::FC);
    assert_eq!(unique(r"S/S", r"S\NP", r"S\NP"), Rule::FX);
    assert_eq!(unique(r"(S\NP)/NP", r"(S\NP)\(S\NP)", r"(S\NP)/NP"), Rule::BX);
    assert_eq!(
      unique(r"S[dcl]/(S[dcl]\NP)", r"((S[dcl]\NP)/PP)/NP", r"(S[dcl]/PP)/NP"),
      Rule::GFC
    );
  }

  #[test]
  fn test_punct_and_conj() {
    assert_eq!(unique("S[dcl]", ".", "S[dcl]"), Rule::RP);
    assert_eq!(unique(",", "NP", "NP"), Rule::LP);
    assert_eq!(unique("conj", "NP", "NP[conj]"), Rule::LP);
    assert_eq!(unique("NP", "NP[conj]", "NP"), Rule::RConj);
    assert_eq!(rule("NP/NP", "N[num]", "NP"), Some(Rule::RNum));
  }

  #[test]
  fn test_unary() {
    assert_eq!(unique("N", "", "NP"), Rule::RP);
    assert_eq!(unique("S[dcl]", "", "NP"), Rule::TcAtom);
    assert_eq!(unique("NP", "", r"S/(S\NP)"), Rule::TypeRaise);
    assert_eq!(unique(r"S[pss]\NP", "", r"NP\NP"), Rule::TclUnary);
    assert_eq!(unique("NP", "", "NP"), Rule::RP);
  }

  #[test]
  fn test_rule_consistency() {
    for (l, r, res) in [
      (r"(S\NP)/(S\NP)", r"(S\NP)/NP", r"(S\NP)/NP"),
      ("NP[nb]/N", "N", "NP"),
      ("NP", r"S[dcl]\NP", "S[dcl]"),
      (r"(S\NP)/NP", r"(S\NP)\(S\NP)", r"(S\NP)/NP"),
    ] {
      let (l, r, res) = (cat(l), cat(r), cat(res));
      let rule = get_rule(&l, &r, &res).unwrap();
      assert!(rule.apply_rule_to_category(&l, &r).unwrap().can_unify(&res));
    }
  }

  #[test]
  fn test_rule_index() {
    for (n, r) in Rule::ALL.iter().enumerate() {
      assert_eq!(r.i(), n);
    }
    assert_eq!(Rule::TclUnary.to_string(), "L_UNARY_TC");
    assert_eq!(Rule::GBX.class(), RuleClass::GeneralizedComposition);
  }
}
