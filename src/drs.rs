//! Discourse Representation Structures: a universe of referents plus a list
//! of conditions over them.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A DRS referent such as `X1` or `E2`: a name and an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrsRef {
  name: String,
  idx: usize,
}

impl DrsRef {
  pub fn new(name: &str, idx: usize) -> Self {
    Self {
      name: name.to_string(),
      idx,
    }
  }

  pub fn entity(idx: usize) -> Self {
    Self::new("X", idx)
  }

  pub fn event(idx: usize) -> Self {
    Self::new("E", idx)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn idx(&self) -> usize {
    self.idx
  }

  pub fn isevent(&self) -> bool {
    self.name == "E"
  }

  /// Same name, next index.
  pub fn increase_new(&self) -> Self {
    Self::new(&self.name, self.idx + 1)
  }
}

impl fmt::Display for DrsRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.idx == 0 {
      write!(f, "{}", self.name)
    } else {
      write!(f, "{}{}", self.name, self.idx)
    }
  }
}

impl FromStr for DrsRef {
  type Err = Error;

  /// `X12` parses to name `X`, index 12.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let split = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
    let (name, digits) = s.split_at(split);
    if name.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
      return Err(Error::compose(format!("bad referent `{}`", s)));
    }
    let idx = if digits.is_empty() {
      0
    } else {
      digits
        .parse()
        .map_err(|_| Error::compose(format!("bad referent `{}`", s)))?
    };
    Ok(Self::new(name, idx))
  }
}

/// Returns fresh referents for `ors`, none of which collide with `ers`, with
/// the other fresh referents, or with the remaining old referents.
pub fn get_new_drsrefs(ors: &[DrsRef], ers: &[DrsRef]) -> Vec<DrsRef> {
  let mut taken: HashSet<DrsRef> = ers.iter().cloned().collect();
  let mut result = Vec::with_capacity(ors.len());
  for (i, r) in ors.iter().enumerate() {
    let mut rd = r.increase_new();
    while taken.contains(&rd) || ors[i + 1..].contains(&rd) {
      rd = rd.increase_new();
    }
    taken.insert(rd.clone());
    result.push(rd);
  }
  result
}

/// A rename map built from `(old, new)` pairs. All pairs apply at once, so
/// `[(X1, X2), (X2, X1)]` swaps the two referents.
#[derive(Debug, Clone, Default)]
pub struct Renaming(HashMap<DrsRef, DrsRef>);

impl Renaming {
  pub fn new(pairs: &[(DrsRef, DrsRef)]) -> Self {
    let mut m = HashMap::with_capacity(pairs.len());
    for (old, new) in pairs {
      m.entry(old.clone()).or_insert_with(|| new.clone());
    }
    m.retain(|old, new| old != new);
    Self(m)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn get(&self, r: &DrsRef) -> DrsRef {
    self.0.get(r).cloned().unwrap_or_else(|| r.clone())
  }

  pub fn apply(&self, refs: &mut [DrsRef]) {
    if self.is_empty() {
      return;
    }
    for r in refs.iter_mut() {
      if let Some(n) = self.0.get(r) {
        *r = n.clone();
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rel {
  pub name: String,
  pub refs: Vec<DrsRef>,
}

impl Rel {
  pub fn new(name: impl Into<String>, refs: Vec<DrsRef>) -> Self {
    Self {
      name: name.into(),
      refs,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
  Rel(Rel),
  Neg(Drs),
  Imp(Drs, Drs),
  Or(Drs, Drs),
  Prop(DrsRef, Drs),
}

impl Condition {
  pub fn rel(name: impl Into<String>, refs: Vec<DrsRef>) -> Self {
    Self::Rel(Rel::new(name, refs))
  }

  pub fn rename(&mut self, rs: &Renaming) {
    match self {
      Self::Rel(r) => rs.apply(&mut r.refs),
      Self::Neg(d) => d.rename(rs),
      Self::Imp(a, b) | Self::Or(a, b) => {
        a.rename(rs);
        b.rename(rs);
      }
      Self::Prop(r, d) => {
        *r = rs.get(r);
        d.rename(rs);
      }
    }
  }

  fn collect_refs(&self, out: &mut Vec<DrsRef>) {
    match self {
      Self::Rel(r) => out.extend(r.refs.iter().cloned()),
      Self::Neg(d) => d.collect_refs(out),
      Self::Imp(a, b) | Self::Or(a, b) => {
        a.collect_refs(out);
        b.collect_refs(out);
      }
      Self::Prop(r, d) => {
        out.push(r.clone());
        d.collect_refs(out);
      }
    }
  }

  fn show(&self, notation: Notation) -> String {
    match self {
      Self::Rel(r) => format!(
        "{}({})",
        r.name,
        r.refs.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(",")
      ),
      Self::Neg(d) => format!("\u{00AC}{}", d.show(notation)),
      Self::Imp(a, b) => format!("{} \u{21D2} {}", a.show(notation), b.show(notation)),
      Self::Or(a, b) => format!("{} \u{2228} {}", a.show(notation), b.show(notation)),
      Self::Prop(r, d) => format!("{}: {}", r, d.show(notation)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
  /// `[X1,E2| boy(X1),run(E2)]`
  Linear,
  /// `<{X1,E2},{boy(X1),run(E2)}>`
  Set,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Drs {
  pub universe: Vec<DrsRef>,
  pub conditions: Vec<Condition>,
}

impl Drs {
  pub fn new(universe: Vec<DrsRef>, conditions: Vec<Condition>) -> Self {
    Self {
      universe,
      conditions,
    }
  }

  pub fn isempty(&self) -> bool {
    self.universe.is_empty() && self.conditions.is_empty()
  }

  pub fn rename(&mut self, rs: &Renaming) {
    if rs.is_empty() {
      return;
    }
    rs.apply(&mut self.universe);
    for c in self.conditions.iter_mut() {
      c.rename(rs);
    }
  }

  fn collect_refs(&self, out: &mut Vec<DrsRef>) {
    out.extend(self.universe.iter().cloned());
    for c in self.conditions.iter() {
      c.collect_refs(out);
    }
  }

  /// Referents bound or used anywhere in the structure, first occurrence order.
  pub fn variables(&self) -> Vec<DrsRef> {
    let mut out = Vec::new();
    self.collect_refs(&mut out);
    crate::utils::remove_dups(&out)
  }

  /// Referents used in conditions but not bound by this universe.
  pub fn freerefs(&self) -> Vec<DrsRef> {
    let mut out = Vec::new();
    for c in self.conditions.iter() {
      c.collect_refs(&mut out);
    }
    let out = crate::utils::remove_dups(&out);
    out
      .into_iter()
      .filter(|r| !self.universe.contains(r))
      .collect()
  }

  pub fn find_condition(&self, rel: &Rel) -> Option<usize> {
    self.conditions.iter().position(|c| match c {
      Condition::Rel(r) => r == rel,
      _ => false,
    })
  }

  pub fn find_condition_mut(&mut self, rel: &Rel) -> Option<&mut Rel> {
    self.conditions.iter_mut().find_map(|c| match c {
      Condition::Rel(r) if r == rel => Some(r),
      _ => None,
    })
  }

  /// Relations anywhere at the top level, in order.
  pub fn relations(&self) -> impl Iterator<Item = &Rel> {
    self.conditions.iter().filter_map(|c| match c {
      Condition::Rel(r) => Some(r),
      _ => None,
    })
  }

  pub fn show(&self, notation: Notation) -> String {
    let ul = self
      .universe
      .iter()
      .map(|r| r.to_string())
      .collect::<Vec<_>>()
      .join(",");
    let cl = self
      .conditions
      .iter()
      .map(|c| c.show(notation))
      .collect::<Vec<_>>()
      .join(",");
    match notation {
      Notation::Linear => format!("[{}| {}]", ul, cl),
      Notation::Set => format!("<{{{}}},{{{}}}>", ul, cl),
    }
  }
}

impl fmt::Display for Drs {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.show(Notation::Linear))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn r(s: &str) -> DrsRef {
    s.parse().unwrap()
  }

  #[test]
  fn test_drsref() {
    assert_eq!(r("X12"), DrsRef::entity(12));
    assert_eq!(r("E2").name(), "E");
    assert_eq!(r("E2").increase_new(), r("E3"));
    assert!("12".parse::<DrsRef>().is_err());
    assert!("X1a".parse::<DrsRef>().is_err());
  }

  #[test]
  fn test_get_new_drsrefs() {
    let ors = [r("X1"), r("X2")];
    let ers = [r("X1"), r("X2"), r("X3")];
    assert_eq!(get_new_drsrefs(&ors, &ers), vec![r("X4"), r("X5")]);
    assert_eq!(get_new_drsrefs(&[r("E1")], &[r("X2")]), vec![r("E2")]);
  }

  #[test]
  fn test_rename_and_show() {
    let mut d = Drs::new(
      vec![r("X1"), r("E2")],
      vec![
        Condition::rel("boy", vec![r("X1")]),
        Condition::rel(".AGENT", vec![r("E2"), r("X1")]),
      ],
    );
    assert_eq!(d.to_string(), "[X1,E2| boy(X1),.AGENT(E2,X1)]");
    d.rename(&Renaming::new(&[(r("X1"), r("E2")), (r("E2"), r("X1"))]));
    assert_eq!(d.to_string(), "[E2,X1| boy(E2),.AGENT(X1,E2)]");
    assert_eq!(d.show(Notation::Set), "<{E2,X1},{boy(E2),.AGENT(X1,E2)}>");
    assert!(d.freerefs().is_empty());
  }

  #[test]
  fn test_nested() {
    let inner = Drs::new(vec![], vec![Condition::rel(".VN.run-51.3.2", vec![r("E1")])]);
    let d = Drs::new(
      vec![r("E1")],
      vec![Condition::Imp(
        Drs::new(vec![], vec![Condition::rel("run", vec![r("E1")])]),
        inner,
      )],
    );
    assert_eq!(d.variables(), vec![r("E1")]);
    assert_eq!(d.to_string(), "[E1| [| run(E1)] \u{21D2} [| .VN.run-51.3.2(E1)]]");
  }
}
