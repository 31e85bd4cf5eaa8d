//! Productions are the partial semantics carried up a derivation. A leaf
//! starts as a functor built from its template; combinators then apply,
//! compose, substitute or conjoin productions until a single DRS production
//! covers the sentence.
//!
//! The conditions themselves stay on the lexemes. A production only tracks
//! referents and the span of lexemes it covers, and renaming a production
//! renames the DRS of every lexeme in its span.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use crate::category::{Category, CAT_NP, CAT_PPNP};
use crate::drs::{get_new_drsrefs, DrsRef, Renaming};
use crate::error::Error;
use crate::lexeme::Lexeme;
use crate::options::ComposeOptions;
use crate::sentence::Span;
use crate::utils::{remove_dups, remove_dups_keep_last};

/// State shared by every production operation of one sentence.
pub struct Env<'a> {
  pub lexemes: &'a mut [Lexeme],
  pub options: ComposeOptions,
}

impl<'a> Env<'a> {
  pub fn new(lexemes: &'a mut [Lexeme], options: ComposeOptions) -> Self {
    Self { lexemes, options }
  }
}

/// Splits `(old, new)` pairs into the renaming to apply, where the first
/// pair for an old referent wins, and a follow-up renaming that merges the
/// losing new referents into the winner.
fn split_renames(rs: &[(DrsRef, DrsRef)]) -> (Renaming, Renaming) {
  let primary = Renaming::new(rs);
  let extra: Vec<_> = rs
    .iter()
    .filter_map(|(o, n)| {
      let w = primary.get(o);
      if w != *n { Some((n.clone(), w)) } else { None }
    })
    .collect();
  (primary, Renaming::new(&extra))
}

/// Renames for the referents of `ours` that also occur in `theirs`.
fn disjoint_renames(ours: &[DrsRef], theirs: &[DrsRef]) -> Vec<(DrsRef, DrsRef)> {
  let theirs_set: HashSet<&DrsRef> = theirs.iter().collect();
  let mut ors: Vec<DrsRef> = ours.iter().filter(|r| theirs_set.contains(r)).cloned().collect();
  if ors.is_empty() {
    return Vec::new();
  }
  ors.sort();
  let mut ers = theirs.to_vec();
  ers.extend(ours.iter().cloned());
  let nrs = get_new_drsrefs(&ors, &ers);
  ors.into_iter().zip(nrs).collect()
}

/// Pairs `(from, to)` at the positions where the atoms of `xs` and `ys` unify.
fn unify_pairs(
  xs: &[Category],
  ys: &[Category],
  from: &[DrsRef],
  to: &[DrsRef],
) -> Vec<(DrsRef, DrsRef)> {
  xs.iter()
    .zip(ys.iter())
    .zip(from.iter().zip(to.iter()))
    .filter(|((x, y), _)| x.can_unify_atom(y))
    .map(|(_, (f, t))| (f.clone(), t.clone()))
    .collect()
}

/// Unification referents of a scope stack: innermost scope first, then the
/// final result referents.
fn stack_refs(scopes: &[Scope], result: &[DrsRef]) -> Vec<DrsRef> {
  let mut refs: Vec<DrsRef> = scopes.iter().rev().flat_map(|s| s.refs.iter().cloned()).collect();
  refs.extend(result.iter().cloned());
  refs
}

/// A finished fragment: its referents, the lexemes it covers, and the
/// referents exposed to a functor that takes it as an argument.
#[derive(Debug, Clone)]
pub struct DrsProduction {
  pub refs: Vec<DrsRef>,
  pub category: Category,
  /// `None` when the exposed referents have to be inferred.
  pub lambda: Option<Vec<DrsRef>>,
  pub span: Span,
}

impl DrsProduction {
  pub fn new(refs: Vec<DrsRef>, category: Category, span: Span) -> Self {
    Self {
      refs,
      category,
      lambda: None,
      span,
    }
  }

  pub fn with_lambda(mut self, lambda: Vec<DrsRef>) -> Self {
    self.lambda = Some(lambda);
    self
  }

  pub fn isempty(&self) -> bool {
    self.refs.is_empty()
  }

  fn variables(&self, lexemes: &[Lexeme]) -> Vec<DrsRef> {
    let mut vars = self.refs.clone();
    if let Some(l) = &self.lambda {
      vars.extend(l.iter().cloned());
    }
    for i in self.span.iter() {
      if let Some(lx) = lexemes.get(i) {
        vars.extend(lx.refs.iter().cloned());
        if let Some(d) = &lx.drs {
          vars.extend(d.variables());
        }
      }
    }
    remove_dups(&vars)
  }

  fn rename(&mut self, rn: &Renaming, lexemes: &mut [Lexeme]) {
    if rn.is_empty() {
      return;
    }
    rn.apply(&mut self.refs);
    if let Some(l) = self.lambda.as_mut() {
      rn.apply(l);
    }
    for i in self.span.iter() {
      if let Some(lx) = lexemes.get_mut(i) {
        lx.rename(rn);
      }
    }
  }

  pub fn verify(&self) -> bool {
    self.lambda.as_ref().is_some_and(|l| l.len() == 1) && self.category.isatom()
  }
}

/// One curried argument of a functor.
#[derive(Debug, Clone)]
pub struct Scope {
  /// The functor category at this scope. The innermost scope holds the
  /// full category, each outer scope the result of the one inside it.
  pub category: Category,
  /// Referents bound by the argument atoms.
  pub refs: Vec<DrsRef>,
}

/// A curried λ-abstraction. `scopes[0]` is the outermost scope and the last
/// scope is the next argument to be consumed.
#[derive(Debug, Clone)]
pub struct FunctorProduction {
  scopes: Vec<Scope>,
  inner: Option<Box<Production>>,
}

/// A list of productions waiting to be unified into one.
#[derive(Debug, Clone)]
pub struct ProductionList {
  items: VecDeque<Production>,
  pub category: Category,
  pub lambda: Option<Vec<DrsRef>>,
}

/// Boxes a DRS as a proposition bound to a single referent.
#[derive(Debug, Clone)]
pub struct PropProduction {
  category: Category,
  referent: DrsRef,
}

#[derive(Debug, Clone)]
pub enum Production {
  Drs(DrsProduction),
  Functor(FunctorProduction),
  List(ProductionList),
}

impl From<DrsProduction> for Production {
  fn from(d: DrsProduction) -> Self {
    Production::Drs(d)
  }
}

impl From<FunctorProduction> for Production {
  fn from(f: FunctorProduction) -> Self {
    Production::Functor(f)
  }
}

impl From<ProductionList> for Production {
  fn from(l: ProductionList) -> Self {
    Production::List(l)
  }
}

impl Production {
  pub fn category(&self) -> Category {
    match self {
      Production::Drs(d) => d.category.clone(),
      Production::Functor(f) => f.category(),
      Production::List(l) => l.category.clone(),
    }
  }

  /// Sets the category. For a functor each scope takes the matching result
  /// of `cat`, and the inner production the final atom.
  pub fn set_category(&mut self, cat: Category) -> Result<(), Error> {
    match self {
      Production::Drs(d) => d.category = cat,
      Production::List(l) => l.category = cat,
      Production::Functor(f) => f.set_category(cat)?,
    }
    Ok(())
  }

  pub fn isfunctor(&self) -> bool {
    matches!(self, Production::Functor(_))
  }

  pub fn contains_functor(&self) -> bool {
    match self {
      Production::Drs(_) => false,
      Production::Functor(_) => true,
      Production::List(l) => l.contains_functor(),
    }
  }

  pub fn isempty(&self) -> bool {
    match self {
      Production::Drs(d) => d.isempty(),
      Production::Functor(f) => f.isempty(),
      Production::List(l) => l.isempty(),
    }
  }

  pub fn get_scope_count(&self) -> usize {
    match self {
      Production::Functor(f) => f.get_scope_count(),
      _ => 0,
    }
  }

  pub fn islambda_inferred(&self) -> bool {
    match self {
      Production::Drs(d) => d.lambda.is_none(),
      Production::Functor(_) => true,
      Production::List(l) => l.lambda.is_none(),
    }
  }

  /// Referents a functor can bind with.
  pub fn lambda_refs(&self) -> Vec<DrsRef> {
    match self {
      Production::Drs(d) => d.lambda.clone().unwrap_or_default(),
      Production::Functor(f) => f.lambda_refs(),
      Production::List(l) => l.lambda.clone().unwrap_or_default(),
    }
  }

  /// Ignored for functors, whose λ-refs live in their scopes.
  pub fn set_lambda_refs(&mut self, refs: Option<Vec<DrsRef>>) {
    match self {
      Production::Drs(d) => d.lambda = refs,
      Production::Functor(_) => {}
      Production::List(l) => l.lambda = refs,
    }
  }

  pub fn span(&self) -> Span {
    match self {
      Production::Drs(d) => d.span.clone(),
      Production::Functor(f) => f.span(),
      Production::List(l) => l.span(),
    }
  }

  pub fn union_span(&mut self, other: &Span) {
    match self {
      Production::Drs(d) => d.span = d.span.union(other),
      Production::Functor(f) => {
        if let Some(inner) = f.inner.as_mut() {
          inner.union_span(other);
        }
      }
      Production::List(_) => {}
    }
  }

  /// Renumbers the spans after lexemes were removed from the sentence.
  pub(crate) fn remap_span(&mut self, idxmap: &[Option<usize>]) {
    match self {
      Production::Drs(d) => d.span = d.span.remap(idxmap),
      Production::Functor(f) => {
        if let Some(inner) = f.inner.as_mut() {
          inner.remap_span(idxmap);
        }
      }
      Production::List(l) => {
        for p in l.items.iter_mut() {
          p.remap_span(idxmap);
        }
      }
    }
  }

  /// Every referent used by the production or the lexemes it covers.
  pub fn variables(&self, lexemes: &[Lexeme]) -> Vec<DrsRef> {
    match self {
      Production::Drs(d) => d.variables(lexemes),
      Production::Functor(f) => f.variables(lexemes),
      Production::List(l) => l.variables(lexemes),
    }
  }

  pub(crate) fn rename(&mut self, rn: &Renaming, lexemes: &mut [Lexeme]) {
    if rn.is_empty() {
      return;
    }
    match self {
      Production::Drs(d) => d.rename(rn, lexemes),
      Production::Functor(f) => f.rename(rn, lexemes),
      Production::List(l) => l.rename(rn, lexemes),
    }
  }

  /// Renames `(old, new)` pairs. When an old referent is paired with more
  /// than one new referent the first pair is applied and the renaming that
  /// merges the other new referents into it is returned, to be applied to
  /// whichever production owns them.
  pub fn rename_vars(&mut self, rs: &[(DrsRef, DrsRef)], lexemes: &mut [Lexeme]) -> Renaming {
    let (primary, extra) = split_renames(rs);
    self.rename(&primary, lexemes);
    extra
  }

  /// Renames and merges within this production.
  pub fn unify_vars(&mut self, rs: &[(DrsRef, DrsRef)], lexemes: &mut [Lexeme]) {
    let extra = self.rename_vars(rs, lexemes);
    self.rename(&extra, lexemes);
  }

  /// Renames the referents shared with `arg` so the two are disjoint.
  pub fn make_vars_disjoint(&mut self, arg: &[DrsRef], lexemes: &mut [Lexeme]) {
    let rs = disjoint_renames(&self.variables(lexemes), arg);
    if !rs.is_empty() {
      self.rename_vars(&rs, lexemes);
    }
  }

  /// Collapses lists into a single DRS production where possible.
  pub fn unify(self, env: &mut Env<'_>) -> Result<Production, Error> {
    match self {
      Production::Drs(_) => Ok(self),
      Production::Functor(f) => f.unify(env).map(Production::Functor),
      Production::List(l) => l.unify(env),
    }
  }

  pub fn verify(&self) -> bool {
    match self {
      Production::Drs(d) => d.verify(),
      Production::Functor(f) => f.verify(),
      Production::List(_) => false,
    }
  }

  pub fn as_drs(&self) -> Option<&DrsProduction> {
    match self {
      Production::Drs(d) => Some(d),
      _ => None,
    }
  }

  pub fn into_functor(self) -> Result<FunctorProduction, Error> {
    match self {
      Production::Functor(f) => Ok(f),
      other => Err(Error::compose(format!("expected a functor, got {}", other))),
    }
  }
}

impl ProductionList {
  pub fn new(category: Category) -> Self {
    Self {
      items: VecDeque::new(),
      category,
      lambda: None,
    }
  }

  pub fn from_items(items: impl IntoIterator<Item = Production>, category: Category) -> Self {
    Self {
      items: items.into_iter().collect(),
      category,
      lambda: None,
    }
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn items(&self) -> impl Iterator<Item = &Production> {
    self.items.iter()
  }

  pub fn isempty(&self) -> bool {
    self.items.iter().all(Production::isempty)
  }

  pub fn contains_functor(&self) -> bool {
    self.items.iter().any(Production::contains_functor)
  }

  fn span(&self) -> Span {
    self
      .items
      .iter()
      .fold(Span::empty(), |acc, p| acc.union(&p.span()))
  }

  fn variables(&self, lexemes: &[Lexeme]) -> Vec<DrsRef> {
    let mut vars = self.lambda.clone().unwrap_or_default();
    for p in self.items.iter() {
      vars.extend(p.variables(lexemes));
    }
    remove_dups(&vars)
  }

  fn rename(&mut self, rn: &Renaming, lexemes: &mut [Lexeme]) {
    if let Some(l) = self.lambda.as_mut() {
      rn.apply(l);
    }
    for p in self.items.iter_mut() {
      p.rename(rn, lexemes);
    }
  }

  /// Appends `other`, or its items when `merge` is set and it is a list.
  pub fn push_right(&mut self, other: Production, merge: bool) {
    match other {
      Production::List(l) if merge => self.items.extend(l.items),
      other => self.items.push_back(other),
    }
  }

  /// Prepends `other`, or its items when `merge` is set and it is a list.
  pub fn push_left(&mut self, other: Production, merge: bool) {
    match other {
      Production::List(l) if merge => {
        for p in l.items.into_iter().rev() {
          self.items.push_front(p);
        }
      }
      other => self.items.push_front(other),
    }
  }

  /// Drops empty productions that cover no lexemes and merges nested lists.
  pub fn flatten(mut self, env: &mut Env<'_>) -> Result<Self, Error> {
    let mut items = VecDeque::with_capacity(self.items.len());
    for p in std::mem::take(&mut self.items) {
      if p.isempty() && p.span().isempty() {
        continue;
      }
      match p {
        Production::List(l) => match l.unify(env)? {
          Production::List(l) => items.extend(l.items),
          p => items.push_back(p),
        },
        p => items.push_back(p),
      }
    }
    self.items = items;
    Ok(self)
  }

  /// Unifies the items into a single production. Lists holding a functor
  /// stay lists.
  pub fn unify(self, env: &mut Env<'_>) -> Result<Production, Error> {
    let ProductionList {
      items,
      category,
      lambda,
    } = self;
    let mut ml = Vec::with_capacity(items.len());
    let mut empty = Vec::new();
    for p in items {
      let p = p.unify(env)?;
      if p.isempty() {
        empty.push(p);
      } else {
        ml.push(p);
      }
    }
    let empty_span = empty
      .iter()
      .fold(Span::empty(), |acc, p| acc.union(&p.span()));

    if ml.len() == 1 {
      let mut p = ml.remove(0);
      if lambda.is_some() {
        p.set_lambda_refs(lambda);
      }
      // unary type changes set the category here
      p.set_category(category)?;
      p.union_span(&empty_span);
      return Ok(p);
    }
    if ml.iter().any(Production::contains_functor) {
      return Ok(Production::List(ProductionList {
        items: ml.into(),
        category,
        lambda,
      }));
    }

    let mut refs = Vec::new();
    let mut span = empty_span;
    for p in ml.iter() {
      if let Production::Drs(d) = p {
        refs.extend(d.refs.iter().cloned());
      }
      span = span.union(&p.span());
    }
    let mut d = DrsProduction::new(remove_dups(&refs), category, span);
    d.lambda = if lambda.is_some() {
      lambda
    } else if let Some(first) = ml.first() {
      if first.islambda_inferred() { None } else { Some(first.lambda_refs()) }
    } else {
      empty.first().map(Production::lambda_refs)
    };
    Ok(Production::Drs(d))
  }
}

impl FunctorProduction {
  /// A single scope functor.
  pub fn new(category: Category, refs: Vec<DrsRef>, inner: Option<Production>) -> Self {
    Self {
      scopes: vec![Scope { category, refs }],
      inner: inner.map(Box::new),
    }
  }

  /// `scopes` are ordered outermost first.
  pub fn from_scopes(scopes: Vec<Scope>, inner: Option<Production>) -> Self {
    Self {
      scopes,
      inner: inner.map(Box::new),
    }
  }

  pub fn scopes(&self) -> &[Scope] {
    &self.scopes
  }

  pub fn inner(&self) -> Option<&Production> {
    self.inner.as_deref()
  }

  /// The full category, held by the innermost scope.
  pub fn category(&self) -> Category {
    self
      .scopes
      .last()
      .map(|s| s.category.clone())
      .unwrap_or_else(|| crate::category::CAT_EMPTY.clone())
  }

  pub fn isarg_right(&self) -> bool {
    self.category().isarg_right()
  }

  pub fn isarg_left(&self) -> bool {
    !self.isarg_right()
  }

  pub fn ismodifier(&self) -> bool {
    self.category().ismodifier()
  }

  pub fn get_scope_count(&self) -> usize {
    self.scopes.len()
  }

  pub fn isempty(&self) -> bool {
    self.scopes.iter().all(|s| s.refs.is_empty())
      && self.inner.as_ref().is_none_or(|p| p.isempty())
  }

  pub fn span(&self) -> Span {
    self.inner.as_ref().map_or_else(Span::empty, |p| p.span())
  }

  fn inner_lambda_refs(&self) -> Vec<DrsRef> {
    self.inner.as_ref().map(|p| p.lambda_refs()).unwrap_or_default()
  }

  /// λ-refs ordered by scope, outermost first, each referent at its last
  /// occurrence.
  pub fn lambda_refs(&self) -> Vec<DrsRef> {
    let mut refs: Vec<DrsRef> = self.scopes.iter().flat_map(|s| s.refs.iter().cloned()).collect();
    refs.extend(self.inner_lambda_refs());
    remove_dups_keep_last(&refs)
  }

  /// λ-refs grouped per scope, innermost first, then the final result. The
  /// grouping matches [`Category::extract_unify_atoms`].
  pub fn get_unify_scopes(&self) -> Vec<Vec<DrsRef>> {
    let mut atoms: Vec<Vec<DrsRef>> = self.scopes.iter().rev().map(|s| s.refs.clone()).collect();
    if self.inner.is_some() {
      atoms.push(self.inner_lambda_refs());
    }
    atoms
  }

  /// Flattened [`FunctorProduction::get_unify_scopes`], in the order of
  /// [`Category::extract_unify_atoms_flat`].
  pub fn get_unify_refs(&self) -> Vec<DrsRef> {
    stack_refs(&self.scopes, &self.inner_lambda_refs())
  }

  fn variables(&self, lexemes: &[Lexeme]) -> Vec<DrsRef> {
    let mut vars: Vec<DrsRef> = self.scopes.iter().flat_map(|s| s.refs.iter().cloned()).collect();
    if let Some(p) = &self.inner {
      vars.extend(p.variables(lexemes));
    }
    remove_dups(&vars)
  }

  fn rename(&mut self, rn: &Renaming, lexemes: &mut [Lexeme]) {
    for s in self.scopes.iter_mut() {
      rn.apply(&mut s.refs);
    }
    if let Some(p) = self.inner.as_mut() {
      p.rename(rn, lexemes);
    }
  }

  pub fn rename_vars(&mut self, rs: &[(DrsRef, DrsRef)], lexemes: &mut [Lexeme]) -> Renaming {
    let (primary, extra) = split_renames(rs);
    self.rename(&primary, lexemes);
    extra
  }

  pub fn unify_vars(&mut self, rs: &[(DrsRef, DrsRef)], lexemes: &mut [Lexeme]) {
    let extra = self.rename_vars(rs, lexemes);
    self.rename(&extra, lexemes);
  }

  pub fn make_vars_disjoint(&mut self, arg: &[DrsRef], lexemes: &mut [Lexeme]) {
    let rs = disjoint_renames(&self.variables(lexemes), arg);
    if !rs.is_empty() {
      self.rename_vars(&rs, lexemes);
    }
  }

  fn set_category(&mut self, cat: Category) -> Result<(), Error> {
    if !cat.isfunctor() {
      return Err(Error::compose(format!("functor category expected, got {}", cat)));
    }
    let prev = self.category();
    if (cat.isarg_left() && prev.isarg_right()) || (cat.isarg_right() && prev.isarg_left()) {
      return Err(Error::compose(format!(
        "signature {} does not match {} argument position",
        cat,
        if prev.isarg_right() { "right" } else { "left" }
      )));
    }
    let mut c = cat.clone();
    for s in self.scopes.iter_mut().rev() {
      s.category = c.clone();
      c = c.result_category();
    }
    if let Some(p) = self.inner.as_mut() {
      let last = cat.extract_unify_atoms_flat().pop().unwrap_or(c);
      p.set_category(last)?;
    }
    Ok(())
  }

  fn take_inner(&mut self) -> Result<Production, Error> {
    self
      .inner
      .take()
      .map(|b| *b)
      .ok_or_else(|| Error::compose(format!("functor {} has no inner production", self.category())))
  }

  /// Replaces the consumed innermost scope with `inner`, returning the bare
  /// production once every scope is consumed.
  fn finish_scope(mut self, inner: Production) -> Production {
    self.scopes.pop();
    if self.scopes.is_empty() {
      inner
    } else {
      self.inner = Some(Box::new(inner));
      Production::Functor(self)
    }
  }

  fn unify(mut self, env: &mut Env<'_>) -> Result<Self, Error> {
    if let Some(p) = self.inner.take() {
      self.inner = Some(Box::new(p.unify(env)?));
    }
    Ok(self)
  }

  pub fn verify(&self) -> bool {
    let Some(inner) = &self.inner else {
      return false;
    };
    if inner.contains_functor() {
      return false;
    }
    let atoms = self.category().extract_unify_atoms();
    let lrefs = self.get_unify_scopes();
    atoms.len() == lrefs.len()
      && atoms.iter().zip(lrefs.iter()).all(|(a, r)| a.len() == r.len())
      && inner.verify()
  }

  fn log_step(&self, env: &Env<'_>, arg: &Production) {
    if env.options.contains(ComposeOptions::PRINT_DERIVATION) {
      tracing::info!("DERIVATION:= {} {{{}}}", self, arg);
    }
  }

  /// Function application, consuming the innermost scope.
  pub fn apply(mut self, g: Production, env: &mut Env<'_>) -> Result<Production, Error> {
    if self.scopes.is_empty() {
      return Err(Error::compose("apply to a functor without scopes"));
    }
    self.log_step(env, &g);
    let mut g = g;
    if self.isarg_left() || !g.isfunctor() {
      let gv = g.variables(env.lexemes);
      self.make_vars_disjoint(&gv, env.lexemes);
    } else {
      let fv = self.variables(env.lexemes);
      g.make_vars_disjoint(&fv, env.lexemes);
    }
    // read after the disjoint renaming
    let inner_refs = self.scopes.last().map(|s| s.refs.clone()).unwrap_or_default();

    let glr = match &g {
      Production::Functor(gf) => gf.get_unify_refs(),
      other => other.lambda_refs(),
    };
    if !g.isfunctor() && inner_refs.len() == 1 && glr.len() != 1 {
      // too many referents to bind, box the argument
      let p = PropProduction::new(CAT_PPNP.clone(), inner_refs[0].clone());
      g = p.apply(g, env)?;
    } else {
      let fs = self.category().argument_category().extract_unify_atoms_flat();
      let gs = g.category().extract_unify_atoms_flat();
      if fs.len() != gs.len() {
        return Err(Error::compose(format!(
          "cannot apply {} to {}",
          self.category(),
          g.category()
        )));
      }
      let mut flr = inner_refs;
      flr.extend(self.inner_lambda_refs());
      let rs = unify_pairs(&fs, &gs, &glr, &flr);
      let extra = g.rename_vars(&rs, env.lexemes);
      self.rename(&extra, env.lexemes);
    }

    let isarg_right = self.isarg_right();
    let fcomp = self.take_inner()?;
    let result = if let Production::Functor(mut gf) = g {
      let gcomp = gf.take_inner()?;
      let mut cl = ProductionList::new(fcomp.category());
      cl.lambda = Some(fcomp.lambda_refs());
      if isarg_right {
        cl.push_right(fcomp, false);
        cl.push_right(gcomp, false);
      } else {
        cl.push_right(gcomp, false);
        cl.push_right(fcomp, false);
      }
      cl.unify(env)?
    } else {
      let lr = fcomp.lambda_refs();
      let cat = fcomp.category();
      let mut c = match fcomp {
        Production::List(l) => l,
        other => ProductionList::from_items([other], cat.clone()),
      };
      if isarg_right {
        c.push_right(g, false);
      } else {
        c.push_left(g, false);
      }
      let mut c = c.unify(env)?;
      c.set_lambda_refs(Some(lr));
      c.set_category(cat)?;
      c
    };
    if env.options.contains(ComposeOptions::PRINT_DERIVATION) {
      tracing::info!("          := {}", result);
    }
    Ok(self.finish_scope(result))
  }

  /// Composition `X|Y (Y|Z) => X|Z`, where self is `X|Y`.
  pub fn compose(mut self, mut g: FunctorProduction, env: &mut Env<'_>) -> Result<Production, Error> {
    let gcat = g.category();
    let Some(gslash) = gcat.slash() else {
      return Err(Error::compose("composition argument must be a functor"));
    };
    let cat = Category::combine(
      &self.category().result_category(),
      gslash,
      &gcat.argument_category(),
    );
    self.make_disjoint_for_composition(&mut g, self.isarg_left(), env);

    let fv = self.category().argument_category().extract_unify_atoms_flat();
    let gv = gcat.result_category().extract_unify_atoms_flat();

    let fc = self.take_inner()?;
    let yflr = self.scopes.last().map(|s| s.refs.clone()).unwrap_or_default();
    let gc = g.take_inner()?;
    let Some(mut zscope) = g.scopes.pop() else {
      return Err(Error::compose("composition argument has no scope"));
    };
    let glr = if g.scopes.is_empty() {
      gc.lambda_refs()
    } else {
      stack_refs(&g.scopes, &gc.lambda_refs())
    };
    zscope.category = cat;
    let uy = unify_pairs(&gv, &fv, &yflr, &glr);
    if uy.is_empty() {
      return Err(Error::compose(format!("cannot compose {} with {}", self.category(), gcat)));
    }

    let pl = self.merge_inner(fc, gc, env)?;
    self.scopes.pop();
    self.scopes.push(zscope);
    self.inner = Some(Box::new(pl));
    self.unify_vars(&uy, env.lexemes);
    Ok(Production::Functor(self))
  }

  /// Generalized composition `X|Y ((Y|Z)|$) => (X|Z)|$`.
  pub fn generalized_compose(
    mut self,
    mut g: FunctorProduction,
    env: &mut Env<'_>,
  ) -> Result<Production, Error> {
    let gcat = g.category();
    let gres = gcat.result_category();
    let (Some(gslash), Some(rslash)) = (gcat.slash(), gres.slash()) else {
      return Err(Error::compose(format!("cannot generalize composition with {}", gcat)));
    };
    let resultcat = Category::combine(
      &self.category().result_category(),
      rslash,
      &gres.argument_category(),
    );
    let cat = Category::combine(&resultcat, gslash, &gcat.argument_category());
    self.make_disjoint_for_composition(&mut g, self.isarg_left(), env);

    let fv = self.category().argument_category().extract_unify_atoms_flat();
    let gv = gres.result_category().extract_unify_atoms_flat();

    let gc = g.take_inner()?;
    let (Some(mut dollar), Some(mut zscope)) = (g.scopes.pop(), g.scopes.pop()) else {
      return Err(Error::compose(format!("cannot generalize composition with {}", gcat)));
    };
    dollar.category = cat;
    zscope.category = resultcat;
    let glr = if g.scopes.is_empty() {
      gc.lambda_refs()
    } else {
      stack_refs(&g.scopes, &gc.lambda_refs())
    };

    let fc = self.take_inner()?;
    let yflr = self.scopes.last().map(|s| s.refs.clone()).unwrap_or_default();
    let uy = unify_pairs(&gv, &fv, &yflr, &glr);
    if uy.is_empty() {
      return Err(Error::compose(format!("cannot compose {} with {}", self.category(), gcat)));
    }

    let pl = self.merge_inner(fc, gc, env)?;
    self.scopes.pop();
    self.scopes.push(zscope);
    self.scopes.push(dollar);
    self.inner = Some(Box::new(pl));
    self.unify_vars(&uy, env.lexemes);
    Ok(Production::Functor(self))
  }

  /// Substitution `(X|Y)|Z (Y|Z) => X|Z`, where self is `(X|Y)|Z`.
  pub fn substitute(mut self, mut g: FunctorProduction, env: &mut Env<'_>) -> Result<Production, Error> {
    let fcat = self.category();
    let gcat = g.category();
    let (Some(fslash), true) = (fcat.slash(), self.scopes.len() >= 2) else {
      return Err(Error::compose(format!("cannot substitute with {}", fcat)));
    };
    let cat = Category::combine(
      &fcat.result_category().result_category(),
      fslash,
      &gcat.argument_category(),
    );
    self.make_disjoint_for_composition(&mut g, !fcat.result_category().isarg_right(), env);

    let fv = fcat.argument_category().extract_unify_atoms_flat();
    let gv = gcat.result_category().extract_unify_atoms_flat();

    let gc = g.take_inner()?;
    let Some(mut zscope) = g.scopes.pop() else {
      return Err(Error::compose("substitution argument has no scope"));
    };
    zscope.category = cat;
    let glr = if g.scopes.is_empty() {
      stack_refs(std::slice::from_ref(&zscope), &gc.lambda_refs())
    } else {
      stack_refs(&g.scopes, &gc.lambda_refs())
    };

    let fc = self.take_inner()?;
    self.scopes.pop();
    let mut yflr = self.scopes.last().map(|s| s.refs.clone()).unwrap_or_default();
    yflr.extend(fc.lambda_refs());
    let uy = unify_pairs(&gv, &fv, &yflr, &glr);
    if uy.is_empty() {
      return Err(Error::compose(format!("cannot substitute {} with {}", fcat, gcat)));
    }

    let pl = self.merge_inner(fc, gc, env)?;
    self.scopes.pop();
    self.scopes.push(zscope);
    self.inner = Some(Box::new(pl));
    self.unify_vars(&uy, env.lexemes);
    Ok(Production::Functor(self))
  }

  fn make_disjoint_for_composition(&mut self, g: &mut FunctorProduction, rename_self: bool, env: &mut Env<'_>) {
    if rename_self {
      let gv = g.variables(env.lexemes);
      self.make_vars_disjoint(&gv, env.lexemes);
    } else {
      let fv = self.variables(env.lexemes);
      g.make_vars_disjoint(&fv, env.lexemes);
    }
  }

  fn merge_inner(&self, fc: Production, gc: Production, env: &mut Env<'_>) -> Result<Production, Error> {
    let mut pl = ProductionList::new(fc.category());
    pl.lambda = Some(fc.lambda_refs());
    pl.push_right(fc, false);
    pl.push_right(gc, false);
    pl.flatten(env)?.unify(env)
  }

  /// Type raising `X:g => T|(T|X)`. Self is the empty template functor for
  /// the raised category and its inner production is replaced by `g`.
  pub fn type_raise(mut self, g: Production, env: &mut Env<'_>) -> Result<Production, Error> {
    let gv = g.variables(env.lexemes);
    self.make_vars_disjoint(&gv, env.lexemes);
    let fu = self.get_unify_scopes();
    let Some((first, rest)) = fu.split_first() else {
      return Err(Error::compose("type raise template has no scopes"));
    };
    let ft: HashSet<&DrsRef> = rest.iter().flatten().collect();
    let fx: Vec<DrsRef> = first.iter().filter(|r| !ft.contains(r)).cloned().collect();
    let rs: Vec<_> = fx.into_iter().zip(g.lambda_refs()).collect();
    self.unify_vars(&rs, env.lexemes);

    let fc = self.take_inner()?;
    let mut g = match g {
      Production::Functor(mut gf) => gf.take_inner()?,
      other => other,
    };
    g.set_lambda_refs(Some(fc.lambda_refs()));
    self.inner = Some(Box::new(g));
    Ok(Production::Functor(self))
  }

  /// Joins two like-typed productions under this functor's λ-chain. When
  /// `glambdas` is set the joined inner production exposes the λ-refs of
  /// `g`, otherwise those of self. A functor `g` has its argument referents
  /// merged into self's so both conjuncts share their arguments.
  pub fn conjoin(mut self, g: Production, glambdas: bool, env: &mut Env<'_>) -> Result<Production, Error> {
    let fcat = self.category();
    if g.category().remove_features() != fcat.remove_features() {
      return Err(Error::compose(format!(
        "conjoin argument must be a like type, {} and {}",
        fcat,
        g.category()
      )));
    }
    let gv = g.variables(env.lexemes);
    self.make_vars_disjoint(&gv, env.lexemes);

    let (mut c, lambda, category) = match g {
      Production::Functor(mut gf) => {
        let ga = gf.category().extract_unify_atoms_flat();
        let fa = fcat.extract_unify_atoms_flat();
        if ga.iter().zip(fa.iter()).any(|(u, v)| !u.can_unify_atom(v)) {
          return Err(Error::compose(format!("conjoin argument must be a like functor, {}", gf.category())));
        }
        let gscopes: Vec<DrsRef> = gf.scopes.iter().rev().flat_map(|s| s.refs.iter().cloned()).collect();
        let fscopes: Vec<DrsRef> = self.scopes.iter().rev().flat_map(|s| s.refs.iter().cloned()).collect();
        let rs = unify_pairs(&ga, &fa, &gscopes, &fscopes);

        let mut gc = gf.take_inner()?;
        let mut glr = gc.lambda_refs();
        gc.set_lambda_refs(Some(Vec::new()));
        gc.unify_vars(&rs, env.lexemes);
        Renaming::new(&rs).apply(&mut glr);
        let mut fc = self.take_inner()?;
        let flr = fc.lambda_refs();
        fc.set_lambda_refs(Some(Vec::new()));
        let (lr, cat) = if glambdas { (glr, gc.category()) } else { (flr, fc.category()) };
        (ProductionList::from_items([fc, gc], cat.clone()), lr, cat)
      }
      mut g => {
        let glr = g.lambda_refs();
        g.set_lambda_refs(Some(Vec::new()));
        let fc = self.take_inner()?;
        let flr = fc.lambda_refs();
        let lambda = if glambdas && glr.len() == flr.len() { glr } else { flr };
        let cat = fc.category();
        (ProductionList::from_items([fc, g], cat.clone()), lambda, cat)
      }
    };
    c.lambda = Some(lambda);
    c.category = category;
    let c = c.flatten(env)?.unify(env)?;
    self.inner = Some(Box::new(c));
    Ok(Production::Functor(self))
  }

  /// Special type change, used when a unary rule turns a noun phrase into a
  /// modifier. Self is an empty template whose inner production is replaced
  /// by `np`.
  pub fn type_change_np_snp(mut self, np: Production, env: &mut Env<'_>) -> Result<Production, Error> {
    let nv = np.variables(env.lexemes);
    self.make_vars_disjoint(&nv, env.lexemes);
    let mut np = np.unify(env)?;
    if np.isfunctor() {
      return Err(Error::compose(format!("type change expects a noun phrase, got {}", np)));
    }
    let slr = self.inner_lambda_refs();
    let lr = np.lambda_refs();
    if lr.len() != slr.len() {
      if slr.len() != 1 {
        return Err(Error::compose("mismatch of lambda vars when doing special type change"));
      }
      let p = PropProduction::new(np.category(), slr[0].clone());
      np = p.apply(np, env)?;
    } else {
      let rs: Vec<_> = slr.into_iter().zip(lr).collect();
      self.unify_vars(&rs, env.lexemes);
    }
    let x = self.take_inner()?;
    np.set_category(x.category())?;
    self.inner = Some(Box::new(np));
    Ok(Production::Functor(self))
  }

  /// Applies an empty noun phrase as the left argument. Used for imperative
  /// sentences whose subject is missing.
  pub fn apply_null_left(mut self, env: &mut Env<'_>) -> Result<Production, Error> {
    if self.isarg_right() {
      return Err(Error::compose("invalid apply null left to functor"));
    }
    match self.inner.take().map(|b| *b) {
      None | Some(Production::Functor(_)) => {
        return Err(Error::compose("invalid apply null left to functor"));
      }
      Some(Production::List(l)) => self.inner = Some(Box::new(l.unify(env)?)),
      Some(p) => self.inner = Some(Box::new(p)),
    }
    let refs = self.scopes.last().map(|s| s.refs.clone()).unwrap_or_default();
    let d = DrsProduction::new(refs.clone(), CAT_NP.clone(), Span::empty()).with_lambda(refs);
    self.apply(Production::Drs(d), env)
  }

  fn fmt_scope(&self, f: &mut fmt::Formatter<'_>, i: usize) -> fmt::Result {
    let v = fn_letter(i);
    let r = join_refs(&self.scopes[i].refs);
    let right = self.scopes[i].category.isarg_right();
    if !right {
      write!(f, "{}({});", v, r)?;
    }
    if i + 1 < self.scopes.len() {
      self.fmt_scope(f, i + 1)?;
    } else if let Some(p) = &self.inner {
      write!(f, "{}", p)?;
    }
    if right {
      write!(f, ";{}({})", v, r)?;
    }
    Ok(())
  }
}

impl PropProduction {
  pub fn new(category: Category, referent: DrsRef) -> Self {
    Self { category, referent }
  }

  /// Boxes `d`: every lexeme it covers is placed under the proposition
  /// referent, which becomes the only exposed referent. With
  /// [`ComposeOptions::REMOVE_UNARY_PROPS`] a single referent DRS is renamed
  /// to the proposition referent instead.
  pub fn apply(self, d: Production, env: &mut Env<'_>) -> Result<Production, Error> {
    let d = d.unify(env)?;
    let Production::Drs(mut d) = d else {
      return Err(Error::compose(format!("cannot box {} as a proposition", d)));
    };
    if env.options.contains(ComposeOptions::REMOVE_UNARY_PROPS) && d.refs.len() == 1 {
      let rn = Renaming::new(&[(d.refs[0].clone(), self.referent.clone())]);
      d.rename(&rn, env.lexemes);
      d.lambda = Some(vec![self.referent]);
      return Ok(Production::Drs(d));
    }
    for i in d.span.iter() {
      if let Some(lx) = env.lexemes.get_mut(i) {
        lx.props.insert(0, self.referent.clone());
      }
    }
    let mut refs = vec![self.referent.clone()];
    refs.extend(d.refs);
    Ok(Production::Drs(
      DrsProduction::new(remove_dups(&refs), self.category.result_category(), d.span)
        .with_lambda(vec![self.referent]),
    ))
  }
}

/// The identity functor `λx.P(x)` for a category whose result and argument
/// are atoms. With two referents it is `λx.P(y)`.
pub fn identity_functor(category: Category, refs: Option<&[DrsRef]>) -> FunctorProduction {
  let result = category.result_category();
  let (scope, lambda) = match refs {
    None | Some([]) => (vec![DrsRef::entity(1)], vec![DrsRef::entity(1)]),
    Some([r]) => (vec![r.clone()], vec![r.clone()]),
    Some(rs) => (rs[..rs.len() - 1].to_vec(), vec![rs[rs.len() - 1].clone()]),
  };
  let d = DrsProduction::new(Vec::new(), result, Span::empty()).with_lambda(lambda);
  FunctorProduction::new(category, scope, Some(Production::Drs(d)))
}

fn fn_letter(i: usize) -> char {
  char::from_u32('p' as u32 + i as u32).unwrap_or('?')
}

fn join_refs(refs: &[DrsRef]) -> String {
  refs.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(",")
}

fn lambda_prefix(refs: &[DrsRef]) -> String {
  refs.iter().map(|r| format!("λ{}", r)).collect::<String>()
}

impl fmt::Display for DrsProduction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let lr = self.lambda.as_deref().unwrap_or_default();
    if !lr.is_empty() {
      write!(f, "{}.", lambda_prefix(lr))?;
    }
    write!(f, "f(| {})", join_refs(&self.refs))
  }
}

impl fmt::Display for FunctorProduction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for i in (0..self.scopes.len()).rev() {
      write!(f, "λ{}", fn_letter(i))?;
    }
    write!(f, "{}.<", lambda_prefix(&self.lambda_refs()))?;
    if !self.scopes.is_empty() {
      self.fmt_scope(f, 0)?;
    }
    write!(f, ">")
  }
}

impl fmt::Display for ProductionList {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let lr = self.lambda.as_deref().unwrap_or_default();
    if !lr.is_empty() {
      write!(f, "{}.", lambda_prefix(lr))?;
    }
    let items: Vec<String> = self.items.iter().map(|p| p.to_string()).collect();
    write!(f, "[{}]", items.join(";"))
  }
}

impl fmt::Display for Production {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Production::Drs(d) => d.fmt(f),
      Production::Functor(x) => x.fmt(f),
      Production::List(l) => l.fmt(f),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::drs::{Condition, Drs};
  use crate::pos::Pos;

  fn r(s: &str) -> DrsRef {
    s.parse().unwrap()
  }

  fn cat(s: &str) -> Category {
    Category::parse(s).unwrap()
  }

  fn lexeme(word: &str, category: &str, idx: usize, refs: &[&str], drs: Drs) -> Lexeme {
    let mut lx = Lexeme::new(cat(category), word, Pos::unknown(), idx);
    lx.refs = refs.iter().map(|x| r(x)).collect();
    lx.drs = Some(drs);
    lx
  }

  /// No referent is bound by more than one lexeme.
  fn assert_disjoint_universes(lexemes: &[Lexeme]) {
    let mut bound = HashSet::new();
    for d in lexemes.iter().filter_map(|lx| lx.drs.as_ref()) {
      for x in d.universe.iter() {
        assert!(bound.insert(x.clone()), "{} bound twice", x);
      }
    }
  }

  /// `John runs`: an NP and an intransitive verb that both use `X1`.
  fn john_runs() -> (Vec<Lexeme>, Production, FunctorProduction) {
    let lexemes = vec![
      lexeme("John", "NP", 0, &["X1"], Drs::new(vec![r("X1")], vec![Condition::rel("John", vec![r("X1")])])),
      lexeme(
        "runs",
        r"S[dcl]\NP",
        1,
        &["E2", "X1"],
        Drs::new(
          vec![r("E2")],
          vec![
            Condition::rel("run", vec![r("E2")]),
            Condition::rel(".AGENT", vec![r("E2"), r("X1")]),
          ],
        ),
      ),
    ];
    let np = DrsProduction::new(vec![r("X1")], cat("NP"), Span::single(0)).with_lambda(vec![r("X1")]);
    let vp_inner =
      DrsProduction::new(vec![r("E2"), r("X1")], cat("S[dcl]"), Span::single(1)).with_lambda(vec![r("E2")]);
    let vp = FunctorProduction::new(cat(r"S[dcl]\NP"), vec![r("X1")], Some(vp_inner.into()));
    (lexemes, np.into(), vp)
  }

  #[test]
  fn test_apply_binds_argument() {
    let (mut lexemes, np, vp) = john_runs();
    let mut env = Env::new(&mut lexemes, ComposeOptions::NONE);
    assert!(vp.verify());
    let d = vp.apply(np, &mut env).unwrap();
    assert!(!d.isfunctor());
    assert_eq!(d.lambda_refs(), vec![r("E2")]);
    assert_eq!(d.category(), cat("S[dcl]"));
    assert_eq!(d.span(), Span::new([0, 1]));
    let john = lexemes[0].drs.clone().unwrap();
    let runs = lexemes[1].drs.clone().unwrap();
    assert_eq!(john.to_string(), "[X2| John(X2)]");
    assert_eq!(runs.to_string(), "[E2| run(E2),.AGENT(E2,X2)]");
    assert_disjoint_universes(&lexemes);
  }

  #[test]
  fn test_rename_extras_merge() {
    let (mut lexemes, np, _) = john_runs();
    let mut np = np;
    let extra = np.rename_vars(&[(r("X1"), r("X5")), (r("X1"), r("X6"))], &mut lexemes);
    assert_eq!(lexemes[0].refs, vec![r("X5")]);
    assert_eq!(extra.get(&r("X6")), r("X5"));
  }

  #[test]
  fn test_make_vars_disjoint() {
    let (mut lexemes, np, vp) = john_runs();
    let mut vp = Production::from(vp);
    let nv = np.variables(&lexemes);
    vp.make_vars_disjoint(&nv, &mut lexemes);
    let vv = vp.variables(&lexemes);
    assert!(vv.iter().all(|v| !nv.contains(v)));
    assert_eq!(lexemes[1].refs, vec![r("E2"), r("X2")]);
    assert_disjoint_universes(&lexemes);
  }

  #[test]
  fn test_apply_adds_proposition() {
    let mut lexemes = vec![
      lexeme("says", r"(S[dcl]\NP)/S[dcl]", 0, &["E1"], Drs::new(vec![], vec![Condition::rel("say", vec![r("E1")])])),
      lexeme("x", "S[dcl]", 1, &["E3"], Drs::new(vec![], vec![Condition::rel("x", vec![r("E3")])])),
    ];
    let mut env = Env::new(&mut lexemes, ComposeOptions::NONE);
    let f = FunctorProduction::new(
      cat("PP/NP"),
      vec![r("X4")],
      Some(DrsProduction::new(vec![r("E1")], cat("PP"), Span::single(0)).with_lambda(vec![r("E1")]).into()),
    );
    // an argument with two exposed referents cannot bind a single one
    let g = DrsProduction::new(vec![r("E3"), r("X5")], cat("NP"), Span::single(1))
      .with_lambda(vec![r("E3"), r("X5")]);
    let d = f.apply(g.into(), &mut env).unwrap();
    let refs = d.as_drs().unwrap().refs.clone();
    assert!(refs.contains(&r("X4")));
    assert!(refs.contains(&r("E3")));
    assert_eq!(d.span(), Span::new([0, 1]));
    assert!(lexemes[0].props.is_empty());
    assert_eq!(lexemes[1].props, vec![r("X4")]);
    assert_eq!(
      Span::new([0, 1]).get_drs(&lexemes).to_string(),
      "[X4| say(E1),X4: [| x(E3)]]"
    );
  }

  #[test]
  fn test_remove_unary_props() {
    let mut lexemes = vec![lexeme("x", "NP", 0, &["X3"], Drs::new(vec![r("X3")], vec![Condition::rel("x", vec![r("X3")])]))];
    let mut env = Env::new(&mut lexemes, ComposeOptions::REMOVE_UNARY_PROPS);
    let g = DrsProduction::new(vec![r("X3")], cat("NP"), Span::single(0)).with_lambda(vec![r("X3")]);
    let d = PropProduction::new(cat("PP/NP"), r("X7")).apply(g.into(), &mut env).unwrap();
    assert_eq!(d.lambda_refs(), vec![r("X7")]);
    assert!(lexemes[0].props.is_empty());
    assert_eq!(lexemes[0].drs.as_ref().unwrap().to_string(), "[X7| x(X7)]");
  }

  #[test]
  fn test_compose() {
    // will: (S\NP)/(S\NP), run: S[b]\NP
    let mut lexemes = vec![
      lexeme("will", r"(S\NP)/(S\NP)", 0, &["E1", "X2"], Drs::new(vec![], vec![Condition::rel(".MODAL", vec![r("E1")])])),
      lexeme("run", r"(S[b]\NP)/NP", 1, &["E1", "X2", "X3"], Drs::new(vec![], vec![Condition::rel("run", vec![r("E1")])])),
    ];
    let mut env = Env::new(&mut lexemes, ComposeOptions::NONE);
    let will = FunctorProduction::from_scopes(
      vec![
        Scope { category: cat(r"S\NP"), refs: vec![r("X2")] },
        Scope { category: cat(r"(S\NP)/(S\NP)"), refs: vec![r("X2"), r("E1")] },
      ],
      Some(DrsProduction::new(vec![r("E1")], cat("S"), Span::single(0)).with_lambda(vec![r("E1")]).into()),
    );
    let run = FunctorProduction::from_scopes(
      vec![
        Scope { category: cat(r"S[b]\NP"), refs: vec![r("X2")] },
        Scope { category: cat(r"(S[b]\NP)/NP"), refs: vec![r("X3")] },
      ],
      Some(DrsProduction::new(vec![r("E1")], cat("S[b]"), Span::single(1)).with_lambda(vec![r("E1")]).into()),
    );
    let p = will.compose(run, &mut env).unwrap();
    let f = p.clone().into_functor().unwrap();
    assert_eq!(f.category(), cat(r"(S\NP)/NP"));
    assert_eq!(f.get_scope_count(), 2);
    // the modal and the verb share one event
    let e_will = lexemes[0].refs[0].clone();
    let e_run = lexemes[1].refs[0].clone();
    assert_eq!(e_will, e_run);
    assert!(f.verify());
  }

  #[test]
  fn test_list_unify() {
    let mut lexemes = vec![
      lexeme("a", "NP", 0, &["X1"], Drs::new(vec![], vec![Condition::rel("a", vec![r("X1")])])),
      lexeme(",", ",", 1, &[], Drs::default()),
      lexeme("b", "NP", 2, &["X2"], Drs::new(vec![], vec![Condition::rel("b", vec![r("X2")])])),
    ];
    let mut env = Env::new(&mut lexemes, ComposeOptions::NONE);
    let mut pl = ProductionList::new(cat("NP"));
    pl.push_right(DrsProduction::new(vec![r("X1")], cat("NP"), Span::single(0)).with_lambda(vec![r("X1")]).into(), false);
    pl.push_right(DrsProduction::new(vec![], cat(","), Span::empty()).into(), false);
    pl.push_right(DrsProduction::new(vec![r("X2")], cat("NP"), Span::single(2)).into(), false);
    let pl = pl.flatten(&mut env).unwrap();
    assert_eq!(pl.len(), 2);
    let d = pl.unify(&mut env).unwrap();
    let d = d.as_drs().unwrap();
    assert_eq!(d.refs, vec![r("X1"), r("X2")]);
    assert_eq!(d.lambda, Some(vec![r("X1")]));
    assert_eq!(d.span, Span::new([0, 2]));
  }

  #[test]
  fn test_identity_functor() {
    let f = identity_functor(cat(r"NP\NP"), None);
    assert_eq!(f.lambda_refs(), vec![r("X1")]);
    let f = identity_functor(cat(r"PP\NP"), Some(&[r("X2"), r("X1")]));
    assert_eq!(f.get_unify_refs(), vec![r("X2"), r("X1")]);
    assert!(f.verify());
  }

  #[test]
  fn test_display() {
    let (_, np, vp) = john_runs();
    assert_eq!(np.to_string(), "λX1.f(| X1)");
    assert_eq!(vp.to_string(), "λpλX1λE2.<p(X1);λE2.f(| E2,X1)>");
  }
}
