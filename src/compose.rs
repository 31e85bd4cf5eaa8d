//! The composer. A derivation is first flattened into a syntax tree with the
//! combinator of every node inferred, then the tree is walked bottom up,
//! combining lexical productions on a stack until one DRS is left. Typed
//! constituents are collected along the way and tidied up afterwards.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::category::{
  Category, Slash, CAT_AP, CAT_COMMA, CAT_CONJ, CAT_CONJ_CONJ, CAT_DETERMINER, CAT_EMPTY,
  CAT_ESRL_PP, CAT_LQU, CAT_LRB, CAT_N, CAT_NP, CAT_POSSESSIVE_ARGUMENT, CAT_POSSESSIVE_PRONOUN,
  CAT_PP_ADVP, CAT_PREPOSITION, CAT_RQU, CAT_RRB, CAT_VP, CAT_VPB, CAT_VPMODX, CAT_VPTO,
  CAT_VP_MOD, CAT_VP_MODX,
};
use crate::drs::{Condition, Drs, DrsRef, Rel, Renaming};
use crate::error::Error;
use crate::kb::{best_title_match, NullVerbNet, NullWikiSearch, VerbNet, WikiPage, WikiSearch};
use crate::lexeme::{
  Lexeme, EVENT_ROLES, RT_ADJUNCT, RT_ANAPHORA, RT_ATTRIBUTE, RT_DATE, RT_EMPTY_DRS, RT_ENTITY,
  RT_EVENT, RT_EVENT_ATTRIB, RT_EVENT_MODAL, RT_NUMBER, RT_ORPHANED, RT_PP, RT_PROPERNAME,
};
use crate::model::{Model, UnaryRule};
use crate::options::ComposeOptions;
use crate::parse_derivation::PTree;
use crate::pos::Pos;
use crate::production::{
  identity_functor, DrsProduction, Env, FunctorProduction, Production, ProductionList,
};
use crate::rules::{get_rule, Rule, RuleClass};
use crate::sentence::{Constituent, ConstituentType, Sentence, Span};
use crate::syntree::{NodeId, NodeKind, STree, STreeNode};
use crate::utils::remove_dups;

use std::sync::Arc;

static NULL_VERBNET: NullVerbNet = NullVerbNet;

/// Lexemes that make up noun phrases.
pub const NP_MASK: u64 = RT_ENTITY | RT_PROPERNAME | RT_ATTRIBUTE | RT_DATE | RT_NUMBER | RT_EMPTY_DRS;
/// Lexemes that make up verb phrases.
pub const VP_MASK: u64 = RT_EVENT_ATTRIB | RT_EVENT_MODAL | RT_EVENT;

/// Leaf productions are renamed to indexes above this, and the counters go
/// back to it after the final renaming.
const VAR_LIMIT: usize = 10;

fn pop(stk: &mut Vec<Production>) -> Result<Production, Error> {
  stk
    .pop()
    .ok_or_else(|| Error::compose("production stack underflow"))
}

/// Categories that take no part in combinator inference.
fn rule_category(cat: &Category) -> Category {
  if *cat == *CAT_LRB || *cat == *CAT_RRB || *cat == *CAT_LQU || *cat == *CAT_RQU {
    CAT_EMPTY.clone()
  } else {
    cat.clone()
  }
}

/// Composes a DRS from a CCG derivation.
///
/// ```
/// use ccg2drs::{parse_ccg_derivation, process_ccg_pt, ComposeOptions};
///
/// let pt = parse_ccg_derivation(
///   r"(<T S[dcl] 1 2> (<L NP PRP PRP He NP>) (<L S[dcl]\NP VBZ VBZ runs S[dcl]\NP_1>))",
/// ).unwrap();
/// let ccg = process_ccg_pt(&pt, ComposeOptions::NO_WIKI_SEARCH).unwrap();
/// assert_eq!(ccg.lexemes.len(), 2);
/// assert!(!ccg.get_drs(true).isempty());
/// ```
pub struct Ccg2Drs<'m> {
  options: ComposeOptions,
  model: Cow<'m, Model>,
  verbnet: &'m dyn VerbNet,
  pub lexemes: Vec<Lexeme>,
  pub constituents: Vec<Constituent>,
  /// Spans of coordinated phrases.
  pub conjoins: Vec<Span>,
  /// Conditions owned by no lexeme, such as `_AKA` and `_ORPHANED`.
  pub drs_extra: Vec<Condition>,
  tree: STree,
  final_prod: Option<Production>,
  xid: usize,
  eid: usize,
}

impl<'m> Ccg2Drs<'m> {
  pub fn new(options: ComposeOptions, model: &'m Model) -> Self {
    Self::with_model(options, Cow::Borrowed(model))
  }

  /// A composer that owns its model, such as one extended with the
  /// templates of a derivation.
  pub fn with_model(options: ComposeOptions, model: Cow<'m, Model>) -> Self {
    Self {
      options,
      model,
      verbnet: &NULL_VERBNET,
      lexemes: Vec::new(),
      constituents: Vec::new(),
      conjoins: Vec::new(),
      drs_extra: Vec::new(),
      tree: STree::new(),
      final_prod: None,
      xid: VAR_LIMIT,
      eid: VAR_LIMIT,
    }
  }

  pub fn with_verbnet(mut self, verbnet: &'m dyn VerbNet) -> Self {
    self.verbnet = verbnet;
    self
  }

  pub fn options(&self) -> ComposeOptions {
    self.options
  }

  pub fn tree(&self) -> &STree {
    &self.tree
  }

  /// The production left on the stack by `create_drs`.
  pub fn final_production(&self) -> Option<&Production> {
    self.final_prod.as_ref()
  }

  fn reset(&mut self) {
    self.lexemes.clear();
    self.constituents.clear();
    self.conjoins.clear();
    self.drs_extra.clear();
    self.tree = STree::new();
    self.final_prod = None;
    self.xid = VAR_LIMIT;
    self.eid = VAR_LIMIT;
  }

  /// Runs every stage on a parsed derivation.
  pub fn process(&mut self, pt: &PTree, wiki: &dyn WikiSearch) -> Result<(), Error> {
    self.build_execution_sequence(pt)?;
    self.create_drs()?;
    self.resolve_proper_names();
    self.fixup_possessives();
    self.post_create_fixup();
    if !self.options.contains(ComposeOptions::NO_WIKI_SEARCH) {
      self.add_wikipedia_links(wiki);
    }
    self.final_rename();
    Ok(())
  }

  // -- syntax tree --------------------------------------------------------

  /// Creates the lexemes and the syntax tree, inferring the combinator used
  /// at each internal node. Lexical heads are linked as a side effect.
  pub fn build_execution_sequence(&mut self, pt: &PTree) -> Result<(), Error> {
    self.reset();
    self.build_node(pt, 0)?;
    if self.options.contains(ComposeOptions::PRINT_DERIVATION) {
      tracing::info!("derivation:\n{}", self.tree);
    }
    Ok(())
  }

  fn build_node(&mut self, pt: &PTree, depth: usize) -> Result<NodeId, Error> {
    let n = match pt {
      PTree::Leaf(leaf) => {
        let idx = self.lexemes.len();
        let lexeme = Lexeme::new(leaf.category.clone(), &leaf.word, Pos::new(&leaf.modpos), idx);
        self.lexemes.push(lexeme);
        return Ok(self.tree.push(STreeNode::leaf(idx, leaf.category.clone(), depth)));
      }
      PTree::Node(n) => n,
    };

    let mut ids = Vec::with_capacity(n.children.len());
    for child in n.children.iter() {
      ids.push(self.build_node(child, depth + 1)?);
    }
    let cats: Vec<Category> = ids
      .iter()
      .map(|&i| rule_category(&self.tree.get(i).category))
      .collect();
    let (left, right, kind) = match (cats.as_slice(), ids.as_slice()) {
      ([l], [a]) => (l.clone(), CAT_EMPTY.clone(), NodeKind::Unary(*a)),
      ([l, r], [a, b]) => (l.clone(), r.clone(), NodeKind::Binary(*a, *b)),
      _ => return Err(Error::compose(format!("{} has {} children", n.category, ids.len()))),
    };
    let rule = get_rule(&left, &right, &n.category)
      .or_else(|| get_rule(&left.simplify(), &right.simplify(), &n.category))
      .ok_or_else(|| Error::CombinatorNotFound {
        left: left.to_string(),
        right: right.to_string(),
        result: n.category.to_string(),
      })?;
    tracing::debug!(%rule, %left, %right, result = %n.category, "inferred combinator");

    let head_child = n.head.min(ids.len() - 1);
    let head = self.tree.get(ids[head_child]).head;
    if ids.len() == 2 {
      let other = self.tree.get(ids[1 - head_child]).head;
      self.lexemes[other].head = head;
    }
    let lex_range = (
      self.tree.get(ids[0]).lex_range.0,
      self.tree.get(ids[ids.len() - 1]).lex_range.1,
    );
    Ok(self.tree.push(STreeNode {
      kind,
      category: n.category.clone(),
      rule: Some(rule),
      head_child,
      head,
      depth,
      parent: None,
      lex_range,
      ndtype: ConstituentType::NODE,
      conjoin: false,
    }))
  }

  // -- composition --------------------------------------------------------

  /// Walks the syntax tree bottom up and composes the sentence DRS.
  pub fn create_drs(&mut self) -> Result<(), Error> {
    let mut stk: Vec<Production> = Vec::new();
    for id in 0..self.tree.len() {
      let node = self.tree.get(id).clone();
      match (&node.kind, node.rule) {
        (NodeKind::Leaf(lx), _) => {
          let p = self.leaf_production(*lx)?;
          stk.push(p);
        }
        (_, Some(rule)) => {
          tracing::debug!(%rule, category = %node.category, "dispatch");
          self.dispatch(rule, id, &mut stk)?;
        }
        (_, None) => return Err(Error::compose(format!("{} has no combinator", node.category))),
      }
      if self.options.contains(ComposeOptions::VERIFY_SIGNATURES) {
        if let Some(top) = stk.last() {
          if !top.category().can_unify(&node.category) {
            return Err(Error::compose(format!(
              "production {} does not match node {}",
              top.category(),
              node.category
            )));
          }
        }
      }
    }

    let mut d = pop(&mut stk)?;
    if !stk.is_empty() {
      return Err(Error::compose(format!("{} productions left over", stk.len())));
    }
    let null_left = matches!(&d, Production::Functor(f)
      if f.isarg_left() && f.category().argument_category().isatom());
    {
      let mut env = Env::new(&mut self.lexemes, self.options);
      if null_left {
        d = d.into_functor()?.apply_null_left(&mut env)?;
      }
      d = d.unify(&mut env)?;
    }
    self.final_prod = Some(d);
    self.fix_orphaned_prepositions();

    let lexemes = &self.lexemes;
    self.conjoins
      .retain(|sp| sp.iter().any(|i| lexemes[i].category == *CAT_CONJ));
    self.refine_constituents();
    Ok(())
  }

  fn leaf_production(&mut self, idx: usize) -> Result<Production, Error> {
    let lx = &mut self.lexemes[idx];
    let bracket = rule_category(&lx.category).isempty();
    if bracket || lx.ispunct() {
      let cat = if bracket { CAT_EMPTY.clone() } else { lx.category.clone() };
      lx.drs = Some(Drs::default());
      lx.mask |= RT_EMPTY_DRS;
      self.xid += 1;
      let d = DrsProduction::new(Vec::new(), cat, Span::empty())
        .with_lambda(vec![DrsRef::entity(self.xid)]);
      return Ok(d.into());
    }
    let mut p = lx.get_production(&self.model, self.verbnet, self.options)?;
    self.rename_fresh(&mut p);
    Ok(p)
  }

  /// Moves a fresh production's referents above anything used so far.
  fn rename_fresh(&mut self, p: &mut Production) {
    let vars = p.variables(&self.lexemes);
    if vars.is_empty() {
      return;
    }
    let mut xmax = 0;
    let mut emax = 0;
    let rs: Vec<(DrsRef, DrsRef)> = vars
      .iter()
      .map(|r| {
        let to = if r.isevent() {
          emax = emax.max(r.idx());
          DrsRef::event(r.idx() + self.eid)
        } else {
          xmax = xmax.max(r.idx());
          DrsRef::entity(r.idx() + self.xid)
        };
        (r.clone(), to)
      })
      .collect();
    p.unify_vars(&rs, &mut self.lexemes);
    self.xid += xmax;
    self.eid += emax;
    tracing::trace!(xid = self.xid, eid = self.eid, "renamed {} referents", rs.len());
  }

  fn fresh_functor(&mut self, f: FunctorProduction) -> Result<FunctorProduction, Error> {
    let mut p = Production::from(f);
    self.rename_fresh(&mut p);
    p.into_functor()
  }

  fn unify_list(
    &mut self,
    items: impl IntoIterator<Item = Production>,
    category: Category,
  ) -> Result<Production, Error> {
    let mut env = Env::new(&mut self.lexemes, self.options);
    ProductionList::from_items(items, category)
      .flatten(&mut env)?
      .unify(&mut env)
  }

  fn dispatch(&mut self, rule: Rule, id: NodeId, stk: &mut Vec<Production>) -> Result<(), Error> {
    match rule {
      Rule::FA => self.apply_rule(id, true, stk),
      Rule::BA => self.apply_rule(id, false, stk),
      Rule::FC | Rule::FX | Rule::GFC | Rule::GFX | Rule::FS | Rule::FXS => {
        self.compose_rule(rule, true, stk)
      }
      Rule::BC | Rule::BX | Rule::GBC | Rule::GBX | Rule::BS | Rule::BXS => {
        self.compose_rule(rule, false, stk)
      }
      Rule::LConj | Rule::RConj => self.conj_rule(id, stk),
      Rule::RP | Rule::LP | Rule::RNum | Rule::LNum | Rule::NOP => self.passthrough_rule(id, stk),
      Rule::TypeRaise => self.type_raise_rule(id, stk),
      Rule::TcAtom => self.atom_change_rule(id, stk),
      Rule::TcConj => self.conj_change_rule(id, stk),
      Rule::TclUnary => self.left_unary_rule(id, stk),
      Rule::TcrUnary => self.right_unary_rule(id, stk),
    }
  }

  fn apply_rule(&mut self, id: NodeId, forward: bool, stk: &mut Vec<Production>) -> Result<(), Error> {
    let (f, d) = if forward {
      let d = pop(stk)?;
      (pop(stk)?, d)
    } else {
      let f = pop(stk)?;
      (f, pop(stk)?)
    };
    let fcat = f.category();
    let result = if f.isfunctor() {
      let f = f.into_functor()?;
      let mut env = Env::new(&mut self.lexemes, self.options);
      f.apply(d, &mut env)?
    } else {
      // conj\conj and the like carry no functor
      let cat = self.tree.get(id).category.clone();
      let items = if forward { [f, d] } else { [d, f] };
      self.unify_list(items, cat)?
    };
    self.update_constituents(&result, &fcat, id);
    self.update_conjoins(id, &result.span());
    stk.push(result);
    Ok(())
  }

  fn compose_rule(&mut self, rule: Rule, forward: bool, stk: &mut Vec<Production>) -> Result<(), Error> {
    let (f, g) = if forward {
      let g = pop(stk)?;
      (pop(stk)?, g)
    } else {
      let f = pop(stk)?;
      (f, pop(stk)?)
    };
    let f = f.into_functor()?;
    let g = g.into_functor()?;
    let mut env = Env::new(&mut self.lexemes, self.options);
    let d = match rule.class() {
      RuleClass::GeneralizedComposition => f.generalized_compose(g, &mut env)?,
      RuleClass::Substitution => f.substitute(g, &mut env)?,
      _ => f.compose(g, &mut env)?,
    };
    stk.push(d);
    Ok(())
  }

  fn conj_rule(&mut self, id: NodeId, stk: &mut Vec<Production>) -> Result<(), Error> {
    let g = pop(stk)?;
    let f = pop(stk)?;
    let d = if f.isfunctor() {
      let f = f.into_functor()?;
      let mut env = Env::new(&mut self.lexemes, self.options);
      f.conjoin(g, false, &mut env)?
    } else if g.isfunctor() {
      let g = g.into_functor()?;
      let mut env = Env::new(&mut self.lexemes, self.options);
      g.conjoin(f, false, &mut env)?
    } else {
      let cat = f.category();
      self.unify_list([f, g], cat)?
    };
    let cat = d.category();
    self.update_constituents(&d, &cat, id);
    stk.push(d);
    Ok(())
  }

  fn passthrough_rule(&mut self, id: NodeId, stk: &mut Vec<Production>) -> Result<(), Error> {
    let node = self.tree.get(id);
    let mut l = ProductionList::new(node.category.clone());
    for _ in 0..node.arity() {
      l.push_left(pop(stk)?, true);
    }
    let d = {
      let mut env = Env::new(&mut self.lexemes, self.options);
      l.flatten(&mut env)?.unify(&mut env)?
    };
    let cat = d.category();
    self.update_constituents(&d, &cat, id);
    stk.push(d);
    Ok(())
  }

  fn empty_functor(&self, category: &Category) -> Result<FunctorProduction, Error> {
    self.model.safe_create_empty_functor(category).ok_or_else(|| {
      crate::warn_limited!("template", %category, "no functor template");
      Error::TemplateRule(category.to_string())
    })
  }

  fn type_raise_rule(&mut self, id: NodeId, stk: &mut Vec<Production>) -> Result<(), Error> {
    let cat = self.tree.get(id).category.clone();
    let f = self.empty_functor(&cat)?;
    let f = self.fresh_functor(f)?;
    let g = pop(stk)?;
    let mut env = Env::new(&mut self.lexemes, self.options);
    stk.push(f.type_raise(g, &mut env)?);
    Ok(())
  }

  /// Pushes an identity functor that rewrites the top of the stack into
  /// `cat`, then applies it.
  fn rewrite_top(&mut self, id: NodeId, cat: &Category, stk: &mut Vec<Production>) -> Result<(), Error> {
    let top = stk
      .last()
      .map(Production::category)
      .ok_or_else(|| Error::compose("nothing to type change"))?;
    let f = identity_functor(Category::combine(cat, Slash::Bwd, &top), None);
    let f = self.fresh_functor(f)?;
    stk.push(f.into());
    self.apply_rule(id, false, stk)
  }

  fn atom_change_rule(&mut self, id: NodeId, stk: &mut Vec<Production>) -> Result<(), Error> {
    let node = self.tree.get(id).clone();
    match node.kind {
      NodeKind::Binary(_, r) => {
        // punctuation or a conjunction rides along
        let rewrite_left = self.tree.get(r).category.ispunct();
        let side = if rewrite_left {
          pop(stk)?
        } else {
          let b = pop(stk)?;
          let a = pop(stk)?;
          stk.push(b);
          a
        };
        self.rewrite_top(id, &node.category, stk)?;
        let d1 = pop(stk)?;
        let items = if rewrite_left { [d1, side] } else { [side, d1] };
        let d = self.unify_list(items, node.category.clone())?;
        stk.push(d);
        Ok(())
      }
      _ => self.rewrite_top(id, &node.category, stk),
    }
  }

  fn conj_change_rule(&mut self, id: NodeId, stk: &mut Vec<Production>) -> Result<(), Error> {
    let node = self.tree.get(id).clone();
    let f = self.empty_functor(&node.category)?;
    let f = self.fresh_functor(f)?;
    let d = match node.kind {
      NodeKind::Binary(l, _) => {
        let (np, conj) = if self.tree.get(l).category == *CAT_CONJ {
          let np = pop(stk)?;
          (np, pop(stk)?)
        } else {
          let conj = pop(stk)?;
          (pop(stk)?, conj)
        };
        let t = {
          let mut env = Env::new(&mut self.lexemes, self.options);
          f.type_change_np_snp(np, &mut env)?
        };
        self.unify_list([t, conj], node.category.clone())?
      }
      _ => {
        let np = pop(stk)?;
        let mut env = Env::new(&mut self.lexemes, self.options);
        f.type_change_np_snp(np, &mut env)?
      }
    };
    stk.push(d);
    Ok(())
  }

  fn find_unary(&self, result: &Category, argument: &Category) -> Result<Arc<UnaryRule>, Error> {
    let rule = self.model.lookup_unary(result, argument).or_else(|| {
      if result.ismodifier() && result.result_category() == *argument {
        self.model.infer_unary(result)
      } else {
        None
      }
    });
    rule.ok_or_else(|| {
      crate::warn_limited!("unary", %result, %argument, "no unary rule");
      Error::UnaryRule {
        result: result.to_string(),
        argument: argument.to_string(),
      }
    })
  }

  fn left_unary_rule(&mut self, id: NodeId, stk: &mut Vec<Production>) -> Result<(), Error> {
    let node = self.tree.get(id).clone();
    let Some(&child) = node.children().first() else {
      return Err(Error::compose("unary type change on a leaf"));
    };
    let argument = self.tree.get(child).category.clone();
    let unary = self.find_unary(&node.category, &argument)?;
    let f = self.fresh_functor(unary.get())?;
    let ucat = f.category();
    if let NodeKind::Binary(_, _) = node.kind {
      let d2 = pop(stk)?;
      stk.push(f.into());
      self.apply_rule(id, false, stk)?;
      let d1 = pop(stk)?;
      let d = self.unify_list([d1, d2], node.category.clone())?;
      stk.push(d);
    } else {
      stk.push(f.into());
      self.apply_rule(id, false, stk)?;
    }
    let span = stk.last().map(Production::span).unwrap_or_default();
    self.mark_if_adjunct(&ucat, &span);
    Ok(())
  }

  fn right_unary_rule(&mut self, id: NodeId, stk: &mut Vec<Production>) -> Result<(), Error> {
    let node = self.tree.get(id).clone();
    let NodeKind::Binary(l, r) = node.kind else {
      return Err(Error::compose("right unary type change needs two children"));
    };
    let (left, right) = (self.tree.get(l).clone(), self.tree.get(r).clone());
    let mut unary = None;
    if left.is_leaf() && left.category == *CAT_CONJ {
      if right.category != *CAT_CONJ_CONJ && self.can_use_conjoin_rules(id) {
        unary = Model::uconj().lookup_unary(&node.category, &right.category);
        self.tree.get_mut(id).conjoin = true;
      }
    } else if left.is_leaf() && left.category == *CAT_COMMA {
      let conjoin = self.can_use_conjoin_rules(id);
      self.tree.get_mut(id).conjoin = conjoin;
    }
    let unary = match unary {
      Some(u) => u,
      None => self.find_unary(&node.category, &right.category)?,
    };
    let f = self.fresh_functor(unary.get())?;
    let ucat = f.category();
    stk.push(f.into());
    self.apply_rule(id, false, stk)?;

    let d1 = pop(stk)?;
    let mut d2 = pop(stk)?;
    let mut markadjunct = true;
    let d2cat = d2.category();
    let cat = if d2cat == *CAT_CONJ {
      if d1.category().test_returns_entity_modifier() {
        let rs: Vec<(DrsRef, DrsRef)> = d2
          .lambda_refs()
          .into_iter()
          .zip(d1.lambda_refs().into_iter().rev())
          .collect();
        d2.unify_vars(&rs, &mut self.lexemes);
      } else if node.category.ismodifier()
        && node.category.simplify().test_return(&CAT_VP, false)
        && (node.category.test_return(&d1.category(), false)
          || node.category.test_return(&d2cat, false))
      {
        markadjunct = false;
      }
      if ucat.test_returns_entity_modifier() {
        node.category.add_conj_feature()
      } else {
        node.category.clone()
      }
    } else if d2cat == *CAT_COMMA && ucat.test_returns_entity_modifier() {
      node.category.add_conj_feature()
    } else {
      node.category.clone()
    };
    let d = self.unify_list([d1, d2], cat)?;
    if markadjunct {
      self.mark_if_adjunct(&ucat, &d.span());
    }
    stk.push(d);
    Ok(())
  }

  /// Whether the conjunction at the left of a binary node joins two
  /// phrases of the same kind, judged by the parts of speech along its head
  /// chain and where that chain lands.
  fn can_use_conjoin_rules(&self, id: NodeId) -> bool {
    let NodeKind::Binary(l, r) = self.tree.get(id).kind else {
      return false;
    };
    let Some(start) = self.tree.get(l).lexeme() else {
      return false;
    };
    let mut hds = Vec::new();
    let mut cur = start;
    while !self.lexemes[cur].isroot() && hds.len() < self.lexemes.len() {
      cur = self.lexemes[cur].head;
      hds.push(cur);
    }
    if hds.len() < 2 {
      return false;
    }
    let (p0, p1) = (&self.lexemes[hds[0]].pos, &self.lexemes[hds[1]].pos);
    let proper = |p: &Pos| p.is("POS") || p.is_proper_noun();
    let common = |p: &Pos| p.is("NN") || p.is("NNS");
    if !(p0 == p1 || (proper(p0) && proper(p1)) || (common(p0) && common(p1))) {
      return false;
    }
    let begin = self.tree.get(l).lex_range.0.min(self.tree.get(r).lex_range.0);
    hds[1] == begin || hds[1] + 1 == begin
  }

  fn update_conjoins(&mut self, id: NodeId, span: &Span) {
    let NodeKind::Binary(l, r) = self.tree.get(id).kind else {
      return;
    };
    if !(self.tree.get(l).conjoin || self.tree.get(r).conjoin) {
      return;
    }
    let sp = span.fullspan();
    if sp.isempty() {
      return;
    }
    self.conjoins.retain(|c| !sp.contains(c));
    self.conjoins.push(sp);
  }

  // -- constituents -------------------------------------------------------

  fn span_head(&self, span: &Span) -> Option<usize> {
    span.get_head_span(&self.lexemes, false).first()
  }

  fn phrase_type(&self, d: &Production, cat_before: &Category, id: NodeId) -> Option<ConstituentType> {
    let cat = d.category();
    let span = d.span();
    let verbnet = !self.options.contains(ComposeOptions::NO_VERBNET);
    if cat == *CAT_NP && verbnet {
      let refs: HashSet<&DrsRef> = span
        .iter()
        .map(|i| &self.lexemes[i])
        .filter(|lx| !lx.has_mask(RT_ADJUNCT | RT_PP))
        .flat_map(|lx| lx.refs.iter())
        .collect();
      return (refs.len() == 1).then_some(ConstituentType::NP);
    }
    if *cat_before == *CAT_ESRL_PP {
      return self
        .span_head(&span)
        .filter(|&h| self.lexemes[h].pos.is_preposition())
        .map(|_| ConstituentType::PP);
    }
    if *cat_before == *CAT_PP_ADVP && cat == *CAT_VP_MOD && !span.isempty() {
      return self
        .span_head(&span)
        .filter(|&h| self.lexemes[h].pos.is_preposition() && self.lexemes[h].stem == "for")
        .map(|_| ConstituentType::ADVP);
    }

    let mut t = ConstituentType::from_category(&cat);
    if t.is_none() && cat_before.isfunctor() {
      let arg = cat_before.argument_category();
      let res = cat_before.result_category();
      if arg.remove_features() == *CAT_N
        && (cat_before.test_return(&CAT_VPMODX, false) || cat_before.test_return(&CAT_VP_MODX, false))
      {
        t = Some(ConstituentType::NP);
      } else if (arg == *CAT_VPB || arg == *CAT_VPTO) && res.ismodifier() && res.test_return(&CAT_VP, false)
      {
        t = Some(ConstituentType::SINF);
      }
    }
    if matches!(t, None | Some(ConstituentType::S)) {
      // productions lose features the node still has
      if let Some(nt) = ConstituentType::from_category(&self.tree.get(id).category) {
        t = Some(nt);
      }
    }
    t
  }

  fn update_constituents(&mut self, d: &Production, cat_before: &Category, id: NodeId) {
    if !matches!(d, Production::Drs(_) | Production::Functor(_)) {
      return;
    }
    let Some(t) = self.phrase_type(d, cat_before, id) else {
      return;
    };
    self.tree.get_mut(id).ndtype = t;
    let span = d.span();
    let head = self.span_head(&span).unwrap_or(self.tree.get(id).head);
    let mut c = Constituent::new(span, t, head);

    if !self.options.contains(ComposeOptions::NO_VERBNET) {
      while let Some(top) = self.constituents.last() {
        if top.vntype != c.vntype || !c.span.contains(&top.span) {
          break;
        }
        if let Some(cc) = self.constituents.pop() {
          if cc.span == c.span {
            c.head = cc.head;
          }
        }
      }
    } else if c.vntype == ConstituentType::VP {
      if let Some(top) = self.constituents.last() {
        if top.span == c.span && top.vntype.issentence() {
          return;
        }
      }
    }
    self.add_constituent(c);
  }

  /// A constituent replaces one with the same head and span, except that an
  /// adjective phrase is never demoted to an adverbial one.
  fn add_constituent(&mut self, c: Constituent) {
    if let Some(pos) = self
      .constituents
      .iter()
      .position(|x| x.head == c.head && x.span == c.span)
    {
      if self.constituents[pos].vntype == ConstituentType::ADJP && c.vntype == ConstituentType::ADVP {
        return;
      }
      self.constituents.remove(pos);
    }
    self.constituents.push(c);
  }

  fn mark_if_adjunct(&mut self, ucat: &Category, span: &Span) {
    for i in span.iter() {
      self.lexemes[i].mask |= RT_ADJUNCT;
    }
    let t = if ucat.argument_category() == *CAT_AP {
      ConstituentType::ADJP
    } else {
      ConstituentType::ADVP
    };
    let Some(head) = self.span_head(span) else {
      return;
    };
    if self.lexemes[head].isproper_noun() {
      return;
    }
    self.add_constituent(Constituent::new(span.clone(), t, head));
  }

  fn is_closed_class(&self, i: usize) -> bool {
    let lx = &self.lexemes[i];
    lx.category == *CAT_DETERMINER
      || lx.category == *CAT_POSSESSIVE_PRONOUN
      || lx.category == *CAT_PREPOSITION
      || lx.pos.is_person_pronoun()
      || lx.ispunct()
      || lx.pos.is_preposition()
      || lx.pos.is_determiner()
  }

  fn merge_adjacent(&self, cs: &mut [Constituent], t: ConstituentType) {
    let idx: Vec<usize> = (0..cs.len()).filter(|&i| cs[i].vntype == t).collect();
    let Some(&first) = idx.first() else {
      return;
    };
    let mut cur = first;
    for &j in idx.iter().skip(1) {
      let (c1, c2) = (&cs[cur], &cs[j]);
      let adjacent = c1.span.last().map(|l| l + 1) == c2.span.first();
      let h1 = self.lexemes[c1.head].head;
      let h2 = self.lexemes[c2.head].head;
      let u = c1.span.union(&c2.span);
      let merge = adjacent
        && (c2.span.has(h1)
          || c1.span.has(h2)
          || (h1 == h2 && u.get_head_span(&self.lexemes, false).len() == 1));
      if merge {
        let head = self.span_head(&u).unwrap_or(cs[cur].head);
        cs[cur].span = u;
        cs[cur].head = head;
        cs[j].span.clear();
      } else {
        cur = j;
      }
    }
  }

  fn refine_constituents(&mut self) {
    let n = self.lexemes.len();
    if let Some(root) = self.tree.root() {
      let cat = self.tree.get(root).category.clone();
      if !cat.isatom() {
        if cat.simplify() == *CAT_VP {
          let sp = Span::new((0..n).filter(|&i| !self.lexemes[i].ispunct()));
          if let Some(h) = self.span_head(&sp) {
            self.constituents.push(Constituent::new(sp, ConstituentType::SINF, h));
          }
        }
      } else if self.constituents.is_empty() {
        let sp = Span::range(0, n);
        if let Some(h) = self.span_head(&sp) {
          self.constituents.push(Constituent::new(sp, ConstituentType::S, h));
        }
        return;
      }
    }

    let mut cs = std::mem::take(&mut self.constituents);
    cs.sort();
    self.merge_adjacent(&mut cs, ConstituentType::ADVP);
    self.merge_adjacent(&mut cs, ConstituentType::ADJP);

    for c in cs.iter_mut().filter(|c| c.vntype == ConstituentType::ADVP) {
      let mask = c.span.iter().fold(0, |m, i| m | self.lexemes[i].mask);
      if mask & RT_EVENT == 0 {
        for i in c.span.iter() {
          self.lexemes[i].mask &= !RT_ADJUNCT;
        }
        c.vntype = ConstituentType::NP;
      } else if c.span.len() == 1 {
        for i in c.span.iter() {
          self.lexemes[i].mask &= !RT_ADJUNCT;
        }
        c.span.clear();
      }
    }

    cs.retain(|c| {
      !c.span.isempty()
        && !c.span.iter().all(|i| self.is_closed_class(i))
        && !(c.span.len() == 1 && c.span.iter().all(|i| self.lexemes[i].ispunct()))
    });

    for c in cs.iter() {
      if c.vntype == ConstituentType::ADJP || c.vntype == ConstituentType::NP {
        let hd = &self.lexemes[c.head];
        if hd.has_mask(RT_ATTRIBUTE) && !hd.has_mask(RT_ENTITY | RT_PROPERNAME) {
          for i in c.span.iter() {
            if self.lexemes[i].refs.first() == self.lexemes[c.head].refs.first() {
              self.lexemes[i].mask |= RT_ATTRIBUTE;
            }
          }
        }
      }
    }

    // same span and head: noun and prepositional phrases win
    let entity = |t: ConstituentType| t == ConstituentType::PP || t == ConstituentType::NP;
    let mut i = 0;
    while i < cs.len() {
      let dup = (0..i).find(|&j| cs[j].span == cs[i].span && cs[j].head == cs[i].head);
      match dup {
        Some(j) => {
          let (ti, tj) = (cs[i].vntype, cs[j].vntype);
          if (entity(tj) && !entity(ti)) || (ti == ConstituentType::PP && tj == ConstituentType::NP) {
            cs.remove(j);
          } else {
            cs.remove(i);
          }
        }
        None => i += 1,
      }
    }
    cs.sort();
    cs.dedup();
    self.constituents = cs;
    self.map_heads_to_constituents();
  }

  /// Links each constituent to the smallest one enclosing it.
  fn map_heads_to_constituents(&mut self) {
    let cs = &self.constituents;
    let cheads: Vec<Option<usize>> = (0..cs.len())
      .map(|i| {
        cs.iter()
          .enumerate()
          .filter(|(j, cj)| *j != i && cj.span.contains(&cs[i].span) && (cj.span != cs[i].span || *j < i))
          .min_by_key(|(_, cj)| cj.span.len())
          .map(|(j, _)| j)
      })
      .collect();
    for (c, h) in self.constituents.iter_mut().zip(cheads) {
      c.chead = h;
    }
  }

  /// A preposition whose referent nothing binds takes over its object's
  /// referent, so whatever pointed at the preposition now reaches the object.
  fn fix_orphaned_prepositions(&mut self) {
    let free: HashSet<DrsRef> = self.get_drs(false).freerefs().into_iter().collect();
    for i in 0..self.lexemes.len() {
      let lx = &self.lexemes[i];
      if !lx.ispreposition() || lx.refs.len() < 2 || !free.contains(&lx.refs[0]) {
        continue;
      }
      let rs = [(lx.refs[1].clone(), lx.refs[0].clone())];
      tracing::debug!(word = %lx.word, "attaching orphaned preposition");
      self.rename_everywhere(&Renaming::new(&rs));
      let lx = &mut self.lexemes[i];
      let refs = lx.refs[1..].to_vec();
      lx.drs = Some(Drs::new(Vec::new(), vec![Condition::rel(lx.stem.clone(), refs.clone())]));
      lx.refs = refs;
    }
  }

  // -- post processing ----------------------------------------------------

  /// Renames in the final production, every lexeme and the extra
  /// conditions, each exactly once.
  fn rename_everywhere(&mut self, rn: &Renaming) {
    if rn.is_empty() {
      return;
    }
    let span = match self.final_prod.as_mut() {
      Some(p) => {
        p.rename(rn, &mut self.lexemes);
        p.span()
      }
      None => Span::empty(),
    };
    for lx in self.lexemes.iter_mut().filter(|lx| !span.has(lx.idx)) {
      lx.rename(rn);
    }
    for c in self.drs_extra.iter_mut() {
      c.rename(rn);
    }
  }

  fn sentence_head(&self) -> Option<usize> {
    let mut cur = 0;
    for _ in 0..self.lexemes.len() {
      let lx = self.lexemes.get(cur)?;
      if lx.isroot() {
        return Some(cur);
      }
      cur = lx.head;
    }
    None
  }

  /// Runs of proper nouns sharing a referent, as inclusive positions into
  /// `idxs`. `&`, `and`, `for` and `of` may join two runs.
  fn proper_name_runs(&self, idxs: &[usize]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start: Option<usize> = None;
    let mut end = 0;
    let mut lastref: Option<&DrsRef> = None;
    for (i, &ix) in idxs.iter().enumerate() {
      let lx = &self.lexemes[ix];
      let r = lx.refs.first();
      if let Some(s) = start {
        let same = r.is_some() && r == lastref;
        if same && (lx.isproper_noun() || lx.category == *CAT_N) {
          end = i;
          continue;
        }
        let joins = matches!(lx.word.as_str(), "&" | "and" | "for" | "of")
          && idxs.get(i + 1).is_some_and(|&nx| self.lexemes[nx].isproper_noun());
        if same && joins {
          continue;
        }
        if s != end {
          runs.push((s, end));
        }
        start = None;
      }
      if lx.isproper_noun() {
        start = Some(i);
        end = i;
        lastref = r;
      }
    }
    if let Some(s) = start {
      if s != end {
        runs.push((s, end));
      }
    }
    runs
  }

  fn common_head(&self, run: &Span) -> Option<usize> {
    let hdspan = run.get_head_span(&self.lexemes, false);
    let first = hdspan.first()?;
    if hdspan.len() > 1 {
      let mut hd = first;
      let mut sp = run.clone();
      sp.add(self.lexemes[hd].head);
      let mut steps = 0;
      while sp.get_head_span(&self.lexemes, false).len() > 1
        && !self.lexemes[hd].isroot()
        && steps < self.lexemes.len()
      {
        hd = self.lexemes[hd].head;
        sp.add(self.lexemes[hd].head);
        steps += 1;
      }
      if sp.get_head_span(&self.lexemes, false).len() > 1 {
        tracing::debug!(run = %run.text(&self.lexemes), "proper name has no common head");
        return None;
      }
    }
    Some(first)
  }

  /// Merges multi-word proper names inside noun phrases into their head
  /// lexeme, e.g. `Mr. Vinken` becomes `Mr.-Vinken`, and drops the others.
  pub fn resolve_proper_names(&mut self) {
    let mut to_remove = Span::empty();
    for ci in 0..self.constituents.len() {
      let span = self.constituents[ci].span.difference(&to_remove);
      self.constituents[ci].span = span.clone();
      if span.isempty() || self.constituents[ci].vntype != ConstituentType::NP {
        continue;
      }
      let idxs = span.indexes().to_vec();
      for (s, mut e) in self.proper_name_runs(&idxs) {
        if self.lexemes[idxs[e]].word == "'s" {
          if e == s + 1 {
            continue;
          }
          e -= 1;
        }
        let run = Span::new(idxs[s..=e].iter().copied());
        let Some(h) = self.common_head(&run) else {
          continue;
        };
        let Some(r) = self.lexemes[h].refs.first().cloned() else {
          continue;
        };
        let join = |f: fn(&Lexeme) -> String| {
          run
            .iter()
            .map(|i| f(&self.lexemes[i]))
            .collect::<Vec<_>>()
            .join("-")
        };
        let word = join(|lx| lx.word.clone());
        let stem = join(Lexeme::name_stem);
        let rel = Rel::new(self.lexemes[h].stem.clone(), vec![r]);
        let lx = &mut self.lexemes[h];
        let Some(fc) = lx.drs.as_mut().and_then(|d| d.find_condition_mut(&rel)) else {
          continue;
        };
        fc.name = stem.clone();
        tracing::debug!(%word, "merged proper name");
        lx.stem = stem;
        lx.word = word;
        to_remove = to_remove.union(&Span::new(run.iter().filter(|&i| i != h)));
      }
    }
    if !to_remove.isempty() {
      self.remove_lexemes(&to_remove);
    }
  }

  /// Deletes lexemes, reattaching their dependents and renumbering every
  /// index the composer holds.
  fn remove_lexemes(&mut self, to_remove: &Span) {
    let n = self.lexemes.len();
    let mut del: HashSet<usize> = to_remove.iter().collect();
    if let Some(sh) = self.sentence_head() {
      // the sentence head may only go when it has a single dependent
      if del.contains(&sh) && self.lexemes.iter().filter(|lx| lx.head == sh).count() != 2 {
        del.remove(&sh);
      }
    }
    for i in 0..n {
      if del.contains(&i) {
        continue;
      }
      let mut hd = self.lexemes[i].head;
      let mut steps = 0;
      while del.contains(&hd) && steps < n {
        hd = self.lexemes[hd].head;
        steps += 1;
      }
      self.lexemes[i].head = if del.contains(&hd) { i } else { hd };
    }

    let mut idxmap = vec![None; n];
    let mut k = 0;
    for (i, slot) in idxmap.iter_mut().enumerate() {
      if !del.contains(&i) {
        *slot = Some(k);
        k += 1;
      }
    }
    let old = std::mem::take(&mut self.lexemes);
    self.lexemes = old
      .into_iter()
      .enumerate()
      .filter_map(|(i, mut lx)| {
        let idx = idxmap[i]?;
        lx.idx = idx;
        lx.head = idxmap[lx.head].unwrap_or(idx);
        Some(lx)
      })
      .collect();

    let mut cs = std::mem::take(&mut self.constituents);
    for c in cs.iter_mut() {
      c.span = c.span.remap(&idxmap);
      c.head = match idxmap[c.head] {
        Some(h) => h,
        None => self.span_head(&c.span).unwrap_or(0),
      };
    }
    cs.retain(|c| !c.span.isempty());
    self.constituents = cs;
    self.conjoins = self
      .conjoins
      .iter()
      .map(|c| c.remap(&idxmap))
      .filter(|c| !c.isempty())
      .collect();
    if let Some(p) = self.final_prod.as_mut() {
      p.remap_span(&idxmap);
    }
    self.tree.remove_lexemes(&idxmap);
    self.map_heads_to_constituents();
  }

  /// Pulls the owner in front of a possessive into the possessive's phrase
  /// and links the two with `.POSS`.
  pub fn fixup_possessives(&mut self) {
    let candidates: Vec<usize> = (0..self.constituents.len())
      .filter(|&j| {
        let hd = &self.lexemes[self.constituents[j].head];
        hd.pos.is_possessive()
          && hd.idx > 0
          && (hd.category == *CAT_POSSESSIVE_PRONOUN || hd.category == *CAT_POSSESSIVE_ARGUMENT)
      })
      .collect();
    for j in candidates {
      let ph = self.constituents[j].head;
      let owner = ph - 1;
      if self.constituents[j].span.has(owner) {
        continue;
      }
      let psp = self.constituents[j].span.union(&Span::single(owner));
      if psp.get_head_span(&self.lexemes, false).len() != 1 {
        continue;
      }
      let oc = (0..self.constituents.len())
        .filter(|&i| self.constituents[i].span.has(owner) && !self.constituents[i].span.has(ph))
        .min_by_key(|&i| self.constituents[i].span.len());
      if let Some(i) = oc {
        let rest = self.constituents[i].span.difference(&Span::single(owner));
        if !rest.isempty() && rest.get_head_span(&self.lexemes, false).len() != 1 {
          continue;
        }
        self.constituents[i].span = rest;
      }
      self.constituents[j].span = psp.clone();

      let (Some(o), Some(p)) = (
        self.lexemes[owner].refs.first().cloned(),
        self.lexemes[ph].refs.first().cloned(),
      ) else {
        continue;
      };
      self.lexemes[owner].refs = vec![o.clone(), p];
      let universe = self.lexemes[ph].drs.as_ref().map(|d| d.universe.clone()).unwrap_or_default();
      let refs = self.lexemes[owner].refs.clone();
      self.lexemes[ph].drs = Some(Drs::new(universe, vec![Condition::rel(".POSS", refs)]));
      if let (Some(a), Some(b)) = (psp.first(), psp.last()) {
        if let Some(nd) = self.tree.covering(a, b + 1) {
          self.tree.get_mut(nd).ndtype = ConstituentType::NP;
        }
      }
      tracing::debug!(owner = %self.lexemes[owner].word, "attached possessive owner");
    }
    self.constituents.retain(|c| !c.span.isempty());
    self.map_heads_to_constituents();
  }

  /// Adds the conditions that need the whole sentence: roles shared across
  /// coordinations, appositives (`_AKA`) and noun phrases no event refers
  /// to (`_ORPHANED`).
  pub fn post_create_fixup(&mut self) {
    self
      .drs_extra
      .retain(|c| !matches!(c, Condition::Rel(r) if r.name == "_ORPHANED"));
    for lx in self.lexemes.iter_mut() {
      lx.mask &= !RT_ORPHANED;
    }
    self.propagate_conjoined_roles();

    let akas = self.find_appositives();
    let mut aka_refs = HashSet::new();
    for (a, b) in akas {
      aka_refs.insert(a.clone());
      aka_refs.insert(b.clone());
      self.drs_extra.push(Condition::rel("_AKA", vec![a, b]));
    }
    // a relation between a referent and an event, such as `.DATE`, links it
    // even when the lexeme holding it is itself a noun phrase
    let mut linked = HashSet::new();
    for d in self.lexemes.iter().filter_map(|lx| lx.drs.as_ref()) {
      for rel in d.relations().filter(|rel| rel.refs.len() >= 2) {
        if rel.refs.iter().any(DrsRef::isevent) {
          linked.extend(rel.refs.iter().filter(|r| !r.isevent()).cloned());
        }
      }
    }
    for (r, sp) in self.select_phrases(NP_MASK | RT_ANAPHORA, true, true) {
      if aka_refs.contains(&r) || linked.contains(&r) {
        continue;
      }
      for i in sp.iter() {
        self.lexemes[i].mask |= RT_ORPHANED;
      }
      self.drs_extra.push(Condition::rel("_ORPHANED", vec![r]));
    }
  }

  fn propagate_conjoined_roles(&mut self) {
    if self.conjoins.is_empty() {
      return;
    }
    let orphaned: HashSet<DrsRef> = self
      .select_phrases(NP_MASK | RT_ANAPHORA, true, true)
      .into_iter()
      .map(|(r, _)| r)
      .collect();
    if orphaned.is_empty() {
      return;
    }
    let entity = RT_ENTITY | RT_ANAPHORA | RT_PROPERNAME | RT_DATE | RT_NUMBER;
    let vps = self.select_phrases(RT_EVENT, false, true);
    for cj in self.conjoins.clone() {
      let ents = cj.subspan(&self.lexemes, entity, 0);
      let (orph, linked): (Vec<usize>, Vec<usize>) = ents
        .iter()
        .partition(|&i| self.lexemes[i].refs.first().is_some_and(|r| orphaned.contains(r)));
      let linked: Vec<DrsRef> = linked
        .iter()
        .filter_map(|&i| self.lexemes[i].refs.first().cloned())
        .collect();
      let linked = remove_dups(&linked);
      let ([lr], false) = (linked.as_slice(), orph.is_empty()) else {
        continue;
      };
      let orefs: Vec<DrsRef> = orph
        .iter()
        .filter_map(|&i| self.lexemes[i].refs.first().cloned())
        .collect();
      let orefs = remove_dups(&orefs);
      for (ev, vsp) in vps.iter() {
        let Some(v) = vsp.iter().find(|&i| self.lexemes[i].refs.first() == Some(ev)) else {
          continue;
        };
        let roles: Vec<String> = self.lexemes[v]
          .drs
          .iter()
          .flat_map(|d| d.relations())
          .filter(|r| EVENT_ROLES.contains(&r.name.as_str()) && r.refs.len() == 2)
          .filter(|r| r.refs[0] == *ev && r.refs[1] == *lr)
          .map(|r| r.name.clone())
          .collect();
        if roles.is_empty() {
          continue;
        }
        let lx = &mut self.lexemes[v];
        if let Some(d) = lx.drs.as_mut() {
          for role in roles.iter() {
            for o in orefs.iter() {
              d.conditions.push(Condition::rel(role.clone(), vec![ev.clone(), o.clone()]));
            }
          }
        }
        lx.refs.extend(orefs.iter().cloned());
        tracing::debug!(verb = %lx.word, "shared roles across a coordination");
        break;
      }
    }
  }

  fn find_appositives(&mut self) -> Vec<(DrsRef, DrsRef)> {
    let mut akas = Vec::new();
    let disjoint = self.get_disjoint_drs_spans();
    if disjoint.len() < 2 {
      return akas;
    }
    let n = self.lexemes.len();
    let mut i2dsp = vec![usize::MAX; n];
    for (k, sp) in disjoint.iter().enumerate() {
      for i in sp.iter() {
        i2dsp[i] = k;
      }
    }
    let in_conjoin = |sp: &Span| self.conjoins.iter().any(|c| !c.intersection(sp).isempty());
    let is_article = |lx: &Lexeme| matches!(lx.stem.as_str(), "a" | "an" | "the");
    let mut promote = Vec::new();

    // npL , the npR
    let nps = self.select_phrases(RT_ENTITY | RT_PROPERNAME | RT_ATTRIBUTE | RT_EMPTY_DRS, false, true);
    for w in nps.windows(2) {
      let ((rl, spl), (_, spr)) = (&w[0], &w[1]);
      if in_conjoin(spl) || in_conjoin(spr) {
        continue;
      }
      let Some(lx) = spl.last() else {
        continue;
      };
      if lx + 2 >= n
        || self.lexemes[lx + 1].category != *CAT_COMMA
        || !spr.has(lx + 2)
        || i2dsp[lx] == i2dsp[lx + 2]
      {
        continue;
      }
      let det = &self.lexemes[lx + 2];
      let Some(dr) = det.refs.first() else {
        continue;
      };
      if is_article(det) {
        akas.push((rl.clone(), dr.clone()));
        let preceded = spl
          .first()
          .is_some_and(|f| f > 0 && is_article(&self.lexemes[f - 1]));
        if spl.len() == 1 && !preceded {
          promote.push(lx);
        }
      } else if let Some(p) = spr
        .iter()
        .find(|&i| self.lexemes[i].pos.is_possessive() && self.lexemes[i].refs.len() > 1)
      {
        akas.push((rl.clone(), self.lexemes[p].refs[0].clone()));
      }
    }

    // a npL , Name
    let mask = RT_ENTITY | RT_ANAPHORA | RT_PROPERNAME | RT_ATTRIBUTE | RT_DATE | RT_NUMBER | RT_EMPTY_DRS;
    for (r, spr) in self.select_phrases(mask, false, true) {
      let Some(first) = spr.first() else {
        continue;
      };
      if in_conjoin(&spr)
        || first < 2
        || self.lexemes[first - 1].category != *CAT_COMMA
        || self.lexemes[first - 2].refs.is_empty()
        || i2dsp[first - 2] == i2dsp[first]
      {
        continue;
      }
      let cnp = self
        .constituents
        .iter()
        .filter(|c| c.vntype == ConstituentType::NP && c.span.has(first - 2))
        .min_by_key(|c| c.span.len());
      let Some(cnp) = cnp else {
        continue;
      };
      let hd = &self.lexemes[cnp.head];
      let starts_with_article = cnp.span.first().is_some_and(|f| is_article(&self.lexemes[f]));
      if starts_with_article && hd.has_mask(RT_ENTITY | RT_PROPERNAME) {
        if let Some(hr) = hd.refs.first() {
          akas.push((hr.clone(), r));
        }
      }
    }

    for i in promote {
      self.lexemes[i].promote_to_propernoun();
    }
    remove_dups(&akas)
  }

  /// Links runs of proper nouns to wiki pages. Multi-word matches joined by
  /// `for`, `and` or `of` become one proper name.
  pub fn add_wikipedia_links(&mut self, search: &dyn WikiSearch) {
    let n = self.lexemes.len();
    let mut found: Vec<(Span, WikiPage)> = Vec::new();
    let mut i = 0;
    while i < n {
      if !self.lexemes[i].isproper_noun() {
        i += 1;
        continue;
      }
      let mut ends = vec![i + 1];
      let mut k = i + 1;
      while k + 1 < n
        && matches!(self.lexemes[k].word.as_str(), "for" | "and" | "of")
        && self.lexemes[k + 1].isproper_noun()
      {
        ends.push(k + 2);
        k += 2;
      }
      let mut next = i + 1;
      for &end in ends.iter().rev() {
        let sp = Span::range(i, end);
        let query = sp.text(&self.lexemes);
        let pages = match search.search(&query) {
          Ok(pages) => pages,
          Err(e) => {
            crate::warn_limited!("wiki", %query, "wiki search failed: {}", e);
            continue;
          }
        };
        let words: Vec<String> = sp
          .iter()
          .flat_map(|j| {
            self.lexemes[j]
              .word
              .replace('-', " ")
              .to_lowercase()
              .split_whitespace()
              .map(str::to_string)
              .collect::<Vec<_>>()
          })
          .collect();
        if let Some((_, page)) = best_title_match(&words, &pages, 0.7) {
          found.push((sp, page.clone()));
          next = end;
          break;
        }
      }
      i = next;
    }

    let mut recalc = false;
    for (sp, page) in found {
      if sp.len() == 1 {
        if let Some(f) = sp.first() {
          self.lexemes[f].wiki = Some(page);
        }
        continue;
      }
      let hds = sp.get_head_span(&self.lexemes, false);
      let (Some(hd), 1) = (hds.first(), hds.len()) else {
        tracing::info!(name = %sp.text(&self.lexemes), "wiki match spans several heads");
        continue;
      };
      self.lexemes[hd].wiki = Some(page);
      if !self.constituents.iter().any(|c| c.head == hd) {
        self.constituents.push(Constituent::new(sp.clone(), ConstituentType::NP, hd));
      }
      let Some(r) = sp.first().and_then(|f| self.lexemes[f].refs.first().cloned()) else {
        continue;
      };
      let mut rs = Vec::new();
      for (k, j) in sp.iter().enumerate().skip(1) {
        if k % 2 == 1 {
          let lx = &mut self.lexemes[j];
          lx.refs = vec![r.clone()];
          lx.drs = Some(Drs::default());
          lx.mask |= RT_EMPTY_DRS;
        } else if let Some(o) = self.lexemes[j].refs.first() {
          if *o != r {
            rs.push((o.clone(), r.clone()));
          }
        }
      }
      self.rename_everywhere(&Renaming::new(&rs));
      recalc = true;
    }
    if recalc {
      self.constituents.sort();
      self.map_heads_to_constituents();
      self.resolve_proper_names();
    }
  }

  fn all_variables(&self) -> Vec<DrsRef> {
    let mut vs = Vec::new();
    for lx in self.lexemes.iter() {
      vs.extend(lx.refs.iter().cloned());
      vs.extend(lx.props.iter().cloned());
      if let Some(d) = &lx.drs {
        vs.extend(d.variables());
      }
    }
    if let Some(p) = &self.final_prod {
      vs.extend(p.variables(&self.lexemes));
    }
    vs.extend(Drs::new(Vec::new(), self.drs_extra.clone()).variables());
    remove_dups(&vs)
  }

  /// Referents numbered in order of their first binding, events tagged `E`.
  fn ordered_names(&self) -> Vec<(DrsRef, DrsRef)> {
    let universes: Vec<DrsRef> = self
      .lexemes
      .iter()
      .filter_map(|lx| lx.drs.as_ref())
      .flat_map(|d| d.universe.iter().cloned())
      .collect();
    let mut order = remove_dups(&universes);
    let mut seen: HashSet<DrsRef> = order.iter().cloned().collect();
    for r in self.all_variables() {
      if seen.insert(r.clone()) {
        order.push(r);
      }
    }
    let vtype: HashMap<&DrsRef, u64> = self
      .lexemes
      .iter()
      .filter(|lx| lx.drs.as_ref().is_some_and(|d| !d.universe.is_empty()))
      .filter_map(|lx| lx.refs.first().map(|r| (r, lx.mask)))
      .collect();
    order
      .iter()
      .enumerate()
      .map(|(i, r)| {
        let event = vtype.get(r).map_or(r.isevent(), |m| m & RT_EVENT != 0);
        let to = if event { DrsRef::event(i + 1) } else { DrsRef::entity(i + 1) };
        (r.clone(), to)
      })
      .collect()
  }

  /// Referents named after the word that introduces them.
  fn word_index_names(&self) -> Vec<(DrsRef, DrsRef)> {
    let n = self.lexemes.len();
    let mut map: BTreeMap<DrsRef, usize> = BTreeMap::new();
    let mut used: HashSet<usize> = HashSet::new();
    let bound = RT_EVENT | RT_ANAPHORA | RT_ENTITY | RT_PROPERNAME;
    for pass in [true, false] {
      for lx in self.lexemes.iter().filter(|lx| lx.has_mask(bound) == pass) {
        if let Some(r) = lx.refs.first() {
          if !map.contains_key(r) && used.insert(lx.idx) {
            map.insert(r.clone(), lx.idx);
          }
        }
      }
    }
    let mut next = n;
    for r in self.all_variables() {
      if !map.contains_key(&r) {
        while used.contains(&next) {
          next += 1;
        }
        used.insert(next);
        map.insert(r, next);
      }
    }
    map
      .into_iter()
      .map(|(r, i)| {
        let event = self.lexemes.get(i).map_or(r.isevent(), |lx| lx.has_mask(RT_EVENT));
        let to = if event { DrsRef::event(i + 1) } else { DrsRef::entity(i + 1) };
        (r, to)
      })
      .collect()
  }

  /// Gives the referents their final names and drops role conditions whose
  /// argument nothing else mentions.
  pub fn final_rename(&mut self) {
    let rs = if self.options.contains(ComposeOptions::VARNAMES_MATCH_WORD_INDEX) {
      self.word_index_names()
    } else {
      self.ordered_names()
    };
    self.rename_everywhere(&Renaming::new(&rs));
    self.xid = VAR_LIMIT;
    self.eid = VAR_LIMIT;
    self.drop_orphaned_roles();
  }

  fn drop_orphaned_roles(&mut self) {
    let mut uses: HashMap<DrsRef, usize> = HashMap::new();
    let mut bound: HashSet<DrsRef> = HashSet::new();
    let drss = self.lexemes.iter().filter_map(|lx| lx.drs.as_ref());
    let extra = Drs::new(Vec::new(), self.drs_extra.clone());
    for lx in self.lexemes.iter() {
      bound.extend(lx.props.iter().cloned());
    }
    for d in drss.chain(std::iter::once(&extra)) {
      bound.extend(d.universe.iter().cloned());
      for c in d.conditions.iter() {
        let refs = match c {
          Condition::Rel(r) => r.refs.clone(),
          other => Drs::new(Vec::new(), vec![other.clone()]).variables(),
        };
        for x in refs {
          *uses.entry(x).or_default() += 1;
        }
      }
    }
    let orphaned = |r: &Rel| {
      EVENT_ROLES.contains(&r.name.as_str())
        && r.refs.len() >= 2
        && r.refs[1..]
          .iter()
          .all(|x| !bound.contains(x) && uses.get(x).copied().unwrap_or(0) <= 1)
    };
    for lx in self.lexemes.iter_mut() {
      if let Some(d) = lx.drs.as_mut() {
        d.conditions
          .retain(|c| !matches!(c, Condition::Rel(r) if orphaned(r)));
      }
    }
  }

  // -- views --------------------------------------------------------------

  /// The sentence DRS: every lexeme's DRS plus the extra conditions.
  pub fn get_drs(&self, nodups: bool) -> Drs {
    let mut d = Span::range(0, self.lexemes.len()).get_drs(&self.lexemes);
    d.conditions.extend(self.drs_extra.iter().cloned());
    if nodups {
      d.universe = remove_dups(&d.universe);
      d.conditions = remove_dups(&d.conditions);
    }
    d
  }

  /// Groups lexemes selected by `mask` on their first referent.
  ///
  /// With `exclude`, referents of any unselected lexeme whose DRS binds two
  /// or more referents are dropped, which leaves the phrases nothing refers
  /// to. With `contiguous`, trailing coordinators are trimmed and phrases
  /// with content in their gaps are dropped. Results are sorted by span.
  pub fn select_phrases(&self, mask: u64, exclude: bool, contiguous: bool) -> Vec<(DrsRef, Span)> {
    let mut map: BTreeMap<DrsRef, Span> = BTreeMap::new();
    let mut excluded: Vec<DrsRef> = Vec::new();
    for lx in self.lexemes.iter() {
      let Some(r) = lx.refs.first() else {
        continue;
      };
      if lx.has_mask(mask) {
        map.entry(r.clone()).or_insert_with(Span::empty).add(lx.idx);
      } else if exclude {
        let vs = lx.variables();
        if vs.len() >= 2 {
          excluded.extend(vs);
        }
      }
    }
    for r in excluded.iter() {
      map.remove(r);
    }

    let separator = |i: usize| {
      let c = &self.lexemes[i].category;
      *c == *CAT_COMMA || *c == *CAT_CONJ
    };
    let mut out = Vec::with_capacity(map.len());
    for (r, mut sp) in map {
      while let Some(f) = sp.first().filter(|&f| separator(f)) {
        sp.remove(f);
      }
      while let Some(l) = sp.last().filter(|&l| separator(l)) {
        sp.remove(l);
      }
      if sp.isempty() || (sp.len() == 1 && sp.iter().all(|i| self.lexemes[i].has_mask(RT_EMPTY_DRS))) {
        continue;
      }
      if contiguous {
        while sp.fullspan().len() != sp.len() {
          let Some(l) = sp.last() else {
            break;
          };
          let trailing = matches!(
            self.lexemes[l].stem.as_str(),
            "or" | "and" | "neither" | "nor" | "-LRB-" | "-RRB-" | "-LQU-" | "-RQU-"
          );
          if !trailing {
            break;
          }
          sp.remove(l);
        }
        let gaps = sp.fullspan().difference(&sp);
        if gaps
          .iter()
          .any(|i| self.lexemes[i].drs.as_ref().is_some_and(|d| !d.isempty()))
        {
          continue;
        }
      }
      if !sp.isempty() {
        out.push((r, sp));
      }
    }
    out.sort_by(|a, b| a.1.cmp(&b.1));
    out
  }

  pub fn get_np_nominals(&self) -> Vec<(DrsRef, Span)> {
    self.select_phrases(NP_MASK, false, true)
  }

  pub fn get_vp_nominals(&self) -> Vec<(DrsRef, Span)> {
    self.select_phrases(VP_MASK, false, true)
  }

  pub fn get_orphaned_np_nominals(&self) -> Option<Vec<(DrsRef, Span)>> {
    let nps = self.select_phrases(RT_ORPHANED, false, true);
    (!nps.is_empty()).then_some(nps)
  }

  /// Lexeme spans that share no referents with each other, sorted.
  pub fn get_disjoint_drs_spans(&self) -> Vec<Span> {
    let mut r2i: BTreeMap<DrsRef, Vec<usize>> = BTreeMap::new();
    let mut i2r: HashMap<usize, Vec<DrsRef>> = HashMap::new();
    for lx in self.lexemes.iter() {
      let (Some(d), Some(r0)) = (lx.drs.as_ref(), lx.refs.first()) else {
        continue;
      };
      let vs = if d.isempty() { vec![r0.clone()] } else { d.variables() };
      for r in vs.iter() {
        r2i.entry(r.clone()).or_default().push(lx.idx);
      }
      i2r.insert(lx.idx, vs);
    }
    let mut seen: HashSet<&DrsRef> = HashSet::new();
    let mut spans = Vec::new();
    for r in r2i.keys() {
      if seen.contains(r) {
        continue;
      }
      let mut sp = Span::empty();
      let mut stk = vec![r];
      while let Some(x) = stk.pop() {
        if !seen.insert(x) {
          continue;
        }
        for &i in r2i.get(x).into_iter().flatten() {
          sp.add(i);
          stk.extend(i2r.get(&i).into_iter().flatten());
        }
      }
      spans.push(sp);
    }
    spans.sort();
    spans
  }

  fn leaf_predarg(&self, lx: &Lexeme) -> String {
    if rule_category(&lx.category).isempty() {
      return lx.category.to_string();
    }
    match lx.get_template(&self.model) {
      Ok(Some(t)) => t.predarg_category().to_string(),
      _ => lx.category.to_string(),
    }
  }

  /// The derivation in CCGbank notation with predicate-argument categories
  /// on the leaves. Unary type changes show up as `UNARY` leaves.
  pub fn get_predarg_ccgbank(&self, pretty: bool) -> Result<String, Error> {
    let sep = if pretty { "\n" } else { " " };
    let indent = |depth: usize| if pretty { "  ".repeat(depth) } else { String::new() };
    let wrap = |ind: &str, cat: &Category, head: usize, children: &[&str]| {
      format!(
        "{}(<T {} {} {}>{}{}{}{})",
        ind,
        cat,
        head,
        children.len(),
        sep,
        children.join(sep),
        sep,
        ind
      )
    };
    let mut stk: Vec<String> = Vec::new();
    let underflow = || Error::compose("derivation stack underflow");
    for (id, node) in self.tree.iter() {
      let ind = indent(node.depth);
      let inner = indent(node.depth + 1);
      let unary_leaf = |ind: &str, argument: &Category| -> Result<String, Error> {
        let unary = self.find_unary(&node.category, argument)?;
        let t = unary.template();
        Ok(format!(
          "{}(<L {} UNARY UNARY .UNARY {}>)",
          ind,
          t.clean_category(),
          t.predarg_category()
        ))
      };
      let s = match node.kind {
        NodeKind::Leaf(i) => {
          let lx = &self.lexemes[i];
          format!(
            "{}(<L {} {} {} {} {}>)",
            ind,
            lx.category,
            lx.pos,
            lx.pos,
            lx.word,
            self.leaf_predarg(lx)
          )
        }
        NodeKind::Unary(c) => {
          let a = stk.pop().ok_or_else(underflow)?;
          if node.rule == Some(Rule::TclUnary) {
            let u = unary_leaf(&inner, &self.tree.get(c).category)?;
            wrap(&ind, &node.category, 0, &[a.as_str(), u.as_str()])
          } else {
            wrap(&ind, &node.category, 0, &[a.as_str()])
          }
        }
        NodeKind::Binary(l, r) => {
          let b = stk.pop().ok_or_else(underflow)?;
          let a = stk.pop().ok_or_else(underflow)?;
          match node.rule {
            Some(Rule::TclUnary) => {
              let u = unary_leaf(&indent(node.depth + 2), &self.tree.get(l).category)?;
              let a = wrap(&inner, &node.category, 0, &[a.as_str(), u.as_str()]);
              wrap(&ind, &node.category, 0, &[a.as_str(), b.as_str()])
            }
            Some(Rule::TcrUnary) => {
              let u = unary_leaf(&indent(node.depth + 2), &self.tree.get(r).category)?;
              let b = wrap(&inner, &node.category, 0, &[b.as_str(), u.as_str()]);
              wrap(&ind, &node.category, 1, &[a.as_str(), b.as_str()])
            }
            _ => wrap(&ind, &node.category, node.head_child, &[a.as_str(), b.as_str()]),
          }
        }
      };
      tracing::trace!(node = id, "{}", s);
      stk.push(s);
    }
    let out = stk.pop().ok_or_else(underflow)?;
    if !stk.is_empty() {
      return Err(Error::compose("derivation has more than one root"));
    }
    Ok(out)
  }

  pub fn to_sentence(&self) -> Sentence {
    Sentence::new(self.lexemes.clone(), self.constituents.clone(), self.get_drs(true))
  }
}

/// Composes a DRS from a parsed derivation. Functor categories the builtin
/// model lacks get templates from the derivation's own tagged categories.
pub fn process_ccg_pt(pt: &PTree, options: ComposeOptions) -> Result<Ccg2Drs<'static>, Error> {
  let model = Model::builtin().with_predarg_templates(pt.predarg_categories().iter());
  let mut ccg = Ccg2Drs::with_model(options, Cow::Owned(model));
  ccg.process(pt, &NullWikiSearch)?;
  Ok(ccg)
}

/// Re-emits a derivation with predicate-argument categories on its leaves.
pub fn pt_to_ccgbank(pt: &PTree, pretty: bool) -> Result<String, Error> {
  let mut ccg = Ccg2Drs::new(ComposeOptions::NONE, Model::builtin());
  ccg.build_execution_sequence(pt)?;
  ccg.get_predarg_ccgbank(pretty)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parse_derivation::parse_ccg_derivation;
  use crate::rules::{get_rule_excluding, Exclusions};
  use crate::utils::Err;

  const BOY: &str = r"(<T S[dcl] 1 2>
    (<T NP 0 2>
      (<L NP[nb]/N DT DT The NP[nb]_1/N_1>)
      (<L N NN NN boy N>))
    (<T S[dcl]\NP 0 2>
      (<L (S[dcl]\NP)/(S[b]\NP) MD MD will (S[dcl]\NP_1)/(S[b]_2\NP_1)_2>)
      (<T S[b]\NP 0 2>
        (<L (S[b]\NP)/(S[to]\NP) VB VB want (S[b]\NP_1)/(S[to]_2\NP_1)_2>)
        (<T S[to]\NP 0 2>
          (<L (S[to]\NP)/(S[b]\NP) TO TO to (S[to]\NP_1)/(S[b]_2\NP_1)_2>)
          (<T S[b]\NP 0 2>
            (<L (S[b]\NP)/NP VB VB believe (S[b]\NP_1)/NP_2>)
            (<T NP 0 2>
              (<L NP[nb]/N DT DT the NP[nb]_1/N_1>)
              (<L N NN NN girl N>)))))))";

  const TALL: &str = r"(<T S[dcl] 0 2>
    (<T S[dcl] 1 2>
      (<L NP PRP PRP He NP>)
      (<T S[dcl]\NP 0 2>
        (<L (S[dcl]\NP)/(S[adj]\NP) VBZ VBZ is (S[dcl]\NP_1)/(S[adj]_2\NP_1)>)
        (<L S[adj]\NP JJ JJ tall S[adj]\NP_1>)))
    (<L . . . . .>))";

  const OWNED: &str = r"(<T N 0 2>
    (<L N NN NN stock N>)
    (<T N\N 0 1>
      (<L S[pss]\NP VBN VBN owned S[pss]\NP_1>)))";

  const VINKEN: &str = r"(<T S[dcl] 0 2>
    (<T S[dcl] 1 2>
      (<T NP 0 1>
        (<T N 1 2>
          (<L N/N NNP NNP Mr. N_1/N_1>)
          (<L N NNP NNP Vinken N>)))
      (<L S[dcl]\NP VBZ VBZ runs S[dcl]\NP_1>))
    (<L . . . . .>))";

  const ELSEVIER: &str = r"(<T S[dcl] 0 2>
    (<T S[dcl] 1 2>
      (<T NP 0 1>
        (<T N 1 2>
          (<L N/N NNP NNP Mr. N_142/N_142>)
          (<L N NNP NNP Vinken N>)))
      (<T S[dcl]\NP 0 2>
        (<L (S[dcl]\NP)/NP VBZ VBZ is (S[dcl]\NP_87)/NP_88>)
        (<T NP 0 2>
          (<T NP 0 1>
            (<L N NN NN chairman N>))
          (<T NP\NP 0 2>
            (<L (NP\NP)/NP IN IN of (NP_99\NP_99)/NP_100>)
            (<T NP 0 2>
              (<T NP 0 1>
                (<T N 1 2>
                  (<L N/N NNP NNP Elsevier N_109/N_109>)
                  (<L N NNP NNP N.V. N>)))
              (<T NP[conj] 1 2>
                (<L , , , , ,>)
                (<T NP 1 2>
                  (<L NP[nb]/N DT DT the NP[nb]_131/N_131>)
                  (<T N 1 2>
                    (<L N/N NNP NNP Dutch N_126/N_126>)
                    (<T N 1 2>
                      (<L N/N VBG VBG publishing N_119/N_119>)
                      (<L N NN NN group N>))))))))))
    (<L . . . . .>))";

  const PIERRE: &str = r"(<T S[dcl] 0 2>
    (<T S[dcl] 1 2>
      (<T NP 0 2>
        (<T NP 0 2>
          (<T NP 0 2>
            (<T NP 0 1>
              (<T N 1 2>
                (<L N/N NNP NNP Pierre N_73/N_73>)
                (<L N NNP NNP Vinken N>)))
            (<L , , , , ,>))
          (<T NP\NP 0 1>
            (<T S[adj]\NP 1 2>
              (<T NP 0 1>
                (<T N 1 2>
                  (<L N/N CD CD 61 N_93/N_93>)
                  (<L N NNS NNS years N>)))
              (<L (S[adj]\NP)\NP JJ JJ old (S[adj]\NP_83)\NP_84>))))
        (<L , , , , ,>))
      (<T S[dcl]\NP 0 2>
        (<L (S[dcl]\NP)/(S[b]\NP) MD MD will (S[dcl]\NP_10)/(S[b]_11\NP_10:B)_11>)
        (<T S[b]\NP 0 2>
          (<T S[b]\NP 0 2>
            (<T (S[b]\NP)/PP 0 2>
              (<L ((S[b]\NP)/PP)/NP VB VB join ((S[b]\NP_20)/PP_21)/NP_22>)
              (<T NP 1 2>
                (<L NP[nb]/N DT DT the NP[nb]_29/N_29>)
                (<L N NN NN board N>)))
            (<T PP 0 2>
              (<L PP/NP IN IN as PP/NP_34>)
              (<T NP 1 2>
                (<L NP[nb]/N DT DT a NP[nb]_48/N_48>)
                (<T N 1 2>
                  (<L N/N JJ JJ nonexecutive N_43/N_43>)
                  (<L N NN NN director N>)))))
          (<T (S\NP)\(S\NP) 0 2>
            (<L ((S\NP)\(S\NP))/N[num] NNP NNP Nov. ((S_61\NP_56)_61\(S_61\NP_56)_61)/N[num]_62>)
            (<L N[num] CD CD 29 N[num]>)))))
    (<L . . . . .>))";

  fn options() -> ComposeOptions {
    ComposeOptions::NO_VERBNET | ComposeOptions::NO_WIKI_SEARCH
  }

  fn compose(s: &str, options: ComposeOptions) -> Ccg2Drs<'static> {
    let pt = parse_ccg_derivation(s).unwrap();
    process_ccg_pt(&pt, options).unwrap()
  }

  fn find_rel<'d>(d: &'d Drs, name: &str) -> &'d Rel {
    d.relations()
      .find(|r| r.name == name)
      .unwrap_or_else(|| panic!("no {} in {}", name, d))
  }

  fn constituents(ccg: &Ccg2Drs<'_>) -> Vec<(String, String)> {
    ccg
      .constituents
      .iter()
      .map(|c| (c.vntype.signature().to_string(), c.text(&ccg.lexemes)))
      .collect()
  }

  #[test]
  fn test_control_verbs() {
    let ccg = compose(BOY, options() | ComposeOptions::NUMBERED_ROLES);
    assert_eq!(
      ccg.get_drs(true).to_string(),
      "[X1,E2,E3,X4| boy(X1),will(E2),.MODAL(E2),want(E2),.EVENT(E2),.ARG0(E2,X1),.ARG1(E2,E3),\
       believe(E3),.EVENT(E3),.ARG0(E3,X1),.ARG1(E3,X4),girl(X4)]"
    );

    let found = constituents(&ccg);
    let expected: Vec<(String, String)> = [
      ("S_DCL", "The boy will want to believe the girl"),
      ("NP", "The boy"),
      ("VP", "will want to believe the girl"),
      ("S_INF", "want to believe the girl"),
      ("S_INF", "to believe the girl"),
      ("NP", "the girl"),
    ]
    .iter()
    .map(|(t, s)| (t.to_string(), s.to_string()))
    .collect();
    for c in expected.iter() {
      assert!(found.contains(c), "missing {:?} in {:?}", c, found);
    }
    let extra = ("S_INF".to_string(), "believe the girl".to_string());
    assert!(
      found.iter().all(|c| expected.contains(c) || *c == extra),
      "unexpected constituents in {:?}",
      found
    );
    assert!(ccg.drs_extra.is_empty());
  }

  #[test]
  fn test_constituent_tree() {
    let ccg = compose(BOY, options());
    let roots: Vec<&Constituent> = ccg.constituents.iter().filter(|c| c.chead.is_none()).collect();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].vntype, ConstituentType::SDCL);
    for c in ccg.constituents.iter() {
      if let Some(p) = c.chead {
        assert!(ccg.constituents[p].span.contains(&c.span));
      }
    }
    let s = ccg.to_sentence();
    let tree = s.get_constituent_tree();
    assert!(s.constituent_tree_string(&tree).contains("S_DCL"));
    let deps = s.get_dependency_tree();
    assert_eq!(deps.len(), 1);
    assert_eq!(s.lexemes[deps[0].idx].word, "will");
  }

  #[test]
  fn test_copular_attribute() {
    let ccg = compose(TALL, options());
    let d = ccg.get_drs(true);
    let role = find_rel(&d, ".ROLE");
    let agent = find_rel(&d, ".AGENT");
    let event = find_rel(&d, ".EVENT");
    assert_eq!(role.refs[0], event.refs[0]);
    assert_eq!(agent.refs[0], event.refs[0]);
    assert_eq!(role.refs[1], find_rel(&d, "tall").refs[0]);
    assert_eq!(agent.refs[1], find_rel(&d, "he").refs[0]);
    let tall = ccg.lexemes.iter().find(|lx| lx.word == "tall").unwrap();
    assert!(tall.has_mask(RT_ATTRIBUTE));
  }

  #[test]
  fn test_unary_modifier() {
    let pt = parse_ccg_derivation(OWNED).unwrap();
    let mut ccg = Ccg2Drs::new(options(), Model::builtin());
    ccg.build_execution_sequence(&pt).unwrap();
    let root = ccg.tree().root().unwrap();
    let unary = ccg.tree().get(root).children()[1];
    assert_eq!(ccg.tree().get(unary).rule, Some(Rule::TclUnary));

    ccg.create_drs().unwrap();
    assert_eq!(ccg.final_production().unwrap().category().signature(), "N");
    let d = ccg.get_drs(true);
    let m = find_rel(&d, ".MOD");
    assert_eq!(m.refs[0], ccg.lexemes[1].refs[0]);
    assert_eq!(m.refs[1], ccg.lexemes[0].refs[0]);
    assert_eq!(find_rel(&d, "stock").refs[0], m.refs[1]);
    // a one word adverbial phrase over an event is dropped with its mark
    assert!(!ccg.lexemes[1].has_mask(RT_ADJUNCT));
    assert!(ccg.constituents.iter().all(|c| c.vntype != ConstituentType::ADVP));
  }

  #[test]
  fn test_resolve_proper_names() {
    let ccg = compose(VINKEN, options());
    assert_eq!(ccg.lexemes.len(), 3);
    assert_eq!(ccg.lexemes[0].word, "Mr.-Vinken");
    for (i, lx) in ccg.lexemes.iter().enumerate() {
      assert_eq!(lx.idx, i);
      assert!(lx.head < ccg.lexemes.len());
    }
    let d = ccg.get_drs(true);
    let name = find_rel(&d, "Mr.-Vinken");
    assert_eq!(name.refs, ccg.lexemes[0].refs[..1].to_vec());
    assert!(ccg.constituents.iter().all(|c| c.span.iter().all(|i| i < 3)));
  }

  fn aka_pairs(ccg: &Ccg2Drs<'_>) -> Vec<Vec<DrsRef>> {
    ccg
      .drs_extra
      .iter()
      .filter_map(|c| match c {
        Condition::Rel(r) if r.name == "_AKA" => Some(r.refs.clone()),
        _ => None,
      })
      .collect()
  }

  fn orphans(ccg: &Ccg2Drs<'_>) -> Vec<DrsRef> {
    ccg
      .drs_extra
      .iter()
      .filter_map(|c| match c {
        Condition::Rel(r) if r.name == "_ORPHANED" => r.refs.first().cloned(),
        _ => None,
      })
      .collect()
  }

  fn lexeme<'c>(ccg: &'c Ccg2Drs<'_>, word: &str) -> &'c Lexeme {
    ccg
      .lexemes
      .iter()
      .find(|lx| lx.word == word)
      .unwrap_or_else(|| panic!("no {} in sentence", word))
  }

  #[test]
  fn test_appositive_names() {
    let mut ccg = compose(ELSEVIER, options());
    let words: Vec<&str> = ccg.lexemes.iter().map(|lx| lx.word.as_str()).collect();
    assert_eq!(
      words,
      vec!["Mr.-Vinken", "is", "chairman", "of", "Elsevier-N.V.", ",", "the", "Dutch", "publishing", "group", "."]
    );
    let d = ccg.get_drs(true);
    let vinken = lexeme(&ccg, "Mr.-Vinken");
    let elsevier = lexeme(&ccg, "Elsevier-N.V.");
    assert_eq!(find_rel(&d, "Mr.-Vinken").refs, vinken.refs[..1].to_vec());
    assert_eq!(find_rel(&d, "Elsevier-N.V.").refs, elsevier.refs[..1].to_vec());

    let group = lexeme(&ccg, "group").refs[0].clone();
    let akas = aka_pairs(&ccg);
    assert!(
      akas.contains(&vec![elsevier.refs[0].clone(), group.clone()]),
      "{:?}",
      akas
    );
    assert!(!orphans(&ccg).contains(&group));

    let found = constituents(&ccg);
    for (t, text) in [
      ("NP", "Mr.-Vinken"),
      ("NP", "Elsevier-N.V."),
      ("NP", "the Dutch publishing group"),
    ] {
      let c = (t.to_string(), text.to_string());
      assert!(found.contains(&c), "missing {:?} in {:?}", c, found);
    }
    for (t, start) in [("S_DCL", "Mr.-Vinken is"), ("VP", "is chairman"), ("NP", "chairman of"), ("PP", "of Elsevier-N.V.")] {
      assert!(
        found.iter().any(|(ft, text)| ft == t && text.starts_with(start)),
        "no {} starting {:?} in {:?}",
        t,
        start,
        found
      );
    }

    // merging again finds nothing left to merge
    let before = (words.iter().map(|w| w.to_string()).collect::<Vec<_>>(), d.to_string(), found);
    ccg.resolve_proper_names();
    let words: Vec<String> = ccg.lexemes.iter().map(|lx| lx.word.clone()).collect();
    assert_eq!(before, (words, ccg.get_drs(true).to_string(), constituents(&ccg)));
  }

  #[test]
  fn test_dated_adjunct() {
    let ccg = compose(PIERRE, options());
    let found = constituents(&ccg);
    for (t, text) in [
      ("NP", "Pierre-Vinken"),
      ("ADJP", "61 years old"),
      ("PP", "as a nonexecutive director"),
      ("NP", "the board"),
      // the date adjunct is typed by its noun argument
      ("NP", "Nov. 29"),
    ] {
      let c = (t.to_string(), text.to_string());
      assert!(found.contains(&c), "missing {:?} in {:?}", c, found);
    }
    assert!(found.iter().any(|(t, text)| t == "VP" && text.starts_with("join the board")), "{:?}", found);
    let roots: Vec<&Constituent> = ccg.constituents.iter().filter(|c| c.chead.is_none()).collect();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].vntype, ConstituentType::SDCL);

    let d = ccg.get_drs(true);
    let month = find_rel(&d, "November");
    let date = find_rel(&d, ".DATE");
    let day = find_rel(&d, "29");
    assert_eq!(date.refs.len(), 2);
    assert_eq!(date.refs[0], month.refs[0]);
    assert_eq!(day.refs[0], month.refs[0]);
    assert!(!month.refs[0].isevent());
    assert!(date.refs[1].isevent());
    assert!(!orphans(&ccg).contains(&month.refs[0]), "{}", d);
  }

  /// Every combinator is found exactly once when the search is repeated
  /// with the rules already found excluded.
  #[test]
  fn test_rule_uniqueness() {
    fn count(left: &Category, right: &Category, result: &Category) -> usize {
      let mut x = Exclusions::new();
      while x.len() < 5 && get_rule_excluding(left, right, result, Some(&mut x)).is_some() {}
      x.len()
    }

    for s in [BOY, TALL, OWNED, VINKEN, ELSEVIER, PIERRE] {
      let pt = parse_ccg_derivation(s).unwrap();
      let mut ccg = Ccg2Drs::new(options(), Model::builtin());
      ccg.build_execution_sequence(&pt).unwrap();
      let tree = ccg.tree();
      for id in 0..tree.len() {
        let node = tree.get(id);
        let children = node.children();
        let Some(&l) = children.first() else {
          continue;
        };
        let left = rule_category(&tree.get(l).category);
        let right = children
          .get(1)
          .map_or_else(|| CAT_EMPTY.clone(), |&r| rule_category(&tree.get(r).category));
        let mut n = count(&left, &right, &node.category);
        if n == 0 {
          n = count(&left.simplify(), &right.simplify(), &node.category);
        }
        assert_eq!(n, 1, "{} {} => {}", left, right, node.category);
      }
    }
  }

  /// A noun phrase nothing links to is either an alias or marked orphaned.
  #[test]
  fn test_orphans_exhaustive() {
    for s in [BOY, TALL, VINKEN, ELSEVIER, PIERRE] {
      let ccg = compose(s, options());
      let akas: HashSet<DrsRef> = aka_pairs(&ccg).into_iter().flatten().collect();
      let orphaned = orphans(&ccg);
      for (r, sp) in ccg.get_np_nominals() {
        let linked = ccg
          .lexemes
          .iter()
          .any(|lx| lx.variables().len() >= 2 && lx.variables().contains(&r));
        if !linked && !akas.contains(&r) {
          assert!(orphaned.contains(&r), "{} is not marked in {:?}", sp.text(&ccg.lexemes), orphaned);
          assert!(ccg.lexemes.iter().any(|lx| lx.refs.first() == Some(&r) && lx.has_mask(RT_ORPHANED)));
        }
      }
    }
  }

  #[test]
  fn test_word_index_names() {
    let ccg = compose(BOY, options() | ComposeOptions::VARNAMES_MATCH_WORD_INDEX);
    let d = ccg.get_drs(true);
    let boy = ccg.lexemes.iter().find(|lx| lx.word == "boy").unwrap();
    assert_eq!(find_rel(&d, "boy").refs[0], DrsRef::entity(boy.idx + 1));
    assert!(find_rel(&d, "want").refs[0].isevent());
    assert_ne!(find_rel(&d, "girl").refs[0], find_rel(&d, "boy").refs[0]);
    assert!(d.variables().iter().all(|r| (1..=ccg.lexemes.len()).contains(&r.idx())));
  }

  #[test]
  fn test_phrases() {
    let ccg = compose(BOY, options());
    let nps = ccg.get_np_nominals();
    let texts: Vec<String> = nps.iter().map(|(_, sp)| sp.text(&ccg.lexemes)).collect();
    assert_eq!(texts, vec!["The boy", "the girl"]);
    let vps = ccg.get_vp_nominals();
    assert!(vps.iter().any(|(_, sp)| sp.text(&ccg.lexemes).contains("want")));
    assert!(ccg.get_orphaned_np_nominals().is_none());

    let disjoint = ccg.get_disjoint_drs_spans();
    assert!(disjoint.iter().any(|sp| sp.has(1) && sp.has(7)), "{:?}", disjoint);
  }

  #[test]
  fn test_predarg_ccgbank() {
    let pt = parse_ccg_derivation(TALL).unwrap();
    let s = pt_to_ccgbank(&pt, false).unwrap();
    assert!(s.starts_with("(<T S[dcl] 0 2>"), "{}", s);
    assert!(s.contains("(<L NP PRP PRP He NP>)"), "{}", s);
    let again = parse_ccg_derivation(&s).unwrap();
    let words: Vec<&str> = again.leaves().iter().map(|l| l.word.as_str()).collect();
    assert_eq!(words, vec!["He", "is", "tall", "."]);

    let pretty = pt_to_ccgbank(&pt, true).unwrap();
    assert!(pretty.lines().count() > 4);
    assert_eq!(
      parse_ccg_derivation(&pretty).unwrap().leaves().len(),
      again.leaves().len()
    );
  }

  #[test]
  fn test_predarg_unary_leaf() {
    let pt = parse_ccg_derivation(OWNED).unwrap();
    let s = pt_to_ccgbank(&pt, false).unwrap();
    assert!(s.contains("UNARY UNARY .UNARY"), "{}", s);
    let again = parse_ccg_derivation(&s).unwrap();
    assert_eq!(again.leaves().len(), 3);
    assert_eq!(again.leaves()[2].word, ".UNARY");
  }

  #[test]
  fn test_bad_derivation() {
    let pt = parse_ccg_derivation(r"(<T NP 0 2> (<L NP NN NN a NP>) (<L NP NN NN b NP>))").unwrap();
    let mut ccg = Ccg2Drs::new(options(), Model::builtin());
    match ccg.build_execution_sequence(&pt) {
      Err(Error::CombinatorNotFound { .. }) => {}
      other => panic!("expected CombinatorNotFound, got {:?}", other.err()),
    }
  }

  struct FailingSearch;

  impl WikiSearch for FailingSearch {
    fn search(&self, _query: &str) -> Result<Vec<WikiPage>, Err> {
      Err("offline".into())
    }
  }

  struct OnePage;

  impl WikiSearch for OnePage {
    fn search(&self, query: &str) -> Result<Vec<WikiPage>, Err> {
      let title = query.replace('-', " ");
      Ok(vec![WikiPage::new(&title, "https://en.wikipedia.org/wiki/Vinken")])
    }
  }

  #[test]
  fn test_wiki_links() {
    let pt = parse_ccg_derivation(VINKEN).unwrap();
    let mut ccg = Ccg2Drs::new(ComposeOptions::NO_VERBNET, Model::builtin());
    ccg.process(&pt, &FailingSearch).unwrap();
    assert!(ccg.lexemes.iter().all(|lx| lx.wiki.is_none()));

    let mut ccg = Ccg2Drs::new(ComposeOptions::NO_VERBNET, Model::builtin());
    ccg.process(&pt, &OnePage).unwrap();
    assert!(ccg.lexemes[0].wiki.is_some());
  }
}
