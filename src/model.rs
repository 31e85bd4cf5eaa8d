//! The semantic model: functor templates keyed by category, plus the unary
//! type changing rules.
//!
//! A template is read from a predicate-argument category such as
//! `(S[dcl]_1\NP_2)/NP_3`, where atoms sharing a tag share a referent.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use regex::Regex;

use crate::category::{
  Category, Slash, CAT_CONJ, CAT_CONJCONJ, CAT_CONJ_CONJ, CAT_SADJ, CAT_SANY,
};
use crate::drs::DrsRef;
use crate::error::Error;
use crate::production::{identity_functor, DrsProduction, FunctorProduction, Production, Scope};
use crate::sentence::Span;

/// First tag used when completing the tags of an inferred template.
pub const INFERRED_TAG: usize = 900;

lazy_static! {
  static ref PREDARG_IDX: Regex = Regex::new(r"^.*_(\d+)$").unwrap();
  static ref FEATURE: Regex = Regex::new(r"\[[a-z]+\]").unwrap();
  static ref BUILTIN: Model = Model::from_builtin();
  static ref UCONJ: Model = Model::from_text("", UCONJ_UNARY_RULES);
}

/// Referent allocation while reading a predicate-argument category.
#[derive(Default)]
struct TemplateGen {
  i: usize,
  tags: HashMap<String, DrsRef>,
}

impl TemplateGen {
  fn referent(&mut self, atom: &Category) -> DrsRef {
    let key = PREDARG_IDX
      .captures(atom.signature())
      .map(|caps| caps[1].to_string());
    if let Some(r) = key.as_ref().and_then(|k| self.tags.get(k)) {
      return r.clone();
    }
    self.i += 1;
    let clean = atom.clean(true);
    let r = if CAT_SANY.ismember(&clean) && clean != *CAT_SADJ {
      DrsRef::event(self.i)
    } else {
      DrsRef::entity(self.i)
    };
    if let Some(k) = key {
      self.tags.insert(k, r.clone());
    }
    r
  }
}

/// Recipe for the functor production of a category.
#[derive(Debug, Clone)]
pub struct FunctorTemplate {
  /// Referents bound per scope, innermost (first consumed) first.
  rules: Vec<Vec<DrsRef>>,
  predarg_category: Category,
  clean_category: Category,
  final_ref: DrsRef,
  final_atom: Category,
  construct_empty: bool,
}

impl FunctorTemplate {
  /// Reads a template from a predicate-argument category. Returns `None` for
  /// atoms and for conjunction categories, which are handled separately.
  pub fn create_from_category(
    predarg: &Category,
    final_atom: Option<Category>,
    construct_empty: bool,
  ) -> Option<Self> {
    let catclean = predarg.clean(true);
    if !catclean.isfunctor()
      || catclean.result_category() == *CAT_CONJ
      || catclean.argument_category() == *CAT_CONJ
    {
      return None;
    }

    let mut tgen = TemplateGen::default();
    let (trimmed, final_tag) = predarg.trim_functor_tag();
    let predarg_orig = trimmed.clean(false);
    let mut predarg = predarg_orig.clone();
    let mut rules = Vec::new();
    let mut ntag = 9000;
    while predarg.isfunctor() {
      if predarg.ismodifier() {
        // keep the modifier's result and argument bound together
        predarg = predarg.complete_tags(ntag);
        ntag += predarg.signature().len();
      }
      let refs: Vec<DrsRef> = predarg
        .argument_category()
        .extract_unify_atoms_flat()
        .iter()
        .map(|a| tgen.referent(a))
        .collect();
      rules.push(refs);
      predarg = predarg.result_category();
    }

    let mut final_ref = tgen.referent(&predarg);
    if let Some(r) = final_tag.and_then(|t| tgen.tags.get(&t.to_string())) {
      final_ref = r.clone();
    }
    Some(Self {
      rules,
      clean_category: predarg_orig.clean(true),
      predarg_category: predarg_orig,
      final_ref,
      final_atom: final_atom.unwrap_or_else(|| predarg.clean(true)),
      construct_empty,
    })
  }

  pub fn constructor_rule(&self) -> &[Vec<DrsRef>] {
    &self.rules
  }

  pub fn predarg_category(&self) -> &Category {
    &self.predarg_category
  }

  pub fn clean_category(&self) -> &Category {
    &self.clean_category
  }

  pub fn final_ref(&self) -> &DrsRef {
    &self.final_ref
  }

  pub fn final_atom(&self) -> &Category {
    &self.final_atom
  }

  /// The functor should wrap an empty DRS.
  pub fn construct_empty(&self) -> bool {
    self.construct_empty
  }

  /// The final referent is an event.
  pub fn isfinalevent(&self) -> bool {
    self.final_atom != *CAT_SADJ && CAT_SANY.ismember(&self.final_atom)
  }

  /// A functor over an empty DRS exposing the final referent.
  pub fn create_empty_functor(&self) -> FunctorProduction {
    let d = DrsProduction::new(Vec::new(), self.final_atom.remove_wildcards(), Span::empty())
      .with_lambda(vec![self.final_ref.clone()]);
    self.create_functor(d.into())
  }

  /// Wraps `inner` in one scope per constructor rule.
  pub fn create_functor(&self, inner: Production) -> FunctorProduction {
    let mut category = self.clean_category.remove_wildcards();
    let mut scopes = Vec::with_capacity(self.rules.len());
    for refs in self.rules.iter() {
      scopes.push(Scope {
        category: category.clone(),
        refs: refs.clone(),
      });
      category = category.result_category();
    }
    scopes.reverse();
    FunctorProduction::from_scopes(scopes, Some(inner))
  }
}

impl fmt::Display for FunctorTemplate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    const NAMES: [&str; 13] = ["f", "g", "h", "m", "n", "p", "q", "r", "s", "t", "u", "v", "w"];
    write!(f, "{}:", self.clean_category)?;
    for (i, refs) in self.rules.iter().enumerate() {
      let refs: Vec<String> = refs.iter().map(|r| r.to_string()).collect();
      write!(f, "{}({}).", NAMES.get(i).unwrap_or(&"x"), refs.join(","))?;
    }
    write!(f, "{}", self.final_ref)
  }
}

/// A unary rule `result <- argument`, implemented as backward application of
/// the functor `result\argument`.
#[derive(Debug, Clone)]
pub struct UnaryRule {
  template: FunctorTemplate,
}

impl UnaryRule {
  /// Both categories carry predicate-argument tags.
  pub fn new(result: &Category, argument: &Category) -> Result<Self, Error> {
    let mut ucat = Category::combine(&result.clean(false), Slash::Bwd, &argument.clean(false));
    if let (_, Some(tag)) = result.trim_functor_tag() {
      ucat = Category::parse(&format!("({})_{}", ucat, tag))?;
    }
    let template = FunctorTemplate::create_from_category(&ucat, None, false).ok_or_else(|| {
      Error::UnaryRule {
        result: result.to_string(),
        argument: argument.to_string(),
      }
    })?;
    Ok(Self { template })
  }

  /// Key for a rule given untagged categories.
  pub fn create_key(result: &Category, argument: &Category) -> Category {
    Category::combine(result, Slash::Bwd, argument)
  }

  pub fn getkey(&self) -> &Category {
    &self.template.clean_category
  }

  pub fn template(&self) -> &FunctorTemplate {
    &self.template
  }

  /// The rule as an empty functor ready for backward application.
  pub fn get(&self) -> FunctorProduction {
    self.template.create_empty_functor()
  }
}

#[derive(Default)]
struct Inferred {
  templates: HashMap<Category, Arc<FunctorTemplate>>,
  unary: HashMap<Category, Arc<UnaryRule>>,
}

/// Functor templates and unary rules. The tables are fixed once built;
/// templates inferred on demand go to an internal cache.
#[derive(Default)]
pub struct Model {
  templates: HashMap<Category, Arc<FunctorTemplate>>,
  unary: HashMap<Category, Arc<UnaryRule>>,
  inferred: RwLock<Inferred>,
}

impl Clone for Model {
  fn clone(&self) -> Self {
    let inferred = match self.inferred.read() {
      Ok(inf) => Inferred {
        templates: inf.templates.clone(),
        unary: inf.unary.clone(),
      },
      Err(_) => Inferred::default(),
    };
    Model {
      templates: self.templates.clone(),
      unary: self.unary.clone(),
      inferred: RwLock::new(inferred),
    }
  }
}

fn wildcard(category: &Category) -> Option<Category> {
  if FEATURE.is_match(category.signature()) {
    Some(Category::intern(&FEATURE.replace_all(category.signature(), "[X]")))
  } else {
    None
  }
}

impl Model {
  /// The builtin English model.
  pub fn builtin() -> &'static Model {
    &BUILTIN
  }

  /// The unary rules used when a conjunction changes type.
  pub fn uconj() -> &'static Model {
    &UCONJ
  }

  fn from_builtin() -> Self {
    let mut text = String::new();
    for frame in VERB_FRAMES.iter() {
      for feature in VERB_FEATURES.iter() {
        text.push_str(&frame.replace("{}", feature));
        text.push('\n');
      }
    }
    text.push_str(BUILTIN_TEMPLATES);
    Self::from_text(&text, BUILTIN_UNARY_RULES)
  }

  /// Builds a model from template lines and unary rule pairs. A template
  /// line is a predicate-argument category, optionally followed by a comma
  /// and a final atom override. Blank lines and `#` comments are skipped,
  /// and bad entries are logged and ignored.
  pub fn from_text(templates: &str, unary: &[(&str, &str)]) -> Self {
    let mut model = Model::default();
    for line in templates.lines().map(str::trim) {
      if line.is_empty() || line.starts_with('#') {
        continue;
      }
      let parts: Vec<&str> = line.split(',').map(str::trim).collect();
      let added = match parts.as_slice() {
        [predarg] => model.add_template(predarg, None),
        [predarg, final_atom] => model.add_template(predarg, Some(final_atom)),
        _ => Err(Error::TemplateRule(line.to_string())),
      };
      if let Err(e) = added {
        tracing::warn!("ignoring functor template `{}`: {}", line, e);
      }
    }
    for (result, argument) in unary.iter() {
      if let Err(e) = model.add_unary_rule(result, argument) {
        tracing::warn!("ignoring unary rule: {}", e);
      }
    }
    model
  }

  /// Adds or replaces the template for `predarg`.
  pub fn add_template(&mut self, predarg: &str, final_atom: Option<&str>) -> Result<(), Error> {
    let cat = Category::parse(predarg)?;
    let final_atom = final_atom.map(Category::parse).transpose()?;
    let templ = FunctorTemplate::create_from_category(&cat, final_atom, false)
      .ok_or_else(|| Error::TemplateRule(predarg.to_string()))?;
    self
      .templates
      .insert(templ.clean_category.clone(), Arc::new(templ));
    Ok(())
  }

  /// Adds or replaces a unary rule.
  pub fn add_unary_rule(&mut self, result: &str, argument: &str) -> Result<(), Error> {
    let rule = UnaryRule::new(&Category::parse(result)?, &Category::parse(argument)?)?;
    self.unary.insert(rule.getkey().clone(), Arc::new(rule));
    Ok(())
  }

  /// Template lines in the format read by [`Model::from_text`].
  pub fn save_templates(&self) -> String {
    let mut lines: Vec<String> = self
      .templates
      .values()
      .map(|t| {
        let last = t.clean_category.extract_unify_atoms_flat().pop();
        if last.as_ref() != Some(&t.final_atom) {
          format!("{},  {}", t.predarg_category, t.final_atom)
        } else {
          t.predarg_category.to_string()
        }
      })
      .collect();
    lines.sort();
    lines.join("\n")
  }

  pub fn len(&self) -> usize {
    self.templates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.templates.is_empty()
  }

  /// A copy of this model that also holds templates read from the tagged
  /// categories of a derivation, for categories the model lacks.
  pub fn with_predarg_templates<'c>(&self, cats: impl IntoIterator<Item = &'c Category>) -> Model {
    let mut model = self.clone();
    for cat in cats {
      let key = cat.clean(true);
      if key == *cat || model.issupported(&key) {
        continue;
      }
      if let Some(templ) = FunctorTemplate::create_from_category(cat, None, false) {
        tracing::debug!(category = %key, "adding template from derivation");
        model.templates.insert(key, Arc::new(templ));
      }
    }
    model
  }

  fn find_template(&self, category: &Category) -> Option<Arc<FunctorTemplate>> {
    if let Some(t) = self.templates.get(category) {
      return Some(t.clone());
    }
    self
      .inferred
      .read()
      .ok()
      .and_then(|inf| inf.templates.get(category).cloned())
  }

  fn find_unary(&self, key: &Category) -> Option<Arc<UnaryRule>> {
    if let Some(r) = self.unary.get(key) {
      return Some(r.clone());
    }
    self
      .inferred
      .read()
      .ok()
      .and_then(|inf| inf.unary.get(key).cloned())
  }

  /// Looks up a template, retrying with every feature replaced by the
  /// `[X]` wildcard.
  pub fn lookup(&self, category: &Category) -> Option<Arc<FunctorTemplate>> {
    let category = category.remove_conj_feature();
    if let Some(t) = self.find_template(&category) {
      return Some(t);
    }
    if category.isfunctor() {
      return wildcard(&category).and_then(|wc| self.find_template(&wc));
    }
    None
  }

  pub fn issupported(&self, category: &Category) -> bool {
    if self.find_template(category).is_some() {
      return true;
    }
    category.isfunctor() && wildcard(category).is_some_and(|wc| self.find_template(&wc).is_some())
  }

  pub fn lookup_unary(&self, result: &Category, argument: &Category) -> Option<Arc<UnaryRule>> {
    let key = UnaryRule::create_key(result, argument);
    if let Some(r) = self.find_unary(&key) {
      return Some(r);
    }
    wildcard(&key).and_then(|wc| self.find_unary(&wc))
  }

  fn add_inferred_template(&self, predarg: &Category) -> Option<Arc<FunctorTemplate>> {
    let templ = Arc::new(FunctorTemplate::create_from_category(predarg, None, false)?);
    if let Ok(mut inf) = self.inferred.write() {
      return Some(
        inf
          .templates
          .entry(templ.clean_category.clone())
          .or_insert(templ)
          .clone(),
      );
    }
    Some(templ)
  }

  /// Builds a template for an unsupported type raised category or modifier
  /// from the templates of its parts.
  pub fn infer_template(&self, category: &Category) -> Option<Arc<FunctorTemplate>> {
    let category = category.remove_conj_feature();
    if !category.isfunctor() || self.issupported(&category) {
      return None;
    }
    let slash = category.slash()?;
    let arg = category.argument_category();
    let argarg = arg.argument_category();
    let result = category.result_category();
    if category.istype_raised()
      && (result.isatom() || self.issupported(&result))
      && (argarg.isatom() || self.issupported(&argarg))
    {
      tracing::info!(category = %category, "adding type-raised template");
      let r = if result.isfunctor() {
        self.lookup(&result)?.predarg_category.complete_tags(INFERRED_TAG)
      } else {
        Category::parse(&format!("{}_999", result)).ok()?
      };
      let aa = if argarg.isfunctor() {
        self.lookup(&argarg)?.predarg_category.complete_tags(INFERRED_TAG)
      } else {
        Category::parse(&format!("{}_998", argarg)).ok()?
      };
      let newcat = Category::combine(&r, slash, &Category::combine(&r, arg.slash()?, &aa));
      return self.add_inferred_template(&newcat);
    }
    if category.ismodifier() && self.issupported(&result) {
      let p = self.lookup(&result)?.predarg_category.complete_tags(INFERRED_TAG);
      return self.add_inferred_template(&Category::combine(&p, slash, &p));
    }
    None
  }

  /// Builds a unary rule turning a category into a modifier of itself.
  pub fn infer_unary(&self, category: &Category) -> Option<Arc<UnaryRule>> {
    if !category.ismodifier() {
      return None;
    }
    let slash = category.slash()?;
    let t = self
      .lookup(&category.result_category())?
      .predarg_category
      .complete_tags(INFERRED_TAG);
    let rule = Arc::new(UnaryRule::new(&Category::combine(&t, slash, &t), &t).ok()?);
    if let Ok(mut inf) = self.inferred.write() {
      return Some(inf.unary.entry(rule.getkey().clone()).or_insert(rule).clone());
    }
    Some(rule)
  }

  /// An empty functor for `category`, inferring a template when the model
  /// has none. Atomic functors fall back to the identity functor.
  pub fn safe_create_empty_functor(&self, category: &Category) -> Option<FunctorProduction> {
    if let Some(templ) = self.lookup(category) {
      return Some(templ.create_empty_functor());
    }
    if !category.isfunctor() {
      return None;
    }
    let result = category.result_category();
    let argument = category.argument_category();
    if *category != *CAT_CONJ_CONJ
      && *category != *CAT_CONJCONJ
      && (result.isfunctor() || argument.isfunctor())
    {
      self
        .infer_template(category)
        .map(|t| t.create_empty_functor())
    } else if result.can_unify(&argument) {
      Some(identity_functor(category.clone(), None))
    } else {
      Some(identity_functor(
        category.clone(),
        Some(&[DrsRef::entity(2), DrsRef::entity(1)]),
      ))
    }
  }
}

/// Verb subcategorization frames, instantiated for every sentence feature.
const VERB_FRAMES: &[&str] = &[
  r"S{}_1\NP_2",
  r"S{}_1/NP_2",
  r"(S{}_1\NP_2)/NP_3",
  r"((S{}_1\NP_2)/NP_3)/NP_4",
  r"(S{}_1\NP_2)/PP_3",
  r"((S{}_1\NP_2)/PP_3)/NP_4",
  r"((S{}_1\NP_2)/NP_3)/PP_4",
  r"((S{}_1\NP_2)/PP_3)/PP_4",
  r"(S{}_1\NP_2)/S[em]_3",
  r"(S{}_1\NP_2)/S[dcl]_3",
  r"(S{}_1\NP_2)/S[qem]_3",
  r"(S{}_1\NP_2)/S[X]_3",
  r"((S{}_1\NP_2)/S[em]_3)/NP_4",
  r"((S{}_1\NP_2)/S[dcl]_3)/NP_4",
  r"(S{}_1\NP_2)/(S[to]_3\NP_2)",
  r"(S{}_1\NP_2)/(S[b]_3\NP_2)",
  r"(S{}_1\NP_2)/(S[ng]_3\NP_2)",
  r"((S{}_1\NP_2)/(S[to]_3\NP_4))/NP_4",
  r"((S{}_1\NP_2)/(S[b]_3\NP_4))/NP_4",
  r"((S{}_1\NP_2)/(S[ng]_3\NP_4))/NP_4",
  r"(S{}_1\NP_2)/(S[adj]_3\NP_2)",
  r"((S{}_1\NP_2)/(S[adj]_3\NP_4))/NP_4",
];

const VERB_FEATURES: &[&str] = &["", "[dcl]", "[b]", "[ng]", "[pss]", "[pt]", "[to]", "[X]"];

/// Templates read after the verb frames, so entries here win.
const BUILTIN_TEMPLATES: &str = r"
# determiners
NP[nb]_1/N_1
NP_1/N_1
(NP[nb]_1/N_1)\NP_2
(NP_1/N_1)\NP_2
(NP_1/(N_1/PP_2))\NP_2
NP_1005/(N_1005/PP_1005)
(NP_1020/N_2020)\NP_1020

# nouns and noun modifiers
N_1/N_1
N_1\N_1
NP_1\NP_1
NP_1/NP_1
(N_1/N_1)/(N_1/N_1)
(N_1/N_1)\(N_1/N_1)
(NP_148\NP_148)/(NP_148\NP_148)
N_1003/PP_1003
NP_1004/PP_1004
N_1203/N[num]_1203
(N_1204\N_1204)/N[num]_1204
((N_2006/N_2006)/(N_2006/N_2006))\(S[adj]_1006\NP_2006)
(NP_1019/NP_1019)\(S[adj]\NP_1019)

# prepositions
PP_1/NP_1
PP_2202/(S[ng]_1202\NP_2202)
(NP_1\NP_1)/NP_2
(N_1\N_1)/NP_2
(PP_1\PP_1)/NP_2
(PP_1/PP_1)/NP_2
((S_1\NP_2)\(S_1\NP_2))/NP_3
((S_1\NP_2)/(S_1\NP_2))/NP_3
((S_1\NP_2)\(S_1\NP_2))/S[dcl]_3
((S_1\NP_2)\(S_1\NP_2))/(S[ng]_3\NP_2)
(S_1/S_1)/NP_2
(S_1\S_1)/NP_2
(S_1/S_1)/S[dcl]_2

# relative pronouns
(N_1\N_1)/(S[dcl]_2\NP_1)
(NP_1\NP_1)/(S[dcl]_2\NP_1)
(N_1\N_1)/(S[dcl]_2/NP_1)
(NP_1\NP_1)/(S[dcl]_2/NP_1)
(NP_1018\NP_1018)\(S[dcl]\NP_1018)
((N_1021\N_1021)/S[dcl])\((N_1021\N_1021)/NP)

# adverbs
(S_1\NP_2)\(S_1\NP_2)
(S[X]_1\NP_2)\(S[X]_1\NP_2)
((S_1\NP_2)\(S_1\NP_2))/((S_1\NP_2)\(S_1\NP_2))
((S_1\NP_2)\(S_1\NP_2))\((S_1\NP_2)\(S_1\NP_2))
S_1/S_1
S_1\S_1
S[X]_1015/S[X]_2015
S[X]_1016\S[X]_2016
S[dcl]_1007/S[dcl]_2007
S[dcl]_1008\S[dcl]_2008

# auxiliaries and modals share the event of their complement
(S_1\NP_2)/(S_1\NP_2)
(S[X]_1\NP_2)/(S[X]_1\NP_2)
(S[dcl]_1\NP_2)/(S[b]_1\NP_2)
(S[dcl]_1\NP_2)/(S[pt]_1\NP_2)
(S[dcl]_1\NP_2)/(S[ng]_1\NP_2)
(S[dcl]_1\NP_2)/(S[pss]_1\NP_2)
(S[b]_1\NP_2)/(S[pt]_1\NP_2)
(S[b]_1\NP_2)/(S[pss]_1\NP_2)
(S[b]_238\NP_237)/(S[b]_238\NP_237)
(S[pt]_1\NP_2)/(S[pss]_1\NP_2)
(S[pt]_1\NP_2)/(S[ng]_1\NP_2)
(S[to]_1\NP_2)/(S[b]_1\NP_2)

# adjectives
S[adj]_1\NP_2
(S[adj]_1\NP_2)/PP_3
(S[adj]_1\NP_2)/(S[to]_3\NP_2)
(S[adj]_1\NP_2)/(S[adj]_1\NP_2)
(S[adj]_1\NP_2)\(S[adj]_1\NP_2)
((S[adj]_2000\NP_1000)\NP_2000)_1000

# type raising and clause level
S_1009/(S_1009\NP)
S_1010\(S_1010/NP)
S[X]_1200/(S[X]_1200\NP)
(S_2011\NP_1011)/((S_2011\NP_1011)\PP)
(S_1012\NP_2012)\((S_1012\NP_2012)/PP)
(S[dcl]_1014\NP_2014)/((S[dcl]_1014\NP_2014)\PP)
(S[X]_1201\NP_2201)\((S[X]_1201\NP_2201)/PP)
((S[dcl]\NP_2017)/NP_1017)/PR
S[X]_1022/NP_2022
S[X]_1023\NP_2023
S[em]_1/S[dcl]_1
S[qem]_1/S[dcl]_1
(S[dcl]_1\S[dcl]_2)\NP_3
(S[dcl]_1\S[dcl]_2)/NP_3
";

const BUILTIN_UNARY_RULES: &[(&str, &str)] = &[
  (r"(S_1024\NP_2024)/(S_1024\NP_2024)", r"S_1024/S[dcl]_1024"),
  (r"(S[adj]_1025\NP_2025)\(S[adj]_1025\NP_2025)", r"S_1025/S[dcl]_1025"),
  (r"(S[X]_1026\NP_2026)\(S[X]_1026\NP_2026)", r"S_1026/S[dcl]_1026"),
  (r"NP_1027", r"N_1027"),
  (r"(NP_1028\NP_2028)_2028", r"NP_1028"),
  (r"N_1030\N_1030", r"S[pss]_2030\NP_1030"),
  (r"N_1031\N_1031", r"S[adj]_2031\NP_1031"),
  (r"N_1032\N_1032", r"S[dcl]_2032\NP_1032"),
  (r"N_1033\N_1033", r"S[ng]_2033\NP_1033"),
  (r"N_1034\N_1034", r"S_2034\NP_1034"),
  (r"N_1035\N_1035", r"S[X]_2035\NP_1035"),
  (r"S_1036/S_2036", r"S[ng]_1036\NP_3036"),
  (r"S_1037/S_1037", r"S[pss]_1037\NP"),
  (r"S_1038/S_1038", r"S[to]_1038\NP"),
  (r"S_1039/S_1039", r"S[X]_1039\NP"),
  (r"S_1040/S_1040", r"S_1040\NP"),
  (r"S_1041\S_1041", r"S[X]_1041\NP"),
  (r"PP_1042/PP_1042", r"PP_1042"),
  (r"PP_1043\PP_1043", r"PP_1043"),
  (r"(N_1044\N_1044)\(N_1044\N_1044)", r"(N_1044\N_1044)"),
  (r"(S[b]_3049\NP_2049)/((S_3049\NP_2049)\(S_3049\NP_2049))", r"S[b]_3049\NP_2049"),
  (r"(S[ng]_3050\NP_2050)/((S_3050\NP_2050)\(S_3050\NP_2050))", r"(S[ng]_3050\NP_2050)_3050"),
  (
    r"((S_1051\NP_2051)\(S_1051\NP_2051))\((S_1051\NP_2051)\(S_1051\NP_2051))",
    r"(S_1051\NP_2051)\(S_1051\NP_2051)",
  ),
  (
    r"((S[dcl]_1052\NP_2052)/(S[b]_1052\NP_2052))\((S[dcl]_1052\NP_2052)/(S[b]_1052\NP_2052))",
    r"(S_1052\NP_2052)/(S_1052\NP_2052)",
  ),
  (r"(S[pss]_1053\NP_1053)\(S[pss]_1053\NP_2053)", r"S_1053\NP_2053"),
  (r"(S[dcl]_1054\NP_2054)\(S[dcl]_1054\NP_2054)", r"S_1054\NP_2054"),
  (r"(S[em]_1055\NP_2055)\(S[em]_1055\NP_2055)", r"S_1055\NP_2055"),
  (r"(S_1056\NP_2056)\(S_1056\NP_2056)", r"S[ng]_1056\NP_2056"),
  (r"(S[X]_1057\NP_2057)\(S[X]_1057\NP_2057)", r"S_1057\NP_2057"),
  (r"(S_1058\NP_1058)\(S_1058\NP_1058)", r"S_1058\NP_1058"),
  (r"(N_1059/N_1059)\(N_1059/N_1059)", r"N_1059/N_1059"),
  (r"S[X]_1060\S[X]_1060", r"S[X]_1060"),
  (r"S[dcl]_1061\S[dcl]_1061", r"S_1061"),
  (r"S[X]_1062\S[X]_1062", r"S_1062"),
  (r"(S_1\NP_2063)/(S_1\NP_2063)", r"S[dcl]_1063/S[dcl]_1063"),
  (r"S_1064\S_1064", r"S_1064"),
  (
    r"((S[dcl]_1065\NP_2065)/NP_3065)\((S[dcl]_1065\NP_2065)/NP_3065)",
    r"(S_1065\NP_2065)/NP_3065",
  ),
  (
    r"((S[b]_1066\NP_2066)/NP_3066)\((S[b]_1066\NP_2066)/NP_3066)",
    r"(S_1066\NP_2066)/NP_3066",
  ),
  (
    r"((S[X]_1067\NP_2067)/NP_3067)\((S[X]_1067\NP_2067)/NP_3067)",
    r"(S_1067\NP_2067)/NP_3067",
  ),
  (r"(N_2068/PP_1068)\(N_2068/PP_1068)", r"N_2068/PP_1068"),
  (r"(S_2069/S_1069)\(S_2069/S_1069)", r"S_2069/S_1069"),
  (r"NP_1070", r"S[ng]_1070\NP_2070"),
  (r"NP_1071", r"S_1071\NP_2071"),
  (r"NP_1072", r"S[X]_1072\NP_2072"),
  (r"NP_1073\NP_1073", r"S[pss]_2073\NP_1073"),
  (r"NP_1074\NP_1074", r"S[adj]_2074\NP_1074"),
  (r"NP_1075\NP_1075", r"S[dcl]_2075\NP_1075"),
  (r"NP_1076\NP_1076", r"S[ng]_2076\NP_1076"),
  (r"NP_1077\NP_1077", r"S_2077\NP_1077"),
  (r"NP_1078\NP_1078", r"S_2078/NP_1078"),
  (r"NP_1079\NP_1079", r"S[X]_2079\NP_1079"),
  (r"(S_1080\NP_2080)/(S_1080\NP_2080)", r"S[ng]_1080\NP_2080"),
  (r"(S_1081\NP_2081)\(S_1081\NP_2081)", r"S[to]_1081\NP_2081"),
  (r"(S_1082\NP_2082)\(S_1082\NP_2082)", r"S[X]_1082\NP_2082"),
  (r"(S_1083\NP_2083)\(S_1083\NP_2083)", r"NP_2083"),
  (r"NP_1084\NP_1084", r"S[dcl]_1084"),
  (
    r"((S[dcl]_1085\NP_3085)/S[em]_2085)\((S[dcl]_1085\NP_3085)/S[em]_2085)",
    r"(S_1085\NP_3085)/S[em]_2085",
  ),
  (
    r"((S[X]_1086\NP_3086)/S[X]_2086)\((S[X]_1086\NP_3086)/S[X]_2086)",
    r"(S_1086\NP_3086)/S[X]_2086",
  ),
  (
    r"((S[dcl]_1087\NP_2087)/(S[b]_1087\NP_2087))\((S[dcl]_1087\NP_2087)/(S[b]_1087\NP_2087))",
    r"(S_1087\NP_2087)/(S[b]_1087\NP_2087)",
  ),
  (r"N_2088\N_2088", r"S[dcl]_1088/NP_2088"),
  (r"N_2089\N_2089", r"S[X]_1089/NP_2089"),
  (r"N_2090\N_2090", r"S_1090/NP_2090"),
  (
    r"((S[dcl]_1091\NP_2091)/(S[adj]_3091\NP_2091))\((S[dcl]_1091\NP_2091)/(S[adj]_3091\NP_2091))",
    r"(S_1091\NP_2091)/(S[adj]_3091\NP_2091)",
  ),
  (r"(S[adj]_1095\NP_2095)\(S[adj]_1095\NP_2095)", r"S[dcl]_1095/S[dcl]_1095"),
  (r"(S[adj]_1096\NP_2096)\(S[adj]_1096\NP_2096)", r"S[X]_1096/S[X]_1096"),
  (r"(S[X]_1045\NP_2045)\(S[X]_4045\NP_2045)", r"S[X]_1045\NP_2045"),
  (
    r"((S[X]_1046\NP_2046)/NP_3046)\((S[X]_4046\NP_2046)/NP_3046)",
    r"(S[X]_1046\NP_2046)/NP_3046",
  ),
  (
    r"((S[pss]_1092\NP_2092)/PP_3092)\((S[pss]_4092\NP_2092)/PP_3092)",
    r"(S_1092\NP_2092)/PP_3092",
  ),
  (
    r"((S[b]_1093\NP_2093)/PP_3093)\((S[b]_4093\NP_2093)/PP_3093)",
    r"(S_1093\NP_2093)/PP_3093",
  ),
  (
    r"((S[X]_1094\NP_2094)/PP_3094)\((S[X]_4094\NP_2094)/PP_3094)",
    r"(S_1094\NP_2094)/PP_3094",
  ),
  (r"(S[dcl]_3047\NP_2047)/((S_3047\NP_2047)\(S_3047\NP_2047))", r"(S[dcl]_3047\NP_2047)_3047"),
  (r"(S[pss]_3048\NP_2048)/((S_3048\NP_2048)\(S_3048\NP_2048))", r"(S[pss]_3048\NP_2048)_3048"),
  (r"NP_1205\NP_1205", r"S[X]_2205/NP_1205"),
];

/// Conjunction type changes keep the conjuncts' events bound together.
const UCONJ_UNARY_RULES: &[(&str, &str)] = &[
  (r"(S[X]_1045\NP_2045)\(S[X]_1045\NP_2045)", r"S[X]_1045\NP_2045"),
  (
    r"((S[X]_1046\NP_2046)/NP_3046)\((S[X]_1046\NP_2046)/NP_3046)",
    r"(S[X]_1046\NP_2046)/NP_3046",
  ),
  (
    r"((S[pss]_1092\NP_2092)/PP_3092)\((S[pss]_1092\NP_2092)/PP_3092)",
    r"(S_1092\NP_2092)/PP_3092",
  ),
  (
    r"((S[b]_1093\NP_2093)/PP_3093)\((S[b]_1093\NP_2093)/PP_3093)",
    r"(S_1093\NP_2093)/PP_3093",
  ),
  (
    r"((S[X]_1094\NP_2094)/PP_3094)\((S[X]_1094\NP_2094)/PP_3094)",
    r"(S_1094\NP_2094)/PP_3094",
  ),
];

#[cfg(test)]
mod tests {
  use super::*;

  fn cat(s: &str) -> Category {
    Category::parse(s).unwrap()
  }

  fn r(s: &str) -> DrsRef {
    s.parse().unwrap()
  }

  #[test]
  fn test_template_from_category() {
    let t = FunctorTemplate::create_from_category(&cat(r"(S[dcl]_1\NP_2)/(S[to]_3\NP_2)"), None, false)
      .unwrap();
    assert_eq!(t.clean_category(), &cat(r"(S[dcl]\NP)/(S[to]\NP)"));
    assert_eq!(t.constructor_rule(), &[vec![r("X1"), r("E2")], vec![r("X1")]]);
    assert_eq!(t.final_ref(), &r("E3"));
    assert_eq!(t.final_atom(), &cat("S[dcl]"));
    assert!(t.isfinalevent());
    assert_eq!(t.to_string(), r"(S[dcl]\NP)/(S[to]\NP):f(X1,E2).g(X1).E3");

    let t = FunctorTemplate::create_from_category(&cat(r"S[adj]_1\NP_2"), None, false).unwrap();
    assert_eq!(t.final_ref(), &r("X2"));
    assert!(!t.isfinalevent());

    assert!(FunctorTemplate::create_from_category(&cat("NP_1"), None, false).is_none());
    assert!(FunctorTemplate::create_from_category(&cat(r"conj\conj"), None, false).is_none());
  }

  #[test]
  fn test_functor_tag_overrides_final_ref() {
    let t = FunctorTemplate::create_from_category(&cat(r"((S[adj]_2000\NP_1000)\NP_2000)_1000"), None, false)
      .unwrap();
    assert_eq!(t.constructor_rule(), &[vec![r("X1")], vec![r("X2")]]);
    assert_eq!(t.final_ref(), &r("X2"));
  }

  #[test]
  fn test_modifier_template() {
    // untagged modifiers bind result and argument together
    let t = FunctorTemplate::create_from_category(&cat(r"(S\NP)\(S\NP)"), None, false).unwrap();
    assert_eq!(t.constructor_rule(), &[vec![r("X1"), r("E2")], vec![r("X1")]]);
    assert_eq!(t.final_ref(), &r("E2"));
  }

  #[test]
  fn test_empty_functor() {
    let model = Model::builtin();
    let t = model.lookup(&cat(r"(S[dcl]\NP)/NP")).unwrap();
    let f = t.create_empty_functor();
    assert_eq!(f.get_scope_count(), 2);
    assert_eq!(f.category(), cat(r"(S[dcl]\NP)/NP"));
    assert_eq!(f.scopes()[0].category, cat(r"S[dcl]\NP"));
    assert!(f.verify());
    assert_eq!(f.lambda_refs(), vec![r("X2"), r("X1"), r("E3")]);
  }

  #[test]
  fn test_lookup() {
    let model = Model::builtin();
    assert!(model.lookup(&cat(r"(S[dcl]\NP)/NP")).is_some());
    assert!(model.lookup(&cat(r"(S[dcl]\NP)/NP[conj]")).is_some());
    // wildcard match
    assert!(model.lookup(&cat(r"(S[wq]\NP)\(S[wq]\NP)")).is_some());
    assert!(model.issupported(&cat("NP[nb]/N")));
    assert!(model.lookup(&cat("NP")).is_none());
    let t = model.lookup(&cat(r"(S[dcl]\NP)/(S[b]\NP)")).unwrap();
    // modals share the complement event
    assert_eq!(t.final_ref(), &t.constructor_rule()[0][1]);
  }

  #[test]
  fn test_unary_rules() {
    let model = Model::builtin();
    let rule = model.lookup_unary(&cat("NP"), &cat("N")).unwrap();
    assert_eq!(rule.getkey(), &cat(r"NP\N"));
    let f = rule.get();
    assert_eq!(f.get_unify_refs().len(), 2);

    let rule = model.lookup_unary(&cat(r"NP\NP"), &cat(r"S[pss]\NP")).unwrap();
    assert_eq!(rule.template().final_atom(), &cat("NP"));
    // wildcard match on the argument feature
    assert!(model.lookup_unary(&cat(r"NP\NP"), &cat(r"S[wq]\NP")).is_some());
    assert!(model.lookup_unary(&cat("PP"), &cat("S")).is_none());

    let rule = UnaryRule::new(&cat(r"(NP_1028\NP_2028)_2028"), &cat("NP_1028")).unwrap();
    assert_eq!(rule.getkey(), &cat(r"(NP\NP)\NP"));
    assert_eq!(rule.template().final_ref(), &rule.template().constructor_rule()[1][0]);
  }

  #[test]
  fn test_infer_template() {
    let model = Model::builtin();
    let c = cat(r"(S[dcl]\NP)\((S[dcl]\NP)/NP)");
    assert!(!model.issupported(&c));
    let t = model.infer_template(&c).unwrap();
    assert_eq!(t.clean_category(), &c);
    assert!(model.issupported(&c));
    assert!(model.safe_create_empty_functor(&c).is_some());

    let c = cat(r"(N/N)\(N/N)");
    assert!(model.safe_create_empty_functor(&c).is_some());
    // atomic functors without a template use the identity functor
    let f = model.safe_create_empty_functor(&cat(r"PP\S")).unwrap();
    assert_eq!(f.get_unify_refs(), vec![r("X2"), r("X1")]);
  }

  #[test]
  fn test_infer_unary() {
    let model = Model::builtin();
    let c = cat(r"((S[dcl]\NP)/PP)\((S[dcl]\NP)/PP)");
    let rule = model.infer_unary(&c).unwrap();
    assert_eq!(rule.getkey(), &cat(r"(((S[dcl]\NP)/PP)\((S[dcl]\NP)/PP))\((S[dcl]\NP)/PP)"));
    assert!(model.infer_unary(&cat("NP")).is_none());
  }

  #[test]
  fn test_text_model() {
    let model = Model::from_text("# comment\nNP_1/N_1\nN_1/N_1, N\nbad,too,many\n(S\\NP\n", &[("NP_1", "N_1")]);
    assert_eq!(model.len(), 2);
    let saved = model.save_templates();
    assert_eq!(saved, "NP_1/N_1\nN_1/N_1");
    let again = Model::from_text(&saved, &[]);
    assert_eq!(again.len(), 2);
  }

  #[test]
  fn test_with_predarg_templates() {
    let model = Model::builtin();
    let c = cat(r"((S[dcl]_1\NP_2)/PP_3)/(S[to]_4\NP_2)");
    assert!(!model.issupported(&c.clean(true)));
    let m2 = model.with_predarg_templates([&c]);
    assert!(m2.issupported(&c.clean(true)));
    assert!(!model.issupported(&c.clean(true)));
  }

  #[test]
  fn test_uconj() {
    let rule = Model::uconj()
      .lookup_unary(&cat(r"(S[dcl]\NP)\(S[dcl]\NP)"), &cat(r"S[dcl]\NP"))
      .unwrap();
    let t = rule.template();
    // the functor and its argument share the event
    assert_eq!(t.final_ref(), &t.constructor_rule()[0][1]);
  }
}
