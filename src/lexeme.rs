//! Lexemes: one per token, each producing the DRS fragment for its word.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::category::{
  is_copular, Category, CAT_ADJECTIVE, CAT_ADVERB, CAT_AP, CAT_AP_PP, CAT_CONJ, CAT_CONJCONJ,
  CAT_CONJ_CONJ, CAT_INFINITIVE, CAT_MODAL, CAT_MODAL_PAST, CAT_N, CAT_NOUN, CAT_NP, CAT_NPTHR,
  CAT_NP_N, CAT_PP, CAT_PREPOSITION, CAT_SADJ, CAT_SFOR, CAT_SS, CAT_S_S, CAT_TV, CAT_VP,
  CAT_VPDCL, CAT_VPMODX, CAT_VP_MOD, FEATURE_PSS, FEATURE_TO, FEATURE_VARG, FEATURE_VRES,
};
use crate::drs::{get_new_drsrefs, Condition, Drs, DrsRef, Renaming};
use crate::error::Error;
use crate::kb::{VerbNet, WikiPage};
use crate::model::{FunctorTemplate, Model, INFERRED_TAG};
use crate::options::ComposeOptions;
use crate::pos::Pos;
use crate::production::{identity_functor, DrsProduction, FunctorProduction, Production};
use crate::sentence::Span;
use crate::stem::lemmatize_verb;
use crate::utils::remove_dups;
use crate::warn_limited;

pub const RT_PROPERNAME: u64 = 0x0000_0001;
pub const RT_ENTITY: u64 = 0x0000_0002;
pub const RT_EVENT: u64 = 0x0000_0004;
pub const RT_LOCATION: u64 = 0x0000_0008;
pub const RT_DIRECTION: u64 = 0x0000_0010;
pub const RT_DATE: u64 = 0x0000_0020;
pub const RT_WEEKDAY: u64 = 0x0000_0040;
pub const RT_MONTH: u64 = 0x0000_0080;
pub const RT_HUMAN: u64 = 0x0000_0100;
pub const RT_ANAPHORA: u64 = 0x0000_0200;
pub const RT_NUMBER: u64 = 0x0000_0400;
pub const RT_UNION: u64 = 0x0000_0800;
pub const RT_NEGATE: u64 = 0x0000_1000;
pub const RT_INTERSECTION: u64 = 0x0000_2000;
pub const RT_EVENT_ATTRIB: u64 = 0x0000_4000;
pub const RT_EVENT_MODAL: u64 = 0x0000_8000;
pub const RT_ATTRIBUTE: u64 = 0x0001_0000;
pub const RT_ADJUNCT: u64 = 0x0002_0000;
pub const RT_PP: u64 = 0x0004_0000;
pub const RT_EVENT_MOD: u64 = 0x0008_0000;
pub const RT_RELATIVE: u64 = 1 << 63;
pub const RT_PLURAL: u64 = 1 << 62;
pub const RT_MALE: u64 = 1 << 61;
pub const RT_FEMALE: u64 = 1 << 60;
pub const RT_1P: u64 = 1 << 59;
pub const RT_2P: u64 = 1 << 58;
pub const RT_3P: u64 = 1 << 57;
pub const RT_ORPHANED: u64 = 1 << 56;
pub const RT_EMPTY_DRS: u64 = 1 << 55;
pub const RT_POSSESSIVE: u64 = 1 << 54;

/// Argument slot names used with [`ComposeOptions::NUMBERED_ROLES`].
pub const NUMBERED_ROLES: [&str; 6] = [".ARG0", ".ARG1", ".ARG2", ".ARG3", ".ARG4", ".ARG5"];

/// Every relation that links an event to one of its arguments.
pub const EVENT_ROLES: [&str; 10] = [
  ".AGENT", ".THEME", ".EXTRA", ".ROLE", ".ARG0", ".ARG1", ".ARG2", ".ARG3", ".ARG4", ".ARG5",
];

const PUNCT: &[char] = &['?', '.', ',', ':', ';'];

/// A closed-class word with a fixed DRS. Referents are numbered from 1 and
/// are events when `event` is set, entities otherwise.
struct Sample {
  lambda: usize,
  conds: &'static [(&'static str, &'static [usize])],
  mask: u64,
  event: bool,
}

const fn pron(lambda: usize, conds: &'static [(&'static str, &'static [usize])], mask: u64) -> Sample {
  Sample {
    lambda,
    conds,
    mask,
    event: false,
  }
}

const fn direction(conds: &'static [(&'static str, &'static [usize])]) -> Sample {
  Sample {
    lambda: 1,
    conds,
    mask: RT_LOCATION,
    event: true,
  }
}

const HUMAN_1P: u64 = RT_HUMAN | RT_1P;
const HUMAN_2P: u64 = RT_HUMAN | RT_2P;
const HE: u64 = RT_HUMAN | RT_MALE | RT_ANAPHORA | RT_3P;
const SHE: u64 = RT_HUMAN | RT_FEMALE | RT_ANAPHORA | RT_3P;
const WE: u64 = RT_HUMAN | RT_PLURAL | RT_1P;
const THEY: u64 = RT_HUMAN | RT_PLURAL | RT_3P;
const IT: u64 = RT_ANAPHORA | RT_3P;

const PRONOUNS: &[(&str, Sample)] = &[
  ("i", pron(1, &[("i", &[1])], HUMAN_1P)),
  ("me", pron(1, &[("i", &[1])], HUMAN_1P)),
  ("myself", pron(1, &[("i", &[1]), (".REFLEX", &[1])], HUMAN_1P)),
  ("mine", pron(2, &[("i", &[1]), (".POSS", &[1, 2])], HUMAN_1P | RT_POSSESSIVE)),
  ("my", pron(2, &[("i", &[1]), (".POSS", &[1, 2])], HUMAN_1P | RT_POSSESSIVE)),
  ("you", pron(1, &[("you", &[1])], HUMAN_2P)),
  ("yourself", pron(1, &[("you", &[1]), (".REFLEX", &[1])], HUMAN_2P)),
  ("yours", pron(2, &[("you", &[1]), (".OWN", &[1, 2])], HUMAN_2P)),
  ("your", pron(2, &[("you", &[1]), (".POSS", &[1, 2])], HUMAN_2P | RT_POSSESSIVE)),
  ("he", pron(1, &[("he", &[1])], HE)),
  ("she", pron(1, &[("she", &[1])], SHE)),
  ("him", pron(1, &[("he", &[1])], HE)),
  ("her", pron(1, &[("she", &[1])], SHE)),
  ("himself", pron(1, &[("he", &[1]), (".REFLEX", &[1])], HE)),
  ("herself", pron(1, &[("she", &[1]), (".REFLEX", &[1])], SHE)),
  ("hisself", pron(1, &[("he", &[1]), (".REFLEX", &[1])], HE)),
  ("his", pron(2, &[("he", &[1]), (".POSS", &[1, 2])], HE | RT_POSSESSIVE)),
  ("hers", pron(2, &[("she", &[1]), (".POSS", &[1, 2])], SHE | RT_POSSESSIVE)),
  ("we", pron(1, &[("we", &[1])], WE)),
  ("us", pron(1, &[("we", &[1])], WE)),
  ("ourself", pron(1, &[("we", &[1]), (".REFLEX", &[1])], WE)),
  ("ourselves", pron(1, &[("we", &[1]), (".REFLEX", &[1])], WE)),
  ("ours", pron(2, &[("we", &[1]), (".POSS", &[1, 2])], WE | RT_POSSESSIVE)),
  ("our", pron(2, &[("we", &[1]), (".POSS", &[1, 2])], WE | RT_POSSESSIVE)),
  ("yourselves", pron(1, &[("you", &[1]), (".REFLEX", &[1])], HUMAN_2P | RT_PLURAL)),
  ("they", pron(1, &[("they", &[1])], THEY)),
  ("them", pron(1, &[("they", &[1])], THEY)),
  ("themself", pron(1, &[("they", &[1]), (".REFLEX", &[1])], THEY)),
  ("themselves", pron(1, &[("they", &[1]), (".REFLEX", &[1])], THEY)),
  ("theirs", pron(2, &[("they", &[1]), (".POSS", &[1, 2])], THEY | RT_POSSESSIVE)),
  ("their", pron(2, &[("they", &[1]), (".POSS", &[1, 2])], THEY | RT_POSSESSIVE)),
  ("it", pron(1, &[("it", &[1])], IT)),
  ("its", pron(2, &[("it", &[1]), (".POSS", &[1, 2])], IT | RT_POSSESSIVE)),
  ("itself", pron(1, &[("it", &[1]), (".REFLEX", &[1])], IT)),
];

const DIRECTIONS: &[(&str, Sample)] = &[
  ("up", direction(&[("up", &[1]), ("direction", &[1])])),
  ("down", direction(&[("down", &[1]), ("direction", &[1])])),
  ("left", direction(&[("left", &[1]), ("direction", &[1])])),
  ("right", direction(&[("right", &[1]), ("direction", &[1])])),
];

pub const RELATIVE_PRONOUNS: &[&str] = &[
  "that", "when", "which", "whichever", "whichsoever", "who", "whoever", "whosoever", "whom",
  "whomever", "whomsoever", "whose", "whosesoever", "whatever", "whatsoever",
];

pub const MONTHS: &[(&str, &str)] = &[
  ("Jan", "January"),
  ("Feb", "February"),
  ("Mar", "March"),
  ("Apr", "April"),
  ("May", "May"),
  ("Jun", "June"),
  ("Jul", "July"),
  ("Aug", "August"),
  ("Sep", "September"),
  ("Sept", "September"),
  ("Oct", "October"),
  ("Nov", "November"),
  ("Dec", "December"),
];

pub const WEEKDAYS: &[(&str, &str)] = &[
  ("Mon", "Monday"),
  ("Tue", "Tuesday"),
  ("Tues", "Tuesday"),
  ("Wed", "Wednesday"),
  ("Thur", "Thursday"),
  ("Thurs", "Thursday"),
  ("Fri", "Friday"),
  ("Sat", "Saturday"),
  ("Sun", "Sunday"),
];

/// Prepositions relating two entities rather than describing their object.
pub const RELATIONAL_PREPOSITIONS: &[&str] = &[
  "of", "on", "between", "with", "without", "about", "among", "despite", "except", "regarding",
];

/// Prepositions that only mark an argument and add no condition.
pub const EMPTY_PREPOSITIONS: &[&str] = &["by", "than"];

lazy_static! {
  static ref MONTH: Regex = Regex::new(
    r"^((Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec)\.?|January|February|March|April|June|July|August|September|October|November|December)$"
  )
  .unwrap();
  static ref WEEKDAY: Regex = Regex::new(
    r"^((Mon|Tue|Tues|Wed|Thur|Thurs|Fri|Sat|Sun)\.?|Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday)$"
  )
  .unwrap();
  static ref CAT_NPNB_N_NP: Category = Category::intern(r"(NP[nb]/N)\NP");
  static ref CAT_NPN_NP: Category = Category::intern(r"(NP/N)\NP");
  static ref CAT_N_PP: Category = Category::intern("N/PP");
  static ref CAT_VPPSS: Category = Category::intern(r"S[pss]\NP");
  static ref RELATIONAL_PREP_TEMPLATE: Option<Arc<FunctorTemplate>> =
    FunctorTemplate::create_from_category(&Category::intern("PP_1/NP_2"), None, false).map(Arc::new);
  static ref EMPTY_PREP_TEMPLATE: Option<Arc<FunctorTemplate>> =
    FunctorTemplate::create_from_category(&Category::intern("PP_1/NP_1"), None, true).map(Arc::new);
}

fn lookup<'a>(table: &'a [(&str, Sample)], word: &str) -> Option<&'a Sample> {
  table.iter().find(|(w, _)| *w == word).map(|(_, s)| s)
}

fn lookup_name(table: &[(&str, &'static str)], word: &str) -> Option<&'static str> {
  table.iter().find(|(w, _)| *w == word).map(|(_, s)| *s)
}

/// Removes a trailing `'s` or `’s`.
pub fn strip_apostrophe_s(word: &str) -> &str {
  if word.chars().count() > 2 {
    if let Some(w) = word.strip_suffix("'s").or_else(|| word.strip_suffix("\u{2019}s")) {
      return w;
    }
  }
  word
}

/// Uppercases the first letter of every run of letters and lowercases the
/// rest.
pub fn title_case(word: &str) -> String {
  let mut out = String::with_capacity(word.len());
  let mut prev_alpha = false;
  for c in word.chars() {
    if c.is_alphabetic() {
      if prev_alpha {
        out.extend(c.to_lowercase());
      } else {
        out.extend(c.to_uppercase());
      }
      prev_alpha = true;
    } else {
      out.push(c);
      prev_alpha = false;
    }
  }
  out
}

/// Role conditions for the arguments of event `e`. Named roles are
/// `.AGENT`, `.THEME`, then one `.EXTRA` holding every remaining argument.
fn event_roles(e: &DrsRef, args: &[DrsRef], offset: usize, numbered: bool) -> Vec<Condition> {
  if numbered {
    return args
      .iter()
      .zip(NUMBERED_ROLES.iter().skip(offset))
      .map(|(a, role)| Condition::rel(*role, vec![e.clone(), a.clone()]))
      .collect();
  }
  let mut conds = Vec::new();
  let mut extra = vec![e.clone()];
  for (i, a) in args.iter().enumerate() {
    match i + offset {
      0 => conds.push(Condition::rel(".AGENT", vec![e.clone(), a.clone()])),
      1 => conds.push(Condition::rel(".THEME", vec![e.clone(), a.clone()])),
      _ => extra.push(a.clone()),
    }
  }
  if extra.len() > 1 {
    conds.push(Condition::rel(".EXTRA", extra));
  }
  conds
}

/// Agent and copular complement of a copular event.
fn copular_roles(e: &DrsRef, agent: &DrsRef, role: &DrsRef, numbered: bool) -> [Condition; 2] {
  let (a, r) = if numbered { (".ARG0", ".ARG1") } else { (".AGENT", ".ROLE") };
  [
    Condition::rel(a, vec![e.clone(), agent.clone()]),
    Condition::rel(r, vec![e.clone(), role.clone()]),
  ]
}

fn vn_rel(class_id: &str, e: &DrsRef) -> Condition {
  Condition::rel(format!(".VN.{}", class_id), vec![e.clone()])
}

fn or(a: Condition, b: Condition) -> Condition {
  Condition::Or(Drs::new(Vec::new(), vec![a]), Drs::new(Vec::new(), vec![b]))
}

/// VerbNet classes as one condition, alternatives joined by disjunction.
fn vn_condition(classes: &[String], e: &DrsRef) -> Option<Condition> {
  match classes {
    [] => None,
    [c] => Some(vn_rel(c, e)),
    _ => {
      let mut xconds = Vec::new();
      if classes.len() % 2 == 1 {
        xconds.push(vn_rel(&classes[classes.len() - 1], e));
      }
      for pair in classes.chunks_exact(2) {
        xconds.push(or(vn_rel(&pair[0], e), vn_rel(&pair[1], e)));
      }
      while xconds.len() > 1 {
        let c2 = xconds.pop()?;
        let c1 = xconds.pop()?;
        xconds.push(or(c1, c2));
      }
      xconds.pop()
    }
  }
}

/// A token of the sentence being composed.
#[derive(Debug, Clone)]
pub struct Lexeme {
  pub idx: usize,
  /// Index of the syntactic head. A lexeme that is its own head is a root.
  pub head: usize,
  pub word: String,
  pub stem: String,
  pub pos: Pos,
  pub category: Category,
  /// Referents in template order; `refs[0]` is the final referent.
  pub refs: Vec<DrsRef>,
  pub drs: Option<Drs>,
  /// Proposition referents boxing this lexeme's DRS, outermost first.
  pub props: Vec<DrsRef>,
  pub mask: u64,
  pub vnclasses: Vec<String>,
  pub wiki: Option<WikiPage>,
}

impl Lexeme {
  pub fn new(category: Category, word: &str, pos: Pos, idx: usize) -> Self {
    let mut category = category;
    let mut word = word;
    if pos.is_modal() {
      // modals modify the event of their complement
      let simple = category.remove_features().simplify();
      if simple.ismodifier() {
        category = simple;
      }
    } else if word == "'s"
      && !pos.is_possessive()
      && !category.ismodifier()
      && category.test_return(&CAT_VP, false)
    {
      word = "is";
    } else if word == "'nt" {
      word = "not";
    }

    let stem = if !word.is_empty() && PUNCT.iter().collect::<String>().contains(word) {
      word.to_string()
    } else {
      let wd = strip_apostrophe_s(word);
      let allcaps = wd.to_uppercase() == wd;
      if (CAT_NOUN.ismember(&category) || pos.is("NN") || pos.is("NNS")) && allcaps {
        word.trim_end_matches(PUNCT).to_string()
      } else if pos.is_proper_noun() {
        if allcaps {
          word.trim_end_matches(PUNCT).to_string()
        } else {
          title_case(word).trim_end_matches(PUNCT).to_string()
        }
      } else {
        let stem = word.to_lowercase();
        let stem = stem.trim_end_matches(PUNCT);
        if pos.is_verb() || pos.is_gerund() {
          lemmatize_verb(stem)
        } else {
          stem.to_string()
        }
      }
    };

    Self {
      idx,
      head: idx,
      word: word.to_string(),
      stem,
      pos,
      category,
      refs: Vec::new(),
      drs: None,
      props: Vec::new(),
      mask: 0,
      vnclasses: Vec::new(),
      wiki: None,
    }
  }

  pub fn isroot(&self) -> bool {
    self.head == self.idx
  }

  pub fn ispunct(&self) -> bool {
    self.pos.is_punct()
  }

  pub fn ispronoun(&self) -> bool {
    self.pos.is_pronoun()
  }

  pub fn ispreposition(&self) -> bool {
    self.category.test_return(&CAT_PP, true) || self.category.test_return(&CAT_SFOR, true)
  }

  pub fn isadverb(&self) -> bool {
    self.category == *CAT_ADVERB
  }

  /// Verbs used as adjectives are not verbs.
  pub fn isverb(&self) -> bool {
    (self.pos.is_verb() && self.category != *CAT_ADJECTIVE)
      || (self.category.result_category() == *CAT_VPDCL && !self.category.ismodifier())
  }

  pub fn isgerund(&self) -> bool {
    self.pos.is_gerund()
  }

  pub fn isproper_noun(&self) -> bool {
    self.pos.is_proper_noun()
  }

  pub fn isnumber(&self) -> bool {
    self.pos.is_number()
  }

  pub fn isadjective(&self) -> bool {
    self.category == *CAT_ADJECTIVE
  }

  pub fn has_mask(&self, mask: u64) -> bool {
    self.mask & mask != 0
  }

  /// Turns an entity into a proper name.
  pub fn promote_to_propernoun(&mut self) {
    if self.has_mask(RT_PROPERNAME) {
      return;
    }
    self.stem = title_case(&self.word);
    self.mask &= !RT_ENTITY;
    self.mask |= RT_PROPERNAME;
    if let Some(d) = self.drs.as_mut() {
      let refs = d.universe.clone();
      d.conditions = vec![Condition::rel(self.stem.clone(), refs)];
    }
  }

  /// Referents of the lexeme's DRS.
  pub fn variables(&self) -> Vec<DrsRef> {
    match &self.drs {
      Some(d) if !d.isempty() => d.variables(),
      _ => Vec::new(),
    }
  }

  /// The functor template for the lexeme's category. Atoms and the
  /// conjunction functors have none; functors the model does not know are
  /// inferred, or given distinct referents when that fails.
  pub fn get_template(&self, model: &Model) -> Result<Option<Arc<FunctorTemplate>>, Error> {
    let cat = &self.category;
    if !cat.isfunctor() || *cat == *CAT_CONJ_CONJ || *cat == *CAT_CONJCONJ {
      return Ok(None);
    }
    if *cat == *CAT_PREPOSITION {
      let special = if RELATIONAL_PREPOSITIONS.contains(&self.word.as_str()) {
        RELATIONAL_PREP_TEMPLATE.clone()
      } else if EMPTY_PREPOSITIONS.contains(&self.word.as_str()) {
        EMPTY_PREP_TEMPLATE.clone()
      } else {
        None
      };
      if special.is_some() {
        return Ok(special);
      }
    }
    if let Some(t) = model.lookup(cat).or_else(|| model.infer_template(cat)) {
      return Ok(Some(t));
    }
    if cat.result_category().isfunctor() || cat.argument_category().isfunctor() {
      return Err(Error::compose(format!(
        "CCG type {} for word {} maps to unknown DRS production",
        cat, self.word
      )));
    }
    warn_limited!("template", category = %cat, "no functor template, using distinct referents");
    let tagged = cat.complete_tags(INFERRED_TAG);
    Ok(FunctorTemplate::create_from_category(&tagged, None, false).map(Arc::new))
  }

  fn copy_from_sample(&mut self, sample: &Sample, category: Category, span: Span) -> DrsProduction {
    self.mask |= sample.mask;
    let mk = |i: usize| {
      if sample.event {
        DrsRef::event(i)
      } else {
        DrsRef::entity(i)
      }
    };
    let conds = sample
      .conds
      .iter()
      .map(|(name, rs)| Condition::rel(*name, rs.iter().map(|&i| mk(i)).collect()))
      .collect();
    let universe = if sample.event { Vec::new() } else { vec![mk(1)] };
    let drs = Drs::new(universe, conds);
    let lambda = mk(sample.lambda);
    let mut refs = vec![lambda.clone()];
    refs.extend(drs.variables());
    self.refs = remove_dups(&refs);
    self.drs = Some(drs);
    DrsProduction::new(self.refs.clone(), category, span).with_lambda(vec![lambda])
  }

  /// The stem this word contributes to a merged proper name. Proper nouns
  /// keep their punctuation, so `Mr.` stays `Mr.`.
  pub fn name_stem(&self) -> String {
    if !self.isproper_noun() {
      self.stem.clone()
    } else if self.word.to_uppercase() == self.word {
      self.word.clone()
    } else {
      title_case(&self.word)
    }
  }

  /// Renames the referents, the DRS and the enclosing propositions.
  pub fn rename(&mut self, rn: &Renaming) {
    if rn.is_empty() {
      return;
    }
    rn.apply(&mut self.refs);
    rn.apply(&mut self.props);
    if let Some(d) = self.drs.as_mut() {
      d.rename(rn);
    }
  }

  fn rename_local(&mut self, pairs: &[(DrsRef, DrsRef)]) {
    let rn = Renaming::new(pairs);
    rn.apply(&mut self.refs);
    if let Some(d) = self.drs.as_mut() {
      d.rename(&rn);
    }
  }

  fn set_noun_mask(&mut self) {
    if self.isnumber() {
      self.mask |= RT_NUMBER;
    } else if self.isproper_noun() {
      self.mask |= RT_PROPERNAME;
    } else if self.pos.is("NNS") {
      self.mask |= RT_ENTITY | RT_PLURAL;
    } else {
      self.mask |= RT_ENTITY;
    }
    if self.pos.is_possessive() {
      self.mask |= RT_POSSESSIVE;
    }
  }

  fn noun_production(&mut self, span: Span) -> DrsProduction {
    let x = DrsRef::entity(1);
    self.refs = vec![x.clone()];
    self.set_noun_mask();
    self.drs = Some(Drs::new(
      vec![x.clone()],
      vec![Condition::rel(self.stem.clone(), vec![x.clone()])],
    ));
    DrsProduction::new(self.refs.clone(), self.category.clone(), span).with_lambda(vec![x])
  }

  fn atomic_production(&mut self, span: Span) -> Production {
    let x = DrsRef::entity(1);
    let cat = self.category.clone();
    if cat == *CAT_CONJ || cat == *CAT_NPTHR {
      self.refs = vec![x.clone()];
      match self.stem.as_str() {
        "or" => self.mask |= RT_UNION,
        "nor" => self.mask |= RT_UNION | RT_NEGATE,
        "and" => self.mask |= RT_INTERSECTION,
        _ => {}
      }
      self.drs = Some(Drs::default());
      return DrsProduction::new(Vec::new(), cat, span).with_lambda(vec![x]).into();
    }
    if cat == *CAT_CONJ_CONJ || cat == *CAT_CONJCONJ {
      self.refs = vec![x.clone()];
      return identity_functor(cat, Some(&[x])).into();
    }
    if self.ispronoun() {
      if let Some(sample) = lookup(PRONOUNS, &self.stem) {
        return self.copy_from_sample(sample, cat, span).into();
      }
    }
    if cat.ispunct() || self.ispunct() {
      self.refs = vec![x.clone()];
      self.drs = Some(Drs::default());
      return DrsProduction::new(self.refs.clone(), cat, span).with_lambda(vec![x]).into();
    }
    if cat == *CAT_N && RELATIVE_PRONOUNS.contains(&self.stem.as_str()) {
      // no universe, as in `that which is`
      self.refs = vec![x.clone()];
      self.mask |= RT_ENTITY;
      self.drs = Some(Drs::new(Vec::new(), vec![Condition::rel(self.stem.clone(), vec![x.clone()])]));
      return DrsProduction::new(self.refs.clone(), cat, span).with_lambda(vec![x]).into();
    }
    if CAT_NOUN.ismember(&cat)
      || (cat.remove_features() == *CAT_NP && (self.pos.is_noun() || self.isnumber()))
    {
      return self.noun_production(span).into();
    }
    self.refs = vec![x.clone()];
    self.drs = Some(Drs::new(Vec::new(), vec![Condition::rel(self.stem.clone(), vec![x.clone()])]));
    DrsProduction::new(self.refs.clone(), cat, span).with_lambda(vec![x]).into()
  }

  fn verbnet_classes(&self, verbnet: &dyn VerbNet, options: ComposeOptions) -> Vec<String> {
    if options.contains(ComposeOptions::NO_VERBNET) {
      return Vec::new();
    }
    match verbnet.classes(&self.stem) {
      Ok(classes) => classes,
      Err(e) => {
        warn_limited!("verbnet", stem = %self.stem, "VerbNet lookup failed: {}", e);
        Vec::new()
      }
    }
  }

  fn build_conditions(&mut self, binary: Option<&[DrsRef]>, template: &FunctorTemplate) -> Vec<Condition> {
    let r0 = self.refs[0].clone();
    let mut conds = Vec::new();
    if self.isproper_noun() {
      // a proper noun functor names its outermost argument
      let mut refs: Vec<DrsRef> = template
        .constructor_rule()
        .first()
        .and_then(|rule| rule.first())
        .into_iter()
        .cloned()
        .collect();
      let rest: Vec<DrsRef> = self.refs.iter().filter(|r| !refs.contains(r)).cloned().collect();
      refs.extend(rest);
      let date_refs = if template.isfinalevent() {
        refs.iter().take(2).cloned().collect()
      } else {
        refs.clone()
      };
      let r0 = refs[0].clone();
      let date = if MONTH.is_match(&self.stem) {
        self.mask |= RT_MONTH;
        Some(lookup_name(MONTHS, &self.stem))
      } else if WEEKDAY.is_match(&self.stem) {
        self.mask |= RT_WEEKDAY;
        Some(lookup_name(WEEKDAYS, &self.stem))
      } else {
        None
      };
      match date {
        Some(long) => {
          self.mask |= RT_DATE;
          let name = long.map_or_else(|| self.stem.clone(), str::to_string);
          conds.push(Condition::rel(name, vec![r0]));
          conds.push(Condition::rel(".DATE", date_refs));
        }
        None => conds.push(Condition::rel(self.stem.clone(), vec![r0])),
      }
    } else if self.isnumber() {
      self.mask |= RT_NUMBER;
      conds.push(Condition::rel(self.stem.clone(), vec![r0.clone()]));
      conds.push(Condition::rel(".NUM", vec![r0]));
    } else if self.ispunct() {
      if let Some(b) = binary {
        match self.word.as_str() {
          ":" => conds.push(Condition::rel(".IE", b.to_vec())),
          ";" => conds.push(Condition::rel(".LINK", b.to_vec())),
          _ => {}
        }
      }
    } else if let Some(b) = binary {
      if self.pos.is_possessive() {
        self.mask |= RT_POSSESSIVE;
        conds.push(Condition::rel(".POSS", b.to_vec()));
      } else {
        conds.push(Condition::rel(self.stem.clone(), b.to_vec()));
      }
    } else {
      conds.push(Condition::rel(self.stem.clone(), vec![r0]));
    }
    conds
  }

  /// Builds the production for this lexeme, filling in `refs`, `drs` and
  /// `mask` as a side effect. Referents are local to the lexeme; the
  /// composer renames them.
  pub fn get_production(
    &mut self,
    model: &Model,
    verbnet: &dyn VerbNet,
    options: ComposeOptions,
  ) -> Result<Production, Error> {
    let span = Span::single(self.idx);
    let production = match self.get_template(model)? {
      None => self.atomic_production(span),
      Some(_) if CAT_NP_N.ismember(&self.category) => self.determiner_production(span),
      Some(template) => self.template_production(&template, verbnet, options, span)?,
    };
    if self.drs.as_ref().is_none_or(|d| d.isempty()) {
      self.mask |= RT_EMPTY_DRS;
    }
    Ok(production)
  }

  fn determiner_production(&mut self, span: Span) -> Production {
    let cat = self.category.clone();
    if self.ispronoun() {
      if let Some(sample) = lookup(PRONOUNS, &self.stem) {
        let d = self.copy_from_sample(sample, CAT_NP.clone(), span);
        let lambda = d.lambda.clone().unwrap_or_default();
        return FunctorProduction::new(cat, lambda, Some(d.into())).into();
      }
    }
    let x = DrsRef::entity(1);
    self.refs = vec![x.clone()];
    let conds = match self.stem.as_str() {
      "a" | "an" => vec![Condition::rel(".EXISTS", vec![x.clone()])],
      "the" | "thy" => Vec::new(),
      _ => vec![Condition::rel(self.stem.clone(), vec![x.clone()])],
    };
    self.drs = Some(Drs::new(Vec::new(), conds));
    let d = DrsProduction::new(vec![x.clone()], CAT_NP.clone(), span).with_lambda(vec![x.clone()]);
    FunctorProduction::new(cat, vec![x], Some(d.into())).into()
  }

  fn template_production(
    &mut self,
    template: &FunctorTemplate,
    verbnet: &dyn VerbNet,
    options: ComposeOptions,
    span: Span,
  ) -> Result<Production, Error> {
    let cat = self.category.clone();
    let numbered = options.contains(ComposeOptions::NUMBERED_ROLES);

    let mut lstk = Vec::new();
    let mut rstk = Vec::new();
    let mut argcat = cat.clone();
    for rule in template.constructor_rule() {
      if argcat.isarg_left() {
        lstk.extend(rule.iter().cloned());
      } else {
        rstk.extend(rule.iter().cloned());
      }
      argcat = argcat.result_category();
    }

    let final_ref = template.final_ref().clone();
    let final_atom = template.final_atom().remove_wildcards();
    let mut refs = vec![final_ref.clone()];
    refs.extend(lstk.iter().rev().cloned());
    refs.extend(rstk.iter().cloned());
    let mut refs = remove_dups(&refs);
    self.refs = refs.clone();

    let mut brefs = vec![final_ref.clone()];
    brefs.extend(rstk.iter().cloned());
    let brefs = remove_dups(&brefs);
    let binary = if brefs.len() > 1
      && (self.pos.is_preposition()
        || self.word == ":"
        || self.word == ";"
        || cat == *CAT_NPNB_N_NP
        || cat == *CAT_NPN_NP
        || (cat.test_returns_entity_modifier() && cat.argument_category().isatom()))
    {
      // right attachment
      Some(vec![brefs[0].clone(), brefs[1].clone()])
    } else if brefs.len() == 1 && rstk.len() == 1 && !lstk.is_empty() && lstk[0] != brefs[0] {
      // left attachment
      Some(vec![lstk[0].clone(), brefs[0].clone()])
    } else {
      None
    };

    let mut isverb = self.isverb();
    let mut arg_offs = 0;
    if self.isgerund() {
      let scat = cat.simplify();
      isverb = if scat.ismodifier() {
        false
      } else if scat.test_return(&CAT_VP_MOD, false)
        || scat.test_return(&CAT_MODAL, false)
        || scat.test_return(&CAT_S_S, false)
        || scat.test_return(&CAT_SS, false)
      {
        if rstk.is_empty() {
          false
        } else {
          arg_offs = 1;
          let mut r = vec![refs[0].clone()];
          r.extend(rstk.iter().cloned());
          refs = remove_dups(&r);
          refs.truncate(2);
          self.refs = refs.clone();
          true
        }
      } else {
        scat.can_unify(&CAT_VP) || scat.test_return(&CAT_VP, false)
      };
    }

    let e = refs[0].clone();
    if isverb && template.isfinalevent() {
      let vnclasses = self.verbnet_classes(verbnet, options);
      let mut conds = Vec::new();
      match vn_condition(&vnclasses, &e) {
        Some(vncond) => conds.push(Condition::Imp(
          Drs::new(Vec::new(), vec![Condition::rel(self.stem.clone(), vec![e.clone()])]),
          Drs::new(Vec::new(), vec![vncond]),
        )),
        None => conds.push(Condition::rel(self.stem.clone(), vec![e.clone()])),
      }
      let rcat = cat.test_return_and_get(&CAT_VPMODX, false);
      let mut universe = vec![e.clone()];
      let mut event = true;

      if self.isgerund() {
        conds.push(Condition::rel(".EVENT", vec![e.clone()]));
        let args: Vec<DrsRef> = refs[1..].iter().take(2).cloned().collect();
        conds.extend(event_roles(&e, &args, arg_offs, numbered));
      } else if rcat.as_ref().is_some_and(|rc| {
        rc.argument_category().has_any_features(FEATURE_VARG)
          && rc.result_category().has_any_features(FEATURE_VRES)
      }) {
        conds.push(Condition::rel(".EVENT", vec![e.clone()]));
        let args: Vec<DrsRef> = refs[1..].iter().take(2).cloned().collect();
        conds.extend(event_roles(&e, &args, 0, numbered));
      } else if let Some(rc) =
        rcat.as_ref().filter(|rc| rc.has_any_features(FEATURE_PSS | FEATURE_TO) || rc.ismodifier())
      {
        if refs.len() > 1 {
          if rc.ismodifier() || self.stem == "be" || self.stem == "get" {
            // passive
            self.mask |= RT_EVENT_ATTRIB;
            conds.push(Condition::rel(".MOD", vec![e.clone(), refs[refs.len() - 1].clone()]));
            universe.clear();
            event = false;
          } else {
            conds.push(Condition::rel(".EVENT", vec![e.clone()]));
            let args: Vec<DrsRef> = refs[1..].iter().take(2).cloned().collect();
            conds.extend(event_roles(&e, &args, 0, numbered));
          }
        } else {
          conds.clear();
          universe.clear();
          event = false;
        }
      } else if rcat.is_none() && cat == *CAT_VPPSS && refs.len() > 1 {
        // a bare passive participle attributes its event to the subject
        self.mask |= RT_EVENT_ATTRIB;
        conds.push(Condition::rel(".MOD", vec![e.clone(), refs[refs.len() - 1].clone()]));
        universe.clear();
        event = false;
      } else if cat == *CAT_MODAL_PAST {
        self.mask |= RT_EVENT_MODAL;
        conds.push(Condition::rel(".MODAL", vec![e.clone()]));
        universe.clear();
        event = false;
      } else if is_copular(&cat) {
        if refs.len() != 3 {
          return Err(Error::compose(format!(
            "copular {} expects 3 referents, got {}",
            self.word,
            refs.len()
          )));
        }
        conds.push(Condition::rel(".EVENT", vec![e.clone()]));
        conds.extend(copular_roles(&e, &refs[1], &refs[2], numbered));
      } else if cat == *CAT_VPDCL {
        if refs.len() != 2 {
          return Err(Error::compose(format!(
            "intransitive {} expects 2 referents, got {}",
            self.word,
            refs.len()
          )));
        }
        conds.push(Condition::rel(".EVENT", vec![e.clone()]));
        conds.extend(event_roles(&e, &refs[1..], 0, numbered));
      } else if self.stem == "be" && cat.can_unify(&CAT_TV) && refs.len() >= 3 {
        conds.push(Condition::rel(".EVENT", vec![e.clone()]));
        conds.extend(copular_roles(&e, &refs[1], &refs[2], numbered));
      } else {
        conds.push(Condition::rel(".EVENT", vec![e.clone()]));
        conds.extend(event_roles(&e, &refs[1..], 0, numbered));
      }
      if event {
        self.mask |= RT_EVENT;
        self.vnclasses = vnclasses;
      }
      self.drs = Some(Drs::new(universe, conds));
    } else if self.isadverb() && template.isfinalevent() {
      if let Some(sample) = lookup(DIRECTIONS, &self.stem) {
        self.copy_from_sample(sample, final_atom.clone(), span.clone());
        self.rename_local(&[(DrsRef::event(sample.lambda), refs[0].clone())]);
        self.refs = refs.clone();
      } else {
        self.drs = Some(Drs::new(Vec::new(), vec![Condition::rel(self.stem.clone(), vec![e.clone()])]));
      }
    } else if self.ispronoun() && lookup(PRONOUNS, &self.stem).is_some() {
      self.pronoun_with_template(&refs, span.clone());
    } else if self.ispreposition() {
      if template.construct_empty() {
        self.refs = vec![refs[0].clone()];
        self.drs = Some(Drs::default());
      } else if let Some(b) = &binary {
        self.refs = b.clone();
        self.drs = Some(Drs::new(Vec::new(), vec![Condition::rel(self.stem.clone(), b.clone())]));
      } else {
        self.refs = vec![refs[0].clone()];
        self.drs = Some(Drs::new(Vec::new(), vec![Condition::rel(self.stem.clone(), vec![e.clone()])]));
      }
    } else if self.pos.is_preposition() && binary.is_some() {
      let b = binary.clone().unwrap_or_default();
      self.drs = Some(Drs::new(Vec::new(), vec![Condition::rel(self.stem.clone(), b.clone())]));
      self.refs = b;
    } else if final_atom == *CAT_SADJ && refs.len() > 1 {
      self.mask |= RT_ATTRIBUTE;
      let args = if cat == *CAT_AP_PP || cat.ismodifier() || cat.test_returns_modifier() {
        self.mask &= !RT_ATTRIBUTE;
        vec![e.clone()]
      } else if cat.test_return(&CAT_AP, false) && cat.isarg_right() && cat.argument_category() == *CAT_NP {
        vec![e.clone(), refs[refs.len() - 1].clone()]
      } else {
        vec![e.clone()]
      };
      self.drs = Some(Drs::new(Vec::new(), vec![Condition::rel(self.stem.clone(), args)]));
    } else {
      let universe = if cat == *CAT_N_PP { vec![e.clone()] } else { Vec::new() };
      if self.isproper_noun() {
        self.mask |= RT_PROPERNAME;
      } else if final_atom == *CAT_N && !cat.ismodifier() && !cat.test_returns_modifier() {
        self.mask |= if self.pos.is("NNS") { RT_ENTITY | RT_PLURAL } else { RT_ENTITY };
      } else if self.refs.len() == 1
        && final_atom == *CAT_N
        && (cat.ismodifier() || cat.test_returns_modifier())
      {
        self.mask |= RT_ATTRIBUTE;
      }
      if template.isfinalevent() {
        if cat == *CAT_INFINITIVE {
          // keeps the `to` constituent
          self.drs = Some(Drs::default());
          self.refs = vec![e.clone()];
        } else if self.pos.is_modal() {
          self.mask |= RT_EVENT_MODAL;
          self.drs = Some(Drs::new(
            Vec::new(),
            vec![
              Condition::rel(self.stem.clone(), vec![e.clone()]),
              Condition::rel(".MODAL", vec![e.clone()]),
            ],
          ));
        } else {
          let conds = self.build_conditions(binary.as_deref(), template);
          self.drs = Some(Drs::new(Vec::new(), conds));
        }
      } else {
        let conds = self.build_conditions(binary.as_deref(), template);
        self.drs = Some(Drs::new(universe, conds));
      }
    }

    let d = DrsProduction::new(self.refs.clone(), final_atom, span).with_lambda(vec![final_ref]);
    Ok(template.create_functor(d.into()).into())
  }

  fn pronoun_with_template(&mut self, refs: &[DrsRef], span: Span) {
    let Some(sample) = lookup(PRONOUNS, &self.stem) else {
      return;
    };
    self.copy_from_sample(sample, self.category.clone(), span);
    let lambda = DrsRef::entity(sample.lambda);
    let vars = self.variables();
    let ers: Vec<DrsRef> = vars.iter().filter(|v| **v != lambda).cloned().collect();
    let ors: Vec<DrsRef> = ers.iter().filter(|v| refs.contains(v)).cloned().collect();
    if !ors.is_empty() {
      let mut used = ers.clone();
      used.extend(refs.iter().cloned());
      used.push(lambda.clone());
      let nrs = get_new_drsrefs(&ors, &used);
      let pairs: Vec<(DrsRef, DrsRef)> = ors.into_iter().zip(nrs).collect();
      self.rename_local(&pairs);
    }
    let ers: Vec<DrsRef> = self.variables().into_iter().filter(|v| *v != lambda).collect();
    let mut pairs = vec![(lambda, refs[0].clone())];
    if let (Some(er), Some(r1)) = (ers.first(), refs.get(1)) {
      pairs.push((er.clone(), r1.clone()));
    }
    self.rename_local(&pairs);
    let mut all = refs.to_vec();
    all.extend(self.variables());
    self.refs = remove_dups(&all);
  }
}

impl fmt::Display for Lexeme {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.drs {
      Some(d) if !d.isempty() => write!(f, "{}:({}, {})", self.word, d, self.category),
      _ => write!(f, "{}:({}, {})", self.word, self.stem, self.category),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::kb::{NullVerbNet, VerbNetTable};

  fn cat(s: &str) -> Category {
    Category::parse(s).unwrap()
  }

  fn lexeme(word: &str, pos: &str, category: &str) -> Lexeme {
    Lexeme::new(cat(category), word, Pos::new(pos), 0)
  }

  fn produce(lx: &mut Lexeme, options: ComposeOptions) -> Production {
    lx.get_production(Model::builtin(), &NullVerbNet, options).unwrap()
  }

  fn drs(lx: &Lexeme) -> String {
    lx.drs.as_ref().map(|d| d.to_string()).unwrap_or_default()
  }

  #[test]
  fn test_stems() {
    assert_eq!(lexeme("Mr.", "NNP", "N/N").stem, "Mr");
    assert_eq!(lexeme("IBM", "NNP", "N").stem, "IBM");
    assert_eq!(lexeme("vinken", "NNP", "N").stem, "Vinken");
    assert_eq!(lexeme("running", "VBG", r"S[ng]\NP").stem, "run");
    assert_eq!(lexeme("Boys", "NNS", "N").stem, "boys");
    assert_eq!(lexeme(",", ",", ",").stem, ",");
    assert_eq!(title_case("elsevier n.v."), "Elsevier N.V.");
    assert_eq!(lexeme("Mr.", "NNP", "N/N").name_stem(), "Mr.");
    assert_eq!(lexeme("N.V.", "NNP", "N").name_stem(), "N.V.");
    assert_eq!(lexeme("of", "IN", "(N\\N)/N").name_stem(), "of");
  }

  #[test]
  fn test_word_rewrites() {
    let lx = lexeme("'s", "VBZ", r"(S[dcl]\NP)/NP");
    assert_eq!(lx.word, "is");
    assert_eq!(lx.stem, "be");
    let lx = lexeme("will", "MD", r"(S[dcl]\NP)/(S[b]\NP)");
    assert_eq!(lx.category, cat(r"(S\NP)/(S\NP)"));
  }

  #[test]
  fn test_noun() {
    let mut lx = lexeme("boy", "NN", "N");
    let p = produce(&mut lx, ComposeOptions::NONE);
    assert_eq!(drs(&lx), "[X1| boy(X1)]");
    assert_eq!(p.lambda_refs(), vec![DrsRef::entity(1)]);
    assert!(lx.has_mask(RT_ENTITY));

    let mut lx = lexeme("boys", "NNS", "N");
    produce(&mut lx, ComposeOptions::NONE);
    assert!(lx.has_mask(RT_PLURAL));
  }

  #[test]
  fn test_determiners() {
    let mut lx = lexeme("The", "DT", "NP[nb]/N");
    let p = produce(&mut lx, ComposeOptions::NONE);
    assert!(p.isfunctor());
    assert!(lx.has_mask(RT_EMPTY_DRS));
    let mut lx = lexeme("a", "DT", "NP[nb]/N");
    produce(&mut lx, ComposeOptions::NONE);
    assert_eq!(drs(&lx), "[| .EXISTS(X1)]");
  }

  #[test]
  fn test_conj() {
    let mut lx = lexeme("and", "CC", "conj");
    let p = produce(&mut lx, ComposeOptions::NONE);
    assert!(!p.isfunctor());
    assert!(lx.has_mask(RT_INTERSECTION));
    let mut lx = lexeme("nor", "CC", "conj");
    produce(&mut lx, ComposeOptions::NONE);
    assert!(lx.has_mask(RT_UNION | RT_NEGATE));
  }

  #[test]
  fn test_pronoun() {
    let mut lx = lexeme("He", "PRP", "NP");
    produce(&mut lx, ComposeOptions::NONE);
    assert_eq!(drs(&lx), "[X1| he(X1)]");
    assert!(lx.has_mask(RT_MALE) && lx.has_mask(RT_3P));
    let mut lx = lexeme("his", "PRP$", "NP[nb]/N");
    let p = produce(&mut lx, ComposeOptions::NONE);
    assert!(p.isfunctor());
    assert_eq!(drs(&lx), "[X1| he(X1),.POSS(X1,X2)]");
    assert_eq!(lx.refs[0], DrsRef::entity(2));
  }

  #[test]
  fn test_verb_roles() {
    let mut lx = lexeme("want", "VB", r"(S[b]\NP)/(S[to]\NP)");
    let p = produce(&mut lx, ComposeOptions::NONE);
    assert_eq!(drs(&lx), "[E3| want(E3),.EVENT(E3),.AGENT(E3,X1),.THEME(E3,E2)]");
    assert_eq!(p.category(), cat(r"(S[b]\NP)/(S[to]\NP)"));
    assert!(lx.has_mask(RT_EVENT));

    let mut lx = lexeme("want", "VB", r"(S[b]\NP)/(S[to]\NP)");
    produce(&mut lx, ComposeOptions::NUMBERED_ROLES);
    assert_eq!(drs(&lx), "[E3| want(E3),.EVENT(E3),.ARG0(E3,X1),.ARG1(E3,E2)]");

    let mut lx = lexeme("gave", "VBD", r"((S[dcl]\NP)/NP)/NP");
    produce(&mut lx, ComposeOptions::NONE);
    assert_eq!(drs(&lx), "[E4| give(E4),.EVENT(E4),.AGENT(E4,X3),.THEME(E4,X1),.EXTRA(E4,X2)]");
  }

  #[test]
  fn test_modal_and_infinitive() {
    let mut lx = lexeme("will", "MD", r"(S[dcl]\NP)/(S[b]\NP)");
    produce(&mut lx, ComposeOptions::NONE);
    assert_eq!(drs(&lx), "[| will(E2),.MODAL(E2)]");
    assert!(lx.has_mask(RT_EVENT_MODAL));

    let mut lx = lexeme("to", "TO", r"(S[to]\NP)/(S[b]\NP)");
    let p = produce(&mut lx, ComposeOptions::NONE);
    assert!(p.isfunctor());
    assert_eq!(lx.drs, Some(Drs::default()));
  }

  #[test]
  fn test_copular() {
    let mut lx = lexeme("is", "VBZ", r"(S[dcl]\NP)/(S[adj]\NP)");
    produce(&mut lx, ComposeOptions::NONE);
    assert_eq!(drs(&lx), "[E3| be(E3),.EVENT(E3),.AGENT(E3,X1),.ROLE(E3,X2)]");

    let mut lx = lexeme("tall", "JJ", r"S[adj]\NP");
    produce(&mut lx, ComposeOptions::NONE);
    assert_eq!(drs(&lx), "[| tall(X2)]");
    assert!(lx.has_mask(RT_ATTRIBUTE));
  }

  #[test]
  fn test_passive_participle() {
    let mut lx = lexeme("owned", "VBN", r"S[pss]\NP");
    produce(&mut lx, ComposeOptions::NONE);
    assert_eq!(drs(&lx), "[| own(E2),.MOD(E2,X1)]");
    assert!(lx.has_mask(RT_EVENT_ATTRIB));
  }

  #[test]
  fn test_prepositions() {
    let mut lx = lexeme("of", "IN", "PP/NP");
    produce(&mut lx, ComposeOptions::NONE);
    assert_eq!(drs(&lx), "[| of(X2,X1)]");
    let mut lx = lexeme("by", "IN", "PP/NP");
    produce(&mut lx, ComposeOptions::NONE);
    assert!(lx.has_mask(RT_EMPTY_DRS));
    let mut lx = lexeme("in", "IN", r"((S\NP)\(S\NP))/NP");
    produce(&mut lx, ComposeOptions::NONE);
    assert_eq!(drs(&lx), "[| in(E3,X1)]");
  }

  #[test]
  fn test_dates_and_numbers() {
    let mut lx = lexeme("Nov.", "NNP", "N/N");
    produce(&mut lx, ComposeOptions::NONE);
    assert_eq!(drs(&lx), "[| November(X1),.DATE(X1)]");
    assert!(lx.has_mask(RT_DATE | RT_MONTH));

    // `Nov. 29` modifying a verb phrase: the month names the day number and
    // the date links it to the event
    let c = cat(r"((S_61\NP_56)_61\(S_61\NP_56)_61)/N[num]_62");
    let model = Model::builtin().with_predarg_templates([&c]);
    let mut lx = lexeme("Nov.", "NNP", r"((S\NP)\(S\NP))/N[num]");
    lx.get_production(&model, &NullVerbNet, ComposeOptions::NONE).unwrap();
    let d = lx.drs.clone().unwrap();
    let month = d.relations().find(|r| r.name == "November").unwrap();
    let date = d.relations().find(|r| r.name == ".DATE").unwrap();
    assert!(lx.refs[0].isevent());
    assert!(!month.refs[0].isevent());
    assert_eq!(date.refs, vec![month.refs[0].clone(), lx.refs[0].clone()]);

    let mut lx = lexeme("61", "CD", "N/N");
    produce(&mut lx, ComposeOptions::NONE);
    assert_eq!(drs(&lx), "[| 61(X1),.NUM(X1)]");
  }

  #[test]
  fn test_verbnet_classes() {
    let vn: VerbNetTable = [("give", "give-13.1"), ("give", "contribute-13.2"), ("give", "x-1")]
      .into_iter()
      .collect();
    let mut lx = lexeme("gave", "VBD", r"((S[dcl]\NP)/NP)/NP");
    lx.get_production(Model::builtin(), &vn, ComposeOptions::NONE).unwrap();
    assert_eq!(lx.vnclasses.len(), 3);
    let d = lx.drs.unwrap();
    assert!(matches!(d.conditions[0], Condition::Imp(_, _)));

    let mut lx = lexeme("gave", "VBD", r"((S[dcl]\NP)/NP)/NP");
    lx.get_production(Model::builtin(), &vn, ComposeOptions::NO_VERBNET).unwrap();
    assert!(lx.vnclasses.is_empty());
  }

  #[test]
  fn test_event_roles() {
    let e = DrsRef::event(1);
    let xs: Vec<DrsRef> = (2..6).map(DrsRef::entity).collect();
    let conds = event_roles(&e, &xs, 0, false);
    assert_eq!(conds.len(), 3);
    assert_eq!(conds[2], Condition::rel(".EXTRA", vec![e.clone(), xs[2].clone(), xs[3].clone()]));
    let conds = event_roles(&e, &xs[..2], 1, false);
    assert_eq!(conds[0], Condition::rel(".THEME", vec![e.clone(), xs[0].clone()]));
    assert_eq!(event_roles(&e, &xs, 0, true).len(), 4);
  }

  #[test]
  fn test_promote_to_propernoun() {
    let mut lx = lexeme("apple", "NN", "N");
    produce(&mut lx, ComposeOptions::NONE);
    lx.promote_to_propernoun();
    assert_eq!(drs(&lx), "[X1| Apple(X1)]");
    assert!(lx.has_mask(RT_PROPERNAME) && !lx.has_mask(RT_ENTITY));
  }
}
