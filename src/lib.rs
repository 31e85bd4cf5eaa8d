#[macro_use]
extern crate lazy_static;

pub mod category;
pub mod compose;
pub mod drs;
pub mod error;
pub mod kb;
pub mod lexeme;
pub mod model;
pub mod options;
pub mod parse_derivation;
pub mod pos;
pub mod production;
pub mod rules;
pub mod sentence;
pub mod stem;
pub mod syntree;
pub mod utils;

pub use crate::category::Category;
pub use crate::compose::{process_ccg_pt, pt_to_ccgbank, Ccg2Drs};
pub use crate::drs::{Drs, DrsRef};
pub use crate::error::Error;
pub use crate::model::Model;
pub use crate::options::ComposeOptions;
pub use crate::parse_derivation::{parse_ccg_derivation, sentence_from_pt, PTree};
pub use crate::sentence::{Constituent, ConstituentType, Sentence, Span};
pub use crate::utils::Err;

/// Parses a derivation and composes it in one step.
pub fn compose_sentence(derivation: &str, options: ComposeOptions) -> Result<Sentence, Error> {
  let pt = parse_ccg_derivation(derivation)?;
  Ok(process_ccg_pt(&pt, options)?.to_sentence())
}

#[test]
fn test_compose_sentence() {
  let s = compose_sentence(
    r"(<T S[dcl] 1 2> (<L NP NNP NNP John NP>) (<T S[dcl]\NP 0 2> (<L (S[dcl]\NP)/NP VBZ VBZ likes (S[dcl]\NP_1)/NP_2>) (<L NP NNP NNP Mary NP>)))",
    ComposeOptions::NO_VERBNET | ComposeOptions::NO_WIKI_SEARCH,
  )
  .unwrap();

  assert_eq!(s.text(), "John likes Mary");
  let rels: Vec<&str> = s.drs.relations().map(|r| r.name.as_str()).collect();
  assert!(rels.contains(&"John"), "{}", s.drs);
  assert!(rels.contains(&"Mary"), "{}", s.drs);
  assert!(rels.contains(&".EVENT"), "{}", s.drs);
  assert_eq!(s.get_dependency_tree().len(), 1);

  assert!(compose_sentence("(<T S 0 2>", ComposeOptions::NONE).is_err());
}
