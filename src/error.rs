use thiserror::Error;

/// Errors raised while reading derivations or composing a DRS. All of them
/// are fatal for the sentence being composed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("bad category signature `{0}`")]
  CategoryParse(String),
  #[error("bad ccg derivation: {0}")]
  DerivationParse(String),
  #[error("no combinator for {left} {right} => {result}")]
  CombinatorNotFound {
    left: String,
    right: String,
    result: String,
  },
  #[error("no unary rule for {result}\\{argument}")]
  UnaryRule { result: String, argument: String },
  #[error("bad functor template: {0}")]
  TemplateRule(String),
  #[error("drs compose: {0}")]
  DrsCompose(String),
}

impl Error {
  pub(crate) fn compose(msg: impl Into<String>) -> Self {
    Self::DrsCompose(msg.into())
  }
}
