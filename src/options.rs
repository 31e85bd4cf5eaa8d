use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::str::FromStr;

/// Bit set of switches that change how a sentence is composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ComposeOptions(pub u32);

impl ComposeOptions {
  pub const NONE: Self = Self(0);
  /// Collapse propositions whose box holds a single referent.
  pub const REMOVE_UNARY_PROPS: Self = Self(0x0001);
  /// Log every production as it is built.
  pub const PRINT_DERIVATION: Self = Self(0x0002);
  /// Check production signatures against categories while composing.
  pub const VERIFY_SIGNATURES: Self = Self(0x0004);
  pub const NO_VERBNET: Self = Self(0x0040);
  /// Parsed and printed, but has no effect: renaming always goes through a
  /// rename map.
  pub const FAST_RENAME: Self = Self(0x0080);
  pub const NO_WIKI_SEARCH: Self = Self(0x0100);
  /// Final variable names follow the index of the binding word.
  pub const VARNAMES_MATCH_WORD_INDEX: Self = Self(0x0200);
  /// Emit `.ARG0 .. .ARG5` instead of `.AGENT/.THEME/.EXTRA`.
  pub const NUMBERED_ROLES: Self = Self(0x0800);

  const NAMES: [(&'static str, Self); 9] = [
    ("remove-unary-props", Self::REMOVE_UNARY_PROPS),
    ("print-derivation", Self::PRINT_DERIVATION),
    ("verify-signatures", Self::VERIFY_SIGNATURES),
    ("no-verbnet", Self::NO_VERBNET),
    ("fast-rename", Self::FAST_RENAME),
    ("no-wiki-search", Self::NO_WIKI_SEARCH),
    ("varnames-match-word-index", Self::VARNAMES_MATCH_WORD_INDEX),
    ("numbered-roles", Self::NUMBERED_ROLES),
    ("none", Self::NONE),
  ];

  pub fn contains(self, other: Self) -> bool {
    other.0 != 0 && (self.0 & other.0) == other.0
  }
}

impl BitOr for ComposeOptions {
  type Output = Self;
  fn bitor(self, rhs: Self) -> Self {
    Self(self.0 | rhs.0)
  }
}

impl BitOrAssign for ComposeOptions {
  fn bitor_assign(&mut self, rhs: Self) {
    self.0 |= rhs.0;
  }
}

impl BitAnd for ComposeOptions {
  type Output = Self;
  fn bitand(self, rhs: Self) -> Self {
    Self(self.0 & rhs.0)
  }
}

/// Parses a comma separated list like `no-verbnet,numbered-roles`.
impl FromStr for ComposeOptions {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let mut opts = Self::NONE;
    for name in s.split(',').map(str::trim).filter(|n| !n.is_empty()) {
      match Self::NAMES.iter().find(|(n, _)| *n == name) {
        Some((_, o)) => opts |= *o,
        None => return Err(format!("unknown compose option `{}`", name)),
      }
    }
    Ok(opts)
  }
}

impl fmt::Display for ComposeOptions {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let names = Self::NAMES
      .iter()
      .filter(|(_, o)| self.contains(*o))
      .map(|(n, _)| *n)
      .collect::<Vec<_>>();
    write!(f, "{}", names.join(","))
  }
}

#[test]
fn test_parse_options() {
  let o: ComposeOptions = "no-verbnet, numbered-roles".parse().unwrap();
  assert!(o.contains(ComposeOptions::NO_VERBNET));
  assert!(o.contains(ComposeOptions::NUMBERED_ROLES));
  assert!(!o.contains(ComposeOptions::FAST_RENAME));
  assert_eq!(o.to_string(), "no-verbnet,numbered-roles");
  assert!("bogus".parse::<ComposeOptions>().is_err());
}
