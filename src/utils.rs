use std::collections::HashMap;
use std::error::Error;
use std::hash::Hash;
use std::sync::Mutex;

/// Boxed static error type
pub type Err = Box<dyn Error + 'static>;

/// How many times a given kind of warning is logged before going quiet.
pub const WARN_LIMIT: usize = 10;

lazy_static! {
  static ref WARN_COUNTS: Mutex<HashMap<&'static str, usize>> = Mutex::new(HashMap::new());
}

/// Returns true the first `WARN_LIMIT` times it is called for `kind`.
pub fn should_warn(kind: &'static str) -> bool {
  match WARN_COUNTS.lock() {
    Ok(mut counts) => {
      let n = counts.entry(kind).or_insert(0);
      *n += 1;
      *n <= WARN_LIMIT
    }
    Err(_) => false,
  }
}

/// `tracing::warn!`, but only for the first few occurrences of each kind.
#[macro_export]
macro_rules! warn_limited {
  ($kind:expr, $($arg:tt)+) => {
    if $crate::utils::should_warn($kind) {
      ::tracing::warn!($($arg)+);
    }
  };
}

/// Removes duplicates keeping the first occurrence of each element.
///
/// ```
/// assert_eq!(ccg2drs::utils::remove_dups(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
/// ```
pub fn remove_dups<T>(list: &[T]) -> Vec<T>
where
  T: Clone + Eq + Hash,
{
  let mut seen = std::collections::HashSet::with_capacity(list.len());
  list
    .iter()
    .filter(|x| seen.insert((*x).clone()))
    .cloned()
    .collect()
}

/// Removes duplicates keeping the last occurrence of each element.
///
/// ```
/// assert_eq!(ccg2drs::utils::remove_dups_keep_last(&[3, 1, 3, 2, 1]), vec![3, 2, 1]);
/// ```
pub fn remove_dups_keep_last<T>(list: &[T]) -> Vec<T>
where
  T: Clone + Eq + Hash,
{
  let mut rev = list.to_vec();
  rev.reverse();
  let mut out = remove_dups(&rev);
  out.reverse();
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn warnings_are_limited() {
    let logged = (0..WARN_LIMIT + 5)
      .filter(|_| should_warn("utils-test"))
      .count();
    assert_eq!(logged, WARN_LIMIT);
  }
}
