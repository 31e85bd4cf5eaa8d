//! A rule based verb lemmatizer with a table of irregular forms.

use std::collections::HashMap;

lazy_static! {
  static ref IRREGULAR: HashMap<&'static str, &'static str> =
    IRREGULAR_VERBS.iter().cloned().collect();
}

/// (inflected form, lemma)
const IRREGULAR_VERBS: &[(&str, &str)] = &[
  ("am", "be"),
  ("is", "be"),
  ("are", "be"),
  ("was", "be"),
  ("were", "be"),
  ("been", "be"),
  ("being", "be"),
  ("'s", "be"),
  ("'re", "be"),
  ("'m", "be"),
  ("has", "have"),
  ("had", "have"),
  ("having", "have"),
  ("'ve", "have"),
  ("'d", "have"),
  ("does", "do"),
  ("did", "do"),
  ("done", "do"),
  ("doing", "do"),
  ("goes", "go"),
  ("went", "go"),
  ("gone", "go"),
  ("ran", "run"),
  ("running", "run"),
  ("began", "begin"),
  ("begun", "begin"),
  ("beginning", "begin"),
  ("bought", "buy"),
  ("brought", "bring"),
  ("built", "build"),
  ("came", "come"),
  ("caught", "catch"),
  ("chose", "choose"),
  ("chosen", "choose"),
  ("dealt", "deal"),
  ("drew", "draw"),
  ("drawn", "draw"),
  ("drove", "drive"),
  ("driven", "drive"),
  ("ate", "eat"),
  ("eaten", "eat"),
  ("fell", "fall"),
  ("fallen", "fall"),
  ("felt", "feel"),
  ("fought", "fight"),
  ("found", "find"),
  ("flew", "fly"),
  ("flown", "fly"),
  ("forgot", "forget"),
  ("forgotten", "forget"),
  ("froze", "freeze"),
  ("frozen", "freeze"),
  ("got", "get"),
  ("gotten", "get"),
  ("getting", "get"),
  ("gave", "give"),
  ("given", "give"),
  ("grew", "grow"),
  ("grown", "grow"),
  ("heard", "hear"),
  ("held", "hold"),
  ("hid", "hide"),
  ("hidden", "hide"),
  ("kept", "keep"),
  ("knew", "know"),
  ("known", "know"),
  ("laid", "lay"),
  ("led", "lead"),
  ("left", "leave"),
  ("lent", "lend"),
  ("lay", "lie"),
  ("lain", "lie"),
  ("lying", "lie"),
  ("lost", "lose"),
  ("made", "make"),
  ("meant", "mean"),
  ("met", "meet"),
  ("paid", "pay"),
  ("rode", "ride"),
  ("ridden", "ride"),
  ("rang", "ring"),
  ("rung", "ring"),
  ("rose", "rise"),
  ("risen", "rise"),
  ("said", "say"),
  ("saw", "see"),
  ("seen", "see"),
  ("sought", "seek"),
  ("sold", "sell"),
  ("sent", "send"),
  ("shook", "shake"),
  ("shaken", "shake"),
  ("shone", "shine"),
  ("shot", "shoot"),
  ("showed", "show"),
  ("shown", "show"),
  ("sang", "sing"),
  ("sung", "sing"),
  ("sank", "sink"),
  ("sunk", "sink"),
  ("sat", "sit"),
  ("slept", "sleep"),
  ("spoke", "speak"),
  ("spoken", "speak"),
  ("spent", "spend"),
  ("stood", "stand"),
  ("stole", "steal"),
  ("stolen", "steal"),
  ("struck", "strike"),
  ("swam", "swim"),
  ("swum", "swim"),
  ("took", "take"),
  ("taken", "take"),
  ("taught", "teach"),
  ("tore", "tear"),
  ("torn", "tear"),
  ("told", "tell"),
  ("thought", "think"),
  ("threw", "throw"),
  ("thrown", "throw"),
  ("understood", "understand"),
  ("woke", "wake"),
  ("woken", "wake"),
  ("wore", "wear"),
  ("worn", "wear"),
  ("won", "win"),
  ("wrote", "write"),
  ("written", "write"),
  ("became", "become"),
  ("become", "become"),
  ("bit", "bite"),
  ("bitten", "bite"),
  ("blew", "blow"),
  ("blown", "blow"),
  ("broke", "break"),
  ("broken", "break"),
  ("bred", "breed"),
  ("fed", "feed"),
  ("fled", "flee"),
  ("forgave", "forgive"),
  ("forgiven", "forgive"),
  ("hung", "hang"),
  ("ground", "grind"),
  ("overtook", "overtake"),
  ("overtaken", "overtake"),
  ("sped", "speed"),
  ("spun", "spin"),
  ("stuck", "stick"),
  ("stung", "sting"),
  ("swore", "swear"),
  ("sworn", "swear"),
  ("swept", "sweep"),
  ("wept", "weep"),
  ("withdrew", "withdraw"),
  ("withdrawn", "withdraw"),
  ("undertook", "undertake"),
  ("undertaken", "undertake"),
  ("dying", "die"),
  ("tying", "tie"),
  ("agreed", "agree"),
  ("disagreed", "disagree"),
  ("freed", "free"),
  ("guaranteed", "guarantee"),
];

fn is_vowel(c: u8) -> bool {
  matches!(c, b'a' | b'e' | b'i' | b'o' | b'u')
}

/// Restores a final `e` or undoes a doubled consonant after an `-ed` or
/// `-ing` suffix was removed.
fn restore_stem(stem: &str) -> String {
  let b = stem.as_bytes();
  let n = b.len();
  if n < 2 {
    return stem.to_string();
  }
  let (p, l) = (b[n - 2], b[n - 1]);
  if p == l && !is_vowel(l) && !matches!(l, b'l' | b's' | b'z' | b'f') {
    return stem[..n - 1].to_string();
  }
  let needs_e = matches!(l, b'v' | b'c' | b'u')
    || (l == b'z' && p != b'z')
    || stem.ends_with("at") && n > 3
    || stem.ends_with("dg")
    || stem.ends_with("rg")
    || (l == b'l' && matches!(p, b'b' | b'p' | b't' | b'd' | b'g' | b'k' | b'z'))
    || (l == b's' && is_vowel(p) && p != b'u')
    || (n <= 3 && n >= 2 && !is_vowel(l) && is_vowel(p) && (n == 2 || !is_vowel(b[0])) && !matches!(l, b'w' | b'x' | b'y'));
  if needs_e {
    format!("{}e", stem)
  } else {
    stem.to_string()
  }
}

/// Reduces a lowercase verb form to its lemma.
///
/// ```
/// use ccg2drs::stem::lemmatize_verb;
/// assert_eq!(lemmatize_verb("believes"), "believe");
/// assert_eq!(lemmatize_verb("was"), "be");
/// ```
pub fn lemmatize_verb(word: &str) -> String {
  if let Some(lemma) = IRREGULAR.get(word) {
    return lemma.to_string();
  }
  let n = word.len();
  if n <= 3 || !word.is_ascii() {
    return word.to_string();
  }
  if let Some(s) = word.strip_suffix("ies") {
    return format!("{}y", s);
  }
  if let Some(s) = word.strip_suffix("ied") {
    return format!("{}y", s);
  }
  for suffix in ["sses", "shes", "ches", "xes", "zzes", "oes"] {
    if word.ends_with(suffix) {
      return word[..n - 2].to_string();
    }
  }
  if word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") && !word.ends_with("is") {
    return word[..n - 1].to_string();
  }
  if word.ends_with("eed") {
    return word.to_string();
  }
  if let Some(s) = word.strip_suffix("ed") {
    if s.len() >= 2 {
      return restore_stem(s);
    }
  }
  if let Some(s) = word.strip_suffix("ing") {
    if s.len() >= 2 && s.bytes().any(is_vowel) {
      return restore_stem(s);
    }
  }
  word.to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_regular() {
    let cases = [
      ("wants", "want"),
      ("wanted", "want"),
      ("believes", "believe"),
      ("believed", "believe"),
      ("believing", "believe"),
      ("walked", "walk"),
      ("stopped", "stop"),
      ("tries", "try"),
      ("tried", "try"),
      ("watches", "watch"),
      ("created", "create"),
      ("liked", "like"),
      ("used", "use"),
      ("joining", "join"),
      ("agreed", "agree"),
      ("succeed", "succeed"),
      ("called", "call"),
      ("settled", "settle"),
      ("judged", "judge"),
      ("realized", "realize"),
    ];
    for (w, l) in cases.iter() {
      assert_eq!(lemmatize_verb(w), *l, "{}", w);
    }
  }

  #[test]
  fn test_irregular() {
    assert_eq!(lemmatize_verb("is"), "be");
    assert_eq!(lemmatize_verb("went"), "go");
    assert_eq!(lemmatize_verb("written"), "write");
    assert_eq!(lemmatize_verb("ran"), "run");
  }

  #[test]
  fn test_short_and_unchanged() {
    assert_eq!(lemmatize_verb("be"), "be");
    assert_eq!(lemmatize_verb("run"), "run");
    assert_eq!(lemmatize_verb("focus"), "focus");
    assert_eq!(lemmatize_verb("sing"), "sing");
  }
}
