use std::env;
use std::fs;
use std::io;
use std::io::{BufRead, Write};
use std::process;

use ccg2drs::{parse_ccg_derivation, process_ccg_pt, sentence_from_pt, ComposeOptions, Err};
use tracing_subscriber::EnvFilter;

fn usage(prog_name: &str) -> String {
  format!(
    r"Usage: {} [options] [FILE]

Reads CCG derivations separated by blank lines from FILE, or from a prompt
when no file is given, and prints the DRS, constituents and dependency tree
of each.

Options:
  -h, --help          Print this message
  -o, --options LIST  Comma separated compose options, e.g. no-verbnet,numbered-roles

Set RUST_LOG to see more than warnings.",
    prog_name
  )
}

fn compose(derivation: &str, options: ComposeOptions) -> Result<(), Err> {
  let pt = parse_ccg_derivation(derivation)?;
  let ccg = process_ccg_pt(&pt, options)?;
  let sentence = ccg.to_sentence();

  println!("{}", sentence_from_pt(&pt));
  println!("{}", sentence.drs);
  for c in sentence.constituents.iter() {
    println!("  {}", c.show(&sentence.lexemes));
  }
  print!("{}", sentence.dependency_tree_string(&sentence.get_dependency_tree()));
  println!();
  Ok(())
}

/// Prints the error and carries on with the next derivation.
fn compose_block(block: &str, options: ComposeOptions) {
  let block = block.trim();
  if block.is_empty() {
    return;
  }
  if let Err(e) = compose(block, options) {
    eprintln!("error: {}", e);
  }
}

struct Args {
  filename: Option<String>,
  options: ComposeOptions,
}

impl Args {
  fn make_error_message(msg: &str, prog_name: impl AsRef<str>) -> String {
    format!("argument error: {}.\n\n{}", msg, usage(prog_name.as_ref()))
  }

  fn parse(v: Vec<String>) -> Result<Self, String> {
    let mut iter = v.into_iter();
    let prog_name = iter.next().unwrap_or_else(|| "ccg2drs-cli".to_string());

    let mut filename: Option<String> = None;
    let mut options = ComposeOptions::NONE;

    while let Some(o) = iter.next() {
      if o == "-h" || o == "--help" {
        println!("{}", usage(&prog_name));
        process::exit(0);
      } else if o == "-o" || o == "--options" {
        let Some(list) = iter.next() else {
          return Err(Self::make_error_message("missing option list", prog_name));
        };
        options |= list
          .parse::<ComposeOptions>()
          .map_err(|e| Self::make_error_message(&e, &prog_name))?;
      } else if filename.is_none() {
        filename = Some(o);
      } else {
        return Err(Self::make_error_message("invalid arguments", prog_name));
      }
    }

    Ok(Self { filename, options })
  }
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(io::stderr)
    .init();

  let opts = match Args::parse(env::args().collect()) {
    Ok(opts) => opts,
    Err(msg) => {
      eprintln!("{}", msg);
      process::exit(255);
    }
  };

  if let Some(filename) = opts.filename {
    let text = fs::read_to_string(&filename)?;
    for block in text.split("\n\n") {
      compose_block(block, opts.options);
    }
    return Ok(());
  }

  // a blank line ends a derivation
  let stdin = io::stdin();
  let mut block = String::new();
  loop {
    print!("{}", if block.is_empty() { "> " } else { ". " });
    io::stdout().flush()?;

    let mut line = String::new();
    if stdin.lock().read_line(&mut line)? == 0 {
      // ctrl+d
      compose_block(&block, opts.options);
      return Ok(());
    }
    if line.trim().is_empty() {
      compose_block(&block, opts.options);
      block.clear();
    } else {
      block.push_str(&line);
    }
  }
}
