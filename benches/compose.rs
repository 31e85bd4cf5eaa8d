use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ccg2drs::{parse_ccg_derivation, process_ccg_pt, ComposeOptions, PTree};

const SIMPLE: &str = r"(<T S[dcl] 0 2> (<T S[dcl] 1 2> (<L NP PRP PRP He NP>) (<T S[dcl]\NP 0 2> (<L (S[dcl]\NP)/(S[adj]\NP) VBZ VBZ is (S[dcl]\NP_1)/(S[adj]_2\NP_1)>) (<L S[adj]\NP JJ JJ tall S[adj]\NP_1>))) (<L . . . . .>))";

const CONTROL: &str = r"(<T S[dcl] 1 2> (<T NP 0 2> (<L NP[nb]/N DT DT The NP[nb]_1/N_1>) (<L N NN NN boy N>)) (<T S[dcl]\NP 0 2> (<L (S[dcl]\NP)/(S[b]\NP) MD MD will (S[dcl]\NP_1)/(S[b]_2\NP_1)_2>) (<T S[b]\NP 0 2> (<L (S[b]\NP)/(S[to]\NP) VB VB want (S[b]\NP_1)/(S[to]_2\NP_1)_2>) (<T S[to]\NP 0 2> (<L (S[to]\NP)/(S[b]\NP) TO TO to (S[to]\NP_1)/(S[b]_2\NP_1)_2>) (<T S[b]\NP 0 2> (<L (S[b]\NP)/NP VB VB believe (S[b]\NP_1)/NP_2>) (<T NP 0 2> (<L NP[nb]/N DT DT the NP[nb]_1/N_1>) (<L N NN NN girl N>)))))))";

fn compose(pt: &PTree) -> usize {
  let options = ComposeOptions::NO_VERBNET | ComposeOptions::NO_WIKI_SEARCH;
  process_ccg_pt(pt, options)
    .map(|ccg| ccg.get_drs(true).conditions.len())
    .unwrap_or(0)
}

fn criterion_benchmark(c: &mut Criterion) {
  let simple = parse_ccg_derivation(SIMPLE).unwrap();
  let control = parse_ccg_derivation(CONTROL).unwrap();

  c.bench_function("parse derivation", |b| {
    b.iter(|| parse_ccg_derivation(black_box(CONTROL)).is_ok())
  });

  c.bench_function("compose copular", |b| b.iter(|| compose(black_box(&simple))));

  c.bench_function("compose control verbs", |b| {
    b.iter(|| compose(black_box(&control)))
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
