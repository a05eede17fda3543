use cdcl_kernel::Reasoner;
use criterion::{
    black_box,
    criterion_group,
    criterion_main,
    BenchmarkId,
    Criterion,
};

criterion_group!(bench_propagate, construct, decide_undo_cycle);
criterion_main!(bench_propagate);

/// Builds a DIMACS chain `(x1 ∨ x2), (-x1 ∨ x2), (-x2 ∨ x3), (-x3 ∨ x4), ...`
/// of `len` variables, none of which is ever unit at the start level. Used to
/// measure construction and watch registration cost in isolation.
fn chain_dimacs(len: usize) -> Vec<u8> {
    let mut text = format!("p cnf {} {}\n", len, len.saturating_sub(1) + 1);
    text.push_str("1 2 0\n");
    for i in 1..len {
        text.push_str(&format!("-{} {} 0\n", i, i + 1));
    }
    text.into_bytes()
}

fn construct(c: &mut Criterion) {
    let mut group = c.benchmark_group("construct");
    for &len in &[10usize, 100, 1_000] {
        let dimacs = chain_dimacs(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &dimacs, |b, dimacs| {
            b.iter(|| {
                let reasoner = Reasoner::from_dimacs_bytes(black_box(dimacs)).unwrap();
                black_box(reasoner);
            });
        });
    }
    group.finish();
}

/// Repeatedly decides the first variable true, which propagates across the
/// whole chain, then undoes the decision, so each iteration exercises the
/// watch-list propagation and trail-unwind paths the same number of times.
fn decide_undo_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("decide_undo_cycle");
    for &len in &[10usize, 100, 1_000] {
        let dimacs = chain_dimacs(len);
        let reasoner = Reasoner::from_dimacs_bytes(&dimacs).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(len), &reasoner, |b, reasoner| {
            b.iter_batched(
                || reasoner.clone(),
                |mut reasoner| {
                    let x1 = reasoner.index_to_variable(1).unwrap();
                    let literal = reasoner.pos_literal(x1);
                    black_box(reasoner.decide_literal(literal));
                    reasoner.undo_decide_literal();
                    black_box(reasoner);
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}
