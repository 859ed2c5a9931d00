use criterion::{criterion_group, criterion_main, Criterion};
use minimax_2048::engine::{self as GameEngine, Board, Move};
use minimax_2048::evaluation::{self, Evaluator, Tolerance};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;

fn corpus() -> Vec<Board> {
    let mut rng = StdRng::seed_from_u64(1337);
    let mut boards = Vec::new();
    let mut b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    boards.push(b);
    let seq = [Move::Left, Move::Down, Move::Right, Move::Down];
    for i in 0..48 {
        let nb = b.shift(seq[i % seq.len()]);
        if nb != b { b = nb.with_random_tile(&mut rng); }
        boards.push(b);
    }
    boards
}

fn bench_evaluate(c: &mut Criterion) {
    GameEngine::warm();
    let boards = corpus();
    let ev = Evaluator::new();

    c.bench_function("evaluation/evaluate", |bch| {
        bch.iter(|| {
            let mut acc = 0i64;
            for &bd in &boards { acc = acc.wrapping_add(ev.evaluate(bd, true)); }
            black_box(acc)
        })
    });

    c.bench_function("evaluation/select_pattern", |bch| {
        bch.iter(|| {
            let mut acc = 0usize;
            for &bd in &boards { acc += evaluation::select_pattern(bd, Tolerance::Lenient); }
            black_box(acc)
        })
    });

    c.bench_function("evaluation/merge_score", |bch| {
        bch.iter(|| {
            let mut acc = 0i64;
            for &bd in &boards { acc += evaluation::merge_score(bd); }
            black_box(acc)
        })
    });
}

criterion_group!(evaluation_benches, bench_evaluate);
criterion_main!(evaluation_benches);
