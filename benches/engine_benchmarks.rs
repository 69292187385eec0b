//! Benchmarks for move generation, perft, evaluation and search.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use vigil::board::nnue::{AccumulatorStack, Network};
use vigil::board::{Chessboard, Limits, SearchManager, SearchSettings};

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn network() -> Arc<Network> {
    #[cfg(feature = "embedded_nnue")]
    {
        Arc::new(Network::embedded())
    }
    #[cfg(not(feature = "embedded_nnue"))]
    {
        use vigil::board::nnue::NETWORK_FILE_BYTES;
        Arc::new(Network::from_bytes(&vec![0u8; NETWORK_FILE_BYTES]).unwrap())
    }
}

fn bench_perft(c: &mut Criterion) {
    let mut group = c.benchmark_group("perft");

    let mut startpos = Chessboard::new();
    for depth in 1..=4 {
        group.bench_with_input(BenchmarkId::new("startpos", depth), &depth, |b, &depth| {
            b.iter(|| startpos.perft(black_box(depth)));
        });
    }

    let mut kiwipete = Chessboard::from_fen(KIWIPETE).unwrap();
    for depth in 1..=3 {
        group.bench_with_input(BenchmarkId::new("kiwipete", depth), &depth, |b, &depth| {
            b.iter(|| kiwipete.perft(black_box(depth)));
        });
    }

    group.finish();
}

fn bench_movegen(c: &mut Criterion) {
    let mut group = c.benchmark_group("movegen");

    let startpos = Chessboard::new();
    group.bench_function("startpos", |b| {
        b.iter(|| black_box(startpos.generate_moves()));
    });

    let kiwipete = Chessboard::from_fen(KIWIPETE).unwrap();
    group.bench_function("kiwipete", |b| {
        b.iter(|| black_box(kiwipete.generate_moves()));
    });

    group.finish();
}

fn bench_evaluation(c: &mut Criterion) {
    let network = network();
    let board = Chessboard::from_fen(KIWIPETE).unwrap();

    c.bench_function("nnue_refresh_and_eval", |b| {
        b.iter(|| {
            let mut stack = AccumulatorStack::new(&network, board.current());
            black_box(stack.evaluate(&network, &board))
        });
    });
}

fn bench_search(c: &mut Criterion) {
    let network = network();

    c.bench_function("search_startpos_depth_6", |b| {
        b.iter(|| {
            let board = Chessboard::new();
            let mut manager = SearchManager::new(Arc::clone(&network), 16);
            black_box(manager.search(
                &board,
                &Limits::depth(6),
                &SearchSettings::default(),
                None,
            ))
        });
    });
}

criterion_group!(
    benches,
    bench_perft,
    bench_movegen,
    bench_evaluation,
    bench_search
);
criterion_main!(benches);
