//! NNUE accumulator tests: incremental updates must match full refreshes.

#![cfg(feature = "embedded_nnue")]

use crate::board::nnue::{AccumulatorStack, Network};
use crate::board::Chessboard;

/// Play a move sequence, evaluating after every move through the
/// incrementally-updated stack and through a from-scratch rebuild. The two
/// must agree exactly.
fn assert_incremental_matches_refresh(fen: &str, moves: &[&str]) {
    let network = Network::embedded();
    let mut board = Chessboard::from_fen(fen).unwrap();
    let mut stack = AccumulatorStack::new(&network, board.current());

    for notation in moves {
        let before = *board.current();
        let mv = board.parse_move(notation).unwrap();
        board.do_move(mv);
        stack.push(&before, board.current(), mv);

        let incremental = stack.evaluate(&network, &board);
        let mut fresh = AccumulatorStack::new(&network, board.current());
        let fresh_board = Chessboard::from_position(*board.current());
        let refreshed = fresh.evaluate(&network, &fresh_board);
        assert_eq!(
            incremental, refreshed,
            "accumulator diverged after {notation} in {fen}"
        );
    }
}

#[test]
fn test_incremental_quiet_and_captures() {
    assert_incremental_matches_refresh(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        &["e2e4", "d7d5", "e4d5", "d8d5", "b1c3", "d5a5", "d2d4", "g8f6"],
    );
}

#[test]
fn test_incremental_castling_both_wings() {
    assert_incremental_matches_refresh(
        "r3k2r/pppqppbp/2np1np1/8/3P1B2/2N2NP1/PPPQPPBP/R3K2R w KQkq - 0 1",
        &["e1g1", "e8c8"],
    );
}

#[test]
fn test_incremental_en_passant() {
    assert_incremental_matches_refresh(
        "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
        &["e5f6"],
    );
}

#[test]
fn test_incremental_promotion() {
    assert_incremental_matches_refresh("n3k3/1P6/8/8/8/8/6K1/8 w - - 0 1", &["b7a8q"]);
    assert_incremental_matches_refresh("n3k3/1P6/8/8/8/8/6K1/8 w - - 0 1", &["b7b8n"]);
}

#[test]
fn test_king_move_across_mirror_boundary() {
    // e1 to d1 crosses the horizontal mirror line: a full refresh of the
    // white perspective is required and must land on the same values
    assert_incremental_matches_refresh(
        "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1",
        &["e1d1", "e8d8", "d1e1", "d8e8"],
    );
}

#[test]
fn test_king_walk_changes_bucket() {
    // King marches up the board through several input buckets
    assert_incremental_matches_refresh(
        "4k3/8/8/8/8/8/8/4K3 w - - 0 1",
        &["e1e2", "e8e7", "e2e3", "e7e6", "e3d4", "e6f5"],
    );
}

#[test]
fn test_lazy_updates_apply_in_order() {
    // Push several moves without evaluating in between: the chain of
    // pending updates must resolve in one go
    let network = Network::embedded();
    let mut board = Chessboard::new();
    let mut stack = AccumulatorStack::new(&network, board.current());

    for notation in ["e2e4", "e7e5", "g1f3", "b8c6", "f1b5", "g8f6"] {
        let before = *board.current();
        let mv = board.parse_move(notation).unwrap();
        board.do_move(mv);
        stack.push(&before, board.current(), mv);
    }

    let incremental = stack.evaluate(&network, &board);
    let fresh_board = Chessboard::from_position(*board.current());
    let mut fresh = AccumulatorStack::new(&network, board.current());
    assert_eq!(incremental, fresh.evaluate(&network, &fresh_board));
}

#[test]
fn test_pop_restores_previous_evaluation() {
    let network = Network::embedded();
    let mut board = Chessboard::new();
    let mut stack = AccumulatorStack::new(&network, board.current());
    let root_eval = stack.evaluate(&network, &board);

    let before = *board.current();
    let mv = board.parse_move("e2e4").unwrap();
    board.do_move(mv);
    stack.push(&before, board.current(), mv);
    let _ = stack.evaluate(&network, &board);

    board.undo_move();
    stack.pop();
    assert_eq!(stack.evaluate(&network, &board), root_eval);
}
