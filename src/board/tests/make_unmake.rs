//! Make/unmake tests: stack restoration, incremental Zobrist keys, masks.

use crate::board::types::Piece;
use crate::board::Chessboard;

fn assert_restores(fen: &str, notation: &str) {
    let mut board = Chessboard::from_fen(fen).unwrap();
    let before_fen = board.to_fen();
    let before_key = board.current().zobrist_key();
    let mv = board.parse_move(notation).unwrap();
    board.do_move(mv);
    assert_ne!(board.current().zobrist_key(), before_key);
    board.undo_move();
    assert_eq!(board.to_fen(), before_fen);
    assert_eq!(board.current().zobrist_key(), before_key);
}

#[test]
fn test_quiet_move_restores() {
    assert_restores(
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "g1f3",
    );
}

#[test]
fn test_capture_restores() {
    assert_restores(
        "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2",
        "e4d5",
    );
}

#[test]
fn test_en_passant_restores() {
    assert_restores(
        "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
        "e5f6",
    );
}

#[test]
fn test_promotion_restores() {
    assert_restores("8/P7/8/8/8/8/8/K1k5 w - - 0 1", "a7a8q");
    assert_restores("8/P7/8/8/8/8/8/K1k5 w - - 0 1", "a7a8n");
}

#[test]
fn test_castling_restores() {
    let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
    assert_restores(fen, "e1g1");
    assert_restores(fen, "e1c1");
}

#[test]
fn test_en_passant_make() {
    let mut board =
        Chessboard::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
            .unwrap();
    let mv = board.parse_move("e5f6").unwrap();
    board.do_move(mv);
    assert_eq!(
        board.to_fen(),
        "rnbqkbnr/ppp1p1pp/5P2/3p4/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 3"
    );
}

#[test]
fn test_castling_make() {
    let mut board =
        Chessboard::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
    let mv = board.parse_move("e1g1").unwrap();
    board.do_move(mv);
    assert_eq!(board.to_fen(), "r3k2r/8/8/8/8/8/8/R4RK1 b kq - 1 1");
}

#[test]
fn test_castling_rights_revoked_by_rook_capture() {
    let mut board =
        Chessboard::from_fen("r3k2r/8/8/8/8/8/6B1/R3K2R w KQkq - 0 1").unwrap();
    // The g2 bishop takes the a8 rook; black loses queen-side castling
    let mv = board.parse_move("g2a8").unwrap();
    board.do_move(mv);
    assert!(!board
        .current()
        .castling
        .has(crate::board::Color::Black, false));
    assert!(board
        .current()
        .castling
        .has(crate::board::Color::Black, true));
    board.undo_move();
    assert!(board
        .current()
        .castling
        .has(crate::board::Color::Black, false));
}

#[test]
fn test_null_move_restores_hash_and_ep() {
    let mut board =
        Chessboard::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
            .unwrap();
    let original_key = board.current().zobrist_key();
    let original_fen = board.to_fen();

    board.make_null_move();
    assert!(board.current().en_passant_target().is_none());
    assert_ne!(board.current().zobrist_key(), original_key);
    assert!(board.current().from_null);
    assert!(!board.can_null_move());

    board.undo_move();
    assert_eq!(board.current().zobrist_key(), original_key);
    assert_eq!(board.to_fen(), original_fen);
}

#[test]
fn test_null_move_forbidden_in_check() {
    let board = Chessboard::from_fen("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1").unwrap();
    assert!(board.current().in_check());
    assert!(!board.can_null_move());
}

#[test]
fn test_incremental_zobrist_matches_recomputation() {
    let mut board = Chessboard::new();
    for notation in [
        "e2e4", "c7c5", "g1f3", "d7d6", "d2d4", "c5d4", "f3d4", "g8f6", "b1c3", "a7a6",
        "c1g5", "e7e6", "f2f4", "f8e7", "d1f3", "d8c7", "e1c1", "b8d7",
    ] {
        let mv = board.parse_move(notation).unwrap();
        board.do_move(mv);
        let pos = board.current();
        assert_eq!(
            pos.zobrist_key(),
            pos.compute_zobrist(),
            "incremental key diverged after {notation}"
        );
    }
}

#[test]
fn test_checkers_mask_after_make() {
    let mut board = Chessboard::new();
    for notation in ["e2e4", "e7e5", "d1h5", "b8c6", "f1c4", "g8f6"] {
        let mv = board.parse_move(notation).unwrap();
        board.do_move(mv);
    }
    // Scholar's mate: Qxf7#
    let mv = board.parse_move("h5f7").unwrap();
    board.do_move(mv);
    let pos = board.current();
    assert!(pos.in_check());
    let king = pos.king_square(pos.side_to_move());
    assert_eq!(
        pos.checkers,
        pos.attackers_to(king, pos.occupancy(), pos.side_to_move().opponent())
    );
    assert!(board.generate_moves().is_empty());
}

#[test]
fn test_make_move_rejects_illegal() {
    let mut board = Chessboard::new();
    let fen = board.to_fen();
    // A move never generated for this position
    let illegal = crate::board::Move::quiet(
        "e2".parse().unwrap(),
        "e5".parse().unwrap(),
    );
    assert!(!board.make_move(illegal));
    assert_eq!(board.to_fen(), fen);
}

#[test]
fn test_fifty_move_counter() {
    let mut board = Chessboard::new();
    let mv = board.parse_move("g1f3").unwrap();
    board.do_move(mv);
    assert_eq!(board.current().halfmove_clock(), 1);
    let mv = board.parse_move("e7e5").unwrap();
    board.do_move(mv);
    assert_eq!(board.current().halfmove_clock(), 0);
}

#[test]
fn test_fullmove_number_increments_after_black() {
    let mut board = Chessboard::new();
    board.do_move(board.parse_move("e2e4").unwrap());
    assert!(board.to_fen().ends_with("0 1"));
    board.do_move(board.parse_move("e7e5").unwrap());
    assert!(board.to_fen().ends_with("0 2"));
}

#[test]
fn test_promotion_piece_placed() {
    let mut board = Chessboard::from_fen("8/P7/8/8/8/8/8/K1k5 w - - 0 1").unwrap();
    board.do_move(board.parse_move("a7a8r").unwrap());
    let (color, piece) = board
        .current()
        .piece_at("a8".parse().unwrap())
        .expect("promoted piece present");
    assert_eq!(color, crate::board::Color::White);
    assert_eq!(piece, Piece::Rook);
}
