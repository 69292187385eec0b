//! Static exchange evaluation on hand-verified exchanges.

use crate::board::Chessboard;

fn see_of(fen: &str, notation: &str) -> i32 {
    let board = Chessboard::from_fen(fen).unwrap();
    let mv = board.parse_move(notation).unwrap();
    board.current().see(mv)
}

#[test]
fn test_undefended_pawn_capture() {
    assert_eq!(see_of("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1", "e4d5"), 100);
}

#[test]
fn test_defended_pawn_capture_is_balanced() {
    assert_eq!(see_of("4k3/8/2p5/3p4/4P3/8/8/4K3 w - - 0 1", "e4d5"), 0);
}

#[test]
fn test_queen_takes_defended_pawn() {
    assert_eq!(
        see_of("4k3/8/2p5/3p4/8/8/3Q4/4K3 w - - 0 1", "d2d5"),
        -800
    );
}

#[test]
fn test_rook_takes_knight_defended_by_pawn() {
    assert_eq!(
        see_of("4k3/8/4p3/3n4/8/8/8/3RK3 w - - 0 1", "d1d5"),
        -180
    );
}

#[test]
fn test_battery_exchange_counts_xray() {
    // RxN exd5 Rxd5: rook for knight and pawn
    assert_eq!(
        see_of("4k3/8/4p3/3n4/8/8/3R4/3RK3 w - - 0 1", "d2d5"),
        -80
    );
}

#[test]
fn test_king_cannot_recapture_defended_square() {
    // The f6 king is the only recapturer, but the e1 rook guards e5
    assert_eq!(
        see_of("8/8/5k2/4p3/3P4/8/8/4RK2 w - - 0 1", "d4e5"),
        100
    );
}

#[test]
fn test_king_recaptures_when_safe() {
    assert_eq!(
        see_of("8/8/5k2/4p3/3P4/8/8/5K2 w - - 0 1", "d4e5"),
        0
    );
}

#[test]
fn test_promotion_capture_undefended() {
    // Rook won plus the promotion gain, minus the pawn given up
    assert_eq!(
        see_of("n3k3/1P6/8/8/8/8/8/4K3 w - - 0 1", "b7a8q"),
        1120
    );
}

#[test]
fn test_promotion_capture_defended_no_double_count() {
    // bxa8=Q Nxa8: piece won + promotion gain - queen lost
    assert_eq!(
        see_of("n3k3/1P6/1n6/8/8/8/8/4K3 w - - 0 1", "b7a8q"),
        220
    );
}

#[test]
fn test_quiet_move_to_attacked_square() {
    assert_eq!(
        see_of("4k3/8/3p4/8/4N3/8/8/4K3 w - - 0 1", "e4c5"),
        -320
    );
}

#[test]
fn test_quiet_move_to_safe_square() {
    assert_eq!(see_of("4k3/8/3p4/8/4N3/8/8/4K3 w - - 0 1", "e4g5"), 0);
}

#[test]
fn test_queen_trade_is_balanced() {
    assert_eq!(see_of("3qk3/8/8/8/8/8/8/3QK3 w - - 0 1", "d1d8"), 0);
}

#[test]
fn test_knight_takes_pawn_defended_by_knight() {
    assert_eq!(
        see_of("4k3/8/5n2/3p4/8/4N3/8/4K3 w - - 0 1", "e3d5"),
        -220
    );
}

#[test]
fn test_en_passant_victim_is_a_pawn() {
    let see = see_of(
        "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
        "e5f6",
    );
    // Wins the f5 pawn; the g7 pawn recaptures the capturer
    assert_eq!(see, 0);
}
