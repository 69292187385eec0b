//! Move ordering.
//!
//! Moves are scored once, then handed out best-first by incremental
//! selection (one swap per pick), so moves cut off early are never sorted.

use crate::board::types::{Move, MoveList, Piece, ScoredMoveList, EMPTY_MOVE};
use crate::board::Position;

use super::constants::{
    BAD_TACTICAL_SCORE, COUNTER_SCORE, GOOD_TACTICAL_SCORE, KILLER_SCORE, NUM_KILLERS,
    QUIET_SCORE, TT_MOVE_SCORE,
};
use super::history::{HistoryTables, MoveContext};

/// Ordering context for one node
pub(crate) struct PickerContext<'a> {
    pub tt_move: Move,
    pub killers: [Move; NUM_KILLERS],
    pub counter: Move,
    /// Continuation contexts: one and two plies back
    pub prev: [Option<MoveContext>; 2],
    pub history: &'a HistoryTables,
}

pub(crate) struct MovePicker {
    scored: ScoredMoveList,
    index: usize,
}

impl MovePicker {
    pub(crate) fn new(pos: &Position, moves: &MoveList, ctx: &PickerContext) -> Self {
        let mut scored = ScoredMoveList::new();
        for &mv in moves {
            scored.push(mv, score_move(pos, mv, ctx));
        }
        MovePicker { scored, index: 0 }
    }

    /// Hand out the next-best move and its ordering score
    pub(crate) fn next(&mut self) -> Option<(Move, i32)> {
        let picked = self.scored.pick_best(self.index)?;
        self.index += 1;
        Some((picked.mv, picked.score))
    }
}

fn score_move(pos: &Position, mv: Move, ctx: &PickerContext) -> i32 {
    let stm = pos.side_to_move();

    if mv == ctx.tt_move {
        return TT_MOVE_SCORE;
    }

    if mv.is_tactical() {
        let victim = capture_victim(pos, mv).unwrap_or(Piece::Pawn);
        let see = pos.see(mv);
        let capture_hist = ctx.history.capture_score(stm, mv, victim);
        return if see >= 0 {
            GOOD_TACTICAL_SCORE + see + capture_hist
        } else {
            BAD_TACTICAL_SCORE + see + victim.value() + capture_hist
        };
    }

    if pos.ply_from_root > 0 {
        if ctx.killers.contains(&mv) {
            return KILLER_SCORE;
        }
        if mv == ctx.counter && mv != EMPTY_MOVE {
            return COUNTER_SCORE;
        }
    }

    let mut score = QUIET_SCORE + ctx.history.quiet_score(stm, mv, pos.threats);
    if let Some((_, piece)) = pos.piece_at(mv.from()) {
        for prev in ctx.prev.iter().flatten() {
            score += ctx
                .history
                .continuation_score(stm, piece, mv.to().index(), *prev);
        }
    }
    score
}

/// The piece a tactical move wins (if any); promotions without capture have
/// no victim
pub(crate) fn capture_victim(pos: &Position, mv: Move) -> Option<Piece> {
    if mv.is_en_passant() {
        Some(Piece::Pawn)
    } else if mv.is_capture() {
        pos.piece_at(mv.to()).map(|(_, p)| p)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Chessboard;

    fn ctx(history: &HistoryTables) -> PickerContext<'_> {
        PickerContext {
            tt_move: EMPTY_MOVE,
            killers: [EMPTY_MOVE; NUM_KILLERS],
            counter: EMPTY_MOVE,
            prev: [None, None],
            history,
        }
    }

    #[test]
    fn test_tt_move_first() {
        let board = Chessboard::new();
        let moves = board.generate_moves();
        let history = HistoryTables::new();
        let mut context = ctx(&history);
        context.tt_move = moves[7];
        let mut picker = MovePicker::new(board.current(), &moves, &context);
        let (first, score) = picker.next().unwrap();
        assert_eq!(first, moves[7]);
        assert_eq!(score, TT_MOVE_SCORE);
    }

    #[test]
    fn test_winning_capture_before_quiet() {
        // White queen takes an undefended pawn
        let board =
            Chessboard::from_fen("4k3/8/3p4/8/8/8/8/3QK3 w - - 0 1").unwrap();
        let moves = board.generate_moves();
        let history = HistoryTables::new();
        let context = ctx(&history);
        let mut picker = MovePicker::new(board.current(), &moves, &context);
        let (first, score) = picker.next().unwrap();
        assert!(first.is_capture());
        assert!(score >= GOOD_TACTICAL_SCORE);
    }

    #[test]
    fn test_losing_capture_after_quiets() {
        // Queen takes a defended pawn: SEE loses the queen for a pawn
        let board =
            Chessboard::from_fen("4k3/2p5/3p4/8/8/8/8/3QK3 w - - 0 1").unwrap();
        let moves = board.generate_moves();
        let history = HistoryTables::new();
        let context = ctx(&history);
        let capture = moves
            .iter()
            .find(|m| m.is_capture())
            .copied()
            .expect("queen can take the pawn");
        let score = score_move(board.current(), capture, &context);
        assert!(score < QUIET_SCORE);
    }

    #[test]
    fn test_picker_yields_every_move_once() {
        let board = Chessboard::new();
        let moves = board.generate_moves();
        let history = HistoryTables::new();
        let context = ctx(&history);
        let mut picker = MovePicker::new(board.current(), &moves, &context);
        let mut seen = Vec::new();
        while let Some((mv, _)) = picker.next() {
            assert!(!seen.contains(&mv));
            seen.push(mv);
        }
        assert_eq!(seen.len(), moves.len());
    }
}
