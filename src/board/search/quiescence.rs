//! Quiescence search: resolve captures until the position goes quiet.

use crate::board::tt::TTFlag;
use crate::board::types::{EMPTY_MOVE, MAX_PLY};

use super::constants::{INFINITY, MATE, NUM_KILLERS};
use super::picker::{capture_victim, MovePicker, PickerContext};
use super::SearchWorker;

/// Captures whose victim plus this margin still leave the eval under alpha
/// are not worth resolving
const QS_FUTILITY_MARGIN: i32 = 120;

impl SearchWorker {
    pub(crate) fn qsearch<const PV: bool>(&mut self, ply: u16, mut alpha: i32, beta: i32) -> i32 {
        if self.should_stop() {
            return 0;
        }
        self.count_node();
        self.seldepth = self.seldepth.max(ply);

        let in_check = self.board.current().in_check();

        if ply as usize >= MAX_PLY {
            return if in_check { 0 } else { self.evaluate() };
        }

        let key = self.board.current().zobrist_key();
        let tt_entry = self.tt.get(key, ply);
        let tt_move = tt_entry.map_or(EMPTY_MOVE, |e| e.best_move);
        if !PV {
            if let Some(entry) = tt_entry {
                let score = i32::from(entry.score);
                let usable = match entry.flag {
                    TTFlag::Exact => true,
                    TTFlag::LowerBound => score >= beta,
                    TTFlag::UpperBound => score <= alpha,
                };
                if usable {
                    return score;
                }
            }
        }

        // Stand pat: the side to move may simply decline to capture. In
        // check there is no standing pat and every evasion gets searched.
        let static_eval = if in_check { -INFINITY } else { self.evaluate() };
        let mut best_score = static_eval;
        if !in_check {
            if best_score >= beta {
                return best_score;
            }
            alpha = alpha.max(best_score);
        }

        let moves = self.board.current().generate_moves(!in_check);
        if in_check && moves.is_empty() {
            return i32::from(ply) - MATE;
        }

        let context = PickerContext {
            tt_move,
            killers: [EMPTY_MOVE; NUM_KILLERS],
            counter: EMPTY_MOVE,
            prev: [None, None],
            history: &self.history,
        };
        let mut picker = MovePicker::new(self.board.current(), &moves, &context);

        let mut best_move = EMPTY_MOVE;
        while let Some((mv, _)) = picker.next() {
            if !in_check {
                // Losing captures never redeem a quiet position
                if self.board.current().see(mv) < 0 {
                    continue;
                }
                // Nor do captures too small to lift the eval near alpha
                if let Some(victim) = capture_victim(self.board.current(), mv) {
                    if static_eval + victim.value() + QS_FUTILITY_MARGIN < alpha {
                        continue;
                    }
                }
            }

            self.make_move(mv, ply);
            let score = -self.qsearch::<PV>(ply + 1, -beta, -alpha);
            self.unmake_move();

            if self.should_stop() {
                return 0;
            }

            if score > best_score {
                best_score = score;
                if score > alpha {
                    alpha = score;
                    best_move = mv;
                    if score >= beta {
                        break;
                    }
                }
            }
        }

        if !self.should_stop() {
            let flag = if best_score >= beta {
                TTFlag::LowerBound
            } else {
                TTFlag::UpperBound
            };
            self.tt.store(
                key,
                0,
                ply,
                best_score.clamp(-MATE, MATE) as i16,
                flag,
                best_move,
                static_eval.clamp(-INFINITY, INFINITY) as i16,
            );
        }

        best_score
    }
}
