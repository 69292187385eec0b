//! The main alpha-beta search.

use crate::board::tt::TTFlag;
use crate::board::types::{Move, EMPTY_MOVE, MAX_PLY};

use super::constants::{
    is_mate_score, INFINITY, MATE, MATE_BOUND, MAX_DEPTH, QUIET_SCORE,
};
use super::picker::{capture_victim, MovePicker, PickerContext};
use super::{ply_index, SearchWorker, LMR_TABLE};

/// Moves remembered for the history malus on a beta cutoff
const MAX_TRIED: usize = 64;

impl SearchWorker {
    /// Principal variation search with negamax bounds: returns a score in
    /// `[alpha, beta]` semantics, updates the PV table rows at and below
    /// `ply`, and writes the transposition table on the way out.
    #[allow(clippy::too_many_lines)]
    pub(crate) fn search<const PV: bool>(
        &mut self,
        mut depth: i32,
        ply: u16,
        mut alpha: i32,
        beta: i32,
        cut_node: bool,
        excluded: Move,
    ) -> i32 {
        let root = ply == 0;
        let excluding = excluded != EMPTY_MOVE;

        // Cancellation unwinds without a meaningful score; the first root
        // iteration always runs to completion so a best move exists
        if self.should_stop() && (depth > 1 || !root) {
            return 0;
        }
        if ply as usize >= MAX_PLY {
            return self.evaluate();
        }
        depth = depth.min(MAX_DEPTH);

        self.pv.clear(ply as usize);
        self.history.clear_killers(ply_index(ply + 1));
        self.seldepth = self.seldepth.max(ply);

        if !root && self.board.is_drawn(ply) {
            return 0;
        }

        let in_check = self.board.current().in_check();
        if in_check {
            depth = (depth + 1).max(1);
        }
        if depth <= 0 {
            return self.qsearch::<PV>(ply, alpha, beta);
        }
        self.count_node();

        let tt_entry = self.tt.get(self.board.current().zobrist_key(), ply);
        let tt_move = tt_entry.map_or(EMPTY_MOVE, |e| e.best_move);
        let tt_score = tt_entry.map_or(0, |e| i32::from(e.score));
        let tt_depth = tt_entry.map_or(0, |e| i32::from(e.depth));

        if !PV && !excluding {
            if let Some(entry) = tt_entry {
                let usable = match entry.flag {
                    TTFlag::Exact => true,
                    TTFlag::LowerBound => tt_score >= beta,
                    TTFlag::UpperBound => tt_score <= alpha,
                };
                if tt_depth >= depth && usable {
                    return tt_score;
                }
            }
        }

        let static_eval = if in_check {
            -INFINITY
        } else if let Some(entry) = tt_entry {
            i32::from(entry.static_eval)
        } else {
            self.evaluate()
        };
        self.stack[ply as usize].static_eval = static_eval;
        let improving =
            !in_check && ply >= 2 && static_eval > self.stack[(ply - 2) as usize].static_eval;

        // Internal iterative reduction: with no hash move to order by, a
        // shallower search that seeds the table beats a blind deep one
        if depth >= self.params.iir_min_depth && tt_move == EMPTY_MOVE && !excluding {
            depth -= 1;
        }

        if !PV && !in_check && !excluding {
            // Reverse futility: eval so far above beta that a shallow
            // search will not bring it back down
            if depth <= self.params.rfp_max_depth
                && static_eval - self.params.rfp_margin * depth >= beta
            {
                return (static_eval + beta) / 2;
            }

            // Null move pruning: hand over the turn; a reduced search still
            // failing high means the position is too good to need proof
            if depth > self.params.nmp_min_depth
                && self.board.can_null_move()
                && static_eval >= beta
                && self
                    .board
                    .current()
                    .has_non_pawn_material(self.board.current().side_to_move())
            {
                let reduction =
                    self.params.nmp_base_reduction + depth / self.params.nmp_depth_divisor;
                self.make_null_move(ply);
                let score = -self.search::<false>(
                    depth - reduction,
                    ply + 1,
                    -beta,
                    -beta + 1,
                    !cut_node,
                    EMPTY_MOVE,
                );
                self.unmake_null_move();
                if self.should_stop() {
                    return 0;
                }
                if score >= beta {
                    // Never return an unproven mate from a null search
                    return if is_mate_score(score) { beta } else { score };
                }
            }
        }

        let moves = self.board.current().generate_moves(false);
        if moves.is_empty() {
            return if in_check { i32::from(ply) - MATE } else { 0 };
        }

        let prev_move = if ply > 0 {
            self.stack[(ply - 1) as usize].move_played
        } else {
            EMPTY_MOVE
        };
        let context = PickerContext {
            tt_move,
            killers: self.history.killers(ply_index(ply)),
            counter: if prev_move != EMPTY_MOVE {
                self.history.counter(prev_move)
            } else {
                EMPTY_MOVE
            },
            prev: [self.prior_context(ply, 1), self.prior_context(ply, 2)],
            history: &self.history,
        };
        let mut picker = MovePicker::new(self.board.current(), &moves, &context);

        let mut best_score = -INFINITY;
        let mut best_move = EMPTY_MOVE;
        let mut raised_alpha = false;
        let mut moves_made = 0usize;
        let mut skip_quiets = false;
        let mut quiets_tried = [EMPTY_MOVE; MAX_TRIED];
        let mut num_quiets = 0usize;
        let mut captures_tried = [EMPTY_MOVE; MAX_TRIED];
        let mut num_captures = 0usize;
        let lmp_threshold =
            (self.params.lmp_base + (depth * depth) as usize) / (2 - usize::from(improving));

        while let Some((mv, move_score)) = picker.next() {
            if mv == excluded {
                continue;
            }
            if root && !self.root_moves.is_empty() && !self.root_moves.contains(&mv) {
                continue;
            }
            let is_quiet = mv.is_quiet();
            if skip_quiets && is_quiet {
                continue;
            }

            // Forward pruning never runs before a real score is on the
            // board, so a forced line cannot be pruned into a false mate
            if !root && best_score > -MATE_BOUND {
                if !PV
                    && is_quiet
                    && !in_check
                    && depth <= self.params.fp_max_depth
                    && static_eval
                        + self.params.fp_offset
                        + self.params.fp_margin * (depth + i32::from(improving))
                        <= alpha
                {
                    skip_quiets = true;
                    continue;
                }

                if is_quiet && moves_made >= lmp_threshold {
                    skip_quiets = true;
                    continue;
                }

                if depth <= self.params.see_pruning_max_depth {
                    let margin = if is_quiet {
                        self.params.see_quiet_margin
                    } else {
                        self.params.see_tactical_margin
                    } * depth;
                    if self.board.current().see(mv) < margin {
                        continue;
                    }
                }
            }

            // Singular extension: if every alternative falls well short of
            // the hash move's score, the hash move is forced and deserves
            // more depth; if it fails high anyway while the TT already
            // expected beta, give it less
            let mut extension = 0;
            if mv == tt_move
                && !root
                && !excluding
                && depth >= self.params.singular_min_depth
                && tt_depth >= depth - 3
                && tt_entry.is_some_and(|e| e.flag != TTFlag::UpperBound)
                && !is_mate_score(tt_score)
            {
                let singular_beta =
                    (tt_score - self.params.singular_margin * depth).max(-MATE);
                let singular_depth = (depth - self.params.singular_depth_offset) / 2;
                let score = self.search::<false>(
                    singular_depth,
                    ply,
                    singular_beta - 1,
                    singular_beta,
                    cut_node,
                    mv,
                );
                if score < singular_beta {
                    extension = 1;
                    if !PV && score < singular_beta - self.params.singular_double_margin {
                        extension = 2;
                    }
                } else if tt_score >= beta {
                    extension = -1;
                }
            }

            let nodes_before = self.nodes;
            self.make_move(mv, ply);
            moves_made += 1;
            let gives_check = self.board.current().in_check();
            let new_depth = depth - 1 + extension;

            let mut score;
            if moves_made == 1 {
                score =
                    -self.search::<PV>(new_depth, ply + 1, -beta, -alpha, false, EMPTY_MOVE);
            } else {
                let mut reduction = 0;
                if depth >= 3 && is_quiet && moves_made > 2 + usize::from(PV) {
                    let d = (depth as usize).min(63);
                    let m = moves_made.min(63);
                    reduction = LMR_TABLE[d][m]
                        - i32::from(PV)
                        + 2 * i32::from(cut_node)
                        - i32::from(gives_check)
                        - (move_score - QUIET_SCORE) / self.params.lmr_history_divisor;
                    reduction = reduction.clamp(0, (new_depth - 1).max(0));
                }

                score = -self.search::<false>(
                    new_depth - reduction,
                    ply + 1,
                    -alpha - 1,
                    -alpha,
                    true,
                    EMPTY_MOVE,
                );
                if reduction > 0 && score > alpha {
                    score = -self.search::<false>(
                        new_depth,
                        ply + 1,
                        -alpha - 1,
                        -alpha,
                        !cut_node,
                        EMPTY_MOVE,
                    );
                }
                if PV && score > alpha && score < beta {
                    score = -self.search::<PV>(
                        new_depth,
                        ply + 1,
                        -beta,
                        -alpha,
                        false,
                        EMPTY_MOVE,
                    );
                }
            }

            self.unmake_move();
            if root {
                self.root_nodes[mv.from().index()][mv.to().index()] +=
                    self.nodes - nodes_before;
            }

            if self.should_stop() && (depth > 1 || !root) {
                return best_score.max(-INFINITY + 1);
            }

            if score > best_score {
                best_score = score;
                if score > alpha {
                    best_move = mv;
                    alpha = score;
                    raised_alpha = true;
                    if PV {
                        self.pv.update(ply as usize, mv);
                    }
                    if score >= beta {
                        self.update_heuristics(
                            mv,
                            depth,
                            ply,
                            &quiets_tried[..num_quiets],
                            &captures_tried[..num_captures],
                        );
                        break;
                    }
                }
            }

            if is_quiet {
                if num_quiets < MAX_TRIED {
                    quiets_tried[num_quiets] = mv;
                    num_quiets += 1;
                }
            } else if num_captures < MAX_TRIED {
                captures_tried[num_captures] = mv;
                num_captures += 1;
            }
        }

        // Every legal move was excluded or restricted away (singular
        // verification, searchmoves): fail low
        if moves_made == 0 {
            return alpha;
        }

        if !self.should_stop() && !excluding && !(root && self.multipv_index > 1) {
            let flag = if best_score >= beta {
                TTFlag::LowerBound
            } else if raised_alpha {
                TTFlag::Exact
            } else {
                TTFlag::UpperBound
            };
            self.tt.store(
                self.board.current().zobrist_key(),
                depth.clamp(0, 255) as u8,
                ply,
                best_score.clamp(-MATE, MATE) as i16,
                flag,
                best_move,
                static_eval.clamp(-INFINITY, INFINITY) as i16,
            );
        }

        best_score
    }

    /// Reward the cutoff move, punish the moves tried before it
    fn update_heuristics(
        &mut self,
        mv: Move,
        depth: i32,
        ply: u16,
        quiets_tried: &[Move],
        captures_tried: &[Move],
    ) {
        let bonus = (self.params.history_bonus_scale * depth).min(self.params.history_max_bonus);
        let pos = *self.board.current();
        let stm = pos.side_to_move();
        let threats = pos.threats;
        let contexts = [self.prior_context(ply, 1), self.prior_context(ply, 2)];

        if mv.is_quiet() {
            self.history.update_quiet(stm, mv, threats, bonus);
            if let Some((_, piece)) = pos.piece_at(mv.from()) {
                for prev in contexts.iter().flatten() {
                    self.history
                        .update_continuation(stm, piece, mv.to().index(), *prev, bonus);
                }
            }
            self.history.store_killer(ply_index(ply), mv);
            if ply > 0 {
                let prev_move = self.stack[(ply - 1) as usize].move_played;
                if prev_move != EMPTY_MOVE {
                    self.history.store_counter(prev_move, mv);
                }
            }
        } else if let Some(victim) = capture_victim(&pos, mv) {
            self.history.update_capture(stm, mv, victim, bonus);
        }

        for &quiet in quiets_tried {
            self.history.update_quiet(stm, quiet, threats, -bonus);
            if let Some((_, piece)) = pos.piece_at(quiet.from()) {
                for prev in contexts.iter().flatten() {
                    self.history
                        .update_continuation(stm, piece, quiet.to().index(), *prev, -bonus);
                }
            }
        }
        for &capture in captures_tried {
            if let Some(victim) = capture_victim(&pos, capture) {
                self.history.update_capture(stm, capture, victim, -bonus);
            }
        }
    }
}
