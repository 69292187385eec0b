//! Iterative deepening with aspiration windows and MultiPV.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::board::types::{Move, EMPTY_MOVE};

use super::constants::{is_mate_score, mate_distance, INFINITY};
use super::{InfoCallback, SearchReport, SearchResult, SearchWorker};

impl SearchWorker {
    /// Run the full iterative-deepening loop on this worker's board.
    ///
    /// `multipv` asks for that many root lines per depth; `searchmoves`
    /// (when non-empty) restricts the root to those moves. `node_counters`
    /// holds every worker's published count so the main worker can report
    /// aggregate totals.
    pub(crate) fn iterative_deepening(
        &mut self,
        multipv: u32,
        searchmoves: &[Move],
        node_counters: &[Arc<AtomicU64>],
        info: Option<&InfoCallback>,
    ) -> SearchResult {
        self.new_search();

        let legal = self.board.generate_moves();
        if legal.is_empty() {
            return SearchResult {
                best_move: EMPTY_MOVE,
                ponder_move: None,
                score: 0,
            };
        }

        let allowed: Vec<Move> = if searchmoves.is_empty() {
            legal.iter().copied().collect()
        } else {
            legal
                .iter()
                .copied()
                .filter(|m| searchmoves.contains(m))
                .collect()
        };
        let lines = (multipv as usize).clamp(1, allowed.len().max(1)) as u32;

        let mut best_move = allowed.first().copied().unwrap_or(EMPTY_MOVE);
        let mut ponder_move = None;
        let mut best_score = -INFINITY;
        let mut prev_score = 0;

        'deepening: for depth in 1..=self.limiter.depth_cap() {
            let mut reported: Vec<Move> = Vec::new();

            for pv_index in 1..=lines {
                self.multipv_index = pv_index;
                self.root_moves = allowed
                    .iter()
                    .copied()
                    .filter(|m| !reported.contains(m))
                    .collect();
                if self.root_moves.is_empty() {
                    break;
                }

                let Some((score, line)) = self.aspiration_search(depth, prev_score) else {
                    break 'deepening;
                };

                let line_best = line.first().copied().unwrap_or(best_move);
                if pv_index == 1 {
                    best_move = line_best;
                    ponder_move = line.get(1).copied();
                    best_score = score;
                    prev_score = score;
                }
                reported.push(line_best);

                if let Some(callback) = info {
                    callback(&self.build_report(depth, pv_index, score, &line, node_counters));
                }
            }

            self.first_iteration_done = true;

            // A forced mate within the requested distance satisfies a
            // `go mate N` search
            if let Some(target) = self.limiter.mate_target() {
                if is_mate_score(best_score) && mate_distance(best_score) <= 2 * target - 1 {
                    break;
                }
            }

            if self.is_main {
                let scale = self.soft_time_scale(best_move);
                if self.limiter.should_stop_soft(self.nodes, scale) {
                    break;
                }
            }
            if self.should_stop() {
                break;
            }
        }

        SearchResult {
            best_move,
            ponder_move,
            score: best_score,
        }
    }

    /// One depth iteration wrapped in an aspiration window. Returns the
    /// score and PV line, or `None` when the search was cancelled before
    /// the iteration finished.
    fn aspiration_search(&mut self, depth: i32, prev_score: i32) -> Option<(i32, Vec<Move>)> {
        let mut delta = self.params.aspiration_window;
        let (mut alpha, mut beta) = if depth >= self.params.aspiration_min_depth {
            (
                (prev_score - delta).max(-INFINITY),
                (prev_score + delta).min(INFINITY),
            )
        } else {
            (-INFINITY, INFINITY)
        };
        let mut effective_depth = depth;

        loop {
            let score =
                self.search::<true>(effective_depth, 0, alpha, beta, false, EMPTY_MOVE);
            if self.should_stop() && depth > 1 {
                // Cancelled mid-iteration: the caller keeps the previous
                // completed iteration's answer
                return None;
            }

            if score <= alpha {
                // Fail low: the window was too optimistic; retry from full
                // depth with more room below
                beta = (alpha + beta) / 2;
                alpha = (alpha - delta).max(-INFINITY);
                effective_depth = depth;
            } else if score >= beta {
                // Fail high: widen upward and retry one ply shallower
                beta = (beta + delta).min(INFINITY);
                effective_depth = (effective_depth - 1).max(1);
            } else {
                return Some((score, self.pv.line(0).to_vec()));
            }
            delta *= 2;
        }
    }

    /// Scale the soft deadline by how dominant the chosen root move was:
    /// when one move soaked up most of the tree the answer is stable and
    /// the remaining budget can shrink.
    fn soft_time_scale(&self, best_move: Move) -> f64 {
        if best_move == EMPTY_MOVE || self.nodes == 0 {
            return 1.0;
        }
        let best_nodes =
            self.root_nodes[best_move.from().index()][best_move.to().index()] as f64;
        let fraction = best_nodes / self.nodes as f64;
        2.0 - 1.5 * fraction
    }

    fn build_report(
        &self,
        depth: i32,
        multipv: u32,
        score: i32,
        line: &[Move],
        node_counters: &[Arc<AtomicU64>],
    ) -> SearchReport {
        let nodes: u64 = node_counters
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .sum();
        let elapsed = self.limiter.elapsed();
        let time_ms = elapsed.as_millis() as u64;
        let nps = if time_ms > 0 {
            nodes * 1000 / time_ms
        } else {
            nodes
        };
        SearchReport {
            depth,
            seldepth: self.seldepth,
            multipv,
            score,
            nodes,
            nps,
            time_ms,
            hashfull: self.tt.fill_estimate(),
            pv: line.to_vec(),
        }
    }
}
