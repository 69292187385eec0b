//! Search: iterative-deepening negamax with alpha-beta, a shared lock-free
//! transposition table, and Lazy-SMP parallelism.
//!
//! One `SearchWorker` per thread. Everything a worker touches per node is
//! private (board stack, accumulators, heuristic tables, PV table); the only
//! shared mutable structure is the transposition table. The main worker owns
//! the clock and raises the stop flag; helpers poll it.

mod alphabeta;
pub mod constants;
mod history;
mod iterative;
mod limits;
pub mod params;
mod picker;
mod pv;
mod quiescence;
mod smp;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;

pub use history::HistoryTables;
pub use limits::{Limits, SearchLimiter};
pub use params::SearchParams;
pub use smp::{SearchManager, SearchSettings, StopHandle};

use crate::board::nnue::{AccumulatorStack, Network};
use crate::board::tt::TranspositionTable;
use crate::board::types::{Move, Piece, EMPTY_MOVE, MAX_PLY};
use crate::board::Chessboard;

use constants::{MATE_BOUND, STACK_SIZE};
use history::MoveContext;
use pv::PvTable;

/// Outcome of a completed search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub best_move: Move,
    pub ponder_move: Option<Move>,
    pub score: i32,
}

/// Snapshot of one finished iteration, for `info` output
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub depth: i32,
    pub seldepth: u16,
    pub multipv: u32,
    pub score: i32,
    pub nodes: u64,
    pub nps: u64,
    pub time_ms: u64,
    pub hashfull: u32,
    pub pv: Vec<Move>,
}

/// Callback invoked by the main worker after each iteration
pub type InfoCallback = Arc<dyn Fn(&SearchReport) + Send + Sync>;

/// Per-ply search stack entry
#[derive(Clone, Copy)]
pub(crate) struct PlyData {
    pub static_eval: i32,
    pub move_played: Move,
    pub piece_moved: Option<Piece>,
}

impl PlyData {
    fn empty() -> Self {
        PlyData {
            static_eval: 0,
            move_played: EMPTY_MOVE,
            piece_moved: None,
        }
    }
}

/// Precomputed base reductions for late move reductions, indexed by depth
/// and move number
pub(crate) static LMR_TABLE: Lazy<[[i32; 64]; 64]> = Lazy::new(|| {
    let mut table = [[0i32; 64]; 64];
    for (depth, row) in table.iter_mut().enumerate().skip(1) {
        for (moves, cell) in row.iter_mut().enumerate().skip(1) {
            let value = 0.8 + (depth as f64).ln() * (moves as f64).ln() * 0.4;
            *cell = value.round() as i32;
        }
    }
    table
});

/// One search thread's complete private state
pub(crate) struct SearchWorker {
    pub board: Chessboard,
    pub accumulators: AccumulatorStack,
    pub network: Arc<Network>,
    pub tt: Arc<TranspositionTable>,
    pub params: SearchParams,
    pub history: HistoryTables,
    pub pv: PvTable,
    pub limiter: Arc<SearchLimiter>,
    pub stop: Arc<AtomicBool>,
    /// Single-writer published node count, summed across workers for info
    pub shared_nodes: Arc<AtomicU64>,
    pub nodes: u64,
    pub seldepth: u16,
    pub stack: [PlyData; STACK_SIZE],
    /// Root move restriction (`searchmoves`, MultiPV exclusions); empty
    /// means unrestricted
    pub root_moves: Vec<Move>,
    /// Nodes attributed to each root move, for soft time scaling
    pub root_nodes: [[u64; 64]; 64],
    /// 1-based MultiPV line currently searched
    pub multipv_index: u32,
    pub is_main: bool,
    /// Cancellation only applies once the first iteration has produced a
    /// trustworthy move
    pub first_iteration_done: bool,
}

impl SearchWorker {
    pub(crate) fn new(
        board: Chessboard,
        network: Arc<Network>,
        tt: Arc<TranspositionTable>,
        limiter: Arc<SearchLimiter>,
        stop: Arc<AtomicBool>,
        is_main: bool,
    ) -> Self {
        let accumulators = AccumulatorStack::new(&network, board.current());
        SearchWorker {
            board,
            accumulators,
            network,
            tt,
            params: SearchParams::default(),
            history: HistoryTables::new(),
            pv: PvTable::new(),
            limiter,
            stop,
            shared_nodes: Arc::new(AtomicU64::new(0)),
            nodes: 0,
            seldepth: 0,
            stack: [PlyData::empty(); STACK_SIZE],
            root_moves: Vec::new(),
            root_nodes: [[0; 64]; 64],
            multipv_index: 1,
            is_main,
            first_iteration_done: false,
        }
    }

    /// Stop check for the hot path. Only the main worker consults the
    /// limiter; helpers just poll the flag the main worker raises. The
    /// first iteration always runs to completion so a legal best move
    /// exists before any cancellation takes effect.
    #[inline]
    pub(crate) fn should_stop(&self) -> bool {
        if !self.first_iteration_done {
            return false;
        }
        if self.stop.load(Ordering::Relaxed) {
            return true;
        }
        if self.is_main && self.limiter.should_stop(self.nodes) {
            self.stop.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }

    #[inline]
    pub(crate) fn count_node(&mut self) {
        self.nodes += 1;
        self.shared_nodes.store(self.nodes, Ordering::Relaxed);
    }

    /// Static evaluation of the current position, clamped inside the
    /// non-mate score range
    #[inline]
    pub(crate) fn evaluate(&mut self) -> i32 {
        self.accumulators
            .evaluate(&self.network, &self.board)
            .clamp(-MATE_BOUND + 1, MATE_BOUND - 1)
    }

    /// Make a move on both stacks
    pub(crate) fn make_move(&mut self, mv: Move, ply: u16) {
        let before = *self.board.current();
        let piece = before.piece_at(mv.from()).map(|(_, p)| p);
        self.board.do_move(mv);
        self.accumulators.push(&before, self.board.current(), mv);
        self.stack[ply as usize].move_played = mv;
        self.stack[ply as usize].piece_moved = piece;
        self.tt.prefetch(self.board.current().zobrist_key());
    }

    pub(crate) fn unmake_move(&mut self) {
        self.board.undo_move();
        self.accumulators.pop();
    }

    pub(crate) fn make_null_move(&mut self, ply: u16) {
        self.board.make_null_move();
        self.accumulators.push_null(self.board.current());
        self.stack[ply as usize].move_played = EMPTY_MOVE;
        self.stack[ply as usize].piece_moved = None;
    }

    pub(crate) fn unmake_null_move(&mut self) {
        self.board.undo_move();
        self.accumulators.pop();
    }

    /// Continuation-history context `plies_back` plies before `ply`
    pub(crate) fn prior_context(&self, ply: u16, plies_back: u16) -> Option<MoveContext> {
        if ply < plies_back {
            return None;
        }
        let idx = (ply - plies_back) as usize;
        let mv = self.stack[idx].move_played;
        let piece = self.stack[idx].piece_moved?;
        if mv == EMPTY_MOVE {
            return None;
        }
        // The mover at ply-1 is the opponent, at ply-2 ourselves, and so on
        let color = if plies_back % 2 == 1 {
            self.board.current().side_to_move().opponent()
        } else {
            self.board.current().side_to_move()
        };
        Some(MoveContext {
            color,
            piece,
            to: mv.to().index(),
        })
    }

    /// Reset per-search state, keeping learned history
    pub(crate) fn new_search(&mut self) {
        self.nodes = 0;
        self.seldepth = 0;
        self.first_iteration_done = false;
        self.shared_nodes.store(0, Ordering::Relaxed);
        self.root_nodes = [[0; 64]; 64];
        self.stack = [PlyData::empty(); STACK_SIZE];
        self.accumulators.reset(&self.network, self.board.current());
    }
}

/// Clamp a ply index into the stack bounds
#[inline]
pub(crate) fn ply_index(ply: u16) -> usize {
    (ply as usize).min(MAX_PLY - 1)
}
