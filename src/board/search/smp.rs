//! Lazy-SMP search management.
//!
//! One main worker plus N-1 helpers, every one running the same iterative
//! deepening loop on its own copy of the position. The threads cooperate
//! only through the shared transposition table; helpers inherit a deep copy
//! of the main thread's heuristic tables at search start so everyone begins
//! with the same learned history. The main worker owns the clock, raises
//! the shared stop flag, and is the only thread that reports.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::board::nnue::Network;
use crate::board::tt::TranspositionTable;
use crate::board::types::Move;
use crate::board::Chessboard;

use super::{
    HistoryTables, InfoCallback, Limits, SearchLimiter, SearchResult, SearchWorker,
};

/// Deep recursion lives on the search threads, so give them room
const SEARCH_STACK_SIZE: usize = 32 * 1024 * 1024;

/// Per-`go` knobs that are not limits
#[derive(Clone, Debug)]
pub struct SearchSettings {
    pub threads: usize,
    pub multipv: u32,
    pub searchmoves: Vec<Move>,
    pub move_overhead_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            threads: 1,
            multipv: 1,
            searchmoves: Vec::new(),
            move_overhead_ms: 20,
        }
    }
}

/// Control handle usable from the UCI thread while a search runs
#[derive(Clone)]
pub struct StopHandle {
    stop: Arc<AtomicBool>,
    searching: Arc<AtomicBool>,
    current_limiter: Arc<Mutex<Option<Arc<SearchLimiter>>>>,
}

impl StopHandle {
    /// `stop`: every worker bails out after its current node
    pub fn stop(&self) {
        if let Some(limiter) = self.current_limiter.lock().as_ref() {
            // A stopped ponder search must start obeying deadlines so the
            // pending bestmove leaves immediately
            limiter.stop_pondering();
        }
        self.stop.store(true, Ordering::Relaxed);
    }

    /// `ponderhit`: the predicted move was played; deadlines rebase to now
    pub fn ponderhit(&self) {
        if let Some(limiter) = self.current_limiter.lock().as_ref() {
            limiter.stop_pondering();
        }
    }

    #[must_use]
    pub fn is_searching(&self) -> bool {
        self.searching.load(Ordering::Acquire)
    }
}

pub struct SearchManager {
    network: Arc<Network>,
    tt: Arc<TranspositionTable>,
    /// The main thread's learned history, persisted between searches
    history: HistoryTables,
    params: super::SearchParams,
    stop: Arc<AtomicBool>,
    searching: Arc<AtomicBool>,
    current_limiter: Arc<Mutex<Option<Arc<SearchLimiter>>>>,
}

impl SearchManager {
    #[must_use]
    pub fn new(network: Arc<Network>, tt_mib: usize) -> Self {
        SearchManager {
            network,
            tt: Arc::new(TranspositionTable::new(tt_mib)),
            history: HistoryTables::new(),
            params: super::SearchParams::default(),
            stop: Arc::new(AtomicBool::new(false)),
            searching: Arc::new(AtomicBool::new(false)),
            current_limiter: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop: Arc::clone(&self.stop),
            searching: Arc::clone(&self.searching),
            current_limiter: Arc::clone(&self.current_limiter),
        }
    }

    /// Replace the transposition table (UCI `Hash`)
    pub fn resize_tt(&mut self, mib: usize) {
        self.tt = Arc::new(TranspositionTable::new(mib));
    }

    /// `TTClear` button / part of `ucinewgame`
    pub fn clear_tt(&self) {
        self.tt.clear();
    }

    /// `HClear` button / part of `ucinewgame`
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn set_network(&mut self, network: Arc<Network>) {
        self.network = network;
    }

    /// Run a search to completion and return the main worker's result.
    /// Blocks the calling thread; `stop`/`ponderhit` arrive through a
    /// [`StopHandle`] from another thread.
    pub fn search(
        &mut self,
        board: &Chessboard,
        limits: &Limits,
        settings: &SearchSettings,
        info: Option<InfoCallback>,
    ) -> SearchResult {
        #[cfg(feature = "logging")]
        log::debug!(
            "search start: threads={} multipv={} limits={limits:?}",
            settings.threads,
            settings.multipv
        );

        let limiter = Arc::new(SearchLimiter::new(
            limits,
            board.current().side_to_move(),
            settings.move_overhead_ms,
        ));
        *self.current_limiter.lock() = Some(Arc::clone(&limiter));
        self.stop.store(false, Ordering::Relaxed);
        self.searching.store(true, Ordering::Release);

        let threads = settings.threads.max(1);
        let mut main_worker = SearchWorker::new(
            board.clone(),
            Arc::clone(&self.network),
            Arc::clone(&self.tt),
            Arc::clone(&limiter),
            Arc::clone(&self.stop),
            true,
        );
        main_worker.history = self.history.clone();
        main_worker.params = self.params.clone();

        let mut helpers = Vec::with_capacity(threads - 1);
        let mut node_counters = vec![Arc::clone(&main_worker.shared_nodes)];

        for id in 1..threads {
            let mut helper = SearchWorker::new(
                board.clone(),
                Arc::clone(&self.network),
                Arc::clone(&self.tt),
                Arc::clone(&limiter),
                Arc::clone(&self.stop),
                false,
            );
            helper.history = self.history.clone();
            helper.params = self.params.clone();
            node_counters.push(Arc::clone(&helper.shared_nodes));

            let searchmoves = settings.searchmoves.clone();
            let handle = thread::Builder::new()
                .name(format!("search-{id}"))
                .stack_size(SEARCH_STACK_SIZE)
                .spawn(move || {
                    helper.iterative_deepening(1, &searchmoves, &[], None);
                })
                .expect("failed to spawn search worker");
            helpers.push(handle);
        }

        let result = main_worker.iterative_deepening(
            settings.multipv,
            &settings.searchmoves,
            &node_counters,
            info.as_ref(),
        );

        // Main is done deciding: release the helpers and wait for them
        self.stop.store(true, Ordering::Relaxed);
        for handle in helpers {
            let _ = handle.join();
        }

        // Keep what the main worker learned for the next search
        self.history = main_worker.history;
        *self.current_limiter.lock() = None;
        self.searching.store(false, Ordering::Release);

        result
    }

    /// Permille fill of the shared transposition table
    #[must_use]
    pub fn tt_fill(&self) -> u32 {
        self.tt.fill_estimate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::search::Limits;

    fn test_network() -> Arc<Network> {
        use crate::board::nnue::NETWORK_FILE_BYTES;
        Arc::new(Network::from_bytes(&vec![0u8; NETWORK_FILE_BYTES]).unwrap())
    }

    #[test]
    fn test_single_thread_search_returns_legal_move() {
        let board = Chessboard::new();
        let mut manager = SearchManager::new(test_network(), 16);
        let result = manager.search(
            &board,
            &Limits::depth(4),
            &SearchSettings::default(),
            None,
        );
        assert!(board.generate_moves().contains(result.best_move));
    }

    #[test]
    fn test_four_thread_search_completes() {
        let board = Chessboard::new();
        let mut manager = SearchManager::new(test_network(), 16);
        let settings = SearchSettings {
            threads: 4,
            ..SearchSettings::default()
        };
        let result = manager.search(&board, &Limits::depth(6), &settings, None);
        assert!(board.generate_moves().contains(result.best_move));
    }

    #[test]
    fn test_stop_handle_cancels_promptly() {
        use std::time::{Duration, Instant};
        let board = Chessboard::new();
        let mut manager = SearchManager::new(test_network(), 16);
        let handle = manager.stop_handle();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            handle.stop();
        });
        let start = Instant::now();
        let result = manager.search(
            &board,
            &Limits::infinite(),
            &SearchSettings::default(),
            None,
        );
        stopper.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(board.generate_moves().contains(result.best_move));
    }
}
