//! Universal Chess Interface front-end.
//!
//! The loop thread owns the board and options and never blocks on a
//! search: `go` hands a board clone to a worker thread driving the
//! [`SearchManager`], while `stop`/`ponderhit`/`isready` keep being served
//! here. Bad input never crashes the engine; it is reported as an
//! `info string` when debug mode is on and otherwise ignored.

pub mod command;
pub mod options;

use std::fmt;
use std::io::BufRead;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::board::nnue::Network;
use crate::board::search::constants::{is_mate_score, mate_distance};
use crate::board::{
    Chessboard, FenError, Move, MoveParseError, SearchManager, SearchReport, SearchSettings,
    StopHandle,
};

use command::{parse_go, parse_position};
use options::{UciAction, UciOptions};

const ENGINE_NAME: &str = concat!("Vigil ", env!("CARGO_PKG_VERSION"));
const ENGINE_AUTHOR: &str = "the Vigil developers";

/// Error type for UCI command parsing
#[derive(Debug)]
pub enum UciError {
    /// Invalid FEN string
    InvalidFen(FenError),
    /// Invalid move in the move list
    InvalidMove {
        move_str: String,
        error: MoveParseError,
    },
    /// Missing required parts in the command
    MissingParts,
}

impl fmt::Display for UciError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UciError::InvalidFen(e) => write!(f, "invalid FEN: {e}"),
            UciError::InvalidMove { move_str, error } => {
                write!(f, "invalid move '{move_str}': {error}")
            }
            UciError::MissingParts => write!(f, "missing required parts in position command"),
        }
    }
}

impl std::error::Error for UciError {}

impl From<FenError> for UciError {
    fn from(e: FenError) -> Self {
        UciError::InvalidFen(e)
    }
}

struct Engine {
    board: Chessboard,
    manager: Arc<Mutex<SearchManager>>,
    handle: StopHandle,
    options: UciOptions,
    debug: bool,
    search_thread: Option<JoinHandle<()>>,
}

impl Engine {
    fn new() -> Self {
        let options = UciOptions::default();
        let network = Arc::new(default_network());
        let manager = SearchManager::new(network, options.hash_mib);
        let handle = manager.stop_handle();
        Engine {
            board: Chessboard::new(),
            manager: Arc::new(Mutex::new(manager)),
            handle,
            options,
            debug: false,
            search_thread: None,
        }
    }

    fn diag(&self, message: &str) {
        #[cfg(feature = "logging")]
        log::debug!("{message}");
        if self.debug {
            println!("info string {message}");
        }
    }

    fn searching(&self) -> bool {
        self.handle.is_searching()
    }

    /// Wait for an in-flight search to finish (quit, or state changes that
    /// must not race a search)
    fn join_search(&mut self) {
        if let Some(thread) = self.search_thread.take() {
            let _ = thread.join();
        }
    }

    fn handle_go(&mut self, parts: &[&str]) {
        if self.searching() {
            self.diag("search already running");
            return;
        }
        self.join_search();

        let command = parse_go(&self.board, parts);

        if let Some(depth) = command.perft {
            self.run_perft(depth);
            return;
        }

        if !self.options.enable_weird_tcs {
            let zero_inc = command.limits.white_time.is_some()
                && command.limits.white_inc.unwrap_or(0) == 0
                && command.limits.black_inc.unwrap_or(0) == 0;
            if zero_inc {
                println!(
                    "info string warning: zero-increment time control; \
                     set EnableWeirdTCs to silence this"
                );
            }
        }

        let settings = SearchSettings {
            threads: self.options.threads,
            multipv: self.options.multipv,
            searchmoves: command.searchmoves,
            move_overhead_ms: self.options.move_overhead_ms,
        };
        let board = self.board.clone();
        let manager = Arc::clone(&self.manager);
        let limits = command.limits;

        let reporter = board.clone();
        let callback: crate::board::InfoCallback =
            Arc::new(move |report: &SearchReport| print_report(&reporter, report));

        let printer = self.board.clone();
        self.search_thread = Some(
            std::thread::Builder::new()
                .name("search-main".to_string())
                .stack_size(32 * 1024 * 1024)
                .spawn(move || {
                    let result =
                        manager
                            .lock()
                            .search(&board, &limits, &settings, Some(callback));
                    let best = if result.best_move.is_null() {
                        "0000".to_string()
                    } else {
                        printer.format_move(result.best_move)
                    };
                    let mut line = format!("bestmove {best}");
                    if let Some(ponder) = result.ponder_move {
                        line.push_str(&format!(" ponder {}", printer.format_move(ponder)));
                    }
                    println!("{line}");
                })
                .expect("failed to spawn search thread"),
        );
    }

    fn run_perft(&self, depth: usize) {
        let mut board = self.board.clone();
        let start = std::time::Instant::now();
        let mut total = 0u64;
        for mv in &board.generate_moves() {
            board.do_move(*mv);
            let nodes = board.perft(depth.saturating_sub(1));
            board.undo_move();
            total += nodes;
            println!("{}: {nodes}", board.format_move(*mv));
        }
        let elapsed = start.elapsed();
        let nps = if elapsed.as_millis() > 0 {
            total * 1000 / elapsed.as_millis() as u64
        } else {
            total
        };
        println!("info string perft({depth}) = {total} ({nps} nps)");
    }

    fn handle_setoption(&mut self, parts: &[&str]) {
        if self.searching() {
            self.diag("cannot change options during search");
            return;
        }
        self.join_search();

        // setoption name <name...> [value <value...>]
        let name_start = match parts.first() {
            Some(&"name") => 1,
            _ => {
                self.diag("malformed setoption");
                return;
            }
        };
        let value_pos = parts.iter().position(|&p| p == "value");
        let name = parts[name_start..value_pos.unwrap_or(parts.len())].join("");
        let value = value_pos.map(|pos| parts[pos + 1..].join(" "));

        match self.options.apply(&name, value.as_deref()) {
            Ok(Some(action)) => self.apply_action(action),
            Ok(None) => {}
            Err(message) => self.diag(&message),
        }
    }

    fn apply_action(&mut self, action: UciAction) {
        match action {
            UciAction::ResizeHash(mib) => self.manager.lock().resize_tt(mib),
            UciAction::ClearTranspositionTable => self.manager.lock().clear_tt(),
            UciAction::ClearHistory => self.manager.lock().clear_history(),
            UciAction::SetChess960(enabled) => self.board.set_chess960(enabled),
            UciAction::LoadNetwork(path) => {
                if path == "<default>" || path.is_empty() {
                    self.manager.lock().set_network(Arc::new(default_network()));
                    return;
                }
                match Network::load(&path) {
                    Ok(network) => {
                        self.manager.lock().set_network(Arc::new(network));
                        self.diag(&format!("loaded network from {path}"));
                    }
                    Err(e) => {
                        println!("info string error: {e}");
                    }
                }
            }
        }
    }

    fn handle_position(&mut self, parts: &[&str]) {
        if self.searching() {
            self.diag("cannot set position during search");
            return;
        }
        self.join_search();
        if let Err(e) = parse_position(&mut self.board, parts) {
            println!("info string {e}");
        }
    }

    fn handle_newgame(&mut self) {
        if self.searching() {
            self.handle.stop();
        }
        self.join_search();
        let chess960 = self.board.is_chess960();
        self.board = Chessboard::new();
        self.board.set_chess960(chess960);
        let mut manager = self.manager.lock();
        manager.clear_tt();
        manager.clear_history();
    }
}

/// The network compiled into the binary, or an all-zero fallback when the
/// `embedded_nnue` feature is off
fn default_network() -> Network {
    #[cfg(feature = "embedded_nnue")]
    {
        Network::embedded()
    }
    #[cfg(not(feature = "embedded_nnue"))]
    {
        Network::from_bytes(&vec![0u8; crate::board::nnue::NETWORK_FILE_BYTES])
            .expect("zero network has the right size")
    }
}

fn print_report(board: &Chessboard, report: &SearchReport) {
    let score = if is_mate_score(report.score) {
        let plies = mate_distance(report.score);
        let moves = (plies + 1) / 2;
        if report.score > 0 {
            format!("mate {moves}")
        } else {
            format!("mate -{moves}")
        }
    } else {
        format!("cp {}", report.score)
    };
    let pv: Vec<String> = report.pv.iter().map(|&mv| board.format_move(mv)).collect();
    println!(
        "info depth {} seldepth {} multipv {} score {} hashfull {} time {} nodes {} nps {} pv {}",
        report.depth,
        report.seldepth,
        report.multipv,
        score,
        report.hashfull,
        report.time_ms,
        report.nodes,
        report.nps,
        pv.join(" ")
    );
}

/// Drive the engine from stdin until `quit`. Returns the process exit code.
pub fn run_uci_loop() -> i32 {
    crate::board::init();
    let mut engine = Engine::new();
    let stdin = std::io::stdin();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = parts.first() else {
            continue;
        };

        match command {
            "uci" => {
                println!("id name {ENGINE_NAME}");
                println!("id author {ENGINE_AUTHOR}");
                engine.options.print();
                println!("uciok");
            }
            "isready" => println!("readyok"),
            "ucinewgame" => engine.handle_newgame(),
            "position" => engine.handle_position(&parts[1..]),
            "go" => engine.handle_go(&parts[1..]),
            "stop" => engine.handle.stop(),
            "ponderhit" => engine.handle.ponderhit(),
            "setoption" => engine.handle_setoption(&parts[1..]),
            "debug" => engine.debug = parts.get(1) == Some(&"on"),
            "quit" => {
                engine.handle.stop();
                engine.join_search();
                return 0;
            }
            _ => engine.diag(&format!("unknown command '{command}'")),
        }
    }

    // stdin closed without an explicit quit
    engine.handle.stop();
    engine.join_search();
    0
}

/// Format a move the way the current mode requires (standard castling
/// notation unless Chess960 is on)
#[must_use]
pub fn format_uci_move(board: &Chessboard, mv: Move) -> String {
    board.format_move(mv)
}
