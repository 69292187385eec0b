//! Mate problem suite: the engine must find the given mating move.

use std::sync::Arc;

use serde::Deserialize;

use vigil::board::nnue::Network;
use vigil::board::{Chessboard, Limits, SearchManager, SearchSettings};

#[derive(Deserialize)]
struct ProblemSet {
    problems: Vec<Problem>,
}

#[derive(Deserialize)]
struct Problem {
    #[serde(rename = "type")]
    kind: String,
    fen: String,
    moves: String,
}

fn network() -> Arc<Network> {
    #[cfg(feature = "embedded_nnue")]
    {
        Arc::new(Network::embedded())
    }
    #[cfg(not(feature = "embedded_nnue"))]
    {
        use vigil::board::nnue::NETWORK_FILE_BYTES;
        Arc::new(Network::from_bytes(&vec![0u8; NETWORK_FILE_BYTES]).unwrap())
    }
}

fn load_problems() -> Vec<Problem> {
    let data = include_str!("data/problems.json");
    let set: ProblemSet = serde_json::from_str(data).expect("invalid problems.json");
    set.problems
}

#[test]
fn given_moves_deliver_mate() {
    for problem in load_problems().iter().filter(|p| p.kind == "Mate in One") {
        let mut board = Chessboard::from_fen(&problem.fen).unwrap();
        let uci = problem.moves.replace('-', "");
        let mv = board
            .parse_move(&uci)
            .unwrap_or_else(|e| panic!("{}: bad move {uci}: {e}", problem.fen));
        board.do_move(mv);
        assert!(
            board.current().in_check() && board.generate_moves().is_empty(),
            "{} after {} is not checkmate",
            problem.fen,
            problem.moves
        );
    }
}

#[test]
fn search_solves_the_suite() {
    let mut manager = SearchManager::new(network(), 16);

    for problem in load_problems() {
        let depth = match problem.kind.as_str() {
            "Mate in One" => 3,
            "Mate in Two" => 5,
            _ => continue,
        };
        let board = Chessboard::from_fen(&problem.fen).unwrap();
        let result = manager.search(
            &board,
            &Limits::depth(depth),
            &SearchSettings::default(),
            None,
        );
        let expected = problem.moves.replace('-', "");
        assert_eq!(
            board.format_move(result.best_move),
            expected,
            "{} ({})",
            problem.fen,
            problem.kind
        );
    }
}

#[test]
fn go_mate_limit_stops_on_found_mate() {
    let board = Chessboard::from_fen("4k3/8/4K3/8/8/8/7R/8 w - - 0 1").unwrap();
    let mut manager = SearchManager::new(network(), 16);
    let limits = Limits {
        mate: Some(1),
        ..Limits::default()
    };
    let result = manager.search(&board, &limits, &SearchSettings::default(), None);
    assert_eq!(board.format_move(result.best_move), "h2h8");
}
