use std::io::Write;
use std::process::{Command, Stdio};

use vigil::board::Chessboard;

fn run_engine(input: &[u8]) -> String {
    let exe = env!("CARGO_BIN_EXE_vigil");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to spawn engine binary");

    child.stdin.as_mut().unwrap().write_all(input).unwrap();
    let output = child.wait_with_output().expect("failed to read output");
    assert!(output.status.success(), "engine exited nonzero");
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn uci_smoke_test_returns_legal_move() {
    let stdout = run_engine(
        b"uci\nisready\nposition startpos moves e2e4\ngo movetime 100\nquit\n",
    );

    assert!(stdout.contains("id name Vigil"));
    assert!(stdout.contains("uciok"));
    assert!(stdout.contains("readyok"));
    assert!(stdout.contains("option name Hash"));
    assert!(stdout.contains("option name UCI_Chess960"));

    let bestmove = stdout
        .lines()
        .filter(|line| line.starts_with("bestmove"))
        .last()
        .expect("no bestmove found");
    let mv = bestmove.split_whitespace().nth(1).expect("bestmove missing move");
    assert_ne!(mv, "0000", "engine returned null move");

    let mut board = Chessboard::new();
    let e2e4 = board.parse_move("e2e4").unwrap();
    board.do_move(e2e4);
    assert!(
        board.parse_move(mv).is_ok(),
        "bestmove {mv} not legal after 1.e4"
    );
}

#[test]
fn uci_reports_mate_score() {
    let stdout = run_engine(
        b"uci\nposition fen 4k3/8/4K3/8/8/8/7R/8 w - - 0 1\ngo depth 4\nquit\n",
    );
    assert!(
        stdout.contains("score mate 1"),
        "expected a mate 1 report, got:\n{stdout}"
    );
    assert!(stdout.contains("bestmove h2h8"));
}

#[test]
fn uci_survives_bad_input() {
    let stdout = run_engine(
        b"uci\nxyzzy\nposition fen not a fen at all\nposition startpos moves e2e5\n\
          setoption name Nonsense value 42\nisready\nquit\n",
    );
    // Bad commands are reported or ignored; the engine keeps serving
    assert!(stdout.contains("readyok"));
}

#[test]
fn uci_chess960_castling_notation() {
    // Standard mode castles as e1g1; Chess960 mode as king-takes-rook
    let stdout = run_engine(
        b"uci\nposition fen 4k3/8/8/8/8/8/8/4K2R w K - 0 1\ngo perft 1\nquit\n",
    );
    assert!(stdout.contains("e1g1"));
    assert!(!stdout.lines().any(|l| l.starts_with("e1h1:")));

    let stdout = run_engine(
        b"uci\nsetoption name UCI_Chess960 value true\n\
          position fen 4k3/8/8/8/8/8/8/4K2R w K - 0 1\ngo perft 1\nquit\n",
    );
    assert!(stdout.contains("e1h1"));
}

#[test]
fn uci_go_perft_matches_reference() {
    let stdout = run_engine(b"uci\nposition startpos\ngo perft 3\nquit\n");
    assert!(
        stdout.contains("perft(3) = 8902"),
        "unexpected perft output:\n{stdout}"
    );
}

#[test]
fn uci_stop_produces_bestmove() {
    let exe = env!("CARGO_BIN_EXE_vigil");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to spawn engine binary");

    let stdin = child.stdin.as_mut().unwrap();
    stdin
        .write_all(b"uci\nposition startpos\ngo infinite\n")
        .unwrap();
    stdin.flush().unwrap();
    std::thread::sleep(std::time::Duration::from_millis(300));
    stdin.write_all(b"stop\nquit\n").unwrap();

    let output = child.wait_with_output().expect("failed to read output");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.lines().any(|line| line.starts_with("bestmove")),
        "no bestmove after stop:\n{stdout}"
    );
}
