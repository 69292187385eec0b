//! Parsing of `position` and `go` command arguments.

use crate::board::search::Limits;
use crate::board::types::Move;
use crate::board::Chessboard;

use super::UciError;

/// A parsed `go` command
#[derive(Default)]
pub struct GoCommand {
    pub limits: Limits,
    pub searchmoves: Vec<Move>,
    /// `go perft N` debug walker instead of a search
    pub perft: Option<usize>,
}

/// Apply a `position` command to the board. `parts` starts after the
/// `position` token. The board keeps its Chess960 setting.
pub fn parse_position(board: &mut Chessboard, parts: &[&str]) -> Result<(), UciError> {
    let chess960 = board.is_chess960();
    let mut idx = 0;

    let mut new_board = match parts.first() {
        Some(&"startpos") => {
            idx += 1;
            Chessboard::new()
        }
        Some(&"fen") => {
            let fen_end = parts
                .iter()
                .position(|&p| p == "moves")
                .unwrap_or(parts.len());
            let fen = parts[1..fen_end].join(" ");
            idx = fen_end;
            Chessboard::from_fen(&fen)?
        }
        _ => return Err(UciError::MissingParts),
    };
    new_board.set_chess960(chess960);

    if parts.get(idx) == Some(&"moves") {
        for token in &parts[idx + 1..] {
            let mv = new_board
                .parse_move(token)
                .map_err(|error| UciError::InvalidMove {
                    move_str: (*token).to_string(),
                    error,
                })?;
            new_board.do_move(mv);
        }
    }

    new_board.reset_root_ply();
    *board = new_board;
    Ok(())
}

/// Parse the arguments of a `go` command against the current position.
/// Malformed numeric values fall back to "not given" rather than failing
/// the whole command.
pub fn parse_go(board: &Chessboard, parts: &[&str]) -> GoCommand {
    let mut command = GoCommand::default();
    let mut iter = parts.iter().peekable();

    while let Some(&token) = iter.next() {
        match token {
            "infinite" => command.limits.infinite = true,
            "ponder" => command.limits.ponder = true,
            "wtime" => command.limits.white_time = next_number(&mut iter),
            "btime" => command.limits.black_time = next_number(&mut iter),
            "winc" => command.limits.white_inc = next_number(&mut iter),
            "binc" => command.limits.black_inc = next_number(&mut iter),
            "movestogo" => command.limits.moves_to_go = next_number(&mut iter),
            "movetime" => command.limits.movetime = next_number(&mut iter),
            "depth" => command.limits.depth = next_number(&mut iter).map(|d| d as i32),
            "mate" => command.limits.mate = next_number(&mut iter).map(|m| m as i32),
            "nodes" => command.limits.nodes = next_number(&mut iter),
            "perft" => command.perft = next_number(&mut iter).map(|d| d as usize),
            "searchmoves" => {
                // Every following token that parses as a legal move
                // restricts the root
                while let Some(&&candidate) = iter.peek() {
                    match board.parse_move(candidate) {
                        Ok(mv) => {
                            command.searchmoves.push(mv);
                            iter.next();
                        }
                        Err(_) => break,
                    }
                }
            }
            _ => {}
        }
    }

    command
}

/// Next token as a non-negative number; negative clock values (sent by some
/// GUIs when flagging) clamp to zero
fn next_number<'a, I>(iter: &mut std::iter::Peekable<I>) -> Option<u64>
where
    I: Iterator<Item = &'a &'a str>,
{
    iter.next()
        .and_then(|raw| raw.parse::<i64>().ok())
        .map(|value| value.max(0) as u64)
}
