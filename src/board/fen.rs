//! FEN parsing and formatting, including Shredder-FEN castling fields.

use super::error::FenError;
use super::types::{Color, Piece, Square, file_to_index, rank_to_index};
use super::{Chessboard, Position};

impl Chessboard {
    /// Parse a board position from FEN notation.
    ///
    /// Castling rights accept both the standard `KQkq` letters and the
    /// Shredder-FEN `A`-`H`/`a`-`h` rook files; standard letters are
    /// normalized to the outermost rook of the wing, which also covers
    /// Chess960 positions given with `KQkq`.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let mut pos = Position::empty();
        let parts: Vec<&str> = fen.split_whitespace().collect();

        if parts.len() < 4 {
            return Err(FenError::TooFewParts { found: parts.len() });
        }

        // Piece placement
        for (rank_idx, rank_str) in parts[0].split('/').enumerate() {
            if rank_idx >= 8 {
                return Err(FenError::InvalidRank { rank: rank_idx });
            }
            let mut file = 0;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                } else {
                    let color = if c.is_uppercase() {
                        Color::White
                    } else {
                        Color::Black
                    };
                    let piece = Piece::from_char(c).ok_or(FenError::InvalidPiece { char: c })?;
                    if file >= 8 {
                        return Err(FenError::TooManyFiles {
                            rank: rank_idx,
                            files: file + 1,
                        });
                    }
                    pos.toggle_piece(color, piece, Square::new(7 - rank_idx, file));
                    file += 1;
                }
            }
        }

        for color in [Color::White, Color::Black] {
            let kings = pos.pieces_of(color, Piece::King).popcount();
            if kings != 1 {
                return Err(FenError::BadKingCount {
                    color_white: color == Color::White,
                    count: kings,
                });
            }
        }

        // Side to move
        match parts[1] {
            "w" => pos.side_to_move = Color::White,
            "b" => pos.side_to_move = Color::Black,
            other => {
                return Err(FenError::InvalidSideToMove {
                    found: other.to_string(),
                })
            }
        }

        // Castling rights
        if parts[2] != "-" {
            for c in parts[2].chars() {
                let color = if c.is_uppercase() {
                    Color::White
                } else {
                    Color::Black
                };
                let back_rank = if color == Color::White { 0 } else { 7 };
                let king_file = pos.king_square(color).file();
                let rook_file = match c.to_ascii_lowercase() {
                    'k' => outermost_rook(&pos, color, back_rank, king_file, true),
                    'q' => outermost_rook(&pos, color, back_rank, king_file, false),
                    'a'..='h' => {
                        let file = file_to_index(c.to_ascii_lowercase());
                        if pos
                            .pieces_of(color, Piece::Rook)
                            .contains(Square::new(back_rank, file))
                        {
                            Some(file)
                        } else {
                            None
                        }
                    }
                    _ => return Err(FenError::InvalidCastling { char: c }),
                };
                let Some(rook_file) = rook_file else {
                    return Err(FenError::MissingCastlingRook { char: c });
                };
                pos.castling
                    .grant(color, rook_file > king_file, Square::new(back_rank, rook_file));
            }
        }

        // En passant target
        pos.en_passant = if parts[3] == "-" {
            None
        } else {
            let chars: Vec<char> = parts[3].chars().collect();
            if chars.len() == 2
                && ('a'..='h').contains(&chars[0])
                && ('1'..='8').contains(&chars[1])
            {
                Some(Square::new(rank_to_index(chars[1]), file_to_index(chars[0])))
            } else {
                return Err(FenError::InvalidEnPassant {
                    found: parts[3].to_string(),
                });
            }
        };

        // Optional clocks
        if parts.len() >= 5 {
            pos.halfmove_clock = parts[4].parse().unwrap_or(0);
        }
        if parts.len() >= 6 {
            pos.fullmove_number = parts[5].parse().unwrap_or(1);
        }

        pos.zobrist = pos.compute_zobrist();
        pos.update_masks();
        Ok(Chessboard::from_position(pos))
    }

    /// Convert the current position to FEN notation. Chess960 mode emits
    /// Shredder-FEN rook files in the castling field.
    #[must_use]
    pub fn to_fen(&self) -> String {
        let pos = self.current();
        let mut rows: Vec<String> = Vec::with_capacity(8);
        for rank in (0..8).rev() {
            let mut row = String::new();
            let mut empty = 0;
            for file in 0..8 {
                if let Some((color, piece)) = pos.piece_at(Square::new(rank, file)) {
                    if empty > 0 {
                        row.push_str(&empty.to_string());
                        empty = 0;
                    }
                    row.push(piece.to_fen_char(color));
                } else {
                    empty += 1;
                }
            }
            if empty > 0 {
                row.push_str(&empty.to_string());
            }
            rows.push(row);
        }

        let mut castling = String::new();
        for (color, letters) in [(Color::White, ['K', 'Q']), (Color::Black, ['k', 'q'])] {
            for (kingside, letter) in [(true, letters[0]), (false, letters[1])] {
                if let Some(rook) = pos.castling.rook(color, kingside) {
                    if self.is_chess960() {
                        let file_char = (rook.file() as u8 + b'a') as char;
                        castling.push(if color == Color::White {
                            file_char.to_ascii_uppercase()
                        } else {
                            file_char
                        });
                    } else {
                        castling.push(letter);
                    }
                }
            }
        }
        if castling.is_empty() {
            castling.push('-');
        }

        let ep = pos
            .en_passant
            .map_or_else(|| "-".to_string(), |sq| sq.to_string());
        let stm = if pos.side_to_move == Color::White { "w" } else { "b" };

        format!(
            "{} {} {} {} {} {}",
            rows.join("/"),
            stm,
            castling,
            ep,
            pos.halfmove_clock,
            pos.fullmove_number
        )
    }
}

/// The outermost rook on the given wing of the back rank, for normalizing
/// standard castling letters.
fn outermost_rook(
    pos: &Position,
    color: Color,
    back_rank: usize,
    king_file: usize,
    kingside: bool,
) -> Option<usize> {
    let rooks = pos.pieces_of(color, Piece::Rook);
    if kingside {
        (king_file + 1..8)
            .rev()
            .find(|&f| rooks.contains(Square::new(back_rank, f)))
    } else {
        (0..king_file).find(|&f| rooks.contains(Square::new(back_rank, f)))
    }
}
