//! Zobrist hashing for chess positions.
//!
//! Provides incrementally-updatable 64-bit position hashes for the
//! transposition table and repetition detection.

use once_cell::sync::Lazy;
use rand::prelude::*;

use super::types::{Color, Piece, Square};

pub(crate) struct ZobristKeys {
    // piece_keys[color][piece_type][square_index]
    piece_keys: [[[u64; 64]; 6]; 2],
    side_to_move_key: u64,
    // One key per 4-bit castling availability mask
    castling_keys: [u64; 16],
    // en_passant_keys[file_index] (only the file matters for the EP target)
    en_passant_keys: [u64; 8],
}

impl ZobristKeys {
    fn new() -> Self {
        // Fixed seed keeps hashes reproducible across runs
        let mut rng = StdRng::seed_from_u64(0x11d_0_11d5);
        let mut piece_keys = [[[0u64; 64]; 6]; 2];
        let mut castling_keys = [0u64; 16];
        let mut en_passant_keys = [0u64; 8];

        for color in &mut piece_keys {
            for piece in color.iter_mut() {
                for key in piece.iter_mut() {
                    *key = rng.gen();
                }
            }
        }

        let side_to_move_key = rng.gen();

        // Index 0 (no rights) hashes to nothing so the empty mask is free
        for key in castling_keys.iter_mut().skip(1) {
            *key = rng.gen();
        }

        for key in &mut en_passant_keys {
            *key = rng.gen();
        }

        ZobristKeys {
            piece_keys,
            side_to_move_key,
            castling_keys,
            en_passant_keys,
        }
    }
}

static ZOBRIST: Lazy<ZobristKeys> = Lazy::new(ZobristKeys::new);

/// Key for a piece of `color` on `sq`
#[inline]
pub(crate) fn piece_key(color: Color, piece: Piece, sq: Square) -> u64 {
    ZOBRIST.piece_keys[color.index()][piece.index()][sq.index()]
}

/// Key toggled when Black is to move
#[inline]
pub(crate) fn side_to_move_key() -> u64 {
    ZOBRIST.side_to_move_key
}

/// Key for a castling availability mask (see `CastlingRights::zobrist_index`)
#[inline]
pub(crate) fn castling_key(mask: usize) -> u64 {
    ZOBRIST.castling_keys[mask]
}

/// Key for an en passant target on the given file
#[inline]
pub(crate) fn en_passant_key(file: usize) -> u64 {
    ZOBRIST.en_passant_keys[file]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_stable() {
        let a = piece_key(Color::White, Piece::Pawn, Square::new(1, 4));
        let b = piece_key(Color::White, Piece::Pawn, Square::new(1, 4));
        assert_eq!(a, b);
    }

    #[test]
    fn test_keys_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for color in [Color::White, Color::Black] {
            for piece in crate::board::types::ALL_PIECES {
                for sq in 0..64 {
                    assert!(seen.insert(piece_key(color, piece, Square::from_index(sq))));
                }
            }
        }
        assert!(seen.insert(side_to_move_key()));
        for file in 0..8 {
            assert!(seen.insert(en_passant_key(file)));
        }
        for mask in 1..16 {
            assert!(seen.insert(castling_key(mask)));
        }
    }

    #[test]
    fn test_empty_castling_mask_is_zero() {
        assert_eq!(castling_key(0), 0);
    }
}
