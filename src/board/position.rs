//! Position snapshot.
//!
//! A `Position` is a cheaply-copyable value holding the piece placement,
//! side to move, castling availability, en passant target, clocks, the
//! incrementally-maintained Zobrist key, and the derived check/pin/threat
//! masks for the side to move. The search never mutates a `Position` in
//! place; making a move copies the top of the [`super::Chessboard`] stack.

use super::attack_tables::{
    between, bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks,
};
use super::types::{Bitboard, CastlingRights, Color, Piece, Square, ALL_PIECES};
use super::zobrist;

#[derive(Clone, Copy, Debug)]
pub struct Position {
    pub(crate) pieces: [[Bitboard; 6]; 2],
    pub(crate) occupied: [Bitboard; 2],
    pub(crate) mailbox: [Option<Piece>; 64],
    pub(crate) side_to_move: Color,
    pub(crate) castling: CastlingRights,
    pub(crate) en_passant: Option<Square>,
    pub(crate) halfmove_clock: u8,
    pub(crate) fullmove_number: u16,
    pub(crate) ply_from_root: u16,
    pub(crate) from_null: bool,
    pub(crate) zobrist: u64,
    // Derived masks, refreshed by `update_masks` after every mutation
    pub(crate) checkers: Bitboard,
    pub(crate) diagonal_pins: Bitboard,
    pub(crate) orthogonal_pins: Bitboard,
    pub(crate) threats: Bitboard,
}

impl Position {
    pub(crate) fn empty() -> Self {
        Position {
            pieces: [[Bitboard::EMPTY; 6]; 2],
            occupied: [Bitboard::EMPTY; 2],
            mailbox: [None; 64],
            side_to_move: Color::White,
            castling: CastlingRights::none(),
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            ply_from_root: 0,
            from_null: false,
            zobrist: 0,
            checkers: Bitboard::EMPTY,
            diagonal_pins: Bitboard::EMPTY,
            orthogonal_pins: Bitboard::EMPTY,
            threats: Bitboard::EMPTY,
        }
    }

    // ------------------------------------------------------------------
    // Piece placement
    // ------------------------------------------------------------------

    /// Toggle a piece on a square, keeping bitboards, mailbox and Zobrist key
    /// in sync. Adding and removing are the same XOR.
    #[inline]
    pub(crate) fn toggle_piece(&mut self, color: Color, piece: Piece, sq: Square) {
        let bb = Bitboard::from_square(sq);
        self.pieces[color.index()][piece.index()] ^= bb;
        self.occupied[color.index()] ^= bb;
        self.mailbox[sq.index()] = if self.mailbox[sq.index()] == Some(piece) {
            None
        } else {
            Some(piece)
        };
        self.zobrist ^= zobrist::piece_key(color, piece, sq);
    }

    /// The piece on a square along with its color
    #[inline]
    #[must_use]
    pub fn piece_at(&self, sq: Square) -> Option<(Color, Piece)> {
        let piece = self.mailbox[sq.index()]?;
        let color = if self.occupied[Color::White.index()].contains(sq) {
            Color::White
        } else {
            Color::Black
        };
        Some((color, piece))
    }

    #[inline]
    #[must_use]
    pub(crate) fn pieces_of(&self, color: Color, piece: Piece) -> Bitboard {
        self.pieces[color.index()][piece.index()]
    }

    #[inline]
    #[must_use]
    pub(crate) fn occupied_by(&self, color: Color) -> Bitboard {
        self.occupied[color.index()]
    }

    #[inline]
    #[must_use]
    pub(crate) fn occupancy(&self) -> Bitboard {
        self.occupied[0] | self.occupied[1]
    }

    /// Bishops and queens of a color
    #[inline]
    #[must_use]
    pub(crate) fn diagonal_sliders(&self, color: Color) -> Bitboard {
        self.pieces_of(color, Piece::Bishop) | self.pieces_of(color, Piece::Queen)
    }

    /// Rooks and queens of a color
    #[inline]
    #[must_use]
    pub(crate) fn orthogonal_sliders(&self, color: Color) -> Bitboard {
        self.pieces_of(color, Piece::Rook) | self.pieces_of(color, Piece::Queen)
    }

    /// The king square for a color. Positions always hold exactly one king
    /// per side.
    #[inline]
    #[must_use]
    pub fn king_square(&self, color: Color) -> Square {
        debug_assert!(self.pieces_of(color, Piece::King).is_single());
        self.pieces_of(color, Piece::King).lsb()
    }

    #[inline]
    #[must_use]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    #[must_use]
    pub fn zobrist_key(&self) -> u64 {
        self.zobrist
    }

    #[inline]
    #[must_use]
    pub fn en_passant_target(&self) -> Option<Square> {
        self.en_passant
    }

    #[inline]
    #[must_use]
    pub fn halfmove_clock(&self) -> u8 {
        self.halfmove_clock
    }

    #[inline]
    #[must_use]
    pub fn in_check(&self) -> bool {
        !self.checkers.is_empty()
    }

    /// True when the side has any piece besides king and pawns (null-move
    /// pruning guard against zugzwang)
    #[inline]
    #[must_use]
    pub(crate) fn has_non_pawn_material(&self, color: Color) -> bool {
        let king_and_pawns =
            self.pieces_of(color, Piece::King) | self.pieces_of(color, Piece::Pawn);
        self.occupied_by(color) != king_and_pawns
    }

    /// Total piece count, used to pick the NNUE output bucket
    #[inline]
    #[must_use]
    pub(crate) fn piece_count(&self) -> u32 {
        self.occupancy().popcount()
    }

    // ------------------------------------------------------------------
    // Attack queries
    // ------------------------------------------------------------------

    /// All pieces of `by` attacking `sq` under the given occupancy. The
    /// occupancy parameter lets callers toggle pieces out (king walks,
    /// en passant legality) without mutating the position.
    #[must_use]
    pub(crate) fn attackers_to(&self, sq: Square, occupancy: Bitboard, by: Color) -> Bitboard {
        let sq_idx = sq.index();
        let mut attackers = pawn_attacks(by.opponent(), sq_idx) & self.pieces_of(by, Piece::Pawn).0;
        attackers |= knight_attacks(sq_idx) & self.pieces_of(by, Piece::Knight).0;
        attackers |= king_attacks(sq_idx) & self.pieces_of(by, Piece::King).0;
        attackers |= bishop_attacks(sq_idx, occupancy.0) & self.diagonal_sliders(by).0;
        attackers |= rook_attacks(sq_idx, occupancy.0) & self.orthogonal_sliders(by).0;
        Bitboard(attackers)
    }

    /// Is `sq` attacked by `by` under an arbitrary occupancy? This is the
    /// oracle king-move and castling legality rest on: toggling the moving
    /// king out of the occupancy exposes through-king slider attacks.
    #[inline]
    #[must_use]
    pub(crate) fn is_occupancy_attacked(&self, sq: Square, occupancy: Bitboard, by: Color) -> bool {
        !self.attackers_to(sq, occupancy, by).is_empty()
    }

    #[inline]
    #[must_use]
    pub(crate) fn is_square_attacked(&self, sq: Square, by: Color) -> bool {
        self.is_occupancy_attacked(sq, self.occupancy(), by)
    }

    /// Union of every square the given color attacks. The defender's king is
    /// toggled out of the occupancy so slider rays extend through it.
    #[must_use]
    pub(crate) fn attacked_squares(&self, by: Color) -> Bitboard {
        let occ = self.occupancy() ^ self.pieces_of(by.opponent(), Piece::King);
        let mut attacks = 0u64;
        for sq in self.pieces_of(by, Piece::Pawn) {
            attacks |= pawn_attacks(by, sq.index());
        }
        for sq in self.pieces_of(by, Piece::Knight) {
            attacks |= knight_attacks(sq.index());
        }
        for sq in self.diagonal_sliders(by) {
            attacks |= bishop_attacks(sq.index(), occ.0);
        }
        for sq in self.orthogonal_sliders(by) {
            attacks |= rook_attacks(sq.index(), occ.0);
        }
        attacks |= king_attacks(self.king_square(by).index());
        Bitboard(attacks)
    }

    // ------------------------------------------------------------------
    // Derived masks
    // ------------------------------------------------------------------

    /// Recompute `checkers`, the pin masks and `threats` for the side to
    /// move. Must run after every mutation that can change them.
    pub(crate) fn update_masks(&mut self) {
        let us = self.side_to_move;
        let them = us.opponent();
        let king = self.king_square(us);
        let occ = self.occupancy();

        self.checkers = self.attackers_to(king, occ, them);
        self.threats = self.attacked_squares(them);

        self.diagonal_pins = Bitboard::EMPTY;
        self.orthogonal_pins = Bitboard::EMPTY;

        // Snipers: enemy sliders aligned with our king, ignoring everything
        // in between. A ray with exactly one friendly blocker is a pin.
        let diag_snipers =
            Bitboard(bishop_attacks(king.index(), 0)) & self.diagonal_sliders(them);
        let orth_snipers =
            Bitboard(rook_attacks(king.index(), 0)) & self.orthogonal_sliders(them);

        for sniper in diag_snipers {
            let ray = Bitboard(between(king, sniper));
            let blockers = ray & occ;
            if blockers.is_single() && !(blockers & self.occupied_by(us)).is_empty() {
                self.diagonal_pins |= ray | Bitboard::from_square(sniper);
            }
        }
        for sniper in orth_snipers {
            let ray = Bitboard(between(king, sniper));
            let blockers = ray & occ;
            if blockers.is_single() && !(blockers & self.occupied_by(us)).is_empty() {
                self.orthogonal_pins |= ray | Bitboard::from_square(sniper);
            }
        }
    }

    // ------------------------------------------------------------------
    // Zobrist
    // ------------------------------------------------------------------

    /// Recompute the Zobrist key from scratch. The incremental key must
    /// always match this; the make/unmake tests assert it.
    #[must_use]
    pub(crate) fn compute_zobrist(&self) -> u64 {
        let mut hash = 0u64;
        for color in [Color::White, Color::Black] {
            for piece in ALL_PIECES {
                for sq in self.pieces_of(color, piece) {
                    hash ^= zobrist::piece_key(color, piece, sq);
                }
            }
        }
        hash ^= zobrist::castling_key(self.castling.zobrist_index());
        if let Some(ep) = self.en_passant {
            hash ^= zobrist::en_passant_key(ep.file());
        }
        if self.side_to_move == Color::Black {
            hash ^= zobrist::side_to_move_key();
        }
        hash
    }

    // ------------------------------------------------------------------
    // Draw material
    // ------------------------------------------------------------------

    /// Conservative insufficient-material test: KvK, KBvK and KNvK and KNvKN
    /// are draws; two-bishop and opposite-bishop endings are declined.
    #[must_use]
    pub(crate) fn is_insufficient_material(&self) -> bool {
        let pawns = self.pieces[0][Piece::Pawn.index()] | self.pieces[1][Piece::Pawn.index()];
        let rooks = self.pieces[0][Piece::Rook.index()] | self.pieces[1][Piece::Rook.index()];
        let queens = self.pieces[0][Piece::Queen.index()] | self.pieces[1][Piece::Queen.index()];
        if !(pawns | rooks | queens).is_empty() {
            return false;
        }

        let knights = self.pieces[0][Piece::Knight.index()] | self.pieces[1][Piece::Knight.index()];
        let bishops = self.pieces[0][Piece::Bishop.index()] | self.pieces[1][Piece::Bishop.index()];

        match (knights.popcount(), bishops.popcount()) {
            (0, 0) | (1, 0) | (0, 1) => true,
            (2, 0) => {
                // KNvKN is a draw; KNNvK has mating nets and is not claimed
                (knights & self.occupied[0]).popcount() == 1
            }
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Debug validation
    // ------------------------------------------------------------------

    /// Invariant check used by debug assertions in the make/unmake path.
    #[cfg(debug_assertions)]
    pub(crate) fn is_consistent(&self) -> bool {
        // Bitboards against mailbox
        for sq in 0..64 {
            let square = Square::from_index(sq);
            let from_mailbox = self.mailbox[sq];
            let mut from_bb = None;
            for color in [Color::White, Color::Black] {
                for piece in ALL_PIECES {
                    if self.pieces_of(color, piece).contains(square) {
                        from_bb = Some(piece);
                    }
                }
            }
            if from_mailbox != from_bb {
                return false;
            }
        }
        // Occupancy unions
        for color in [Color::White, Color::Black] {
            let mut union = Bitboard::EMPTY;
            for piece in ALL_PIECES {
                union |= self.pieces_of(color, piece);
            }
            if union != self.occupied_by(color) {
                return false;
            }
        }
        // One king each, enemy not in check, hash matches
        self.pieces_of(Color::White, Piece::King).is_single()
            && self.pieces_of(Color::Black, Piece::King).is_single()
            && !self.is_square_attacked(
                self.king_square(self.side_to_move.opponent()),
                self.side_to_move,
            )
            && self.zobrist == self.compute_zobrist()
    }
}
