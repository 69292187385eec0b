//! Static Exchange Evaluation (SEE).
//!
//! Evaluates the capture sequence on a move's target square without search:
//! each side recaptures with its least valuable attacker, either side may
//! stop, and x-ray attackers slide in as blockers vanish. Pawns reaching the
//! back rank promote to queens inside the exchange.

use super::attack_tables::slider_attacks;
use super::types::{Bitboard, Color, Move, Piece, Square, ALL_PIECES};
use super::Position;

const MAX_EXCHANGE_DEPTH: usize = 32;

impl Position {
    /// Material balance of the exchange started by `mv`, in centipawns from
    /// the mover's perspective. Positive wins material, zero is balanced.
    /// Quiet moves score the defender's best recapture (at most zero).
    #[must_use]
    pub fn see(&self, mv: Move) -> i32 {
        if mv.is_castling() {
            return 0;
        }

        let from = mv.from();
        let to = mv.to();
        let Some((_, attacker)) = self.piece_at(from) else {
            return 0;
        };

        let victim_value = if mv.is_en_passant() {
            Piece::Pawn.value()
        } else {
            self.piece_at(to).map_or(0, |(_, p)| p.value())
        };

        let mut gain = [0i32; MAX_EXCHANGE_DEPTH];
        let mut depth = 0;
        let mut side = self.side_to_move;
        let mut occupancy = self.occupancy() ^ Bitboard::from_square(from);
        let mut attackers = (self.attackers_to(to, occupancy, Color::White)
            | self.attackers_to(to, occupancy, Color::Black))
            & occupancy;

        // Value of the piece currently standing on the exchange square
        let mut occupant_value;
        gain[0] = victim_value;
        if attacker == Piece::Pawn && is_promotion_rank(to, side) {
            gain[0] += Piece::Queen.value() - Piece::Pawn.value();
            occupant_value = Piece::Queen.value();
        } else {
            occupant_value = attacker.value();
        }

        loop {
            // Removing a piece can uncover an x-ray attacker behind it
            attackers |= self.xray_attackers(to, occupancy);
            attackers &= occupancy;

            side = side.opponent();
            let side_attackers = attackers & self.occupied_by(side);
            if side_attackers.is_empty() {
                break;
            }

            let (lva_piece, lva_sq) = self.least_valuable_attacker(side_attackers, side);

            // A king only recaptures when nothing can recapture it back
            if lva_piece == Piece::King
                && !(attackers & self.occupied_by(side.opponent())).is_empty()
            {
                break;
            }

            depth += 1;
            if depth >= MAX_EXCHANGE_DEPTH {
                break;
            }

            gain[depth] = occupant_value - gain[depth - 1];
            if lva_piece == Piece::Pawn && is_promotion_rank(to, side) {
                gain[depth] += Piece::Queen.value() - Piece::Pawn.value();
                occupant_value = Piece::Queen.value();
            } else {
                occupant_value = lva_piece.value();
            }

            // Neither continuing nor standing pat wins anything: stop early
            if (-gain[depth - 1]).max(gain[depth]) < 0 {
                break;
            }

            occupancy ^= Bitboard::from_square(lva_sq);
            attackers &= occupancy;
        }

        // Each side may decline the recapture: minimax the gains back up
        while depth > 0 {
            gain[depth - 1] = -(-gain[depth - 1]).max(gain[depth]);
            depth -= 1;
        }
        gain[0]
    }

    /// Sliding attackers of either color that reach `sq` under `occupancy`
    fn xray_attackers(&self, sq: Square, occupancy: Bitboard) -> Bitboard {
        let diag = self.diagonal_sliders(Color::White) | self.diagonal_sliders(Color::Black);
        let orth = self.orthogonal_sliders(Color::White) | self.orthogonal_sliders(Color::Black);
        (Bitboard(slider_attacks(sq.index(), occupancy.0, true)) & diag)
            | (Bitboard(slider_attacks(sq.index(), occupancy.0, false)) & orth)
    }

    fn least_valuable_attacker(&self, attackers: Bitboard, side: Color) -> (Piece, Square) {
        for piece in ALL_PIECES {
            let candidates = attackers & self.pieces_of(side, piece);
            if !candidates.is_empty() {
                return (piece, candidates.lsb());
            }
        }
        unreachable!("least_valuable_attacker called with no attackers")
    }
}

#[inline]
fn is_promotion_rank(sq: Square, side: Color) -> bool {
    match side {
        Color::White => sq.rank() == 7,
        Color::Black => sq.rank() == 0,
    }
}
