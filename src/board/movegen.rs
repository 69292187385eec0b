//! Legal move generation.
//!
//! Legality comes from four precomputed ingredients instead of make/test:
//! the checkers mask (restricting destinations to check resolutions), the
//! two pin masks (a pinned piece only moves along its own pin line), the
//! threats mask (king steps), and an occupancy-aware attack oracle for the
//! two cases that resist masking: en passant and castling.

use super::attack_tables::{
    between, bishop_attacks, king_attacks, knight_attacks, line, pawn_attacks, rook_attacks,
};
use super::types::{Bitboard, Color, Move, MoveList, Piece, Square, PROMOTION_PIECES};
use super::Position;

impl Position {
    /// Generate all legal moves, or only tactical moves (captures,
    /// promotions, en passant) when `captures_only` is set.
    #[must_use]
    pub fn generate_moves(&self, captures_only: bool) -> MoveList {
        let mut moves = MoveList::new();
        let us = self.side_to_move;
        let them = us.opponent();
        let our_occ = self.occupied_by(us);
        let their_occ = self.occupied_by(them);
        let occ = our_occ | their_occ;
        let king = self.king_square(us);

        // King steps never land on a threatened square. `threats` is built
        // with our king toggled out of the occupancy, so sliders see
        // through-king squares.
        let king_targets = if captures_only { their_occ } else { !our_occ };
        let king_moves =
            Bitboard(king_attacks(king.index())) & king_targets & !self.threats;
        for to in king_moves {
            if their_occ.contains(to) {
                moves.push(Move::capture(king, to));
            } else {
                moves.push(Move::quiet(king, to));
            }
        }

        // Double check: only the king can move
        if self.checkers.is_multiple() {
            return moves;
        }

        // Destination mask: everything when unchecked, otherwise the
        // checking piece and the ray between it and our king
        let check_mask = if let Some(checker) = self.checkers.iter().next() {
            Bitboard(between(king, checker)) | self.checkers
        } else {
            Bitboard::ALL
        };
        let pins = self.diagonal_pins | self.orthogonal_pins;
        let target_filter = if captures_only { their_occ } else { !our_occ };

        self.generate_pawn_moves(&mut moves, check_mask, pins, captures_only);

        for from in self.pieces_of(us, Piece::Knight) {
            // A pinned knight can never stay on its pin line
            if pins.contains(from) {
                continue;
            }
            let targets =
                Bitboard(knight_attacks(from.index())) & check_mask & target_filter;
            Self::push_piece_moves(&mut moves, from, targets, their_occ);
        }

        for from in self.diagonal_sliders(us) {
            let mut targets =
                Bitboard(bishop_attacks(from.index(), occ.0)) & check_mask & target_filter;
            if pins.contains(from) {
                targets &= Bitboard(line(king, from));
            }
            Self::push_piece_moves(&mut moves, from, targets, their_occ);
        }

        for from in self.orthogonal_sliders(us) {
            let mut targets =
                Bitboard(rook_attacks(from.index(), occ.0)) & check_mask & target_filter;
            if pins.contains(from) {
                targets &= Bitboard(line(king, from));
            }
            Self::push_piece_moves(&mut moves, from, targets, their_occ);
        }

        if !captures_only && self.checkers.is_empty() {
            self.generate_castling(&mut moves, king, occ, them);
        }

        moves
    }

    fn push_piece_moves(moves: &mut MoveList, from: Square, targets: Bitboard, their_occ: Bitboard) {
        for to in targets {
            if their_occ.contains(to) {
                moves.push(Move::capture(from, to));
            } else {
                moves.push(Move::quiet(from, to));
            }
        }
    }

    fn generate_pawn_moves(
        &self,
        moves: &mut MoveList,
        check_mask: Bitboard,
        pins: Bitboard,
        captures_only: bool,
    ) {
        let us = self.side_to_move;
        let them = us.opponent();
        let is_white = us == Color::White;
        let occ = self.occupancy();
        let their_occ = self.occupied_by(them);
        let king = self.king_square(us);
        let promo_rank = if is_white { 7 } else { 0 };
        let start_rank = if is_white { 1 } else { 6 };

        for from in self.pieces_of(us, Piece::Pawn) {
            let pin_line = if pins.contains(from) {
                Bitboard(line(king, from))
            } else {
                Bitboard::ALL
            };

            // Pushes
            if let Some(push) = from.forward(is_white) {
                let promoting = push.rank() == promo_rank;
                if !occ.contains(push) && (!captures_only || promoting) {
                    if check_mask.contains(push) && pin_line.contains(push) {
                        if promoting {
                            for promo in PROMOTION_PIECES {
                                moves.push(Move::promotion_move(from, push, promo));
                            }
                        } else {
                            moves.push(Move::quiet(from, push));
                        }
                    }
                }
                if !captures_only
                    && from.rank() == start_rank
                    && !occ.contains(push)
                {
                    if let Some(double) = push.forward(is_white) {
                        if !occ.contains(double)
                            && check_mask.contains(double)
                            && pin_line.contains(double)
                        {
                            moves.push(Move::double_pawn_push(from, double));
                        }
                    }
                }
            }

            // Captures
            let captures = Bitboard(pawn_attacks(us, from.index()))
                & their_occ
                & check_mask
                & pin_line;
            for to in captures {
                if to.rank() == promo_rank {
                    for promo in PROMOTION_PIECES {
                        moves.push(Move::promotion_capture(from, to, promo));
                    }
                } else {
                    moves.push(Move::capture(from, to));
                }
            }

            // En passant sidesteps the masks entirely: removing two pieces
            // from one rank can uncover horizontal attacks no pin mask sees,
            // and capturing a double-pushed checker resolves check without
            // the target being in the destination mask. Simulate and ask the
            // oracle.
            if let Some(ep) = self.en_passant {
                if Bitboard(pawn_attacks(us, from.index())).contains(ep) {
                    let victim = ep
                        .forward(!is_white)
                        .expect("en passant target is never on a back rank");
                    let after = occ
                        ^ Bitboard::from_square(from)
                        ^ Bitboard::from_square(victim)
                        ^ Bitboard::from_square(ep);
                    // The captured pawn is still in the piece bitboards;
                    // intersecting with the simulated occupancy drops it
                    if (self.attackers_to(king, after, them) & after).is_empty() {
                        moves.push(Move::en_passant(from, ep));
                    }
                }
            }
        }
    }

    /// Castling, generated only when not in check. Chess960-aware: the
    /// travel rays run king-to-destination and rook-to-destination, with the
    /// king and castling rook themselves ignored as blockers.
    fn generate_castling(&self, moves: &mut MoveList, king: Square, occ: Bitboard, them: Color) {
        let us = self.side_to_move;
        let back_rank = king.rank();

        for kingside in [true, false] {
            let Some(rook) = self.castling.rook(us, kingside) else {
                continue;
            };
            let (king_file, rook_file) = if kingside { (6, 5) } else { (2, 3) };
            let king_dest = Square::new(back_rank, king_file);
            let rook_dest = Square::new(back_rank, rook_file);

            let king_bb = Bitboard::from_square(king);
            let rook_bb = Bitboard::from_square(rook);
            let movers = king_bb | rook_bb;

            let travel = (Bitboard(between(king, king_dest))
                | Bitboard::from_square(king_dest)
                | Bitboard(between(rook, rook_dest))
                | Bitboard::from_square(rook_dest))
                & !movers;
            if !(travel & occ).is_empty() {
                continue;
            }

            // Every square the king crosses, with the king lifted off the
            // board so sliders see through its origin
            let king_path =
                Bitboard(between(king, king_dest)) | Bitboard::from_square(king_dest);
            let walk_occ = occ ^ king_bb;
            if king_path
                .iter()
                .any(|sq| self.is_occupancy_attacked(sq, walk_occ, them))
            {
                continue;
            }

            // The rook's departure can itself uncover an attack on the
            // king's destination (it may have been shielding its own king)
            let after = (occ ^ movers)
                | Bitboard::from_square(king_dest)
                | Bitboard::from_square(rook_dest);
            if self.is_occupancy_attacked(king_dest, after, them) {
                continue;
            }

            moves.push(Move::castle(king, rook, kingside));
        }
    }
}
