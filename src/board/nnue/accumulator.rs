//! Accumulator stack with lazy incremental updates.
//!
//! One entry per position on the board stack. Pushing a move records only
//! the feature deltas (at most two additions and two subtractions cover
//! every move shape, castling and en passant included); the hidden-layer
//! arithmetic runs when a node first asks for an evaluation, walking forward
//! from the nearest finished ancestor. A king move that changes its
//! perspective's input bucket or mirror half marks that perspective for a
//! full rebuild instead.

use super::network::{Aligned, Network};
use super::{needs_refresh, HL_SIZE};
use crate::board::types::{Color, Move, Piece, Square, ALL_PIECES};
use crate::board::{Chessboard, Position};

#[derive(Clone, Copy)]
struct FeatureDelta {
    color: Color,
    piece: Piece,
    sq: Square,
}

#[derive(Clone, Copy)]
struct PendingUpdate {
    adds: [FeatureDelta; 2],
    n_adds: usize,
    subs: [FeatureDelta; 2],
    n_subs: usize,
    refresh: [bool; 2],
}

impl PendingUpdate {
    fn none() -> Self {
        let dummy = FeatureDelta {
            color: Color::White,
            piece: Piece::Pawn,
            sq: Square::from_index(0),
        };
        PendingUpdate {
            adds: [dummy; 2],
            n_adds: 0,
            subs: [dummy; 2],
            n_subs: 0,
            refresh: [false; 2],
        }
    }

    fn add(&mut self, color: Color, piece: Piece, sq: Square) {
        self.adds[self.n_adds] = FeatureDelta { color, piece, sq };
        self.n_adds += 1;
    }

    fn sub(&mut self, color: Color, piece: Piece, sq: Square) {
        self.subs[self.n_subs] = FeatureDelta { color, piece, sq };
        self.n_subs += 1;
    }
}

#[derive(Clone)]
struct Entry {
    // Hidden-layer values per perspective, indexed by Color
    values: [Aligned<[i16; HL_SIZE]>; 2],
    // King squares per perspective at this node (pick bucket and mirror)
    kings: [Square; 2],
    computed: [bool; 2],
    update: PendingUpdate,
}

pub struct AccumulatorStack {
    entries: Vec<Entry>,
}

impl AccumulatorStack {
    /// Fresh stack with the root position fully refreshed
    #[must_use]
    pub fn new(network: &Network, root: &Position) -> Self {
        let mut stack = AccumulatorStack {
            entries: Vec::with_capacity(crate::board::types::MAX_PLY + 1),
        };
        stack.reset(network, root);
        stack
    }

    /// Drop all history and rebuild from `root`
    pub fn reset(&mut self, network: &Network, root: &Position) {
        self.entries.clear();
        let mut entry = Entry {
            values: [network.ft_bias; 2],
            kings: [
                root.king_square(Color::White),
                root.king_square(Color::Black),
            ],
            computed: [true; 2],
            update: PendingUpdate::none(),
        };
        for perspective in [Color::White, Color::Black] {
            refresh(network, &mut entry, perspective, root);
        }
        self.entries.push(entry);
    }

    /// Record the feature deltas of `mv` played in `before`, mirroring the
    /// board stack's push. No hidden-layer work happens here.
    pub fn push(&mut self, before: &Position, after: &Position, mv: Move) {
        let us = before.side_to_move();
        let them = us.opponent();
        let from = mv.from();
        let to = mv.to();
        let piece = before
            .piece_at(from)
            .map(|(_, p)| p)
            .expect("move origin holds a piece");

        let mut update = PendingUpdate::none();

        if mv.is_castling() {
            let back_rank = from.rank();
            let (king_file, rook_file) = if mv.is_castle_kingside() { (6, 5) } else { (2, 3) };
            update.sub(us, Piece::King, from);
            update.sub(us, Piece::Rook, to);
            update.add(us, Piece::King, Square::new(back_rank, king_file));
            update.add(us, Piece::Rook, Square::new(back_rank, rook_file));
        } else {
            update.sub(us, piece, from);
            if mv.is_capture() {
                let capture_sq = if mv.is_en_passant() {
                    to.forward(them == Color::White)
                        .expect("en passant target is never on a back rank")
                } else {
                    to
                };
                let victim = before
                    .piece_at(capture_sq)
                    .map(|(_, p)| p)
                    .expect("capture target holds a piece");
                update.sub(them, victim, capture_sq);
            }
            update.add(us, mv.promotion().unwrap_or(piece), to);
        }

        if piece == Piece::King {
            let new_king = after.king_square(us);
            update.refresh[us.index()] = needs_refresh(us, from, new_king);
        }

        self.entries.push(Entry {
            values: [Aligned([0; HL_SIZE]); 2],
            kings: [
                after.king_square(Color::White),
                after.king_square(Color::Black),
            ],
            computed: [false; 2],
            update,
        });
    }

    /// A null move changes no features; the entry only keeps the stacks in
    /// lockstep
    pub fn push_null(&mut self, after: &Position) {
        self.entries.push(Entry {
            values: [Aligned([0; HL_SIZE]); 2],
            kings: [
                after.king_square(Color::White),
                after.king_square(Color::Black),
            ],
            computed: [false; 2],
            update: PendingUpdate::none(),
        });
    }

    /// Mirror of the board stack's pop
    pub fn pop(&mut self) {
        debug_assert!(self.entries.len() > 1);
        self.entries.pop();
    }

    /// Evaluate the current position from the side to move's perspective,
    /// applying any pending updates first.
    #[must_use]
    pub fn evaluate(&mut self, network: &Network, board: &Chessboard) -> i32 {
        debug_assert!(self.entries.len() <= board.history_len());
        for perspective in [Color::White, Color::Black] {
            self.materialize(network, board, perspective);
        }
        let pos = board.current();
        let us = pos.side_to_move();
        let top = self.entries.last().expect("accumulator stack is never empty");
        network.forward(
            &top.values[us.index()],
            &top.values[us.opponent().index()],
            Network::output_bucket(pos.piece_count()),
        )
    }

    /// Apply pending updates for one perspective up to the top of the stack
    fn materialize(&mut self, network: &Network, board: &Chessboard, perspective: Color) {
        let p = perspective.index();
        let top = self.entries.len() - 1;

        // Walk down to the nearest usable starting point: a finished entry,
        // or one whose update demands a rebuild anyway
        let mut start = top;
        while start > 0
            && !self.entries[start].computed[p]
            && !self.entries[start].update.refresh[p]
        {
            start -= 1;
        }

        if !self.entries[start].computed[p] {
            // Rebuild from the matching position on the board stack
            let board_idx = board.history_len() - self.entries.len() + start;
            let position = board.position_at(board_idx);
            refresh(network, &mut self.entries[start], perspective, position);
        }

        for i in start + 1..=top {
            let (prev, rest) = self.entries.split_at_mut(i);
            let parent = &prev[i - 1];
            let entry = &mut rest[0];
            entry.values[p] = parent.values[p];
            let king = entry.kings[p];
            for delta in &entry.update.adds[..entry.update.n_adds] {
                let row = network.feature_row(perspective, king, delta.color, delta.piece, delta.sq);
                add_row(&mut entry.values[p], row);
            }
            for delta in &entry.update.subs[..entry.update.n_subs] {
                let row = network.feature_row(perspective, king, delta.color, delta.piece, delta.sq);
                sub_row(&mut entry.values[p], row);
            }
            entry.computed[p] = true;
        }
    }
}

/// Rebuild one perspective of an entry from a full position scan
fn refresh(network: &Network, entry: &mut Entry, perspective: Color, position: &Position) {
    let p = perspective.index();
    entry.values[p] = network.ft_bias;
    let king = entry.kings[p];
    debug_assert_eq!(king, position.king_square(perspective));
    for color in [Color::White, Color::Black] {
        for piece in ALL_PIECES {
            for sq in position.pieces_of(color, piece) {
                let row = network.feature_row(perspective, king, color, piece, sq);
                add_row(&mut entry.values[p], row);
            }
        }
    }
    entry.computed[p] = true;
}

#[inline]
fn add_row(values: &mut Aligned<[i16; HL_SIZE]>, row: &Aligned<[i16; HL_SIZE]>) {
    for (value, weight) in values.0.iter_mut().zip(row.0.iter()) {
        *value = value.wrapping_add(*weight);
    }
}

#[inline]
fn sub_row(values: &mut Aligned<[i16; HL_SIZE]>, row: &Aligned<[i16; HL_SIZE]>) {
    for (value, weight) in values.0.iter_mut().zip(row.0.iter()) {
        *value = value.wrapping_sub(*weight);
    }
}
