//! Chess board representation and search.
//!
//! Bitboard-based move generation with precomputed legality masks, a stack
//! of copy-on-make position snapshots, NNUE evaluation with incremental
//! accumulators, and a Lazy-SMP alpha-beta search.
//!
//! # Example
//! ```
//! use vigil::board::Chessboard;
//!
//! let board = Chessboard::new();
//! let moves = board.generate_moves();
//! println!("Starting position has {} legal moves", moves.len());
//! ```

mod attack_tables;
mod chessboard;
mod error;
mod fen;
mod movegen;
pub mod nnue;
mod position;
pub mod search;
mod see;
pub mod tt;
pub mod types;
mod zobrist;

#[cfg(test)]
mod tests;

// Public API - types users need
pub use chessboard::{Chessboard, START_FEN};
pub use error::{FenError, MoveParseError, NetworkError, SquareError};
pub use position::Position;
pub use types::{Bitboard, CastlingRights, Color, Move, MoveList, Piece, Square};

// Public API - search entry points
pub use search::{
    InfoCallback, Limits, SearchManager, SearchReport, SearchResult, SearchSettings,
    StopHandle,
};

/// Build every precomputed table (magics, leaper attacks, rays, Zobrist
/// keys). Called once at startup; everything is immutable afterwards.
pub fn init() {
    attack_tables::init();
}
