//! NNUE (Efficiently Updatable Neural Network) evaluation.
//!
//! Architecture: `(768 x B -> H) x 2` perspectives `-> OB` output buckets.
//! The feature transformer is king-bucketed and horizontally mirrored: each
//! perspective's active weight block follows its own king's square, and all
//! feature squares flip files when that king stands on the e-h half.
//!
//! Accumulators update incrementally per move and live on a stack mirroring
//! the position stack, so unmake is a pop and pending updates are only
//! applied when a node actually asks for an evaluation.

mod accumulator;
mod network;

pub use accumulator::AccumulatorStack;
pub use network::{Network, NETWORK_FILE_BYTES};

use crate::board::types::{Color, Square};

/// Feature transformer input size per bucket: 64 squares x 6 kinds x 2 colors
pub const FT_SIZE: usize = 768;

/// King-placement input buckets per perspective
pub const NUM_INPUT_BUCKETS: usize = 4;

/// Hidden layer size per perspective
pub const HL_SIZE: usize = 128;

/// Output buckets selected by total piece count
pub const NUM_OUTPUT_BUCKETS: usize = 8;

/// Feature transformer quantization factor
pub const QA: i32 = 255;

/// Output layer quantization factor
pub const QB: i32 = 64;

/// Centipawn scale of the raw network output
pub const EVAL_SCALE: i32 = 400;

/// Input bucket per oriented king square, queen-side half; the e-h files
/// mirror a-d. Orientation puts each perspective's own back rank at rank 8,
/// which gets the fine-grained buckets (castled kings); everything before
/// the seventh rank shares one.
const INPUT_BUCKET_LAYOUT: [usize; 64] = {
    let half = [
        [3, 3, 3, 3],
        [3, 3, 3, 3],
        [3, 3, 3, 3],
        [3, 3, 3, 3],
        [3, 3, 3, 3],
        [3, 3, 3, 3],
        [2, 2, 2, 2],
        [0, 0, 1, 1],
    ];
    let mut table = [0usize; 64];
    let mut sq = 0;
    while sq < 64 {
        let rank = sq / 8;
        let file = sq % 8;
        let mirrored = if file >= 4 { 7 - file } else { file };
        table[sq] = half[rank][mirrored];
        sq += 1;
    }
    table
};

/// The active input bucket for a king on `sq` (relative to the perspective's
/// own orientation)
#[inline]
pub(crate) const fn input_bucket(sq: usize) -> usize {
    INPUT_BUCKET_LAYOUT[sq]
}

/// Whether a king on `sq` mirrors the board horizontally
#[inline]
pub(crate) const fn mirrors(sq: usize) -> bool {
    sq % 8 >= 4
}

/// Perspective orientation: White sees the board flipped vertically, Black
/// sees it as stored. Each perspective's own back rank maps to rank 8.
#[inline]
pub(crate) fn orient(perspective: Color, sq: Square) -> Square {
    match perspective {
        Color::White => sq.flip_vertical(),
        Color::Black => sq,
    }
}

/// Does a king move from `old_sq` to `new_sq` force a full accumulator
/// refresh for `perspective`? True when the input bucket or the mirror half
/// changes.
#[inline]
pub(crate) fn needs_refresh(perspective: Color, old_sq: Square, new_sq: Square) -> bool {
    let old = orient(perspective, old_sq).as_index();
    let new = orient(perspective, new_sq).as_index();
    input_bucket(old) != input_bucket(new) || mirrors(old) != mirrors(new)
}
