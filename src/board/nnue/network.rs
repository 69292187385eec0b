//! Network weights, file loading and the forward pass.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::{
    input_bucket, mirrors, orient, EVAL_SCALE, FT_SIZE, HL_SIZE, NUM_INPUT_BUCKETS,
    NUM_OUTPUT_BUCKETS, QA, QB,
};
use crate::board::error::NetworkError;
use crate::board::types::{Color, Piece, Square};

/// Total number of feature transformer weight rows across all input buckets
const FT_ROWS: usize = FT_SIZE * NUM_INPUT_BUCKETS;

/// Exact size of a network file in bytes: a flat little-endian i16 stream of
/// FT weights, FT biases, output weights and output biases, no header.
pub const NETWORK_FILE_BYTES: usize =
    2 * (FT_ROWS * HL_SIZE + HL_SIZE + NUM_OUTPUT_BUCKETS * 2 * HL_SIZE + NUM_OUTPUT_BUCKETS);

/// A 64-byte aligned array, so accumulators and weight rows sit on cache
/// line boundaries and the compiler is free to vectorize over them.
#[derive(Clone, Copy)]
#[repr(C, align(64))]
pub struct Aligned<T>(pub T);

/// NNUE network weights
pub struct Network {
    /// Feature transformer weights, one row per (bucket, feature)
    pub(crate) ft_weights: Box<[Aligned<[i16; HL_SIZE]>]>,
    /// Feature transformer biases
    pub(crate) ft_bias: Aligned<[i16; HL_SIZE]>,
    /// Output weights per bucket: side-to-move half first, then the other
    pub(crate) output_weights: Box<[Aligned<[i16; 2 * HL_SIZE]>]>,
    /// Output biases per bucket, widened from the stored i16
    pub(crate) output_bias: [i32; NUM_OUTPUT_BUCKETS],
}

impl Network {
    /// Load a network from a `.bin` file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NetworkError> {
        let file = File::open(path)?;
        let size = file.metadata()?.len() as usize;
        if size != NETWORK_FILE_BYTES {
            return Err(NetworkError::SizeMismatch {
                expected: NETWORK_FILE_BYTES,
                found: size,
            });
        }
        Self::from_reader(&mut BufReader::new(file))
    }

    /// Load a network from an in-memory byte slice
    pub fn from_bytes(data: &[u8]) -> Result<Self, NetworkError> {
        if data.len() != NETWORK_FILE_BYTES {
            return Err(NetworkError::SizeMismatch {
                expected: NETWORK_FILE_BYTES,
                found: data.len(),
            });
        }
        Self::from_reader(&mut std::io::Cursor::new(data))
    }

    fn from_reader<R: Read>(reader: &mut R) -> Result<Self, NetworkError> {
        let mut ft_weights =
            vec![Aligned([0i16; HL_SIZE]); FT_ROWS].into_boxed_slice();
        for row in ft_weights.iter_mut() {
            read_i16_row(reader, &mut row.0)?;
        }

        let mut ft_bias = Aligned([0i16; HL_SIZE]);
        read_i16_row(reader, &mut ft_bias.0)?;

        let mut output_weights =
            vec![Aligned([0i16; 2 * HL_SIZE]); NUM_OUTPUT_BUCKETS].into_boxed_slice();
        for row in output_weights.iter_mut() {
            read_i16_row(reader, &mut row.0)?;
        }

        let mut raw_bias = [0i16; NUM_OUTPUT_BUCKETS];
        read_i16_row(reader, &mut raw_bias)?;
        let mut output_bias = [0i32; NUM_OUTPUT_BUCKETS];
        for (wide, raw) in output_bias.iter_mut().zip(raw_bias) {
            *wide = i32::from(raw);
        }

        Ok(Network {
            ft_weights,
            ft_bias,
            output_weights,
            output_bias,
        })
    }

    /// The feature transformer row for a piece seen from one perspective.
    ///
    /// `king_sq` is the perspective's own king, which picks the input bucket
    /// and the mirror state. By convention the square is flipped vertically
    /// for the White perspective and taken as-is for Black.
    #[inline]
    pub(crate) fn feature_row(
        &self,
        perspective: Color,
        king_sq: Square,
        color: Color,
        piece: Piece,
        sq: Square,
    ) -> &Aligned<[i16; HL_SIZE]> {
        let oriented_king = orient(perspective, king_sq);
        let mut oriented = orient(perspective, sq);
        if mirrors(oriented_king.as_index()) {
            oriented = oriented.flip_horizontal();
        }
        let side = usize::from(color != perspective);
        let feature = (side * 6 + piece.index()) * 64 + oriented.as_index();
        let bucket = input_bucket(oriented_king.as_index());
        &self.ft_weights[bucket * FT_SIZE + feature]
    }

    /// The output bucket for a position with `piece_count` pieces: counts
    /// from 2 to 32 map evenly onto the buckets.
    #[inline]
    pub(crate) fn output_bucket(piece_count: u32) -> usize {
        const DIVISOR: u32 = 32_u32.div_ceil(NUM_OUTPUT_BUCKETS as u32);
        (piece_count.saturating_sub(2) / DIVISOR).min(NUM_OUTPUT_BUCKETS as u32 - 1) as usize
    }

    /// Forward pass over two finished accumulators. `us` is the side to
    /// move's perspective.
    #[must_use]
    pub(crate) fn forward(
        &self,
        us: &Aligned<[i16; HL_SIZE]>,
        them: &Aligned<[i16; HL_SIZE]>,
        bucket: usize,
    ) -> i32 {
        let weights = &self.output_weights[bucket];
        let mut sum = 0i32;
        for (i, &value) in us.0.iter().enumerate() {
            sum += crelu(value) * i32::from(weights.0[i]);
        }
        for (i, &value) in them.0.iter().enumerate() {
            sum += crelu(value) * i32::from(weights.0[HL_SIZE + i]);
        }
        (sum + self.output_bias[bucket]) * EVAL_SCALE / (QA * QB)
    }
}

/// Clipped ReLU into the quantization range
#[inline]
fn crelu(value: i16) -> i32 {
    i32::from(value).clamp(0, QA)
}

fn read_i16_row<R: Read>(reader: &mut R, row: &mut [i16]) -> Result<(), NetworkError> {
    let mut buf = [0u8; 2];
    for value in row.iter_mut() {
        reader.read_exact(&mut buf)?;
        *value = i16::from_le_bytes(buf);
    }
    Ok(())
}

/// Embedded default network (compiled into the binary)
#[cfg(feature = "embedded_nnue")]
static EMBEDDED_NETWORK: &[u8] = include_bytes!("nets/default.bin");

#[cfg(feature = "embedded_nnue")]
impl Network {
    /// Load the network embedded at build time
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_bytes(EMBEDDED_NETWORK).expect("embedded network is invalid")
    }
}
