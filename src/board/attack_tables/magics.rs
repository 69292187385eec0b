//! Magic bitboard tables for sliding piece attacks.
//!
//! Each square gets a "magic" multiplier that perfect-hashes every possible
//! blocker arrangement on its relevant rays into a dense attack table. The
//! magics are found once at startup by seeded random search; with a fixed
//! seed the search is deterministic and completes in a few milliseconds.

use once_cell::sync::Lazy;
use rand::prelude::*;

const BISHOP_DIRECTIONS: [(isize, isize); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ROOK_DIRECTIONS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

struct MagicEntry {
    mask: u64,
    magic: u64,
    shift: u32,
    offset: usize,
}

pub(crate) struct SliderTable {
    entries: Vec<MagicEntry>,
    attacks: Vec<u64>,
}

impl SliderTable {
    #[inline]
    pub(crate) fn lookup(&self, square: usize, occupancy: u64) -> u64 {
        let entry = &self.entries[square];
        let idx = ((occupancy & entry.mask).wrapping_mul(entry.magic) >> entry.shift) as usize;
        self.attacks[entry.offset + idx]
    }
}

/// Walk the given rays from `square`, stopping at (and including) blockers.
fn ray_attacks(square: usize, occupancy: u64, directions: &[(isize, isize); 4]) -> u64 {
    let rank = (square / 8) as isize;
    let file = (square % 8) as isize;
    let mut attacks = 0u64;
    for (dr, df) in directions {
        let mut r = rank + dr;
        let mut f = file + df;
        while (0..8).contains(&r) && (0..8).contains(&f) {
            let bit = 1u64 << (r * 8 + f);
            attacks |= bit;
            if occupancy & bit != 0 {
                break;
            }
            r += dr;
            f += df;
        }
    }
    attacks
}

/// Relevant-occupancy mask: the rays without their edge squares. Blockers on
/// the edge never change the attack set.
fn relevant_mask(square: usize, directions: &[(isize, isize); 4]) -> u64 {
    let rank = (square / 8) as isize;
    let file = (square % 8) as isize;
    let mut mask = 0u64;
    for (dr, df) in directions {
        let mut r = rank + dr;
        let mut f = file + df;
        while (0..8).contains(&(r + dr)) && (0..8).contains(&(f + df)) {
            mask |= 1u64 << (r * 8 + f);
            r += dr;
            f += df;
        }
    }
    mask
}

/// Enumerate every subset of `mask` (the carry-rippler walk).
fn subsets(mask: u64) -> Vec<u64> {
    let mut result = Vec::with_capacity(1 << mask.count_ones());
    let mut subset = 0u64;
    loop {
        result.push(subset);
        subset = subset.wrapping_sub(mask) & mask;
        if subset == 0 {
            break;
        }
    }
    result
}

/// Find a collision-free magic for one square by random trials.
fn find_magic(
    square: usize,
    directions: &[(isize, isize); 4],
    rng: &mut StdRng,
) -> (MagicEntry, Vec<u64>) {
    let mask = relevant_mask(square, directions);
    let bits = mask.count_ones();
    let shift = 64 - bits;
    let size = 1usize << bits;

    let occupancies = subsets(mask);
    let reference: Vec<u64> = occupancies
        .iter()
        .map(|&occ| ray_attacks(square, occ, directions))
        .collect();

    let mut table = vec![0u64; size];
    loop {
        // Sparse candidates converge much faster than uniform ones
        let magic = rng.gen::<u64>() & rng.gen::<u64>() & rng.gen::<u64>();
        if (mask.wrapping_mul(magic) >> 56).count_ones() < 6 {
            continue;
        }

        table.iter_mut().for_each(|slot| *slot = 0);
        let mut collision = false;
        for (i, &occ) in occupancies.iter().enumerate() {
            let idx = (occ.wrapping_mul(magic) >> shift) as usize;
            if table[idx] == 0 {
                table[idx] = reference[i];
            } else if table[idx] != reference[i] {
                collision = true;
                break;
            }
        }

        if !collision {
            return (
                MagicEntry {
                    mask,
                    magic,
                    shift,
                    offset: 0,
                },
                table,
            );
        }
    }
}

fn build_table(directions: &[(isize, isize); 4], seed: u64) -> SliderTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut entries = Vec::with_capacity(64);
    let mut attacks = Vec::new();
    for square in 0..64 {
        let (mut entry, table) = find_magic(square, directions, &mut rng);
        entry.offset = attacks.len();
        attacks.extend_from_slice(&table);
        entries.push(entry);
    }
    SliderTable { entries, attacks }
}

pub(crate) static BISHOP_TABLE: Lazy<SliderTable> =
    Lazy::new(|| build_table(&BISHOP_DIRECTIONS, 0x5ca1ab1e));

pub(crate) static ROOK_TABLE: Lazy<SliderTable> =
    Lazy::new(|| build_table(&ROOK_DIRECTIONS, 0xdeadbeef));
