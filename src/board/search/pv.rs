//! Triangular principal variation table.

use crate::board::types::{Move, EMPTY_MOVE, MAX_PLY};

/// One row per ply; row `p` holds the best line found from ply `p` to the
/// horizon. Backing up a move prepends it to the child row.
pub(crate) struct PvTable {
    lines: Box<[[Move; MAX_PLY + 1]]>,
    lens: [usize; MAX_PLY + 1],
}

impl PvTable {
    pub(crate) fn new() -> Self {
        PvTable {
            lines: vec![[EMPTY_MOVE; MAX_PLY + 1]; MAX_PLY + 1].into_boxed_slice(),
            lens: [0; MAX_PLY + 1],
        }
    }

    /// Forget the line at this ply (done on node entry)
    pub(crate) fn clear(&mut self, ply: usize) {
        self.lens[ply] = 0;
    }

    /// A new best move at `ply`: the line becomes `mv` followed by the best
    /// line of the child node
    pub(crate) fn update(&mut self, ply: usize, mv: Move) {
        let child_len = if ply + 1 <= MAX_PLY { self.lens[ply + 1] } else { 0 };
        self.lines[ply][0] = mv;
        for i in 0..child_len {
            self.lines[ply][i + 1] = self.lines[ply + 1][i];
        }
        self.lens[ply] = child_len + 1;
    }

    /// The best line from `ply`
    pub(crate) fn line(&self, ply: usize) -> &[Move] {
        &self.lines[ply][..self.lens[ply]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::types::Square;

    fn mv(from: usize, to: usize) -> Move {
        Move::quiet(Square::from_index(from), Square::from_index(to))
    }

    #[test]
    fn test_pv_backup() {
        let mut pv = PvTable::new();
        pv.clear(2);
        pv.update(2, mv(20, 30));
        pv.clear(1);
        pv.update(1, mv(10, 20));
        pv.clear(0);
        pv.update(0, mv(0, 10));
        assert_eq!(pv.line(0), &[mv(0, 10), mv(10, 20), mv(20, 30)]);
    }

    #[test]
    fn test_pv_clear_truncates() {
        let mut pv = PvTable::new();
        pv.clear(1);
        pv.update(1, mv(10, 20));
        pv.clear(0);
        pv.clear(1);
        pv.update(0, mv(0, 10));
        assert_eq!(pv.line(0), &[mv(0, 10)]);
    }
}
