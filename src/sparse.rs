//! Sparse position sets over a large universe.
//!
//! Both halves of the start index and the BP-Mono width table need the same
//! primitive: a strictly increasing set of positions supporting select (the
//! `k`-th position) and rank (how many positions precede a bound). The
//! positions are kept in an Elias–Fano dictionary; select is the
//! dictionary's indexed access and rank is a binary search over it, the
//! usual bound for sparse bit vectors.

use sux::bits::{BitFieldVec, BitVec};
use sux::dict::{EliasFano, EliasFanoBuilder};
use sux::rank_sel::SelectAdaptConst;
use sux::traits::IndexedSeq;

use crate::bitpack::bit_width;

type Ef = EliasFano<SelectAdaptConst<BitVec<Box<[usize]>>, Box<[usize]>, 12, 3>, BitFieldVec<usize, Box<[usize]>>>;

/// A strictly increasing set of positions in `[0, universe)`.
#[derive(Debug)]
pub(crate) struct SparseSet {
    ef: Ef,
    len: usize,
    universe: usize,
}

impl SparseSet {
    /// Builds the set from strictly increasing positions.
    pub fn new(positions: &[usize], universe: usize) -> Self {
        debug_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(positions.last().map_or(true, |&p| p < universe));
        let mut builder = EliasFanoBuilder::new(positions.len(), universe);
        for &position in positions {
            builder.push(position);
        }
        let ef: Ef = unsafe { builder.build().map_high_bits(SelectAdaptConst::new) };
        Self {
            ef,
            len: positions.len(),
            universe,
        }
    }

    /// The `k`-th position; `select_1(k + 1)` in rank/select terms.
    #[inline]
    pub fn position(&self, k: usize) -> usize {
        self.ef.get(k)
    }

    /// Number of positions strictly below `bound`; `rank_1(bound)`.
    pub fn rank(&self, bound: usize) -> usize {
        let mut lo = 0;
        let mut hi = self.len;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.ef.get(mid) < bound {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Index and value of the last position at or before `pos`, if any.
    pub fn predecessor(&self, pos: usize) -> Option<(usize, usize)> {
        match self.rank(pos + 1) {
            0 => None,
            rank => Some((rank - 1, self.position(rank - 1))),
        }
    }

    /// Heap footprint in bytes, from the Elias–Fano bound of
    /// `2 + floor(log2(universe / len))` bits per position.
    pub fn mem_size(&self) -> usize {
        if self.len == 0 {
            return 0;
        }
        let low_bits = bit_width((self.universe / self.len) as u64) - 1;
        (self.len * (low_bits + 2) + 7) / 8
    }
}
