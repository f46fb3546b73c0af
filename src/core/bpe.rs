//! Byte-pair merge engine.
//!
//! Turns one pretoken chunk into ranks by repeatedly merging the adjacent pair
//! whose concatenation has the lowest rank, leftmost pair first on ties, until
//! no adjacent pair forms a known piece.
//!
//! Symbols live in a doubly linked list indexed by their starting byte, and
//! candidate pairs sit in a min-heap keyed by `(rank, start)`. Entries made
//! stale by an earlier merge are skipped when popped, which keeps the whole
//! run at O(n log n) while producing exactly the merges of a full rescan.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::ops::Range;

use rustc_hash::FxHashMap;

use super::encoding::EncodingError;
use super::vocab::Rank;

const NONE: usize = usize::MAX;

/// Encode a chunk into ranks.
///
/// A chunk that is itself a piece maps to its own rank without merging.
/// Fails with [`EncodingError::MissingByteCoverage`] if a byte left unmerged
/// has no single-byte piece.
pub fn byte_pair_encode(
    piece: &[u8],
    ranks: &FxHashMap<Vec<u8>, Rank>,
) -> Result<Vec<Rank>, EncodingError> {
    if piece.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(&rank) = ranks.get(piece) {
        return Ok(vec![rank]);
    }

    byte_pair_merge(piece, ranks)
        .into_iter()
        .map(|part| {
            ranks
                .get(&piece[part.clone()])
                .copied()
                .ok_or(EncodingError::MissingByteCoverage {
                    byte: piece[part.start],
                })
        })
        .collect()
}

/// Split a chunk into the byte ranges left after all merges.
///
/// Every range of length two or more is a known piece; single-byte ranges
/// may not be.
pub fn byte_pair_merge(piece: &[u8], ranks: &FxHashMap<Vec<u8>, Rank>) -> Vec<Range<usize>> {
    merge_counted(piece, ranks).0
}

/// The merge loop, also returning how many merges it applied.
fn merge_counted(piece: &[u8], ranks: &FxHashMap<Vec<u8>, Rank>) -> (Vec<Range<usize>>, usize) {
    let n = piece.len();
    if n < 2 {
        return ((0..n).map(|i| i..i + 1).collect(), 0);
    }

    // Symbol `i` covers piece[i..end[i]] while alive.
    let mut end: Vec<usize> = (1..=n).collect();
    let mut next: Vec<usize> = (1..=n).map(|j| if j == n { NONE } else { j }).collect();
    let mut prev: Vec<usize> = (0..n).map(|i| if i == 0 { NONE } else { i - 1 }).collect();
    let mut alive = vec![true; n];
    let mut generation: Vec<u32> = vec![0; n];

    let pair_rank = |i: usize, end: &[usize], next: &[usize]| -> Option<Rank> {
        let j = next[i];
        if j == NONE {
            return None;
        }
        ranks.get(&piece[i..end[j]]).copied()
    };

    // (rank, left start, left generation, right generation)
    let mut heap: BinaryHeap<Reverse<(Rank, usize, u32, u32)>> = BinaryHeap::with_capacity(n);
    for i in 0..n - 1 {
        if let Some(rank) = pair_rank(i, &end, &next) {
            heap.push(Reverse((rank, i, 0, 0)));
        }
    }

    let mut merges = 0;
    while let Some(Reverse((_, i, gen_i, gen_j))) = heap.pop() {
        if !alive[i] || generation[i] != gen_i {
            continue;
        }
        let j = next[i];
        if j == NONE || generation[j] != gen_j {
            continue;
        }

        // Absorb j into i.
        merges += 1;
        end[i] = end[j];
        alive[j] = false;
        generation[i] += 1;
        let k = next[j];
        next[i] = k;
        if k != NONE {
            prev[k] = i;
        }

        let p = prev[i];
        if p != NONE {
            if let Some(rank) = pair_rank(p, &end, &next) {
                heap.push(Reverse((rank, p, generation[p], generation[i])));
            }
        }
        if k != NONE {
            if let Some(rank) = pair_rank(i, &end, &next) {
                heap.push(Reverse((rank, i, generation[i], generation[k])));
            }
        }
    }

    let mut parts = Vec::new();
    let mut i = 0;
    while i != NONE {
        parts.push(i..end[i]);
        i = next[i];
    }
    (parts, merges)
}
