use crate::models::ScoredCandidate;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::{BinaryHeap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

/// A max-heap holding at most `capacity` of the best (lowest) candidates.
#[derive(Debug, Clone)]
pub struct TopNHeap {
    capacity: usize,
    heap: BinaryHeap<ScoredCandidate>,
}

impl TopNHeap {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1).min(4096)),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Inserts the candidate and evicts the worst one if over capacity.
    /// Returns false when the candidate did not make it into the heap.
    pub fn offer(&mut self, candidate: ScoredCandidate) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.heap.len() >= self.capacity {
            match self.heap.peek() {
                Some(worst) if candidate >= *worst => return false,
                _ => {}
            }
        }

        self.heap.push(candidate);
        if self.heap.len() > self.capacity {
            self.heap.pop();
        }
        true
    }

    /// Score a candidate has to beat to get in; infinite while not full.
    pub fn threshold(&self) -> f32 {
        if self.heap.len() < self.capacity {
            f32::INFINITY
        } else {
            self.heap.peek().map_or(f32::INFINITY, |worst| worst.score)
        }
    }

    /// Drains the heap in ascending order.
    pub fn into_sorted_vec(self) -> Vec<ScoredCandidate> {
        self.heap.into_sorted_vec()
    }
}

/// Ranks `candidate_items` by `score` (lower is better), skipping `ignore_items`.
///
/// `n = None` returns every scoreable candidate; `Some(n)` keeps the `n` best
/// in a bounded heap. Scoring runs on the rayon pool without locks; only the
/// insertion into the shared result is serialized.
pub fn rank<F>(
    score: F,
    n: Option<usize>,
    ignore_items: &HashSet<usize>,
    candidate_items: &[usize],
) -> Vec<ScoredCandidate>
where
    F: Fn(usize) -> f32 + Sync,
{
    match n {
        None => rank_all(score, ignore_items, candidate_items),
        Some(0) => Vec::new(),
        Some(n) => rank_top_n(score, n, ignore_items, candidate_items),
    }
}

/// Exact variant: scores every remaining candidate and sorts.
pub fn rank_all<F>(
    score: F,
    ignore_items: &HashSet<usize>,
    candidate_items: &[usize],
) -> Vec<ScoredCandidate>
where
    F: Fn(usize) -> f32 + Sync,
{
    let scored = Mutex::new(Vec::with_capacity(candidate_items.len()));

    candidate_items
        .par_iter()
        .filter(|&&item_id| !ignore_items.contains(&item_id))
        .for_each(|&item_id| {
            let candidate = ScoredCandidate::new(item_id, score(item_id));
            scored.lock().push(candidate);
        });

    let mut scored = scored.into_inner();
    scored.sort();
    scored
}

/// Bounded variant: keeps the `n` best candidates in a shared heap.
pub fn rank_top_n<F>(
    score: F,
    n: usize,
    ignore_items: &HashSet<usize>,
    candidate_items: &[usize],
) -> Vec<ScoredCandidate>
where
    F: Fn(usize) -> f32 + Sync,
{
    if n == 0 {
        return Vec::new();
    }

    let heap = Mutex::new(TopNHeap::new(n));
    // f32 bits of the current worst retained score, read without the lock
    let threshold = AtomicU32::new(f32::INFINITY.to_bits());

    candidate_items
        .par_iter()
        .filter(|&&item_id| !ignore_items.contains(&item_id))
        .for_each(|&item_id| {
            let candidate = ScoredCandidate::new(item_id, score(item_id));
            // ties with the threshold still go in: the item id decides
            if candidate.score > f32::from_bits(threshold.load(Ordering::Acquire)) {
                return;
            }
            let mut heap = heap.lock();
            if heap.offer(candidate) {
                threshold.store(heap.threshold().to_bits(), Ordering::Release);
            }
        });

    heap.into_inner().into_sorted_vec()
}
