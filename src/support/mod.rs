//! # Support Module - Search Structures and Randomness
//!
//! Shared building blocks for the evaluators and the optimization methods:
//!
//! - [`MaxHeap`]: a binary max-heap over an explicit comparator function,
//!   used for event queues, per-PE ready queues and the interconnect send
//!   queue. Event queues invert the time comparison so that `extract_max`
//!   yields the earliest event.
//! - [`Permutation`]: a lexicographic permutation iterator over `[0, n)`,
//!   used by the brute-force scheduler to walk all task-priority orders.
//! - [`RandomSource`]: the single uniform random source every component
//!   draws from. Two runs with the same seed and the same input produce
//!   identical results.

// Unit tests
pub mod tests;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;

/// Binary max-heap with an explicit comparator.
///
/// The comparator decides which element is "greater"; `extract_max` always
/// returns the greatest element currently stored. Elements that compare
/// equal are returned in an unspecified but deterministic order.
pub struct MaxHeap<T> {
    compare: fn(&T, &T) -> Ordering,
    items: Vec<T>,
}

impl<T> MaxHeap<T> {
    pub fn new(compare: fn(&T, &T) -> Ordering) -> Self {
        MaxHeap {
            compare,
            items: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops all elements but keeps the allocation.
    pub fn flush(&mut self) {
        self.items.clear();
    }

    /// Inserts an element, sifting it up to its heap position.
    pub fn insert(&mut self, item: T) {
        self.items.push(item);
        let mut x = self.items.len() - 1;
        while x > 0 {
            let parent = (x - 1) / 2;
            if (self.compare)(&self.items[parent], &self.items[x]) == Ordering::Less {
                self.items.swap(parent, x);
                x = parent;
            } else {
                break;
            }
        }
    }

    /// Removes and returns the greatest element.
    ///
    /// # Panics
    ///
    /// Panics if the heap is empty.
    pub fn extract_max(&mut self) -> T {
        assert!(!self.items.is_empty(), "extract_max on an empty heap");
        let last = self.items.len() - 1;
        self.items.swap(0, last);
        let result = self.items.pop().unwrap();
        self.sift_down(0);
        result
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.first()
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.items.len();
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut largest = i;
            if left < n && (self.compare)(&self.items[left], &self.items[largest]) == Ordering::Greater
            {
                largest = left;
            }
            if right < n
                && (self.compare)(&self.items[right], &self.items[largest]) == Ordering::Greater
            {
                largest = right;
            }
            if largest == i {
                break;
            }
            self.items.swap(i, largest);
            i = largest;
        }
    }
}

/// Lexicographic permutation iterator over `[0, n)`.
///
/// Starts at the identity permutation. `next` advances to the following
/// permutation and returns `false` once all `n!` permutations have been
/// visited, leaving the iterator ready to be `reset`.
pub struct Permutation {
    n: usize,
    permutation: Vec<usize>,
    pivots: Vec<usize>,
    tmp: Vec<usize>,
}

impl Permutation {
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "permutation over an empty set");
        let mut p = Permutation {
            n,
            permutation: Vec::with_capacity(n),
            pivots: vec![0; n],
            tmp: Vec::with_capacity(n),
        };
        p.reset();
        p
    }

    pub fn current(&self) -> &[usize] {
        &self.permutation
    }

    /// Restarts from the identity permutation.
    pub fn reset(&mut self) {
        self.permutation.clear();
        self.permutation.extend(0..self.n);
        self.pivots.iter_mut().for_each(|p| *p = 0);
    }

    /// Advances to the next permutation. Returns `false` when the sequence
    /// is exhausted.
    pub fn next(&mut self) -> bool {
        let n = self.n;
        let mut i = n - 1;
        self.pivots[i] = 1;

        loop {
            let choices = n - i;
            if self.pivots[i] == choices {
                if i == 0 {
                    return false;
                }
                i -= 1;
                self.pivots[i] += 1;
                for p in &mut self.pivots[i + 1..] {
                    *p = 0;
                }
                continue;
            }
            break;
        }

        self.tmp.clear();
        self.tmp.extend(0..n);

        for i in 0..n {
            let pivot = self.pivots[i];
            self.permutation[i] = self.tmp[pivot];
            if i == n - 1 {
                break;
            }
            // Shift out the consumed value
            self.tmp.remove(pivot);
        }

        true
    }
}

/// The shared uniform random source.
///
/// Wraps a seedable generator so that a run can be made reproducible with an
/// explicit seed. All randomized behavior in the simulators and the search
/// methods goes through this type.
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    /// Seeds from operating-system entropy.
    pub fn from_entropy() -> Self {
        RandomSource {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Seeds deterministically for reproducible runs and tests.
    pub fn seeded(seed: u64) -> Self {
        RandomSource {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns an integer in `[a, b)`.
    pub fn rand_int(&mut self, a: usize, b: usize) -> usize {
        assert!(a < b);
        self.rng.random_range(a..b)
    }

    /// Returns a double in `[a, b)`.
    pub fn rand_double(&mut self, a: f64, b: f64) -> f64 {
        assert!(a < b);
        self.rng.random_range(a..b)
    }

    /// Draws `n` distinct integers uniformly from `[0, maximum)` by partial
    /// Fisher-Yates over a lottery array.
    pub fn random_cards(&mut self, n: usize, maximum: usize) -> Vec<usize> {
        assert!(maximum > 0);
        assert!(n > 0 && n <= maximum);

        let mut lottery: Vec<usize> = (0..maximum).collect();
        let mut cards = Vec::with_capacity(n);
        let mut left = maximum;

        for _ in 0..n {
            let i = self.rand_int(0, left);
            cards.push(lottery[i]);
            lottery[i] = lottery[left - 1];
            left -= 1;
        }

        cards
    }
}
