#[cfg(test)]
mod units {
    use crate::support::{MaxHeap, Permutation, RandomSource};
    use std::cmp::Ordering;

    fn compare_i32(a: &i32, b: &i32) -> Ordering {
        a.cmp(b)
    }

    #[test]
    fn heap_returns_elements_in_descending_order() {
        let mut heap = MaxHeap::new(compare_i32);
        for x in [3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5] {
            heap.insert(x);
        }

        let mut drained = Vec::new();
        while !heap.is_empty() {
            drained.push(heap.extract_max());
        }

        let mut expected = vec![3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5];
        expected.sort_by(|a, b| b.cmp(a));
        assert_eq!(drained, expected);
    }

    #[test]
    fn heap_as_min_queue_with_inverted_comparison() {
        fn inverted(a: &f64, b: &f64) -> Ordering {
            b.partial_cmp(a).unwrap()
        }

        let mut heap = MaxHeap::new(inverted);
        for t in [2.5, 0.5, 1.5, 0.25, 3.0] {
            heap.insert(t);
        }

        let mut drained = Vec::new();
        while !heap.is_empty() {
            drained.push(heap.extract_max());
        }
        assert_eq!(drained, vec![0.25, 0.5, 1.5, 2.5, 3.0]);
    }

    #[test]
    fn heap_flush_empties_but_stays_usable() {
        let mut heap = MaxHeap::new(compare_i32);
        heap.insert(1);
        heap.insert(2);
        heap.flush();
        assert!(heap.is_empty());
        heap.insert(7);
        assert_eq!(heap.extract_max(), 7);
    }

    #[test]
    #[should_panic(expected = "extract_max on an empty heap")]
    fn heap_extract_from_empty_panics() {
        let mut heap: MaxHeap<i32> = MaxHeap::new(compare_i32);
        heap.extract_max();
    }

    #[test]
    fn permutation_visits_factorial_many_orders() {
        let mut p = Permutation::new(4);
        let mut seen = std::collections::HashSet::new();
        seen.insert(p.current().to_vec());

        let mut count = 1;
        while p.next() {
            assert!(seen.insert(p.current().to_vec()), "duplicate permutation");
            count += 1;
        }
        assert_eq!(count, 24);
    }

    #[test]
    fn permutation_starts_at_identity_and_resets() {
        let mut p = Permutation::new(3);
        assert_eq!(p.current(), &[0, 1, 2]);

        assert!(p.next());
        assert_eq!(p.current(), &[0, 2, 1]);

        while p.next() {}
        p.reset();
        assert_eq!(p.current(), &[0, 1, 2]);

        // A fresh cycle after reset visits all orders again
        let mut count = 1;
        while p.next() {
            count += 1;
        }
        assert_eq!(count, 6);
    }

    #[test]
    fn rand_int_stays_in_range() {
        let mut rng = RandomSource::seeded(7);
        for _ in 0..1000 {
            let x = rng.rand_int(3, 9);
            assert!((3..9).contains(&x));
        }
    }

    #[test]
    fn rand_double_stays_in_range() {
        let mut rng = RandomSource::seeded(7);
        for _ in 0..1000 {
            let x = rng.rand_double(0.0, 1.0);
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn random_cards_are_distinct_and_in_range() {
        let mut rng = RandomSource::seeded(11);
        for _ in 0..100 {
            let cards = rng.random_cards(5, 12);
            assert_eq!(cards.len(), 5);
            let set: std::collections::HashSet<_> = cards.iter().collect();
            assert_eq!(set.len(), 5);
            assert!(cards.iter().all(|&c| c < 12));
        }
    }

    #[test]
    fn random_cards_full_draw_is_a_permutation() {
        let mut rng = RandomSource::seeded(13);
        let mut cards = rng.random_cards(8, 8);
        cards.sort_unstable();
        assert_eq!(cards, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn seeded_source_is_reproducible() {
        let mut a = RandomSource::seeded(42);
        let mut b = RandomSource::seeded(42);
        for _ in 0..100 {
            assert_eq!(a.rand_int(0, 1000), b.rand_int(0, 1000));
        }
    }
}
