#[cfg(test)]
mod units {
    use crate::app::Application;
    use crate::app::stg::{TaskGraph, TaskResult};
    use crate::arch::{Arbitration, Architecture, Interconnect, Pe};
    use crate::mapping::Mapping;
    use crate::support::RandomSource;
    use std::rc::Rc;

    fn test_arch(npes: usize) -> Rc<Architecture> {
        let pes = (0..npes)
            .map(|id| Pe {
                id,
                freq: 1000,
                send_latency: 0,
                per_byte_send_cost: 0.0,
                copy_latency: 0,
                per_byte_copy_cost: 0.0,
                performance_factor: 1.0,
                area: 1e-6,
                ic_initial_priority: 0,
            })
            .collect();
        Rc::new(Architecture {
            pes,
            ics: vec![Interconnect {
                id: 0,
                freq: 1000,
                area: 1e-6,
                width: 32,
                latency: 0,
                policy: Arbitration::Fifo,
            }],
        })
    }

    fn chain(ntasks: usize) -> TaskGraph {
        let raw = (0..ntasks)
            .map(|id| {
                let results = if id + 1 < ntasks {
                    vec![TaskResult {
                        bytes: 8,
                        dsts: vec![id + 1],
                    }]
                } else {
                    vec![]
                };
                (1000.0, results)
            })
            .collect();
        TaskGraph::new(raw)
    }

    fn test_mapping(ntasks: usize, npes: usize) -> Mapping {
        Mapping::new(test_arch(npes), Rc::new(Application::Stg(chain(ntasks))), 0)
    }

    #[test]
    fn new_mapping_uses_the_default_pe() {
        let map = test_mapping(4, 3);
        assert_eq!(map.mappings, vec![0, 0, 0, 0]);
        assert!(map.is_static.iter().all(|&s| !s));
        assert!(map.task_priorities.is_none());
    }

    #[test]
    fn set_mapping_respects_static_tasks() {
        let mut map = test_mapping(3, 2);
        map.is_static[1] = true;

        assert_eq!(map.set_mapping(0, 1), 1);
        assert_eq!(map.set_mapping(1, 1), 0, "static task must not move");
        assert_eq!(map.mappings, vec![1, 0, 0]);
    }

    #[test]
    fn fork_is_independent_of_the_original() {
        let mut map = test_mapping(3, 2);
        map.set_mapping(0, 1);

        let fork = map.fork();
        map.set_mapping(1, 1);

        assert_eq!(fork.mappings, vec![1, 0, 0]);
        assert_eq!(map.mappings, vec![1, 1, 0]);
        assert!(Rc::ptr_eq(&map.arch, &fork.arch));
        assert!(Rc::ptr_eq(&map.app, &fork.app));
    }

    #[test]
    fn copy_from_round_trips() {
        let mut a = test_mapping(3, 2);
        let mut b = test_mapping(3, 2);
        a.set_mapping(0, 1);
        a.set_task_priority(2, 7.0);
        b.set_mapping(2, 1);

        let a_saved = a.mappings.clone();
        let b_saved = b.mappings.clone();

        let backup = a.fork();
        a.copy_from(&b);
        assert_eq!(a.mappings, b_saved);
        assert!(a.task_priorities.is_none());

        a.copy_from(&backup);
        assert_eq!(a.mappings, a_saved);
        assert_eq!(a.task_priorities.as_deref(), Some(&[0.0, 0.0, 7.0][..]));
    }

    #[test]
    fn randomize_n_task_mappings_moves_to_a_different_pe() {
        let mut map = test_mapping(1, 4);
        let mut rng = RandomSource::seeded(9);

        for _ in 0..100 {
            let before = map.mappings[0];
            map.randomize_n_task_mappings(1, 4, &mut rng);
            assert_ne!(map.mappings[0], before);
        }
    }

    #[test]
    fn randomize_n_task_mappings_honors_the_pe_limit() {
        let mut map = test_mapping(8, 4);
        let mut rng = RandomSource::seeded(9);

        for _ in 0..200 {
            map.randomize_n_task_mappings(2, 2, &mut rng);
        }
        assert!(map.mappings.iter().all(|&pe| pe < 2));
    }

    #[test]
    fn randomize_with_one_pe_is_a_no_op() {
        let mut map = test_mapping(3, 1);
        let mut rng = RandomSource::seeded(9);
        map.randomize_n_task_mappings(5, 1, &mut rng);
        assert_eq!(map.mappings, vec![0, 0, 0]);
    }

    #[test]
    fn randomize_task_priorities_is_a_permutation() {
        let mut map = test_mapping(6, 2);
        let mut rng = RandomSource::seeded(17);
        map.randomize_task_priorities(&mut rng);

        let mut priorities: Vec<f64> = map.task_priorities.clone().unwrap();
        priorities.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(priorities, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn total_mappings_excludes_static_tasks() {
        let mut map = test_mapping(4, 3);
        assert_eq!(map.total_mappings(), 81.0);

        map.is_static[0] = true;
        assert_eq!(map.total_mappings(), 27.0);
    }

    #[test]
    fn total_schedules_is_a_factorial() {
        let map = test_mapping(4, 2);
        assert_eq!(map.total_schedules(), 24.0);
    }

    #[test]
    fn specific_communication_time_is_zero_on_the_same_pe() {
        let mut map = test_mapping(2, 2);
        assert_eq!(map.specific_communication_time(0, 0, 1), 0.0);

        map.set_mapping(1, 1);
        // 8 bytes = 64 bits = 2 cycles on a 32-bit bus at 1 kHz
        assert!((map.specific_communication_time(0, 0, 1) - 0.002).abs() < 1e-12);
    }

    #[test]
    fn balance_line_counts_task_shares() {
        let mut map = test_mapping(4, 2);
        map.set_mapping(0, 1);
        map.set_mapping(1, 1);
        assert_eq!(map.balance_line(), "balance: 0.500 0.500");
    }
}
