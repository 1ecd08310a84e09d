#[cfg(test)]
mod units {
    use crate::app::Application;
    use crate::app::stg::{TaskGraph, TaskResult};
    use crate::arch::{Arbitration, Architecture, Interconnect, Pe};
    use crate::config::Config;
    use crate::mapping::Mapping;
    use crate::optimize::brute::{OPT_MAPPING, brute_force};
    use crate::optimize::ga::{GaParams, genetic_algorithm};
    use crate::optimize::gm::group_migration;
    use crate::optimize::moves::{MoveHeuristic, OptState, apply_move};
    use crate::optimize::osm::OsmParams;
    use crate::optimize::osm::optimal_subset_mapping;
    use crate::optimize::premap::fast_premapping;
    use crate::optimize::random::{RandomParams, random_mapping};
    use crate::optimize::sa::{Acceptor, LevelPass, SaParams, anneal, autotemp};
    use crate::optimize::{Objective, OptContext};
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

    /// Two independent two-task chains; parallelizes perfectly over two PEs.
    fn parallel_chains() -> TaskGraph {
        TaskGraph::new(vec![
            (
                1000.0,
                vec![TaskResult {
                    bytes: 4,
                    dsts: vec![2],
                }],
            ),
            (
                1000.0,
                vec![TaskResult {
                    bytes: 4,
                    dsts: vec![3],
                }],
            ),
            (1000.0, vec![]),
            (1000.0, vec![]),
        ])
    }

    fn test_mapping(npes: usize) -> Mapping {
        Mapping::new(
            test_arch(npes),
            Rc::new(Application::Stg(parallel_chains())),
            0,
        )
    }

    fn test_ctx(seed: u64) -> OptContext {
        OptContext::new(
            Objective::ExecutionTime,
            false,
            false,
            RandomSource::seeded(seed),
        )
    }

    #[test]
    fn cost_diff_is_antisymmetric() {
        let ctx = test_ctx(1);
        assert_eq!(ctx.cost_diff(2.0, 3.0), -ctx.cost_diff(3.0, 2.0));
        assert_eq!(ctx.cost_diff(2.0, 2.0), 0.0);
        assert!(ctx.cost_diff(3.0, 2.0) < 0.0, "improvement is negative");
    }

    #[test]
    fn cost_diff_flips_in_maximize_mode() {
        let mut ctx = test_ctx(1);
        ctx.find_maximum = true;
        assert!(ctx.cost_diff(2.0, 3.0) < 0.0, "larger is better");
    }

    #[test]
    fn evaluate_counts_and_traces() {
        let mut map = test_mapping(2);
        let mut ctx = OptContext::new(
            Objective::ExecutionTime,
            false,
            true,
            RandomSource::seeded(2),
        );

        let a = ctx.evaluate(&mut map);
        let b = ctx.evaluate(&mut map);

        assert_eq!(a, b);
        assert_eq!(ctx.evals, 2);
        let trace = ctx.trace.as_ref().unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].objective, a as f32);
    }

    #[test]
    fn power_objective_exceeds_plain_time_weighting() {
        let mut map = test_mapping(2);
        let mut time_ctx = test_ctx(3);
        let time = time_ctx.evaluate(&mut map);

        let mut power_ctx = OptContext::new(
            Objective::ExecutionTimePower { k: 1.0 },
            false,
            false,
            RandomSource::seeded(3),
        );
        let combined = power_ctx.evaluate(&mut map);

        // The energy term is positive, so the combined objective differs
        // from the bare schedule length
        assert!(combined > 0.0);
        assert_ne!(time, combined);
    }

    #[test]
    fn optstate_needs_ten_moves() {
        let mut os = OptState::new(20);
        for i in 0..9 {
            os.append(1.0, 1.0 + i as f64);
        }
        assert!(os.probabilities().is_none());

        os.append(1.0, 0.5);
        let ps = os.probabilities().unwrap();
        assert!((ps.pworse - 0.8).abs() < 1e-12);
        assert!((ps.psame - 0.1).abs() < 1e-12);
        assert!((ps.pbetter - 0.1).abs() < 1e-12);
    }

    #[test]
    fn optstate_ring_overwrites_old_moves() {
        let mut os = OptState::new(10);
        for _ in 0..10 {
            os.append(1.0, 2.0);
        }
        assert!((os.probabilities().unwrap().pworse - 1.0).abs() < 1e-12);

        for _ in 0..10 {
            os.append(1.0, 0.5);
        }
        assert!((os.probabilities().unwrap().pbetter - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rm_move_changes_exactly_one_task() {
        let src = test_mapping(4);
        let mut dst = src.fork();
        let os = OptState::new(20);
        let mut rng = RandomSource::seeded(7);

        for _ in 0..50 {
            apply_move(MoveHeuristic::Rm, &mut dst, &src, 0.5, &os, 4, &mut rng);
            let changed = dst
                .mappings
                .iter()
                .zip(&src.mappings)
                .filter(|(a, b)| a != b)
                .count();
            assert_eq!(changed, 1);
        }
    }

    #[test]
    fn rmdt_move_scales_with_temperature() {
        let src = test_mapping(4);
        let mut dst = src.fork();
        let os = OptState::new(20);
        let mut rng = RandomSource::seeded(7);

        // T = 1.0 moves up to ntasks tasks; at least one must change
        apply_move(MoveHeuristic::Rmdt, &mut dst, &src, 1.0, &os, 4, &mut rng);
        let changed = dst
            .mappings
            .iter()
            .zip(&src.mappings)
            .filter(|(a, b)| a != b)
            .count();
        assert!(changed >= 1);
    }

    #[test]
    fn chain_moves_assign_connected_tasks_to_one_pe() {
        let src = test_mapping(4);
        let mut dst = src.fork();
        let os = OptState::new(20);
        let mut rng = RandomSource::seeded(11);

        for _ in 0..50 {
            apply_move(
                MoveHeuristic::ChainMultiple,
                &mut dst,
                &src,
                0.5,
                &os,
                4,
                &mut rng,
            );
            // Every task that moved moved to the same target PE
            let targets: std::collections::HashSet<usize> = dst
                .mappings
                .iter()
                .zip(&src.mappings)
                .filter(|(a, b)| a != b)
                .map(|(&a, _)| a)
                .collect();
            assert!(targets.len() <= 1);
        }
    }

    #[test]
    fn acceptors_accept_improvements_and_bound_probabilities() {
        let params = SaParams {
            acceptor_param1: 1.0,
            zero_transition_prob: 0.5,
            ..SaParams::default()
        };

        for acceptor in [
            Acceptor::Exponential,
            Acceptor::InverseExponential,
            Acceptor::Special1,
        ] {
            assert!(acceptor.probability(-1.0, 1.0, &params) >= 1.0 - 1e-12);
            for &de in &[0.1, 1.0, 10.0] {
                let p = acceptor.probability(de, 1.0, &params);
                assert!((0.0..=1.0).contains(&p), "{:?} out of range", acceptor);
            }
            // Vanishing divisor must not blow up
            assert_eq!(acceptor.probability(1.0, 1e-20, &params), 0.0);
        }
    }

    #[test]
    fn exponential_acceptor_decays_with_cost() {
        let params = SaParams {
            acceptor_param1: 1.0,
            ..SaParams::default()
        };
        let p1 = Acceptor::Exponential.probability(0.5, 1.0, &params);
        let p2 = Acceptor::Exponential.probability(2.0, 1.0, &params);
        assert!(p1 > p2);
    }

    #[test]
    fn autotemp_produces_a_valid_temperature_range() {
        let map = test_mapping(2);
        let mut params = SaParams::default();
        autotemp(&mut params, &map);

        assert!(params.t0 > 0.0);
        assert!(params.tf > 0.0);
        assert!(params.t0 >= params.tf);
        assert!(params.t0 <= 1.0);
    }

    #[test]
    fn annealing_best_never_worsens() {
        let map = test_mapping(2);
        let mut ctx = test_ctx(23);
        let initial = ctx.evaluate(&mut map.fork());

        let params = SaParams {
            max_rejects: 8,
            schedule_max: 16,
            schedule_param1: 0.9,
            t0: 0.5,
            tf: 0.01,
            ref_e: initial,
            acceptor_param1: initial / 2.0,
            ..SaParams::default()
        };

        let mut best = anneal(LevelPass::Off, &map, params.t0, &params, &mut ctx);
        let best_cost = ctx.evaluate(&mut best);
        assert!(best_cost <= initial + 1e-12);
    }

    #[test]
    fn group_migration_finds_the_parallel_split() {
        let map = test_mapping(2);
        let mut ctx = test_ctx(31);
        let initial = ctx.evaluate(&mut map.fork());

        let mut best = group_migration(&map, false, &mut ctx);
        let best_cost = ctx.evaluate(&mut best);

        // Two independent chains on two PEs halve the serial length
        assert!(best_cost < initial);
        assert!((best_cost - 2.0).abs() < 1e-9);
    }

    #[test]
    fn brute_force_enumerates_the_whole_space() {
        let map = test_mapping(2);
        let mut ctx = test_ctx(37);
        let initial = ctx.evaluate(&mut map.fork());

        let evals_before = ctx.evals;
        let mut best = brute_force(&map, initial, OPT_MAPPING, &mut ctx);

        // 2^4 candidate mappings plus the seed evaluation and our own
        assert_eq!(ctx.evals - evals_before, 16 + 1);
        let best_cost = ctx.evaluate(&mut best);
        assert!((best_cost - 2.0).abs() < 1e-9);
    }

    #[test]
    fn brute_force_respects_static_tasks() {
        let mut map = test_mapping(2);
        map.is_static[0] = true;
        let mut ctx = test_ctx(37);
        let initial = ctx.evaluate(&mut map.fork());

        let evals_before = ctx.evals;
        let best = brute_force(&map, initial, OPT_MAPPING, &mut ctx);

        assert_eq!(ctx.evals - evals_before, 8 + 1);
        assert_eq!(best.mappings[0], 0);
    }

    #[test]
    fn random_mapping_keeps_the_best_candidate() {
        let map = test_mapping(2);
        let mut ctx = test_ctx(41);
        let initial = ctx.evaluate(&mut map.fork());

        let params = RandomParams {
            max_iterations: 64,
            constant: 0.0,
            task_exp: 0.0,
            pe_exp: 0.0,
        };
        let mut best = random_mapping(&map, initial, &params, &mut ctx);
        let best_cost = ctx.evaluate(&mut best);
        assert!(best_cost <= initial + 1e-12);
    }

    #[test]
    fn genetic_algorithm_improves_or_preserves_the_start() {
        let map = test_mapping(2);
        let mut ctx = test_ctx(43);
        let initial = ctx.evaluate(&mut map.fork());

        let params = GaParams {
            max_generations: 10,
            population_size: 8,
            elitism: 1,
            discrimination: 1,
            initial_cost: initial,
            ..GaParams::default()
        };
        let mut best = genetic_algorithm(&map, &params, &mut ctx);
        let best_cost = ctx.evaluate(&mut best);
        assert!(best_cost <= initial + 1e-12);
    }

    #[test]
    fn optimal_subset_mapping_improves_the_parallel_chains() {
        let map = test_mapping(2);
        let mut ctx = test_ctx(47);

        let mut params = OsmParams {
            c: 1.0,
            cn: 1.0,
            cp: 1.0,
            subsetsize: 4,
            subsettries: 0.0,
        };
        params.init(map.ntasks(), map.arch.npes());

        let mut best = optimal_subset_mapping(&map, &params, &mut ctx);
        let best_cost = ctx.evaluate(&mut best);
        assert!((best_cost - 2.0).abs() < 1e-9);
    }

    #[test]
    fn neighborhood_test_never_returns_worse_than_the_start() {
        use crate::optimize::neighborhood::{NtmParams, neighborhood_test_mapping};

        // Four tasks on four PEs give a 12-move neighborhood, enough for
        // the local-search statistics
        let map = test_mapping(4);
        let mut ctx = test_ctx(59);
        let initial = ctx.evaluate(&mut map.fork());

        let params = NtmParams {
            changemax: 2,
            itermax: 8,
        };
        let mut best =
            neighborhood_test_mapping(&map, initial, &params, &Config::default(), &mut ctx);
        let best_cost = ctx.evaluate(&mut best);
        assert!(best_cost <= initial + 1e-12);
    }

    #[test]
    fn kpn_autotemp_produces_a_valid_temperature_range() {
        use crate::app::kpn::{KpnInst, KpnProcess, ProcessNetwork};

        let net = ProcessNetwork {
            processes: vec![
                KpnProcess {
                    id: 0,
                    insts: vec![
                        KpnInst::Compute { amount: 100 },
                        KpnInst::Write { dst: 1, amount: 4 },
                    ],
                },
                KpnProcess {
                    id: 1,
                    insts: vec![KpnInst::Read { src: 0 }, KpnInst::Compute { amount: 500 }],
                },
            ],
        };
        let map = Mapping::new(test_arch(2), Rc::new(Application::Kpn(net)), 0);

        let mut params = SaParams::default();
        autotemp(&mut params, &map);

        assert!(params.t0 > 0.0);
        assert!(params.tf > 0.0);
        assert!(params.t0 >= params.tf);
    }

    #[test]
    fn fast_premapping_keeps_chains_together() {
        let map = test_mapping(3);
        let mut ctx = test_ctx(53);
        let initial = ctx.evaluate(&mut map.fork());

        let premapped = fast_premapping(&map, initial, &mut ctx);

        // Each chain stays on one PE
        assert_eq!(premapped.mappings[0], premapped.mappings[2]);
        assert_eq!(premapped.mappings[1], premapped.mappings[3]);
    }
}
