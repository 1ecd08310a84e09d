#[cfg(test)]
mod units {
    use crate::app::kpn::{KpnInst, KpnProcess, ProcessNetwork};
    use crate::app::stg::{TaskGraph, TaskResult};
    use crate::app::Application;

    /// A fork-join diamond: 0 feeds 1 and 2, which both feed 3.
    pub fn diamond() -> TaskGraph {
        TaskGraph::new(vec![
            (
                1000.0,
                vec![TaskResult {
                    bytes: 8,
                    dsts: vec![1, 2],
                }],
            ),
            (
                2000.0,
                vec![TaskResult {
                    bytes: 4,
                    dsts: vec![3],
                }],
            ),
            (
                3000.0,
                vec![TaskResult {
                    bytes: 4,
                    dsts: vec![3],
                }],
            ),
            (500.0, vec![]),
        ])
    }

    #[test]
    fn derived_parent_lists_invert_child_lists() {
        let graph = diamond();
        assert!(graph.tasks[0].parents.is_empty());
        assert_eq!(graph.tasks[1].parents, vec![0]);
        assert_eq!(graph.tasks[2].parents, vec![0]);
        assert_eq!(graph.tasks[3].parents, vec![1, 2]);
    }

    #[test]
    fn out_peers_are_distinct_with_byte_totals() {
        let graph = TaskGraph::new(vec![
            (
                100.0,
                vec![
                    TaskResult {
                        bytes: 8,
                        dsts: vec![1, 2],
                    },
                    TaskResult {
                        bytes: 16,
                        dsts: vec![1],
                    },
                ],
            ),
            (100.0, vec![]),
            (100.0, vec![]),
        ]);

        assert_eq!(graph.tasks[0].out_peers, vec![1, 2]);
        assert_eq!(graph.tasks[0].out_bytes, vec![24, 8]);
        assert_eq!(graph.send_amount(0, 1), 24);
        assert_eq!(graph.send_amount(0, 2), 8);
    }

    #[test]
    fn incoming_result_references_count_every_listing() {
        let graph = diamond();
        assert_eq!(graph.tasks[0].n_result_inputs, 0);
        assert_eq!(graph.tasks[1].n_result_inputs, 1);
        assert_eq!(graph.tasks[2].n_result_inputs, 1);
        assert_eq!(graph.tasks[3].n_result_inputs, 2);
    }

    #[test]
    fn flat_result_numbering_round_trips() {
        let graph = diamond();
        assert_eq!(graph.nresults(), 3);
        assert_eq!(graph.result_id(0, 0), 0);
        assert_eq!(graph.result_id(2, 0), 2);
        assert_eq!(graph.result_owner[2], 2);
        assert_eq!(graph.result(0).bytes, 8);
        assert_eq!(graph.edges(), 4);
    }

    #[test]
    #[should_panic(expected = "no send found")]
    fn send_amount_panics_without_an_edge() {
        diamond().send_amount(3, 0);
    }

    #[test]
    fn process_network_totals() {
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
                    insts: vec![KpnInst::Read { src: 0 }, KpnInst::Compute { amount: 50 }],
                },
            ],
        };

        assert_eq!(net.ninsts(), 4);
        assert_eq!(net.total_cycles(), 150);
        assert_eq!(net.total_bytes(), 4);
        assert_eq!(net.process_cycles(0), 100.0);
        assert_eq!(net.process_cycles(1), 50.0);
    }

    #[test]
    fn application_dispatch() {
        let app = Application::Stg(diamond());
        assert_eq!(app.name(), "stg");
        assert_eq!(app.ntasks(), 4);
        assert!(app.as_stg().is_some());
        assert!(app.as_kpn().is_none());
    }
}
