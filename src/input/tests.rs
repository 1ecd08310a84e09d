#[cfg(test)]
mod units {
    use crate::app::Application;
    use crate::arch::Arbitration;
    use crate::config::Config;
    use crate::input::{TokenReader, parse_input};
    use crate::optimize::{MethodKind, Objective};

    const STG_MODEL: &str = "
architecture
processing_element_list 2
processing_element
  freq 1000
  send_cost 0 0.0
  copy_cost 0 0.0
  performance_factor 1.0
  area 1e-6
end_processing_element
processing_element
  freq 2000
  performance_factor 2.0
  area 2e-6
end_processing_element
interconnect_list 1
interconnect 1000 1e-6 32 0
  arbitration priority
end_interconnect

tasks
task_list 3
task 0 out 1 8 2 1 2 weight 1000
task 1 out 1 4 1 2 weight 2000
task 2 out 0 weight 500
default_mapping 0
mapping_list 1 map 1 1
static_list 1 2

optimization
objective_function execution_time
method brute_force

mapping_list 1 map 0 1
";

    #[test]
    fn parses_a_complete_stg_model() {
        let mut reader = TokenReader::from_text(STG_MODEL);
        let (map, spec) = parse_input(&mut reader, &Config::default()).unwrap();

        assert_eq!(map.arch.npes(), 2);
        assert_eq!(map.arch.pes[1].freq, 2000);
        assert_eq!(map.arch.pes[1].performance_factor, 2.0);
        assert_eq!(map.arch.ics[0].policy, Arbitration::Priority);

        assert_eq!(map.ntasks(), 3);
        // default 0, explicit map 1 -> 1, trailing map 0 -> 1
        assert_eq!(map.mappings, vec![1, 1, 0]);
        assert_eq!(map.is_static, vec![false, false, true]);

        let Application::Stg(graph) = &*map.app else {
            panic!("expected a task graph");
        };
        assert_eq!(graph.tasks[0].out_peers, vec![1, 2]);
        assert_eq!(graph.tasks[2].n_result_inputs, 2);

        assert_eq!(spec.objective, Objective::ExecutionTime);
        assert!(matches!(spec.method, MethodKind::BruteForce { flags: 1 }));
    }

    #[test]
    fn arbitration_override_applies_to_every_interconnect() {
        let config = Config {
            arbitration_policy: Some("lifo".to_owned()),
            ..Config::default()
        };
        let mut reader = TokenReader::from_text(STG_MODEL);
        let (map, _) = parse_input(&mut reader, &config).unwrap();
        assert_eq!(map.arch.ics[0].policy, Arbitration::Lifo);
    }

    #[test]
    fn ic_priority_digits_override_pe_priorities() {
        let config = Config {
            ic_priorities: Some("21".to_owned()),
            ..Config::default()
        };
        let mut reader = TokenReader::from_text(STG_MODEL);
        let (map, _) = parse_input(&mut reader, &config).unwrap();
        assert_eq!(map.ic_priorities, vec![2, 1]);
    }

    const KPN_MODEL: &str = "
architecture
processing_element_list 2
processing_element freq 100 end_processing_element
processing_element freq 100 end_processing_element
interconnect_list 1
interconnect 100 1e-6 32 0 end_interconnect

tasks
kpn
process 0 3 c 100 w 1 4 c 1
process 1 2 r 0 c 100
end_kpn
default_mapping 0
mapping_list 1 map 1 1
static_list 0

optimization
objective_function execution_time_power k 2.0
method simulated_annealing_autotemp
max_rejects -1
schedule_max -1
T0 1.0
Tf 0.001
acceptor exponential
schedule geometric 0.95
heuristics rm
zero_transition_prob 0.3
end_simulated_annealing
";

    #[test]
    fn parses_a_kpn_model_with_annealing_parameters() {
        let mut reader = TokenReader::from_text(KPN_MODEL);
        let (map, spec) = parse_input(&mut reader, &Config::default()).unwrap();

        let Application::Kpn(net) = &*map.app else {
            panic!("expected a process network");
        };
        assert_eq!(net.nprocesses(), 2);
        assert_eq!(net.ninsts(), 5);
        assert_eq!(map.mappings, vec![0, 1]);

        assert_eq!(spec.objective, Objective::ExecutionTimePower { k: 2.0 });
        let MethodKind::SimulatedAnnealing(params) = &spec.method else {
            panic!("expected simulated annealing");
        };
        assert_eq!(params.autotemp, 1);
        assert_eq!(params.max_rejects, -1);
        assert_eq!(params.zero_transition_prob, 0.3);
        assert_eq!(params.schedule_param1, 0.95);
    }

    #[test]
    fn section_order_is_free() {
        let reordered = "
optimization
objective_function execution_time
method group_migration

architecture
processing_element_list 1
processing_element freq 1000 end_processing_element
interconnect_list 0

tasks
task_list 1
task 0 out 0 weight 100
default_mapping 0
mapping_list 0
static_list 0
";
        let mut reader = TokenReader::from_text(reordered);
        let (map, spec) = parse_input(&mut reader, &Config::default()).unwrap();
        assert_eq!(map.arch.nics(), 0);
        assert!(matches!(
            spec.method,
            MethodKind::GroupMigration { randomize: false }
        ));
    }

    #[test]
    fn unknown_method_is_fatal() {
        let model = STG_MODEL.replace("method brute_force", "method hill_climbing");
        let mut reader = TokenReader::from_text(&model);
        let error = parse_input(&mut reader, &Config::default()).unwrap_err();
        assert!(error.to_string().contains("invalid optimization method"));
    }

    #[test]
    fn missing_sa_parameters_are_fatal() {
        let model = KPN_MODEL.replace("max_rejects -1\n", "");
        let mut reader = TokenReader::from_text(&model);
        let error = parse_input(&mut reader, &Config::default()).unwrap_err();
        assert!(error.to_string().contains("incomplete"));
    }

    #[test]
    fn out_of_order_task_ids_are_fatal() {
        let model = STG_MODEL.replace("task 1 out", "task 2 out");
        let mut reader = TokenReader::from_text(&model);
        assert!(parse_input(&mut reader, &Config::default()).is_err());
    }

    #[test]
    fn task_reference_outside_the_graph_is_fatal() {
        let model = STG_MODEL.replace("task 1 out 1 4 1 2", "task 1 out 1 4 1 7");
        let mut reader = TokenReader::from_text(&model);
        let error = parse_input(&mut reader, &Config::default()).unwrap_err();
        assert!(error.to_string().contains("unknown task"));
    }

    #[test]
    fn asymmetric_interconnects_are_fatal() {
        let model = STG_MODEL.replace(
            "interconnect_list 1\ninterconnect 1000 1e-6 32 0",
            "interconnect_list 2\ninterconnect 1000 1e-6 32 0 end_interconnect\ninterconnect 1000 1e-6 16 0",
        );
        let mut reader = TokenReader::from_text(&model);
        let error = parse_input(&mut reader, &Config::default()).unwrap_err();
        assert!(error.to_string().contains("not same as IC 0"));
    }

    #[test]
    fn mapping_to_unknown_pe_is_fatal() {
        let model = STG_MODEL.replace("mapping_list 1 map 1 1\nstatic_list 1 2", "mapping_list 1 map 1 9\nstatic_list 1 2");
        let mut reader = TokenReader::from_text(&model);
        let error = parse_input(&mut reader, &Config::default()).unwrap_err();
        assert!(error.to_string().contains("unknown PE"));
    }
}
