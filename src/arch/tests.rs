#[cfg(test)]
mod units {
    use crate::arch::{Arbitration, Architecture, Interconnect, Pe};

    pub fn plain_pe(id: usize, freq: i64) -> Pe {
        Pe {
            id,
            freq,
            send_latency: 0,
            per_byte_send_cost: 0.0,
            copy_latency: 0,
            per_byte_copy_cost: 0.0,
            performance_factor: 1.0,
            area: 1e-6,
            ic_initial_priority: 0,
        }
    }

    #[test]
    fn computation_time_scales_with_performance_factor() {
        let mut pe = plain_pe(0, 1000);
        assert_eq!(pe.computation_time(1000.0), 1.0);

        pe.performance_factor = 2.0;
        assert_eq!(pe.computation_time(1000.0), 0.5);
    }

    #[test]
    fn copy_and_send_costs_round_up_fractional_cycles() {
        let pe = Pe {
            per_byte_send_cost: 0.5,
            per_byte_copy_cost: 0.25,
            send_latency: 2,
            copy_latency: 1,
            ..plain_pe(0, 1000)
        };

        // 2 + ceil(0.5 * 3) = 4
        assert_eq!(pe.send_cost(3), 4);
        // 1 + ceil(0.25 * 3) = 2
        assert_eq!(pe.copy_cost(3), 2);
        // Zero bytes cost only the fixed latency
        assert_eq!(pe.send_cost(0), 2);
    }

    #[test]
    fn communication_time_rounds_bits_up_to_bus_words() {
        let arch = Architecture {
            pes: vec![plain_pe(0, 1000)],
            ics: vec![Interconnect {
                id: 0,
                freq: 1000,
                area: 1e-6,
                width: 8,
                latency: 0,
                policy: Arbitration::Fifo,
            }],
        };

        // 8 bytes = 64 bits = 8 cycles on an 8-bit bus
        assert!((arch.communication_time(0, 8) - 0.008).abs() < 1e-12);
        // 1 byte still costs a full cycle
        assert!((arch.communication_time(0, 1) - 0.001).abs() < 1e-12);
    }

    #[test]
    fn arbitration_names_decode() {
        assert_eq!(Arbitration::from_name("fifo"), Some(Arbitration::Fifo));
        assert_eq!(Arbitration::from_name("lifo"), Some(Arbitration::Lifo));
        assert_eq!(Arbitration::from_name("random"), Some(Arbitration::Random));
        assert_eq!(
            Arbitration::from_name("priority"),
            Some(Arbitration::Priority)
        );
        assert_eq!(Arbitration::from_name("bogus"), None);
    }

    #[test]
    fn asymmetric_ics_are_detected() {
        let ic = |id: usize, width: u32| Interconnect {
            id,
            freq: 1000,
            area: 1e-6,
            width,
            latency: 0,
            policy: Arbitration::Fifo,
        };

        let good = Architecture {
            pes: vec![plain_pe(0, 1000)],
            ics: vec![ic(0, 32), ic(1, 32)],
        };
        assert!(good.check_symmetric_ics().is_ok());

        let bad = Architecture {
            pes: vec![plain_pe(0, 1000)],
            ics: vec![ic(0, 32), ic(1, 16)],
        };
        assert_eq!(bad.check_symmetric_ics(), Err(1));
    }
}
