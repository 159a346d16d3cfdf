// tests/property_tests.rs
//
// Property-based tests: architectural primitives, determinism, and the
// pipeline invariants over randomly generated straight-line programs.

use proptest::prelude::*;
use quickcheck::TestResult;
use tomasulo_rust::pipeline::simulator::Simulator;
use tomasulo_rust::processor::memory::Memory;
use tomasulo_rust::processor::registers::RegisterFile;
use tomasulo_rust::ProcessorConfig;

// Property-based tests using proptest

proptest! {
    #[test]
    fn test_memory_read_write_consistency(
        addr in any::<u16>(),
        value in any::<u16>()
    ) {
        let mut memory = Memory::new();
        memory.write(addr, value);
        prop_assert_eq!(memory.read(addr), value);
    }

    #[test]
    fn test_register_operations(
        reg in 1u8..8,
        value in any::<u16>()
    ) {
        let mut registers = RegisterFile::new();

        // Register 0 should always be 0
        registers.write(0, value);
        prop_assert_eq!(registers.read(0), 0);

        // Other registers should store values correctly
        registers.write(reg, value);
        prop_assert_eq!(registers.read(reg), value);
    }

    #[test]
    fn test_add_commutative_through_pipeline(
        a in any::<u16>(),
        b in any::<u16>()
    ) {
        let source = "ADD R3, R1, R2\n";
        let config = ProcessorConfig::default();

        let mut sim1 = Simulator::from_source(source, config.clone()).unwrap();
        sim1.registers.write(1, a);
        sim1.registers.write(2, b);
        sim1.run().unwrap();

        let mut sim2 = Simulator::from_source(source, config).unwrap();
        sim2.registers.write(1, b);
        sim2.registers.write(2, a);
        sim2.run().unwrap();

        prop_assert_eq!(sim1.registers.read(3), sim2.registers.read(3));
    }

    #[test]
    fn test_random_straight_line_program_invariants(
        ops in prop::collection::vec(0u8..4, 1..12),
        seeds in prop::collection::vec(any::<u16>(), 7)
    ) {
        // Straight-line arithmetic over R1..R7 always terminates well under
        // the watchdog; the structural invariants must hold every cycle.
        let mut source = String::new();
        for (i, op) in ops.iter().enumerate() {
            let ra = 1 + (i % 7);
            let rb = 1 + ((i + 2) % 7);
            let rc = 1 + ((i + 4) % 7);
            let line = match op {
                0 => format!("ADD R{}, R{}, R{}\n", ra, rb, rc),
                1 => format!("SUB R{}, R{}, R{}\n", ra, rb, rc),
                2 => format!("NAND R{}, R{}, R{}\n", ra, rb, rc),
                _ => format!("MUL R{}, R{}, R{}\n", ra, rb, rc),
            };
            source.push_str(&line);
        }

        let mut simulator = Simulator::from_source(&source, ProcessorConfig::default()).unwrap();
        for (reg, value) in seeds.iter().enumerate() {
            simulator.registers.write(reg as u8 + 1, *value);
        }

        let mut cycles = 0;
        while !simulator.is_complete() && cycles < 1000 {
            let snapshot = simulator.step_cycle();
            prop_assert!(simulator.verify_invariants().is_ok());
            // At most one broadcast is observable per cycle by construction;
            // the stage records must stay ordered
            for state in &snapshot.instructions {
                let t = state.timing;
                if let (Some(issue), Some(start)) = (t.issue, t.start_exec) {
                    prop_assert!(issue <= start);
                }
                if let (Some(start), Some(finish)) = (t.start_exec, t.finish_exec) {
                    prop_assert!(start <= finish);
                }
                if let (Some(finish), Some(write)) = (t.finish_exec, t.write) {
                    prop_assert!(finish <= write);
                }
                if let (Some(write), Some(commit)) = (t.write, t.commit) {
                    prop_assert!(write < commit);
                }
            }
            cycles += 1;
        }
        prop_assert!(simulator.is_complete());

        // Determinism: a second simulator over the same program and seeds
        // produces the identical final state
        let mut again = Simulator::from_source(&source, ProcessorConfig::default()).unwrap();
        for (reg, value) in seeds.iter().enumerate() {
            again.registers.write(reg as u8 + 1, *value);
        }
        again.run().unwrap();
        prop_assert_eq!(again.registers.contents(), simulator.registers.contents());
        prop_assert_eq!(again.cycle(), simulator.cycle());
    }
}

// QuickCheck-based tests

fn qc_memory_round_trip(addr: u16, value: u16) -> TestResult {
    let mut memory = Memory::new();
    memory.write(addr, value);
    if memory.read(addr) != value {
        return TestResult::failed();
    }
    // Unwritten neighbors stay zero
    let neighbor = addr.wrapping_add(1);
    TestResult::from_bool(memory.read(neighbor) == 0 || neighbor == addr)
}

#[test]
fn test_qc_memory_round_trip() {
    quickcheck::quickcheck(qc_memory_round_trip as fn(u16, u16) -> TestResult);
}

fn qc_pipeline_add_matches_wrapping_add(a: u16, b: u16) -> TestResult {
    let mut simulator =
        Simulator::from_source("ADD R3, R1, R2\n", ProcessorConfig::default()).unwrap();
    simulator.registers.write(1, a);
    simulator.registers.write(2, b);
    if simulator.run().is_err() {
        return TestResult::failed();
    }
    TestResult::from_bool(simulator.registers.read(3) == a.wrapping_add(b))
}

#[test]
fn test_qc_pipeline_add_matches_wrapping_add() {
    quickcheck::quickcheck(qc_pipeline_add_matches_wrapping_add as fn(u16, u16) -> TestResult);
}

fn qc_pipeline_mul_keeps_low_bits(a: u16, b: u16) -> TestResult {
    let mut simulator =
        Simulator::from_source("MUL R3, R1, R2\n", ProcessorConfig::default()).unwrap();
    simulator.registers.write(1, a);
    simulator.registers.write(2, b);
    if simulator.run().is_err() {
        return TestResult::failed();
    }
    let expected = (a as u32).wrapping_mul(b as u32) as u16;
    TestResult::from_bool(simulator.registers.read(3) == expected)
}

#[test]
fn test_qc_pipeline_mul_keeps_low_bits() {
    quickcheck::quickcheck(qc_pipeline_mul_keeps_low_bits as fn(u16, u16) -> TestResult);
}
