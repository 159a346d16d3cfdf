// tests/edge_cases.rs
//
// Boundary behavior: R0 immutability, the watchdog, invalid RET targets,
// store-to-load ordering, and 16-bit wraparound.

use tomasulo_rust::errors::SimulatorError;
use tomasulo_rust::pipeline::simulator::Simulator;
use tomasulo_rust::ProcessorConfig;

fn setup_simulator(source: &str, memory: &[(u16, u16)], registers: &[(u8, u16)]) -> Simulator {
    let mut simulator = Simulator::from_source(source, ProcessorConfig::default())
        .expect("program should parse");
    for &(address, value) in memory {
        simulator.memory.write(address, value);
    }
    for &(reg, value) in registers {
        simulator.registers.write(reg, value);
    }
    simulator
}

#[test]
fn test_r0_never_changes() {
    // Both an architectural write and a LOAD destination targeting R0 are
    // dropped; readers keep seeing zero.
    let source = "\
        ADD R0, R1, R1\n\
        LOAD R0, 0(R0)\n\
        ADD R2, R0, R0\n";
    let mut simulator = setup_simulator(source, &[(0, 99)], &[(1, 21)]);

    simulator.run().expect("run should complete");

    assert_eq!(simulator.registers.read(0), 0);
    assert_eq!(simulator.registers.read(2), 0, "R0 reads as zero downstream");
}

#[test]
fn test_watchdog_halts_endless_loop() {
    let source = "L: BEQ R0, R0, L\n";
    let config = ProcessorConfig::new().with_max_cycles(50);
    let mut simulator = Simulator::from_source(source, config).expect("should parse");

    match simulator.run() {
        Err(SimulatorError::WatchdogExceeded { cycles }) => assert_eq!(cycles, 50),
        other => panic!("expected watchdog, got {:?}", other),
    }
    assert!(!simulator.is_complete());
}

#[test]
fn test_invalid_ret_target_completes_run() {
    // R1 ends up far past the program; the redirect is clamped to the end
    // and the run completes instead of spinning.
    let source = "\
        LOAD R1, 0(R0)\n\
        RET\n";
    let mut simulator = setup_simulator(source, &[(0, 999)], &[]);

    simulator.run().expect("run completes despite the wild target");
    assert!(simulator.is_complete());
}

#[test]
fn test_ret_to_index_zero_is_valid() {
    // Index 0 is inside the program, so a RET there re-runs from the top;
    // the watchdog bounds the resulting endless loop.
    let source = "\
        RET\n\
        ADD R1, R1, R1\n";
    let config = ProcessorConfig::new().with_max_cycles(60);
    let mut simulator = Simulator::from_source(source, config).expect("should parse");

    match simulator.run() {
        Err(SimulatorError::WatchdogExceeded { .. }) => {},
        other => panic!("expected watchdog, got {:?}", other),
    }
}

#[test]
fn test_load_reads_stale_value_before_store_write_back() {
    // No load/store disambiguation: the LOAD's memory read happens while
    // the earlier STORE is still waiting on its operand, so it observes the
    // old memory word. Commit order still applies the STORE afterwards.
    let source = "\
        MUL R1, R3, R4\n\
        STORE R1, 0(R0)\n\
        LOAD R2, 0(R0)\n";
    let mut simulator = setup_simulator(source, &[], &[(3, 2), (4, 3)]);

    simulator.run().expect("run should complete");

    assert_eq!(simulator.memory.read(0), 6, "store landed in memory");
    assert_eq!(
        simulator.registers.read(2),
        0,
        "load ran ahead of the store and read the stale word"
    );
}

#[test]
fn test_arithmetic_wraps_to_16_bits() {
    let source = "\
        ADD R3, R1, R2\n\
        SUB R4, R0, R1\n";
    let mut simulator = setup_simulator(source, &[], &[(1, 0xFFFF), (2, 2)]);

    simulator.run().expect("run should complete");

    assert_eq!(simulator.registers.read(3), 1, "ADD wraps modulo 2^16");
    assert_eq!(simulator.registers.read(4), 1, "SUB wraps modulo 2^16");
}

#[test]
fn test_address_arithmetic_wraps() {
    let source = "\
        STORE R1, 3(R2)\n\
        LOAD R3, 3(R2)\n";
    let mut simulator = setup_simulator(source, &[], &[(1, 77), (2, 0xFFFE)]);

    simulator.run().expect("run should complete");

    // 0xFFFE + 3 wraps to address 1
    assert_eq!(simulator.memory.read(1), 77);
    assert_eq!(simulator.registers.read(3), 77);
}

#[test]
fn test_memory_defaults_to_zero() {
    let source = "LOAD R1, 123(R0)\n";
    let mut simulator = setup_simulator(source, &[], &[]);
    simulator.run().expect("run should complete");
    assert_eq!(simulator.registers.read(1), 0);
}

#[test]
fn test_structural_stall_preserves_order() {
    // Three loads contend for two LOAD stations; the third issues only
    // after a station frees up at write-back, and program order of issue
    // cycles is preserved.
    let source = "\
        LOAD R1, 0(R0)\n\
        LOAD R2, 4(R0)\n\
        LOAD R3, 8(R0)\n";
    let mut simulator = setup_simulator(source, &[(0, 1), (4, 2), (8, 3)], &[]);

    simulator.run().expect("run should complete");

    let t1 = simulator.timing_of(1).unwrap();
    let t2 = simulator.timing_of(2).unwrap();
    let t3 = simulator.timing_of(3).unwrap();
    assert_eq!(t1.issue, Some(1));
    assert_eq!(t2.issue, Some(2));
    assert!(
        t3.issue.unwrap() > t1.write.unwrap(),
        "third load waits for a station release"
    );
    assert_eq!(simulator.registers.read(3), 3);
}

#[test]
fn test_invariants_hold_every_cycle() {
    let source = "\
        LOAD R2, 0(R0)\n\
        LOAD R4, 4(R0)\n\
        LOOP: ADD R3, R3, R4\n\
        SUB R2, R2, R4\n\
        BEQ R2, R0, DONE\n\
        BEQ R0, R0, LOOP\n\
        DONE: STORE R3, 8(R0)\n";
    let mut simulator = setup_simulator(source, &[(0, 3), (4, 1)], &[]);

    let mut guard = 0;
    while !simulator.is_complete() && guard < 1000 {
        let _ = simulator.step_cycle();
        simulator
            .verify_invariants()
            .expect("invariants must hold after every cycle");
        guard += 1;
    }
    assert!(simulator.is_complete());
    assert_eq!(simulator.registers.read(3), 3);
}
