use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tomasulo_rust::pipeline::simulator::Simulator;
use tomasulo_rust::{Parser, ProcessorConfig, Program};

fn loop_program() -> Program {
    let source = "\
        LOAD R2, 0(R0)\n\
        LOAD R4, 4(R0)\n\
        LOAD R5, 8(R0)\n\
        LOOP: ADD R3, R3, R5\n\
        SUB R2, R2, R4\n\
        BEQ R2, R0, DONE\n\
        BEQ R0, R0, LOOP\n\
        DONE: STORE R3, 12(R0)\n";
    Parser::parse_str(source).expect("benchmark program parses")
}

fn pipeline_loop_benchmark(c: &mut Criterion) {
    let program = loop_program();

    c.bench_function("pipeline_loop_execution", |b| {
        b.iter(|| {
            let mut simulator = Simulator::new(program.clone(), ProcessorConfig::default());
            simulator.memory.write(0, 20);
            simulator.memory.write(4, 1);
            simulator.memory.write(8, 10);
            simulator.run().expect("loop completes");
            black_box(simulator.registers.read(3));
        });
    });
}

fn dependent_chain_benchmark(c: &mut Criterion) {
    let program =
        Parser::parse_str("LOAD R1, 0(R0)\nADD R2, R1, R1\nMUL R3, R2, R2\n").expect("parses");

    c.bench_function("dependent_chain_execution", |b| {
        b.iter(|| {
            let mut simulator = Simulator::new(program.clone(), ProcessorConfig::default());
            simulator.memory.write(0, 7);
            simulator.run().expect("chain completes");
            black_box(simulator.registers.read(3));
        });
    });
}

criterion_group!(benches, pipeline_loop_benchmark, dependent_chain_benchmark);
criterion_main!(benches);
