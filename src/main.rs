// Copyright (c) 2024 The tomasulo-rust developers
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.
//

// main.rs
//
// This file contains the main entry point for the Tomasulo simulator.
// It provides a command-line interface for running an assembly program to
// completion or tracing it cycle by cycle.

use clap::{Parser as ClapParser, Subcommand};
use log::{error, info};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process;
use tomasulo_rust::pipeline::simulator::Simulator;
use tomasulo_rust::ProcessorConfig;
use tomasulo_rust::SimulatorError;

#[derive(ClapParser)]
#[command(name = "tomasulo_rust")]
#[command(about = "A cycle-accurate Tomasulo out-of-order processor simulator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program to completion and print the timing table
    Run {
        /// Input assembly file
        #[arg(short, long)]
        input: PathBuf,

        /// Maximum cycles before the watchdog halts the run
        #[arg(long, default_value = "1000")]
        max_cycles: usize,

        /// Pre-seed a memory word before the run, e.g. --init-mem 0=7
        #[arg(long = "init-mem", value_name = "ADDR=VAL")]
        init_mem: Vec<String>,

        /// Pre-seed a register before the run, e.g. --init-reg R3=50
        #[arg(long = "init-reg", value_name = "REG=VAL")]
        init_reg: Vec<String>,

        /// Emit the final snapshot as JSON instead of the text report
        #[arg(long)]
        json: bool,

        /// Log level (error, warn, info, debug)
        #[arg(short, long, default_value = "info")]
        log_level: String,

        /// Output log file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Step a program cycle by cycle, printing pipeline activity
    Trace {
        /// Input assembly file
        #[arg(short, long)]
        input: PathBuf,

        /// Maximum cycles before the watchdog halts the run
        #[arg(long, default_value = "1000")]
        max_cycles: usize,

        /// Pre-seed a memory word before the run, e.g. --init-mem 0=7
        #[arg(long = "init-mem", value_name = "ADDR=VAL")]
        init_mem: Vec<String>,

        /// Pre-seed a register before the run, e.g. --init-reg R3=50
        #[arg(long = "init-reg", value_name = "REG=VAL")]
        init_reg: Vec<String>,
    },
}

/// Configure the env_logger backend from the CLI flags. `--log-level` sets
/// the default filter (RUST_LOG still overrides it) and `--output` routes
/// the per-cycle issue/dispatch/write-back/commit events into a file.
fn init_logging(log_level: &str, output: Option<&Path>) -> Result<(), String> {
    let level = match log_level.to_lowercase().as_str() {
        "error" => "error",
        "warn" | "warning" => "warn",
        "debug" => "debug",
        _ => "info",
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    if let Some(path) = output {
        let file = File::create(path)
            .map_err(|err| format!("Failed to open log file {}: {}", path.display(), err))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder
        .try_init()
        .map_err(|err| format!("Failed to initialize logging: {}", err))
}

/// Parse a KEY=VAL pre-seed flag; the key is either a memory address or a
/// register name like R3 (the leading R is optional)
fn parse_seed(seed: &str, register: bool) -> Result<(u16, u16), String> {
    let (key, value) = seed
        .split_once('=')
        .ok_or_else(|| format!("invalid seed '{}', expected KEY=VAL", seed))?;
    let key = key.trim();
    let key = if register {
        key.trim_start_matches(|c| c == 'R' || c == 'r')
    } else {
        key
    };
    let key = key
        .parse::<u16>()
        .map_err(|_| format!("invalid seed key in '{}'", seed))?;
    let value = value
        .trim()
        .parse::<i32>()
        .map_err(|_| format!("invalid seed value in '{}'", seed))?;
    Ok((key, value as u16))
}

fn build_simulator(
    input: &PathBuf,
    max_cycles: usize,
    init_mem: &[String],
    init_reg: &[String],
) -> Result<Simulator, String> {
    let config = ProcessorConfig::new().with_max_cycles(max_cycles);
    let mut simulator =
        Simulator::from_file(input, config).map_err(|err| format!("{}", err))?;

    for seed in init_mem {
        let (address, value) = parse_seed(seed, false)?;
        simulator.memory.write(address, value);
    }
    for seed in init_reg {
        let (reg, value) = parse_seed(seed, true)?;
        if reg >= 8 {
            return Err(format!("invalid register in seed '{}'", seed));
        }
        simulator.registers.write(reg as u8, value);
    }
    Ok(simulator)
}

fn run_command(
    input: PathBuf,
    max_cycles: usize,
    init_mem: Vec<String>,
    init_reg: Vec<String>,
    json: bool,
) -> i32 {
    info!("loading program from {}", input.display());

    let mut simulator = match build_simulator(&input, max_cycles, &init_mem, &init_reg) {
        Ok(simulator) => simulator,
        Err(err) => {
            eprintln!("{}", err);
            return 1;
        },
    };

    let outcome = simulator.run();
    let exit_code = match &outcome {
        Ok(cycles) => {
            info!("simulation complete after {} cycles", cycles);
            0
        },
        Err(err @ SimulatorError::WatchdogExceeded { .. }) => {
            error!("{}", err);
            eprintln!("{}", err);
            2
        },
        Err(err) => {
            eprintln!("{}", err);
            1
        },
    };

    if json {
        match serde_json::to_string_pretty(&simulator.snapshot()) {
            Ok(text) => println!("{}", text),
            Err(err) => {
                eprintln!("Failed to serialize snapshot: {}", err);
                return 1;
            },
        }
    } else {
        println!("TIMING TABLE");
        println!("{}", simulator.timing_table());
        println!("FINAL STATE");
        println!("{}", simulator.final_state_report());
        println!("Cycles: {}", simulator.cycle());
    }

    exit_code
}

fn trace_command(
    input: PathBuf,
    max_cycles: usize,
    init_mem: Vec<String>,
    init_reg: Vec<String>,
) -> i32 {
    let mut simulator = match build_simulator(&input, max_cycles, &init_mem, &init_reg) {
        Ok(simulator) => simulator,
        Err(err) => {
            eprintln!("{}", err);
            return 1;
        },
    };

    while !simulator.is_complete() && simulator.cycle() < max_cycles {
        let snapshot = simulator.step_cycle();
        println!(
            "Cycle {:>4}: issue@{} | ROB {}/{} | CDB {}",
            snapshot.cycle,
            snapshot.next_index,
            snapshot.rob.len(),
            simulator.config.rob_capacity,
            match &snapshot.cdb {
                Some(broadcast) => format!("ROB[{}] {}", broadcast.rob_index, broadcast.opcode),
                None => "idle".to_string(),
            }
        );
    }

    println!();
    println!("{}", simulator.timing_table());
    println!("{}", simulator.final_state_report());

    if simulator.is_complete() {
        0
    } else {
        eprintln!(
            "{}",
            SimulatorError::WatchdogExceeded {
                cycles: simulator.cycle()
            }
        );
        2
    }
}

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Run {
            input,
            max_cycles,
            init_mem,
            init_reg,
            json,
            log_level,
            output,
        } => match init_logging(&log_level, output.as_deref()) {
            Ok(()) => run_command(input, max_cycles, init_mem, init_reg, json),
            Err(err) => {
                eprintln!("{}", err);
                1
            },
        },
        Commands::Trace {
            input,
            max_cycles,
            init_mem,
            init_reg,
        } => {
            let _ = env_logger::try_init();
            trace_command(input, max_cycles, init_mem, init_reg)
        },
    };

    process::exit(exit_code);
}
