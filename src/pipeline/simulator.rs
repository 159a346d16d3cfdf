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

// simulator.rs
//
// This file contains the pipeline driver for the Tomasulo core. One call to
// step_cycle advances every stage in a fixed order:
//
//   1. apply a pending branch redirect to the issue pointer
//   2. issue at most one instruction (rename operands through the RAT)
//   3. clear the previous cycle's CDB broadcast
//   4. write-back, first pass (arbitrate the finished-result queue)
//   5. tick the functional units; finished results join the queue
//   6. write-back, second pass (only if the first pass broadcast nothing)
//   7. dispatch ready reservation stations to free functional units
//   8. commit ready entries from the ROB head, in order
//
// The two write-back passes let a result finishing this cycle reach a
// dependent's dispatch in the same cycle when no older result holds the bus.
// Taken branches flush the ROB tail at write-back and leave a redirect for
// the next cycle's stage 1.

use super::cdb::{BroadcastValue, CdbBroadcast, CommonDataBus};
use super::config::ProcessorConfig;
use super::functional_units::{ExecJob, ExecResult, FinishedExec, FuPool};
use super::rat::RegisterAliasTable;
use super::reservation_station::{Operand, RsKind, StationEntry, StationPool};
use super::rob::{ReorderBuffer, RobEntry, RobValue};
use super::timing::{self, InstructionTiming, TimingTracker};
use crate::assembler::parser::{Parser, Program};
use crate::errors::SimulatorError;
use crate::processor::instructions::{Instruction, Opcode};
use crate::processor::memory::Memory;
use crate::processor::registers::RegisterFile;
use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// A pending control-flow redirect, consumed at the start of the next cycle.
/// BEQ and CALL redirect by label; RET redirects by raw address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Redirect {
    Label(String),
    Address(u16),
}

/// Why the issue stage made no progress this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallReason {
    StationsBusy(RsKind),
    RobFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueOutcome {
    Issued(usize),
    Stall(StallReason),
    /// No instruction left to issue
    Drained,
}

/// Where an instruction currently sits in its lifecycle, for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageStatus {
    Pending,
    Issued,
    Executing,
    WriteBack,
    Committed,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstructionState {
    pub id: usize,
    pub text: String,
    pub status: StageStatus,
    pub flushed: bool,
    pub timing: InstructionTiming,
}

#[derive(Debug, Clone, Serialize)]
pub struct StationState {
    pub name: String,
    pub kind: RsKind,
    pub busy: bool,
    pub executing: bool,
    pub instr_id: Option<usize>,
    pub dest: Option<usize>,
    pub vj: Option<Operand>,
    pub vk: Option<Operand>,
    pub address: Option<i16>,
    pub pc: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RobState {
    pub index: usize,
    pub instr_id: usize,
    pub op: String,
    pub dest: Option<u8>,
    pub ready: bool,
    pub value: RobValue,
    pub is_head: bool,
    pub is_tail: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitState {
    pub name: String,
    pub kind: RsKind,
    pub busy: bool,
    pub cycles_remaining: usize,
    pub station_id: Option<usize>,
    pub instr_id: Option<usize>,
}

/// Complete observable state after a cycle
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub cycle: usize,
    pub next_index: usize,
    pub instructions: Vec<InstructionState>,
    pub stations: Vec<StationState>,
    pub rob: Vec<RobState>,
    pub rat: Vec<Option<usize>>,
    pub registers: Vec<u16>,
    pub memory: BTreeMap<u16, u16>,
    pub units: Vec<UnitState>,
    pub cdb: Option<CdbBroadcast>,
    pub timing: BTreeMap<usize, InstructionTiming>,
    pub pending_redirect: Option<Redirect>,
    pub reissue_from: Option<usize>,
    pub is_complete: bool,
}

pub struct Simulator {
    pub config: ProcessorConfig,
    pub registers: RegisterFile,
    pub memory: Memory,
    program: Program,
    rat: RegisterAliasTable,
    rob: ReorderBuffer,
    stations: StationPool,
    units: FuPool,
    cdb: CommonDataBus,
    write_queue: Vec<FinishedExec>,
    timing: TimingTracker,
    cycle: usize,
    next_index: usize,
    redirect: Option<Redirect>,
    /// ROB index of the branch that requested the pending redirect; used to
    /// let an older branch's redirect supersede a younger one
    redirect_rob: Option<usize>,
    /// Most recent backward-redirect target; instructions at or past it may
    /// be re-issued while earlier dynamic instances are still in flight
    reissue_from: Option<usize>,
    /// Instruction ids discarded by flushes and not re-issued since
    flushed: HashSet<usize>,
}

impl Simulator {
    pub fn new(program: Program, config: ProcessorConfig) -> Self {
        let rob = ReorderBuffer::new(config.rob_capacity);
        let stations = StationPool::new(&config);
        let units = FuPool::new(&config);
        Self {
            registers: RegisterFile::new(),
            memory: Memory::new(),
            program,
            rat: RegisterAliasTable::new(),
            rob,
            stations,
            units,
            cdb: CommonDataBus::new(),
            write_queue: Vec::new(),
            timing: TimingTracker::new(),
            cycle: 0,
            next_index: 0,
            redirect: None,
            redirect_rob: None,
            reissue_from: None,
            flushed: HashSet::new(),
            config,
        }
    }

    pub fn from_source(source: &str, config: ProcessorConfig) -> Result<Self, SimulatorError> {
        Ok(Self::new(Parser::parse_str(source)?, config))
    }

    pub fn from_file<P: AsRef<Path>>(path: P, config: ProcessorConfig) -> Result<Self, SimulatorError> {
        Ok(Self::new(Parser::parse_file(path)?, config))
    }

    pub fn cycle(&self) -> usize {
        self.cycle
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.program.instructions
    }

    pub fn timing_of(&self, instr_id: usize) -> Option<InstructionTiming> {
        self.timing.get(instr_id)
    }

    pub fn flushed_ids(&self) -> &HashSet<usize> {
        &self.flushed
    }

    /// Rendered per-instruction timing table
    pub fn timing_table(&self) -> String {
        timing::render_table(&self.program.instructions, &self.timing, &self.flushed)
    }

    /// Simulation is complete once nothing is in flight and the issue
    /// pointer has run past the program with no redirect pending.
    pub fn is_complete(&self) -> bool {
        self.rob.is_empty()
            && self.stations.all_idle()
            && self.units.all_idle()
            && self.write_queue.is_empty()
            && self.redirect.is_none()
            && self.next_index >= self.program.instructions.len()
    }

    /// Advance one cycle and return the resulting snapshot. A completed
    /// simulation is left untouched.
    pub fn step_cycle(&mut self) -> Snapshot {
        if self.is_complete() {
            return self.snapshot();
        }
        self.cycle += 1;

        self.apply_redirect();
        let _ = self.issue_next();
        self.cdb.clear();
        self.process_write_back();

        let finished = self.units.tick_all(&self.memory);
        for done in finished {
            debug!(
                "cycle {}: {} (id {}) finished execution for ROB[{}]",
                self.cycle, done.opcode, done.instr_id, done.rob_index
            );
            self.timing
                .record_finish_exec(done.instr_id, done.issue_cycle, self.cycle);
            self.write_queue.push(done);
        }

        self.process_write_back();
        self.dispatch_ready();
        self.commit_ready();

        #[cfg(debug_assertions)]
        {
            if let Err(err) = self.verify_invariants() {
                panic!("{}", err);
            }
        }

        self.snapshot()
    }

    /// Run until complete or until the watchdog cycle limit fires
    pub fn run(&mut self) -> Result<usize, SimulatorError> {
        while self.cycle < self.config.max_cycles {
            if self.is_complete() {
                return Ok(self.cycle);
            }
            let _ = self.step_cycle();
        }
        if self.is_complete() {
            Ok(self.cycle)
        } else {
            Err(SimulatorError::WatchdogExceeded { cycles: self.cycle })
        }
    }

    /// Return to the post-parse initial state. Registers and memory are
    /// cleared too, so a reset-and-rerun reproduces the prior run exactly
    /// when given the same pre-seeded state.
    pub fn reset(&mut self) {
        self.registers = RegisterFile::new();
        self.memory.clear();
        self.rat = RegisterAliasTable::new();
        self.rob.clear();
        self.stations.clear_all();
        self.units.clear_all();
        self.cdb.clear();
        self.write_queue.clear();
        self.timing.clear();
        self.cycle = 0;
        self.next_index = 0;
        self.redirect = None;
        self.redirect_rob = None;
        self.reissue_from = None;
        self.flushed.clear();
    }

    // ---- Stage 1: branch redirect -------------------------------------

    fn apply_redirect(&mut self) {
        let redirect = match self.redirect.take() {
            Some(redirect) => redirect,
            None => return,
        };
        self.redirect_rob = None;

        let end = self.program.instructions.len();
        let target = match &redirect {
            Redirect::Label(label) => match self.program.labels.get(label) {
                Some(&index) => index,
                None => {
                    // The parser rejects unknown labels, so this is defensive
                    warn!("redirect to unknown label '{}', treating as end of program", label);
                    end
                },
            },
            Redirect::Address(address) => {
                let index = *address as usize;
                if index < end {
                    index
                } else {
                    warn!(
                        "{}; issue pointer clamped to end of program",
                        SimulatorError::InvalidRedirect { target: *address }
                    );
                    end
                }
            },
        };

        // A backward redirect opens the re-issue window for the loop body;
        // a forward redirect closes it.
        if target < self.next_index {
            self.reissue_from = Some(target);
        } else {
            self.reissue_from = None;
        }

        debug!(
            "cycle {}: redirect {:?} moves issue pointer {} -> {}",
            self.cycle, redirect, self.next_index, target
        );
        self.next_index = target;
    }

    // ---- Stage 2: issue -----------------------------------------------

    /// Issue the next instruction if its station class and the ROB both
    /// have room. Structural stalls change no state.
    pub fn issue_next(&mut self) -> IssueOutcome {
        if self.next_index >= self.program.instructions.len() {
            return IssueOutcome::Drained;
        }
        let instruction = self.program.instructions[self.next_index].clone();
        let kind = RsKind::for_opcode(instruction.opcode);

        if !self.stations.has_free(kind) {
            debug!(
                "cycle {}: issue stalled, no free {} station",
                self.cycle,
                kind.label()
            );
            return IssueOutcome::Stall(StallReason::StationsBusy(kind));
        }
        if self.rob.is_full() {
            debug!("cycle {}: issue stalled, ROB full", self.cycle);
            return IssueOutcome::Stall(StallReason::RobFull);
        }

        let rob_index = self.rob.tail_index();
        let entry = self.capture_operands(&instruction, rob_index);
        if self.stations.allocate(kind, entry).is_none() {
            return IssueOutcome::Stall(StallReason::StationsBusy(kind));
        }
        let pushed = self.rob.push(RobEntry::new(
            instruction.id,
            self.cycle,
            instruction.opcode,
            instruction.destination(),
        ));
        debug_assert_eq!(pushed, Some(rob_index));

        // Rename after the operand capture so an instruction reading its own
        // destination sees the previous producer
        if let Some(dest) = instruction.destination() {
            self.rat.rename(dest, rob_index);
        }

        self.timing.record_issue(instruction.id, self.cycle);
        self.flushed.remove(&instruction.id);
        self.next_index += 1;
        debug!(
            "cycle {}: issued {} (id {}) to ROB[{}]",
            self.cycle, instruction, instruction.id, rob_index
        );
        IssueOutcome::Issued(instruction.id)
    }

    /// Resolve one architectural source register to a value or producer tag
    fn read_operand(&self, reg: u8) -> Operand {
        match self.rat.producer(reg) {
            None => Operand::Ready(self.registers.read(reg)),
            Some(rob_index) => match self.rob.get(rob_index) {
                Some(entry) if entry.ready => match entry.value {
                    RobValue::Integer(value) => Operand::Ready(value),
                    // A ready CALL's return address is R1's pending value
                    RobValue::Call { return_address, .. } => Operand::Ready(return_address),
                    _ => Operand::Waiting(rob_index),
                },
                _ => Operand::Waiting(rob_index),
            },
        }
    }

    fn capture_operands(&self, instruction: &Instruction, rob_index: usize) -> StationEntry {
        let pc = self.next_index;
        let (vj, vk, address, captured_pc) = match instruction.opcode {
            Opcode::Add | Opcode::Sub | Opcode::Nand | Opcode::Mul => (
                Some(self.read_operand(instruction.rb.unwrap_or(0))),
                Some(self.read_operand(instruction.rc.unwrap_or(0))),
                None,
                None,
            ),
            Opcode::Load => (
                Some(self.read_operand(instruction.rb.unwrap_or(0))),
                None,
                instruction.immediate,
                None,
            ),
            Opcode::Store => (
                // Vj is the value to store, Vk the base register
                Some(self.read_operand(instruction.ra.unwrap_or(0))),
                Some(self.read_operand(instruction.rb.unwrap_or(0))),
                instruction.immediate,
                None,
            ),
            Opcode::Beq => (
                Some(self.read_operand(instruction.ra.unwrap_or(0))),
                Some(self.read_operand(instruction.rb.unwrap_or(0))),
                instruction.immediate,
                Some(pc),
            ),
            Opcode::Call => (None, None, instruction.immediate, Some(pc)),
            // RET's sole source is the return-address register R1
            Opcode::Ret => (Some(self.read_operand(1)), None, None, Some(pc)),
        };
        StationEntry {
            instruction: instruction.clone(),
            issue_cycle: self.cycle,
            dest: rob_index,
            vj,
            vk,
            address,
            pc: captured_pc,
            executing: false,
        }
    }

    // ---- Stages 4 and 6: write-back -----------------------------------

    /// Broadcast the oldest queued result on the CDB, if the bus is free.
    /// Losers stay queued for a later cycle.
    fn process_write_back(&mut self) {
        if self.cdb.is_busy() || self.write_queue.is_empty() {
            return;
        }

        // Oldest by circular distance from the ROB head; ties break by the
        // lower ROB index
        let mut best = 0;
        for candidate in 1..self.write_queue.len() {
            let age = |i: usize| {
                let rob_index = self.write_queue[i].rob_index;
                (self.rob.distance_from_head(rob_index), rob_index)
            };
            if age(candidate) < age(best) {
                best = candidate;
            }
        }
        let done = self.write_queue.remove(best);

        let payload = match done.result {
            ExecResult::Value(value) => BroadcastValue::Integer(value),
            ExecResult::Call {
                return_address,
                target,
            } => BroadcastValue::Call {
                return_address,
                target,
            },
            _ => BroadcastValue::Completion,
        };
        if !self.cdb.broadcast(done.rob_index, payload, done.opcode) {
            self.write_queue.push(done);
            return;
        }

        debug!(
            "cycle {}: CDB broadcast {} (id {}) for ROB[{}]",
            self.cycle, done.opcode, done.instr_id, done.rob_index
        );

        match done.result {
            ExecResult::Value(value) => {
                self.rob
                    .mark_ready(done.rob_index, RobValue::Integer(value), self.cycle);
                self.stations.forward_integer(done.rob_index, value);
            },
            ExecResult::Store { address, value } => {
                // The memory write happens here; commit order still seals
                // architectural visibility through the in-order ROB
                self.memory.write(address, value);
                self.rob.mark_ready(
                    done.rob_index,
                    RobValue::Store { address, value },
                    self.cycle,
                );
            },
            ExecResult::Branch { taken, target } => {
                self.rob
                    .mark_ready(done.rob_index, RobValue::None, self.cycle);
                if taken {
                    let redirect = match done.label.clone() {
                        Some(label) => Redirect::Label(label),
                        None => Redirect::Address(target),
                    };
                    self.note_taken_branch(done.rob_index, redirect);
                }
            },
            ExecResult::Call {
                return_address,
                target,
            } => {
                self.rob.mark_ready(
                    done.rob_index,
                    RobValue::Call {
                        return_address,
                        target,
                    },
                    self.cycle,
                );
                self.stations
                    .forward_return_address(done.rob_index, return_address);
                let redirect = match done.label.clone() {
                    Some(label) => Redirect::Label(label),
                    None => Redirect::Address(target),
                };
                self.note_taken_branch(done.rob_index, redirect);
            },
            ExecResult::Return { target } => {
                self.rob
                    .mark_ready(done.rob_index, RobValue::None, self.cycle);
                self.note_taken_branch(done.rob_index, Redirect::Address(target));
            },
        }

        self.timing
            .record_write(done.instr_id, done.issue_cycle, self.cycle);
        self.stations.release(done.station_id);
    }

    /// A taken branch mispredicts the not-taken fetch: flush everything
    /// younger than the branch and leave the redirect for next cycle. When
    /// two branches request redirects before either is applied, the one
    /// closer to the ROB head wins.
    fn note_taken_branch(&mut self, rob_index: usize, redirect: Redirect) {
        if let Some(pending) = self.redirect_rob {
            let age_new = self.rob.distance_from_head(rob_index);
            let age_pending = self.rob.distance_from_head(pending);
            if age_new >= age_pending {
                debug!(
                    "cycle {}: dropping redirect from younger branch at ROB[{}]",
                    self.cycle, rob_index
                );
                return;
            }
        }
        self.flush_from(rob_index);
        self.redirect = Some(redirect);
        self.redirect_rob = Some(rob_index);
    }

    /// Discard ROB[branch+1 .. tail) and every reference to it
    fn flush_from(&mut self, branch_index: usize) {
        let discarded = self.rob.flush_after(branch_index);
        if discarded.is_empty() {
            return;
        }
        let indices: HashSet<usize> = discarded.iter().map(|(index, _)| *index).collect();

        self.rat.clear_flushed(&indices);
        let cleared: HashSet<usize> = self.stations.flush(&indices).into_iter().collect();
        self.units.flush_stations(&cleared);
        self.write_queue
            .retain(|pending| !indices.contains(&pending.rob_index));

        for (index, entry) in discarded {
            debug!(
                "cycle {}: flushed {} (id {}) from ROB[{}]",
                self.cycle, entry.opcode, entry.instr_id, index
            );
            self.flushed.insert(entry.instr_id);
        }
    }

    // ---- Stage 7: dispatch --------------------------------------------

    /// Start execution for every ready station whose class has a free unit.
    /// Execution occupies the cycles after dispatch, so the recorded
    /// execute-start is the next cycle.
    fn dispatch_ready(&mut self) {
        for id in 0..self.stations.len() {
            let (kind, job, instr_id, issue_cycle) = {
                let station = self.stations.get(id);
                if !station.busy() || station.executing() || !station.ready() {
                    continue;
                }
                let entry = match station.entry.as_ref() {
                    Some(entry) => entry,
                    None => continue,
                };
                let job = ExecJob::new(
                    entry.instruction.opcode,
                    entry.instruction.id,
                    entry.issue_cycle,
                    entry.dest,
                    id,
                    entry.instruction.label.clone(),
                    entry.vj.and_then(|op| op.value()).unwrap_or(0),
                    entry.vk.and_then(|op| op.value()).unwrap_or(0),
                    entry.address.unwrap_or(0),
                    entry.pc.unwrap_or(0),
                );
                (station.kind, job, entry.instruction.id, entry.issue_cycle)
            };

            if !self.units.has_free(kind) {
                continue;
            }
            if self.units.dispatch(kind, job) {
                self.timing
                    .record_start_exec(instr_id, issue_cycle, self.cycle + 1);
                if let Some(entry) = self.stations.get_mut(id).entry.as_mut() {
                    entry.executing = true;
                }
                debug!(
                    "cycle {}: dispatched station {} (id {})",
                    self.cycle,
                    self.stations.get(id).name,
                    instr_id
                );
            }
        }
    }

    // ---- Stage 8: commit ----------------------------------------------

    /// Pop ready entries from the ROB head in order. An entry commits only
    /// once its write-back lies in an earlier cycle.
    fn commit_ready(&mut self) {
        loop {
            let (ready, write_cycle) = match self.rob.peek_front() {
                Some((_, entry)) => (entry.ready, entry.write_cycle),
                None => break,
            };
            if !ready {
                break;
            }
            if write_cycle.map_or(false, |write| write >= self.cycle) {
                break;
            }

            let (index, entry) = match self.rob.pop_front() {
                Some(popped) => popped,
                None => break,
            };

            match entry.opcode {
                Opcode::Add | Opcode::Sub | Opcode::Nand | Opcode::Mul | Opcode::Load => {
                    if let (Some(dest), RobValue::Integer(value)) = (entry.dest, entry.value) {
                        self.registers.write(dest, value);
                    }
                    if let Some(dest) = entry.dest {
                        self.rat.clear_if_points_to(dest, index);
                    }
                },
                Opcode::Call => {
                    if let RobValue::Call { return_address, .. } = entry.value {
                        self.registers.write(1, return_address);
                    }
                    self.rat.clear_if_points_to(1, index);
                },
                // STORE already wrote memory at write-back; BEQ and RET
                // retire with no architectural effect
                Opcode::Store | Opcode::Beq | Opcode::Ret => {},
            }

            self.timing
                .record_commit(entry.instr_id, entry.issue_cycle, self.cycle);
            debug!(
                "cycle {}: committed {} (id {}) from ROB[{}]",
                self.cycle, entry.opcode, entry.instr_id, index
            );
        }
    }

    // ---- Observation --------------------------------------------------

    fn status_of(&self, instr_id: usize) -> StageStatus {
        let timing = self.timing.get(instr_id).unwrap_or_default();
        if timing.commit.is_some() {
            StageStatus::Committed
        } else if timing.write.is_some() {
            StageStatus::WriteBack
        } else if timing.start_exec.map_or(false, |start| start <= self.cycle) {
            StageStatus::Executing
        } else if timing.issue.is_some() {
            StageStatus::Issued
        } else {
            StageStatus::Pending
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let instructions = self
            .program
            .instructions
            .iter()
            .map(|instruction| InstructionState {
                id: instruction.id,
                text: instruction.to_string(),
                status: self.status_of(instruction.id),
                flushed: self.flushed.contains(&instruction.id),
                timing: self.timing.get(instruction.id).unwrap_or_default(),
            })
            .collect();

        let stations = self
            .stations
            .iter()
            .map(|station| {
                let entry = station.entry.as_ref();
                StationState {
                    name: station.name.clone(),
                    kind: station.kind,
                    busy: station.busy(),
                    executing: station.executing(),
                    instr_id: entry.map(|e| e.instruction.id),
                    dest: entry.map(|e| e.dest),
                    vj: entry.and_then(|e| e.vj),
                    vk: entry.and_then(|e| e.vk),
                    address: entry.and_then(|e| e.address),
                    pc: entry.and_then(|e| e.pc),
                }
            })
            .collect();

        let rob_len = self.rob.len();
        let rob = self
            .rob
            .iter()
            .enumerate()
            .map(|(position, (index, entry))| RobState {
                index,
                instr_id: entry.instr_id,
                op: entry.opcode.mnemonic().to_string(),
                dest: entry.dest,
                ready: entry.ready,
                value: entry.value,
                is_head: position == 0,
                is_tail: position + 1 == rob_len,
            })
            .collect();

        let units = self
            .units
            .iter()
            .map(|unit| UnitState {
                name: unit.name.clone(),
                kind: unit.kind,
                busy: unit.busy(),
                cycles_remaining: unit.remaining,
                station_id: unit.job.as_ref().map(|job| job.station_id),
                instr_id: unit.job.as_ref().map(|job| job.instr_id),
            })
            .collect();

        Snapshot {
            cycle: self.cycle,
            next_index: self.next_index,
            instructions,
            stations,
            rob,
            rat: self.rat.contents().to_vec(),
            registers: self.registers.contents().to_vec(),
            memory: self.memory.nonzero().clone(),
            units,
            cdb: self.cdb.current().cloned(),
            timing: self.timing.all().clone(),
            pending_redirect: self.redirect.clone(),
            reissue_from: self.reissue_from,
            is_complete: self.is_complete(),
        }
    }

    /// Check the structural invariants that must hold between cycles.
    /// A violation indicates a simulator bug, not a program error.
    pub fn verify_invariants(&self) -> Result<(), SimulatorError> {
        // RAT entries must point at live ROB entries
        for (reg, producer) in self.rat.contents().iter().enumerate() {
            if let Some(rob_index) = producer {
                if !self.rob.is_live(*rob_index) {
                    return Err(SimulatorError::InternalInvariant(format!(
                        "RAT[R{}] points at dead ROB[{}]",
                        reg, rob_index
                    )));
                }
            }
        }

        // Waiting operand tags must reference live ROB entries
        for station in self.stations.iter() {
            if let Some(entry) = station.entry.as_ref() {
                for tag in [entry.vj.and_then(|op| op.tag()), entry.vk.and_then(|op| op.tag())]
                    .into_iter()
                    .flatten()
                {
                    if !self.rob.is_live(tag) {
                        return Err(SimulatorError::InternalInvariant(format!(
                            "station {} waits on dead ROB[{}]",
                            station.name, tag
                        )));
                    }
                }
                if !self.rob.is_live(entry.dest) {
                    return Err(SimulatorError::InternalInvariant(format!(
                        "station {} targets dead ROB[{}]",
                        station.name, entry.dest
                    )));
                }
            }
        }

        // Recorded stage cycles must be monotonic per instruction
        for (instr_id, timing) in self.timing.all() {
            let stages = [
                timing.issue,
                timing.start_exec,
                timing.finish_exec,
                timing.write,
                timing.commit,
            ];
            let mut last = 0;
            for stage in stages.into_iter().flatten() {
                if stage < last {
                    return Err(SimulatorError::InternalInvariant(format!(
                        "instruction {} has non-monotonic stage cycles",
                        instr_id
                    )));
                }
                last = stage;
            }
        }

        Ok(())
    }

    /// Final-state report used by the CLI: registers plus non-zero memory
    pub fn final_state_report(&self) -> String {
        let mut result = String::new();
        result.push_str(&self.registers.dump_registers());
        result.push('\n');
        result.push_str(&self.memory.dump_memory());
        result
    }
}
