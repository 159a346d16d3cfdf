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

// functional_units.rs
//
// This file contains the functional unit pool. A unit holds one in-flight
// instruction with operands copied out of its reservation station at
// dispatch, and counts down its latency one tick per cycle. LOAD splits
// into a 2-cycle address phase and a 4-cycle memory phase; STORE computes
// its address the same way but defers the memory write to the write-back
// stage. All arithmetic is modulo 2^16.

use super::branch;
use super::config::ProcessorConfig;
use super::reservation_station::RsKind;
use crate::processor::instructions::Opcode;
use crate::processor::memory::Memory;
use std::collections::HashSet;

/// Result leaving a functional unit at execute-finish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecResult {
    /// Arithmetic or LOAD value
    Value(u16),
    /// STORE address/word pair; the write happens at write-back
    Store { address: u16, value: u16 },
    /// BEQ outcome
    Branch { taken: bool, target: u16 },
    /// CALL outcome; the return address retires into R1
    Call { return_address: u16, target: u16 },
    /// RET target read out of R1
    Return { target: u16 },
}

/// Operands and context copied out of a reservation station at dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct ExecJob {
    pub opcode: Opcode,
    pub instr_id: usize,
    pub issue_cycle: usize,
    pub rob_index: usize,
    pub station_id: usize,
    pub label: Option<String>,
    pub vj: u16,
    pub vk: u16,
    pub immediate: i16,
    pub pc: usize,
    /// Effective address latched at the end of the address phase
    address: Option<u16>,
}

impl ExecJob {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        opcode: Opcode,
        instr_id: usize,
        issue_cycle: usize,
        rob_index: usize,
        station_id: usize,
        label: Option<String>,
        vj: u16,
        vk: u16,
        immediate: i16,
        pc: usize,
    ) -> Self {
        Self {
            opcode,
            instr_id,
            issue_cycle,
            rob_index,
            station_id,
            label,
            vj,
            vk,
            immediate,
            pc,
            address: None,
        }
    }

    /// Base register for address arithmetic: Vj for LOAD, Vk for STORE
    fn address_base(&self) -> u16 {
        match self.opcode {
            Opcode::Store => self.vk,
            _ => self.vj,
        }
    }

    fn effective_address(&self) -> u16 {
        self.address
            .unwrap_or_else(|| (self.address_base() as i32 + self.immediate as i32) as u16)
    }
}

/// A finished execution handed to the write-back queue
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedExec {
    pub station_id: usize,
    pub rob_index: usize,
    pub instr_id: usize,
    pub issue_cycle: usize,
    pub opcode: Opcode,
    pub label: Option<String>,
    pub result: ExecResult,
}

#[derive(Debug, Clone)]
pub struct FunctionalUnit {
    pub kind: RsKind,
    pub name: String,
    pub remaining: usize,
    pub job: Option<ExecJob>,
    latency: usize,
}

impl FunctionalUnit {
    fn new(kind: RsKind, name: String, latency: usize) -> Self {
        Self {
            kind,
            name,
            remaining: 0,
            job: None,
            latency,
        }
    }

    pub fn busy(&self) -> bool {
        self.job.is_some()
    }

    pub fn dispatch(&mut self, job: ExecJob) {
        self.remaining = self.latency;
        self.job = Some(job);
    }

    /// Advance one cycle; returns the finished execution when the countdown
    /// reaches zero. LOAD reads memory at the final tick; everything else is
    /// computed from the captured operands.
    pub fn tick(&mut self, memory: &Memory) -> Option<FinishedExec> {
        let job = self.job.as_mut()?;
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        // Address phase boundary for the memory classes
        if matches!(job.opcode, Opcode::Load | Opcode::Store)
            && job.address.is_none()
            && self.latency >= 2
            && self.remaining == self.latency - 2
        {
            job.address = Some((job.address_base() as i32 + job.immediate as i32) as u16);
        }

        if self.remaining > 0 {
            return None;
        }

        let result = match job.opcode {
            Opcode::Add => ExecResult::Value(job.vj.wrapping_add(job.vk)),
            Opcode::Sub => ExecResult::Value(job.vj.wrapping_sub(job.vk)),
            Opcode::Nand => ExecResult::Value(!(job.vj & job.vk)),
            Opcode::Mul => {
                // Low 16 bits of the 32-bit product
                ExecResult::Value((job.vj as u32).wrapping_mul(job.vk as u32) as u16)
            },
            Opcode::Load => ExecResult::Value(memory.read(job.effective_address())),
            Opcode::Store => ExecResult::Store {
                address: job.effective_address(),
                value: job.vj,
            },
            Opcode::Beq => {
                let outcome = branch::evaluate_beq(job.vj, job.vk, job.immediate, job.pc);
                ExecResult::Branch {
                    taken: outcome.taken,
                    target: outcome.target,
                }
            },
            Opcode::Call => {
                let (target, return_address) = branch::evaluate_call(job.immediate, job.pc);
                ExecResult::Call {
                    return_address,
                    target,
                }
            },
            Opcode::Ret => ExecResult::Return {
                target: branch::evaluate_ret(job.vj),
            },
        };

        let job = self.job.take()?;
        self.remaining = 0;
        Some(FinishedExec {
            station_id: job.station_id,
            rob_index: job.rob_index,
            instr_id: job.instr_id,
            issue_cycle: job.issue_cycle,
            opcode: job.opcode,
            label: job.label,
            result,
        })
    }

    pub fn reset(&mut self) {
        self.job = None;
        self.remaining = 0;
    }
}

/// Typed pool of functional units, mirroring the station pool shape
#[derive(Debug, Clone)]
pub struct FuPool {
    units: Vec<FunctionalUnit>,
}

impl FuPool {
    pub fn new(config: &ProcessorConfig) -> Self {
        let mut units = Vec::new();
        for kind in RsKind::ALL {
            let count = config.units(kind);
            let latency = config.latency(kind);
            for slot in 0..count {
                let name = if count > 1 {
                    format!("{} FU{}", kind.label(), slot + 1)
                } else {
                    format!("{} FU", kind.label())
                };
                units.push(FunctionalUnit::new(kind, name, latency));
            }
        }
        Self { units }
    }

    pub fn has_free(&self, kind: RsKind) -> bool {
        self.units.iter().any(|fu| fu.kind == kind && !fu.busy())
    }

    /// Start execution on the first free unit of the class
    pub fn dispatch(&mut self, kind: RsKind, job: ExecJob) -> bool {
        for unit in self.units.iter_mut() {
            if unit.kind == kind && !unit.busy() {
                unit.dispatch(job);
                return true;
            }
        }
        false
    }

    /// Tick every busy unit, collecting executions that finished this cycle
    pub fn tick_all(&mut self, memory: &Memory) -> Vec<FinishedExec> {
        let mut finished = Vec::new();
        for unit in self.units.iter_mut() {
            if let Some(done) = unit.tick(memory) {
                finished.push(done);
            }
        }
        finished
    }

    /// Drop in-flight work belonging to flushed reservation stations
    pub fn flush_stations(&mut self, station_ids: &HashSet<usize>) {
        for unit in self.units.iter_mut() {
            let matches = unit
                .job
                .as_ref()
                .map_or(false, |job| station_ids.contains(&job.station_id));
            if matches {
                unit.reset();
            }
        }
    }

    pub fn all_idle(&self) -> bool {
        self.units.iter().all(|fu| !fu.busy())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionalUnit> {
        self.units.iter()
    }

    pub fn clear_all(&mut self) {
        for unit in self.units.iter_mut() {
            unit.reset();
        }
    }
}
