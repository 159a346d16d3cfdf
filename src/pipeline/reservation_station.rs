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

// reservation_station.rs
//
// This file contains the reservation station pool. Each station holds at
// most one in-flight instruction with its operands, which are either
// captured values or tags naming the ROB entry that will produce them.
// CDB broadcasts resolve tags in place; a station dispatches once every
// operand it uses is a value.

use super::config::ProcessorConfig;
use crate::processor::instructions::{Instruction, Opcode};
use serde::Serialize;
use std::collections::HashSet;

/// Reservation station / functional unit class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RsKind {
    Load,
    Store,
    Beq,
    CallRet,
    AddSub,
    Nand,
    Mul,
}

impl RsKind {
    pub const ALL: [RsKind; 7] = [
        RsKind::Load,
        RsKind::Store,
        RsKind::Beq,
        RsKind::CallRet,
        RsKind::AddSub,
        RsKind::Nand,
        RsKind::Mul,
    ];

    pub fn for_opcode(opcode: Opcode) -> RsKind {
        match opcode {
            Opcode::Load => RsKind::Load,
            Opcode::Store => RsKind::Store,
            Opcode::Beq => RsKind::Beq,
            Opcode::Call | Opcode::Ret => RsKind::CallRet,
            Opcode::Add | Opcode::Sub => RsKind::AddSub,
            Opcode::Nand => RsKind::Nand,
            Opcode::Mul => RsKind::Mul,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RsKind::Load => "LOAD",
            RsKind::Store => "STORE",
            RsKind::Beq => "BEQ",
            RsKind::CallRet => "CALL/RET",
            RsKind::AddSub => "ADD/SUB",
            RsKind::Nand => "NAND",
            RsKind::Mul => "MUL",
        }
    }
}

/// One operand slot: either a captured value or a tag naming the ROB entry
/// whose CDB broadcast will supply it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operand {
    Ready(u16),
    Waiting(usize),
}

impl Operand {
    pub fn is_ready(&self) -> bool {
        matches!(self, Operand::Ready(_))
    }

    pub fn value(&self) -> Option<u16> {
        match self {
            Operand::Ready(value) => Some(*value),
            Operand::Waiting(_) => None,
        }
    }

    pub fn tag(&self) -> Option<usize> {
        match self {
            Operand::Ready(_) => None,
            Operand::Waiting(rob_index) => Some(*rob_index),
        }
    }
}

/// The contents of a busy reservation station
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationEntry {
    pub instruction: Instruction,
    /// Cycle this dynamic instance was issued
    pub issue_cycle: usize,
    /// ROB index this instruction's result retires through
    pub dest: usize,
    /// First source operand (Vj/Qj); None when the opcode has no first source
    pub vj: Option<Operand>,
    /// Second source operand (Vk/Qk)
    pub vk: Option<Operand>,
    /// Captured immediate (the A field)
    pub address: Option<i16>,
    /// Captured instruction index, for branch target arithmetic
    pub pc: Option<usize>,
    /// Dispatched to a functional unit, not yet written back
    pub executing: bool,
}

impl StationEntry {
    /// All operand slots in use hold values. CALL allocates no source
    /// operands and is ready as soon as it is issued.
    pub fn is_ready(&self) -> bool {
        self.vj.map_or(true, |op| op.is_ready()) && self.vk.map_or(true, |op| op.is_ready())
    }

    /// Resolve any Waiting(rob_index) tag in this entry to the value
    pub fn source_update(&mut self, rob_index: usize, value: u16) {
        if self.vj == Some(Operand::Waiting(rob_index)) {
            self.vj = Some(Operand::Ready(value));
        }
        if self.vk == Some(Operand::Waiting(rob_index)) {
            self.vk = Some(Operand::Ready(value));
        }
    }

    /// Whether any operand tag references one of the given ROB indices
    fn references(&self, rob_indices: &HashSet<usize>) -> bool {
        let waiting_on = |op: &Option<Operand>| {
            op.and_then(|o| o.tag())
                .map_or(false, |tag| rob_indices.contains(&tag))
        };
        waiting_on(&self.vj) || waiting_on(&self.vk)
    }
}

/// A named reservation station slot
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub kind: RsKind,
    pub name: String,
    pub entry: Option<StationEntry>,
}

impl Station {
    pub fn busy(&self) -> bool {
        self.entry.is_some()
    }

    pub fn executing(&self) -> bool {
        self.entry.as_ref().map_or(false, |e| e.executing)
    }

    pub fn ready(&self) -> bool {
        self.entry.as_ref().map_or(false, |e| e.is_ready())
    }
}

/// The fixed, typed station pool. Station ids are indices into the pool and
/// stay stable for the lifetime of the simulator.
#[derive(Debug, Clone)]
pub struct StationPool {
    stations: Vec<Station>,
}

impl StationPool {
    pub fn new(config: &ProcessorConfig) -> Self {
        let mut stations = Vec::new();
        for kind in RsKind::ALL {
            let count = config.stations(kind);
            for slot in 0..count {
                let name = if count > 1 {
                    format!("{}{}", kind.label(), slot + 1)
                } else {
                    kind.label().to_string()
                };
                stations.push(Station {
                    kind,
                    name,
                    entry: None,
                });
            }
        }
        Self { stations }
    }

    pub fn has_free(&self, kind: RsKind) -> bool {
        self.stations
            .iter()
            .any(|s| s.kind == kind && !s.busy())
    }

    /// Place an entry in the first free station of the class
    pub fn allocate(&mut self, kind: RsKind, entry: StationEntry) -> Option<usize> {
        for (id, station) in self.stations.iter_mut().enumerate() {
            if station.kind == kind && station.entry.is_none() {
                station.entry = Some(entry);
                return Some(id);
            }
        }
        None
    }

    pub fn get(&self, id: usize) -> &Station {
        &self.stations[id]
    }

    pub fn get_mut(&mut self, id: usize) -> &mut Station {
        &mut self.stations[id]
    }

    /// Release a station after its result broadcast on the CDB
    pub fn release(&mut self, id: usize) {
        self.stations[id].entry = None;
    }

    /// Broadcast an integer result to every busy station
    pub fn forward_integer(&mut self, rob_index: usize, value: u16) {
        for station in self.stations.iter_mut() {
            if let Some(entry) = station.entry.as_mut() {
                entry.source_update(rob_index, value);
            }
        }
    }

    /// A CALL broadcast carries a composite value; only RET operands waiting
    /// on it receive the return address, every other station ignores it.
    pub fn forward_return_address(&mut self, rob_index: usize, return_address: u16) {
        for station in self.stations.iter_mut() {
            if let Some(entry) = station.entry.as_mut() {
                if entry.instruction.opcode == Opcode::Ret {
                    entry.source_update(rob_index, return_address);
                }
            }
        }
    }

    /// Clear every station whose destination or operand tags reference a
    /// discarded ROB index; returns the cleared station ids so the matching
    /// functional units can be flushed too.
    pub fn flush(&mut self, discarded: &HashSet<usize>) -> Vec<usize> {
        let mut cleared = Vec::new();
        for (id, station) in self.stations.iter_mut().enumerate() {
            let flush = match station.entry.as_ref() {
                Some(entry) => discarded.contains(&entry.dest) || entry.references(discarded),
                None => false,
            };
            if flush {
                station.entry = None;
                cleared.push(id);
            }
        }
        cleared
    }

    pub fn all_idle(&self) -> bool {
        self.stations.iter().all(|s| !s.busy())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.iter()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn clear_all(&mut self) {
        for station in self.stations.iter_mut() {
            station.entry = None;
        }
    }
}
