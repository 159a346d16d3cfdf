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

// config.rs
//
// This file contains the configuration for the Tomasulo pipeline: the
// reservation station pool shape, the functional unit pool shape, execution
// latencies, the reorder buffer capacity, and the watchdog cycle limit.
// Defaults reproduce the reference machine; tests may shrink or grow the
// pools through the builder methods.

use super::reservation_station::RsKind;

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorConfig {
    /// Reorder buffer capacity (circular)
    pub rob_capacity: usize,
    /// Watchdog: the driver halts after this many cycles regardless of
    /// completion
    pub max_cycles: usize,

    // Reservation station count per class
    pub load_stations: usize,
    pub store_stations: usize,
    pub beq_stations: usize,
    pub call_ret_stations: usize,
    pub add_sub_stations: usize,
    pub nand_stations: usize,
    pub mul_stations: usize,

    // Functional unit count per class
    pub load_units: usize,
    pub store_units: usize,
    pub beq_units: usize,
    pub call_ret_units: usize,
    pub add_sub_units: usize,
    pub nand_units: usize,
    pub mul_units: usize,

    // Execution latency in cycles per class
    pub load_latency: usize,
    pub store_latency: usize,
    pub beq_latency: usize,
    pub call_ret_latency: usize,
    pub add_sub_latency: usize,
    pub nand_latency: usize,
    pub mul_latency: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            rob_capacity: 8,
            max_cycles: 1000,
            load_stations: 2,
            store_stations: 1,
            beq_stations: 2,
            call_ret_stations: 1,
            add_sub_stations: 4,
            nand_stations: 1,
            mul_stations: 1,
            load_units: 2,
            store_units: 1,
            beq_units: 2,
            call_ret_units: 1,
            add_sub_units: 4,
            nand_units: 1,
            mul_units: 1,
            // LOAD and STORE spend 2 cycles on the address add and 4 on
            // the memory phase
            load_latency: 6,
            store_latency: 6,
            beq_latency: 1,
            call_ret_latency: 1,
            add_sub_latency: 2,
            nand_latency: 1,
            mul_latency: 12,
        }
    }
}

impl ProcessorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rob_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "ROB capacity must be positive");
        self.rob_capacity = capacity;
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: usize) -> Self {
        assert!(max_cycles > 0, "Cycle limit must be positive");
        self.max_cycles = max_cycles;
        self
    }

    pub fn stations(&self, kind: RsKind) -> usize {
        match kind {
            RsKind::Load => self.load_stations,
            RsKind::Store => self.store_stations,
            RsKind::Beq => self.beq_stations,
            RsKind::CallRet => self.call_ret_stations,
            RsKind::AddSub => self.add_sub_stations,
            RsKind::Nand => self.nand_stations,
            RsKind::Mul => self.mul_stations,
        }
    }

    pub fn units(&self, kind: RsKind) -> usize {
        match kind {
            RsKind::Load => self.load_units,
            RsKind::Store => self.store_units,
            RsKind::Beq => self.beq_units,
            RsKind::CallRet => self.call_ret_units,
            RsKind::AddSub => self.add_sub_units,
            RsKind::Nand => self.nand_units,
            RsKind::Mul => self.mul_units,
        }
    }

    pub fn latency(&self, kind: RsKind) -> usize {
        match kind {
            RsKind::Load => self.load_latency,
            RsKind::Store => self.store_latency,
            RsKind::Beq => self.beq_latency,
            RsKind::CallRet => self.call_ret_latency,
            RsKind::AddSub => self.add_sub_latency,
            RsKind::Nand => self.nand_latency,
            RsKind::Mul => self.mul_latency,
        }
    }
}
