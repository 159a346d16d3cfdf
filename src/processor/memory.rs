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

// memory.rs
//
// This file contains the simulated data memory: a 16-bit word-addressable
// store. Unwritten addresses read as zero, so the backing store is a sparse
// ordered map rather than a full 64K array; the ordering also keeps memory
// dumps and snapshots deterministic.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Memory {
    data: BTreeMap<u16, u16>,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
        }
    }

    /// Read a 16-bit word; unwritten addresses return 0
    pub fn read(&self, address: u16) -> u16 {
        self.data.get(&address).copied().unwrap_or(0)
    }

    /// Write a 16-bit word. Writing 0 removes the entry so that the
    /// non-zero view stays minimal.
    pub fn write(&mut self, address: u16, value: u16) {
        if value == 0 {
            self.data.remove(&address);
        } else {
            self.data.insert(address, value);
        }
    }

    /// Non-zero memory contents in address order
    pub fn nonzero(&self) -> &BTreeMap<u16, u16> {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn dump_memory(&self) -> String {
        let mut result = String::new();
        result.push_str("Memory (non-zero words):\n");
        if self.data.is_empty() {
            result.push_str("  (empty)\n");
        }
        for (address, value) in &self.data {
            result.push_str(&format!(
                "  [{:>5}] = {} (0x{:04X})\n",
                address, value, value
            ));
        }
        result
    }
}
