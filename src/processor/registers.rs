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

// registers.rs
//
// This file contains the architectural register file: eight 16-bit
// registers, with R0 hardwired to zero.

pub const NUM_REGISTERS: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct RegisterFile {
    data: [u16; NUM_REGISTERS],
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            data: [0; NUM_REGISTERS],
        }
    }

    pub fn read(&self, reg: u8) -> u16 {
        if reg == 0 {
            0 // R0 is always 0
        } else if (reg as usize) < NUM_REGISTERS {
            self.data[reg as usize]
        } else {
            0 // Return 0 for out-of-bounds reads
        }
    }

    pub fn write(&mut self, reg: u8, value: u16) {
        if reg != 0 && (reg as usize) < NUM_REGISTERS {
            self.data[reg as usize] = value;
        }
        // Writes to R0 or out-of-bounds registers are ignored
    }

    pub fn contents(&self) -> [u16; NUM_REGISTERS] {
        self.data
    }

    pub fn dump_registers(&self) -> String {
        let mut result = String::new();
        result.push_str("Registers:\n");
        for (i, value) in self.data.iter().enumerate() {
            result.push_str(&format!("  R{} = {} (0x{:04X})\n", i, value, value));
        }
        result
    }
}
