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

// instructions.rs
//
// This file contains the instruction definitions for the 16-bit ISA.
// It defines the Opcode enum and the Instruction record produced by the
// assembly parser, along with classification helpers used by the issue
// unit and the reservation station pool.

use serde::Serialize;
use std::fmt;

/// Opcodes of the 16-bit instruction set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Opcode {
    Add,
    Sub,
    Nand,
    Mul,
    Load,
    Store,
    Beq,
    Call,
    Ret,
}

impl Opcode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Nand => "NAND",
            Opcode::Mul => "MUL",
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
            Opcode::Beq => "BEQ",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
        }
    }

    pub fn from_mnemonic(name: &str) -> Option<Opcode> {
        match name.to_uppercase().as_str() {
            "ADD" => Some(Opcode::Add),
            "SUB" => Some(Opcode::Sub),
            "NAND" => Some(Opcode::Nand),
            "MUL" => Some(Opcode::Mul),
            "LOAD" => Some(Opcode::Load),
            "STORE" => Some(Opcode::Store),
            "BEQ" => Some(Opcode::Beq),
            "CALL" => Some(Opcode::Call),
            "RET" => Some(Opcode::Ret),
            _ => None,
        }
    }

    /// Whether instructions of this opcode produce an architectural
    /// register result (and therefore occupy a RAT entry)
    pub fn writes_register(&self) -> bool {
        matches!(
            self,
            Opcode::Add | Opcode::Sub | Opcode::Nand | Opcode::Mul | Opcode::Load | Opcode::Call
        )
    }

    /// Whether instructions of this opcode redirect control flow
    pub fn is_branch(&self) -> bool {
        matches!(self, Opcode::Beq | Opcode::Call | Opcode::Ret)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// A decoded instruction, assigned a unique 1-based id at parse time.
///
/// Register fields, immediate, and label are optional because each opcode
/// uses a different subset of them; the parser guarantees the fields an
/// opcode needs are present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instruction {
    pub id: usize,
    pub opcode: Opcode,
    pub ra: Option<u8>,
    pub rb: Option<u8>,
    pub rc: Option<u8>,
    pub immediate: Option<i16>,
    pub label: Option<String>,
}

impl Instruction {
    /// Destination register written at commit: rA for arithmetic and LOAD,
    /// R1 (the return-address register) for CALL, none otherwise.
    pub fn destination(&self) -> Option<u8> {
        match self.opcode {
            Opcode::Add | Opcode::Sub | Opcode::Nand | Opcode::Mul | Opcode::Load => self.ra,
            Opcode::Call => Some(1),
            Opcode::Store | Opcode::Beq | Opcode::Ret => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode {
            Opcode::Add | Opcode::Sub | Opcode::Nand | Opcode::Mul => write!(
                f,
                "{} R{}, R{}, R{}",
                self.opcode,
                self.ra.unwrap_or(0),
                self.rb.unwrap_or(0),
                self.rc.unwrap_or(0)
            ),
            Opcode::Load | Opcode::Store => write!(
                f,
                "{} R{}, {}(R{})",
                self.opcode,
                self.ra.unwrap_or(0),
                self.immediate.unwrap_or(0),
                self.rb.unwrap_or(0)
            ),
            Opcode::Beq => write!(
                f,
                "{} R{}, R{}, {}",
                self.opcode,
                self.ra.unwrap_or(0),
                self.rb.unwrap_or(0),
                self.label.as_deref().unwrap_or("?")
            ),
            Opcode::Call => write!(f, "{} {}", self.opcode, self.label.as_deref().unwrap_or("?")),
            Opcode::Ret => write!(f, "{}", self.opcode),
        }
    }
}
