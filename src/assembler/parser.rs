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

// parser.rs
//
// This file contains the assembly parser. It converts program text into a
// list of Instruction records plus a label map binding each label to the
// index of the instruction that follows it. Branch targets stay symbolic;
// the parser only derives the signed offsets to validate them against the
// 5-bit (BEQ) and 7-bit (CALL) immediate encodings.

use crate::errors::SimulatorError;
use crate::processor::instructions::{Instruction, Opcode};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const BEQ_OFFSET_RANGE: (i32, i32) = (-16, 15); // 5-bit signed
const CALL_OFFSET_RANGE: (i32, i32) = (-64, 63); // 7-bit signed

/// A parsed program: decoded instructions in order, and the label map.
/// A label may bind to `instructions.len()` when it trails the program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub labels: HashMap<String, usize>,
}

pub struct Parser;

impl Parser {
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Program, SimulatorError> {
        let source = fs::read_to_string(path)?;
        Self::parse_str(&source)
    }

    pub fn parse_str(source: &str) -> Result<Program, SimulatorError> {
        let mut program = Program::default();

        for (line_index, raw_line) in source.lines().enumerate() {
            let line_no = line_index + 1;

            // Strip comment and surrounding whitespace
            let line = match raw_line.find('#') {
                Some(pos) => &raw_line[..pos],
                None => raw_line,
            };
            let mut line = line.trim();
            if line.is_empty() {
                continue;
            }

            // A label binds to the index of the next instruction. It may sit
            // on its own line or prefix an instruction on the same line.
            if let Some(pos) = line.find(':') {
                let label = line[..pos].trim();
                validate_label(label, line_no)?;
                let previous = program
                    .labels
                    .insert(label.to_uppercase(), program.instructions.len());
                if previous.is_some() {
                    return Err(SimulatorError::ParseError {
                        line: line_no,
                        message: format!("duplicate label '{}'", label),
                    });
                }
                line = line[pos + 1..].trim();
                if line.is_empty() {
                    continue;
                }
            }

            let id = program.instructions.len() + 1;
            let instruction = parse_instruction(line, id, line_no)?;
            program.instructions.push(instruction);
        }

        resolve_labels(&mut program)?;
        Ok(program)
    }
}

fn validate_label(label: &str, line_no: usize) -> Result<(), SimulatorError> {
    let mut chars = label.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        },
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(SimulatorError::ParseError {
            line: line_no,
            message: format!("invalid label '{}'", label),
        })
    }
}

fn parse_instruction(line: &str, id: usize, line_no: usize) -> Result<Instruction, SimulatorError> {
    // Commas are separators only; "ADD R1, R2, R3" -> ["ADD", "R1", "R2", "R3"]
    let cleaned = line.replace(',', " ");
    let parts: Vec<&str> = cleaned.split_whitespace().collect();
    if parts.is_empty() {
        return Err(SimulatorError::ParseError {
            line: line_no,
            message: "empty instruction".to_string(),
        });
    }

    let opcode = Opcode::from_mnemonic(parts[0]).ok_or_else(|| SimulatorError::ParseError {
        line: line_no,
        message: format!("unknown instruction '{}'", parts[0]),
    })?;

    let expect_operands = |count: usize| -> Result<(), SimulatorError> {
        if parts.len() - 1 == count {
            Ok(())
        } else {
            Err(SimulatorError::ParseError {
                line: line_no,
                message: format!(
                    "{} expects {} operand(s), found {}",
                    opcode.mnemonic(),
                    count,
                    parts.len() - 1
                ),
            })
        }
    };

    let instruction = match opcode {
        Opcode::Add | Opcode::Sub | Opcode::Nand | Opcode::Mul => {
            expect_operands(3)?;
            Instruction {
                id,
                opcode,
                ra: Some(parse_register(parts[1], line_no)?),
                rb: Some(parse_register(parts[2], line_no)?),
                rc: Some(parse_register(parts[3], line_no)?),
                immediate: None,
                label: None,
            }
        },
        Opcode::Load | Opcode::Store => {
            expect_operands(2)?;
            let (offset, base) = parse_displacement(parts[2], line_no)?;
            Instruction {
                id,
                opcode,
                ra: Some(parse_register(parts[1], line_no)?),
                rb: Some(base),
                rc: None,
                immediate: Some(offset),
                label: None,
            }
        },
        Opcode::Beq => {
            expect_operands(3)?;
            Instruction {
                id,
                opcode,
                ra: Some(parse_register(parts[1], line_no)?),
                rb: Some(parse_register(parts[2], line_no)?),
                rc: None,
                immediate: None,
                label: Some(parts[3].to_uppercase()),
            }
        },
        Opcode::Call => {
            expect_operands(1)?;
            Instruction {
                id,
                opcode,
                ra: None,
                rb: None,
                rc: None,
                immediate: None,
                label: Some(parts[1].to_uppercase()),
            }
        },
        Opcode::Ret => {
            expect_operands(0)?;
            Instruction {
                id,
                opcode,
                ra: None,
                rb: None,
                rc: None,
                immediate: None,
                label: None,
            }
        },
    };

    Ok(instruction)
}

fn parse_register(text: &str, line_no: usize) -> Result<u8, SimulatorError> {
    let text = text.trim();
    let invalid = || SimulatorError::ParseError {
        line: line_no,
        message: format!("invalid register '{}'", text),
    };
    if text.len() != 2 || !text.starts_with('R') && !text.starts_with('r') {
        return Err(invalid());
    }
    match text[1..].parse::<u8>() {
        Ok(num) if num < 8 => Ok(num),
        _ => Err(invalid()),
    }
}

fn parse_displacement(text: &str, line_no: usize) -> Result<(i16, u8), SimulatorError> {
    // imm(Rb) form, e.g. "4(R0)" or "-2(R3)"
    let invalid = || SimulatorError::ParseError {
        line: line_no,
        message: format!("invalid address operand '{}', expected imm(Rb)", text),
    };
    let open = text.find('(').ok_or_else(invalid)?;
    if !text.ends_with(')') {
        return Err(invalid());
    }
    let offset = text[..open].trim().parse::<i16>().map_err(|_| invalid())?;
    let base = parse_register(&text[open + 1..text.len() - 1], line_no)?;
    Ok((offset, base))
}

/// Second pass: check every referenced label exists, and derive the signed
/// offsets so out-of-range targets are rejected up front. BEQ and CALL keep
/// the symbolic label for redirects; the offset feeds target arithmetic.
fn resolve_labels(program: &mut Program) -> Result<(), SimulatorError> {
    let labels = program.labels.clone();
    for (index, instruction) in program.instructions.iter_mut().enumerate() {
        let label = match &instruction.label {
            Some(label) => label,
            None => continue,
        };
        let target = *labels.get(label).ok_or_else(|| SimulatorError::ParseError {
            line: 0,
            message: format!("undefined label '{}'", label),
        })?;

        let offset = target as i32 - (index as i32 + 1);
        let (min, max) = match instruction.opcode {
            Opcode::Beq => BEQ_OFFSET_RANGE,
            Opcode::Call => CALL_OFFSET_RANGE,
            _ => continue,
        };
        if offset < min || offset > max {
            return Err(SimulatorError::ParseError {
                line: 0,
                message: format!(
                    "{} offset {} to label '{}' exceeds the {}..={} encoding range",
                    instruction.opcode.mnemonic(),
                    offset,
                    label,
                    min,
                    max
                ),
            });
        }
        instruction.immediate = Some(offset as i16);
    }
    Ok(())
}
