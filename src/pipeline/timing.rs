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

// timing.rs
//
// This file contains the timing tracker, which records the cycle of each
// pipeline event (issue, execute-start, execute-finish, write-back, commit)
// per instruction id, and the timing table renderer. An instruction id is
// reused when a loop re-issues the same static instruction; each issue
// starts a fresh record, so the table shows the latest dynamic instance.

use crate::processor::instructions::Instruction;
use colored::Colorize;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// The five per-instruction event cycles; missing stages render as '-'
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InstructionTiming {
    pub issue: Option<usize>,
    pub start_exec: Option<usize>,
    pub finish_exec: Option<usize>,
    pub write: Option<usize>,
    pub commit: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct TimingTracker {
    records: BTreeMap<usize, InstructionTiming>,
}

impl TimingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh record for this id. Later-stage cycles of a previous
    /// dynamic instance are dropped so the stage-order invariant holds and
    /// the table ends up showing the latest instance only.
    pub fn record_issue(&mut self, instr_id: usize, cycle: usize) {
        self.records.insert(
            instr_id,
            InstructionTiming {
                issue: Some(cycle),
                ..InstructionTiming::default()
            },
        );
    }

    /// The record belongs to the dynamic instance issued at `issue_cycle`;
    /// a stale instance superseded by a re-issue stops updating it.
    fn owned_record(&mut self, instr_id: usize, issue_cycle: usize) -> Option<&mut InstructionTiming> {
        self.records
            .get_mut(&instr_id)
            .filter(|record| record.issue == Some(issue_cycle))
    }

    pub fn record_start_exec(&mut self, instr_id: usize, issue_cycle: usize, cycle: usize) {
        if let Some(record) = self.owned_record(instr_id, issue_cycle) {
            record.start_exec = Some(cycle);
        }
    }

    pub fn record_finish_exec(&mut self, instr_id: usize, issue_cycle: usize, cycle: usize) {
        if let Some(record) = self.owned_record(instr_id, issue_cycle) {
            record.finish_exec = Some(cycle);
        }
    }

    pub fn record_write(&mut self, instr_id: usize, issue_cycle: usize, cycle: usize) {
        if let Some(record) = self.owned_record(instr_id, issue_cycle) {
            record.write = Some(cycle);
        }
    }

    pub fn record_commit(&mut self, instr_id: usize, issue_cycle: usize, cycle: usize) {
        if let Some(record) = self.owned_record(instr_id, issue_cycle) {
            record.commit = Some(cycle);
        }
    }

    pub fn get(&self, instr_id: usize) -> Option<InstructionTiming> {
        self.records.get(&instr_id).copied()
    }

    pub fn all(&self) -> &BTreeMap<usize, InstructionTiming> {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

fn cell(value: Option<usize>) -> String {
    match value {
        Some(cycle) => cycle.to_string(),
        None => "-".to_string(),
    }
}

/// Render the timing table in instruction-id order. Instructions that were
/// flushed and never re-issued keep their last recorded cycles and carry a
/// flushed marker.
pub fn render_table(
    instructions: &[Instruction],
    tracker: &TimingTracker,
    flushed: &HashSet<usize>,
) -> String {
    let mut result = String::new();
    result.push_str(&format!("{}\n", "=".repeat(80)));
    result.push_str(&format!(
        "{}\n",
        format!(
            "{:<5} {:<20} {:>6} {:>6} {:>7} {:>6} {:>7}",
            "ID", "Instruction", "Issue", "Exec", "Finish", "Write", "Commit"
        )
        .bold()
    ));
    result.push_str(&format!("{}\n", "-".repeat(80)));

    for instruction in instructions {
        let timing = tracker.get(instruction.id).unwrap_or_default();
        let mut row = format!(
            "{:<5} {:<20} {:>6} {:>6} {:>7} {:>6} {:>7}",
            instruction.id,
            instruction.to_string(),
            cell(timing.issue),
            cell(timing.start_exec),
            cell(timing.finish_exec),
            cell(timing.write),
            cell(timing.commit)
        );
        if flushed.contains(&instruction.id) {
            row.push_str(&format!("  {}", "flushed".red()));
        }
        result.push_str(&row);
        result.push('\n');
    }

    result.push_str(&format!("{}\n", "=".repeat(80)));
    result
}
