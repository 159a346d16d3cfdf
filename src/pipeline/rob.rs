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

// rob.rs
//
// This file contains the reorder buffer: a bounded circular queue of
// in-flight instructions in program order. The head is the oldest entry and
// commits first; new entries are allocated at the tail by the issue unit.
// Flushes on a mispredicted branch pop from the tail back down to (but not
// including) the branch's own entry.

use crate::processor::instructions::Opcode;
use serde::Serialize;

/// Result payload of a reorder buffer entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RobValue {
    /// No value: not yet written back, or an opcode with no result (BEQ, RET)
    None,
    /// Arithmetic or LOAD result
    Integer(u16),
    /// STORE: the (address, word) pair written to memory at write-back
    Store { address: u16, value: u16 },
    /// CALL: the return address destined for R1 plus the branch target
    Call { return_address: u16, target: u16 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobEntry {
    pub instr_id: usize,
    /// Cycle the owning dynamic instance was issued; distinguishes it from
    /// other instances of the same static instruction during loops
    pub issue_cycle: usize,
    pub opcode: Opcode,
    pub dest: Option<u8>,
    pub ready: bool,
    pub value: RobValue,
    /// Cycle the result broadcast on the CDB; commit requires it to lie in
    /// an earlier cycle
    pub write_cycle: Option<usize>,
}

impl RobEntry {
    pub fn new(instr_id: usize, issue_cycle: usize, opcode: Opcode, dest: Option<u8>) -> Self {
        Self {
            instr_id,
            issue_cycle,
            opcode,
            dest,
            ready: false,
            value: RobValue::None,
            write_cycle: None,
        }
    }

    /// Mark the entry complete with its result
    pub fn complete(&mut self, value: RobValue, cycle: usize) {
        self.ready = true;
        self.value = value;
        self.write_cycle = Some(cycle);
    }
}

#[derive(Debug, Clone)]
pub struct ReorderBuffer {
    slots: Vec<Option<RobEntry>>,
    head: usize,
    tail: usize,
    count: usize,
}

impl ReorderBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    pub fn head_index(&self) -> usize {
        self.head
    }

    /// Index the next push will allocate
    pub fn tail_index(&self) -> usize {
        self.tail
    }

    /// Whether `index` currently names an in-flight entry
    pub fn is_live(&self, index: usize) -> bool {
        index < self.slots.len() && self.count > 0 && self.distance_from_head(index) < self.count
    }

    /// Circular distance of `index` from the head; the arbitration measure
    /// of instruction age (0 = oldest)
    pub fn distance_from_head(&self, index: usize) -> usize {
        (index + self.slots.len() - self.head) % self.slots.len()
    }

    /// Allocate an entry at the tail, returning its index
    pub fn push(&mut self, entry: RobEntry) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        let index = self.tail;
        self.slots[index] = Some(entry);
        self.tail = (self.tail + 1) % self.slots.len();
        self.count += 1;
        Some(index)
    }

    pub fn get(&self, index: usize) -> Option<&RobEntry> {
        if self.is_live(index) {
            self.slots[index].as_ref()
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut RobEntry> {
        if self.is_live(index) {
            self.slots[index].as_mut()
        } else {
            None
        }
    }

    /// Mark a live entry ready with its result; a stale index (already
    /// committed or flushed) is ignored
    pub fn mark_ready(&mut self, index: usize, value: RobValue, cycle: usize) {
        if let Some(entry) = self.get_mut(index) {
            entry.complete(value, cycle);
        }
    }

    pub fn peek_front(&self) -> Option<(usize, &RobEntry)> {
        if self.is_empty() {
            None
        } else {
            self.slots[self.head].as_ref().map(|e| (self.head, e))
        }
    }

    pub fn pop_front(&mut self) -> Option<(usize, RobEntry)> {
        if self.is_empty() {
            return None;
        }
        let index = self.head;
        let entry = self.slots[index].take();
        self.head = (self.head + 1) % self.slots.len();
        self.count -= 1;
        entry.map(|e| (index, e))
    }

    pub fn pop_back(&mut self) -> Option<(usize, RobEntry)> {
        if self.is_empty() {
            return None;
        }
        self.tail = (self.tail + self.slots.len() - 1) % self.slots.len();
        let entry = self.slots[self.tail].take();
        self.count -= 1;
        entry.map(|e| (self.tail, e))
    }

    /// Discard entries from the tail until the entry immediately after
    /// `branch_index` is removed; the branch entry itself stays and commits
    /// normally. Returns the discarded entries, youngest first.
    pub fn flush_after(&mut self, branch_index: usize) -> Vec<(usize, RobEntry)> {
        let mut discarded = Vec::new();
        if !self.is_live(branch_index) {
            return discarded;
        }
        loop {
            let newest = (self.tail + self.slots.len() - 1) % self.slots.len();
            if newest == branch_index || self.is_empty() {
                break;
            }
            if let Some(popped) = self.pop_back() {
                discarded.push(popped);
            } else {
                break;
            }
        }
        discarded
    }

    /// In-flight entries in program order, oldest first, with their indices
    pub fn iter(&self) -> impl Iterator<Item = (usize, &RobEntry)> {
        let capacity = self.slots.len();
        let head = self.head;
        (0..self.count).filter_map(move |offset| {
            let index = (head + offset) % capacity;
            self.slots[index].as_ref().map(|e| (index, e))
        })
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }
}
