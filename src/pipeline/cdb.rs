// cdb.rs
//
// Common Data Bus: the single shared result-broadcast channel. At most one
// producer may broadcast per cycle; the broadcast stays observable for the
// rest of the cycle and is cleared at the start of the next one.

use crate::processor::instructions::Opcode;
use serde::Serialize;

/// Payload classes carried by a broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BroadcastValue {
    /// Arithmetic / LOAD result forwarded to waiting stations
    Integer(u16),
    /// CALL composite; forwarded only to RET operand waiters
    Call { return_address: u16, target: u16 },
    /// Completion-only broadcast (STORE, BEQ, RET)
    Completion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CdbBroadcast {
    pub rob_index: usize,
    pub value: BroadcastValue,
    pub opcode: Opcode,
}

#[derive(Debug, Clone, Default)]
pub struct CommonDataBus {
    current: Option<CdbBroadcast>,
}

impl CommonDataBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the bus for this cycle; fails if a broadcast already happened
    pub fn broadcast(&mut self, rob_index: usize, value: BroadcastValue, opcode: Opcode) -> bool {
        if self.current.is_some() {
            return false;
        }
        self.current = Some(CdbBroadcast {
            rob_index,
            value,
            opcode,
        });
        true
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    /// The broadcast visible during this cycle, if any
    pub fn current(&self) -> Option<&CdbBroadcast> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
