// branch.rs
//
// Pure branch evaluation for BEQ, CALL, and RET. The core predicts
// not-taken, so every taken outcome computed here turns into a
// misprediction at write-back. Target arithmetic wraps to 16 bits.

/// Outcome of evaluating a BEQ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeqOutcome {
    pub taken: bool,
    pub target: u16,
}

pub fn evaluate_beq(lhs: u16, rhs: u16, offset: i16, pc: usize) -> BeqOutcome {
    let taken = lhs == rhs;
    let target = if taken {
        relative_target(pc, offset)
    } else {
        relative_target(pc, 0)
    };
    BeqOutcome { taken, target }
}

/// CALL: (target, return address). The return address is PC + 1 and is
/// written to R1 when the CALL commits.
pub fn evaluate_call(offset: i16, pc: usize) -> (u16, u16) {
    (relative_target(pc, offset), relative_target(pc, 0))
}

/// RET: the target is whatever R1 holds
pub fn evaluate_ret(r1_value: u16) -> u16 {
    r1_value
}

fn relative_target(pc: usize, offset: i16) -> u16 {
    (pc as i32 + 1 + offset as i32) as u16
}
