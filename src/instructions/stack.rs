//! # Stack Instructions
//!
//! - PHA, PLA: Push / pull accumulator
//! - PHP, PLP: Push / pull processor status
//!
//! The stack lives in page 1 and grows downward. PHP pushes P with B and the unused
//! bit set; PLP ignores B in the pulled byte.

use crate::addressing::AddressingMode;
use crate::cpu::{Execution, Status};

pub(crate) fn execute_pha(exec: &mut Execution<'_>, _mode: AddressingMode) {
    let a = exec.regs.a;
    exec.push(a);
}

pub(crate) fn execute_php(exec: &mut Execution<'_>, _mode: AddressingMode) {
    let p = exec.regs.p | Status::BREAK | Status::UNUSED;
    exec.push(p.bits());
}

pub(crate) fn execute_pla(exec: &mut Execution<'_>, _mode: AddressingMode) {
    let value = exec.pull();
    exec.regs.a = value;
    exec.set_nz(value);
}

/// Executes PLP. The new I flag reaches the IRQ line after one more instruction.
pub(crate) fn execute_plp(exec: &mut Execution<'_>, _mode: AddressingMode) {
    let value = exec.pull();
    exec.regs.p = Status::from_stack(value);
}
