//! # Register Transfer Instructions
//!
//! - TAX, TAY, TXA, TYA: Transfer between A and the index registers
//! - TSX, TXS: Transfer between X and the stack pointer
//!
//! All set N and Z from the copied value except TXS, which affects no flags.

use crate::addressing::AddressingMode;
use crate::cpu::Execution;

pub(crate) fn execute_tax(exec: &mut Execution<'_>, _mode: AddressingMode) {
    let value = exec.regs.a;
    exec.regs.x = value;
    exec.set_nz(value);
}

pub(crate) fn execute_tay(exec: &mut Execution<'_>, _mode: AddressingMode) {
    let value = exec.regs.a;
    exec.regs.y = value;
    exec.set_nz(value);
}

pub(crate) fn execute_txa(exec: &mut Execution<'_>, _mode: AddressingMode) {
    let value = exec.regs.x;
    exec.regs.a = value;
    exec.set_nz(value);
}

pub(crate) fn execute_tya(exec: &mut Execution<'_>, _mode: AddressingMode) {
    let value = exec.regs.y;
    exec.regs.a = value;
    exec.set_nz(value);
}

pub(crate) fn execute_tsx(exec: &mut Execution<'_>, _mode: AddressingMode) {
    let value = exec.regs.s;
    exec.regs.x = value;
    exec.set_nz(value);
}

pub(crate) fn execute_txs(exec: &mut Execution<'_>, _mode: AddressingMode) {
    exec.regs.s = exec.regs.x;
}
