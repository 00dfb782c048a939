//! # Load and Store Instructions
//!
//! This module implements register loads and stores:
//! - LDA, LDX, LDY: Load register (flags affected: N, Z)
//! - STA, STX, STY: Store register (no flags affected)
//!
//! Loads through `abs,X`, `abs,Y` and `(zp),Y` take one extra cycle on a page crossing.
//! Stores always pay it, so their base cost already includes it.

use crate::addressing::AddressingMode;
use crate::cpu::Execution;

pub(crate) fn execute_lda(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode);
    exec.regs.a = value;
    exec.set_nz(value);
}

pub(crate) fn execute_ldx(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode);
    exec.regs.x = value;
    exec.set_nz(value);
}

pub(crate) fn execute_ldy(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode);
    exec.regs.y = value;
    exec.set_nz(value);
}

pub(crate) fn execute_sta(exec: &mut Execution<'_>, mode: AddressingMode) {
    let a = exec.regs.a;
    exec.store(mode, a);
}

pub(crate) fn execute_stx(exec: &mut Execution<'_>, mode: AddressingMode) {
    let x = exec.regs.x;
    exec.store(mode, x);
}

pub(crate) fn execute_sty(exec: &mut Execution<'_>, mode: AddressingMode) {
    let y = exec.regs.y;
    exec.store(mode, y);
}
