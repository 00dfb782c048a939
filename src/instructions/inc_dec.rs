//! # Increment and Decrement Instructions
//!
//! - INC, DEC: Memory, read-modify-write
//! - INX, INY, DEX, DEY: Index registers
//!
//! Flags affected: N, Z

use crate::addressing::AddressingMode;
use crate::cpu::Execution;

pub(crate) fn increment(exec: &mut Execution<'_>, value: u8) -> u8 {
    let result = value.wrapping_add(1);
    exec.set_nz(result);
    result
}

pub(crate) fn decrement(exec: &mut Execution<'_>, value: u8) -> u8 {
    let result = value.wrapping_sub(1);
    exec.set_nz(result);
    result
}

pub(crate) fn execute_inc(exec: &mut Execution<'_>, mode: AddressingMode) {
    exec.modify(mode, increment);
}

pub(crate) fn execute_dec(exec: &mut Execution<'_>, mode: AddressingMode) {
    exec.modify(mode, decrement);
}

pub(crate) fn execute_inx(exec: &mut Execution<'_>, _mode: AddressingMode) {
    let x = exec.regs.x;
    exec.regs.x = increment(exec, x);
}

pub(crate) fn execute_iny(exec: &mut Execution<'_>, _mode: AddressingMode) {
    let y = exec.regs.y;
    exec.regs.y = increment(exec, y);
}

pub(crate) fn execute_dex(exec: &mut Execution<'_>, _mode: AddressingMode) {
    let x = exec.regs.x;
    exec.regs.x = decrement(exec, x);
}

pub(crate) fn execute_dey(exec: &mut Execution<'_>, _mode: AddressingMode) {
    let y = exec.regs.y;
    exec.regs.y = decrement(exec, y);
}
