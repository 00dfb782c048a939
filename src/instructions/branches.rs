//! # Branch Instructions
//!
//! This module implements the conditional branches:
//! - BCC, BCS: Carry clear / set
//! - BEQ, BNE: Zero set / clear
//! - BMI, BPL: Negative set / clear
//! - BVC, BVS: Overflow clear / set
//!
//! All branch instructions use relative addressing with a signed 8-bit offset from the
//! address of the next instruction.
//!
//! Cycle timing:
//! - 2 cycles if branch not taken
//! - 3 cycles if branch taken to same page
//! - 4 cycles if branch taken to different page
//!
//! No flags are affected.

use crate::addressing::{page_crossed, AddressingMode};
use crate::cpu::{Execution, Status};

fn branch(exec: &mut Execution<'_>, mode: AddressingMode, taken: bool) {
    let (target, _) = exec.operand_address(mode);
    if !taken {
        return;
    }
    exec.cycles += 1;
    if page_crossed(exec.regs.pc, target) {
        exec.cycles += 1;
    }
    exec.regs.pc = target;
}

pub(crate) fn execute_bcc(exec: &mut Execution<'_>, mode: AddressingMode) {
    let taken = !exec.flag(Status::CARRY);
    branch(exec, mode, taken);
}

pub(crate) fn execute_bcs(exec: &mut Execution<'_>, mode: AddressingMode) {
    let taken = exec.flag(Status::CARRY);
    branch(exec, mode, taken);
}

pub(crate) fn execute_beq(exec: &mut Execution<'_>, mode: AddressingMode) {
    let taken = exec.flag(Status::ZERO);
    branch(exec, mode, taken);
}

pub(crate) fn execute_bne(exec: &mut Execution<'_>, mode: AddressingMode) {
    let taken = !exec.flag(Status::ZERO);
    branch(exec, mode, taken);
}

pub(crate) fn execute_bmi(exec: &mut Execution<'_>, mode: AddressingMode) {
    let taken = exec.flag(Status::NEGATIVE);
    branch(exec, mode, taken);
}

pub(crate) fn execute_bpl(exec: &mut Execution<'_>, mode: AddressingMode) {
    let taken = !exec.flag(Status::NEGATIVE);
    branch(exec, mode, taken);
}

pub(crate) fn execute_bvc(exec: &mut Execution<'_>, mode: AddressingMode) {
    let taken = !exec.flag(Status::OVERFLOW);
    branch(exec, mode, taken);
}

pub(crate) fn execute_bvs(exec: &mut Execution<'_>, mode: AddressingMode) {
    let taken = exec.flag(Status::OVERFLOW);
    branch(exec, mode, taken);
}
