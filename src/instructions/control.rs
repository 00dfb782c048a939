//! # Control Flow Instructions
//!
//! This module implements control flow operations:
//! - JMP: Jump (absolute or indirect)
//! - JSR, RTS: Subroutine call and return
//! - BRK, RTI: Software interrupt and return from interrupt
//! - NOP: No operation, including the undocumented forms that read an operand

use crate::addressing::AddressingMode;
use crate::cpu::{Execution, Status, IRQ_VECTOR};

/// Executes the JMP instruction.
///
/// Indirect jumps reproduce the NMOS page-wrap bug: `JMP ($xxFF)` takes its high byte
/// from `$xx00`.
pub(crate) fn execute_jmp(exec: &mut Execution<'_>, mode: AddressingMode) {
    let (target, _) = exec.operand_address(mode);
    exec.regs.pc = target;
}

/// Executes the JSR (Jump to Subroutine) instruction.
///
/// Pushes the address of the last byte of the JSR (return address minus one).
pub(crate) fn execute_jsr(exec: &mut Execution<'_>, mode: AddressingMode) {
    let (target, _) = exec.operand_address(mode);
    let return_address = exec.regs.pc.wrapping_sub(1);
    exec.push_word(return_address);
    exec.regs.pc = target;
}

pub(crate) fn execute_rts(exec: &mut Execution<'_>, _mode: AddressingMode) {
    exec.regs.pc = exec.pull_word().wrapping_add(1);
}

/// Executes the BRK (Force Interrupt) instruction.
///
/// Skips the signature byte, pushes PC and P with B set, sets I and jumps through the
/// IRQ vector.
pub(crate) fn execute_brk(exec: &mut Execution<'_>, mode: AddressingMode) {
    exec.operand_address(mode);
    exec.interrupt(IRQ_VECTOR, true);
}

/// Executes the RTI (Return from Interrupt) instruction.
///
/// Unlike `CLI` and `PLP`, the restored I flag takes effect before the next
/// instruction: a pending IRQ is taken immediately if RTI clears I.
pub(crate) fn execute_rti(exec: &mut Execution<'_>, _mode: AddressingMode) {
    let p = exec.pull();
    exec.regs.p = Status::from_stack(p);
    exec.regs.pc = exec.pull_word();
    exec.resample_irq = true;
}

/// Executes NOP. Undocumented forms read their operand, including the page-crossing
/// cycle for `abs,X`.
pub(crate) fn execute_nop(exec: &mut Execution<'_>, mode: AddressingMode) {
    if mode != AddressingMode::Implicit {
        exec.read_operand(mode);
    }
}
