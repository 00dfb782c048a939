//! # Undocumented Instructions
//!
//! The NMOS 6502 decodes every opcode byte. The unpublished ones fall out of its
//! decode ROM driving two operations at once, and real Apple II software (copy
//! protection in particular) uses some of them.
//!
//! ## Read-modify-write combinations
//!
//! - SLO: ASL then ORA
//! - RLA: ROL then AND
//! - SRE: LSR then EOR
//! - RRA: ROR then ADC
//! - DCP: DEC then CMP
//! - ISC: INC then SBC
//!
//! ## Loads and stores
//!
//! - LAX: LDA and LDX
//! - SAX: store A & X
//! - LAS: A, X, S = M & S
//! - SHA, SHX, SHY, TAS: store a register ANDed with the high address byte plus one
//!
//! ## Immediate
//!
//! - ANC, ALR, ARR, SBX, ANE, LXA
//!
//! ## JAM
//!
//! Stops the CPU until the next reset.

use crate::addressing::AddressingMode;
use crate::cpu::{Execution, Status};
use crate::instructions::alu::{add_with_carry, compare, subtract_with_borrow};
use crate::instructions::inc_dec::{decrement, increment};
use crate::instructions::shifts::{rotate_left, rotate_right, shift_left, shift_right};

/// Value ORed into A by the unstable ANE and LXA opcodes. Varies between chips;
/// 0xEE matches most NMOS parts.
const UNSTABLE_MAGIC: u8 = 0xEE;

pub(crate) fn execute_slo(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.modify(mode, shift_left);
    exec.regs.a |= value;
    let a = exec.regs.a;
    exec.set_nz(a);
}

pub(crate) fn execute_rla(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.modify(mode, rotate_left);
    exec.regs.a &= value;
    let a = exec.regs.a;
    exec.set_nz(a);
}

pub(crate) fn execute_sre(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.modify(mode, shift_right);
    exec.regs.a ^= value;
    let a = exec.regs.a;
    exec.set_nz(a);
}

pub(crate) fn execute_rra(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.modify(mode, rotate_right);
    add_with_carry(exec, value);
}

pub(crate) fn execute_dcp(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.modify(mode, decrement);
    let a = exec.regs.a;
    compare(exec, a, value);
}

pub(crate) fn execute_isc(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.modify(mode, increment);
    subtract_with_borrow(exec, value);
}

pub(crate) fn execute_lax(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode);
    exec.regs.a = value;
    exec.regs.x = value;
    exec.set_nz(value);
}

pub(crate) fn execute_sax(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.regs.a & exec.regs.x;
    exec.store(mode, value);
}

pub(crate) fn execute_las(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode) & exec.regs.s;
    exec.regs.a = value;
    exec.regs.x = value;
    exec.regs.s = value;
    exec.set_nz(value);
}

/// ANC: AND immediate, then copy N into C.
pub(crate) fn execute_anc(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode);
    exec.regs.a &= value;
    let a = exec.regs.a;
    exec.set_nz(a);
    exec.set_flag(Status::CARRY, a & 0x80 != 0);
}

/// ALR: AND immediate, then LSR A.
pub(crate) fn execute_alr(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode) & exec.regs.a;
    exec.regs.a = shift_right(exec, value);
}

/// ARR: AND immediate, then ROR A, with C and V taken from the adder.
///
/// In decimal mode the result is additionally BCD-fixed nibble by nibble.
pub(crate) fn execute_arr(exec: &mut Execution<'_>, mode: AddressingMode) {
    let and = exec.read_operand(mode) & exec.regs.a;
    let carry_in = exec.flag(Status::CARRY);
    let rotated = (and >> 1) | (carry_in as u8) << 7;

    if !exec.flag(Status::DECIMAL) {
        exec.regs.a = rotated;
        exec.set_nz(rotated);
        exec.set_flag(Status::CARRY, rotated & 0x40 != 0);
        exec.set_flag(Status::OVERFLOW, ((rotated >> 6) ^ (rotated >> 5)) & 0x01 != 0);
        return;
    }

    exec.set_flag(Status::NEGATIVE, carry_in);
    exec.set_flag(Status::ZERO, rotated == 0);
    exec.set_flag(Status::OVERFLOW, (rotated ^ and) & 0x40 != 0);

    let mut result = rotated;
    if (and & 0x0F) + (and & 0x01) > 0x05 {
        result = (result & 0xF0) | (result.wrapping_add(0x06) & 0x0F);
    }
    let high_fixup = (and & 0xF0) as u16 + (and & 0x10) as u16 > 0x50;
    if high_fixup {
        result = (result & 0x0F) | (result.wrapping_add(0x60) & 0xF0);
    }
    exec.set_flag(Status::CARRY, high_fixup);
    exec.regs.a = result;
}

/// SBX: X = (A & X) - immediate, without borrow. Flags as CMP.
pub(crate) fn execute_sbx(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode);
    let ax = exec.regs.a & exec.regs.x;
    compare(exec, ax, value);
    exec.regs.x = ax.wrapping_sub(value);
}

/// ANE (XAA): A = (A | magic) & X & immediate.
pub(crate) fn execute_ane(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode);
    let result = (exec.regs.a | UNSTABLE_MAGIC) & exec.regs.x & value;
    exec.regs.a = result;
    exec.set_nz(result);
}

/// LXA: A = X = (A | magic) & immediate.
pub(crate) fn execute_lxa(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode);
    let result = (exec.regs.a | UNSTABLE_MAGIC) & value;
    exec.regs.a = result;
    exec.regs.x = result;
    exec.set_nz(result);
}

/// Stores `value & (H + 1)` where H is the high byte of the base address.
///
/// When indexing crosses a page the stored value also replaces the high byte of the
/// target address.
fn store_high_and(exec: &mut Execution<'_>, mode: AddressingMode, value: u8) {
    let (address, crossed) = exec.operand_address(mode);
    let high = (address >> 8) as u8;
    let base_high = if crossed { high.wrapping_sub(1) } else { high };
    let result = value & base_high.wrapping_add(1);
    let target = if crossed {
        (result as u16) << 8 | (address & 0x00FF)
    } else {
        address
    };
    exec.write(target, result);
}

pub(crate) fn execute_sha(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.regs.a & exec.regs.x;
    store_high_and(exec, mode, value);
}

pub(crate) fn execute_shx(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.regs.x;
    store_high_and(exec, mode, value);
}

pub(crate) fn execute_shy(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.regs.y;
    store_high_and(exec, mode, value);
}

/// TAS: S = A & X, then stores as SHA.
pub(crate) fn execute_tas(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.regs.a & exec.regs.x;
    exec.regs.s = value;
    store_high_and(exec, mode, value);
}

/// JAM: leaves PC on the opcode and halts.
pub(crate) fn execute_jam(exec: &mut Execution<'_>, _mode: AddressingMode) {
    exec.regs.pc = exec.regs.pc.wrapping_sub(1);
    exec.jammed = true;
}
