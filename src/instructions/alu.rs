//! # ALU (Arithmetic Logic Unit) Instructions
//!
//! This module implements arithmetic and logical operations:
//! - ADC: Add with Carry
//! - SBC: Subtract with Carry
//! - AND, ORA, EOR: Bitwise operations
//! - CMP, CPX, CPY: Compare
//! - BIT: Bit test
//!
//! ADC and SBC honor the decimal flag with NMOS semantics: the result is BCD corrected,
//! C is the decimal carry, and N, V and Z come from intermediate values rather than the
//! final accumulator. Programs that test Z after a decimal add on a 6502 (as opposed to
//! a 65C02) rely on this.

use crate::addressing::AddressingMode;
use crate::cpu::{Execution, Status};

/// Executes the ADC (Add with Carry) instruction.
///
/// Flags affected: N, V, Z, C
pub(crate) fn execute_adc(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode);
    add_with_carry(exec, value);
}

/// Executes the SBC (Subtract with Carry) instruction.
///
/// Carry acts as an inverted borrow: C = 1 means no borrow.
///
/// Flags affected: N, V, Z, C
pub(crate) fn execute_sbc(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode);
    subtract_with_borrow(exec, value);
}

pub(crate) fn execute_and(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode);
    exec.regs.a &= value;
    let a = exec.regs.a;
    exec.set_nz(a);
}

pub(crate) fn execute_ora(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode);
    exec.regs.a |= value;
    let a = exec.regs.a;
    exec.set_nz(a);
}

pub(crate) fn execute_eor(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode);
    exec.regs.a ^= value;
    let a = exec.regs.a;
    exec.set_nz(a);
}

pub(crate) fn execute_cmp(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode);
    let a = exec.regs.a;
    compare(exec, a, value);
}

pub(crate) fn execute_cpx(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode);
    let x = exec.regs.x;
    compare(exec, x, value);
}

pub(crate) fn execute_cpy(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode);
    let y = exec.regs.y;
    compare(exec, y, value);
}

/// Executes the BIT (Bit Test) instruction.
///
/// Z is set from `A & M`; N and V are copied from bits 7 and 6 of the operand.
/// A is not changed.
pub(crate) fn execute_bit(exec: &mut Execution<'_>, mode: AddressingMode) {
    let value = exec.read_operand(mode);
    let a = exec.regs.a;
    exec.set_flag(Status::ZERO, a & value == 0);
    exec.set_flag(Status::NEGATIVE, value & 0x80 != 0);
    exec.set_flag(Status::OVERFLOW, value & 0x40 != 0);
}

/// Compare `register` with `value`: C = register >= value, N/Z from the difference.
pub(crate) fn compare(exec: &mut Execution<'_>, register: u8, value: u8) {
    exec.set_flag(Status::CARRY, register >= value);
    exec.set_nz(register.wrapping_sub(value));
}

/// Adds `value` and C to A. Shared with RRA.
pub(crate) fn add_with_carry(exec: &mut Execution<'_>, value: u8) {
    let a = exec.regs.a as u16;
    let v = value as u16;
    let carry = exec.flag(Status::CARRY) as u16;
    let binary = a + v + carry;

    if !exec.flag(Status::DECIMAL) {
        let result = binary as u8;
        exec.set_flag(Status::CARRY, binary > 0xFF);
        // Overflow when both inputs share a sign that differs from the result
        exec.set_flag(
            Status::OVERFLOW,
            (exec.regs.a ^ result) & (value ^ result) & 0x80 != 0,
        );
        exec.regs.a = result;
        exec.set_nz(result);
        return;
    }

    let mut sum = (a & 0x0F) + (v & 0x0F) + carry;
    if sum > 0x09 {
        sum += 0x06;
    }
    sum = if sum <= 0x0F {
        (sum & 0x0F) + (a & 0xF0) + (v & 0xF0)
    } else {
        (sum & 0x0F) + (a & 0xF0) + (v & 0xF0) + 0x10
    };
    // Z reflects the binary sum, N and V the half-adjusted one
    exec.set_flag(Status::ZERO, binary & 0xFF == 0);
    exec.set_flag(Status::NEGATIVE, sum & 0x80 != 0);
    exec.set_flag(
        Status::OVERFLOW,
        (a ^ sum) & 0x80 != 0 && (a ^ v) & 0x80 == 0,
    );
    if sum & 0x1F0 > 0x90 {
        sum += 0x60;
    }
    exec.set_flag(Status::CARRY, sum & 0xFF0 > 0xF0);
    exec.regs.a = sum as u8;
}

/// Subtracts `value` and the inverted C from A. Shared with ISC and USBC.
pub(crate) fn subtract_with_borrow(exec: &mut Execution<'_>, value: u8) {
    let a = exec.regs.a as u32;
    let v = value as u32;
    let borrow = !exec.flag(Status::CARRY) as u32;
    let binary = a.wrapping_sub(v).wrapping_sub(borrow);

    // Flags always come from the binary difference
    exec.set_flag(Status::CARRY, binary < 0x100);
    exec.set_flag(
        Status::OVERFLOW,
        (a ^ binary) & 0x80 != 0 && (a ^ v) & 0x80 != 0,
    );
    exec.set_nz(binary as u8);

    if !exec.flag(Status::DECIMAL) {
        exec.regs.a = binary as u8;
        return;
    }

    let lo = (a & 0x0F).wrapping_sub(v & 0x0F).wrapping_sub(borrow);
    let mut result = if lo & 0x10 != 0 {
        (lo.wrapping_sub(0x06) & 0x0F) | (a & 0xF0).wrapping_sub(v & 0xF0).wrapping_sub(0x10)
    } else {
        (lo & 0x0F) | (a & 0xF0).wrapping_sub(v & 0xF0)
    };
    if result & 0x100 != 0 {
        result = result.wrapping_sub(0x60);
    }
    exec.regs.a = result as u8;
}
