//! # Shift and Rotate Instructions
//!
//! This module implements shift and rotate operations:
//! - ASL: Arithmetic Shift Left
//! - LSR: Logical Shift Right
//! - ROL: Rotate Left through carry
//! - ROR: Rotate Right through carry
//!
//! Each operates on A (accumulator mode) or on memory as a read-modify-write.
//! The bit shifted out lands in C; N and Z follow the result.

use crate::addressing::AddressingMode;
use crate::cpu::{Execution, Status};

pub(crate) fn shift_left(exec: &mut Execution<'_>, value: u8) -> u8 {
    let result = value << 1;
    exec.set_flag(Status::CARRY, value & 0x80 != 0);
    exec.set_nz(result);
    result
}

pub(crate) fn shift_right(exec: &mut Execution<'_>, value: u8) -> u8 {
    let result = value >> 1;
    exec.set_flag(Status::CARRY, value & 0x01 != 0);
    exec.set_nz(result);
    result
}

pub(crate) fn rotate_left(exec: &mut Execution<'_>, value: u8) -> u8 {
    let result = (value << 1) | exec.flag(Status::CARRY) as u8;
    exec.set_flag(Status::CARRY, value & 0x80 != 0);
    exec.set_nz(result);
    result
}

pub(crate) fn rotate_right(exec: &mut Execution<'_>, value: u8) -> u8 {
    let result = (value >> 1) | (exec.flag(Status::CARRY) as u8) << 7;
    exec.set_flag(Status::CARRY, value & 0x01 != 0);
    exec.set_nz(result);
    result
}

pub(crate) fn execute_asl(exec: &mut Execution<'_>, mode: AddressingMode) {
    exec.modify(mode, shift_left);
}

pub(crate) fn execute_lsr(exec: &mut Execution<'_>, mode: AddressingMode) {
    exec.modify(mode, shift_right);
}

pub(crate) fn execute_rol(exec: &mut Execution<'_>, mode: AddressingMode) {
    exec.modify(mode, rotate_left);
}

pub(crate) fn execute_ror(exec: &mut Execution<'_>, mode: AddressingMode) {
    exec.modify(mode, rotate_right);
}
