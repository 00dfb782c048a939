//! # Flag Instructions
//!
//! This module implements the status flag operations:
//! - CLC, SEC: Clear / set carry
//! - CLI, SEI: Clear / set interrupt disable
//! - CLD, SED: Clear / set decimal mode
//! - CLV: Clear overflow
//!
//! A change to I through CLI or SEI becomes visible to the IRQ line one instruction
//! later; see [`Mos6502`](crate::Mos6502).

use crate::addressing::AddressingMode;
use crate::cpu::{Execution, Status};

pub(crate) fn execute_clc(exec: &mut Execution<'_>, _mode: AddressingMode) {
    exec.set_flag(Status::CARRY, false);
}

pub(crate) fn execute_sec(exec: &mut Execution<'_>, _mode: AddressingMode) {
    exec.set_flag(Status::CARRY, true);
}

pub(crate) fn execute_cli(exec: &mut Execution<'_>, _mode: AddressingMode) {
    exec.set_flag(Status::IRQ_DISABLE, false);
}

pub(crate) fn execute_sei(exec: &mut Execution<'_>, _mode: AddressingMode) {
    exec.set_flag(Status::IRQ_DISABLE, true);
}

pub(crate) fn execute_cld(exec: &mut Execution<'_>, _mode: AddressingMode) {
    exec.set_flag(Status::DECIMAL, false);
}

pub(crate) fn execute_sed(exec: &mut Execution<'_>, _mode: AddressingMode) {
    exec.set_flag(Status::DECIMAL, true);
}

pub(crate) fn execute_clv(exec: &mut Execution<'_>, _mode: AddressingMode) {
    exec.set_flag(Status::OVERFLOW, false);
}
