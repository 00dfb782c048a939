//! Property-based tests for CPU invariants.
//!
//! These tests use proptest to verify that instruction execution and cycle
//! accounting hold across the whole opcode space and operand range.

use std::rc::Rc;

use a2core::{Component, Message, Mos6502, OpcodeClass, Ram, Registers, Status, OPCODE_TABLE};
use proptest::prelude::*;

/// Helper function to create a CPU with reset vector at 0x8000, already out of reset
fn setup_cpu() -> (Rc<Mos6502>, Rc<Ram>) {
    let ram = Ram::with_size(0x10000);
    ram.load_bytes(0xFFFC, &[0x00, 0x80]);

    let cpu = Mos6502::new();
    cpu.set_ref("memoryBus", Some(ram.clone()));
    cpu.init().unwrap();
    cpu.step();
    (cpu, ram)
}

/// Opcodes whose only effect on PC is advancing past the instruction
fn straight_line_opcodes() -> Vec<u8> {
    OPCODE_TABLE
        .iter()
        .enumerate()
        .filter(|(_, m)| {
            m.class != OpcodeClass::Jam
                && !matches!(
                    m.mnemonic,
                    "BCC" | "BCS" | "BEQ" | "BMI" | "BNE" | "BPL" | "BVC" | "BVS" | "JMP" | "JSR"
                        | "RTS" | "RTI" | "BRK"
                )
        })
        .map(|(i, _)| i as u8)
        .collect()
}

fn to_bcd(value: u8) -> u8 {
    (value / 10) << 4 | (value % 10)
}

fn with_registers(cpu: &Mos6502, a: u8, p: Status) {
    cpu.set_registers(Registers {
        a,
        p: p | Status::UNUSED,
        ..cpu.registers()
    });
}

// ========== PC Advancement ==========

proptest! {
    /// Property: For straight-line instructions, PC advances by exactly size_bytes
    #[test]
    fn prop_pc_advances_by_instruction_size(
        opcode in prop::sample::select(straight_line_opcodes()),
        operand1 in 0u8..=255u8,
        operand2 in 0u8..=255u8,
    ) {
        let (cpu, ram) = setup_cpu();
        let metadata = &OPCODE_TABLE[opcode as usize];
        ram.load_bytes(0x8000, &[opcode, operand1, operand2]);

        cpu.step();

        prop_assert_eq!(
            cpu.registers().pc,
            0x8000 + metadata.size_bytes as u16,
            "opcode 0x{:02X} ({})",
            opcode,
            metadata.mnemonic
        );
    }

    /// Property: Straight-line instructions cost their base cycles plus at most one
    #[test]
    fn prop_cycles_within_page_penalty(
        opcode in prop::sample::select(straight_line_opcodes()),
        operand1 in 0u8..=255u8,
        operand2 in 0u8..=255u8,
        x in 0u8..=255u8,
        y in 0u8..=255u8,
    ) {
        let (cpu, ram) = setup_cpu();
        let metadata = &OPCODE_TABLE[opcode as usize];
        ram.load_bytes(0x8000, &[opcode, operand1, operand2]);
        cpu.set_registers(Registers { x, y, ..cpu.registers() });

        let cycles = cpu.step();
        let base = metadata.base_cycles as i64;
        prop_assert!(
            cycles == base || cycles == base + 1,
            "opcode 0x{:02X} ({}) took {} cycles, base {}",
            opcode,
            metadata.mnemonic,
            cycles,
            base
        );
    }
}

// ========== Cycle Budget ==========

proptest! {
    /// Property: A budget overrun never exceeds the last instruction's cost
    #[test]
    fn prop_budget_overrun_is_bounded(budget in 1i64..2000, program in prop::collection::vec(
        prop::sample::select(vec![0xEAu8, 0xE8, 0xC8, 0xCA, 0x18, 0x38]), 1..64
    )) {
        let (cpu, ram) = setup_cpu();
        // Loop the program forever with JMP $8000
        let mut image = program.clone();
        image.extend([0x4C, 0x00, 0x80]);
        ram.load_bytes(0x8000, &image);

        cpu.post_message(&mut Message::SetPendingCycles(budget));
        cpu.post_message(&mut Message::Run);
        let remaining = cpu.pending_cycles();

        prop_assert!(remaining <= 0);
        prop_assert!(remaining > -3, "overran by {}", -remaining);
    }

    /// Property: Splitting a budget does not change where a NOP stream ends up
    #[test]
    fn prop_split_budget_matches_single_run(first in 1i64..200, second in 1i64..200) {
        let (split, split_ram) = setup_cpu();
        let (whole, whole_ram) = setup_cpu();
        split_ram.load_bytes(0x8000, &[0xEA; 0x200]);
        whole_ram.load_bytes(0x8000, &[0xEA; 0x200]);

        split.set_pending_cycles(first);
        split.execute();
        split.set_pending_cycles(split.pending_cycles() + second);
        split.execute();

        whole.set_pending_cycles(first + second);
        whole.execute();

        prop_assert_eq!(split.registers().pc, whole.registers().pc);
    }
}

// ========== Arithmetic ==========

proptest! {
    /// Property: Binary ADC matches 9-bit addition
    #[test]
    fn prop_binary_adc(a in 0u8..=255u8, m in 0u8..=255u8, carry in any::<bool>()) {
        let (cpu, ram) = setup_cpu();
        ram.load_bytes(0x8000, &[0x69, m]);
        with_registers(&cpu, a, if carry { Status::CARRY } else { Status::empty() });

        cpu.step();

        let sum = a as u16 + m as u16 + carry as u16;
        let regs = cpu.registers();
        prop_assert_eq!(regs.a, sum as u8);
        prop_assert_eq!(regs.p.contains(Status::CARRY), sum > 0xFF);
        prop_assert_eq!(regs.p.contains(Status::ZERO), sum as u8 == 0);
        let overflow = a as i8 as i16 + m as i8 as i16 + carry as i16;
        prop_assert_eq!(regs.p.contains(Status::OVERFLOW), !(-128..=127).contains(&overflow));
    }

    /// Property: Decimal ADC of valid BCD operands matches decimal addition
    #[test]
    fn prop_decimal_adc(a in 0u8..100, m in 0u8..100, carry in any::<bool>()) {
        let (cpu, ram) = setup_cpu();
        ram.load_bytes(0x8000, &[0x69, to_bcd(m)]);
        let carry_flag = if carry { Status::CARRY } else { Status::empty() };
        with_registers(&cpu, to_bcd(a), Status::DECIMAL | carry_flag);

        cpu.step();

        let sum = a as u16 + m as u16 + carry as u16;
        let regs = cpu.registers();
        prop_assert_eq!(regs.a, to_bcd((sum % 100) as u8));
        prop_assert_eq!(regs.p.contains(Status::CARRY), sum >= 100);
    }

    /// Property: Decimal SBC of valid BCD operands matches decimal subtraction
    #[test]
    fn prop_decimal_sbc(a in 0u8..100, m in 0u8..100, carry in any::<bool>()) {
        let (cpu, ram) = setup_cpu();
        ram.load_bytes(0x8000, &[0xE9, to_bcd(m)]);
        let carry_flag = if carry { Status::CARRY } else { Status::empty() };
        with_registers(&cpu, to_bcd(a), Status::DECIMAL | carry_flag);

        cpu.step();

        let difference = a as i16 - m as i16 - (!carry) as i16;
        let regs = cpu.registers();
        prop_assert_eq!(regs.a, to_bcd(difference.rem_euclid(100) as u8));
        prop_assert_eq!(regs.p.contains(Status::CARRY), difference >= 0);
    }

    /// Property: CMP sets C and Z like an unsigned comparison
    #[test]
    fn prop_cmp_flags(a in 0u8..=255u8, m in 0u8..=255u8) {
        let (cpu, ram) = setup_cpu();
        ram.load_bytes(0x8000, &[0xC9, m]);
        with_registers(&cpu, a, Status::empty());

        cpu.step();

        let regs = cpu.registers();
        prop_assert_eq!(regs.p.contains(Status::CARRY), a >= m);
        prop_assert_eq!(regs.p.contains(Status::ZERO), a == m);
        prop_assert_eq!(regs.a, a);
    }
}

// ========== Stack ==========

proptest! {
    /// Property: PHA then PLA restores A and S, whatever S started at
    #[test]
    fn prop_pha_pla_round_trip(value in 0u8..=255u8, s in 0u8..=255u8) {
        let (cpu, ram) = setup_cpu();
        // PHA; LDA #$00; PLA
        ram.load_bytes(0x8000, &[0x48, 0xA9, 0x00, 0x68]);
        cpu.set_registers(Registers { a: value, s, ..cpu.registers() });

        cpu.step();
        prop_assert_eq!(ram.read(0x0100 | s as u32), value);
        cpu.step();
        cpu.step();

        let regs = cpu.registers();
        prop_assert_eq!(regs.a, value);
        prop_assert_eq!(regs.s, s);
    }

    /// Property: PLP never sets B and always sets the unused bit
    #[test]
    fn prop_plp_masks_break(value in 0u8..=255u8) {
        let (cpu, ram) = setup_cpu();
        ram.load_bytes(0x8000, &[0x28]); // PLP
        ram.write(0x01FE, value);
        cpu.set_registers(Registers { s: 0xFD, ..cpu.registers() });

        cpu.step();

        let p = cpu.registers().p;
        prop_assert!(!p.contains(Status::BREAK));
        prop_assert!(p.contains(Status::UNUSED));
        prop_assert_eq!(p.bits() & 0xCF, value & 0xCF);
    }
}
