//! # Opcode Metadata Table
//!
//! This module contains the complete 256-entry opcode table that drives decoding and
//! dispatch. Every byte value is defined:
//!
//! - **151 documented instructions** - Official NMOS 6502 opcodes
//! - **93 undocumented instructions** - Stable combinations such as `LAX`, `DCP` and
//!   the multi-byte `NOP`s
//! - **12 jam opcodes** - Halt the CPU until the next reset
//!
//! A handful of undocumented opcodes (`ANE`, `LAS`, `LXA`, `SHA`, `SHX`, `SHY`, `TAS`) depend
//! on analog effects in the real chip and are marked [`OpcodeClass::Unstable`]. They
//! are emulated with the commonly observed behavior.
//!
//! Each opcode entry includes:
//! - Mnemonic
//! - Addressing mode
//! - Base cycle cost (excluding page-crossing and branch penalties)
//! - Instruction size in bytes
//! - Classification
//! - Handler

use std::fmt;

use crate::addressing::AddressingMode;
use crate::cpu::Execution;
use crate::instructions::{
    alu, branches, control, flags, illegal, inc_dec, load_store, shifts, stack, transfer,
};

/// Instruction handler. Operand bytes are fetched through the execution context
/// according to the addressing mode.
pub(crate) type Handler = fn(&mut Execution<'_>, AddressingMode);

/// How an opcode relates to the published instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeClass {
    /// Published by MOS
    Documented,
    /// Unpublished but deterministic
    Undocumented,
    /// Unpublished, result depends on chip and temperature
    Unstable,
    /// Locks up the CPU
    Jam,
}

/// Metadata for a single 6502 opcode.
///
/// # Examples
///
/// ```
/// use a2core::{AddressingMode, OpcodeClass, OPCODE_TABLE};
///
/// // LDA immediate (opcode 0xA9)
/// let lda_imm = &OPCODE_TABLE[0xA9];
/// assert_eq!(lda_imm.mnemonic, "LDA");
/// assert_eq!(lda_imm.addressing_mode, AddressingMode::Immediate);
/// assert_eq!(lda_imm.base_cycles, 2);
/// assert_eq!(lda_imm.size_bytes, 2);
/// assert_eq!(lda_imm.class, OpcodeClass::Documented);
///
/// // LAX (zp),Y is undocumented
/// assert_eq!(OPCODE_TABLE[0xB3].mnemonic, "LAX");
/// assert_eq!(OPCODE_TABLE[0xB3].class, OpcodeClass::Undocumented);
/// ```
#[derive(Clone, Copy)]
pub struct OpcodeMetadata {
    /// Instruction mnemonic (e.g., "LDA", "DCP", "JAM").
    pub mnemonic: &'static str,

    /// Addressing mode for this instruction.
    pub addressing_mode: AddressingMode,

    /// Base cycle cost (before page crossing and branch penalties).
    pub base_cycles: u8,

    /// Total instruction size in bytes (opcode + operands).
    pub size_bytes: u8,

    /// Documented, undocumented, unstable or jam.
    pub class: OpcodeClass,

    pub(crate) execute: Handler,
}

impl fmt::Debug for OpcodeMetadata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("OpcodeMetadata")
            .field("mnemonic", &self.mnemonic)
            .field("addressing_mode", &self.addressing_mode)
            .field("base_cycles", &self.base_cycles)
            .field("size_bytes", &self.size_bytes)
            .field("class", &self.class)
            .finish()
    }
}

const fn op(
    mnemonic: &'static str,
    addressing_mode: AddressingMode,
    base_cycles: u8,
    class: OpcodeClass,
    execute: Handler,
) -> OpcodeMetadata {
    OpcodeMetadata {
        mnemonic,
        addressing_mode,
        base_cycles,
        size_bytes: 1 + addressing_mode.operand_bytes(),
        class,
        execute,
    }
}

const fn doc(m: &'static str, mode: AddressingMode, cycles: u8, h: Handler) -> OpcodeMetadata {
    op(m, mode, cycles, OpcodeClass::Documented, h)
}

const fn und(m: &'static str, mode: AddressingMode, cycles: u8, h: Handler) -> OpcodeMetadata {
    op(m, mode, cycles, OpcodeClass::Undocumented, h)
}

const fn uns(m: &'static str, mode: AddressingMode, cycles: u8, h: Handler) -> OpcodeMetadata {
    op(m, mode, cycles, OpcodeClass::Unstable, h)
}

const fn jam() -> OpcodeMetadata {
    op("JAM", IMP, 2, OpcodeClass::Jam, illegal::execute_jam)
}

const IMP: AddressingMode = AddressingMode::Implicit;
const ACC: AddressingMode = AddressingMode::Accumulator;
const IMM: AddressingMode = AddressingMode::Immediate;
const ZP: AddressingMode = AddressingMode::ZeroPage;
const ZPX: AddressingMode = AddressingMode::ZeroPageX;
const ZPY: AddressingMode = AddressingMode::ZeroPageY;
const REL: AddressingMode = AddressingMode::Relative;
const ABS: AddressingMode = AddressingMode::Absolute;
const ABX: AddressingMode = AddressingMode::AbsoluteX;
const ABY: AddressingMode = AddressingMode::AbsoluteY;
const IND: AddressingMode = AddressingMode::Indirect;
const IZX: AddressingMode = AddressingMode::IndirectX;
const IZY: AddressingMode = AddressingMode::IndirectY;

/// Complete 256-entry opcode table indexed by opcode byte value.
///
/// `BRK` is listed with an immediate operand: it skips the signature byte that
/// follows it, so `RTI` returns two bytes past the opcode.
///
/// # Examples
///
/// ```
/// use a2core::{OpcodeClass, OPCODE_TABLE};
///
/// let brk = &OPCODE_TABLE[0x00];
/// assert_eq!((brk.mnemonic, brk.base_cycles, brk.size_bytes), ("BRK", 7, 2));
///
/// let jams = OPCODE_TABLE.iter().filter(|m| m.class == OpcodeClass::Jam).count();
/// assert_eq!(jams, 12);
/// ```
pub static OPCODE_TABLE: [OpcodeMetadata; 256] = [
    // 0x00
    doc("BRK", IMM, 7, control::execute_brk),
    doc("ORA", IZX, 6, alu::execute_ora),
    jam(),
    und("SLO", IZX, 8, illegal::execute_slo),
    und("NOP", ZP, 3, control::execute_nop),
    doc("ORA", ZP, 3, alu::execute_ora),
    doc("ASL", ZP, 5, shifts::execute_asl),
    und("SLO", ZP, 5, illegal::execute_slo),
    doc("PHP", IMP, 3, stack::execute_php),
    doc("ORA", IMM, 2, alu::execute_ora),
    doc("ASL", ACC, 2, shifts::execute_asl),
    und("ANC", IMM, 2, illegal::execute_anc),
    und("NOP", ABS, 4, control::execute_nop),
    doc("ORA", ABS, 4, alu::execute_ora),
    doc("ASL", ABS, 6, shifts::execute_asl),
    und("SLO", ABS, 6, illegal::execute_slo),
    // 0x10
    doc("BPL", REL, 2, branches::execute_bpl),
    doc("ORA", IZY, 5, alu::execute_ora),
    jam(),
    und("SLO", IZY, 8, illegal::execute_slo),
    und("NOP", ZPX, 4, control::execute_nop),
    doc("ORA", ZPX, 4, alu::execute_ora),
    doc("ASL", ZPX, 6, shifts::execute_asl),
    und("SLO", ZPX, 6, illegal::execute_slo),
    doc("CLC", IMP, 2, flags::execute_clc),
    doc("ORA", ABY, 4, alu::execute_ora),
    und("NOP", IMP, 2, control::execute_nop),
    und("SLO", ABY, 7, illegal::execute_slo),
    und("NOP", ABX, 4, control::execute_nop),
    doc("ORA", ABX, 4, alu::execute_ora),
    doc("ASL", ABX, 7, shifts::execute_asl),
    und("SLO", ABX, 7, illegal::execute_slo),
    // 0x20
    doc("JSR", ABS, 6, control::execute_jsr),
    doc("AND", IZX, 6, alu::execute_and),
    jam(),
    und("RLA", IZX, 8, illegal::execute_rla),
    doc("BIT", ZP, 3, alu::execute_bit),
    doc("AND", ZP, 3, alu::execute_and),
    doc("ROL", ZP, 5, shifts::execute_rol),
    und("RLA", ZP, 5, illegal::execute_rla),
    doc("PLP", IMP, 4, stack::execute_plp),
    doc("AND", IMM, 2, alu::execute_and),
    doc("ROL", ACC, 2, shifts::execute_rol),
    und("ANC", IMM, 2, illegal::execute_anc),
    doc("BIT", ABS, 4, alu::execute_bit),
    doc("AND", ABS, 4, alu::execute_and),
    doc("ROL", ABS, 6, shifts::execute_rol),
    und("RLA", ABS, 6, illegal::execute_rla),
    // 0x30
    doc("BMI", REL, 2, branches::execute_bmi),
    doc("AND", IZY, 5, alu::execute_and),
    jam(),
    und("RLA", IZY, 8, illegal::execute_rla),
    und("NOP", ZPX, 4, control::execute_nop),
    doc("AND", ZPX, 4, alu::execute_and),
    doc("ROL", ZPX, 6, shifts::execute_rol),
    und("RLA", ZPX, 6, illegal::execute_rla),
    doc("SEC", IMP, 2, flags::execute_sec),
    doc("AND", ABY, 4, alu::execute_and),
    und("NOP", IMP, 2, control::execute_nop),
    und("RLA", ABY, 7, illegal::execute_rla),
    und("NOP", ABX, 4, control::execute_nop),
    doc("AND", ABX, 4, alu::execute_and),
    doc("ROL", ABX, 7, shifts::execute_rol),
    und("RLA", ABX, 7, illegal::execute_rla),
    // 0x40
    doc("RTI", IMP, 6, control::execute_rti),
    doc("EOR", IZX, 6, alu::execute_eor),
    jam(),
    und("SRE", IZX, 8, illegal::execute_sre),
    und("NOP", ZP, 3, control::execute_nop),
    doc("EOR", ZP, 3, alu::execute_eor),
    doc("LSR", ZP, 5, shifts::execute_lsr),
    und("SRE", ZP, 5, illegal::execute_sre),
    doc("PHA", IMP, 3, stack::execute_pha),
    doc("EOR", IMM, 2, alu::execute_eor),
    doc("LSR", ACC, 2, shifts::execute_lsr),
    und("ALR", IMM, 2, illegal::execute_alr),
    doc("JMP", ABS, 3, control::execute_jmp),
    doc("EOR", ABS, 4, alu::execute_eor),
    doc("LSR", ABS, 6, shifts::execute_lsr),
    und("SRE", ABS, 6, illegal::execute_sre),
    // 0x50
    doc("BVC", REL, 2, branches::execute_bvc),
    doc("EOR", IZY, 5, alu::execute_eor),
    jam(),
    und("SRE", IZY, 8, illegal::execute_sre),
    und("NOP", ZPX, 4, control::execute_nop),
    doc("EOR", ZPX, 4, alu::execute_eor),
    doc("LSR", ZPX, 6, shifts::execute_lsr),
    und("SRE", ZPX, 6, illegal::execute_sre),
    doc("CLI", IMP, 2, flags::execute_cli),
    doc("EOR", ABY, 4, alu::execute_eor),
    und("NOP", IMP, 2, control::execute_nop),
    und("SRE", ABY, 7, illegal::execute_sre),
    und("NOP", ABX, 4, control::execute_nop),
    doc("EOR", ABX, 4, alu::execute_eor),
    doc("LSR", ABX, 7, shifts::execute_lsr),
    und("SRE", ABX, 7, illegal::execute_sre),
    // 0x60
    doc("RTS", IMP, 6, control::execute_rts),
    doc("ADC", IZX, 6, alu::execute_adc),
    jam(),
    und("RRA", IZX, 8, illegal::execute_rra),
    und("NOP", ZP, 3, control::execute_nop),
    doc("ADC", ZP, 3, alu::execute_adc),
    doc("ROR", ZP, 5, shifts::execute_ror),
    und("RRA", ZP, 5, illegal::execute_rra),
    doc("PLA", IMP, 4, stack::execute_pla),
    doc("ADC", IMM, 2, alu::execute_adc),
    doc("ROR", ACC, 2, shifts::execute_ror),
    und("ARR", IMM, 2, illegal::execute_arr),
    doc("JMP", IND, 5, control::execute_jmp),
    doc("ADC", ABS, 4, alu::execute_adc),
    doc("ROR", ABS, 6, shifts::execute_ror),
    und("RRA", ABS, 6, illegal::execute_rra),
    // 0x70
    doc("BVS", REL, 2, branches::execute_bvs),
    doc("ADC", IZY, 5, alu::execute_adc),
    jam(),
    und("RRA", IZY, 8, illegal::execute_rra),
    und("NOP", ZPX, 4, control::execute_nop),
    doc("ADC", ZPX, 4, alu::execute_adc),
    doc("ROR", ZPX, 6, shifts::execute_ror),
    und("RRA", ZPX, 6, illegal::execute_rra),
    doc("SEI", IMP, 2, flags::execute_sei),
    doc("ADC", ABY, 4, alu::execute_adc),
    und("NOP", IMP, 2, control::execute_nop),
    und("RRA", ABY, 7, illegal::execute_rra),
    und("NOP", ABX, 4, control::execute_nop),
    doc("ADC", ABX, 4, alu::execute_adc),
    doc("ROR", ABX, 7, shifts::execute_ror),
    und("RRA", ABX, 7, illegal::execute_rra),
    // 0x80
    und("NOP", IMM, 2, control::execute_nop),
    doc("STA", IZX, 6, load_store::execute_sta),
    und("NOP", IMM, 2, control::execute_nop),
    und("SAX", IZX, 6, illegal::execute_sax),
    doc("STY", ZP, 3, load_store::execute_sty),
    doc("STA", ZP, 3, load_store::execute_sta),
    doc("STX", ZP, 3, load_store::execute_stx),
    und("SAX", ZP, 3, illegal::execute_sax),
    doc("DEY", IMP, 2, inc_dec::execute_dey),
    und("NOP", IMM, 2, control::execute_nop),
    doc("TXA", IMP, 2, transfer::execute_txa),
    uns("ANE", IMM, 2, illegal::execute_ane),
    doc("STY", ABS, 4, load_store::execute_sty),
    doc("STA", ABS, 4, load_store::execute_sta),
    doc("STX", ABS, 4, load_store::execute_stx),
    und("SAX", ABS, 4, illegal::execute_sax),
    // 0x90
    doc("BCC", REL, 2, branches::execute_bcc),
    doc("STA", IZY, 6, load_store::execute_sta),
    jam(),
    uns("SHA", IZY, 6, illegal::execute_sha),
    doc("STY", ZPX, 4, load_store::execute_sty),
    doc("STA", ZPX, 4, load_store::execute_sta),
    doc("STX", ZPY, 4, load_store::execute_stx),
    und("SAX", ZPY, 4, illegal::execute_sax),
    doc("TYA", IMP, 2, transfer::execute_tya),
    doc("STA", ABY, 5, load_store::execute_sta),
    doc("TXS", IMP, 2, transfer::execute_txs),
    uns("TAS", ABY, 5, illegal::execute_tas),
    uns("SHY", ABX, 5, illegal::execute_shy),
    doc("STA", ABX, 5, load_store::execute_sta),
    uns("SHX", ABY, 5, illegal::execute_shx),
    uns("SHA", ABY, 5, illegal::execute_sha),
    // 0xA0
    doc("LDY", IMM, 2, load_store::execute_ldy),
    doc("LDA", IZX, 6, load_store::execute_lda),
    doc("LDX", IMM, 2, load_store::execute_ldx),
    und("LAX", IZX, 6, illegal::execute_lax),
    doc("LDY", ZP, 3, load_store::execute_ldy),
    doc("LDA", ZP, 3, load_store::execute_lda),
    doc("LDX", ZP, 3, load_store::execute_ldx),
    und("LAX", ZP, 3, illegal::execute_lax),
    doc("TAY", IMP, 2, transfer::execute_tay),
    doc("LDA", IMM, 2, load_store::execute_lda),
    doc("TAX", IMP, 2, transfer::execute_tax),
    uns("LXA", IMM, 2, illegal::execute_lxa),
    doc("LDY", ABS, 4, load_store::execute_ldy),
    doc("LDA", ABS, 4, load_store::execute_lda),
    doc("LDX", ABS, 4, load_store::execute_ldx),
    und("LAX", ABS, 4, illegal::execute_lax),
    // 0xB0
    doc("BCS", REL, 2, branches::execute_bcs),
    doc("LDA", IZY, 5, load_store::execute_lda),
    jam(),
    und("LAX", IZY, 5, illegal::execute_lax),
    doc("LDY", ZPX, 4, load_store::execute_ldy),
    doc("LDA", ZPX, 4, load_store::execute_lda),
    doc("LDX", ZPY, 4, load_store::execute_ldx),
    und("LAX", ZPY, 4, illegal::execute_lax),
    doc("CLV", IMP, 2, flags::execute_clv),
    doc("LDA", ABY, 4, load_store::execute_lda),
    doc("TSX", IMP, 2, transfer::execute_tsx),
    uns("LAS", ABY, 4, illegal::execute_las),
    doc("LDY", ABX, 4, load_store::execute_ldy),
    doc("LDA", ABX, 4, load_store::execute_lda),
    doc("LDX", ABY, 4, load_store::execute_ldx),
    und("LAX", ABY, 4, illegal::execute_lax),
    // 0xC0
    doc("CPY", IMM, 2, alu::execute_cpy),
    doc("CMP", IZX, 6, alu::execute_cmp),
    und("NOP", IMM, 2, control::execute_nop),
    und("DCP", IZX, 8, illegal::execute_dcp),
    doc("CPY", ZP, 3, alu::execute_cpy),
    doc("CMP", ZP, 3, alu::execute_cmp),
    doc("DEC", ZP, 5, inc_dec::execute_dec),
    und("DCP", ZP, 5, illegal::execute_dcp),
    doc("INY", IMP, 2, inc_dec::execute_iny),
    doc("CMP", IMM, 2, alu::execute_cmp),
    doc("DEX", IMP, 2, inc_dec::execute_dex),
    und("SBX", IMM, 2, illegal::execute_sbx),
    doc("CPY", ABS, 4, alu::execute_cpy),
    doc("CMP", ABS, 4, alu::execute_cmp),
    doc("DEC", ABS, 6, inc_dec::execute_dec),
    und("DCP", ABS, 6, illegal::execute_dcp),
    // 0xD0
    doc("BNE", REL, 2, branches::execute_bne),
    doc("CMP", IZY, 5, alu::execute_cmp),
    jam(),
    und("DCP", IZY, 8, illegal::execute_dcp),
    und("NOP", ZPX, 4, control::execute_nop),
    doc("CMP", ZPX, 4, alu::execute_cmp),
    doc("DEC", ZPX, 6, inc_dec::execute_dec),
    und("DCP", ZPX, 6, illegal::execute_dcp),
    doc("CLD", IMP, 2, flags::execute_cld),
    doc("CMP", ABY, 4, alu::execute_cmp),
    und("NOP", IMP, 2, control::execute_nop),
    und("DCP", ABY, 7, illegal::execute_dcp),
    und("NOP", ABX, 4, control::execute_nop),
    doc("CMP", ABX, 4, alu::execute_cmp),
    doc("DEC", ABX, 7, inc_dec::execute_dec),
    und("DCP", ABX, 7, illegal::execute_dcp),
    // 0xE0
    doc("CPX", IMM, 2, alu::execute_cpx),
    doc("SBC", IZX, 6, alu::execute_sbc),
    und("NOP", IMM, 2, control::execute_nop),
    und("ISC", IZX, 8, illegal::execute_isc),
    doc("CPX", ZP, 3, alu::execute_cpx),
    doc("SBC", ZP, 3, alu::execute_sbc),
    doc("INC", ZP, 5, inc_dec::execute_inc),
    und("ISC", ZP, 5, illegal::execute_isc),
    doc("INX", IMP, 2, inc_dec::execute_inx),
    doc("SBC", IMM, 2, alu::execute_sbc),
    doc("NOP", IMP, 2, control::execute_nop),
    und("USBC", IMM, 2, alu::execute_sbc),
    doc("CPX", ABS, 4, alu::execute_cpx),
    doc("SBC", ABS, 4, alu::execute_sbc),
    doc("INC", ABS, 6, inc_dec::execute_inc),
    und("ISC", ABS, 6, illegal::execute_isc),
    // 0xF0
    doc("BEQ", REL, 2, branches::execute_beq),
    doc("SBC", IZY, 5, alu::execute_sbc),
    jam(),
    und("ISC", IZY, 8, illegal::execute_isc),
    und("NOP", ZPX, 4, control::execute_nop),
    doc("SBC", ZPX, 4, alu::execute_sbc),
    doc("INC", ZPX, 6, inc_dec::execute_inc),
    und("ISC", ZPX, 6, illegal::execute_isc),
    doc("SED", IMP, 2, flags::execute_sed),
    doc("SBC", ABY, 4, alu::execute_sbc),
    und("NOP", IMP, 2, control::execute_nop),
    und("ISC", ABY, 7, illegal::execute_isc),
    und("NOP", ABX, 4, control::execute_nop),
    doc("SBC", ABX, 4, alu::execute_sbc),
    doc("INC", ABX, 7, inc_dec::execute_inc),
    und("ISC", ABX, 7, illegal::execute_isc),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_count() {
        let documented = OPCODE_TABLE
            .iter()
            .filter(|m| m.class == OpcodeClass::Documented)
            .count();
        assert_eq!(documented, 151);
    }

    #[test]
    fn test_unstable_opcodes() {
        let mut unstable: Vec<&str> = OPCODE_TABLE
            .iter()
            .filter(|m| m.class == OpcodeClass::Unstable)
            .map(|m| m.mnemonic)
            .collect();
        unstable.sort_unstable();
        unstable.dedup();
        assert_eq!(unstable, vec!["ANE", "LAS", "LXA", "SHA", "SHX", "SHY", "TAS"]);
    }

    #[test]
    fn test_size_matches_addressing_mode() {
        for (opcode, metadata) in OPCODE_TABLE.iter().enumerate() {
            assert_eq!(
                metadata.size_bytes,
                1 + metadata.addressing_mode.operand_bytes(),
                "opcode {:02X}",
                opcode
            );
            assert!(metadata.base_cycles >= 2, "opcode {:02X}", opcode);
        }
    }

    #[test]
    fn test_jam_column() {
        for opcode in [0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2] {
            assert_eq!(OPCODE_TABLE[opcode].class, OpcodeClass::Jam);
        }
    }
}
