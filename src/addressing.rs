//! # Addressing Modes
//!
//! The 6502 addressing modes and the operand size each one implies. Effective-address
//! resolution lives with the execution context in [`cpu`](crate::cpu), since it reads
//! operand bytes and pointers through the bus.

/// 6502 addressing mode.
///
/// # Operand Sizes
///
/// - **0 bytes**: Implicit, Accumulator
/// - **1 byte**: Immediate, ZeroPage, ZeroPageX, ZeroPageY, Relative, IndirectX, IndirectY
/// - **2 bytes**: Absolute, AbsoluteX, AbsoluteY, Indirect
///
/// # Page-Crossing Penalty
///
/// Reads through `AbsoluteX`, `AbsoluteY` and `IndirectY` take one extra cycle when
/// adding the index carries into the high byte. Stores and read-modify-write
/// instructions always pay that cycle, so it is part of their base cost instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// No operand (`CLC`, `RTS`).
    Implicit,
    /// Operates on A (`ASL A`).
    Accumulator,
    /// Operand byte follows the opcode (`LDA #$10`).
    Immediate,
    /// Address in page zero (`LDA $80`).
    ZeroPage,
    /// Page-zero address plus X, wrapping inside page zero (`LDA $80,X`).
    ZeroPageX,
    /// Page-zero address plus Y, wrapping inside page zero (`LDX $80,Y`).
    ZeroPageY,
    /// Signed branch displacement from the next instruction (`BNE loop`).
    Relative,
    /// Full 16-bit address (`JMP $FDED`).
    Absolute,
    /// 16-bit address plus X (`LDA $0400,X`).
    AbsoluteX,
    /// 16-bit address plus Y (`LDA $0400,Y`).
    AbsoluteY,
    /// Pointer for `JMP ($03F0)`. The pointer's high byte is fetched without carrying
    /// into the next page (the NMOS `JMP ($xxFF)` quirk).
    Indirect,
    /// Pointer at page-zero address plus X (`LDA ($40,X)`).
    IndirectX,
    /// Pointer at page-zero address, plus Y (`LDA ($40),Y`).
    IndirectY,
}

impl AddressingMode {
    /// Number of operand bytes following the opcode.
    ///
    /// # Examples
    ///
    /// ```
    /// use a2core::AddressingMode;
    ///
    /// assert_eq!(AddressingMode::Implicit.operand_bytes(), 0);
    /// assert_eq!(AddressingMode::IndirectY.operand_bytes(), 1);
    /// assert_eq!(AddressingMode::AbsoluteX.operand_bytes(), 2);
    /// ```
    pub const fn operand_bytes(self) -> u8 {
        match self {
            AddressingMode::Implicit | AddressingMode::Accumulator => 0,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::Relative
            | AddressingMode::IndirectX
            | AddressingMode::IndirectY => 1,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
        }
    }

    /// Whether reads through this mode pay a cycle for crossing a page.
    pub const fn has_page_penalty(self) -> bool {
        matches!(
            self,
            AddressingMode::AbsoluteX | AddressingMode::AbsoluteY | AddressingMode::IndirectY
        )
    }
}

/// Returns `true` if `a` and `b` lie in different 256-byte pages.
#[inline]
pub fn page_crossed(a: u16, b: u16) -> bool {
    (a & 0xFF00) != (b & 0xFF00)
}
