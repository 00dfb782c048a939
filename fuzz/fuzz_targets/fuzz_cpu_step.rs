//! Fuzz target for CPU execution.
//!
//! This target creates arbitrary register states, memory contents and interrupt
//! events, then runs a short cycle budget to find panics and accounting bugs.

#![no_main]

use arbitrary::Arbitrary;
use a2core::{Component, Message, Mos6502, Notification, Ram, Registers, Status};
use libfuzzer_sys::fuzz_target;

/// Arbitrary CPU initial state for fuzzing
#[derive(Debug, Arbitrary)]
struct FuzzCpuState {
    a: u8,
    x: u8,
    y: u8,
    s: u8,
    p: u8,
}

/// Memory region for fuzzing
#[derive(Debug, Arbitrary)]
struct FuzzMemory {
    /// Bytes at the PC location (instructions + operands)
    program: [u8; 16],
    /// Zero page contents
    zero_page: [u8; 256],
    /// Stack page contents
    stack_page: [u8; 256],
}

/// Signals delivered before execution
#[derive(Debug, Arbitrary)]
enum FuzzSignal {
    Nmi,
    Irq(bool),
    Reset,
}

/// Complete fuzz input
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    cpu_state: FuzzCpuState,
    memory: FuzzMemory,
    signals: Vec<FuzzSignal>,
    budget: u8,
}

fuzz_target!(|input: FuzzInput| {
    let ram = Ram::with_size(0x10000);
    ram.write(0xFFFA, 0x00);
    ram.write(0xFFFB, 0xA0);
    ram.write(0xFFFC, 0x00);
    ram.write(0xFFFD, 0x80);
    ram.write(0xFFFE, 0x00);
    ram.write(0xFFFF, 0x90);
    ram.load_bytes(0x8000, &input.memory.program);
    ram.load_bytes(0x0000, &input.memory.zero_page);
    ram.load_bytes(0x0100, &input.memory.stack_page);

    let cpu = Mos6502::new();
    cpu.set_ref("memoryBus", Some(ram));
    if cpu.init().is_err() {
        return;
    }
    cpu.step();

    cpu.set_registers(Registers {
        a: input.cpu_state.a,
        x: input.cpu_state.x,
        y: input.cpu_state.y,
        p: Status::from_bits_retain(input.cpu_state.p),
        pc: 0x8000,
        s: input.cpu_state.s,
    });

    for signal in &input.signals {
        let notification = match signal {
            FuzzSignal::Nmi => Notification::NmiDidAssert,
            FuzzSignal::Irq(level) => Notification::IrqDidChange(*level),
            FuzzSignal::Reset => Notification::ResetDidClear,
        };
        cpu.notify(cpu.as_ref(), &notification);
    }

    let budget = input.budget as i64;
    cpu.post_message(&mut Message::SetPendingCycles(budget));
    cpu.post_message(&mut Message::Run);

    // No instruction or interrupt sequence costs more than 8 cycles
    let remaining = cpu.pending_cycles();
    assert!(remaining <= 0 || budget <= 0);
    assert!(remaining > -8);
});
