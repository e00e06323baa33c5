//! Integer instruction results and condition codes.

mod common;

use common::{ORIGIN, boot, handler_for};
use motorola_680x0::{C, Cpu680x0, CpuModel, N, V, X, Z};

const CCR: u16 = X | N | Z | V | C;

/// Run one instruction on a 68000 with the given data registers and CCR.
fn run(program: &[u16], d0: u32, d1: u32, ccr: u16) -> Cpu680x0 {
    let (mut cpu, mut bus) = boot(CpuModel::M68000, program);
    cpu.regs.d[0] = d0;
    cpu.regs.d[1] = d1;
    cpu.regs.sr = (cpu.regs.sr & !CCR) | ccr;
    cpu.step(&mut bus);
    cpu
}

fn ccr(cpu: &Cpu680x0) -> u16 {
    cpu.regs.sr & CCR
}

#[test]
fn add_word_signed_overflow() {
    // ADD.W D1,D0
    let cpu = run(&[0xD041], 0xAAAA_7FFF, 1, 0);
    assert_eq!(cpu.regs.d[0], 0xAAAA_8000);
    assert_eq!(ccr(&cpu), N | V);
}

#[test]
fn add_byte_carry_sets_x() {
    // ADD.B D1,D0
    let cpu = run(&[0xD001], 0x0000_12FF, 1, 0);
    assert_eq!(cpu.regs.d[0], 0x0000_1200);
    assert_eq!(ccr(&cpu), X | Z | C);
}

#[test]
fn sub_word_borrow() {
    // SUB.W D1,D0
    let cpu = run(&[0x9041], 0, 1, 0);
    assert_eq!(cpu.regs.d[0], 0x0000_FFFF);
    assert_eq!(ccr(&cpu), X | N | C);
}

#[test]
fn cmp_leaves_x_and_the_operand_alone() {
    // CMP.W D1,D0
    let cpu = run(&[0xB041], 5, 5, X);
    assert_eq!(cpu.regs.d[0], 5);
    assert_eq!(ccr(&cpu), X | Z);

    let cpu = run(&[0xB041], 4, 5, 0);
    assert_eq!(ccr(&cpu), N | C);
}

#[test]
fn neg_edge_values() {
    // NEG.W D0
    let cpu = run(&[0x4440], 0, 0, X | C);
    assert_eq!(cpu.regs.d[0], 0);
    assert_eq!(ccr(&cpu), Z);

    let cpu = run(&[0x4440], 0x8000, 0, 0);
    assert_eq!(cpu.regs.d[0], 0x8000);
    assert_eq!(ccr(&cpu), X | N | V | C);
}

#[test]
fn addx_only_clears_z() {
    // ADDX.W D1,D0
    let cpu = run(&[0xD141], 0xFFFF, 0, X | Z);
    assert_eq!(cpu.regs.d[0], 0);
    assert_eq!(ccr(&cpu), X | Z | C);

    let cpu = run(&[0xD141], 1, 1, X | Z);
    assert_eq!(cpu.regs.d[0], 3);
    assert_eq!(ccr(&cpu), 0);
}

#[test]
fn moveq_sign_extends_and_clears_vc() {
    // MOVEQ #-1,D0
    let cpu = run(&[0x70FF], 0, 0, V | C | X);
    assert_eq!(cpu.regs.d[0], 0xFFFF_FFFF);
    assert_eq!(ccr(&cpu), X | N);
}

#[test]
fn divu_results_and_overflow() {
    // DIVU.W D1,D0
    let cpu = run(&[0x80C1], 100, 7, 0);
    assert_eq!(cpu.regs.d[0], (2 << 16) | 14);
    assert_eq!(ccr(&cpu), 0);

    let cpu = run(&[0x80C1], 0x0010_0000, 1, Z | C);
    assert_eq!(cpu.regs.d[0], 0x0010_0000);
    assert_eq!(ccr(&cpu), N | V);
}

#[test]
fn divide_by_zero_traps_past_the_instruction() {
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[0x80C1]);
    cpu.regs.d[0] = 10;
    cpu.regs.sr |= C;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, handler_for(5));
    // The stacked PC is the next instruction.
    let sp = cpu.regs.isp;
    assert_eq!(bus.peek_word(sp) & C, 0);
    assert_eq!(bus.peek_long(sp + 2), ORIGIN + 2);
}

#[test]
fn misaligned_word_read_on_the_68020() {
    // MOVE.W (A0),D0 from an odd address.
    let (mut cpu, mut bus) = boot(CpuModel::M68020, &[0x3010]);
    bus.load(0x2000, &[0x0012, 0x3400]);
    cpu.regs.a[0] = 0x2001;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.d[0] & 0xFFFF, 0x1234);
    assert_eq!(cpu.regs.pc, ORIGIN + 2);
}

#[test]
fn counted_loop_runs_to_completion() {
    let program = [
        0x7000, // MOVEQ #0,D0
        0x7209, // MOVEQ #9,D1
        0xD041, // loop: ADD.W D1,D0
        0x51C9, 0xFFFC, // DBRA D1,loop
        0x4E72, 0x2700, // STOP #$2700
    ];
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &program);
    cpu.execute_run(&mut bus, 10_000);
    assert!(cpu.is_stopped());
    assert_eq!(cpu.regs.d[0], 45);
    assert_eq!(cpu.regs.d[1] & 0xFFFF, 0xFFFF);
}

// === Boundary tables ===

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Add,
    Sub,
    Cmp,
    Neg,
    Addx,
    Subx,
    Negx,
}

impl Class {
    const ALL: [Self; 7] = [
        Self::Add,
        Self::Sub,
        Self::Cmp,
        Self::Neg,
        Self::Addx,
        Self::Subx,
        Self::Negx,
    ];

    /// Register form with D1 as source and D0 as destination.
    const fn opcode(self, size_bits: u16) -> u16 {
        let size = size_bits << 6;
        match self {
            Self::Add => 0xD001 | size,
            Self::Sub => 0x9001 | size,
            Self::Cmp => 0xB001 | size,
            Self::Neg => 0x4400 | size,
            Self::Addx => 0xD101 | size,
            Self::Subx => 0x9101 | size,
            Self::Negx => 0x4000 | size,
        }
    }

    const fn extended(self) -> bool {
        matches!(self, Self::Addx | Self::Subx | Self::Negx)
    }
}

/// (size field, operand mask) for byte, word and long.
const WIDTHS: [(u16, u64); 3] = [(0, 0xFF), (1, 0xFFFF), (2, 0xFFFF_FFFF)];

fn signed(value: u64, mask: u64) -> i64 {
    let sign = (mask >> 1) + 1;
    if value & sign != 0 { value as i64 - (mask as i64 + 1) } else { value as i64 }
}

/// Result and CCR computed from first principles.
fn reference(class: Class, mask: u64, dst: u64, src: u64, x_in: bool, z_in: bool) -> (u64, u16) {
    let x = u64::from(class.extended() && x_in);
    let (wide, exact) = match class {
        Class::Add | Class::Addx => (dst + src + x, signed(dst, mask) + signed(src, mask) + x as i64),
        Class::Sub | Class::Cmp | Class::Subx => (
            dst.wrapping_sub(src).wrapping_sub(x),
            signed(dst, mask) - signed(src, mask) - x as i64,
        ),
        Class::Neg | Class::Negx => (0u64.wrapping_sub(dst).wrapping_sub(x), -signed(dst, mask) - x as i64),
    };
    let result = wide & mask;
    let carry = match class {
        Class::Add | Class::Addx => wide > mask,
        Class::Sub | Class::Cmp | Class::Subx => src + x > dst,
        Class::Neg | Class::Negx => dst + x > 0,
    };
    let overflow = signed(result, mask) != exact;
    let zero = if class.extended() { z_in && result == 0 } else { result == 0 };
    let extend = if class == Class::Cmp { x_in } else { carry };

    let mut ccr = 0;
    for (set, bit) in [(extend, X), (result & ((mask >> 1) + 1) != 0, N), (zero, Z), (overflow, V), (carry, C)] {
        if set {
            ccr |= bit;
        }
    }
    (result, ccr)
}

#[test]
fn flags_over_boundary_values_at_every_width() {
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[0x4E71]);
    cpu.step(&mut bus);
    let mut failures = Vec::new();

    for class in Class::ALL {
        for (size_bits, mask) in WIDTHS {
            let sign = (mask >> 1) + 1;
            let values = [0, 1, mask, sign - 1, sign];
            for dst in values {
                for src in values {
                    for x_in in [false, true] {
                        for z_in in [false, true] {
                            let upper = 0xA5A5_A5A5 & !mask;
                            bus.load(ORIGIN, &[class.opcode(size_bits)]);
                            cpu.regs.pc = ORIGIN;
                            cpu.regs.d[0] = (upper | dst) as u32;
                            cpu.regs.d[1] = ((0x5A5A_5A5A & !mask) | src) as u32;
                            cpu.regs.sr = 0x2700 | if x_in { X } else { 0 } | if z_in { Z } else { 0 };
                            cpu.step(&mut bus);

                            let (result, want_ccr) = reference(class, mask, dst, src, x_in, z_in);
                            let want_d0 = upper | if class == Class::Cmp { dst } else { result };
                            let got_ccr = cpu.regs.sr & CCR;
                            if u64::from(cpu.regs.d[0]) != want_d0 || got_ccr != want_ccr {
                                failures.push(format!(
                                    "{class:?} size={size_bits} dst={dst:#x} src={src:#x} x={x_in} z={z_in}: \
                                     d0={:#010x} ccr={got_ccr:#04x}, want d0={want_d0:#010x} ccr={want_ccr:#04x}",
                                    cpu.regs.d[0]
                                ));
                            }
                        }
                    }
                }
            }
        }
    }

    assert!(failures.is_empty(), "{} mismatches:\n{}", failures.len(), failures.join("\n"));
}

#[test]
fn cmp_leaves_extend_alone() {
    // CMP.L D1,D0 borrowing with X clear, then equal with X set.
    let cpu = run(&[0xB081], 0, 1, 0);
    assert_eq!(ccr(&cpu), N | C);
    let cpu = run(&[0xB081], 5, 5, X);
    assert_eq!(ccr(&cpu), X | Z);
}
