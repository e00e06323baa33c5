//! Floating-point coprocessor instructions through the CPU.

mod common;

use common::{ORIGIN, STACK, boot, handler_for};
use emu_core::{Observable, Value};
use motorola_680x0::fpu::fpsr;
use motorola_680x0::{Cpu680x0, CpuModel};

const NOP: u16 = 0x4E71;

fn steps(cpu: &mut Cpu680x0, bus: &mut common::TestBus, count: usize) {
    for _ in 0..count {
        cpu.step(bus);
    }
}

#[test]
fn arithmetic_and_stores_in_every_format() {
    let program = [
        0xF23C, 0x4000, 0x0000, 0x0003, // FMOVE.L #3,FP0
        0xF23C, 0x5022, 0x0002, // FADD.W #2,FP0
        0xF210, 0x6800, // FMOVE.X FP0,(A0)
        0xF201, 0x6000, // FMOVE.L FP0,D1
        0xF229, 0x7400, 0x0010, // FMOVE.D FP0,16(A1)
        0xF211, 0x4420, // FDIV.S (A1),FP0
    ];
    let (mut cpu, mut bus) = boot(CpuModel::M68020Fpu, &program);
    cpu.regs.a[0] = 0x4000;
    cpu.regs.a[1] = 0x5000;
    bus.poke_long(0x5000, 2.0f32.to_bits());
    steps(&mut cpu, &mut bus, 6);

    assert_eq!(bus.peek_long(0x4000), 0x4001_0000);
    assert_eq!(bus.peek_long(0x4004), 0xA000_0000);
    assert_eq!(bus.peek_long(0x4008), 0);
    assert_eq!(cpu.regs.d[1], 5);
    let double = 5.0f64.to_bits();
    assert_eq!(bus.peek_long(0x5010), (double >> 32) as u32);
    assert_eq!(bus.peek_long(0x5014), double as u32);
    assert_eq!(cpu.fpu().fp[0], 2.5);
    assert_eq!(cpu.fpu().fpsr & fpsr::CC_MASK, 0);
    assert_eq!(cpu.fpu().fpiar, ORIGIN + 28);
    assert_eq!(cpu.regs.pc, ORIGIN + 32);
}

#[test]
fn compare_then_branch() {
    let program = [
        0xF23C, 0x4038, 0x0000, 0x0005, // FCMP.L #5,FP0
        0xF281, 0x0004, // FBEQ.W to +14
        NOP,
        NOP,
    ];
    let (mut cpu, mut bus) = boot(CpuModel::M68030, &program);
    cpu.fpu_mut().fp[0] = 5.0;
    steps(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.fpu().fpsr & fpsr::CC_MASK, fpsr::Z);
    assert_eq!(cpu.fpu().fp[0], 5.0);
    assert_eq!(cpu.regs.pc, ORIGIN + 14);
}

#[test]
fn fdbcc_counts_down_to_minus_one() {
    // loop: FDBF D2,loop
    let (mut cpu, mut bus) = boot(CpuModel::M68030, &[0xF24A, 0x0000, 0xFFFC, NOP]);
    cpu.regs.d[2] = 0xAAAA_0002;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, ORIGIN);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, ORIGIN);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, ORIGIN + 6);
    assert_eq!(cpu.regs.d[2], 0xAAAA_FFFF);
}

#[test]
fn fscc_and_ftrapcc_read_the_condition_codes() {
    let program = [
        0xF200, 0x003A, // FTST.X FP0
        0xF240, 0x0001, // FSEQ D0
        0xF27C, 0x000E, // FTRAPNE
        0xF27C, 0x0001, // FTRAPEQ
    ];
    let (mut cpu, mut bus) = boot(CpuModel::M68030, &program);
    cpu.fpu_mut().fp[0] = 0.0;
    steps(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.regs.d[0] & 0xFF, 0xFF);
    assert_eq!(cpu.regs.pc, ORIGIN + 12);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, handler_for(7));
}

#[test]
fn fmovem_stores_fp0_lowest_and_reloads() {
    let program = [
        0xF227, 0xE005, // FMOVEM.X FP0/FP2,-(A7)
        0xF21F, 0xD00C, // FMOVEM.X (A7)+,FP4/FP5
    ];
    let (mut cpu, mut bus) = boot(CpuModel::M68030, &program);
    cpu.fpu_mut().fp[0] = 1.5;
    cpu.fpu_mut().fp[2] = -3.0;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.isp, STACK - 24);
    assert_eq!(bus.peek_long(STACK - 24), 0x3FFF_0000);
    assert_eq!(bus.peek_long(STACK - 20), 0xC000_0000);
    assert_eq!(bus.peek_long(STACK - 12), 0xC000_0000);
    assert_eq!(bus.peek_long(STACK - 8), 0xC000_0000);

    cpu.step(&mut bus);
    assert_eq!(cpu.regs.isp, STACK);
    assert_eq!(cpu.fpu().fp[4], 1.5);
    assert_eq!(cpu.fpu().fp[5], -3.0);
}

#[test]
fn control_registers_move_through_data_registers() {
    let program = [
        0xF200, 0x9000, // FMOVE.L D0,FPCR
        0xF201, 0x6000, // FMOVE.L FP0,D1
        0xF202, 0xA800, // FMOVE.L FPSR,D2
    ];
    let (mut cpu, mut bus) = boot(CpuModel::M68030, &program);
    // Round toward zero.
    cpu.regs.d[0] = 0x0000_0010;
    cpu.fpu_mut().fp[0] = 2.7;
    steps(&mut cpu, &mut bus, 3);
    assert_eq!(cpu.fpu().fpcr, 0x10);
    assert_eq!(cpu.regs.d[1], 2);
    assert_eq!(cpu.regs.d[2] & fpsr::INEX2, fpsr::INEX2);
}

#[test]
fn fsave_and_frestore_frames() {
    let program = [
        0xF327, // FSAVE -(A7)
        0xF23C, 0x4000, 0x0000, 0x0001, // FMOVE.L #1,FP0
        0xF327, // FSAVE -(A7)
        0xF35F, // FRESTORE (A7)+
        0xF35F, // FRESTORE (A7)+
    ];
    let (mut cpu, mut bus) = boot(CpuModel::M68020Fpu, &program);
    assert!(cpu.fpu().is_null());
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.isp, STACK - 4);
    assert_eq!(bus.peek_long(STACK - 4), 0);

    steps(&mut cpu, &mut bus, 2);
    assert!(!cpu.fpu().is_null());
    assert_eq!(cpu.regs.isp, STACK - 32);
    assert_eq!(bus.peek_long(STACK - 32), 0x1F18_0000);
    assert_eq!(bus.peek_long(STACK - 8), 0x7000_0000);

    cpu.step(&mut bus);
    assert_eq!(cpu.regs.isp, STACK - 4);
    assert_eq!(cpu.fpu().fp[0], 1.0);

    cpu.step(&mut bus);
    assert_eq!(cpu.regs.isp, STACK);
    assert!(cpu.fpu().is_null());
    assert!(cpu.fpu().fp[0].is_nan());
}

#[test]
fn m68040_idle_frame_is_a_header() {
    let program = [
        0xF23C, 0x4000, 0x0000, 0x0001, // FMOVE.L #1,FP0
        0xF327, // FSAVE -(A7)
    ];
    let (mut cpu, mut bus) = boot(CpuModel::M68040, &program);
    steps(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs.isp, STACK - 4);
    assert_eq!(bus.peek_long(STACK - 4), 0x4100_0000);
}

#[test]
fn frestore_of_a_foreign_frame_is_a_format_error() {
    let (mut cpu, mut bus) = boot(CpuModel::M68030, &[0xF350]); // FRESTORE (A0)
    cpu.regs.a[0] = 0x4000;
    bus.poke_long(0x4000, 0x4100_0000);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, handler_for(14));
}

#[test]
fn fsave_is_privileged() {
    let program = [
        0x46FC, 0x0000, // MOVE #0,SR
        0xF310, // FSAVE (A0)
    ];
    let (mut cpu, mut bus) = boot(CpuModel::M68030, &program);
    cpu.regs.a[0] = 0x4000;
    cpu.regs.usp = 0x8000;
    steps(&mut cpu, &mut bus, 2);
    assert_eq!(cpu.regs.pc, handler_for(8));
}

#[test]
fn constant_rom_loads_pi() {
    // FMOVECR #0,FP3
    let (mut cpu, mut bus) = boot(CpuModel::M68030, &[0xF200, 0x5D80]);
    cpu.step(&mut bus);
    assert_eq!(cpu.fpu().fp[3], std::f64::consts::PI);
}

#[test]
fn fpu_opcodes_trap_without_an_fpu() {
    let program = [0xF23C, 0x4000, 0x0000, 0x0003];
    for model in [CpuModel::M68020, CpuModel::M68EC030, CpuModel::M68LC040, CpuModel::M68000] {
        let (mut cpu, mut bus) = boot(model, &program);
        cpu.step(&mut bus);
        assert_eq!(cpu.regs.pc, handler_for(11), "{model:?}");
        assert!(cpu.fpu().is_null());
    }
}

#[test]
fn m68040_traps_what_it_leaves_to_software() {
    let program = [
        0xF200, 0x0422, // FADD.X FP1,FP0
        0xF200, 0x008E, // FSIN.X FP0,FP1
    ];
    let (mut cpu, mut bus) = boot(CpuModel::M68040, &program);
    cpu.fpu_mut().fp[0] = 1.0;
    cpu.fpu_mut().fp[1] = 2.0;
    cpu.step(&mut bus);
    assert_eq!(cpu.fpu().fp[0], 3.0);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, handler_for(11));
    assert_eq!(cpu.fpu().fp[1], 2.0);
}

#[test]
fn fpu_registers_are_observable() {
    // FMOVE.L #-2,FP7
    let (mut cpu, mut bus) = boot(CpuModel::M68030, &[0xF23C, 0x4380, 0xFFFF, 0xFFFE]);
    cpu.step(&mut bus);
    assert_eq!(cpu.query("fp7"), Some(Value::U64((-2.0f64).to_bits())));
    assert_eq!(cpu.query("fpsr"), Some(Value::from(fpsr::N)));
    assert_eq!(cpu.query("fpiar"), Some(Value::from(ORIGIN)));

    let (plain, _) = boot(CpuModel::M68020, &[NOP]);
    assert_eq!(plain.query("fp0"), None);
    assert!(!plain.query_paths().contains(&"fpcr"));
}
