//! Instruction timing as seen through `step`.

mod common;

use common::{ORIGIN, STACK, boot};
use motorola_680x0::{CpuModel, IDLE_CYCLES};

fn cycles_68000(program: &[u16], setup: impl FnOnce(&mut motorola_680x0::Cpu680x0)) -> u32 {
    let (mut cpu, mut bus) = boot(CpuModel::M68000, program);
    setup(&mut cpu);
    cpu.step(&mut bus)
}

#[test]
fn register_and_memory_alu_forms() {
    assert_eq!(cycles_68000(&[0xD041], |_| {}), 4); // ADD.W D1,D0
    assert_eq!(cycles_68000(&[0xD058], |cpu| cpu.regs.a[0] = 0x2000), 8); // ADD.W (A0)+,D0
    assert_eq!(cycles_68000(&[0xD07C, 0x1234], |_| {}), 8); // ADD.W #imm,D0
    assert_eq!(cycles_68000(&[0xD081], |_| {}), 8); // ADD.L D1,D0
    assert_eq!(cycles_68000(&[0x7005], |_| {}), 4); // MOVEQ #5,D0
    assert_eq!(cycles_68000(&[0x4E71], |_| {}), 4); // NOP
}

#[test]
fn rts_pops_and_costs_sixteen() {
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[0x4E75]);
    bus.poke_long(STACK - 4, 0x0000_2000);
    cpu.regs.isp = STACK - 4;
    assert_eq!(cpu.step(&mut bus), 16);
    assert_eq!(cpu.regs.pc, 0x2000);
    assert_eq!(cpu.regs.isp, STACK);
}

#[test]
fn short_branches() {
    // Z is clear after reset.
    let taken = cycles_68000(&[0x6602], |_| {}); // BNE.S *+4
    let not_taken = cycles_68000(&[0x6702], |_| {}); // BEQ.S *+4
    assert_eq!(taken, 10);
    assert_eq!(not_taken, 8);

    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[0x6602]);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, ORIGIN + 4);
}

#[test]
fn dbra_loop_and_exit() {
    // DBRA D0,* with D0 = 1: one loop, then fall through.
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[0x51C8, 0xFFFE]);
    cpu.regs.d[0] = 1;
    assert_eq!(cpu.step(&mut bus), 10);
    assert_eq!(cpu.regs.pc, ORIGIN);
    assert_eq!(cpu.regs.d[0], 0);
    assert_eq!(cpu.step(&mut bus), 14);
    assert_eq!(cpu.regs.pc, ORIGIN + 4);
    assert_eq!(cpu.regs.d[0], 0xFFFF);
}

#[test]
fn shift_count_is_charged_per_bit() {
    for count in 1..=8u16 {
        // LSL.W #count,D1
        let opcode = 0xE149 | ((count & 7) << 9);
        assert_eq!(cycles_68000(&[opcode], |_| {}), 6 + 2 * u32::from(count));
    }
}

#[test]
fn mulu_depends_on_source_bits() {
    // MULU.W D1,D0
    for source in [0u32, 0x00FF, 0xFFFF, 0x5555] {
        let cycles = cycles_68000(&[0xC0C1], |cpu| cpu.regs.d[1] = source);
        assert_eq!(cycles, 38 + 2 * source.count_ones());
    }
}

#[test]
fn wait_states_are_added() {
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[0x4E71]);
    bus.wait = 3;
    assert_eq!(cpu.step(&mut bus), 7);
}

#[test]
fn later_parts_are_faster() {
    let (mut cpu, mut bus) = boot(CpuModel::M68020, &[0x7005]);
    assert_eq!(cpu.step(&mut bus), 2);
    let (mut cpu, mut bus) = boot(CpuModel::M68040, &[0x7005]);
    assert_eq!(cpu.step(&mut bus), 1);
}

#[test]
fn execute_run_overshoots_by_the_last_instruction() {
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[0x4E71; 8]);
    let before = cpu.total_cycles().get();
    assert_eq!(cpu.execute_run(&mut bus, 10), 12);
    assert_eq!(cpu.regs.pc, ORIGIN + 6);
    assert_eq!(cpu.total_cycles().get() - before, 12);
}

#[test]
fn stopped_cpu_burns_the_budget() {
    // STOP #$2700
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[0x4E72, 0x2700]);
    cpu.step(&mut bus);
    assert!(cpu.is_stopped());
    assert_eq!(cpu.step(&mut bus), IDLE_CYCLES);
    assert_eq!(cpu.execute_run(&mut bus, 1000), 1000);
    assert!(cpu.is_stopped());
}
