//! Exception entry, interrupts, stack frames and the halted state.

mod common;

use common::{ORIGIN, STACK, boot, handler_for};
use motorola_680x0::{CpuModel, FunctionCode, IDLE_CYCLES, InterruptAck};

const NOP: u16 = 0x4E71;
const RTE: u16 = 0x4E73;

/// 68000 group 0 frame: status word, access address, IR, SR, PC.
struct Group0Frame {
    status: u16,
    address: u32,
    ir: u16,
    sr: u16,
    pc: u32,
}

fn group0_frame(bus: &common::TestBus, sp: u32) -> Group0Frame {
    Group0Frame {
        status: bus.peek_word(sp),
        address: bus.peek_long(sp + 2),
        ir: bus.peek_word(sp + 6),
        sr: bus.peek_word(sp + 8),
        pc: bus.peek_long(sp + 10),
    }
}

// === Address errors ===

#[test]
fn supervisor_data_read_from_odd_address() {
    // NOP, MOVE.W (A0),D0
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[NOP, 0x3010]);
    cpu.regs.a[0] = 0x2001;
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.regs.pc, handler_for(3));
    assert_eq!(cpu.regs.isp, STACK - 14);
    let frame = group0_frame(&bus, cpu.regs.isp);
    assert_eq!(frame.address, 0x2001);
    assert_eq!(frame.ir, 0x3010);
    // Read, not an instruction fetch, supervisor data.
    assert_eq!(frame.status & 0x1F, 0x10 | 0x08 | 5);
    assert_eq!(frame.pc, ORIGIN + 4);
}

#[test]
fn user_data_write_to_odd_address() {
    // NOP, MOVE.W D0,(A0)
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[NOP, 0x3080]);
    cpu.regs.sr = 0x0000;
    cpu.regs.usp = 0x8000;
    cpu.regs.a[0] = 0x3003;
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.regs.pc, handler_for(3));
    assert!(cpu.regs.is_supervisor());
    let frame = group0_frame(&bus, cpu.regs.isp);
    assert_eq!(frame.address, 0x3003);
    assert_eq!(frame.status & 0x1F, 0x08 | 1);
    assert_eq!(bus.peek_word(0x3002), 0, "nothing may be written");
}

#[test]
fn user_program_fetch_from_odd_address() {
    // NOP, JMP (A0) with A0 odd: the fetch at the target faults.
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[NOP, 0x4ED0]);
    cpu.regs.sr = 0x0000;
    cpu.regs.usp = 0x8000;
    cpu.regs.a[0] = 0x4001;
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x4001);
    cpu.step(&mut bus);

    assert_eq!(cpu.regs.pc, handler_for(3));
    let frame = group0_frame(&bus, cpu.regs.isp);
    assert_eq!(frame.address, 0x4001);
    assert_eq!(frame.status & 0x1F, 0x10 | 2);
}

#[test]
fn supervisor_program_fetch_from_odd_address() {
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[NOP, 0x4ED0]);
    cpu.regs.a[0] = 0x4001;
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);

    assert_eq!(cpu.regs.pc, handler_for(3));
    let frame = group0_frame(&bus, cpu.regs.isp);
    assert_eq!(frame.status & 0x1F, 0x10 | 6);
}

#[test]
fn bus_error_from_the_bus() {
    // NOP, MOVE.W (A0),D0 into a hole.
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[NOP, 0x3010]);
    bus.berr = Some((0x00A0_0000, 0x00B0_0000));
    cpu.regs.a[0] = 0x00A0_1234;
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, handler_for(2));
    assert_eq!(group0_frame(&bus, cpu.regs.isp).address, 0x00A0_1234);
}

#[test]
fn move_flags_are_committed_before_a_faulting_write() {
    // NOP, MOVE.W D0,(A0) into a hole with D0 zero and N set beforehand.
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[NOP, 0x3080]);
    bus.berr = Some((0x00A0_0000, 0x00B0_0000));
    cpu.regs.a[0] = 0x00A0_0000;
    cpu.regs.d[0] = 0;
    cpu.step(&mut bus);
    cpu.regs.sr = 0x2708;
    cpu.step(&mut bus);

    assert_eq!(cpu.regs.pc, handler_for(2));
    let frame = group0_frame(&bus, cpu.regs.isp);
    assert_eq!(frame.status & 0x10, 0, "write cycle");
    assert_eq!(frame.sr, 0x2704);
}

#[test]
fn external_bus_error_is_taken_at_the_boundary() {
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[NOP, NOP]);
    cpu.step(&mut bus);
    cpu.signal_bus_error(0x00F0_0000, true, FunctionCode::SupervisorData);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, handler_for(2));
    let frame = group0_frame(&bus, cpu.regs.isp);
    assert_eq!(frame.address, 0x00F0_0000);
    assert_eq!(frame.pc, ORIGIN + 2);
}

// === Double bus fault ===

#[test]
fn fault_while_stacking_halts_until_reset() {
    // NOP, MOVE.W (A0),D0 with both A0 and the stack pointer odd.
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[NOP, 0x3010]);
    cpu.regs.a[0] = 0x2001;
    cpu.step(&mut bus);
    cpu.regs.isp = 0x8001;
    cpu.step(&mut bus);
    assert!(cpu.is_halted());

    let pc = cpu.regs.pc;
    assert_eq!(cpu.step(&mut bus), IDLE_CYCLES);
    assert_eq!(cpu.execute_run(&mut bus, 500), 500);
    assert_eq!(cpu.regs.pc, pc);

    cpu.request_reset();
    cpu.step(&mut bus);
    assert!(!cpu.is_halted());
    assert_eq!(cpu.regs.pc, ORIGIN);
    assert_eq!(cpu.regs.isp, STACK);
}

#[test]
fn fault_in_the_first_instruction_after_reset_is_vectored() {
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[0x3010]);
    cpu.regs.a[0] = 0x2001;
    cpu.step(&mut bus);

    assert!(!cpu.is_halted());
    assert_eq!(cpu.regs.pc, handler_for(3));
    assert_eq!(cpu.regs.isp, STACK - 14);
    assert_eq!(bus.peek_long(cpu.regs.isp + 2), 0x2001);
    assert_eq!(bus.peek_word(cpu.regs.isp + 6), 0x3010);
}

#[test]
fn fault_in_a_bus_error_handler_is_taken_again() {
    // Both the program and the handler read from the faulting hole.
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[NOP, 0x3010]);
    bus.load(handler_for(2), &[0x3010]);
    bus.berr = Some((0x00A0_0000, 0x00B0_0000));
    cpu.regs.a[0] = 0x00A0_0000;
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, handler_for(2));
    assert_eq!(cpu.regs.isp, STACK - 14);

    cpu.step(&mut bus);
    assert!(!cpu.is_halted());
    assert_eq!(cpu.regs.pc, handler_for(2));
    assert_eq!(cpu.regs.isp, STACK - 28);
    assert_eq!(bus.peek_long(cpu.regs.isp + 2), 0x00A0_0000);
    assert_eq!(bus.peek_word(cpu.regs.isp + 6), 0x3010);
}

// === Interrupts ===

#[test]
fn highest_level_above_the_mask_is_taken() {
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[NOP, NOP]);
    cpu.regs.sr = 0x2300;
    cpu.set_input_line(2, true);
    cpu.set_input_line(5, true);
    cpu.step(&mut bus);

    assert_eq!(bus.acks, vec![5]);
    assert_eq!(cpu.regs.pc, handler_for(24 + 5));
    assert_eq!(cpu.regs.interrupt_mask(), 5);
    // Stacked SR and the interrupted PC.
    assert_eq!(bus.peek_word(cpu.regs.isp), 0x2300);
    assert_eq!(bus.peek_long(cpu.regs.isp + 2), ORIGIN);
}

#[test]
fn masked_levels_wait() {
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[NOP, NOP]);
    cpu.regs.sr = 0x2300;
    cpu.set_input_line(3, true);
    cpu.step(&mut bus);
    assert!(bus.acks.is_empty());
    assert_eq!(cpu.regs.pc, ORIGIN + 2);

    cpu.regs.sr = 0x2200;
    cpu.step(&mut bus);
    assert_eq!(bus.acks, vec![3]);
}

#[test]
fn vectored_and_spurious_acknowledge() {
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[NOP]);
    cpu.regs.sr = 0x2000;
    bus.ack = InterruptAck::Vector(48);
    cpu.set_input_line(4, true);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, handler_for(48));

    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[NOP]);
    cpu.regs.sr = 0x2000;
    bus.ack = InterruptAck::Spurious;
    cpu.set_input_line(4, true);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, handler_for(24));
}

#[test]
fn level_seven_is_edge_triggered() {
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[NOP, NOP]);
    assert_eq!(cpu.regs.interrupt_mask(), 7);

    cpu.set_input_line(7, true);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, handler_for(31));

    // The handler stops; holding the line does not interrupt again.
    cpu.step(&mut bus);
    assert!(cpu.is_stopped());
    cpu.set_input_line(7, true);
    assert_eq!(cpu.step(&mut bus), IDLE_CYCLES);
    assert!(cpu.is_stopped());
    assert_eq!(bus.acks, vec![7]);

    // A fresh edge does.
    cpu.set_input_line(7, false);
    cpu.set_input_line(7, true);
    cpu.step(&mut bus);
    assert!(!cpu.is_stopped());
    assert_eq!(bus.acks, vec![7, 7]);
}

#[test]
fn stop_resumes_on_interrupt() {
    // STOP #$2000
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[0x4E72, 0x2000, NOP]);
    cpu.step(&mut bus);
    assert!(cpu.is_stopped());
    cpu.set_input_line(1, true);
    cpu.step(&mut bus);
    assert!(!cpu.is_stopped());
    assert_eq!(cpu.regs.pc, handler_for(25));
    assert_eq!(bus.peek_long(cpu.regs.isp + 2), ORIGIN + 4);
}

// === Traps and frames ===

#[test]
fn trap_and_rte_round_trip() {
    // TRAP #0, NOP
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[0x4E40, NOP]);
    bus.load(handler_for(32), &[RTE]);
    cpu.regs.sr = 0x2015;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, handler_for(32));
    assert_eq!(cpu.regs.isp, STACK - 6);

    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, ORIGIN + 2);
    assert_eq!(cpu.regs.sr, 0x2015);
    assert_eq!(cpu.regs.isp, STACK);
}

#[test]
fn the_68010_stacks_a_format_word() {
    let (mut cpu, mut bus) = boot(CpuModel::M68010, &[0x4E43, NOP]);
    bus.load(handler_for(35), &[RTE]);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.isp, STACK - 8);
    assert_eq!(bus.peek_word(cpu.regs.isp + 6), 35 * 4);

    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, ORIGIN + 2);
}

#[test]
fn rte_rejects_unknown_frame_formats() {
    let (mut cpu, mut bus) = boot(CpuModel::M68010, &[0x4E43, NOP]);
    bus.load(handler_for(35), &[RTE]);
    cpu.step(&mut bus);
    let sp = cpu.regs.isp;
    bus.poke_word(sp + 6, 0x5000 | (35 * 4));
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, handler_for(14));
}

#[test]
fn vbr_relocates_the_table() {
    // MOVEC D0,VBR; TRAP #1
    let (mut cpu, mut bus) = boot(CpuModel::M68010, &[0x4E7B, 0x0801, 0x4E41]);
    cpu.regs.d[0] = 0x0004_0000;
    bus.poke_long(0x0004_0000 + 33 * 4, 0x0000_6000);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.vbr, 0x0004_0000);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, 0x6000);
}

#[test]
fn privileged_instruction_in_user_mode() {
    // STOP #$2700 from user mode.
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[0x4E72, 0x2700]);
    cpu.regs.sr = 0x0000;
    cpu.regs.usp = 0x8000;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, handler_for(8));
    assert!(!cpu.is_stopped());
    assert_eq!(bus.peek_long(cpu.regs.isp + 2), ORIGIN);
}

#[test]
fn illegal_and_line_traps() {
    for (opcode, vector) in [(0x4AFC, 4), (0xA123, 10), (0xF123, 11)] {
        let (mut cpu, mut bus) = boot(CpuModel::M68000, &[opcode]);
        cpu.step(&mut bus);
        assert_eq!(cpu.regs.pc, handler_for(vector), "{opcode:04x}");
        assert_eq!(bus.peek_long(cpu.regs.isp + 2), ORIGIN);
    }
}

#[test]
fn trace_follows_the_traced_instruction() {
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[NOP, NOP]);
    cpu.regs.sr = 0xA700;
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.pc, handler_for(9));
    assert_eq!(bus.peek_long(cpu.regs.isp + 2), ORIGIN + 2);
    assert_eq!(cpu.regs.sr & 0x8000, 0);
}

// === Reset ===

#[test]
fn reset_then_run_a_subroutine() {
    // MOVEQ #5,D0; RTS
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[0x7005, 0x4E75]);
    bus.poke_long(STACK, 0x0000_2000);
    assert_eq!(cpu.regs.pc, ORIGIN);
    assert_eq!(cpu.regs.sr, 0x2700);
    let after_reset = cpu.total_cycles().get();
    assert_eq!(after_reset, 40);

    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.regs.d[0], 5);
    assert_eq!(cpu.regs.pc, 0x2000);
    assert_eq!(cpu.regs.isp, STACK + 4);
    assert_eq!(cpu.total_cycles().get(), after_reset + 4 + 16);
}

#[test]
fn reset_instruction_pulses_the_bus() {
    let (mut cpu, mut bus) = boot(CpuModel::M68000, &[0x4E70]);
    assert_eq!(cpu.step(&mut bus), 132);
    assert_eq!(bus.resets, 1);
    assert_eq!(cpu.regs.pc, ORIGIN + 2);
}
