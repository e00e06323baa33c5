//! Single-instruction vectors stored as JSON under `tests/vectors/`.
//!
//! Each file holds an array of cases. A case names the model, the register
//! and memory state before one `step`, and the state expected after it.
//! Memory is given as `[address, byte]` pairs; registers left out default
//! to zero.

mod common;

use common::TestBus;
use motorola_680x0::{Cpu680x0, CpuModel};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize)]
struct TestCase {
    name: String,
    model: CpuModel,
    initial: CpuState,
    #[serde(rename = "final")]
    final_state: CpuState,
    #[serde(default)]
    cycles: Option<u32>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CpuState {
    d: [u32; 8],
    a: [u32; 7],
    usp: u32,
    ssp: u32,
    sr: u16,
    pc: u32,
    ram: Vec<(u32, u8)>,
}

fn setup(model: CpuModel, state: &CpuState) -> (Cpu680x0, TestBus) {
    let mut bus = TestBus::new();
    bus.poke_long(0, state.ssp);
    bus.poke_long(4, state.pc);
    for &(addr, value) in &state.ram {
        bus.data[(addr & 0xFF_FFFF) as usize] = value;
    }

    let mut cpu = Cpu680x0::new(model);
    cpu.pulse_reset(&mut bus);
    cpu.regs.d = state.d;
    cpu.regs.a = state.a;
    cpu.regs.usp = state.usp;
    cpu.regs.isp = state.ssp;
    cpu.regs.sr = state.sr;
    cpu.regs.pc = state.pc;
    (cpu, bus)
}

fn check_u32(errors: &mut Vec<String>, name: &str, actual: u32, expected: u32) {
    if actual != expected {
        errors.push(format!("{name}: got {actual:#010x}, want {expected:#010x}"));
    }
}

fn compare(cpu: &Cpu680x0, bus: &TestBus, expected: &CpuState) -> Vec<String> {
    let mut errors = Vec::new();
    for (n, (&actual, &want)) in cpu.regs.d.iter().zip(&expected.d).enumerate() {
        check_u32(&mut errors, &format!("D{n}"), actual, want);
    }
    for (n, (&actual, &want)) in cpu.regs.a.iter().zip(&expected.a).enumerate() {
        check_u32(&mut errors, &format!("A{n}"), actual, want);
    }
    check_u32(&mut errors, "USP", cpu.regs.usp, expected.usp);
    check_u32(&mut errors, "SSP", cpu.regs.isp, expected.ssp);
    check_u32(&mut errors, "PC", cpu.regs.pc, expected.pc);
    if cpu.regs.sr != expected.sr {
        errors.push(format!("SR: got {:#06x}, want {:#06x}", cpu.regs.sr, expected.sr));
    }
    for &(addr, want) in &expected.ram {
        let actual = bus.data[(addr & 0xFF_FFFF) as usize];
        if actual != want {
            errors.push(format!("RAM[{addr:#08x}]: got {actual:#04x}, want {want:#04x}"));
        }
    }
    errors
}

fn run_file(path: &Path) -> Result<usize, Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| vec![format!("{}: {e}", path.display())])?;
    let cases: Vec<TestCase> =
        serde_json::from_str(&content).map_err(|e| vec![format!("{}: {e}", path.display())])?;

    let mut failures = Vec::new();
    for case in &cases {
        let (mut cpu, mut bus) = setup(case.model, &case.initial);
        let cycles = cpu.step(&mut bus);
        let mut errors = compare(&cpu, &bus, &case.final_state);
        if let Some(want) = case.cycles.filter(|&want| want != cycles) {
            errors.push(format!("cycles: got {cycles}, want {want}"));
        }
        if !errors.is_empty() {
            failures.push(format!("{}: {}", case.name, errors.join("; ")));
        }
    }
    if failures.is_empty() { Ok(cases.len()) } else { Err(failures) }
}

#[test]
fn json_vectors() {
    let pattern = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/vectors/*.json");
    let mut files = 0;
    let mut cases = 0;
    let mut failures = Vec::new();

    for entry in glob::glob(pattern).expect("valid glob pattern") {
        let path = entry.expect("readable directory entry");
        files += 1;
        match run_file(&path) {
            Ok(count) => cases += count,
            Err(mut errors) => failures.append(&mut errors),
        }
    }

    assert!(files > 0, "no vector files under tests/vectors");
    assert!(failures.is_empty(), "{} failures:\n{}", failures.len(), failures.join("\n"));
    assert!(cases > 0);
}
