//! Disassembler.
//!
//! [`disassemble`] decodes one instruction from a byte slice using the
//! same classification as the jump tables, so what it prints is what the
//! selected model would execute. Output is lowercase Motorola syntax with
//! `$` hex; branch targets are resolved against the supplied PC.
//!
//! A slice that ends inside the instruction yields `dc.w` for the opcode
//! word alone.

use crate::addressing::AddrMode;
use crate::alu::Size;
use crate::bits::BitfieldOp;
use crate::decode::{Op, classify};
use crate::model::{CpuModel, IsaLevel};
use crate::shifts::ShiftKind;
use crate::system::control;

const CONDITIONS: [&str; 16] = [
    "t", "f", "hi", "ls", "cc", "cs", "ne", "eq", "vc", "vs", "pl", "mi", "ge", "lt", "gt", "le",
];

/// Disassemble the instruction at the start of `bytes`, located at `pc`.
/// Returns the text and the number of bytes consumed.
#[must_use]
pub fn disassemble(model: CpuModel, pc: u32, bytes: &[u8]) -> (String, usize) {
    let mut dis = Disassembler {
        bytes,
        pos: 0,
        pc,
        level: model.capabilities().isa,
    };
    let Some(opcode) = dis.word() else {
        return match bytes.first() {
            Some(byte) => (format!("dc.b ${byte:02x}"), 1),
            None => (String::new(), 0),
        };
    };
    match dis.instruction(opcode) {
        Some(text) => (text, dis.pos),
        None => (dc_w(opcode), 2),
    }
}

fn dc_w(opcode: u16) -> String {
    format!("dc.w ${opcode:04x}")
}

fn signed_hex(value: i32) -> String {
    if value < 0 {
        format!("-${:x}", value.unsigned_abs())
    } else {
        format!("${value:x}")
    }
}

fn condition(opcode: u16) -> &'static str {
    CONDITIONS[usize::from((opcode >> 8) & 0xF)]
}

fn dreg(n: u16) -> String {
    format!("d{}", n & 7)
}

fn areg(n: u16) -> String {
    format!("a{}", n & 7)
}

/// D or A register from a 4-bit field (bit 3 selects A).
fn da_reg(n: u16) -> String {
    if n & 8 != 0 { areg(n) } else { dreg(n) }
}

/// Size field in bits 7-6.
fn size_76(opcode: u16) -> Option<Size> {
    Size::from_bits(opcode >> 6)
}

/// MOVEM register list. Masks for -(An) are stored reversed.
fn register_list(mask: u16, predecrement: bool) -> String {
    let mask = if predecrement { mask.reverse_bits() } else { mask };
    let mut parts = Vec::new();
    for (bank, prefix) in [(0, 'd'), (8, 'a')] {
        let set = |i: u16| mask & (1 << (bank + i)) != 0;
        let mut i = 0;
        while i < 8 {
            if set(i) {
                let start = i;
                while i + 1 < 8 && set(i + 1) {
                    i += 1;
                }
                if start == i {
                    parts.push(format!("{prefix}{start}"));
                } else {
                    parts.push(format!("{prefix}{start}-{prefix}{i}"));
                }
            }
            i += 1;
        }
    }
    if parts.is_empty() { "#0".to_string() } else { parts.join("/") }
}

/// PMMU function code operand (bits 4-0 of the extension word).
fn pmmu_fc(ext: u16) -> String {
    match ext & 0x1F {
        0 => "sfc".to_string(),
        1 => "dfc".to_string(),
        f if f & 0x18 == 0x08 => dreg(f),
        f => format!("#{}", f & 7),
    }
}

struct Disassembler<'a> {
    bytes: &'a [u8],
    pos: usize,
    pc: u32,
    level: IsaLevel,
}

impl Disassembler<'_> {
    fn word(&mut self) -> Option<u16> {
        let hi = *self.bytes.get(self.pos)?;
        let lo = *self.bytes.get(self.pos + 1)?;
        self.pos += 2;
        Some(u16::from_be_bytes([hi, lo]))
    }

    fn long(&mut self) -> Option<u32> {
        let hi = self.word()?;
        let lo = self.word()?;
        Some((u32::from(hi) << 16) | u32::from(lo))
    }

    /// Address of the next unread word.
    fn address(&self) -> u32 {
        self.pc.wrapping_add(self.pos as u32)
    }

    fn immediate(&mut self, size: Size) -> Option<String> {
        Some(match size {
            Size::Byte => format!("#${:02x}", self.word()? & 0xFF),
            Size::Word => format!("#${:04x}", self.word()?),
            Size::Long => format!("#${:08x}", self.long()?),
        })
    }

    /// Operand in the low six bits of `opcode`.
    fn ea(&mut self, opcode: u16, size: Size) -> Option<String> {
        self.ea_mode(AddrMode::from_ea_field(opcode), size)
    }

    fn ea_mode(&mut self, mode: Option<AddrMode>, size: Size) -> Option<String> {
        let Some(mode) = mode else {
            return Some("?".to_string());
        };
        Some(match mode {
            AddrMode::DataReg(r) => format!("d{r}"),
            AddrMode::AddrReg(r) => format!("a{r}"),
            AddrMode::AddrInd(r) => format!("(a{r})"),
            AddrMode::AddrIndPostInc(r) => format!("(a{r})+"),
            AddrMode::AddrIndPreDec(r) => format!("-(a{r})"),
            AddrMode::AddrIndDisp(r) => format!("({},a{r})", signed_hex(i32::from(self.word()? as i16))),
            AddrMode::AddrIndIndex(r) => self.indexed(&format!("a{r}"), None)?,
            AddrMode::AbsShort => format!("${:04x}.w", self.word()?),
            AddrMode::AbsLong => format!("${:08x}.l", self.long()?),
            AddrMode::PcDisp => {
                let base = self.address();
                let disp = self.word()? as i16;
                format!("(${:x},pc)", base.wrapping_add(disp as u32))
            }
            AddrMode::PcIndex => {
                let base = self.address();
                self.indexed("pc", Some(base))?
            }
            AddrMode::Immediate => self.immediate(size)?,
        })
    }

    fn index_register(&self, ext: u16) -> String {
        let size = if ext & 0x0800 != 0 { "l" } else { "w" };
        let scale = (ext >> 9) & 3;
        let reg = da_reg(ext >> 12);
        if scale != 0 && self.level.has_020() {
            format!("{reg}.{size}*{}", 1 << scale)
        } else {
            format!("{reg}.{size}")
        }
    }

    /// Brief or full-format index extension. `pc_base` resolves the brief
    /// PC-relative displacement to an address.
    fn indexed(&mut self, base: &str, pc_base: Option<u32>) -> Option<String> {
        let ext = self.word()?;
        let index = self.index_register(ext);

        if ext & 0x0100 == 0 || !self.level.has_full_extension() {
            let disp = ext as u8 as i8;
            let disp = match pc_base {
                Some(pc) => format!("${:x}", pc.wrapping_add(disp as u32)),
                None => signed_hex(i32::from(disp)),
            };
            return Some(format!("({disp},{base},{index})"));
        }

        let base = (ext & 0x0080 == 0).then(|| base.to_string());
        let index = (ext & 0x0040 == 0).then_some(index);
        let base_disp = match (ext >> 4) & 3 {
            2 => Some(signed_hex(i32::from(self.word()? as i16))),
            3 => Some(signed_hex(self.long()? as i32)),
            _ => None,
        };
        let indirect = ext & 7;
        if indirect == 0 {
            let parts: Vec<String> = [base_disp, base, index].into_iter().flatten().collect();
            return Some(if parts.is_empty() { "(0)".to_string() } else { format!("({})", parts.join(",")) });
        }
        let outer = match indirect & 3 {
            2 => Some(signed_hex(i32::from(self.word()? as i16))),
            3 => Some(signed_hex(self.long()? as i32)),
            _ => None,
        };
        let (inner, after): (Vec<String>, Option<String>) = if indirect & 4 == 0 {
            ([base_disp, base, index].into_iter().flatten().collect(), None)
        } else {
            ([base_disp, base].into_iter().flatten().collect(), index)
        };
        let mut parts = vec![format!("[{}]", inner.join(","))];
        parts.extend(after);
        parts.extend(outer);
        Some(format!("({})", parts.join(",")))
    }

    fn branch_target(&self, base: u32, disp: u32) -> String {
        format!("${:x}", base.wrapping_add(disp))
    }

    #[allow(clippy::too_many_lines)]
    fn instruction(&mut self, opcode: u16) -> Option<String> {
        let op = classify(opcode, self.level);
        let rx = (opcode >> 9) & 7;
        let ry = opcode & 7;

        let text = match op {
            Op::Illegal if opcode == 0x4AFC => "illegal".to_string(),
            Op::Illegal | Op::LineA | Op::LineF => dc_w(opcode),

            Op::OriCcr | Op::AndiCcr | Op::EoriCcr | Op::OriSr | Op::AndiSr | Op::EoriSr => {
                let name = match opcode >> 9 {
                    0 => "ori",
                    1 => "andi",
                    _ => "eori",
                };
                if opcode & 0x0040 != 0 {
                    format!("{name}.w {},sr", self.immediate(Size::Word)?)
                } else {
                    format!("{name}.b {},ccr", self.immediate(Size::Byte)?)
                }
            }
            Op::AluImm => {
                let name = match rx {
                    0 => "ori",
                    1 => "andi",
                    2 => "subi",
                    3 => "addi",
                    5 => "eori",
                    _ => "cmpi",
                };
                let size = size_76(opcode)?;
                let imm = self.immediate(size)?;
                format!("{name}{} {imm},{}", size.suffix(), self.ea(opcode, size)?)
            }
            Op::BitDynamic | Op::BitStatic => {
                let name = ["btst", "bchg", "bclr", "bset"][usize::from((opcode >> 6) & 3)];
                let bit = if op == Op::BitStatic {
                    format!("#{}", self.word()? & 0xFF)
                } else {
                    dreg(rx)
                };
                format!("{name} {bit},{}", self.ea(opcode, Size::Byte)?)
            }
            Op::Movep => {
                let size = if opcode & 0x0040 != 0 { Size::Long } else { Size::Word };
                let mem = format!("({},{})", signed_hex(i32::from(self.word()? as i16)), areg(ry));
                if opcode & 0x0080 != 0 {
                    format!("movep{} {},{mem}", size.suffix(), dreg(rx))
                } else {
                    format!("movep{} {mem},{}", size.suffix(), dreg(rx))
                }
            }
            Op::Moves => {
                let size = size_76(opcode)?;
                let ext = self.word()?;
                let reg = da_reg(ext >> 12);
                let ea = self.ea(opcode, size)?;
                if ext & 0x0800 != 0 {
                    format!("moves{} {reg},{ea}", size.suffix())
                } else {
                    format!("moves{} {ea},{reg}", size.suffix())
                }
            }
            Op::Cmp2Chk2 => {
                let size = Size::from_bits(opcode >> 9)?;
                let ext = self.word()?;
                let name = if ext & 0x0800 != 0 { "chk2" } else { "cmp2" };
                format!("{name}{} {},{}", size.suffix(), self.ea(opcode, size)?, da_reg(ext >> 12))
            }
            Op::Cas => {
                let size = match (opcode >> 9) & 3 {
                    1 => Size::Byte,
                    2 => Size::Word,
                    _ => Size::Long,
                };
                let ext = self.word()?;
                format!("cas{} {},{},{}", size.suffix(), dreg(ext), dreg(ext >> 6), self.ea(opcode, size)?)
            }
            Op::Cas2 => {
                let size = if opcode & 0x0200 != 0 { Size::Long } else { Size::Word };
                let ext1 = self.word()?;
                let ext2 = self.word()?;
                format!(
                    "cas2{} {}:{},{}:{},({}):({})",
                    size.suffix(),
                    dreg(ext1),
                    dreg(ext2),
                    dreg(ext1 >> 6),
                    dreg(ext2 >> 6),
                    da_reg(ext1 >> 12),
                    da_reg(ext2 >> 12)
                )
            }

            Op::Move | Op::Movea => {
                let size = Size::from_move_bits(opcode >> 12)?;
                let src = self.ea(opcode, size)?;
                if op == Op::Movea {
                    format!("movea{} {src},{}", size.suffix(), areg(rx))
                } else {
                    let dst = self.ea_mode(AddrMode::from_move_dest(opcode), size)?;
                    format!("move{} {src},{dst}", size.suffix())
                }
            }

            Op::Negx | Op::Clr | Op::Neg | Op::Not | Op::Tst => {
                let name = match op {
                    Op::Negx => "negx",
                    Op::Clr => "clr",
                    Op::Neg => "neg",
                    Op::Not => "not",
                    _ => "tst",
                };
                let size = size_76(opcode)?;
                format!("{name}{} {}", size.suffix(), self.ea(opcode, size)?)
            }
            Op::MoveFromSr => format!("move.w sr,{}", self.ea(opcode, Size::Word)?),
            Op::MoveFromCcr => format!("move.w ccr,{}", self.ea(opcode, Size::Word)?),
            Op::MoveToCcr => format!("move.w {},ccr", self.ea(opcode, Size::Word)?),
            Op::MoveToSr => format!("move.w {},sr", self.ea(opcode, Size::Word)?),
            Op::Nbcd => format!("nbcd {}", self.ea(opcode, Size::Byte)?),
            Op::Swap => format!("swap {}", dreg(ry)),
            Op::Pea => format!("pea {}", self.ea(opcode, Size::Long)?),
            Op::Bkpt => format!("bkpt #{ry}"),
            Op::Ext => {
                let size = if opcode & 0x0040 != 0 { Size::Long } else { Size::Word };
                format!("ext{} {}", size.suffix(), dreg(ry))
            }
            Op::Extb => format!("extb.l {}", dreg(ry)),
            Op::Movem => {
                let size = if opcode & 0x0040 != 0 { Size::Long } else { Size::Word };
                let mask = self.word()?;
                let mode = AddrMode::from_ea_field(opcode);
                let list = register_list(mask, matches!(mode, Some(AddrMode::AddrIndPreDec(_))));
                let ea = self.ea_mode(mode, size)?;
                if opcode & 0x0400 != 0 {
                    format!("movem{} {ea},{list}", size.suffix())
                } else {
                    format!("movem{} {list},{ea}", size.suffix())
                }
            }
            Op::Tas => format!("tas {}", self.ea(opcode, Size::Byte)?),
            Op::MulL | Op::DivL => {
                let ext = self.word()?;
                let signed = ext & 0x0800 != 0;
                let quad = ext & 0x0400 != 0;
                let low = dreg(ext >> 12);
                let high = dreg(ext);
                let ea = self.ea(opcode, Size::Long)?;
                if op == Op::MulL {
                    let name = if signed { "muls" } else { "mulu" };
                    if quad {
                        format!("{name}.l {ea},{high}:{low}")
                    } else {
                        format!("{name}.l {ea},{low}")
                    }
                } else {
                    let name = if signed { "divs" } else { "divu" };
                    if quad {
                        format!("{name}.l {ea},{high}:{low}")
                    } else if (ext & 7) == (ext >> 12) & 7 {
                        format!("{name}.l {ea},{low}")
                    } else {
                        format!("{name}l.l {ea},{high}:{low}")
                    }
                }
            }
            Op::Trap => format!("trap #{}", opcode & 0xF),
            Op::Link => format!("link {},#{}", areg(ry), signed_hex(i32::from(self.word()? as i16))),
            Op::LinkLong => format!("link.l {},#{}", areg(ry), signed_hex(self.long()? as i32)),
            Op::Unlk => format!("unlk {}", areg(ry)),
            Op::MoveUsp => {
                if opcode & 0x0008 != 0 {
                    format!("move usp,{}", areg(ry))
                } else {
                    format!("move {},usp", areg(ry))
                }
            }
            Op::Reset => "reset".to_string(),
            Op::Nop => "nop".to_string(),
            Op::Stop => format!("stop #${:04x}", self.word()?),
            Op::Rte => "rte".to_string(),
            Op::Rtd => format!("rtd #{}", signed_hex(i32::from(self.word()? as i16))),
            Op::Rts => "rts".to_string(),
            Op::Trapv => "trapv".to_string(),
            Op::Rtr => "rtr".to_string(),
            Op::Movec => {
                let ext = self.word()?;
                let reg = da_reg(ext >> 12);
                let code = ext & 0x0FFF;
                let ctrl = control::name(code).map_or_else(|| format!("${code:03x}"), str::to_string);
                if opcode & 1 != 0 {
                    format!("movec {reg},{ctrl}")
                } else {
                    format!("movec {ctrl},{reg}")
                }
            }
            Op::Jsr => format!("jsr {}", self.ea(opcode, Size::Long)?),
            Op::Jmp => format!("jmp {}", self.ea(opcode, Size::Long)?),
            Op::Chk => {
                let size = if (opcode >> 7) & 3 == 3 { Size::Word } else { Size::Long };
                format!("chk{} {},{}", size.suffix(), self.ea(opcode, size)?, dreg(rx))
            }
            Op::Lea => format!("lea {},{}", self.ea(opcode, Size::Long)?, areg(rx)),

            Op::AddqSubq => {
                let size = size_76(opcode)?;
                let name = if opcode & 0x0100 != 0 { "subq" } else { "addq" };
                let data = if rx == 0 { 8 } else { rx };
                format!("{name}{} #{data},{}", size.suffix(), self.ea(opcode, size)?)
            }
            Op::Scc => format!("s{} {}", condition(opcode), self.ea(opcode, Size::Byte)?),
            Op::Dbcc => {
                let base = self.address();
                let disp = self.word()? as i16 as u32;
                let cc = match (opcode >> 8) & 0xF {
                    1 => "ra",
                    _ => condition(opcode),
                };
                format!("db{cc} {},{}", dreg(ry), self.branch_target(base, disp))
            }
            Op::Trapcc => match opcode & 7 {
                2 => format!("trap{}.w #${:04x}", condition(opcode), self.word()?),
                3 => format!("trap{}.l #${:08x}", condition(opcode), self.long()?),
                _ => format!("trap{}", condition(opcode)),
            },
            Op::Bcc => {
                let base = self.address();
                let name = match (opcode >> 8) & 0xF {
                    0 => "bra",
                    1 => "bsr",
                    _ => condition(opcode),
                };
                let prefix = if name.starts_with('b') { "" } else { "b" };
                let (suffix, disp) = match opcode as u8 {
                    0 => (".w", self.word()? as i16 as u32),
                    0xFF if self.level.has_020() => (".l", self.long()?),
                    d => (".s", d as i8 as u32),
                };
                format!("{prefix}{name}{suffix} {}", self.branch_target(base, disp))
            }
            Op::Moveq => format!("moveq #{},{}", signed_hex(i32::from(opcode as u8 as i8)), dreg(rx)),

            Op::Or | Op::And | Op::AddSub | Op::Cmp | Op::Eor => {
                let name = match op {
                    Op::Or => "or",
                    Op::And => "and",
                    Op::Cmp => "cmp",
                    Op::Eor => "eor",
                    _ if opcode >> 12 == 0xD => "add",
                    _ => "sub",
                };
                let size = size_76(opcode)?;
                let ea = self.ea(opcode, size)?;
                if opcode & 0x0100 != 0 {
                    format!("{name}{} {},{ea}", size.suffix(), dreg(rx))
                } else {
                    format!("{name}{} {ea},{}", size.suffix(), dreg(rx))
                }
            }
            Op::AddaSuba | Op::Cmpa => {
                let name = match op {
                    Op::Cmpa => "cmpa",
                    _ if opcode >> 12 == 0xD => "adda",
                    _ => "suba",
                };
                let size = if opcode & 0x0100 != 0 { Size::Long } else { Size::Word };
                format!("{name}{} {},{}", size.suffix(), self.ea(opcode, size)?, areg(rx))
            }
            Op::DivW | Op::MulW => {
                let signed = opcode & 0x0100 != 0;
                let name = match (op, signed) {
                    (Op::DivW, true) => "divs",
                    (Op::DivW, false) => "divu",
                    (_, true) => "muls",
                    (_, false) => "mulu",
                };
                format!("{name}.w {},{}", self.ea(opcode, Size::Word)?, dreg(rx))
            }
            Op::Abcd | Op::Sbcd | Op::AddxSubx => {
                let (name, size) = match op {
                    Op::Abcd => ("abcd", None),
                    Op::Sbcd => ("sbcd", None),
                    _ if opcode >> 12 == 0xD => ("addx", size_76(opcode)),
                    _ => ("subx", size_76(opcode)),
                };
                let suffix = size.map_or("", Size::suffix);
                if opcode & 0x0008 != 0 {
                    format!("{name}{suffix} -({}),-({})", areg(ry), areg(rx))
                } else {
                    format!("{name}{suffix} {},{}", dreg(ry), dreg(rx))
                }
            }
            Op::Pack | Op::Unpk => {
                let name = if op == Op::Pack { "pack" } else { "unpk" };
                let adjust = self.word()?;
                if opcode & 0x0008 != 0 {
                    format!("{name} -({}),-({}),#${adjust:04x}", areg(ry), areg(rx))
                } else {
                    format!("{name} {},{},#${adjust:04x}", dreg(ry), dreg(rx))
                }
            }
            Op::Cmpm => {
                let size = size_76(opcode)?;
                format!("cmpm{} ({})+,({})+", size.suffix(), areg(ry), areg(rx))
            }
            Op::Exg => match (opcode >> 3) & 0x1F {
                0x08 => format!("exg {},{}", dreg(rx), dreg(ry)),
                0x09 => format!("exg {},{}", areg(rx), areg(ry)),
                _ => format!("exg {},{}", dreg(rx), areg(ry)),
            },

            Op::ShiftReg => {
                let size = size_76(opcode)?;
                let kind = ShiftKind::from_bits(opcode >> 3);
                let dir = if opcode & 0x0100 != 0 { "l" } else { "r" };
                let count = if opcode & 0x0020 != 0 {
                    dreg(rx)
                } else {
                    format!("#{}", if rx == 0 { 8 } else { rx })
                };
                format!("{}{dir}{} {count},{}", kind.stem(), size.suffix(), dreg(ry))
            }
            Op::ShiftMem => {
                let kind = ShiftKind::from_bits(opcode >> 9);
                let dir = if opcode & 0x0100 != 0 { "l" } else { "r" };
                format!("{}{dir}.w {}", kind.stem(), self.ea(opcode, Size::Word)?)
            }
            Op::Bitfield => {
                let bf = BitfieldOp::from_opcode(opcode);
                let ext = self.word()?;
                let offset = if ext & 0x0800 != 0 {
                    dreg(ext >> 6)
                } else {
                    ((ext >> 6) & 31).to_string()
                };
                let width = if ext & 0x0020 != 0 {
                    dreg(ext)
                } else {
                    match ext & 31 {
                        0 => 32,
                        w => w,
                    }
                    .to_string()
                };
                let field = format!("{}{{{offset}:{width}}}", self.ea(opcode, Size::Long)?);
                let reg = dreg(ext >> 12);
                if bf == BitfieldOp::Ins {
                    format!("{} {reg},{field}", bf.mnemonic())
                } else if bf.has_register_result() {
                    format!("{} {field},{reg}", bf.mnemonic())
                } else {
                    format!("{} {field}", bf.mnemonic())
                }
            }

            Op::Pmmu => self.pmmu(opcode)?,
            Op::Pflush040 => match (opcode >> 3) & 3 {
                0 => format!("pflushn ({})", areg(ry)),
                1 => format!("pflush ({})", areg(ry)),
                2 => "pflushan".to_string(),
                _ => "pflusha".to_string(),
            },
            Op::Ptest040 => {
                let name = if opcode & 0x0020 != 0 { "ptestr" } else { "ptestw" };
                format!("{name} ({})", areg(ry))
            }
            Op::CacheOp040 => {
                let name = if opcode & 0x0020 != 0 { "cpush" } else { "cinv" };
                let caches = ["nc", "dc", "ic", "bc"][usize::from((opcode >> 6) & 3)];
                match (opcode >> 3) & 3 {
                    1 => format!("{name}l {caches},({})", areg(ry)),
                    2 => format!("{name}p {caches},({})", areg(ry)),
                    _ => format!("{name}a {caches}"),
                }
            }
            Op::Move16 => {
                if opcode & 0xFFF8 == 0xF620 {
                    let ext = self.word()?;
                    format!("move16 ({})+,({})+", areg(ry), areg(ext >> 12))
                } else {
                    let absolute = format!("${:08x}.l", self.long()?);
                    match (opcode >> 3) & 3 {
                        0 => format!("move16 ({})+,{absolute}", areg(ry)),
                        1 => format!("move16 {absolute},({})+", areg(ry)),
                        2 => format!("move16 ({}),{absolute}", areg(ry)),
                        _ => format!("move16 {absolute},({})", areg(ry)),
                    }
                }
            }
        };
        Some(text)
    }

    /// 68851/68030 PMMU group: PMOVE, PLOAD, PFLUSH, PTEST.
    fn pmmu(&mut self, opcode: u16) -> Option<String> {
        let ext = self.word()?;
        let sel = (ext >> 10) & 7;
        let register = match ext >> 13 {
            0 => Some(if sel == 3 { "tt1" } else { "tt0" }),
            2 => match sel {
                0 => Some("tc"),
                2 => Some("srp"),
                3 => Some("crp"),
                _ => return Some(dc_w(opcode)),
            },
            3 => Some("mmusr"),
            _ => None,
        };
        if let Some(register) = register {
            let size = if register == "mmusr" { Size::Word } else { Size::Long };
            let name = if ext & 0x0100 != 0 { "pmovefd" } else { "pmove" };
            let ea = self.ea(opcode, size)?;
            return Some(if ext & 0x0200 != 0 {
                format!("{name} {register},{ea}")
            } else {
                format!("{name} {ea},{register}")
            });
        }

        let fc = pmmu_fc(ext);
        let mask = (ext >> 5) & 7;
        Some(match (ext >> 13, sel) {
            (1, 0) => {
                let name = if ext & 0x0200 != 0 { "ploadr" } else { "ploadw" };
                format!("{name} {fc},{}", self.ea(opcode, Size::Long)?)
            }
            (1, 1) => "pflusha".to_string(),
            (1, 4 | 5) => format!("pflush {fc},#{mask}"),
            (1, 6 | 7) => format!("pflush {fc},#{mask},{}", self.ea(opcode, Size::Long)?),
            (4, level) => {
                let name = if ext & 0x0200 != 0 { "ptestr" } else { "ptestw" };
                let ea = self.ea(opcode, Size::Long)?;
                if ext & 0x0100 != 0 {
                    format!("{name} {fc},{ea},#{level},{}", areg(ext >> 5))
                } else {
                    format!("{name} {fc},{ea},#{level}")
                }
            }
            _ => dc_w(opcode),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dis(model: CpuModel, words: &[u16]) -> (String, usize) {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
        disassemble(model, 0x1000, &bytes)
    }

    #[test]
    fn simple_instructions() {
        assert_eq!(dis(CpuModel::M68000, &[0x4E71]), ("nop".to_string(), 2));
        assert_eq!(dis(CpuModel::M68000, &[0x7005]), ("moveq #$5,d0".to_string(), 2));
        assert_eq!(dis(CpuModel::M68000, &[0x70FF]), ("moveq #-$1,d0".to_string(), 2));
        assert_eq!(dis(CpuModel::M68000, &[0xD041]), ("add.w d1,d0".to_string(), 2));
        assert_eq!(dis(CpuModel::M68000, &[0x2210]), ("move.l (a0),d1".to_string(), 2));
        assert_eq!(dis(CpuModel::M68000, &[0xE749]), ("lsl.w #3,d1".to_string(), 2));
    }

    #[test]
    fn extension_words_are_consumed() {
        assert_eq!(
            dis(CpuModel::M68000, &[0x0640, 0x1234]),
            ("addi.w #$1234,d0".to_string(), 4)
        );
        assert_eq!(
            dis(CpuModel::M68000, &[0x4EB9, 0x00FC, 0x0100]),
            ("jsr $00fc0100.l".to_string(), 6)
        );
        assert_eq!(
            dis(CpuModel::M68000, &[0x48E7, 0xC0C0]),
            ("movem.l d0-d1/a0-a1,-(a7)".to_string(), 4)
        );
        assert_eq!(
            dis(CpuModel::M68000, &[0x4CDF, 0x0303]),
            ("movem.l (a7)+,d0-d1/a0-a1".to_string(), 4)
        );
    }

    #[test]
    fn branches_resolve_against_pc() {
        assert_eq!(dis(CpuModel::M68000, &[0x6604]), ("bne.s $1006".to_string(), 2));
        assert_eq!(dis(CpuModel::M68000, &[0x6000, 0xFFFE]), ("bra.w $1000".to_string(), 4));
        assert_eq!(dis(CpuModel::M68000, &[0x51C8, 0xFFFC]), ("dbra d0,$ffe".to_string(), 4));
        assert_eq!(
            dis(CpuModel::M68020, &[0x61FF, 0x0000, 0x0100]),
            ("bsr.l $1102".to_string(), 6)
        );
    }

    #[test]
    fn pc_relative_and_indexed_operands() {
        assert_eq!(dis(CpuModel::M68000, &[0x303A, 0x0010]), ("move.w ($1012,pc),d0".to_string(), 4));
        assert_eq!(
            dis(CpuModel::M68000, &[0x3030, 0x1004]),
            ("move.w ($4,a0,d1.w),d0".to_string(), 4)
        );
        assert_eq!(
            dis(CpuModel::M68020, &[0x3030, 0x1404]),
            ("move.w ($4,a0,d1.w*4),d0".to_string(), 4)
        );
        // ([$10,a0],d1.l,$20): memory indirect post-indexed.
        assert_eq!(
            dis(CpuModel::M68020, &[0x3030, 0x1926, 0x0010, 0x0020]),
            ("move.w ([$10,a0],d1.l,$20),d0".to_string(), 8)
        );
    }

    #[test]
    fn later_models_decode_their_additions() {
        assert_eq!(dis(CpuModel::M68000, &[0x4E7A, 0x0801]), ("dc.w $4e7a".to_string(), 2));
        assert_eq!(dis(CpuModel::M68010, &[0x4E7A, 0x0801]), ("movec vbr,d0".to_string(), 4));
        assert_eq!(
            dis(CpuModel::M68020, &[0xE9C0, 0x1108]),
            ("bfextu d0{4:8},d1".to_string(), 4)
        );
        assert_eq!(dis(CpuModel::M68040, &[0xF518]), ("pflusha".to_string(), 2));
        assert_eq!(dis(CpuModel::M68030, &[0xF010, 0x4000]), ("pmove (a0),tc".to_string(), 4));
    }

    #[test]
    fn truncated_input() {
        assert_eq!(dis(CpuModel::M68000, &[0x0640]), ("dc.w $0640".to_string(), 2));
        assert_eq!(disassemble(CpuModel::M68000, 0, &[0x4E]), ("dc.b $4e".to_string(), 1));
        assert_eq!(disassemble(CpuModel::M68000, 0, &[]), (String::new(), 0));
    }
}
