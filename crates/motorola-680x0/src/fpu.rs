//! Floating-point coprocessor: the 68881 on FPU-equipped 68020/68030
//! boards and the 68040's on-chip unit.
//!
//! Line-F opcodes with coprocessor id 1 land here when the CPU has an FPU
//! fitted. FP0-FP7 hold IEEE doubles. Extended and packed decimal memory
//! operands are converted on the way in and out, so arithmetic carries
//! double precision. FPCR selects single or double rounding precision and
//! the rounding mode used for integer conversions.
//!
//! The 68040 implements only the basic arithmetic in silicon. Everything
//! else (transcendentals, FINT, FMOD, FMOVECR and friends) takes the line-F
//! vector for the software package to emulate.
//!
//! Exception status is recorded in FPSR, but the FPCR enable byte never
//! traps: the floating-point exception vectors are not taken.

#![allow(clippy::cast_precision_loss, clippy::float_cmp)]

use crate::addressing::AddrMode;
use crate::alu::Size;
use crate::bus::{FunctionCode, M68kBus};
use crate::cpu::Cpu680x0;
use crate::ea::Operand;
use crate::fault::{ExceptionKind, Fault, raise};
use crate::model::IsaLevel;

/// FPSR bit layout.
pub mod fpsr {
    pub const N: u32 = 0x0800_0000;
    pub const Z: u32 = 0x0400_0000;
    pub const I: u32 = 0x0200_0000;
    pub const NAN: u32 = 0x0100_0000;
    pub const CC_MASK: u32 = N | Z | I | NAN;
    pub const QUOTIENT_MASK: u32 = 0x00FF_0000;

    // Exception status byte.
    pub const BSUN: u32 = 0x8000;
    pub const SNAN: u32 = 0x4000;
    pub const OPERR: u32 = 0x2000;
    pub const OVFL: u32 = 0x1000;
    pub const UNFL: u32 = 0x0800;
    pub const DZ: u32 = 0x0400;
    pub const INEX2: u32 = 0x0200;
    pub const INEX1: u32 = 0x0100;
    pub const EXC_MASK: u32 = 0xFF00;

    // Accrued exception byte.
    pub const AIOP: u32 = 0x80;
    pub const AOVFL: u32 = 0x40;
    pub const AUNFL: u32 = 0x20;
    pub const ADZ: u32 = 0x10;
    pub const AINEX: u32 = 0x08;

    /// Bits software can write.
    pub const WRITABLE: u32 = 0x0FFF_FFF8;
}

/// Bits of FPCR software can write.
const FPCR_WRITABLE: u32 = 0x0000_FFF0;

/// FSAVE frame of an FPU that has not executed anything since reset.
const NULL_FRAME: u32 = 0x0000_0000;
/// 68881 idle frame: version $1F, 24 bytes of internal state.
const IDLE_FRAME_68881: [u32; 7] = [0x1F18_0000, 0, 0, 0, 0, 0, 0x7000_0000];
/// 68040 idle frame: version $41, header only.
const IDLE_FRAME_68040: [u32; 1] = [0x4100_0000];

/// Floating-point register file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fpu {
    /// Data registers FP0-FP7.
    pub fp: [f64; 8],
    /// Control register: exception enables, rounding precision and mode.
    pub fpcr: u32,
    /// Status register: condition codes, quotient, exception bytes.
    pub fpsr: u32,
    /// Address of the last arithmetic instruction.
    pub fpiar: u32,
    /// Nothing executed since reset or a null FRESTORE.
    pub(crate) null: bool,
}

impl Default for Fpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Rounding precision applied to a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rounding {
    /// As selected in FPCR.
    Control,
    Single,
    Double,
}

/// Operand format field of a general instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    Long,
    Single,
    Extended,
    Packed,
    Word,
    Double,
    Byte,
}

impl Format {
    const fn from_field(field: u16) -> Option<Self> {
        Some(match field & 7 {
            0 => Self::Long,
            1 => Self::Single,
            2 => Self::Extended,
            3 => Self::Packed,
            4 => Self::Word,
            5 => Self::Double,
            6 => Self::Byte,
            _ => return None,
        })
    }

    /// Integer-unit size for formats that fit a data register.
    const fn register_size(self) -> Option<Size> {
        match self {
            Self::Byte => Some(Size::Byte),
            Self::Word => Some(Size::Word),
            Self::Long | Self::Single => Some(Size::Long),
            _ => None,
        }
    }

    const fn longs(self) -> usize {
        match self {
            Self::Double => 2,
            _ => 3,
        }
    }
}

/// Arithmetic operation selected by the opmode field.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FpOp {
    Move,
    Int,
    IntRz,
    Sqrt,
    Abs,
    Neg,
    GetExp,
    GetMan,
    Div,
    Mod,
    Add,
    Mul,
    SglDiv,
    Rem,
    Scale,
    SglMul,
    Sub,
    /// FSINCOS: the cosine goes to the register in the low three bits.
    SinCos(u8),
    Cmp,
    Tst,
    /// One-operand library function.
    Monadic(fn(f64) -> f64),
}

impl FpOp {
    /// Decode an opmode. The 68040 adds single and double rounding
    /// variants and drops everything it leaves to software.
    pub(crate) fn decode(opmode: u16, m68040: bool) -> Option<(Self, Rounding)> {
        use Rounding::{Double, Single};
        if m68040 {
            let rounded = match opmode {
                0x40 => Some((Self::Move, Single)),
                0x44 => Some((Self::Move, Double)),
                0x41 => Some((Self::Sqrt, Single)),
                0x45 => Some((Self::Sqrt, Double)),
                0x58 => Some((Self::Abs, Single)),
                0x5C => Some((Self::Abs, Double)),
                0x5A => Some((Self::Neg, Single)),
                0x5E => Some((Self::Neg, Double)),
                0x60 => Some((Self::Div, Single)),
                0x64 => Some((Self::Div, Double)),
                0x62 => Some((Self::Add, Single)),
                0x66 => Some((Self::Add, Double)),
                0x63 => Some((Self::Mul, Single)),
                0x67 => Some((Self::Mul, Double)),
                0x68 => Some((Self::Sub, Single)),
                0x6C => Some((Self::Sub, Double)),
                _ => None,
            };
            if rounded.is_some() {
                return rounded;
            }
        }
        let op = Self::from_opmode(opmode)?;
        if m68040 && !op.in_68040_silicon() {
            return None;
        }
        Some((op, Rounding::Control))
    }

    fn from_opmode(opmode: u16) -> Option<Self> {
        Some(match opmode {
            0x00 => Self::Move,
            0x01 => Self::Int,
            0x02 => Self::Monadic(f64::sinh),
            0x03 => Self::IntRz,
            0x04 => Self::Sqrt,
            0x06 => Self::Monadic(f64::ln_1p),
            0x08 => Self::Monadic(f64::exp_m1),
            0x09 => Self::Monadic(f64::tanh),
            0x0A => Self::Monadic(f64::atan),
            0x0C => Self::Monadic(f64::asin),
            0x0D => Self::Monadic(f64::atanh),
            0x0E => Self::Monadic(f64::sin),
            0x0F => Self::Monadic(f64::tan),
            0x10 => Self::Monadic(f64::exp),
            0x11 => Self::Monadic(f64::exp2),
            0x12 => Self::Monadic(|x| 10f64.powf(x)),
            0x14 => Self::Monadic(f64::ln),
            0x15 => Self::Monadic(f64::log10),
            0x16 => Self::Monadic(f64::log2),
            0x18 => Self::Abs,
            0x19 => Self::Monadic(f64::cosh),
            0x1A => Self::Neg,
            0x1C => Self::Monadic(f64::acos),
            0x1D => Self::Monadic(f64::cos),
            0x1E => Self::GetExp,
            0x1F => Self::GetMan,
            0x20 => Self::Div,
            0x21 => Self::Mod,
            0x22 => Self::Add,
            0x23 => Self::Mul,
            0x24 => Self::SglDiv,
            0x25 => Self::Rem,
            0x26 => Self::Scale,
            0x27 => Self::SglMul,
            0x28 => Self::Sub,
            0x30..=0x37 => Self::SinCos((opmode & 7) as u8),
            0x38 => Self::Cmp,
            0x3A => Self::Tst,
            _ => return None,
        })
    }

    const fn in_68040_silicon(self) -> bool {
        matches!(
            self,
            Self::Move
                | Self::Sqrt
                | Self::Abs
                | Self::Neg
                | Self::Div
                | Self::Add
                | Self::Mul
                | Self::SglDiv
                | Self::SglMul
                | Self::Sub
                | Self::Cmp
                | Self::Tst
        )
    }

    /// Takes the destination register as a second operand.
    const fn is_dyadic(self) -> bool {
        matches!(
            self,
            Self::Div
                | Self::Mod
                | Self::Add
                | Self::Mul
                | Self::SglDiv
                | Self::Rem
                | Self::Scale
                | Self::SglMul
                | Self::Sub
                | Self::Cmp
        )
    }

    /// 68881 execution time, register to register.
    const fn cycles(self) -> u32 {
        match self {
            Self::Move | Self::Int | Self::IntRz => 4,
            Self::Abs | Self::Neg => 3,
            Self::GetExp | Self::GetMan => 6,
            Self::Cmp | Self::Tst => 7,
            Self::Add | Self::Sub => 9,
            Self::Mul | Self::SglMul => 11,
            Self::Div | Self::SglDiv | Self::Mod | Self::Rem => 43,
            Self::Scale => 46,
            Self::Monadic(_) | Self::SinCos(_) => 75,
            Self::Sqrt => 109,
        }
    }
}

/// Multiply by a power of two without overflowing the intermediate.
fn scale(mut value: f64, mut exponent: i32) -> f64 {
    while exponent > 1000 {
        value *= 2f64.powi(1000);
        exponent -= 1000;
    }
    while exponent < -1000 {
        value *= 2f64.powi(-1000);
        exponent += 1000;
    }
    value * 2f64.powi(exponent)
}

/// Split a double into the extended format's sign/exponent word and its
/// 64-bit mantissa with the explicit integer bit.
#[must_use]
pub fn to_extended(value: f64) -> (u16, u64) {
    let bits = value.to_bits();
    let sign = if bits >> 63 == 0 { 0 } else { 0x8000 };
    let exponent = ((bits >> 52) & 0x7FF) as u16;
    let fraction = bits & 0x000F_FFFF_FFFF_FFFF;
    match exponent {
        0 if fraction == 0 => (sign, 0),
        0 => {
            let shift = fraction.leading_zeros();
            (sign | (15_372 - shift) as u16, fraction << shift)
        }
        0x7FF if fraction == 0 => (sign | 0x7FFF, 0),
        0x7FF => (sign | 0x7FFF, (1 << 63) | (fraction << 11)),
        _ => (sign | (exponent + 16_383 - 1_023), (1 << 63) | (fraction << 11)),
    }
}

/// Value of an extended precision image, rounded to a double.
#[must_use]
pub fn from_extended(sign_exponent: u16, mantissa: u64) -> f64 {
    let exponent = i32::from(sign_exponent & 0x7FFF);
    let magnitude = if exponent == 0x7FFF {
        if mantissa << 1 == 0 { f64::INFINITY } else { f64::NAN }
    } else if mantissa == 0 {
        0.0
    } else {
        scale(mantissa as f64, exponent.max(1) - 16_383 - 63)
    };
    if sign_exponent & 0x8000 == 0 { magnitude } else { -magnitude }
}

fn bcd_digit(nibble: u32) -> char {
    char::from_digit(nibble & 0xF, 16).unwrap_or('0')
}

/// Value of a packed decimal image: sign bits, three exponent digits, one
/// integer digit and sixteen fraction digits.
#[must_use]
pub fn from_packed(longs: [u32; 3]) -> f64 {
    let [head, high, low] = longs;
    let negative = head & 0x8000_0000 != 0;
    if (head >> 16) & 0xFFF == 0xFFF {
        let magnitude = if high == 0 && low == 0 { f64::INFINITY } else { f64::NAN };
        return if negative { -magnitude } else { magnitude };
    }
    let mut text = String::with_capacity(28);
    if negative {
        text.push('-');
    }
    text.push(bcd_digit(head));
    text.push('.');
    for long in [high, low] {
        for shift in (0..8).rev() {
            text.push(bcd_digit(long >> (shift * 4)));
        }
    }
    text.push('e');
    if head & 0x4000_0000 != 0 {
        text.push('-');
    }
    for shift in [24, 20, 16] {
        text.push(bcd_digit(head >> shift));
    }
    text.parse().unwrap_or(f64::NAN)
}

/// Packed decimal image of `value` with `k` significant digits, or for
/// `k <= 0`, `-k` digits after the decimal point.
#[must_use]
pub fn to_packed(value: f64, k: i32) -> [u32; 3] {
    let sign = if value.is_sign_negative() { 0x8000_0000 } else { 0 };
    if value.is_infinite() {
        return [sign | 0x7FFF_0000, 0, 0];
    }
    if value.is_nan() {
        return [sign | 0x7FFF_0000, 0xFFFF_FFFF, 0xFFFF_FFFF];
    }
    if value == 0.0 {
        return [sign, 0, 0];
    }
    let magnitude = value.abs();
    let leading = magnitude.log10().floor() as i32;
    let digits = if k > 0 { k.min(17) } else { (leading + 1 - k).clamp(1, 17) };
    let text = format!("{:.*e}", (digits - 1) as usize, magnitude);
    let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    let mut nibbles = mantissa.bytes().filter(u8::is_ascii_digit).map(|b| u32::from(b - b'0'));
    let integer = nibbles.next().unwrap_or(0);
    let mut fraction = 0u64;
    for _ in 0..16 {
        fraction = (fraction << 4) | u64::from(nibbles.next().unwrap_or(0));
    }
    let e = exponent.unsigned_abs();
    let exponent_digits = (((e / 100) % 10) << 8) | (((e / 10) % 10) << 4) | (e % 10);
    let exponent_sign = if exponent < 0 { 0x4000_0000 } else { 0 };
    [
        sign | exponent_sign | (exponent_digits << 16) | integer,
        (fraction >> 32) as u32,
        fraction as u32,
    ]
}

/// FMOVECR constant ROM. Offsets the ROM leaves undefined read as zero.
fn constant_rom(offset: u16) -> f64 {
    match offset {
        0x00 => std::f64::consts::PI,
        0x0B => std::f64::consts::LOG10_2,
        0x0C => std::f64::consts::E,
        0x0D => std::f64::consts::LOG2_E,
        0x0E => std::f64::consts::LOG10_E,
        0x30 => std::f64::consts::LN_2,
        0x31 => std::f64::consts::LN_10,
        0x32..=0x3F => 10f64.powi(match offset - 0x32 {
            0 => 0,
            n => 1 << (n - 1),
        }),
        _ => 0.0,
    }
}

impl Fpu {
    /// Register file as left by reset: NaNs everywhere, status clear.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fp: [f64::NAN; 8],
            fpcr: 0,
            fpsr: 0,
            fpiar: 0,
            null: true,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// True until the first FPU instruction after reset.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.null
    }

    pub(crate) fn set_fpcr(&mut self, value: u32) {
        self.fpcr = value & FPCR_WRITABLE;
    }

    pub(crate) fn set_fpsr(&mut self, value: u32) {
        self.fpsr = value & fpsr::WRITABLE;
    }

    fn set_condition(&mut self, value: f64) {
        let mut cc = 0;
        if value.is_sign_negative() {
            cc |= fpsr::N;
        }
        if value == 0.0 {
            cc |= fpsr::Z;
        } else if value.is_infinite() {
            cc |= fpsr::I;
        } else if value.is_nan() {
            cc |= fpsr::NAN;
        }
        self.fpsr = (self.fpsr & !fpsr::CC_MASK) | cc;
    }

    /// Record exception status bits and fold them into the accrued byte.
    fn signal(&mut self, exc: u32) {
        self.fpsr |= exc;
        if exc & (fpsr::BSUN | fpsr::SNAN | fpsr::OPERR) != 0 {
            self.fpsr |= fpsr::AIOP;
        }
        if exc & fpsr::OVFL != 0 {
            self.fpsr |= fpsr::AOVFL | fpsr::AINEX;
        }
        if exc & fpsr::UNFL != 0 && exc & fpsr::INEX2 != 0 {
            self.fpsr |= fpsr::AUNFL;
        }
        if exc & fpsr::DZ != 0 {
            self.fpsr |= fpsr::ADZ;
        }
        if exc & (fpsr::INEX1 | fpsr::INEX2) != 0 {
            self.fpsr |= fpsr::AINEX;
        }
    }

    /// Round to the precision FPCR or the opcode asks for.
    fn round(&self, value: f64, rounding: Rounding) -> f64 {
        let single = match rounding {
            Rounding::Single => true,
            Rounding::Double => false,
            Rounding::Control => (self.fpcr >> 6) & 3 == 1,
        };
        if single { f64::from(value as f32) } else { value }
    }

    /// Round to an integral value in the FPCR rounding mode.
    fn round_integral(&self, value: f64) -> f64 {
        match (self.fpcr >> 4) & 3 {
            0 => value.round_ties_even(),
            1 => value.trunc(),
            2 => value.floor(),
            _ => value.ceil(),
        }
    }

    /// Convert for an integer destination. Out of range values and NaNs
    /// are operand errors and saturate.
    fn to_integer(&mut self, value: f64, min: i32, max: i32) -> i32 {
        let rounded = self.round_integral(value);
        if value.is_nan() || rounded > f64::from(max) {
            self.signal(fpsr::OPERR);
            max
        } else if rounded < f64::from(min) {
            self.signal(fpsr::OPERR);
            min
        } else {
            if rounded != value {
                self.signal(fpsr::INEX2);
            }
            rounded as i32
        }
    }

    /// Evaluate a conditional predicate. The signalling half of the table
    /// (bit 4 set) flags BSUN when the operands were unordered.
    pub(crate) fn test(&mut self, predicate: u16) -> bool {
        let n = self.fpsr & fpsr::N != 0;
        let z = self.fpsr & fpsr::Z != 0;
        let nan = self.fpsr & fpsr::NAN != 0;
        if predicate & 0x10 != 0 && nan {
            self.signal(fpsr::BSUN);
        }
        match predicate & 0xF {
            0x0 => false,
            0x1 => z,
            0x2 => !(nan || z || n),
            0x3 => z || !(nan || n),
            0x4 => n && !(nan || z),
            0x5 => z || (n && !nan),
            0x6 => !nan && !z,
            0x7 => !nan,
            0x8 => nan,
            0x9 => nan || z,
            0xA => nan || !(n || z),
            0xB => nan || z || !n,
            0xC => nan || (n && !z),
            0xD => nan || z || n,
            0xE => !z,
            _ => true,
        }
    }

    fn compare(&mut self, dst: f64, src: f64) {
        let cc = if dst.is_nan() || src.is_nan() {
            fpsr::NAN
        } else if dst == src {
            fpsr::Z | if dst.is_sign_negative() { fpsr::N } else { 0 }
        } else if dst < src {
            fpsr::N
        } else {
            0
        };
        self.fpsr = (self.fpsr & !fpsr::CC_MASK) | cc;
    }

    /// FMOD (truncated quotient) or FREM (nearest quotient). The low
    /// seven bits of the quotient and its sign go to the quotient byte.
    fn remainder(&mut self, dst: f64, src: f64, nearest: bool) -> f64 {
        let ratio = dst / src;
        let quotient = if nearest { ratio.round_ties_even() } else { ratio.trunc() };
        let result = if nearest { dst - quotient * src } else { dst % src };
        if quotient.is_finite() {
            let sign = if ratio.is_sign_negative() { 0x80 } else { 0 };
            let low = (quotient.abs() % 128.0) as u32;
            self.fpsr = (self.fpsr & !fpsr::QUOTIENT_MASK) | ((sign | low) << 16);
        }
        result
    }

    /// Run `op` with `src` and FP`dst`, store the result and set the
    /// condition codes.
    pub(crate) fn execute(&mut self, op: FpOp, rounding: Rounding, src: f64, dst: usize) {
        self.fpsr &= !fpsr::EXC_MASK;
        let current = self.fp[dst];
        let result = match op {
            FpOp::Cmp => {
                self.compare(current, src);
                return;
            }
            FpOp::Tst => {
                self.set_condition(src);
                return;
            }
            FpOp::Move => src,
            FpOp::Int => self.round_integral(src),
            FpOp::IntRz => src.trunc(),
            FpOp::Sqrt => src.sqrt(),
            FpOp::Abs => src.abs(),
            FpOp::Neg => -src,
            FpOp::GetExp | FpOp::GetMan if src == 0.0 => src,
            FpOp::GetExp | FpOp::GetMan if !src.is_finite() => f64::NAN,
            FpOp::GetExp => {
                let (sign_exponent, _) = to_extended(src);
                f64::from(i32::from(sign_exponent & 0x7FFF) - 16_383)
            }
            FpOp::GetMan => {
                let (sign_exponent, mantissa) = to_extended(src);
                from_extended((sign_exponent & 0x8000) | 0x3FFF, mantissa)
            }
            FpOp::Div => current / src,
            FpOp::SglDiv => f64::from(current as f32) / f64::from(src as f32),
            FpOp::Mod => self.remainder(current, src, false),
            FpOp::Rem => self.remainder(current, src, true),
            FpOp::Add => current + src,
            FpOp::Sub => current - src,
            FpOp::Mul => current * src,
            FpOp::SglMul => f64::from(current as f32) * f64::from(src as f32),
            FpOp::Scale if src.is_nan() || src.is_infinite() => f64::NAN,
            FpOp::Scale => scale(current, src.trunc().clamp(-20_000.0, 20_000.0) as i32),
            FpOp::SinCos(cos) => {
                let (sin, cosine) = src.sin_cos();
                self.fp[usize::from(cos)] = self.round(cosine, rounding);
                sin
            }
            FpOp::Monadic(function) => function(src),
        };

        let dyadic = op.is_dyadic();
        let operands_nan = src.is_nan() || (dyadic && current.is_nan());
        let operands_finite = src.is_finite() && (!dyadic || current.is_finite());
        let result = if result.is_nan() && !operands_nan {
            self.signal(fpsr::OPERR);
            f64::NAN
        } else {
            if result.is_infinite() && operands_finite {
                self.signal(if src == 0.0 { fpsr::DZ } else { fpsr::OVFL });
            }
            result
        };
        let single = matches!(op, FpOp::SglDiv | FpOp::SglMul);
        let result = if single {
            f64::from(result as f32)
        } else {
            self.round(result, rounding)
        };
        self.fp[dst] = result;
        self.set_condition(result);
    }
}

impl Cpu680x0 {
    /// Line-F dispatch: coprocessor id 1 is the FPU when one is fitted.
    pub(crate) fn exec_line_f<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        if !self.caps.fpu || (opcode >> 9) & 7 != 1 {
            return raise(ExceptionKind::LineF);
        }
        match (opcode >> 6) & 7 {
            0 => self.exec_fpu_general(bus, opcode),
            1 => self.exec_fpu_conditional(bus, opcode),
            2 | 3 => self.exec_fbcc(bus, opcode),
            4 => self.exec_fsave(bus, opcode),
            5 => self.exec_frestore(bus, opcode),
            _ => raise(ExceptionKind::LineF),
        }
    }

    fn has_68040_fpu(&self) -> bool {
        self.caps.isa == IsaLevel::M68040
    }

    // ================================================================
    // Operand access
    // ================================================================

    /// Address of a multi-long operand. `None` for an immediate, which
    /// is read from the instruction stream.
    fn fpu_address<B: M68kBus>(
        &mut self,
        bus: &mut B,
        mode: AddrMode,
        bytes: u32,
    ) -> Fault<Option<(u32, FunctionCode)>> {
        let data = self.data_fc();
        match mode {
            AddrMode::DataReg(_) | AddrMode::AddrReg(_) => raise(ExceptionKind::LineF),
            AddrMode::Immediate => Ok(None),
            AddrMode::AddrIndPostInc(r) => {
                let reg = usize::from(r);
                let address = self.regs.a(reg);
                self.regs.set_a(reg, address.wrapping_add(bytes));
                Ok(Some((address, data)))
            }
            AddrMode::AddrIndPreDec(r) => {
                let reg = usize::from(r);
                let address = self.regs.a(reg).wrapping_sub(bytes);
                self.regs.set_a(reg, address);
                Ok(Some((address, data)))
            }
            _ => match self.ea_operand(bus, mode, Size::Long)? {
                Operand::Memory { address, fc } => Ok(Some((address, fc))),
                _ => raise(ExceptionKind::LineF),
            },
        }
    }

    fn read_fpu_longs<B: M68kBus>(&mut self, bus: &mut B, mode: AddrMode, longs: &mut [u32]) -> Fault<()> {
        let bytes = 4 * longs.len() as u32;
        match self.fpu_address(bus, mode, bytes)? {
            None => {
                for long in longs {
                    *long = self.fetch_long(bus)?;
                }
            }
            Some((address, fc)) => {
                for (offset, long) in (0..).step_by(4).zip(longs) {
                    *long = self.read_fc(bus, address.wrapping_add(offset), Size::Long, fc)?;
                }
            }
        }
        Ok(())
    }

    fn write_fpu_longs<B: M68kBus>(&mut self, bus: &mut B, mode: AddrMode, longs: &[u32]) -> Fault<()> {
        if !mode.is_alterable() {
            return raise(ExceptionKind::LineF);
        }
        let bytes = 4 * longs.len() as u32;
        let Some((address, fc)) = self.fpu_address(bus, mode, bytes)? else {
            return raise(ExceptionKind::LineF);
        };
        for (offset, &long) in (0..).step_by(4).zip(longs) {
            self.write_fc(bus, address.wrapping_add(offset), Size::Long, long, fc)?;
        }
        Ok(())
    }

    fn read_fpu_operand<B: M68kBus>(&mut self, bus: &mut B, mode: AddrMode, format: Format) -> Fault<f64> {
        if matches!(mode, AddrMode::AddrReg(_)) {
            return raise(ExceptionKind::LineF);
        }
        if let Some(size) = format.register_size() {
            let operand = self.ea_operand(bus, mode, size)?;
            let raw = self.read_operand(bus, operand, size)?;
            return Ok(match format {
                Format::Byte => f64::from(raw as i8),
                Format::Word => f64::from(raw as i16),
                Format::Long => f64::from(raw as i32),
                _ => f64::from(f32::from_bits(raw)),
            });
        }
        let mut longs = [0u32; 3];
        let count = format.longs();
        self.read_fpu_longs(bus, mode, &mut longs[..count])?;
        let [a, b, c] = longs;
        Ok(match format {
            Format::Double => f64::from_bits((u64::from(a) << 32) | u64::from(b)),
            Format::Extended => from_extended((a >> 16) as u16, (u64::from(b) << 32) | u64::from(c)),
            _ => from_packed(longs),
        })
    }

    // ================================================================
    // General instructions
    // ================================================================
    //
    // Encoding: 1111 001 000 MMMRRR + command word
    //   command bits 15-13: 000 FPm,FPn  010 <ea>,FPn  011 FPn,<ea>
    //                       10x FMOVE(M) control  11x FMOVEM data

    fn exec_fpu_general<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let command = self.fetch_word(bus)?;
        match command >> 13 {
            0 | 2 => self.exec_fpu_arith(bus, opcode, command),
            3 => self.exec_fmove_out(bus, opcode, command),
            4 | 5 => self.exec_fmove_control(bus, opcode, command),
            6 | 7 => self.exec_fmovem(bus, opcode, command),
            _ => raise(ExceptionKind::LineF),
        }
    }

    fn exec_fpu_arith<B: M68kBus>(&mut self, bus: &mut B, opcode: u16, command: u16) -> Fault<()> {
        let dst = usize::from((command >> 7) & 7);
        let source_field = (command >> 10) & 7;
        let m68040 = self.has_68040_fpu();

        if command & 0xFC00 == 0x5C00 {
            // FMOVECR #offset,FPn
            if m68040 {
                return raise(ExceptionKind::LineF);
            }
            self.fpu.null = false;
            self.fpu.fpiar = self.ppc;
            self.fpu.execute(FpOp::Move, Rounding::Control, constant_rom(command & 0x7F), dst);
            self.cycles += FpOp::Move.cycles();
            return Ok(());
        }

        let Some((op, rounding)) = FpOp::decode(command & 0x7F, m68040) else {
            return raise(ExceptionKind::LineF);
        };
        let src = if command & 0x4000 == 0 {
            self.fpu.fp[usize::from(source_field)]
        } else {
            let Some(format) = Format::from_field(source_field) else {
                return raise(ExceptionKind::LineF);
            };
            let mode = Self::ea_mode(opcode)?;
            self.read_fpu_operand(bus, mode, format)?
        };
        self.fpu.null = false;
        self.fpu.fpiar = self.ppc;
        self.fpu.execute(op, rounding, src, dst);
        self.cycles += op.cycles();
        Ok(())
    }

    /// FMOVE FPn,<ea>. Condition codes are left alone.
    fn exec_fmove_out<B: M68kBus>(&mut self, bus: &mut B, opcode: u16, command: u16) -> Fault<()> {
        let field = (command >> 10) & 7;
        // Field 7 is packed with the k-factor in a data register.
        let format = Format::from_field(field).unwrap_or(Format::Packed);
        let mode = Self::ea_mode(opcode)?;
        if !mode.is_data_alterable() {
            return raise(ExceptionKind::LineF);
        }
        let value = self.fpu.fp[usize::from((command >> 7) & 7)];
        self.fpu.null = false;
        self.fpu.fpiar = self.ppc;
        self.fpu.fpsr &= !fpsr::EXC_MASK;
        self.cycles += 12;

        if let Some(size) = format.register_size() {
            let raw = match format {
                Format::Byte => self.fpu.to_integer(value, i32::from(i8::MIN), i32::from(i8::MAX)) as u32,
                Format::Word => self.fpu.to_integer(value, i32::from(i16::MIN), i32::from(i16::MAX)) as u32,
                Format::Long => self.fpu.to_integer(value, i32::MIN, i32::MAX) as u32,
                _ => {
                    let single = value as f32;
                    if single.is_infinite() && value.is_finite() {
                        self.fpu.signal(fpsr::OVFL);
                    }
                    single.to_bits()
                }
            };
            let operand = self.ea_operand(bus, mode, size)?;
            return self.write_operand(bus, operand, size, raw);
        }

        let longs = match format {
            Format::Double => {
                let bits = value.to_bits();
                [(bits >> 32) as u32, bits as u32, 0]
            }
            Format::Extended => {
                let (sign_exponent, mantissa) = to_extended(value);
                [u32::from(sign_exponent) << 16, (mantissa >> 32) as u32, mantissa as u32]
            }
            _ => {
                // Seven-bit signed k-factor, static or from Dn in bits 6-4.
                let raw = if field == 7 {
                    self.regs.d[usize::from((command >> 4) & 7)] as u8
                } else {
                    command as u8
                };
                let k = ((raw << 1) as i8) >> 1;
                if k > 17 {
                    self.fpu.signal(fpsr::OPERR);
                }
                to_packed(value, i32::from(k))
            }
        };
        self.write_fpu_longs(bus, mode, &longs[..format.longs()])
    }

    /// FMOVE(M) to or from FPCR, FPSR and FPIAR. Registers transfer in
    /// that order, lowest address first.
    fn exec_fmove_control<B: M68kBus>(&mut self, bus: &mut B, opcode: u16, command: u16) -> Fault<()> {
        const ORDER: [u16; 3] = [4, 2, 1];
        let to_memory = command & 0x2000 != 0;
        let select = (command >> 10) & 7;
        if select == 0 {
            return raise(ExceptionKind::LineF);
        }
        let count = select.count_ones() as usize;
        let mode = Self::ea_mode(opcode)?;
        self.cycles += 10;

        let mut longs = [0u32; 3];
        match mode {
            AddrMode::DataReg(r) if count == 1 => {
                let reg = usize::from(r);
                if to_memory {
                    self.regs.d[reg] = self.fpu_control(select);
                } else {
                    self.set_fpu_control(select, self.regs.d[reg]);
                }
            }
            AddrMode::AddrReg(r) if select == 1 => {
                let reg = usize::from(r);
                if to_memory {
                    self.regs.set_a(reg, self.fpu.fpiar);
                } else {
                    self.fpu.fpiar = self.regs.a(reg);
                }
            }
            AddrMode::DataReg(_) | AddrMode::AddrReg(_) => return raise(ExceptionKind::LineF),
            _ if to_memory => {
                let selected = ORDER.iter().filter(|&&bit| select & bit != 0);
                for (slot, &bit) in longs.iter_mut().zip(selected) {
                    *slot = self.fpu_control(bit);
                }
                self.write_fpu_longs(bus, mode, &longs[..count])?;
            }
            _ => {
                self.read_fpu_longs(bus, mode, &mut longs[..count])?;
                let selected = ORDER.iter().filter(|&&bit| select & bit != 0);
                for (&value, &bit) in longs.iter().zip(selected) {
                    self.set_fpu_control(bit, value);
                }
            }
        }
        Ok(())
    }

    fn fpu_control(&self, select: u16) -> u32 {
        match select {
            4 => self.fpu.fpcr,
            2 => self.fpu.fpsr,
            _ => self.fpu.fpiar,
        }
    }

    fn set_fpu_control(&mut self, select: u16, value: u32) {
        match select {
            4 => self.fpu.set_fpcr(value),
            2 => self.fpu.set_fpsr(value),
            _ => self.fpu.fpiar = value,
        }
    }

    /// FMOVEM of data registers, twelve bytes each, FP0 at the lowest
    /// address. The list is FP0 in bit 7 for control and (An)+ modes and
    /// FP0 in bit 0 for -(An).
    fn exec_fmovem<B: M68kBus>(&mut self, bus: &mut B, opcode: u16, command: u16) -> Fault<()> {
        let to_memory = command & 0x2000 != 0;
        let predecrement = command & 0x1000 == 0;
        let list = if command & 0x0800 == 0 {
            command as u8
        } else {
            self.regs.d[usize::from((command >> 4) & 7)] as u8
        };
        let mode = Self::ea_mode(opcode)?;
        let valid = match mode {
            AddrMode::AddrIndPreDec(_) => predecrement && to_memory,
            AddrMode::AddrIndPostInc(_) => !predecrement && !to_memory,
            _ => !predecrement && mode.is_control() && (!to_memory || mode.is_alterable()),
        };
        if !valid {
            return raise(ExceptionKind::LineF);
        }
        let selected = |reg: usize| {
            if predecrement {
                list & (1 << reg) != 0
            } else {
                list & (0x80 >> reg) != 0
            }
        };
        let count = list.count_ones();
        let Some((address, fc)) = self.fpu_address(bus, mode, 12 * count)? else {
            return raise(ExceptionKind::LineF);
        };
        self.cycles += 4 + 2 * count;

        let mut address = address;
        for reg in (0..8).filter(|&reg| selected(reg)) {
            if to_memory {
                let (sign_exponent, mantissa) = to_extended(self.fpu.fp[reg]);
                self.write_fc(bus, address, Size::Long, u32::from(sign_exponent) << 16, fc)?;
                self.write_fc(bus, address.wrapping_add(4), Size::Long, (mantissa >> 32) as u32, fc)?;
                self.write_fc(bus, address.wrapping_add(8), Size::Long, mantissa as u32, fc)?;
            } else {
                let head = self.read_fc(bus, address, Size::Long, fc)?;
                let high = self.read_fc(bus, address.wrapping_add(4), Size::Long, fc)?;
                let low = self.read_fc(bus, address.wrapping_add(8), Size::Long, fc)?;
                self.fpu.fp[reg] = from_extended((head >> 16) as u16, (u64::from(high) << 32) | u64::from(low));
            }
            address = address.wrapping_add(12);
        }
        self.fpu.null = false;
        Ok(())
    }

    // ================================================================
    // Conditionals
    // ================================================================

    /// Predicate word of FScc, FDBcc and FTRAPcc.
    fn fpu_predicate<B: M68kBus>(&mut self, bus: &mut B) -> Fault<bool> {
        let predicate = self.fetch_word(bus)?;
        if predicate & 0xFFC0 != 0 || predicate & 0x3F > 0x1F {
            return raise(ExceptionKind::LineF);
        }
        Ok(self.fpu.test(predicate))
    }

    /// FScc, FDBcc and FTRAPcc share type 001.
    fn exec_fpu_conditional<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let mode = (opcode >> 3) & 7;
        let reg = opcode & 7;
        self.cycles += 7;
        match (mode, reg) {
            (1, _) => {
                let condition = self.fpu_predicate(bus)?;
                let base = self.regs.pc;
                let disp = self.fetch_word(bus)? as i16 as u32;
                if condition {
                    return Ok(());
                }
                let reg = usize::from(reg);
                let counter = (self.regs.d[reg] as u16).wrapping_sub(1);
                self.write_data_reg(reg, Size::Word, u32::from(counter));
                if counter != 0xFFFF {
                    self.regs.pc = base.wrapping_add(disp);
                    self.flow_changed = true;
                }
                Ok(())
            }
            (7, 2..=4) => {
                let condition = self.fpu_predicate(bus)?;
                match reg {
                    2 => {
                        self.fetch_word(bus)?;
                    }
                    3 => {
                        self.fetch_long(bus)?;
                    }
                    _ => {}
                }
                if condition {
                    return raise(ExceptionKind::Trapv);
                }
                Ok(())
            }
            _ => {
                let ea = AddrMode::from_ea_field(opcode).filter(AddrMode::is_data_alterable);
                let Some(ea) = ea else {
                    return raise(ExceptionKind::LineF);
                };
                let condition = self.fpu_predicate(bus)?;
                let operand = self.ea_operand(bus, ea, Size::Byte)?;
                self.write_operand(bus, operand, Size::Byte, if condition { 0xFF } else { 0 })
            }
        }
    }

    /// FBcc with a word (type 010) or long (type 011) displacement. FBF
    /// with a zero word displacement is FNOP.
    fn exec_fbcc<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        let predicate = opcode & 0x3F;
        if predicate > 0x1F {
            return raise(ExceptionKind::LineF);
        }
        let base = self.regs.pc;
        let disp = if opcode & 0x0040 == 0 {
            self.fetch_word(bus)? as i16 as u32
        } else {
            self.fetch_long(bus)?
        };
        self.cycles += 7;
        if self.fpu.test(predicate) {
            self.regs.pc = base.wrapping_add(disp);
            self.flow_changed = true;
        }
        Ok(())
    }

    // ================================================================
    // Context switch
    // ================================================================

    /// FSAVE <ea>: a null frame before the FPU has been used, otherwise
    /// an idle frame.
    fn exec_fsave<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        self.require_supervisor()?;
        let mode = Self::ea_mode(opcode)?;
        let valid = matches!(mode, AddrMode::AddrIndPreDec(_)) || (mode.is_control() && mode.is_alterable());
        if !valid {
            return raise(ExceptionKind::LineF);
        }
        self.cycles += 16;
        let frame: &[u32] = if self.fpu.null {
            &[NULL_FRAME]
        } else if self.has_68040_fpu() {
            &IDLE_FRAME_68040
        } else {
            &IDLE_FRAME_68881
        };
        self.write_fpu_longs(bus, mode, frame)
    }

    /// FRESTORE <ea>: a null frame resets the FPU. Any other frame must
    /// carry this FPU's version; its internal state is skipped.
    fn exec_frestore<B: M68kBus>(&mut self, bus: &mut B, opcode: u16) -> Fault<()> {
        self.require_supervisor()?;
        let mode = Self::ea_mode(opcode)?;
        let (address, fc) = match mode {
            AddrMode::AddrIndPostInc(r) => (self.regs.a(usize::from(r)), self.data_fc()),
            _ if mode.is_control() => match self.ea_operand(bus, mode, Size::Long)? {
                Operand::Memory { address, fc } => (address, fc),
                _ => return raise(ExceptionKind::LineF),
            },
            _ => return raise(ExceptionKind::LineF),
        };
        self.cycles += 16;
        let header = self.read_fc(bus, address, Size::Long, fc)?;
        let version = header >> 24;
        let idle = if self.has_68040_fpu() {
            IDLE_FRAME_68040[0]
        } else {
            IDLE_FRAME_68881[0]
        };
        let expected = idle >> 24;
        if version == 0 {
            self.fpu.reset();
        } else if version == expected {
            self.fpu.null = false;
        } else {
            return raise(ExceptionKind::FormatError);
        }
        if let AddrMode::AddrIndPostInc(r) = mode {
            let length = 4 + ((header >> 16) & 0xFF);
            self.regs.set_a(usize::from(r), address.wrapping_add(length));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_images_of_common_values() {
        assert_eq!(to_extended(1.0), (0x3FFF, 0x8000_0000_0000_0000));
        assert_eq!(to_extended(-2.5), (0xC000, 0xA000_0000_0000_0000));
        assert_eq!(to_extended(0.0), (0, 0));
        assert_eq!(to_extended(f64::NEG_INFINITY), (0xFFFF, 0));
        assert_eq!(from_extended(0x4000, 0xC90F_DAA2_2168_C235), std::f64::consts::PI);
        assert!(from_extended(0x7FFF, 0xC000_0000_0000_0000).is_nan());
    }

    #[test]
    fn subnormal_doubles_normalise_in_extended() {
        let tiny = f64::from_bits(1);
        let (sign_exponent, mantissa) = to_extended(tiny);
        assert_eq!(mantissa, 1 << 63);
        assert_eq!(i32::from(sign_exponent) - 16_383, -1074);
        assert_eq!(from_extended(sign_exponent, mantissa), tiny);
    }

    #[test]
    fn packed_decimal_images() {
        // +1.5E+1
        let fifteen = [0x0001_0001, 0x5000_0000, 0];
        assert_eq!(from_packed(fifteen), 15.0);
        // -2.5E-3
        assert_eq!(from_packed([0xC003_0002, 0x5000_0000, 0]), -0.0025);
        assert_eq!(to_packed(15.0, 17), fifteen);
        assert_eq!(to_packed(-0.0025, 2), [0xC003_0002, 0x5000_0000, 0]);
        assert!(from_packed([0x7FFF_0000, 1, 0]).is_nan());
    }

    #[test]
    fn packed_output_honours_negative_k() {
        // 123.456 with two digits after the point: 1.2346E+2.
        assert_eq!(to_packed(123.456, -2), [0x0002_0001, 0x2346_0000, 0]);
    }

    #[test]
    fn reset_leaves_nans_and_a_null_unit() {
        let fpu = Fpu::new();
        assert!(fpu.is_null());
        assert!(fpu.fp.iter().all(|v| v.is_nan()));
        assert_eq!((fpu.fpcr, fpu.fpsr, fpu.fpiar), (0, 0, 0));
    }

    #[test]
    fn arithmetic_sets_condition_codes() {
        let mut fpu = Fpu::new();
        fpu.fp[0] = 1.0;
        fpu.execute(FpOp::Sub, Rounding::Control, 3.0, 0);
        assert_eq!(fpu.fp[0], -2.0);
        assert_eq!(fpu.fpsr & fpsr::CC_MASK, fpsr::N);

        fpu.execute(FpOp::Add, Rounding::Control, 2.0, 0);
        assert_eq!(fpu.fpsr & fpsr::CC_MASK, fpsr::Z);

        fpu.execute(FpOp::Move, Rounding::Control, f64::INFINITY, 1);
        assert_eq!(fpu.fpsr & fpsr::CC_MASK, fpsr::I);
    }

    #[test]
    fn division_by_zero_and_invalid_operations_are_recorded() {
        let mut fpu = Fpu::new();
        fpu.fp[2] = 4.0;
        fpu.execute(FpOp::Div, Rounding::Control, 0.0, 2);
        assert!(fpu.fp[2].is_infinite());
        assert_eq!(fpu.fpsr & fpsr::EXC_MASK, fpsr::DZ);
        assert_ne!(fpu.fpsr & fpsr::ADZ, 0);

        fpu.execute(FpOp::Sqrt, Rounding::Control, -1.0, 3);
        assert_eq!(fpu.fpsr & fpsr::EXC_MASK, fpsr::OPERR);
        assert_eq!(fpu.fpsr & fpsr::CC_MASK, fpsr::NAN);
        // Accrued bits stay.
        assert_ne!(fpu.fpsr & fpsr::ADZ, 0);
        assert_ne!(fpu.fpsr & fpsr::AIOP, 0);
    }

    #[test]
    fn compare_leaves_the_destination() {
        let mut fpu = Fpu::new();
        fpu.fp[1] = 2.0;
        fpu.execute(FpOp::Cmp, Rounding::Control, 5.0, 1);
        assert_eq!(fpu.fp[1], 2.0);
        assert_eq!(fpu.fpsr & fpsr::CC_MASK, fpsr::N);
        assert!(fpu.test(0x04));
        assert!(!fpu.test(0x01));

        fpu.execute(FpOp::Cmp, Rounding::Control, f64::NAN, 1);
        assert!(fpu.test(0x08));
        assert_eq!(fpu.fpsr & fpsr::BSUN, 0);
        // Signalling greater-than on an unordered result.
        assert!(!fpu.test(0x12));
        assert_ne!(fpu.fpsr & fpsr::BSUN, 0);
    }

    #[test]
    fn integer_rounding_follows_fpcr() {
        let mut fpu = Fpu::new();
        fpu.execute(FpOp::Int, Rounding::Control, 2.5, 0);
        assert_eq!(fpu.fp[0], 2.0);
        fpu.set_fpcr(0x20);
        fpu.execute(FpOp::Int, Rounding::Control, 2.5, 0);
        assert_eq!(fpu.fp[0], 2.0);
        fpu.set_fpcr(0x30);
        fpu.execute(FpOp::Int, Rounding::Control, 2.5, 0);
        assert_eq!(fpu.fp[0], 3.0);
        fpu.execute(FpOp::IntRz, Rounding::Control, -2.7, 0);
        assert_eq!(fpu.fp[0], -2.0);
    }

    #[test]
    fn integer_conversion_saturates() {
        let mut fpu = Fpu::new();
        assert_eq!(fpu.to_integer(300.0, -128, 127), 127);
        assert_ne!(fpu.fpsr & fpsr::OPERR, 0);
        assert_eq!(fpu.to_integer(-1e20, i32::MIN, i32::MAX), i32::MIN);
        assert_eq!(fpu.to_integer(-7.0, -128, 127), -7);
    }

    #[test]
    fn single_precision_control_rounds_results() {
        let mut fpu = Fpu::new();
        fpu.set_fpcr(0x40);
        fpu.execute(FpOp::Move, Rounding::Control, 0.1, 0);
        assert_eq!(fpu.fp[0], f64::from(0.1f32));
        fpu.execute(FpOp::Move, Rounding::Double, 0.1, 0);
        assert_eq!(fpu.fp[0], 0.1);
    }

    #[test]
    fn remainder_fills_the_quotient_byte() {
        let mut fpu = Fpu::new();
        fpu.fp[0] = 7.0;
        fpu.execute(FpOp::Mod, Rounding::Control, -2.0, 0);
        assert_eq!(fpu.fp[0], 1.0);
        assert_eq!(fpu.fpsr & fpsr::QUOTIENT_MASK, 0x0083_0000);

        fpu.fp[0] = 7.0;
        fpu.execute(FpOp::Rem, Rounding::Control, 2.0, 0);
        assert_eq!(fpu.fp[0], -1.0);
        assert_eq!(fpu.fpsr & fpsr::QUOTIENT_MASK, 0x0004_0000);
    }

    #[test]
    fn exponent_and_mantissa_split() {
        let mut fpu = Fpu::new();
        fpu.execute(FpOp::GetExp, Rounding::Control, -12.0, 0);
        assert_eq!(fpu.fp[0], 3.0);
        fpu.execute(FpOp::GetMan, Rounding::Control, -12.0, 0);
        assert_eq!(fpu.fp[0], -1.5);
        fpu.fp[1] = 3.0;
        fpu.execute(FpOp::Scale, Rounding::Control, 4.9, 1);
        assert_eq!(fpu.fp[1], 48.0);
    }

    #[test]
    fn sincos_writes_both_registers() {
        let mut fpu = Fpu::new();
        fpu.execute(FpOp::SinCos(5), Rounding::Control, 0.0, 4);
        assert_eq!(fpu.fp[4], 0.0);
        assert_eq!(fpu.fp[5], 1.0);
    }

    #[test]
    fn m68040_leaves_transcendentals_to_software() {
        assert!(FpOp::decode(0x0E, false).is_some());
        assert!(FpOp::decode(0x0E, true).is_none());
        assert!(FpOp::decode(0x01, true).is_none());
        assert!(matches!(FpOp::decode(0x62, true), Some((FpOp::Add, Rounding::Single))));
        assert!(FpOp::decode(0x62, false).is_none());
        assert!(matches!(FpOp::decode(0x22, true), Some((FpOp::Add, Rounding::Control))));
    }

    #[test]
    fn constant_rom_powers_of_ten() {
        assert_eq!(constant_rom(0x32), 1.0);
        assert_eq!(constant_rom(0x33), 10.0);
        assert_eq!(constant_rom(0x36), 1e8);
        assert_eq!(constant_rom(0x0F), 0.0);
    }
}
