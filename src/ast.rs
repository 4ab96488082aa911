//! Components relating to decoded MIPS instructions.
//!
//! This module holds:
//! - [`Reg`]: the register catalogue (mapping between register names and slots 0-31),
//! - [`Mnemonic`]: the table of supported mnemonics and their category/function codes,
//! - [`Instr`]: a decoded instruction,
//! - [`Instruction`]: a decoded instruction together with the source line it came from.

use std::str::FromStr;

/// A register. Must be between 0 and 31.
///
/// A `Reg` can be obtained from its name (with [`str::parse`]),
/// from a slot number (with [`Reg::try_from`]), or from [`reg_consts`].
///
/// The register names follow this dialect's conventions:
///
/// | slots   | names              |
/// |---------|--------------------|
/// | 0, 1    | `$zero`, `$one`    |
/// | 2-3     | `$v0`-`$v1`        |
/// | 4-7     | `$a0`-`$a3`        |
/// | 8-15    | `$r0`-`$r7`        |
/// | 16-23   | `$s0`-`$s7`        |
/// | 24-27   | `$r8`-`$r11`       |
/// | 28-31   | `$gp`, `$sp`, `$fp`, `$ra` |
///
/// Note that the `$r` registers are not contiguous:
/// `$r8` and above skip over the `$s` block.
///
/// ## Examples
///
/// ```
/// use mips_stepper::ast::Reg;
///
/// let reg: Reg = "$r8".parse().unwrap();
/// assert_eq!(reg.reg_no(), 24);
/// assert_eq!(reg.to_string(), "$r8");
///
/// assert!("$t0".parse::<Reg>().is_err());
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct Reg(pub(crate) u8);

/// Register constants!
pub mod reg_consts {
    use super::Reg;

    /// `$zero`, slot 0. This register is writable in this machine.
    pub const ZERO: Reg = Reg(0);
    /// `$one`, slot 1.
    pub const ONE: Reg = Reg(1);
    /// `$v0`, slot 2.
    pub const V0: Reg = Reg(2);
    /// `$v1`, slot 3.
    pub const V1: Reg = Reg(3);
    /// `$a0`, slot 4.
    pub const A0: Reg = Reg(4);
    /// `$a1`, slot 5.
    pub const A1: Reg = Reg(5);
    /// `$a2`, slot 6.
    pub const A2: Reg = Reg(6);
    /// `$a3`, slot 7.
    pub const A3: Reg = Reg(7);
    /// `$r0`, slot 8.
    pub const R0: Reg = Reg(8);
    /// `$r1`, slot 9.
    pub const R1: Reg = Reg(9);
    /// `$r2`, slot 10.
    pub const R2: Reg = Reg(10);
    /// `$r3`, slot 11.
    pub const R3: Reg = Reg(11);
    /// `$r4`, slot 12.
    pub const R4: Reg = Reg(12);
    /// `$r5`, slot 13.
    pub const R5: Reg = Reg(13);
    /// `$r6`, slot 14.
    pub const R6: Reg = Reg(14);
    /// `$r7`, slot 15.
    pub const R7: Reg = Reg(15);
    /// `$s0`, slot 16.
    pub const S0: Reg = Reg(16);
    /// `$s1`, slot 17.
    pub const S1: Reg = Reg(17);
    /// `$s2`, slot 18.
    pub const S2: Reg = Reg(18);
    /// `$s3`, slot 19.
    pub const S3: Reg = Reg(19);
    /// `$s4`, slot 20.
    pub const S4: Reg = Reg(20);
    /// `$s5`, slot 21.
    pub const S5: Reg = Reg(21);
    /// `$s6`, slot 22.
    pub const S6: Reg = Reg(22);
    /// `$s7`, slot 23.
    pub const S7: Reg = Reg(23);
    /// `$r8`, slot 24.
    pub const R8: Reg = Reg(24);
    /// `$r9`, slot 25.
    pub const R9: Reg = Reg(25);
    /// `$r10`, slot 26.
    pub const R10: Reg = Reg(26);
    /// `$r11`, slot 27.
    pub const R11: Reg = Reg(27);
    /// `$gp`, slot 28.
    pub const GP: Reg = Reg(28);
    /// `$sp`, slot 29.
    pub const SP: Reg = Reg(29);
    /// `$fp`, slot 30.
    pub const FP: Reg = Reg(30);
    /// `$ra`, slot 31.
    pub const RA: Reg = Reg(31);
}

const REG_NAMES: [&str; Reg::COUNT] = [
    "$zero", "$one", "$v0", "$v1", "$a0", "$a1", "$a2", "$a3",
    "$r0",   "$r1",  "$r2", "$r3", "$r4", "$r5", "$r6", "$r7",
    "$s0",   "$s1",  "$s2", "$s3", "$s4", "$s5", "$s6", "$s7",
    "$r8",   "$r9",  "$r10", "$r11", "$gp", "$sp", "$fp", "$ra",
];

/// Names which do not carry a numeric suffix.
const FIXED_REGS: [(&str, u8); 6] = [
    ("zero", 0),
    ("one",  1),
    ("gp",  28),
    ("sp",  29),
    ("fp",  30),
    ("ra",  31),
];

impl Reg {
    /// The number of registers in the register file.
    pub const COUNT: usize = 32;

    /// Gets the register number of this [`Reg`]. This is always between 0 and 31.
    pub fn reg_no(self) -> u8 {
        self.0
    }

    /// The canonical name of this register (e.g., `$r0`, `$sp`).
    ///
    /// Parsing this name always produces this register again.
    pub fn name(self) -> &'static str {
        REG_NAMES[usize::from(self)]
    }

    /// Iterates over all registers, in slot order.
    pub fn all() -> impl Iterator<Item = Reg> {
        (0..Self::COUNT as u8).map(Reg)
    }
}
impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}
impl From<Reg> for usize {
    // Used for indexing the reg file in [`crate::sim::mem::RegFile`].
    fn from(value: Reg) -> Self {
        usize::from(value.0)
    }
}
impl TryFrom<u8> for Reg {
    type Error = RegErr;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match usize::from(value) < Self::COUNT {
            true  => Ok(Reg(value)),
            false => Err(RegErr::OutOfRange),
        }
    }
}
impl FromStr for Reg {
    type Err = RegErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(body) = s.strip_prefix('$') else { return Err(RegErr::MissingSigil) };

        if let Some(&(_, no)) = FIXED_REGS.iter().find(|(name, _)| name.eq_ignore_ascii_case(body)) {
            return Ok(Reg(no));
        }

        let mut chars = body.chars();
        let Some(prefix) = chars.next() else { return Err(RegErr::MissingName) };
        let suffix = chars.as_str();

        let base: u8 = match prefix {
            'v' => 2,
            'a' => 4,
            'r' => 8,
            's' => 16,
            c   => return Err(RegErr::UnknownPrefix(c)),
        };

        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RegErr::InvalidSuffix);
        }
        let n = suffix.parse::<u8>().map_err(|_| RegErr::OutOfRange)?;

        // Numbers past a prefix's usual range alias later slots (`$v2` is `$a0`).
        let mut slot = u32::from(base) + u32::from(n);
        if prefix == 'r' && n >= 8 {
            slot += 8;
        }
        let slot = u8::try_from(slot).map_err(|_| RegErr::OutOfRange)?;
        Reg::try_from(slot)
    }
}

/// Errors that can occur when resolving a register name.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum RegErr {
    /// Register name did not start with `$`.
    MissingSigil,
    /// Register name was just `$`.
    MissingName,
    /// The character after `$` does not start any register name.
    UnknownPrefix(char),
    /// The register number after the prefix is not a decimal number.
    InvalidSuffix,
    /// The register number would put the register past slot 31.
    OutOfRange,
}
impl std::fmt::Display for RegErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegErr::MissingSigil     => f.write_str("register must start with '$'"),
            RegErr::MissingName      => f.write_str("missing register name"),
            RegErr::UnknownPrefix(c) => write!(f, "unknown register prefix '{c}'"),
            RegErr::InvalidSuffix    => f.write_str("invalid register number"),
            RegErr::OutOfRange       => f.write_str("register number out of range"),
        }
    }
}
impl std::error::Error for RegErr {}
impl crate::err::Error for RegErr {
    fn help(&self) -> Option<std::borrow::Cow<str>> {
        match self {
            RegErr::MissingSigil | RegErr::MissingName => Some("registers are written like $r0 or $sp".into()),
            RegErr::UnknownPrefix(_) => Some("valid registers are $zero, $one, $v0-$v1, $a0-$a3, $r0-$r11, $s0-$s7, $gp, $sp, $fp, $ra".into()),
            RegErr::InvalidSuffix    => Some("the register number only consists of digits 0-9".into()),
            RegErr::OutOfRange       => Some("the highest registers are $v29, $a27, $r15 and $s15".into()),
        }
    }
}

macro_rules! op_enum {
    (
        $(#[$m:meta])*
        pub enum $Name:ident {
            $($(#[$vm:meta])* $Var:ident = $code:literal => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$m])*
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        pub enum $Name {
            $($(#[$vm])* $Var = $code),+
        }

        impl $Name {
            /// The function/opcode number of this operation.
            pub fn code(self) -> u8 {
                self as u8
            }

            /// The assembly mnemonic of this operation.
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Self::$Var => $text),+
                }
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.mnemonic())
            }
        }
    };
}

op_enum! {
    /// A register-register operation. The discriminant is the MIPS function code.
    pub enum ROp {
        /// `rd = rs + rt`
        Add  = 32 => "add",
        /// `rd = rs - rt`
        Sub  = 34 => "sub",
        /// `rd = low32(rs * rt)`
        Mult = 24 => "mult",
        /// `rd = rs / rt`
        Div  = 26 => "div",
        /// `rd = rs & rt`
        And  = 36 => "and",
        /// `rd = rs | rt`
        Or   = 37 => "or",
        /// `rd = !(rs | rt)`
        Nor  = 39 => "nor",
        /// `rd = (rs < rt) as i32`
        Slt  = 42 => "slt",
    }
}
op_enum! {
    /// A register-immediate operation. The discriminant is its opcode in this dialect.
    pub enum IOp {
        /// `t1 = t2 + imm`
        Addi = 32 => "addi",
        /// `t1 = t2 - imm`
        Subi = 34 => "subi",
        /// `t1 = t2 & imm`
        Andi = 36 => "andi",
        /// `t1 = t2 ^ imm`
        Xori = 38 => "xori",
    }
}
op_enum! {
    /// A memory access operation. The discriminant is the MIPS opcode.
    pub enum MemOp {
        /// Load word.
        Lw = 35 => "lw",
        /// Store word.
        Sw = 43 => "sw",
    }
}

/// The category of an instruction.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Category {
    /// Register-register arithmetic or logic.
    R,
    /// Register-immediate arithmetic or logic.
    I,
    /// `lw` or `sw`.
    LoadStore,
    /// `j`.
    Jump,
    /// `beq`.
    Branch,
    /// `nop`.
    Nop,
    /// `exit`.
    Exit,
}

/// A supported mnemonic.
///
/// Parsing is case-insensitive and goes through a single lookup table.
///
/// ```
/// use mips_stepper::ast::{Category, Mnemonic};
///
/// let mn: Mnemonic = "ADDI".parse().unwrap();
/// assert_eq!(mn.category(), Category::I);
/// assert_eq!(mn.code(), Some(32));
/// ```
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Mnemonic {
    #[allow(missing_docs)]
    R(ROp),
    #[allow(missing_docs)]
    I(IOp),
    #[allow(missing_docs)]
    Mem(MemOp),
    #[allow(missing_docs)]
    J,
    #[allow(missing_docs)]
    Beq,
    #[allow(missing_docs)]
    Nop,
    #[allow(missing_docs)]
    Exit,
}

const MNEMONICS: [(&str, Mnemonic); 18] = [
    ("add",  Mnemonic::R(ROp::Add)),
    ("sub",  Mnemonic::R(ROp::Sub)),
    ("mult", Mnemonic::R(ROp::Mult)),
    ("div",  Mnemonic::R(ROp::Div)),
    ("and",  Mnemonic::R(ROp::And)),
    ("or",   Mnemonic::R(ROp::Or)),
    ("nor",  Mnemonic::R(ROp::Nor)),
    ("slt",  Mnemonic::R(ROp::Slt)),
    ("addi", Mnemonic::I(IOp::Addi)),
    ("subi", Mnemonic::I(IOp::Subi)),
    ("andi", Mnemonic::I(IOp::Andi)),
    ("xori", Mnemonic::I(IOp::Xori)),
    ("lw",   Mnemonic::Mem(MemOp::Lw)),
    ("sw",   Mnemonic::Mem(MemOp::Sw)),
    ("j",    Mnemonic::J),
    ("beq",  Mnemonic::Beq),
    ("nop",  Mnemonic::Nop),
    ("exit", Mnemonic::Exit),
];

impl Mnemonic {
    /// The category this mnemonic decodes into.
    pub fn category(self) -> Category {
        match self {
            Mnemonic::R(_)   => Category::R,
            Mnemonic::I(_)   => Category::I,
            Mnemonic::Mem(_) => Category::LoadStore,
            Mnemonic::J      => Category::Jump,
            Mnemonic::Beq    => Category::Branch,
            Mnemonic::Nop    => Category::Nop,
            Mnemonic::Exit   => Category::Exit,
        }
    }

    /// The function/opcode number, if this mnemonic has one (`nop` and `exit` don't).
    pub fn code(self) -> Option<u8> {
        match self {
            Mnemonic::R(op)   => Some(op.code()),
            Mnemonic::I(op)   => Some(op.code()),
            Mnemonic::Mem(op) => Some(op.code()),
            Mnemonic::J       => Some(2),
            Mnemonic::Beq     => Some(4),
            Mnemonic::Nop | Mnemonic::Exit => None,
        }
    }

    /// The lowercase spelling of this mnemonic.
    pub fn as_str(self) -> &'static str {
        MNEMONICS.iter()
            .find(|(_, mn)| *mn == self)
            .map_or("", |&(name, _)| name)
    }
}
impl FromStr for Mnemonic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MNEMONICS.iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|&(_, mn)| mn)
            .ok_or(())
    }
}
impl std::fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded instruction.
///
/// Each variant only holds the operands its category uses.
/// Jump and branch targets are instruction indices (the PC is set to `4 * target`).
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Instr {
    /// `op rd, rs, rt`
    R {
        #[allow(missing_docs)] op: ROp,
        #[allow(missing_docs)] rd: Reg,
        #[allow(missing_docs)] rs: Reg,
        #[allow(missing_docs)] rt: Reg,
    },
    /// `op rs, rt, imm`
    ///
    /// The operands keep the order they were written in: `rs` is the first operand
    /// and receives the result, `rt` is the second operand and is read.
    I {
        #[allow(missing_docs)] op: IOp,
        #[allow(missing_docs)] rs: Reg,
        #[allow(missing_docs)] rt: Reg,
        #[allow(missing_docs)] imm: i16,
    },
    /// `op rt, imm(rs)`
    Mem {
        #[allow(missing_docs)] op: MemOp,
        #[allow(missing_docs)] rt: Reg,
        #[allow(missing_docs)] rs: Reg,
        #[allow(missing_docs)] imm: i16,
    },
    /// `j target`
    J {
        #[allow(missing_docs)] target: i16,
    },
    /// `beq rs, rt, target`
    Beq {
        #[allow(missing_docs)] rs: Reg,
        #[allow(missing_docs)] rt: Reg,
        #[allow(missing_docs)] target: i16,
    },
    /// `nop`
    Nop,
    /// `exit`
    Exit,
}
impl Instr {
    /// The mnemonic this instruction was decoded from.
    pub fn mnemonic(&self) -> Mnemonic {
        match *self {
            Instr::R { op, .. }   => Mnemonic::R(op),
            Instr::I { op, .. }   => Mnemonic::I(op),
            Instr::Mem { op, .. } => Mnemonic::Mem(op),
            Instr::J { .. }       => Mnemonic::J,
            Instr::Beq { .. }     => Mnemonic::Beq,
            Instr::Nop            => Mnemonic::Nop,
            Instr::Exit           => Mnemonic::Exit,
        }
    }

    /// The category of this instruction.
    pub fn category(&self) -> Category {
        self.mnemonic().category()
    }

    /// The function/opcode number of this instruction, if it has one.
    pub fn code(&self) -> Option<u8> {
        self.mnemonic().code()
    }

    /// The immediate/target field of this instruction, or 0 if it has none.
    pub fn imm(&self) -> i16 {
        match *self {
            Instr::I { imm, .. } | Instr::Mem { imm, .. } => imm,
            Instr::J { target } | Instr::Beq { target, .. } => target,
            Instr::R { .. } | Instr::Nop | Instr::Exit => 0,
        }
    }
}
impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instr::R { op, rd, rs, rt }   => write!(f, "{op} {rd}, {rs}, {rt}"),
            Instr::I { op, rs, rt, imm }  => write!(f, "{op} {rs}, {rt}, {imm}"),
            Instr::Mem { op, rt, rs, imm } => write!(f, "{op} {rt}, {imm}({rs})"),
            Instr::J { target }           => write!(f, "j {target}"),
            Instr::Beq { rs, rt, target } => write!(f, "beq {rs}, {rt}, {target}"),
            Instr::Nop                    => f.write_str("nop"),
            Instr::Exit                   => f.write_str("exit"),
        }
    }
}

/// A decoded instruction, along with the source line it was decoded from.
///
/// The [`Display`] implementation renders the instruction as a listing row:
/// the source padded to 25 columns, followed by the immediate for anything
/// that isn't an R-type instruction.
///
/// [`Display`]: std::fmt::Display
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Instruction {
    src: String,
    instr: Instr,
}
impl Instruction {
    /// Creates a new instruction record.
    pub fn new(src: impl Into<String>, instr: Instr) -> Self {
        Self { src: src.into(), instr }
    }

    /// The source text this instruction was parsed from.
    pub fn src(&self) -> &str {
        &self.src
    }

    /// The decoded instruction.
    pub fn instr(&self) -> &Instr {
        &self.instr
    }
}
impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.instr.category() {
            Category::R => write!(f, "{:<25}", self.src),
            _ => write!(f, "{:<25} (imm: {})", self.src, self.instr.imm()),
        }
    }
}
