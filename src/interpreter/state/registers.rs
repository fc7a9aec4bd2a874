//! H8/300H register file metadata.
//!
//! The H8/300H has eight 32-bit general registers, a 24-bit program
//! counter and an 8-bit condition-code register:
//!
//! | Backing | Width | Views |
//! |---------|-------|-------|
//! | ER0-ER7 | 32 | En (bits 16-31), Rn (bits 0-15), RnH (bits 8-15), RnL (bits 0-7) |
//! | PC | 24 | - |
//! | CCR | 8 | I, UI, H, U, N, Z, V, C |
//!
//! ER7 doubles as the stack pointer.
//!
//! Sub-registers are not storage of their own. A [`Field`] names an entry
//! in [`FIELDS`], which describes a bit slice of a backing register; every
//! full register is also a field covering its whole width.

use std::fmt;

/// Contents of one register slot.
///
/// `Undefined` models data the emulator cannot know (partial-data
/// emulation). It is never the same thing as zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    /// A concrete value, already masked to the slot width.
    Known(u32),
    /// No concrete value is available.
    Undefined,
}

impl Value {
    /// The concrete value, if any.
    #[inline]
    pub fn known(self) -> Option<u32> {
        match self {
            Value::Known(v) => Some(v),
            Value::Undefined => None,
        }
    }

    #[inline]
    pub fn is_undefined(self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Apply `f` to a concrete value; Undefined stays Undefined.
    #[inline]
    pub fn map(self, f: impl FnOnce(u32) -> u32) -> Value {
        match self {
            Value::Known(v) => Value::Known(f(v)),
            Value::Undefined => Value::Undefined,
        }
    }

    /// Combine two values; the result is Undefined if either side is.
    #[inline]
    pub fn zip_with(self, other: Value, f: impl FnOnce(u32, u32) -> u32) -> Value {
        match (self, other) {
            (Value::Known(a), Value::Known(b)) => Value::Known(f(a, b)),
            _ => Value::Undefined,
        }
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Known(v)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Known(v) => write!(f, "0x{:08X}", v),
            Value::Undefined => write!(f, "<undef>"),
        }
    }
}

/// Mask covering the low `width` bits.
#[inline]
pub const fn width_mask(width: u32) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

/// Index of a backing register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegisterId(u8);

/// Name and width of a backing register.
#[derive(Debug, Clone, Copy)]
pub struct RegisterDef {
    pub name: &'static str,
    pub width: u32,
}

/// Backing registers in index order.
pub const REGISTERS: [RegisterDef; RegisterId::COUNT] = [
    RegisterDef { name: "er0", width: 32 },
    RegisterDef { name: "er1", width: 32 },
    RegisterDef { name: "er2", width: 32 },
    RegisterDef { name: "er3", width: 32 },
    RegisterDef { name: "er4", width: 32 },
    RegisterDef { name: "er5", width: 32 },
    RegisterDef { name: "er6", width: 32 },
    RegisterDef { name: "er7", width: 32 },
    RegisterDef { name: "pc", width: 24 },
    RegisterDef { name: "ccr", width: 8 },
];

impl RegisterId {
    pub const ER0: RegisterId = RegisterId(0);
    pub const ER1: RegisterId = RegisterId(1);
    pub const ER2: RegisterId = RegisterId(2);
    pub const ER3: RegisterId = RegisterId(3);
    pub const ER4: RegisterId = RegisterId(4);
    pub const ER5: RegisterId = RegisterId(5);
    pub const ER6: RegisterId = RegisterId(6);
    pub const ER7: RegisterId = RegisterId(7);
    pub const PC: RegisterId = RegisterId(8);
    pub const CCR: RegisterId = RegisterId(9);

    /// Stack pointer alias.
    pub const SP: RegisterId = RegisterId::ER7;

    /// Number of backing registers.
    pub const COUNT: usize = 10;

    /// General register ERn (n taken modulo 8).
    #[inline]
    pub const fn er(n: u8) -> Self {
        RegisterId(n & 7)
    }

    /// Register with the given index, if it exists.
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(RegisterId(index as u8))
        } else {
            None
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Storage width in bits.
    #[inline]
    pub const fn width(self) -> u32 {
        REGISTERS[self.0 as usize].width
    }

    pub const fn name(self) -> &'static str {
        REGISTERS[self.0 as usize].name
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A bit slice of a backing register.
#[derive(Debug, Clone, Copy)]
pub struct FieldMeta {
    pub name: &'static str,
    pub backing: RegisterId,
    pub offset: u32,
    pub width: u32,
}

const fn field(name: &'static str, backing: RegisterId, offset: u32, width: u32) -> FieldMeta {
    FieldMeta { name, backing, offset, width }
}

const FULL_BASE: u8 = 0;
const R_BASE: u8 = 10;
const E_BASE: u8 = 18;
const RH_BASE: u8 = 26;
const RL_BASE: u8 = 34;

/// Field descriptor table, indexed by [`Field`].
pub static FIELDS: [FieldMeta; 42] = [
    field("er0", RegisterId::ER0, 0, 32),
    field("er1", RegisterId::ER1, 0, 32),
    field("er2", RegisterId::ER2, 0, 32),
    field("er3", RegisterId::ER3, 0, 32),
    field("er4", RegisterId::ER4, 0, 32),
    field("er5", RegisterId::ER5, 0, 32),
    field("er6", RegisterId::ER6, 0, 32),
    field("er7", RegisterId::ER7, 0, 32),
    field("pc", RegisterId::PC, 0, 24),
    field("ccr", RegisterId::CCR, 0, 8),
    field("r0", RegisterId::ER0, 0, 16),
    field("r1", RegisterId::ER1, 0, 16),
    field("r2", RegisterId::ER2, 0, 16),
    field("r3", RegisterId::ER3, 0, 16),
    field("r4", RegisterId::ER4, 0, 16),
    field("r5", RegisterId::ER5, 0, 16),
    field("r6", RegisterId::ER6, 0, 16),
    field("r7", RegisterId::ER7, 0, 16),
    field("e0", RegisterId::ER0, 16, 16),
    field("e1", RegisterId::ER1, 16, 16),
    field("e2", RegisterId::ER2, 16, 16),
    field("e3", RegisterId::ER3, 16, 16),
    field("e4", RegisterId::ER4, 16, 16),
    field("e5", RegisterId::ER5, 16, 16),
    field("e6", RegisterId::ER6, 16, 16),
    field("e7", RegisterId::ER7, 16, 16),
    field("r0h", RegisterId::ER0, 8, 8),
    field("r1h", RegisterId::ER1, 8, 8),
    field("r2h", RegisterId::ER2, 8, 8),
    field("r3h", RegisterId::ER3, 8, 8),
    field("r4h", RegisterId::ER4, 8, 8),
    field("r5h", RegisterId::ER5, 8, 8),
    field("r6h", RegisterId::ER6, 8, 8),
    field("r7h", RegisterId::ER7, 8, 8),
    field("r0l", RegisterId::ER0, 0, 8),
    field("r1l", RegisterId::ER1, 0, 8),
    field("r2l", RegisterId::ER2, 0, 8),
    field("r3l", RegisterId::ER3, 0, 8),
    field("r4l", RegisterId::ER4, 0, 8),
    field("r5l", RegisterId::ER5, 0, 8),
    field("r6l", RegisterId::ER6, 0, 8),
    field("r7l", RegisterId::ER7, 0, 8),
];

/// Handle to an entry of [`FIELDS`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Field(u8);

impl Field {
    pub const PC: Field = Field(8);
    pub const CCR: Field = Field(9);

    /// The whole of a backing register.
    #[inline]
    pub const fn full(reg: RegisterId) -> Self {
        Field(FULL_BASE + reg.0)
    }

    /// 32-bit ERn.
    #[inline]
    pub const fn er(n: u8) -> Self {
        Field(FULL_BASE + (n & 7))
    }

    /// 16-bit Rn.
    #[inline]
    pub const fn r(n: u8) -> Self {
        Field(R_BASE + (n & 7))
    }

    /// 16-bit En.
    #[inline]
    pub const fn e(n: u8) -> Self {
        Field(E_BASE + (n & 7))
    }

    /// 8-bit RnH.
    #[inline]
    pub const fn rh(n: u8) -> Self {
        Field(RH_BASE + (n & 7))
    }

    /// 8-bit RnL.
    #[inline]
    pub const fn rl(n: u8) -> Self {
        Field(RL_BASE + (n & 7))
    }

    /// Decode a 4-bit word register code: 0-7 are R0-R7, 8-15 are E0-E7.
    #[inline]
    pub const fn reg16(code: u8) -> Self {
        if code & 0x8 == 0 {
            Self::r(code)
        } else {
            Self::e(code)
        }
    }

    /// Decode a 4-bit byte register code: 0-7 are R0H-R7H, 8-15 are R0L-R7L.
    #[inline]
    pub const fn reg8(code: u8) -> Self {
        if code & 0x8 == 0 {
            Self::rh(code)
        } else {
            Self::rl(code)
        }
    }

    #[inline]
    pub fn meta(self) -> &'static FieldMeta {
        &FIELDS[self.0 as usize]
    }

    #[inline]
    pub fn backing(self) -> RegisterId {
        self.meta().backing
    }

    #[inline]
    pub fn width(self) -> u32 {
        self.meta().width
    }

    pub fn name(self) -> &'static str {
        self.meta().name
    }

    /// Whether this field covers its backing register entirely.
    #[inline]
    pub fn is_full(self) -> bool {
        self.0 < R_BASE
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Condition-code bits, numbered by their position in CCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// Carry.
    C = 0,
    /// Overflow.
    V = 1,
    /// Zero.
    Z = 2,
    /// Negative.
    N = 3,
    /// User bit.
    U = 4,
    /// Half-carry.
    H = 5,
    /// User bit / interrupt mask extension.
    Ui = 6,
    /// Interrupt mask.
    I = 7,
}

/// All flags, lowest bit first.
pub const FLAGS: [Flag; 8] = [
    Flag::C,
    Flag::V,
    Flag::Z,
    Flag::N,
    Flag::U,
    Flag::H,
    Flag::Ui,
    Flag::I,
];

impl Flag {
    #[inline]
    pub const fn bit(self) -> u32 {
        self as u32
    }

    #[inline]
    pub const fn mask(self) -> u32 {
        1 << (self as u32)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Flag::C => "C",
            Flag::V => "V",
            Flag::Z => "Z",
            Flag::N => "N",
            Flag::U => "U",
            Flag::H => "H",
            Flag::Ui => "UI",
            Flag::I => "I",
        }
    }

    /// The flag described as a one-bit field of CCR.
    pub const fn meta(self) -> FieldMeta {
        field(self.name(), RegisterId::CCR, self as u32, 1)
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
