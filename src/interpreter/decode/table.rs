//! Static dispatch tables for the H8/300H opcode map.
//!
//! The first instruction byte indexes [`PRIMARY`]. Groups that share a
//! first byte continue through a [`Subtable`], keyed on a bit field of a
//! later byte, until a terminal [`Rule`] is reached. An index past the end
//! of a subtable's entries is reserved.
//!
//! All tables are built at compile time.

use std::fmt;

use super::patterns::{self as p, Pattern};
use crate::interpreter::operation::{Condition, InstrFlags, Mnemonic, SizeClass};

/// A terminal decode rule.
#[derive(Clone, Copy)]
pub struct Rule {
    pub mnemonic: Mnemonic,
    /// Operand extraction; `None` marks a reserved encoding.
    pub pattern: Pattern,
    pub size: SizeClass,
    pub flags: InstrFlags,
    /// Total instruction length in bytes.
    pub length: u8,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("mnemonic", &self.mnemonic)
            .field("size", &self.size)
            .field("flags", &self.flags)
            .field("length", &self.length)
            .finish()
    }
}

/// One slot of a dispatch table.
#[derive(Debug, Clone, Copy)]
pub enum Entry {
    Rule(Rule),
    Table(&'static Subtable),
    Reserved,
}

/// Bit field selecting a subtable entry: `(bytes[byte] >> shift) & mask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    pub byte: u8,
    pub shift: u8,
    pub mask: u8,
}

impl Key {
    pub const fn new(byte: u8, shift: u8, mask: u8) -> Self {
        Self { byte, shift, mask }
    }

    /// High nibble of `byte`.
    pub const fn hi(byte: u8) -> Self {
        Self::new(byte, 4, 0xF)
    }

    /// Low nibble of `byte`.
    pub const fn lo(byte: u8) -> Self {
        Self::new(byte, 0, 0xF)
    }

    /// All of `byte`.
    pub const fn full(byte: u8) -> Self {
        Self::new(byte, 0, 0xFF)
    }

    /// Bit 7 of `byte`.
    pub const fn msb(byte: u8) -> Self {
        Self::new(byte, 7, 1)
    }

    #[inline]
    pub fn index(&self, value: u8) -> usize {
        ((value >> self.shift) & self.mask) as usize
    }
}

#[derive(Debug)]
pub struct Subtable {
    pub key: Key,
    pub entries: &'static [Entry],
}

const B: SizeClass = SizeClass::Byte;
const W: SizeClass = SizeClass::Word;
const L: SizeClass = SizeClass::Long;
const U: SizeClass = SizeClass::Unsized;

const R: Entry = Entry::Reserved;

const NONE: InstrFlags = InstrFlags::empty();
const SETS: InstrFlags = InstrFlags::SETS_FLAGS;

const fn rule(mnemonic: Mnemonic, pattern: Pattern, size: SizeClass, length: u8, flags: InstrFlags) -> Entry {
    Entry::Rule(Rule { mnemonic, pattern, size, flags, length })
}

/// Rule for an instruction that writes condition codes.
const fn flagged(mnemonic: Mnemonic, pattern: Pattern, size: SizeClass, length: u8) -> Entry {
    rule(mnemonic, pattern, size, length, SETS)
}

/// Rule for an instruction that leaves condition codes alone.
const fn plain(mnemonic: Mnemonic, pattern: Pattern, size: SizeClass, length: u8) -> Entry {
    rule(mnemonic, pattern, size, length, NONE)
}

/// Two-way table on bit 7 of a byte; the set side is the inverted variant.
macro_rules! invertible {
    ($name:ident, $key:expr, $mnemonic:expr, $pattern:expr, $length:expr, $flags:expr) => {
        const $name: Subtable = Subtable {
            key: $key,
            entries: &[
                rule($mnemonic, $pattern, B, $length, $flags),
                rule($mnemonic, $pattern, B, $length, $flags.union(InstrFlags::INVERT)),
            ],
        };
    };
}

// ============================================================================
// First-byte groups
// ============================================================================

const INC_B: Entry = flagged(Mnemonic::Inc, p::p_imm_rd::<1, 1>, B, 2);
const ADD_L: Entry = flagged(Mnemonic::Add, p::p_rs_rd::<4, 1>, L, 2);

/// `0A`: INC.B / ADD.L ERs,ERd.
const GROUP_0A: Subtable = Subtable {
    key: Key::hi(1),
    entries: &[INC_B, R, R, R, R, R, R, R, ADD_L, ADD_L, ADD_L, ADD_L, ADD_L, ADD_L, ADD_L, ADD_L],
};

/// `0B`: ADDS and word/long INC.
const GROUP_0B: Subtable = Subtable {
    key: Key::hi(1),
    entries: &[
        plain(Mnemonic::Add, p::p_imm_rd::<4, 1>, L, 2),
        R,
        R,
        R,
        R,
        flagged(Mnemonic::Inc, p::p_imm_rd::<2, 1>, W, 2),
        R,
        flagged(Mnemonic::Inc, p::p_imm_rd::<4, 1>, L, 2),
        plain(Mnemonic::Add, p::p_imm_rd::<4, 2>, L, 2),
        plain(Mnemonic::Add, p::p_imm_rd::<4, 4>, L, 2),
        R,
        R,
        R,
        flagged(Mnemonic::Inc, p::p_imm_rd::<2, 2>, W, 2),
        R,
        flagged(Mnemonic::Inc, p::p_imm_rd::<4, 2>, L, 2),
    ],
};

const MOV_L: Entry = flagged(Mnemonic::Mov, p::p_rs_rd::<4, 1>, L, 2);

/// `0F`: DAA / MOV.L ERs,ERd.
const GROUP_0F: Subtable = Subtable {
    key: Key::hi(1),
    entries: &[
        flagged(Mnemonic::Daa, p::p_rd::<1>, B, 2),
        R,
        R,
        R,
        R,
        R,
        R,
        R,
        MOV_L,
        MOV_L,
        MOV_L,
        MOV_L,
        MOV_L,
        MOV_L,
        MOV_L,
        MOV_L,
    ],
};

/// Shift/rotate group: `a` in slots 0/1/3, `b` in slots 8/9/B.
const fn shift_entries(a: Mnemonic, b: Mnemonic) -> [Entry; 12] {
    [
        flagged(a, p::p_rd::<1>, B, 2),
        flagged(a, p::p_rd::<2>, W, 2),
        R,
        flagged(a, p::p_rd::<4>, L, 2),
        R,
        R,
        R,
        R,
        flagged(b, p::p_rd::<1>, B, 2),
        flagged(b, p::p_rd::<2>, W, 2),
        R,
        flagged(b, p::p_rd::<4>, L, 2),
    ]
}

const SHIFT_10: [Entry; 12] = shift_entries(Mnemonic::Shll, Mnemonic::Shal);
const SHIFT_11: [Entry; 12] = shift_entries(Mnemonic::Shlr, Mnemonic::Shar);
const SHIFT_12: [Entry; 12] = shift_entries(Mnemonic::Rotxl, Mnemonic::Rotl);
const SHIFT_13: [Entry; 12] = shift_entries(Mnemonic::Rotxr, Mnemonic::Rotr);

const GROUP_10: Subtable = Subtable { key: Key::hi(1), entries: &SHIFT_10 };
const GROUP_11: Subtable = Subtable { key: Key::hi(1), entries: &SHIFT_11 };
const GROUP_12: Subtable = Subtable { key: Key::hi(1), entries: &SHIFT_12 };
const GROUP_13: Subtable = Subtable { key: Key::hi(1), entries: &SHIFT_13 };

/// `17`: NOT, EXTU, NEG, EXTS.
const GROUP_17: Subtable = Subtable {
    key: Key::hi(1),
    entries: &[
        flagged(Mnemonic::Not, p::p_rd::<1>, B, 2),
        flagged(Mnemonic::Not, p::p_rd::<2>, W, 2),
        R,
        flagged(Mnemonic::Not, p::p_rd::<4>, L, 2),
        R,
        flagged(Mnemonic::Extu, p::p_rd::<2>, W, 2),
        R,
        flagged(Mnemonic::Extu, p::p_rd::<4>, L, 2),
        flagged(Mnemonic::Neg, p::p_rd::<1>, B, 2),
        flagged(Mnemonic::Neg, p::p_rd::<2>, W, 2),
        R,
        flagged(Mnemonic::Neg, p::p_rd::<4>, L, 2),
        R,
        flagged(Mnemonic::Exts, p::p_rd::<2>, W, 2),
        R,
        flagged(Mnemonic::Exts, p::p_rd::<4>, L, 2),
    ],
};

const DEC_B: Entry = flagged(Mnemonic::Dec, p::p_imm_rd::<1, 1>, B, 2);
const SUB_L: Entry = flagged(Mnemonic::Sub, p::p_rs_rd::<4, 1>, L, 2);

/// `1A`: DEC.B / SUB.L ERs,ERd.
const GROUP_1A: Subtable = Subtable {
    key: Key::hi(1),
    entries: &[DEC_B, R, R, R, R, R, R, R, SUB_L, SUB_L, SUB_L, SUB_L, SUB_L, SUB_L, SUB_L, SUB_L],
};

/// `1B`: SUBS and word/long DEC.
const GROUP_1B: Subtable = Subtable {
    key: Key::hi(1),
    entries: &[
        plain(Mnemonic::Sub, p::p_imm_rd::<4, 1>, L, 2),
        R,
        R,
        R,
        R,
        flagged(Mnemonic::Dec, p::p_imm_rd::<2, 1>, W, 2),
        R,
        flagged(Mnemonic::Dec, p::p_imm_rd::<4, 1>, L, 2),
        plain(Mnemonic::Sub, p::p_imm_rd::<4, 2>, L, 2),
        plain(Mnemonic::Sub, p::p_imm_rd::<4, 4>, L, 2),
        R,
        R,
        R,
        flagged(Mnemonic::Dec, p::p_imm_rd::<2, 2>, W, 2),
        R,
        flagged(Mnemonic::Dec, p::p_imm_rd::<4, 2>, L, 2),
    ],
};

const CMP_L: Entry = flagged(Mnemonic::Cmp, p::p_rs_rd::<4, 1>, L, 2);

/// `1F`: DAS / CMP.L ERs,ERd.
const GROUP_1F: Subtable = Subtable {
    key: Key::hi(1),
    entries: &[
        flagged(Mnemonic::Das, p::p_rd::<1>, B, 2),
        R,
        R,
        R,
        R,
        R,
        R,
        R,
        CMP_L,
        CMP_L,
        CMP_L,
        CMP_L,
        CMP_L,
        CMP_L,
        CMP_L,
        CMP_L,
    ],
};

/// `58 c0 dddd`: Bcc d:16, condition in the high nibble of byte 1.
const BCC16_ENTRIES: [Entry; 16] = {
    let mut entries = [R; 16];
    let mut code = 0;
    while code < 16 {
        entries[code] = plain(Mnemonic::Bcc(Condition::from_code(code as u8)), p::p_disp16, U, 4);
        code += 1;
    }
    entries
};

const BCC16: Subtable = Subtable { key: Key::hi(1), entries: &BCC16_ENTRIES };

invertible!(BST_REG, Key::msb(1), Mnemonic::Bst, p::p_bit_imm, 2, NONE);
invertible!(BOR_REG, Key::msb(1), Mnemonic::Bor, p::p_bit_imm, 2, SETS);
invertible!(BXOR_REG, Key::msb(1), Mnemonic::Bxor, p::p_bit_imm, 2, SETS);
invertible!(BAND_REG, Key::msb(1), Mnemonic::Band, p::p_bit_imm, 2, SETS);
invertible!(BLD_REG, Key::msb(1), Mnemonic::Bld, p::p_bit_imm, 2, SETS);

// ============================================================================
// Data transfer groups
// ============================================================================

/// `68`/`69`/`6C`/`6D`/`6E`/`6F`: load on bit 7 clear, store on bit 7 set.
macro_rules! load_store {
    ($name:ident, $key:expr, $load:expr, $store:expr, $size:expr, $length:expr) => {
        const $name: Subtable = Subtable {
            key: $key,
            entries: &[
                flagged(Mnemonic::Mov, $load, $size, $length),
                flagged(Mnemonic::Mov, $store, $size, $length),
            ],
        };
    };
}

load_store!(MOV_IND_B, Key::msb(1), p::p_mov_ind_load::<1, 1>, p::p_mov_ind_store::<1, 1>, B, 2);
load_store!(MOV_IND_W, Key::msb(1), p::p_mov_ind_load::<2, 1>, p::p_mov_ind_store::<2, 1>, W, 2);
load_store!(MOV_INC_B, Key::msb(1), p::p_mov_postinc_load::<1, 1>, p::p_mov_predec_store::<1, 1>, B, 2);
load_store!(MOV_INC_W, Key::msb(1), p::p_mov_postinc_load::<2, 1>, p::p_mov_predec_store::<2, 1>, W, 2);
load_store!(MOV_D16_B, Key::msb(1), p::p_mov_disp16_load::<1, 1>, p::p_mov_disp16_store::<1, 1>, B, 4);
load_store!(MOV_D16_W, Key::msb(1), p::p_mov_disp16_load::<2, 1>, p::p_mov_disp16_store::<2, 1>, W, 4);

/// `6A`/`6B`: absolute 16/24-bit forms keyed on the high nibble of byte 1.
macro_rules! absolute {
    ($name:ident, $w:literal, $size:expr, $at:literal, $extra:literal) => {
        const $name: Subtable = Subtable {
            key: Key::hi($at),
            entries: &[
                flagged(Mnemonic::Mov, p::p_mov_abs16_load::<$w, $at>, $size, 4 + $extra),
                R,
                flagged(Mnemonic::Mov, p::p_mov_abs24_load::<$w, $at>, $size, 6 + $extra),
                R,
                R,
                R,
                R,
                R,
                flagged(Mnemonic::Mov, p::p_mov_abs16_store::<$w, $at>, $size, 4 + $extra),
                R,
                flagged(Mnemonic::Mov, p::p_mov_abs24_store::<$w, $at>, $size, 6 + $extra),
            ],
        };
    };
}

absolute!(MOV_ABS_B, 1, B, 1, 0);
absolute!(MOV_ABS_W, 2, W, 1, 0);

/// `78 s0 6A/6B xd 00 disp24`: the inner opcode's low bit selects the width.
const MOV_D24_B: Subtable = Subtable {
    key: Key::hi(3),
    entries: &[
        R,
        R,
        flagged(Mnemonic::Mov, p::p_mov_disp24_load::<1, 1>, B, 8),
        R,
        R,
        R,
        R,
        R,
        R,
        R,
        flagged(Mnemonic::Mov, p::p_mov_disp24_store::<1, 1>, B, 8),
    ],
};

const MOV_D24_W: Subtable = Subtable {
    key: Key::hi(3),
    entries: &[
        R,
        R,
        flagged(Mnemonic::Mov, p::p_mov_disp24_load::<2, 1>, W, 8),
        R,
        R,
        R,
        R,
        R,
        R,
        R,
        flagged(Mnemonic::Mov, p::p_mov_disp24_store::<2, 1>, W, 8),
    ],
};

const MOV_D24: Subtable = Subtable {
    key: Key::new(2, 0, 1),
    entries: &[Entry::Table(&MOV_D24_B), Entry::Table(&MOV_D24_W)],
};

/// `79 xd IIII`: word immediate forms.
const IMM16: Subtable = Subtable {
    key: Key::hi(1),
    entries: &[
        flagged(Mnemonic::Mov, p::p_imm16_rd, W, 4),
        flagged(Mnemonic::Add, p::p_imm16_rd, W, 4),
        flagged(Mnemonic::Cmp, p::p_imm16_rd, W, 4),
        flagged(Mnemonic::Sub, p::p_imm16_rd, W, 4),
        flagged(Mnemonic::Or, p::p_imm16_rd, W, 4),
        flagged(Mnemonic::Xor, p::p_imm16_rd, W, 4),
        flagged(Mnemonic::And, p::p_imm16_rd, W, 4),
    ],
};

/// `7A xd IIIIIIII`: long immediate forms.
const IMM32: Subtable = Subtable {
    key: Key::hi(1),
    entries: &[
        flagged(Mnemonic::Mov, p::p_imm32_rd, L, 6),
        flagged(Mnemonic::Add, p::p_imm32_rd, L, 6),
        flagged(Mnemonic::Cmp, p::p_imm32_rd, L, 6),
        flagged(Mnemonic::Sub, p::p_imm32_rd, L, 6),
        flagged(Mnemonic::Or, p::p_imm32_rd, L, 6),
        flagged(Mnemonic::Xor, p::p_imm32_rd, L, 6),
        flagged(Mnemonic::And, p::p_imm32_rd, L, 6),
    ],
};

const EEPMOV: Subtable = Subtable {
    key: Key::msb(1),
    entries: &[
        plain(Mnemonic::Eepmov, p::p_eepmov::<0x5C>, B, 4),
        plain(Mnemonic::Eepmov, p::p_eepmov::<0xD4>, W, 4),
    ],
};

// ============================================================================
// Bit operations on memory (7C-7F)
// ============================================================================

/// The `7C`/`7D` (`@ERd`) and `7E`/`7F` (`@aa:8`) groups differ only in
/// how byte 1 names the target.
macro_rules! bit_memory {
    ($module:ident, $abs:literal) => {
        mod $module {
            use super::*;

            invertible!(BST, Key::msb(3), Mnemonic::Bst, p::p_bitm_imm::<$abs>, 4, NONE);
            invertible!(BOR, Key::msb(3), Mnemonic::Bor, p::p_bitm_imm::<$abs>, 4, SETS);
            invertible!(BXOR, Key::msb(3), Mnemonic::Bxor, p::p_bitm_imm::<$abs>, 4, SETS);
            invertible!(BAND, Key::msb(3), Mnemonic::Band, p::p_bitm_imm::<$abs>, 4, SETS);
            invertible!(BLD, Key::msb(3), Mnemonic::Bld, p::p_bitm_imm::<$abs>, 4, SETS);

            const TEST_REG: Subtable = Subtable {
                key: Key::lo(2),
                entries: &[R, R, R, flagged(Mnemonic::Btst, p::p_bitm_reg::<$abs>, B, 4)],
            };

            const TEST_IMM: Subtable = Subtable {
                key: Key::lo(2),
                entries: &[
                    R,
                    R,
                    R,
                    flagged(Mnemonic::Btst, p::p_bitm_imm_strict::<$abs>, B, 4),
                    Entry::Table(&BOR),
                    Entry::Table(&BXOR),
                    Entry::Table(&BAND),
                    Entry::Table(&BLD),
                ],
            };

            const SET_REG: Subtable = Subtable {
                key: Key::lo(2),
                entries: &[
                    plain(Mnemonic::Bset, p::p_bitm_reg::<$abs>, B, 4),
                    plain(Mnemonic::Bnot, p::p_bitm_reg::<$abs>, B, 4),
                    plain(Mnemonic::Bclr, p::p_bitm_reg::<$abs>, B, 4),
                    R,
                    R,
                    R,
                    R,
                    Entry::Table(&BST),
                ],
            };

            const SET_IMM: Subtable = Subtable {
                key: Key::lo(2),
                entries: &[
                    plain(Mnemonic::Bset, p::p_bitm_imm_strict::<$abs>, B, 4),
                    plain(Mnemonic::Bnot, p::p_bitm_imm_strict::<$abs>, B, 4),
                    plain(Mnemonic::Bclr, p::p_bitm_imm_strict::<$abs>, B, 4),
                ],
            };

            /// Bit tests and loads: `7C`/`7E`.
            pub(super) const TEST: Subtable = Subtable {
                key: Key::hi(2),
                entries: &[R, R, R, R, R, R, Entry::Table(&TEST_REG), Entry::Table(&TEST_IMM)],
            };

            /// Bit writes: `7D`/`7F`.
            pub(super) const SET: Subtable = Subtable {
                key: Key::hi(2),
                entries: &[R, R, R, R, R, R, Entry::Table(&SET_REG), Entry::Table(&SET_IMM)],
            };
        }
    };
}

bit_memory!(bit_ind, false);
bit_memory!(bit_abs, true);

// ============================================================================
// 01 prefix
// ============================================================================

/// `01 00 ...`: MOV.L through memory, register byte at index 3.
mod movl {
    use super::*;

    load_store!(IND, Key::msb(3), p::p_mov_ind_load::<4, 3>, p::p_mov_ind_store::<4, 3>, L, 4);
    load_store!(INC, Key::msb(3), p::p_mov_postinc_load::<4, 3>, p::p_mov_predec_store::<4, 3>, L, 4);
    load_store!(D16, Key::msb(3), p::p_mov_disp16_load::<4, 3>, p::p_mov_disp16_store::<4, 3>, L, 6);
    absolute!(ABS, 4, L, 3, 2);

    const D24_INNER: Subtable = Subtable {
        key: Key::hi(5),
        entries: &[
            R,
            R,
            flagged(Mnemonic::Mov, p::p_mov_disp24_load::<4, 3>, L, 10),
            R,
            R,
            R,
            R,
            R,
            R,
            R,
            flagged(Mnemonic::Mov, p::p_mov_disp24_store::<4, 3>, L, 10),
        ],
    };

    pub(super) const TABLE: Subtable = Subtable { key: Key::full(2), entries: &ENTRIES };

    const ENTRIES: [Entry; 0x79] = {
        let mut entries = [R; 0x79];
        entries[0x69] = Entry::Table(&IND);
        entries[0x6B] = Entry::Table(&ABS);
        entries[0x6D] = Entry::Table(&INC);
        entries[0x6F] = Entry::Table(&D16);
        entries[0x78] = Entry::Table(&D24_INNER);
        entries
    };
}

/// `01 40 ...`: LDC/STC through memory. Same shapes as MOV.W with CCR in
/// place of the register.
mod ccr_mem {
    use super::*;

    macro_rules! ldc_stc {
        ($name:ident, $ldc:expr, $stc:expr, $key:expr, $length:expr) => {
            const $name: Subtable = Subtable {
                key: $key,
                entries: &[plain(Mnemonic::Ldc, $ldc, W, $length), plain(Mnemonic::Stc, $stc, W, $length)],
            };
        };
    }

    ldc_stc!(IND, p::p_ldc_ind, p::p_stc_ind, Key::msb(3), 4);
    ldc_stc!(INC, p::p_ldc_postinc, p::p_stc_predec, Key::msb(3), 4);
    ldc_stc!(D16, p::p_ldc_disp16, p::p_stc_disp16, Key::msb(3), 6);

    const ABS: Subtable = Subtable {
        key: Key::hi(3),
        entries: &[
            plain(Mnemonic::Ldc, p::p_ldc_abs16, W, 6),
            R,
            plain(Mnemonic::Ldc, p::p_ldc_abs24, W, 8),
            R,
            R,
            R,
            R,
            R,
            plain(Mnemonic::Stc, p::p_stc_abs16, W, 6),
            R,
            plain(Mnemonic::Stc, p::p_stc_abs24, W, 8),
        ],
    };

    const D24_INNER: Subtable = Subtable {
        key: Key::hi(5),
        entries: &[
            R,
            R,
            plain(Mnemonic::Ldc, p::p_ldc_disp24, W, 10),
            R,
            R,
            R,
            R,
            R,
            R,
            R,
            plain(Mnemonic::Stc, p::p_stc_disp24, W, 10),
        ],
    };

    pub(super) const TABLE: Subtable = Subtable { key: Key::full(2), entries: &ENTRIES };

    const ENTRIES: [Entry; 0x79] = {
        let mut entries = [R; 0x79];
        entries[0x69] = Entry::Table(&IND);
        entries[0x6B] = Entry::Table(&ABS);
        entries[0x6D] = Entry::Table(&INC);
        entries[0x6F] = Entry::Table(&D16);
        entries[0x78] = Entry::Table(&D24_INNER);
        entries
    };
}

/// `01 C0 5x`: MULXS.
const MULXS: Subtable = Subtable {
    key: Key::full(2),
    entries: &{
        let mut entries = [R; 0x54];
        entries[0x50] = flagged(Mnemonic::Mulxs, p::p_mulx::<1, 3>, B, 4);
        entries[0x52] = flagged(Mnemonic::Mulxs, p::p_mulx::<2, 3>, W, 4);
        entries
    },
};

/// `01 D0 5x`: DIVXS.
const DIVXS: Subtable = Subtable {
    key: Key::full(2),
    entries: &{
        let mut entries = [R; 0x54];
        entries[0x51] = flagged(Mnemonic::Divxs, p::p_mulx::<1, 3>, B, 4);
        entries[0x53] = flagged(Mnemonic::Divxs, p::p_mulx::<2, 3>, W, 4);
        entries
    },
};

/// `01 F0 6x`: OR/XOR/AND.L ERs,ERd.
const LOGIC_L: Subtable = Subtable {
    key: Key::full(2),
    entries: &{
        let mut entries = [R; 0x67];
        entries[0x64] = flagged(Mnemonic::Or, p::p_logic_l, L, 4);
        entries[0x65] = flagged(Mnemonic::Xor, p::p_logic_l, L, 4);
        entries[0x66] = flagged(Mnemonic::And, p::p_logic_l, L, 4);
        entries
    },
};

const PREFIX_01_ENTRIES: [Entry; 256] = {
    let mut entries = [R; 256];
    entries[0x00] = Entry::Table(&movl::TABLE);
    entries[0x40] = Entry::Table(&ccr_mem::TABLE);
    entries[0x80] = plain(Mnemonic::Sleep, p::p_none, U, 2);
    entries[0xC0] = Entry::Table(&MULXS);
    entries[0xD0] = Entry::Table(&DIVXS);
    entries[0xF0] = Entry::Table(&LOGIC_L);
    entries
};

const PREFIX_01: Subtable = Subtable { key: Key::full(1), entries: &PREFIX_01_ENTRIES };

// ============================================================================
// Primary table
// ============================================================================

/// Entry for a first byte.
const fn primary_entry(b: u8) -> Entry {
    use Mnemonic as M;

    match b {
        0x00 => plain(M::Nop, p::p_fixed::<0x00>, U, 2),
        0x01 => Entry::Table(&PREFIX_01),
        0x02 => plain(M::Stc, p::p_stc_reg, B, 2),
        0x03 => plain(M::Ldc, p::p_ldc_reg, B, 2),
        0x04 => plain(M::Orc, p::p_imm8_ccr, B, 2),
        0x05 => plain(M::Xorc, p::p_imm8_ccr, B, 2),
        0x06 => plain(M::Andc, p::p_imm8_ccr, B, 2),
        0x07 => plain(M::Ldc, p::p_imm8_ccr, B, 2),
        0x08 => flagged(M::Add, p::p_rs_rd::<1, 1>, B, 2),
        0x09 => flagged(M::Add, p::p_rs_rd::<2, 1>, W, 2),
        0x0A => Entry::Table(&GROUP_0A),
        0x0B => Entry::Table(&GROUP_0B),
        0x0C => flagged(M::Mov, p::p_rs_rd::<1, 1>, B, 2),
        0x0D => flagged(M::Mov, p::p_rs_rd::<2, 1>, W, 2),
        0x0E => rule(M::Add, p::p_rs_rd::<1, 1>, B, 2, SETS.union(InstrFlags::WITH_CARRY)),
        0x0F => Entry::Table(&GROUP_0F),

        0x10 => Entry::Table(&GROUP_10),
        0x11 => Entry::Table(&GROUP_11),
        0x12 => Entry::Table(&GROUP_12),
        0x13 => Entry::Table(&GROUP_13),
        0x14 => flagged(M::Or, p::p_rs_rd::<1, 1>, B, 2),
        0x15 => flagged(M::Xor, p::p_rs_rd::<1, 1>, B, 2),
        0x16 => flagged(M::And, p::p_rs_rd::<1, 1>, B, 2),
        0x17 => Entry::Table(&GROUP_17),
        0x18 => flagged(M::Sub, p::p_rs_rd::<1, 1>, B, 2),
        0x19 => flagged(M::Sub, p::p_rs_rd::<2, 1>, W, 2),
        0x1A => Entry::Table(&GROUP_1A),
        0x1B => Entry::Table(&GROUP_1B),
        0x1C => flagged(M::Cmp, p::p_rs_rd::<1, 1>, B, 2),
        0x1D => flagged(M::Cmp, p::p_rs_rd::<2, 1>, W, 2),
        0x1E => rule(M::Sub, p::p_rs_rd::<1, 1>, B, 2, SETS.union(InstrFlags::WITH_CARRY)),
        0x1F => Entry::Table(&GROUP_1F),

        0x20..=0x2F => flagged(M::Mov, p::p_mov_abs8_load, B, 2),
        0x30..=0x3F => flagged(M::Mov, p::p_mov_abs8_store, B, 2),
        0x40..=0x4F => plain(M::Bcc(Condition::from_code(b)), p::p_disp8, U, 2),

        0x50 => plain(M::Mulxu, p::p_mulx::<1, 1>, B, 2),
        0x51 => flagged(M::Divxu, p::p_mulx::<1, 1>, B, 2),
        0x52 => plain(M::Mulxu, p::p_mulx::<2, 1>, W, 2),
        0x53 => flagged(M::Divxu, p::p_mulx::<2, 1>, W, 2),
        0x54 => plain(M::Rts, p::p_fixed::<0x70>, U, 2),
        0x55 => plain(M::Bsr, p::p_disp8, U, 2),
        0x56 => plain(M::Rte, p::p_fixed::<0x70>, U, 2),
        0x57 => plain(M::Trapa, p::p_trapa, U, 2),
        0x58 => Entry::Table(&BCC16),
        0x59 => plain(M::Jmp, p::p_jump_ind, U, 2),
        0x5A => plain(M::Jmp, p::p_jump_abs, U, 4),
        0x5B => plain(M::Jmp, p::p_jump_mem, U, 2),
        0x5C => plain(M::Bsr, p::p_bsr16, U, 4),
        0x5D => plain(M::Jsr, p::p_jump_ind, U, 2),
        0x5E => plain(M::Jsr, p::p_jump_abs, U, 4),
        0x5F => plain(M::Jsr, p::p_jump_mem, U, 2),

        0x60 => plain(M::Bset, p::p_bit_reg, B, 2),
        0x61 => plain(M::Bnot, p::p_bit_reg, B, 2),
        0x62 => plain(M::Bclr, p::p_bit_reg, B, 2),
        0x63 => flagged(M::Btst, p::p_bit_reg, B, 2),
        0x64 => flagged(M::Or, p::p_rs_rd::<2, 1>, W, 2),
        0x65 => flagged(M::Xor, p::p_rs_rd::<2, 1>, W, 2),
        0x66 => flagged(M::And, p::p_rs_rd::<2, 1>, W, 2),
        0x67 => Entry::Table(&BST_REG),
        0x68 => Entry::Table(&MOV_IND_B),
        0x69 => Entry::Table(&MOV_IND_W),
        0x6A => Entry::Table(&MOV_ABS_B),
        0x6B => Entry::Table(&MOV_ABS_W),
        0x6C => Entry::Table(&MOV_INC_B),
        0x6D => Entry::Table(&MOV_INC_W),
        0x6E => Entry::Table(&MOV_D16_B),
        0x6F => Entry::Table(&MOV_D16_W),

        0x70 => plain(M::Bset, p::p_bit_imm_strict, B, 2),
        0x71 => plain(M::Bnot, p::p_bit_imm_strict, B, 2),
        0x72 => plain(M::Bclr, p::p_bit_imm_strict, B, 2),
        0x73 => flagged(M::Btst, p::p_bit_imm_strict, B, 2),
        0x74 => Entry::Table(&BOR_REG),
        0x75 => Entry::Table(&BXOR_REG),
        0x76 => Entry::Table(&BAND_REG),
        0x77 => Entry::Table(&BLD_REG),
        0x78 => Entry::Table(&MOV_D24),
        0x79 => Entry::Table(&IMM16),
        0x7A => Entry::Table(&IMM32),
        0x7B => Entry::Table(&EEPMOV),
        0x7C => Entry::Table(&bit_ind::TEST),
        0x7D => Entry::Table(&bit_ind::SET),
        0x7E => Entry::Table(&bit_abs::TEST),
        0x7F => Entry::Table(&bit_abs::SET),

        0x80..=0x8F => flagged(M::Add, p::p_imm8_rd, B, 2),
        0x90..=0x9F => rule(M::Add, p::p_imm8_rd, B, 2, SETS.union(InstrFlags::WITH_CARRY)),
        0xA0..=0xAF => flagged(M::Cmp, p::p_imm8_rd, B, 2),
        0xB0..=0xBF => rule(M::Sub, p::p_imm8_rd, B, 2, SETS.union(InstrFlags::WITH_CARRY)),
        0xC0..=0xCF => flagged(M::Or, p::p_imm8_rd, B, 2),
        0xD0..=0xDF => flagged(M::Xor, p::p_imm8_rd, B, 2),
        0xE0..=0xEF => flagged(M::And, p::p_imm8_rd, B, 2),
        0xF0..=0xFF => flagged(M::Mov, p::p_imm8_rd, B, 2),
    }
}

const fn build_primary() -> [Entry; 256] {
    let mut table = [R; 256];
    let mut b = 0;
    while b < 256 {
        table[b] = primary_entry(b as u8);
        b += 1;
    }
    table
}

/// First-byte dispatch table.
pub static PRIMARY: [Entry; 256] = build_primary();

#[cfg(test)]
mod tests {
    use super::*;

    fn rule_at(mut entry: &Entry, bytes: &[u8]) -> Option<Rule> {
        loop {
            match entry {
                Entry::Rule(rule) => return Some(*rule),
                Entry::Reserved => return None,
                Entry::Table(sub) => {
                    let key = sub.key.index(bytes[sub.key.byte as usize]);
                    entry = sub.entries.get(key).unwrap_or(&Entry::Reserved);
                }
            }
        }
    }

    #[test]
    fn test_primary_has_every_group() {
        let reserved = PRIMARY.iter().filter(|e| matches!(e, Entry::Reserved)).count();
        assert_eq!(reserved, 0);
    }

    #[test]
    fn test_key_index() {
        assert_eq!(Key::hi(1).index(0xA5), 0xA);
        assert_eq!(Key::lo(1).index(0xA5), 0x5);
        assert_eq!(Key::msb(1).index(0x80), 1);
        assert_eq!(Key::new(2, 0, 1).index(0x6B), 1);
    }

    #[test]
    fn test_nested_lookup() {
        let rule = rule_at(&PRIMARY[0x01], &[0x01, 0x00, 0x6B, 0xA3, 0, 0, 0x12, 0x34]).unwrap();
        assert_eq!(rule.mnemonic, Mnemonic::Mov);
        assert_eq!(rule.size, SizeClass::Long);
        assert_eq!(rule.length, 8);

        let rule = rule_at(&PRIMARY[0x7C], &[0x7C, 0x30, 0x76, 0xC0]).unwrap();
        assert_eq!(rule.mnemonic, Mnemonic::Band);
        assert!(rule.flags.contains(InstrFlags::INVERT));

        assert!(rule_at(&PRIMARY[0x01], &[0x01, 0x10]).is_none());
    }

    #[test]
    fn test_bcc16_conditions() {
        for code in 0..16u8 {
            let rule = rule_at(&PRIMARY[0x58], &[0x58, code << 4, 0, 0]).unwrap();
            assert_eq!(rule.mnemonic, Mnemonic::Bcc(Condition::from_code(code)));
            assert_eq!(rule.length, 4);
        }
    }

    #[test]
    fn test_rules_never_exceed_max_length() {
        fn walk(entry: &Entry, max: &mut u8) {
            match entry {
                Entry::Rule(rule) => *max = (*max).max(rule.length),
                Entry::Table(sub) => sub.entries.iter().for_each(|e| walk(e, max)),
                Entry::Reserved => {}
            }
        }
        let mut max = 0;
        PRIMARY.iter().for_each(|e| walk(e, &mut max));
        assert_eq!(max as usize, super::super::MAX_INSTRUCTION_LEN);
    }
}
