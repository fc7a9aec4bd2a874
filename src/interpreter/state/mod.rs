//! Processor state for the H8/300H.
//!
//! | Register | Count | Width | Purpose |
//! |----------|-------|-------|---------|
//! | ER0-ER7 | 8 | 32-bit | General purpose; ER7 is SP |
//! | PC | 1 | 24-bit | Program counter |
//! | CCR | 1 | 8-bit | Condition codes |
//!
//! All storage sits in one array inside [`RegisterContext`]; 16- and 8-bit
//! registers are [`Field`] views described by a static table.
//!
//! # Example
//!
//! ```
//! use h8_emu::interpreter::state::{Field, RegisterContext, Value};
//!
//! let mut ctx = RegisterContext::new();
//! ctx.set_field(Field::r(0), Value::Known(0x1234));
//! assert_eq!(ctx.get_field(Field::rh(0)), Value::Known(0x12));
//! ```

mod context;
mod registers;

pub use context::RegisterContext;
pub use registers::{
    width_mask, Field, FieldMeta, Flag, RegisterDef, RegisterId, Value, FIELDS, FLAGS, REGISTERS,
};
