//! CPU operating modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// H8/300H operating mode, selected by the mode pins at reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CpuMode {
    /// 16 MB address space, 32-bit return addresses and vectors.
    #[default]
    Advanced,
    /// 64 KB address space, 16-bit return addresses and vectors.
    Normal,
}

impl CpuMode {
    /// Mask applied to every effective address.
    #[inline]
    pub const fn address_mask(self) -> u32 {
        match self {
            CpuMode::Advanced => 0x00FF_FFFF,
            CpuMode::Normal => 0x0000_FFFF,
        }
    }

    /// Size in bytes of a stacked return address or vector entry.
    #[inline]
    pub const fn pointer_size(self) -> u8 {
        match self {
            CpuMode::Advanced => 4,
            CpuMode::Normal => 2,
        }
    }

    /// Address of exception vector `number`.
    #[inline]
    pub const fn vector_address(self, number: u32) -> u32 {
        number * self.pointer_size() as u32
    }
}

impl fmt::Display for CpuMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuMode::Advanced => f.write_str("advanced"),
            CpuMode::Normal => f.write_str("normal"),
        }
    }
}

impl FromStr for CpuMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advanced" => Ok(CpuMode::Advanced),
            "normal" => Ok(CpuMode::Normal),
            other => Err(format!("unknown cpu mode '{}'", other)),
        }
    }
}
