//! Flat byte-array memory.
//!
//! `FlatMemory` maps one contiguous window of the address space onto a
//! byte vector. Accesses outside the window fail with
//! [`MemoryError::Unmapped`]; writes that touch a read-only range fail with
//! [`MemoryError::ReadOnly`] and leave memory unchanged, which is how a
//! host simulates a protection fault.
//!
//! # Usage
//!
//! ```
//! use h8_emu::device::FlatMemory;
//! use h8_emu::interpreter::Memory;
//!
//! let mut mem = FlatMemory::new(0xFF_8000, 0x8000);
//! mem.load(0xFF_8000, &[0x12, 0x34]).unwrap();
//! assert_eq!(mem.read_value(0xFF_8000, 2).unwrap(), 0x1234);
//!
//! mem.mark_read_only(0xFF_8000, 0x100);
//! assert!(mem.write_value(0xFF_8000, 1, 0).is_err());
//! ```

use std::ops::Range;

use crate::interpreter::traits::{Memory, MemoryError};

/// Contiguous memory window starting at `base`.
#[derive(Debug, Clone)]
pub struct FlatMemory {
    base: u32,
    data: Vec<u8>,
    /// Write-protected address ranges
    read_only: Vec<Range<u64>>,
    /// Statistics
    total_bytes_written: u64,
}

impl FlatMemory {
    /// Create `size` zeroed bytes mapped at `base`.
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            data: vec![0; size],
            read_only: Vec::new(),
            total_bytes_written: 0,
        }
    }

    #[inline]
    pub fn base(&self) -> u32 {
        self.base
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Protect `len` bytes starting at `address` against writes.
    pub fn mark_read_only(&mut self, address: u32, len: usize) {
        let start = address as u64;
        self.read_only.push(start..start + len as u64);
    }

    /// Drop all write protection.
    pub fn clear_read_only(&mut self) {
        self.read_only.clear();
    }

    /// Copy `bytes` in at `address`, ignoring write protection.
    pub fn load(&mut self, address: u32, bytes: &[u8]) -> Result<(), MemoryError> {
        let range = self.offset(address, bytes.len())?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Raw contents of the window.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Total bytes stored through [`Memory::write`].
    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    /// Index range of an access, if it lies entirely inside the window.
    fn offset(&self, address: u32, len: usize) -> Result<Range<usize>, MemoryError> {
        let unmapped = MemoryError::Unmapped { address, len };
        let start = address.checked_sub(self.base).ok_or(unmapped.clone())? as usize;
        let end = start.checked_add(len).ok_or(unmapped.clone())?;
        if end > self.data.len() {
            return Err(unmapped);
        }
        Ok(start..end)
    }

    fn is_read_only(&self, address: u32, len: usize) -> bool {
        let start = address as u64;
        let end = start + len as u64;
        self.read_only.iter().any(|r| start < r.end && end > r.start)
    }
}

impl Memory for FlatMemory {
    fn read(&self, address: u32, buf: &mut [u8]) -> Result<(), MemoryError> {
        let range = self.offset(address, buf.len())?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write(&mut self, address: u32, bytes: &[u8]) -> Result<(), MemoryError> {
        let range = self.offset(address, bytes.len())?;
        if self.is_read_only(address, bytes.len()) {
            return Err(MemoryError::ReadOnly { address });
        }
        self.data[range].copy_from_slice(bytes);
        self.total_bytes_written += bytes.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_values() {
        let mut mem = FlatMemory::new(0x1000, 0x100);
        mem.write_value(0x1010, 4, 0xDEAD_BEEF).unwrap();

        let mut bytes = [0u8; 4];
        mem.read(0x1010, &mut bytes).unwrap();
        assert_eq!(bytes, [0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(mem.read_value(0x1012, 2).unwrap(), 0xBEEF);
        assert_eq!(mem.bytes_written(), 4);
    }

    #[test]
    fn test_unmapped_access() {
        let mem = FlatMemory::new(0x1000, 0x100);
        let mut byte = [0u8];
        assert_eq!(
            mem.read(0x0FFF, &mut byte),
            Err(MemoryError::Unmapped { address: 0x0FFF, len: 1 })
        );
        // Straddles the end of the window
        assert_eq!(
            mem.read_value(0x10FE, 4),
            Err(MemoryError::Unmapped { address: 0x10FE, len: 4 })
        );
        assert_eq!(mem.read_value(0x10FE, 2), Ok(0));
    }

    #[test]
    fn test_read_only_range() {
        let mut mem = FlatMemory::new(0, 0x100);
        mem.load(0x20, &[0xAA, 0xBB]).unwrap();
        mem.mark_read_only(0x20, 2);

        assert_eq!(mem.write_value(0x1F, 2, 0x1234), Err(MemoryError::ReadOnly { address: 0x1F }));
        assert_eq!(mem.read_value(0x20, 2).unwrap(), 0xAABB);
        mem.write_value(0x1E, 2, 0x1234).unwrap();

        // Loading bypasses protection
        mem.load(0x20, &[0x00]).unwrap();
        assert_eq!(mem.read_value(0x20, 1).unwrap(), 0);

        mem.clear_read_only();
        mem.write_value(0x20, 1, 0x55).unwrap();
    }

    #[test]
    fn test_invalid_width() {
        let mut mem = FlatMemory::new(0, 0x10);
        assert_eq!(mem.read_value(0, 3), Err(MemoryError::InvalidWidth { width: 3 }));
        assert_eq!(mem.write_value(0, 8, 0), Err(MemoryError::InvalidWidth { width: 8 }));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut mem = FlatMemory::new(0, 0x10);
        let snapshot = mem.clone();
        mem.write_value(0, 1, 0xFF).unwrap();
        assert_eq!(snapshot.read_value(0, 1).unwrap(), 0);
    }
}
