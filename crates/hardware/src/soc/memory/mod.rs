//! Guest physical memory.
//!
//! This module implements the flat backing store behind every guest access. It provides:
//! 1. **Buffer:** A fixed-address host mapping (`GuestBuffer`).
//! 2. **Sized Access:** Little-endian 1/2/4/8-byte loads and stores by physical address.
//! 3. **Image Setup:** Bulk copy (`load_data`) and clearing (`zero_init`) for program loaders.
//! 4. **Raw Access:** The base pointer and size native code uses for direct addressing.
//!
//! Every access is bounds-checked and reports `AccessFault` instead of touching host
//! memory outside the mapping.

/// Host backing store.
pub mod buffer;

use self::buffer::GuestBuffer;
use crate::common::EngineError;

/// Flat, zero-based guest physical memory.
#[derive(Debug)]
pub struct GuestMemory {
    buffer: GuestBuffer,
}

impl GuestMemory {
    /// Maps guest memory of at least `size` bytes, zero-filled.
    ///
    /// # Errors
    ///
    /// Returns `MemoryAllocation` when the host cannot provide the mapping.
    pub fn new(size: usize) -> Result<Self, EngineError> {
        Ok(Self {
            buffer: GuestBuffer::new(size)?,
        })
    }

    /// Size in bytes (the requested size rounded up to a host page).
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Always `false`.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Base pointer for direct native addressing.
    #[inline(always)]
    pub const fn as_mut_ptr(&self) -> *mut u8 {
        self.buffer.as_mut_ptr()
    }

    /// Validates `[addr, addr + len)` and returns the starting offset.
    #[inline(always)]
    fn check(&self, addr: u64, len: usize) -> Result<usize, EngineError> {
        let fault = EngineError::AccessFault { addr, size: len };
        let start = usize::try_from(addr).map_err(|_| fault.clone())?;
        match start.checked_add(len) {
            Some(end) if end <= self.buffer.len() => Ok(start),
            _ => Err(fault),
        }
    }

    /// Reads `size` bytes at `pa`, little-endian, zero-extended.
    ///
    /// # Arguments
    ///
    /// * `pa` - Physical address.
    /// * `size` - Access width: 1, 2, 4 or 8.
    ///
    /// # Errors
    ///
    /// Returns `AccessFault` if the access leaves guest memory or the width is invalid.
    #[inline]
    pub fn load(&self, pa: u64, size: usize) -> Result<u64, EngineError> {
        if !matches!(size, 1 | 2 | 4 | 8) {
            return Err(EngineError::AccessFault { addr: pa, size });
        }
        let offset = self.check(pa, size)?;
        let mut bytes = [0u8; 8];
        bytes[..size].copy_from_slice(self.buffer.slice(offset, size));
        Ok(u64::from_le_bytes(bytes))
    }

    /// Writes the low `size` bytes of `value` at `pa`, little-endian.
    ///
    /// # Errors
    ///
    /// Returns `AccessFault` if the access leaves guest memory or the width is invalid.
    #[inline]
    pub fn store(&mut self, pa: u64, value: u64, size: usize) -> Result<(), EngineError> {
        if !matches!(size, 1 | 2 | 4 | 8) {
            return Err(EngineError::AccessFault { addr: pa, size });
        }
        let offset = self.check(pa, size)?;
        self.buffer
            .slice_mut(offset, size)
            .copy_from_slice(&value.to_le_bytes()[..size]);
        Ok(())
    }

    /// Copies an image into guest memory.
    ///
    /// # Errors
    ///
    /// Returns `AccessFault` if the image does not fit at `addr`.
    pub fn load_data(&mut self, addr: u64, data: &[u8]) -> Result<(), EngineError> {
        let offset = self.check(addr, data.len())?;
        self.buffer
            .slice_mut(offset, data.len())
            .copy_from_slice(data);
        Ok(())
    }

    /// Clears `len` bytes starting at `addr`.
    ///
    /// # Errors
    ///
    /// Returns `AccessFault` if the range leaves guest memory.
    pub fn zero_init(&mut self, addr: u64, len: usize) -> Result<(), EngineError> {
        let offset = self.check(addr, len)?;
        self.buffer.slice_mut(offset, len).fill(0);
        Ok(())
    }

    /// Reads a byte range, for inspection in tests and tools.
    ///
    /// # Errors
    ///
    /// Returns `AccessFault` if the range leaves guest memory.
    pub fn read_bytes(&self, addr: u64, len: usize) -> Result<&[u8], EngineError> {
        let offset = self.check(addr, len)?;
        Ok(self.buffer.slice(offset, len))
    }
}
