//! Host backing store for guest memory.
//!
//! On Unix the store is an anonymous private mapping reserved with
//! `MAP_NORESERVE`, so a large guest address space costs nothing until pages are
//! touched, and the host zero-fills them on first access. Elsewhere it falls back
//! to a zeroed heap allocation.

use crate::common::EngineError;

/// Raw, fixed-address byte buffer.
///
/// The base pointer never moves for the lifetime of the buffer; native code
/// compiled against it relies on that.
#[derive(Debug)]
pub struct GuestBuffer {
    ptr: *mut u8,
    size: usize,
    is_mmap: bool,
}

impl GuestBuffer {
    /// Maps a zeroed buffer of at least `size` bytes.
    ///
    /// # Arguments
    ///
    /// * `size` - Requested size; rounded up to the host page size.
    ///
    /// # Errors
    ///
    /// Returns `MemoryAllocation` if `size` is zero or the host refuses the mapping.
    pub fn new(size: usize) -> Result<Self, EngineError> {
        if size == 0 {
            return Err(EngineError::MemoryAllocation { size });
        }

        #[cfg(unix)]
        {
            // SAFETY: sysconf has no preconditions.
            let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
            let page = if page > 0 { page as usize } else { 4096 };
            let alloc = size
                .checked_next_multiple_of(page)
                .ok_or(EngineError::MemoryAllocation { size })?;

            #[cfg(any(target_os = "linux", target_os = "android"))]
            let flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE;
            #[cfg(not(any(target_os = "linux", target_os = "android")))]
            let flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;

            // SAFETY: anonymous mapping with a null hint; the result is checked
            // against MAP_FAILED before use.
            let ptr = unsafe {
                libc::mmap(
                    std::ptr::null_mut(),
                    alloc,
                    libc::PROT_READ | libc::PROT_WRITE,
                    flags,
                    -1,
                    0,
                )
            };
            if ptr == libc::MAP_FAILED {
                return Err(EngineError::MemoryAllocation { size: alloc });
            }

            Ok(Self {
                ptr: ptr.cast::<u8>(),
                size: alloc,
                is_mmap: true,
            })
        }

        #[cfg(not(unix))]
        {
            let mut data = vec![0u8; size].into_boxed_slice();
            let ptr = data.as_mut_ptr();
            std::mem::forget(data);
            Ok(Self {
                ptr,
                size,
                is_mmap: false,
            })
        }
    }

    /// Size of the buffer in bytes.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Always `false`: zero-sized buffers are rejected at construction.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Base pointer of the buffer.
    #[inline(always)]
    pub const fn as_mut_ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// Views `len` bytes at `offset`.
    ///
    /// The caller has bounds-checked `offset + len <= self.len()`.
    #[inline(always)]
    pub(crate) fn slice(&self, offset: usize, len: usize) -> &[u8] {
        // SAFETY: in bounds per the caller's check; the mapping lives as long as self.
        unsafe { std::slice::from_raw_parts(self.ptr.add(offset), len) }
    }

    /// Mutable view of `len` bytes at `offset`.
    ///
    /// The caller has bounds-checked `offset + len <= self.len()`.
    #[inline(always)]
    pub(crate) fn slice_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        // SAFETY: in bounds per the caller's check; `&mut self` guarantees uniqueness.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.add(offset), len) }
    }
}

impl Drop for GuestBuffer {
    fn drop(&mut self) {
        if self.is_mmap {
            #[cfg(unix)]
            // SAFETY: ptr/size are exactly what mmap returned.
            unsafe {
                if libc::munmap(self.ptr.cast::<libc::c_void>(), self.size) != 0 {
                    tracing::warn!(size = self.size, "failed to unmap guest memory");
                }
            }
        } else {
            // SAFETY: ptr/size came from a leaked Box<[u8]> of this length.
            unsafe {
                drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    self.ptr, self.size,
                )));
            }
        }
    }
}
