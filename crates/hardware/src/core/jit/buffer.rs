//! Executable code buffers.
//!
//! Code is written into a fresh read-write mapping, the instruction cache is
//! synchronised where the host needs it, and the mapping is flipped to
//! read-execute. A buffer is never written again once executable.

use crate::common::EngineError;

/// An immutable, executable copy of emitted machine code.
#[derive(Debug)]
pub struct ExecutableMemory {
    ptr: *mut u8,
    len: usize,
    mapped: usize,
}

impl ExecutableMemory {
    /// Maps `code` as executable memory.
    ///
    /// # Errors
    ///
    /// Returns `CodeBuffer` for empty code, when `mmap`/`mprotect` fail, or on
    /// hosts without native code support.
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub fn from_code(code: &[u8]) -> Result<Self, EngineError> {
        if code.is_empty() {
            return Err(EngineError::CodeBuffer("empty code".into()));
        }
        // SAFETY: sysconf has no preconditions.
        let page = usize::try_from(unsafe { libc::sysconf(libc::_SC_PAGESIZE) }).unwrap_or(4096);
        let mapped = code
            .len()
            .checked_next_multiple_of(page)
            .ok_or_else(|| EngineError::CodeBuffer("code size overflow".into()))?;

        // SAFETY: anonymous private mapping; the result is checked below.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                mapped,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(EngineError::CodeBuffer(format!(
                "mmap failed: {}",
                std::io::Error::last_os_error()
            )));
        }
        let mem = Self {
            ptr: ptr.cast::<u8>(),
            len: code.len(),
            mapped,
        };

        // SAFETY: the mapping is writable and at least `code.len()` bytes long.
        unsafe {
            std::ptr::copy_nonoverlapping(code.as_ptr(), mem.ptr, code.len());
        }
        #[cfg(target_arch = "aarch64")]
        // SAFETY: the range lies inside the mapping.
        unsafe {
            __clear_cache(
                mem.ptr.cast::<libc::c_char>(),
                mem.ptr.add(code.len()).cast::<libc::c_char>(),
            );
        }

        // SAFETY: `ptr`/`mapped` describe the mapping created above.
        let rc = unsafe { libc::mprotect(ptr, mapped, libc::PROT_READ | libc::PROT_EXEC) };
        if rc != 0 {
            return Err(EngineError::CodeBuffer(format!(
                "mprotect(PROT_READ|PROT_EXEC) failed: {}",
                std::io::Error::last_os_error()
            )));
        }
        Ok(mem)
    }

    /// Maps `code` as executable memory.
    ///
    /// # Errors
    ///
    /// Always returns `CodeBuffer`: this host has no native code support.
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    pub fn from_code(_code: &[u8]) -> Result<Self, EngineError> {
        Err(EngineError::CodeBuffer(
            "executable memory is not supported on this host".into(),
        ))
    }

    /// Entry address.
    pub const fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    /// Code size in bytes.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Always `false`.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for ExecutableMemory {
    fn drop(&mut self) {
        #[cfg(any(target_os = "linux", target_os = "android"))]
        // SAFETY: `ptr`/`mapped` came from a successful mmap and are unmapped once.
        unsafe {
            if libc::munmap(self.ptr.cast::<libc::c_void>(), self.mapped) != 0 {
                tracing::warn!(size = self.mapped, "failed to unmap code buffer");
            }
        }
    }
}

#[cfg(all(any(target_os = "linux", target_os = "android"), target_arch = "aarch64"))]
unsafe extern "C" {
    fn __clear_cache(begin: *mut libc::c_char, end: *mut libc::c_char);
}
