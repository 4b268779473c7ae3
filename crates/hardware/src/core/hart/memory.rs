//! Memory Access Helpers.
//!
//! Every guest access the engine makes goes through here:
//! 1. **Address Translation:** `satp` is turned into a translation context and the
//!    MMU consulted; translation observers see the outcome.
//! 2. **Fetch:** A 4-byte translated read of an instruction word.
//! 3. **Load/Store:** Translated data access with memory-access observers.

use super::Hart;
use crate::common::{AccessType, EngineError, PhysAddr, TranslationResult, VirtAddr};
use crate::common::constants::INSTRUCTION_SIZE;
use crate::core::hooks::{HookEvent, MemAccessInfo, TranslateHookInfo};
use crate::core::units::mmu::TranslationContext;

impl Hart {
    /// Translates a virtual address.
    ///
    /// # Arguments
    ///
    /// * `va` - Virtual address.
    /// * `access` - Fetch, load or store; selects the TLB.
    ///
    /// # Returns
    ///
    /// The translation, faulting or not. Registered translation observers have
    /// already been told about it.
    pub fn translate(&mut self, va: u64, access: AccessType) -> TranslationResult {
        let ctx = TranslationContext::from_satp(self.state.satp, self.state.privilege);
        let result = self
            .mmu
            .translate(&self.memory, VirtAddr::new(va), access, &ctx);

        if let Some(list) = self.hooks.translate() {
            let info = TranslateHookInfo {
                kind: access,
                va,
                pa: result.paddr.val(),
                fault: result.fault.clone(),
            };
            self.fire(&list, &HookEvent::Translate(info));
        }
        result
    }

    fn va_to_pa(&mut self, va: u64, access: AccessType) -> Result<PhysAddr, EngineError> {
        self.translate(va, access).into_result()
    }

    /// Fetches the instruction word at `va`.
    ///
    /// # Errors
    ///
    /// Returns `PageFault` or `AccessFault`.
    pub fn fetch(&mut self, va: u64) -> Result<u32, EngineError> {
        let pa = self.va_to_pa(va, AccessType::Fetch)?;
        Ok(self.memory.load(pa.val(), INSTRUCTION_SIZE as usize)? as u32)
    }

    /// Loads `size` bytes at `va`, zero-extended.
    ///
    /// # Errors
    ///
    /// Returns `PageFault` or `AccessFault`.
    pub fn load(&mut self, va: u64, size: usize) -> Result<u64, EngineError> {
        let pa = self.va_to_pa(va, AccessType::Load)?;
        let value = self.memory.load(pa.val(), size)?;
        if let Some(list) = self.hooks.mem_access() {
            let info = MemAccessInfo {
                kind: AccessType::Load,
                va,
                pa: pa.val(),
                size,
                value,
            };
            self.fire(&list, &HookEvent::MemAccess(info));
        }
        Ok(value)
    }

    /// Stores the low `size` bytes of `value` at `va`.
    ///
    /// Cached blocks covering the written address are not invalidated.
    ///
    /// # Errors
    ///
    /// Returns `PageFault` or `AccessFault`; memory is untouched on error.
    pub fn store(&mut self, va: u64, value: u64, size: usize) -> Result<(), EngineError> {
        let pa = self.va_to_pa(va, AccessType::Store)?;
        self.memory.store(pa.val(), value, size)?;
        if let Some(list) = self.hooks.mem_access() {
            let info = MemAccessInfo {
                kind: AccessType::Store,
                va,
                pa: pa.val(),
                size,
                value,
            };
            self.fire(&list, &HookEvent::MemAccess(info));
        }
        Ok(())
    }
}
