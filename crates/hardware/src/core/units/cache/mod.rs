//! Direct-mapped block cache.
//!
//! This module maps guest entry addresses to cached blocks. It provides:
//! 1. **Indexing:** Slot `(pc / 4) & (capacity - 1)`; one block per slot, no chaining.
//! 2. **Install:** Unconditional overwrite of the slot; empty blocks are rejected.
//! 3. **Lookup:** Returns the block only if its entry address matches, and counts the hit.
//! 4. **Invalidation:** Whole-table reset only.
//!
//! Blocks are reference counted so the hart can keep executing a block (and its
//! native code) even if a nested install evicts it from its slot.

/// Cached instruction blocks.
pub mod block;

use std::rc::Rc;

use crate::common::{EngineError, INSTRUCTION_SIZE};

pub use self::block::Block;

/// Fixed-capacity table of blocks.
#[derive(Debug)]
pub struct BlockCache {
    slots: Vec<Option<Rc<Block>>>,
    mask: usize,
}

impl BlockCache {
    /// Creates an empty cache.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of slots; a non-zero power of two.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for any other capacity.
    pub fn new(capacity: usize) -> Result<Self, EngineError> {
        if !capacity.is_power_of_two() {
            return Err(EngineError::InvalidConfig(format!(
                "block cache capacity must be a non-zero power of two, got {capacity}"
            )));
        }
        Ok(Self {
            slots: vec![None; capacity],
            mask: capacity - 1,
        })
    }

    #[inline(always)]
    const fn index(&self, pc: u64) -> usize {
        ((pc / INSTRUCTION_SIZE) as usize) & self.mask
    }

    /// Number of slots.
    pub const fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Looks up the block whose entry is `pc` and counts the hit.
    ///
    /// # Returns
    ///
    /// A handle to the block, or `None` if the slot is empty or holds a block for
    /// a different address.
    #[inline]
    pub fn lookup(&self, pc: u64) -> Option<Rc<Block>> {
        let block = self.slots[self.index(pc)].as_ref()?;
        if !block.valid || block.start_pc != pc {
            return None;
        }
        block.record_hit();
        Some(Rc::clone(block))
    }

    /// Returns the block for `pc` without counting a hit.
    pub fn peek(&self, pc: u64) -> Option<&Rc<Block>> {
        self.slots[self.index(pc)]
            .as_ref()
            .filter(|b| b.valid && b.start_pc == pc)
    }

    /// Installs `block`, evicting whatever occupied its slot.
    ///
    /// # Returns
    ///
    /// The installed handle, or `None` if the block is empty.
    pub fn install(&mut self, block: Block) -> Option<Rc<Block>> {
        if block.is_empty() {
            return None;
        }
        let idx = self.index(block.start_pc);
        let block = Rc::new(block);
        self.slots[idx] = Some(Rc::clone(&block));
        Some(block)
    }

    /// Empties every slot.
    pub fn invalidate_all(&mut self) {
        self.slots.fill(None);
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
