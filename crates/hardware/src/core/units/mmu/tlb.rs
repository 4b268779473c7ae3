//! Translation Lookaside Buffer (TLB).
//!
//! A direct-mapped cache of completed translations. Entries are indexed by the
//! 4 KiB virtual page number (`(va >> 12) & mask`) and tagged with the virtual
//! page number of the page they map, so a superpage entry matches any address
//! in its page but is only found through the slot its inserting address hashed to.

use crate::common::EngineError;
use crate::common::constants::PAGE_SHIFT;

/// A single TLB entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TlbEntry {
    /// Virtual page number of the mapped page, in 4 KiB units.
    pub tag: u64,
    /// Physical page number of the mapped page's base, in 4 KiB units.
    pub ppn: u64,
    /// Page size in bytes: 4 KiB, 2 MiB or 1 GiB.
    pub page_size: u64,
    /// Entry holds a translation.
    pub valid: bool,
}

impl TlbEntry {
    /// Tag `va` would carry inside a page of `page_size` bytes.
    #[inline(always)]
    const fn tag_for(va: u64, page_size: u64) -> u64 {
        (va & !(page_size - 1)) >> PAGE_SHIFT
    }

    /// Returns `true` if this entry maps `va`.
    #[inline(always)]
    pub const fn matches(&self, va: u64) -> bool {
        self.valid && Self::tag_for(va, self.page_size) == self.tag
    }

    /// Physical address of `va` under this entry.
    #[inline(always)]
    pub const fn translate(&self, va: u64) -> u64 {
        (self.ppn << PAGE_SHIFT) | (va & (self.page_size - 1))
    }
}

/// Direct-mapped translation cache.
#[derive(Debug)]
pub struct Tlb {
    entries: Vec<TlbEntry>,
    mask: usize,
}

impl Tlb {
    /// Creates a TLB.
    ///
    /// # Arguments
    ///
    /// * `size` - Number of entries; a non-zero power of two.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for any other size.
    pub fn new(size: usize) -> Result<Self, EngineError> {
        if !size.is_power_of_two() {
            return Err(EngineError::InvalidConfig(format!(
                "TLB size must be a non-zero power of two, got {size}"
            )));
        }
        Ok(Self {
            entries: vec![TlbEntry::default(); size],
            mask: size - 1,
        })
    }

    #[inline(always)]
    const fn index(&self, va: u64) -> usize {
        ((va >> PAGE_SHIFT) as usize) & self.mask
    }

    /// Looks up the translation for `va`.
    ///
    /// # Returns
    ///
    /// The physical address if the slot for `va` holds a matching entry.
    #[inline(always)]
    pub fn lookup(&self, va: u64) -> Option<u64> {
        let idx = self.index(va);
        // SAFETY: idx is masked by (len - 1) and len is a power of two.
        let entry = unsafe { self.entries.get_unchecked(idx) };
        entry.matches(va).then(|| entry.translate(va))
    }

    /// Records a completed translation.
    ///
    /// # Arguments
    ///
    /// * `va` - The translated virtual address.
    /// * `pa` - Its physical address.
    /// * `page_size` - Size of the page that mapped it.
    pub fn insert(&mut self, va: u64, pa: u64, page_size: u64) {
        let idx = self.index(va);
        self.entries[idx] = TlbEntry {
            tag: TlbEntry::tag_for(va, page_size),
            ppn: (pa & !(page_size - 1)) >> PAGE_SHIFT,
            page_size,
            valid: true,
        };
    }

    /// Invalidates every entry.
    pub fn flush(&mut self) {
        for entry in &mut self.entries {
            entry.valid = false;
        }
    }

    /// Number of entries.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry in the slot `va` hashes to.
    pub fn entry_for(&self, va: u64) -> &TlbEntry {
        &self.entries[self.index(va)]
    }
}
