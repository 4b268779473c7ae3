//! Guest Memory Tests.
//!
//! Verifies the flat physical store:
//! - Zero fill and page rounding of the mapping
//! - Little-endian access at every width, truncation on store
//! - Bounds and width checks
//! - Image loading and zeroing

use proptest::prelude::*;
use rvjit_core::EngineError;
use rvjit_core::soc::GuestMemory;

const SIZE: usize = 64 * 1024;

fn memory() -> GuestMemory {
    GuestMemory::new(SIZE).expect("mapping")
}

// ══════════════════════════════════════════════════════════
// 1. Allocation
// ══════════════════════════════════════════════════════════

#[test]
fn fresh_memory_is_zeroed() {
    let mem = memory();
    assert!(mem.len() >= SIZE);
    assert!(!mem.is_empty());
    assert!(mem.read_bytes(0, 256).expect("in range").iter().all(|&b| b == 0));
    assert_eq!(mem.load(SIZE as u64 - 8, 8), Ok(0));
}

#[test]
fn zero_size_is_rejected() {
    assert!(matches!(
        GuestMemory::new(0),
        Err(EngineError::MemoryAllocation { size: 0 })
    ));
}

#[test]
fn odd_sizes_round_up() {
    let mem = GuestMemory::new(5000).expect("mapping");
    assert!(mem.len() >= 5000);
    assert_eq!(mem.len() % 4096, 0);
}

// ══════════════════════════════════════════════════════════
// 2. Access
// ══════════════════════════════════════════════════════════

#[test]
fn little_endian_layout() {
    let mut mem = memory();
    mem.store(0x100, 0x1122_3344_5566_7788, 8).expect("in range");
    assert_eq!(
        mem.read_bytes(0x100, 8).expect("in range"),
        &[0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11]
    );
    assert_eq!(mem.load(0x100, 1), Ok(0x88));
    assert_eq!(mem.load(0x100, 2), Ok(0x7788));
    assert_eq!(mem.load(0x104, 4), Ok(0x1122_3344));
}

#[test]
fn loads_zero_extend() {
    let mut mem = memory();
    mem.store(0x10, 0xFF, 1).expect("in range");
    assert_eq!(mem.load(0x10, 1), Ok(0xFF));
    assert_eq!(mem.load(0x10, 8), Ok(0xFF));
}

#[test]
fn narrow_store_leaves_neighbours() {
    let mut mem = memory();
    mem.store(0x200, u64::MAX, 8).expect("in range");
    mem.store(0x202, 0, 2).expect("in range");
    assert_eq!(mem.load(0x200, 8), Ok(0xFFFF_FFFF_0000_FFFF));
}

#[test]
fn unaligned_access_is_allowed() {
    let mut mem = memory();
    mem.store(0x301, 0xDEAD_BEEF, 4).expect("in range");
    assert_eq!(mem.load(0x301, 4), Ok(0xDEAD_BEEF));
}

// ══════════════════════════════════════════════════════════
// 3. Bounds
// ══════════════════════════════════════════════════════════

#[test]
fn access_past_end_faults() {
    let mut mem = memory();
    let end = mem.len() as u64;
    assert_eq!(
        mem.load(end - 4, 8),
        Err(EngineError::AccessFault { addr: end - 4, size: 8 })
    );
    assert!(mem.store(end, 1, 1).is_err());
    assert!(mem.load(u64::MAX, 1).is_err());
    assert_eq!(mem.load(end - 8, 8), Ok(0));
}

#[test]
fn invalid_width_faults() {
    let mut mem = memory();
    assert!(matches!(
        mem.load(0, 3),
        Err(EngineError::AccessFault { size: 3, .. })
    ));
    assert!(mem.store(0, 0, 16).is_err());
}

#[test]
fn failed_store_does_not_write() {
    let mut mem = memory();
    let end = mem.len() as u64;
    mem.store(end - 4, 0x1111_1111, 4).expect("in range");
    assert!(mem.store(end - 4, u64::MAX, 8).is_err());
    assert_eq!(mem.load(end - 4, 4), Ok(0x1111_1111));
}

// ══════════════════════════════════════════════════════════
// 4. Images
// ══════════════════════════════════════════════════════════

#[test]
fn load_data_and_zero_init() {
    let mut mem = memory();
    mem.load_data(0x1000, &[1, 2, 3, 4, 5, 6, 7, 8]).expect("fits");
    assert_eq!(mem.load(0x1000, 4), Ok(0x0403_0201));

    mem.zero_init(0x1002, 4).expect("fits");
    assert_eq!(
        mem.read_bytes(0x1000, 8).expect("in range"),
        &[1, 2, 0, 0, 0, 0, 7, 8]
    );
}

#[test]
fn oversized_image_rejected() {
    let mut mem = memory();
    let image = vec![0xAA; 16];
    let end = mem.len() as u64;
    assert!(mem.load_data(end - 8, &image).is_err());
    assert_eq!(mem.load(end - 8, 8), Ok(0));
}

proptest! {
    #[test]
    fn store_truncates_to_width(addr in 0u64..(SIZE as u64 - 8), value: u64, w in 0usize..4) {
        let width = 1usize << w;
        let mut mem = memory();
        mem.store(addr, value, width).expect("in range");
        let mask = if width == 8 { u64::MAX } else { (1u64 << (width * 8)) - 1 };
        prop_assert_eq!(mem.load(addr, width), Ok(value & mask));
    }
}
