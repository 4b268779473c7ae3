//! Page Table Walker Unit Tests.
//!
//! Verifies Sv39 walks against hand-built tables:
//! - Leaves at level 0, 1 (2 MiB) and 2 (1 GiB)
//! - Invalid and reserved entries
//! - Missing leaf by level 0
//! - Table addresses outside guest memory

use super::helpers::*;
use rvjit_core::EngineError;
use rvjit_core::common::{AccessType, VirtAddr};
use rvjit_core::core::arch::PrivilegeMode;
use rvjit_core::core::units::mmu::TranslationContext;
use rvjit_core::core::units::mmu::ptw::{WalkResult, page_table_walk};
use rvjit_core::soc::GuestMemory;

fn setup() -> (GuestMemory, TranslationContext) {
    let mem = GuestMemory::new(MEM_SIZE).expect("mapping");
    let ctx = TranslationContext::from_satp(sv39_satp(), PrivilegeMode::Machine);
    (mem, ctx)
}

fn walk(mem: &GuestMemory, ctx: &TranslationContext, va: u64) -> Result<WalkResult, EngineError> {
    page_table_walk(mem, VirtAddr::new(va), AccessType::Load, ctx)
}

// ══════════════════════════════════════════════════════════
// 1. Leaves
// ══════════════════════════════════════════════════════════

#[test]
fn four_kib_leaf() {
    let (mut mem, ctx) = setup();
    map_4k(&mut mem, 0x4000_5000, 0x30_0000, R | W);
    assert_eq!(
        walk(&mem, &ctx, 0x4000_5ABC),
        Ok(WalkResult {
            paddr: 0x30_0ABC,
            page_size: 4096
        })
    );
}

#[test]
fn megapage_leaf_takes_low_vpn_from_address() {
    let (mut mem, ctx) = setup();
    write_pte(&mut mem, ROOT, 0, make_pte(L1, V));
    write_pte(&mut mem, L1, 2, make_pte(0x60_0000, R | X | V));
    let res = walk(&mem, &ctx, 0x41_2345).expect("mapped");
    assert_eq!(res.paddr, 0x61_2345);
    assert_eq!(res.page_size, 2 << 20);
}

#[test]
fn gigapage_leaf() {
    let (mut mem, ctx) = setup();
    write_pte(&mut mem, ROOT, 1, make_pte(0, R | W | X | V));
    let res = walk(&mem, &ctx, 0x4012_3456).expect("mapped");
    assert_eq!(res.paddr, 0x0012_3456);
    assert_eq!(res.page_size, 1 << 30);
}

#[test]
fn execute_only_leaf_is_valid() {
    let (mut mem, ctx) = setup();
    map_4k(&mut mem, 0x1000, 0x2000, X);
    assert!(walk(&mem, &ctx, 0x1000).is_ok());
}

// ══════════════════════════════════════════════════════════
// 2. Faults
// ══════════════════════════════════════════════════════════

#[test]
fn invalid_root_entry_faults() {
    let (mut mem, ctx) = setup();
    write_pte(&mut mem, ROOT, 0, make_pte(L1, 0));
    assert_eq!(
        page_table_walk(&mem, VirtAddr::new(0x1234), AccessType::Fetch, &ctx),
        Err(EngineError::PageFault {
            va: 0x1234,
            access: AccessType::Fetch
        })
    );
}

#[test]
fn write_without_read_is_reserved() {
    let (mut mem, ctx) = setup();
    map_4k(&mut mem, 0x3000, 0x5000, W);
    assert!(matches!(
        walk(&mem, &ctx, 0x3000),
        Err(EngineError::PageFault { va: 0x3000, .. })
    ));
}

#[test]
fn pointer_at_level_zero_faults() {
    let (mut mem, ctx) = setup();
    map_4k(&mut mem, 0x3000, L0, 0);
    assert!(walk(&mem, &ctx, 0x3000).is_err());
}

#[test]
fn table_outside_memory_faults() {
    let mem = GuestMemory::new(MEM_SIZE).expect("mapping");
    let satp = (8 << 60) | (0x1000_0000 >> 12);
    let ctx = TranslationContext::from_satp(satp, PrivilegeMode::Machine);
    assert!(matches!(
        walk(&mem, &ctx, 0x1000),
        Err(EngineError::PageFault { .. })
    ));
}
