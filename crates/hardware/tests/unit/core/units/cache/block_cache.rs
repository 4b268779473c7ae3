//! Block Cache Unit Tests.
//!
//! Verifies the direct-mapped block table:
//! - Slot indexing and entry-address checks on lookup
//! - Unconditional overwrite on install, rejection of empty blocks
//! - Hit counting, and `peek` not counting
//! - Whole-table invalidation
//! - Straight-line classification

use std::rc::Rc;

use crate::common::builder::instruction::asm;
use rvjit_core::EngineError;
use rvjit_core::core::units::cache::{Block, BlockCache};
use rvjit_core::isa::execute::handler_for;
use rvjit_core::isa::{ExecFn, Instruction, decode};

fn block(start: u64, words: &[u32]) -> Block {
    let instrs: Vec<Instruction> = words.iter().map(|&w| decode(w)).collect();
    let fns: Vec<ExecFn> = instrs.iter().map(|i| handler_for(i.opcode)).collect();
    Block::basic(start, instrs, fns)
}

fn nops(start: u64, n: usize) -> Block {
    block(start, &vec![asm().nop().build(); n])
}

#[test]
fn capacity_must_be_power_of_two() {
    assert_eq!(BlockCache::new(64).expect("power of two").capacity(), 64);
    assert_eq!(BlockCache::new(1).expect("power of two").capacity(), 1);
    for bad in [0, 3, 100] {
        assert!(matches!(
            BlockCache::new(bad),
            Err(EngineError::InvalidConfig(_))
        ));
    }
}

#[test]
fn install_then_lookup() {
    let mut cache = BlockCache::new(16).expect("power of two");
    assert!(cache.install(nops(0x1000, 3)).is_some());
    let hit = cache.lookup(0x1000).expect("installed");
    assert_eq!(hit.start_pc, 0x1000);
    assert_eq!(hit.len(), 3);
    assert_eq!(cache.occupied(), 1);
}

#[test]
fn lookup_checks_entry_address() {
    let mut cache = BlockCache::new(16).expect("power of two");
    let _ = cache.install(nops(0x1000, 1));
    // 0x1040 maps to the same slot: (0x1040 / 4) & 15 == (0x1000 / 4) & 15.
    assert!(cache.lookup(0x1040).is_none());
    assert!(cache.lookup(0x1004).is_none());
}

#[test]
fn install_overwrites_aliasing_slot() {
    let mut cache = BlockCache::new(16).expect("power of two");
    let _ = cache.install(nops(0x1000, 1));
    let _ = cache.install(nops(0x1040, 2));
    assert!(cache.lookup(0x1000).is_none());
    assert_eq!(cache.lookup(0x1040).map(|b| b.len()), Some(2));
    assert_eq!(cache.occupied(), 1);
}

#[test]
fn empty_blocks_are_not_installed() {
    let mut cache = BlockCache::new(16).expect("power of two");
    assert!(cache.install(nops(0x1000, 0)).is_none());
    assert!(cache.lookup(0x1000).is_none());
    assert_eq!(cache.occupied(), 0);
}

#[test]
fn lookups_count_hits_and_peek_does_not() {
    let mut cache = BlockCache::new(16).expect("power of two");
    let _ = cache.install(nops(0x2000, 1));
    for _ in 0..3 {
        let _ = cache.lookup(0x2000);
    }
    let peeked = cache.peek(0x2000).expect("installed");
    assert_eq!(peeked.hits(), 3);
    let _ = cache.peek(0x2000);
    assert_eq!(cache.lookup(0x2000).map(|b| b.hits()), Some(4));
}

#[test]
fn evicted_handle_stays_alive() {
    let mut cache = BlockCache::new(1).expect("power of two");
    let held = cache.install(nops(0x1000, 2)).expect("installed");
    let _ = cache.install(nops(0x2000, 1));
    assert_eq!(held.len(), 2);
    assert_eq!(Rc::strong_count(&held), 1);
}

#[test]
fn invalidate_all_empties_every_slot() {
    let mut cache = BlockCache::new(8).expect("power of two");
    for i in 0..8 {
        let _ = cache.install(nops(0x1000 + i * 4, 1));
    }
    assert_eq!(cache.occupied(), 8);
    cache.invalidate_all();
    assert_eq!(cache.occupied(), 0);
    assert!(cache.lookup(0x1000).is_none());
}

#[test]
fn straight_line_classification() {
    let straight = block(0, &[asm().add(1, 2, 3).build(), asm().ld(4, 5, 0).build()]);
    assert!(straight.is_straight_line());

    for control in [
        asm().beq(1, 2, 8).build(),
        asm().jal(0, 8).build(),
        asm().jalr(0, 1, 0).build(),
    ] {
        let b = block(0, &[asm().nop().build(), control]);
        assert!(!b.is_straight_line());
    }
}

#[test]
fn function_units() {
    let instrs = vec![decode(asm().nop().build()); 2];
    let unit = Block::function(0x100, instrs, vec![0x100, 0x104]);
    assert!(unit.is_function_block);
    assert!(unit.exec_fns.is_empty());
    assert_eq!(unit.instr_pcs, vec![0x100, 0x104]);
    assert!(!unit.is_compiled());
}
