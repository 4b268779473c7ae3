//! Hart Memory Path Tests.
//!
//! Loads, stores and fetches made through the hart go through the MMU with the
//! current `satp`. Also covers register access and the register dump.

use crate::common::builder::instruction::asm;
use crate::common::harness::{CODE_BASE, TestContext, test_config};
use crate::unit::core::units::mmu::helpers::{R, W, X, map_4k, sv39_satp};
use pretty_assertions::assert_eq;
use rvjit_core::EngineError;
use rvjit_core::common::AccessType;
use rvjit_core::core::arch::csr::SATP;

const VA: u64 = 0x4000_2000;
const PA: u64 = 0x8_0000;

#[test]
fn bare_mode_accesses_physical_memory() {
    let mut tc = TestContext::new();
    tc.hart.store(0x2000, 0x1122_3344_5566_7788, 8).expect("store");
    assert_eq!(tc.read_u64(0x2000), 0x1122_3344_5566_7788);
    assert_eq!(tc.hart.load(0x2004, 4).expect("load"), 0x1122_3344);
    assert_eq!(tc.hart.load(0x2007, 1).expect("load"), 0x11);
}

#[test]
fn translated_accesses_reach_the_mapped_frame() {
    let mut tc = TestContext::new();
    map_4k(tc.hart.memory_mut(), VA, PA, R | W);
    tc.hart.set_csr(SATP, sv39_satp()).expect("satp");

    tc.hart.store(VA + 0x10, 0xDEAD_BEEF, 4).expect("mapped store");
    assert_eq!(tc.hart.memory().load(PA + 0x10, 4).expect("pa"), 0xDEAD_BEEF);
    assert_eq!(tc.hart.load(VA + 0x10, 4).expect("mapped load"), 0xDEAD_BEEF);
    assert!(tc.hart.mmu().store_tlb.entry_for(VA).valid);
    assert!(tc.hart.mmu().load_tlb.entry_for(VA).valid);
    assert!(!tc.hart.mmu().itlb.entry_for(VA).valid);
}

#[test]
fn leaf_permissions_are_not_enforced() {
    let mut tc = TestContext::new();
    map_4k(tc.hart.memory_mut(), VA, PA, R);
    tc.hart.set_csr(SATP, sv39_satp()).expect("satp");

    tc.hart.store(VA, 0x55, 8).expect("store through a read-only leaf");
    assert_eq!(tc.hart.memory().load(PA, 8).expect("pa"), 0x55);
    assert_eq!(tc.hart.fetch(VA).expect("fetch through a read-only leaf"), 0x55);
}

#[test]
fn write_without_read_leaf_faults_with_access_kind() {
    let mut tc = TestContext::new();
    map_4k(tc.hart.memory_mut(), VA, PA, W);
    tc.hart.set_csr(SATP, sv39_satp()).expect("satp");

    assert_eq!(
        tc.hart.load(VA, 8),
        Err(EngineError::PageFault {
            va: VA,
            access: AccessType::Load
        })
    );
    assert_eq!(
        tc.hart.store(VA, 1, 8),
        Err(EngineError::PageFault {
            va: VA,
            access: AccessType::Store
        })
    );
    assert_eq!(tc.hart.memory().load(PA, 8).expect("pa"), 0);
}

#[test]
fn out_of_range_physical_address_is_an_access_fault() {
    let mut tc = TestContext::new();
    let end = crate::common::harness::TEST_MEMORY as u64;
    assert_eq!(
        tc.hart.load(end, 8),
        Err(EngineError::AccessFault { addr: end, size: 8 })
    );
}

#[test]
fn stale_translation_survives_until_flush() {
    let mut tc = TestContext::new();
    map_4k(tc.hart.memory_mut(), VA, PA, R | W);
    tc.hart.set_csr(SATP, sv39_satp()).expect("satp");
    tc.write_u64(PA, 1);
    tc.write_u64(PA + 0x1000, 2);
    assert_eq!(tc.hart.load(VA, 8).expect("load"), 1);

    map_4k(tc.hart.memory_mut(), VA, PA + 0x1000, R | W);
    assert_eq!(tc.hart.load(VA, 8).expect("cached"), 1);
    tc.hart.flush_tlbs();
    assert_eq!(tc.hart.load(VA, 8).expect("rewalked"), 2);
}

#[test]
fn program_runs_under_translation() {
    let code_va = 0x4000_0000;
    let mut tc = TestContext::new();
    tc.write_words(
        CODE_BASE,
        &[
            asm().lui(6, 0x40002).build(),
            asm().addi(5, 0, 42).build(),
            asm().sd(6, 5, 8).build(),
            asm().ld(7, 6, 8).build(),
            asm().ecall().build(),
        ],
    );
    map_4k(tc.hart.memory_mut(), code_va, CODE_BASE, R | X);
    map_4k(tc.hart.memory_mut(), VA, PA, R | W);
    tc.hart.set_csr(SATP, sv39_satp()).expect("satp");
    tc.hart.set_pc(code_va);

    assert_eq!(tc.run(0), 5);
    assert_eq!(tc.get_reg(7), 42);
    assert_eq!(tc.read_u64(PA + 8), 42);
    assert_eq!(tc.pc(), code_va + 20);
}

#[test]
fn register_file_access() {
    let mut tc = TestContext::new();
    tc.set_reg(0, 5);
    assert_eq!(tc.get_reg(0), 0);
    tc.set_reg(31, 7);
    assert_eq!(tc.get_reg(31), 7);
    assert_eq!(tc.hart.get_reg(32), Err(EngineError::InvalidRegisterIndex(32)));
    assert_eq!(tc.hart.set_reg(40, 1), Err(EngineError::InvalidRegisterIndex(40)));
    assert_eq!(tc.hart.regs()[31], 7);
}

#[test]
fn initial_register_value_fills_all_but_x0() {
    let mut config = test_config();
    config.general.initial_reg_val = 0xABCD;
    let tc = TestContext::with_config(&config);
    assert_eq!(tc.get_reg(0), 0);
    assert!((1..32).all(|r| tc.get_reg(r) == 0xABCD));
    assert_eq!(tc.pc(), CODE_BASE);
}

#[test]
fn dump_shows_pc_counter_and_registers() {
    let mut tc = TestContext::new().load_program(
        CODE_BASE,
        &[asm().addi(10, 0, 0x7F).build(), asm().ecall().build()],
    );
    let _ = tc.run(0);
    let dump = tc.hart.dump_regs();
    assert!(dump.contains("pc=0x0000000000001008"));
    assert!(dump.contains("instret=2"));
    assert!(dump.contains("halted"));
    assert!(dump.contains("a0=0x000000000000007f"));
    assert_eq!(dump.lines().count(), 1 + 16);
}
